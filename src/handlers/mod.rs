pub mod auth;
pub mod common;

pub use auth::auth_config;
pub use common::{invalid_endpoint, json_config};
