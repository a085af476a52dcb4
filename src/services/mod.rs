pub mod otp_service;
pub mod token_service;
pub mod user_repository;

pub use otp_service::OtpService;
pub use token_service::TokenService;
pub use user_repository::{SeaOrmUserRepository, UserRepository};
