pub mod common;
pub mod otp;
pub mod token;

pub use common::*;
pub use otp::*;
pub use token::*;
