pub mod sms;
pub mod twilio;

pub use sms::*;
pub use twilio::*;
