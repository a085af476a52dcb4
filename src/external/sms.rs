use crate::error::AppResult;
use async_trait::async_trait;

/// Outbound SMS delivery.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_sms(&self, phone: &str, message: &str) -> AppResult<()>;
}

/// Used when no SMS provider is configured: accepts every message and only
/// records that a dispatch happened. The message body is not logged since
/// it carries the code.
#[derive(Clone, Default)]
pub struct NoopSmsGateway;

#[async_trait]
impl SmsGateway for NoopSmsGateway {
    async fn send_sms(&self, phone: &str, _message: &str) -> AppResult<()> {
        log::info!("SMS delivery disabled, skipping message to {}", phone);
        Ok(())
    }
}
