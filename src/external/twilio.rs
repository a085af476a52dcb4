use crate::config::TwilioConfig;
use crate::error::{AppError, AppResult};
use crate::external::SmsGateway;
use crate::utils::format_us_phone;
use async_trait::async_trait;
use reqwest::Client;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Clone)]
pub struct TwilioService {
    client: Client,
    config: TwilioConfig,
}

impl TwilioService {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            TWILIO_API_BASE, self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsGateway for TwilioService {
    async fn send_sms(&self, phone: &str, message: &str) -> AppResult<()> {
        let to = format_us_phone(phone);
        let params = [
            ("To", to.as_str()),
            ("From", self.config.from_phone.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("OTP SMS sent successfully: {}", phone);
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("OTP SMS failed to send: {}, Error: {}", phone, error_text);
            Err(AppError::ExternalApiError(format!(
                "SMS sending failed: {}",
                error_text
            )))
        }
    }
}
