use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Claims, TokenType};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
    refresh_token_expires_in: i64,
    recover_token_expires_in: i64,
}

impl JwtService {
    /// Fails when the signing secret is missing; the service cannot
    /// verify anything without it.
    pub fn new(config: &JwtConfig) -> AppResult<Self> {
        if config.secret.trim().is_empty() {
            return Err(AppError::ConfigError("JWT secret not found".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expires_in: config.access_token_expires_in,
            refresh_token_expires_in: config.refresh_token_expires_in,
            recover_token_expires_in: config.recover_token_expires_in,
        })
    }

    pub fn expires_in(&self, token_type: TokenType) -> i64 {
        match token_type {
            TokenType::Access => self.access_token_expires_in,
            TokenType::Refresh => self.refresh_token_expires_in,
            TokenType::Recover => self.recover_token_expires_in,
        }
    }

    pub fn issue(&self, token_type: TokenType, phone: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in(token_type));

        let claims = Claims {
            token_type,
            phone: phone.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    /// Checks the HS256 signature and expiry and returns the claims. The raw
    /// jsonwebtoken error is returned so callers can tell expiry apart from
    /// other failures.
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
pub(crate) fn test_config(secret: &str) -> JwtConfig {
    JwtConfig {
        secret: secret.to_string(),
        access_token_expires_in: 7200,
        refresh_token_expires_in: 2_592_000,
        recover_token_expires_in: 900,
    }
}
