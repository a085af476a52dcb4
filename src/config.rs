use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
}

/// Controls how much error detail is returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` is treated as development.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_access_expires_in")]
    pub access_token_expires_in: i64, // seconds
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_token_expires_in: i64, // seconds
    #[serde(default = "default_recover_expires_in")]
    pub recover_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    #[serde(default = "default_otp_expiry_ms")]
    pub expiry_ms: i64,
    /// Name shown in the SMS body.
    #[serde(default = "default_otp_brand")]
    pub brand: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_phone: String,
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_phone.is_empty()
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiry_ms: default_otp_expiry_ms(),
            brand: default_otp_brand(),
        }
    }
}

fn default_access_expires_in() -> i64 {
    7200
}

fn default_refresh_expires_in() -> i64 {
    2_592_000
}

fn default_recover_expires_in() -> i64 {
    900
}

const MAX_OTP_EXPIRY_MS: i64 = 86_400_000;

fn default_otp_expiry_ms() -> i64 {
    600_000
}

fn default_otp_brand() -> String {
    "Medicause".to_string()
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads `CONFIG_PATH` (default `config.toml`). Without a file the whole
    /// configuration comes from the environment; with one, environment
    /// variables still override individual values.
    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env()?,
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "Failed to read config file {config_path}: {e}"
                )));
            }
        };

        config.apply_env_overrides();
        config.clamp_otp_expiry();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        let mut config: Config = toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {e}")))?;
        config.clamp_otp_expiry();
        Ok(config)
    }

    /// Non-positive expiries fall back to the default; larger than a day is
    /// capped to a day.
    fn clamp_otp_expiry(&mut self) {
        let expiry_ms = self.otp.expiry_ms;
        if expiry_ms <= 0 {
            log::warn!(
                "otp.expiry_ms must be positive (got {}), using {}",
                expiry_ms,
                default_otp_expiry_ms()
            );
            self.otp.expiry_ms = default_otp_expiry_ms();
        } else if expiry_ms > MAX_OTP_EXPIRY_MS {
            log::warn!(
                "otp.expiry_ms {} exceeds the maximum, using {}",
                expiry_ms,
                MAX_OTP_EXPIRY_MS
            );
            self.otp.expiry_ms = MAX_OTP_EXPIRY_MS;
        }
    }

    fn from_env() -> AppResult<Self> {
        let database_url = get_env("DATABASE_URL").ok_or_else(|| {
            AppError::ConfigError(
                "DATABASE_URL is not set and no config.toml was found".to_string(),
            )
        })?;

        Ok(Config {
            environment: get_env("ENVIRONMENT")
                .map(|v| Environment::from_name(&v))
                .unwrap_or_default(),
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET").unwrap_or_default(),
                access_token_expires_in: get_env_parse(
                    "JWT_ACCESS_EXPIRES_IN",
                    default_access_expires_in(),
                ),
                refresh_token_expires_in: get_env_parse(
                    "JWT_REFRESH_EXPIRES_IN",
                    default_refresh_expires_in(),
                ),
                recover_token_expires_in: get_env_parse(
                    "JWT_RECOVER_EXPIRES_IN",
                    default_recover_expires_in(),
                ),
            },
            otp: OtpConfig {
                expiry_ms: get_env_parse("OTP_EXPIRY", default_otp_expiry_ms()),
                brand: get_env("OTP_BRAND").unwrap_or_else(default_otp_brand),
            },
            twilio: TwilioConfig {
                account_sid: get_env("TWILIO_ACCOUNT_SID").unwrap_or_default(),
                auth_token: get_env("TWILIO_AUTH_TOKEN").unwrap_or_default(),
                from_phone: get_env("TWILIO_FROM_PHONE").unwrap_or_default(),
            },
        })
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(get_env);
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("ENVIRONMENT") {
            self.environment = Environment::from_name(&v);
        }
        if let Some(v) = var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(v) = var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }
        if let Some(v) = var("JWT_RECOVER_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.recover_token_expires_in = n;
        }
        // unparsable or non-positive values keep the file setting
        if let Some(v) = var("OTP_EXPIRY")
            && let Ok(ms) = v.parse::<i64>()
            && ms > 0
        {
            self.otp.expiry_ms = ms;
        }
        if let Some(v) = var("OTP_BRAND") {
            self.otp.brand = v;
        }
        if let Some(v) = var("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = v;
        }
        if let Some(v) = var("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = v;
        }
        if let Some(v) = var("TWILIO_FROM_PHONE") {
            self.twilio.from_phone = v;
        }
    }
}
