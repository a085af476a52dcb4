use crate::config::Environment;
use crate::models::{ApiBody, ApiResponse};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub type AppResult<T> = Result<T, AppError>;

/// Error kinds exposed to clients in the `data.error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MissingFields,
    InvalidRequest,
    InvalidEndpoint,
    UncaughtError,
    QueryError,
    AuthenticationError,
    DoesntExistError,
    InvalidParameters,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MissingFields(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidEndpoint(String),

    #[error("{0}")]
    Uncaught(String),

    #[error("{0}")]
    Query(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    DoesntExist(String),

    #[error("{0}")]
    InvalidParameters(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("JWT error: {0}")]
    JwtError(jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Authentication("Token expired".to_string())
            }
            _ => AppError::JwtError(err),
        }
    }
}

impl AppError {
    /// Operational errors were raised deliberately and are safe to show to
    /// the caller as-is.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            AppError::MissingFields(_)
                | AppError::InvalidRequest(_)
                | AppError::InvalidEndpoint(_)
                | AppError::Uncaught(_)
                | AppError::Query(_)
                | AppError::Authentication(_)
                | AppError::DoesntExist(_)
                | AppError::InvalidParameters(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingFields(_) => ErrorKind::MissingFields,
            AppError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AppError::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
            AppError::Query(_) => ErrorKind::QueryError,
            AppError::Authentication(_) => ErrorKind::AuthenticationError,
            AppError::DoesntExist(_) => ErrorKind::DoesntExistError,
            AppError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            _ => ErrorKind::UncaughtError,
        }
    }

    fn log(&self) {
        match self {
            AppError::MissingFields(msg)
            | AppError::InvalidRequest(msg)
            | AppError::InvalidParameters(msg) => log::warn!("Validation error: {msg}"),
            AppError::Authentication(msg) => log::warn!("Authentication error: {msg}"),
            AppError::InvalidEndpoint(_) | AppError::DoesntExist(_) => {}
            AppError::ExternalApiError(msg) => log::error!("External API error: {msg}"),
            AppError::DatabaseError(err) => log::error!("Database error: {err}"),
            _ => log::error!("Internal error: {self}"),
        }
    }

    /// Builds the response envelope. Production hides the message of
    /// non-operational errors; development adds the debug form of the error.
    pub fn render(&self, environment: Environment) -> HttpResponse {
        self.log();
        let status = self.status_code();

        let body = match environment {
            Environment::Production if !self.is_operational() => ApiBody {
                message: "Something went wrong".to_string(),
                error: Some(ErrorKind::UncaughtError),
                details: None,
            },
            Environment::Production => ApiBody {
                message: self.to_string(),
                error: Some(self.kind()),
                details: None,
            },
            Environment::Development => ApiBody {
                message: self.to_string(),
                error: Some(self.kind()),
                details: Some(format!("{self:?}")),
            },
        };

        HttpResponse::build(status).json(ApiResponse::failure(status.as_u16(), body))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_)
            | AppError::InvalidRequest(_)
            | AppError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidEndpoint(_) | AppError::DoesntExist(_) => StatusCode::NOT_FOUND,
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.render(Environment::Production)
    }
}
