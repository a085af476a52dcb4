use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Purpose a token was issued for. A token is only accepted for the
/// purpose written in its own claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    Recover,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
            TokenType::Recover => write!(f, "recover"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub phone: String,
    pub exp: i64,
    pub iat: i64,
}

/// Expected reasons for refusing a token. The messages are returned to
/// callers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("Invalid token format")]
    InvalidFormat,
    #[error("Token verification failed")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
    #[error("Account ID not found")]
    MissingAccountId,
    #[error("Phone number not found")]
    MissingPhone,
    #[error("Phone number does not belong to this JWT token")]
    PhoneMismatch,
    #[error("User linked to this JWT token does not exist")]
    UserNotFound,
    #[error("User linked to this JWT token is deleted")]
    UserDeleted,
    #[error("User linked to this JWT token is not deleted")]
    UserNotDeleted,
    #[error("User Id provided does not belong to this token")]
    AccountMismatch,
    #[error("Invalid token type, does not match the operation!")]
    TypeMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerification {
    Verified(Claims),
    Rejected(TokenRejection),
}

impl TokenVerification {
    pub fn success(&self) -> bool {
        matches!(self, TokenVerification::Verified(_))
    }

    pub fn message(&self) -> String {
        match self {
            TokenVerification::Verified(_) => "Token verified successfully".to_string(),
            TokenVerification::Rejected(reason) => reason.to_string(),
        }
    }

    pub fn rejection(&self) -> Option<TokenRejection> {
        match self {
            TokenVerification::Verified(_) => None,
            TokenVerification::Rejected(reason) => Some(*reason),
        }
    }
}

impl From<TokenRejection> for TokenVerification {
    fn from(reason: TokenRejection) -> Self {
        TokenVerification::Rejected(reason)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyTokenRequest {
    #[serde(rename = "type")]
    pub token_type: Option<TokenType>,
    #[schema(example = "9998887777")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub account_id: Option<i32>,
}
