use crate::error::AppResult;
use crate::models::{Claims, TokenRejection, TokenType, TokenVerification};
use crate::services::UserRepository;
use crate::utils::JwtService;
use jsonwebtoken::errors::ErrorKind;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// Verifies bearer tokens for a given purpose against the user they were
/// issued to.
#[derive(Clone)]
pub struct TokenService {
    jwt_service: JwtService,
    users: Arc<dyn UserRepository>,
}

impl TokenService {
    pub fn new(jwt_service: JwtService, users: Arc<dyn UserRepository>) -> Self {
        Self { jwt_service, users }
    }

    /// `token` is the raw header value (`Bearer <jwt>`).
    ///
    /// - access / refresh: `account_id` is required and must be the id of
    ///   the live (not soft-deleted) user owning the token's phone.
    /// - recover: `phone` is required and the owning user must be
    ///   soft-deleted.
    ///
    /// When `phone` is given it must match the phone in the token. In every
    /// case the token's own type must equal `token_type`.
    ///
    /// Expected failures come back as `Rejected`; `Err` means the user
    /// lookup itself failed.
    pub async fn verify(
        &self,
        token: &str,
        token_type: TokenType,
        phone: Option<&str>,
        account_id: Option<i32>,
    ) -> AppResult<TokenVerification> {
        let Some(raw) = token.strip_prefix(BEARER_PREFIX) else {
            return Ok(TokenRejection::InvalidFormat.into());
        };

        let claims = match self.jwt_service.decode(raw.trim()) {
            Ok(claims) => claims,
            Err(e) => {
                log::warn!("Token rejected: {e}");
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenRejection::Expired,
                    _ => TokenRejection::InvalidSignature,
                };
                return Ok(reason.into());
            }
        };

        let outcome = match token_type {
            TokenType::Access | TokenType::Refresh => {
                self.check_session_owner(&claims, phone, account_id).await?
            }
            TokenType::Recover => self.check_recovery_owner(&claims, phone).await?,
        };
        if let Err(reason) = outcome {
            return Ok(reason.into());
        }

        if claims.token_type != token_type {
            return Ok(TokenRejection::TypeMismatch.into());
        }

        Ok(TokenVerification::Verified(claims))
    }

    async fn check_session_owner(
        &self,
        claims: &Claims,
        phone: Option<&str>,
        account_id: Option<i32>,
    ) -> AppResult<Result<(), TokenRejection>> {
        let Some(account_id) = account_id else {
            return Ok(Err(TokenRejection::MissingAccountId));
        };
        if phone.is_some_and(|p| p != claims.phone) {
            return Ok(Err(TokenRejection::PhoneMismatch));
        }

        let Some(user) = self.users.get_by_phone(&claims.phone).await? else {
            return Ok(Err(TokenRejection::UserNotFound));
        };
        if user.is_deleted() {
            return Ok(Err(TokenRejection::UserDeleted));
        }
        if user.id != account_id {
            return Ok(Err(TokenRejection::AccountMismatch));
        }

        Ok(Ok(()))
    }

    async fn check_recovery_owner(
        &self,
        claims: &Claims,
        phone: Option<&str>,
    ) -> AppResult<Result<(), TokenRejection>> {
        let Some(phone) = phone else {
            return Ok(Err(TokenRejection::MissingPhone));
        };
        if phone != claims.phone {
            return Ok(Err(TokenRejection::PhoneMismatch));
        }

        let Some(user) = self.users.get_by_phone(&claims.phone).await? else {
            return Ok(Err(TokenRejection::UserNotFound));
        };
        if !user.is_deleted() {
            return Ok(Err(TokenRejection::UserNotDeleted));
        }

        Ok(Ok(()))
    }
}
