use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(15))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationCodeStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

impl std::fmt::Display for VerificationCodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationCodeStatus::Active => write!(f, "ACTIVE"),
            VerificationCodeStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "verification_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub code: String,
    pub phone: String,
    pub status: VerificationCodeStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == VerificationCodeStatus::Active
    }

    /// A code stays valid while `created_at + window >= now`. A window too
    /// large to represent never expires.
    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        match self.created_at.checked_add_signed(window) {
            Some(deadline) => deadline < now,
            None => false,
        }
    }
}
