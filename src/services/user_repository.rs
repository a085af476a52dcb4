use crate::entities::user_entity as users;
use crate::error::AppResult;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Read-only access to user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Soft-deleted users are returned as well; callers decide what a
    /// `deleted_at` means for them.
    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<users::Model>>;
}

#[derive(Clone)]
pub struct SeaOrmUserRepository {
    pool: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .order_by_desc(users::Column::Id)
            .one(&self.pool)
            .await?;
        Ok(user)
    }
}
