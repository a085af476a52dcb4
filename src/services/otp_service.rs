use crate::config::OtpConfig;
use crate::entities::VerificationCodeStatus;
use crate::entities::verification_code_entity as codes;
use crate::error::AppResult;
use crate::external::SmsGateway;
use crate::utils::generate_four_digit_code;
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;

/// Attempts for `generate` when a concurrent request for the same phone
/// wins the single-active-code index.
const MAX_GENERATE_ATTEMPTS: u32 = 3;

/// Issues, delivers and verifies one-time codes.
///
/// Every phone has at most one ACTIVE code. `generate` retires older codes
/// and inserts the new one in a single transaction, and the database backs
/// this up with a partial unique index on `phone WHERE status = 'ACTIVE'`.
#[derive(Clone)]
pub struct OtpService {
    pool: DatabaseConnection,
    gateway: Arc<dyn SmsGateway>,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(pool: DatabaseConnection, gateway: Arc<dyn SmsGateway>, config: OtpConfig) -> Self {
        Self {
            pool,
            gateway,
            config,
        }
    }

    pub fn expiry_window(&self) -> Duration {
        Duration::milliseconds(self.config.expiry_ms)
    }

    /// Deactivates every code for `phone` and stores a fresh ACTIVE one.
    /// `phone` must already be validated.
    pub async fn generate(&self, phone: &str) -> AppResult<codes::Model> {
        let record = retry_on_unique_violation(phone, || self.try_generate(phone)).await?;
        log::info!("Issued verification code {} for {}", record.id, phone);
        Ok(record)
    }

    async fn try_generate(&self, phone: &str) -> Result<codes::Model, DbErr> {
        let txn = self.pool.begin().await?;

        codes::Entity::update_many()
            .col_expr(
                codes::Column::Status,
                Expr::value(VerificationCodeStatus::Inactive),
            )
            .filter(codes::Column::Phone.eq(phone))
            .exec(&txn)
            .await?;

        let record = codes::ActiveModel {
            phone: Set(phone.to_string()),
            code: Set(generate_four_digit_code()),
            status: Set(VerificationCodeStatus::Active),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(record)
    }

    /// Hands the code to the SMS gateway. Returns `false` without sending
    /// anything when the record carries no code.
    pub async fn send(&self, record: &codes::Model) -> AppResult<bool> {
        if record.code.is_empty() {
            return Ok(false);
        }

        let message = self.render_message(&record.code);
        self.gateway.send_sms(&record.phone, &message).await?;
        Ok(true)
    }

    /// Issue a code and dispatch it.
    pub async fn request(&self, phone: &str) -> AppResult<(codes::Model, bool)> {
        let record = self.generate(phone).await?;
        let delivered = self.send(&record).await?;
        Ok((record, delivered))
    }

    /// Consumes `code` for `phone`. Only the most recent row with this
    /// (code, phone) pair is considered; it must be ACTIVE and inside the
    /// expiry window. Expired codes are retired on the attempt that finds
    /// them.
    pub async fn verify(&self, code: &str, phone: &str) -> AppResult<bool> {
        let record = codes::Entity::find()
            .filter(codes::Column::Code.eq(code))
            .filter(codes::Column::Phone.eq(phone))
            .order_by_desc(codes::Column::Id)
            .one(&self.pool)
            .await?;

        let Some(record) = record else {
            return Ok(false);
        };

        if !record.is_active() {
            return Ok(false);
        }

        if record.is_expired(self.expiry_window(), Utc::now()) {
            self.deactivate(record.id).await?;
            log::info!("Verification code {} for {} expired", record.id, phone);
            return Ok(false);
        }

        self.deactivate(record.id).await
    }

    /// ACTIVE -> INACTIVE. Returns `true` only for the caller that performed
    /// the transition, so a code cannot be consumed twice.
    async fn deactivate(&self, id: i32) -> AppResult<bool> {
        let result = codes::Entity::update_many()
            .col_expr(
                codes::Column::Status,
                Expr::value(VerificationCodeStatus::Inactive),
            )
            .filter(codes::Column::Id.eq(id))
            .filter(codes::Column::Status.eq(VerificationCodeStatus::Active))
            .exec(&self.pool)
            .await?;

        Ok(result.rows_affected == 1)
    }

    fn render_message(&self, code: &str) -> String {
        format!(
            "Your one time password to access your account at {} is {}. Do not share it with anyone.",
            self.config.brand, code
        )
    }
}

/// Runs `attempt` until it stops failing on a unique constraint, at most
/// `MAX_GENERATE_ATTEMPTS` times. Other errors are returned immediately.
async fn retry_on_unique_violation<T, F, Fut>(phone: &str, mut attempt: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt().await {
            Err(e) if attempts < MAX_GENERATE_ATTEMPTS && is_unique_violation(&e) => {
                log::warn!(
                    "Concurrent code issuance for {} (attempt {}), retrying",
                    phone,
                    attempts
                );
            }
            result => return result,
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::memory_pool;
    use crate::error::AppError;
    use async_trait::async_trait;
    use sea_orm::PaginatorTrait;
    use std::sync::Mutex;

    /// Records every message instead of sending it.
    #[derive(Default)]
    pub(crate) struct RecordingGateway {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsGateway for RecordingGateway {
        async fn send_sms(&self, phone: &str, message: &str) -> AppResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl SmsGateway for FailingGateway {
        async fn send_sms(&self, _phone: &str, _message: &str) -> AppResult<()> {
            Err(AppError::ExternalApiError("gateway down".to_string()))
        }
    }

    const PHONE: &str = "9998887777";

    async fn service() -> (OtpService, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::default());
        let service = OtpService::new(memory_pool().await, gateway.clone(), OtpConfig::default());
        (service, gateway)
    }

    async fn find(service: &OtpService, id: i32) -> codes::Model {
        codes::Entity::find_by_id(id)
            .one(&service.pool)
            .await
            .unwrap()
            .unwrap()
    }

    async fn active_count(service: &OtpService, phone: &str) -> u64 {
        codes::Entity::find()
            .filter(codes::Column::Phone.eq(phone))
            .filter(codes::Column::Status.eq(VerificationCodeStatus::Active))
            .count(&service.pool)
            .await
            .unwrap()
    }

    async fn insert_record(
        service: &OtpService,
        code: &str,
        status: VerificationCodeStatus,
        age: Duration,
    ) -> codes::Model {
        codes::ActiveModel {
            phone: Set(PHONE.to_string()),
            code: Set(code.to_string()),
            status: Set(status),
            created_at: Set(Utc::now() - age),
            ..Default::default()
        }
        .insert(&service.pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_creates_active_code() {
        let (service, _) = service().await;
        let record = service.generate(PHONE).await.unwrap();

        assert_eq!(record.phone, PHONE);
        assert_eq!(record.status, VerificationCodeStatus::Active);
        assert_eq!(record.code.len(), 4);
        assert!(record.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(active_count(&service, PHONE).await, 1);
    }

    #[tokio::test]
    async fn test_generate_twice_supersedes_first_code() {
        let (service, _) = service().await;
        let first = service.generate(PHONE).await.unwrap();
        let second = service.generate(PHONE).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(
            find(&service, first.id).await.status,
            VerificationCodeStatus::Inactive
        );
        assert_eq!(
            find(&service, second.id).await.status,
            VerificationCodeStatus::Active
        );
        assert_eq!(active_count(&service, PHONE).await, 1);
    }

    #[tokio::test]
    async fn test_generate_leaves_other_phones_alone() {
        let (service, _) = service().await;
        let other = service.generate("1112223333").await.unwrap();
        service.generate(PHONE).await.unwrap();

        assert!(find(&service, other.id).await.is_active());
        assert_eq!(active_count(&service, "1112223333").await, 1);
    }

    #[tokio::test]
    async fn test_storage_rejects_second_active_code() {
        let (service, _) = service().await;
        insert_record(&service, "1111", VerificationCodeStatus::Active, Duration::zero()).await;

        let result = codes::ActiveModel {
            phone: Set(PHONE.to_string()),
            code: Set("2222".to_string()),
            status: Set(VerificationCodeStatus::Active),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&service.pool)
        .await;

        let err = result.unwrap_err();
        assert!(is_unique_violation(&err), "{err:?}");
    }

    async fn insert_active(service: &OtpService) -> Result<codes::Model, DbErr> {
        codes::ActiveModel {
            phone: Set(PHONE.to_string()),
            code: Set("2222".to_string()),
            status: Set(VerificationCodeStatus::Active),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&service.pool)
        .await
    }

    #[tokio::test]
    async fn test_generate_retries_after_unique_violation() {
        let (service, _) = service().await;
        insert_record(&service, "1111", VerificationCodeStatus::Active, Duration::zero()).await;

        // the first attempt races a competing insert and loses on the index
        let mut attempts = 0;
        let record = retry_on_unique_violation(PHONE, || {
            attempts += 1;
            let lose = attempts == 1;
            let service = &service;
            async move {
                if lose {
                    insert_active(service).await
                } else {
                    service.try_generate(PHONE).await
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(attempts, 2);
        assert!(find(&service, record.id).await.is_active());
        assert_eq!(active_count(&service, PHONE).await, 1);
    }

    #[tokio::test]
    async fn test_generate_gives_up_after_max_attempts() {
        let (service, _) = service().await;
        insert_record(&service, "1111", VerificationCodeStatus::Active, Duration::zero()).await;

        let mut attempts = 0;
        let result = retry_on_unique_violation(PHONE, || {
            attempts += 1;
            insert_active(&service)
        })
        .await;

        assert_eq!(attempts, MAX_GENERATE_ATTEMPTS);
        let err = AppError::from(result.unwrap_err());
        assert!(matches!(err, AppError::DatabaseError(_)), "{err:?}");
        assert_eq!(active_count(&service, PHONE).await, 1);
    }

    #[tokio::test]
    async fn test_retry_returns_other_errors_immediately() {
        let mut attempts = 0;
        let result: Result<(), DbErr> = retry_on_unique_violation(PHONE, || {
            attempts += 1;
            async { Err(DbErr::Custom("connection reset".to_string())) }
        })
        .await;

        assert_eq!(attempts, 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_verify_is_single_use() {
        let (service, _) = service().await;
        let record = service.generate(PHONE).await.unwrap();

        assert!(service.verify(&record.code, PHONE).await.unwrap());
        assert_eq!(
            find(&service, record.id).await.status,
            VerificationCodeStatus::Inactive
        );
        assert!(!service.verify(&record.code, PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_unknown_code_or_phone() {
        let (service, _) = service().await;
        insert_record(&service, "4821", VerificationCodeStatus::Active, Duration::zero()).await;

        assert!(!service.verify("1234", PHONE).await.unwrap());
        assert!(!service.verify("4821", "1112223333").await.unwrap());
        // a miss does not consume the real code
        assert!(service.verify("4821", PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_expired_code_is_retired() {
        let (service, _) = service().await;
        let record = insert_record(
            &service,
            "4821",
            VerificationCodeStatus::Active,
            Duration::minutes(11),
        )
        .await;

        assert!(!service.verify("4821", PHONE).await.unwrap());
        assert_eq!(
            find(&service, record.id).await.status,
            VerificationCodeStatus::Inactive
        );
    }

    #[tokio::test]
    async fn test_verify_within_window() {
        let (service, _) = service().await;
        insert_record(
            &service,
            "4821",
            VerificationCodeStatus::Active,
            Duration::minutes(9),
        )
        .await;

        assert!(service.verify("4821", PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_honours_configured_expiry() {
        let pool = memory_pool().await;
        let config = OtpConfig {
            expiry_ms: 1_000,
            ..OtpConfig::default()
        };
        let service = OtpService::new(pool, Arc::new(RecordingGateway::default()), config);
        insert_record(
            &service,
            "4821",
            VerificationCodeStatus::Active,
            Duration::seconds(5),
        )
        .await;

        assert!(!service.verify("4821", PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_with_unrepresentable_expiry() {
        let config = OtpConfig {
            expiry_ms: i64::MAX,
            ..OtpConfig::default()
        };
        let service = OtpService::new(
            memory_pool().await,
            Arc::new(RecordingGateway::default()),
            config,
        );
        let record = service.generate(PHONE).await.unwrap();

        assert!(service.verify(&record.code, PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_superseded_code_fails() {
        let (service, _) = service().await;
        let first = service.generate(PHONE).await.unwrap();
        let second = service.generate(PHONE).await.unwrap();

        if first.code != second.code {
            assert!(!service.verify(&first.code, PHONE).await.unwrap());
        }
        assert!(service.verify(&second.code, PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_uses_most_recent_row_for_repeated_code() {
        let (service, _) = service().await;
        // an old consumed row and the current active row share the same code
        insert_record(
            &service,
            "4821",
            VerificationCodeStatus::Inactive,
            Duration::hours(2),
        )
        .await;
        let current =
            insert_record(&service, "4821", VerificationCodeStatus::Active, Duration::zero())
                .await;

        assert!(service.verify("4821", PHONE).await.unwrap());
        assert!(!find(&service, current.id).await.is_active());
    }

    #[tokio::test]
    async fn test_scenario_generate_verify_verify() {
        let (service, _) = service().await;
        let record = service.generate(PHONE).await.unwrap();
        assert!(record.is_active());

        assert!(service.verify(&record.code, PHONE).await.unwrap());
        assert!(!find(&service, record.id).await.is_active());
        assert!(!service.verify(&record.code, PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_send_dispatches_template() {
        let (service, gateway) = service().await;
        let record = service.generate(PHONE).await.unwrap();

        assert!(service.send(&record).await.unwrap());

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, PHONE);
        assert_eq!(
            sent[0].1,
            format!(
                "Your one time password to access your account at Medicause is {}. Do not share it with anyone.",
                record.code
            )
        );
    }

    #[tokio::test]
    async fn test_send_without_code_does_nothing() {
        let (service, gateway) = service().await;
        let record = codes::Model {
            id: 1,
            code: String::new(),
            phone: PHONE.to_string(),
            status: VerificationCodeStatus::Active,
            created_at: Utc::now(),
        };

        assert!(!service.send(&record).await.unwrap());
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_propagates_gateway_failure() {
        let service = OtpService::new(
            memory_pool().await,
            Arc::new(FailingGateway),
            OtpConfig::default(),
        );
        let record = service.generate(PHONE).await.unwrap();

        let result = service.send(&record).await;
        assert!(matches!(result, Err(AppError::ExternalApiError(_))));
    }

    #[tokio::test]
    async fn test_request_generates_and_sends() {
        let (service, gateway) = service().await;
        let (record, delivered) = service.request(PHONE).await.unwrap();

        assert!(delivered);
        assert!(record.is_active());
        assert_eq!(gateway.sent.lock().unwrap().len(), 1);
    }
}
