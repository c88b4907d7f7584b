use crate::{
    entities::{email_otp, EmailOtp},
    errors::ServiceError,
};
use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Codes stay valid for five minutes.
const OTP_TTL_MINUTES: i64 = 5;

/// Registration one-time codes, backed by a durable keyed store with a TTL
/// column so codes survive restarts and work across instances.
#[derive(Clone)]
pub struct OtpService {
    db: Arc<DatabaseConnection>,
}

/// Result of requesting a code for an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpRequestOutcome {
    /// A live code already exists; no new one is issued.
    AlreadySent,
    /// A fresh code was issued; the caller emails it.
    Issued(String),
}

impl OtpService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Issue a six-digit code for the email, unless a live one exists.
    #[instrument(skip(self))]
    pub async fn request_code(&self, email: &str) -> Result<OtpRequestOutcome, ServiceError> {
        let email = email.to_lowercase();

        if let Some(existing) = self.find(&email).await? {
            if existing.expires_at > Utc::now() {
                return Ok(OtpRequestOutcome::AlreadySent);
            }
            EmailOtp::delete_by_id(existing.id).exec(&*self.db).await?;
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(100_000..1_000_000));

        email_otp::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            code: Set(code.clone()),
            expires_at: Set(Utc::now() + Duration::minutes(OTP_TTL_MINUTES)),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(%email, "issued registration OTP");
        Ok(OtpRequestOutcome::Issued(code))
    }

    /// Check a submitted code; the stored row is consumed on success and on
    /// expiry.
    #[instrument(skip(self, code))]
    pub async fn verify_and_consume(&self, email: &str, code: &str) -> Result<(), ServiceError> {
        let email = email.to_lowercase();

        let record = self.find(&email).await?.ok_or_else(|| {
            ServiceError::NotFound("No OTP found. Please request again.".to_string())
        })?;

        if record.expires_at < Utc::now() {
            EmailOtp::delete_by_id(record.id).exec(&*self.db).await?;
            return Err(ServiceError::ValidationError(
                "OTP expired. Please request again.".to_string(),
            ));
        }

        if record.code != code {
            return Err(ServiceError::ValidationError("Invalid OTP".to_string()));
        }

        EmailOtp::delete_by_id(record.id).exec(&*self.db).await?;
        Ok(())
    }

    /// Drop every expired row. Called opportunistically; correctness never
    /// depends on it since reads check the expiry themselves.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        let result = EmailOtp::delete_many()
            .filter(email_otp::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn find(&self, email: &str) -> Result<Option<email_otp::Model>, ServiceError> {
        Ok(EmailOtp::find()
            .filter(email_otp::Column::Email.eq(email))
            .one(&*self.db)
            .await?)
    }
}
