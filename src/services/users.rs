use crate::{
    auth::{digest_reset_token, generate_reset_token, hash_password, verify_password},
    entities::{user, Address, Role, User, UserModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Indian mobile number: optional +91/0 prefix, ten digits starting 6-9.
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+91)?0?[6-9]\d{9}$").expect("mobile regex"));

/// Reset links expire after fifteen minutes.
const RESET_TOKEN_TTL_MINUTES: i64 = 15;

const MIN_PASSWORD_LENGTH: usize = 6;

/// Identity store operations: credentials, profiles, password reset and the
/// admin user-management surface.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Credential check. A deactivated account fails regardless of password
    /// correctness, and an unknown email is indistinguishable from a wrong
    /// password.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserModel, ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid credentials".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::AuthError(
                "Account is deactivated".to_string(),
            ));
        }

        if !verify_password(password, &user.password_hash) {
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        Ok(user)
    }

    /// Create an account. Called by the OTP verification flow.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        input.validate()?;

        let email = input.email.to_lowercase();
        if self.email_exists(&email).await? {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(email),
            mobile: Set(input.mobile),
            password_hash: Set(hash_password(&input.password)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            role: Set(Role::User),
            is_active: Set(true),
            addresses: Set(serde_json::Value::Array(vec![])),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let user = user.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserRegistered(user.id))
            .await;

        info!(email = %user.email, "registered user");
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, ServiceError> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&*self.db)
            .await?
            .is_some())
    }

    pub async fn get(&self, id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, ServiceError> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&*self.db)
            .await?)
    }

    /// Update name, mobile and/or password on the caller's own profile.
    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<UserModel, ServiceError> {
        input.validate()?;

        let user = self.get(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(mobile) = input.mobile {
            active.mobile = Set(mobile);
        }
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(&password)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Append an address to the caller's address book.
    #[instrument(skip(self, address))]
    pub async fn add_address(
        &self,
        id: Uuid,
        address: Address,
    ) -> Result<Vec<Address>, ServiceError> {
        let user = self.get(id).await?;
        let mut addresses = user.address_book();
        addresses.push(address);

        let updated = addresses.clone();
        let mut active: user::ActiveModel = user.into();
        active.addresses = Set(serde_json::to_value(addresses)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        Ok(updated)
    }

    /// Begin the forgot-password flow: store a digest of a fresh token and
    /// return the raw token for the emailed link.
    #[instrument(skip(self))]
    pub async fn start_password_reset(
        &self,
        email: &str,
    ) -> Result<(UserModel, String), ServiceError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No user found with that email".to_string()))?;

        let (raw, digest) = generate_reset_token();

        let mut active: user::ActiveModel = user.clone().into();
        active.reset_token_hash = Set(Some(digest));
        active.reset_token_expires_at =
            Set(Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES)));
        active.updated_at = Set(Utc::now());
        let user = active.update(&*self.db).await?;

        Ok((user, raw))
    }

    /// Complete the forgot-password flow with the raw token from the link.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::ValidationError(
                "Password must be at least 6 characters long".to_string(),
            ));
        }

        let digest = digest_reset_token(raw_token);
        let user = User::find()
            .filter(user::Column::ResetTokenHash.eq(digest))
            .one(&*self.db)
            .await?;

        let user = match user {
            Some(u) if matches!(u.reset_token_expires_at, Some(exp) if exp > Utc::now()) => u,
            _ => {
                return Err(ServiceError::ValidationError(
                    "Invalid or expired token".to_string(),
                ))
            }
        };

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(new_password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?);
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        Ok(())
    }

    // Admin surface

    pub async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<UserModel>, u64), ServiceError> {
        let paginator = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    #[instrument(skip(self))]
    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<UserModel, ServiceError> {
        let user = self.get(id).await?;
        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Flip the active flag; deactivation locks the account out of login and
    /// token resolution.
    #[instrument(skip(self))]
    pub async fn toggle_active(&self, id: Uuid) -> Result<UserModel, ServiceError> {
        let user = self.get(id).await?;
        let was_active = user.is_active;
        let mut active: user::ActiveModel = user.into();
        active.is_active = Set(!was_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        if was_active {
            self.event_sender
                .send_or_log(Event::UserDeactivated(updated.id))
                .await;
        }

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        User::delete_by_id(id).exec(&*self.db).await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(User::find().count(&*self.db).await?)
    }
}

/// Registration input, validated before the OTP code is even issued.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Name is required".to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(ServiceError::ValidationError(
                "Please enter a valid email address".to_string(),
            ));
        }
        if !MOBILE_RE.is_match(&self.mobile) {
            return Err(ServiceError::ValidationError(
                "Please enter a valid 10-digit mobile number".to_string(),
            ));
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::ValidationError(
                "Password must be at least 6 characters long".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
}

impl UpdateProfileInput {
    fn validate(&self) -> Result<(), ServiceError> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }
        if let Some(mobile) = &self.mobile {
            if !MOBILE_RE.is_match(mobile) {
                return Err(ServiceError::ValidationError(
                    "Please enter a valid 10-digit mobile number".to_string(),
                ));
            }
        }
        if matches!(&self.password, Some(p) if p.len() < MIN_PASSWORD_LENGTH) {
            return Err(ServiceError::ValidationError(
                "Password must be at least 6 characters long".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RegisterInput {
        RegisterInput {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            mobile: "9876543210".to_string(),
            password: "reading".to_string(),
        }
    }

    #[test]
    fn test_register_input_accepts_valid_data() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_mobile_validation() {
        let mut bad = input();
        bad.mobile = "12345".to_string();
        assert!(bad.validate().is_err());

        let mut prefixed = input();
        prefixed.mobile = "+919876543210".to_string();
        assert!(prefixed.validate().is_ok());

        let mut leading_zero = input();
        leading_zero.mobile = "09876543210".to_string();
        assert!(leading_zero.validate().is_ok());

        let mut starts_low = input();
        starts_low.mobile = "5876543210".to_string();
        assert!(starts_low.validate().is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut bad = input();
        bad.password = "abc".to_string();
        assert!(bad.validate().is_err());
    }
}
