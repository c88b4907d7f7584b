//! Authentication and authorization.
//!
//! Bearer JWTs are resolved against the identity store on every guarded
//! request: a token that decodes but names an unknown or deactivated account
//! is rejected. Role checks are expressed as an allowed set attached to a
//! route group via [`AuthRouterExt`].

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{Role, User, UserModel};
use crate::errors::ErrorBody;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Caller identity attached to the request after token resolution.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn from_model(user: &UserModel) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            issuer: "smartbook-api".to_string(),
            audience: "smartbook-clients".to_string(),
            token_expiration,
        }
    }
}

/// Issues and verifies bearer tokens and resolves them to active accounts.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Issue a signed token for the given account. Returns the token and its
    /// lifetime in seconds.
    pub fn issue_token(&self, user: &UserModel) -> Result<(String, u64), AuthError> {
        let now = Utc::now().timestamp();
        let expires_in = self.config.token_expiration.as_secs();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.to_string(),
            iat: now,
            exp: now + expires_in as i64,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok((token, expires_in))
    }

    /// Decode and verify a token's signature, expiry, issuer and audience.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(data.claims)
    }

    /// Resolve verified claims to an active account.
    pub async fn resolve_user(&self, claims: &Claims) -> Result<UserModel, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(user)
    }

    /// Full bearer-token resolution: decode, verify, load, check active.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.validate_token(token)?;
        let user = self.resolve_user(&claims).await?;
        debug!(user = %user.email, role = %user.role, "authenticated");
        Ok(CurrentUser::from_model(&user))
    }
}

/// Hash a plaintext password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Generate a password-reset token. The raw value goes into the emailed
/// link; only its SHA-256 digest is stored.
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    let digest = digest_reset_token(&raw);
    (raw, digest)
}

pub fn digest_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized, token missing")]
    MissingToken,

    #[error("Token invalid or expired")]
    InvalidToken,

    #[error("Token invalid or expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Your account is deactivated. Contact support.")]
    AccountDeactivated,

    #[error("Access denied: insufficient privileges")]
    InsufficientRole,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::UserNotFound
            | Self::AccountDeactivated => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole => StatusCode::FORBIDDEN,
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "auth failure");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn auth_service(request: &Request) -> Result<Arc<AuthService>, Response> {
    request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response()
        })
}

/// Requires a valid bearer token resolving to an active account and attaches
/// [`CurrentUser`] to the request.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let service = match auth_service(&request) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let Some(token) = bearer_token(&request) else {
        return AuthError::MissingToken.into_response();
    };

    match service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Attaches [`CurrentUser`] when a valid token is present; proceeds as an
/// anonymous caller otherwise.
pub async fn optional_auth_middleware(mut request: Request, next: Next) -> Response {
    if let Ok(service) = auth_service(&request) {
        if let Some(token) = bearer_token(&request) {
            if let Ok(user) = service.authenticate(&token).await {
                request.extensions_mut().insert(user);
            }
        }
    }
    next.run(request).await
}

/// Rejects callers whose role is not in the allowed set. Must run inside
/// [`auth_middleware`].
pub async fn roles_middleware(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<CurrentUser>() else {
        return AuthError::MissingToken.into_response();
    };

    if !allowed.contains(&user.role) {
        debug!(required = ?allowed, got = %user.role, "role mismatch");
        return AuthError::InsufficientRole.into_response();
    }

    next.run(request).await
}

/// Extractor for the identity attached by [`auth_middleware`].
#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Extractor variant for routes behind [`optional_auth_middleware`].
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

/// Extension methods for Router to attach the auth middleware stack.
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_optional_auth(self) -> Self;
    fn with_roles(self, allowed: &'static [Role]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_optional_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(optional_auth_middleware))
    }

    /// Layers run bottom-up: the role check is layered first so that
    /// authentication runs before it.
    fn with_roles(self, allowed: &'static [Role]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            allowed,
            roles_middleware,
        ))
        .with_auth()
    }
}

/// Role sets used by the route tables.
pub mod gates {
    use crate::entities::Role;

    pub const ADMIN: &[Role] = &[Role::Admin];
    pub const SELLER: &[Role] = &[Role::Seller, Role::Admin];
    pub const ANY_USER: &[Role] = &[Role::User, Role::Seller, Role::Admin];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert_ne!(hash, "s3cret-pass");
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
    }

    #[test]
    fn test_reset_token_digest_is_stable() {
        let (raw, digest) = generate_reset_token();
        assert_eq!(raw.len(), 40);
        assert_eq!(digest, digest_reset_token(&raw));
        assert_ne!(raw, digest);
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
