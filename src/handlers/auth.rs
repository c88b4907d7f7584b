use crate::handlers::common::{
    map_service_error, message_response, success_response, success_with_message, validate_input,
};
use crate::{
    auth::{AuthRouterExt, CurrentUser},
    entities::Address,
    errors::{ApiError, ServiceError},
    notifications::templates,
    services::{OtpRequestOutcome, RegisterInput, UpdateProfileInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use validator::Validate;

/// Creates the router for authentication and account endpoints
pub fn routes() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", put(reset_password))
        .route("/send-otp-email", post(send_otp))
        .route("/verify-otp-email", post(verify_otp));

    let protected = Router::new()
        .route("/me", get(me))
        .route("/update", put(update_profile))
        .route("/address", post(add_address))
        .with_auth();

    public.merge(protected)
}

/// Exchange credentials for a bearer token
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(map_service_error)?;

    let (token, expires_in) = state
        .auth
        .issue_token(&user)
        .map_err(|e| map_service_error(ServiceError::InternalError(e.to_string())))?;

    Ok(success_with_message(
        "Login successful",
        json!({
            "token": token,
            "expires_in": expires_in,
            "user": {
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role,
            },
        }),
    ))
}

/// Current account profile
async fn me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .get(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "user": user })))
}

/// Update name, mobile and/or password
async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<UpdateProfileInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .update_profile(user.id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message("Profile updated", json!({ "user": user })))
}

/// Append an address to the address book
async fn add_address(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<Address>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let addresses = state
        .services
        .users
        .add_address(user.id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Address added",
        json!({ "addresses": addresses }),
    ))
}

/// Email a time-boxed password-reset link
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (user, raw_token) = state
        .services
        .users
        .start_password_reset(&payload.email)
        .await
        .map_err(map_service_error)?;

    // The email is the operation here; a delivery failure is surfaced.
    let reset_url = format!(
        "{}/reset-password.html?token={}",
        state.config.client_url, raw_token
    );
    state
        .mailer
        .send(
            &user.email,
            "Password Reset - SmartBook",
            &templates::password_reset(&user.name, &reset_url),
        )
        .await
        .map_err(|e| {
            map_service_error(ServiceError::ExternalServiceError(e.to_string()))
        })?;

    Ok(message_response("Password reset link sent to email"))
}

/// Complete the reset flow with the emailed token
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .users
        .reset_password(&token, &payload.password)
        .await
        .map_err(map_service_error)?;

    Ok(message_response(
        "Password reset successful. Please login with new password.",
    ))
}

/// Issue a registration OTP, suppressing resends while one is live
async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    if state
        .services
        .users
        .email_exists(&payload.email)
        .await
        .map_err(map_service_error)?
    {
        return Err(map_service_error(ServiceError::Conflict(
            "Account already exists. Please login.".to_string(),
        )));
    }

    match state
        .services
        .otp
        .request_code(&payload.email)
        .await
        .map_err(map_service_error)?
    {
        OtpRequestOutcome::AlreadySent => Ok(message_response(
            "OTP already sent. Please check your email.",
        )),
        OtpRequestOutcome::Issued(code) => {
            state
                .mailer
                .send(
                    &payload.email,
                    "SmartBook Email Verification OTP",
                    &templates::registration_otp(&code),
                )
                .await
                .map_err(|e| {
                    map_service_error(ServiceError::ExternalServiceError(e.to_string()))
                })?;

            Ok(message_response("OTP sent successfully"))
        }
    }
}

/// Verify the OTP and create the account
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let input = RegisterInput {
        name: payload.name,
        email: payload.email.clone(),
        mobile: payload.mobile,
        password: payload.password,
    };
    input.validate().map_err(map_service_error)?;

    state
        .services
        .otp
        .verify_and_consume(&payload.email, &payload.otp)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state.services.users.register(input).await {
        // The OTP is already consumed at this point; a duplicate email still
        // has to surface as a conflict.
        warn!(email = %payload.email, error = %e, "registration after OTP failed");
        return Err(map_service_error(e));
    }

    Ok(message_response("Signup successful! Please login now."))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub otp: String,
}
