mod common;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::TestApp;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use smartbook_api::{
    entities::Role,
    errors::ServiceError,
    services::{OtpRequestOutcome, RegisterInput},
};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_otp_registration_flow() {
    let app = TestApp::new().await;
    let email = "new-reader@example.com";

    let outcome = app.state.services.otp.request_code(email).await.unwrap();
    let code = match outcome {
        OtpRequestOutcome::Issued(code) => code,
        OtpRequestOutcome::AlreadySent => panic!("expected a fresh code"),
    };
    assert_eq!(code.len(), 6);

    // A second request while the code is live is suppressed.
    assert_eq!(
        app.state.services.otp.request_code(email).await.unwrap(),
        OtpRequestOutcome::AlreadySent
    );

    // Wrong code is rejected, right code is consumed.
    assert_matches!(
        app.state
            .services
            .otp
            .verify_and_consume(email, "000000")
            .await,
        Err(ServiceError::ValidationError(_))
    );
    app.state
        .services
        .otp
        .verify_and_consume(email, &code)
        .await
        .expect("correct code should verify");

    // Consumed: verifying again finds nothing.
    assert_matches!(
        app.state.services.otp.verify_and_consume(email, &code).await,
        Err(ServiceError::NotFound(_))
    );

    let user = app
        .state
        .services
        .users
        .register(RegisterInput {
            name: "New Reader".to_string(),
            email: email.to_string(),
            mobile: "9876543210".to_string(),
            password: "reading123".to_string(),
        })
        .await
        .expect("registration should succeed");
    assert_eq!(user.role, Role::User);

    // Duplicate registration conflicts.
    let duplicate = app
        .state
        .services
        .users
        .register(RegisterInput {
            name: "Imposter".to_string(),
            email: email.to_string(),
            mobile: "9876543211".to_string(),
            password: "reading123".to_string(),
        })
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_login_over_http() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": user.email, "password": "password123" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].as_str().is_some());
    assert_eq!(body["data"]["user"]["role"], "user");
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": user.email, "password": "nope-nope" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_deactivated_account_cannot_login_even_with_correct_password() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    app.state
        .services
        .users
        .toggle_active(user.id)
        .await
        .unwrap();

    let result = app
        .state
        .services
        .users
        .authenticate(&user.email, "password123")
        .await;
    assert_matches!(result, Err(ServiceError::AuthError(_)));
}

#[tokio::test]
async fn test_deactivated_account_token_is_rejected() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let token = app.token_for(&user);

    app.state
        .services
        .users
        .toggle_active(user.id)
        .await
        .unwrap();

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_token_and_role_gate_holds() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let token = app.token_for(&user);

    // No token
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // With token
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["email"], user.email.as_str());
    // The password hash never serializes.
    assert!(body["data"]["user"].get("password_hash").is_none());

    // A plain user is forbidden from the admin surface.
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/admin/dashboard")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let (_user, raw_token) = app
        .state
        .services
        .users
        .start_password_reset(&user.email)
        .await
        .unwrap();

    app.state
        .services
        .users
        .reset_password(&raw_token, "fresh-password")
        .await
        .expect("reset should succeed");

    // The token is single-use.
    assert_matches!(
        app.state
            .services
            .users
            .reset_password(&raw_token, "another-one")
            .await,
        Err(ServiceError::ValidationError(_))
    );

    // Old password gone, new one works.
    assert_matches!(
        app.state
            .services
            .users
            .authenticate(&user.email, "password123")
            .await,
        Err(ServiceError::AuthError(_))
    );
    assert!(app
        .state
        .services
        .users
        .authenticate(&user.email, "fresh-password")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_inactive_products_visible_only_with_admin_token() {
    let app = TestApp::new().await;
    let admin = app.seed_user(Role::Admin).await;
    let book = app.seed_product(rust_decimal_macros::dec!(250), 4).await;

    app.state
        .services
        .catalog
        .update_product(
            book.id,
            None,
            smartbook_api::services::UpdateProductInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Anonymous browse: hidden.
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(format!("/api/products/{}", book.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Admin token on the same public route: visible.
    let token = app.token_for(&admin);
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(format!("/api/products/{}", book.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_catalog_needs_no_token() {
    let app = TestApp::new().await;
    app.seed_product(rust_decimal_macros::dec!(250), 4).await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);
}
