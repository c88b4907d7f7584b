mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use smartbook_api::{
    entities::{BusinessType, RequestStatus, Role, SellerStatus},
    errors::ServiceError,
    services::SubmitRequestInput,
};

fn request_input() -> SubmitRequestInput {
    SubmitRequestInput {
        business_name: "Paper Trails".to_string(),
        business_type: BusinessType::Bookstore,
        description: "Independent bookstore in Pune".to_string(),
        business_address: Some(serde_json::json!({
            "street": "4 FC Road", "city": "Pune", "state": "MH", "zip_code": "411004"
        })),
        contact_info: Some(serde_json::json!({
            "phone": "9876543210", "email": "owner@papertrails.example"
        })),
        documents: None,
    }
}

#[tokio::test]
async fn test_submit_creates_pending_request() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let request = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .expect("submission should succeed");

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.user_id, user.id);

    let open = app.state.services.sellers.open_requests().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].user.as_ref().unwrap().email, user.email);
}

#[tokio::test]
async fn test_second_open_request_conflicts() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    app.state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .unwrap();

    let result = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_approval_creates_profile_and_promotes_user() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let admin = app.seed_user(Role::Admin).await;

    let request = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .unwrap();

    let approved = app
        .state
        .services
        .sellers
        .approve_request(request.id, admin.id)
        .await
        .expect("approval should succeed");

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(admin.id));
    assert!(approved.reviewed_at.is_some());

    let profile = app
        .state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .expect("profile should exist");
    assert_eq!(profile.business_name, "Paper Trails");
    assert_eq!(profile.status, SellerStatus::Approved);
    assert_eq!(profile.commission_rate, dec!(10));

    let promoted = app.state.services.users.get(user.id).await.unwrap();
    assert_eq!(promoted.role, Role::Seller);

    // Requester received the approval notice.
    let sent = app.mailer.sent_to(&user.email);
    assert!(sent
        .iter()
        .any(|m| m.subject.contains("Approved")));
}

#[tokio::test]
async fn test_reject_stores_reason_and_notifies() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let admin = app.seed_user(Role::Admin).await;

    let request = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .unwrap();

    let rejected = app
        .state
        .services
        .sellers
        .reject_request(request.id, admin.id, Some("Incomplete documents".to_string()))
        .await
        .unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Incomplete documents")
    );

    let sent = app.mailer.sent_to(&user.email);
    assert!(sent.iter().any(|m| m.subject.contains("Rejected")));

    // A rejected request no longer blocks a fresh submission.
    assert!(app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_reviewed_request_cannot_be_reviewed_again() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let admin = app.seed_user(Role::Admin).await;

    let request = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .unwrap();

    app.state
        .services
        .sellers
        .approve_request(request.id, admin.id)
        .await
        .unwrap();

    let again = app
        .state
        .services
        .sellers
        .approve_request(request.id, admin.id)
        .await;
    assert_matches!(again, Err(ServiceError::InvalidOperation(_)));

    let reject_after = app
        .state
        .services
        .sellers
        .reject_request(request.id, admin.id, None)
        .await;
    assert_matches!(reject_after, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn test_reapproval_after_suspension_reactivates_profile() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let admin = app.seed_user(Role::Admin).await;

    let first = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .unwrap();
    app.state
        .services
        .sellers
        .approve_request(first.id, admin.id)
        .await
        .unwrap();

    let profile = app.state.services.sellers.get_profile(user.id).await.unwrap();
    app.state
        .services
        .sellers
        .update_status(profile.id, SellerStatus::Suspended)
        .await
        .unwrap();

    // A fresh request approved again promotes the same profile row.
    let mut input = request_input();
    input.business_name = "Paper Trails Reborn".to_string();
    let second = app
        .state
        .services
        .sellers
        .submit_request(user.id, input)
        .await
        .unwrap();
    app.state
        .services
        .sellers
        .approve_request(second.id, admin.id)
        .await
        .unwrap();

    let profile_after = app
        .state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .unwrap();
    assert_eq!(profile_after.id, profile.id);
    assert_eq!(profile_after.status, SellerStatus::Approved);
    assert_eq!(profile_after.business_name, "Paper Trails Reborn");
}

#[tokio::test]
async fn test_commission_bounds() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let admin = app.seed_user(Role::Admin).await;

    let request = app
        .state
        .services
        .sellers
        .submit_request(user.id, request_input())
        .await
        .unwrap();
    app.state
        .services
        .sellers
        .approve_request(request.id, admin.id)
        .await
        .unwrap();
    let profile = app.state.services.sellers.get_profile(user.id).await.unwrap();

    let updated = app
        .state
        .services
        .sellers
        .update_commission(profile.id, dec!(25))
        .await
        .unwrap();
    assert_eq!(updated.commission_rate, dec!(25));

    let too_high = app
        .state
        .services
        .sellers
        .update_commission(profile.id, dec!(51))
        .await;
    assert_matches!(too_high, Err(ServiceError::ValidationError(_)));
}
