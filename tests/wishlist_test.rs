mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use smartbook_api::{entities::Role, errors::ServiceError, services::UpdateProductInput};

#[tokio::test]
async fn test_wishlist_created_on_first_read() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let wishlist = app.state.services.wishlist.get_view(user.id).await.unwrap();
    assert!(wishlist.items.is_empty());
    assert_eq!(wishlist.total_items, 0);

    // Second read returns the same list.
    let again = app.state.services.wishlist.get_view(user.id).await.unwrap();
    assert_eq!(again.id, wishlist.id);
}

#[tokio::test]
async fn test_add_check_and_count() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(250), 5).await;

    let wishlist = app
        .state
        .services
        .wishlist
        .add_item(user.id, book.id)
        .await
        .unwrap();
    assert_eq!(wishlist.total_items, 1);
    assert_eq!(wishlist.items[0].title, book.title);

    assert!(app
        .state
        .services
        .wishlist
        .contains(user.id, book.id)
        .await
        .unwrap());
    assert_eq!(
        app.state
            .services
            .wishlist
            .item_count(user.id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_duplicate_add_conflicts() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(250), 5).await;

    app.state
        .services
        .wishlist
        .add_item(user.id, book.id)
        .await
        .unwrap();

    let result = app.state.services.wishlist.add_item(user.id, book.id).await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_inactive_product_cannot_be_added() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(250), 5).await;

    app.state
        .services
        .catalog
        .update_product(
            book.id,
            None,
            UpdateProductInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = app.state.services.wishlist.add_item(user.id, book.id).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let first = app.seed_product(dec!(100), 5).await;
    let second = app.seed_product(dec!(200), 5).await;

    for book in [&first, &second] {
        app.state
            .services
            .wishlist
            .add_item(user.id, book.id)
            .await
            .unwrap();
    }

    let wishlist = app
        .state
        .services
        .wishlist
        .remove_item(user.id, first.id)
        .await
        .unwrap();
    assert_eq!(wishlist.total_items, 1);
    assert_eq!(wishlist.items[0].product_id, second.id);

    let wishlist = app.state.services.wishlist.clear(user.id).await.unwrap();
    assert!(wishlist.items.is_empty());
}
