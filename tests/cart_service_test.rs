mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use smartbook_api::{
    entities::Role,
    errors::ServiceError,
    services::AddItemInput,
};

#[tokio::test]
async fn test_add_item_computes_totals() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(250), 10).await;

    let cart = app
        .state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 2,
            },
        )
        .await
        .expect("add should succeed");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.subtotal, dec!(500));
    assert_eq!(cart.total_items, 2);
    assert_eq!(cart.discount, Decimal::ZERO);
    assert_eq!(cart.final_amount, dec!(500));
}

#[tokio::test]
async fn test_add_same_product_merges_lines() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(100), 10).await;

    for _ in 0..2 {
        app.state
            .services
            .cart
            .add_item(
                user.id,
                AddItemInput {
                    product_id: book.id,
                    quantity: 3,
                },
            )
            .await
            .expect("add should succeed");
    }

    let cart = app.state.services.cart.get_view(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 6);
    assert_eq!(cart.subtotal, dec!(600));
}

#[tokio::test]
async fn test_cumulative_quantity_capped_at_ten() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(100), 50).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 8,
            },
        )
        .await
        .unwrap();

    let result = app
        .state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 5,
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn test_over_stock_add_fails_and_leaves_cart_unchanged() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let scarce = app.seed_product(dec!(300), 2).await;

    let result = app
        .state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: scarce.id,
                quantity: 5,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    let cart = app.state.services.cart.get_view(user.id).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal, Decimal::ZERO);
    assert_eq!(cart.final_amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let result = app
        .state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: uuid::Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_update_and_remove_item() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(120), 10).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let cart = app
        .state
        .services
        .cart
        .update_item(user.id, book.id, 4)
        .await
        .expect("update should succeed");
    assert_eq!(cart.items[0].quantity, 4);
    assert_eq!(cart.subtotal, dec!(480));

    let cart = app
        .state
        .services
        .cart
        .remove_item(user.id, book.id)
        .await
        .expect("remove should succeed");
    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal, Decimal::ZERO);
}

#[tokio::test]
async fn test_percentage_coupon_halves_subtotal() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .ensure_default_coupons()
        .await
        .unwrap();

    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(400), 10).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let cart = app
        .state
        .services
        .cart
        .apply_coupon(user.id, "DISCOUNT50")
        .await
        .expect("coupon should apply");

    assert_eq!(cart.discount, dec!(200));
    assert_eq!(cart.final_amount, dec!(200));
}

#[tokio::test]
async fn test_unknown_coupon_is_explicit_not_found() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .ensure_default_coupons()
        .await
        .unwrap();

    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(400), 10).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let result = app
        .state
        .services
        .cart
        .apply_coupon(user.id, "BOGUS")
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_fixed_coupon_floors_final_amount_at_zero() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .ensure_default_coupons()
        .await
        .unwrap();

    let user = app.seed_user(Role::User).await;
    let cheap = app.seed_product(dec!(40), 10).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: cheap.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let cart = app
        .state
        .services
        .cart
        .apply_coupon(user.id, "NEWUSER100")
        .await
        .unwrap();

    assert_eq!(cart.discount, dec!(100));
    assert_eq!(cart.final_amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_view_filters_deactivated_products() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(150), 10).await;
    let other = app.seed_product(dec!(200), 10).await;

    for product in [&book, &other] {
        app.state
            .services
            .cart
            .add_item(
                user.id,
                AddItemInput {
                    product_id: product.id,
                    quantity: 1,
                },
            )
            .await
            .unwrap();
    }

    // Deactivate one line's product after it is already in the cart.
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

    let cart = app.state.services.cart.get_view(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, other.id);
    assert_eq!(cart.subtotal, dec!(200));

    // The stale line is retained in persistence: count still covers it.
    let count = app.state.services.cart.item_count(user.id).await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_clear_empties_items_and_discount() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .ensure_default_coupons()
        .await
        .unwrap();

    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(400), 10).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: book.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    app.state
        .services
        .cart
        .apply_coupon(user.id, "DISCOUNT50")
        .await
        .unwrap();

    let cart = app.state.services.cart.clear(user.id).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.discount, Decimal::ZERO);
    assert_eq!(cart.final_amount, Decimal::ZERO);
    assert_eq!(cart.total_items, 0);
}
