mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use smartbook_api::{
    entities::{Address, OrderStatus, PaymentMethod, PaymentStatus, Role},
    errors::ServiceError,
    services::{AddItemInput, PlaceOrderInput, Requester, UpdateProductInput},
};

fn shipping_address() -> Address {
    Address {
        kind: Default::default(),
        street: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        zip_code: "560001".to_string(),
        country: "India".to_string(),
        phone: Some("9876543210".to_string()),
        is_default: false,
    }
}

fn order_input() -> PlaceOrderInput {
    PlaceOrderInput {
        shipping_address: shipping_address(),
        payment_method: PaymentMethod::Cod,
        notes: None,
    }
}

#[tokio::test]
async fn test_checkout_over_free_shipping_threshold() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(600), 5).await;

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

    let detail = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await
        .expect("checkout should succeed");

    assert_eq!(detail.order.subtotal, dec!(600));
    assert_eq!(detail.order.shipping_cost, Decimal::ZERO);
    assert_eq!(detail.order.tax, dec!(108));
    assert_eq!(detail.order.total_amount, dec!(708));
    assert_eq!(detail.order.status, OrderStatus::Confirmed);
    assert_eq!(detail.order.payment_status, PaymentStatus::Pending);
    assert_eq!(detail.items.len(), 1);
}

#[tokio::test]
async fn test_checkout_under_free_shipping_threshold() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(300), 5).await;

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

    let detail = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await
        .unwrap();

    assert_eq!(detail.order.shipping_cost, dec!(50));
    assert_eq!(detail.order.tax, dec!(54));
    assert_eq!(detail.order.total_amount, dec!(404));
}

#[tokio::test]
async fn test_snapshots_keep_cart_prices_not_live_prices() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(500), 5).await;

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

    // Reprice the catalog after the cart snapshotted the line.
    app.state
        .services
        .catalog
        .update_product(
            book.id,
            None,
            UpdateProductInput {
                price: Some(dec!(999)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let detail = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await
        .unwrap();

    assert_eq!(detail.items[0].price, dec!(500));
    assert_eq!(detail.order.subtotal, dec!(1000));
}

#[tokio::test]
async fn test_checkout_empties_cart_and_decrements_stock() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(600), 5).await;

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
        .orders
        .place_order(user.id, order_input())
        .await
        .unwrap();

    let cart = app.state.services.cart.get_view(user.id).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.discount, Decimal::ZERO);

    let product = app
        .state
        .services
        .catalog
        .get_product(book.id, true)
        .await
        .unwrap();
    assert_eq!(product.stock, 3);
    assert_eq!(product.sales_count, 2);
}

#[tokio::test]
async fn test_insufficient_stock_aborts_without_partial_application() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let plenty = app.seed_product(dec!(200), 10).await;
    let scarce = app.seed_product(dec!(300), 5).await;

    for (product, qty) in [(&plenty, 2), (&scarce, 5)] {
        app.state
            .services
            .cart
            .add_item(
                user.id,
                AddItemInput {
                    product_id: product.id,
                    quantity: qty,
                },
            )
            .await
            .unwrap();
    }

    // Drain the scarce title after it entered the cart.
    app.state
        .services
        .catalog
        .update_product(
            scarce.id,
            None,
            UpdateProductInput {
                stock: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    // Nothing was applied: the first line's stock is untouched and the cart
    // still holds both lines.
    let plenty_now = app
        .state
        .services
        .catalog
        .get_product(plenty.id, true)
        .await
        .unwrap();
    assert_eq!(plenty_now.stock, 10);
    assert_eq!(plenty_now.sales_count, 0);

    let count = app.state.services.cart.item_count(user.id).await.unwrap();
    assert_eq!(count, 7);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;

    let result = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn test_order_numbers_are_distinct() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(100), 50).await;

    let mut numbers = Vec::new();
    for _ in 0..3 {
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
        let detail = app
            .state
            .services
            .orders
            .place_order(user.id, order_input())
            .await
            .unwrap();
        numbers.push(detail.order.order_number);
    }

    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 3);
}

#[tokio::test]
async fn test_confirmation_email_recorded() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(600), 5).await;

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

    let detail = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await
        .unwrap();

    let sent = app.mailer.sent_to(&user.email);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains(&detail.order.order_number));
}

#[tokio::test]
async fn test_owner_check_on_retrieval_and_tracking() {
    let app = TestApp::new().await;
    let buyer = app.seed_user(Role::User).await;
    let stranger = app.seed_user(Role::User).await;
    let admin = app.seed_user(Role::Admin).await;
    let book = app.seed_product(dec!(600), 5).await;

    app.state
        .services
        .cart
        .add_item(
            buyer.id,
            AddItemInput {
                product_id: book.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    let detail = app
        .state
        .services
        .orders
        .place_order(buyer.id, order_input())
        .await
        .unwrap();

    let stranger_req = Requester {
        user_id: stranger.id,
        is_admin: false,
    };
    assert_matches!(
        app.state
            .services
            .orders
            .get(detail.order.id, &stranger_req)
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let admin_req = Requester {
        user_id: admin.id,
        is_admin: true,
    };
    assert!(app
        .state
        .services
        .orders
        .track(&detail.order.order_number, &admin_req)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_status_updates_append_history() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(600), 5).await;

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
    let detail = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await
        .unwrap();

    let history = app
        .state
        .services
        .orders
        .status_history(detail.order.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, OrderStatus::Pending);
    assert_eq!(history[1].status, OrderStatus::Confirmed);

    app.state
        .services
        .orders
        .update_status(detail.order.id, OrderStatus::Shipped, None)
        .await
        .unwrap();
    let order = app
        .state
        .services
        .orders
        .update_status(
            detail.order.id,
            OrderStatus::Delivered,
            Some("left at door".to_string()),
        )
        .await
        .unwrap();
    assert!(order.delivered_at.is_some());

    let history = app
        .state
        .services
        .orders
        .status_history(detail.order.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].status, OrderStatus::Delivered);
    assert_eq!(history[3].note.as_deref(), Some("left at door"));
}

#[tokio::test]
async fn test_payment_status_independent_of_order_status() {
    let app = TestApp::new().await;
    let user = app.seed_user(Role::User).await;
    let book = app.seed_product(dec!(600), 5).await;

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
    let detail = app
        .state
        .services
        .orders
        .place_order(user.id, order_input())
        .await
        .unwrap();

    let order = app
        .state
        .services
        .orders
        .update_payment_status(detail.order.id, PaymentStatus::Paid)
        .await
        .unwrap();

    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Confirmed);

    // History tracks order-status transitions only.
    let history = app
        .state
        .services
        .orders
        .status_history(detail.order.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}
