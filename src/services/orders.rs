use crate::{
    entities::{
        cart, cart_item, order, order_item, order_status_history, product, Cart, CartItem, Order,
        OrderItem, OrderModel, OrderStatus, OrderStatusHistory, PaymentMethod, PaymentStatus,
        Product, User,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{templates, Mailer},
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::Address;

/// Free shipping above this subtotal; flat rate below it.
const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
const FLAT_SHIPPING_RATE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Order service: checkout, retrieval and status workflow.
///
/// Checkout runs as a single database transaction: stock is verified and
/// decremented, line snapshots and the order header are inserted, and the
/// cart is emptied, all atomically. A failed stock check aborts the whole
/// request with nothing applied. The confirmation email is sent only after
/// commit and is best-effort.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
        }
    }

    /// Create an order from the caller's cart.
    #[instrument(skip(self, input))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderDetail, ServiceError> {
        input.validate()?;

        let buyer = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Cart is empty".to_string()))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        // Snapshot lines and decrement stock. Lines whose product reference
        // has gone missing are skipped; any stock shortfall aborts the whole
        // transaction before anything is applied.
        let order_id = Uuid::new_v4();
        let mut subtotal = Decimal::ZERO;
        let mut snapshots = Vec::with_capacity(items.len());

        for item in &items {
            let Some(product) = Product::find_by_id(item.product_id).one(&txn).await? else {
                continue;
            };

            if product.stock < item.quantity {
                return Err(ServiceError::InsufficientStock(product.title));
            }

            subtotal += item.price * Decimal::from(item.quantity);

            snapshots.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                seller_id: Set(product.seller_id),
                title: Set(product.title.clone()),
                author: Set(product.author.clone()),
                image: Set(product.primary_image()),
                quantity: Set(item.quantity),
                price: Set(item.price),
                created_at: Set(Utc::now()),
            });

            let new_stock = product.stock - item.quantity;
            let new_sales = product.sales_count + item.quantity;
            let mut active: product::ActiveModel = product.into();
            active.stock = Set(new_stock);
            active.sales_count = Set(new_sales);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
        }

        if snapshots.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        let discount = cart.discount;
        let totals = order_totals(subtotal, discount);

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number()),
            user_id: Set(user_id),
            shipping_address: Set(serde_json::to_value(&input.shipping_address)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            payment_method: Set(input.payment_method),
            payment_status: Set(PaymentStatus::Pending),
            subtotal: Set(subtotal),
            shipping_cost: Set(totals.shipping_cost),
            tax: Set(totals.tax),
            discount: Set(discount),
            total_amount: Set(totals.total),
            status: Set(OrderStatus::Confirmed),
            notes: Set(input.notes),
            tracking_number: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            cancellation_reason: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let order = order.insert(&txn).await?;

        for snapshot in snapshots {
            snapshot.insert(&txn).await?;
        }

        // Initial history: the created-as-pending entry plus the transition
        // to confirmed.
        Self::append_history(&txn, order_id, OrderStatus::Pending, None).await?;
        Self::append_history(&txn, order_id, OrderStatus::Confirmed, None).await?;

        // Empty the cart; the order now owns the snapshots.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        let mut cart: cart::ActiveModel = cart.into();
        cart.subtotal = Set(Decimal::ZERO);
        cart.discount = Set(Decimal::ZERO);
        cart.final_amount = Set(Decimal::ZERO);
        cart.total_items = Set(0);
        cart.updated_at = Set(Utc::now());
        cart.update(&txn).await?;

        txn.commit().await?;

        // Best-effort confirmation; a delivery failure never rolls the order
        // back or fails the request.
        if let Err(e) = self
            .mailer
            .send(
                &buyer.email,
                "Your Order Confirmation",
                &templates::order_confirmation(&buyer.name, &order.order_number, order.total_amount),
            )
            .await
        {
            warn!(order = %order.order_number, error = %e, "order confirmation email not sent");
        }

        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;
        info!(order_number = %order.order_number, %user_id, "order placed");

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderDetail { order, items })
    }

    /// Orders belonging to one buyer, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderDetail>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        let details = self.attach_items(orders).await?;

        Ok((details, total))
    }

    /// Order by id; only the owner or an admin may read it.
    pub async fn get(&self, order_id: Uuid, requester: &Requester) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        Self::authorize_read(&order, requester)?;
        self.with_items(order).await
    }

    /// Order by public order number; same access rule as [`Self::get`].
    pub async fn track(
        &self,
        order_number: &str,
        requester: &Requester,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        Self::authorize_read(&order, requester)?;
        self.with_items(order).await
    }

    /// All orders, newest first (admin).
    pub async fn list_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderDetail>, u64), ServiceError> {
        let paginator = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        let details = self.attach_items(orders).await?;

        Ok((details, total))
    }

    /// Most recent orders for the admin dashboard.
    pub async fn recent(&self, limit: u64) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Orders containing at least one line for the given seller.
    pub async fn list_for_seller(
        &self,
        seller_id: Uuid,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        let line_order_ids: Vec<Uuid> = OrderItem::find()
            .filter(order_item::Column::SellerId.eq(seller_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|i| i.order_id)
            .collect();

        if line_order_ids.is_empty() {
            return Ok(vec![]);
        }

        let orders = Order::find()
            .filter(order::Column::Id.is_in(line_order_ids))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        self.attach_items(orders).await
    }

    /// Transition the order status, appending to the history log.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let old_status = order.status;

        let txn = self.db.begin().await?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        match new_status {
            OrderStatus::Delivered => active.delivered_at = Set(Some(Utc::now())),
            OrderStatus::Cancelled => {
                active.cancelled_at = Set(Some(Utc::now()));
                active.cancellation_reason = Set(note.clone());
            }
            _ => {}
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        Self::append_history(&txn, order_id, new_status, note).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;

        Ok(updated)
    }

    /// Payment-status changes are independent of the order status.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_status: PaymentStatus,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentStatusChanged {
                order_id,
                new_status,
            })
            .await;

        Ok(updated)
    }

    /// Append-only status history for one order, oldest first.
    pub async fn status_history(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_status_history::Model>, ServiceError> {
        Ok(OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(Order::find().count(&*self.db).await?)
    }

    /// Gross revenue over paid orders.
    pub async fn paid_revenue(&self) -> Result<Decimal, ServiceError> {
        let paid = Order::find()
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
            .all(&*self.db)
            .await?;
        Ok(paid.iter().map(|o| o.total_amount).sum())
    }

    fn authorize_read(order: &OrderModel, requester: &Requester) -> Result<(), ServiceError> {
        if order.user_id != requester.user_id && !requester.is_admin {
            return Err(ServiceError::Forbidden("Not authorized".to_string()));
        }
        Ok(())
    }

    async fn with_items(&self, order: OrderModel) -> Result<OrderDetail, ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        Ok(OrderDetail { order, items })
    }

    async fn attach_items(
        &self,
        orders: Vec<OrderModel>,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            details.push(self.with_items(order).await?);
        }
        Ok(details)
    }

    async fn append_history(
        conn: &impl ConnectionTrait,
        order_id: Uuid,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<(), ServiceError> {
        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(status),
            note: Set(note),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
        Ok(())
    }
}

/// Identifies the caller for ownership checks.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Checkout input
#[derive(Debug, Deserialize)]
pub struct PlaceOrderInput {
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl PlaceOrderInput {
    fn validate(&self) -> Result<(), ServiceError> {
        let addr = &self.shipping_address;
        for (field, value) in [
            ("street", &addr.street),
            ("city", &addr.city),
            ("state", &addr.state),
            ("zip_code", &addr.zip_code),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "Shipping address {field} is required"
                )));
            }
        }
        Ok(())
    }
}

/// Order header plus its line snapshots.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<crate::entities::OrderItemModel>,
}

/// Derived checkout figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Checkout pricing: free shipping at or above 500, flat 50 below; 18% tax
/// on the discounted subtotal, rounded to whole currency units half-up.
pub fn order_totals(subtotal: Decimal, discount: Decimal) -> OrderTotals {
    let shipping_cost = if subtotal >= FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING_RATE
    };

    let taxable = subtotal - discount;
    let tax = (taxable * Decimal::new(18, 2))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let total = subtotal - discount + shipping_cost + tax;

    OrderTotals {
        shipping_cost,
        tax,
        total,
    }
}

/// Generate a public order number: `ORD` + the trailing six digits of the
/// current epoch milliseconds + a random three-digit tie-breaker, so two
/// orders created within the same millisecond still get distinct numbers.
pub fn generate_order_number() -> String {
    use rand::Rng;
    let millis = Utc::now().timestamp_millis();
    let random: u16 = rand::thread_rng().gen_range(0..1000);
    format_order_number(millis, random)
}

fn format_order_number(millis: i64, random: u16) -> String {
    let timestamp = millis.to_string();
    let suffix = &timestamp[timestamp.len().saturating_sub(6)..];
    format!("ORD{suffix}{random:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = order_totals(dec!(500), Decimal::ZERO);
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let totals = order_totals(dec!(499), Decimal::ZERO);
        assert_eq!(totals.shipping_cost, dec!(50));
    }

    #[test]
    fn test_totals_over_free_shipping_scenario() {
        // 600 x 1, no discount: shipping 0, tax round(0.18*600)=108, total 708
        let totals = order_totals(dec!(600), Decimal::ZERO);
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
        assert_eq!(totals.tax, dec!(108));
        assert_eq!(totals.total, dec!(708));
    }

    #[test]
    fn test_totals_under_free_shipping_scenario() {
        // subtotal 300: shipping 50, tax round(0.18*300)=54, total 404
        let totals = order_totals(dec!(300), Decimal::ZERO);
        assert_eq!(totals.shipping_cost, dec!(50));
        assert_eq!(totals.tax, dec!(54));
        assert_eq!(totals.total, dec!(404));
    }

    #[test]
    fn test_tax_applies_to_discounted_subtotal() {
        let totals = order_totals(dec!(600), dec!(100));
        assert_eq!(totals.tax, dec!(90));
        assert_eq!(totals.total, dec!(590));
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.18 * 25 = 4.5 -> 5
        let totals = order_totals(dec!(25), Decimal::ZERO);
        assert_eq!(totals.tax, dec!(5));
    }

    #[test]
    fn test_order_number_format() {
        let number = format_order_number(1_700_000_123_456, 7);
        assert_eq!(number, "ORD123456007");
        assert!(number.starts_with("ORD"));
        assert_eq!(number.len(), 12);
    }

    #[test]
    fn test_order_numbers_distinct_within_same_millisecond() {
        let a = format_order_number(1_700_000_123_456, 1);
        let b = format_order_number(1_700_000_123_456, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_place_order_input_requires_address_fields() {
        let input = PlaceOrderInput {
            shipping_address: Address {
                kind: Default::default(),
                street: "".to_string(),
                city: "Pune".to_string(),
                state: "MH".to_string(),
                zip_code: "411001".to_string(),
                country: "India".to_string(),
                phone: None,
                is_default: false,
            },
            payment_method: PaymentMethod::Cod,
            notes: None,
        };
        assert!(matches!(
            input.validate(),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
