use crate::{
    entities::{cart, cart_item, product, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::CouponService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Maximum quantity of a single title per cart.
const MAX_QUANTITY_PER_ITEM: i32 = 10;

/// Shopping cart service.
///
/// One cart per user, created lazily on the first add. Every mutation
/// recomputes the persisted totals from the line items; the response view
/// additionally filters out lines whose product has gone missing or
/// inactive, so presented totals only cover currently purchasable lines.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    coupons: Arc<CouponService>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        coupons: Arc<CouponService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            coupons,
        }
    }

    /// The user's cart as presented to the storefront.
    pub async fn get_view(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        self.build_view(user_id).await
    }

    /// Total number of units across all lines.
    pub async fn item_count(&self, user_id: Uuid) -> Result<i32, ServiceError> {
        let Some(cart) = self.find_cart(user_id).await? else {
            return Ok(0);
        };
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;
        Ok(items.iter().map(|i| i.quantity).sum())
    }

    /// Add a product to the cart, merging with an existing line.
    ///
    /// The cumulative quantity is capped at [`MAX_QUANTITY_PER_ITEM`] and at
    /// the product's stock; the unit price snapshot is refreshed on merge.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddItemInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let product = Self::purchasable_product(&txn, input.product_id).await?;
        if product.stock < input.quantity {
            return Err(ServiceError::ValidationError(
                "Insufficient stock".to_string(),
            ));
        }

        let cart = Self::get_or_create_cart(&txn, user_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        if let Some(item) = existing {
            let new_quantity = item.quantity + input.quantity;
            if new_quantity > MAX_QUANTITY_PER_ITEM || new_quantity > product.stock {
                return Err(ServiceError::ValidationError(
                    "Quantity exceeds limit".to_string(),
                ));
            }
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(new_quantity);
            item.price = Set(product.price);
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(input.product_id),
                quantity: Set(input.quantity),
                price: Set(product.price),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
        }

        Self::persist_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartUpdated(cart.id)).await;
        info!(%user_id, product_id = %input.product_id, quantity = input.quantity, "added cart item");

        self.build_view(user_id).await
    }

    /// Replace a line's quantity, refreshing the price snapshot.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if !(1..=MAX_QUANTITY_PER_ITEM).contains(&quantity) {
            return Err(ServiceError::ValidationError(
                "Quantity must be 1-10".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = Self::purchasable_product(&txn, product_id).await?;
        if quantity > product.stock {
            return Err(ServiceError::ValidationError(
                "Insufficient stock".to_string(),
            ));
        }

        let cart = Self::require_cart(&txn, user_id).await?;

        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not in cart".to_string()))?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.price = Set(product.price);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        Self::persist_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartUpdated(cart.id)).await;

        self.build_view(user_id).await
    }

    /// Drop a line entirely.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::require_cart(&txn, user_id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;

        Self::persist_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartUpdated(cart.id)).await;

        self.build_view(user_id).await
    }

    /// Look up a coupon code and apply its discount to the cart.
    ///
    /// Unknown, disabled or expired codes fail with not-found; a valid
    /// free-shipping code legitimately yields a zero discount.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, user_id: Uuid, code: &str) -> Result<CartView, ServiceError> {
        let cart = self
            .find_cart(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;
        let subtotal: Decimal = items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum();

        let discount = self.coupons.discount_for(code, subtotal).await?;

        let cart_id = cart.id;
        let mut active: cart::ActiveModel = cart.into();
        active.discount = Set(discount);
        active.update(&*self.db).await?;
        Self::persist_totals(&*self.db, cart_id).await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id,
                code: code.to_string(),
            })
            .await;

        self.build_view(user_id).await
    }

    /// Empty the cart and zero the discount. The cart row itself survives.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        if let Some(cart) = Self::find_cart_on(&txn, user_id).await? {
            CartItem::delete_many()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .exec(&txn)
                .await?;

            let cart_id = cart.id;
            let mut active: cart::ActiveModel = cart.into();
            active.discount = Set(Decimal::ZERO);
            active.update(&txn).await?;
            Self::persist_totals(&txn, cart_id).await?;
        }

        txn.commit().await?;

        self.build_view(user_id).await
    }

    async fn find_cart(&self, user_id: Uuid) -> Result<Option<cart::Model>, ServiceError> {
        Self::find_cart_on(&*self.db, user_id).await
    }

    async fn find_cart_on(
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<Option<cart::Model>, ServiceError> {
        Ok(Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?)
    }

    async fn require_cart(
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        Self::find_cart_on(conn, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))
    }

    async fn get_or_create_cart(
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        if let Some(cart) = Self::find_cart_on(conn, user_id).await? {
            return Ok(cart);
        }

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            subtotal: Set(Decimal::ZERO),
            discount: Set(Decimal::ZERO),
            final_amount: Set(Decimal::ZERO),
            total_items: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        Ok(cart.insert(conn).await?)
    }

    /// Product that exists and is purchasable, or not-found.
    async fn purchasable_product(
        conn: &impl ConnectionTrait,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if !product.is_active {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        Ok(product)
    }

    /// Recompute and persist the derived totals from the stored line items.
    async fn persist_totals(
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;

        let cart = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let lines: Vec<(Decimal, i32)> = items.iter().map(|i| (i.price, i.quantity)).collect();
        let totals = cart_totals(&lines, cart.discount);

        let mut active: cart::ActiveModel = cart.into();
        active.subtotal = Set(totals.subtotal);
        active.total_items = Set(totals.total_items);
        active.final_amount = Set(totals.final_amount);
        active.updated_at = Set(Utc::now());

        Ok(active.update(conn).await?)
    }

    /// Assemble the storefront view, dropping lines whose product is gone or
    /// inactive. The persisted cart still contains those stale entries.
    async fn build_view(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let Some(cart) = self.find_cart(user_id).await? else {
            return Ok(CartView::empty());
        };

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = if product_ids.is_empty() {
            vec![]
        } else {
            Product::find()
                .filter(product::Column::Id.is_in(product_ids))
                .filter(product::Column::IsActive.eq(true))
                .all(&*self.db)
                .await?
        };

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let Some(product) = products.iter().find(|p| p.id == item.product_id) else {
                continue;
            };
            lines.push(CartLineView {
                product_id: product.id,
                title: product.title.clone(),
                author: product.author.clone(),
                image: product.primary_image(),
                price: item.price,
                quantity: item.quantity,
                line_total: item.price * Decimal::from(item.quantity),
                stock: product.stock,
            });
        }

        let totals = cart_totals(
            &lines
                .iter()
                .map(|l| (l.price, l.quantity))
                .collect::<Vec<_>>(),
            cart.discount,
        );

        Ok(CartView {
            id: Some(cart.id),
            items: lines,
            subtotal: totals.subtotal,
            discount: cart.discount,
            total_items: totals.total_items,
            final_amount: totals.final_amount,
        })
    }
}

/// Derived cart figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub total_items: i32,
    pub final_amount: Decimal,
}

/// Pure totals arithmetic: `final_amount` never goes below zero.
pub fn cart_totals(lines: &[(Decimal, i32)], discount: Decimal) -> CartTotals {
    let subtotal: Decimal = lines
        .iter()
        .map(|(price, qty)| *price * Decimal::from(*qty))
        .sum();
    let total_items: i32 = lines.iter().map(|(_, qty)| qty).sum();
    let final_amount = (subtotal - discount).max(Decimal::ZERO);

    CartTotals {
        subtotal,
        total_items,
        final_amount,
    }
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize, Validate)]
pub struct AddItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
}

/// Cart line as presented to the storefront
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub stock: i32,
}

/// Cart as presented to the storefront
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: Option<Uuid>,
    pub items: Vec<CartLineView>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_items: i32,
    pub final_amount: Decimal,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            id: None,
            items: vec![],
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            total_items: 0,
            final_amount: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_totals_sum_over_lines() {
        let totals = cart_totals(&[(dec!(100), 2), (dec!(50), 3)], Decimal::ZERO);
        assert_eq!(totals.subtotal, dec!(350));
        assert_eq!(totals.total_items, 5);
        assert_eq!(totals.final_amount, dec!(350));
    }

    #[test]
    fn test_final_amount_floors_at_zero() {
        let totals = cart_totals(&[(dec!(40), 1)], dec!(100));
        assert_eq!(totals.subtotal, dec!(40));
        assert_eq!(totals.final_amount, Decimal::ZERO);
    }

    #[test]
    fn test_discount_reduces_final_amount() {
        let totals = cart_totals(&[(dec!(600), 1)], dec!(100));
        assert_eq!(totals.final_amount, dec!(500));
    }

    #[test]
    fn test_empty_cart_totals() {
        let totals = cart_totals(&[], Decimal::ZERO);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total_items, 0);
        assert_eq!(totals.final_amount, Decimal::ZERO);
    }

    #[test]
    fn test_add_item_input_bounds() {
        use validator::Validate;

        let ok = AddItemInput {
            product_id: Uuid::new_v4(),
            quantity: 10,
        };
        assert!(ok.validate().is_ok());

        let too_many = AddItemInput {
            product_id: Uuid::new_v4(),
            quantity: 11,
        };
        assert!(too_many.validate().is_err());

        let zero = AddItemInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(zero.validate().is_err());
    }
}
