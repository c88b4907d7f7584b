use crate::{
    entities::{product, wishlist, wishlist_item, Product, Wishlist, WishlistItem},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Wishlist service: a cart-shaped collection without pricing.
///
/// Created lazily on first read; duplicate adds conflict rather than
/// stacking quantities.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The user's wishlist, creating the row on first access.
    pub async fn get_view(&self, user_id: Uuid) -> Result<WishlistView, ServiceError> {
        let wishlist = Self::get_or_create(&*self.db, user_id).await?;
        self.build_view(wishlist).await
    }

    /// Add an active product; a product already present is a conflict.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistView, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound("Product not found or not available".to_string())
            })?;

        let wishlist = Self::get_or_create(&*self.db, user_id).await?;

        let existing = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Product already in wishlist".to_string(),
            ));
        }

        wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            wishlist_id: Set(wishlist.id),
            product_id: Set(product.id),
            added_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.build_view(wishlist).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistView, ServiceError> {
        let wishlist = self
            .find(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Wishlist not found".to_string()))?;

        WishlistItem::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        self.build_view(wishlist).await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<WishlistView, ServiceError> {
        let wishlist = self
            .find(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Wishlist not found".to_string()))?;

        WishlistItem::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .exec(&*self.db)
            .await?;

        self.build_view(wishlist).await
    }

    /// Whether the product is on the user's wishlist.
    pub async fn contains(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, ServiceError> {
        let Some(wishlist) = self.find(user_id).await? else {
            return Ok(false);
        };
        Ok(WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .is_some())
    }

    pub async fn item_count(&self, user_id: Uuid) -> Result<usize, ServiceError> {
        let Some(wishlist) = self.find(user_id).await? else {
            return Ok(0);
        };
        let items = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .all(&*self.db)
            .await?;
        Ok(items.len())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<wishlist::Model>, ServiceError> {
        Ok(Wishlist::find()
            .filter(wishlist::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?)
    }

    async fn get_or_create(
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<wishlist::Model, ServiceError> {
        let existing = Wishlist::find()
            .filter(wishlist::Column::UserId.eq(user_id))
            .one(conn)
            .await?;
        if let Some(wishlist) = existing {
            return Ok(wishlist);
        }

        Ok(wishlist::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?)
    }

    async fn build_view(&self, wishlist: wishlist::Model) -> Result<WishlistView, ServiceError> {
        let items = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = if product_ids.is_empty() {
            vec![]
        } else {
            Product::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(&*self.db)
                .await?
        };

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let Some(product) = products.iter().find(|p| p.id == item.product_id) else {
                continue;
            };
            lines.push(WishlistLineView {
                product_id: product.id,
                title: product.title.clone(),
                author: product.author.clone(),
                price: product.price,
                image: product.primary_image(),
                rating: product.rating,
                category: product.category.to_string(),
                added_at: item.added_at,
            });
        }

        let total_items = lines.len();
        Ok(WishlistView {
            id: wishlist.id,
            items: lines,
            total_items,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct WishlistLineView {
    pub product_id: Uuid,
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub rating: f32,
    pub category: String,
    pub added_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub id: Uuid,
    pub items: Vec<WishlistLineView>,
    pub total_items: usize,
}
