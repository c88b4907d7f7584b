use crate::{
    entities::{product, Category, Product, ProductImage, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Book catalog service.
///
/// Public browse endpoints only ever see active products; sellers and
/// admins operate on the full set (sellers restricted to their own rows).
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Paginated browse with an optional category filter.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut query = Product::find();

        if !filter.include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category) = filter.category {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(seller_id) = filter.seller_id {
            query = query.filter(product::Column::SellerId.eq(seller_id));
        }

        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((products, total))
    }

    /// Everything a seller has listed, active or not.
    pub async fn list_for_seller(
        &self,
        seller_id: Uuid,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::SellerId.eq(seller_id))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Catalog detail. `include_inactive` is false for anonymous browse.
    pub async fn get_product(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<ProductModel, ServiceError> {
        let product = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if !product.is_active && !include_inactive {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        seller_id: Uuid,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            author: Set(input.author.unwrap_or_else(|| "Unknown Author".to_string())),
            description: Set(input
                .description
                .unwrap_or_else(|| "No description available".to_string())),
            price: Set(input.price),
            original_price: Set(input.original_price),
            stock: Set(input.stock.unwrap_or(10)),
            category: Set(input.category.unwrap_or(Category::General)),
            images: Set(serde_json::to_value(input.images.unwrap_or_default())
                .unwrap_or(serde_json::Value::Array(vec![]))),
            rating: Set(0.0),
            reviews_count: Set(0),
            view_count: Set(0),
            sales_count: Set(0),
            seller_id: Set(seller_id),
            is_active: Set(true),
            is_featured: Set(input.is_featured.unwrap_or(false)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!(product_id = %product.id, "created product");
        Ok(product)
    }

    /// Partial update. When `only_for_seller` is set, the product must belong
    /// to that seller or the call fails with not-found.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        only_for_seller: Option<Uuid>,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if matches!(input.price, Some(p) if p < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let product = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(seller_id) = only_for_seller {
            if product.seller_id != seller_id {
                return Err(ServiceError::NotFound("Product not found".to_string()));
            }
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(author) = input.author {
            active.author = Set(author);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(original_price) = input.original_price {
            active.original_price = Set(Some(original_price));
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(images) = input.images {
            active.images =
                Set(serde_json::to_value(images).unwrap_or(serde_json::Value::Array(vec![])));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_featured) = input.is_featured {
            active.is_featured = Set(is_featured);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Hard delete; past orders keep their own snapshots.
    #[instrument(skip(self))]
    pub async fn delete_product(
        &self,
        id: Uuid,
        only_for_seller: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let product = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(seller_id) = only_for_seller {
            if product.seller_id != seller_id {
                return Err(ServiceError::NotFound("Product not found".to_string()));
            }
        }

        Product::delete_by_id(id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(Product::find().count(&*self.db).await?)
    }
}

/// Catalog listing filter
#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub seller_id: Option<Uuid>,
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category: Option<Category>,
    pub images: Option<Vec<ProductImage>>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category: Option<Category>,
    pub images: Option<Vec<ProductImage>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}
