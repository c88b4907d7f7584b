use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entity for books.
///
/// `price` is the current list price; carts and orders snapshot it at the
/// moment a line is added, so later edits never rewrite history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub original_price: Option<Decimal>,
    pub stock: i32,
    pub category: Category,
    /// Cover and gallery images, stored as a JSON list of [`ProductImage`].
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    pub rating: f32,
    pub reviews_count: i32,
    pub view_count: i32,
    pub sales_count: i32,
    pub seller_id: Uuid,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// First image URL, used where only one cover is shown (cart lines,
    /// order snapshots).
    pub fn primary_image(&self) -> Option<String> {
        let images: Vec<ProductImage> = serde_json::from_value(self.images.clone()).ok()?;
        images
            .iter()
            .find(|i| i.is_primary)
            .or_else(|| images.first())
            .map(|i| i.url.clone())
    }
}

/// Book category enumeration
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[sea_orm(string_value = "fiction")]
    Fiction,
    #[sea_orm(string_value = "non-fiction")]
    NonFiction,
    #[sea_orm(string_value = "education")]
    Education,
    #[sea_orm(string_value = "children")]
    Children,
    #[sea_orm(string_value = "biography")]
    Biography,
    #[sea_orm(string_value = "self-help")]
    SelfHelp,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "technology")]
    Technology,
    #[sea_orm(string_value = "general")]
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_string_values() {
        use std::str::FromStr;
        assert_eq!(Category::NonFiction.to_string(), "non-fiction");
        assert_eq!(Category::from_str("self-help").unwrap(), Category::SelfHelp);
        assert!(Category::from_str("cooking").is_err());
    }
}
