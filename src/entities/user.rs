use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account entity backing the identity store.
///
/// The password hash and reset-token fields are never serialized; API
/// responses carry the model directly.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub mobile: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    /// Saved address book, stored as a JSON list of [`Address`] values.
    #[sea_orm(column_type = "Json")]
    pub addresses: Json,
    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Deserialized address book; tolerates a malformed column by returning
    /// an empty list.
    pub fn address_book(&self) -> Vec<Address> {
        serde_json::from_value(self.addresses.clone()).unwrap_or_default()
    }
}

/// Account role, checked by the route guards.
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
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "seller")]
    Seller,
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// Postal address, embedded in the user address book and snapshotted onto
/// orders at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    #[default]
    Home,
    Work,
    Other,
}

fn default_country() -> String {
    "India".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_strings() {
        use std::str::FromStr;
        for (role, s) in [
            (Role::User, "user"),
            (Role::Seller, "seller"),
            (Role::Admin, "admin"),
        ] {
            assert_eq!(role.to_string(), s);
            assert_eq!(Role::from_str(s).unwrap(), role);
        }
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn test_address_defaults() {
        let addr: Address = serde_json::from_str(
            r#"{"street":"12 MG Road","city":"Bengaluru","state":"KA","zip_code":"560001"}"#,
        )
        .unwrap();
        assert_eq!(addr.kind, AddressKind::Home);
        assert_eq!(addr.country, "India");
        assert!(!addr.is_default);
    }
}
