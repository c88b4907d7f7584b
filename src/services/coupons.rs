use crate::{
    entities::{coupon, Coupon, CouponModel, CouponRule},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Coupon lookup and discount computation.
///
/// Codes are data-driven rows rather than hard-coded matches; an unknown,
/// disabled or expired code is an explicit not-found, distinct from a valid
/// code that happens to grant zero discount (free shipping).
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Resolve a code to its rule, or fail with not-found.
    #[instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<CouponModel, ServiceError> {
        let coupon = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {code} not found")))?;

        if !coupon.is_active {
            return Err(ServiceError::NotFound(format!("Coupon {code} not found")));
        }
        if let Some(expires_at) = coupon.expires_at {
            if expires_at < Utc::now() {
                return Err(ServiceError::NotFound(format!("Coupon {code} has expired")));
            }
        }

        Ok(coupon)
    }

    /// Discount granted by `code` against the given subtotal.
    pub async fn discount_for(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<Decimal, ServiceError> {
        let coupon = self.find_by_code(code).await?;
        Ok(compute_discount(coupon.rule, coupon.value, subtotal))
    }

    /// Insert the stock coupon codes if they are not present yet. Idempotent;
    /// called once at startup.
    pub async fn ensure_default_coupons(&self) -> Result<(), ServiceError> {
        let defaults = [
            ("DISCOUNT50", CouponRule::Percentage, Decimal::from(50)),
            ("NEWUSER100", CouponRule::Fixed, Decimal::from(100)),
            ("FREESHIP", CouponRule::FreeShipping, Decimal::ZERO),
        ];

        for (code, rule, value) in defaults {
            let exists = Coupon::find()
                .filter(coupon::Column::Code.eq(code))
                .one(&*self.db)
                .await?
                .is_some();
            if exists {
                continue;
            }

            coupon::ActiveModel {
                id: Set(Uuid::new_v4()),
                code: Set(code.to_string()),
                rule: Set(rule),
                value: Set(value),
                is_active: Set(true),
                expires_at: Set(None),
                created_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await?;
            info!(%code, "seeded coupon");
        }

        Ok(())
    }
}

/// Pure discount arithmetic.
///
/// Percentage discounts are floored to whole currency units; free-shipping
/// codes grant no cart discount.
pub fn compute_discount(rule: CouponRule, value: Decimal, subtotal: Decimal) -> Decimal {
    match rule {
        CouponRule::Percentage => (subtotal * value / Decimal::from(100)).floor(),
        CouponRule::Fixed => value,
        CouponRule::FreeShipping => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentage_discount_is_floored() {
        let discount = compute_discount(CouponRule::Percentage, dec!(50), dec!(599));
        assert_eq!(discount, dec!(299));
    }

    #[test]
    fn test_fixed_discount_ignores_subtotal() {
        let discount = compute_discount(CouponRule::Fixed, dec!(100), dec!(50));
        assert_eq!(discount, dec!(100));
    }

    #[test]
    fn test_free_shipping_grants_zero_discount() {
        let discount = compute_discount(CouponRule::FreeShipping, Decimal::ZERO, dec!(1000));
        assert_eq!(discount, Decimal::ZERO);
    }

    #[test]
    fn test_half_off_even_subtotal() {
        let discount = compute_discount(CouponRule::Percentage, dec!(50), dec!(600));
        assert_eq!(discount, dec!(300));
    }
}
