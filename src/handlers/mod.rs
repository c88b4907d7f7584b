pub mod admin;
pub mod auth;
pub mod cart;
pub mod common;
pub mod contact;
pub mod health;
pub mod orders;
pub mod products;
pub mod seller_requests;
pub mod sellers;
pub mod wishlist;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::notifications::Mailer;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<crate::services::UserService>,
    pub otp: Arc<crate::services::OtpService>,
    pub catalog: Arc<crate::services::CatalogService>,
    pub coupons: Arc<crate::services::CouponService>,
    pub cart: Arc<crate::services::CartService>,
    pub wishlist: Arc<crate::services::WishlistService>,
    pub orders: Arc<crate::services::OrderService>,
    pub sellers: Arc<crate::services::SellerService>,
    pub contact: Arc<crate::services::ContactService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        config: &AppConfig,
    ) -> Self {
        let users = Arc::new(crate::services::UserService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let otp = Arc::new(crate::services::OtpService::new(db.clone()));
        let catalog = Arc::new(crate::services::CatalogService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let coupons = Arc::new(crate::services::CouponService::new(db.clone()));
        let cart = Arc::new(crate::services::CartService::new(
            db.clone(),
            event_sender.clone(),
            coupons.clone(),
        ));
        let wishlist = Arc::new(crate::services::WishlistService::new(db.clone()));
        let orders = Arc::new(crate::services::OrderService::new(
            db.clone(),
            event_sender.clone(),
            mailer.clone(),
        ));
        let sellers = Arc::new(crate::services::SellerService::new(
            db.clone(),
            event_sender,
            mailer.clone(),
            config.client_url.clone(),
            config.admin_email.clone(),
        ));
        let contact = Arc::new(crate::services::ContactService::new(
            db,
            mailer,
            config.admin_email.clone(),
        ));

        Self {
            users,
            otp,
            catalog,
            coupons,
            cart,
            wishlist,
            orders,
            sellers,
            contact,
        }
    }
}
