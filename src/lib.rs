//! SmartBook API Library
//!
//! This crate provides the core functionality for the SmartBook bookstore API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use handlers::common::ApiResponse;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
    pub mailer: Arc<dyn notifications::Mailer>,
}

/// The `/api` route tree.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest("/products", handlers::products::routes())
        .nest("/cart", handlers::cart::routes())
        .nest("/wishlist", handlers::wishlist::routes())
        .nest("/orders", handlers::orders::routes())
        .nest("/seller", handlers::sellers::routes())
        .nest("/seller-requests", handlers::seller_requests::routes())
        .nest("/admin", handlers::admin::routes())
        .nest("/contact", handlers::contact::routes())
}
