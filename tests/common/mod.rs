#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use smartbook_api::{
    auth::{hash_password, AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{product, user, Category, ProductModel, Role, UserModel},
    events,
    handlers::AppServices,
    notifications::{Mailer, MemoryMailer},
    AppState,
};
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by a scratch
/// SQLite database.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub mailer: Arc<MemoryMailer>,
    db_file: PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file =
            std::env::temp_dir().join(format!("smartbook_test_{}.db", Uuid::new_v4().simple()));
        let database_url = format!("sqlite://{}?mode=rwc", db_file.display());

        let mut cfg = AppConfig::new(
            database_url,
            "test_secret_key_for_testing_purposes_only_padded_to_sixty_four_chars!!",
            3600,
            "127.0.0.1",
            0,
            "test",
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db_arc = Arc::new(pool);

        let (event_sender, event_rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let mailer = Arc::new(MemoryMailer::new());
        let dyn_mailer: Arc<dyn Mailer> = mailer.clone();

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::new(cfg.jwt_secret.clone(), Duration::from_secs(cfg.jwt_expiration)),
            db_arc.clone(),
        ));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            dyn_mailer.clone(),
            &cfg,
        );

        let state = Arc::new(AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth: auth_service,
            mailer: dyn_mailer,
        });

        Self {
            state,
            mailer,
            db_file,
            _event_task: event_task,
        }
    }

    /// Full router as served by the binary, with the auth-service extension
    /// layer attached.
    pub fn router(&self) -> Router {
        let auth = self.state.auth.clone();
        Router::new()
            .merge(smartbook_api::handlers::health::routes())
            .nest("/api", smartbook_api::api_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth,
                |axum::extract::State(auth): axum::extract::State<
                    Arc<smartbook_api::auth::AuthService>,
                >,
                 mut req: axum::extract::Request,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(self.state.clone())
    }

    /// Insert an account directly, skipping the OTP flow.
    pub async fn seed_user(&self, role: Role) -> UserModel {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            name: Set(format!("Test User {}", &id.simple().to_string()[..8])),
            email: Set(format!("user-{}@example.com", id.simple())),
            mobile: Set("9876543210".to_string()),
            password_hash: Set(hash_password("password123").expect("hash")),
            role: Set(role),
            is_active: Set(true),
            addresses: Set(serde_json::Value::Array(vec![])),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed user")
    }

    /// Insert an active catalog product with the given price and stock.
    pub async fn seed_product(&self, price: Decimal, stock: i32) -> ProductModel {
        self.seed_product_for_seller(Uuid::new_v4(), price, stock)
            .await
    }

    pub async fn seed_product_for_seller(
        &self,
        seller_id: Uuid,
        price: Decimal,
        stock: i32,
    ) -> ProductModel {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            title: Set(format!("Book {}", &id.simple().to_string()[..8])),
            author: Set("Test Author".to_string()),
            description: Set("A test title".to_string()),
            price: Set(price),
            original_price: Set(None),
            stock: Set(stock),
            category: Set(Category::Fiction),
            images: Set(serde_json::json!([
                { "url": "images/cover.jpg", "is_primary": true }
            ])),
            rating: Set(0.0),
            reviews_count: Set(0),
            view_count: Set(0),
            sales_count: Set(0),
            seller_id: Set(seller_id),
            is_active: Set(true),
            is_featured: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed product")
    }

    /// Bearer token for a seeded account.
    pub fn token_for(&self, user: &UserModel) -> String {
        let (token, _) = self.state.auth.issue_token(user).expect("issue token");
        token
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}
