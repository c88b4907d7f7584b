use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64))]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_env")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// Base URL of the storefront, used in emailed links
    #[serde(default = "default_client_url")]
    pub client_url: String,

    /// Address receiving operational notifications (new seller requests,
    /// contact messages). Sending is skipped when unset.
    #[serde(default)]
    pub admin_email: Option<String>,

    /// Transactional mail provider API key; the no-op mailer is used when
    /// unset.
    #[serde(default)]
    pub mail_api_key: Option<String>,

    /// Transactional mail provider endpoint
    #[serde(default = "default_mail_api_url")]
    pub mail_api_url: String,

    #[serde(default = "default_mail_sender_name")]
    pub mail_sender_name: String,

    #[serde(default = "default_mail_sender_email")]
    pub mail_sender_email: String,
}

fn default_jwt_expiration() -> u64 {
    7 * 24 * 60 * 60
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_env() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_client_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_mail_api_url() -> String {
    "https://api.brevo.com/v3/smtp/email".to_string()
}
fn default_mail_sender_name() -> String {
    "SmartBook".to_string()
}
fn default_mail_sender_email() -> String {
    "no-reply@smartbook.example".to_string()
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling; skips file/env layering.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        jwt_expiration: u64,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration,
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            client_url: default_client_url(),
            admin_email: None,
            mail_api_key: None,
            mail_api_url: default_mail_api_url(),
            mail_sender_name: default_mail_sender_name(),
            mail_sender_email: default_mail_sender_email(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    /// Permissive CORS is acceptable in development or behind an explicit
    /// override; production must configure origins.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Load configuration from `config/{default,<env>}.toml` plus
/// `APP__`-prefixed environment variables (e.g. `APP__DATABASE_URL`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("environment", environment.clone())?
        .add_source(File::from(Path::new(CONFIG_DIR).join("default.toml")).required(false))
        .add_source(
            File::from(Path::new(CONFIG_DIR).join(format!("{environment}.toml"))).required(false),
        )
        .add_source(Environment::with_prefix("APP").separator("__"));

    // Development convenience only; production must provide a real secret.
    if environment == DEFAULT_ENV {
        builder = builder.set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?;
        builder = builder.set_default("database_url", "sqlite://smartbook.db?mode=rwc")?;
    }

    let config: AppConfig = builder.build()?.try_deserialize()?;

    config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    if config.environment != DEFAULT_ENV && config.jwt_secret == DEV_DEFAULT_JWT_SECRET {
        return Err(ConfigError::Message(
            "the development JWT secret cannot be used outside development".to_string(),
        ));
    }

    Ok(config)
}

/// Install the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smartbook_api={log_level},tower_http=info")));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }

    info!("tracing initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_cors_only_in_development_by_default() {
        let mut cfg = AppConfig::new("sqlite::memory:", "x".repeat(64), 3600, "127.0.0.1", 0, "production");
        assert!(!cfg.should_allow_permissive_cors());
        cfg.cors_allow_any_origin = true;
        assert!(cfg.should_allow_permissive_cors());

        let cfg = AppConfig::new("sqlite::memory:", "x".repeat(64), 3600, "127.0.0.1", 0, "development");
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let cfg = AppConfig::new("sqlite::memory:", "short", 3600, "127.0.0.1", 0, "test");
        assert!(cfg.validate().is_err());
    }
}
