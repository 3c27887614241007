//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use betsmile::db::DatabaseConfig;
use betsmile::ledger::{LedgerError, SettingsStore};
use betsmile::settings::{GameSettings, WarmUpScope};
use betsmile::{AccountId, payments::CryptoCloudConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Keep the ledger in memory instead of PostgreSQL
    pub use_memory: bool,
    /// Security configuration
    pub security: SecurityConfig,
    /// Payment provider configuration
    pub payments: PaymentConfig,
    /// Where notices are POSTed; logged only when unset
    pub notify_webhook_url: Option<String>,
    pub notify_timeout_secs: u64,
    /// Prometheus scrape address; metrics disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Game settings installed when the store has none yet
    pub game_defaults: GameSettings,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Shared secret the chat front end presents as a bearer token (required)
    pub frontend_token: String,
    /// Accounts allowed to run admin intents
    pub admin_ids: Vec<AccountId>,
}

/// Payment provider configuration
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_key: String,
    pub shop_id: String,
    pub base_url: String,
    pub currency: String,
    pub timeout_secs: u64,
    pub reconcile_interval_secs: u64,
}

impl PaymentConfig {
    pub fn cryptocloud(&self) -> CryptoCloudConfig {
        CryptoCloudConfig {
            base_url: self.base_url.clone(),
            currency: self.currency.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            ..CryptoCloudConfig::new(&self.api_key, &self.shop_id)
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory_override` - Use the in-memory ledger (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory_override: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required_or("SERVER_BIND", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
        };

        // Database configuration
        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| "postgres://postgres@localhost/betsmile".to_string());

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 2),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 10),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
            transaction_timeout_secs: parse_env_or("DB_TRANSACTION_TIMEOUT_SECS", 10),
        };

        let use_memory = memory_override || parse_env_or("USE_MEMORY_STORE", false);

        // Security configuration (REQUIRED)
        let frontend_token = required("FRONTEND_TOKEN", "Generate with: openssl rand -hex 32")?;
        let admin_ids = match std::env::var("ADMIN_IDS") {
            Ok(raw) => parse_admin_ids(&raw)?,
            Err(_) => Vec::new(),
        };

        let security = SecurityConfig {
            frontend_token,
            admin_ids,
        };

        let payments = PaymentConfig {
            api_key: required("CRYPTOCLOUD_API_KEY", "Copy it from the CryptoCloud merchant dashboard")?,
            shop_id: required("CRYPTOCLOUD_SHOP_ID", "Copy it from the CryptoCloud merchant dashboard")?,
            base_url: std::env::var("CRYPTOCLOUD_BASE_URL")
                .unwrap_or_else(|_| betsmile::payments::DEFAULT_BASE_URL.to_string()),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
            timeout_secs: parse_env_or("PAYMENT_TIMEOUT_SECS", 10),
            reconcile_interval_secs: parse_env_or(
                "RECONCILE_INTERVAL_SECS",
                betsmile::payments::DEFAULT_RECONCILE_INTERVAL.as_secs(),
            ),
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("{raw:?} is not an IP:PORT address"),
            })?),
            Err(_) => None,
        };

        // Game defaults; amounts are in cents
        let base = GameSettings::default();
        let game_defaults = GameSettings {
            demo_win_chance: parse_env_or("DEMO_WIN_CHANCE", base.demo_win_chance),
            real_win_chance: parse_env_or("REAL_WIN_CHANCE", base.real_win_chance),
            max_consecutive_wins: parse_env_or("MAX_CONSECUTIVE_WINS", base.max_consecutive_wins),
            warm_up_wins: parse_env_or("WARM_UP_WINS", base.warm_up_wins),
            warm_up_scope: parse_env_or::<WarmUpScope>("WARM_UP_SCOPE", base.warm_up_scope),
            min_bet: parse_env_or("MIN_BET", base.min_bet),
            max_bet: parse_env_or("MAX_BET", base.max_bet),
            min_deposit: parse_env_or("MIN_DEPOSIT", base.min_deposit),
            min_withdraw: parse_env_or("MIN_WITHDRAW", base.min_withdraw),
            starting_demo_balance: parse_env_or("STARTING_DEMO_BALANCE", base.starting_demo_balance),
            multipliers: base.multipliers,
        };

        Ok(ServerConfig {
            bind,
            database,
            use_memory,
            security,
            payments,
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            notify_timeout_secs: parse_env_or("NOTIFY_TIMEOUT_SECS", 5),
            metrics_bind,
            game_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.frontend_token.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "FRONTEND_TOKEN".to_string(),
                reason: "Must be at least 16 characters".to_string(),
            });
        }

        if self.security.admin_ids.is_empty() {
            return Err(ConfigError::Invalid {
                var: "ADMIN_IDS".to_string(),
                reason: "At least one admin account id is required".to_string(),
            });
        }

        if self.payments.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "PAYMENT_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.payments.reconcile_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RECONCILE_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !self.use_memory && self.database.database_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty unless the memory store is used".to_string(),
            });
        }

        self.game_defaults
            .validate()
            .map_err(|e| ConfigError::Invalid {
                var: "game settings".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Settings store error: {0}")]
    Store(#[from] LedgerError),
}

/// Game settings to start with.
///
/// Settings an admin saved earlier win over `defaults` but are validated
/// like any other source. On first start the defaults are stored.
pub async fn load_game_settings<S: SettingsStore + ?Sized>(
    store: &S,
    defaults: GameSettings,
) -> Result<GameSettings, ConfigError> {
    match store.load_settings().await? {
        Some(saved) => {
            saved.validate().map_err(|e| ConfigError::Invalid {
                var: "stored game settings".to_string(),
                reason: e.to_string(),
            })?;
            log::info!("Loaded game settings from the store");
            Ok(saved)
        }
        None => {
            store.save_settings(&defaults).await?;
            log::info!("Stored default game settings");
            Ok(defaults)
        }
    }
}

fn required(var: &str, hint: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingRequired {
        var: var.to_string(),
        hint: hint.to_string(),
    })
}

/// Parse a comma-separated list of account ids
fn parse_admin_ids(raw: &str) -> Result<Vec<AccountId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                var: "ADMIN_IDS".to_string(),
                reason: format!("{s:?} is not an account id"),
            })
        })
        .collect()
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env_or`], but a present and unparsable value is an error
fn parse_env_required_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
