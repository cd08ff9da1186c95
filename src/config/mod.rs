//! Configuration management module.
//!
//! Supports loading configuration from:
//! - A `.env` file in the working directory
//! - TOML files (config/default.toml, config/{profile}.toml)
//! - Environment variables with `MAQUINAS__<SECTION>__<KEY>` pattern

mod server;
mod storage;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

pub use server::ServerConfig;
pub use storage::{FileStorageConfig, PostgresStorageConfig, StorageBackend, StorageConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{MAQUINAS_PROFILE}.toml` (if `MAQUINAS_PROFILE` is set)
    /// 3. Environment variables with `MAQUINAS__` prefix
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        dotenvy::dotenv().ok();

        let profile =
            std::env::var("MAQUINAS_PROFILE").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{profile}")).required(false))
            // MAQUINAS__SERVER__PORT=8080 -> server.port = 8080
            .add_source(
                Environment::with_prefix("MAQUINAS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    /// Build and validate configuration from an assembled set of sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be merged or the result is invalid.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let app_config: Self = builder.build()?.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".to_string()));
        }

        self.storage.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

/// A user allowed to obtain tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCredentials {
    pub username: String,

    /// bcrypt hash of the user's password.
    pub password_hash: String,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Static bearer token accepted on every resource route. Empty disables it.
    #[serde(default)]
    pub api_token: String,

    /// Access token lifetime in seconds.
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: u64,

    /// Users that may exchange a password for tokens.
    #[serde(default)]
    pub users: Vec<UserCredentials>,
}

const fn default_access_token_ttl() -> u64 {
    5 * 60
}

const fn default_refresh_token_ttl() -> u64 {
    24 * 60 * 60
}

impl AuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_ttl == 0 || self.refresh_token_ttl == 0 {
            return Err(ConfigError::Message(
                "auth token lifetimes must be greater than 0".to_string(),
            ));
        }
        if self.users.iter().any(|user| user.username.is_empty()) {
            return Err(ConfigError::Message(
                "auth.users entries need a username".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            access_token_ttl: default_access_token_ttl(),
            refresh_token_ttl: default_refresh_token_ttl(),
            users: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Install the Prometheus recorder and serve it on `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const fn default_metrics_enabled() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}
