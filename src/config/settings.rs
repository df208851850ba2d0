//! TOML-based configuration.
//!
//! Supports a config file (pricing.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [database]
//! url = "${PG_DSN}"
//! max_connections = 5
//! acquire_timeout_secs = 5
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [analytics]
//! table = "public.pedido_item"
//! date_column = "emissao"
//! dialect = "postgres"
//!
//! [auth]
//! api_key = "$API_KEY"
//! ```
//!
//! `PG_DSN`, `TABLE_NAME` and `API_KEY` in the environment override the
//! file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compile::CompileOptions;
use crate::executor::PoolOptions;
use crate::sql::Dialect;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PRICING_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("No database connection string configured (set PG_DSN or [database] url)")]
    MissingDatabaseUrl,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub analytics: AnalyticsSettings,
    pub auth: AuthSettings,
}

/// Database connection and pool.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection string (supports ${ENV_VAR} expansion).
    pub url: Option<String>,

    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before giving up.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Where the order-item data lives and which SQL to generate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Fact table, `table` or `schema.table`.
    pub table: String,
    pub date_column: String,
    /// postgres, duckdb or ansi. The server executes through PostgreSQL
    /// and only accepts postgres.
    pub dialect: String,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            table: "pedido_item".to_string(),
            date_column: "emissao".to_string(),
            dialect: "postgres".to_string(),
        }
    }
}

/// API key checking. Disabled when no key is set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    pub api_key: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations, then apply
    /// environment overrides.
    ///
    /// Searches in order:
    /// 1. Environment variable `PRICING_CONFIG`
    /// 2. `./pricing.toml`
    /// 3. `~/.config/pricing-analytics/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = Self::discover()?;
        settings.apply_env_overrides(|name| env::var(name).ok());
        settings.expand()?;
        Ok(settings)
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env_overrides(|name| env::var(name).ok());
        settings.expand()?;
        Ok(settings)
    }

    fn discover() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("pricing.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pricing-analytics").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Overlay `PG_DSN`, `TABLE_NAME` and `API_KEY`. Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = non_blank(lookup("PG_DSN")) {
            self.database.url = Some(url);
        }
        if let Some(table) = non_blank(lookup("TABLE_NAME")) {
            self.analytics.table = table;
        }
        if let Some(key) = non_blank(lookup("API_KEY")) {
            self.auth.api_key = Some(key);
        }
    }

    /// Expand `${VAR}` references in the string values that may carry them.
    fn expand(&mut self) -> Result<(), SettingsError> {
        if let Some(url) = &self.database.url {
            self.database.url = non_blank(Some(expand_env_vars(url)?));
        }
        if let Some(key) = &self.auth.api_key {
            self.auth.api_key = non_blank(Some(expand_env_vars(key)?));
        }
        self.analytics.table = expand_env_vars(&self.analytics.table)?;
        Ok(())
    }

    /// Fail fast on settings the server cannot start without.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if non_blank(self.database.url.clone()).is_none() {
            return Err(SettingsError::MissingDatabaseUrl);
        }
        let dialect = self.dialect()?;
        if dialect != Dialect::Postgres {
            return Err(SettingsError::InvalidConfig(format!(
                "analytics.dialect '{dialect}' cannot be served, the executor is PostgreSQL"
            )));
        }
        if self.analytics.table.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "analytics.table must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// The API key callers must send, if any.
    pub fn api_key(&self) -> Option<String> {
        non_blank(self.auth.api_key.clone())
    }

    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        self.analytics
            .dialect
            .parse()
            .map_err(|e: crate::sql::UnknownDialect| SettingsError::InvalidConfig(e.to_string()))
    }

    pub fn compile_options(&self) -> Result<CompileOptions, SettingsError> {
        Ok(CompileOptions::default()
            .with_dialect(self.dialect()?)
            .with_table(self.analytics.table.trim())
            .with_date_column(self.analytics.date_column.trim()))
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.database.max_connections.max(1),
            acquire_timeout: Duration::from_secs(self.database.acquire_timeout_secs),
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let lookup = |name: &str| env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()));
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.next_if_eq(&'{').is_some() {
            let var_name: String = chars.by_ref().take_while(|&ch| ch != '}').collect();
            result.push_str(&lookup(&var_name)?);
        } else {
            let mut var_name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // lone '$'
                result.push('$');
            } else {
                result.push_str(&lookup(&var_name)?);
            }
        }
    }

    Ok(result)
}
