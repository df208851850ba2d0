//! Configuration for the analytics service.
//!
//! Settings come from a TOML file, `.env`, and the process environment.

mod settings;

pub use settings::{
    expand_env_vars, AnalyticsSettings, AuthSettings, DatabaseSettings, ServerSettings, Settings,
    SettingsError,
};
