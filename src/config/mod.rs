/// Database configuration and connection management
pub mod database;

/// Secrets loaded from environment variables
pub mod secrets;

/// Application settings loading from config.toml
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
