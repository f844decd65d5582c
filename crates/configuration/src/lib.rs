use crate::settings::Config;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod targets;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{MarketConfig, SessionConfig, TelegramConfig, TradingConfig};
pub use targets::load_targets;

/// Loads the application configuration from a TOML file.
///
/// Environment variables prefixed with `MERIDIAN` override file values
/// (e.g. `MERIDIAN__DOMESTIC__APP_KEY`), which is how credentials normally
/// reach the process instead of living in the checked-in file.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("MERIDIAN").separator("__"))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;

    Ok(config)
}
