use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load the configuration file: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to read the targets file {path}: {source}")]
    TargetsIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse the targets file {path}: {source}")]
    TargetsParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}
