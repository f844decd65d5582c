use api_client::ApiError;
use configuration::ConfigError;
use executor::ExecutorError;
use strategies::StrategyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Broker API call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Order tracking failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Strategy construction failed: {0}")]
    Strategy(#[from] StrategyError),

    #[error("No targets configured for the {0} market")]
    MissingTargets(&'static str),

    #[error("Profit baseline I/O failed: {0}")]
    BaselineIo(#[from] std::io::Error),

    #[error("Profit baseline is corrupt: {0}")]
    BaselineFormat(#[from] serde_json::Error),
}
