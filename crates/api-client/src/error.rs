use thiserror::Error;

/// Broker message codes that mean "the market is closed today", as opposed to
/// an order that is merely wrong. These trip the holiday circuit breaker
/// instead of surfacing as application errors.
const NON_TRADING_DAY_CODES: &[&str] = &["APBK0918", "APBK0919", "OPSQ0002"];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error after retries (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Broker rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Not a trading day: {0}")]
    NonTradingDay(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Failed to access the token cache: {0}")]
    TokenCache(#[from] std::io::Error),
}

impl ApiError {
    /// Maps a business rejection to the right variant. Non-trading-day
    /// rejections are a distinct class: they suppress a whole market for the
    /// rest of the calendar day rather than failing one order.
    pub fn from_rejection(code: String, message: String) -> Self {
        let closed = NON_TRADING_DAY_CODES.contains(&code.as_str())
            || message.to_lowercase().contains("not a trading day");
        if closed {
            ApiError::NonTradingDay(message)
        } else {
            ApiError::Rejected { code, message }
        }
    }
}
