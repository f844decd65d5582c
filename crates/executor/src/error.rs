use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Symbol '{0}' already has a pending order")]
    DuplicatePending(String),

    #[error("Trade log I/O failed: {0}")]
    LogIo(#[from] std::io::Error),

    #[error("Trade log serialization failed: {0}")]
    LogFormat(#[from] csv::Error),
}
