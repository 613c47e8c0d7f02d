/// Core error type for the poller.
///
/// Adapter crates map their specific errors into this type so the pipeline
/// can handle failures consistently (fatal config vs recoverable cycle).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp error: {0}")]
    Timestamp(String),
}

pub type Result<T> = std::result::Result<T, Error>;
