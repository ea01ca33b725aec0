use std::time::Duration;
use thiserror::Error;

/// Transport-level failures opening or maintaining the upstream stream.
/// Always recoverable: the supervisor answers with backoff + reconnect.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    BadStatus(u16),

    #[error("stream stalled: no data for {0:?}")]
    ReadTimeout(Duration),

    #[error("stream ended")]
    StreamEnded,
}

/// One line failed to parse. The line is skipped, the stream continues.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed block record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One extractor failed on one block. Only that extractor's output for that
/// block is lost; the others still run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{extractor} failed on block {block}: {reason}")]
    Failed {
        extractor: &'static str,
        block: u64,
        reason: String,
    },
}

/// Store write failed. Logged, never fatal: the event is still broadcast so
/// live consumers aren't starved, it just isn't durably recorded.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("store rejected write for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },
}

impl ConnectError {
    /// Stalled-stream failures get logged apart from hard transport errors.
    pub fn is_timeout(&self) -> bool {
        match self {
            ConnectError::ReadTimeout(_) => true,
            ConnectError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
