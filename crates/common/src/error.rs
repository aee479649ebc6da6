//! Unified error type for the alert monitor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Alert feed error: {0}")]
    Feed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Subscriber error: {0}")]
    Subscriber(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
