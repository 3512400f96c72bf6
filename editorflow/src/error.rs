//! Error types for editorflow.
//!
//! The aggregation core itself has no failure modes; these errors come from
//! the ambient layers around it (configuration, replay input, the service
//! channel).

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur outside the aggregation core.
///
/// # Examples
///
/// ```
/// use editorflow::error::FlowError;
///
/// fn parse(line: &str) -> Result<serde_json::Value, FlowError> {
///     Ok(serde_json::from_str(line)?)
/// }
///
/// assert!(parse("{").is_err());
/// ```
#[derive(Error, Debug)]
pub enum FlowError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The flow service has stopped and no longer accepts host events.
    #[error("flow service channel closed")]
    ChannelClosed,

    /// The flow service input channel is at capacity.
    #[error("flow service channel full")]
    ChannelFull,

    /// The flow service task panicked or was cancelled.
    #[error("flow service task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A specialized `Result` type for editorflow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
