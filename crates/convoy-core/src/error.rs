//! Error types for the Convoy core model.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building or mutating the core model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown node state: {0}")]
    UnknownNodeState(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    #[error("loading out of range for node {node}: {loading}")]
    LoadingOutOfRange { node: String, loading: u32 },

    #[error("invalid conflict for {process}: {reason}")]
    InvalidConflict { process: String, reason: String },

    #[error("invalid config: {0}")]
    Config(String),
}
