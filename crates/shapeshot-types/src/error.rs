use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),

    #[error("unknown primitive type: {0:?}")]
    UnknownType(String),
}
