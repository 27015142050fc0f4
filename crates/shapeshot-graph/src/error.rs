//! Error types for graph capture and mutation.

use shapeshot_types::NodeId;

/// Errors that can occur while capturing, mutating or loading a graph.
///
/// Access faults on inspected objects never show up here; they are recorded
/// in the graph (as the exception sentinel) or skipped. The variants below
/// are consistency faults: they mean the identity bookkeeping is broken, not
/// that the input was bad.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Storage was about to be allocated for an identity that already has it.
    #[error("storage already allocated for node {0}")]
    DuplicateStorage(NodeId),

    /// A primitive removal targeted an entry holding an object reference.
    #[error("entry {key:?} on node {id} is not a primitive value (holds {value})")]
    NotPrimitive {
        /// The object holding the entry.
        id: NodeId,
        /// The storage key.
        key: String,
        /// The value actually stored.
        value: NodeId,
    },

    /// A primitive removal targeted an entry that does not exist.
    #[error("node {id} has no entry {key:?}")]
    MissingEntry {
        /// The object that was expected to hold the entry.
        id: NodeId,
        /// The storage key.
        key: String,
    },

    /// A loaded record uses different primitive sentinels than this build.
    #[error("type table mismatch for {name:?}: expected {expected}, found {found:?}")]
    TypeTableMismatch {
        /// Category name.
        name: String,
        /// Sentinel this build uses.
        expected: NodeId,
        /// Sentinel found in the record, if any.
        found: Option<NodeId>,
    },

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
