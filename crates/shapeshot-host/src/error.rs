//! Error types for host object access.

/// A read on a host object failed.
///
/// Access faults are expected during capture (hostile getters, detached
/// objects, revoked proxies) and are always recovered by the caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The property getter threw.
    #[error("getter for {name:?} threw: {message}")]
    Threw {
        /// The property being read.
        name: String,
        /// The thrown message.
        message: String,
    },

    /// The object refused the operation altogether.
    #[error("object is inaccessible: {0}")]
    Inaccessible(String),
}

impl AccessError {
    /// Convenience constructor for a thrown getter.
    pub fn threw(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Threw {
            name: name.into(),
            message: message.into(),
        }
    }
}
