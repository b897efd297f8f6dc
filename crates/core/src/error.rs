//! Error types for registry lookups and mutations

use thiserror::Error;

/// A notification could not be matched to exactly one known device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("no device with id '{id}' is known")]
    NotFound { id: String },

    #[error("device id '{id}' matches {count} records")]
    Ambiguous { id: String, count: usize },
}

/// Registry mutation rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device id '{0}' is already registered")]
    Duplicate(String),
}
