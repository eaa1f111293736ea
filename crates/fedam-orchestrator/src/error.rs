//! Error types for orchestrator operations.

use fedam_identifiers::ResourceType;
use thiserror::Error;

use crate::object::ObjectKind;

/// Errors that can occur during orchestrator calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// An object with the same kind, namespace and name already exists.
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Object kind.
        kind: ObjectKind,
        /// Namespace.
        namespace: String,
        /// Object name.
        name: String,
    },
    /// The object does not exist.
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Object kind.
        kind: ObjectKind,
        /// Namespace.
        namespace: String,
        /// Object name.
        name: String,
    },
    /// The caller's deadline expired before the call completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// The orchestrator rejected the object.
    #[error("invalid object: {0}")]
    Invalid(String),
    /// The orchestrator could not be reached or failed internally.
    #[error("transport error: {0}")]
    Transport(String),
}

impl OrchestratorError {
    /// Whether the same call may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Transport(_))
    }

    /// Whether this is a not-found answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<DeadlineExceeded> for OrchestratorError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

/// A deadline expired while an operation was in flight.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// Errors from parsing a label selector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// A requirement is not of the form `key=value`.
    #[error("malformed requirement '{0}'")]
    MalformedRequirement(String),
    /// A key or value violates the label syntax.
    #[error("invalid label: {0}")]
    InvalidLabel(#[from] fedam_identifiers::ValidationError),
}

/// Errors from resolving identifiers to orchestrator objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Only slice and sliver identifiers map to objects.
    #[error("cannot resolve {0} identifiers")]
    UnsupportedIdentifierType(ResourceType),
    /// The underlying orchestrator call failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}
