use fedam_credentials::MatchError;
use fedam_identifiers::{NamingError, ParseError};
use fedam_orchestrator::OrchestratorError;
use thiserror::Error;

use crate::rpc::GeniCode;
use crate::rspec::RspecError;

/// Errors that can occur while allocating.
///
/// The full error, with its source chain, is for logs. Callers see only
/// [`AllocateError::geni_code`] and [`AllocateError::public_message`].
#[derive(Error, Debug)]
pub enum AllocateError {
    /// A caller-supplied argument is malformed or unsupported.
    #[error("bad arguments: {0}")]
    BadArgs(String),
    /// A URN argument does not parse.
    #[error("bad {field}: {source}")]
    BadUrn {
        /// Argument name.
        field: &'static str,
        /// Parse failure.
        source: ParseError,
    },
    /// The request RSpec is malformed.
    #[error(transparent)]
    BadRspec(#[from] RspecError),
    /// A node names a disk image that is not in the image table.
    #[error("node {client_id}: unknown disk image '{image}'")]
    UnknownImage {
        /// Node client id.
        client_id: String,
        /// Requested image.
        image: String,
    },
    /// Name derivation failed.
    #[error(transparent)]
    Naming(#[from] NamingError),
    /// No credential authorizes the caller on the slice.
    #[error("authorization failed: {0}")]
    AuthorizationFailed(#[source] MatchError),
    /// The call's deadline passed before authorization completed.
    #[error("deadline exceeded during authorization")]
    Timeout,
    /// Creating a bundle failed; everything created by this call was rolled back.
    #[error("allocation of sliver {sliver_name} failed: {source}")]
    AllocationFailed {
        /// Sliver whose creation failed.
        sliver_name: String,
        /// First orchestrator failure.
        source: OrchestratorError,
    },
}

impl AllocateError {
    /// GENI AM API v3 return code.
    pub fn geni_code(&self) -> GeniCode {
        match self {
            Self::BadArgs(_)
            | Self::BadUrn { .. }
            | Self::BadRspec(_)
            | Self::UnknownImage { .. }
            | Self::Naming(_) => GeniCode::BadArgs,
            Self::AuthorizationFailed(_) => GeniCode::Forbidden,
            Self::Timeout => GeniCode::TimedOut,
            Self::AllocationFailed { source, .. } => match source {
                OrchestratorError::DeadlineExceeded => GeniCode::TimedOut,
                _ => GeniCode::Error,
            },
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::AllocationFailed { .. })
    }

    /// Short message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadArgs(reason) => format!("bad arguments: {}", reason),
            Self::BadUrn { field, .. } => format!("bad arguments: {} is not a valid URN", field),
            Self::BadRspec(RspecError::Xml(_)) => "bad rspec: malformed document".to_string(),
            Self::BadRspec(e) => format!("bad rspec: {}", e),
            Self::UnknownImage { client_id, image } => {
                format!("node {}: unknown disk image '{}'", client_id, image)
            }
            Self::Naming(e) => format!("bad arguments: {}", e),
            Self::AuthorizationFailed(_) => {
                "authorization failed: no valid credential for this slice".to_string()
            }
            Self::Timeout => "request timed out".to_string(),
            Self::AllocationFailed { .. } => {
                "allocation failed; no resources were allocated".to_string()
            }
        }
    }
}
