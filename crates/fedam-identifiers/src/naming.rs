//! Name derivation for orchestrator objects.
//!
//! Names are `h` followed by the first 16 hex characters of
//! `sha512(canonical_urn [|| client_id])`. The prefix keeps label values from
//! starting with a digit; 16 hex characters give 64 bits, which is ample for
//! the number of slices a single aggregate sees.

use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::identifiers::{Identifier, ResourceType};

const NAME_PREFIX: &str = "h";
const DIGEST_HEX_LEN: usize = 16;

/// Label carrying the slice hash on every object of a bundle.
pub const SLICE_HASH_LABEL: &str = "fedam.io/slice-hash";
/// Label carrying the sliver name; endpoint objects select workloads by it.
pub const SLIVER_NAME_LABEL: &str = "fedam.io/sliver-name";
/// Annotation with the caller-chosen client id.
pub const CLIENT_ID_ANNOTATION: &str = "fedam.io/client-id";
/// Annotation with the slice URN.
pub const SLICE_URN_ANNOTATION: &str = "fedam.io/slice-urn";
/// Annotation with the URN of the user that allocated the sliver.
pub const USER_URN_ANNOTATION: &str = "fedam.io/user-urn";
/// Annotation with the sliver URN.
pub const SLIVER_URN_ANNOTATION: &str = "fedam.io/sliver-urn";
/// Annotation with the sliver expiry (RFC 3339).
pub const EXPIRES_ANNOTATION: &str = "fedam.io/expires";

/// Errors raised while deriving names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The identifier has the wrong resource type for this derivation.
    #[error("expected a {expected} identifier, got {found}")]
    InvalidResourceType {
        /// Required type.
        expected: ResourceType,
        /// Type of the identifier that was passed.
        found: ResourceType,
    },
}

/// Label value shared by every object allocated under `slice`.
pub fn slice_hash(slice: &Identifier) -> String {
    hashed_name(slice.to_urn().as_bytes(), &[])
}

/// Object name for the sliver a node with `client_id` gets under `slice`.
pub fn sliver_name(slice: &Identifier, client_id: &str) -> Result<String, NamingError> {
    match slice.resource_type() {
        ResourceType::Slice => Ok(hashed_name(
            slice.to_urn().as_bytes(),
            client_id.as_bytes(),
        )),
        found => Err(NamingError::InvalidResourceType {
            expected: ResourceType::Slice,
            found,
        }),
    }
}

fn hashed_name(urn: &[u8], suffix: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(urn);
    hasher.update(suffix);
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", NAME_PREFIX, &digest[..DIGEST_HEX_LEN])
}
