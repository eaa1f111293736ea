//! Credential verification and authorization matching for the fedam aggregate manager.
//!
//! This crate provides:
//! - The AM API credential envelope and the SFA signed-credential payload
//! - A four-step verifier (signature, decode, embedded identities, freshness)
//! - Matchers that pick the credential authorizing a caller on a target
//!
//! Core invariants:
//! - Verification short-circuits on the first failed check
//! - Matching fails closed: a recognized credential that fails verification
//!   aborts the search
//! - Signature and chain primitives are external, behind [`TrustVerifier`]
//!
#![deny(missing_docs)]

/// Credential envelope and SFA payload.
pub mod credential;
/// Error types for verification and matching.
pub mod errors;
/// Test doubles (enabled by the `helpers` feature).
#[cfg(feature = "helpers")]
pub mod helpers;
/// Authorization matchers.
pub mod matcher;
/// Trusted roots and the signature/chain capability.
pub mod trust;
/// Credential verification pipeline.
pub mod verification;

pub use credential::{Credential, Privilege, SFA_CREDENTIAL_TYPE, SFA_CREDENTIAL_VERSION};
pub use errors::{MatchError, TrustError, VerificationError};
pub use matcher::{find_matching_credential, find_matching_credentials, find_valid_credential};
pub use trust::{decode_pem_certificates, TrustVerifier, TrustedRoots};
pub use verification::{ValidatedAssertion, Verifier};
