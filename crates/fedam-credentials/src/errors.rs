use fedam_identifiers::Identifier;
use thiserror::Error;

/// Failure reported by the external signature/chain verification capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TrustError(pub String);

/// Reasons a signed credential is rejected. Checks run in this order and stop
/// at the first failure.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// The payload signature does not chain to a trusted root.
    #[error("credential signature is invalid")]
    SignatureInvalid(#[source] TrustError),
    /// The payload could not be decoded into owner, target and expiry.
    #[error("credential is malformed: {0}")]
    MalformedCredential(String),
    /// The owner or target certificate does not chain to a trusted root.
    #[error("{role} certificate of {urn} is not trusted")]
    UntrustedIdentity {
        /// `owner` or `target`.
        role: &'static str,
        /// URN the certificate was presented for.
        urn: Identifier,
        /// Underlying failure.
        #[source]
        source: TrustError,
    },
    /// The credential expiry is not in the future.
    #[error("credential has expired")]
    CredentialExpired,
}

/// Errors from the authorization matcher.
#[derive(Error, Debug)]
pub enum MatchError {
    /// A candidate credential failed verification; the search stops there.
    #[error("credential {index}: {source}")]
    Verification {
        /// Position of the candidate in the caller-supplied list.
        index: usize,
        /// Why it failed.
        #[source]
        source: VerificationError,
    },
    /// No recognized, verifiable credential matched.
    #[error("no matching credential found for {caller}")]
    NoMatch {
        /// Identity the search was run for.
        caller: Identifier,
    },
}
