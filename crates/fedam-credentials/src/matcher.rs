//! Finding the credential that authorizes a call.
//!
//! Candidates are tried in the order the caller supplied them. Credentials of
//! an unrecognized type are skipped; any recognized credential that fails
//! verification ends the search with that failure, so a bad credential can't
//! be stepped over by appending a good one.

use fedam_identifiers::Identifier;

use crate::credential::Credential;
use crate::errors::MatchError;
use crate::trust::TrustVerifier;
use crate::verification::{ValidatedAssertion, Verifier};

/// Returns the first credential owned by `caller` that targets `target`.
pub async fn find_matching_credential<T: TrustVerifier>(
    verifier: &Verifier<T>,
    caller: &Identifier,
    target: &Identifier,
    credentials: &[Credential],
) -> Result<ValidatedAssertion, MatchError> {
    find_first(verifier, caller, credentials, |assertion| {
        assertion.target == *target
    })
    .await
}

/// Returns the first credential owned by `caller`, whatever its target.
pub async fn find_valid_credential<T: TrustVerifier>(
    verifier: &Verifier<T>,
    caller: &Identifier,
    credentials: &[Credential],
) -> Result<ValidatedAssertion, MatchError> {
    find_first(verifier, caller, credentials, |_| true).await
}

/// Authorizes `caller` on every target; fails as a whole if any target lacks a credential.
pub async fn find_matching_credentials<T: TrustVerifier>(
    verifier: &Verifier<T>,
    caller: &Identifier,
    targets: &[Identifier],
    credentials: &[Credential],
) -> Result<Vec<ValidatedAssertion>, MatchError> {
    let mut assertions = Vec::with_capacity(targets.len());
    for target in targets {
        assertions.push(find_matching_credential(verifier, caller, target, credentials).await?);
    }
    Ok(assertions)
}

async fn find_first<T, F>(
    verifier: &Verifier<T>,
    caller: &Identifier,
    credentials: &[Credential],
    accept: F,
) -> Result<ValidatedAssertion, MatchError>
where
    T: TrustVerifier,
    F: Fn(&ValidatedAssertion) -> bool,
{
    for (index, credential) in credentials.iter().enumerate() {
        if !credential.is_recognized() {
            tracing::debug!(
                index,
                kind = %credential.kind,
                version = %credential.version,
                "skipping credential of unrecognized type"
            );
            continue;
        }
        let assertion = match credential.signed_document() {
            Ok(document) => verifier.verify(&document).await,
            Err(e) => Err(e),
        }
        .map_err(|source| MatchError::Verification { index, source })?;

        if assertion.owner == *caller && accept(&assertion) {
            return Ok(assertion);
        }
    }
    Err(MatchError::NoMatch {
        caller: caller.clone(),
    })
}
