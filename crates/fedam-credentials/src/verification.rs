use chrono::{DateTime, NaiveDateTime, Utc};
use fedam_identifiers::Identifier;
use serde::Serialize;

use crate::credential::{Privilege, SignedCredential, PRIVILEGE_KIND};
use crate::errors::VerificationError;
use crate::trust::{decode_pem_certificates, TrustVerifier, TrustedRoots};

/// Owner/target assertion extracted from a credential that passed every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedAssertion {
    /// Identity the credential was issued to.
    pub owner: Identifier,
    /// Object the owner may act on.
    pub target: Identifier,
    /// End of validity.
    pub expires: DateTime<Utc>,
    /// Privileges listed in the credential.
    pub privileges: Vec<Privilege>,
}

/// Verifies SFA credentials against a fixed set of trusted roots.
///
/// Only direct owner→target credentials are accepted; delegated credential
/// chains are not followed.
pub struct Verifier<T> {
    trust: T,
    roots: TrustedRoots,
}

impl<T: TrustVerifier> Verifier<T> {
    /// Creates a verifier backed by `trust`.
    pub fn new(trust: T, roots: TrustedRoots) -> Self {
        Self { trust, roots }
    }

    /// Trusted roots used for every check.
    pub fn roots(&self) -> &TrustedRoots {
        &self.roots
    }

    /// Verifies `signed` against the current time.
    pub async fn verify(&self, signed: &str) -> Result<ValidatedAssertion, VerificationError> {
        self.verify_at(signed, Utc::now()).await
    }

    /// Runs signature, decode, embedded-identity and freshness checks in
    /// that order, stopping at the first failure.
    pub async fn verify_at(
        &self,
        signed: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatedAssertion, VerificationError> {
        self.trust
            .verify_signature(&self.roots, signed.as_bytes())
            .await
            .map_err(VerificationError::SignatureInvalid)?;

        let document: SignedCredential = quick_xml::de::from_str(signed)
            .map_err(|e| VerificationError::MalformedCredential(e.to_string()))?;
        let credential = document.credential;
        if credential.kind != PRIVILEGE_KIND {
            return Err(VerificationError::MalformedCredential(format!(
                "unsupported credential type '{}'",
                credential.kind
            )));
        }
        let owner = parse_urn("owner_urn", &credential.owner_urn)?;
        let target = parse_urn("target_urn", &credential.target_urn)?;
        let expires = parse_expiry(&credential.expires)?;

        self.check_identity("owner", &owner, &credential.owner_gid)
            .await?;
        self.check_identity("target", &target, &credential.target_gid)
            .await?;

        if expires <= now {
            return Err(VerificationError::CredentialExpired);
        }

        tracing::debug!(%owner, %target, %expires, "credential verified");
        Ok(ValidatedAssertion {
            owner,
            target,
            expires,
            privileges: credential.privileges.items,
        })
    }

    async fn check_identity(
        &self,
        role: &'static str,
        urn: &Identifier,
        gid: &str,
    ) -> Result<(), VerificationError> {
        let result = match decode_pem_certificates(gid) {
            Ok(chain) => self.trust.verify_chain(&self.roots, &chain).await,
            Err(e) => Err(e),
        };
        result.map_err(|source| VerificationError::UntrustedIdentity {
            role,
            urn: urn.clone(),
            source,
        })
    }
}

fn parse_urn(field: &str, value: &str) -> Result<Identifier, VerificationError> {
    Identifier::parse(value.trim())
        .map_err(|e| VerificationError::MalformedCredential(format!("{}: {}", field, e)))
}

/// Accepts RFC 3339 timestamps and zone-less ones, which SFA issuers emit in UTC.
fn parse_expiry(value: &str) -> Result<DateTime<Utc>, VerificationError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| VerificationError::MalformedCredential(format!("expires: {}", e)))
}
