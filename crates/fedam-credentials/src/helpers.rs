//! Deterministic trust capability and credential builder for tests.
//!
//! [`StaticTrust`] stands in for real XML-signature and X.509 checks:
//! a document is "signed" by the root named in its `<KeyName>` element, and
//! a certificate is the text `"<subject> issued by <root>"`.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use fedam_identifiers::Identifier;

use crate::credential::Credential;
use crate::errors::TrustError;
use crate::trust::{TrustVerifier, TrustedRoots};

/// Root name trusted by [`test_roots`].
pub const TEST_ROOT: &str = "test-root";

/// Trusted roots containing only [`TEST_ROOT`].
pub fn test_roots() -> TrustedRoots {
    TrustedRoots::new(vec![TEST_ROOT.as_bytes().to_vec()])
}

/// Trust capability that understands the documents built by [`CredentialBuilder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTrust;

fn is_root(roots: &TrustedRoots, name: &str) -> bool {
    roots.certificates().iter().any(|root| root == name.as_bytes())
}

#[async_trait::async_trait]
impl TrustVerifier for StaticTrust {
    async fn verify_signature(&self, roots: &TrustedRoots, signed: &[u8]) -> Result<(), TrustError> {
        let text = String::from_utf8_lossy(signed);
        let key = text
            .split_once("<KeyName>")
            .and_then(|(_, rest)| rest.split_once("</KeyName>"))
            .map(|(key, _)| key.trim().to_string())
            .ok_or_else(|| TrustError("document is not signed".to_string()))?;
        if is_root(roots, &key) {
            Ok(())
        } else {
            Err(TrustError(format!("signer {} is not trusted", key)))
        }
    }

    async fn verify_chain(&self, roots: &TrustedRoots, chain: &[Vec<u8>]) -> Result<(), TrustError> {
        let last = chain
            .last()
            .ok_or_else(|| TrustError("empty chain".to_string()))?;
        let text = String::from_utf8_lossy(last);
        match text.rsplit_once(" issued by ") {
            Some((_, issuer)) if is_root(roots, issuer) => Ok(()),
            _ => Err(TrustError(format!("'{}' does not chain to a trusted root", text))),
        }
    }
}

/// PEM bundle holding one fake certificate for `subject` issued by `issuer`.
pub fn pem_certificate(subject: &str, issuer: &str) -> String {
    let body = base64::engine::general_purpose::STANDARD
        .encode(format!("{} issued by {}", subject, issuer));
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        body
    )
}

/// Builds signed SFA credential documents.
#[derive(Debug, Clone)]
pub struct CredentialBuilder {
    owner: Identifier,
    target: Identifier,
    expires: String,
    signer: String,
    owner_issuer: String,
    target_issuer: String,
    kind: String,
}

impl CredentialBuilder {
    /// Credential for `owner` on `target`, valid for a day, everything issued by [`TEST_ROOT`].
    pub fn new(owner: &Identifier, target: &Identifier) -> Self {
        Self {
            owner: owner.clone(),
            target: target.clone(),
            expires: (Utc::now() + Duration::days(1)).to_rfc3339(),
            signer: TEST_ROOT.to_string(),
            owner_issuer: TEST_ROOT.to_string(),
            target_issuer: TEST_ROOT.to_string(),
            kind: "privilege".to_string(),
        }
    }

    /// Sets the expiry.
    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = expires.to_rfc3339();
        self
    }

    /// Sets the raw `<expires>` text.
    pub fn expires_raw(mut self, expires: &str) -> Self {
        self.expires = expires.to_string();
        self
    }

    /// Sets the root named as signer.
    pub fn signed_by(mut self, signer: &str) -> Self {
        self.signer = signer.to_string();
        self
    }

    /// Sets the issuer of the owner certificate.
    pub fn owner_issued_by(mut self, issuer: &str) -> Self {
        self.owner_issuer = issuer.to_string();
        self
    }

    /// Sets the issuer of the target certificate.
    pub fn target_issued_by(mut self, issuer: &str) -> Self {
        self.target_issuer = issuer.to_string();
        self
    }

    /// Sets the `<type>` element.
    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    /// Unescaped signed document.
    pub fn document(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<signed-credential xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <credential xml:id="ref0">
    <type>{kind}</type>
    <serial>8</serial>
    <owner_gid>{owner_gid}</owner_gid>
    <owner_urn>{owner}</owner_urn>
    <target_gid>{target_gid}</target_gid>
    <target_urn>{target}</target_urn>
    <uuid/>
    <expires>{expires}</expires>
    <privileges>
      <privilege><name>*</name><can_delegate>true</can_delegate></privilege>
    </privileges>
  </credential>
  <signatures>
    <Signature><KeyInfo><KeyName>{signer}</KeyName></KeyInfo></Signature>
  </signatures>
</signed-credential>"#,
            kind = self.kind,
            owner_gid = pem_certificate(&self.owner.to_urn(), &self.owner_issuer),
            owner = self.owner,
            target_gid = pem_certificate(&self.target.to_urn(), &self.target_issuer),
            target = self.target,
            expires = self.expires,
            signer = self.signer,
        )
    }

    /// Entity-escaped credential envelope, as sent over the wire.
    pub fn build(&self) -> Credential {
        Credential::sfa(quick_xml::escape::escape(self.document().as_str()).into_owned())
    }
}
