//! Boundary to the signature and certificate-chain verification primitives.

use std::path::Path;
use std::sync::Arc;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::CertificateDer;

use crate::errors::TrustError;

/// Trusted root certificates, as loaded from disk (PEM).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedRoots {
    certificates: Vec<Vec<u8>>,
}

impl TrustedRoots {
    /// Wraps already-loaded root certificates.
    pub fn new(certificates: Vec<Vec<u8>>) -> Self {
        Self { certificates }
    }

    /// Reads one root certificate file per path.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Self> {
        let mut certificates = Vec::with_capacity(paths.len());
        for path in paths {
            certificates.push(std::fs::read(path)?);
            tracing::info!(file = %path.as_ref().display(), "loaded trusted root certificate");
        }
        Ok(Self { certificates })
    }

    /// Root certificates in load order.
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Whether no roots are configured; nothing verifies against an empty set.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

/// External signature/chain verification capability.
///
/// Implementations wrap an XML-signature library and an X.509 path
/// validator. Both calls may block on I/O; callers bound them with a deadline
/// and drop the future to cancel.
#[async_trait::async_trait]
pub trait TrustVerifier: Send + Sync {
    /// Checks the enveloped signature of `signed` against `roots`.
    async fn verify_signature(&self, roots: &TrustedRoots, signed: &[u8]) -> Result<(), TrustError>;

    /// Checks that `chain` (leaf first, DER) leads to one of `roots`.
    async fn verify_chain(&self, roots: &TrustedRoots, chain: &[Vec<u8>]) -> Result<(), TrustError>;
}

#[async_trait::async_trait]
impl<T: TrustVerifier + ?Sized> TrustVerifier for Arc<T> {
    async fn verify_signature(&self, roots: &TrustedRoots, signed: &[u8]) -> Result<(), TrustError> {
        (**self).verify_signature(roots, signed).await
    }

    async fn verify_chain(&self, roots: &TrustedRoots, chain: &[Vec<u8>]) -> Result<(), TrustError> {
        (**self).verify_chain(roots, chain).await
    }
}

/// Decodes every `CERTIFICATE` block of a PEM bundle into DER bytes.
///
/// GIDs embedded in credentials may carry the issuing chain after the leaf,
/// so the whole bundle is returned in order.
pub fn decode_pem_certificates(pem: &str) -> Result<Vec<Vec<u8>>, TrustError> {
    let certificates = CertificateDer::pem_slice_iter(pem.as_bytes())
        .map(|cert| cert.map(|der| der.as_ref().to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TrustError(format!("invalid PEM certificate: {}", e)))?;
    if certificates.is_empty() {
        return Err(TrustError("no certificate found".to_string()));
    }
    Ok(certificates)
}
