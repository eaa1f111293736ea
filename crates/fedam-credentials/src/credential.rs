use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::errors::VerificationError;

/// Credential type accepted by this aggregate.
pub const SFA_CREDENTIAL_TYPE: &str = "geni_sfa";
/// Credential version accepted by this aggregate.
pub const SFA_CREDENTIAL_VERSION: &str = "3";

/// Credential as it arrives in an AM API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Declared credential type.
    #[serde(rename = "geni_type")]
    pub kind: String,
    /// Declared credential version.
    #[serde(rename = "geni_version")]
    pub version: String,
    /// Entity-escaped signed credential document.
    #[serde(rename = "geni_value")]
    pub value: String,
}

impl Credential {
    /// Wraps a signed SFA document.
    pub fn sfa(value: impl Into<String>) -> Self {
        Self {
            kind: SFA_CREDENTIAL_TYPE.to_string(),
            version: SFA_CREDENTIAL_VERSION.to_string(),
            value: value.into(),
        }
    }

    /// Whether the declared type/version is one this aggregate verifies.
    pub fn is_recognized(&self) -> bool {
        self.kind.eq_ignore_ascii_case(SFA_CREDENTIAL_TYPE) && self.version == SFA_CREDENTIAL_VERSION
    }

    /// The signed document with XML entities resolved.
    pub fn signed_document(&self) -> Result<Cow<'_, str>, VerificationError> {
        quick_xml::escape::unescape(&self.value)
            .map_err(|e| VerificationError::MalformedCredential(e.to_string()))
    }
}

/// Privilege granted by a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    /// Privilege name (`*`, `refresh`, `info`, ...).
    pub name: String,
    /// Whether the owner may delegate it.
    #[serde(default)]
    pub can_delegate: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Privileges {
    #[serde(rename = "privilege", default)]
    pub(crate) items: Vec<Privilege>,
}

/// `<credential>` element of an SFA signed credential.
#[derive(Debug, Deserialize)]
pub(crate) struct SfaCredential {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) owner_gid: String,
    pub(crate) owner_urn: String,
    pub(crate) target_gid: String,
    pub(crate) target_urn: String,
    pub(crate) expires: String,
    #[serde(default)]
    pub(crate) privileges: Privileges,
}

/// Root `<signed-credential>` element.
#[derive(Debug, Deserialize)]
#[serde(rename = "signed-credential")]
pub(crate) struct SignedCredential {
    pub(crate) credential: SfaCredential,
}

/// Credential kind carried inside SFA privilege credentials.
pub(crate) const PRIVILEGE_KIND: &str = "privilege";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_entity_encoded_document() {
        let credential = Credential::sfa("&lt;signed-credential&gt;&amp;&lt;/signed-credential&gt;");
        assert_eq!(
            credential.signed_document().unwrap(),
            "<signed-credential>&</signed-credential>"
        );
    }

    #[test]
    fn recognizes_only_sfa_v3() {
        assert!(Credential::sfa("").is_recognized());
        let abac = Credential {
            kind: "geni_abac".into(),
            version: "1".into(),
            value: String::new(),
        };
        assert!(!abac.is_recognized());
        let old = Credential {
            version: "2".into(),
            ..Credential::sfa("")
        };
        assert!(!old.is_recognized());
    }
}
