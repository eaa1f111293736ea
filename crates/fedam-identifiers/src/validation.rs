use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Maximum length of an object name or label value.
pub const MAX_NAME_LEN: usize = 63;
/// Maximum length of a label key prefix (DNS subdomain).
pub const MAX_PREFIX_LEN: usize = 253;

/// Validation errors for orchestrator names and labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a value exceeds its length bound.
    #[error("{field} ('{value}') is longer than {max} characters")]
    TooLong {
        /// Field name that is out of bounds.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Maximum length.
        max: usize,
    },
}

fn label_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").expect("invalid regex")
    })
}

fn dns_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("invalid regex"))
}

fn dns_subdomain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .expect("invalid regex")
    })
}

fn check(field: &'static str, value: &str, max: usize, re: &Regex) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            value: value.to_string(),
            max,
        });
    }
    if !re.is_match(value) {
        return Err(ValidationError::PatternMismatch {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Checks a label value (at most 63 characters, alphanumeric at both ends).
pub fn validate_label_value(value: &str) -> Result<(), ValidationError> {
    check("label value", value, MAX_NAME_LEN, label_value_re())
}

/// Checks an object name against the DNS-1035 label rule, the strictest
/// rule among the object kinds a bundle contains (endpoint names must start
/// with a letter).
pub fn validate_object_name(value: &str) -> Result<(), ValidationError> {
    check("object name", value, MAX_NAME_LEN, dns_label_re())
}

/// Checks a label or annotation key (`[prefix/]name`).
pub fn validate_label_key(key: &str) -> Result<(), ValidationError> {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            check("label key prefix", prefix, MAX_PREFIX_LEN, dns_subdomain_re())?;
            name
        }
        None => key,
    };
    if name.is_empty() {
        return Err(ValidationError::PatternMismatch {
            field: "label key name",
            value: key.to_string(),
        });
    }
    check("label key name", name, MAX_NAME_LEN, label_value_re())
}
