//! Equality-based label selectors (`key=value[,key=value]`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use fedam_identifiers::naming::SLICE_HASH_LABEL;
use fedam_identifiers::validation::{validate_label_key, validate_label_value};
use fedam_identifiers::{slice_hash, Identifier};

use crate::error::SelectorError;

/// Conjunction of `key=value` requirements. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector matching every object.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Adds a `key=value` requirement, checking label syntax.
    pub fn with(mut self, key: &str, value: &str) -> Result<Self, SelectorError> {
        validate_label_key(key)?;
        validate_label_value(value)?;
        self.requirements.insert(key.to_string(), value.to_string());
        Ok(self)
    }

    /// Parses `key=value[,key=value]`; whitespace around terms is ignored.
    pub fn parse(s: &str) -> Result<Self, SelectorError> {
        let mut selector = Self::default();
        if s.trim().is_empty() {
            return Ok(selector);
        }
        for term in s.split(',') {
            let (key, value) = term
                .split_once('=')
                .ok_or_else(|| SelectorError::MalformedRequirement(term.to_string()))?;
            // `key==value` is accepted as a synonym.
            let value = value.strip_prefix('=').unwrap_or(value);
            selector = selector.with(key.trim(), value.trim())?;
        }
        Ok(selector)
    }

    /// Whether `labels` satisfy every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Requirements, ordered by key.
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.requirements
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether the selector has no requirements.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for LabelSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Selector for every object allocated under `slice`.
pub fn slice_selector(slice: &Identifier) -> LabelSelector {
    let mut requirements = BTreeMap::new();
    requirements.insert(SLICE_HASH_LABEL.to_string(), slice_hash(slice));
    LabelSelector { requirements }
}
