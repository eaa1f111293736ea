use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scheme shared by every federation URN.
pub const URN_PREFIX: &str = "urn:publicid:IDN";

/// Errors raised while parsing a federation URN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The string does not start with `urn:publicid:IDN+`.
    #[error("'{0}' does not use the urn:publicid:IDN scheme")]
    WrongScheme(String),
    /// Fewer segments than `authority+type+name`.
    #[error("'{0}' is missing authority, type or name segments")]
    MissingSegments(String),
    /// The type token is not one of authority, slice, sliver or user.
    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),
    /// No authority names, or an empty one.
    #[error("authority list is empty")]
    EmptyAuthority,
    /// The resource name is empty.
    #[error("resource name is empty")]
    EmptyName,
    /// A segment contains whitespace, control characters or `+`.
    #[error("{segment} ('{value}') contains characters not allowed in a URN")]
    IllegalCharacter {
        /// Which part of the URN was rejected.
        segment: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Resource type token of a federation URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// An authority (clearinghouse, aggregate manager).
    Authority,
    /// A caller-defined grouping of slivers.
    Slice,
    /// One allocated resource inside a slice.
    Sliver,
    /// A federation user.
    User,
}

impl ResourceType {
    /// Token used in the URN.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Authority => "authority",
            ResourceType::Slice => "slice",
            ResourceType::Sliver => "sliver",
            ResourceType::User => "user",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authority" => Ok(ResourceType::Authority),
            "slice" => Ok(ResourceType::Slice),
            "sliver" => Ok(ResourceType::Sliver),
            "user" => Ok(ResourceType::User),
            _ => Err(ParseError::UnknownResourceType(s.to_string())),
        }
    }
}

/// A federation identifier: authority chain, resource type and name.
///
/// Authority names are DNS-like and stored lowercased, so equality, hashing
/// and the canonical URN string agree with each other. The resource name is
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    authorities: Vec<String>,
    resource_type: ResourceType,
    resource_name: String,
}

impl Identifier {
    /// Builds an identifier from its parts, applying the same checks as [`Identifier::parse`].
    pub fn new(
        authorities: Vec<String>,
        resource_type: ResourceType,
        resource_name: impl Into<String>,
    ) -> Result<Self, ParseError> {
        if authorities.is_empty() {
            return Err(ParseError::EmptyAuthority);
        }
        let mut normalized = Vec::with_capacity(authorities.len());
        for authority in authorities {
            if authority.is_empty() {
                return Err(ParseError::EmptyAuthority);
            }
            check_segment("authority", &authority)?;
            normalized.push(authority.to_ascii_lowercase());
        }
        let resource_name = resource_name.into();
        if resource_name.is_empty() {
            return Err(ParseError::EmptyName);
        }
        check_segment("resource name", &resource_name)?;
        Ok(Self {
            authorities: normalized,
            resource_type,
            resource_name,
        })
    }

    /// Parses `urn:publicid:IDN+auth1[+auth2...]+type+name`.
    pub fn parse(urn: &str) -> Result<Self, ParseError> {
        let rest = strip_scheme(urn).ok_or_else(|| ParseError::WrongScheme(urn.to_string()))?;
        let segments: Vec<&str> = rest.split('+').collect();
        if segments.len() < 3 {
            return Err(ParseError::MissingSegments(urn.to_string()));
        }
        let (authorities, tail) = segments.split_at(segments.len() - 2);
        let resource_type: ResourceType = tail[0].parse()?;
        Self::new(
            authorities.iter().map(|a| a.to_string()).collect(),
            resource_type,
            tail[1],
        )
    }

    /// Mints a child identifier under the same authority chain.
    pub fn derive(&self, resource_type: ResourceType, resource_name: impl Into<String>) -> Self {
        Self {
            authorities: self.authorities.clone(),
            resource_type,
            resource_name: resource_name.into(),
        }
    }

    /// Authority names, outermost first.
    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Resource type token.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Resource name (last URN segment).
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Canonical URN string.
    pub fn to_urn(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URN_PREFIX)?;
        for authority in &self.authorities {
            write!(f, "+{}", authority)?;
        }
        write!(f, "+{}+{}", self.resource_type, self.resource_name)
    }
}

impl FromStr for Identifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

fn strip_scheme(urn: &str) -> Option<&str> {
    let head = urn.get(..URN_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(URN_PREFIX) {
        return None;
    }
    urn[URN_PREFIX.len()..].strip_prefix('+')
}

fn check_segment(segment: &'static str, value: &str) -> Result<(), ParseError> {
    if value
        .chars()
        .any(|c| c == '+' || c.is_whitespace() || c.is_control())
    {
        return Err(ParseError::IllegalCharacter {
            segment,
            value: value.to_string(),
        });
    }
    Ok(())
}
