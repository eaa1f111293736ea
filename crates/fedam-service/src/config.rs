//! Aggregate manager configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fedam_credentials::TrustedRoots;
use fedam_identifiers::validation::validate_object_name;
use fedam_identifiers::{Identifier, ParseError, ResourceType, ValidationError};
use fedam_orchestrator::{ResourceList, ResourceRequirements};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authority name used when none is configured.
pub const DEFAULT_AUTHORITY_NAME: &str = "example.org";
/// Resource name of the aggregate's own authority identifier.
pub const AM_RESOURCE_NAME: &str = "am";
/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "fedam";
/// Image name used by nodes that name no disk image.
pub const DEFAULT_IMAGE_NAME: &str = "ubuntu2204";
/// Image reference behind [`DEFAULT_IMAGE_NAME`].
pub const DEFAULT_IMAGE: &str = "docker.io/library/ubuntu:22.04";

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The default image is not in the image table.
    #[error("default image '{0}' is not in the container image table")]
    UnknownDefaultImage(String),
    /// The authority identifier is not of type authority.
    #[error("{0} is not an authority identifier")]
    NotAnAuthority(Identifier),
    /// The namespace is not a legal object name.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(#[from] ValidationError),
    /// A duration is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    /// A resource quantity is empty.
    #[error("container {0} is empty")]
    EmptyQuantity(&'static str),
    /// The authority name cannot form an identifier.
    #[error("invalid authority name: {0}")]
    InvalidAuthority(#[from] ParseError),
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration file.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Everything the allocation engine needs to know about this aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Identifier of this aggregate (`urn:publicid:IDN+<authority>+authority+am`).
    pub authority: Identifier,
    /// Namespace all objects are created in.
    pub namespace: String,
    /// Disk image name to container image reference.
    pub container_images: BTreeMap<String, String>,
    /// Image name used when a node names no disk image.
    pub default_image: String,
    /// Container limits and requests.
    pub container_resources: ResourceRequirements,
    /// Lifetime of newly allocated slivers, in hours.
    pub sliver_lifetime_hours: u32,
    /// Budget for one inbound call, in seconds.
    pub call_timeout_secs: u64,
    /// PEM files holding the trusted root certificates.
    #[serde(default)]
    pub trusted_root_certs: Vec<PathBuf>,
}

impl ServiceConfig {
    /// Configuration for the aggregate `authority`, with one default image,
    /// 2 CPU / 2Gi limits and a 24 hour sliver lifetime.
    pub fn new(authority: Identifier, namespace: impl Into<String>) -> Self {
        let limits = ResourceList {
            cpu: "2".to_string(),
            memory: "2Gi".to_string(),
        };
        let mut container_images = BTreeMap::new();
        container_images.insert(DEFAULT_IMAGE_NAME.to_string(), DEFAULT_IMAGE.to_string());
        Self {
            authority,
            namespace: namespace.into(),
            container_images,
            default_image: DEFAULT_IMAGE_NAME.to_string(),
            container_resources: ResourceRequirements {
                requests: limits.clone(),
                limits,
            },
            sliver_lifetime_hours: 24,
            call_timeout_secs: 30,
            trusted_root_certs: Vec::new(),
        }
    }

    /// Configuration for `urn:publicid:IDN+<authority_name>+authority+am`.
    pub fn for_authority_name(
        authority_name: &str,
        namespace: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let authority = Identifier::new(
            vec![authority_name.to_string()],
            ResourceType::Authority,
            AM_RESOURCE_NAME,
        )?;
        Ok(Self::new(authority, namespace))
    }

    /// Loads a JSON configuration file and validates it.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Adds or replaces an image table entry.
    pub fn with_image(mut self, name: impl Into<String>, image: impl Into<String>) -> Self {
        self.container_images.insert(name.into(), image.into());
        self
    }

    /// Sets the default image name.
    pub fn with_default_image(mut self, name: impl Into<String>) -> Self {
        self.default_image = name.into();
        self
    }

    /// Sets container limits; requests follow unless set afterwards.
    pub fn with_limits(mut self, cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        let limits = ResourceList {
            cpu: cpu.into(),
            memory: memory.into(),
        };
        self.container_resources = ResourceRequirements {
            requests: limits.clone(),
            limits,
        };
        self
    }

    /// Sets container requests.
    pub fn with_requests(mut self, cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        self.container_resources.requests = ResourceList {
            cpu: cpu.into(),
            memory: memory.into(),
        };
        self
    }

    /// Sets the sliver lifetime.
    pub fn with_sliver_lifetime_hours(mut self, hours: u32) -> Self {
        self.sliver_lifetime_hours = hours;
        self
    }

    /// Sets the per-call budget.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_secs = timeout.as_secs();
        self
    }

    /// Adds a trusted root certificate file.
    pub fn with_trusted_root_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.trusted_root_certs.push(path.into());
        self
    }

    /// Fixed horizon applied to new slivers.
    pub fn sliver_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.sliver_lifetime_hours))
    }

    /// Budget for one inbound call.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Reads the trusted root certificate files.
    pub fn trusted_roots(&self) -> Result<TrustedRoots, ConfigError> {
        Ok(TrustedRoots::load(&self.trusted_root_certs)?)
    }

    /// Container image reference for an image table entry.
    pub fn image(&self, name: &str) -> Option<&str> {
        self.container_images.get(name).map(String::as_str)
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authority.resource_type() != ResourceType::Authority {
            return Err(ConfigError::NotAnAuthority(self.authority.clone()));
        }
        validate_object_name(&self.namespace)?;
        if !self.container_images.contains_key(&self.default_image) {
            return Err(ConfigError::UnknownDefaultImage(self.default_image.clone()));
        }
        let resources = &self.container_resources;
        for (what, quantity) in [
            ("cpu limit", &resources.limits.cpu),
            ("memory limit", &resources.limits.memory),
            ("cpu request", &resources.requests.cpu),
            ("memory request", &resources.requests.memory),
        ] {
            if quantity.trim().is_empty() {
                return Err(ConfigError::EmptyQuantity(what));
            }
        }
        if self.sliver_lifetime_hours == 0 {
            return Err(ConfigError::ZeroDuration("sliver lifetime"));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("call timeout"));
        }
        Ok(())
    }
}
