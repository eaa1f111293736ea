//! Orchestrator object model.
//!
//! A sliver is realized as three objects sharing one name: a configuration
//! object, a compute workload mounting it, and a network endpoint exposing
//! the workload's SSH port.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of orchestrator objects the aggregate manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Key/value data mounted into a workload.
    Config,
    /// Single-container compute workload.
    Workload,
    /// Externally reachable network endpoint.
    Endpoint,
}

impl ObjectKind {
    /// Every kind, in bundle creation order.
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Config, ObjectKind::Workload, ObjectKind::Endpoint];

    /// Lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Config => "config",
            ObjectKind::Workload => "workload",
            ObjectKind::Endpoint => "endpoint",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    /// Namespace.
    pub namespace: String,
    /// Name within the namespace.
    pub name: String,
}

impl NamespacedName {
    /// Creates a namespaced name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Metadata common to every object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object name.
    pub name: String,
    /// Namespace holding the object.
    pub namespace: String,
    /// Labels, used for selection.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations, informational only.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Namespaced name of the object.
    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }
}

/// Configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigObject {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Key/value data.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// CPU and memory quantities, in orchestrator notation (`500m`, `512Mi`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    /// CPU quantity.
    pub cpu: String,
    /// Memory quantity.
    pub memory: String,
}

/// Limits and requests of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Hard limits.
    pub limits: ResourceList,
    /// Scheduling requests.
    pub requests: ResourceList,
}

/// The single container of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Resource limits and requests.
    pub resources: ResourceRequirements,
    /// Name of the configuration object mounted into the container.
    pub config_volume: String,
    /// Mount path of the configuration volume.
    pub config_mount_path: String,
}

/// Compute workload object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadObject {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Labels the workload's pods carry; endpoints select on these.
    pub pod_labels: BTreeMap<String, String>,
    /// Container.
    pub container: ContainerSpec,
}

/// Port exposed by the endpoint.
pub const SSH_PORT: u16 = 22;

/// Network endpoint object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointObject {
    /// Metadata.
    pub meta: ObjectMeta,
    /// Pod labels selecting the backing workload.
    pub selector: BTreeMap<String, String>,
    /// Container port exposed.
    pub port: u16,
    /// Externally reachable port, assigned by the orchestrator on creation.
    #[serde(default)]
    pub external_port: Option<u16>,
}

/// Any orchestrator object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Object {
    /// Configuration object.
    Config(ConfigObject),
    /// Compute workload.
    Workload(WorkloadObject),
    /// Network endpoint.
    Endpoint(EndpointObject),
}

impl Object {
    /// Kind of the object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Config(_) => ObjectKind::Config,
            Object::Workload(_) => ObjectKind::Workload,
            Object::Endpoint(_) => ObjectKind::Endpoint,
        }
    }

    /// Metadata of the object.
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Object::Config(o) => &o.meta,
            Object::Workload(o) => &o.meta,
            Object::Endpoint(o) => &o.meta,
        }
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.meta().name
    }
}

/// Conversion between [`Object`] and its concrete kinds.
pub trait TypedObject: Sized {
    /// Kind this type represents.
    const KIND: ObjectKind;

    /// Extracts the concrete object, or `None` for another kind.
    fn from_object(object: Object) -> Option<Self>;

    /// Wraps the concrete object.
    fn into_object(self) -> Object;
}

macro_rules! typed_object {
    ($ty:ty, $variant:ident) => {
        impl TypedObject for $ty {
            const KIND: ObjectKind = ObjectKind::$variant;

            fn from_object(object: Object) -> Option<Self> {
                match object {
                    Object::$variant(o) => Some(o),
                    _ => None,
                }
            }

            fn into_object(self) -> Object {
                Object::$variant(self)
            }
        }

        impl From<$ty> for Object {
            fn from(o: $ty) -> Self {
                Object::$variant(o)
            }
        }
    };
}

typed_object!(ConfigObject, Config);
typed_object!(WorkloadObject, Workload);
typed_object!(EndpointObject, Endpoint);
