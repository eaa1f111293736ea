//! The orchestrator objects that realize one sliver.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use fedam_identifiers::naming::{
    CLIENT_ID_ANNOTATION, EXPIRES_ANNOTATION, SLICE_HASH_LABEL, SLICE_URN_ANNOTATION,
    SLIVER_NAME_LABEL, SLIVER_URN_ANNOTATION, USER_URN_ANNOTATION,
};
use fedam_identifiers::{slice_hash, sliver_name, Identifier, NamingError, ResourceType};
use fedam_orchestrator::{
    ConfigObject, ContainerSpec, EndpointObject, Object, ObjectMeta, WorkloadObject, SSH_PORT,
};

use crate::config::ServiceConfig;

/// Name of the workload's only container.
pub const CONTAINER_NAME: &str = "sliver";
/// Where the configuration object is mounted in the container.
pub const CONFIG_MOUNT_PATH: &str = "/etc/fedam";

/// Configuration, workload and endpoint sharing one sliver name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    /// Client id of the requested node.
    pub client_id: String,
    /// Derived object name.
    pub sliver_name: String,
    /// Identifier of the sliver.
    pub sliver_urn: Identifier,
    /// Sliver expiry.
    pub expires: DateTime<Utc>,
    /// Configuration object.
    pub config: ConfigObject,
    /// Compute workload.
    pub workload: WorkloadObject,
    /// Network endpoint.
    pub endpoint: EndpointObject,
}

impl ResourceBundle {
    /// Builds the bundle for node `client_id` of `slice`, running `image`.
    pub fn build(
        config: &ServiceConfig,
        slice: &Identifier,
        user: &Identifier,
        client_id: &str,
        image: &str,
        expires: DateTime<Utc>,
    ) -> Result<Self, NamingError> {
        let name = sliver_name(slice, client_id)?;
        let sliver_urn = config.authority.derive(ResourceType::Sliver, name.clone());
        let expires_text = expires.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut labels = BTreeMap::new();
        labels.insert(SLICE_HASH_LABEL.to_string(), slice_hash(slice));
        labels.insert(SLIVER_NAME_LABEL.to_string(), name.clone());

        let mut annotations = BTreeMap::new();
        annotations.insert(CLIENT_ID_ANNOTATION.to_string(), client_id.to_string());
        annotations.insert(SLICE_URN_ANNOTATION.to_string(), slice.to_urn());
        annotations.insert(USER_URN_ANNOTATION.to_string(), user.to_urn());
        annotations.insert(SLIVER_URN_ANNOTATION.to_string(), sliver_urn.to_urn());
        annotations.insert(EXPIRES_ANNOTATION.to_string(), expires_text.clone());

        let meta = ObjectMeta {
            name: name.clone(),
            namespace: config.namespace.clone(),
            labels: labels.clone(),
            annotations,
        };

        // Mounted into the container so a sliver can find out who it is.
        let mut data = BTreeMap::new();
        data.insert("client_id".to_string(), client_id.to_string());
        data.insert("slice_urn".to_string(), slice.to_urn());
        data.insert("sliver_urn".to_string(), sliver_urn.to_urn());
        data.insert("user_urn".to_string(), user.to_urn());
        data.insert("expires".to_string(), expires_text);

        let mut selector = BTreeMap::new();
        selector.insert(SLIVER_NAME_LABEL.to_string(), name.clone());

        Ok(Self {
            client_id: client_id.to_string(),
            sliver_urn,
            expires,
            config: ConfigObject {
                meta: meta.clone(),
                data,
            },
            workload: WorkloadObject {
                meta: meta.clone(),
                pod_labels: labels,
                container: ContainerSpec {
                    name: CONTAINER_NAME.to_string(),
                    image: image.to_string(),
                    resources: config.container_resources.clone(),
                    config_volume: name.clone(),
                    config_mount_path: CONFIG_MOUNT_PATH.to_string(),
                },
            },
            endpoint: EndpointObject {
                meta,
                selector,
                port: SSH_PORT,
                external_port: None,
            },
            sliver_name: name,
        })
    }

    /// Objects in creation order: configuration, workload, endpoint.
    pub fn objects(&self) -> [Object; 3] {
        [
            self.config.clone().into(),
            self.workload.clone().into(),
            self.endpoint.clone().into(),
        ]
    }
}
