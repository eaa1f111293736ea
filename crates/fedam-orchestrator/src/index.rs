//! Resolving federation identifiers to orchestrator objects.
//!
//! The naming scheme is the only index: slice identifiers resolve through the
//! slice-hash label, sliver identifiers carry the object name directly. No
//! state is kept here.

use std::collections::BTreeMap;

use fedam_identifiers::naming::SLIVER_NAME_LABEL;
use fedam_identifiers::{Identifier, ResourceType};
use tracing::debug;

use crate::deadline::Deadline;
use crate::error::IndexError;
use crate::object::{
    ConfigObject, EndpointObject, NamespacedName, Object, ObjectKind, TypedObject, WorkloadObject,
};
use crate::selector::slice_selector;
use crate::traits::Orchestrator;

/// Read-only view of the objects allocated in one namespace.
#[derive(Debug, Clone)]
pub struct ResourceIndex<O> {
    orchestrator: O,
    namespace: String,
}

/// The objects sharing one sliver name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleView {
    /// Sliver name shared by the objects.
    pub sliver_name: String,
    /// Configuration object, if present.
    pub config: Option<ConfigObject>,
    /// Workload, if present.
    pub workload: Option<WorkloadObject>,
    /// Endpoint, if present.
    pub endpoint: Option<EndpointObject>,
}

impl BundleView {
    /// Whether all three objects are present.
    pub fn is_complete(&self) -> bool {
        self.config.is_some() && self.workload.is_some() && self.endpoint.is_some()
    }
}

impl<O: Orchestrator> ResourceIndex<O> {
    /// Index over `namespace`.
    pub fn new(orchestrator: O, namespace: impl Into<String>) -> Self {
        Self {
            orchestrator,
            namespace: namespace.into(),
        }
    }

    /// Namespace searched.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Objects of `kind` belonging to `id`.
    ///
    /// A slice resolves to every object carrying its slice hash (possibly
    /// none). A sliver resolves to exactly one object, or fails with the
    /// orchestrator's not-found error.
    pub async fn resolve(
        &self,
        kind: ObjectKind,
        id: &Identifier,
        deadline: &Deadline,
    ) -> Result<Vec<Object>, IndexError> {
        debug!(%kind, %id, namespace = %self.namespace, "resolving");
        match id.resource_type() {
            ResourceType::Slice => {
                let selector = slice_selector(id);
                Ok(deadline
                    .run(self.orchestrator.list(kind, &self.namespace, &selector))
                    .await?)
            }
            ResourceType::Sliver => {
                let name = NamespacedName::new(self.namespace.clone(), id.resource_name());
                let object = deadline.run(self.orchestrator.get(kind, &name)).await?;
                Ok(vec![object])
            }
            other @ (ResourceType::Authority | ResourceType::User) => {
                Err(IndexError::UnsupportedIdentifierType(other))
            }
        }
    }

    /// Typed form of [`resolve`](Self::resolve).
    pub async fn resolve_typed<T: TypedObject>(
        &self,
        id: &Identifier,
        deadline: &Deadline,
    ) -> Result<Vec<T>, IndexError> {
        Ok(self
            .resolve(T::KIND, id, deadline)
            .await?
            .into_iter()
            .filter_map(T::from_object)
            .collect())
    }

    /// Concatenates [`resolve`](Self::resolve) over `ids`, failing on the first failure.
    pub async fn resolve_many(
        &self,
        kind: ObjectKind,
        ids: &[Identifier],
        deadline: &Deadline,
    ) -> Result<Vec<Object>, IndexError> {
        let mut objects = Vec::new();
        for id in ids {
            objects.extend(self.resolve(kind, id, deadline).await?);
        }
        Ok(objects)
    }

    /// Groups every kind resolved for `id` by sliver name.
    pub async fn bundles(
        &self,
        id: &Identifier,
        deadline: &Deadline,
    ) -> Result<Vec<BundleView>, IndexError> {
        let mut bundles: BTreeMap<String, BundleView> = BTreeMap::new();
        for kind in ObjectKind::ALL {
            for object in self.resolve(kind, id, deadline).await? {
                let sliver_name = object
                    .meta()
                    .labels
                    .get(SLIVER_NAME_LABEL)
                    .cloned()
                    .unwrap_or_else(|| object.name().to_string());
                let bundle = bundles
                    .entry(sliver_name.clone())
                    .or_insert_with(|| BundleView {
                        sliver_name,
                        ..Default::default()
                    });
                match object {
                    Object::Config(o) => bundle.config = Some(o),
                    Object::Workload(o) => bundle.workload = Some(o),
                    Object::Endpoint(o) => bundle.endpoint = Some(o),
                }
            }
        }
        Ok(bundles.into_values().collect())
    }
}
