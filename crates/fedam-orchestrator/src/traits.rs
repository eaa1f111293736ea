//! Orchestrator object capability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::object::{NamespacedName, Object, ObjectKind};
use crate::selector::LabelSelector;

/// Create/get/list/delete over namespaced orchestrator objects.
///
/// Implementations are shared across concurrent calls. Duplicate creates
/// must fail with [`OrchestratorError::AlreadyExists`] rather than replace
/// the stored object.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Creates `object` in the namespace named by its metadata and returns
    /// the stored copy, including any orchestrator-assigned fields.
    async fn create(&self, object: Object) -> Result<Object, OrchestratorError>;

    /// Fetches one object.
    async fn get(&self, kind: ObjectKind, name: &NamespacedName) -> Result<Object, OrchestratorError>;

    /// Lists the objects of `kind` in `namespace` whose labels match `selector`.
    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Object>, OrchestratorError>;

    /// Deletes one object. A missing object yields [`OrchestratorError::NotFound`].
    async fn delete(&self, kind: ObjectKind, name: &NamespacedName) -> Result<(), OrchestratorError>;
}

#[async_trait]
impl<T: Orchestrator + ?Sized> Orchestrator for Arc<T> {
    async fn create(&self, object: Object) -> Result<Object, OrchestratorError> {
        (**self).create(object).await
    }

    async fn get(&self, kind: ObjectKind, name: &NamespacedName) -> Result<Object, OrchestratorError> {
        (**self).get(kind, name).await
    }

    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Object>, OrchestratorError> {
        (**self).list(kind, namespace, selector).await
    }

    async fn delete(&self, kind: ObjectKind, name: &NamespacedName) -> Result<(), OrchestratorError> {
        (**self).delete(kind, name).await
    }
}
