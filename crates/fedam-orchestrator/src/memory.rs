//! In-memory orchestrator backend.
//!
//! Behaves like a real orchestrator for the calls the aggregate makes:
//! names and labels are syntax-checked, duplicate creates are refused and
//! endpoints get an external port on creation. Faults can be injected to
//! exercise rollback and deadline paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

use async_trait::async_trait;
use fedam_identifiers::validation::{validate_label_key, validate_label_value, validate_object_name};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::OrchestratorError;
use crate::object::{NamespacedName, Object, ObjectKind};
use crate::selector::LabelSelector;
use crate::traits::Orchestrator;

/// First port handed out to endpoints.
pub const FIRST_EXTERNAL_PORT: u16 = 30000;

#[derive(Debug, Default)]
struct Faults {
    fail_create: HashSet<(ObjectKind, String)>,
    fail_delete: HashSet<(ObjectKind, String)>,
    hang: bool,
}

/// Orchestrator holding objects in process memory.
#[derive(Debug)]
pub struct MemoryOrchestrator {
    objects: RwLock<BTreeMap<(ObjectKind, NamespacedName), Object>>,
    faults: Mutex<Faults>,
    next_port: AtomicU16,
    create_attempts: AtomicUsize,
}

impl Default for MemoryOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrchestrator {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            faults: Mutex::new(Faults::default()),
            next_port: AtomicU16::new(FIRST_EXTERNAL_PORT),
            create_attempts: AtomicUsize::new(0),
        }
    }

    /// Makes every create of `kind` named `name` fail with a transport error.
    pub fn fail_create(&self, kind: ObjectKind, name: impl Into<String>) {
        self.faults.lock().fail_create.insert((kind, name.into()));
    }

    /// Makes every delete of `kind` named `name` fail with a transport error.
    pub fn fail_delete(&self, kind: ObjectKind, name: impl Into<String>) {
        self.faults.lock().fail_delete.insert((kind, name.into()));
    }

    /// Makes every call block until the caller gives up.
    pub fn hang(&self, hang: bool) {
        self.faults.lock().hang = hang;
    }

    /// Removes all injected faults.
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Stored objects of `kind`, ordered by namespace and name.
    pub fn objects(&self, kind: ObjectKind) -> Vec<Object> {
        self.objects
            .read()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, object)| object.clone())
            .collect()
    }

    /// Number of create calls received, successful or not.
    pub fn create_attempts(&self) -> usize {
        self.create_attempts.load(Ordering::SeqCst)
    }

    async fn stall_if_hanging(&self) {
        let hang = self.faults.lock().hang;
        if hang {
            std::future::pending::<()>().await;
        }
    }

    fn injected(&self, delete: bool, kind: ObjectKind, name: &str) -> Option<OrchestratorError> {
        let faults = self.faults.lock();
        let set = if delete {
            &faults.fail_delete
        } else {
            &faults.fail_create
        };
        set.contains(&(kind, name.to_string()))
            .then(|| OrchestratorError::Transport(format!("injected failure for {} {}", kind, name)))
    }
}

fn check_object(object: &Object) -> Result<(), OrchestratorError> {
    let meta = object.meta();
    let invalid = |e: fedam_identifiers::ValidationError| OrchestratorError::Invalid(e.to_string());
    validate_object_name(&meta.name).map_err(invalid)?;
    validate_object_name(&meta.namespace).map_err(invalid)?;
    for (key, value) in &meta.labels {
        validate_label_key(key).map_err(invalid)?;
        validate_label_value(value).map_err(invalid)?;
    }
    for key in meta.annotations.keys() {
        validate_label_key(key).map_err(invalid)?;
    }
    Ok(())
}

#[async_trait]
impl Orchestrator for MemoryOrchestrator {
    async fn create(&self, mut object: Object) -> Result<Object, OrchestratorError> {
        self.stall_if_hanging().await;
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        let kind = object.kind();
        if let Some(err) = self.injected(false, kind, object.name()) {
            return Err(err);
        }
        check_object(&object)?;

        let key = object.meta().key();
        let mut objects = self.objects.write();
        if objects.contains_key(&(kind, key.clone())) {
            return Err(OrchestratorError::AlreadyExists {
                kind,
                namespace: key.namespace,
                name: key.name,
            });
        }
        if let Object::Endpoint(endpoint) = &mut object {
            endpoint.external_port = Some(self.next_port.fetch_add(1, Ordering::SeqCst));
        }
        debug!(%kind, name = %key, "stored");
        objects.insert((kind, key), object.clone());
        Ok(object)
    }

    async fn get(&self, kind: ObjectKind, name: &NamespacedName) -> Result<Object, OrchestratorError> {
        self.stall_if_hanging().await;
        self.objects
            .read()
            .get(&(kind, name.clone()))
            .cloned()
            .ok_or_else(|| OrchestratorError::NotFound {
                kind,
                namespace: name.namespace.clone(),
                name: name.name.clone(),
            })
    }

    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Object>, OrchestratorError> {
        self.stall_if_hanging().await;
        Ok(self
            .objects
            .read()
            .iter()
            .filter(|((k, key), object)| {
                *k == kind && key.namespace == namespace && selector.matches(&object.meta().labels)
            })
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn delete(&self, kind: ObjectKind, name: &NamespacedName) -> Result<(), OrchestratorError> {
        self.stall_if_hanging().await;
        if let Some(err) = self.injected(true, kind, &name.name) {
            return Err(err);
        }
        match self.objects.write().remove(&(kind, name.clone())) {
            Some(_) => {
                debug!(%kind, %name, "removed");
                Ok(())
            }
            None => Err(OrchestratorError::NotFound {
                kind,
                namespace: name.namespace.clone(),
                name: name.name.clone(),
            }),
        }
    }
}
