//! Orchestrator object capability for the fedam aggregate manager.
//!
//! This crate provides:
//! - The `Orchestrator` trait over configuration, workload and endpoint objects
//! - An in-memory backend with fault injection
//! - Equality label selectors
//! - Per-call deadlines
//! - A resource index mapping slice and sliver identifiers to objects
//!
//! The orchestrator is the system of record; nothing here persists state of
//! its own.

#![deny(missing_docs)]

/// Per-call deadlines.
pub mod deadline;
/// Error types for orchestrator operations.
pub mod error;
/// Identifier-to-object resolution.
pub mod index;
/// In-memory backend.
pub mod memory;
/// Object model.
pub mod object;
/// Label selectors.
pub mod selector;
/// Orchestrator capability trait.
pub mod traits;

pub use deadline::Deadline;
pub use error::{DeadlineExceeded, IndexError, OrchestratorError, SelectorError};
pub use index::{BundleView, ResourceIndex};
pub use memory::MemoryOrchestrator;
pub use object::{
    ConfigObject, ContainerSpec, EndpointObject, NamespacedName, Object, ObjectKind, ObjectMeta,
    ResourceList, ResourceRequirements, TypedObject, WorkloadObject, SSH_PORT,
};
pub use selector::{slice_selector, LabelSelector};
pub use traits::Orchestrator;
