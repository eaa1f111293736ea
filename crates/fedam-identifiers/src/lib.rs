//! Identifier primitives for the fedam aggregate manager.
//!
//! Federation URNs (`urn:publicid:IDN+authority+type+name`) are the only
//! addressing scheme callers use. This crate parses them, derives
//! orchestrator-legal object names and label values from them, and carries
//! the orchestrator's syntax rules so derived names can be checked before
//! they are submitted.
//!
#![deny(missing_docs)]

/// Federation URN model.
pub mod identifiers;
/// Deterministic name and label derivation.
pub mod naming;
/// Orchestrator name/label syntax rules.
pub mod validation;

pub use identifiers::{Identifier, ParseError, ResourceType, URN_PREFIX};
pub use naming::{slice_hash, sliver_name, NamingError};
pub use validation::ValidationError;
