//! Allocation engine and AM API surface for the fedam aggregate manager.
//!
//! This crate provides:
//! - `ServiceConfig`, the explicit configuration threaded into the engine
//! - Request RSpec decoding and manifest generation
//! - `ResourceBundle`, the configuration/workload/endpoint triple per sliver
//! - `AllocationEngine`, which authorizes, plans and creates bundles
//!   all-or-nothing
//! - The Allocate RPC handler with GENI return codes
//!
//! ## Key Types
//!
//! - [`AllocationEngine`] - Authorize and allocate
//! - [`plan`] - Dry run of the planning stage
//! - [`Service`] - Allocate handler producing wire replies
//!
#![deny(missing_docs)]

/// Bundle construction.
pub mod bundle;
/// Configuration.
pub mod config;
/// Allocation engine.
pub mod engine;
/// Error types for allocation.
pub mod errors;
/// AM API wire types and handler.
pub mod rpc;
/// Request and manifest RSpecs.
pub mod rspec;

pub use bundle::ResourceBundle;
pub use config::{ConfigError, ServiceConfig};
pub use engine::{
    plan, AllocateRequest, Allocation, AllocationEngine, AllocationPlan, SliverState, SliverStatus,
};
pub use errors::AllocateError;
pub use rpc::{AllocateArgs, AllocateReply, GeniCode, Options, Service, Sliver};
pub use rspec::{RequestRspec, RequestedNode, RspecError};
