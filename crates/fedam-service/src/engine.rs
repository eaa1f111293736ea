//! The allocation engine.
//!
//! An allocation is all-or-nothing: bundles are created one at a time in
//! request order, and the first failure deletes everything this call tried
//! to create before the error is returned.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fedam_credentials::{find_matching_credential, Credential, TrustVerifier, Verifier};
use fedam_identifiers::{Identifier, ResourceType, URN_PREFIX};
use fedam_orchestrator::{Deadline, NamespacedName, ObjectKind, Orchestrator, OrchestratorError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bundle::ResourceBundle;
use crate::config::ServiceConfig;
use crate::errors::AllocateError;
use crate::rspec::{self, RequestRspec, RequestedNode};

/// Allocation state of a sliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliverState {
    /// Not allocated.
    Unallocated,
    /// Resources reserved.
    Allocated,
    /// Resources instantiated.
    Provisioned,
    /// Allocation or provisioning failed.
    Failed,
}

impl SliverState {
    /// AM API v3 status string.
    pub fn as_geni(&self) -> &'static str {
        match self {
            SliverState::Unallocated => "geni_unallocated",
            SliverState::Allocated => "geni_allocated",
            SliverState::Provisioned => "geni_provisioned",
            SliverState::Failed => "geni_failed",
        }
    }
}

/// One sliver of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliverStatus {
    /// Sliver identifier.
    pub urn: Identifier,
    /// Client id of the node the sliver realizes.
    pub client_id: String,
    /// Expiry.
    pub expires: DateTime<Utc>,
    /// State.
    pub state: SliverState,
}

/// Inputs of one Allocate call.
#[derive(Debug, Clone)]
pub struct AllocateRequest {
    /// URN of the authenticated caller.
    pub caller_urn: String,
    /// URN of the slice to allocate into.
    pub slice_urn: String,
    /// Credentials presented by the caller.
    pub credentials: Vec<Credential>,
    /// Unescaped request RSpec.
    pub rspec: String,
    /// Requested sliver expiry, if any.
    pub end_time: Option<DateTime<Utc>>,
}

/// Outcome of a successful Allocate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// One entry per created bundle.
    pub slivers: Vec<SliverStatus>,
    /// Manifest RSpec.
    pub manifest: String,
}

/// The bundles a request would create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Bundles for nodes addressed to this aggregate, in request order.
    pub bundles: Vec<ResourceBundle>,
    /// Client ids of nodes left to other aggregates.
    pub passthrough: Vec<String>,
}

impl AllocationPlan {
    /// Sliver URN per client id, as written into the manifest.
    pub fn sliver_ids(&self) -> BTreeMap<String, String> {
        self.bundles
            .iter()
            .map(|b| (b.client_id.clone(), b.sliver_urn.to_urn()))
            .collect()
    }
}

/// Decodes `rspec` and builds one bundle per node addressed to this aggregate.
pub fn plan(
    config: &ServiceConfig,
    slice: &Identifier,
    user: &Identifier,
    rspec: &str,
    expires: DateTime<Utc>,
) -> Result<AllocationPlan, AllocateError> {
    let request = RequestRspec::parse(rspec)?;
    let mut bundles = Vec::new();
    let mut passthrough = Vec::new();
    for node in &request.nodes {
        if !node.is_addressed_to(&config.authority) {
            passthrough.push(node.client_id.clone());
            continue;
        }
        let image = select_image(config, node)?;
        bundles.push(ResourceBundle::build(
            config,
            slice,
            user,
            &node.client_id,
            image,
            expires,
        )?);
    }
    Ok(AllocationPlan {
        bundles,
        passthrough,
    })
}

fn select_image<'c>(config: &'c ServiceConfig, node: &RequestedNode) -> Result<&'c str, AllocateError> {
    if node.exclusive {
        return Err(AllocateError::BadArgs(format!(
            "node {}: exclusive allocation is not supported",
            node.client_id
        )));
    }
    let [sliver_type] = node.sliver_types.as_slice() else {
        return Err(AllocateError::BadArgs(format!(
            "node {}: expected exactly one sliver_type, got {}",
            node.client_id,
            node.sliver_types.len()
        )));
    };
    let name = match sliver_type.disk_images.as_slice() {
        [] => config.default_image.as_str(),
        [image] => image.name.as_str(),
        images => {
            return Err(AllocateError::BadArgs(format!(
                "node {}: expected at most one disk_image, got {}",
                node.client_id,
                images.len()
            )))
        }
    };
    lookup_image(config, name).ok_or_else(|| AllocateError::UnknownImage {
        client_id: node.client_id.clone(),
        image: name.to_string(),
    })
}

/// Image table entries match the disk image name, or the last segment of an image URN.
fn lookup_image<'c>(config: &'c ServiceConfig, name: &str) -> Option<&'c str> {
    config.image(name).or_else(|| {
        name.strip_prefix(URN_PREFIX)
            .and_then(|rest| rest.rsplit('+').next())
            .and_then(|short| config.image(short))
    })
}

/// Turns authorized requests into orchestrator objects.
pub struct AllocationEngine<O, T> {
    config: ServiceConfig,
    orchestrator: O,
    verifier: Verifier<T>,
}

impl<O: Orchestrator, T: TrustVerifier> AllocationEngine<O, T> {
    /// Creates an engine.
    pub fn new(config: ServiceConfig, orchestrator: O, verifier: Verifier<T>) -> Self {
        Self {
            config,
            orchestrator,
            verifier,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Orchestrator in use.
    pub fn orchestrator(&self) -> &O {
        &self.orchestrator
    }

    /// Expiry for slivers created now: the fixed horizon, shortened by `end_time`.
    pub fn sliver_expiry(
        &self,
        now: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, AllocateError> {
        let horizon = now + self.config.sliver_lifetime();
        match end_time {
            None => Ok(horizon),
            Some(end) if end <= now => Err(AllocateError::BadArgs(
                "geni_end_time is in the past".to_string(),
            )),
            Some(end) => Ok(end.min(horizon)),
        }
    }

    /// Authorizes the caller on the slice, then creates one bundle per node
    /// addressed to this aggregate.
    ///
    /// Every orchestrator and trust call runs under `deadline`. On failure
    /// nothing created by this call is left behind.
    #[tracing::instrument(skip_all, fields(caller = %request.caller_urn, slice = %request.slice_urn))]
    pub async fn allocate(
        &self,
        request: &AllocateRequest,
        deadline: &Deadline,
    ) -> Result<Allocation, AllocateError> {
        let caller = Identifier::parse(&request.caller_urn).map_err(|source| {
            AllocateError::BadUrn {
                field: "caller URN",
                source,
            }
        })?;
        let slice = Identifier::parse(&request.slice_urn).map_err(|source| {
            AllocateError::BadUrn {
                field: "slice URN",
                source,
            }
        })?;
        if slice.resource_type() != ResourceType::Slice {
            return Err(AllocateError::BadArgs(format!(
                "{} is not a slice URN",
                slice
            )));
        }

        let matched = deadline
            .within(find_matching_credential(
                &self.verifier,
                &caller,
                &slice,
                &request.credentials,
            ))
            .await
            .map_err(|_| AllocateError::Timeout)?;
        let assertion = matched.map_err(|e| {
            warn!(error = %e, credentials = request.credentials.len(), "authorization failed");
            AllocateError::AuthorizationFailed(e)
        })?;
        debug!(credential_expires = %assertion.expires, "caller authorized");

        let expires = self.sliver_expiry(Utc::now(), request.end_time)?;
        let planned = plan(&self.config, &slice, &caller, &request.rspec, expires)?;
        let manifest = rspec::manifest(&request.rspec, &planned.sliver_ids())?;

        self.create_all(&planned, deadline).await?;

        info!(
            slivers = planned.bundles.len(),
            passthrough = planned.passthrough.len(),
            "allocation complete"
        );
        Ok(Allocation {
            slivers: planned
                .bundles
                .iter()
                .map(|b| SliverStatus {
                    urn: b.sliver_urn.clone(),
                    client_id: b.client_id.clone(),
                    expires: b.expires,
                    state: SliverState::Allocated,
                })
                .collect(),
            manifest,
        })
    }

    async fn create_all(&self, plan: &AllocationPlan, deadline: &Deadline) -> Result<(), AllocateError> {
        // Every object whose create was attempted, in order.
        let mut compensation: Vec<(ObjectKind, NamespacedName)> = Vec::new();
        for bundle in &plan.bundles {
            for object in bundle.objects() {
                let kind = object.kind();
                compensation.push((kind, object.meta().key()));
                match deadline.run(self.orchestrator.create(object)).await {
                    Ok(_) => debug!(%kind, sliver = %bundle.sliver_name, "created"),
                    Err(OrchestratorError::AlreadyExists { .. }) => {
                        debug!(%kind, sliver = %bundle.sliver_name, "already exists")
                    }
                    Err(source) => {
                        warn!(
                            %kind,
                            sliver = %bundle.sliver_name,
                            client_id = %bundle.client_id,
                            error = %source,
                            "creation failed, rolling back"
                        );
                        self.rollback(&compensation).await;
                        return Err(AllocateError::AllocationFailed {
                            sliver_name: bundle.sliver_name.clone(),
                            source,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Deletes in reverse creation order. Runs under a fresh deadline so an
    /// expired request still cleans up.
    async fn rollback(&self, compensation: &[(ObjectKind, NamespacedName)]) {
        let deadline = Deadline::after(self.config.call_timeout());
        for (kind, name) in compensation.iter().rev() {
            match deadline.run(self.orchestrator.delete(*kind, name)).await {
                Ok(()) => debug!(%kind, %name, "rolled back"),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(%kind, %name, error = %e, "rollback delete failed"),
            }
        }
    }
}
