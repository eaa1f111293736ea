//! AM API v3 Allocate surface.
//!
//! Wire types mirror the XML-RPC structs (`geni_*` members). The transport
//! itself (XML-RPC over mutually authenticated TLS) lives outside this crate;
//! it hands over the caller's URN from the client certificate.

use chrono::{DateTime, SecondsFormat, Utc};
use fedam_credentials::{Credential, TrustVerifier};
use fedam_orchestrator::{Deadline, Orchestrator};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::engine::{AllocateRequest, Allocation, AllocationEngine};
use crate::errors::AllocateError;
use crate::rspec::RspecError;

/// GENI AM API return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeniCode {
    /// Success.
    Success,
    /// Bad arguments.
    BadArgs,
    /// Generic error.
    Error,
    /// Operation forbidden (authorization failure).
    Forbidden,
    /// Unsupported version.
    BadVersion,
    /// Internal server error.
    ServerError,
    /// Too big.
    TooBig,
    /// Operation refused.
    Refused,
    /// Operation timed out.
    TimedOut,
    /// Unsupported operation.
    Unsupported,
    /// Object expired.
    Expired,
}

impl GeniCode {
    /// Numeric code.
    pub fn as_i32(&self) -> i32 {
        match self {
            GeniCode::Success => 0,
            GeniCode::BadArgs => 1,
            GeniCode::Error => 2,
            GeniCode::Forbidden => 3,
            GeniCode::BadVersion => 4,
            GeniCode::ServerError => 5,
            GeniCode::TooBig => 6,
            GeniCode::Refused => 7,
            GeniCode::TimedOut => 8,
            GeniCode::Unsupported => 13,
            GeniCode::Expired => 15,
        }
    }
}

impl Serialize for GeniCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

/// Allocate options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Options {
    /// Partial allocation requested. Ignored: allocation is all-or-nothing.
    #[serde(rename = "geni_best_effort", default)]
    pub best_effort: bool,
    /// Requested expiry of new slivers (RFC 3339).
    #[serde(rename = "geni_end_time", default)]
    pub end_time: Option<String>,
}

/// Allocate arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocateArgs {
    /// Slice to allocate into.
    pub slice_urn: String,
    /// Credentials presented by the caller.
    #[serde(default)]
    pub credentials: Vec<Credential>,
    /// Entity-escaped request RSpec.
    pub rspec: String,
    /// Options.
    #[serde(default)]
    pub options: Options,
}

/// Sliver entry of an Allocate reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sliver {
    /// Sliver URN.
    #[serde(rename = "geni_sliver_urn")]
    pub urn: String,
    /// Expiry (RFC 3339).
    #[serde(rename = "geni_expires")]
    pub expires: String,
    /// Allocation status.
    #[serde(rename = "geni_allocation_status")]
    pub allocation_status: String,
    /// Error text for failed slivers.
    #[serde(rename = "geni_error", skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// `code` member of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplyCode {
    /// Return code.
    pub geni_code: GeniCode,
}

/// `value` member of an Allocate reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocateValue {
    /// Manifest RSpec; empty on failure.
    #[serde(rename = "geni_rspec")]
    pub rspec: String,
    /// Allocated slivers; empty on failure.
    #[serde(rename = "geni_slivers")]
    pub slivers: Vec<Sliver>,
    /// Caller-facing error message; empty on success.
    #[serde(rename = "geni_error", skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Allocate reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocateReply {
    /// Return code.
    pub code: ReplyCode,
    /// Result.
    pub value: AllocateValue,
}

impl AllocateReply {
    fn success(allocation: Allocation) -> Self {
        Self {
            code: ReplyCode {
                geni_code: GeniCode::Success,
            },
            value: AllocateValue {
                rspec: allocation.manifest,
                slivers: allocation
                    .slivers
                    .into_iter()
                    .map(|s| Sliver {
                        urn: s.urn.to_urn(),
                        expires: s.expires.to_rfc3339_opts(SecondsFormat::Secs, true),
                        allocation_status: s.state.as_geni().to_string(),
                        error: String::new(),
                    })
                    .collect(),
                error: String::new(),
            },
        }
    }

    fn failure(err: &AllocateError) -> Self {
        Self {
            code: ReplyCode {
                geni_code: err.geni_code(),
            },
            value: AllocateValue {
                error: err.public_message(),
                ..Default::default()
            },
        }
    }

    /// Numeric return code.
    pub fn geni_code(&self) -> i32 {
        self.code.geni_code.as_i32()
    }
}

/// AM API service.
pub struct Service<O, T> {
    engine: AllocationEngine<O, T>,
}

impl<O: Orchestrator, T: TrustVerifier> Service<O, T> {
    /// Wraps an engine.
    pub fn new(engine: AllocationEngine<O, T>) -> Self {
        Self { engine }
    }

    /// The engine behind the service.
    pub fn engine(&self) -> &AllocationEngine<O, T> {
        &self.engine
    }

    /// Allocate under the configured call budget.
    pub async fn allocate(&self, caller_urn: &str, args: AllocateArgs) -> AllocateReply {
        let deadline = Deadline::after(self.engine.config().call_timeout());
        self.allocate_with_deadline(caller_urn, args, &deadline).await
    }

    /// Allocate under `deadline`. Never fails: errors become a non-zero code.
    pub async fn allocate_with_deadline(
        &self,
        caller_urn: &str,
        args: AllocateArgs,
        deadline: &Deadline,
    ) -> AllocateReply {
        match self.try_allocate(caller_urn, args, deadline).await {
            Ok(allocation) => AllocateReply::success(allocation),
            Err(e) => {
                warn!(
                    code = e.geni_code().as_i32(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "allocate failed"
                );
                AllocateReply::failure(&e)
            }
        }
    }

    async fn try_allocate(
        &self,
        caller_urn: &str,
        args: AllocateArgs,
        deadline: &Deadline,
    ) -> Result<Allocation, AllocateError> {
        if args.options.best_effort {
            debug!("geni_best_effort ignored, allocation is all-or-nothing");
        }
        let rspec = quick_xml::escape::unescape(&args.rspec)
            .map_err(|e| AllocateError::BadRspec(RspecError::Xml(e.to_string())))?
            .into_owned();
        let end_time = args
            .options
            .end_time
            .as_deref()
            .map(parse_end_time)
            .transpose()?;
        let request = AllocateRequest {
            caller_urn: caller_urn.to_string(),
            slice_urn: args.slice_urn,
            credentials: args.credentials,
            rspec,
            end_time,
        };
        self.engine.allocate(&request, deadline).await
    }
}

fn parse_end_time(value: &str) -> Result<DateTime<Utc>, AllocateError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AllocateError::BadArgs(format!("geni_end_time '{}' is not an RFC 3339 timestamp", value)))
}
