//! Request and manifest RSpec documents (GENI RSpec v3).
//!
//! Requests are decoded into [`RequestRspec`]. Manifests are produced by
//! rewriting the request event stream: the root `type` becomes `manifest` and
//! every provisioned node gains a `sliver_id`. Everything else, including
//! nodes addressed to other aggregates, is copied unchanged.

use std::collections::{BTreeMap, HashSet};

use fedam_identifiers::Identifier;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Deserialize;
use thiserror::Error;

/// Root `type` of request documents.
pub const REQUEST_TYPE: &str = "request";
/// Root `type` of manifest documents.
pub const MANIFEST_TYPE: &str = "manifest";

/// Errors raised while reading a request or writing a manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RspecError {
    /// The document is not well-formed or does not fit the RSpec schema.
    #[error("malformed rspec: {0}")]
    Xml(String),
    /// The root `type` attribute is not `request`.
    #[error("expected a request rspec, got type '{0}'")]
    WrongType(String),
    /// A node has an empty `client_id`.
    #[error("node without client_id")]
    EmptyClientId,
    /// Two nodes share a `client_id`.
    #[error("duplicate client_id '{0}'")]
    DuplicateClientId(String),
    /// The manifest could not be written.
    #[error("cannot write manifest: {0}")]
    Manifest(String),
}

/// Disk image named by a sliver type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiskImage {
    /// Image name or image URN.
    #[serde(rename = "@name")]
    pub name: String,
}

/// Sliver type requested for a node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SliverType {
    /// Sliver type name (`container`, ...).
    #[serde(rename = "@name")]
    pub name: String,
    /// Requested disk images.
    #[serde(rename = "disk_image", default)]
    pub disk_images: Vec<DiskImage>,
}

/// `<node>` element of a request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestedNode {
    /// Caller-chosen node id, unique within the request.
    #[serde(rename = "@client_id", default)]
    pub client_id: String,
    /// Aggregate the node is addressed to; absent means any.
    #[serde(rename = "@component_manager_id", default)]
    pub component_manager_id: Option<String>,
    /// Whether the node requires exclusive hardware.
    #[serde(rename = "@exclusive", default)]
    pub exclusive: bool,
    /// Requested sliver types.
    #[serde(rename = "sliver_type", default)]
    pub sliver_types: Vec<SliverType>,
}

impl RequestedNode {
    /// Whether the node is addressed to the aggregate `authority`.
    ///
    /// Nodes without a `component_manager_id` are taken by any aggregate.
    /// Unparseable ids never match.
    pub fn is_addressed_to(&self, authority: &Identifier) -> bool {
        match &self.component_manager_id {
            None => true,
            Some(id) => Identifier::parse(id.trim())
                .map(|id| id == *authority)
                .unwrap_or(false),
        }
    }
}

/// Decoded request RSpec.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename = "rspec")]
pub struct RequestRspec {
    /// Root `type` attribute.
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    /// Requested nodes, in document order.
    #[serde(rename = "node", default)]
    pub nodes: Vec<RequestedNode>,
}

impl RequestRspec {
    /// Decodes an unescaped request document.
    pub fn parse(xml: &str) -> Result<Self, RspecError> {
        let rspec: Self =
            quick_xml::de::from_str(xml).map_err(|e| RspecError::Xml(e.to_string()))?;
        if let Some(kind) = &rspec.kind {
            if !kind.eq_ignore_ascii_case(REQUEST_TYPE) {
                return Err(RspecError::WrongType(kind.clone()));
            }
        }
        let mut seen = HashSet::new();
        for node in &rspec.nodes {
            if node.client_id.is_empty() {
                return Err(RspecError::EmptyClientId);
            }
            if !seen.insert(node.client_id.as_str()) {
                return Err(RspecError::DuplicateClientId(node.client_id.clone()));
            }
        }
        Ok(rspec)
    }
}

/// Rewrites `request` into a manifest, setting `sliver_id` on the nodes
/// listed in `sliver_ids` (keyed by client id).
pub fn manifest(request: &str, sliver_ids: &BTreeMap<String, String>) -> Result<String, RspecError> {
    let mut reader = Reader::from_str(request);
    let mut writer = Writer::new(Vec::new());
    loop {
        let event = reader
            .read_event()
            .map_err(|e| RspecError::Xml(e.to_string()))?;
        let event = match event {
            Event::Eof => break,
            Event::Start(start) => Event::Start(rewrite_element(&start, sliver_ids)?),
            Event::Empty(start) => Event::Empty(rewrite_element(&start, sliver_ids)?),
            other => other,
        };
        writer
            .write_event(event)
            .map_err(|e| RspecError::Manifest(e.to_string()))?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| RspecError::Manifest(e.to_string()))
}

fn rewrite_element(
    start: &BytesStart<'_>,
    sliver_ids: &BTreeMap<String, String>,
) -> Result<BytesStart<'static>, RspecError> {
    let (replaced_key, replacement) = match start.local_name().as_ref() {
        b"rspec" => ("type", Some(MANIFEST_TYPE.to_string())),
        b"node" => {
            let client_id = attribute(start, "client_id")?;
            (
                "sliver_id",
                client_id.and_then(|id| sliver_ids.get(&id).cloned()),
            )
        }
        _ => return Ok(start.clone().into_owned()),
    };
    let Some(replacement) = replacement else {
        return Ok(start.clone().into_owned());
    };

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rewritten = BytesStart::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| RspecError::Xml(e.to_string()))?;
        if attr.key.as_ref() != replaced_key.as_bytes() {
            rewritten.push_attribute(attr);
        }
    }
    rewritten.push_attribute((replaced_key, replacement.as_str()));
    Ok(rewritten)
}

fn attribute(start: &BytesStart<'_>, key: &str) -> Result<Option<String>, RspecError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| RspecError::Xml(e.to_string()))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| RspecError::Xml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
