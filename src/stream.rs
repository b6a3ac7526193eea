//! Stream module: the mutable routes between gaskets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Physical output-channel identifier of a stream on its source gasket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StreamId(pub u32);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque per-endpoint configuration, carried verbatim.
pub type EndpointConfig = BTreeMap<String, serde_json::Value>;

/// One side of a stream's attachment to a gasket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    /// Gasket name.
    pub gasket: String,
    /// Logical 0-based position among same-direction endpoints on the gasket.
    #[serde(default)]
    pub index: usize,
    /// Byte offset inside the gasket's buffer for this side.
    #[serde(default)]
    pub buffer_address: u32,
    /// Bytes reserved for this endpoint.
    #[serde(default)]
    pub buffer_size: u32,
    /// Endpoint configuration.
    #[serde(default)]
    pub config: EndpointConfig,
}

impl Endpoint {
    /// Endpoint on `gasket` reserving `buffer_size` bytes, not yet placed.
    pub fn new(gasket: impl Into<String>, buffer_size: u32) -> Self {
        Self {
            gasket: gasket.into(),
            buffer_size,
            ..Self::default()
        }
    }
}

/// A configured data route: one source, one or more destinations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DfgStream {
    /// Physical channel identifier on the source gasket.
    pub stream_id: StreamId,
    /// Source endpoint.
    pub source: Endpoint,
    /// Destination endpoints (fan-out).
    pub destinations: Vec<Endpoint>,
    /// Free-form group label, empty when ungrouped.
    #[serde(default)]
    pub group: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl DfgStream {
    /// First destination attached to `gasket`.
    pub fn destination_on(&self, gasket: &str) -> Option<&Endpoint> {
        self.destinations.iter().find(|d| d.gasket == gasket)
    }
}

/// Field replacements applied by an update; `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamPatch {
    /// New source endpoint.
    pub source: Option<Endpoint>,
    /// New destination list.
    pub destinations: Option<Vec<Endpoint>>,
    /// New group label.
    pub group: Option<String>,
    /// New description.
    pub description: Option<String>,
}

impl StreamPatch {
    /// Apply the replacements to `stream` in place.
    pub fn apply(&self, stream: &mut DfgStream) {
        if let Some(source) = &self.source {
            stream.source = source.clone();
        }
        if let Some(destinations) = &self.destinations {
            stream.destinations = destinations.clone();
        }
        if let Some(group) = &self.group {
            stream.group = group.clone();
        }
        if let Some(description) = &self.description {
            stream.description = description.clone();
        }
    }
}
