//! Gasket module: the static hardware description of the data fabric.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Position of a gasket inside a [`GasketTable`], resolved once at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GasketId(pub usize);

/// Which side of a gasket an endpoint attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Destination endpoints write into the gasket's input buffer.
    Input,
    /// Source endpoints read from the gasket's output buffer.
    Output,
}

/// A physical channel descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Channel {
    /// Hardware identifier of the channel, not necessarily `0..n-1`.
    pub index: u32,
    /// Declared size, present on fixed-size gaskets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u32>,
}

/// A fixed-capacity hardware endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Gasket {
    /// Unique gasket name.
    pub name: String,
    /// Total input buffer capacity in bytes.
    pub input_buffer_size: u32,
    /// Total output buffer capacity in bytes.
    pub output_buffer_size: u32,
    /// Physical input channels.
    #[serde(default)]
    pub input_streams: Vec<Channel>,
    /// Physical output channels.
    #[serde(default)]
    pub output_streams: Vec<Channel>,
    /// Smallest selectable input stream size; absent on fixed-size inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_input_stream_buffer_size: Option<u32>,
    /// Smallest selectable output stream size; absent on fixed-size outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_output_stream_buffer_size: Option<u32>,
    /// Output channel identity is slaved to the linked input channel.
    #[serde(default)]
    pub input_and_output_buffers_tied: bool,
}

impl Gasket {
    /// Capacity of one side in bytes.
    pub fn capacity(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Input => self.input_buffer_size,
            Direction::Output => self.output_buffer_size,
        }
    }

    /// Physical channels of one side.
    pub fn channels(&self, direction: Direction) -> &[Channel] {
        match direction {
            Direction::Input => &self.input_streams,
            Direction::Output => &self.output_streams,
        }
    }

    /// Minimum selectable size of one side, `None` when the side is fixed-size.
    pub fn min_stream_buffer_size(&self, direction: Direction) -> Option<u32> {
        match direction {
            Direction::Input => self.min_input_stream_buffer_size,
            Direction::Output => self.min_output_stream_buffer_size,
        }
    }

    /// Whether every physical channel of this side has one pre-declared size.
    pub fn is_fixed_size(&self, direction: Direction) -> bool {
        self.min_stream_buffer_size(direction).is_none()
    }

    /// Hardware identifier of the output channel at logical position `index`.
    pub fn output_channel_id(&self, index: usize) -> Option<u32> {
        self.output_streams.get(index).map(|c| c.index)
    }
}

/// Arena of gaskets with a name index, read-only after load.
#[derive(Debug, Clone, Default)]
pub struct GasketTable {
    gaskets: Vec<Gasket>,
    by_name: HashMap<String, GasketId>,
}

impl GasketTable {
    /// Build the table, rejecting duplicate names.
    pub fn new(gaskets: Vec<Gasket>) -> Result<Self, LoadError> {
        let mut by_name = HashMap::with_capacity(gaskets.len());
        for (i, gasket) in gaskets.iter().enumerate() {
            if by_name.insert(gasket.name.clone(), GasketId(i)).is_some() {
                return Err(LoadError::DuplicateGasket(gasket.name.clone()));
            }
        }
        Ok(Self { gaskets, by_name })
    }

    /// Number of gaskets.
    pub fn len(&self) -> usize {
        self.gaskets.len()
    }

    /// True when no gasket was loaded.
    pub fn is_empty(&self) -> bool {
        self.gaskets.is_empty()
    }

    /// Resolve a gasket name.
    pub fn id(&self, name: &str) -> Option<GasketId> {
        self.by_name.get(name).copied()
    }

    /// Look up a gasket by name.
    pub fn get(&self, name: &str) -> Option<&Gasket> {
        self.id(name).map(|id| &self.gaskets[id.0])
    }

    /// Gasket at an arena position.
    pub fn gasket(&self, id: GasketId) -> &Gasket {
        &self.gaskets[id.0]
    }

    /// Whether the named gasket exists and has tied buffers.
    pub fn is_tied(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|g| g.input_and_output_buffers_tied)
    }

    /// Iterate gaskets in load order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (GasketId, &Gasket)> {
        self.gaskets
            .iter()
            .enumerate()
            .map(|(i, g)| (GasketId(i), g))
    }
}
