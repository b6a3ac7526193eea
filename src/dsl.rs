//! DSL module: builder API for stream drafts.
//!
//! A draft is the partial stream an editor hands to
//! [`DfgModel::create`](crate::model::DfgModel::create). Its stream id is only
//! meaningful on tied gaskets, where it comes from the linked input channel.

use crate::catalog::Catalog;
use crate::error::ModelError;
use crate::gasket::{Direction, GasketTable};
use crate::stream::{DfgStream, Endpoint, StreamId};
use thiserror::Error;

/// A stream that has not been placed yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamDraft {
    /// Pre-resolved id; required on tied source gaskets, ignored otherwise.
    pub stream_id: Option<StreamId>,
    pub source: Endpoint,
    pub destinations: Vec<Endpoint>,
    pub group: String,
    pub description: String,
}

impl StreamDraft {
    /// Draft sourced from `gasket` with `buffer_size` bytes.
    pub fn new(gasket: impl Into<String>, buffer_size: u32) -> Self {
        Self {
            source: Endpoint::new(gasket, buffer_size),
            ..Self::default()
        }
    }

    /// Draft sourced from `gasket`, preselecting the size when only one is legal.
    pub fn with_defaults(table: &GasketTable, catalog: &Catalog, gasket: impl Into<String>) -> Self {
        let gasket = gasket.into();
        let buffer_size = match catalog
            .props_by_name(table, &gasket)
            .map(|p| p.choices(Direction::Output))
        {
            Some([only]) => *only,
            _ => 0,
        };
        Self::new(gasket, buffer_size)
    }

    /// Draft for re-editing an existing stream.
    pub fn from_stream(stream: &DfgStream) -> Self {
        Self {
            stream_id: Some(stream.stream_id),
            source: stream.source.clone(),
            destinations: stream.destinations.clone(),
            group: stream.group.clone(),
            description: stream.description.clone(),
        }
    }

    /// Add a destination.
    pub fn destination(mut self, gasket: impl Into<String>, buffer_size: u32) -> Self {
        self.destinations.push(Endpoint::new(gasket, buffer_size));
        self
    }

    /// Set the group label.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set one source configuration entry.
    pub fn source_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.source.config.insert(key.into(), value);
        self
    }

    /// Link a tied source to the input channel `linked` writes into.
    ///
    /// The linked stream's destination position on the source gasket becomes
    /// this draft's source index; the physical output channel at that
    /// position becomes its stream id.
    pub fn link_tied(&mut self, table: &GasketTable, linked: &DfgStream) -> Result<(), ModelError> {
        let name = &self.source.gasket;
        let gasket = table
            .get(name)
            .ok_or_else(|| ModelError::UnknownGasket(name.clone()))?;
        let input_index = linked
            .destination_on(name)
            .map(|d| d.index)
            .ok_or_else(|| ModelError::LinkedStreamMissesGasket {
                stream: linked.stream_id,
                gasket: name.clone(),
            })?;
        let channel = gasket
            .output_channel_id(input_index)
            .ok_or_else(|| ModelError::NoAvailableChannel {
                gasket: name.clone(),
                used: input_index,
            })?;

        self.source.index = input_index;
        self.stream_id = Some(StreamId(channel));
        Ok(())
    }

    /// Required-field checks, in field order.
    pub fn validate(&self, table: &GasketTable) -> Vec<DraftError> {
        let mut errors = Vec::new();

        if self.source.gasket.is_empty() {
            errors.push(DraftError::MissingSourceGasket);
        }
        if self.destinations.is_empty() {
            errors.push(DraftError::MissingDestination);
        }
        if self.source.buffer_size == 0 {
            errors.push(DraftError::MissingSourceBufferSize);
        }
        for (position, destination) in self.destinations.iter().enumerate() {
            if destination.gasket.is_empty() {
                errors.push(DraftError::MissingDestinationGasket { position });
            }
            if destination.buffer_size == 0 {
                errors.push(DraftError::MissingDestinationBufferSize { position });
            }
        }
        if table.is_tied(&self.source.gasket) && self.stream_id.is_none() {
            errors.push(DraftError::TiedSourceNotLinked);
        }

        errors
    }

    pub(crate) fn into_stream(self, stream_id: StreamId) -> DfgStream {
        DfgStream {
            stream_id,
            source: self.source,
            destinations: self.destinations,
            group: self.group,
            description: self.description,
        }
    }
}

/// Draft field problems, reported before a create is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Source gasket is required")]
    MissingSourceGasket,
    #[error("At least one destination gasket is required")]
    MissingDestination,
    #[error("Source buffer size is required")]
    MissingSourceBufferSize,
    #[error("Destination {} gasket is required", .position + 1)]
    MissingDestinationGasket { position: usize },
    #[error("Destination {} buffer size is required", .position + 1)]
    MissingDestinationBufferSize { position: usize },
    #[error("A valid source stream must be selected for this gasket")]
    TiedSourceNotLinked,
}
