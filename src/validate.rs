//! Capacity and consistency checks over a packed model.
//!
//! Findings are data, never errors: an invalid model stays visible and
//! editable, and downstream code generation refuses to run while the
//! report is non-empty.

use crate::catalog::Catalog;
use crate::gasket::{Direction, GasketTable};
use crate::invariant_ppt::{assert_invariant, REPORT_COMPLETE};
use crate::stream::{DfgStream, StreamId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Stream-level finding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamErrorKind {
    /// Endpoint size is not a legal catalog choice.
    BufferSizeNotInRange,
    /// Endpoint names a gasket absent from the hardware description.
    UnknownGasket,
    /// Source logical index has no physical output channel.
    NoPhysicalChannel,
}

/// Gasket-level finding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GasketErrorKind {
    /// Inbound endpoints exceed the input capacity.
    OomInput,
    /// Outbound endpoints exceed the output capacity.
    OomOutput,
}

/// A finding attached to one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamError {
    /// Text shown next to the stream.
    pub message: String,
    /// What went wrong.
    #[serde(rename = "errorType")]
    pub kind: StreamErrorKind,
    /// Side of the stream the finding is about.
    pub direction: Direction,
}

/// A finding attached to one gasket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasketError {
    /// Text shown next to the gasket.
    pub message: String,
    /// What went wrong.
    #[serde(rename = "errorType")]
    pub kind: GasketErrorKind,
}

/// Everything the validator found, keyed for stable iteration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Findings per stream id; absent ids have none.
    pub stream_errors: BTreeMap<StreamId, Vec<StreamError>>,
    /// Findings per gasket name; absent gaskets have none.
    pub gasket_errors: BTreeMap<String, Vec<GasketError>>,
}

impl ErrorReport {
    /// True when nothing was found.
    pub fn is_empty(&self) -> bool {
        self.stream_errors.is_empty() && self.gasket_errors.is_empty()
    }

    /// Findings for one stream.
    pub fn for_stream(&self, id: StreamId) -> &[StreamError] {
        self.stream_errors.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Findings for one gasket.
    pub fn for_gasket(&self, name: &str) -> &[GasketError] {
        self.gasket_errors.get(name).map_or(&[], Vec::as_slice)
    }

    fn add_stream_error(&mut self, id: StreamId, error: StreamError) {
        self.stream_errors.entry(id).or_default().push(error);
    }

    fn add_gasket_error(&mut self, name: &str, error: GasketError) {
        self.gasket_errors
            .entry(name.to_string())
            .or_default()
            .push(error);
    }
}

/// Buffer usage of one gasket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasketUsage {
    /// Gasket name.
    pub name: String,
    /// Destination endpoints placed on the gasket.
    pub inbound_streams: usize,
    /// Streams sourced from the gasket.
    pub outbound_streams: usize,
    /// Bytes requested on the input side.
    pub input_bytes: u64,
    /// Bytes requested on the output side.
    pub output_bytes: u64,
    /// `InputBufferSize` of the gasket.
    pub input_capacity: u32,
    /// `OutputBufferSize` of the gasket.
    pub output_capacity: u32,
}

impl GasketUsage {
    /// Input side is over capacity.
    pub fn input_overflow(&self) -> bool {
        self.input_bytes > u64::from(self.input_capacity)
    }

    /// Output side is over capacity.
    pub fn output_overflow(&self) -> bool {
        self.output_bytes > u64::from(self.output_capacity)
    }
}

/// Usage of every gasket, in table order.
///
/// Streams whose source gasket is unknown count nowhere.
pub fn gasket_usage(table: &GasketTable, streams: &[DfgStream]) -> Vec<GasketUsage> {
    let mut usage: Vec<GasketUsage> = table
        .iter()
        .map(|(_, g)| GasketUsage {
            name: g.name.clone(),
            input_capacity: g.input_buffer_size,
            output_capacity: g.output_buffer_size,
            ..GasketUsage::default()
        })
        .collect();

    for stream in streams {
        let Some(source) = table.id(&stream.source.gasket) else {
            continue;
        };
        usage[source.0].outbound_streams += 1;
        usage[source.0].output_bytes += u64::from(stream.source.buffer_size);
        for destination in &stream.destinations {
            if let Some(id) = table.id(&destination.gasket) {
                usage[id.0].inbound_streams += 1;
                usage[id.0].input_bytes += u64::from(destination.buffer_size);
            }
        }
    }
    usage
}

/// Run the capacity pass and the per-stream legality pass.
pub fn validate_dfg_errors(table: &GasketTable, catalog: &Catalog, streams: &[DfgStream]) -> ErrorReport {
    let mut report = ErrorReport::default();

    for usage in gasket_usage(table, streams) {
        if usage.input_overflow() {
            report.add_gasket_error(
                &usage.name,
                GasketError {
                    message: format!(
                        "Gasket {} uses {} bytes of input buffer space, which is greater than the gasket's capacity of {} bytes",
                        usage.name, usage.input_bytes, usage.input_capacity
                    ),
                    kind: GasketErrorKind::OomInput,
                },
            );
        }
        if usage.output_overflow() {
            report.add_gasket_error(
                &usage.name,
                GasketError {
                    message: format!(
                        "Gasket {} uses {} bytes of output buffer space, which is greater than the gasket's capacity of {} bytes",
                        usage.name, usage.output_bytes, usage.output_capacity
                    ),
                    kind: GasketErrorKind::OomOutput,
                },
            );
        }
    }

    for stream in streams {
        check_stream(table, catalog, stream, &mut report);
    }

    let findings: usize = report.stream_errors.values().map(Vec::len).sum::<usize>()
        + report.gasket_errors.values().map(Vec::len).sum::<usize>();
    assert_invariant(
        REPORT_COMPLETE,
        report.gasket_errors.keys().all(|name| table.id(name).is_some())
            && report.gasket_errors.values().all(|e| !e.is_empty())
            && report.stream_errors.values().all(|e| !e.is_empty()),
        "gasket findings name known gaskets and no entry is empty",
        Some("validate_dfg_errors"),
    );
    tracing::debug!(findings, "DFG validated");

    report
}

fn check_stream(table: &GasketTable, catalog: &Catalog, stream: &DfgStream, report: &mut ErrorReport) {
    let id = stream.stream_id;

    let Some(source_id) = table.id(&stream.source.gasket) else {
        report.add_stream_error(
            id,
            StreamError {
                message: format!(
                    "Stream {} has an unknown source gasket {}",
                    id, stream.source.gasket
                ),
                kind: StreamErrorKind::UnknownGasket,
                direction: Direction::Output,
            },
        );
        return;
    };

    let source_gasket = table.gasket(source_id);
    let size = stream.source.buffer_size;
    let legal = catalog
        .props(source_id)
        .is_some_and(|p| p.allows(Direction::Output, size));
    if !legal {
        report.add_stream_error(
            id,
            StreamError {
                message: format!(
                    "Stream {} has an invalid output buffer size of {} bytes at the {} Gasket",
                    id, size, source_gasket.name
                ),
                kind: StreamErrorKind::BufferSizeNotInRange,
                direction: Direction::Output,
            },
        );
    }

    if !source_gasket.input_and_output_buffers_tied
        && source_gasket.output_channel_id(stream.source.index).is_none()
    {
        report.add_stream_error(
            id,
            StreamError {
                message: format!(
                    "Stream {} uses output position {} but the {} Gasket has only {} output channels",
                    id,
                    stream.source.index,
                    source_gasket.name,
                    source_gasket.output_streams.len()
                ),
                kind: StreamErrorKind::NoPhysicalChannel,
                direction: Direction::Output,
            },
        );
    }

    for destination in &stream.destinations {
        let Some(destination_id) = table.id(&destination.gasket) else {
            report.add_stream_error(
                id,
                StreamError {
                    message: format!(
                        "Stream {} has an unknown destination gasket {}",
                        id, destination.gasket
                    ),
                    kind: StreamErrorKind::UnknownGasket,
                    direction: Direction::Input,
                },
            );
            continue;
        };

        let size = destination.buffer_size;
        let legal = catalog
            .props(destination_id)
            .is_some_and(|p| p.allows(Direction::Input, size));
        if !legal {
            report.add_stream_error(
                id,
                StreamError {
                    message: format!(
                        "Stream {} has an invalid input buffer size of {} bytes at the {} Gasket",
                        id, size, destination.gasket
                    ),
                    kind: StreamErrorKind::BufferSizeNotInRange,
                    direction: Direction::Input,
                },
            );
        }
    }
}
