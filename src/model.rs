//! Model module: the single mutable stream model and its lifecycle API.
//!
//! Every mutation edits the stream list and then re-runs the index, packing
//! and validation passes over the whole model. Nothing is updated
//! incrementally, so no stream is ever visible half-computed.

use crate::action::ModelAction;
use crate::catalog::Catalog;
use crate::dsl::StreamDraft;
use crate::error::{ModelError, Result};
use crate::gasket::GasketTable;
use crate::index::resolve_indices;
use crate::invariant_ppt::{assert_invariant, CREATE_REJECTS_FULL, RECOMPUTE_WHOLE_MODEL};
use crate::plan::Plan;
use crate::stream::{DfgStream, StreamId, StreamPatch};
use crate::validate::{gasket_usage, validate_dfg_errors, ErrorReport, GasketUsage, StreamErrorKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output of one full recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct Recomputed {
    pub streams: Vec<DfgStream>,
    pub plan: Plan,
    pub report: ErrorReport,
}

/// Run index resolution, packing and validation over `streams`.
pub fn recompute_streams(table: &GasketTable, catalog: &Catalog, mut streams: Vec<DfgStream>) -> Recomputed {
    let moves = resolve_indices(table, &mut streams);
    let plan = Plan::compile(table, &mut streams, &moves);
    let report = validate_dfg_errors(table, catalog, &streams);

    assert_invariant(
        RECOMPUTE_WHOLE_MODEL,
        channels_settled(table, &streams, &report),
        "every placed non-tied stream carries its channel or is reported",
        Some("recompute_streams"),
    );
    debug!(
        streams = streams.len(),
        moved = !moves.is_empty(),
        clean = report.is_empty(),
        "streams recomputed"
    );

    Recomputed {
        streams,
        plan,
        report,
    }
}

/// Every non-tied stream with a known source either carries the id of its
/// physical channel or has a finding saying the channel is missing.
fn channels_settled(table: &GasketTable, streams: &[DfgStream], report: &ErrorReport) -> bool {
    streams.iter().all(|stream| {
        let Some(gasket) = table.get(&stream.source.gasket) else {
            return true;
        };
        if gasket.input_and_output_buffers_tied {
            return true;
        }
        match gasket.output_channel_id(stream.source.index) {
            Some(channel) => stream.stream_id == StreamId(channel),
            None => report
                .for_stream(stream.stream_id)
                .iter()
                .any(|e| e.kind == StreamErrorKind::NoPhysicalChannel),
        }
    })
}

/// The stream model of one open project.
#[derive(Debug, Clone)]
pub struct DfgModel {
    gaskets: Arc<GasketTable>,
    catalog: Catalog,
    streams: Vec<DfgStream>,
    plan: Plan,
    report: ErrorReport,
    editing: Option<DfgStream>,
}

impl DfgModel {
    /// Empty model over a hardware description.
    pub fn new(gaskets: impl Into<Arc<GasketTable>>) -> Self {
        Self::load(gaskets, Vec::new())
    }

    /// Model over previously persisted streams, recomputed once.
    pub fn load(gaskets: impl Into<Arc<GasketTable>>, streams: Vec<DfgStream>) -> Self {
        let gaskets = gaskets.into();
        let catalog = Catalog::build(&gaskets);
        let mut model = Self {
            gaskets,
            catalog,
            streams,
            plan: Plan::default(),
            report: ErrorReport::default(),
            editing: None,
        };
        model.recompute();
        info!(
            gaskets = model.gaskets.len(),
            streams = model.streams.len(),
            "DFG model loaded"
        );
        model
    }

    /// The static hardware description.
    pub fn gaskets(&self) -> &GasketTable {
        &self.gaskets
    }

    /// Legal buffer sizes per gasket.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All streams in display order.
    pub fn streams(&self) -> &[DfgStream] {
        &self.streams
    }

    /// First stream carrying `id`.
    pub fn stream(&self, id: StreamId) -> Option<&DfgStream> {
        self.streams.iter().find(|s| s.stream_id == id)
    }

    /// Latest validation findings.
    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    /// Latest packing plan.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Streams with a destination on `gasket`, in packing order.
    pub fn inbound(&self, gasket: &str) -> Vec<&DfgStream> {
        self.gaskets.id(gasket).map_or_else(Vec::new, |id| {
            self.plan
                .inbound(id)
                .iter()
                .map(|slot| &self.streams[slot.stream])
                .collect()
        })
    }

    /// Streams sourced from `gasket`, in packing order.
    pub fn outbound(&self, gasket: &str) -> Vec<&DfgStream> {
        self.gaskets.id(gasket).map_or_else(Vec::new, |id| {
            self.plan
                .outbound(id)
                .iter()
                .map(|&i| &self.streams[i])
                .collect()
        })
    }

    /// Buffer usage per gasket.
    pub fn usage(&self) -> Vec<GasketUsage> {
        gasket_usage(&self.gaskets, &self.streams)
    }

    /// The stream currently open for editing.
    pub fn editing(&self) -> Option<&DfgStream> {
        self.editing.as_ref()
    }

    /// Stream id a draft would receive, without changing the model.
    pub fn next_stream_id(&self, draft: &StreamDraft) -> Result<StreamId> {
        let name = &draft.source.gasket;
        let id = self
            .gaskets
            .id(name)
            .ok_or_else(|| ModelError::UnknownGasket(name.clone()))?;
        let gasket = self.gaskets.gasket(id);

        if gasket.input_and_output_buffers_tied {
            return draft.stream_id.ok_or_else(|| ModelError::TiedSourceNotLinked {
                gasket: name.clone(),
            });
        }

        let used = self.plan.outbound(id).len();
        match gasket.output_channel_id(used) {
            Some(channel) => Ok(StreamId(channel)),
            None => {
                assert_invariant(
                    CREATE_REJECTS_FULL,
                    used >= gasket.output_streams.len(),
                    "rejection only when every output channel is taken",
                    Some(name),
                );
                Err(ModelError::NoAvailableChannel {
                    gasket: name.clone(),
                    used,
                })
            }
        }
    }

    /// Append a stream built from `draft` and recompute.
    pub fn create(&mut self, draft: StreamDraft) -> Result<StreamId> {
        let stream_id = self.next_stream_id(&draft).inspect_err(|e| {
            warn!(gasket = %draft.source.gasket, "stream rejected: {e}");
        })?;

        self.streams.push(draft.into_stream(stream_id));
        self.recompute();

        let created = self
            .streams
            .last()
            .map_or(stream_id, |s| s.stream_id);
        info!(stream_id = %created, "stream created");
        Ok(created)
    }

    /// Replace fields of the stream(s) carrying `id` and recompute.
    ///
    /// A stream sourced from a tied gasket takes the id of the output channel
    /// at its (possibly new) source index. Returns the id the edited stream
    /// carries afterwards.
    pub fn update(&mut self, id: StreamId, patch: &StreamPatch) -> Result<StreamId> {
        let mut patched = Vec::new();
        for (i, stream) in self.streams.iter().enumerate() {
            if stream.stream_id != id {
                continue;
            }
            let mut stream = stream.clone();
            patch.apply(&mut stream);
            if let Some(gasket) = self.gaskets.get(&stream.source.gasket) {
                if gasket.input_and_output_buffers_tied {
                    let channel = gasket.output_channel_id(stream.source.index).ok_or_else(|| {
                        ModelError::NoAvailableChannel {
                            gasket: gasket.name.clone(),
                            used: stream.source.index,
                        }
                    })?;
                    stream.stream_id = StreamId(channel);
                }
            }
            patched.push((i, stream));
        }
        let position = patched
            .first()
            .map(|(i, _)| *i)
            .ok_or(ModelError::StreamNotFound(id))?;

        for (i, stream) in patched {
            self.streams[i] = stream;
        }
        self.recompute();

        let updated = self.streams[position].clone();
        if self.editing.as_ref().is_some_and(|e| e.stream_id == id) {
            self.editing = Some(updated.clone());
        }
        info!(stream_id = %id, now = %updated.stream_id, "stream updated");
        Ok(updated.stream_id)
    }

    /// Re-link a tied stream to the input channel that `linked` writes into.
    pub fn relink_tied(&mut self, id: StreamId, linked: StreamId) -> Result<StreamId> {
        let stream = self.stream(id).ok_or(ModelError::StreamNotFound(id))?;
        let linked = self.stream(linked).ok_or(ModelError::StreamNotFound(linked))?;
        let mut draft = StreamDraft::from_stream(stream);
        if !self.gaskets.is_tied(&draft.source.gasket) {
            return Err(ModelError::TiedSourceNotLinked {
                gasket: draft.source.gasket,
            });
        }
        draft.link_tied(&self.gaskets, linked)?;

        let patch = StreamPatch {
            source: Some(draft.source),
            ..StreamPatch::default()
        };
        self.update(id, &patch)
    }

    /// Delete the stream(s) carrying `id` and recompute the rest from scratch.
    pub fn remove(&mut self, id: StreamId) -> Result<DfgStream> {
        let position = self
            .streams
            .iter()
            .position(|s| s.stream_id == id)
            .ok_or(ModelError::StreamNotFound(id))?;
        let removed = self.streams.remove(position);
        self.streams.retain(|s| s.stream_id != id);

        if self.editing.as_ref().is_some_and(|e| e.stream_id == id) {
            self.editing = None;
        }
        self.recompute();
        info!(stream_id = %id, remaining = self.streams.len(), "stream removed");
        Ok(removed)
    }

    /// Re-run every pass without changing data.
    pub fn recompute(&mut self) {
        let streams = std::mem::take(&mut self.streams);
        let Recomputed {
            streams,
            plan,
            report,
        } = recompute_streams(&self.gaskets, &self.catalog, streams);
        self.streams = streams;
        self.plan = plan;
        self.report = report;
    }

    /// Open a stream for editing.
    pub fn begin_edit(&mut self, id: StreamId) -> Result<&DfgStream> {
        let stream = self.stream(id).cloned().ok_or(ModelError::StreamNotFound(id))?;
        Ok(self.editing.insert(stream))
    }

    /// Close the editing reference.
    pub fn end_edit(&mut self) {
        self.editing = None;
    }

    /// Apply an action; returns the affected stream id when there is one.
    ///
    /// A failed mutating action leaves the model exactly as it was.
    pub fn dispatch(&mut self, action: ModelAction) -> Result<Option<StreamId>> {
        let description = action.description();
        let target = action.target_stream();
        let mutates = action.mutates_streams();
        debug!(action = description, stream = ?target, mutates, "dispatch");

        let result = match action {
            ModelAction::Create(draft) => self.create(draft).map(Some),
            ModelAction::Update { id, patch } => self.update(id, &patch).map(Some),
            ModelAction::Remove { id } => self.remove(id).map(|_| Some(id)),
            ModelAction::Recompute => {
                self.recompute();
                Ok(None)
            }
            ModelAction::BeginEdit { id } => self.begin_edit(id).map(|s| Some(s.stream_id)),
            ModelAction::EndEdit => {
                self.end_edit();
                Ok(None)
            }
        };
        if mutates {
            if let Err(err) = &result {
                warn!(action = description, stream = ?target, "mutation rejected: {err}");
            }
        }
        result
    }
}
