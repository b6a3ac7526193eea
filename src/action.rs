//! Model actions: the mutations an editor can dispatch.
//!
//! Each action maps onto one lifecycle operation of
//! [`DfgModel`](crate::model::DfgModel); the editor's event loop sends them
//! through [`DfgModel::dispatch`](crate::model::DfgModel::dispatch).

use crate::dsl::StreamDraft;
use crate::stream::{StreamId, StreamPatch};

/// Mutations of the stream model.
#[derive(Debug, Clone)]
pub enum ModelAction {
    /// Add a stream from a draft.
    Create(StreamDraft),

    /// Replace fields of an existing stream.
    Update {
        id: StreamId,
        patch: StreamPatch,
    },

    /// Delete a stream.
    Remove {
        id: StreamId,
    },

    /// Re-run every pass, e.g. after gasket capabilities changed.
    Recompute,

    /// Open a stream for editing.
    BeginEdit {
        id: StreamId,
    },

    /// Close the editing reference.
    EndEdit,
}

impl ModelAction {
    /// Returns the targeted stream, if this action targets an existing one.
    pub fn target_stream(&self) -> Option<StreamId> {
        match self {
            ModelAction::Update { id, .. } => Some(*id),
            ModelAction::Remove { id } => Some(*id),
            ModelAction::BeginEdit { id } => Some(*id),
            ModelAction::Create(_) => None,
            ModelAction::Recompute => None,
            ModelAction::EndEdit => None,
        }
    }

    /// Whether the action changes the stream list.
    pub fn mutates_streams(&self) -> bool {
        matches!(
            self,
            ModelAction::Create(_) | ModelAction::Update { .. } | ModelAction::Remove { .. }
        )
    }

    /// Returns a human-readable description (for debugging).
    pub fn description(&self) -> &'static str {
        match self {
            ModelAction::Create(_) => "Create",
            ModelAction::Update { .. } => "Update",
            ModelAction::Remove { .. } => "Remove",
            ModelAction::Recompute => "Recompute",
            ModelAction::BeginEdit { .. } => "BeginEdit",
            ModelAction::EndEdit => "EndEdit",
        }
    }
}
