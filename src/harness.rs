//! Model proof harness: structural checks over a recomputed model.
//!
//! Used by property tests to confirm that every lifecycle operation leaves
//! indices gapless, addresses packed and channel ids resolved.

use crate::action::ModelAction;
use crate::error::ModelError;
use crate::model::DfgModel;
use crate::stream::StreamId;

/// Wraps a model and checks its invariants after every action.
pub struct ModelHarness {
    model: DfgModel,
}

impl ModelHarness {
    /// Harness over an existing model.
    pub fn new(model: DfgModel) -> Self {
        Self { model }
    }

    /// The wrapped model.
    pub fn model(&self) -> &DfgModel {
        &self.model
    }

    /// Dispatch an action, then return the action result and any violations.
    pub fn run(&mut self, action: ModelAction) -> (Result<Option<StreamId>, ModelError>, Vec<String>) {
        let result = self.model.dispatch(action);
        (result, check_model(&self.model))
    }
}

/// Every invariant violation found in `model`; empty when consistent.
pub fn check_model(model: &DfgModel) -> Vec<String> {
    let mut violations = Vec::new();
    let table = model.gaskets();
    let streams = model.streams();
    let plan = model.plan();

    for (id, gasket) in table.iter() {
        let mut inbound_indices: Vec<usize> = plan
            .inbound(id)
            .iter()
            .map(|slot| streams[slot.stream].destinations[slot.destination].index)
            .collect();
        inbound_indices.sort_unstable();
        if inbound_indices != (0..inbound_indices.len()).collect::<Vec<_>>() {
            violations.push(format!("{}: input indices not gapless: {:?}", gasket.name, inbound_indices));
        }

        if !gasket.input_and_output_buffers_tied {
            let mut outbound_indices: Vec<usize> =
                plan.outbound(id).iter().map(|&i| streams[i].source.index).collect();
            outbound_indices.sort_unstable();
            if outbound_indices != (0..outbound_indices.len()).collect::<Vec<_>>() {
                violations.push(format!("{}: output indices not gapless: {:?}", gasket.name, outbound_indices));
            }
        }

        let inbound: Vec<(u32, u32)> = plan
            .inbound(id)
            .iter()
            .map(|slot| {
                let d = &streams[slot.stream].destinations[slot.destination];
                (d.buffer_address, d.buffer_size)
            })
            .collect();
        check_packing(&gasket.name, "input", &inbound, &mut violations);

        let outbound: Vec<(u32, u32)> = plan
            .outbound(id)
            .iter()
            .map(|&i| (streams[i].source.buffer_address, streams[i].source.buffer_size))
            .collect();
        check_packing(&gasket.name, "output", &outbound, &mut violations);

        for &i in plan.outbound(id) {
            let stream = &streams[i];
            if let Some(channel) = gasket.output_channel_id(stream.source.index) {
                if stream.stream_id != StreamId(channel) {
                    violations.push(format!(
                        "{}: stream {} at position {} should carry channel {}",
                        gasket.name, stream.stream_id, stream.source.index, channel
                    ));
                }
            }
        }
    }

    violations
}

fn check_packing(gasket: &str, side: &str, group: &[(u32, u32)], violations: &mut Vec<String>) {
    let mut expected = 0u32;
    for (k, &(address, size)) in group.iter().enumerate() {
        if address != expected {
            violations.push(format!(
                "{gasket}: {side} slot {k} at address {address}, expected {expected}"
            ));
        }
        if k > 0 && group[k - 1].1 < size {
            violations.push(format!("{gasket}: {side} slot {k} breaks size-descending order"));
        }
        expected = expected.saturating_add(size);
    }
}
