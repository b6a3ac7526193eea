//! Plan module: pack indexed streams into gasket buffers.

use crate::gasket::{GasketId, GasketTable};
use crate::index::IndexMoves;
use crate::invariant_ppt::{assert_invariant, ADDRESS_PACKED, CHANNEL_ID_RESOLVED, TIED_SYNC};
use crate::stream::{DfgStream, StreamId};

/// One destination endpoint in an inbound group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundSlot {
    /// Position of the stream in the model's stream list.
    pub stream: usize,
    /// Position of the endpoint in that stream's destinations.
    pub destination: usize,
}

/// The compiled plan: per-gasket groups in packing order.
///
/// Groups hold positions into the stream list the plan was compiled from,
/// indexed by [`GasketId`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    inbound: Vec<Vec<InboundSlot>>,
    outbound: Vec<Vec<usize>>,
}

impl Plan {
    /// Group, sort, assign addresses and resolve channel ids in place.
    pub fn compile(table: &GasketTable, streams: &mut [DfgStream], moves: &IndexMoves) -> Self {
        let mut plan = group(table, streams);
        plan.sort(streams);
        plan.assign_addresses(streams);
        plan.resolve_channel_ids(table, streams);
        plan.fix_tied_streams(table, streams, moves);
        plan
    }

    /// Destination endpoints on a gasket, largest buffer first.
    pub fn inbound(&self, id: GasketId) -> &[InboundSlot] {
        self.inbound.get(id.0).map_or(&[], Vec::as_slice)
    }

    /// Streams sourced from a gasket, largest buffer first.
    pub fn outbound(&self, id: GasketId) -> &[usize] {
        self.outbound.get(id.0).map_or(&[], Vec::as_slice)
    }

    fn sort(&mut self, streams: &[DfgStream]) {
        // sort_by is stable: equal sizes keep display order.
        for group in &mut self.inbound {
            group.sort_by(|a, b| {
                let size = |s: &InboundSlot| streams[s.stream].destinations[s.destination].buffer_size;
                size(b).cmp(&size(a))
            });
        }
        for group in &mut self.outbound {
            group.sort_by(|&a, &b| {
                streams[b]
                    .source
                    .buffer_size
                    .cmp(&streams[a].source.buffer_size)
            });
        }
    }

    fn assign_addresses(&self, streams: &mut [DfgStream]) {
        for group in &self.inbound {
            let mut address = 0u32;
            for slot in group {
                let endpoint = &mut streams[slot.stream].destinations[slot.destination];
                endpoint.buffer_address = address;
                address = address.saturating_add(endpoint.buffer_size);
            }
        }
        for group in &self.outbound {
            let mut address = 0u32;
            for &i in group {
                let endpoint = &mut streams[i].source;
                endpoint.buffer_address = address;
                address = address.saturating_add(endpoint.buffer_size);
            }
        }

        let inbound_packed = self.inbound.iter().all(|group| {
            is_packed(group.iter().map(|slot| {
                let endpoint = &streams[slot.stream].destinations[slot.destination];
                (endpoint.buffer_address, endpoint.buffer_size)
            }))
        });
        let outbound_packed = self.outbound.iter().all(|group| {
            is_packed(
                group
                    .iter()
                    .map(|&i| (streams[i].source.buffer_address, streams[i].source.buffer_size)),
            )
        });
        assert_invariant(
            ADDRESS_PACKED,
            inbound_packed && outbound_packed,
            "every group is size-descending with prefix-sum addresses",
            Some("assign_addresses"),
        );
    }

    fn resolve_channel_ids(&self, table: &GasketTable, streams: &mut [DfgStream]) {
        for (id, gasket) in table.iter() {
            if gasket.input_and_output_buffers_tied {
                continue;
            }
            for &i in self.outbound(id) {
                let stream = &mut streams[i];
                match gasket.output_channel_id(stream.source.index) {
                    Some(channel) => stream.stream_id = StreamId(channel),
                    None => tracing::warn!(
                        gasket = %gasket.name,
                        index = stream.source.index,
                        "no physical output channel for logical index"
                    ),
                }
                assert_invariant(
                    CHANNEL_ID_RESOLVED,
                    gasket
                        .output_channel_id(stream.source.index)
                        .map_or(true, |c| stream.stream_id == StreamId(c)),
                    "non-tied stream id matches its physical channel",
                    Some(&gasket.name),
                );
            }
        }
    }

    fn fix_tied_streams(&self, table: &GasketTable, streams: &mut [DfgStream], moves: &IndexMoves) {
        for (id, mv) in moves.destination_moves() {
            let gasket = table.gasket(id);
            if !gasket.input_and_output_buffers_tied {
                continue;
            }
            for &i in self.outbound(id) {
                let stream = &mut streams[i];
                if stream.source.index != mv.from_index {
                    continue;
                }
                stream.source.index = mv.to_index;
                match gasket.output_channel_id(mv.to_index) {
                    Some(channel) => stream.stream_id = StreamId(channel),
                    None => tracing::warn!(
                        gasket = %gasket.name,
                        index = mv.to_index,
                        "tied stream moved past the last output channel"
                    ),
                }
                tracing::debug!(
                    gasket = %gasket.name,
                    from = mv.from_index,
                    to = mv.to_index,
                    stream_id = %stream.stream_id,
                    "tied stream followed its input"
                );
                assert_invariant(
                    TIED_SYNC,
                    stream.source.index == mv.to_index,
                    "tied source follows the moved destination",
                    Some(&gasket.name),
                );
            }
        }
    }
}

fn group(table: &GasketTable, streams: &[DfgStream]) -> Plan {
    let mut inbound: Vec<Vec<InboundSlot>> = vec![Vec::new(); table.len()];
    let mut outbound: Vec<Vec<usize>> = vec![Vec::new(); table.len()];

    for (s, stream) in streams.iter().enumerate() {
        // Streams from unknown gaskets are reported, never placed.
        let Some(source) = table.id(&stream.source.gasket) else {
            continue;
        };
        outbound[source.0].push(s);
        for (d, destination) in stream.destinations.iter().enumerate() {
            if let Some(id) = table.id(&destination.gasket) {
                inbound[id.0].push(InboundSlot {
                    stream: s,
                    destination: d,
                });
            }
        }
    }

    Plan { inbound, outbound }
}

/// Addresses start at 0, each slot begins where the previous one ends, and
/// sizes never grow along the group.
fn is_packed(group: impl Iterator<Item = (u32, u32)>) -> bool {
    let mut expected = 0u32;
    let mut previous_size = u32::MAX;
    for (address, size) in group {
        if address != expected || size > previous_size {
            return false;
        }
        expected = expected.saturating_add(size);
        previous_size = size;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gasket::{Channel, Gasket};
    use crate::index::resolve_indices;
    use crate::stream::Endpoint;

    fn gasket(name: &str, tied: bool, channel_ids: &[u32]) -> Gasket {
        let channels: Vec<Channel> = channel_ids
            .iter()
            .map(|&i| Channel { index: i, buffer_size: None })
            .collect();
        Gasket {
            name: name.into(),
            input_buffer_size: 1024,
            output_buffer_size: 1024,
            input_streams: channels.clone(),
            output_streams: channels,
            min_input_stream_buffer_size: Some(16),
            min_output_stream_buffer_size: Some(16),
            input_and_output_buffers_tied: tied,
        }
    }

    fn stream(src: &str, src_size: u32, dst: &str, dst_size: u32) -> DfgStream {
        DfgStream {
            source: Endpoint::new(src, src_size),
            destinations: vec![Endpoint::new(dst, dst_size)],
            ..DfgStream::default()
        }
    }

    fn compile(table: &GasketTable, streams: &mut [DfgStream]) -> Plan {
        let moves = resolve_indices(table, streams);
        Plan::compile(table, streams, &moves)
    }

    #[test]
    fn addresses_are_size_descending_prefix_sums() {
        let table = GasketTable::new(vec![gasket("A", false, &[10, 11, 12]), gasket("B", false, &[0, 1, 2])]).unwrap();
        let mut streams = vec![stream("A", 16, "B", 32), stream("A", 64, "B", 32), stream("A", 32, "B", 128)];
        let plan = compile(&table, &mut streams);

        assert_eq!(plan.outbound(GasketId(0)), &[1, 2, 0]);
        assert_eq!(streams[1].source.buffer_address, 0);
        assert_eq!(streams[2].source.buffer_address, 64);
        assert_eq!(streams[0].source.buffer_address, 96);

        // Equal sizes keep display order.
        let order: Vec<usize> = plan.inbound(GasketId(1)).iter().map(|s| s.stream).collect();
        assert_eq!(order, vec![2, 0, 1]);
        assert_eq!(streams[2].destinations[0].buffer_address, 0);
        assert_eq!(streams[0].destinations[0].buffer_address, 128);
        assert_eq!(streams[1].destinations[0].buffer_address, 160);
    }

    #[test]
    fn non_tied_stream_ids_come_from_physical_channels() {
        let table = GasketTable::new(vec![gasket("A", false, &[10, 11, 12]), gasket("B", false, &[0])]).unwrap();
        let mut streams = vec![stream("A", 16, "B", 16), stream("A", 16, "B", 16)];
        compile(&table, &mut streams);
        assert_eq!(streams[0].stream_id, StreamId(10));
        assert_eq!(streams[1].stream_id, StreamId(11));
    }

    #[test]
    fn missing_channel_leaves_stream_id_untouched() {
        let table = GasketTable::new(vec![gasket("A", false, &[10]), gasket("B", false, &[0])]).unwrap();
        let mut streams = vec![stream("A", 16, "B", 16), stream("A", 16, "B", 16)];
        streams[1].stream_id = StreamId(99);
        compile(&table, &mut streams);
        assert_eq!(streams[1].stream_id, StreamId(99));
    }

    #[test]
    fn same_gasket_destinations_get_distinct_slots() {
        let table = GasketTable::new(vec![gasket("A", false, &[0]), gasket("B", false, &[0, 1])]).unwrap();
        let mut s = stream("A", 16, "B", 32);
        s.destinations.push(Endpoint::new("B", 16));
        let mut streams = vec![s];
        let plan = compile(&table, &mut streams);
        assert_eq!(plan.inbound(GasketId(1)).len(), 2);
        assert_eq!(streams[0].destinations[0].buffer_address, 0);
        assert_eq!(streams[0].destinations[1].buffer_address, 32);
        assert_eq!(streams[0].destinations[1].index, 1);
    }

    #[test]
    fn tied_source_follows_destination_move() {
        let table = GasketTable::new(vec![gasket("A", false, &[0, 1, 2]), gasket("T", true, &[20, 21, 22])]).unwrap();
        // T's output was linked to input position 1; the input that held
        // position 0 has just been removed.
        let mut into_t = stream("A", 16, "T", 16);
        into_t.destinations[0].index = 1;
        let mut out_of_t = stream("T", 16, "A", 16);
        out_of_t.source.index = 1;
        out_of_t.stream_id = StreamId(21);

        let mut streams = vec![into_t, out_of_t];
        let plan = compile(&table, &mut streams);

        assert_eq!(streams[0].destinations[0].index, 0);
        assert_eq!(streams[1].source.index, 0);
        assert_eq!(streams[1].stream_id, StreamId(20));
        assert_eq!(plan.outbound(GasketId(1)), &[1]);
    }

    #[test]
    fn plan_stability() {
        let table = GasketTable::new(vec![gasket("A", false, &[0, 1]), gasket("B", false, &[0, 1])]).unwrap();
        let mut streams = vec![stream("A", 32, "B", 16), stream("B", 16, "A", 64)];
        let plan1 = compile(&table, &mut streams);
        let snapshot = streams.clone();
        let plan2 = compile(&table, &mut streams);
        assert_eq!(plan1, plan2);
        assert_eq!(snapshot, streams);
    }

    #[test]
    fn unknown_source_is_not_placed() {
        let table = GasketTable::new(vec![gasket("A", false, &[0, 1]), gasket("B", false, &[0, 1])]).unwrap();
        let mut ghost = stream("GHOST", 64, "B", 64);
        ghost.destinations[0].buffer_address = 512;
        let mut streams = vec![ghost, stream("A", 32, "B", 32)];
        let plan = compile(&table, &mut streams);

        let slots: Vec<usize> = plan.inbound(GasketId(1)).iter().map(|s| s.stream).collect();
        assert_eq!(slots, vec![1]);
        assert_eq!(streams[0].destinations[0].buffer_address, 512);
        assert_eq!(streams[1].destinations[0].buffer_address, 0);
    }

    #[test]
    fn packing_check() {
        assert!(is_packed([(0, 64), (64, 32), (96, 32)].into_iter()));
        assert!(!is_packed([(0, 32), (32, 64)].into_iter()));
        assert!(!is_packed([(0, 64), (80, 16)].into_iter()));
        assert!(!is_packed([(16, 16)].into_iter()));
        assert!(is_packed(std::iter::empty()));
    }

    #[test]
    fn plan_debug_smoke_test() {
        let table = GasketTable::new(vec![gasket("A", false, &[0])]).unwrap();
        let plan = compile(&table, &mut []);
        let debug_str = format!("{:?}", plan);
        assert!(debug_str.contains("inbound"));
        assert!(debug_str.contains("outbound"));
    }
}
