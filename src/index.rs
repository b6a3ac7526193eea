//! Index resolver: gapless logical indices in display order.
//!
//! One walk over the stream list hands out per-gasket counters, so the
//! logical positions on each gasket side are always `0..count`. Moves are
//! returned to the caller instead of being left behind as side state; the
//! packing pass needs the destination moves to keep tied gaskets in sync.

use crate::gasket::{GasketId, GasketTable};
use crate::invariant_ppt::{assert_invariant, INDEX_GAPLESS};
use crate::stream::DfgStream;

/// A logical index change observed during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    /// Index before the pass.
    pub from_index: usize,
    /// Index after the pass.
    pub to_index: usize,
}

/// Moves recorded per gasket, at most one per side (the last one wins).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexMoves {
    source: Vec<Option<MoveRecord>>,
    destination: Vec<Option<MoveRecord>>,
}

impl IndexMoves {
    fn new(gaskets: usize) -> Self {
        Self {
            source: vec![None; gaskets],
            destination: vec![None; gaskets],
        }
    }

    /// Last source-side move on a gasket.
    pub fn source_move(&self, id: GasketId) -> Option<MoveRecord> {
        self.source.get(id.0).copied().flatten()
    }

    /// Last destination-side move on a gasket.
    pub fn destination_move(&self, id: GasketId) -> Option<MoveRecord> {
        self.destination.get(id.0).copied().flatten()
    }

    /// Every destination-side move with its gasket.
    pub fn destination_moves(&self) -> impl Iterator<Item = (GasketId, MoveRecord)> + '_ {
        self.destination
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.map(|m| (GasketId(i), m)))
    }

    /// True when no index changed.
    pub fn is_empty(&self) -> bool {
        self.source.iter().chain(&self.destination).all(Option::is_none)
    }
}

/// Rewrite `Source.Index` and every `Destinations[i].Index`.
///
/// Tied source endpoints are skipped; their index follows the linked
/// destination. A stream whose source gasket is missing from the table is
/// left untouched as a whole, and so are endpoints on unknown gaskets.
pub fn resolve_indices(table: &GasketTable, streams: &mut [DfgStream]) -> IndexMoves {
    let mut moves = IndexMoves::new(table.len());
    let mut source_next = vec![0usize; table.len()];
    let mut destination_next = vec![0usize; table.len()];

    for stream in streams.iter_mut() {
        let Some(id) = table.id(&stream.source.gasket) else {
            continue;
        };
        if !table.gasket(id).input_and_output_buffers_tied {
            let new_index = source_next[id.0];
            source_next[id.0] += 1;
            if new_index != stream.source.index {
                moves.source[id.0] = Some(MoveRecord {
                    from_index: stream.source.index,
                    to_index: new_index,
                });
            }
            stream.source.index = new_index;
        }

        for destination in &mut stream.destinations {
            let Some(id) = table.id(&destination.gasket) else {
                continue;
            };
            let new_index = destination_next[id.0];
            destination_next[id.0] += 1;
            if new_index != destination.index {
                moves.destination[id.0] = Some(MoveRecord {
                    from_index: destination.index,
                    to_index: new_index,
                });
            }
            destination.index = new_index;
        }
    }

    assert_invariant(
        INDEX_GAPLESS,
        indices_gapless(table, streams),
        "indices on every gasket side are exactly 0..n",
        Some("resolve_indices"),
    );

    moves
}

fn indices_gapless(table: &GasketTable, streams: &[DfgStream]) -> bool {
    let mut sources: Vec<Vec<usize>> = vec![Vec::new(); table.len()];
    let mut destinations: Vec<Vec<usize>> = vec![Vec::new(); table.len()];

    for stream in streams {
        let Some(id) = table.id(&stream.source.gasket) else {
            continue;
        };
        if !table.gasket(id).input_and_output_buffers_tied {
            sources[id.0].push(stream.source.index);
        }
        for destination in &stream.destinations {
            if let Some(id) = table.id(&destination.gasket) {
                destinations[id.0].push(destination.index);
            }
        }
    }

    sources.iter_mut().chain(destinations.iter_mut()).all(|side| {
        side.sort_unstable();
        side.iter().copied().eq(0..side.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gasket::{Channel, Gasket};
    use crate::stream::{Endpoint, StreamId};

    fn gasket(name: &str, tied: bool) -> Gasket {
        Gasket {
            name: name.into(),
            input_buffer_size: 1024,
            output_buffer_size: 1024,
            input_streams: (0..4).map(|i| Channel { index: i, buffer_size: None }).collect(),
            output_streams: (0..4).map(|i| Channel { index: i, buffer_size: None }).collect(),
            min_input_stream_buffer_size: Some(16),
            min_output_stream_buffer_size: Some(16),
            input_and_output_buffers_tied: tied,
        }
    }

    fn stream(src: &str, src_index: usize, dst: &str, dst_index: usize) -> DfgStream {
        let mut source = Endpoint::new(src, 64);
        source.index = src_index;
        let mut destination = Endpoint::new(dst, 64);
        destination.index = dst_index;
        DfgStream {
            stream_id: StreamId(0),
            source,
            destinations: vec![destination],
            ..DfgStream::default()
        }
    }

    fn table() -> GasketTable {
        GasketTable::new(vec![gasket("A", false), gasket("B", false), gasket("T", true)]).unwrap()
    }

    #[test]
    fn indices_follow_list_order() {
        let table = table();
        let mut streams = vec![stream("A", 5, "B", 5), stream("A", 9, "B", 9), stream("B", 0, "A", 0)];
        resolve_indices(&table, &mut streams);
        assert_eq!(streams[0].source.index, 0);
        assert_eq!(streams[1].source.index, 1);
        assert_eq!(streams[2].source.index, 0);
        assert_eq!(streams[0].destinations[0].index, 0);
        assert_eq!(streams[1].destinations[0].index, 1);
        assert_eq!(streams[2].destinations[0].index, 0);
    }

    #[test]
    fn last_move_per_gasket_wins() {
        let table = table();
        let mut streams = vec![stream("A", 1, "B", 2), stream("A", 3, "B", 4)];
        let moves = resolve_indices(&table, &mut streams);
        let a = table.id("A").unwrap();
        let b = table.id("B").unwrap();
        assert_eq!(moves.source_move(a), Some(MoveRecord { from_index: 3, to_index: 1 }));
        assert_eq!(moves.destination_move(b), Some(MoveRecord { from_index: 4, to_index: 1 }));
    }

    #[test]
    fn stable_input_records_no_moves() {
        let table = table();
        let mut streams = vec![stream("A", 0, "B", 0), stream("A", 1, "B", 1)];
        assert!(resolve_indices(&table, &mut streams).is_empty());
    }

    #[test]
    fn tied_sources_are_skipped() {
        let table = table();
        let mut streams = vec![stream("T", 3, "A", 0)];
        let moves = resolve_indices(&table, &mut streams);
        assert_eq!(streams[0].source.index, 3);
        assert_eq!(moves.source_move(table.id("T").unwrap()), None);
    }

    #[test]
    fn unknown_gaskets_are_left_alone() {
        let table = table();
        let mut streams = vec![stream("Nope", 7, "Gone", 2), stream("A", 0, "B", 0)];
        resolve_indices(&table, &mut streams);
        assert_eq!(streams[0].source.index, 7);
        assert_eq!(streams[0].destinations[0].index, 2);
        assert_eq!(streams[1].source.index, 0);
    }

    #[test]
    fn unknown_source_does_not_take_destination_slots() {
        let table = table();
        let mut streams = vec![stream("Nope", 7, "B", 5), stream("A", 0, "B", 3)];
        resolve_indices(&table, &mut streams);
        assert_eq!(streams[0].destinations[0].index, 5);
        assert_eq!(streams[1].destinations[0].index, 0);
    }

    #[test]
    fn gapless_check_sees_holes() {
        let table = table();
        let mut streams = vec![stream("A", 0, "B", 0), stream("A", 2, "B", 1)];
        assert!(!indices_gapless(&table, &streams));
        resolve_indices(&table, &mut streams);
        assert!(indices_gapless(&table, &streams));
    }
}
