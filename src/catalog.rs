//! Capacity catalog: legal buffer-size choices per gasket side.
//!
//! Built once per loaded hardware description. A side is either fixed-size
//! (every physical channel declares its own size) or ranged (any power of two
//! between the declared minimum and the side's total capacity).

use crate::gasket::{Direction, Gasket, GasketId, GasketTable};
use crate::invariant_ppt::{assert_invariant, CATALOG_CHOICES_SORTED};
use serde::Serialize;

/// Legal buffer sizes for both sides of one gasket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasketBufferSizeProps {
    /// Ascending, deduplicated input sizes.
    pub input_buffer_size_choices: Vec<u32>,
    /// Ascending, deduplicated output sizes.
    pub output_buffer_size_choices: Vec<u32>,
    /// Input side uses pre-declared channel sizes.
    pub has_fixed_input_stream: bool,
    /// Output side uses pre-declared channel sizes.
    pub has_fixed_output_stream: bool,
}

impl GasketBufferSizeProps {
    /// Derive the choice sets of one gasket.
    pub fn derive(gasket: &Gasket) -> Self {
        let props = Self {
            input_buffer_size_choices: side_choices(gasket, Direction::Input),
            output_buffer_size_choices: side_choices(gasket, Direction::Output),
            has_fixed_input_stream: gasket.is_fixed_size(Direction::Input),
            has_fixed_output_stream: gasket.is_fixed_size(Direction::Output),
        };
        assert_invariant(
            CATALOG_CHOICES_SORTED,
            is_strictly_ascending(&props.input_buffer_size_choices)
                && is_strictly_ascending(&props.output_buffer_size_choices),
            "choice sets must be ascending without duplicates",
            Some(&gasket.name),
        );
        props
    }

    /// Choices for one side.
    pub fn choices(&self, direction: Direction) -> &[u32] {
        match direction {
            Direction::Input => &self.input_buffer_size_choices,
            Direction::Output => &self.output_buffer_size_choices,
        }
    }

    /// Whether `size` is a legal choice on that side.
    pub fn allows(&self, direction: Direction, size: u32) -> bool {
        self.choices(direction).binary_search(&size).is_ok()
    }
}

fn side_choices(gasket: &Gasket, direction: Direction) -> Vec<u32> {
    match gasket.min_stream_buffer_size(direction) {
        None => {
            let mut sizes: Vec<u32> = gasket
                .channels(direction)
                .iter()
                .filter_map(|c| c.buffer_size)
                .collect();
            sizes.sort_unstable();
            sizes.dedup();
            sizes
        }
        Some(min) => power_of_two_choices(min, gasket.capacity(direction)),
    }
}

/// Every value `min, 2*min, 4*min, ...` not above `max`.
fn power_of_two_choices(min: u32, max: u32) -> Vec<u32> {
    let mut choices = Vec::new();
    if min == 0 {
        tracing::warn!("minimum stream buffer size of 0 yields no choices");
        return choices;
    }
    let mut size = min;
    while size <= max {
        choices.push(size);
        match size.checked_mul(2) {
            Some(next) => size = next,
            None => break,
        }
    }
    choices
}

fn is_strictly_ascending(values: &[u32]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Choice sets for every gasket of a table, indexed by [`GasketId`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    props: Vec<GasketBufferSizeProps>,
}

impl Catalog {
    /// Derive the catalog for every gasket in the table.
    pub fn build(table: &GasketTable) -> Self {
        let props = table
            .iter()
            .map(|(_, gasket)| GasketBufferSizeProps::derive(gasket))
            .collect::<Vec<_>>();
        tracing::debug!(gaskets = props.len(), "capacity catalog built");
        Self { props }
    }

    /// Props of a gasket.
    pub fn props(&self, id: GasketId) -> Option<&GasketBufferSizeProps> {
        self.props.get(id.0)
    }

    /// Props of a gasket by name.
    pub fn props_by_name<'a>(
        &'a self,
        table: &GasketTable,
        name: &str,
    ) -> Option<&'a GasketBufferSizeProps> {
        table.id(name).and_then(|id| self.props(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gasket::Channel;
    use proptest::prelude::*;

    fn ranged(min: u32, capacity: u32) -> Gasket {
        Gasket {
            name: "Ranged".into(),
            input_buffer_size: capacity,
            output_buffer_size: capacity,
            input_streams: vec![],
            output_streams: vec![],
            min_input_stream_buffer_size: Some(min),
            min_output_stream_buffer_size: Some(min),
            input_and_output_buffers_tied: false,
        }
    }

    #[test]
    fn ranged_side_is_powers_of_two_up_to_capacity() {
        let props = GasketBufferSizeProps::derive(&ranged(16, 128));
        assert_eq!(props.output_buffer_size_choices, vec![16, 32, 64, 128]);
        assert!(!props.has_fixed_output_stream);
        assert!(!props.allows(Direction::Output, 48));
        assert!(props.allows(Direction::Output, 64));
    }

    #[test]
    fn capacity_between_powers_is_not_a_choice() {
        let props = GasketBufferSizeProps::derive(&ranged(16, 100));
        assert_eq!(props.input_buffer_size_choices, vec![16, 32, 64]);
    }

    #[test]
    fn fixed_side_dedups_and_sorts_declared_sizes() {
        let mut g = ranged(16, 1024);
        g.min_input_stream_buffer_size = None;
        g.input_streams = vec![
            Channel { index: 0, buffer_size: Some(256) },
            Channel { index: 1, buffer_size: Some(64) },
            Channel { index: 2, buffer_size: Some(256) },
            Channel { index: 3, buffer_size: None },
        ];
        let props = GasketBufferSizeProps::derive(&g);
        assert_eq!(props.input_buffer_size_choices, vec![64, 256]);
        assert!(props.has_fixed_input_stream);
    }

    #[test]
    fn zero_minimum_yields_empty_choices() {
        let props = GasketBufferSizeProps::derive(&ranged(0, 64));
        assert!(props.input_buffer_size_choices.is_empty());
    }

    #[test]
    fn doubling_stops_before_overflow() {
        let choices = power_of_two_choices(1 << 30, u32::MAX);
        assert_eq!(choices, vec![1 << 30, 1 << 31]);
    }

    proptest! {
        #[test]
        fn ranged_choices_stay_within_bounds(min in 1u32..4096, capacity in 0u32..1_000_000) {
            let choices = power_of_two_choices(min, capacity);
            prop_assert!(choices.iter().all(|&c| c >= min && c <= capacity));
            prop_assert!(is_strictly_ascending(&choices));
            if let Some(&last) = choices.last() {
                prop_assert!(u64::from(last) * 2 > u64::from(capacity));
            }
        }
    }
}
