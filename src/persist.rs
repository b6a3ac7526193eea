//! JSON boundary for hardware descriptions and persisted streams.
//!
//! Storage stays with the caller: these helpers only convert between JSON
//! text and the engine's types, keeping the editor's PascalCase field names.

use crate::error::LoadError;
use crate::gasket::{Gasket, GasketTable};
use crate::stream::DfgStream;

/// Parse a gasket array into a table.
pub fn load_gaskets(json: &str) -> Result<GasketTable, LoadError> {
    let gaskets: Vec<Gasket> = serde_json::from_str(json)?;
    tracing::debug!(gaskets = gaskets.len(), "hardware description parsed");
    GasketTable::new(gaskets)
}

/// Parse a persisted stream array.
pub fn load_streams(json: &str) -> Result<Vec<DfgStream>, LoadError> {
    let streams: Vec<DfgStream> = serde_json::from_str(json)?;
    tracing::debug!(streams = streams.len(), "persisted streams parsed");
    Ok(streams)
}

/// Serialize streams verbatim, computed addresses and ids included.
pub fn save_streams(streams: &[DfgStream]) -> Result<String, LoadError> {
    Ok(serde_json::to_string_pretty(streams)?)
}
