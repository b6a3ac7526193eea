//! PPT Invariant System: invariant enforcement with contract tracking.
//!
//! Engine passes assert the facts they establish; tests then check through
//! [`contract_test`] that the expected invariants were actually exercised.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::{Mutex, PoisonError};

pub const CATALOG_CHOICES_SORTED: u32 = 1;
pub const INDEX_GAPLESS: u32 = 2;
pub const ADDRESS_PACKED: u32 = 3;
pub const CHANNEL_ID_RESOLVED: u32 = 4;
pub const TIED_SYNC: u32 = 5;
pub const REPORT_COMPLETE: u32 = 6;
pub const CREATE_REJECTS_FULL: u32 = 7;
pub const RECOMPUTE_WHOLE_MODEL: u32 = 8;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let name = invariant_name(id);
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} ({}) failed: {} (context: {})", id, name, message, ctx)
        } else {
            format!("Invariant {} ({}) failed: {}", id, name, message)
        };
        tracing::error!("{}", full_message);
        panic!("{}", full_message);
    }
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id);
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant {} ({}) failed: {}", id, invariant_name(id), message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG.lock().unwrap_or_else(PoisonError::into_inner);
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !log.contains(inv))
        .map(invariant_name)
        .collect();
    drop(log);
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}

/// Human-readable invariant name, for diagnostics only.
pub const fn invariant_name(id: u32) -> &'static str {
    match id {
        CATALOG_CHOICES_SORTED => "CATALOG_CHOICES_SORTED",
        INDEX_GAPLESS => "INDEX_GAPLESS",
        ADDRESS_PACKED => "ADDRESS_PACKED",
        CHANNEL_ID_RESOLVED => "CHANNEL_ID_RESOLVED",
        TIED_SYNC => "TIED_SYNC",
        REPORT_COMPLETE => "REPORT_COMPLETE",
        CREATE_REJECTS_FULL => "CREATE_REJECTS_FULL",
        RECOMPUTE_WHOLE_MODEL => "RECOMPUTE_WHOLE_MODEL",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_invariant_pass() {
        assert_invariant(0, 1 + 1 == 2, "Math works", Some("basic"));
    }

    #[test]
    #[should_panic]
    fn test_assert_invariant_fail() {
        assert_invariant(0, 1 + 1 == 3, "Math broken", None);
    }

    #[test]
    fn test_contract_test() {
        // The log is shared across tests; only ever add to it here.
        assert_invariant(ADDRESS_PACKED, true, "packed", None);
        contract_test("example", &[ADDRESS_PACKED]);
    }

    #[cfg(feature = "ppt")]
    #[test]
    #[should_panic(expected = "invariants not enforced")]
    fn test_contract_reports_missing() {
        contract_test("never asserted", &[9_999]);
    }

    #[test]
    #[should_panic(expected = "(TIED_SYNC) failed")]
    fn test_failure_names_the_invariant() {
        assert_invariant(TIED_SYNC, false, "tied source lags", None);
    }

    #[cfg(feature = "ppt")]
    #[test]
    #[should_panic(expected = "UNKNOWN")]
    fn test_contract_names_missing_invariants() {
        contract_test("unregistered id", &[9_998]);
    }

    #[test]
    fn test_invariant_names() {
        assert_eq!(invariant_name(TIED_SYNC), "TIED_SYNC");
        assert_eq!(invariant_name(255), "UNKNOWN");
    }
}
