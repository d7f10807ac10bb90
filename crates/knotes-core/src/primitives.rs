//! # Runtime Constants
//!
//! Hardcoded limits and defaults for the knotes CORE.
//!
//! These are compiled into the binary and immutable at runtime.

/// Default name of the backend index holding knote documents.
pub const DEFAULT_INDEX: &str = "knotes";

/// One scoring unit in milli-points.
///
/// All relevance math is integer arithmetic in milli-units; the store
/// averages nested element scores with integer division.
pub const SCORE_UNIT: u64 = 1000;

/// Maximum number of read-merge-write attempts per document.
///
/// A revision conflict means a concurrent writer got in between our read
/// and our conditional write; the whole cycle is re-run up to this bound.
pub const MAX_WRITE_RETRIES: usize = 5;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for a knote id.
///
/// Ids longer than this are rejected with `InvalidEntity`.
pub const MAX_ID_LENGTH: usize = 512;

/// Maximum length for a knote name.
///
/// Names longer than this are rejected with `InvalidEntity`.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Maximum number of nested relationship documents per knote.
///
/// The backend index maps `relationships` and `relationships.objectKnotes`
/// as nested documents, and nested documents per top-level document are
/// capped at 10000 (the Elasticsearch `index.mapping.nested_objects.limit`
/// default). Documents over this limit are rejected with `StoreRejected`.
pub const MAX_NESTED_OBJECTS: usize = 10000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_unit_is_millis() {
        assert_eq!(SCORE_UNIT, 1000);
    }

    #[test]
    fn retry_bound_is_positive() {
        assert!(MAX_WRITE_RETRIES >= 1);
    }
}
