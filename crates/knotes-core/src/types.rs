//! # Core Type Definitions
//!
//! This module contains the discriminator and error types shared by the
//! entity model, the store adapter, and the indexing engine:
//! - `Kind` — the open knote discriminator (Place, Person, Event, ...)
//! - `KnoteError` — the error taxonomy
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// =============================================================================
// KIND
// =============================================================================

/// The discriminator selecting a knote's concrete variant.
///
/// The kind set is open: tags that are not built in decode as
/// `Kind::Other` instead of failing, so documents written by newer
/// clients stay readable. Adding a built-in kind is one variant plus
/// one arm in `parse`/`as_str`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// A location.
    Place,
    /// A person.
    Person,
    /// Something that happened.
    Event,
    /// Any kind this build does not know by name.
    Other(String),
}

impl Kind {
    /// Resolve a kind tag. Never fails; unknown tags become `Other`.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "Place" => Self::Place,
            "Person" => Self::Person,
            "Event" => Self::Event,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Place => "Place",
            Self::Person => "Person",
            Self::Event => "Event",
            Self::Other(tag) => tag,
        }
    }

    /// Derive the reciprocal relationship label for edges pointing back at
    /// a knote of this kind, e.g. `Person` -> `"relatedPerson"`.
    ///
    /// The derivation deliberately ignores the forward relationship's own
    /// type, matching the reference behavior: two distinct forward types
    /// from the same source kind produce the same reverse label and their
    /// reverse edges merge. Changing this needs a stakeholder decision on
    /// the stored label scheme.
    #[must_use]
    pub fn reciprocal_label(&self) -> String {
        format!("related{}", self.as_str())
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the knotes system.
///
/// - No silent failures
/// - Use `Result<T, KnoteError>` for fallible operations
/// - The CORE should never panic; all errors must be recoverable
///
/// A missing document on `get` is NOT an error: the store returns
/// `Ok(None)` and the indexing engine treats it as the signal to create
/// a new entity from the in-memory stub.
#[derive(Debug, Error)]
pub enum KnoteError {
    /// Construction-time caller bug (e.g. empty id). Not retryable.
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// The backend cannot be reached. Retryable by the caller with backoff;
    /// the core never retries this internally.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The backend rejected the request (malformed document or query,
    /// mapping conflict, nested-object limit). Not retryable verbatim.
    #[error("Store rejected request: {0}")]
    StoreRejected(String),

    /// A conditional write lost a compare-and-swap race on the document
    /// revision. Safe to retry by re-running the read-merge-write cycle.
    #[error("Revision conflict on '{id}': expected {expected}, found {found}")]
    RevisionConflict {
        /// Document id the write targeted.
        id: String,
        /// Revision the writer read before mutating.
        expected: u64,
        /// Revision actually stored.
        found: u64,
    },

    /// A document failed to encode or decode.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Context wrapper for failures inside `KnoteEngine::index`: carries
    /// the entity id and the stage (fan-out or self-write) so callers can
    /// retry safely. Partial fan-out may have landed; retries are safe
    /// because all merges are set unions.
    #[error("Indexing '{id}' failed during {stage}")]
    IndexFailed {
        /// Id of the entity whose write failed.
        id: String,
        /// Stage of the index() algorithm that failed.
        stage: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<KnoteError>,
    },
}

impl KnoteError {
    /// Wrap a store failure with indexing context.
    #[must_use]
    pub fn index_failed(id: impl Into<String>, stage: &'static str, source: KnoteError) -> Self {
        Self::IndexFailed {
            id: id.into(),
            stage,
            source: Box::new(source),
        }
    }

    /// Whether a caller may retry the failed operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) | Self::RevisionConflict { .. } => true,
            Self::IndexFailed { source, .. } => source.is_retryable(),
            Self::InvalidEntity(_) | Self::StoreRejected(_) | Self::Serialization(_) => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_builtin_tags() {
        for tag in ["Place", "Person", "Event"] {
            assert_eq!(Kind::parse(tag).as_str(), tag);
        }
    }

    #[test]
    fn unknown_kind_is_open() {
        let kind = Kind::parse("Meeting");
        assert_eq!(kind, Kind::Other("Meeting".to_string()));
        assert_eq!(kind.as_str(), "Meeting");
    }

    #[test]
    fn reciprocal_label_derivation() {
        assert_eq!(Kind::Person.reciprocal_label(), "relatedPerson");
        assert_eq!(Kind::Place.reciprocal_label(), "relatedPlace");
        assert_eq!(Kind::parse("Meeting").reciprocal_label(), "relatedMeeting");
    }

    #[test]
    fn kind_serializes_as_plain_string() {
        let json = serde_json::to_string(&Kind::Event).expect("serialize");
        assert_eq!(json, "\"Event\"");
        let back: Kind = serde_json::from_str("\"Event\"").expect("deserialize");
        assert_eq!(back, Kind::Event);
    }

    #[test]
    fn retryability_matches_taxonomy() {
        assert!(KnoteError::StoreUnavailable("down".into()).is_retryable());
        assert!(!KnoteError::StoreRejected("bad query".into()).is_retryable());
        assert!(!KnoteError::InvalidEntity("empty id".into()).is_retryable());

        let wrapped = KnoteError::index_failed(
            "p1",
            "fan-out",
            KnoteError::StoreUnavailable("down".into()),
        );
        assert!(wrapped.is_retryable());
    }
}
