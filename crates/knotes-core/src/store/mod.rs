//! # Document Store Adapter
//!
//! The sole boundary to the document-search backend.
//!
//! Everything above this module treats the backend as an opaque store of
//! JSON-shaped documents with get / upsert / search / index-lifecycle
//! operations. Two backends ship in-tree behind the same trait:
//! - `MemoryStore`: `BTreeMap`-backed, deterministic, the reference
//!   implementation of the search semantics
//! - `RedbStore`: disk-backed via redb (ACID, persistent)
//!
//! ## Optimistic concurrency
//!
//! Every stored document carries a store-assigned revision number.
//! `upsert` takes a `WriteCondition`; a violated condition fails with
//! `KnoteError::RevisionConflict` and the caller re-runs its
//! read-merge-write cycle. The adapter itself never retries.

mod eval;
mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::model::Document;
use crate::query::SearchQuery;
use crate::types::KnoteError;
use serde::{Deserialize, Serialize};

// =============================================================================
// RESULT TYPES
// =============================================================================

/// A stored document together with its revision number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    /// The document body.
    pub source: Document,
    /// Store-assigned revision, starting at 1 and incremented per write.
    pub revision: u64,
}

/// Condition attached to an `upsert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Write unconditionally.
    Any,
    /// Write only if no document exists under the id.
    Create,
    /// Write only if the stored revision equals the given one
    /// (compare-and-swap).
    RevisionIs(u64),
}

/// Outcome of a successful `upsert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Id the document was written under.
    pub id: String,
    /// Revision assigned to the write.
    pub revision: u64,
    /// Whether the write created the document (vs. updated it).
    pub created: bool,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Document id.
    pub id: String,
    /// Relevance in integer milli-units.
    pub score_millis: u64,
    /// The stored document body.
    pub source: Document,
}

/// An ordered result set: score descending, id ascending on ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResultSet {
    /// Total number of matching documents.
    pub total: usize,
    /// The hits, best first.
    pub hits: Vec<Hit>,
}

// =============================================================================
// DOCUMENT STORE TRAIT
// =============================================================================

/// The document-store operations this core consumes.
///
/// All operations are synchronous from the caller's perspective and may
/// fail with `StoreUnavailable` or `StoreRejected`. A missing document on
/// `get` is `Ok(None)`, never an error. Retry policy belongs to the
/// caller; implementations must not retry internally.
pub trait DocumentStore {
    /// Create the index with the given mapping if it does not exist.
    /// Idempotent: an existing index is left untouched.
    fn ensure_index(&mut self, name: &str, mapping: &Document) -> Result<(), KnoteError>;

    /// Whether the index exists.
    fn has_index(&self, name: &str) -> Result<bool, KnoteError>;

    /// The mapping the index was created with (schema introspection).
    fn mapping(&self, name: &str) -> Result<Document, KnoteError>;

    /// Fetch a document by id.
    fn get(&self, name: &str, id: &str) -> Result<Option<Versioned>, KnoteError>;

    /// Insert or replace a document under the id, subject to the condition.
    fn upsert(
        &mut self,
        name: &str,
        id: &str,
        document: Document,
        condition: WriteCondition,
    ) -> Result<WriteResult, KnoteError>;

    /// Execute a structured query, returning hits ordered by score.
    fn search(&self, name: &str, query: &SearchQuery) -> Result<ResultSet, KnoteError>;
}

// =============================================================================
// STORE BACKEND SELECTION
// =============================================================================

/// Runtime-selectable backend over the in-tree stores.
///
/// The engine is generic over `DocumentStore`; this enum lets the binary
/// pick a backend from configuration without boxing.
#[derive(Debug)]
pub enum StoreBackend {
    /// In-memory store (fast, volatile).
    Memory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Memory(MemoryStore::new())
    }
}

// NOTE: StoreBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

impl DocumentStore for StoreBackend {
    fn ensure_index(&mut self, name: &str, mapping: &Document) -> Result<(), KnoteError> {
        match self {
            Self::Memory(store) => store.ensure_index(name, mapping),
            Self::Persistent(store) => store.ensure_index(name, mapping),
        }
    }

    fn has_index(&self, name: &str) -> Result<bool, KnoteError> {
        match self {
            Self::Memory(store) => store.has_index(name),
            Self::Persistent(store) => store.has_index(name),
        }
    }

    fn mapping(&self, name: &str) -> Result<Document, KnoteError> {
        match self {
            Self::Memory(store) => store.mapping(name),
            Self::Persistent(store) => store.mapping(name),
        }
    }

    fn get(&self, name: &str, id: &str) -> Result<Option<Versioned>, KnoteError> {
        match self {
            Self::Memory(store) => store.get(name, id),
            Self::Persistent(store) => store.get(name, id),
        }
    }

    fn upsert(
        &mut self,
        name: &str,
        id: &str,
        document: Document,
        condition: WriteCondition,
    ) -> Result<WriteResult, KnoteError> {
        match self {
            Self::Memory(store) => store.upsert(name, id, document, condition),
            Self::Persistent(store) => store.upsert(name, id, document, condition),
        }
    }

    fn search(&self, name: &str, query: &SearchQuery) -> Result<ResultSet, KnoteError> {
        match self {
            Self::Memory(store) => store.search(name, query),
            Self::Persistent(store) => store.search(name, query),
        }
    }
}
