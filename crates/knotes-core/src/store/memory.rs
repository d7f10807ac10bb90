//! # In-Memory Document Store
//!
//! `BTreeMap`-backed reference backend. Deterministic iteration order,
//! no I/O; this is the store unit and property tests run against.

use super::eval;
use super::{DocumentStore, Hit, ResultSet, Versioned, WriteCondition, WriteResult};
use crate::model::Document;
use crate::primitives::MAX_NESTED_OBJECTS;
use crate::query::SearchQuery;
use crate::types::KnoteError;
use std::collections::BTreeMap;

/// One index: its mapping and its documents with revisions.
#[derive(Debug, Clone, Default)]
struct IndexData {
    mapping: Document,
    documents: BTreeMap<String, Versioned>,
}

/// The in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    indices: BTreeMap<String, IndexData>,
}

impl MemoryStore {
    /// Create an empty store with no indices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in an index (0 if the index is absent).
    #[must_use]
    pub fn document_count(&self, name: &str) -> usize {
        self.indices
            .get(name)
            .map(|index| index.documents.len())
            .unwrap_or(0)
    }

    fn index(&self, name: &str) -> Result<&IndexData, KnoteError> {
        self.indices
            .get(name)
            .ok_or_else(|| KnoteError::StoreRejected(format!("no such index '{name}'")))
    }
}

/// Reject documents over the nested-object limit, mirroring the backend's
/// `nested_objects.limit` behavior.
pub(super) fn check_nested_limit(id: &str, document: &Document) -> Result<(), KnoteError> {
    let nested = eval::nested_doc_count(document);
    if nested > MAX_NESTED_OBJECTS {
        return Err(KnoteError::StoreRejected(format!(
            "document '{id}' expands to {nested} nested documents, over the limit of {MAX_NESTED_OBJECTS}"
        )));
    }
    Ok(())
}

/// Run a query over an iterator of (id, versioned document), producing the
/// deterministic hit ordering: score descending, id ascending on ties.
pub(super) fn execute_query<'a>(
    documents: impl Iterator<Item = (&'a String, &'a Versioned)>,
    query: &SearchQuery,
) -> ResultSet {
    let mut hits: Vec<Hit> = documents
        .filter_map(|(id, versioned)| {
            eval::score(&query.root, &versioned.source).map(|score_millis| Hit {
                id: id.clone(),
                score_millis,
                source: versioned.source.clone(),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score_millis
            .cmp(&a.score_millis)
            .then_with(|| a.id.cmp(&b.id))
    });

    ResultSet {
        total: hits.len(),
        hits,
    }
}

impl DocumentStore for MemoryStore {
    fn ensure_index(&mut self, name: &str, mapping: &Document) -> Result<(), KnoteError> {
        self.indices
            .entry(name.to_string())
            .or_insert_with(|| IndexData {
                mapping: mapping.clone(),
                documents: BTreeMap::new(),
            });
        Ok(())
    }

    fn has_index(&self, name: &str) -> Result<bool, KnoteError> {
        Ok(self.indices.contains_key(name))
    }

    fn mapping(&self, name: &str) -> Result<Document, KnoteError> {
        Ok(self.index(name)?.mapping.clone())
    }

    fn get(&self, name: &str, id: &str) -> Result<Option<Versioned>, KnoteError> {
        Ok(self.index(name)?.documents.get(id).cloned())
    }

    fn upsert(
        &mut self,
        name: &str,
        id: &str,
        document: Document,
        condition: WriteCondition,
    ) -> Result<WriteResult, KnoteError> {
        check_nested_limit(id, &document)?;

        let index = self
            .indices
            .get_mut(name)
            .ok_or_else(|| KnoteError::StoreRejected(format!("no such index '{name}'")))?;

        let current = index.documents.get(id).map(|v| v.revision);
        let revision = check_condition(id, current, condition)?;

        index.documents.insert(
            id.to_string(),
            Versioned {
                source: document,
                revision,
            },
        );

        Ok(WriteResult {
            id: id.to_string(),
            revision,
            created: current.is_none(),
        })
    }

    fn search(&self, name: &str, query: &SearchQuery) -> Result<ResultSet, KnoteError> {
        Ok(execute_query(self.index(name)?.documents.iter(), query))
    }
}

/// Validate a write condition against the stored revision; returns the
/// revision the write will be assigned.
pub(super) fn check_condition(
    id: &str,
    current: Option<u64>,
    condition: WriteCondition,
) -> Result<u64, KnoteError> {
    match (condition, current) {
        (WriteCondition::Any, stored) => Ok(stored.unwrap_or(0) + 1),
        (WriteCondition::Create, None) => Ok(1),
        (WriteCondition::Create, Some(found)) => Err(KnoteError::RevisionConflict {
            id: id.to_string(),
            expected: 0,
            found,
        }),
        (WriteCondition::RevisionIs(expected), Some(found)) if expected == found => {
            Ok(found + 1)
        }
        (WriteCondition::RevisionIs(expected), found) => Err(KnoteError::RevisionConflict {
            id: id.to_string(),
            expected,
            found: found.unwrap_or(0),
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
