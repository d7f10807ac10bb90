//! # redb-backed Document Store
//!
//! A disk-backed store using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Documents are stored as JSON bytes with their revision; the
//! compare-and-swap check and the write happen inside one write
//! transaction, which is what makes `WriteCondition::RevisionIs` atomic.
//!
//! Search loads each document of the index and runs the shared query
//! evaluator over it. That is a full scan; the document population this
//! core targets is small, and the scan keeps both in-tree backends on
//! the exact same search semantics.

use super::memory::{check_condition, check_nested_limit, execute_query};
use super::{DocumentStore, ResultSet, Versioned, WriteCondition, WriteResult};
use crate::model::Document;
use crate::query::SearchQuery;
use crate::types::KnoteError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for documents: (index name, document id) -> JSON bytes of
/// the versioned document.
const DOCUMENTS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("documents");

/// Table for index mappings: index name -> JSON bytes of the mapping.
const MAPPINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("mappings");

/// The disk-backed store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

fn unavailable(e: impl std::fmt::Display) -> KnoteError {
    KnoteError::StoreUnavailable(e.to_string())
}

fn decode_versioned(bytes: &[u8]) -> Result<Versioned, KnoteError> {
    serde_json::from_slice(bytes).map_err(|e| KnoteError::Serialization(e.to_string()))
}

fn encode_versioned(versioned: &Versioned) -> Result<Vec<u8>, KnoteError> {
    serde_json::to_vec(versioned).map_err(|e| KnoteError::Serialization(e.to_string()))
}

impl RedbStore {
    /// Open or create a document database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KnoteError> {
        let db = Database::create(path.as_ref()).map_err(unavailable)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(unavailable)?;
            let _ = write_txn.open_table(DOCUMENTS).map_err(unavailable)?;
            let _ = write_txn.open_table(MAPPINGS).map_err(unavailable)?;
            write_txn.commit().map_err(unavailable)?;
        }

        Ok(Self { db })
    }

    fn mapping_bytes(&self, name: &str) -> Result<Option<Vec<u8>>, KnoteError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(MAPPINGS).map_err(unavailable)?;
        let bytes = table
            .get(name)
            .map_err(unavailable)?
            .map(|guard| guard.value().to_vec());
        Ok(bytes)
    }

    fn require_index(&self, name: &str) -> Result<(), KnoteError> {
        if self.mapping_bytes(name)?.is_none() {
            return Err(KnoteError::StoreRejected(format!("no such index '{name}'")));
        }
        Ok(())
    }
}

impl DocumentStore for RedbStore {
    fn ensure_index(&mut self, name: &str, mapping: &Document) -> Result<(), KnoteError> {
        let write_txn = self.db.begin_write().map_err(unavailable)?;
        {
            let mut table = write_txn.open_table(MAPPINGS).map_err(unavailable)?;
            let exists = table.get(name).map_err(unavailable)?.is_some();
            if !exists {
                let bytes = serde_json::to_vec(mapping)
                    .map_err(|e| KnoteError::Serialization(e.to_string()))?;
                table
                    .insert(name, bytes.as_slice())
                    .map_err(unavailable)?;
            }
        }
        write_txn.commit().map_err(unavailable)
    }

    fn has_index(&self, name: &str) -> Result<bool, KnoteError> {
        Ok(self.mapping_bytes(name)?.is_some())
    }

    fn mapping(&self, name: &str) -> Result<Document, KnoteError> {
        let bytes = self
            .mapping_bytes(name)?
            .ok_or_else(|| KnoteError::StoreRejected(format!("no such index '{name}'")))?;
        serde_json::from_slice(&bytes).map_err(|e| KnoteError::Serialization(e.to_string()))
    }

    fn get(&self, name: &str, id: &str) -> Result<Option<Versioned>, KnoteError> {
        self.require_index(name)?;

        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(DOCUMENTS).map_err(unavailable)?;
        table
            .get((name, id))
            .map_err(unavailable)?
            .map(|guard| decode_versioned(guard.value()))
            .transpose()
    }

    fn upsert(
        &mut self,
        name: &str,
        id: &str,
        document: Document,
        condition: WriteCondition,
    ) -> Result<WriteResult, KnoteError> {
        check_nested_limit(id, &document)?;
        self.require_index(name)?;

        let write_txn = self.db.begin_write().map_err(unavailable)?;
        let result = {
            let mut table = write_txn.open_table(DOCUMENTS).map_err(unavailable)?;

            let current = table
                .get((name, id))
                .map_err(unavailable)?
                .map(|guard| decode_versioned(guard.value()).map(|v| v.revision))
                .transpose()?;

            let revision = check_condition(id, current, condition)?;
            let bytes = encode_versioned(&Versioned {
                source: document,
                revision,
            })?;
            table
                .insert((name, id), bytes.as_slice())
                .map_err(unavailable)?;

            WriteResult {
                id: id.to_string(),
                revision,
                created: current.is_none(),
            }
        };
        write_txn.commit().map_err(unavailable)?;
        Ok(result)
    }

    fn search(&self, name: &str, query: &SearchQuery) -> Result<ResultSet, KnoteError> {
        self.require_index(name)?;

        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(DOCUMENTS).map_err(unavailable)?;

        let mut documents: BTreeMap<String, Versioned> = BTreeMap::new();
        for entry in table.iter().map_err(unavailable)? {
            let (key, value) = entry.map_err(unavailable)?;
            let (index_name, id) = key.value();
            if index_name != name {
                continue;
            }
            documents.insert(id.to_string(), decode_versioned(value.value())?);
        }

        Ok(execute_query(documents.iter(), query))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryNode;
    use serde_json::json;

    fn open_store(dir: &tempfile::TempDir) -> RedbStore {
        let mut store = RedbStore::open(dir.path().join("knotes.db")).expect("open");
        store
            .ensure_index("knotes", &json!({ "properties": {} }))
            .expect("ensure");
        store
    }

    #[test]
    fn documents_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut store = open_store(&dir);
            store
                .upsert(
                    "knotes",
                    "p1",
                    json!({ "id": "p1", "name": "Emilie" }),
                    WriteCondition::Any,
                )
                .expect("upsert");
        }

        let store = RedbStore::open(dir.path().join("knotes.db")).expect("reopen");
        assert!(store.has_index("knotes").expect("has_index"));
        let stored = store.get("knotes", "p1").expect("get").expect("present");
        assert_eq!(stored.source["name"], "Emilie");
        assert_eq!(stored.revision, 1);
    }

    #[test]
    fn cas_conflicts_match_memory_semantics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_store(&dir);

        store
            .upsert("knotes", "a", json!({ "name": "x" }), WriteCondition::Any)
            .expect("upsert");
        store
            .upsert("knotes", "a", json!({ "name": "y" }), WriteCondition::Any)
            .expect("upsert");

        let err = store
            .upsert(
                "knotes",
                "a",
                json!({ "name": "z" }),
                WriteCondition::RevisionIs(1),
            )
            .expect_err("must conflict");
        assert!(matches!(err, KnoteError::RevisionConflict { .. }));
    }

    #[test]
    fn search_scopes_to_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_store(&dir);
        store
            .ensure_index("drafts", &json!({ "properties": {} }))
            .expect("ensure");

        store
            .upsert(
                "knotes",
                "p1",
                json!({ "name": "Emilie" }),
                WriteCondition::Any,
            )
            .expect("upsert");
        store
            .upsert(
                "drafts",
                "d1",
                json!({ "name": "Emilie" }),
                WriteCondition::Any,
            )
            .expect("upsert");

        let query = SearchQuery::new(QueryNode::match_text("name", "Emilie"));
        let results = store.search("knotes", &query).expect("search");
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].id, "p1");
    }

    #[test]
    fn get_on_missing_index_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbStore::open(dir.path().join("knotes.db")).expect("open");
        let err = store.get("ghosts", "a").expect_err("must reject");
        assert!(matches!(err, KnoteError::StoreRejected(_)));
    }
}
