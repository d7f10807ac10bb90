//! # Bidirectional Indexing Engine
//!
//! Persists a knote and keeps the reciprocal relationship edges on every
//! referenced entity consistent with it.
//!
//! The engine owns an injected `DocumentStore` and the index name; the
//! one-time index bootstrap happens in the constructor. There is no
//! ambient client and no global state.
//!
//! ## Write semantics
//!
//! `index()` is best-effort, at-least-once. Fan-out writes to related
//! entities are not transactional with the self-write: a failure mid
//! fan-out aborts the call and leaves earlier reciprocal writes in
//! place. Retrying the whole call is always safe because every merge is
//! a set union, deduplicated by relationship type and by object id.
//!
//! Every individual read-merge-write cycle is guarded by a revision
//! compare-and-swap and re-run on conflict, bounded by
//! `MAX_WRITE_RETRIES`, so concurrent `index()` calls cannot silently
//! drop each other's merges.

use crate::compiler::{self, ParamMap};
use crate::model::{Document, Knote, KnoteRef};
use crate::primitives::{DEFAULT_INDEX, MAX_WRITE_RETRIES};
use crate::store::{DocumentStore, ResultSet, WriteCondition, WriteResult};
use crate::types::KnoteError;
use serde_json::json;

/// The index mapping: `relationships` and `relationships.objectKnotes`
/// are declared as nested structures so the relationship-traversal query
/// can match type and object fields jointly within one entry, rather
/// than independently across unrelated entries.
#[must_use]
pub fn knote_mapping() -> Document {
    json!({
        "properties": {
            "relationships": {
                "type": "nested",
                "properties": {
                    "objectKnotes": {
                        "type": "nested"
                    }
                }
            }
        }
    })
}

/// The engine: entity writes with reciprocal-edge fan-out, and compiled
/// faceted/relational search.
#[derive(Debug)]
pub struct KnoteEngine<S: DocumentStore> {
    store: S,
    index_name: String,
}

impl<S: DocumentStore> KnoteEngine<S> {
    /// Create an engine over the given store, creating the index with the
    /// nested mapping if it does not exist yet.
    pub fn new(mut store: S, index_name: impl Into<String>) -> Result<Self, KnoteError> {
        let index_name = index_name.into();
        store.ensure_index(&index_name, &knote_mapping())?;
        Ok(Self { store, index_name })
    }

    /// Create an engine over the default index name.
    pub fn with_default_index(store: S) -> Result<Self, KnoteError> {
        Self::new(store, DEFAULT_INDEX)
    }

    /// The index this engine reads and writes.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write access to the underlying store.
    ///
    /// Exists for callers that need to simulate out-of-band writes (tests,
    /// maintenance tooling); regular traffic goes through `index`.
    #[must_use]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Persist a knote and mirror its relationships.
    ///
    /// For every object ref of every relationship on the knote, ensures
    /// the referenced entity exists in the store and carries a reciprocal
    /// relationship (labeled after this knote's kind) pointing back.
    /// Then writes the knote itself, first merging in any relationships
    /// already stored under its id - those are edges other entities'
    /// fan-out wrote there, and a plain overwrite would clobber them.
    ///
    /// On failure the error carries the entity id and the stage
    /// (fan-out or self-write); some prefix of the intended writes may
    /// have landed, and the caller retries the whole call.
    pub fn index(&mut self, knote: &Knote) -> Result<WriteResult, KnoteError> {
        for relationship in knote.relationships() {
            for object in relationship.object_knotes() {
                self.mirror_reciprocal(knote, object)
                    .map_err(|e| KnoteError::index_failed(object.id(), "reciprocal fan-out", e))?;
            }
        }

        self.write_merged(knote)
            .map_err(|e| KnoteError::index_failed(knote.id(), "self-write", e))
    }

    /// Compile the parameter map and run exactly one backend search.
    pub fn search(&self, params: &ParamMap) -> Result<ResultSet, KnoteError> {
        let query = compiler::compile(params);
        self.store.search(&self.index_name, &query)
    }

    /// Index schema introspection passthrough.
    pub fn schema(&self) -> Result<Document, KnoteError> {
        self.store.mapping(&self.index_name)
    }

    /// Ensure `target` exists with a reciprocal edge back at `source`.
    ///
    /// Read-merge-write under revision CAS: an existing entity is loaded
    /// in full before mutating, so its stored relationships survive; a
    /// missing entity is created from the stub. Conflicts re-run the
    /// cycle up to `MAX_WRITE_RETRIES`.
    fn mirror_reciprocal(
        &mut self,
        source: &Knote,
        target: &KnoteRef,
    ) -> Result<WriteResult, KnoteError> {
        let label = source.kind().reciprocal_label();
        let mut last_conflict = None;

        for _ in 0..MAX_WRITE_RETRIES {
            let attempt = match self.store.get(&self.index_name, target.id())? {
                Some(versioned) => {
                    let mut stored = Knote::from_document(&versioned.source)?;
                    stored.add_relationship(&label, vec![source.to_ref()]);
                    self.store.upsert(
                        &self.index_name,
                        target.id(),
                        stored.to_document()?,
                        WriteCondition::RevisionIs(versioned.revision),
                    )
                }
                None => {
                    let mut created = target.clone().into_knote();
                    created.add_relationship(&label, vec![source.to_ref()]);
                    self.store.upsert(
                        &self.index_name,
                        target.id(),
                        created.to_document()?,
                        WriteCondition::Create,
                    )
                }
            };

            match attempt {
                Ok(result) => return Ok(result),
                Err(conflict @ KnoteError::RevisionConflict { .. }) => {
                    last_conflict = Some(conflict);
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_conflict.unwrap_or_else(|| {
            KnoteError::StoreRejected("write retry bound exhausted without attempt".to_string())
        }))
    }

    /// Write the knote itself, merging relationships already stored under
    /// its id (reciprocal edges from other entities' fan-out) into the
    /// in-memory copy first. Same CAS retry discipline as the fan-out.
    fn write_merged(&mut self, knote: &Knote) -> Result<WriteResult, KnoteError> {
        let mut last_conflict = None;

        for _ in 0..MAX_WRITE_RETRIES {
            let attempt = match self.store.get(&self.index_name, knote.id())? {
                Some(versioned) => {
                    let stored = Knote::from_document(&versioned.source)?;
                    let mut merged = knote.clone();
                    for relationship in stored.relationships() {
                        merged.add_relationship_entry(relationship.clone());
                    }
                    self.store.upsert(
                        &self.index_name,
                        knote.id(),
                        merged.to_document()?,
                        WriteCondition::RevisionIs(versioned.revision),
                    )
                }
                None => self.store.upsert(
                    &self.index_name,
                    knote.id(),
                    knote.to_document()?,
                    WriteCondition::Create,
                ),
            };

            match attempt {
                Ok(result) => return Ok(result),
                Err(conflict @ KnoteError::RevisionConflict { .. }) => {
                    last_conflict = Some(conflict);
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_conflict.unwrap_or_else(|| {
            KnoteError::StoreRejected("write retry bound exhausted without attempt".to_string())
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use crate::query::SearchQuery;
    use crate::store::{MemoryStore, Versioned};
    use crate::types::Kind;

    fn engine() -> KnoteEngine<MemoryStore> {
        KnoteEngine::with_default_index(MemoryStore::new()).expect("engine")
    }

    #[test]
    fn constructor_bootstraps_index() {
        let engine = engine();
        assert!(engine.store().has_index(DEFAULT_INDEX).expect("has_index"));
        assert_eq!(engine.schema().expect("schema"), knote_mapping());
    }

    #[test]
    fn fan_out_creates_missing_target_from_stub() {
        let mut engine = engine();

        let mut person = Knote::person("p1", "Emilie").expect("knote");
        person.add_relationship(
            "relatedPlace",
            vec![KnoteRef::new("pl1", Kind::Place, "Leesburg")],
        );
        engine.index(&person).expect("index");

        let place = engine
            .store()
            .get(DEFAULT_INDEX, "pl1")
            .expect("get")
            .expect("created by fan-out");
        let place = Knote::from_document(&place.source).expect("decode");
        let reciprocal = place.relationship("relatedPerson").expect("reciprocal");
        assert!(reciprocal.references("p1"));
        assert_eq!(reciprocal.object_knotes()[0].name(), "Emilie");
    }

    #[test]
    fn fan_out_preserves_existing_target_relationships() {
        let mut engine = engine();

        let mut place = Knote::place("pl1", "Leesburg").expect("knote");
        place.add_relationship(
            "hostedEvent",
            vec![KnoteRef::new("e9", Kind::Event, "Old fair")],
        );
        engine.index(&place).expect("index place");

        let mut person = Knote::person("p1", "Emilie").expect("knote");
        person.add_relationship("relatedPlace", vec![place.to_ref()]);
        engine.index(&person).expect("index person");

        let stored = engine
            .store()
            .get(DEFAULT_INDEX, "pl1")
            .expect("get")
            .expect("present");
        let stored = Knote::from_document(&stored.source).expect("decode");
        assert!(stored.relationship("hostedEvent").is_some());
        assert!(stored.relationship("relatedPerson").is_some());
    }

    #[test]
    fn fan_out_failure_aborts_with_context() {
        struct RejectingStore {
            inner: MemoryStore,
            reject_id: &'static str,
        }

        impl DocumentStore for RejectingStore {
            fn ensure_index(&mut self, name: &str, mapping: &Document) -> Result<(), KnoteError> {
                self.inner.ensure_index(name, mapping)
            }
            fn has_index(&self, name: &str) -> Result<bool, KnoteError> {
                self.inner.has_index(name)
            }
            fn mapping(&self, name: &str) -> Result<Document, KnoteError> {
                self.inner.mapping(name)
            }
            fn get(&self, name: &str, id: &str) -> Result<Option<Versioned>, KnoteError> {
                self.inner.get(name, id)
            }
            fn upsert(
                &mut self,
                name: &str,
                id: &str,
                document: Document,
                condition: WriteCondition,
            ) -> Result<WriteResult, KnoteError> {
                if id == self.reject_id {
                    return Err(KnoteError::StoreUnavailable("backend down".to_string()));
                }
                self.inner.upsert(name, id, document, condition)
            }
            fn search(&self, name: &str, query: &SearchQuery) -> Result<ResultSet, KnoteError> {
                self.inner.search(name, query)
            }
        }

        let store = RejectingStore {
            inner: MemoryStore::new(),
            reject_id: "pl2",
        };
        let mut engine = KnoteEngine::with_default_index(store).expect("engine");

        let mut person = Knote::person("p1", "Emilie").expect("knote");
        person.add_relationship(
            "relatedPlace",
            vec![
                KnoteRef::new("pl1", Kind::Place, "Leesburg"),
                KnoteRef::new("pl2", Kind::Place, "Ashburn"),
            ],
        );

        let err = engine.index(&person).expect_err("must abort");
        assert!(matches!(
            err,
            KnoteError::IndexFailed {
                stage: "reciprocal fan-out",
                ..
            }
        ));
        assert!(err.is_retryable());

        // The first target's reciprocal write landed and stays; the
        // self-write never happened. Retrying the whole call is safe.
        assert!(
            engine
                .store()
                .get(DEFAULT_INDEX, "pl1")
                .expect("get")
                .is_some()
        );
        assert!(
            engine
                .store()
                .get(DEFAULT_INDEX, "p1")
                .expect("get")
                .is_none()
        );
    }

    #[test]
    fn conflicting_writes_are_retried() {
        // Fails the first N conditional writes with a revision conflict,
        // simulating a concurrent writer racing our read-merge-write.
        struct ContendedStore {
            inner: MemoryStore,
            conflicts_left: usize,
        }

        impl DocumentStore for ContendedStore {
            fn ensure_index(&mut self, name: &str, mapping: &Document) -> Result<(), KnoteError> {
                self.inner.ensure_index(name, mapping)
            }
            fn has_index(&self, name: &str) -> Result<bool, KnoteError> {
                self.inner.has_index(name)
            }
            fn mapping(&self, name: &str) -> Result<Document, KnoteError> {
                self.inner.mapping(name)
            }
            fn get(&self, name: &str, id: &str) -> Result<Option<Versioned>, KnoteError> {
                self.inner.get(name, id)
            }
            fn upsert(
                &mut self,
                name: &str,
                id: &str,
                document: Document,
                condition: WriteCondition,
            ) -> Result<WriteResult, KnoteError> {
                if self.conflicts_left > 0 {
                    self.conflicts_left -= 1;
                    return Err(KnoteError::RevisionConflict {
                        id: id.to_string(),
                        expected: 0,
                        found: 1,
                    });
                }
                self.inner.upsert(name, id, document, condition)
            }
            fn search(&self, name: &str, query: &SearchQuery) -> Result<ResultSet, KnoteError> {
                self.inner.search(name, query)
            }
        }

        let store = ContendedStore {
            inner: MemoryStore::new(),
            conflicts_left: 2,
        };
        let mut engine = KnoteEngine::with_default_index(store).expect("engine");

        let person = Knote::person("p1", "Emilie").expect("knote");
        let result = engine.index(&person).expect("retries absorb conflicts");
        assert!(result.created);
    }

    #[test]
    fn two_forward_types_share_one_reciprocal_label() {
        // Known naming caveat: the reciprocal label depends only on the
        // source kind, so distinct forward types merge their reverse edges.
        let mut engine = engine();

        let mut event = Knote::event("e1", "Trying out search").expect("knote");
        event.add_relationship(
            "heldAt",
            vec![KnoteRef::new("pl1", Kind::Place, "Leesburg")],
        );
        event.add_relationship(
            "plannedAt",
            vec![KnoteRef::new("pl1", Kind::Place, "Leesburg")],
        );
        engine.index(&event).expect("index");

        let stored = engine
            .store()
            .get(DEFAULT_INDEX, "pl1")
            .expect("get")
            .expect("present");
        let stored = Knote::from_document(&stored.source).expect("decode");
        assert_eq!(stored.relationships().len(), 1);
        let merged = stored.relationship("relatedEvent").expect("reciprocal");
        assert_eq!(merged.object_knotes().len(), 1);
    }
}
