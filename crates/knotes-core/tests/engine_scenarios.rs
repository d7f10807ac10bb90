//! # Engine Scenario Tests
//!
//! End-to-end write-then-search flows through the engine, on both
//! backends.

use knotes_core::{
    DocumentStore, Kind, Knote, KnoteEngine, KnoteRef, MemoryStore, ParamMap, RedbStore,
};

const INDEX: &str = "knotes";

fn memory_engine() -> KnoteEngine<MemoryStore> {
    KnoteEngine::new(MemoryStore::new(), INDEX).expect("engine")
}

fn params(entries: &[(&str, &[&str])]) -> ParamMap {
    entries
        .iter()
        .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
        .collect()
}

/// The canonical small dataset: a person tied to a place, and two events
/// tied to people and places across two bins.
fn seed(engine: &mut KnoteEngine<impl DocumentStore>) {
    let mut emilie = Knote::person("person1", "Emilie").expect("knote");
    emilie.add_bin_id("bin1");
    emilie.add_relationship(
        "relatedPlace",
        vec![KnoteRef::new("place1", Kind::Place, "Leesburg")],
    );
    engine.index(&emilie).expect("index person1");

    let mut event1 = Knote::event("event1", "Trying out search").expect("knote");
    event1.add_bin_id("bin1");
    event1.add_relationship(
        "relatedPlace",
        vec![KnoteRef::new("place1", Kind::Place, "Leesburg")],
    );
    event1.add_relationship(
        "relatedPerson",
        vec![KnoteRef::new("person1", Kind::Person, "Emilie")],
    );
    engine.index(&event1).expect("index event1");

    let mut event2 = Knote::event("event2", "Going to work").expect("knote");
    event2.add_bin_id("bin2");
    event2.add_relationship(
        "relatedPerson",
        vec![
            KnoteRef::new("person2", Kind::Person, "Colin"),
            KnoteRef::new("person1", Kind::Person, "Emilie"),
        ],
    );
    engine.index(&event2).expect("index event2");
}

fn stored_knote(engine: &KnoteEngine<impl DocumentStore>, id: &str) -> Knote {
    let versioned = engine
        .store()
        .get(INDEX, id)
        .expect("get")
        .expect("document present");
    Knote::from_document(&versioned.source).expect("decode")
}

#[test]
fn indexing_creates_reciprocal_edges_on_stubs() {
    let mut engine = memory_engine();
    seed(&mut engine);

    // place1 was never indexed directly; fan-out created it from the stub
    // and accumulated reciprocal edges from the person and the event.
    let place = stored_knote(&engine, "place1");
    assert_eq!(place.name(), "Leesburg");
    assert!(
        place
            .relationship("relatedPerson")
            .expect("edge from person1")
            .references("person1")
    );
    assert!(
        place
            .relationship("relatedEvent")
            .expect("edge from event1")
            .references("event1")
    );
}

#[test]
fn self_write_merges_stored_reciprocal_edges() {
    let mut engine = memory_engine();
    seed(&mut engine);

    // person1 was indexed before the events; its stored copy must carry
    // both its own forward edge and the reciprocal edges the events'
    // fan-out wrote afterwards, surviving a re-index.
    let emilie = stored_knote(&engine, "person1");
    assert!(
        emilie
            .relationship("relatedPlace")
            .expect("own forward edge")
            .references("place1")
    );
    let from_events = emilie
        .relationship("relatedEvent")
        .expect("reciprocal edges");
    assert!(from_events.references("event1"));
    assert!(from_events.references("event2"));

    // Re-indexing the original in-memory entity (which knows nothing of
    // the events) must not clobber those edges.
    let mut original = Knote::person("person1", "Emilie").expect("knote");
    original.add_bin_id("bin1");
    original.add_relationship(
        "relatedPlace",
        vec![KnoteRef::new("place1", Kind::Place, "Leesburg")],
    );
    engine.index(&original).expect("re-index");

    let again = stored_knote(&engine, "person1");
    assert!(
        again
            .relationship("relatedEvent")
            .expect("edges survive")
            .references("event2")
    );
}

#[test]
fn full_text_search_finds_by_name() {
    let mut engine = memory_engine();
    seed(&mut engine);

    let results = engine
        .search(&params(&[("q", &["Emilie"])]))
        .expect("search");
    assert_eq!(results.total, 1);
    assert_eq!(results.hits[0].id, "person1");
}

#[test]
fn facet_search_filters_exactly() {
    let mut engine = memory_engine();
    seed(&mut engine);

    let results = engine
        .search(&params(&[("facet.binIds", &["bin1"])]))
        .expect("search");
    let ids: Vec<&str> = results.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["event1", "person1"]);

    let results = engine
        .search(&params(&[("facet.kind", &["Event"])]))
        .expect("search");
    assert_eq!(results.total, 2);
}

#[test]
fn relationship_search_traverses_by_object_name() {
    let mut engine = memory_engine();
    seed(&mut engine);

    // Both events reference Emilie; the place does too (reciprocal), but
    // under relatedPerson the place qualifies as well. Constrain by kind.
    let results = engine
        .search(&params(&[
            ("facet.kind", &["Event"]),
            ("relationship.relatedPerson", &["Emilie"]),
        ]))
        .expect("search");
    let ids: Vec<&str> = results.hits.iter().map(|h| h.id.as_str()).collect();
    assert!(ids.contains(&"event1"));
    assert!(ids.contains(&"event2"));
    assert_eq!(results.total, 2);
}

#[test]
fn relationship_search_traverses_by_object_id() {
    let mut engine = memory_engine();
    seed(&mut engine);

    let results = engine
        .search(&params(&[
            ("facet.kind", &["Event"]),
            ("relationship.relatedPerson", &["person2"]),
        ]))
        .expect("search");
    assert_eq!(results.total, 1);
    assert_eq!(results.hits[0].id, "event2");
}

#[test]
fn relationship_type_must_match_within_one_entry() {
    let mut engine = memory_engine();
    seed(&mut engine);

    // event1 has relatedPlace -> Leesburg and relatedPerson -> Emilie.
    // Asking for relatedPerson -> Leesburg must not cross entries.
    let results = engine
        .search(&params(&[("relationship.relatedPerson", &["Leesburg"])]))
        .expect("search");
    assert!(results.hits.iter().all(|h| h.id != "event1"));
}

#[test]
fn conjunction_over_parameter_kinds() {
    let mut engine = memory_engine();
    seed(&mut engine);

    let results = engine
        .search(&params(&[
            ("q", &["work"]),
            ("facet.binIds", &["bin2"]),
            ("relationship.relatedPerson", &["Colin"]),
        ]))
        .expect("search");
    assert_eq!(results.total, 1);
    assert_eq!(results.hits[0].id, "event2");
}

#[test]
fn unknown_parameters_are_tolerated() {
    let mut engine = memory_engine();
    seed(&mut engine);

    let results = engine
        .search(&params(&[("q", &["Emilie"]), ("page.size", &["25"])]))
        .expect("search");
    assert_eq!(results.total, 1);

    // Only unknown keys: everything comes back.
    let results = engine
        .search(&params(&[("page.size", &["25"])]))
        .expect("search");
    assert_eq!(results.total, 5);
}

#[test]
fn empty_parameter_map_matches_everything() {
    let mut engine = memory_engine();
    seed(&mut engine);

    let results = engine.search(&ParamMap::new()).expect("search");
    assert_eq!(results.total, 5);
}

#[test]
fn schema_reports_nested_mapping() {
    let engine = memory_engine();
    let mapping = engine.schema().expect("schema");
    assert_eq!(mapping["properties"]["relationships"]["type"], "nested");
    assert_eq!(
        mapping["properties"]["relationships"]["properties"]["objectKnotes"]["type"],
        "nested"
    );
}

#[test]
fn persistent_backend_behaves_like_memory_and_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("knotes.db");

    {
        let store = RedbStore::open(&path).expect("open");
        let mut engine = KnoteEngine::new(store, INDEX).expect("engine");
        seed(&mut engine);

        let results = engine
            .search(&params(&[("q", &["Emilie"])]))
            .expect("search");
        assert_eq!(results.total, 1);
    }

    let store = RedbStore::open(&path).expect("reopen");
    let engine = KnoteEngine::new(store, INDEX).expect("engine");

    let place = stored_knote(&engine, "place1");
    assert!(
        place
            .relationship("relatedPerson")
            .expect("edges persisted")
            .references("person1")
    );

    let results = engine
        .search(&params(&[
            ("facet.kind", &["Event"]),
            ("relationship.relatedPerson", &["Emilie"]),
        ]))
        .expect("search");
    assert_eq!(results.total, 2);
}
