//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use knotes_core::{
    DocumentStore, Kind, Knote, KnoteEngine, KnoteError, KnoteRef, MemoryStore, ParamMap,
    RedbStore, StoreBackend,
};
use std::path::Path;

// =============================================================================
// ENGINE CONSTRUCTION
// =============================================================================

/// Open an engine over the configured backend.
///
/// The "memory" backend starts empty on every invocation; it is only
/// useful for the server command and for experiments.
pub fn open_engine(
    db_path: &Path,
    backend: &str,
    index: &str,
) -> Result<KnoteEngine<StoreBackend>, KnoteError> {
    let store = match backend {
        "memory" => StoreBackend::Memory(MemoryStore::new()),
        "redb" => StoreBackend::Persistent(RedbStore::open(db_path)?),
        other => {
            return Err(KnoteError::StoreRejected(format!(
                "Unknown backend '{}' (expected \"memory\" or \"redb\")",
                other
            )));
        }
    };
    KnoteEngine::new(store, index)
}

// =============================================================================
// SAMPLE DATASET
// =============================================================================

/// Load the sample dataset: one person, one place (created implicitly by
/// fan-out), and two events across two bins.
pub fn load_sample_data(engine: &mut KnoteEngine<StoreBackend>) -> Result<(), KnoteError> {
    let mut emilie = Knote::person("person1", "Emilie")?;
    emilie.add_bin_id("bin1");
    emilie.add_relationship(
        "relatedPlace",
        vec![KnoteRef::new("place1", Kind::Place, "Leesburg")],
    );
    engine.index(&emilie)?;

    let mut event1 = Knote::event("event1", "Trying out search")?;
    event1.add_bin_id("bin1");
    event1.add_relationship(
        "relatedPlace",
        vec![KnoteRef::new("place1", Kind::Place, "Leesburg")],
    );
    event1.add_relationship(
        "relatedPerson",
        vec![KnoteRef::new("person1", Kind::Person, "Emilie")],
    );
    engine.index(&event1)?;

    let mut event2 = Knote::event("event2", "Going to work")?;
    event2.add_bin_id("bin2");
    event2.add_relationship(
        "relatedPerson",
        vec![
            KnoteRef::new("person2", Kind::Person, "Colin"),
            KnoteRef::new("person1", Kind::Person, "Emilie"),
        ],
    );
    engine.index(&event2)?;

    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    backend: &str,
    index: &str,
    host: &str,
    port: u16,
    seed: bool,
) -> Result<(), KnoteError> {
    let mut engine = open_engine(db_path, backend, index)?;

    if seed {
        load_sample_data(&mut engine)?;
        tracing::info!("Sample dataset loaded");
    }

    println!("Knotes Entity Graph Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!("  Index:    {}", index);
    println!();
    println!("Endpoints:");
    println!("  GET  /            - Search entities");
    println!("  POST /knotes      - Index an entity");
    println!("  GET  /knotes/{{id}} - Fetch an entity");
    println!("  GET  /mapping     - Index schema");
    println!("  GET  /health      - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, engine).await
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Load the sample dataset into the configured backend.
pub fn cmd_seed(
    db_path: &Path,
    backend: &str,
    index: &str,
    json_mode: bool,
) -> Result<(), KnoteError> {
    let mut engine = open_engine(db_path, backend, index)?;
    load_sample_data(&mut engine)?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "index": index,
            "seeded": true
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Sample dataset loaded into index '{}'", index);
    }
    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Parse repeatable `key=value` arguments into the multi-valued map.
fn parse_params(raw: &[String]) -> Result<ParamMap, KnoteError> {
    let mut params = ParamMap::new();
    for entry in raw {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            KnoteError::StoreRejected(format!("Expected key=value, got '{}'", entry))
        })?;
        params
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(params)
}

/// Search entities by query parameters.
pub fn cmd_search(
    db_path: &Path,
    backend: &str,
    index: &str,
    json_mode: bool,
    raw_params: &[String],
) -> Result<(), KnoteError> {
    let engine = open_engine(db_path, backend, index)?;
    let params = parse_params(raw_params)?;
    let results = engine.search(&params)?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).unwrap_or_default()
        );
    } else {
        println!("{} result(s)", results.total);
        for hit in &results.hits {
            let name = hit.source["name"].as_str().unwrap_or("?");
            let kind = hit.source["kind"].as_str().unwrap_or("?");
            println!("  {:<12} {:<8} {} (score {})", hit.id, kind, name, hit.score_millis);
        }
    }
    Ok(())
}

// =============================================================================
// GET COMMAND
// =============================================================================

/// Fetch one entity by id.
pub fn cmd_get(db_path: &Path, backend: &str, index: &str, id: &str) -> Result<(), KnoteError> {
    let engine = open_engine(db_path, backend, index)?;
    match engine.store().get(index, id)? {
        Some(versioned) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&versioned.source).unwrap_or_default()
            );
            Ok(())
        }
        None => {
            println!("No entity with id '{}'", id);
            Ok(())
        }
    }
}

// =============================================================================
// MAPPING COMMAND
// =============================================================================

/// Show the index schema.
pub fn cmd_mapping(db_path: &Path, backend: &str, index: &str) -> Result<(), KnoteError> {
    let engine = open_engine(db_path, backend, index)?;
    let mapping = engine.schema()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&mapping).unwrap_or_default()
    );
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
