//! # knotes-core
//!
//! A typed entity graph over an opaque document-search backend.
//!
//! Entities ("knotes") are places, people, and events linked by labeled
//! relationships. The engine keeps relationship edges bidirectional:
//! every write fans out reciprocal edges to the referenced entities
//! before persisting the entity itself, and merges rather than replaces
//! so concurrent edges from other writers survive.
//!
//! ## Architecture
//!
//! ```text
//! compiler  — query-parameter map  ->  structured backend query
//! engine    — write fan-out, merge-on-write, search entry point
//! model     — Knote / KnoteRef / Relationship and their invariants
//! query     — the structured query AST and its backend JSON form
//! store     — DocumentStore trait; in-memory and redb backends
//! ```
//!
//! The store boundary is the trait [`store::DocumentStore`]; the engine
//! never assumes anything beyond it, so backends are swappable per
//! deployment via [`store::StoreBackend`].

pub mod compiler;
pub mod engine;
pub mod model;
pub mod primitives;
pub mod query;
pub mod store;
pub mod types;

pub use compiler::{ParamMap, compile};
pub use engine::{KnoteEngine, knote_mapping};
pub use model::{Document, Knote, KnoteRef, Relationship};
pub use query::{QueryNode, ScoreMode, SearchQuery};
pub use store::{
    DocumentStore, Hit, MemoryStore, RedbStore, ResultSet, StoreBackend, Versioned,
    WriteCondition, WriteResult,
};
pub use types::{Kind, KnoteError};
