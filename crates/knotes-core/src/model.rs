//! # Entity Model
//!
//! Knotes, relationships, and the invariant-preserving mutation surface.
//!
//! Two invariants are maintained here and nowhere else:
//! - a knote holds at most one `Relationship` per distinct type label
//! - a relationship's object refs are deduplicated by id
//!
//! The relationships collection has no direct setter; `add_relationship`
//! is the only mutator and it is purely additive (merge, never replace).
//!
//! ## Full entity vs. stub
//!
//! `Knote` and `KnoteRef` are deliberately distinct types. A relationship
//! only ever references stubs (`id`, `kind`, `name`); serializing a full
//! entity inside `objectKnotes` would recurse through its own relationship
//! set and cycle. The engine works with full entities and demotes to stubs
//! at the relationship boundary via [`Knote::to_ref`].

use crate::primitives::{MAX_ID_LENGTH, MAX_NAME_LENGTH};
use crate::types::{Kind, KnoteError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A JSON-shaped document as the search backend stores it.
pub type Document = serde_json::Value;

// =============================================================================
// KNOTE REF (STUB)
// =============================================================================

/// A minimal reference to a knote: id, kind, and display name only.
///
/// This is the shape that appears inside `relationships[].objectKnotes`
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnoteRef {
    id: String,
    kind: Kind,
    name: String,
}

impl KnoteRef {
    /// Create a stub reference.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: Kind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
        }
    }

    /// The referenced knote's id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The referenced knote's kind.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The referenced knote's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Promote the stub to a full entity with no tags and no relationships.
    ///
    /// Used by the indexing engine when a fan-out target does not exist in
    /// the store yet: the stub becomes the base entity the reciprocal edge
    /// is written onto.
    #[must_use]
    pub fn into_knote(self) -> Knote {
        Knote {
            id: self.id,
            kind: self.kind,
            name: self.name,
            bin_ids: BTreeSet::new(),
            relationships: Vec::new(),
        }
    }
}

// =============================================================================
// RELATIONSHIP
// =============================================================================

/// A labeled group of directed edges from one knote to a set of others.
///
/// `object_knotes` never contains two refs with the same id; insertion
/// order of first appearance is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    type_label: String,
    #[serde(rename = "objectKnotes", default)]
    object_knotes: Vec<KnoteRef>,
}

impl Relationship {
    /// Create a relationship, deduplicating the refs by id (first wins).
    #[must_use]
    pub fn new(type_label: impl Into<String>, object_knotes: Vec<KnoteRef>) -> Self {
        let mut relationship = Self {
            type_label: type_label.into(),
            object_knotes: Vec::new(),
        };
        relationship.merge_refs(object_knotes);
        relationship
    }

    /// The relationship's type label.
    #[must_use]
    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    /// The referenced knotes, deduplicated by id.
    #[must_use]
    pub fn object_knotes(&self) -> &[KnoteRef] {
        &self.object_knotes
    }

    /// Whether the relationship references the given knote id.
    #[must_use]
    pub fn references(&self, id: &str) -> bool {
        self.object_knotes.iter().any(|r| r.id == id)
    }

    /// Merge refs into the group. A ref whose id is already present is a
    /// no-op: the existing entry wins, with no field-level merge of stub
    /// vs. full representation.
    fn merge_refs(&mut self, refs: Vec<KnoteRef>) {
        for incoming in refs {
            if !self.references(&incoming.id) {
                self.object_knotes.push(incoming);
            }
        }
    }
}

// =============================================================================
// KNOTE
// =============================================================================

/// An entity in the graph.
///
/// Created in memory by a caller (minimally id + kind + name) and made
/// durable only by passing through the indexing engine's write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Knote {
    id: String,
    kind: Kind,
    name: String,
    #[serde(default)]
    bin_ids: BTreeSet<String>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl Knote {
    /// Create a new knote with no tags and no relationships.
    ///
    /// Rejects an empty id, and ids or names over the configured length
    /// bounds, with `KnoteError::InvalidEntity`.
    pub fn new(
        id: impl Into<String>,
        kind: Kind,
        name: impl Into<String>,
    ) -> Result<Self, KnoteError> {
        let knote = Self {
            id: id.into(),
            kind,
            name: name.into(),
            bin_ids: BTreeSet::new(),
            relationships: Vec::new(),
        };
        knote.validate()?;
        Ok(knote)
    }

    /// Convenience constructor for a `Place`.
    pub fn place(id: impl Into<String>, name: impl Into<String>) -> Result<Self, KnoteError> {
        Self::new(id, Kind::Place, name)
    }

    /// Convenience constructor for a `Person`.
    pub fn person(id: impl Into<String>, name: impl Into<String>) -> Result<Self, KnoteError> {
        Self::new(id, Kind::Person, name)
    }

    /// Convenience constructor for an `Event`.
    pub fn event(id: impl Into<String>, name: impl Into<String>) -> Result<Self, KnoteError> {
        Self::new(id, Kind::Event, name)
    }

    /// The globally unique, caller-assigned id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The kind discriminator.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The display/search label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The facet tags, unordered and deduplicated.
    #[must_use]
    pub fn bin_ids(&self) -> &BTreeSet<String> {
        &self.bin_ids
    }

    /// The relationship set; at most one entry per distinct type label.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// The relationship with the given type label, if any.
    #[must_use]
    pub fn relationship(&self, type_label: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.type_label == type_label)
    }

    /// Add a facet tag.
    pub fn add_bin_id(&mut self, bin_id: impl Into<String>) {
        self.bin_ids.insert(bin_id.into());
    }

    /// Merge object refs into the relationship with the given type label.
    ///
    /// If a relationship with that label already exists, the incoming refs
    /// are merged into its group (dedup by id, existing entries win) and the
    /// entry is removed and reinserted, since the label is the set key. If
    /// not, a new relationship is appended. Never removes existing
    /// relationships or refs.
    pub fn add_relationship(&mut self, type_label: &str, object_knotes: Vec<KnoteRef>) {
        match self
            .relationships
            .iter()
            .position(|r| r.type_label == type_label)
        {
            Some(pos) => {
                let mut existing = self.relationships.remove(pos);
                existing.merge_refs(object_knotes);
                self.relationships.push(existing);
            }
            None => {
                self.relationships
                    .push(Relationship::new(type_label, object_knotes));
            }
        }
    }

    /// Merge a whole relationship entry, with the same semantics as
    /// [`Knote::add_relationship`].
    pub fn add_relationship_entry(&mut self, relationship: Relationship) {
        let Relationship {
            type_label,
            object_knotes,
        } = relationship;
        self.add_relationship(&type_label, object_knotes);
    }

    /// Demote to a stub reference for use inside a relationship.
    #[must_use]
    pub fn to_ref(&self) -> KnoteRef {
        KnoteRef {
            id: self.id.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }

    /// Encode to the wire document shape.
    pub fn to_document(&self) -> Result<Document, KnoteError> {
        serde_json::to_value(self).map_err(|e| KnoteError::Serialization(e.to_string()))
    }

    /// Decode from the wire document shape. Re-validates the entity so a
    /// hand-crafted document cannot smuggle in an invalid id.
    pub fn from_document(document: &Document) -> Result<Self, KnoteError> {
        let knote: Self = serde_json::from_value(document.clone())
            .map_err(|e| KnoteError::Serialization(e.to_string()))?;
        knote.validate()?;
        Ok(knote)
    }

    fn validate(&self) -> Result<(), KnoteError> {
        if self.id.is_empty() {
            return Err(KnoteError::InvalidEntity("knote id is empty".to_string()));
        }
        if self.id.len() > MAX_ID_LENGTH {
            return Err(KnoteError::InvalidEntity(format!(
                "knote id length {} exceeds maximum {} bytes",
                self.id.len(),
                MAX_ID_LENGTH
            )));
        }
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(KnoteError::InvalidEntity(format!(
                "knote name length {} exceeds maximum {} bytes",
                self.name.len(),
                MAX_NAME_LENGTH
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
