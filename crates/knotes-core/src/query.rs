//! # Structured Query Types
//!
//! The backend query AST produced by the query compiler and executed by
//! the document store.
//!
//! The shape mirrors the bool/match/term/nested query DSL of a
//! document-search backend; `to_backend_json` renders exactly that DSL.

use crate::model::Document;
use serde_json::json;

// =============================================================================
// SCORE MODE
// =============================================================================

/// How a nested clause aggregates the scores of matching nested elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// Average across matching nested elements (integer division).
    ///
    /// Relationship traversal uses averaging, not best-match, to line up
    /// with the reference relevance behavior.
    Avg,
}

impl ScoreMode {
    /// The wire tag for the score mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
        }
    }
}

// =============================================================================
// QUERY NODE
// =============================================================================

/// One clause of a structured backend query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// Matches every document.
    MatchAll,

    /// Full-text match: any analyzed token of the value occurring in the
    /// field counts, scored by the fraction of query tokens matched.
    Match {
        /// Dotted field path.
        field: String,
        /// The text to match.
        value: String,
    },

    /// Exact match on a top-level or dotted field. For multi-valued
    /// fields, equality with any element counts as a match.
    Term {
        /// Dotted field path.
        field: String,
        /// The exact value required.
        value: String,
    },

    /// Existential match over the elements of a nested array field. Field
    /// paths inside the subquery are absolute (they include `path`).
    Nested {
        /// Dotted path of the nested array.
        path: String,
        /// Aggregation over matching nested elements.
        score_mode: ScoreMode,
        /// The per-element subquery.
        query: Box<QueryNode>,
    },

    /// Matches if any member matches; scores as the best member.
    AnyOf(Vec<QueryNode>),

    /// Matches if all members match; scores as the sum of member scores.
    Bool {
        /// Conjoined clauses.
        must: Vec<QueryNode>,
    },
}

impl QueryNode {
    /// Full-text match helper.
    #[must_use]
    pub fn match_text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Match {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Exact-match helper.
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Nested clause helper with averaged scoring.
    #[must_use]
    pub fn nested_avg(path: impl Into<String>, query: QueryNode) -> Self {
        Self::Nested {
            path: path.into(),
            score_mode: ScoreMode::Avg,
            query: Box::new(query),
        }
    }

    /// Render this clause in the backend's JSON query DSL.
    #[must_use]
    pub fn to_backend_json(&self) -> Document {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Match { field, value } => json!({ "match": { field.as_str(): value } }),
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Nested {
                path,
                score_mode,
                query,
            } => json!({
                "nested": {
                    "path": path,
                    "score_mode": score_mode.as_str(),
                    "query": query.to_backend_json(),
                }
            }),
            Self::AnyOf(any) => {
                let should: Vec<Document> = any.iter().map(QueryNode::to_backend_json).collect();
                json!({ "bool": { "should": should, "minimum_should_match": 1 } })
            }
            Self::Bool { must } => {
                let must: Vec<Document> = must.iter().map(QueryNode::to_backend_json).collect();
                json!({ "bool": { "must": must } })
            }
        }
    }
}

// =============================================================================
// SEARCH QUERY
// =============================================================================

/// A complete structured query: one root clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// The root clause; the whole query is this clause's conjunction.
    pub root: QueryNode,
}

impl SearchQuery {
    /// Wrap a root clause.
    #[must_use]
    pub fn new(root: QueryNode) -> Self {
        Self { root }
    }

    /// The match-everything query.
    #[must_use]
    pub fn match_all() -> Self {
        Self::new(QueryNode::MatchAll)
    }

    /// Render the full request body in the backend's JSON query DSL.
    #[must_use]
    pub fn to_backend_json(&self) -> Document {
        json!({ "query": self.root.to_backend_json() })
    }
}

// =============================================================================
// TESTS
// =============================================================================
