//! # Query Compiler
//!
//! Translates a multi-valued query-parameter map into one structured
//! backend query.
//!
//! The grammar is three key shapes, conjoined with logical AND:
//! - `q` — full-text match on `name`
//! - `facet.<field>` — exact match on an arbitrary top-level field
//! - `relationship.<type>` — relationship traversal by object name or id
//!
//! Compilation never fails. Unrecognized keys and empty value lists are
//! silently skipped; that keeps the surface forward-compatible with
//! facets from newer clients, so it must stay a silent skip rather than
//! an error.

use crate::query::{QueryNode, SearchQuery};
use std::collections::BTreeMap;

/// Ordered multi-valued query parameters, as the front end hands them over.
pub type ParamMap = BTreeMap<String, Vec<String>>;

/// Compile a parameter map into a structured query.
///
/// An empty map (or a map with only unrecognized keys) compiles to the
/// match-everything query. Multiple values under one key are ANDed, not
/// ORed: two `q` values over-constrain to entities matching both. That
/// is the documented literal behavior, kept as-is.
#[must_use]
pub fn compile(params: &ParamMap) -> SearchQuery {
    let mut must = Vec::new();

    for (key, values) in params {
        if key == "q" {
            for value in values {
                must.push(QueryNode::match_text("name", value));
            }
        } else if let Some(field) = key.strip_prefix("facet.") {
            if field.is_empty() {
                continue;
            }
            for value in values {
                must.push(QueryNode::term(field, value));
            }
        } else if let Some(type_label) = key.strip_prefix("relationship.") {
            if type_label.is_empty() {
                continue;
            }
            for value in values {
                must.push(relationship_clause(type_label, value));
            }
        }
        // Any other key: ignored.
    }

    if must.is_empty() {
        SearchQuery::match_all()
    } else {
        SearchQuery::new(QueryNode::Bool { must })
    }
}

/// The relationship-traversal clause: a double-nested existential match.
///
/// Outer: a relationship entry whose type equals the label. Inner: an
/// object ref in that same entry whose name (full-text) or id (exact)
/// matches the value. Both nesting levels aggregate with averaging.
fn relationship_clause(type_label: &str, value: &str) -> QueryNode {
    QueryNode::nested_avg(
        "relationships",
        QueryNode::Bool {
            must: vec![
                QueryNode::term("relationships.type", type_label),
                QueryNode::nested_avg(
                    "relationships.objectKnotes",
                    QueryNode::AnyOf(vec![
                        QueryNode::match_text("relationships.objectKnotes.name", value),
                        QueryNode::term("relationships.objectKnotes.id", value),
                    ]),
                ),
            ],
        },
    )
}

// =============================================================================
// TESTS
// =============================================================================
