//! # Query Evaluation
//!
//! Scores a structured query against one document.
//!
//! This is the reference implementation of the backend's search
//! semantics, shared by both in-tree stores. All scoring is integer
//! arithmetic in milli-units (`SCORE_UNIT`):
//! - `Match` scores proportionally to the fraction of query tokens found
//! - `Term` scores a flat unit on exact equality with any field element
//! - `Nested` averages the scores of matching nested elements
//! - `Bool` requires every clause and sums their scores
//! - `AnyOf` requires one clause and takes the best score

use crate::model::Document;
use crate::primitives::SCORE_UNIT;
use crate::query::{QueryNode, ScoreMode};
use std::collections::BTreeSet;

/// Score a query against a document. `None` means no match.
pub(crate) fn score(query: &QueryNode, document: &Document) -> Option<u64> {
    score_scoped(query, document, "")
}

/// Score within a nested scope. `scope` is the absolute dotted path of
/// the nested element `value` sits under ("" at the top level); field
/// paths in the query are absolute and get the scope prefix stripped
/// before resolution.
fn score_scoped(query: &QueryNode, value: &Document, scope: &str) -> Option<u64> {
    match query {
        QueryNode::MatchAll => Some(SCORE_UNIT),

        QueryNode::Term { field, value: want } => {
            let field_value = resolve(value, field, scope)?;
            if string_values(field_value).any(|s| s == want) {
                Some(SCORE_UNIT)
            } else {
                None
            }
        }

        QueryNode::Match { field, value: text } => {
            let query_tokens = tokenize(text);
            if query_tokens.is_empty() {
                return None;
            }
            let field_value = resolve(value, field, scope)?;
            let field_tokens: BTreeSet<String> =
                string_values(field_value).flat_map(|s| tokenize(s)).collect();
            let matched = query_tokens
                .iter()
                .filter(|t| field_tokens.contains(*t))
                .count() as u64;
            if matched == 0 {
                None
            } else {
                Some(SCORE_UNIT * matched / query_tokens.len() as u64)
            }
        }

        QueryNode::Nested {
            path,
            score_mode,
            query,
        } => {
            let elements = resolve(value, path, scope)?.as_array()?;
            let scores: Vec<u64> = elements
                .iter()
                .filter_map(|element| score_scoped(query, element, path))
                .collect();
            if scores.is_empty() {
                return None;
            }
            match score_mode {
                ScoreMode::Avg => Some(scores.iter().sum::<u64>() / scores.len() as u64),
            }
        }

        QueryNode::AnyOf(any) => any
            .iter()
            .filter_map(|member| score_scoped(member, value, scope))
            .max(),

        QueryNode::Bool { must } => {
            let mut total = 0u64;
            for member in must {
                total = total.saturating_add(score_scoped(member, value, scope)?);
            }
            Some(total)
        }
    }
}

/// Resolve an absolute dotted field path against a value under `scope`.
fn resolve<'a>(value: &'a Document, field: &str, scope: &str) -> Option<&'a Document> {
    let relative = if scope.is_empty() {
        field
    } else {
        field.strip_prefix(scope)?.strip_prefix('.')?
    };

    let mut current = value;
    for segment in relative.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// The string elements of a field value: the string itself, or the
/// string elements of an array (multi-valued field).
fn string_values(value: &Document) -> impl Iterator<Item = &str> {
    let (single, many) = match value {
        Document::String(s) => (Some(s.as_str()), None),
        Document::Array(items) => (None, Some(items.iter().filter_map(|v| v.as_str()))),
        _ => (None, None),
    };
    single.into_iter().chain(many.into_iter().flatten())
}

/// Lowercased alphanumeric tokens of a text.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Total nested documents a knote document expands to in the index:
/// each relationship entry plus each of its object refs.
pub(crate) fn nested_doc_count(document: &Document) -> usize {
    let Some(relationships) = document.get("relationships").and_then(|v| v.as_array()) else {
        return 0;
    };
    relationships
        .iter()
        .map(|rel| {
            1 + rel
                .get("objectKnotes")
                .and_then(|v| v.as_array())
                .map(|refs| refs.len())
                .unwrap_or(0)
        })
        .sum()
}

// =============================================================================
// TESTS
// =============================================================================
