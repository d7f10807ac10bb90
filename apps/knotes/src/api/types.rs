//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! The index request body is the wire document shape itself; it is decoded
//! and validated by `Knote::from_document`, so there is no separate request
//! struct for it.

use axum::http::StatusCode;
use knotes_core::{KnoteError, ResultSet, WriteResult};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// INDEX RESPONSE
// =============================================================================

/// Entity index response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub success: bool,
    pub id: Option<String>,
    pub revision: Option<u64>,
    pub created: Option<bool>,
    pub error: Option<String>,
}

impl IndexResponse {
    pub fn success(result: &WriteResult) -> Self {
        Self {
            success: true,
            id: Some(result.id.clone()),
            revision: Some(result.revision),
            created: Some(result.created),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            revision: None,
            created: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// SEARCH RESPONSE
// =============================================================================

/// Search response: the core result set as-is.
pub type SearchResponse = ResultSet;

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Generic error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Map a core error to the HTTP status it should surface as.
///
/// Caller mistakes (invalid entity, rejected writes such as the
/// nested-object limit) are 400; backend outages are 503; everything
/// else, including exhausted conflict retries, is 500.
#[must_use]
pub fn error_status(error: &KnoteError) -> StatusCode {
    match error {
        KnoteError::InvalidEntity(_) | KnoteError::StoreRejected(_) => StatusCode::BAD_REQUEST,
        KnoteError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        KnoteError::IndexFailed { source, .. } => error_status(source),
        KnoteError::RevisionConflict { .. } | KnoteError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_entity_maps_to_bad_request() {
        let err = KnoteError::InvalidEntity("empty id".to_string());
        assert_eq!(error_status(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn index_failed_maps_through_its_source() {
        let err = KnoteError::index_failed(
            "p1",
            "reciprocal fan-out",
            KnoteError::StoreUnavailable("down".to_string()),
        );
        assert_eq!(error_status(&err), StatusCode::SERVICE_UNAVAILABLE);
    }
}
