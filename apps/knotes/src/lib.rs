//! # Knotes - Entity Graph Server
//!
//! Library surface of the knotes binary, exposing the HTTP API and CLI
//! modules so integration tests can drive the router directly.

pub mod api;
pub mod cli;
