//! # Knotes CLI Module
//!
//! This module implements the CLI interface for knotes.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `seed` - Load the sample dataset
//! - `search` - Search entities by query parameters
//! - `get` - Fetch one entity by id
//! - `mapping` - Show the index schema

mod commands;

use clap::{Parser, Subcommand};
use knotes_core::KnoteError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Knotes - Entity Graph Server
///
/// A typed entity graph of places, people, and events with bidirectional
/// relationship edges, over a document-search store.
#[derive(Parser, Debug)]
#[command(name = "knotes")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the document database
    #[arg(short = 'D', long, global = true, default_value = "knotes.db")]
    pub database: PathBuf,

    /// Storage backend: "memory" (volatile) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Index name to operate on
    #[arg(short, long, global = true, default_value = "knotes")]
    pub index: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Load the sample dataset before serving
        #[arg(long)]
        seed: bool,
    },

    /// Load the sample dataset into the index
    Seed,

    /// Search entities by query parameters
    Search {
        /// Query parameter as key=value (repeatable); keys are
        /// q, facet.<field>, relationship.<type>
        #[arg(short, long = "param")]
        params: Vec<String>,
    },

    /// Fetch one entity by id
    Get {
        /// Entity id
        id: String,
    },

    /// Show the index schema
    Mapping,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), KnoteError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, seed }) => {
            cmd_server(&cli.database, backend, &cli.index, &host, port, seed).await
        }
        Some(Commands::Seed) => cmd_seed(&cli.database, backend, &cli.index, json_mode),
        Some(Commands::Search { params }) => {
            cmd_search(&cli.database, backend, &cli.index, json_mode, &params)
        }
        Some(Commands::Get { id }) => cmd_get(&cli.database, backend, &cli.index, &id),
        Some(Commands::Mapping) => cmd_mapping(&cli.database, backend, &cli.index),
        None => {
            // No subcommand - show the schema by default
            cmd_mapping(&cli.database, backend, &cli.index)
        }
    }
}
