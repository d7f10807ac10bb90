//! # Knotes - Entity Graph Server
//!
//! The main binary for the knotes typed entity graph.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for indexing and search
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              apps/knotes (THE BINARY)            │
//! │                                                  │
//! │   ┌─────────────┐        ┌─────────────┐        │
//! │   │   CLI       │        │   HTTP API  │        │
//! │   │  (clap)     │        │   (axum)    │        │
//! │   └──────┬──────┘        └──────┬──────┘        │
//! │          │                      │               │
//! │          └──────────┬───────────┘               │
//! │                     ▼                           │
//! │             ┌───────────────┐                   │
//! │             │  knotes-core  │                   │
//! │             │  (THE LOGIC)  │                   │
//! │             └───────────────┘                   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server with sample data
//! knotes server --host 0.0.0.0 --port 8080 --seed
//!
//! # CLI operations
//! knotes seed
//! knotes search -p q=Emilie -p facet.kind=Person
//! knotes mapping
//! ```

use clap::Parser;
use knotes::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — KNOTES_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KNOTES_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "knotes=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the knotes startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗  ██╗███╗   ██╗ ██████╗ ████████╗███████╗███████╗
  ██║ ██╔╝████╗  ██║██╔═══██╗╚══██╔══╝██╔════╝██╔════╝
  █████╔╝ ██╔██╗ ██║██║   ██║   ██║   █████╗  ███████╗
  ██╔═██╗ ██║╚██╗██║██║   ██║   ██║   ██╔══╝  ╚════██║
  ██║  ██╗██║ ╚████║╚██████╔╝   ██║   ███████╗███████║
  ╚═╝  ╚═╝╚═╝  ╚═══╝ ╚═════╝    ╚═╝   ╚══════╝╚══════╝

  Entity Graph Server v{}

  Places • People • Events
"#,
        env!("CARGO_PKG_VERSION")
    );
}
