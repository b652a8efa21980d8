//! # perfplan - Performance Review Server
//!
//! The main binary for perfplan.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for setup, tokens and reporting
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/perfplan (THE BINARY)            │
//! │                                                      │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────┐   │
//! │   │   CLI       │    │   HTTP API  │    │ Config │   │
//! │   │  (clap)     │    │   (axum)    │    │ (toml) │   │
//! │   └──────┬──────┘    └──────┬──────┘    └───┬────┘   │
//! │          └──────────────────┼───────────────┘        │
//! │                             ▼                        │
//! │                    ┌────────────────┐                │
//! │                    │ perfplan-core  │                │
//! │                    │  (THE RULES)   │                │
//! │                    └────────────────┘                │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Create a database with demo data
//! perfplan init --seed
//!
//! # Start the HTTP server
//! PERFPLAN_TOKEN_SECRET=change-me perfplan server --host 0.0.0.0 --port 8080
//!
//! # Issue a token, print a report
//! PERFPLAN_TOKEN_SECRET=change-me perfplan token --user 7
//! perfplan report --period 2025-07
//! ```

use clap::Parser;
use perfplan::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // PERFPLAN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("PERFPLAN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "perfplan=info,tower_http=debug".into());

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

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the perfplan startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┌─┐┬─┐┌─┐┌─┐┬  ┌─┐┌┐┌
  ├─┘├┤ ├┬┘├┤ ├─┘│  ├─┤│││
  ┴  └─┘┴└─└  ┴  ┴─┘┴ ┴┘└┘

  Performance Review Server v{}

  Plan • Approve • Score
"#,
        env!("CARGO_PKG_VERSION")
    );
}
