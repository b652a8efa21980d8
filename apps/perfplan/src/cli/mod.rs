//! # perfplan CLI Module
//!
//! This module implements the CLI interface for perfplan.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Create a database, optionally with demo data
//! - `status` - Show record counts
//! - `token` - Issue a bearer token for a user
//! - `report` - Print the summary of one period
//! - `export` - Write the score sheet of one period to a JSON file

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use perfplan_core::ReviewError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// perfplan - monthly performance plans and reviews
///
/// Employees plan, managers approve and score, HR reports.
#[derive(Parser, Debug)]
#[command(name = "perfplan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides database.path)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (persistent) or "memory" (overrides database.backend)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

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
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,

        /// Populate demo users and a sample review
        #[arg(short, long)]
        seed: bool,
    },

    /// Show record counts
    Status,

    /// Issue a bearer token for a user
    Token {
        /// User id
        #[arg(short, long)]
        user: u64,
    },

    /// Print the summary report of a period
    Report {
        /// Period, YYYY-MM
        #[arg(short, long)]
        period: String,
    },

    /// Export the score sheet of a period as JSON
    Export {
        /// Period, YYYY-MM
        #[arg(short, long)]
        period: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve the configuration: file, then environment, then CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, ReviewError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.database {
        config.database.path.clone_from(path);
    }
    if let Some(backend) = &cli.backend {
        config.database.backend.clone_from(backend);
    }
    if cli.verbose {
        tracing::info!(
            database = ?config.database,
            server = ?config.server,
            "Resolved configuration"
        );
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ReviewError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Init { force, seed }) => cmd_init(&config, force, seed),
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Token { user }) => cmd_token(&config, user, json_mode),
        Some(Commands::Report { period }) => cmd_report(&config, &period, json_mode),
        Some(Commands::Export { period, output }) => cmd_export(&config, &period, &output),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}
