//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, TokenSigner, unix_now};
use crate::config::AppConfig;
use perfplan_core::{Period, ReviewError, ReviewService, UserId, seed::seed_demo};
use std::path::{Path, PathBuf};

/// Validate an output path.
///
/// The parent directory must exist; it is canonicalized to resolve ".."
/// and symlinks.
fn validate_output_path(path: &Path) -> Result<PathBuf, ReviewError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ReviewError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ReviewError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ReviewError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), ReviewError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ReviewError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), ReviewError> {
    // Fail before opening the database if tokens cannot be verified.
    config.require_secret()?;

    let mut service = load_service(config)?;
    if !service.is_persistent() && seed_demo(&mut service, unix_now())? {
        tracing::info!("Seeded demo data into the in-memory store");
    }

    println!("perfplan Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", config.server.host);
    println!("  Port:      {}", config.server.port);
    println!("  Backend:   {}", config.database.backend);
    println!("  Database:  {:?}", config.database.path);
    println!("  Dev login: {}", config.security.dev_login);
    println!();
    println!("Endpoints:");
    println!("  GET  /health             - Health check");
    println!("  GET  /api/v1/me          - Current user");
    println!("  *    /api/v1/reviews     - Plans and reviews");
    println!("  GET  /api/v1/team/...    - Manager views");
    println!("  *    /api/v1/admin/...   - Administration");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config, service).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &AppConfig, force: bool, seed: bool) -> Result<(), ReviewError> {
    if config.database.backend != "redb" {
        return Err(ReviewError::InvalidInput(
            "init needs the redb backend; the memory backend has nothing to initialize"
                .to_string(),
        ));
    }

    let db_path = &config.database.path;
    if db_path.exists() {
        if !force {
            return Err(ReviewError::Conflict(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| ReviewError::IoError(format!("Remove old database: {}", e)))?;
    }

    let mut service = ReviewService::with_redb(db_path)?;
    println!("Initialized new redb database at {:?}", db_path);

    if seed && seed_demo(&mut service, unix_now())? {
        let stats = service.stats()?;
        println!(
            "Seeded {} users, {} roles, {} departments, {} review(s)",
            stats.users, stats.roles, stats.departments, stats.reviews
        );
    }

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show record counts.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), ReviewError> {
    let service = load_service(config)?;
    let stats = service.stats()?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.database.path.to_string_lossy(),
            "backend": config.database.backend,
            "stats": stats,
        });
        return print_json(&output);
    }

    println!("perfplan Status");
    println!("===============");
    println!("Database: {:?}", config.database.path);
    println!("Backend:  {}", config.database.backend);
    println!();
    println!("Users:       {}", stats.users);
    println!("Roles:       {}", stats.roles);
    println!("Departments: {}", stats.departments);
    println!("Reviews:     {}", stats.reviews);
    for (status, count) in &stats.by_status {
        println!("  {:<16} {}", status.name(), count);
    }

    Ok(())
}

// =============================================================================
// TOKEN COMMAND
// =============================================================================

/// Issue a bearer token for an active user.
pub fn cmd_token(config: &AppConfig, user: u64, json_mode: bool) -> Result<(), ReviewError> {
    let signer = TokenSigner::new(config.require_secret()?, config.security.token_ttl_hours);
    let service = load_service(config)?;
    let user = service.user(UserId(user))?;
    if !user.is_active {
        return Err(ReviewError::Forbidden(format!(
            "user {} is inactive",
            user.id
        )));
    }

    let issued = signer.issue(user.id, unix_now());
    tracing::info!(user_id = user.id.0, "Token issued from CLI");

    if json_mode {
        return print_json(&serde_json::json!({
            "user_id": user.id,
            "email": user.email,
            "token": issued.token,
            "expires_at": issued.expires_at,
        }));
    }

    println!("Token for {} <{}>:", user.name, user.email);
    println!("{}", issued.token);
    println!("Expires at: {} (unix seconds)", issued.expires_at);
    Ok(())
}

// =============================================================================
// REPORT COMMAND
// =============================================================================

/// Print the summary of one period.
pub fn cmd_report(config: &AppConfig, period: &str, json_mode: bool) -> Result<(), ReviewError> {
    let period: Period = period.parse()?;
    let service = load_service(config)?;
    let summary = service.summary(period)?;

    if json_mode {
        return print_json(&summary);
    }

    println!("Period {}", summary.period);
    println!("==============");
    println!("Submitted: {}", summary.submitted);
    for (status, count) in &summary.by_status {
        println!("  {:<16} {}", status.name(), count);
    }
    println!("Completed: {}", summary.completed);
    match summary.average_total {
        Some(avg) => println!("Average:   {}", avg),
        None => println!("Average:   -"),
    }
    println!();
    println!("Grade points:");
    println!("  above 1.0  {}", summary.grades.above_full);
    println!("  1.0        {}", summary.grades.excellent);
    println!("  0.8        {}", summary.grades.pass);
    println!("  0.0        {}", summary.grades.fail);

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the score sheet of one period as pretty JSON.
pub fn cmd_export(config: &AppConfig, period: &str, output: &Path) -> Result<(), ReviewError> {
    let period: Period = period.parse()?;
    let validated_output = validate_output_path(output)?;

    let service = load_service(config)?;
    let sheet = service.score_sheet(period)?;
    let data = serde_json::to_vec_pretty(&sheet)
        .map_err(|e| ReviewError::SerializationError(e.to_string()))?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| ReviewError::IoError(format!("Write file: {}", e)))?;

    println!("BLAKE3: {}", sheet.checksum);
    println!(
        "Exported {} row(s), {} bytes to {:?}",
        sheet.rows.len(),
        data.len(),
        validated_output
    );

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured backend.
pub fn load_service(config: &AppConfig) -> Result<ReviewService, ReviewError> {
    match config.database.backend.as_str() {
        "redb" => ReviewService::with_redb(&config.database.path),
        "memory" => Ok(ReviewService::new()),
        other => Err(ReviewError::InvalidInput(format!(
            "Unknown backend: {}. Use: redb, memory",
            other
        ))),
    }
}
