//! # perfplan HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! Public:
//! - `GET /health` - Health check
//! - `POST /api/v1/auth/dev-login` - Issue a token by email (development only)
//!
//! Bearer token required:
//! - `GET /api/v1/me` - Caller and menu hints
//! - `POST|GET /api/v1/reviews` - Create / list own reviews
//! - `GET /api/v1/reviews/by-period?period=` - Own review of a period
//! - `GET /api/v1/reviews/all-submitted` - HR: every submitted review
//! - `GET /api/v1/reviews/all-by-period?period=` - HR: one period
//! - `GET /api/v1/reviews/summary?period=` - HR: period report
//! - `GET /api/v1/reviews/sheet?period=` - HR: period score sheet
//! - `GET|PUT /api/v1/reviews/{id}` - Fetch / edit items
//! - `GET /api/v1/reviews/{id}/sheet` - Scorer or HR: one review's score sheet
//! - `POST /api/v1/reviews/{id}/{submit,approve,reject,score}` - Workflow
//! - `GET /api/v1/team/reviews` - Direct reports' submitted reviews
//! - `/api/v1/admin/{users,departments,roles,settings}` - Admin only
//!
//! ## Security Configuration
//!
//! See `config` for `http.cors_origins`, `http.rate_limit` and
//! `security.dev_login`.
//!
//! Malformed bodies, ids and query strings are rejected through the
//! `extract` wrappers with the same JSON error body as every other failure.

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod types;

pub use auth::{CurrentUser, IssuedToken, TokenError, TokenSigner};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use middleware::create_rate_limiter;
pub use types::{ApiError, ErrorResponse, HealthResponse};

use crate::config::{AppConfig, HttpConfig};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use perfplan_core::{ReviewError, ReviewService};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit (1 MB).
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The review service. Reads share the lock; workflow mutations take it
    /// exclusively, so transitions on one review are serialized.
    pub service: Arc<RwLock<ReviewService>>,
    pub signer: Arc<TokenSigner>,
    pub dev_login: bool,
    pub http: HttpConfig,
}

impl AppState {
    /// Create app state with default HTTP settings and dev login off.
    #[must_use]
    pub fn new(service: ReviewService, signer: TokenSigner) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
            signer: Arc::new(signer),
            dev_login: false,
            http: HttpConfig::default(),
        }
    }

    #[must_use]
    pub fn with_dev_login(mut self, enabled: bool) -> Self {
        self.dev_login = enabled;
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `["*"]`: allows all origins (development only)
/// - `None`: localhost only
/// - otherwise: the listed origins
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([only]) if only == "*" => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Localhost origins of the review frontend and its dev servers.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:3100",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:3100",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();
    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - protects against bursts (if enabled)
/// 4. Authentication - resolves the bearer token (API routes only)
/// 5. Admin guard - `/api/v1/admin/*` only
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.http.cors_origins.as_deref());

    let rate_limiter = create_rate_limiter(state.http.rate_limit);
    match &rate_limiter {
        Some(_) => tracing::info!(
            "Rate limiting enabled: {} requests/second",
            state.http.rate_limit
        ),
        None => tracing::info!("Rate limiting disabled"),
    }

    let admin = Router::new()
        .route("/users", get(handlers::list_users_handler))
        .route("/users/{id}", put(handlers::update_user_handler))
        .route(
            "/departments",
            get(handlers::list_departments_handler).post(handlers::create_department_handler),
        )
        .route("/roles", get(handlers::list_roles_handler))
        .route(
            "/settings",
            get(handlers::list_settings_handler).put(handlers::put_setting_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_middleware,
        ));

    let protected = Router::new()
        .route("/me", get(handlers::me_handler))
        .route(
            "/reviews",
            get(handlers::list_reviews_handler).post(handlers::create_review_handler),
        )
        .route("/reviews/by-period", get(handlers::review_by_period_handler))
        .route("/reviews/all-submitted", get(handlers::all_submitted_handler))
        .route("/reviews/all-by-period", get(handlers::all_by_period_handler))
        .route("/reviews/summary", get(handlers::summary_handler))
        .route("/reviews/sheet", get(handlers::period_sheet_handler))
        .route(
            "/reviews/{id}",
            get(handlers::get_review_handler).put(handlers::update_review_handler),
        )
        .route("/reviews/{id}/submit", post(handlers::submit_handler))
        .route("/reviews/{id}/approve", post(handlers::approve_handler))
        .route("/reviews/{id}/reject", post(handlers::reject_handler))
        .route("/reviews/{id}/score", post(handlers::score_handler))
        .route("/reviews/{id}/sheet", get(handlers::review_sheet_handler))
        .route("/team/reviews", get(handlers::team_reviews_handler))
        .nest("/admin", admin)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::bearer_auth_middleware,
        ));

    let mut api = protected;
    if state.dev_login {
        tracing::warn!("Development login enabled: tokens are issued by email alone");
        api = api.route("/auth/dev-login", post(handlers::dev_login_handler));
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .nest("/api/v1", api);

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl-C.
pub async fn run_server(config: &AppConfig, service: ReviewService) -> Result<(), ReviewError> {
    let signer = TokenSigner::new(config.require_secret()?, config.security.token_ttl_hours);
    let state = AppState::new(service, signer)
        .with_dev_login(config.security.dev_login)
        .with_http(config.http.clone());
    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ReviewError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("perfplan HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ReviewError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
