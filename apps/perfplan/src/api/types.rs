//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API and the
//! mapping from `ReviewError` to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use perfplan_core::{
    Capabilities, Category, ItemField, ItemScore, Points, ReviewError, ReviewItem, RoleKind, User,
    primitives::{MAX_SCORE_ROWS, MAX_TEXT_LENGTH},
};
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
// ERROR RESPONSE
// =============================================================================

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Stable machine-readable code, e.g. `weight_mismatch`.
    pub code: String,
    /// Sum of the work weights, on `weight_mismatch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_weight: Option<Points>,
    /// Zero-based work item position, on `missing_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<ItemField>,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.to_string(),
            actual_weight: None,
            item: None,
            field: None,
        }
    }

    pub fn from_error(err: &ReviewError) -> Self {
        let mut body = Self::new(error_code(err), err.to_string());
        match err {
            ReviewError::WeightMismatch { actual } => body.actual_weight = Some(*actual),
            ReviewError::MissingField { item, field } => {
                body.item = Some(*item);
                body.field = Some(*field);
            }
            _ => {}
        }
        body
    }
}

/// Stable code of an error.
pub fn error_code(err: &ReviewError) -> &'static str {
    match err {
        ReviewError::InvalidTransition { .. } => "invalid_transition",
        ReviewError::WeightMismatch { .. } => "weight_mismatch",
        ReviewError::MissingField { .. } => "missing_field",
        ReviewError::RejectionCommentRequired => "rejection_comment_required",
        ReviewError::ItemCount { .. } => "item_count",
        ReviewError::WeightOutOfRange { .. } => "weight_out_of_range",
        ReviewError::ScoreOutOfRange { .. } => "score_out_of_range",
        ReviewError::UnknownItem(_) => "unknown_item",
        ReviewError::InvalidPeriod(_) => "invalid_period",
        ReviewError::NotEditable(_) => "not_editable",
        ReviewError::Forbidden(_) => "forbidden",
        ReviewError::NotFound(_) => "not_found",
        ReviewError::Conflict(_) => "conflict",
        ReviewError::InvalidInput(_) => "invalid_input",
        ReviewError::IoError(_) | ReviewError::SerializationError(_) => "storage_error",
    }
}

/// HTTP status of an error.
pub fn status_for(err: &ReviewError) -> StatusCode {
    match err {
        ReviewError::WeightMismatch { .. }
        | ReviewError::MissingField { .. }
        | ReviewError::RejectionCommentRequired
        | ReviewError::ItemCount { .. }
        | ReviewError::WeightOutOfRange { .. }
        | ReviewError::ScoreOutOfRange { .. }
        | ReviewError::UnknownItem(_)
        | ReviewError::InvalidPeriod(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReviewError::InvalidTransition { .. }
        | ReviewError::NotEditable(_)
        | ReviewError::Conflict(_) => StatusCode::CONFLICT,
        ReviewError::Forbidden(_) => StatusCode::FORBIDDEN,
        ReviewError::NotFound(_) => StatusCode::NOT_FOUND,
        ReviewError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ReviewError::IoError(_) | ReviewError::SerializationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// An error ready to be sent as a response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorResponse::new("unauthorized", message),
        }
    }

    pub fn too_many_requests() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: ErrorResponse::new("rate_limited", "Too Many Requests"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            // Storage details stay in the log.
            tracing::error!("Storage failure: {}", err);
            return Self {
                status,
                body: ErrorResponse::new(error_code(&err), "Internal storage error"),
            };
        }
        Self {
            status,
            body: ErrorResponse::from_error(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// =============================================================================
// AUTH
// =============================================================================

/// Development login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: u64,
    pub user: User,
}

/// The caller, with role-derived display hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
    pub role: RoleKind,
    pub capabilities: Capabilities,
}

// =============================================================================
// REVIEWS
// =============================================================================

/// One plan row as sent by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub weight: Option<Points>,
}

impl ItemInput {
    pub fn into_item(self) -> ReviewItem {
        ReviewItem {
            category: self.category,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            target: self.target.trim().to_string(),
            weight: self.weight,
            ..ReviewItem::default()
        }
    }
}

/// Convert client rows into plan items.
pub fn into_items(rows: Vec<ItemInput>) -> Vec<ReviewItem> {
    rows.into_iter().map(ItemInput::into_item).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    /// `YYYY-MM`
    pub period: String,
    #[serde(default)]
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub items: Vec<ItemInput>,
}

/// Optional body of an approve call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub items: Vec<ItemScore>,
    #[serde(default)]
    pub final_comment: Option<String>,
}

impl ScoreRequest {
    /// Bound the number of score rows before they reach the service.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.items.len() > MAX_SCORE_ROWS {
            return Err(ReviewError::InvalidInput(format!(
                "{} score rows exceed the maximum of {}",
                self.items.len(),
                MAX_SCORE_ROWS
            )));
        }
        if self
            .final_comment
            .as_deref()
            .is_some_and(|c| c.chars().count() > MAX_TEXT_LENGTH)
        {
            return Err(ReviewError::InvalidInput(format!(
                "final comment exceeds {} characters",
                MAX_TEXT_LENGTH
            )));
        }
        Ok(())
    }
}

/// `?period=YYYY-MM`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodQuery {
    pub period: String,
}

// =============================================================================
// ADMIN
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingRequest {
    pub key: String,
    #[serde(default)]
    pub value: String,
}
