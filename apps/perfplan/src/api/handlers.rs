//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every handler behind the auth layer receives the caller as
//! `Extension<CurrentUser>`; identity never comes from the request body or
//! query string.

use super::{
    AppState,
    auth::CurrentUser,
    extract::{ApiJson, ApiPath, ApiQuery},
    types::{
        ApiError, ApproveRequest, CreateDepartmentRequest, CreateReviewRequest, HealthResponse,
        LoginRequest, LoginResponse, MeResponse, PeriodQuery, RejectRequest, ScoreRequest,
        SettingRequest, UpdateReviewRequest, into_items,
    },
    unix_now,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use perfplan_core::{
    Department, DepartmentId, PerformanceReview, Period, PeriodSummary, ReviewAction, ReviewError,
    ReviewId, ReviewView, Role, ScoreSheet, SystemSetting, User, UserId, UserUpdate,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn log_transition(review: &PerformanceReview, actor: &User, action: ReviewAction) {
    tracing::info!(
        event = "review_transition",
        review_id = review.id.0,
        actor = actor.id.0,
        action = action.name(),
        status = review.status.name(),
        "Review transitioned"
    );
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// AUTH HANDLERS
// =============================================================================

/// Issue a token by email. Only routed when development login is enabled.
pub async fn dev_login_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = state
        .service
        .read()
        .await
        .user_by_email(request.email.trim())?;
    let Some(user) = user.filter(|u| u.is_active) else {
        tracing::warn!(
            event = "auth_failure",
            reason = "unknown_login",
            "Development login refused"
        );
        return Err(ApiError::unauthorized("Unknown or inactive user"));
    };

    let issued = state.signer.issue(user.id, unix_now());
    tracing::info!(user_id = user.id.0, "Development token issued");
    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    }))
}

/// The caller and their menu hints.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<MeResponse> {
    let service = state.service.read().await;
    let role = service.role_kind(&user)?;
    let capabilities = service.capabilities(&user)?;
    Ok(Json(MeResponse {
        user,
        role,
        capabilities,
    }))
}

// =============================================================================
// REVIEW HANDLERS
// =============================================================================

/// Create a Draft review owned by the caller.
pub async fn create_review_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(request): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<PerformanceReview>), ApiError> {
    let period: Period = request.period.parse()?;
    let review = state.service.write().await.create_review(
        &user,
        period,
        into_items(request.items),
        unix_now(),
    )?;
    tracing::info!(
        review_id = review.id.0,
        user_id = user.id.0,
        period = %review.period,
        "Review created"
    );
    Ok((StatusCode::CREATED, Json(review)))
}

/// The caller's reviews, newest period first.
pub async fn list_reviews_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Vec<PerformanceReview>> {
    Ok(Json(state.service.read().await.user_reviews(user.id)?))
}

/// The caller's review for a period, or `{}` when there is none.
pub async fn review_by_period_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<serde_json::Value> {
    let period: Period = query.period.parse()?;
    let service = state.service.read().await;
    let Some(review) = service.review_for_period(user.id, period)? else {
        return Ok(Json(serde_json::json!({})));
    };
    let view = service.view_review(&user, review.id)?;
    let value = serde_json::to_value(view)
        .map_err(|e| ReviewError::SerializationError(e.to_string()))?;
    Ok(Json(value))
}

/// HR: every submitted review.
pub async fn all_submitted_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Vec<PerformanceReview>> {
    Ok(Json(state.service.read().await.submitted_reviews(&user)?))
}

/// HR: submitted reviews of one period.
pub async fn all_by_period_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Vec<PerformanceReview>> {
    let period: Period = query.period.parse()?;
    Ok(Json(
        state.service.read().await.period_reviews(&user, period)?,
    ))
}

/// HR: aggregate report of one period.
pub async fn summary_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<PeriodSummary> {
    let period: Period = query.period.parse()?;
    Ok(Json(
        state.service.read().await.period_summary(&user, period)?,
    ))
}

/// HR: score sheet of one period.
pub async fn period_sheet_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<ScoreSheet> {
    let period: Period = query.period.parse()?;
    let sheet = state.service.read().await.period_sheet(&user, period)?;
    tracing::info!(
        user_id = user.id.0,
        period = %period,
        rows = sheet.rows.len(),
        "Score sheet exported"
    );
    Ok(Json(sheet))
}

/// Score sheet of one review, for its scorer or HR.
pub async fn review_sheet_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<ScoreSheet> {
    let sheet = state.service.read().await.review_sheet(&user, ReviewId(id))?;
    tracing::info!(user_id = user.id.0, review_id = id, "Review score sheet exported");
    Ok(Json(sheet))
}

/// Fetch one review with the caller's available actions.
pub async fn get_review_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<ReviewView> {
    Ok(Json(
        state.service.read().await.view_review(&user, ReviewId(id))?,
    ))
}

/// Replace the items of a Draft or Rejected review.
pub async fn update_review_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<UpdateReviewRequest>,
) -> ApiResult<PerformanceReview> {
    let review = state.service.write().await.update_review(
        &user,
        ReviewId(id),
        into_items(request.items),
        unix_now(),
    )?;
    tracing::info!(review_id = review.id.0, user_id = user.id.0, "Review items updated");
    Ok(Json(review))
}

pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<PerformanceReview> {
    let review = state
        .service
        .write()
        .await
        .submit(&user, ReviewId(id), unix_now())?;
    log_transition(&review, &user, ReviewAction::Submit);
    Ok(Json(review))
}

/// Approve. The body is optional: `{}` or `{"comment": "..."}`.
pub async fn approve_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
    body: Bytes,
) -> ApiResult<PerformanceReview> {
    let request: ApproveRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ApproveRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ReviewError::InvalidInput(format!("Invalid JSON body: {}", e)))?
    };
    let review = state.service.write().await.approve(
        &user,
        ReviewId(id),
        request.comment.as_deref(),
        unix_now(),
    )?;
    log_transition(&review, &user, ReviewAction::Approve);
    Ok(Json(review))
}

pub async fn reject_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<RejectRequest>,
) -> ApiResult<PerformanceReview> {
    let review = state.service.write().await.reject(
        &user,
        ReviewId(id),
        &request.comment,
        unix_now(),
    )?;
    log_transition(&review, &user, ReviewAction::Reject);
    Ok(Json(review))
}

pub async fn score_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<ScoreRequest>,
) -> ApiResult<PerformanceReview> {
    request.validate()?;
    let review = state.service.write().await.score(
        &user,
        ReviewId(id),
        &request.items,
        request.final_comment.as_deref(),
        unix_now(),
    )?;
    log_transition(&review, &user, ReviewAction::Score);
    Ok(Json(review))
}

/// Submitted reviews of the caller's direct reports.
pub async fn team_reviews_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Vec<PerformanceReview>> {
    Ok(Json(state.service.read().await.team_reviews(&user)?))
}

// =============================================================================
// ADMIN HANDLERS
// =============================================================================

pub async fn list_users_handler(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(Json(state.service.read().await.users()?))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<User> {
    let user = state
        .service
        .write()
        .await
        .update_user(UserId(id), update)?;
    tracing::info!(admin = admin.id.0, user_id = user.id.0, "User updated");
    Ok(Json(user))
}

pub async fn list_departments_handler(
    State(state): State<AppState>,
) -> ApiResult<Vec<Department>> {
    Ok(Json(state.service.read().await.departments()?))
}

pub async fn create_department_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    let department = state
        .service
        .write()
        .await
        .create_department(&request.name, request.parent_id.map(DepartmentId))?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn list_roles_handler(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    Ok(Json(state.service.read().await.roles()?))
}

pub async fn list_settings_handler(
    State(state): State<AppState>,
) -> ApiResult<Vec<SystemSetting>> {
    Ok(Json(state.service.read().await.settings()?))
}

pub async fn put_setting_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SettingRequest>,
) -> ApiResult<SystemSetting> {
    Ok(Json(
        state
            .service
            .write()
            .await
            .put_setting(&request.key, &request.value)?,
    ))
}
