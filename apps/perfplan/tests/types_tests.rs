//! Unit tests for API types serialization/deserialization.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use perfplan::api::types::{
    ApiError, ApproveRequest, CreateReviewRequest, ErrorResponse, HealthResponse, ItemInput,
    ScoreRequest, error_code, into_items, status_for,
};
use perfplan_core::{
    Category, ItemField, ItemId, Points, ReviewAction, ReviewError, ReviewStatus,
    primitives::MAX_SCORE_ROWS,
};
use serde_json::json;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

// =============================================================================
// ERROR RESPONSE TESTS
// =============================================================================

#[test]
fn test_weight_mismatch_body_carries_actual() {
    let body = ErrorResponse::from_error(&ReviewError::WeightMismatch {
        actual: Points::from_hundredths(7050),
    });
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["code"], json!("weight_mismatch"));
    assert_eq!(value["actual_weight"], json!(70.5));
    assert!(value.get("item").is_none());
}

#[test]
fn test_missing_field_body_names_item_and_field() {
    let body = ErrorResponse::from_error(&ReviewError::MissingField {
        item: 1,
        field: ItemField::Target,
    });
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["item"], json!(1));
    assert_eq!(value["field"], json!("target"));
    assert!(value.get("actual_weight").is_none());
}

#[test]
fn test_status_mapping() {
    let cases = [
        (
            ReviewError::WeightMismatch {
                actual: Points::ZERO,
            },
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            ReviewError::RejectionCommentRequired,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            ReviewError::ScoreOutOfRange {
                item: ItemId(1),
                score: Points::whole(130),
            },
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            ReviewError::InvalidTransition {
                from: ReviewStatus::Completed,
                action: ReviewAction::Score,
            },
            StatusCode::CONFLICT,
        ),
        (
            ReviewError::NotEditable(ReviewStatus::PendingApproval),
            StatusCode::CONFLICT,
        ),
        (ReviewError::Conflict("dup".into()), StatusCode::CONFLICT),
        (ReviewError::Forbidden("no".into()), StatusCode::FORBIDDEN),
        (ReviewError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (ReviewError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
        (
            ReviewError::IoError("disk".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, status) in cases {
        assert_eq!(status_for(&err), status, "{:?}", err);
    }
}

#[test]
fn test_api_error_keeps_mapped_status() {
    assert_eq!(
        ApiError::from(ReviewError::NotFound("review 9".into())).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        ApiError::unauthorized("Unauthorized").status(),
        StatusCode::UNAUTHORIZED
    );
}

#[test]
fn test_error_codes_are_snake_case() {
    assert_eq!(
        error_code(&ReviewError::RejectionCommentRequired),
        "rejection_comment_required"
    );
    assert_eq!(
        error_code(&ReviewError::SerializationError("x".into())),
        "storage_error"
    );
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_create_request_items_default_to_work() {
    let request: CreateReviewRequest = serde_json::from_value(json!({
        "period": "2025-08",
        "items": [
            { "title": "  Ship it ", "description": "d", "target": "t", "weight": 80 },
            { "title": "No weight yet" }
        ]
    }))
    .unwrap();
    let items = into_items(request.items);
    assert_eq!(items[0].category, Category::PerformanceWork);
    assert_eq!(items[0].title, "Ship it");
    assert_eq!(items[0].weight, Some(Points::whole(80)));
    assert_eq!(items[1].weight, None);
    assert_eq!(items[1].score, None);
}

#[test]
fn test_item_input_accepts_decimal_weight() {
    let input: ItemInput = serde_json::from_value(json!({ "weight": 12.5 })).unwrap();
    assert_eq!(input.weight, Some(Points::from_hundredths(1250)));
}

#[test]
fn test_approve_request_comment_optional() {
    let empty: ApproveRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(empty.comment, None);
    let with: ApproveRequest = serde_json::from_str(r#"{"comment":"ok"}"#).unwrap();
    assert_eq!(with.comment.as_deref(), Some("ok"));
}

#[test]
fn test_score_request_parses_and_bounds_rows() {
    let request: ScoreRequest = serde_json::from_value(json!({
        "items": [
            { "id": 1, "completion_details": "done", "score": 95.5 },
            { "id": 2, "score": null }
        ],
        "final_comment": "fine"
    }))
    .unwrap();
    assert_eq!(request.items[0].id, ItemId(1));
    assert_eq!(request.items[0].score, Some(Points::from_hundredths(9550)));
    assert_eq!(request.items[1].score, None);
    assert!(request.validate().is_ok());

    let at_limit: Vec<_> = (0..MAX_SCORE_ROWS).map(|i| json!({ "id": i })).collect();
    let full: ScoreRequest = serde_json::from_value(json!({ "items": at_limit })).unwrap();
    assert!(full.validate().is_ok());

    let rows: Vec<_> = (0..=MAX_SCORE_ROWS).map(|i| json!({ "id": i })).collect();
    let too_many: ScoreRequest = serde_json::from_value(json!({ "items": rows })).unwrap();
    assert!(matches!(
        too_many.validate(),
        Err(ReviewError::InvalidInput(_))
    ));
}
