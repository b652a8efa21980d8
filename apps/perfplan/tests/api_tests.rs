//! Integration tests for the perfplan HTTP API.
//!
//! Uses axum-test to drive `create_router` without starting a real server.
//! Every test starts from the seeded demo organisation:
//! - Zhang San (manager@), team lead of Li Si and Zhao Wu
//! - Li Si (lisi@), with a 2025-07 review in Evaluating
//! - Wang Fang (hr@), Administrator (admin@)

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use perfplan::api::{AppState, HealthResponse, TokenSigner, create_router, unix_now};
use perfplan::config::HttpConfig;
use perfplan_core::{ReviewService, seed::seed_demo};
use serde_json::{Value, json};

const SECRET: &str = "api-test-secret";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Fixture {
    server: TestServer,
    manager: String,
    lisi: String,
    zhaowu: String,
    hr: String,
    admin: String,
    /// Li Si's seeded 2025-07 review.
    seeded_review: u64,
}

fn fixture_with(dev_login: bool, rate_limit: u32) -> Fixture {
    let mut service = ReviewService::new();
    seed_demo(&mut service, unix_now()).unwrap();

    let signer = TokenSigner::new(SECRET, 1);
    let token = |email: &str| {
        let user = service.user_by_email(email).unwrap().unwrap();
        signer.issue(user.id, unix_now()).token
    };
    let manager = token("manager@example.com");
    let lisi = token("lisi@example.com");
    let zhaowu = token("zhaowu@example.com");
    let hr = token("hr@example.com");
    let admin = token("admin@example.com");

    let owner = service.user_by_email("lisi@example.com").unwrap().unwrap();
    let seeded_review = service.user_reviews(owner.id).unwrap()[0].id.0;

    let http = HttpConfig {
        cors_origins: None,
        rate_limit,
    };
    let state = AppState::new(service, signer)
        .with_dev_login(dev_login)
        .with_http(http);

    Fixture {
        server: TestServer::new(create_router(state)).unwrap(),
        manager,
        lisi,
        zhaowu,
        hr,
        admin,
        seeded_review,
    }
}

fn fixture() -> Fixture {
    fixture_with(false, 0)
}

fn bearer(token: &str) -> HeaderValue {
    format!("Bearer {}", token).parse::<HeaderValue>().unwrap()
}

fn plan(weights: &[u32]) -> Value {
    let items: Vec<Value> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            json!({
                "title": format!("Goal {}", i + 1),
                "description": "Deliver the goal",
                "target": "Done by month end",
                "weight": w,
            })
        })
        .collect();
    json!({ "period": "2025-08", "items": items })
}

/// Create and submit a 2025-08 plan for Li Si; returns its id.
async fn submitted_plan(f: &Fixture) -> u64 {
    let created = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&plan(&[50, 30]))
        .await;
    created.assert_status(StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_u64().unwrap();

    f.server
        .post(&format!("/api/v1/reviews/{}/submit", id))
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await
        .assert_status_ok();
    id
}

// =============================================================================
// HEALTH AND AUTH
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_is_public() {
    let f = fixture();
    let response = f.server.get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let f = fixture();
    let response = f.server.get("/api/v1/reviews").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("unauthorized"));
}

#[tokio::test]
async fn test_token_from_other_secret_is_unauthorized() {
    let f = fixture();
    let forged = TokenSigner::new("not-the-secret", 1).issue(perfplan_core::UserId(1), unix_now());
    let response = f
        .server
        .get("/api/v1/me")
        .add_header(header::AUTHORIZATION, bearer(&forged.token))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_reports_capabilities() {
    let f = fixture();
    let response = f
        .server
        .get("/api/v1/me")
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], json!("manager@example.com"));
    assert_eq!(body["capabilities"]["can_view_team"], json!(true));
    assert_eq!(body["capabilities"]["can_view_hr"], json!(false));
}

#[tokio::test]
async fn test_dev_login_absent_unless_enabled() {
    let f = fixture();
    let response = f
        .server
        .post("/api/v1/auth/dev-login")
        .json(&json!({ "email": "lisi@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dev_login_issues_working_token() {
    let f = fixture_with(true, 0);
    let response = f
        .server
        .post("/api/v1/auth/dev-login")
        .json(&json!({ "email": "lisi@example.com" }))
        .await;
    response.assert_status_ok();
    let token = response.json::<Value>()["token"]
        .as_str()
        .unwrap()
        .to_string();

    f.server
        .get("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    let unknown = f
        .server
        .post("/api/v1/auth/dev-login")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// PLAN CREATION AND SUBMISSION
// =============================================================================

#[tokio::test]
async fn test_create_appends_global_items() {
    let f = fixture();
    let response = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&plan(&[50, 30]))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], json!("Draft"));
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[2]["category"], json!("model_usage"));
    assert_eq!(items[3]["category"], json!("values"));
}

#[tokio::test]
async fn test_submit_with_wrong_weight_sum_reports_actual() {
    let f = fixture();
    let created = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&plan(&[50, 20]))
        .await;
    created.assert_status(StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_u64().unwrap();

    let response = f
        .server
        .post(&format!("/api/v1/reviews/{}/submit", id))
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], json!("weight_mismatch"));
    assert_eq!(body["actual_weight"], json!(70.0));
}

#[tokio::test]
async fn test_second_review_for_period_conflicts() {
    let f = fixture();
    let mut body = plan(&[80]);
    body["period"] = json!("2025-07");
    let response = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&body)
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_period_is_unprocessable() {
    let f = fixture();
    let response = f
        .server
        .get("/api/v1/reviews/by-period")
        .add_query_param("period", "2025-13")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], json!("invalid_period"));
}

fn assert_json_error(response: &axum_test::TestResponse, status: StatusCode, code: &str) {
    response.assert_status(status);
    let content_type = response.header(header::CONTENT_TYPE);
    assert!(
        content_type.to_str().unwrap().starts_with("application/json"),
        "{:?}",
        content_type
    );
    let body = response.json::<Value>();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!(code));
}

#[tokio::test]
async fn test_over_precise_weight_gets_json_error() {
    let f = fixture();
    let response = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&json!({
            "period": "2025-08",
            "items": [{ "title": "Goal", "weight": "80.123" }]
        }))
        .await;
    assert_json_error(&response, StatusCode::BAD_REQUEST, "invalid_input");

    let numeric = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&json!({
            "period": "2025-08",
            "items": [{ "title": "Goal", "weight": 80.123 }]
        }))
        .await;
    assert_json_error(&numeric, StatusCode::BAD_REQUEST, "invalid_input");
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let f = fixture();
    let not_json = f
        .server
        .post("/api/v1/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .text("period=2025-08")
        .await;
    assert_json_error(&not_json, StatusCode::BAD_REQUEST, "invalid_input");

    let bad_id = f
        .server
        .get("/api/v1/reviews/not-a-number")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await;
    assert_json_error(&bad_id, StatusCode::BAD_REQUEST, "invalid_input");

    let no_period = f
        .server
        .get("/api/v1/reviews/by-period")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await;
    assert_json_error(&no_period, StatusCode::BAD_REQUEST, "invalid_input");

    let reject = f
        .server
        .post(&format!("/api/v1/reviews/{}/reject", f.seeded_review))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .json(&json!({ "comment": 5 }))
        .await;
    assert_json_error(&reject, StatusCode::BAD_REQUEST, "invalid_input");
}

#[tokio::test]
async fn test_by_period_without_review_is_empty_object() {
    let f = fixture();
    let response = f
        .server
        .get("/api/v1/reviews/by-period")
        .add_query_param("period", "2024-01")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({}));
}

#[tokio::test]
async fn test_pending_review_is_not_editable() {
    let f = fixture();
    let id = submitted_plan(&f).await;
    let response = f
        .server
        .put(&format!("/api/v1/reviews/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .json(&json!({ "items": plan(&[80])["items"] }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], json!("not_editable"));
}

// =============================================================================
// APPROVAL
// =============================================================================

#[tokio::test]
async fn test_owner_cannot_approve_own_plan() {
    let f = fixture();
    let id = submitted_plan(&f).await;
    let response = f
        .server
        .post(&format!("/api/v1/reviews/{}/approve", id))
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manager_approves_without_body() {
    let f = fixture();
    let id = submitted_plan(&f).await;
    let response = f
        .server
        .post(&format!("/api/v1/reviews/{}/approve", id))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], json!("Evaluating"));
    assert_eq!(body["approvals"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_reject_requires_comment_then_allows_resubmit() {
    let f = fixture();
    let id = submitted_plan(&f).await;

    let empty = f
        .server
        .post(&format!("/api/v1/reviews/{}/reject", id))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .json(&json!({ "comment": "   " }))
        .await;
    empty.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        empty.json::<Value>()["code"],
        json!("rejection_comment_required")
    );

    f.server
        .post(&format!("/api/v1/reviews/{}/reject", id))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .json(&json!({ "comment": "Targets need numbers" }))
        .await
        .assert_status_ok();

    f.server
        .post(&format!("/api/v1/reviews/{}/submit", id))
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_approving_twice_is_invalid_transition() {
    let f = fixture();
    let response = f
        .server
        .post(&format!("/api/v1/reviews/{}/approve", f.seeded_review))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], json!("invalid_transition"));
}

// =============================================================================
// SCORING
// =============================================================================

#[tokio::test]
async fn test_manager_scores_seeded_review() {
    let f = fixture();
    let view: Value = f
        .server
        .get(&format!("/api/v1/reviews/{}", f.seeded_review))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .await
        .json();
    assert_eq!(view["available_actions"], json!(["score"]));

    let scores: Vec<Value> = view["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({ "id": item["id"], "completion_details": "Done", "score": 100 }))
        .collect();
    let response = f
        .server
        .post(&format!("/api/v1/reviews/{}/score", f.seeded_review))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .json(&json!({ "items": scores, "final_comment": "Great month" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], json!("Completed"));
    assert_eq!(body["total_score"], json!(100.0));
    assert_eq!(body["grade_point"], json!(1.0));
}

#[tokio::test]
async fn test_score_out_of_range_is_unprocessable() {
    let f = fixture();
    let response = f
        .server
        .post(&format!("/api/v1/reviews/{}/score", f.seeded_review))
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .json(&json!({ "items": [{ "id": 1, "score": 121 }] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], json!("score_out_of_range"));
}

// =============================================================================
// SCORE SHEETS
// =============================================================================

#[tokio::test]
async fn test_scorer_and_hr_export_review_sheet() {
    let f = fixture();
    let path = format!("/api/v1/reviews/{}/sheet", f.seeded_review);

    let response = f
        .server
        .get(&path)
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .await;
    response.assert_status_ok();
    let sheet = response.json::<Value>();
    assert_eq!(sheet["period"], json!("2025-07"));
    assert_eq!(sheet["rows"].as_array().unwrap().len(), 1);
    assert_eq!(sheet["rows"][0]["name"], json!("Li Si"));
    assert_eq!(sheet["checksum"].as_str().unwrap().len(), 64);

    f.server
        .get(&path)
        .add_header(header::AUTHORIZATION, bearer(&f.hr))
        .await
        .assert_status_ok();

    let peer = f
        .server
        .get(&path)
        .add_header(header::AUTHORIZATION, bearer(&f.zhaowu))
        .await;
    assert_json_error(&peer, StatusCode::FORBIDDEN, "forbidden");
}

#[tokio::test]
async fn test_period_sheet_is_hr_only() {
    let f = fixture();
    let response = f
        .server
        .get("/api/v1/reviews/sheet")
        .add_query_param("period", "2025-07")
        .add_header(header::AUTHORIZATION, bearer(&f.hr))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["rows"].as_array().unwrap().len(), 1);

    let manager = f
        .server
        .get("/api/v1/reviews/sheet")
        .add_query_param("period", "2025-07")
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .await;
    assert_json_error(&manager, StatusCode::FORBIDDEN, "forbidden");
}

// =============================================================================
// VISIBILITY
// =============================================================================

#[tokio::test]
async fn test_peer_cannot_read_review() {
    let f = fixture();
    let response = f
        .server
        .get(&format!("/api/v1/reviews/{}", f.seeded_review))
        .add_header(header::AUTHORIZATION, bearer(&f.zhaowu))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_team_reviews_lists_reports() {
    let f = fixture();
    let response = f
        .server
        .get("/api/v1/team/reviews")
        .add_header(header::AUTHORIZATION, bearer(&f.manager))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_hr_views_require_hr_role() {
    let f = fixture();
    f.server
        .get("/api/v1/reviews/all-submitted")
        .add_header(header::AUTHORIZATION, bearer(&f.lisi))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = f
        .server
        .get("/api/v1/reviews/all-by-period")
        .add_query_param("period", "2025-07")
        .add_header(header::AUTHORIZATION, bearer(&f.hr))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);

    let summary: Value = f
        .server
        .get("/api/v1/reviews/summary")
        .add_query_param("period", "2025-07")
        .add_header(header::AUTHORIZATION, bearer(&f.hr))
        .await
        .json();
    assert_eq!(summary["submitted"], json!(1));
    assert_eq!(summary["completed"], json!(0));
}

// =============================================================================
// ADMIN
// =============================================================================

#[tokio::test]
async fn test_admin_routes_refuse_non_admins() {
    let f = fixture();
    f.server
        .get("/api/v1/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&f.hr))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = f
        .server
        .get("/api/v1/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let f = fixture();
    let users: Value = f
        .server
        .get("/api/v1/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .await
        .json();
    let mut zhao = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == json!("zhaowu@example.com"))
        .unwrap()
        .clone();
    let id = zhao["id"].as_u64().unwrap();
    zhao["is_active"] = json!(false);

    f.server
        .put(&format!("/api/v1/admin/users/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .json(&zhao)
        .await
        .assert_status_ok();

    f.server
        .get("/api/v1/me")
        .add_header(header::AUTHORIZATION, bearer(&f.zhaowu))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_manages_departments_and_settings() {
    let f = fixture();
    let created = f
        .server
        .post("/api/v1/admin/departments")
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .json(&json!({ "name": "Finance" }))
        .await;
    created.assert_status(StatusCode::CREATED);

    let departments: Value = f
        .server
        .get("/api/v1/admin/departments")
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .await
        .json();
    assert_eq!(departments.as_array().unwrap().len(), 4);

    f.server
        .put("/api/v1/admin/settings")
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .json(&json!({ "key": "review_cycle", "value": "quarterly" }))
        .await
        .assert_status_ok();
    let settings: Value = f
        .server
        .get("/api/v1/admin/settings")
        .add_header(header::AUTHORIZATION, bearer(&f.admin))
        .await
        .json();
    assert_eq!(
        settings,
        json!([{ "key": "review_cycle", "value": "quarterly" }])
    );
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let f = fixture_with(false, 1);
    f.server.get("/health").await.assert_status_ok();
    let response = f.server.get("/health").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json::<Value>()["code"], json!("rate_limited"));
}
