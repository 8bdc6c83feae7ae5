//! Public HTTP endpoint handlers. Thin wrappers that forward to the checker.
//! Each handler is instrumented; answers are logged by length only.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::checker::{check_answer, list_public, CheckOutcome};
use crate::error::ApiError;
use crate::protocol::*;
use crate::routes::ApiJson;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_active(State(state): State<Arc<AppState>>) -> Json<ActiveOut> {
    let listing = list_public(&state.store).await;
    let message = if listing.active.is_empty() && listing.expired.is_empty() {
        "No riddles active yet".to_string()
    } else {
        format!("{} active, {} expired", listing.active.len(), listing.expired.len())
    };
    info!(target: "riddle", active = listing.active.len(), expired = listing.expired.len(), "HTTP active riddles served");
    Json(ActiveOut {
        status: Status::Success,
        active_riddles: listing.active,
        expired_riddles: listing.expired,
        message,
    })
}

#[instrument(level = "info", skip(state, body), fields(riddle_id = %body.riddle_id, answer_len = body.answer.len()))]
pub async fn http_post_check(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CheckIn>,
) -> Result<Json<CheckOut>, ApiError> {
    let outcome = check_answer(&state.store, &body.riddle_id, &body.answer).await?;
    info!(target: "riddle", id = %body.riddle_id, correct = matches!(outcome, CheckOutcome::Correct { .. }), "HTTP check evaluated");
    let out = match outcome {
        CheckOutcome::Correct { digit, position, is_expired } => CheckOut {
            status: Status::Success,
            correct: true,
            digit: Some(digit.get()),
            position: Some(position.get()),
            is_expired: Some(is_expired),
            message: format!("Correct! Digit {digit} goes in position {position}."),
        },
        CheckOutcome::Incorrect => CheckOut {
            status: Status::Success,
            correct: false,
            digit: None,
            position: None,
            is_expired: None,
            message: "Incorrect answer, try again".into(),
        },
    };
    Ok(Json(out))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, seed_active, send, SECRET};

    #[tokio::test]
    async fn empty_listing_is_success() {
        let app = app();
        let (status, body) = send(&app, "GET", "/riddles/active", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["active_riddles"], json!([]));
        assert_eq!(body["expired_riddles"], json!([]));
    }

    #[tokio::test]
    async fn listing_never_carries_answer_or_digit() {
        let app = app();
        let id = seed_active(&app, "echo", 7, 1).await;
        let (_, body) = send(&app, "GET", "/riddles/active", None).await;
        let entry = &body["active_riddles"][0];
        assert_eq!(entry["id"], id.as_str());
        assert_eq!(entry["position"], 1);
        assert_eq!(entry["is_expired"], false);
        assert!(entry.get("answer").is_none());
        assert!(entry.get("digit").is_none());
    }

    #[tokio::test]
    async fn check_reveals_digit_only_when_correct() {
        let app = app();
        let id = seed_active(&app, "echo", 7, 1).await;

        let (status, body) = send(&app, "POST", "/riddles/check", Some(json!({ "riddle_id": id, "answer": "Echo " }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correct"], true);
        assert_eq!(body["digit"], 7);
        assert_eq!(body["position"], 1);
        assert_eq!(body["is_expired"], false);

        let (status, body) = send(&app, "POST", "/riddles/check", Some(json!({ "riddle_id": id, "answer": "shadow" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correct"], false);
        assert!(body.get("digit").is_none());
        assert!(body.get("position").is_none());
        assert!(!body["message"].as_str().unwrap().contains("echo"));
    }

    #[tokio::test]
    async fn unknown_and_inactive_ids_look_the_same() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/riddles/submit",
            Some(json!({ "auth_code": SECRET, "riddle_text": "hidden", "answer": "x", "digit": 1, "position": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let hidden_id = body["riddle_id"].as_str().unwrap().to_string();

        let (s1, b1) = send(&app, "POST", "/riddles/check", Some(json!({ "riddle_id": "nonexistent-id", "answer": "x" }))).await;
        let (s2, b2) = send(&app, "POST", "/riddles/check", Some(json!({ "riddle_id": hidden_id, "answer": "x" }))).await;
        assert_eq!(s1, StatusCode::NOT_FOUND);
        assert_eq!(s1, s2);
        assert_eq!(b1, b2);
        assert_eq!(b1["status"], "error");
    }

    #[tokio::test]
    async fn malformed_check_bodies_get_the_error_envelope() {
        let app = app();
        let (status, body) = send(&app, "POST", "/riddles/check", Some(json!({ "riddle_id": "a" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, body) =
            send(&app, "POST", "/riddles/check", Some(json!({ "riddle_id": "a", "answer": "b", "extra": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, body) = send(&app, "POST", "/riddles/check", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(&app(), "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
