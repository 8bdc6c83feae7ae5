//! Administrative lifecycle handlers. Their bodies arrive through `AdminJson` /
//! `AdminQuery`, which authorize against the shared gate before the body is
//! validated, so no handler runs (or touches the store) without the secret.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::lifecycle::{self, NewRiddle, Transition};
use crate::protocol::*;
use crate::routes::{AdminJson, AdminQuery};
use crate::state::AppState;

#[instrument(level = "info", skip(state, body), fields(position = body.position, week = ?body.week))]
pub async fn http_post_submit(
    State(state): State<Arc<AppState>>,
    AdminJson(body): AdminJson<SubmitIn>,
) -> Result<Json<AdminOut>, ApiError> {
    let riddle = lifecycle::submit(
        NewRiddle {
            riddle_text: body.riddle_text,
            answer: body.answer,
            digit: body.digit,
            position: body.position,
            week: body.week,
        },
        Utc::now(),
    )?;
    let id = riddle.id.clone();
    state.store.insert(riddle).await?;
    info!(target: "riddle", %id, "Riddle submitted");
    Ok(Json(AdminOut {
        riddle_id: Some(id),
        ..AdminOut::ok("Riddle submitted; activate it to make it visible")
    }))
}

#[instrument(level = "info", skip(state, body), fields(riddle_id = %body.riddle_id))]
pub async fn http_post_activate(
    State(state): State<Arc<AppState>>,
    AdminJson(body): AdminJson<RiddleIdIn>,
) -> Result<Json<AdminOut>, ApiError> {
    let now = Utc::now();
    let outcome = state.store.transition(&body.riddle_id, |r| lifecycle::activate(r, now)).await?;
    lifecycle_reply(&body.riddle_id, outcome, "Riddle activated", "Riddle was already active")
}

#[instrument(level = "info", skip(state, body), fields(riddle_id = %body.riddle_id))]
pub async fn http_post_deactivate(
    State(state): State<Arc<AppState>>,
    AdminJson(body): AdminJson<RiddleIdIn>,
) -> Result<Json<AdminOut>, ApiError> {
    let outcome = state.store.transition(&body.riddle_id, lifecycle::deactivate).await?;
    lifecycle_reply(&body.riddle_id, outcome, "Riddle deactivated", "Riddle was already inactive")
}

#[instrument(level = "info", skip(state, body), fields(riddle_id = %body.riddle_id))]
pub async fn http_post_expire(
    State(state): State<Arc<AppState>>,
    AdminJson(body): AdminJson<RiddleIdIn>,
) -> Result<Json<AdminOut>, ApiError> {
    let now = Utc::now();
    let outcome = state.store.transition(&body.riddle_id, |r| lifecycle::expire(r, now)).await?;
    lifecycle_reply(&body.riddle_id, outcome, "Riddle expired", "Riddle was already expired")
}

#[instrument(level = "info", skip(state, body), fields(week = body.week))]
pub async fn http_post_expire_week(
    State(state): State<Arc<AppState>>,
    AdminJson(body): AdminJson<WeekIn>,
) -> Result<Json<AdminOut>, ApiError> {
    let week = u32::try_from(body.week)
        .ok()
        .filter(|w| *w >= 1)
        .ok_or_else(|| ApiError::Validation(format!("week: must be a positive integer (got {})", body.week)))?;
    let count = state.store.expire_week(week, Utc::now()).await?;
    info!(target: "riddle", week, count, "Week expired");
    let message = if count == 0 {
        format!("No unexpired riddles found for week {week}")
    } else {
        format!("Expired {count} riddle(s) for week {week}")
    };
    Ok(Json(AdminOut { expired_count: Some(count), ..AdminOut::ok(message) }))
}

#[instrument(level = "info", skip(state, _q))]
pub async fn http_get_all(
    State(state): State<Arc<AppState>>,
    AdminQuery(_q): AdminQuery<AuthQuery>,
) -> Result<Json<AllOut>, ApiError> {
    let riddles: Vec<AdminRiddleOut> = state
        .store
        .all()
        .await
        .into_iter()
        .map(|riddle| AdminRiddleOut { state: riddle.state(), riddle })
        .collect();
    Ok(Json(AllOut {
        status: Status::Success,
        message: format!("{} riddle(s)", riddles.len()),
        riddles,
    }))
}

fn lifecycle_reply(
    id: &str,
    outcome: Option<Transition>,
    changed: &str,
    unchanged: &str,
) -> Result<Json<AdminOut>, ApiError> {
    let message = match outcome.ok_or(ApiError::NotFound)? {
        Transition::Changed => changed,
        Transition::Unchanged => unchanged,
    };
    info!(target: "riddle", %id, %message, "Lifecycle request handled");
    Ok(Json(AdminOut { riddle_id: Some(id.to_string()), ..AdminOut::ok(message) }))
}
