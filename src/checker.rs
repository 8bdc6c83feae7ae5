//! Answer checking and the public listing. Shared by the HTTP handlers.

use tracing::{debug, instrument};

use crate::domain::{normalize_answer, Digit, Position};
use crate::error::ApiError;
use crate::protocol::PublicRiddle;
use crate::store::RiddleStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
  Correct { digit: Digit, position: Position, is_expired: bool },
  Incorrect,
}

/// Public listing split by staleness. Only active riddles appear.
#[derive(Debug, Default)]
pub struct PublicListing {
  pub active: Vec<PublicRiddle>,
  pub expired: Vec<PublicRiddle>,
}

pub fn answers_match(stored: &str, candidate: &str) -> bool {
  normalize_answer(stored) == normalize_answer(candidate)
}

/// Check a candidate against an active riddle. Missing and inactive ids look
/// the same to the caller.
#[instrument(level = "info", skip(store, candidate), fields(%riddle_id, answer_len = candidate.len()))]
pub async fn check_answer(store: &RiddleStore, riddle_id: &str, candidate: &str) -> Result<CheckOutcome, ApiError> {
  let riddle = store.find_active(riddle_id).await.ok_or(ApiError::NotFoundOrInactive)?;
  if answers_match(&riddle.answer, candidate) {
    debug!(target: "riddle", id = %riddle.id, position = %riddle.position, "Answer matched");
    Ok(CheckOutcome::Correct { digit: riddle.digit, position: riddle.position, is_expired: riddle.is_expired })
  } else {
    Ok(CheckOutcome::Incorrect)
  }
}

pub async fn list_public(store: &RiddleStore) -> PublicListing {
  let (expired, active): (Vec<_>, Vec<_>) = store
    .active()
    .await
    .iter()
    .map(PublicRiddle::from)
    .partition(|r| r.is_expired);
  PublicListing { active, expired }
}
