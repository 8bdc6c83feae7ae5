//! Riddle lifecycle transitions.
//!
//! created --activate--> active --expire--> active+expired
//!    ^                    |
//!    +----deactivate------+
//!
//! Expiry is one-way and independent of visibility: deactivating an expired
//! riddle hides it but keeps `is_expired`, and expiring a hidden riddle does
//! not show it. All functions here are pure; the store applies them under its
//! write lock.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{normalize_answer, Digit, Position, Riddle};

/// Field-level rejection raised before any state mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
  pub field: &'static str,
  pub reason: String,
}

impl ValidationError {
  fn new(field: &'static str, reason: impl Into<String>) -> Self {
    Self { field, reason: reason.into() }
  }
}

/// Did a transition change the row, or was it already in the target state?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
  Changed,
  Unchanged,
}

/// Unvalidated riddle fields as received from an admin or the TOML bank.
#[derive(Clone, Debug)]
pub struct NewRiddle {
  pub riddle_text: String,
  pub answer: String,
  pub digit: i64,
  pub position: i64,
  pub week: Option<i64>,
}

/// Validate and build a riddle in the `created` state.
pub fn submit(new: NewRiddle, now: DateTime<Utc>) -> Result<Riddle, ValidationError> {
  let riddle_text = new.riddle_text.trim().to_string();
  if riddle_text.is_empty() {
    return Err(ValidationError::new("riddle_text", "must not be empty"));
  }
  let answer = normalize_answer(&new.answer);
  if answer.is_empty() {
    return Err(ValidationError::new("answer", "must not be empty"));
  }
  let digit = Digit::new(new.digit)
    .ok_or_else(|| ValidationError::new("digit", format!("must be between 0 and 9 (got {})", new.digit)))?;
  let position = Position::new(new.position)
    .ok_or_else(|| ValidationError::new("position", format!("must be 1, 2 or 3 (got {})", new.position)))?;
  let week = match new.week {
    None => None,
    Some(w) if w >= 1 && w <= u32::MAX as i64 => Some(w as u32),
    Some(w) => return Err(ValidationError::new("week", format!("must be a positive integer (got {w})"))),
  };

  Ok(Riddle {
    id: Uuid::new_v4().to_string(),
    riddle_text,
    answer,
    digit,
    position,
    week,
    is_active: false,
    is_expired: false,
    created_at: now,
    activated_at: None,
    expired_at: None,
  })
}

/// created -> active. Already-active riddles are left alone; a hidden riddle
/// brought back is stamped again so it counts as the latest activation.
pub fn activate(r: &mut Riddle, now: DateTime<Utc>) -> Transition {
  if r.is_active {
    return Transition::Unchanged;
  }
  r.is_active = true;
  // keep created <= activated <= expired when expiry came first
  let stamp = match r.expired_at {
    Some(expired) if expired < now => expired,
    _ => now,
  };
  r.activated_at = Some(stamp.max(r.created_at));
  Transition::Changed
}

/// active -> created-equivalent invisibility. `is_expired` is untouched.
pub fn deactivate(r: &mut Riddle) -> Transition {
  if !r.is_active {
    return Transition::Unchanged;
  }
  r.is_active = false;
  Transition::Changed
}

/// Mark stale. Irreversible; `is_active` is untouched.
pub fn expire(r: &mut Riddle, now: DateTime<Utc>) -> Transition {
  if r.is_expired {
    return Transition::Unchanged;
  }
  r.is_expired = true;
  let floor = r.activated_at.unwrap_or(r.created_at);
  r.expired_at = Some(now.max(floor));
  Transition::Changed
}
