//! Public protocol structs for the HTTP contract (serde ready).
//! Shared by the server handlers and the participant client, so responses
//! derive both `Serialize` and `Deserialize`.
//!
//! Requests are closed shapes: unknown fields are rejected at the boundary.
//! Admin credentials are optional at the serde level so a missing code is an
//! auth failure rather than a malformed body.

use serde::{Deserialize, Serialize};

use crate::domain::{Riddle, RiddleState};

/// Envelope status shared by every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Riddle as participants see it. Never carries answer or digit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRiddle {
    pub id: String,
    pub riddle_text: String,
    pub position: u8,
    #[serde(default)]
    pub week: Option<u32>,
    pub is_expired: bool,
}

impl From<&Riddle> for PublicRiddle {
    fn from(r: &Riddle) -> Self {
        Self {
            id: r.id.clone(),
            riddle_text: r.riddle_text.clone(),
            position: r.position.get(),
            week: r.week,
            is_expired: r.is_expired,
        }
    }
}

//
// Public
//

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveOut {
    pub status: Status,
    #[serde(default)]
    pub active_riddles: Vec<PublicRiddle>,
    #[serde(default)]
    pub expired_riddles: Vec<PublicRiddle>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckIn {
    pub riddle_id: String,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckOut {
    pub status: Status,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digit: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expired: Option<bool>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub status: Status,
    pub message: String,
}

impl ErrorOut {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: Status::Error, message: message.into() }
    }
}

#[derive(Serialize, Deserialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// Administrative
//

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitIn {
    #[serde(default)]
    pub auth_code: Option<String>,
    pub riddle_text: String,
    pub answer: String,
    pub digit: i64,
    pub position: i64,
    #[serde(default)]
    pub week: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiddleIdIn {
    #[serde(default)]
    pub auth_code: Option<String>,
    pub riddle_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeekIn {
    #[serde(default)]
    pub auth_code: Option<String>,
    pub week: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthQuery {
    #[serde(default)]
    pub auth_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminOut {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riddle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_count: Option<usize>,
}

impl AdminOut {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: Status::Success, message: message.into(), riddle_id: None, expired_count: None }
    }
}

/// Full row for administrators, with the derived lifecycle state.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminRiddleOut {
    #[serde(flatten)]
    pub riddle: Riddle,
    pub state: RiddleState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllOut {
    pub status: Status,
    pub message: String,
    pub riddles: Vec<AdminRiddleOut>,
}
