//! Domain models: riddles, combination slots and digits, and the derived lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of slots in the physical lock combination.
pub const COMBINATION_LEN: usize = 3;

/// Slot (1, 2 or 3) of the combination a riddle's digit fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Position(u8);

impl Position {
  pub const ALL: [Position; COMBINATION_LEN] = [Position(1), Position(2), Position(3)];

  pub fn new(value: i64) -> Option<Self> {
    match value {
      1..=3 => Some(Position(value as u8)),
      _ => None,
    }
  }

  pub fn get(self) -> u8 { self.0 }

  /// Zero-based index into a combination array.
  pub fn index(self) -> usize { (self.0 - 1) as usize }
}

impl TryFrom<u8> for Position {
  type Error = String;
  fn try_from(v: u8) -> Result<Self, Self::Error> {
    Position::new(v as i64).ok_or_else(|| format!("position must be 1, 2 or 3 (got {v})"))
  }
}

impl From<Position> for u8 {
  fn from(p: Position) -> u8 { p.0 }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Single combination digit, 0..=9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
  pub fn new(value: i64) -> Option<Self> {
    match value {
      0..=9 => Some(Digit(value as u8)),
      _ => None,
    }
  }

  pub fn get(self) -> u8 { self.0 }
}

impl TryFrom<u8> for Digit {
  type Error = String;
  fn try_from(v: u8) -> Result<Self, Self::Error> {
    Digit::new(v as i64).ok_or_else(|| format!("digit must be between 0 and 9 (got {v})"))
  }
}

impl From<Digit> for u8 {
  fn from(d: Digit) -> u8 { d.0 }
}

impl fmt::Display for Digit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Where is a riddle in its lifecycle? Derived from the two flags, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiddleState {
  /// Inserted (or deactivated) and not expired; invisible to participants.
  Created,
  /// Visible and checkable.
  Active,
  /// Visible and checkable, but stale.
  ActiveExpired,
  /// Deactivated after expiry. Invisible; the expired flag sticks.
  HiddenExpired,
}

/// Server-owned riddle row. `answer` is stored normalized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Riddle {
  pub id: String,
  pub riddle_text: String,
  pub answer: String,
  pub digit: Digit,
  pub position: Position,
  #[serde(default)] pub week: Option<u32>,
  pub is_active: bool,
  pub is_expired: bool,
  pub created_at: DateTime<Utc>,
  #[serde(default)] pub activated_at: Option<DateTime<Utc>>,
  #[serde(default)] pub expired_at: Option<DateTime<Utc>>,
}

impl Riddle {
  pub fn state(&self) -> RiddleState {
    match (self.is_active, self.is_expired) {
      (false, false) => RiddleState::Created,
      (true, false) => RiddleState::Active,
      (true, true) => RiddleState::ActiveExpired,
      (false, true) => RiddleState::HiddenExpired,
    }
  }
}

/// The only match rule: trimmed, lowercased, exact equality.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_lowercase()
}
