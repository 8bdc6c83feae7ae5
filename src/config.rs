//! Runtime settings from the environment, plus the optional TOML riddle bank.
//!
//! Environment:
//!   PORT                : u16 (default 3000)
//!   RIDDLE_ADMIN_SECRET : shared admin credential; admin routes are disabled without it
//!   RIDDLE_DATA_PATH    : JSON snapshot of the riddle store (in-memory only if unset)
//!   RIDDLE_CONFIG_PATH  : TOML riddle bank loaded into an empty store at startup
//!
//! Bank schema:
//!
//! ```toml
//! [[riddles]]
//! riddle_text = "I speak without a mouth and hear without ears. What am I?"
//! answer = "echo"
//! digit = 7
//! position = 1
//! week = 1
//! active = true
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::lifecycle::NewRiddle;

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub admin_secret: Option<String>,
  pub data_path: Option<PathBuf>,
  pub bank_path: Option<PathBuf>,
}

impl Settings {
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(3000);
    let admin_secret = std::env::var("RIDDLE_ADMIN_SECRET").ok().filter(|s| !s.trim().is_empty());
    if admin_secret.is_none() {
      warn!(target: "riddle_lock", "RIDDLE_ADMIN_SECRET not set; admin routes will reject every request");
    }
    Self {
      port,
      admin_secret,
      data_path: std::env::var_os("RIDDLE_DATA_PATH").map(PathBuf::from),
      bank_path: std::env::var_os("RIDDLE_CONFIG_PATH").map(PathBuf::from),
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RiddleBank {
  #[serde(default)]
  pub riddles: Vec<RiddleCfg>,
}

/// Riddle entry accepted in the TOML bank. Validated like an admin submission.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiddleCfg {
  pub riddle_text: String,
  pub answer: String,
  pub digit: i64,
  pub position: i64,
  #[serde(default)] pub week: Option<i64>,
  #[serde(default)] pub active: bool,
}

impl RiddleCfg {
  pub fn to_new_riddle(&self) -> NewRiddle {
    NewRiddle {
      riddle_text: self.riddle_text.clone(),
      answer: self.answer.clone(),
      digit: self.digit,
      position: self.position,
      week: self.week,
    }
  }
}

pub fn parse_riddle_bank(s: &str) -> Result<RiddleBank, toml::de::Error> {
  toml::from_str::<RiddleBank>(s)
}

/// Load the bank from disk. On any parsing/IO error, returns None.
pub fn load_riddle_bank(path: &std::path::Path) -> Option<RiddleBank> {
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_riddle_bank(&s) {
      Ok(bank) => {
        info!(target: "riddle_lock", path = %path.display(), riddles = bank.riddles.len(), "Loaded riddle bank (TOML)");
        Some(bank)
      }
      Err(e) => {
        error!(target: "riddle_lock", path = %path.display(), error = %e, "Failed to parse TOML riddle bank");
        None
      }
    },
    Err(e) => {
      error!(target: "riddle_lock", path = %path.display(), error = %e, "Failed to read TOML riddle bank");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bank_parses_optional_fields() {
    let bank = parse_riddle_bank(
      r#"
        [[riddles]]
        riddle_text = "What has keys but can't open locks?"
        answer = "Piano"
        digit = 3
        position = 2

        [[riddles]]
        riddle_text = "What answers back?"
        answer = "echo"
        digit = 7
        position = 1
        week = 4
        active = true
      "#,
    )
    .expect("valid bank");
    assert_eq!(bank.riddles.len(), 2);
    assert!(!bank.riddles[0].active);
    assert_eq!(bank.riddles[0].week, None);
    assert_eq!(bank.riddles[1].week, Some(4));
    assert!(bank.riddles[1].active);
  }

  #[test]
  fn bank_rejects_unknown_keys() {
    let err = parse_riddle_bank(
      r#"
        [[riddles]]
        riddle_text = "x"
        answer = "y"
        digit = 1
        position = 1
        hint = "nope"
      "#,
    );
    assert!(err.is_err());
  }

  #[test]
  fn empty_bank_is_fine() {
    assert!(parse_riddle_bank("").unwrap().riddles.is_empty());
  }
}
