//! Local progress: digits the server has confirmed, keyed by combination
//! position, plus the ids of solved riddles.
//!
//! Persisted as one JSON record under a fixed namespaced key inside the state
//! directory. Loading never fails: a missing, unreadable, malformed or
//! newer-version record is treated as empty progress. Records written before
//! the `version` field existed are migrated in place on the next save.
//!
//! A digit confirmed through an expired riddle is kept but marked stale. It
//! fills an empty slot, never replaces a digit from a current riddle, and does
//! not count toward unlocking.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Digit, Position, COMBINATION_LEN};

pub const PROGRESS_KEY: &str = "riddle_lock.progress.v1";
pub const PROGRESS_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ProgressError {
  #[error("failed to write progress at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to encode progress: {0}")]
  Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalProgress {
  digits: BTreeMap<Position, Digit>,
  stale: BTreeSet<Position>,
  solved: BTreeSet<String>,
}

impl LocalProgress {
  /// Merge a fact confirmed by a current riddle. Returns whether anything changed.
  pub fn record(&mut self, riddle_id: &str, position: Position, digit: Digit) -> bool {
    let prev = self.digits.insert(position, digit);
    let was_stale = self.stale.remove(&position);
    let newly_solved = self.solved.insert(riddle_id.to_string());
    prev != Some(digit) || was_stale || newly_solved
  }

  /// Merge a fact confirmed by an expired riddle. The riddle counts as solved,
  /// but its digit only lands in an empty or already-stale slot.
  pub fn record_expired(&mut self, riddle_id: &str, position: Position, digit: Digit) -> bool {
    let newly_solved = self.solved.insert(riddle_id.to_string());
    if self.digits.contains_key(&position) && !self.stale.contains(&position) {
      return newly_solved;
    }
    let prev = self.digits.insert(position, digit);
    let newly_stale = self.stale.insert(position);
    prev != Some(digit) || newly_stale || newly_solved
  }

  pub fn digit_at(&self, position: Position) -> Option<Digit> { self.digits.get(&position).copied() }

  pub fn is_stale(&self, position: Position) -> bool { self.stale.contains(&position) }

  pub fn is_solved(&self, riddle_id: &str) -> bool { self.solved.contains(riddle_id) }

  pub fn populated_positions(&self) -> BTreeSet<Position> { self.digits.keys().copied().collect() }

  pub fn solved_ids(&self) -> impl Iterator<Item = &str> { self.solved.iter().map(String::as_str) }

  pub fn is_empty(&self) -> bool { self.digits.is_empty() && self.solved.is_empty() }

  pub fn combination(&self) -> Combination {
    let mut combo = Combination { slots: [None; COMBINATION_LEN], stale: [false; COMBINATION_LEN] };
    for (pos, digit) in &self.digits {
      combo.slots[pos.index()] = Some(*digit);
      combo.stale[pos.index()] = self.stale.contains(pos);
    }
    combo
  }

  fn to_record(&self) -> ProgressRecord {
    ProgressRecord {
      version: PROGRESS_VERSION,
      digits: self.digits.iter().map(|(p, d)| (p.get().to_string(), d.get() as i64)).collect(),
      stale: self.stale.iter().map(|p| p.get()).collect(),
      solved: self.solved.iter().cloned().collect(),
    }
  }

  /// Rebuild from a stored record, dropping entries that are out of range.
  fn from_record(record: ProgressRecord) -> Self {
    let mut out = LocalProgress::default();
    for (key, value) in record.digits {
      let position = key.trim().parse::<i64>().ok().and_then(Position::new);
      match (position, Digit::new(value)) {
        (Some(p), Some(d)) => {
          out.digits.insert(p, d);
        }
        _ => warn!(target: "riddle_lock", %key, value, "Dropping invalid stored digit"),
      }
    }
    out.stale = record
      .stale
      .into_iter()
      .filter_map(|p| Position::new(p as i64))
      .filter(|p| out.digits.contains_key(p))
      .collect();
    out.solved = record.solved.into_iter().filter(|id| !id.trim().is_empty()).collect();
    out
  }
}

/// On-disk layout. Version 0 means the field was absent (legacy layout).
#[derive(Serialize, Deserialize)]
struct ProgressRecord {
  #[serde(default)]
  version: u32,
  #[serde(default)]
  digits: BTreeMap<String, i64>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  stale: Vec<u8>,
  #[serde(default)]
  solved: Vec<String>,
}

/// Decode a stored record, falling back to empty progress on anything odd.
pub fn decode_progress(raw: &str) -> LocalProgress {
  match serde_json::from_str::<ProgressRecord>(raw) {
    Ok(rec) if rec.version == PROGRESS_VERSION => LocalProgress::from_record(rec),
    Ok(rec) if rec.version == 0 => {
      info!(target: "riddle_lock", "Migrating unversioned progress record");
      LocalProgress::from_record(rec)
    }
    Ok(rec) => {
      warn!(target: "riddle_lock", version = rec.version, "Unknown progress version; starting empty");
      LocalProgress::default()
    }
    Err(e) => {
      warn!(target: "riddle_lock", error = %e, "Malformed progress record; starting empty");
      LocalProgress::default()
    }
  }
}

/// Three slots, each either a confirmed digit or unknown. Stale digits are
/// shown but never unlock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Combination {
  slots: [Option<Digit>; COMBINATION_LEN],
  stale: [bool; COMBINATION_LEN],
}

impl Combination {
  pub const PLACEHOLDER: char = '_';

  pub fn digit(&self, position: Position) -> Option<Digit> { self.slots[position.index()] }

  pub fn is_stale(&self, position: Position) -> bool { self.stale[position.index()] }

  /// All three positions known from current riddles: time to open the lock.
  pub fn is_unlocked(&self) -> bool { self.known() == COMBINATION_LEN }

  /// Positions holding a digit from a current riddle.
  pub fn known(&self) -> usize {
    self.slots.iter().zip(self.stale).filter(|(d, stale)| d.is_some() && !stale).count()
  }
}

impl fmt::Display for Combination {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for slot in &self.slots {
      match slot {
        Some(d) => write!(f, "{d}")?,
        None => write!(f, "{}", Self::PLACEHOLDER)?,
      }
    }
    Ok(())
  }
}

/// File-backed persistence for `LocalProgress`.
#[derive(Clone, Debug)]
pub struct ProgressStore {
  path: PathBuf,
}

impl ProgressStore {
  pub fn new(state_dir: impl AsRef<Path>) -> Self {
    Self { path: state_dir.as_ref().join(format!("{PROGRESS_KEY}.json")) }
  }

  pub fn path(&self) -> &Path { &self.path }

  pub async fn load(&self) -> LocalProgress {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(raw) => decode_progress(&raw),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => LocalProgress::default(),
      Err(e) => {
        warn!(target: "riddle_lock", path = %self.path.display(), error = %e, "Unreadable progress record; starting empty");
        LocalProgress::default()
      }
    }
  }

  pub async fn save(&self, progress: &LocalProgress) -> Result<(), ProgressError> {
    let body = serde_json::to_vec_pretty(&progress.to_record())?;
    let io_err = |source| ProgressError::Io { path: self.path.clone(), source };
    if let Some(parent) = self.path.parent() {
      tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &body).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
    Ok(())
  }

  /// Remove the persisted record. A missing record is already clear.
  pub async fn clear(&self) -> Result<(), ProgressError> {
    match tokio::fs::remove_file(&self.path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(ProgressError::Io { path: self.path.clone(), source }),
    }
  }
}
