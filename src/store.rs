//! Riddle store: rows in memory behind one async lock, optionally mirrored to a
//! JSON snapshot on disk.
//!
//! Every mutation runs under the write lock, so lifecycle transitions are
//! atomic per row (and `expire_week` is atomic over the whole week). When a
//! snapshot path is configured, a mutation only sticks if the snapshot write
//! succeeds; otherwise the row is restored and the error bubbles up.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::domain::Riddle;
use crate::lifecycle::Transition;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot write failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    #[serde(default)]
    riddles: Vec<Riddle>,
}

pub struct RiddleStore {
    rows: RwLock<HashMap<String, Riddle>>,
    snapshot: Option<PathBuf>,
}

impl RiddleStore {
    /// Store that lives only in memory.
    pub fn in_memory() -> Self {
        Self { rows: RwLock::new(HashMap::new()), snapshot: None }
    }

    /// Open a store backed by a snapshot file. A missing file means no riddles
    /// yet; an unreadable one is logged and the store starts empty. A corrupt
    /// file is moved to `<name>.corrupt` before anything can overwrite it.
    #[instrument(level = "info")]
    pub async fn open(path: PathBuf) -> Self {
        let rows = match tokio::fs::read_to_string(&path).await {
            Ok(s) => match serde_json::from_str::<Snapshot>(&s) {
                Ok(snap) => {
                    info!(target: "riddle_lock", path = %path.display(), riddles = snap.riddles.len(), "Loaded riddle snapshot");
                    snap.riddles.into_iter().map(|r| (r.id.clone(), r)).collect()
                }
                Err(e) => {
                    error!(target: "riddle_lock", path = %path.display(), error = %e, "Failed to parse riddle snapshot; starting empty");
                    let aside = corrupt_path(&path);
                    if let Err(e) = tokio::fs::rename(&path, &aside).await {
                        error!(target: "riddle_lock", path = %path.display(), error = %e, "Could not move corrupt snapshot aside; persistence disabled");
                        return Self::in_memory();
                    }
                    warn!(target: "riddle_lock", moved_to = %aside.display(), "Corrupt riddle snapshot kept for inspection");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "riddle_lock", path = %path.display(), "No riddle snapshot yet; starting empty");
                HashMap::new()
            }
            Err(e) => {
                error!(target: "riddle_lock", path = %path.display(), error = %e, "Failed to read riddle snapshot; starting empty");
                HashMap::new()
            }
        };
        Self { rows: RwLock::new(rows), snapshot: Some(path) }
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Insert a freshly submitted riddle.
    #[instrument(level = "debug", skip(self, riddle), fields(id = %riddle.id))]
    pub async fn insert(&self, riddle: Riddle) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let id = riddle.id.clone();
        rows.insert(id.clone(), riddle);
        if let Err(e) = self.persist(&rows).await {
            rows.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Apply a lifecycle transition to one row. `Ok(None)` when the id is unknown.
    #[instrument(level = "debug", skip(self, apply))]
    pub async fn transition<F>(&self, id: &str, apply: F) -> Result<Option<Transition>, StoreError>
    where
        F: FnOnce(&mut Riddle) -> Transition,
    {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(id) else {
            return Ok(None);
        };
        let before = row.clone();
        let outcome = apply(row);
        if outcome == Transition::Changed {
            if let Err(e) = self.persist(&rows).await {
                rows.insert(id.to_string(), before);
                return Err(e);
            }
        }
        Ok(Some(outcome))
    }

    /// Expire every riddle of a week in one step. Returns how many changed.
    #[instrument(level = "debug", skip(self))]
    pub async fn expire_week(&self, week: u32, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().await;
        let mut before = Vec::new();
        for row in rows.values_mut().filter(|r| r.week == Some(week)) {
            let prior = row.clone();
            if crate::lifecycle::expire(row, now) == Transition::Changed {
                before.push(prior);
            }
        }
        if !before.is_empty() {
            if let Err(e) = self.persist(&rows).await {
                for prior in before {
                    rows.insert(prior.id.clone(), prior);
                }
                return Err(e);
            }
        }
        Ok(before.len())
    }

    /// Lookup restricted to visible riddles.
    pub async fn find_active(&self, id: &str) -> Option<Riddle> {
        self.rows.read().await.get(id).filter(|r| r.is_active).cloned()
    }

    /// Active riddles ordered by position, then activation time, then id.
    pub async fn active(&self) -> Vec<Riddle> {
        let mut out: Vec<Riddle> = self.rows.read().await.values().filter(|r| r.is_active).cloned().collect();
        out.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.activated_at.cmp(&b.activated_at))
                .then(a.id.cmp(&b.id))
        });
        out
    }

    /// Every row, oldest first.
    pub async fn all(&self) -> Vec<Riddle> {
        let mut out: Vec<Riddle> = self.rows.read().await.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        out
    }

    async fn persist(&self, rows: &HashMap<String, Riddle>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let mut riddles: Vec<Riddle> = rows.values().cloned().collect();
        riddles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let body = serde_json::to_vec_pretty(&Snapshot { riddles })?;
        write_atomic(path, &body).await
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Write to a sibling temp file, then rename over the target.
pub(crate) async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}
