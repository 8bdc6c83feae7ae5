//! Progress reconciler: the participant's view of the riddle board.
//!
//! Local progress is a strictly additive cache of facts the server confirmed.
//! It only grows on a `correct: true` check response and only shrinks on an
//! explicit `reset_progress`. Riddles rotating out of the listing never remove
//! a digit; a new riddle at an already-known position leaves the old digit in
//! place until it is solved itself. An expired riddle still confirms, but its
//! digit never displaces one from a current riddle and never unlocks.
//!
//! Network I/O runs outside the progress lock, so submissions for different
//! riddles never wait on each other. The merge-and-persist step runs under the
//! lock, so concurrent confirmations apply one at a time. Dropping a pending
//! `submit_answer` before the response arrives leaves progress untouched.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::client::api::{ClientError, RiddleApiClient};
use crate::client::progress::{Combination, LocalProgress, ProgressStore};
use crate::domain::{Digit, Position};
use crate::protocol::PublicRiddle;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardEntry {
  pub riddle: PublicRiddle,
  pub solved: bool,
}

/// Freshly fetched listing annotated with local progress. Never cached across runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiddleBoard {
  pub active: Vec<BoardEntry>,
  pub expired: Vec<BoardEntry>,
}

impl RiddleBoard {
  pub fn is_empty(&self) -> bool { self.active.is_empty() && self.expired.is_empty() }

  /// Prompt to show for a position. With overlapping riddles, the most
  /// recently activated one wins (the server lists oldest first).
  pub fn current_for(&self, position: Position) -> Option<&BoardEntry> {
    self.active.iter().rev().find(|e| e.riddle.position == position.get())
  }

  pub fn find(&self, riddle_id: &str) -> Option<&BoardEntry> {
    self.active.iter().chain(self.expired.iter()).find(|e| e.riddle.id == riddle_id)
  }
}

#[derive(Debug)]
pub enum SubmitOutcome {
  /// Confirmed by the server and merged into local progress.
  Correct { position: Position, digit: Digit, is_expired: bool, unlocked: bool },
  /// Wrong answer. Nothing changed; try again.
  Incorrect { message: String },
  /// Transport, server or persistence failure. Nothing changed.
  Error(ClientError),
}

#[derive(Clone)]
pub struct Reconciler {
  api: RiddleApiClient,
  store: ProgressStore,
  progress: Arc<Mutex<LocalProgress>>,
}

impl Reconciler {
  /// Load persisted progress and get ready to talk to the API.
  pub async fn open(api: RiddleApiClient, store: ProgressStore) -> Self {
    let progress = store.load().await;
    info!(target: "riddle_lock", path = %store.path().display(), solved = progress.solved_ids().count(), "Progress loaded");
    Self { api, store, progress: Arc::new(Mutex::new(progress)) }
  }

  /// Snapshot of the current local progress.
  pub async fn progress(&self) -> LocalProgress {
    self.progress.lock().await.clone()
  }

  /// Fetch the active and expired riddles and mark the ones already solved.
  /// Progress is read, never modified.
  #[instrument(level = "info", skip(self))]
  pub async fn load_active_riddles(&self) -> Result<RiddleBoard, ClientError> {
    let listing = self.api.active_riddles().await?;
    let progress = self.progress.lock().await;
    let annotate = |riddles: Vec<PublicRiddle>| -> Vec<BoardEntry> {
      riddles
        .into_iter()
        .map(|riddle| BoardEntry { solved: progress.is_solved(&riddle.id), riddle })
        .collect()
    };
    let board = RiddleBoard {
      active: annotate(listing.active_riddles),
      expired: annotate(listing.expired_riddles),
    };
    info!(target: "riddle_lock", active = board.active.len(), expired = board.expired.len(), "Board loaded");
    Ok(board)
  }

  /// Submit the raw answer and merge the result only if the server confirms it.
  #[instrument(level = "info", skip(self, raw_answer), fields(%riddle_id, answer_len = raw_answer.len()))]
  pub async fn submit_answer(&self, riddle_id: &str, raw_answer: &str) -> SubmitOutcome {
    let response = match self.api.check(riddle_id, raw_answer).await {
      Ok(r) => r,
      Err(e) => {
        warn!(target: "riddle_lock", %riddle_id, error = %e, "Check failed; progress untouched");
        return SubmitOutcome::Error(e);
      }
    };

    if !response.correct {
      return SubmitOutcome::Incorrect { message: response.message };
    }

    let confirmed = response
      .position
      .and_then(|p| Position::new(p as i64))
      .zip(response.digit.and_then(|d| Digit::new(d as i64)));
    let Some((position, digit)) = confirmed else {
      warn!(target: "riddle_lock", %riddle_id, "Correct response without a usable digit/position; ignoring");
      return SubmitOutcome::Error(ClientError::Protocol(
        "correct response is missing a valid digit or position".into(),
      ));
    };

    let is_expired = response.is_expired.unwrap_or(false);
    let mut progress = self.progress.lock().await;
    let mut next = progress.clone();
    let changed = if is_expired {
      next.record_expired(riddle_id, position, digit)
    } else {
      next.record(riddle_id, position, digit)
    };
    if changed {
      if let Err(e) = self.store.save(&next).await {
        warn!(target: "riddle_lock", %riddle_id, error = %e, "Failed to persist progress; not merged");
        return SubmitOutcome::Error(e.into());
      }
      *progress = next;
    }
    let unlocked = progress.combination().is_unlocked();
    info!(target: "riddle_lock", %riddle_id, %position, is_expired, unlocked, "Digit confirmed");
    SubmitOutcome::Correct { position, digit, is_expired, unlocked }
  }

  /// Positions 1..=3 in order; unknown ones render as a placeholder.
  pub async fn compute_combination(&self) -> Combination {
    self.progress.lock().await.combination()
  }

  /// Deliberate, user-invoked wipe of all local progress.
  #[instrument(level = "info", skip(self))]
  pub async fn reset_progress(&self) -> Result<(), ClientError> {
    let mut progress = self.progress.lock().await;
    self.store.clear().await?;
    *progress = LocalProgress::default();
    info!(target: "riddle_lock", "Progress reset");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::AdminGate;
  use crate::lifecycle::{activate, deactivate, expire, submit, NewRiddle};
  use crate::routes::build_router;
  use crate::state::AppState;
  use crate::store::RiddleStore;
  use chrono::Utc;
  use tokio::net::TcpListener;

  /// Serve a real router on an ephemeral port; returns its base URL and state.
  async fn serve() -> (String, Arc<AppState>) {
    let state = Arc::new(AppState::new(RiddleStore::in_memory(), AdminGate::new(None)));
    let app = build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
  }

  async fn add_active(state: &AppState, answer: &str, digit: i64, position: i64) -> String {
    let r = submit(
      NewRiddle { riddle_text: format!("riddle {answer}"), answer: answer.into(), digit, position, week: Some(1) },
      Utc::now(),
    )
    .unwrap();
    let id = r.id.clone();
    state.store.insert(r).await.unwrap();
    state.store.transition(&id, |r| activate(r, Utc::now())).await.unwrap();
    id
  }

  async fn reconciler(base: &str, dir: &std::path::Path) -> Reconciler {
    Reconciler::open(RiddleApiClient::new(base).unwrap(), ProgressStore::new(dir)).await
  }

  #[tokio::test]
  async fn empty_board_is_fine() {
    let (base, _state) = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;
    let board = rec.load_active_riddles().await.unwrap();
    assert!(board.is_empty());
    assert_eq!(rec.compute_combination().await.to_string(), "___");
  }

  #[tokio::test]
  async fn correct_answer_is_merged_and_persisted() {
    let (base, state) = serve().await;
    let id = add_active(&state, "echo", 7, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    match rec.submit_answer(&id, "  ECHO ").await {
      SubmitOutcome::Correct { position, digit, unlocked, .. } => {
        assert_eq!((position.get(), digit.get(), unlocked), (1, 7, false));
      }
      other => panic!("expected correct, got {other:?}"),
    }
    assert_eq!(rec.compute_combination().await.to_string(), "7__");

    let board = rec.load_active_riddles().await.unwrap();
    assert!(board.find(&id).unwrap().solved);

    let reopened = reconciler(&base, dir.path()).await;
    assert_eq!(reopened.compute_combination().await.to_string(), "7__");
  }

  #[tokio::test]
  async fn incorrect_answer_changes_nothing() {
    let (base, state) = serve().await;
    let id = add_active(&state, "echo", 7, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    assert!(matches!(rec.submit_answer(&id, "shadow").await, SubmitOutcome::Incorrect { .. }));
    assert!(rec.progress().await.is_empty());
    assert!(!ProgressStore::new(dir.path()).path().exists());
  }

  #[tokio::test]
  async fn unknown_riddle_is_an_error_not_incorrect() {
    let (base, _state) = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;
    match rec.submit_answer("nonexistent-id", "echo").await {
      SubmitOutcome::Error(e) => assert!(e.is_not_found(), "{e}"),
      other => panic!("expected error, got {other:?}"),
    }
    assert!(rec.progress().await.is_empty());
  }

  #[tokio::test]
  async fn dropped_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&format!("http://{addr}"), dir.path()).await;

    assert!(matches!(rec.submit_answer("any", "echo").await, SubmitOutcome::Error(ClientError::Transport(_))));
    assert!(matches!(rec.load_active_riddles().await, Err(ClientError::Transport(_))));
    assert!(rec.progress().await.is_empty());
  }

  #[tokio::test]
  async fn digits_survive_deactivation_and_rotation() {
    let (base, state) = serve().await;
    let week1 = add_active(&state, "echo", 7, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;
    assert!(matches!(rec.submit_answer(&week1, "echo").await, SubmitOutcome::Correct { .. }));

    state.store.transition(&week1, deactivate).await.unwrap();
    let week2 = add_active(&state, "shadow", 2, 1).await;

    let board = rec.load_active_riddles().await.unwrap();
    assert!(board.find(&week1).is_none());
    let current = board.current_for(Position::new(1).unwrap()).unwrap();
    assert_eq!(current.riddle.id, week2);
    assert!(!current.solved);
    assert_eq!(rec.compute_combination().await.to_string(), "7__");

    assert!(matches!(rec.submit_answer(&week2, "Shadow").await, SubmitOutcome::Correct { .. }));
    assert_eq!(rec.compute_combination().await.to_string(), "2__");
  }

  #[tokio::test]
  async fn expired_riddle_still_confirms() {
    let (base, state) = serve().await;
    let id = add_active(&state, "echo", 7, 1).await;
    state.store.transition(&id, |r| expire(r, Utc::now())).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    let board = rec.load_active_riddles().await.unwrap();
    assert_eq!(board.expired.len(), 1);
    match rec.submit_answer(&id, "echo").await {
      SubmitOutcome::Correct { is_expired, .. } => assert!(is_expired),
      other => panic!("expected correct, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn last_weeks_riddle_cannot_overwrite_this_weeks_digit() {
    let (base, state) = serve().await;
    let week1 = add_active(&state, "echo", 7, 1).await;
    state.store.transition(&week1, |r| expire(r, Utc::now())).await.unwrap();
    let week2 = add_active(&state, "shadow", 2, 1).await;
    let b = add_active(&state, "two", 5, 2).await;
    let c = add_active(&state, "three", 6, 3).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    assert!(matches!(rec.submit_answer(&week2, "shadow").await, SubmitOutcome::Correct { .. }));
    assert_eq!(rec.compute_combination().await.to_string(), "2__");

    match rec.submit_answer(&week1, "echo").await {
      SubmitOutcome::Correct { digit, is_expired, unlocked, .. } => {
        assert_eq!(digit.get(), 7);
        assert!(is_expired && !unlocked);
      }
      other => panic!("expected correct, got {other:?}"),
    }
    assert_eq!(rec.compute_combination().await.to_string(), "2__");
    assert!(rec.load_active_riddles().await.unwrap().find(&week1).unwrap().solved);

    rec.submit_answer(&b, "two").await;
    rec.submit_answer(&c, "three").await;
    let combo = rec.compute_combination().await;
    assert_eq!(combo.to_string(), "256");
    assert!(combo.is_unlocked());
  }

  #[tokio::test]
  async fn expired_digit_alone_does_not_unlock() {
    let (base, state) = serve().await;
    let old = add_active(&state, "echo", 7, 1).await;
    state.store.transition(&old, |r| expire(r, Utc::now())).await.unwrap();
    let b = add_active(&state, "two", 5, 2).await;
    let c = add_active(&state, "three", 6, 3).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    rec.submit_answer(&b, "two").await;
    rec.submit_answer(&c, "three").await;
    assert!(matches!(
      rec.submit_answer(&old, "echo").await,
      SubmitOutcome::Correct { is_expired: true, unlocked: false, .. }
    ));
    let combo = rec.compute_combination().await;
    assert_eq!(combo.to_string(), "756");
    assert!(combo.is_stale(Position::new(1).unwrap()));
    assert!(!combo.is_unlocked());
    assert!(reconciler(&base, dir.path()).await.progress().await.is_stale(Position::new(1).unwrap()));
  }

  #[tokio::test]
  async fn failed_save_reports_error_and_keeps_memory() {
    let (base, state) = serve().await;
    let id = add_active(&state, "echo", 7, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let rec = reconciler(&base, &blocker.join("state")).await;

    match rec.submit_answer(&id, "echo").await {
      SubmitOutcome::Error(ClientError::Progress(_)) => {}
      other => panic!("expected progress error, got {other:?}"),
    }
    assert!(rec.progress().await.is_empty());
    assert_eq!(rec.compute_combination().await.to_string(), "___");
  }

  #[tokio::test]
  async fn concurrent_submissions_all_land() {
    let (base, state) = serve().await;
    let a = add_active(&state, "one", 1, 1).await;
    let b = add_active(&state, "two", 2, 2).await;
    let c = add_active(&state, "three", 3, 3).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    let (ra, rb, rc) = tokio::join!(
      rec.submit_answer(&a, "one"),
      rec.submit_answer(&b, "two"),
      rec.submit_answer(&c, "three"),
    );
    for r in [ra, rb, rc] {
      assert!(matches!(r, SubmitOutcome::Correct { .. }), "{r:?}");
    }
    let combo = rec.compute_combination().await;
    assert_eq!(combo.to_string(), "123");
    assert!(combo.is_unlocked());
    assert_eq!(ProgressStore::new(dir.path()).load().await.combination().to_string(), "123");
  }

  #[tokio::test]
  async fn progress_only_grows_until_reset() {
    let (base, state) = serve().await;
    let a = add_active(&state, "one", 1, 1).await;
    let b = add_active(&state, "two", 2, 2).await;
    let dir = tempfile::tempdir().unwrap();
    let rec = reconciler(&base, dir.path()).await;

    let mut seen = rec.progress().await.populated_positions();
    for (id, answer) in [(a.as_str(), "nope"), (a.as_str(), "one"), ("missing", "x"), (b.as_str(), "two"), (a.as_str(), "one")] {
      rec.submit_answer(id, answer).await;
      let now = rec.progress().await.populated_positions();
      assert!(now.is_superset(&seen));
      seen = now;
    }
    assert_eq!(seen.len(), 2);

    rec.reset_progress().await.unwrap();
    assert!(rec.progress().await.is_empty());
    assert_eq!(rec.compute_combination().await.to_string(), "___");
    assert!(reconciler(&base, dir.path()).await.progress().await.is_empty());
  }
}
