//! Participant-side pieces: the HTTP client for the public contract, the
//! locally persisted progress record, and the reconciler tying them together.

pub mod api;
pub mod progress;
pub mod reconciler;

pub use api::{ClientError, RiddleApiClient};
pub use progress::{Combination, LocalProgress, ProgressStore};
pub use reconciler::{BoardEntry, Reconciler, RiddleBoard, SubmitOutcome};
