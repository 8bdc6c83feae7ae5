//! Minimal client for the public riddle contract.
//!
//! We only call `GET /riddles/active` and `POST /riddles/check`. Calls are
//! instrumented and log status codes and sizes (never the answer text).

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::client::progress::ProgressError;
use crate::protocol::{ActiveOut, CheckIn, CheckOut, ErrorOut, Status};

#[derive(Debug, Error)]
pub enum ClientError {
  /// Network failure, timeout, or an unreadable body.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The server answered with the error envelope.
  #[error("server error ({status}): {message}")]
  Server { status: u16, message: String },

  /// The server answered, but not in a shape we can trust.
  #[error("unexpected response: {0}")]
  Protocol(String),

  #[error(transparent)]
  Progress(#[from] ProgressError),
}

impl ClientError {
  /// Did the server refuse the riddle id (missing or not active)?
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Server { status: 404, .. })
  }
}

#[derive(Clone, Debug)]
pub struct RiddleApiClient {
  client: reqwest::Client,
  base_url: String,
}

impl RiddleApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()?;
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  #[instrument(level = "debug", skip(self))]
  pub async fn active_riddles(&self) -> Result<ActiveOut, ClientError> {
    let url = format!("{}/riddles/active", self.base_url);
    let res = self.client.get(&url)
      .header(USER_AGENT, concat!("riddle-player/", env!("CARGO_PKG_VERSION")))
      .send().await?;
    let out: ActiveOut = read_envelope(res).await?;
    ensure_success(out.status, &out.message)?;
    Ok(out)
  }

  /// Send the raw answer as typed; normalization is the server's job.
  #[instrument(level = "debug", skip(self, answer), fields(%riddle_id, answer_len = answer.len()))]
  pub async fn check(&self, riddle_id: &str, answer: &str) -> Result<CheckOut, ClientError> {
    let url = format!("{}/riddles/check", self.base_url);
    let body = CheckIn { riddle_id: riddle_id.to_string(), answer: answer.to_string() };
    let res = self.client.post(&url)
      .header(USER_AGENT, concat!("riddle-player/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .json(&body).send().await?;
    let out: CheckOut = read_envelope(res).await?;
    ensure_success(out.status, &out.message)?;
    Ok(out)
  }
}

async fn read_envelope<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ClientError> {
  let status = res.status();
  let bytes = res.bytes().await?;
  debug!(status = status.as_u16(), body_len = bytes.len(), "Riddle API response");

  if !status.is_success() {
    let message = extract_error_message(&bytes).unwrap_or_else(|| status_reason(status));
    warn!(status = status.as_u16(), %message, "Riddle API returned an error");
    return Err(ClientError::Server { status: status.as_u16(), message });
  }

  serde_json::from_slice::<T>(&bytes).map_err(|e| ClientError::Protocol(format!("JSON parse error: {e}")))
}

fn ensure_success(status: Status, message: &str) -> Result<(), ClientError> {
  match status {
    Status::Success => Ok(()),
    Status::Error => Err(ClientError::Server { status: 200, message: message.to_string() }),
  }
}

fn extract_error_message(body: &[u8]) -> Option<String> {
  serde_json::from_slice::<ErrorOut>(body).ok().map(|e| e.message)
}

fn status_reason(status: StatusCode) -> String {
  status.canonical_reason().unwrap_or("unknown status").to_string()
}
