//! Riddle Lock · riddle-gated lock combination
//!
//! Server side: a riddle store with a small lifecycle (created → active →
//! expired), an answer checker that reveals a combination digit only on a
//! correct match, and admin operations behind a shared secret.
//!
//! Client side (`client`): a progress reconciler that caches confirmed digits
//! per combination position and never stores anything the server has not
//! confirmed.

pub mod auth;
pub mod checker;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
