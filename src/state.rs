//! Application state shared by every handler.
//!
//! This module owns:
//!   - the riddle store (in memory, optionally mirrored to a snapshot)
//!   - the admin gate built from the configured secret
//!
//! Startup seeding: if the store is empty and a TOML bank is configured, bank
//! entries are validated like admin submissions and inserted. A persisted
//! snapshot always wins over the bank.

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::auth::AdminGate;
use crate::config::{load_riddle_bank, RiddleBank, Settings};
use crate::lifecycle::{activate, submit};
use crate::store::RiddleStore;

pub struct AppState {
    pub store: RiddleStore,
    pub gate: AdminGate,
}

impl AppState {
    pub fn new(store: RiddleStore, gate: AdminGate) -> Self {
        Self { store, gate }
    }

    /// Build state from settings: open the store, seed from the bank, set up the gate.
    #[instrument(level = "info", skip_all)]
    pub async fn from_settings(settings: &Settings) -> Self {
        let store = match &settings.data_path {
            Some(path) => RiddleStore::open(path.clone()).await,
            None => {
                info!(target: "riddle_lock", "RIDDLE_DATA_PATH not set; riddles live in memory only");
                RiddleStore::in_memory()
            }
        };

        if let Some(bank) = settings.bank_path.as_deref().and_then(load_riddle_bank) {
            if store.is_empty().await {
                seed_from_bank(&store, &bank).await;
            } else {
                info!(target: "riddle_lock", "Store already has riddles; skipping TOML bank");
            }
        }

        let all = store.all().await;
        let active = all.iter().filter(|r| r.is_active).count();
        let expired = all.iter().filter(|r| r.is_expired).count();
        info!(target: "riddle", total = all.len(), active, expired, "Startup riddle inventory");

        Self::new(store, AdminGate::new(settings.admin_secret.clone()))
    }
}

/// Insert bank entries, skipping invalid ones.
pub async fn seed_from_bank(store: &RiddleStore, bank: &RiddleBank) -> usize {
    let mut inserted = 0;
    for (idx, cfg) in bank.riddles.iter().enumerate() {
        let now = Utc::now();
        let mut riddle = match submit(cfg.to_new_riddle(), now) {
            Ok(r) => r,
            Err(e) => {
                error!(target: "riddle", index = idx, error = %e, "Skipping bank riddle");
                continue;
            }
        };
        if cfg.active {
            activate(&mut riddle, now);
        }
        match store.insert(riddle).await {
            Ok(()) => inserted += 1,
            Err(e) => error!(target: "riddle", index = idx, error = %e, "Failed to store bank riddle"),
        }
    }
    inserted
}
