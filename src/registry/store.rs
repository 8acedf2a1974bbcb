//! Claim key and submission storage for the registry service.
//!
//! Claim keys are reusable until they expire. Each `(wallet, event)` pair is
//! accepted once, so repeated submissions never produce a second row.

use alloy::primitives::Address;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::observability::metrics;
use crate::registry::types::{EventId, MintStatus, SubmittedAddress};

/// A claim key issued for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimKey {
    pub key: String,
    pub event_id: EventId,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: u64,
}

impl ClaimKey {
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid or expired key")]
    InvalidKey,

    #[error("Wallet already submitted for this event")]
    Duplicate,

    #[error("Wallet has not been submitted for this event")]
    NotFound,

    #[error("POAP already minted for this wallet")]
    AlreadyMinted,

    #[error("Mint already in progress for this wallet")]
    MintInProgress,
}

/// Current time in unix seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    keys: HashMap<String, ClaimKey>,
    rows: HashMap<EventId, Vec<SubmittedAddress>>,
    next_id: u64,
}

/// Thread-safe registry state shared by the request handlers.
#[derive(Clone, Default)]
pub struct RegistryStore {
    keys: Arc<DashMap<String, ClaimKey>>,
    rows: Arc<DashMap<EventId, Vec<SubmittedAddress>>>,
    /// `(event, wallet)` pairs with a mint outstanding.
    minting: Arc<DashSet<(EventId, Address)>>,
    next_id: Arc<AtomicU64>,
    persistence_path: Option<String>,
    /// Held while a snapshot is taken and written.
    write_lock: Arc<Mutex<()>>,
}

impl RegistryStore {
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            persistence_path,
            ..Self::default()
        }
    }

    /// Load from file if it exists.
    pub fn load_from_file(path: &str) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;

            for (k, v) in snapshot.keys {
                store.keys.insert(k, v);
            }
            for (event, rows) in snapshot.rows {
                store.rows.insert(event, rows);
            }
            store.next_id.store(snapshot.next_id, Ordering::SeqCst);
            metrics::record_registry_rows(store.row_count());
            tracing::info!(
                keys = store.keys.len(),
                rows = store.row_count(),
                "Loaded registry state from file"
            );
        }
        Ok(store)
    }

    /// Save to file. No-op without a persistence path.
    ///
    /// The snapshot goes to `<path>.tmp` first and is renamed over `path`, so
    /// a crash mid-write leaves the previous snapshot intact. Writers are
    /// serialized and each one captures the latest state.
    pub fn save_to_file(&self) -> io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = Snapshot {
            keys: self.keys.iter().map(|r| (r.key().clone(), r.value().clone())).collect(),
            rows: self.rows.iter().map(|r| (r.key().clone(), r.value().clone())).collect(),
            next_id: self.next_id.load(Ordering::SeqCst),
        };

        let tmp_path = format!("{}.tmp", path);
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        std::fs::rename(&tmp_path, path)?;

        tracing::debug!(path = %path, "Saved registry state");
        Ok(())
    }

    /// [`save_to_file`](Self::save_to_file) on the blocking pool.
    pub async fn save(&self) -> io::Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save_to_file())
            .await
            .map_err(io::Error::other)?
    }

    /// Persist after a mutation. Inside a runtime the write is handed to the
    /// blocking pool so request handlers never wait on disk.
    fn persist(&self) {
        if self.persistence_path.is_none() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.clone();
                handle.spawn_blocking(move || store.save_logged());
            }
            Err(_) => self.save_logged(),
        }
    }

    fn save_logged(&self) {
        if let Err(e) = self.save_to_file() {
            tracing::error!(error = %e, "Failed to persist registry state");
        }
    }

    /// Issue a new claim key for `event_id`.
    pub fn create_key(&self, event_id: &str, expiry_minutes: u64, now: u64) -> ClaimKey {
        let claim = ClaimKey {
            key: uuid::Uuid::new_v4().simple().to_string(),
            event_id: event_id.to_string(),
            expires_at: now + expiry_minutes * 60,
        };
        self.keys.insert(claim.key.clone(), claim.clone());
        self.persist();
        claim
    }

    /// Look up a key that is still valid at `now`.
    pub fn lookup_key(&self, key: &str, now: u64) -> Option<ClaimKey> {
        self.keys
            .get(key)
            .map(|r| r.value().clone())
            .filter(|k| k.is_valid_at(now))
    }

    /// Record a wallet against a valid key.
    pub fn submit(&self, key: &str, wallet: Address, now: u64) -> Result<SubmittedAddress, StoreError> {
        let claim = self.lookup_key(key, now).ok_or(StoreError::InvalidKey)?;
        let wallet_address = wallet.to_string();

        let row = {
            let mut rows = self.rows.entry(claim.event_id.clone()).or_default();
            if rows
                .iter()
                .any(|r| r.wallet_address.parse::<Address>().ok() == Some(wallet))
            {
                return Err(StoreError::Duplicate);
            }

            let row = SubmittedAddress {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                wallet_address,
                event_id: claim.event_id.clone(),
                timestamp: Utc::now(),
                mint_status: MintStatus::Pending,
            };
            rows.push(row.clone());
            row
        };

        metrics::record_registry_rows(self.row_count());
        self.persist();
        Ok(row)
    }

    /// Rows for an event in submission order.
    pub fn list(&self, event_id: &str) -> Vec<SubmittedAddress> {
        self.rows
            .get(event_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Claim the right to mint for a row.
    pub fn begin_mint(&self, event_id: &str, wallet: Address) -> Result<(), StoreError> {
        let rows = self.rows.get(event_id).ok_or(StoreError::NotFound)?;
        let row = rows
            .iter()
            .find(|r| r.wallet_address.parse::<Address>().ok() == Some(wallet))
            .ok_or(StoreError::NotFound)?;

        if row.mint_status.is_minted() {
            return Err(StoreError::AlreadyMinted);
        }
        if !self.minting.insert((event_id.to_string(), wallet)) {
            return Err(StoreError::MintInProgress);
        }
        Ok(())
    }

    /// Record the outcome of a mint started with [`begin_mint`](Self::begin_mint).
    pub fn finish_mint(&self, event_id: &str, wallet: Address, outcome: Result<String, String>) {
        if let Some(mut rows) = self.rows.get_mut(event_id) {
            if let Some(row) = rows
                .iter_mut()
                .find(|r| r.wallet_address.parse::<Address>().ok() == Some(wallet))
            {
                row.mint_status = match outcome {
                    Ok(tx_hash) => MintStatus::Minted { tx_hash },
                    Err(reason) => MintStatus::MintFailed { reason },
                };
            }
        }
        self.minting.remove(&(event_id.to_string(), wallet));
        self.persist();
    }

    pub fn row_count(&self) -> usize {
        self.rows.iter().map(|r| r.value().len()).sum()
    }
}
