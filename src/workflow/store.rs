//! Admin-side view of submitted addresses, keyed by event.
//!
//! The list is replaced wholesale on every (re)entry and invalidated on
//! navigation. Between reloads only the admin workflow's own mints touch it,
//! and only the status of the row being minted changes. Outstanding mints
//! are tracked apart from the cached lists, so leaving an event never
//! releases a row lock.

use dashmap::{DashMap, DashSet};
use std::sync::Arc;

use crate::error::DashboardError;
use crate::registry::types::{EventId, MintStatus, SubmittedAddress};

/// One row plus its local UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub row: SubmittedAddress,
    /// A mint for this row is outstanding.
    pub in_flight: bool,
    /// Message from the last failed mint, shown inline.
    pub last_error: Option<String>,
}

impl RowView {
    fn new(row: SubmittedAddress) -> Self {
        Self {
            row,
            in_flight: false,
            last_error: None,
        }
    }

    /// Whether the mint action is enabled for this row.
    pub fn can_mint(&self) -> bool {
        !self.in_flight && !self.row.mint_status.is_minted()
    }
}

fn same_wallet(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn lock_key(event_id: &str, wallet: &str) -> (EventId, String) {
    (event_id.to_string(), wallet.trim().to_ascii_lowercase())
}

/// Shared store of loaded submission lists.
#[derive(Debug, Clone, Default)]
pub struct SubmissionStore {
    events: Arc<DashMap<EventId, Vec<RowView>>>,
    /// `(event, lowercased wallet)` pairs with a mint outstanding.
    in_flight: Arc<DashSet<(EventId, String)>>,
}

impl SubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly fetched list. Rows with a mint still outstanding
    /// keep their in-flight flag.
    pub fn replace(&self, event_id: &str, rows: Vec<SubmittedAddress>) {
        let views = rows
            .into_iter()
            .map(|row| RowView {
                in_flight: self.is_in_flight(event_id, &row.wallet_address),
                ..RowView::new(row)
            })
            .collect();
        self.events.insert(event_id.to_string(), views);
    }

    fn is_in_flight(&self, event_id: &str, wallet: &str) -> bool {
        self.in_flight.contains(&lock_key(event_id, wallet))
    }

    /// Drop the cached list for an event.
    pub fn invalidate(&self, event_id: &str) {
        self.events.remove(event_id);
    }

    pub fn is_loaded(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id)
    }

    pub fn rows(&self, event_id: &str) -> Vec<RowView> {
        self.events
            .get(event_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn row(&self, event_id: &str, wallet: &str) -> Option<RowView> {
        self.events
            .get(event_id)?
            .iter()
            .find(|v| same_wallet(&v.row.wallet_address, wallet))
            .cloned()
    }

    /// Set the row's in-flight flag if its mint action is enabled.
    pub fn begin_mint(&self, event_id: &str, wallet: &str) -> Result<(), DashboardError> {
        let mut rows = self
            .events
            .get_mut(event_id)
            .ok_or_else(|| DashboardError::MintFailed("submissions not loaded".to_string()))?;
        let view = rows
            .iter_mut()
            .find(|v| same_wallet(&v.row.wallet_address, wallet))
            .ok_or_else(|| DashboardError::MintFailed(format!("{} has not submitted", wallet)))?;

        if view.row.mint_status.is_minted() {
            return Err(DashboardError::MintFailed(
                "POAP already minted for this wallet".to_string(),
            ));
        }
        if !self.in_flight.insert(lock_key(event_id, wallet)) {
            return Err(DashboardError::MintInProgress(wallet.to_string()));
        }

        view.in_flight = true;
        view.last_error = None;
        Ok(())
    }

    /// Apply a mint outcome to exactly one row. The lock is released even if
    /// the list was invalidated meanwhile.
    pub fn finish_mint(&self, event_id: &str, wallet: &str, outcome: Result<&str, &DashboardError>) {
        self.in_flight.remove(&lock_key(event_id, wallet));
        let Some(mut rows) = self.events.get_mut(event_id) else {
            return;
        };
        if let Some(view) = rows
            .iter_mut()
            .find(|v| same_wallet(&v.row.wallet_address, wallet))
        {
            view.in_flight = false;
            match outcome {
                Ok(tx_hash) => {
                    view.row.mint_status = MintStatus::Minted {
                        tx_hash: tx_hash.to_string(),
                    };
                    view.last_error = None;
                }
                Err(err) => view.last_error = Some(err.status_message()),
            }
        }
    }
}
