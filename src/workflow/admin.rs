//! Organizer workflow: list submissions for an event and mint per row.

use tokio::sync::watch;

use crate::blockchain::types::MintReceipt;
use crate::error::DashboardError;
use crate::observability::metrics;
use crate::registry::client::RegistryApi;
use crate::workflow::minter::MintExecutor;
use crate::workflow::store::{RowView, SubmissionStore};

pub struct AdminMintWorkflow<R, M> {
    registry: R,
    minter: M,
    store: SubmissionStore,
    explorer_tx_url: String,
    status: watch::Sender<String>,
}

impl<R: RegistryApi, M: MintExecutor> AdminMintWorkflow<R, M> {
    pub fn new(registry: R, minter: M, store: SubmissionStore, explorer_tx_url: &str) -> Self {
        let (status, _) = watch::channel(String::new());
        Self {
            registry,
            minter,
            store,
            explorer_tx_url: explorer_tx_url.to_string(),
            status,
        }
    }

    /// Latest status line.
    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    fn set_status(&self, message: impl Into<String>) {
        self.status.send_replace(message.into());
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    /// Load the full list for an event. Called on every (re)entry.
    pub async fn enter(&self, event_id: &str) -> Result<Vec<RowView>, DashboardError> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            let err = DashboardError::MissingInput("Enter an event key");
            self.set_status(err.status_message());
            return Err(err);
        }

        self.set_status("🔄 Fetching submitted addresses...");
        match self.registry.list_submitted(event_id).await {
            Ok(rows) => {
                let count = rows.len();
                self.store.replace(event_id, rows);
                tracing::info!(event_id = %event_id, rows = count, "Loaded submissions");
                self.set_status(format!("✅ Loaded {} submissions.", count));
                Ok(self.store.rows(event_id))
            }
            Err(e) => {
                tracing::warn!(event_id = %event_id, error = %e, "Failed to load submissions");
                self.set_status("❌ Failed to load submitted addresses.");
                Err(DashboardError::from_transport(e))
            }
        }
    }

    /// Forget the event's list when navigating away.
    pub fn leave(&self, event_id: &str) {
        self.store.invalidate(event_id.trim());
    }

    pub fn rows(&self, event_id: &str) -> Vec<RowView> {
        self.store.rows(event_id.trim())
    }

    /// Mint for one row. The row stays locked until the call resolves.
    pub async fn mint(&self, event_id: &str, wallet: &str) -> Result<MintReceipt, DashboardError> {
        let event_id = event_id.trim();
        let wallet = wallet.trim();

        if !self.store.is_loaded(event_id) {
            let err = DashboardError::MissingInput("Load the submitted addresses first");
            self.set_status(err.status_message());
            return Err(err);
        }
        if let Err(err) = self.store.begin_mint(event_id, wallet) {
            self.set_status(err.status_message());
            return Err(err);
        }

        self.set_status(format!("⏳ Minting POAP for {}...", wallet));
        match self.minter.mint(wallet, event_id).await {
            Ok(tx_hash) => {
                self.store.finish_mint(event_id, wallet, Ok(&tx_hash));
                metrics::record_mint("minted");
                tracing::info!(event_id = %event_id, wallet = %wallet, tx_hash = %tx_hash, "POAP minted");
                self.set_status(format!("✅ Successfully minted POAP! Tx: {}", tx_hash));
                Ok(MintReceipt {
                    wallet_address: wallet.to_string(),
                    event_id: event_id.to_string(),
                    transaction_hash: tx_hash,
                })
            }
            Err(err) => {
                self.store.finish_mint(event_id, wallet, Err(&err));
                metrics::record_mint("failed");
                tracing::warn!(event_id = %event_id, wallet = %wallet, error = %err, "Mint failed");
                self.set_status(err.status_message());
                Err(err)
            }
        }
    }

    pub fn explorer_url(&self, receipt: &MintReceipt) -> String {
        receipt.explorer_url(&self.explorer_tx_url)
    }

    /// Create a claim link for attendees of `event_id`.
    pub async fn generate_claim_link(
        &self,
        event_id: &str,
        expiry_minutes: u64,
    ) -> Result<String, DashboardError> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            let err = DashboardError::MissingInput("Enter an event key");
            self.set_status(err.status_message());
            return Err(err);
        }

        self.set_status("⏳ Generating claim link...");
        match self.registry.generate_claim_link(event_id, expiry_minutes).await {
            Ok(url) => {
                self.set_status("✅ Claim link generated!");
                Ok(url)
            }
            Err(e) => {
                let err = DashboardError::from_transport(e);
                self.set_status(format!(
                    "❌ Failed to generate claim link: {}",
                    err.status_message().trim_start_matches("❌ ")
                ));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::client::{RegistryError, RegistryResult};
    use crate::registry::types::{KeyValidation, MintStatus, SubmittedAddress};
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    struct FakeRegistry {
        rows: Mutex<RegistryResult<Vec<SubmittedAddress>>>,
    }

    impl FakeRegistry {
        fn with_wallets(wallets: &[&str]) -> Self {
            let rows = wallets
                .iter()
                .enumerate()
                .map(|(i, w)| SubmittedAddress {
                    id: i as u64,
                    wallet_address: w.to_string(),
                    event_id: "evt1".into(),
                    timestamp: Utc::now(),
                    mint_status: MintStatus::Pending,
                })
                .collect();
            Self {
                rows: Mutex::new(Ok(rows)),
            }
        }
    }

    impl RegistryApi for FakeRegistry {
        async fn generate_claim_link(&self, _: &str, _: u64) -> RegistryResult<String> {
            Ok("http://localhost:3000/claim?key=abc".into())
        }
        async fn validate_key(&self, _: &str) -> RegistryResult<KeyValidation> {
            unimplemented!()
        }
        async fn submit_address(&self, _: &str, _: &str) -> RegistryResult<()> {
            unimplemented!()
        }
        async fn list_submitted(&self, _: &str) -> RegistryResult<Vec<SubmittedAddress>> {
            self.rows.lock().unwrap().clone()
        }
        async fn mint_poap(&self, _: &str, _: &str) -> RegistryResult<String> {
            unimplemented!()
        }
    }

    struct FakeMinter {
        result: Result<String, DashboardError>,
    }

    impl MintExecutor for FakeMinter {
        async fn mint(&self, _: &str, _: &str) -> Result<String, DashboardError> {
            self.result.clone()
        }
    }

    /// Holds every mint open until the gate is opened.
    struct GatedMinter {
        gate: Arc<Notify>,
    }

    impl MintExecutor for GatedMinter {
        async fn mint(&self, _: &str, _: &str) -> Result<String, DashboardError> {
            self.gate.notified().await;
            Ok("0xdeadbeef".into())
        }
    }

    fn workflow(minted: Result<String, DashboardError>) -> AdminMintWorkflow<FakeRegistry, FakeMinter> {
        AdminMintWorkflow::new(
            FakeRegistry::with_wallets(&["0xABC", "0xDEF"]),
            FakeMinter { result: minted },
            SubmissionStore::new(),
            "https://explorer.test/tx/",
        )
    }

    #[tokio::test]
    async fn test_enter_loads_rows() {
        let wf = workflow(Ok("0xdeadbeef".into()));
        let rows = wf.enter("evt1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(wf.status(), "✅ Loaded 2 submissions.");
    }

    #[tokio::test]
    async fn test_enter_failure_status() {
        let wf = workflow(Ok("0xdeadbeef".into()));
        *wf.registry.rows.lock().unwrap() = Err(RegistryError::Network("refused".into()));

        assert!(matches!(
            wf.enter("evt1").await,
            Err(DashboardError::NetworkUnavailable(_))
        ));
        assert_eq!(wf.status(), "❌ Failed to load submitted addresses.");
    }

    #[tokio::test]
    async fn test_mint_updates_only_that_row() {
        let wf = workflow(Ok("0xdeadbeef".into()));
        wf.enter("evt1").await.unwrap();

        let receipt = wf.mint("evt1", "0xABC").await.unwrap();
        assert_eq!(receipt.transaction_hash, "0xdeadbeef");
        assert_eq!(wf.explorer_url(&receipt), "https://explorer.test/tx/0xdeadbeef");
        assert_eq!(wf.status(), "✅ Successfully minted POAP! Tx: 0xdeadbeef");

        let rows = wf.rows("evt1");
        assert_eq!(rows[0].row.mint_status, MintStatus::Minted { tx_hash: "0xdeadbeef".into() });
        assert_eq!(rows[1].row.mint_status, MintStatus::Pending);
        assert!(rows[1].can_mint());
    }

    #[tokio::test]
    async fn test_minted_row_rejects_second_mint() {
        let wf = workflow(Ok("0xdeadbeef".into()));
        wf.enter("evt1").await.unwrap();
        wf.mint("evt1", "0xABC").await.unwrap();

        assert!(matches!(
            wf.mint("evt1", "0xABC").await,
            Err(DashboardError::MintFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_mint_is_retryable() {
        let wf = workflow(Err(DashboardError::MintFailed("execution reverted".into())));
        wf.enter("evt1").await.unwrap();

        let err = wf.mint("evt1", "0xABC").await.unwrap_err();
        assert_eq!(err.status_message(), "❌ Mint failed: execution reverted");
        assert_eq!(wf.status(), "❌ Mint failed: execution reverted");
        assert!(wf.rows("evt1")[0].can_mint());
    }

    #[tokio::test]
    async fn test_leave_invalidates() {
        let wf = workflow(Ok("0xdeadbeef".into()));
        wf.enter("evt1").await.unwrap();
        wf.leave("evt1");
        assert!(wf.rows("evt1").is_empty());
        assert_eq!(
            wf.mint("evt1", "0xABC").await,
            Err(DashboardError::MissingInput("Load the submitted addresses first"))
        );
        assert_eq!(wf.status(), "Load the submitted addresses first");
    }

    #[tokio::test]
    async fn test_reentry_during_mint_keeps_row_locked() {
        let gate = Arc::new(Notify::new());
        let wf = AdminMintWorkflow::new(
            FakeRegistry::with_wallets(&["0xABC", "0xDEF"]),
            GatedMinter { gate: gate.clone() },
            SubmissionStore::new(),
            "",
        );
        wf.enter("evt1").await.unwrap();

        let outstanding = wf.mint("evt1", "0xABC");
        let navigate = async {
            wf.leave("evt1");
            wf.enter("evt1").await.unwrap();
            assert!(wf.rows("evt1")[0].in_flight);
            let second = wf.mint("evt1", "0xabc").await;
            gate.notify_one();
            second
        };
        let (first, second) = tokio::join!(outstanding, navigate);

        assert_eq!(first.unwrap().transaction_hash, "0xdeadbeef");
        assert_eq!(second, Err(DashboardError::MintInProgress("0xabc".into())));
        assert!(wf.rows("evt1")[0].row.mint_status.is_minted());
    }

    #[tokio::test]
    async fn test_generate_claim_link() {
        let wf = workflow(Ok("0xdeadbeef".into()));
        let url = wf.generate_claim_link("evt1", 60).await.unwrap();
        assert!(url.contains("/claim?key="));
        assert_eq!(wf.status(), "✅ Claim link generated!");

        assert_eq!(
            wf.generate_claim_link("  ", 60).await,
            Err(DashboardError::MissingInput("Enter an event key"))
        );
    }
}
