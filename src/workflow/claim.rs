//! Attendee workflow: claim link → key check → wallet submission.
//!
//! ```text
//! MissingKey
//! Idle → Validating → Invalid | Failed
//!                   → Ready ⇄ Submitting → Submitted
//! ```
//!
//! `Invalid`, `Failed` and `Submitted` are terminal. The key is validated at
//! most once; a failed submission returns to `Ready` so the attendee can fix
//! the address and click again.

use tokio::sync::watch;

use crate::error::DashboardError;
use crate::observability::metrics;
use crate::registry::client::{RegistryApi, RegistryError};
use crate::registry::types::EventId;

pub const SUBMITTED_MESSAGE: &str = "✅ Wallet submitted! You will be minted shortly.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    /// The link carried no key.
    MissingKey,
    /// Key present, not yet checked.
    Idle,
    Validating,
    /// The registry rejected the key.
    Invalid,
    /// The key could not be checked.
    Failed(DashboardError),
    Ready {
        event_id: Option<EventId>,
        expires_at: Option<u64>,
    },
    Submitting,
    Submitted,
}

pub struct ClaimWorkflow<R> {
    registry: R,
    key: Option<String>,
    state: watch::Sender<ClaimState>,
    status: watch::Sender<String>,
}

impl<R: RegistryApi> ClaimWorkflow<R> {
    pub fn new(registry: R, key: Option<&str>) -> Self {
        let key = key.map(str::trim).filter(|k| !k.is_empty()).map(String::from);
        let (initial, message) = match key {
            Some(_) => (ClaimState::Idle, ""),
            None => (ClaimState::MissingKey, "Invalid or missing claim key"),
        };
        let (state, _) = watch::channel(initial);
        let (status, _) = watch::channel(message.to_string());

        Self {
            registry,
            key,
            state,
            status,
        }
    }

    pub fn state(&self) -> ClaimState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClaimState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    /// The wallet form is shown and clickable.
    pub fn form_enabled(&self) -> bool {
        matches!(*self.state.borrow(), ClaimState::Ready { .. })
    }

    fn set(&self, state: ClaimState, status: impl Into<String>) {
        self.state.send_replace(state);
        self.status.send_replace(status.into());
    }

    /// Check the key. Only the first call reaches the registry; later calls
    /// return the current state.
    pub async fn open(&self) -> ClaimState {
        let started = self.state.send_if_modified(|s| {
            if *s == ClaimState::Idle {
                *s = ClaimState::Validating;
                true
            } else {
                false
            }
        });
        let Some(key) = self.key.as_deref().filter(|_| started) else {
            return self.state();
        };

        match self.registry.validate_key(key).await {
            Ok(validation) if validation.valid => {
                metrics::record_key_validation(true);
                tracing::info!(event_id = ?validation.event_id, "Claim key accepted");
                self.set(
                    ClaimState::Ready {
                        event_id: validation.event_id,
                        expires_at: validation.expires_at,
                    },
                    "",
                );
            }
            Ok(_) => {
                metrics::record_key_validation(false);
                self.set(
                    ClaimState::Invalid,
                    DashboardError::InvalidOrExpiredKey.status_message(),
                );
            }
            Err(RegistryError::Status { message, .. }) => {
                metrics::record_key_validation(false);
                self.set(ClaimState::Invalid, message);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Claim key check failed");
                let err = DashboardError::from_transport(e);
                let message = err.status_message();
                self.set(ClaimState::Failed(err), message);
            }
        }
        self.state()
    }

    /// Submit a wallet for the validated key. One request per click; the
    /// form is disabled while it is outstanding.
    pub async fn submit(&self, wallet: &str) -> Result<(), DashboardError> {
        let wallet = wallet.trim();
        let key = self.key.clone().ok_or(DashboardError::InvalidOrExpiredKey)?;

        let mut previous = None;
        let started = self.state.send_if_modified(|s| match s {
            ClaimState::Ready { .. } if !wallet.is_empty() => {
                previous = Some(std::mem::replace(s, ClaimState::Submitting));
                true
            }
            _ => false,
        });

        if !started {
            let err = match self.state() {
                ClaimState::Ready { .. } => DashboardError::MissingInput("Enter your wallet address"),
                ClaimState::Submitting => DashboardError::MintInProgress("claim submission".to_string()),
                ClaimState::Submitted => {
                    DashboardError::SubmissionRejected("Wallet already submitted".to_string())
                }
                _ => DashboardError::InvalidOrExpiredKey,
            };
            if matches!(err, DashboardError::MissingInput(_)) {
                self.status.send_replace(err.status_message());
            }
            return Err(err);
        }

        match self.registry.submit_address(&key, wallet).await {
            Ok(()) => {
                metrics::record_submission("accepted");
                tracing::info!(wallet = %wallet, "Wallet submitted for claim");
                self.set(ClaimState::Submitted, SUBMITTED_MESSAGE);
                Ok(())
            }
            Err(e) => {
                metrics::record_submission("rejected");
                let err = DashboardError::from_submission(e);
                tracing::warn!(wallet = %wallet, error = %err, "Claim submission failed");
                let restored = previous.unwrap_or(ClaimState::Ready {
                    event_id: None,
                    expires_at: None,
                });
                self.set(restored, err.status_message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::client::RegistryResult;
    use crate::registry::types::{KeyValidation, SubmittedAddress};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeRegistry {
        valid: bool,
        reject_submit: Option<RegistryError>,
        validations: AtomicUsize,
        submissions: AtomicUsize,
    }

    impl RegistryApi for FakeRegistry {
        async fn generate_claim_link(&self, _: &str, _: u64) -> RegistryResult<String> {
            unimplemented!()
        }
        async fn validate_key(&self, _: &str) -> RegistryResult<KeyValidation> {
            self.validations.fetch_add(1, Ordering::SeqCst);
            Ok(KeyValidation {
                valid: self.valid,
                event_id: self.valid.then(|| "evt1".to_string()),
                expires_at: None,
            })
        }
        async fn submit_address(&self, _: &str, _: &str) -> RegistryResult<()> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            match &self.reject_submit {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
        async fn list_submitted(&self, _: &str) -> RegistryResult<Vec<SubmittedAddress>> {
            unimplemented!()
        }
        async fn mint_poap(&self, _: &str, _: &str) -> RegistryResult<String> {
            unimplemented!()
        }
    }

    fn valid_registry() -> FakeRegistry {
        FakeRegistry {
            valid: true,
            ..FakeRegistry::default()
        }
    }

    #[tokio::test]
    async fn test_missing_key() {
        let wf = ClaimWorkflow::new(valid_registry(), Some("  "));
        assert_eq!(wf.open().await, ClaimState::MissingKey);
        assert_eq!(wf.status(), "Invalid or missing claim key");
        assert_eq!(wf.registry.validations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_key_is_terminal() {
        let wf = ClaimWorkflow::new(FakeRegistry::default(), Some("xyz"));
        assert_eq!(wf.open().await, ClaimState::Invalid);
        assert_eq!(wf.status(), "Invalid or expired key");
        assert!(!wf.form_enabled());

        // Validation is never retried and nothing is submitted.
        wf.open().await;
        assert_eq!(wf.registry.validations.load(Ordering::SeqCst), 1);
        assert_eq!(wf.submit("0xABC").await, Err(DashboardError::InvalidOrExpiredKey));
        assert_eq!(wf.registry.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_success_disables_form() {
        let wf = ClaimWorkflow::new(valid_registry(), Some("valid123"));
        assert!(matches!(wf.open().await, ClaimState::Ready { .. }));
        assert!(wf.form_enabled());

        wf.submit("0xABC").await.unwrap();
        assert_eq!(wf.state(), ClaimState::Submitted);
        assert_eq!(wf.status(), SUBMITTED_MESSAGE);
        assert!(!wf.form_enabled());

        assert!(wf.submit("0xABC").await.is_err());
        assert_eq!(wf.registry.submissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_wallet_sends_nothing() {
        let wf = ClaimWorkflow::new(valid_registry(), Some("valid123"));
        wf.open().await;

        assert_eq!(
            wf.submit("   ").await,
            Err(DashboardError::MissingInput("Enter your wallet address"))
        );
        assert_eq!(wf.status(), "Enter your wallet address");
        assert!(wf.form_enabled());
        assert_eq!(wf.registry.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_submission_returns_to_ready() {
        let registry = FakeRegistry {
            reject_submit: Some(RegistryError::Status {
                status: 409,
                message: "Wallet already submitted for this event".into(),
            }),
            ..valid_registry()
        };
        let wf = ClaimWorkflow::new(registry, Some("valid123"));
        wf.open().await;

        let err = wf.submit("0xABC").await.unwrap_err();
        assert!(matches!(err, DashboardError::SubmissionRejected(_)));
        assert_eq!(wf.status(), "❌ Wallet already submitted for this event");
        assert_eq!(
            wf.state(),
            ClaimState::Ready { event_id: Some("evt1".into()), expires_at: None }
        );
    }
}
