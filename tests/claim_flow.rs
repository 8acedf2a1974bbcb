//! Attendee claim path against the reference registry and a legacy backend.

mod common;

use alloy::primitives::Address;
use common::{client_for, spawn_registry, start_programmable_backend};
use poap_dashboard::registry::store::now_secs;
use poap_dashboard::registry::{RegistryApi, RegistryError};
use poap_dashboard::workflow::claim::SUBMITTED_MESSAGE;
use poap_dashboard::workflow::{ClaimState, ClaimWorkflow};
use poap_dashboard::DashboardError;

const WALLET: &str = "0xAbC0000000000000000000000000000000000001";

#[tokio::test]
async fn test_unregistered_key_shows_invalid() {
    let registry = spawn_registry(None).await;
    let wf = ClaimWorkflow::new(registry.client(), Some("xyz"));

    assert_eq!(wf.open().await, ClaimState::Invalid);
    assert_eq!(wf.status(), "Invalid or expired key");
    assert!(!wf.form_enabled());
    registry.shutdown.trigger();
}

#[tokio::test]
async fn test_submit_then_duplicate() {
    let registry = spawn_registry(None).await;
    let claim = registry.store.create_key("evt1", 60, now_secs());

    let wf = ClaimWorkflow::new(registry.client(), Some(&claim.key));
    match wf.open().await {
        ClaimState::Ready { event_id, expires_at } => {
            assert_eq!(event_id.as_deref(), Some("evt1"));
            assert_eq!(expires_at, Some(claim.expires_at));
        }
        other => panic!("unexpected state {:?}", other),
    }

    wf.submit(WALLET).await.unwrap();
    assert_eq!(wf.status(), SUBMITTED_MESSAGE);
    assert!(!wf.form_enabled());

    // Same wallet through the same (reusable) link.
    let again = ClaimWorkflow::new(registry.client(), Some(&claim.key));
    again.open().await;
    let err = again.submit(&WALLET.to_lowercase()).await.unwrap_err();
    assert!(matches!(err, DashboardError::SubmissionRejected(_)));
    assert_eq!(again.status(), "❌ Wallet already submitted for this event");
    assert!(again.form_enabled());

    let rows = registry.store.list("evt1");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].wallet_address.parse::<Address>().unwrap(), WALLET.parse::<Address>().unwrap());
    registry.shutdown.trigger();
}

#[tokio::test]
async fn test_expired_key_creates_no_row() {
    let registry = spawn_registry(None).await;
    let claim = registry.store.create_key("evt1", 1, now_secs() - 120);

    let wf = ClaimWorkflow::new(registry.client(), Some(&claim.key));
    assert_eq!(wf.open().await, ClaimState::Invalid);

    // A direct submission is refused too.
    let err = registry.client().submit_address(&claim.key, WALLET).await.unwrap_err();
    assert!(matches!(err, RegistryError::Status { status: 400, .. }));
    assert_eq!(registry.store.row_count(), 0);
    registry.shutdown.trigger();
}

#[tokio::test]
async fn test_malformed_wallet_is_rejected_by_backend() {
    let registry = spawn_registry(None).await;
    let claim = registry.store.create_key("evt1", 60, now_secs());

    let wf = ClaimWorkflow::new(registry.client(), Some(&claim.key));
    wf.open().await;

    let err = wf.submit("not-a-wallet").await.unwrap_err();
    assert_eq!(err, DashboardError::SubmissionRejected("Invalid wallet address".into()));
    assert_eq!(wf.status(), "❌ Invalid wallet address");
    assert!(wf.form_enabled());
    assert_eq!(registry.store.row_count(), 0);
    registry.shutdown.trigger();
}

#[tokio::test]
async fn test_legacy_backend_without_event_details() {
    let addr = start_programmable_backend(|_method, path| async move {
        match path.as_str() {
            "/api/validate-key" => (200, r#"{"success":true}"#.to_string()),
            "/api/submit-address" => (200, r#"{"success":true}"#.to_string()),
            _ => (404, String::new()),
        }
    })
    .await;

    let wf = ClaimWorkflow::new(client_for(&format!("http://{}", addr), ""), Some("valid123"));
    assert_eq!(
        wf.open().await,
        ClaimState::Ready { event_id: None, expires_at: None }
    );

    wf.submit("0xABC").await.unwrap();
    assert_eq!(wf.status(), "✅ Wallet submitted! You will be minted shortly.");
    assert!(!wf.form_enabled());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let wf = ClaimWorkflow::new(client_for("http://127.0.0.1:1", ""), Some("valid123"));

    match wf.open().await {
        ClaimState::Failed(DashboardError::NetworkUnavailable(_)) => {}
        other => panic!("unexpected state {:?}", other),
    }
    assert!(wf.status().starts_with("❌ Network error"));
}
