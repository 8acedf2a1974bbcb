//! Registry wire format and domain rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an event, supplied by the organizer.
pub type EventId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateClaimLinkRequest {
    pub event_id: EventId,
    pub expiry_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateClaimLinkResponse {
    pub claim_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateKeyRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidateKeyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Key expiry (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAddressRequest {
    pub key: String,
    pub wallet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAddressResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAddressesQuery {
    #[serde(rename = "eventKey")]
    pub event_key: EventId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubmittedAddressesResponse {
    #[serde(default)]
    pub addresses: Vec<SubmittedAddressRecord>,
}

/// One row as it travels over the wire. Older backends send only
/// `wallet` (or `wallet_address`) and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmittedAddressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "wallet_address", alias = "wallet")]
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mint_status: MintStatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MintStatusKind {
    #[default]
    Pending,
    Minted,
    MintFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintPoapRequest {
    pub wallet: String,
    #[serde(rename = "eventKey")]
    pub event_key: EventId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintPoapResponse {
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Mint progress of a submitted address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintStatus {
    Pending,
    Minted { tx_hash: String },
    MintFailed { reason: String },
}

impl MintStatus {
    pub fn is_minted(&self) -> bool {
        matches!(self, Self::Minted { .. })
    }
}

/// Append-only registry row. Only `mint_status` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAddress {
    pub id: u64,
    pub wallet_address: String,
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub mint_status: MintStatus,
}

impl SubmittedAddress {
    /// Build a row from its wire form. `index` stands in for a missing id.
    pub fn from_record(record: SubmittedAddressRecord, event_id: &str, index: usize) -> Self {
        let mint_status = match record.mint_status {
            MintStatusKind::Pending => MintStatus::Pending,
            MintStatusKind::Minted => MintStatus::Minted {
                tx_hash: record.tx_hash.unwrap_or_default(),
            },
            MintStatusKind::MintFailed => MintStatus::MintFailed {
                reason: record.error.unwrap_or_default(),
            },
        };

        Self {
            id: record.id.unwrap_or(index as u64),
            wallet_address: record.wallet_address,
            event_id: record.event_id.unwrap_or_else(|| event_id.to_string()),
            timestamp: record.timestamp,
            mint_status,
        }
    }

    pub fn to_record(&self) -> SubmittedAddressRecord {
        let (mint_status, tx_hash, error) = match &self.mint_status {
            MintStatus::Pending => (MintStatusKind::Pending, None, None),
            MintStatus::Minted { tx_hash } => (MintStatusKind::Minted, Some(tx_hash.clone()), None),
            MintStatus::MintFailed { reason } => {
                (MintStatusKind::MintFailed, None, Some(reason.clone()))
            }
        };

        SubmittedAddressRecord {
            id: Some(self.id),
            wallet_address: self.wallet_address.clone(),
            event_id: Some(self.event_id.clone()),
            timestamp: self.timestamp,
            mint_status,
            tx_hash,
            error,
        }
    }
}

/// Outcome of a claim key check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValidation {
    pub valid: bool,
    pub event_id: Option<EventId>,
    pub expires_at: Option<u64>,
}

impl From<ValidateKeyResponse> for KeyValidation {
    fn from(resp: ValidateKeyResponse) -> Self {
        Self {
            valid: resp.success,
            event_id: resp.event_id,
            expires_at: resp.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_row_with_wallet_field() {
        let resp: SubmittedAddressesResponse = serde_json::from_str(
            r#"{"addresses":[{"wallet":"0xABC","timestamp":"2025-03-01T10:00:00Z"}]}"#,
        )
        .unwrap();

        let row = SubmittedAddress::from_record(resp.addresses[0].clone(), "evt1", 0);
        assert_eq!(row.wallet_address, "0xABC");
        assert_eq!(row.event_id, "evt1");
        assert_eq!(row.id, 0);
        assert_eq!(row.mint_status, MintStatus::Pending);
    }

    #[test]
    fn test_row_with_wallet_address_and_status() {
        let record: SubmittedAddressRecord = serde_json::from_str(
            r#"{"id":7,"wallet_address":"0xDEF","timestamp":"2025-03-01T10:00:00Z",
                "mint_status":"minted","tx_hash":"0xdeadbeef"}"#,
        )
        .unwrap();

        let row = SubmittedAddress::from_record(record, "evt1", 3);
        assert_eq!(row.id, 7);
        assert_eq!(
            row.mint_status,
            MintStatus::Minted { tx_hash: "0xdeadbeef".into() }
        );
        assert!(row.mint_status.is_minted());
    }

    #[test]
    fn test_missing_addresses_field() {
        let resp: SubmittedAddressesResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.addresses.is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(MintPoapRequest {
            wallet: "0xABC".into(),
            event_key: "evt1".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"wallet": "0xABC", "eventKey": "evt1"}));

        let resp: MintPoapResponse = serde_json::from_str(r#"{"txHash":"0xdeadbeef"}"#).unwrap();
        assert_eq!(resp.tx_hash, "0xdeadbeef");

        let resp: ValidateKeyResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(KeyValidation::from(resp).valid, false);
    }
}
