//! Chain-specific types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use alloy::transports::TransportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0} seconds")]
    ConfirmationTimeout(u64),

    /// Transaction was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// No wallet provider could be reached.
    #[error("No wallet provider: {0}")]
    NoProvider(String),

    /// The wallet user declined the request (EIP-1193 code 4001).
    #[error("User rejected the request")]
    UserRejected,

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A write call was made before a signer was attached.
    #[error("No signer connected")]
    NotConnected,

    /// Malformed address or contract configuration.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// EIP-1193 "user rejected request" error code.
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC code used by nodes for execution reverts.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Classify a JSON-RPC failure.
///
/// Connection-level failures map to `NoProvider` only when `unreachable_is_missing`
/// is set, which is the case for calls made against a wallet endpoint.
pub fn map_transport_error(err: TransportError, unreachable_is_missing: bool) -> BlockchainError {
    if let Some(payload) = err.as_error_resp() {
        return match payload.code {
            USER_REJECTED_CODE => BlockchainError::UserRejected,
            EXECUTION_REVERTED_CODE => BlockchainError::Reverted(payload.message.to_string()),
            _ if payload.message.contains("revert") => {
                BlockchainError::Reverted(payload.message.to_string())
            }
            _ => BlockchainError::Rpc(payload.message.to_string()),
        };
    }
    if unreachable_is_missing && err.is_transport_error() {
        return BlockchainError::NoProvider(err.to_string());
    }
    BlockchainError::Rpc(err.to_string())
}

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
    /// Transaction was mined but reverted.
    Failed(String),
}

/// Arguments of a `mintBadge` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeMint {
    pub recipient: Address,
    pub token_uri: String,
    pub event_title: String,
    pub role: String,
    /// Badge expiry (unix seconds).
    pub expiry: u64,
}

/// Result of a successful on-chain mint. Displayed, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub wallet_address: String,
    pub event_id: String,
    pub transaction_hash: String,
}

impl MintReceipt {
    /// Explorer link for the transaction.
    pub fn explorer_url(&self, explorer_tx_url: &str) -> String {
        format!("{}{}", explorer_tx_url, self.transaction_hash)
    }
}

/// A token held by an owner, as enumerated from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedToken {
    pub token_id: U256,
    pub token_uri: String,
}

/// Format a transaction hash the way the wire format carries it.
pub fn tx_hash_string(hash: TxHash) -> String {
    format!("{:#x}", hash)
}
