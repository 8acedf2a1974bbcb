//! Workflow-level error taxonomy.
//!
//! Every workflow converts lower-layer failures into a [`DashboardError`] and
//! records its [`status_message`](DashboardError::status_message) for display.
//! None of these errors is fatal; the caller stays interactive.

use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::metadata::MetadataError;
use crate::registry::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// No wallet provider is reachable.
    #[error("no wallet provider available")]
    NoWalletProvider,

    /// The wallet is on a different chain than the configured one.
    #[error("wrong network: expected chain {expected}, got {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    /// The user declined the wallet request.
    #[error("request rejected by user")]
    UserRejected,

    /// Claim key is unknown, malformed or expired.
    #[error("invalid or expired claim key")]
    InvalidOrExpiredKey,

    /// The registry refused a wallet submission (malformed or duplicate).
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Contract revert or backend mint error.
    #[error("mint failed: {0}")]
    MintFailed(String),

    /// Timeout or connection failure.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A write was attempted without a connected signer.
    #[error("wallet not connected")]
    NotConnected,

    /// An action for the same entity is still outstanding.
    #[error("action already in progress for {0}")]
    MintInProgress(String),

    /// A required form field was empty.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// The collaborator answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl DashboardError {
    /// User-facing status line for this error.
    pub fn status_message(&self) -> String {
        match self {
            Self::NoWalletProvider => "🦊 Please install MetaMask".to_string(),
            Self::WrongNetwork { expected, .. } => {
                format!("⚠️ Please switch to the configured network (ID {})", expected)
            }
            Self::UserRejected => "❌ Request rejected in wallet".to_string(),
            Self::InvalidOrExpiredKey => "Invalid or expired key".to_string(),
            Self::SubmissionRejected(reason) => format!("❌ {}", reason),
            Self::MintFailed(reason) => format!("❌ Mint failed: {}", reason),
            Self::NetworkUnavailable(reason) => format!("❌ Network error: {}", reason),
            Self::NotConnected => "Connect your wallet".to_string(),
            Self::MintInProgress(entity) => format!("⏳ Already processing {}", entity),
            Self::MissingInput(what) => what.to_string(),
            Self::UnexpectedResponse(reason) => format!("❌ {}", reason),
        }
    }
}

impl From<BlockchainError> for DashboardError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::NoProvider(_) => Self::NoWalletProvider,
            BlockchainError::UserRejected => Self::UserRejected,
            BlockchainError::ChainMismatch { expected, actual } => {
                Self::WrongNetwork { expected, actual }
            }
            BlockchainError::NotConnected => Self::NotConnected,
            BlockchainError::Timeout(_) | BlockchainError::Rpc(_) => {
                Self::NetworkUnavailable(err.to_string())
            }
            other => Self::MintFailed(other.to_string()),
        }
    }
}

impl From<MetadataError> for DashboardError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Network(_) | MetadataError::Status { .. } => {
                Self::NetworkUnavailable(err.to_string())
            }
            other => Self::UnexpectedResponse(other.to_string()),
        }
    }
}

impl DashboardError {
    /// Map a registry error raised by a submission call.
    pub fn from_submission(err: RegistryError) -> Self {
        match err {
            RegistryError::Status { message, .. } => Self::SubmissionRejected(message),
            other => Self::from_transport(other),
        }
    }

    /// Map a registry error raised by a mint call.
    pub fn from_mint(err: RegistryError) -> Self {
        match err {
            RegistryError::Status { message, .. } => Self::MintFailed(message),
            other => Self::from_transport(other),
        }
    }

    /// Map a registry error with no operation-specific meaning.
    pub fn from_transport(err: RegistryError) -> Self {
        match err {
            RegistryError::Network(msg) => Self::NetworkUnavailable(msg),
            RegistryError::Status { status, message } => {
                Self::UnexpectedResponse(format!("{} ({})", message, status))
            }
            RegistryError::Decode(msg) | RegistryError::InvalidUrl(msg) => {
                Self::UnexpectedResponse(msg)
            }
        }
    }
}
