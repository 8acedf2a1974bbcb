//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment / wallet bridge
//!     → wallet.rs (local key loading)
//!     → connector.rs (accounts, chain check, signing provider)
//!     → contract.rs (typed badge contract calls)
//!     → minter.rs (template badge mint + confirmation)
//!     → client.rs (read-only RPC with timeouts and failover)
//!     → transaction.rs (confirmation wait)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod connector;
pub mod contract;
pub mod minter;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use connector::{
    Connection, ConnectionState, LocalWalletProvider, RpcWalletProvider, WalletConnector,
    WalletProvider,
};
pub use contract::{AlloyGateway, AttachSigner, ContractGateway};
pub use minter::BadgeMinter;
pub use types::{
    BadgeMint, BlockchainError, BlockchainResult, ChainId, ConfirmationStatus, MintReceipt,
    OwnedToken,
};
pub use wallet::Wallet;
