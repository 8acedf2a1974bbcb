//! Wallet connection state machine.
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                           → Rejected
//!                           → WrongNetwork
//!                           → NoProvider
//! ```
//!
//! Only `Connected` hands out a signing provider, so no transaction can be
//! sent against a chain other than the configured one.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::blockchain::types::{map_transport_error, BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;
use crate::error::DashboardError;

/// Source of a signing identity (an injected-style wallet).
pub trait WalletProvider: Send + Sync {
    /// Ask for the wallet's accounts, prompting the user if needed.
    fn request_accounts(&self) -> impl Future<Output = BlockchainResult<Vec<Address>>> + Send;

    /// Chain the wallet is currently on.
    fn chain_id(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Provider able to sign and send transactions for the wallet's account.
    fn signing_provider(&self) -> BlockchainResult<DynProvider>;
}

/// Wallet backed by a private key from the environment.
pub struct LocalWalletProvider {
    wallet: Option<Wallet>,
    rpc_url: url::Url,
    timeout_duration: Duration,
}

impl LocalWalletProvider {
    pub fn new(wallet: Option<Wallet>, rpc_url: url::Url, timeout_duration: Duration) -> Self {
        Self {
            wallet,
            rpc_url,
            timeout_duration,
        }
    }

    /// Load `POAP_WALLET_PRIVATE_KEY`; a missing key behaves like a missing extension.
    pub fn from_env(chain_id: u64, rpc_url: url::Url, timeout_duration: Duration) -> Self {
        let wallet = match Wallet::from_env(chain_id) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::debug!(error = %e, "No local wallet key available");
                None
            }
        };
        Self::new(wallet, rpc_url, timeout_duration)
    }

    fn wallet(&self) -> BlockchainResult<&Wallet> {
        self.wallet
            .as_ref()
            .ok_or_else(|| BlockchainError::NoProvider("no private key configured".to_string()))
    }
}

impl WalletProvider for LocalWalletProvider {
    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>> {
        Ok(vec![self.wallet()?.address()])
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        match timeout(self.timeout_duration, provider.get_chain_id()).await {
            Ok(result) => result.map_err(|e| map_transport_error(e, false)),
            Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
        }
    }

    fn signing_provider(&self) -> BlockchainResult<DynProvider> {
        let wallet = self.wallet()?;
        Ok(ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_http(self.rpc_url.clone())
            .erased())
    }
}

/// External wallet speaking EIP-1193 over JSON-RPC (e.g. a desktop wallet bridge).
pub struct RpcWalletProvider {
    provider: DynProvider,
    timeout_duration: Duration,
}

impl RpcWalletProvider {
    pub fn new(wallet_url: url::Url, timeout_duration: Duration) -> Self {
        Self {
            provider: ProviderBuilder::new().connect_http(wallet_url).erased(),
            timeout_duration,
        }
    }
}

impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>> {
        // The user may take a while to approve the prompt; no timeout here.
        self.provider
            .raw_request::<_, Vec<Address>>(
                "eth_requestAccounts".into(),
                Vec::<serde_json::Value>::new(),
            )
            .await
            .map_err(|e| map_transport_error(e, true))
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        match timeout(self.timeout_duration, self.provider.get_chain_id()).await {
            Ok(result) => result.map_err(|e| map_transport_error(e, true)),
            Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
        }
    }

    fn signing_provider(&self) -> BlockchainResult<DynProvider> {
        // The external wallet signs `eth_sendTransaction` itself.
        Ok(self.provider.clone())
    }
}

/// An established wallet connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub address: Address,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Connection),
    Rejected,
    WrongNetwork {
        expected: u64,
        actual: u64,
    },
    NoProvider,
}

impl ConnectionState {
    pub fn status_message(&self) -> String {
        match self {
            Self::Disconnected => "Not connected".to_string(),
            Self::Connecting => "🔌 Connecting wallet...".to_string(),
            Self::Connected(_) => "✅ Connected successfully".to_string(),
            Self::Rejected => DashboardError::UserRejected.status_message(),
            Self::WrongNetwork { expected, actual } => DashboardError::WrongNetwork {
                expected: *expected,
                actual: *actual,
            }
            .status_message(),
            Self::NoProvider => DashboardError::NoWalletProvider.status_message(),
        }
    }
}

/// Drives a [`WalletProvider`] through the connection states.
pub struct WalletConnector<W> {
    provider: W,
    expected_chain_id: u64,
    state: watch::Sender<ConnectionState>,
}

impl<W: WalletProvider> WalletConnector<W> {
    pub fn new(provider: W, expected_chain_id: u64) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            provider,
            expected_chain_id,
            state,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn connection(&self) -> Option<Connection> {
        match &*self.state.borrow() {
            ConnectionState::Connected(c) => Some(c.clone()),
            _ => None,
        }
    }

    /// Request accounts and check the network.
    pub async fn connect(&self) -> Result<Connection, DashboardError> {
        let started = self.state.send_if_modified(|s| {
            if *s == ConnectionState::Connecting {
                false
            } else {
                *s = ConnectionState::Connecting;
                true
            }
        });
        if !started {
            return Err(DashboardError::MintInProgress("wallet connection".to_string()));
        }

        match self.try_connect().await {
            Ok(connection) => {
                tracing::info!(
                    address = %connection.address,
                    chain_id = connection.chain_id,
                    "Wallet connected"
                );
                self.state.send_replace(ConnectionState::Connected(connection.clone()));
                Ok(connection)
            }
            Err(err) => {
                let next = match &err {
                    DashboardError::UserRejected => ConnectionState::Rejected,
                    DashboardError::NoWalletProvider => ConnectionState::NoProvider,
                    DashboardError::WrongNetwork { expected, actual } => {
                        ConnectionState::WrongNetwork {
                            expected: *expected,
                            actual: *actual,
                        }
                    }
                    _ => ConnectionState::Disconnected,
                };
                tracing::warn!(error = %err, "Wallet connection failed");
                self.state.send_replace(next);
                Err(err)
            }
        }
    }

    async fn try_connect(&self) -> Result<Connection, DashboardError> {
        let accounts = self.provider.request_accounts().await?;
        let address = *accounts.first().ok_or(DashboardError::UserRejected)?;

        let chain_id = self.provider.chain_id().await?;
        if chain_id != self.expected_chain_id {
            return Err(DashboardError::WrongNetwork {
                expected: self.expected_chain_id,
                actual: chain_id,
            });
        }

        Ok(Connection { address, chain_id })
    }

    /// Signing provider for the connected account.
    pub fn signer(&self) -> Result<(DynProvider, Address), DashboardError> {
        let connection = self.connection().ok_or(DashboardError::NotConnected)?;
        let provider = self.provider.signing_provider()?;
        Ok((provider, connection.address))
    }

    pub fn disconnect(&self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
