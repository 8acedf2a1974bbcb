//! Read-only blockchain RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the configured JSON-RPC endpoints
//! - Serve read calls before any wallet is connected
//! - Handle timeouts and network errors gracefully

use alloy::primitives::TxHash;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig, ChainId};

/// Read-only RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    config: ChainConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new client. No request is made until the first call.
    pub fn new(config: ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(ProviderBuilder::new().connect_http(primary_url).erased());

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(ProviderBuilder::new().connect_http(url).erased());
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            providers = providers.len(),
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Run `call` against each provider in turn until one answers.
    pub async fn with_failover<T, E, F, Fut>(&self, what: &str, call: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, call = what, error = %e, "RPC error, trying next provider");
                    last_error = Some(BlockchainError::Rpc(format!("{}: {}", what, e)));
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, call = what, "RPC timeout, trying next provider");
                    last_error = Some(BlockchainError::Timeout(self.timeout_duration.as_secs()));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| BlockchainError::Rpc("All RPC providers failed".to_string())))
    }

    /// Verify the RPC endpoint serves the configured chain.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.with_failover("eth_getTransactionReceipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 2,
            ..ChainConfig::default()
        }
    }

    #[test]
    fn test_client_creation_is_lazy() {
        assert!(BlockchainClient::new(test_config()).is_ok());
    }

    #[test]
    fn test_invalid_rpc_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = BlockchainClient::new(config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausted() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        config.failover_urls.push("::bad::".to_string());

        let client = BlockchainClient::new(config).unwrap();
        assert_eq!(client.providers.len(), 2);

        let result = client.get_chain_id().await;
        assert!(result.is_err());
    }

    /// JSON-RPC endpoint that answers `eth_chainId` with `chain_id`.
    async fn start_chain_rpc(chain_id: u64) -> String {
        use axum::{routing::post, Json, Router};
        use serde_json::{json, Value};

        let app = Router::new().route(
            "/",
            post(move |Json(req): Json<Value>| async move {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": req["id"],
                    "result": format!("{:#x}", chain_id),
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_verify_chain_id() {
        let mut config = test_config();
        config.rpc_url = start_chain_rpc(31337).await;
        let client = BlockchainClient::new(config).unwrap();
        assert!(client.verify_chain_id().await.is_ok());

        let mut config = test_config();
        config.rpc_url = start_chain_rpc(1).await;
        let client = BlockchainClient::new(config).unwrap();
        assert!(matches!(
            client.verify_chain_id().await,
            Err(BlockchainError::ChainMismatch {
                expected: 31337,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_failover_reaches_second_provider() {
        let mut config = test_config();
        config.failover_urls.push(start_chain_rpc(31337).await);

        let client = BlockchainClient::new(config).unwrap();
        assert_eq!(client.get_chain_id().await.unwrap(), ChainId(31337));
    }
}
