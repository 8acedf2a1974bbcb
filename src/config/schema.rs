//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dashboard
//! and the registry service. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by the dashboard CLI and the registry service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    /// Backend registry client settings (single base URL for every workflow).
    pub backend: BackendConfig,

    /// Chain and contract settings.
    pub chain: ChainConfig,

    /// Wallet provider used by the self-service workflow.
    pub wallet: WalletConfig,

    /// Admin mint settings.
    pub mint: MintConfig,

    /// Reference registry server settings.
    pub registry: RegistryConfig,

    /// IPFS gateway and upload settings.
    pub ipfs: IpfsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Backend registry client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the registry service (e.g., "http://localhost:5000").
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Bearer token for admin endpoints. Empty disables admin auth.
    pub api_key: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 15,
            api_key: String::new(),
        }
    }
}

/// Chain and contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL used for read-only calls.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID. Wallets on any other chain are refused.
    pub chain_id: u64,

    /// Address of the attendance badge contract.
    pub contract_address: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u32,

    /// Maximum time to wait for a transaction receipt, in seconds.
    pub confirmation_timeout_secs: u64,

    /// Block explorer prefix for transaction links.
    pub explorer_tx_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.chiadochain.net".to_string(),
            failover_urls: Vec::new(),
            chain_id: 10200,
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 120,
            explorer_tx_url: "https://gnosis-chiado.blockscout.com/tx/".to_string(),
        }
    }
}

/// Where the signing identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WalletProviderKind {
    /// Private key loaded from the environment.
    #[default]
    Local,
    /// External wallet exposing EIP-1193 methods over JSON-RPC.
    Rpc,
}

/// Wallet provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Provider kind.
    pub provider: WalletProviderKind,

    /// Wallet RPC endpoint (only for `provider = "rpc"`).
    pub rpc_url: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            provider: WalletProviderKind::Local,
            rpc_url: "http://127.0.0.1:1248".to_string(),
        }
    }
}

/// Who signs admin-triggered mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MintSigner {
    /// The registry backend mints with its own key (`POST /api/mint-poap`).
    #[default]
    Backend,
    /// The admin's connected wallet calls the contract directly.
    AdminWallet,
}

/// Admin mint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MintConfig {
    /// Signer used for admin mints.
    pub signer: MintSigner,

    /// Badge template for wallet-signed mints.
    pub badge: Option<BadgeTemplate>,

    /// Default claim link lifetime in minutes.
    pub default_expiry_minutes: u64,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            signer: MintSigner::Backend,
            badge: None,
            default_expiry_minutes: 60,
        }
    }
}

/// Fixed badge fields applied to every mint of an event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BadgeTemplate {
    pub token_uri: String,
    pub event_title: String,
    pub role: String,
    /// Badge expiry (unix seconds).
    pub expiry_unix: u64,
}

/// Reference registry server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Public URL of the dashboard; claim links point at `<url>/claim`.
    pub claim_base_url: String,

    /// Upper bound for claim link lifetimes.
    pub max_expiry_minutes: u64,

    /// JSON file for registry persistence. `None` keeps state in memory.
    pub persistence_path: Option<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            claim_base_url: "http://localhost:3000".to_string(),
            max_expiry_minutes: 24 * 60,
            persistence_path: None,
            max_body_bytes: 64 * 1024,
            request_timeout_secs: 180,
        }
    }
}

/// IPFS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// Gateway prefix used to resolve `ipfs://` URIs.
    pub gateway_url: String,

    /// Pinning endpoint accepting raw-body uploads; answers `{cid}`.
    pub upload_url: String,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://ipfs.io/ipfs/".to_string(),
            upload_url: "https://api.web3.storage/upload".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: DashboardConfig = toml::from_str("").unwrap();
        assert_eq!(config.chain.chain_id, 10200);
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.mint.signer, MintSigner::Backend);
        assert_eq!(config.mint.default_expiry_minutes, 60);
    }

    #[test]
    fn test_partial_sections() {
        let config: DashboardConfig = toml::from_str(
            r#"
            [mint]
            signer = "admin_wallet"

            [mint.badge]
            token_uri = "ipfs://bafy/metadata.json"
            event_title = "RustConf"
            role = "Attendee"
            expiry_unix = 1900000000

            [wallet]
            provider = "rpc"
            "#,
        )
        .unwrap();

        assert_eq!(config.mint.signer, MintSigner::AdminWallet);
        assert_eq!(config.mint.badge.unwrap().role, "Attendee");
        assert_eq!(config.wallet.provider, WalletProviderKind::Rpc);
        assert_eq!(config.wallet.rpc_url, "http://127.0.0.1:1248");
    }
}
