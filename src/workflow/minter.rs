//! Who signs an admin-triggered mint.
//!
//! `mint.signer = "backend"` forwards to the registry's `mint-poap`;
//! `mint.signer = "admin_wallet"` sends `mintBadge` from the connected wallet.

use alloy::primitives::Address;
use std::future::Future;

use crate::blockchain::contract::ContractGateway;
use crate::blockchain::minter::BadgeMinter;
use crate::blockchain::types::tx_hash_string;
use crate::error::DashboardError;
use crate::registry::client::RegistryApi;

pub trait MintExecutor: Send + Sync {
    /// Mint for one submitted wallet; returns the transaction hash.
    fn mint(
        &self,
        wallet: &str,
        event_id: &str,
    ) -> impl Future<Output = Result<String, DashboardError>> + Send;
}

/// Mints through the registry's backend-held signer.
pub struct BackendMinter<R> {
    registry: R,
}

impl<R: RegistryApi> BackendMinter<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }
}

impl<R: RegistryApi> MintExecutor for BackendMinter<R> {
    async fn mint(&self, wallet: &str, event_id: &str) -> Result<String, DashboardError> {
        self.registry
            .mint_poap(wallet, event_id)
            .await
            .map_err(DashboardError::from_mint)
    }
}

/// Mints from the admin's own wallet using the configured badge template.
pub struct WalletMinter<G> {
    minter: BadgeMinter<G>,
}

impl<G: ContractGateway> WalletMinter<G> {
    pub fn new(minter: BadgeMinter<G>) -> Self {
        Self { minter }
    }
}

impl<G: ContractGateway> MintExecutor for WalletMinter<G> {
    async fn mint(&self, wallet: &str, event_id: &str) -> Result<String, DashboardError> {
        let recipient: Address = wallet
            .trim()
            .parse()
            .map_err(|_| DashboardError::MintFailed(format!("invalid wallet address {}", wallet)))?;

        let tx_hash = self.minter.mint(recipient, event_id).await?;
        Ok(tx_hash_string(tx_hash))
    }
}
