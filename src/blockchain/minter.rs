//! Badge minting from a fixed template.
//!
//! Used by the registry service (backend-held key) and by the admin
//! workflow when the admin's own wallet signs.

use alloy::primitives::{Address, TxHash};

use crate::blockchain::contract::ContractGateway;
use crate::blockchain::transaction::require_success;
use crate::blockchain::types::{BadgeMint, BlockchainResult};
use crate::config::BadgeTemplate;

pub struct BadgeMinter<G> {
    gateway: G,
    template: BadgeTemplate,
}

impl<G: ContractGateway> BadgeMinter<G> {
    pub fn new(gateway: G, template: BadgeTemplate) -> Self {
        Self { gateway, template }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Badge arguments for one attendee. An empty template title falls back
    /// to the event id.
    pub fn badge_for(&self, recipient: Address, event_id: &str) -> BadgeMint {
        let event_title = if self.template.event_title.is_empty() {
            event_id.to_string()
        } else {
            self.template.event_title.clone()
        };

        BadgeMint {
            recipient,
            token_uri: self.template.token_uri.clone(),
            event_title,
            role: self.template.role.clone(),
            expiry: self.template.expiry_unix,
        }
    }

    /// Submit the mint and wait until it is final.
    pub async fn mint(&self, recipient: Address, event_id: &str) -> BlockchainResult<TxHash> {
        let badge = self.badge_for(recipient, event_id);
        let tx_hash = self.gateway.mint_badge(&badge).await?;

        let status = self.gateway.confirm(tx_hash).await?;
        let block_number = require_success(status)?;
        tracing::info!(
            tx_hash = %tx_hash,
            block_number = block_number,
            recipient = %recipient,
            event_id = %event_id,
            "Badge minted"
        );
        Ok(tx_hash)
    }
}
