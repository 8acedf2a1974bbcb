//! Transaction confirmation monitoring.
//!
//! A submitted transaction cannot be recalled. Timing out here only stops the
//! wait; the transaction may still land later.

use alloy::primitives::TxHash;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};

/// Poll for a receipt until the required depth is reached.
///
/// # Arguments
/// * `client` - Read-only client used for polling
/// * `tx_hash` - Transaction hash to monitor
/// * `timeout_secs` - Maximum time to wait for confirmation
/// * `poll_interval` - Delay between receipt queries
pub async fn wait_for_confirmation(
    client: &BlockchainClient,
    tx_hash: TxHash,
    timeout_secs: u64,
    poll_interval: Duration,
) -> BlockchainResult<ConfirmationStatus> {
    let required_confirmations = client.confirmation_blocks().max(1);

    let result = timeout(Duration::from_secs(timeout_secs), async {
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            let receipt = match client.get_transaction_receipt(tx_hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
            };

            if !receipt.status() {
                return Ok(ConfirmationStatus::Failed("Transaction reverted".to_string()));
            }

            let current_block = client.get_block_number().await?;
            let tx_block = receipt.block_number.unwrap_or(current_block);
            // The inclusion block counts as the first confirmation.
            let confirmations = current_block.saturating_sub(tx_block) as u32 + 1;

            if confirmations >= required_confirmations {
                return Ok(ConfirmationStatus::Confirmed {
                    block_number: tx_block,
                });
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = confirmations,
                required = required_confirmations,
                "Waiting for confirmations"
            );
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(_) => Err(BlockchainError::ConfirmationTimeout(timeout_secs)),
    }
}

/// Turn a confirmation status into a result, treating reverts as errors.
pub fn require_success(status: ConfirmationStatus) -> BlockchainResult<u64> {
    match status {
        ConfirmationStatus::Confirmed { block_number } => Ok(block_number),
        ConfirmationStatus::Failed(reason) => Err(BlockchainError::Reverted(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::ChainConfig;

    #[test]
    fn test_require_success() {
        assert_eq!(
            require_success(ConfirmationStatus::Confirmed { block_number: 100 }).unwrap(),
            100
        );
        let err = require_success(ConfirmationStatus::Failed("out of gas".into())).unwrap_err();
        assert!(matches!(err, BlockchainError::Reverted(_)));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_surfaces_error() {
        let client = BlockchainClient::new(ChainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 1,
            ..ChainConfig::default()
        })
        .unwrap();

        let result =
            wait_for_confirmation(&client, TxHash::ZERO, 5, Duration::from_millis(10)).await;
        assert!(result.is_err());
    }
}
