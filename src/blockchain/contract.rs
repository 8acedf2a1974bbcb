//! Typed gateway to the attendance badge contract.
//!
//! Reads go through the read-only [`BlockchainClient`] (with failover) and work
//! before any wallet is connected. Writes need a signer attached with
//! [`AlloyGateway::with_signer`]; without one they fail with `NotConnected`.

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::DynProvider;
use alloy::sol;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::transaction::wait_for_confirmation;
use crate::blockchain::types::{
    map_transport_error, BadgeMint, BlockchainError, BlockchainResult, ConfirmationStatus,
};

sol! {
    /// Attendance badge contract surface used by the dashboard.
    #[sol(rpc)]
    interface IPoapBadge {
        function mintBadge(address recipient, string tokenURI, string eventTitle, string role, uint256 expiry) external;
        function validateStudent(address student) external;
        function owner() external view returns (address);
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function tokenURI(uint256 tokenId) external view returns (string);
        function nextTokenId() external view returns (uint256);
    }
}

/// Contract operations the workflows depend on.
pub trait ContractGateway: Send + Sync {
    fn owner(&self) -> impl Future<Output = BlockchainResult<Address>> + Send;

    fn balance_of(&self, owner: Address) -> impl Future<Output = BlockchainResult<U256>> + Send;

    fn token_of_owner_by_index(
        &self,
        owner: Address,
        index: U256,
    ) -> impl Future<Output = BlockchainResult<U256>> + Send;

    fn token_uri(&self, token_id: U256) -> impl Future<Output = BlockchainResult<String>> + Send;

    /// Id the next mint will receive.
    fn next_token_id(&self) -> impl Future<Output = BlockchainResult<U256>> + Send;

    /// Submit a `mintBadge` transaction and return its hash.
    fn mint_badge(&self, mint: &BadgeMint) -> impl Future<Output = BlockchainResult<TxHash>> + Send;

    /// Submit a `validateStudent` transaction and return its hash.
    fn validate_student(
        &self,
        student: Address,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send;

    /// Wait until the transaction is final or reverted.
    fn confirm(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = BlockchainResult<ConfirmationStatus>> + Send;
}

/// Gateways that can hand out a copy bound to a signing account.
pub trait AttachSigner: ContractGateway + Sized {
    fn attach_signer(&self, provider: DynProvider, from: Address) -> Self;
}

#[derive(Clone)]
struct SignerHandle {
    provider: DynProvider,
    from: Address,
}

/// [`ContractGateway`] over alloy providers.
#[derive(Clone)]
pub struct AlloyGateway {
    client: BlockchainClient,
    address: Address,
    signer: Option<SignerHandle>,
    send_timeout: Duration,
    poll_interval: Duration,
}

impl AlloyGateway {
    /// Build a read-only gateway for the configured contract.
    pub fn new(client: BlockchainClient) -> BlockchainResult<Self> {
        let address: Address = client.config().contract_address.parse().map_err(|e| {
            BlockchainError::InvalidAddress(format!(
                "contract address '{}': {}",
                client.config().contract_address,
                e
            ))
        })?;
        let send_timeout = Duration::from_secs(client.config().rpc_timeout_secs);

        Ok(Self {
            client,
            address,
            signer: None,
            send_timeout,
            poll_interval: Duration::from_secs(2),
        })
    }

    /// Attach a signing provider for write calls.
    pub fn with_signer(mut self, provider: DynProvider, from: Address) -> Self {
        self.signer = Some(SignerHandle { provider, from });
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Account that signs writes, if any.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.from)
    }

    pub fn contract_address(&self) -> Address {
        self.address
    }

    fn writer(&self) -> BlockchainResult<(IPoapBadge::IPoapBadgeInstance<DynProvider>, Address)> {
        let signer = self.signer.as_ref().ok_or(BlockchainError::NotConnected)?;
        Ok((
            IPoapBadge::new(self.address, signer.provider.clone()),
            signer.from,
        ))
    }
}

fn map_contract_error(err: alloy::contract::Error) -> BlockchainError {
    match err {
        alloy::contract::Error::TransportError(e) => map_transport_error(e, false),
        other => BlockchainError::Reverted(other.to_string()),
    }
}

impl ContractGateway for AlloyGateway {
    async fn owner(&self) -> BlockchainResult<Address> {
        let address = self.address;
        self.client
            .with_failover("owner", |p| async move {
                IPoapBadge::new(address, p).owner().call().await
            })
            .await
    }

    async fn balance_of(&self, owner: Address) -> BlockchainResult<U256> {
        let address = self.address;
        self.client
            .with_failover("balanceOf", |p| async move {
                IPoapBadge::new(address, p).balanceOf(owner).call().await
            })
            .await
    }

    async fn token_of_owner_by_index(&self, owner: Address, index: U256) -> BlockchainResult<U256> {
        let address = self.address;
        self.client
            .with_failover("tokenOfOwnerByIndex", |p| async move {
                IPoapBadge::new(address, p)
                    .tokenOfOwnerByIndex(owner, index)
                    .call()
                    .await
            })
            .await
    }

    async fn token_uri(&self, token_id: U256) -> BlockchainResult<String> {
        let address = self.address;
        self.client
            .with_failover("tokenURI", |p| async move {
                IPoapBadge::new(address, p).tokenURI(token_id).call().await
            })
            .await
    }

    async fn next_token_id(&self) -> BlockchainResult<U256> {
        let address = self.address;
        self.client
            .with_failover("nextTokenId", |p| async move {
                IPoapBadge::new(address, p).nextTokenId().call().await
            })
            .await
    }

    async fn mint_badge(&self, mint: &BadgeMint) -> BlockchainResult<TxHash> {
        let (contract, from) = self.writer()?;
        let call = contract
            .mintBadge(
                mint.recipient,
                mint.token_uri.clone(),
                mint.event_title.clone(),
                mint.role.clone(),
                U256::from(mint.expiry),
            )
            .from(from);

        let pending = timeout(self.send_timeout, call.send())
            .await
            .map_err(|_| BlockchainError::Timeout(self.send_timeout.as_secs()))?
            .map_err(map_contract_error)?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(
            tx_hash = %tx_hash,
            recipient = %mint.recipient,
            event_title = %mint.event_title,
            "mintBadge submitted"
        );
        Ok(tx_hash)
    }

    async fn validate_student(&self, student: Address) -> BlockchainResult<TxHash> {
        let (contract, from) = self.writer()?;
        let call = contract.validateStudent(student).from(from);

        let pending = timeout(self.send_timeout, call.send())
            .await
            .map_err(|_| BlockchainError::Timeout(self.send_timeout.as_secs()))?
            .map_err(map_contract_error)?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(tx_hash = %tx_hash, student = %student, "validateStudent submitted");
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> BlockchainResult<ConfirmationStatus> {
        wait_for_confirmation(
            &self.client,
            tx_hash,
            self.client.config().confirmation_timeout_secs,
            self.poll_interval,
        )
        .await
    }
}

impl AttachSigner for AlloyGateway {
    fn attach_signer(&self, provider: DynProvider, from: Address) -> Self {
        self.clone().with_signer(provider, from)
    }
}

impl std::fmt::Debug for AlloyGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyGateway")
            .field("contract", &self.address)
            .field("signer", &self.signer_address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::ChainConfig;
    use alloy::providers::{Provider, ProviderBuilder};

    fn gateway() -> AlloyGateway {
        let client = BlockchainClient::new(ChainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            rpc_timeout_secs: 1,
            ..ChainConfig::default()
        })
        .unwrap();
        AlloyGateway::new(client).unwrap()
    }

    fn badge() -> BadgeMint {
        BadgeMint {
            recipient: Address::repeat_byte(0xab),
            token_uri: "ipfs://bafy/metadata.json".into(),
            event_title: "RustConf".into(),
            role: "Attendee".into(),
            expiry: 1_900_000_000,
        }
    }

    #[tokio::test]
    async fn test_writes_require_signer() {
        let gateway = gateway();
        assert!(!gateway.has_signer());

        let err = gateway.mint_badge(&badge()).await.unwrap_err();
        assert!(matches!(err, BlockchainError::NotConnected));

        let err = gateway.validate_student(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, BlockchainError::NotConnected));
    }

    #[test]
    fn test_with_signer() {
        let provider = ProviderBuilder::new()
            .connect_http("http://127.0.0.1:1".parse().unwrap())
            .erased();
        let from = Address::repeat_byte(0x01);
        let gateway = gateway().with_signer(provider, from);
        assert!(gateway.has_signer());
        assert_eq!(gateway.signer_address(), Some(from));
    }

    #[test]
    fn test_invalid_contract_address() {
        let client = BlockchainClient::new(ChainConfig {
            contract_address: "nope".to_string(),
            ..ChainConfig::default()
        })
        .unwrap();
        assert!(matches!(
            AlloyGateway::new(client).unwrap_err(),
            BlockchainError::InvalidAddress(_)
        ));
    }

    #[tokio::test]
    async fn test_reads_fail_cleanly_when_rpc_is_down() {
        let err = gateway().owner().await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rpc(_) | BlockchainError::Timeout(_)));
    }
}
