//! Connected-wallet workflow for the `/` route: mint a badge, validate an
//! attendee, list the wallet's own badges.
//!
//! Mint and validate share one loading flag, so at most one of them is
//! outstanding at a time.

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, NaiveDateTime};
use tokio::sync::{watch, RwLock};

use crate::blockchain::connector::{Connection, WalletConnector, WalletProvider};
use crate::blockchain::contract::AttachSigner;
use crate::blockchain::transaction::require_success;
use crate::blockchain::types::{BadgeMint, BlockchainError, OwnedToken};
use crate::error::DashboardError;
use crate::metadata::{MetadataClient, TokenMetadata};

/// Raw mint form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeForm {
    pub recipient: String,
    pub token_uri: String,
    pub event_title: String,
    pub role: String,
    /// `datetime-local` value, e.g. `2025-12-31T18:00`.
    pub expiry: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedBadge {
    pub token_id: U256,
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedPoap {
    pub token: OwnedToken,
    /// `None` when the metadata document could not be fetched.
    pub metadata: Option<TokenMetadata>,
}

/// Unix seconds for a `datetime-local` string (UTC). Unparseable input is 0.
pub fn parse_expiry(input: &str) -> u64 {
    let input = input.trim();
    let parsed = DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.timestamp())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
                .map(|dt| dt.and_utc().timestamp())
        });

    match parsed {
        Ok(ts) if ts > 0 => ts as u64,
        _ => 0,
    }
}

/// Clears the loading flag when the action ends, even if it is dropped.
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

pub struct SelfServiceWorkflow<W, G> {
    connector: WalletConnector<W>,
    reader: G,
    writer: RwLock<Option<G>>,
    owner: RwLock<Option<Address>>,
    metadata: MetadataClient,
    loading: watch::Sender<bool>,
    status: watch::Sender<String>,
}

impl<W: WalletProvider, G: AttachSigner + Clone> SelfServiceWorkflow<W, G> {
    pub fn new(connector: WalletConnector<W>, reader: G, metadata: MetadataClient) -> Self {
        let (loading, _) = watch::channel(false);
        let (status, _) = watch::channel(String::new());
        Self {
            connector,
            reader,
            writer: RwLock::new(None),
            owner: RwLock::new(None),
            metadata,
            loading,
            status,
        }
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn connection(&self) -> Option<Connection> {
        self.connector.connection()
    }

    fn set_status(&self, message: impl Into<String>) {
        self.status.send_replace(message.into());
    }

    fn fail(&self, err: DashboardError) -> DashboardError {
        self.set_status(err.status_message());
        err
    }

    /// Connect the wallet, bind a signer and look up the contract owner.
    pub async fn connect(&self) -> Result<Connection, DashboardError> {
        let connection = match self.connector.connect().await {
            Ok(c) => c,
            Err(err) => {
                let message = match &err {
                    DashboardError::NoWalletProvider
                    | DashboardError::WrongNetwork { .. }
                    | DashboardError::UserRejected => err.status_message(),
                    other => format!("❌ Connection failed: {}", other),
                };
                self.set_status(message);
                return Err(err);
            }
        };

        let (provider, from) = self.connector.signer().map_err(|e| self.fail(e))?;
        *self.writer.write().await = Some(self.reader.attach_signer(provider, from));

        match self.reader.owner().await {
            Ok(owner) => *self.owner.write().await = Some(owner),
            Err(e) => tracing::warn!(error = %e, "Could not read contract owner"),
        }

        self.set_status(self.connector.state().status_message());
        Ok(connection)
    }

    /// Whether the connected wallet owns the contract.
    pub async fn is_owner(&self) -> bool {
        match (self.connection(), *self.owner.read().await) {
            (Some(c), Some(owner)) => c.address == owner,
            _ => false,
        }
    }

    async fn writer(&self) -> Result<G, DashboardError> {
        if self.connection().is_none() {
            return Err(DashboardError::NotConnected);
        }
        self.writer
            .read()
            .await
            .clone()
            .ok_or(DashboardError::NotConnected)
    }

    fn begin_loading(&self) -> Result<LoadingGuard<'_>, DashboardError> {
        let started = self.loading.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        if started {
            Ok(LoadingGuard(&self.loading))
        } else {
            Err(DashboardError::MintInProgress("another transaction".to_string()))
        }
    }

    /// Mint a badge from the form.
    pub async fn mint_badge(&self, form: &BadgeForm) -> Result<MintedBadge, DashboardError> {
        let writer = self.writer().await.map_err(|e| self.fail(e))?;

        let fields = [
            &form.recipient,
            &form.token_uri,
            &form.event_title,
            &form.role,
            &form.expiry,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(self.fail(DashboardError::MissingInput("❌ All fields are required")));
        }

        let _loading = self.begin_loading().map_err(|e| self.fail(e))?;

        let result = async {
            let recipient: Address = form.recipient.trim().parse().map_err(|_| {
                BlockchainError::InvalidAddress(format!("recipient {}", form.recipient.trim()))
            })?;
            let badge = BadgeMint {
                recipient,
                token_uri: form.token_uri.trim().to_string(),
                event_title: form.event_title.trim().to_string(),
                role: form.role.trim().to_string(),
                expiry: parse_expiry(&form.expiry),
            };

            let tx_hash = writer.mint_badge(&badge).await?;
            self.set_status("🌐 Minting POAP...");
            require_success(writer.confirm(tx_hash).await?)?;

            let token_id = self.reader.next_token_id().await?.saturating_sub(U256::from(1));
            Ok::<_, BlockchainError>(MintedBadge { token_id, tx_hash })
        }
        .await;

        match result {
            Ok(minted) => {
                tracing::info!(token_id = %minted.token_id, tx_hash = %minted.tx_hash, "Badge minted");
                self.set_status(format!("✅ Mint successful! Token ID: {}", minted.token_id));
                Ok(minted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Badge mint failed");
                self.set_status(format!("❌ Transaction failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Mark an attendee as validated on-chain.
    pub async fn validate_student(&self, address: &str) -> Result<TxHash, DashboardError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(self.fail(DashboardError::MissingInput(
                "Please enter an address to validate",
            )));
        }
        let writer = self.writer().await.map_err(|e| self.fail(e))?;
        let _loading = self.begin_loading().map_err(|e| self.fail(e))?;

        let result = async {
            let student: Address = address
                .parse()
                .map_err(|_| BlockchainError::InvalidAddress(address.to_string()))?;
            let tx_hash = writer.validate_student(student).await?;
            self.set_status("🌐 Validating attendees...");
            require_success(writer.confirm(tx_hash).await?)?;
            Ok::<_, BlockchainError>(tx_hash)
        }
        .await;

        match result {
            Ok(tx_hash) => {
                tracing::info!(student = %address, tx_hash = %tx_hash, "Student validated");
                self.set_status(format!("✅ Student {} validated!", address));
                Ok(tx_hash)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Validation failed");
                self.set_status(format!("❌ Validation failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Badges held by `owner`, with their metadata. Read-only.
    pub async fn view_poaps(&self, owner: Address) -> Result<Vec<OwnedPoap>, DashboardError> {
        self.read_poaps(owner).await.map_err(|err| {
            tracing::warn!(owner = %owner, error = %err, "Failed to load POAPs");
            self.fail(err)
        })
    }

    async fn read_poaps(&self, owner: Address) -> Result<Vec<OwnedPoap>, DashboardError> {
        let balance = self.reader.balance_of(owner).await?;
        let count: u64 = balance
            .try_into()
            .map_err(|_| DashboardError::UnexpectedResponse(format!("balance {}", balance)))?;

        let mut poaps = Vec::new();
        for index in 0..count {
            let token_id = self
                .reader
                .token_of_owner_by_index(owner, U256::from(index))
                .await?;
            let token_uri = self.reader.token_uri(token_id).await?;

            let metadata = match self.metadata.fetch(&token_uri).await {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!(token_id = %token_id, error = %e, "Metadata fetch failed");
                    None
                }
            };
            poaps.push(OwnedPoap {
                token: OwnedToken { token_id, token_uri },
                metadata,
            });
        }
        Ok(poaps)
    }
}
