//! HTTP client for the backend registry.
//!
//! One configured base URL serves every workflow. Non-2xx responses carry
//! `{error}`; the message is surfaced verbatim.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::observability::metrics;
use crate::registry::types::{
    ErrorBody, GenerateClaimLinkRequest, GenerateClaimLinkResponse, KeyValidation,
    MintPoapRequest, MintPoapResponse, SubmitAddressRequest, SubmitAddressResponse,
    SubmittedAddress, SubmittedAddressesResponse, ValidateKeyRequest, ValidateKeyResponse,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Timeout or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// 2xx response that did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Claim-key lifecycle operations of the backend registry.
pub trait RegistryApi: Send + Sync {
    /// Create a claim link for an event, valid for `expiry_minutes`.
    fn generate_claim_link(
        &self,
        event_id: &str,
        expiry_minutes: u64,
    ) -> impl Future<Output = RegistryResult<String>> + Send;

    fn validate_key(&self, key: &str) -> impl Future<Output = RegistryResult<KeyValidation>> + Send;

    fn submit_address(&self, key: &str, wallet: &str)
        -> impl Future<Output = RegistryResult<()>> + Send;

    /// Every row submitted for an event, in submission order.
    fn list_submitted(
        &self,
        event_id: &str,
    ) -> impl Future<Output = RegistryResult<Vec<SubmittedAddress>>> + Send;

    /// Mint through the backend signer; returns the transaction hash.
    fn mint_poap(
        &self,
        wallet: &str,
        event_id: &str,
    ) -> impl Future<Output = RegistryResult<String>> + Send;
}

/// reqwest-based [`RegistryApi`].
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RegistryClient {
    pub fn new(config: &BackendConfig) -> RegistryResult<Self> {
        config
            .base_url
            .parse::<url::Url>()
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: (!config.api_key.is_empty()).then(|| config.api_key.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> RegistryResult<T> {
        let start = Instant::now();
        let result = request.send().await;
        metrics::record_backend_request(endpoint, start);

        let response = result.map_err(|e| {
            tracing::warn!(endpoint = endpoint, error = %e, "Registry request failed");
            RegistryError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::debug!(endpoint = endpoint, status = %status, message = %message, "Registry returned error");
            return Err(RegistryError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| RegistryError::Decode(e.to_string()))
    }
}

impl RegistryApi for RegistryClient {
    async fn generate_claim_link(&self, event_id: &str, expiry_minutes: u64) -> RegistryResult<String> {
        let request = self.admin(self.client.post(self.url("/api/generate-claim-link"))).json(
            &GenerateClaimLinkRequest {
                event_id: event_id.to_string(),
                expiry_minutes,
            },
        );
        let resp: GenerateClaimLinkResponse = self.send("generate-claim-link", request).await?;
        Ok(resp.claim_url)
    }

    async fn validate_key(&self, key: &str) -> RegistryResult<KeyValidation> {
        let request = self
            .client
            .post(self.url("/api/validate-key"))
            .json(&ValidateKeyRequest { key: key.to_string() });
        let resp: ValidateKeyResponse = self.send("validate-key", request).await?;
        Ok(resp.into())
    }

    async fn submit_address(&self, key: &str, wallet: &str) -> RegistryResult<()> {
        let request = self.client.post(self.url("/api/submit-address")).json(&SubmitAddressRequest {
            key: key.to_string(),
            wallet: wallet.to_string(),
        });
        let _: SubmitAddressResponse = self.send("submit-address", request).await?;
        Ok(())
    }

    async fn list_submitted(&self, event_id: &str) -> RegistryResult<Vec<SubmittedAddress>> {
        let request = self
            .admin(self.client.get(self.url("/api/submitted-addresses")))
            .query(&[("eventKey", event_id)]);
        let resp: SubmittedAddressesResponse = self.send("submitted-addresses", request).await?;

        Ok(resp
            .addresses
            .into_iter()
            .enumerate()
            .map(|(i, record)| SubmittedAddress::from_record(record, event_id, i))
            .collect())
    }

    async fn mint_poap(&self, wallet: &str, event_id: &str) -> RegistryResult<String> {
        let request = self.admin(self.client.post(self.url("/api/mint-poap"))).json(&MintPoapRequest {
            wallet: wallet.to_string(),
            event_key: event_id.to_string(),
        });
        let resp: MintPoapResponse = self.send("mint-poap", request).await?;
        Ok(resp.tx_hash)
    }
}
