//! Off-chain token metadata.
//!
//! Token URIs usually point at IPFS. Reads go through an HTTP gateway;
//! uploads go to a pinning endpoint that answers with the content id.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::IpfsConfig;

/// Environment variable holding the pinning service token.
pub const IPFS_TOKEN_ENV_VAR: &str = "POAP_IPFS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid metadata: {0}")]
    Decode(String),

    #[error("environment variable {0} not set")]
    MissingToken(&'static str),
}

impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// ERC-721 style metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// Rewrite `ipfs://` URIs onto `gateway`. Other URIs pass through.
pub fn resolve_uri(uri: &str, gateway: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(rest) => {
            let path = rest.strip_prefix("ipfs/").unwrap_or(rest);
            format!("{}/{}", gateway.trim_end_matches('/'), path)
        }
        None => uri.to_string(),
    }
}

/// Public URL of a pinned file.
pub fn dweb_url(cid: &str, name: &str) -> String {
    format!("https://{}.ipfs.dweb.link/{}", cid, name)
}

#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    gateway_url: String,
}

impl MetadataClient {
    pub fn new(config: &IpfsConfig, timeout: Duration) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Network(e.to_string()))?;
        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
        })
    }

    pub fn resolve(&self, uri: &str) -> String {
        resolve_uri(uri, &self.gateway_url)
    }

    /// Fetch and decode the metadata behind a token URI.
    pub async fn fetch(&self, token_uri: &str) -> Result<TokenMetadata, MetadataError> {
        let url = self.resolve(token_uri);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MetadataError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        let mut metadata: TokenMetadata = response
            .json()
            .await
            .map_err(|e| MetadataError::Decode(e.to_string()))?;
        metadata.image = self.resolve(&metadata.image);
        Ok(metadata)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    cid: String,
}

/// Client for the pinning endpoint.
#[derive(Clone)]
pub struct IpfsUploader {
    client: Client,
    upload_url: String,
    token: String,
}

impl std::fmt::Debug for IpfsUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsUploader")
            .field("upload_url", &self.upload_url)
            .finish_non_exhaustive()
    }
}

impl IpfsUploader {
    pub fn new(config: &IpfsConfig, token: String) -> Self {
        Self {
            client: Client::new(),
            upload_url: config.upload_url.clone(),
            token,
        }
    }

    /// Read the token from [`IPFS_TOKEN_ENV_VAR`].
    pub fn from_env(config: &IpfsConfig) -> Result<Self, MetadataError> {
        let token = std::env::var(IPFS_TOKEN_ENV_VAR)
            .map_err(|_| MetadataError::MissingToken(IPFS_TOKEN_ENV_VAR))?;
        Ok(Self::new(config, token))
    }

    /// Pin `bytes` under `name`; returns the public URL.
    pub async fn upload_bytes(&self, name: &str, bytes: Vec<u8>) -> Result<String, MetadataError> {
        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.token)
            .header("X-Name", name)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MetadataError::Status {
                status: response.status().as_u16(),
                url: self.upload_url.clone(),
            });
        }
        let UploadResponse { cid } = response.json().await?;
        tracing::info!(cid = %cid, name = %name, "Uploaded to IPFS");
        Ok(dweb_url(&cid, name))
    }

    pub async fn upload_metadata(&self, metadata: &TokenMetadata) -> Result<String, MetadataError> {
        let bytes = serde_json::to_vec(metadata).map_err(|e| MetadataError::Decode(e.to_string()))?;
        self.upload_bytes("metadata.json", bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use tokio::net::TcpListener;

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_resolve_uri() {
        let gw = "https://ipfs.io/ipfs/";
        assert_eq!(resolve_uri("ipfs://bafy/1.json", gw), "https://ipfs.io/ipfs/bafy/1.json");
        assert_eq!(resolve_uri("ipfs://ipfs/bafy", gw), "https://ipfs.io/ipfs/bafy");
        assert_eq!(resolve_uri("https://x.test/1.json", gw), "https://x.test/1.json");
    }

    #[test]
    fn test_dweb_url() {
        assert_eq!(dweb_url("bafy", "metadata.json"), "https://bafy.ipfs.dweb.link/metadata.json");
    }

    #[tokio::test]
    async fn test_fetch_rewrites_image() {
        let base = spawn(Router::new().route(
            "/ipfs/bafy/1.json",
            get(|| async {
                Json(serde_json::json!({
                    "name": "RustConf 2025",
                    "description": "Attended",
                    "image": "ipfs://bafyimg/badge.png"
                }))
            }),
        ))
        .await;

        let client = MetadataClient::new(
            &IpfsConfig {
                gateway_url: format!("{}/ipfs/", base),
                ..IpfsConfig::default()
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let metadata = client.fetch("ipfs://bafy/1.json").await.unwrap();
        assert_eq!(metadata.name, "RustConf 2025");
        assert_eq!(metadata.image, format!("{}/ipfs/bafyimg/badge.png", base));
    }

    #[tokio::test]
    async fn test_fetch_missing_document() {
        let base = spawn(Router::new()).await;
        let client = MetadataClient::new(&IpfsConfig::default(), Duration::from_secs(5)).unwrap();
        let err = client.fetch(&format!("{}/missing.json", base)).await.unwrap_err();
        assert!(matches!(err, MetadataError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_upload_sends_token() {
        let base = spawn(Router::new().route(
            "/upload",
            post(|headers: HeaderMap| async move {
                if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer t0ken") {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(serde_json::json!({"cid": "bafymeta"})))
            }),
        ))
        .await;

        let config = IpfsConfig {
            upload_url: format!("{}/upload", base),
            ..IpfsConfig::default()
        };

        let url = IpfsUploader::new(&config, "t0ken".into())
            .upload_metadata(&TokenMetadata::default())
            .await
            .unwrap();
        assert_eq!(url, "https://bafymeta.ipfs.dweb.link/metadata.json");

        let err = IpfsUploader::new(&config, "wrong".into())
            .upload_bytes("a.png", vec![1, 2, 3])
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Status { status: 401, .. }));
    }
}
