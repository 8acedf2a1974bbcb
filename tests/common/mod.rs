//! Shared helpers for the integration tests.

#![allow(dead_code)]

use alloy::primitives::{Address, TxHash, U256};
use axum::http::StatusCode;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use poap_dashboard::blockchain::{
    BadgeMint, BadgeMinter, BlockchainError, BlockchainResult, ConfirmationStatus, ContractGateway,
};
use poap_dashboard::config::{BackendConfig, BadgeTemplate, RegistryConfig};
use poap_dashboard::registry::{RegistryClient, RegistryServer, RegistryStore};
use poap_dashboard::Shutdown;

pub const API_KEY: &str = "test-admin-key";

/// In-memory contract: every mint succeeds (or reverts) with a fixed hash.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub revert: bool,
    pub confirm_delay: Duration,
    pub mints: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub fn tx_hash() -> TxHash {
        TxHash::repeat_byte(0xde)
    }

    pub fn mint_count(&self) -> usize {
        self.mints.load(Ordering::SeqCst)
    }
}

impl ContractGateway for FakeGateway {
    async fn owner(&self) -> BlockchainResult<Address> {
        Ok(Address::ZERO)
    }
    async fn balance_of(&self, _: Address) -> BlockchainResult<U256> {
        Ok(U256::ZERO)
    }
    async fn token_of_owner_by_index(&self, _: Address, _: U256) -> BlockchainResult<U256> {
        Err(BlockchainError::Rpc("no tokens".into()))
    }
    async fn token_uri(&self, _: U256) -> BlockchainResult<String> {
        Err(BlockchainError::Rpc("no tokens".into()))
    }
    async fn next_token_id(&self) -> BlockchainResult<U256> {
        Ok(U256::from(self.mint_count()))
    }
    async fn mint_badge(&self, _: &BadgeMint) -> BlockchainResult<TxHash> {
        self.mints.fetch_add(1, Ordering::SeqCst);
        Ok(Self::tx_hash())
    }
    async fn validate_student(&self, _: Address) -> BlockchainResult<TxHash> {
        Ok(Self::tx_hash())
    }
    async fn confirm(&self, _: TxHash) -> BlockchainResult<ConfirmationStatus> {
        tokio::time::sleep(self.confirm_delay).await;
        if self.revert {
            Ok(ConfirmationStatus::Failed("execution reverted".into()))
        } else {
            Ok(ConfirmationStatus::Confirmed { block_number: 1 })
        }
    }
}

pub fn badge_template() -> BadgeTemplate {
    BadgeTemplate {
        token_uri: "ipfs://bafy/metadata.json".into(),
        event_title: "RustConf".into(),
        role: "Attendee".into(),
        expiry_unix: 1_900_000_000,
    }
}

pub struct TestRegistry {
    pub base_url: String,
    pub store: RegistryStore,
    pub shutdown: Shutdown,
}

impl TestRegistry {
    /// Registry client with the admin key.
    pub fn client(&self) -> RegistryClient {
        client_for(&self.base_url, API_KEY)
    }
}

pub fn client_for(base_url: &str, api_key: &str) -> RegistryClient {
    RegistryClient::new(&BackendConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        api_key: api_key.to_string(),
    })
    .unwrap()
}

/// Start the reference registry on an ephemeral port.
pub async fn spawn_registry(gateway: Option<FakeGateway>) -> TestRegistry {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = RegistryStore::new(None);
    let minter = gateway.map(|g| BadgeMinter::new(g, badge_template()));
    let server = RegistryServer::new(RegistryConfig::default(), API_KEY, store.clone(), minter);

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestRegistry {
        base_url: format!("http://{}", addr),
        store,
        shutdown,
    }
}

/// Start a mock backend that answers each request with `f(method, path)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let mut parts = request.lines().next().unwrap_or("").split_whitespace();
                        let method = parts.next().unwrap_or("").to_string();
                        let path = parts.next().unwrap_or("").to_string();

                        let (status, body) = f(method, path).await;
                        let reason = StatusCode::from_u16(status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");

                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one request (head and body) so the socket is drained before close.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}
