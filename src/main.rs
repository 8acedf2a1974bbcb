//! POAP registry service.
//!
//! Serves the claim-key and submission endpoints the dashboard talks to, and
//! mints through a backend-held key when one is configured.
//!
//! ```text
//!   attendee ──▶ /api/validate-key, /api/submit-address ──┐
//!                                                         ▼
//!                                                  RegistryStore ──▶ JSON snapshot
//!                                                         ▲
//!   organizer ─▶ /api/generate-claim-link,                │
//!                /api/submitted-addresses, /api/mint-poap ┘──▶ BadgeMinter ──▶ chain
//! ```

use alloy::providers::{Provider, ProviderBuilder};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use poap_dashboard::blockchain::wallet::MINTER_KEY_ENV_VAR;
use poap_dashboard::blockchain::{AlloyGateway, BadgeMinter, BlockchainClient, Wallet};
use poap_dashboard::config::{load_or_default, BadgeTemplate, DashboardConfig};
use poap_dashboard::lifecycle::{spawn_signal_handler, Shutdown};
use poap_dashboard::observability::{init_logging, metrics};
use poap_dashboard::registry::{RegistryServer, RegistryStore};

#[derive(Parser)]
#[command(name = "poap-dashboard")]
#[command(about = "POAP claim registry service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Backend signer for `mint-poap`, if a key and a badge template are configured
/// and the RPC endpoint serves the configured chain.
async fn build_minter(config: &DashboardConfig) -> Option<BadgeMinter<AlloyGateway>> {
    let Some(template) = config.mint.badge.clone() else {
        tracing::warn!("No [mint.badge] template configured; mint-poap is disabled");
        return None;
    };

    let wallet = match Wallet::from_env_var(MINTER_KEY_ENV_VAR, config.chain.chain_id) {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(error = %e, "No minter key; mint-poap is disabled");
            return None;
        }
    };

    match setup_minter(config, &wallet, template).await {
        Ok(minter) => {
            tracing::info!(minter = %wallet.address(), "Backend minting enabled");
            Some(minter)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up backend minter; mint-poap is disabled");
            None
        }
    }
}

async fn setup_minter(
    config: &DashboardConfig,
    wallet: &Wallet,
    template: BadgeTemplate,
) -> Result<BadgeMinter<AlloyGateway>, Box<dyn std::error::Error>> {
    let client = BlockchainClient::new(config.chain.clone())?;
    client.verify_chain_id().await?;

    let rpc_url: url::Url = config.chain.rpc_url.parse()?;
    let signer = ProviderBuilder::new()
        .wallet(wallet.ethereum_wallet())
        .connect_http(rpc_url)
        .erased();
    let gateway = AlloyGateway::new(client)?.with_signer(signer, wallet.address());
    Ok(BadgeMinter::new(gateway, template))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.registry.bind_address,
        chain_id = config.chain.chain_id,
        "poap-dashboard starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = match &config.registry.persistence_path {
        Some(path) => RegistryStore::load_from_file(path)?,
        None => RegistryStore::new(None),
    };

    let minter = build_minter(&config).await;
    let server = RegistryServer::new(
        config.registry.clone(),
        &config.backend.api_key,
        store,
        minter,
    );

    let listener = TcpListener::bind(&config.registry.bind_address).await?;
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
