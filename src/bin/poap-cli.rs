use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use poap_dashboard::blockchain::{
    AlloyGateway, AttachSigner, BadgeMinter, BlockchainClient, LocalWalletProvider,
    RpcWalletProvider, WalletConnector, WalletProvider,
};
use poap_dashboard::config::{load_or_default, DashboardConfig, MintSigner, WalletProviderKind};
use poap_dashboard::metadata::MetadataClient;
use poap_dashboard::observability::init_logging;
use poap_dashboard::registry::{MintStatus, RegistryClient};
use poap_dashboard::workflow::{
    AdminMintWorkflow, BackendMinter, BadgeForm, ClaimState, ClaimWorkflow, MintExecutor,
    SelfServiceWorkflow, SubmissionStore, WalletMinter,
};
use poap_dashboard::DashboardError;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "poap-cli")]
#[command(about = "POAP claim-and-mint dashboard", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connected-wallet actions (the `/` page)
    #[command(subcommand)]
    Home(HomeCommand),
    /// Organizer actions (the `/admin` page)
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Attendee claim (the `/claim` page)
    Claim {
        /// Claim key from the link.
        #[arg(long)]
        key: Option<String>,
        /// Wallet to submit; omit to only check the key.
        #[arg(long)]
        wallet: Option<String>,
    },
}

#[derive(Subcommand)]
enum HomeCommand {
    /// Connect the wallet and show the account
    Connect,
    /// Mint a badge from the connected wallet
    Mint {
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        token_uri: String,
        #[arg(long)]
        event_title: String,
        #[arg(long)]
        role: String,
        /// Expiry as `YYYY-MM-DDTHH:MM` (UTC)
        #[arg(long)]
        expiry: String,
    },
    /// Validate an attendee address (contract owner only)
    Validate {
        #[arg(long)]
        address: String,
    },
    /// List badges held by an address (defaults to the connected wallet)
    View {
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List submitted addresses for an event
    List {
        #[arg(long)]
        event_key: String,
    },
    /// Mint a POAP for one submitted wallet
    Mint {
        #[arg(long)]
        event_key: String,
        #[arg(long)]
        wallet: String,
    },
    /// Generate a claim link for an event
    Link {
        #[arg(long)]
        event_key: String,
        #[arg(long)]
        expiry_minutes: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    init_logging(&config.observability);

    match cli.command {
        Commands::Home(cmd) => match config.wallet.provider {
            WalletProviderKind::Local => {
                let provider = LocalWalletProvider::from_env(
                    config.chain.chain_id,
                    config.chain.rpc_url.parse()?,
                    rpc_timeout(&config),
                );
                run_home(&config, provider, cmd).await
            }
            WalletProviderKind::Rpc => {
                let provider = RpcWalletProvider::new(config.wallet.rpc_url.parse()?, rpc_timeout(&config));
                run_home(&config, provider, cmd).await
            }
        },
        Commands::Admin(cmd) => {
            let registry = RegistryClient::new(&config.backend)?;
            match config.mint.signer {
                MintSigner::Backend => {
                    let minter = BackendMinter::new(registry.clone());
                    run_admin(&config, registry, minter, cmd).await
                }
                MintSigner::AdminWallet => {
                    let minter = admin_wallet_minter(&config).await?;
                    run_admin(&config, registry, minter, cmd).await
                }
            }
        }
        Commands::Claim { key, wallet } => run_claim(&config, key, wallet).await,
    }
}

fn rpc_timeout(config: &DashboardConfig) -> Duration {
    Duration::from_secs(config.chain.rpc_timeout_secs)
}

fn read_gateway(config: &DashboardConfig) -> Result<AlloyGateway, Box<dyn std::error::Error>> {
    let client = BlockchainClient::new(config.chain.clone())?;
    Ok(AlloyGateway::new(client)?)
}

async fn connect_signer<W: WalletProvider>(
    config: &DashboardConfig,
    provider: W,
) -> Result<AlloyGateway, Box<dyn std::error::Error>> {
    let connector = WalletConnector::new(provider, config.chain.chain_id);
    if let Err(err) = connector.connect().await {
        println!("{}", connector.state().status_message());
        return Err(err.into());
    }
    let (signer, from) = connector.signer()?;
    Ok(read_gateway(config)?.attach_signer(signer, from))
}

async fn admin_wallet_minter(
    config: &DashboardConfig,
) -> Result<WalletMinter<AlloyGateway>, Box<dyn std::error::Error>> {
    let template = config
        .mint
        .badge
        .clone()
        .ok_or("mint.signer = \"admin_wallet\" needs a [mint.badge] template")?;

    let gateway = match config.wallet.provider {
        WalletProviderKind::Local => {
            let provider = LocalWalletProvider::from_env(
                config.chain.chain_id,
                config.chain.rpc_url.parse()?,
                rpc_timeout(config),
            );
            connect_signer(config, provider).await?
        }
        WalletProviderKind::Rpc => {
            let provider = RpcWalletProvider::new(config.wallet.rpc_url.parse()?, rpc_timeout(config));
            connect_signer(config, provider).await?
        }
    };
    Ok(WalletMinter::new(BadgeMinter::new(gateway, template)))
}

/// Print the status line and turn a workflow error into the exit error.
fn report<T>(status: String, result: Result<T, DashboardError>) -> Result<T, Box<dyn std::error::Error>> {
    if !status.is_empty() {
        println!("{}", status);
    }
    result.map_err(Into::into)
}

async fn run_home<W: WalletProvider>(config: &DashboardConfig, provider: W, cmd: HomeCommand) -> CliResult {
    let metadata = MetadataClient::new(&config.ipfs, Duration::from_secs(config.backend.timeout_secs))?;
    let workflow = SelfServiceWorkflow::new(
        WalletConnector::new(provider, config.chain.chain_id),
        read_gateway(config)?,
        metadata,
    );

    // Viewing another address needs no wallet.
    if let HomeCommand::View { address: Some(address) } = &cmd {
        let owner = address.trim().parse()?;
        let result = workflow.view_poaps(owner).await;
        print_poaps(&report(workflow.status(), result)?);
        return Ok(());
    }

    let result = workflow.connect().await;
    report(workflow.status(), result)?;

    match cmd {
        HomeCommand::Connect => {
            if let Some(connection) = workflow.connection() {
                println!("Account: {}", connection.address);
                println!("Chain:   {}", connection.chain_id);
            }
            if workflow.is_owner().await {
                println!("This wallet owns the contract and can validate attendees.");
            }
        }
        HomeCommand::Mint {
            recipient,
            token_uri,
            event_title,
            role,
            expiry,
        } => {
            let form = BadgeForm {
                recipient,
                token_uri,
                event_title,
                role,
                expiry,
            };
            let result = workflow.mint_badge(&form).await;
            let minted = report(workflow.status(), result)?;
            println!(
                "Explorer: {}{:#x}",
                config.chain.explorer_tx_url, minted.tx_hash
            );
        }
        HomeCommand::Validate { address } => {
            if !workflow.is_owner().await {
                println!("⚠️ Only the contract owner can validate attendees");
            }
            let result = workflow.validate_student(&address).await;
            report(workflow.status(), result)?;
        }
        HomeCommand::View { .. } => {
            if let Some(connection) = workflow.connection() {
                let result = workflow.view_poaps(connection.address).await;
                print_poaps(&report(workflow.status(), result)?);
            }
        }
    }
    Ok(())
}

fn print_poaps(poaps: &[poap_dashboard::workflow::OwnedPoap]) {
    if poaps.is_empty() {
        println!("No POAPs found.");
    }
    for poap in poaps {
        match &poap.metadata {
            Some(m) => println!("#{}  {}  {}  {}", poap.token.token_id, m.name, m.description, m.image),
            None => println!("#{}  {}", poap.token.token_id, poap.token.token_uri),
        }
    }
}

async fn run_admin<M: MintExecutor>(
    config: &DashboardConfig,
    registry: RegistryClient,
    minter: M,
    cmd: AdminCommand,
) -> CliResult {
    let workflow = AdminMintWorkflow::new(
        registry,
        minter,
        SubmissionStore::new(),
        &config.chain.explorer_tx_url,
    );

    match cmd {
        AdminCommand::List { event_key } => {
            let result = workflow.enter(&event_key).await;
            let rows = report(workflow.status(), result)?;
            for view in rows {
                let status = match &view.row.mint_status {
                    MintStatus::Pending => "pending".to_string(),
                    MintStatus::Minted { tx_hash } => format!("minted {}", tx_hash),
                    MintStatus::MintFailed { reason } => format!("failed: {}", reason),
                };
                println!(
                    "{}  {}  {}",
                    view.row.wallet_address,
                    view.row.timestamp.to_rfc3339(),
                    status
                );
            }
        }
        AdminCommand::Mint { event_key, wallet } => {
            let result = workflow.enter(&event_key).await;
            report(workflow.status(), result)?;

            let result = workflow.mint(&event_key, &wallet).await;
            let receipt = report(workflow.status(), result)?;
            println!("Explorer: {}", workflow.explorer_url(&receipt));
            workflow.leave(&event_key);
        }
        AdminCommand::Link {
            event_key,
            expiry_minutes,
        } => {
            let expiry = expiry_minutes.unwrap_or(config.mint.default_expiry_minutes);
            let result = workflow.generate_claim_link(&event_key, expiry).await;
            let url = report(workflow.status(), result)?;
            println!("{}", url);
        }
    }
    Ok(())
}

async fn run_claim(config: &DashboardConfig, key: Option<String>, wallet: Option<String>) -> CliResult {
    let registry = RegistryClient::new(&config.backend)?;
    let workflow = ClaimWorkflow::new(registry, key.as_deref());

    match workflow.open().await {
        ClaimState::Ready {
            event_id,
            expires_at,
        } => {
            println!("🎟️ Claim your POAP");
            if let Some(event_id) = event_id {
                println!("Event:   {}", event_id);
            }
            if let Some(expires) = expires_at.and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0)) {
                println!("Expires: {}", expires.to_rfc3339());
            }
        }
        _ => {
            println!("{}", workflow.status());
            return Ok(());
        }
    }

    if let Some(wallet) = wallet {
        let result = workflow.submit(&wallet).await;
        report(workflow.status(), result)?;
    }
    Ok(())
}
