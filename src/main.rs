//! Adventure Client - command line front end
//!
//! Plays the on-chain adventure game from a terminal: initializes the level,
//! moves the player, watches the game account and shows what the chain
//! holds. Also covers the wallet side of the game client: SOL/SPL transfers,
//! signature status checks and pool price quotes.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adventure_client::config::Config;
use adventure_client::confirmation::ConfirmationPoller;
use adventure_client::endpoints;
use adventure_client::events::{ClientEvent, EventBus, TransactionInfoStatus};
use adventure_client::pricing::{to_base_units, PoolPrice, SwapDirection};
use adventure_client::program::{
    instructions, AdventureClient, InitializeAccounts, MoveRightAccounts,
    ResetLevelAndSpawnChestAccounts,
};
use adventure_client::rpc_manager::{AccountWatcher, ChainRpc, SolanaRpc};
use adventure_client::session::{parse_pubkey, TxSession};
use adventure_client::tx_builder::TransactionSubmitter;
use adventure_client::wallet::WalletManager;
use adventure_client::{cancel_pair, CancelSignal, ConfirmationLevel};

const LAMPORTS_DECIMALS: u8 = 9;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Metrics port (overrides the config file)
    #[arg(long)]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the game data account and chest vault
    Initialize {
        #[arg(long)]
        game_data: String,
        #[arg(long)]
        chest_vault: String,
    },
    /// Reset the level and put a new chest in the vault
    Reset {
        #[arg(long)]
        game_data: String,
        #[arg(long)]
        chest_vault: String,
    },
    /// Move the player one step right
    MoveRight {
        #[arg(long)]
        game_data: String,
        #[arg(long)]
        chest_vault: String,
    },
    /// Print the game data account and chest vault
    Show {
        #[arg(long)]
        game_data: String,
        #[arg(long)]
        chest_vault: Option<String>,
    },
    /// List every game account owned by the program
    List,
    /// Stream player position changes until Ctrl-C
    Watch {
        #[arg(long)]
        game_data: String,
    },
    /// Poll a signature until it reaches the target level
    Status {
        signature: String,
        #[arg(long)]
        target: Option<ConfirmationLevel>,
    },
    /// Send SOL from the wallet
    TransferSol {
        to: String,
        /// Amount in SOL
        amount: f64,
    },
    /// Send SPL tokens from the wallet's associated token account
    TransferToken {
        destination: String,
        mint: String,
        /// Amount in display units
        amount: f64,
        #[arg(long, default_value = "6")]
        decimals: u8,
    },
    /// Send one NFT out of a token account
    TransferNft {
        destination: String,
        mint: String,
        source_token_account: String,
    },
    /// Quote a swap against a pool's sqrt price
    Quote {
        #[arg(long)]
        sqrt_price_x64: u128,
        #[arg(long)]
        decimals_a: u8,
        #[arg(long)]
        decimals_b: u8,
        amount: f64,
        /// Quote B -> A instead of A -> B
        #[arg(long)]
        reverse: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.json_logs)?;

    info!("Starting Adventure Client v{}", env!("CARGO_PKG_VERSION"));

    // Pure computation, no config or network needed
    if let Command::Quote {
        sqrt_price_x64,
        decimals_a,
        decimals_b,
        amount,
        reverse,
    } = &args.command
    {
        return run_quote(*sqrt_price_x64, *decimals_a, *decimals_b, *amount, *reverse);
    }

    info!("Loading configuration from: {}", args.config);
    let config = load_config(&args.config)?;

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            cancel_handle.cancel();
        }
    });

    if config.monitoring.enable_metrics {
        let port = args.metrics_port.unwrap_or(config.monitoring.metrics_port);
        info!("Starting metrics server on port {}", port);
        let metrics_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(port, metrics_cancel).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let events = EventBus::default();
    spawn_event_printer(&events);

    info!("Connecting to RPC: {}", config.rpc.http_url);
    let rpc: Arc<dyn ChainRpc> = Arc::new(SolanaRpc::new(
        &config.rpc.http_url,
        config.rpc_timeout(),
        config.commitment(),
        config.rpc.skip_preflight,
    ));

    let outcome = run_command(args.command, &config, rpc, events, cancel).await;
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}

async fn run_command(
    command: Command,
    config: &Config,
    rpc: Arc<dyn ChainRpc>,
    events: EventBus,
    cancel: CancelSignal,
) -> Result<()> {
    let poller = Arc::new(ConfirmationPoller::new(
        Arc::clone(&rpc),
        events.clone(),
        config.confirmation.clone(),
    ));

    match command {
        Command::Status { signature, target } => {
            let target = target.unwrap_or(config.confirmation.target);
            let outcome = poller.wait_for(&signature, target, &cancel).await;
            info!(state = ?outcome.state, attempts = outcome.attempts, "Status check finished");
            return Ok(());
        }
        Command::List => {
            let client = program_client(config, Arc::clone(&rpc))?;
            for (address, game) in client.get_game_data_accounts().await? {
                println!("game data  {}  {}", address, serde_json::to_string(&game)?);
            }
            for (address, _) in client.get_chest_vaults().await? {
                println!("chest vault {}", address);
            }
            return Ok(());
        }
        Command::Show {
            game_data,
            chest_vault,
        } => {
            let client = program_client(config, Arc::clone(&rpc))?;
            let game_data = parse_pubkey("game data account", &game_data)?;
            match client.get_game_data_account(&game_data).await? {
                Some(game) => println!("{}", serde_json::to_string_pretty(&game)?),
                None => warn!("Game data account {} does not exist", game_data),
            }
            if let Some(chest_vault) = chest_vault {
                let chest_vault = parse_pubkey("chest vault", &chest_vault)?;
                let present = client.get_chest_vault(&chest_vault).await?.is_some();
                let state = if present { "present" } else { "missing" };
                println!("chest vault {}: {}", chest_vault, state);
            }
            return Ok(());
        }
        Command::Watch { game_data } => {
            let client = program_client(config, Arc::clone(&rpc))?;
            let game_data = parse_pubkey("game data account", &game_data)?;
            let (mut updates, task) = client
                .subscribe_game_data_account(game_data, cancel.clone())
                .await?;
            while let Some(Some((slot, game))) = cancel.run(updates.next_account()).await {
                println!("slot {}: player at {}", slot, game.player_position);
            }
            task.abort();
            return Ok(());
        }
        _ => {}
    }

    // Everything below signs with the configured wallet
    let keypair_path = config.keypair_path();
    info!("Loading wallet from: {}", keypair_path);
    let wallet = WalletManager::from_file(&keypair_path).context("Failed to load wallet")?;
    info!("Wallet address: {}", wallet.pubkey());

    let submitter = Arc::new(TransactionSubmitter::from_config(
        Arc::clone(&rpc),
        events.clone(),
        config,
    ));
    let session = TxSession::new(submitter, poller, Arc::new(wallet), events);
    let signer = session.wallet_pubkey();

    match command {
        Command::Initialize {
            game_data,
            chest_vault,
        } => {
            let program_id = config.program_id()?;
            let accounts = InitializeAccounts::new(
                parse_pubkey("game data account", &game_data)?,
                parse_pubkey("chest vault", &chest_vault)?,
                signer,
            );
            let instruction = instructions::initialize(&accounts, &program_id);
            send_and_wait(&session, "initialize", instruction, &cancel).await
        }
        Command::Reset {
            game_data,
            chest_vault,
        } => {
            let program_id = config.program_id()?;
            let accounts = ResetLevelAndSpawnChestAccounts::new(
                parse_pubkey("chest vault", &chest_vault)?,
                parse_pubkey("game data account", &game_data)?,
                signer,
            );
            send_and_wait(
                &session,
                "reset_level_and_spawn_chest",
                instructions::reset_level_and_spawn_chest(&accounts, &program_id),
                &cancel,
            )
            .await
        }
        Command::MoveRight {
            game_data,
            chest_vault,
        } => {
            let program_id = config.program_id()?;
            let accounts = MoveRightAccounts::new(
                parse_pubkey("game data account", &game_data)?,
                parse_pubkey("chest vault", &chest_vault)?,
                signer,
            );
            let instruction = instructions::move_right(&accounts, &program_id);
            send_and_wait(&session, "move_right", instruction, &cancel).await
        }
        Command::TransferSol { to, amount } => {
            let to = parse_pubkey("recipient", &to)?;
            let lamports = to_base_units(amount, LAMPORTS_DECIMALS)?;
            let receipt = session.transfer_sol(&to, lamports, &cancel).await?;
            info!(confirmed = receipt.is_confirmed(), "SOL transfer finished");
            Ok(())
        }
        Command::TransferToken {
            destination,
            mint,
            amount,
            decimals,
        } => {
            let destination = parse_pubkey("destination", &destination)?;
            let mint = parse_pubkey("mint", &mint)?;
            let base_units = to_base_units(amount, decimals)?;
            let receipt = session
                .transfer_token(&destination, &mint, base_units, &cancel)
                .await?;
            info!(confirmed = receipt.is_confirmed(), "Token transfer finished");
            Ok(())
        }
        Command::TransferNft {
            destination,
            mint,
            source_token_account,
        } => {
            let receipt = session
                .transfer_nft(
                    &parse_pubkey("destination", &destination)?,
                    &parse_pubkey("mint", &mint)?,
                    &parse_pubkey("source token account", &source_token_account)?,
                    &cancel,
                )
                .await?;
            info!(confirmed = receipt.is_confirmed(), "NFT transfer finished");
            Ok(())
        }
        Command::Status { .. }
        | Command::List
        | Command::Show { .. }
        | Command::Watch { .. }
        | Command::Quote { .. } => Ok(()),
    }
}

async fn send_and_wait(
    session: &TxSession,
    name: &str,
    instruction: solana_sdk::instruction::Instruction,
    cancel: &CancelSignal,
) -> Result<()> {
    let receipt = session
        .send_instruction_in_next_block(
            name,
            instruction,
            cancel,
            Some(|signature: Signature| info!(%signature, "Done")),
        )
        .await?;
    if !receipt.is_confirmed() {
        warn!("{} was not confirmed", name);
    }
    Ok(())
}

fn program_client(config: &Config, rpc: Arc<dyn ChainRpc>) -> Result<AdventureClient> {
    let program_id: Pubkey = config.program_id()?;
    let commitment: CommitmentConfig = config.commitment();
    let watcher = AccountWatcher::new(config.rpc.ws_url.clone(), commitment);
    Ok(AdventureClient::new(rpc, watcher, program_id, commitment))
}

fn run_quote(
    sqrt_price_x64: u128,
    decimals_a: u8,
    decimals_b: u8,
    amount: f64,
    reverse: bool,
) -> Result<()> {
    let pool = PoolPrice {
        sqrt_price_x64,
        decimals_a,
        decimals_b,
    };
    let direction = if reverse {
        SwapDirection::BToA
    } else {
        SwapDirection::AToB
    };
    let out = pool.quote(amount, direction)?;
    let input = pool.input_base_units(amount, direction)?;
    println!("price: {:.9}", pool.price());
    println!("in:    {} ({} base units)", amount, input);
    println!("out:   {:.9}", out);
    Ok(())
}

/// Mirror bus events the tracing layer does not already show
fn spawn_event_printer(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                ClientEvent::TransactionInfo { name, status, correlation_id } => {
                    let id = correlation_id.short();
                    match status {
                        TransactionInfoStatus::Pending => info!(%id, "{}: pending", name),
                        TransactionInfoStatus::SignatureReady(sig) => {
                            info!(%id, "{}: sent {}", name, sig)
                        }
                        TransactionInfoStatus::Confirmed => info!(%id, "{}: confirmed", name),
                        TransactionInfoStatus::Error(reason) => warn!(%id, "{}: {}", name, reason),
                    }
                }
                ClientEvent::ValueChanged => info!("On-chain state changed"),
                ClientEvent::LogMessage { .. } => {}
            }
        }
    });
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "adventure_client=debug,info"
    } else {
        "adventure_client=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

/// Load configuration from file, falling back to environment and defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults and environment", path);
        Config::from_env()
    }
}
