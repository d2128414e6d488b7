//! Clones CLI
//!
//! Command-line client for the Cool x Clones mint.
//!
//! ## Commands
//!
//! - `status` - Show the wallet session, network and mint limit
//! - `connect` - Connect the wallet and remember the provider
//! - `disconnect` - Forget the wallet session
//! - `quote` - Price a mint without sending anything
//! - `stats` - Show supply and pause state of a collection
//! - `mint` - Mint tokens and wait for confirmation
//! - `switch-chain` - Ask the wallet to change network

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clones_core::config::{HolderCheck, MintTarget, MintVariant};
use clones_core::error::ClonesError;
use clones_core::types::ChainClass;
use clones_core::ClonesConfig;
use clones_display::{check_holder, refresh, DisplayState, EligibilityChecker, EnsNameCache};
use clones_mint::{wei_to_ether, MintContract, MintOptions, MintOutcome, MintTracker, PriceQuote};
use clones_rpc::{RpcConfig, RpcWalletConnector};
use clones_session::{FileProviderCache, SessionManager};

// ═══════════════════════════════════════════════════════════════════════════════
// CLI DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Parser)]
#[command(name = "clones")]
#[command(author = "Cool x Clones Team")]
#[command(version)]
#[command(about = "Wallet session and mint client for Cool x Clones", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true, env = "CLONES_CONFIG")]
    config: Option<PathBuf>,

    /// Wallet RPC endpoint
    #[arg(long, global = true, env = "CLONES_RPC_URL")]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the wallet session, network and mint limit
    Status {
        /// Print the display state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect the wallet
    Connect,

    /// Forget the wallet session
    Disconnect,

    /// Price a mint without sending anything
    Quote {
        /// Mint target name (vials, vial, king, queen)
        #[arg(short, long, default_value = "vials")]
        target: String,

        /// Number of tokens
        #[arg(short, long, default_value = "1")]
        quantity: u32,

        /// Vial id for per-token mints
        #[arg(long)]
        token_id: Option<u64>,
    },

    /// Show supply and pause state of a collection
    Stats {
        /// Mint target name
        #[arg(short, long, default_value = "vials")]
        target: String,

        /// Vial id for per-token mints
        #[arg(long)]
        token_id: Option<u64>,
    },

    /// Mint tokens and wait for confirmation
    Mint {
        /// Mint target name
        #[arg(short, long, default_value = "vials")]
        target: String,

        /// Number of tokens
        #[arg(short, long, default_value = "1")]
        quantity: u32,

        /// Vial id for per-token mints
        #[arg(long)]
        token_id: Option<u64>,

        /// Explicit gas limit
        #[arg(long)]
        gas_limit: Option<u64>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask the wallet to change network
    SwitchChain {
        /// `mainnet`, `testnet` or a numeric chain id
        network: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "clones=debug,info"
    } else {
        "clones=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = App::build(cli.config, cli.rpc_url)?;

    let result = match cli.command {
        Commands::Status { json } => cmd_status(&app, json).await,
        Commands::Connect => cmd_connect(&app).await,
        Commands::Disconnect => cmd_disconnect(&app).await,
        Commands::Quote {
            target,
            quantity,
            token_id,
        } => cmd_quote(&app, &target, quantity, token_id).await,
        Commands::Stats { target, token_id } => cmd_stats(&app, &target, token_id).await,
        Commands::Mint {
            target,
            quantity,
            token_id,
            gas_limit,
            yes,
        } => cmd_mint(&app, &target, quantity, token_id, gas_limit, yes).await,
        Commands::SwitchChain { network } => cmd_switch_chain(&app, &network).await,
    };

    report(result)
}

/// Prints client errors once as a short message; anything else is left to
/// anyhow's report.
fn report(result: Result<()>) -> Result<ExitCode> {
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<ClonesError>() {
            Some(clones) => {
                eprintln!("{} {}", "✗".red().bold(), clones.user_message().red());
                debug!(error = ?e, "Command failed");
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}

struct App {
    config: ClonesConfig,
    manager: Arc<SessionManager>,
    ens_cache: EnsNameCache,
    checker: EligibilityChecker,
}

impl App {
    fn build(config_path: Option<PathBuf>, rpc_url: Option<String>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => ClonesConfig::from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ClonesConfig::from_env().context("Failed to load configuration")?,
        };
        if let Some(url) = rpc_url {
            config.rpc_url = url;
        }
        config.validate().context("Invalid configuration")?;
        debug!(rpc_url = %config.rpc_url, cache = ?config.provider_cache_path, "Starting");

        let connector = RpcWalletConnector::new(RpcConfig::from(&config), config.ens_registry)
            .with_provider_id(config.provider_id.clone());
        let cache = FileProviderCache::new(&config.provider_cache_path);
        let manager = SessionManager::new(
            Arc::new(connector),
            Arc::new(cache),
            config.networks.clone(),
        );

        Ok(Self {
            checker: EligibilityChecker::new(config.eligibility.clone()),
            ens_cache: EnsNameCache::new(),
            config,
            manager,
        })
    }

    /// Restores a remembered session; fails if there is none.
    async fn require_session(&self) -> Result<()> {
        self.manager
            .auto_reconnect()
            .await
            .context("Failed to restore the wallet session")?;
        if !self.manager.snapshot().is_connected() {
            bail!("No wallet connected. Run `clones connect` first.");
        }
        Ok(())
    }

    fn contract(&self, target: &str, token_id: Option<u64>) -> Result<(MintTarget, MintContract)> {
        let mut target = self.config.mint(target)?.clone();
        if let Some(id) = token_id {
            target = target.with_token_id(id);
        }
        let class = self
            .manager
            .snapshot()
            .chain_class()
            .context("No wallet connected")?;
        let contract = MintContract::for_target(&target, class)?;
        Ok((target, contract))
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_session(state: &DisplayState) {
    if !state.connected {
        println!("  {} {}", "Wallet:".bold(), "not connected".yellow());
        return;
    }

    println!("  {} {}", "Wallet:".bold(), state.label.green());
    println!("  {} {}", "Address:".bold(), state.address);
    if let Some(chain_id) = state.chain_id {
        println!("  {} {}", "Chain:".bold(), chain_id);
    }
    if let Some(notice) = state.notice {
        println!("  {} {}", "!".yellow().bold(), notice.to_string().yellow());
    }
    if let Some(max) = state.max_per_transaction {
        println!("  {} {}", "Max per transaction:".bold(), max);
    }
    if !state.holds.is_empty() {
        println!("  {} {}", "Holds:".bold(), state.holds.join(", "));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

async fn cmd_status(app: &App, json: bool) -> Result<()> {
    app.manager
        .auto_reconnect()
        .await
        .context("Failed to restore the wallet session")?;

    let state = refresh(&app.manager, &app.ens_cache, &app.checker).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("{}", "Cool x Clones".cyan().bold());
    println!();
    print_session(&state);

    let session = app.manager.snapshot();
    if let (Some(reader), Some(owner), true) =
        (session.reader(), session.address(), state.mint_enabled)
    {
        for target in &app.config.mints {
            let (MintVariant::Honorary { title }, Some(contract)) =
                (target.variant, target.address(ChainClass::Mainnet))
            else {
                continue;
            };
            let check = HolderCheck::erc1155(target.name.as_str(), contract, title.token_id());
            if let Ok(true) = check_holder(reader.as_ref(), &check, owner).await {
                println!("  {} {} holder", "♛".yellow().bold(), target.name);
            }
        }
    }

    Ok(())
}

async fn cmd_connect(app: &App) -> Result<()> {
    let pb = spinner("Connecting wallet...")?;
    let result = app.manager.connect().await;
    pb.finish_and_clear();
    result.context("Failed to connect wallet")?;

    let state = refresh(&app.manager, &app.ens_cache, &app.checker).await;
    println!("{} Wallet connected", "✓".green().bold());
    print_session(&state);
    Ok(())
}

async fn cmd_disconnect(app: &App) -> Result<()> {
    app.manager.disconnect().await.context("Failed to disconnect")?;
    println!("{} Wallet disconnected", "✓".green().bold());
    Ok(())
}

async fn cmd_quote(app: &App, target: &str, quantity: u32, token_id: Option<u64>) -> Result<()> {
    app.require_session().await?;
    let (target, contract) = app.contract(target, token_id)?;
    let reader = app
        .manager
        .snapshot()
        .reader()
        .context("No wallet connected")?;

    let unit = contract
        .price(reader.as_ref())
        .await
        .context("Failed to read mint price")?;
    let quote = PriceQuote::compute(wei_to_ether(unit), quantity, target.precision);

    println!("{}", format!("Quote for {}", target.name).cyan().bold());
    println!();
    println!("  {} {}", "Quantity:".bold(), quote.quantity);
    println!("  {} {} ETH", "Total:".bold(), quote.total.green());
    println!("  {} {} ETH", "Towards prize:".bold(), quote.towards_prize);
    Ok(())
}

async fn cmd_stats(app: &App, target: &str, token_id: Option<u64>) -> Result<()> {
    app.require_session().await?;
    let (target, contract) = app.contract(target, token_id)?;
    let reader = app
        .manager
        .snapshot()
        .reader()
        .context("No wallet connected")?;

    let stats = contract
        .stats(reader.as_ref())
        .await
        .context("Failed to read collection stats")?;

    println!("{}", target.name.cyan().bold());
    println!();
    println!("  {} {}", "Contract:".bold(), contract.address());
    println!("  {} {} ETH", "Price:".bold(), stats.price_ether());
    println!("  {} {} / {}", "Minted:".bold(), stats.minted, stats.max_supply);
    if stats.paused {
        println!("  {}", "Minting is paused".yellow());
    }
    if stats.is_sold_out() {
        println!("  {}", "Sold out".red().bold());
    }
    Ok(())
}

async fn cmd_mint(
    app: &App,
    target: &str,
    quantity: u32,
    token_id: Option<u64>,
    gas_limit: Option<u64>,
    yes: bool,
) -> Result<()> {
    app.require_session().await?;
    let state = refresh(&app.manager, &app.ens_cache, &app.checker).await;
    let (target, contract) = app.contract(target, token_id)?;

    let reader = app
        .manager
        .snapshot()
        .reader()
        .context("No wallet connected")?;
    let unit = contract
        .price(reader.as_ref())
        .await
        .context("Failed to read mint price")?;

    let (quantity, max) = if target.variant.takes_quantity() {
        let max = state
            .max_per_transaction
            .unwrap_or(app.config.eligibility.baseline);
        (quantity, max)
    } else {
        (1, 1)
    };

    let mut options = MintOptions::for_target(&target, unit, quantity).max_quantity(max);
    if let Some(gas) = gas_limit {
        options = options.gas_limit(gas);
    }

    let quote = PriceQuote::compute(wei_to_ether(unit), quantity, target.precision);
    println!("{}", format!("Minting {}", target.name).cyan().bold());
    println!();
    println!("  {} {}", "To:".bold(), state.label);
    println!("  {} {} (max {})", "Quantity:".bold(), quantity, max);
    if target.priced {
        println!("  {} {} ETH", "Total:".bold(), quote.total.green());
        println!("  {} {} ETH", "Towards prize:".bold(), quote.towards_prize);
    }
    if let Some(notice) = state.notice {
        println!("  {} {}", "!".yellow().bold(), notice.to_string().yellow());
    }
    println!();

    if !yes {
        let proceed = Confirm::new()
            .with_prompt("Send the mint transaction?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("Cancelled");
            return Ok(());
        }
    }

    let tracker = MintTracker::new(Arc::clone(&app.manager));
    let hash = tracker
        .submit(&contract, quantity, &options)
        .await
        .context("Mint was not submitted")?;

    println!("{} Submitted {}", "✓".green().bold(), hash);
    if let Some(url) = state.explorer_tx_url(&hash) {
        println!("  {}", url.dimmed());
    }

    let pb = spinner("Waiting for confirmation...")?;
    let outcome = tracker.confirm().await;
    match outcome.context("Lost track of the mint transaction")? {
        MintOutcome::Confirmed(_) => {
            pb.finish_with_message(format!("{} Mint confirmed", "✓".green().bold()));
        }
        MintOutcome::Failed(_) => {
            pb.finish_with_message(format!("{} Mint reverted", "✗".red().bold()));
            if let Some(reason) = tracker.last_error() {
                println!("  {}", reason.red());
            }
        }
        MintOutcome::Abandoned(_) => {
            pb.finish_with_message(format!(
                "{} Wallet session changed while waiting",
                "!".yellow().bold()
            ));
        }
    }

    Ok(())
}

async fn cmd_switch_chain(app: &App, network: &str) -> Result<()> {
    app.require_session().await?;

    let networks = app.manager.networks();
    let chain_id = match network.to_ascii_lowercase().as_str() {
        "mainnet" => networks.chain_id(ChainClass::Mainnet),
        "testnet" => networks.chain_id(ChainClass::Testnet),
        other => other.parse::<u64>().ok(),
    }
    .with_context(|| format!("Unknown network '{network}'"))?;

    app.manager
        .switch_chain(chain_id)
        .await
        .context("Failed to switch network")?;

    println!("{} Switched to chain {}", "✓".green().bold(), chain_id);
    Ok(())
}
