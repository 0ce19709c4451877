//! Vara Wallet Agent CLI
//!
//! Command-line interface for running wallet actions directly or through
//! the conversational extraction path.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vara_wallet_agent::actions::ActionResponse;
use vara_wallet_agent::chain::SubxtConnector;
use vara_wallet_agent::extract::{ObjectGenerator, OpenAiObjectGenerator, UnconfiguredGenerator};
use vara_wallet_agent::{
    Config, EnvSettings, PluginDeps, Result, State, TransferContent, TransferKind, WalletPlugin,
};

#[derive(Parser)]
#[command(name = "vara-agent")]
#[command(about = "Wallet actions for Vara and Polkadot agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration (secrets omitted)
    Config,

    /// Print the agent account address
    Address,

    /// Look up the free balance of an address
    Balance {
        /// SS58 or 0x-prefixed hex address
        address: String,
    },

    /// Transfer tokens from the agent account
    Transfer {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Amount in whole tokens (e.g. 1.5)
        #[arg(long)]
        amount: String,
    },

    /// Airdrop tokens from the agent account
    Airdrop {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Amount in whole tokens (e.g. 1.5)
        #[arg(long)]
        amount: String,
    },

    /// Sign a message with the agent account
    Sign {
        #[arg(short, long)]
        message: String,
    },

    /// Run an action against a chat message (requires MODEL_API_URL)
    Chat {
        /// Action name or simile (SEND_VARA, AIRDROP, LOOKUP_BALANCE, SIGN_MESSAGE)
        #[arg(short, long)]
        action: String,

        /// The user's message
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = Config::from_settings(&EnvSettings)?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let plugin = build_plugin(&config)?;

    let succeeded = match cli.command {
        Commands::Config => true,
        Commands::Address => {
            println!("{}", plugin.address());
            true
        }
        Commands::Balance { address } => {
            let balance = plugin.balance_action().lookup(&address).await?;
            println!("Address balance of {}: {}", address, balance);
            true
        }
        Commands::Transfer { to, amount } => {
            run_transfer(&plugin, TransferKind::Send, to, amount).await
        }
        Commands::Airdrop { to, amount } => {
            run_transfer(&plugin, TransferKind::Airdrop, to, amount).await
        }
        Commands::Sign { message } => {
            let signed = plugin.sign_action().sign(&message).await?;
            println!("{}", serde_json::to_string_pretty(&signed)?);
            true
        }
        Commands::Chat { action, text } => {
            let state = State::from_message("user", text);
            plugin.dispatch(&action, &state, Some(&print_response)).await?
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn build_plugin(config: &Config) -> Result<WalletPlugin> {
    let generator: Arc<dyn ObjectGenerator> = match &config.model {
        Some(settings) => Arc::new(OpenAiObjectGenerator::new(settings)?),
        None => Arc::new(UnconfiguredGenerator),
    };

    WalletPlugin::new(
        config,
        PluginDeps {
            generator,
            connector: Arc::new(SubxtConnector::new(config.network)),
            wallet_connector: None,
        },
    )
}

async fn run_transfer(
    plugin: &WalletPlugin,
    kind: TransferKind,
    to: String,
    amount: String,
) -> bool {
    let content = TransferContent {
        recipient: to,
        amount: amount.as_str().into(),
    };
    plugin
        .transfer_action(kind)
        .execute(&content, Some(&print_response))
        .await
}

fn print_response(response: ActionResponse) {
    println!("{}", response.text);
    if response.content.as_object().is_some_and(|c| !c.is_empty()) {
        println!("{}", response.content);
    }
}
