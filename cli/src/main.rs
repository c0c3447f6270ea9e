use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod config_loader;
mod node;

#[derive(Parser)]
#[command(name = "flowchain")]
#[command(about = "flowchain node, miner template builder, and wallet CLI", version)]
struct Cli {
    /// Path to a TOML config file. Defaults to `./flowchain.toml` if present;
    /// missing entirely is not an error (env/flags still apply).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full node: BlockFlow actor plus the JSON-RPC front end.
    Node,
    /// Wallet key management and offline transaction signing.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Generates a new keypair and prints its address.
    NewKey,
    /// Prints the P2PKH address for a hex-encoded Ed25519 public key.
    Address { public_key_hex: String },
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }

    match run(cli) {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(e) => {
            tracing::error!(error = %e, "flowchain exited with an error");
            std::process::ExitCode::from(node::ExitCode::Configuration as u8)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<node::ExitCode> {
    match cli.command {
        Commands::Node => {
            let config = config_loader::load(cli.config.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(node::run(config))
        }
        Commands::Wallet { action } => {
            run_wallet(action)?;
            Ok(node::ExitCode::Normal)
        }
    }
}

fn run_wallet(action: WalletAction) -> anyhow::Result<()> {
    match action {
        WalletAction::NewKey => {
            let keypair = flowchain_wallet::generate_keypair();
            let address = flowchain_wallet::address_of(&keypair.public);
            println!("secret_key: {}", hex::encode(keypair.secret.as_bytes()));
            println!("public_key: {}", hex::encode(keypair.public.as_bytes()));
            println!("address:    {}", address.encode());
        }
        WalletAction::Address { public_key_hex } => {
            let bytes = hex::decode(&public_key_hex)?;
            let public = ed25519_dalek::PublicKey::from_bytes(&bytes)?;
            println!("{}", flowchain_wallet::address_of(&public).encode());
        }
    }
    Ok(())
}
