//! `linkdrop` command-line tool.
//!
//! Offline commands work on claim URLs and link keys directly. `status` and `limits`
//! talk to the escrow API configured through `LINKDROP_*` environment variables
//! (a `.env` file is honoured).

mod run;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use linkdrop_types::chain::ChainId;
use linkdrop_types::token::TokenType;

const DEFAULT_BASE_URL: &str = "https://p2p.linkdrop.io";

#[derive(Parser)]
#[command(name = "linkdrop", version, about = "Create and inspect Linkdrop claim links")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draw a fresh link key and print its transfer id and claim URL.
    GenerateKey {
        #[arg(long)]
        chain: ChainId,
        #[arg(long, env = "LINKDROP_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Encode a claim URL for an existing link key.
    Encode {
        /// Base58 link key.
        #[arg(long)]
        key: String,
        #[arg(long)]
        chain: ChainId,
        /// Transfer id, when it differs from the key's address.
        #[arg(long)]
        transfer_id: Option<Address>,
        #[arg(long, env = "LINKDROP_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Decode a claim URL.
    Decode { url: String },
    /// Sign a receiver address with a link key.
    ReceiverSig {
        #[arg(long)]
        key: String,
        #[arg(long)]
        receiver: Address,
    },
    /// Print the version of a known escrow contract.
    EscrowVersion { escrow: Address },
    /// Fetch the escrow's record for a claim URL.
    Status { url: String },
    /// Fetch transfer limits for a fungible token.
    Limits {
        #[arg(long)]
        chain: ChainId,
        #[arg(long, value_enum, default_value = "native")]
        token_type: TokenType,
        #[arg(long, default_value_t = Address::ZERO)]
        token: Address,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    #[cfg(feature = "telemetry")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run::run(cli.command).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
