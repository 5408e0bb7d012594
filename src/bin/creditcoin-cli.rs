use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use creditcoin_sdk::account::ss58;
use creditcoin_sdk::chain::units;
use creditcoin_sdk::config::load_with_env;
use creditcoin_sdk::observability::init_logging;
use creditcoin_sdk::{Account, CreditcoinClient, DealStatus, OrderStatus};

/// Environment variable holding the signing secret (mnemonic, hex seed or URI).
const SECRET_ENV_VAR: &str = "CREDITCOIN_SECRET";

#[derive(Parser)]
#[command(name = "creditcoin-cli")]
#[command(about = "Command-line client for the Creditcoin network", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node URL, overriding configuration and environment.
    #[arg(short, long)]
    url: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new account (offline)
    NewAccount {
        #[arg(short, long, default_value_t = 12)]
        words: usize,
    },
    /// Decode and check an address (offline)
    Inspect { address: String },
    /// Show balances of one or more addresses
    Balance {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Transfer CTC from the account in CREDITCOIN_SECRET
    Transfer {
        #[arg(long)]
        to: String,
        /// Amount in CTC, e.g. 1.5
        #[arg(long)]
        amount: String,
    },
    /// Estimate the fee of a transfer from the account in CREDITCOIN_SECRET
    Fee {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    /// Show a block (latest if no number is given)
    Block { number: Option<u64> },
    /// Show network statistics
    Stats,
    /// List recent transfers involving an address
    History {
        address: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// List marketplace orders or deals
    Orders {
        #[arg(value_enum)]
        kind: OrderKind,
        /// Lender, borrower or participant address
        #[arg(long)]
        address: Option<String>,
        /// Status filter, e.g. active, filled, pending
        #[arg(long)]
        status: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderKind {
    Asks,
    Bids,
    Deals,
}

fn signer(client: &CreditcoinClient) -> Result<Account, Box<dyn std::error::Error>> {
    let secret = std::env::var(SECRET_ENV_VAR)
        .map_err(|_| format!("{} is not set", SECRET_ENV_VAR))?;
    Ok(Account::from_secret(&secret, client.config().network.ss58_format)?)
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_with_env(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.network.url = url;
    }
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    init_logging(&config.observability);

    // Offline commands.
    match &cli.command {
        Commands::NewAccount { words } => {
            let account = Account::generate(*words, config.network.ss58_format)?;
            return print_json(&json!({
                "address": account.address(),
                "mnemonic": account.mnemonic(),
                "public_key": format!("0x{}", hex::encode(account.public_key())),
            }));
        }
        Commands::Inspect { address } => {
            let output = match ss58::decode(address) {
                Ok((format, key)) => json!({
                    "address": address,
                    "valid": true,
                    "ss58_format": format,
                    "public_key": format!("0x{}", hex::encode(key)),
                }),
                Err(e) => json!({ "address": address, "valid": false, "error": e.to_string() }),
            };
            return print_json(&output);
        }
        _ => {}
    }

    let client = CreditcoinClient::connect(config).await?;

    let output = match cli.command {
        Commands::Balance { addresses } => {
            let results = client.get_balances_bulk(&addresses).await;
            let entries: Vec<Value> = results
                .into_iter()
                .map(|(address, result)| match result {
                    Ok(b) => json!({
                        "address": address,
                        "free": b.balance_ctc().to_string(),
                        "locked": b.locked_ctc().to_string(),
                        "reserved": b.reserved_ctc().to_string(),
                        "total": b.total_ctc().to_string(),
                        "nonce": b.nonce,
                    }),
                    Err(e) => json!({ "address": address, "error": e.to_string() }),
                })
                .collect();
            Value::Array(entries)
        }
        Commands::Transfer { to, amount } => {
            let from = signer(&client)?;
            let amount = units::from_planck(units::parse_ctc(&amount)?);
            let receipt = client.transfer(&from, &to, amount).await?;
            json!({
                "tx_hash": receipt.tx_hash,
                "block_hash": receipt.block_hash,
                "block_number": receipt.block_number,
                "status": receipt.status,
                "fee": receipt.fee_ctc().to_string(),
                "events": receipt.events,
            })
        }
        Commands::Fee { to, amount } => {
            let from = signer(&client)?;
            let amount = units::from_planck(units::parse_ctc(&amount)?);
            let fee = client.get_transfer_fee_estimate(&from, &to, amount).await?;
            json!({ "fee": units::from_planck(fee).to_string(), "symbol": units::SYMBOL })
        }
        Commands::Block { number } => serde_json::to_value(client.get_block_info(number).await?)?,
        Commands::Stats => serde_json::to_value(client.get_network_stats().await?)?,
        Commands::History { address, limit } => {
            serde_json::to_value(client.get_transactions_by_address(&address, limit).await?)?
        }
        Commands::Orders { kind, address, status } => {
            let marketplace = client.marketplace();
            let address = address.as_deref();
            match kind {
                OrderKind::Asks => {
                    let status = status.map(|s| s.parse::<OrderStatus>()).transpose()?;
                    serde_json::to_value(marketplace.get_ask_orders(address, status).await?)?
                }
                OrderKind::Bids => {
                    let status = status.map(|s| s.parse::<OrderStatus>()).transpose()?;
                    serde_json::to_value(marketplace.get_bid_orders(address, status).await?)?
                }
                OrderKind::Deals => {
                    let status = status.map(|s| s.parse::<DealStatus>()).transpose()?;
                    serde_json::to_value(marketplace.get_credit_deals(address, status).await?)?
                }
            }
        }
        Commands::NewAccount { .. } | Commands::Inspect { .. } => Value::Null,
    };

    print_json(&output)?;
    client.close();
    Ok(())
}
