use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ledger_bridge::channel::ChannelSession;
use ledger_bridge::config::EndpointConfig;
use ledger_bridge::ledger_rpc::ledger_types::{Asset, BookOffersRequest};
use ledger_bridge::ledger_rpc::order_book::aggregate;
use ledger_bridge::ledger_rpc::rpcclient::{LedgerClient, LedgerJsonRpcClient};
use ledger_bridge::ledger_rpc::transaction::{PaymentIntent, TransactionIntent};
use ledger_bridge::ledger_rpc::LedgerSession;
use ledger_bridge::wallet::codec::{self, Alphabet};
use ledger_bridge::wallet::{Wallet, sign_message};
use log::{error, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ledger JSON-RPC endpoint (overrides LEDGER_RPC_URL)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Push channel endpoint (overrides CHANNEL_URL)
    #[arg(long)]
    channel_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a random seed and show its first address
    NewSeed,
    /// Show addresses and public keys derived from a seed
    Derive {
        #[arg(short, long)]
        seed: String,
        #[arg(short, long, default_value = "0")]
        index: u32,
        #[arg(short, long, default_value = "1")]
        count: u32,
    },
    /// Decode an encoded identifier and show its version and payload
    Inspect {
        text: String,
        /// Use the generic alphabet instead of the ledger alphabet
        #[arg(long)]
        generic: bool,
    },
    /// Show the aggregated order book for a pair
    Book {
        /// Asset offered: `XRP` or `CUR:issuer`
        #[arg(long)]
        pays: String,
        /// Asset requested: `XRP` or `CUR:issuer`
        #[arg(long)]
        gets: String,
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
    /// Send a payment from one of the seed's accounts
    Pay {
        #[arg(short, long)]
        seed: String,
        #[arg(long, default_value = "0")]
        from_index: u32,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "XRP")]
        currency: String,
        #[arg(long)]
        issuer: Option<String>,
    },
    /// Sign a text message with one of the seed's accounts
    SignMessage {
        #[arg(short, long)]
        seed: String,
        #[arg(short, long, default_value = "0")]
        index: u32,
        message: String,
    },
    /// Connect to the push channel and print incoming events
    Listen {
        #[arg(long)]
        sid: Option<String>,
        /// Event names to print
        #[arg(short, long, default_values_t = vec!["open".to_string(), "close".to_string()])]
        event: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    let mut config = EndpointConfig::from_env();
    if let Some(url) = args.rpc_url {
        config.update_ledger_rpc_endpoint(url);
    }
    if let Some(url) = args.channel_url {
        config.update_channel_endpoint(url);
    }

    match args.command {
        Command::NewSeed => {
            let wallet = Wallet::random();
            println!("seed:    {}", wallet.seed_text());
            println!("address: {}", wallet.address(0)?);
        }
        Command::Derive { seed, index, count } => {
            let wallet = Wallet::from_seed_str(&seed).context("invalid seed")?;
            for i in index..index.saturating_add(count) {
                let keys = wallet.account(i)?;
                println!("{:>4}  {}  {}", i, keys.address, keys.public_key_hex());
            }
        }
        Command::Inspect { text, generic } => {
            let alphabet = if generic {
                Alphabet::Generic
            } else {
                Alphabet::Ledger
            };
            let (version, payload) = codec::decode_any_with(alphabet, &text)?;
            println!("version: {}", version);
            println!("payload: {}", hex::encode_upper(payload));
        }
        Command::Book { pays, gets, limit } => {
            let offered: Asset = pays.parse()?;
            let requested: Asset = gets.parse()?;
            let client = LedgerJsonRpcClient::new(&config.ledger_rpc_endpoint)?;
            let offers = client
                .book_offers(&BookOffersRequest::for_pair(&offered, &requested, limit))
                .await
                .context("book_offers failed")?;
            println!("{:>14} {:>14} {:>12}", "offered", "requested", "price");
            for entry in aggregate(&offers, &offered, &requested, limit as usize) {
                println!(
                    "{:>14.5} {:>14.5} {:>12.5}",
                    entry.offered, entry.requested, entry.price
                );
            }
        }
        Command::Pay {
            seed,
            from_index,
            to,
            amount,
            currency,
            issuer,
        } => {
            let wallet = Wallet::from_seed_str(&seed).context("invalid seed")?;
            let account = wallet.address(from_index)?;
            let mut ledger_config = config.to_ledger_endpoint_config();
            ledger_config.account_scan_limit = ledger_config.account_scan_limit.max(from_index + 1);
            let mut session = LedgerSession::connect(wallet, Some(ledger_config))?;
            let intent = TransactionIntent::Payment(PaymentIntent {
                account: account.clone(),
                destination: to,
                amount,
                currency,
                issuer,
            });
            match session.execute(intent).await {
                Ok(result) => {
                    info!("{}: {}", result.engine_result, result.tx_hash().unwrap_or_default());
                    if let Some(balance) = session.balance(&account) {
                        println!("balance of {}: {} drops", account, balance);
                    }
                }
                Err(e) => {
                    error!("payment failed: {}", e);
                    return Err(anyhow!(e));
                }
            }
        }
        Command::SignMessage {
            seed,
            index,
            message,
        } => {
            let wallet = Wallet::from_seed_str(&seed).context("invalid seed")?;
            let bundle = sign_message(&wallet.account(index)?, &message)?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        Command::Listen { sid, event } => {
            let mut session = ChannelSession::websocket(config.to_channel_endpoint_config());
            session.set_session_id(sid);
            for name in event {
                let label = name.clone();
                session.on(&name, move |data| {
                    println!("{}: {}", label, data);
                    Ok(())
                });
            }
            session.connect()?;
            match tokio::time::timeout(Duration::from_secs(10), session.wait_ready()).await {
                Ok(Ok(())) => info!("channel ready"),
                Ok(Err(e)) => return Err(anyhow!(e)),
                Err(_) => warn!("channel not ready after 10s; continuing to retry"),
            }

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                    trigger.cancel();
                }
            });
            session.run(cancel).await;
            info!("swallowed responses: {}", session.swallowed_responses());
        }
    }
    Ok(())
}
