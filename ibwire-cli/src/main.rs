//! ibwire-cli - One-shot queries against a gateway session
//!
//! Connects, runs a single query and prints the result as JSON.

mod commands;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ibwire_client::{Client, ConnectionConfig};
use ibwire_protocol::Contract;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ibwire-cli")]
#[command(about = "Command-line queries against a TWS / IB Gateway session")]
#[command(version)]
struct Cli {
    /// Gateway host
    #[arg(long, env = "IBWIRE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Gateway port
    #[arg(short, long, env = "IBWIRE_PORT", default_value_t = ibwire_protocol::DEFAULT_PORT)]
    port: u16,

    /// Client id announced to the gateway
    #[arg(short, long, env = "IBWIRE_CLIENT_ID", default_value_t = 0)]
    client_id: i32,

    /// Seconds to wait for the answer
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Contract selection shared by the market data commands.
#[derive(Args, Debug, Clone)]
pub struct ContractArgs {
    /// Symbol
    symbol: String,

    /// Security type
    #[arg(long, default_value = "STK")]
    sec_type: String,

    /// Routing exchange
    #[arg(long, default_value = "SMART")]
    exchange: String,

    /// Primary listing exchange
    #[arg(long)]
    primary_exchange: Option<String>,

    /// Currency
    #[arg(long, default_value = "USD")]
    currency: String,

    /// Contract id
    #[arg(long)]
    con_id: Option<i32>,

    /// Expiry (YYYYMMDD or YYYYMM) for derivatives
    #[arg(long)]
    expiry: Option<String>,

    /// Strike for options
    #[arg(long)]
    strike: Option<f64>,

    /// Right for options (C or P)
    #[arg(long)]
    right: Option<String>,
}

impl ContractArgs {
    pub fn to_contract(&self) -> Contract {
        Contract {
            con_id: self.con_id.unwrap_or(0),
            symbol: self.symbol.clone(),
            sec_type: self.sec_type.clone(),
            exchange: self.exchange.clone(),
            primary_exch: self.primary_exchange.clone().unwrap_or_default(),
            currency: self.currency.clone(),
            expiry: self.expiry.clone().unwrap_or_default(),
            strike: self.strike.unwrap_or(0.0),
            right: self.right.clone().unwrap_or_default(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the server clock
    Time,

    /// List the accounts managed by this session
    Accounts,

    /// Look up contract details
    Contract {
        #[command(flatten)]
        contract: ContractArgs,
    },

    /// Take a market data snapshot
    Quote {
        #[command(flatten)]
        contract: ContractArgs,

        /// Market data type (1 live, 2 frozen, 3 delayed, 4 delayed frozen)
        #[arg(long)]
        market_data_type: Option<i32>,
    },

    /// Fetch historical bars
    History {
        #[command(flatten)]
        contract: ContractArgs,

        /// End of the window (yyyymmdd hh:mm:ss); empty means now
        #[arg(long, default_value = "")]
        end: String,

        /// Window length, e.g. "1 D" or "2 W"
        #[arg(long, default_value = "1 D")]
        duration: String,

        /// Bar size, e.g. "5 mins" or "1 hour"
        #[arg(long, default_value = "1 hour")]
        bar_size: String,

        /// Data to show (TRADES, MIDPOINT, BID, ASK)
        #[arg(long, default_value = "TRADES")]
        what_to_show: String,

        /// Regular trading hours only
        #[arg(long)]
        rth: bool,
    },

    /// List positions across accounts
    Positions,

    /// Print the account summary
    Summary {
        /// Account group
        #[arg(long, default_value = "All")]
        group: String,

        /// Comma-separated summary tags
        #[arg(long, default_value = "NetLiquidation,TotalCashValue,BuyingPower")]
        tags: String,
    },

    /// List today's executions
    Executions {
        /// Only this account
        #[arg(long)]
        account: Option<String>,

        /// Only this symbol
        #[arg(long)]
        symbol: Option<String>,
    },

    /// Print the scanner parameter document
    ScannerParams,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = ConnectionConfig::new(cli.host.clone(), cli.port).with_client_id(cli.client_id);
    let client = Client::new(config);

    client.connect().await.map_err(|e| {
        eprintln!("{}: {}", "Connection failed".red(), e);
        e
    })?;
    client.start_dispatcher()?;

    let timeout = Duration::from_secs(cli.timeout);
    let result = tokio::time::timeout(timeout, commands::execute(&client, cli.command)).await;

    match result {
        Ok(Ok(output)) => {
            println!("{}", output);
        }
        Ok(Err(e)) => {
            eprintln!("{}: {}", "Error".red(), e);
            let _ = client.disconnect().await;
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!(
                "{}: no answer within {}s",
                "Error".red(),
                timeout.as_secs()
            );
            let _ = client.disconnect().await;
            std::process::exit(1);
        }
    }

    client.disconnect().await?;
    Ok(())
}
