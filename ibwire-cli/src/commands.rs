//! Command execution.

use crate::Commands;
use colored::Colorize;
use ibwire_client::Client;
use ibwire_protocol::ExecutionFilter;
use serde::Serialize;

/// Request id used for the single query this process issues.
const REQ_ID: i32 = 1;

/// Executes a command and returns the formatted output.
pub async fn execute(client: &Client, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Time => {
            let time = client.current_time().await?;
            let formatted = time
                .as_datetime()
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| time.time.to_string());
            Ok(formatted)
        }

        Commands::Accounts => {
            let accounts = client.managed_accounts().await?;
            let list: Vec<&str> = accounts.iter().collect();
            format_json(&list)
        }

        Commands::Contract { contract } => {
            let details = client
                .contract_details(REQ_ID, &contract.to_contract())
                .await?;
            if details.is_empty() {
                return Ok("No matching contracts".yellow().to_string());
            }
            format_json(&details)
        }

        Commands::Quote {
            contract,
            market_data_type,
        } => {
            if let Some(t) = market_data_type {
                client.req_market_data_type(t).await?;
            }
            let snapshot = client.snapshot(REQ_ID, &contract.to_contract()).await?;
            format_json(&snapshot)
        }

        Commands::History {
            contract,
            end,
            duration,
            bar_size,
            what_to_show,
            rth,
        } => {
            let bars = client
                .historical_data(
                    REQ_ID,
                    &contract.to_contract(),
                    &end,
                    &duration,
                    &bar_size,
                    &what_to_show,
                    i32::from(rth),
                )
                .await?;
            format_json(&bars)
        }

        Commands::Positions => {
            let positions = client.positions().await?;
            if positions.is_empty() {
                return Ok("No positions".yellow().to_string());
            }
            format_json(&positions)
        }

        Commands::Summary { group, tags } => {
            let summary = client.account_summary(REQ_ID, &group, &tags).await?;
            format_json(&summary)
        }

        Commands::Executions { account, symbol } => {
            let filter = execution_filter(account, symbol);
            let executions = client.executions(REQ_ID, &filter).await?;
            if executions.is_empty() {
                return Ok("No executions".yellow().to_string());
            }
            format_json(&executions)
        }

        Commands::ScannerParams => Ok(client.scanner_parameters().await?),
    }
}

fn execution_filter(account: Option<String>, symbol: Option<String>) -> ExecutionFilter {
    ExecutionFilter {
        acct_code: account.unwrap_or_default(),
        symbol: symbol.unwrap_or_default(),
        ..Default::default()
    }
}

fn format_json<T: Serialize>(value: &T) -> Result<String, Box<dyn std::error::Error>> {
    Ok(serde_json::to_string_pretty(value)?)
}
