use super::cmd::{Cli, Commands, TxidsFilter, block_arg};
use crate::client::RpcClient;
use ledger_gateway::SyncPhase;
use ledger_gateway::types::{
    AddressBalance, AddressHistory, AddressSummary, HistoryOptions, SummaryOptions, TxidsOptions,
};
use serde::Serialize;

pub struct GatewayService {
    client: RpcClient,
}

impl GatewayService {
    pub async fn new(url: &str) -> Result<Self, String> {
        println!("Connecting to ledger gateway at {}", url);
        let client = RpcClient::new(url)?;

        // Verify the connection before running the command
        let height = client.get_block_height().await?;
        println!("Connected, gateway tip height: {}", height);

        Ok(Self { client })
    }

    pub async fn process_command(&self, cli: Cli) -> Result<(), String> {
        match cli.command {
            Commands::Height => {
                let height = self.client.get_block_height().await?;
                println!("Current Height: {}", height);
            }
            Commands::BestBlock => {
                let hash = self.client.get_best_block_hash().await?;
                println!("Best Block: {}", hash);
            }
            Commands::Status { watch } => {
                self.process_sync_status(watch).await?;
            }
            Commands::Stop => {
                self.client.stop().await?;
                println!("Stop requested.");
            }
            Commands::Balance { addresses } => {
                let balance = self.client.get_address_balance(&addresses).await?;
                Formatter::print_balance(&balance);
            }
            Commands::Txids { addresses, filter } => {
                let txids = self
                    .client
                    .get_address_txids(&addresses, &txids_options(&filter))
                    .await?;
                for txid in &txids {
                    println!("{}", txid);
                }
                println!("{} transaction(s)", txids.len());
            }
            Commands::History {
                addresses,
                page,
                filter,
            } => {
                let options = HistoryOptions {
                    from: page.from,
                    to: page.to,
                    txids: txids_options(&filter),
                };
                let history = self.client.get_address_history(&addresses, &options).await?;
                Formatter::print_history(&history);
            }
            Commands::Summary {
                addresses,
                page,
                no_mempool,
                no_tx_list,
            } => {
                let options = SummaryOptions {
                    from: page.from,
                    to: page.to,
                    query_mempool: !no_mempool,
                    no_tx_list,
                };
                let summary = self.client.get_address_summary(&addresses, &options).await?;
                Formatter::print_summary(&summary);
            }
            Commands::Mempool { addresses } => {
                let deltas = self.client.get_address_mempool(&addresses).await?;
                if deltas.is_empty() {
                    println!("No unconfirmed outputs found.");
                }
                for d in &deltas {
                    println!(
                        "{}:{} -> {} {} sat",
                        d.txid,
                        d.index,
                        d.address,
                        Formatter::format_number(d.satoshis as i64)
                    );
                }
            }
            Commands::Tx { txid, detailed } => {
                if detailed {
                    let tx = self.client.get_detailed_transaction(&txid).await?;
                    print_json(&tx)?;
                } else {
                    let tx = self.client.get_transaction(&txid).await?;
                    print_json(&tx)?;
                }
            }
            Commands::Block { block, view } => {
                let block = block_arg(&block);
                if view.header {
                    print_json(&self.client.get_block_header(&block).await?)?;
                } else if view.overview {
                    print_json(&self.client.get_block_overview(&block).await?)?;
                } else {
                    print_json(&self.client.get_block(&block).await?)?;
                }
            }
            Commands::Send {
                hex,
                allow_absurd_fees,
            } => {
                let txid = self.client.send_transaction(&hex, allow_absurd_fees).await?;
                println!("Sent transaction: {}", txid);
            }
        }

        Ok(())
    }

    async fn process_sync_status(&self, watch: bool) -> Result<(), String> {
        loop {
            let status = match self.client.get_sync_status().await {
                Ok(s) => s,
                Err(e) => {
                    println!("Failed to get sync status: {}", e);
                    if !watch {
                        return Err(e);
                    }
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            println!(
                "Phase: {:?}, height: {}, progress: {:.2}%{}",
                status.phase,
                status.height,
                status.progress,
                status
                    .message
                    .as_ref()
                    .map(|m| format!(", {}", m))
                    .unwrap_or_default()
            );

            if !watch || status.phase == SyncPhase::Synced {
                break;
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }

        Ok(())
    }
}

fn txids_options(filter: &TxidsFilter) -> TxidsOptions {
    TxidsOptions {
        query_mempool: !filter.no_mempool,
        query_mempool_only: filter.mempool_only,
        start: filter.start,
        end: filter.end,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let s = serde_json::to_string_pretty(value).map_err(|e| {
        let msg = format!("Failed to format result: {}", e);
        log::error!("{}", msg);
        msg
    })?;
    println!("{}", s);
    Ok(())
}

struct Formatter;

impl Formatter {
    fn print_balance(balance: &AddressBalance) {
        println!("\n┌───────────────┬────────────────────┐");
        println!("│ Balance (sat) │ {:>18} │", Self::format_number(balance.balance));
        println!("│ Received      │ {:>18} │", Self::format_number(balance.received));
        println!("│ Sent          │ {:>18} │", Self::format_number(balance.sent()));
        println!("└───────────────┴────────────────────┘");
    }

    fn print_history(history: &AddressHistory) {
        println!(
            "Showing {} of {} transaction(s)",
            history.items.len(),
            history.total_count
        );
        if history.items.is_empty() {
            return;
        }

        println!("\n┌──────────────────────────────────────────────────────────────────┬───────────────┬────────────────────┐");
        println!("│ Txid                                                             │ Confirmations │ Delta (sat)        │");
        println!("├──────────────────────────────────────────────────────────────────┼───────────────┼────────────────────┤");
        for item in &history.items {
            println!(
                "│ {:<64} │ {:>13} │ {:>18} │",
                item.tx.hash,
                item.confirmations,
                Self::format_delta(item.satoshis)
            );
        }
        println!("└──────────────────────────────────────────────────────────────────┴───────────────┴────────────────────┘");
    }

    fn print_summary(summary: &AddressSummary) {
        println!("Appearances:           {}", summary.appearances);
        println!("Total received (sat):  {}", Self::format_number(summary.total_received));
        println!("Total spent (sat):     {}", Self::format_number(summary.total_spent));
        println!("Balance (sat):         {}", Self::format_number(summary.balance));
        println!("Unconfirmed txs:       {}", summary.unconfirmed_appearances);
        println!(
            "Unconfirmed (sat):     {}",
            Self::format_delta(summary.unconfirmed_balance)
        );
        if let Some(ref txids) = summary.txids {
            println!("Txids:");
            for txid in txids {
                println!("  {}", txid);
            }
        }
    }

    // Add thousand separators for better readability
    fn format_number(n: i64) -> String {
        let s = n.unsigned_abs().to_string();
        let mut result = String::new();
        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        if n < 0 {
            result.push('-');
        }
        result.chars().rev().collect()
    }

    fn format_delta(d: i64) -> String {
        if d >= 0 {
            format!("+{}", Self::format_number(d))
        } else {
            Self::format_number(d)
        }
    }
}
