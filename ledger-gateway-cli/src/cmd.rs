use clap::{Args, Parser, Subcommand};
use gateway_util::GatewayClientConfig;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "ledger-gateway-cli")]
#[command(about = "Ledger gateway JSON-RPC client")]
pub struct Cli {
    #[arg(short, long, default_value_t = GatewayClientConfig::default().rpc_url)]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get the height of the tip the gateway follows
    Height,

    /// Get the backend's best block hash
    BestBlock,

    /// Get sync status, optionally waiting until the backend is synced
    Status {
        #[arg(short, long, default_value_t = false)]
        watch: bool,
    },

    /// Stop the ledger gateway service
    Stop,

    /// Get the confirmed balance of one or more addresses
    Balance {
        #[arg(value_name = "ADDRESS", num_args = 1..)]
        addresses: Vec<String>,
    },

    /// List txids touching the addresses, newest first
    Txids {
        #[arg(value_name = "ADDRESS", num_args = 1..)]
        addresses: Vec<String>,

        #[clap(flatten)]
        filter: TxidsFilter,
    },

    /// Get one page of transaction history
    History {
        #[arg(value_name = "ADDRESS", num_args = 1..)]
        addresses: Vec<String>,

        #[clap(flatten)]
        page: Page,

        #[clap(flatten)]
        filter: TxidsFilter,
    },

    /// Get the address summary
    Summary {
        #[arg(value_name = "ADDRESS", num_args = 1..)]
        addresses: Vec<String>,

        #[clap(flatten)]
        page: Page,

        /// Skip unconfirmed transactions
        #[arg(long, default_value_t = false)]
        no_mempool: bool,

        /// Leave out the txid list
        #[arg(long, default_value_t = false)]
        no_tx_list: bool,
    },

    /// List unconfirmed outputs paying into the addresses
    Mempool {
        #[arg(value_name = "ADDRESS", num_args = 1..)]
        addresses: Vec<String>,
    },

    /// Get a transaction
    Tx {
        txid: String,

        /// Show the expanded view with input values and fee
        #[arg(short, long, default_value_t = false)]
        detailed: bool,
    },

    /// Get a block by hash or height
    Block {
        #[arg(value_name = "HASH_OR_HEIGHT")]
        block: String,

        #[clap(flatten)]
        view: BlockView,
    },

    /// Broadcast a serialized transaction
    Send {
        hex: String,

        #[arg(long, default_value_t = false)]
        allow_absurd_fees: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TxidsFilter {
    /// Skip unconfirmed transactions
    #[arg(long, default_value_t = false)]
    pub no_mempool: bool,

    /// Only unconfirmed transactions
    #[arg(long, default_value_t = false, conflicts_with = "no_mempool")]
    pub mempool_only: bool,

    /// Highest block height, requires --end
    #[arg(long, requires = "end")]
    pub start: Option<u32>,

    /// Lowest block height, requires --start
    #[arg(long, requires = "start")]
    pub end: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct Page {
    #[arg(long)]
    pub from: Option<usize>,

    #[arg(long)]
    pub to: Option<usize>,
}

#[derive(Args, Debug, Clone)]
#[group(required = false, multiple = false)]
pub struct BlockView {
    /// Show the header only
    #[arg(long, default_value_t = false)]
    pub header: bool,

    /// Show the header fields and txids
    #[arg(long, default_value_t = false)]
    pub overview: bool,
}

/// Heights go over the wire as numbers, anything else as a hash.
pub fn block_arg(block: &str) -> Value {
    match block.parse::<u64>() {
        Ok(height) if block.len() < 40 => Value::from(height),
        _ => Value::from(block),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_arg() {
        assert_eq!(block_arg("123"), Value::from(123u64));
        let hash = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
        assert_eq!(block_arg(hash), Value::from(hash));
    }

    #[test]
    fn test_parse_txids_command() {
        let cli = Cli::try_parse_from([
            "ledger-gateway-cli",
            "txids",
            "addr1",
            "addr2",
            "--start",
            "10",
            "--end",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Txids { addresses, filter } => {
                assert_eq!(addresses, vec!["addr1", "addr2"]);
                assert_eq!(filter.start, Some(10));
                assert_eq!(filter.end, Some(2));
                assert!(!filter.no_mempool);
            }
            _ => panic!("Unexpected command"),
        }

        assert!(
            Cli::try_parse_from(["ledger-gateway-cli", "txids", "addr1", "--start", "10"]).is_err()
        );
    }
}
