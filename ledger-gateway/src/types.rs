use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One address or a list of addresses, as accepted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressArg {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for AddressArg {
    fn from(address: &str) -> Self {
        Self::One(address.to_string())
    }
}

impl From<Vec<String>> for AddressArg {
    fn from(addresses: Vec<String>) -> Self {
        Self::Many(addresses)
    }
}

/// Non-empty ordered address list. Order matters for the cache key, so the
/// same addresses in a different order are a different set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressSet(Vec<String>);

impl AddressSet {
    pub fn new(addresses: Vec<String>) -> GatewayResult<Self> {
        if addresses.is_empty() {
            return Err(GatewayError::validation("At least one address is required"));
        }
        if addresses.iter().any(|a| a.is_empty()) {
            return Err(GatewayError::validation("Address must not be empty"));
        }

        Ok(Self(addresses))
    }

    pub fn single(address: &str) -> GatewayResult<Self> {
        Self::new(vec![address.to_string()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.iter().any(|a| a == address)
    }

    pub fn cache_key(&self) -> String {
        self.0.concat()
    }
}

impl TryFrom<AddressArg> for AddressSet {
    type Error = GatewayError;

    fn try_from(arg: AddressArg) -> GatewayResult<Self> {
        match arg {
            AddressArg::One(address) => Self::new(vec![address]),
            AddressArg::Many(addresses) => Self::new(addresses),
        }
    }
}

fn default_query_mempool() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxidsOptions {
    #[serde(default = "default_query_mempool")]
    pub query_mempool: bool,

    #[serde(default)]
    pub query_mempool_only: bool,

    // Inclusive height range, `start` is the higher bound: results are newest first
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub end: Option<u32>,
}

impl Default for TxidsOptions {
    fn default() -> Self {
        Self {
            query_mempool: default_query_mempool(),
            query_mempool_only: false,
            start: None,
            end: None,
        }
    }
}

impl TxidsOptions {
    pub fn confirmed_only() -> Self {
        Self {
            query_mempool: false,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOptions {
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub to: Option<usize>,

    #[serde(flatten)]
    pub txids: TxidsOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub to: Option<usize>,

    #[serde(default = "default_query_mempool")]
    pub query_mempool: bool,

    #[serde(default)]
    pub no_tx_list: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            query_mempool: default_query_mempool(),
            no_tx_list: false,
        }
    }
}

/// Confirmed balance of an address set, in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBalance {
    pub balance: i64,
    pub received: i64,
}

impl AddressBalance {
    pub fn sent(&self) -> i64 {
        self.received - self.balance
    }
}

/// An unconfirmed output paying into the address set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolDelta {
    pub address: String,
    pub txid: String,
    pub index: u32,
    pub satoshis: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedInput {
    pub prev_txid: Option<String>,
    pub output_index: Option<u32>,
    pub script: Option<String>,
    pub script_asm: Option<String>,
    pub sequence: u32,
    pub address: Option<String>,
    pub satoshis: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedOutput {
    pub satoshis: u64,
    pub script: String,
    pub script_asm: String,
    pub spent_txid: Option<String>,
    pub spent_index: Option<u32>,
    pub spent_height: Option<i64>,
    pub address: Option<String>,
}

/// A transaction with every input resolved to the address and amount it spends.
/// Carries no confirmation count so a confirmed snapshot never goes stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedTransaction {
    pub hex: String,
    pub hash: String,
    pub block_hash: Option<String>,
    // -1 while in the mempool
    pub height: i64,
    pub block_timestamp: Option<u64>,
    pub version: i32,
    pub locktime: u32,
    pub coinbase: bool,
    pub inputs: Vec<DetailedInput>,
    pub outputs: Vec<DetailedOutput>,
    pub input_satoshis: u64,
    pub output_satoshis: u64,
    pub fee_satoshis: i64,
}

impl DetailedTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.height >= 0 && self.block_hash.is_some()
    }

    pub fn confirmations(&self, tip_height: u64) -> u64 {
        if !self.is_confirmed() {
            return 0;
        }

        let height = self.height as u64;
        tip_height.max(height) - height + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDelta {
    pub input_indexes: Vec<usize>,
    pub output_indexes: Vec<usize>,
    pub satoshis: i64,
}

/// Per-address deltas of one transaction plus their sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDetails {
    pub addresses: BTreeMap<String, AddressDelta>,
    pub satoshis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub addresses: BTreeMap<String, AddressDelta>,
    pub satoshis: i64,
    pub confirmations: u64,
    pub tx: DetailedTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressHistory {
    pub total_count: usize,
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub appearances: usize,
    pub total_received: i64,
    pub total_spent: i64,
    pub balance: i64,
    pub unconfirmed_appearances: usize,
    pub unconfirmed_balance: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockOverview {
    pub hash: String,
    pub version: i32,
    pub confirmations: i64,
    pub height: u64,
    pub chain_work: Option<String>,
    pub prev_hash: Option<String>,
    pub next_hash: Option<String>,
    pub merkle_root: String,
    pub time: u64,
    pub median_time: Option<u64>,
    pub nonce: u32,
    pub bits: String,
    pub difficulty: f64,
    pub txids: Vec<String>,
}

/// A block given by hash, or by height (number or short numeric string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRef {
    Height(u64),
    Hash(String),
}

impl From<&str> for BlockRef {
    fn from(arg: &str) -> Self {
        Self::Hash(arg.to_string())
    }
}
