mod failover;
#[cfg(test)]
pub(crate) mod mock;
mod pool;
mod rpc;

pub use failover::*;
pub use pool::*;
pub use rpc::*;

use crate::error::BackendResult;
use bitcoincore_rpc::bitcoin::Amount;
use bitcoincore_rpc::bitcoin::amount::serde::as_btc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSig {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

/// Previous output attached to an input when the backend runs with extra
/// input data enabled (`vinextra`, or the verbose tx-accepted notification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrevOut {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(with = "as_btc")]
    pub value: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    #[serde(rename = "scriptSig", default, skip_serializing_if = "Option::is_none")]
    pub script_sig: Option<ScriptSig>,
    #[serde(default)]
    pub sequence: u32,
    #[serde(rename = "prevOut", default, skip_serializing_if = "Option::is_none")]
    pub prev_out: Option<PrevOut>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    #[serde(with = "as_btc")]
    pub value: Amount,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
    #[serde(rename = "spentTxId", default, skip_serializing_if = "Option::is_none")]
    pub spent_txid: Option<String>,
    #[serde(rename = "spentIndex", default, skip_serializing_if = "Option::is_none")]
    pub spent_index: Option<u32>,
    #[serde(rename = "spentHeight", default, skip_serializing_if = "Option::is_none")]
    pub spent_height: Option<i64>,
}

/// Verbose transaction as returned by `getrawtransaction <txid> 1` and
/// `searchrawtransactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub hex: String,
    pub txid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub version: i32,
    pub locktime: u32,
    pub vin: Vec<TxInput>,
    pub vout: Vec<TxOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl RawTransaction {
    pub fn is_unconfirmed(&self) -> bool {
        self.confirmations.unwrap_or(0) == 0
    }

    // The first input of a coinbase carries no previous txid
    pub fn is_coinbase(&self) -> bool {
        self.vin.first().map(|i| i.txid.is_none()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerboseBlock {
    pub hash: String,
    #[serde(default)]
    pub confirmations: i64,
    #[serde(default)]
    pub size: u64,
    pub height: u64,
    pub version: i32,
    #[serde(rename = "merkleroot")]
    pub merkle_root: String,
    #[serde(default)]
    pub tx: Vec<String>,
    pub time: u64,
    #[serde(rename = "mediantime", default, skip_serializing_if = "Option::is_none")]
    pub median_time: Option<u64>,
    pub nonce: u32,
    pub bits: String,
    pub difficulty: f64,
    #[serde(rename = "chainwork", default, skip_serializing_if = "Option::is_none")]
    pub chain_work: Option<String>,
    #[serde(rename = "previousblockhash", default, skip_serializing_if = "Option::is_none")]
    pub previous_block_hash: Option<String>,
    #[serde(rename = "nextblockhash", default, skip_serializing_if = "Option::is_none")]
    pub next_block_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderInfo {
    pub hash: String,
    #[serde(default)]
    pub confirmations: i64,
    pub height: u64,
    pub version: i32,
    #[serde(rename = "merkleroot")]
    pub merkle_root: String,
    pub time: u64,
    #[serde(rename = "mediantime", default, skip_serializing_if = "Option::is_none")]
    pub median_time: Option<u64>,
    pub nonce: u32,
    pub bits: String,
    pub difficulty: f64,
    #[serde(rename = "chainwork", default, skip_serializing_if = "Option::is_none")]
    pub chain_work: Option<String>,
    #[serde(rename = "previousblockhash", default, skip_serializing_if = "Option::is_none")]
    pub previous_block_hash: Option<String>,
    #[serde(rename = "nextblockhash", default, skip_serializing_if = "Option::is_none")]
    pub next_block_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainInfo {
    pub chain: String,
    pub blocks: u64,
    #[serde(default)]
    pub headers: u64,
    #[serde(rename = "bestblockhash")]
    pub best_block_hash: String,
    #[serde(default)]
    pub difficulty: f64,
    #[serde(rename = "verificationprogress", default)]
    pub verification_progress: f64,
    #[serde(rename = "chainwork", default, skip_serializing_if = "Option::is_none")]
    pub chain_work: Option<String>,
}

/// Argument of `getaddresstxids`; `start`/`end` are block heights with
/// `start <= end` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTxidsQuery {
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInfoQuery {
    pub txid: String,
    pub index: u32,
}

/// Where an output was spent. Empty (`{}`) when the output is unspent or unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

/// The capability set the gateway needs from one chain backend endpoint.
/// Every error carries the backend's numeric code and message.
#[async_trait::async_trait]
pub trait ChainBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn get_best_block_hash(&self) -> BackendResult<String>;

    async fn get_block_hash(&self, height: u64) -> BackendResult<String>;

    async fn get_block(&self, hash: &str) -> BackendResult<VerboseBlock>;

    async fn get_raw_block(&self, hash: &str) -> BackendResult<String>;

    async fn get_block_header(&self, hash: &str) -> BackendResult<BlockHeaderInfo>;

    async fn get_raw_transaction(&self, txid: &str) -> BackendResult<RawTransaction>;

    async fn get_raw_transaction_hex(&self, txid: &str) -> BackendResult<String>;

    async fn get_address_txids(&self, query: &AddressTxidsQuery) -> BackendResult<Vec<String>>;

    async fn search_raw_transactions(&self, address: &str) -> BackendResult<Vec<RawTransaction>>;

    async fn get_spent_info(&self, query: &SpentInfoQuery) -> BackendResult<SpentInfo>;

    async fn send_raw_transaction(
        &self,
        hex: &str,
        allow_absurd_fees: bool,
    ) -> BackendResult<String>;

    async fn decode_raw_transaction(&self, hex: &str) -> BackendResult<serde_json::Value>;

    async fn estimate_fee(&self, blocks: u32) -> BackendResult<f64>;

    async fn get_blockchain_info(&self) -> BackendResult<BlockchainInfo>;

    async fn generate(&self, count: u32) -> BackendResult<Vec<String>>;
}

pub type ChainBackendRef = Arc<dyn ChainBackend>;
