use ledger_gateway::SyncStatus;
use ledger_gateway::backend::{BlockHeaderInfo, VerboseBlock};
use ledger_gateway::types::{
    AddressBalance, AddressHistory, AddressSummary, BlockOverview, DetailedTransaction,
    HistoryOptions, MempoolDelta, SummaryOptions, TxidsOptions,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

pub struct RpcClient {
    url: String,
    client: Client,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self, String> {
        let client = Client::builder().build().map_err(|e| {
            let msg = format!("Failed to build HTTP client: {}", e);
            log::error!("{}", msg);
            msg
        })?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn get_block_height(&self) -> Result<u64, String> {
        self.rpc_call("get_block_height", json!([])).await
    }

    pub async fn get_best_block_hash(&self) -> Result<String, String> {
        self.rpc_call("get_best_block_hash", json!([])).await
    }

    pub async fn get_sync_status(&self) -> Result<SyncStatus, String> {
        self.rpc_call("get_sync_status", json!([])).await
    }

    pub async fn get_address_balance(&self, addresses: &[String]) -> Result<AddressBalance, String> {
        self.rpc_call("get_address_balance", json!([addresses])).await
    }

    pub async fn get_address_mempool(
        &self,
        addresses: &[String],
    ) -> Result<Vec<MempoolDelta>, String> {
        self.rpc_call("get_address_mempool", json!([addresses])).await
    }

    pub async fn get_address_txids(
        &self,
        addresses: &[String],
        options: &TxidsOptions,
    ) -> Result<Vec<String>, String> {
        self.rpc_call("get_address_txids", json!([addresses, options]))
            .await
    }

    pub async fn get_address_history(
        &self,
        addresses: &[String],
        options: &HistoryOptions,
    ) -> Result<AddressHistory, String> {
        self.rpc_call("get_address_history", json!([addresses, options]))
            .await
    }

    pub async fn get_address_summary(
        &self,
        addresses: &[String],
        options: &SummaryOptions,
    ) -> Result<AddressSummary, String> {
        self.rpc_call("get_address_summary", json!([addresses, options]))
            .await
    }

    pub async fn get_detailed_transaction(&self, txid: &str) -> Result<DetailedTransaction, String> {
        self.rpc_call("get_detailed_transaction", json!([txid])).await
    }

    pub async fn get_transaction(&self, txid: &str) -> Result<Value, String> {
        self.rpc_call("get_transaction", json!([txid])).await
    }

    pub async fn get_block(&self, block: &Value) -> Result<VerboseBlock, String> {
        self.rpc_call("get_block", json!([block])).await
    }

    pub async fn get_block_header(&self, block: &Value) -> Result<BlockHeaderInfo, String> {
        self.rpc_call("get_block_header", json!([block])).await
    }

    pub async fn get_block_overview(&self, block: &Value) -> Result<BlockOverview, String> {
        self.rpc_call("get_block_overview", json!([block])).await
    }

    pub async fn send_transaction(&self, hex: &str, allow_absurd_fees: bool) -> Result<String, String> {
        self.rpc_call("send_transaction", json!([hex, allow_absurd_fees]))
            .await
    }

    pub async fn stop(&self) -> Result<(), String> {
        self.rpc_call("stop", json!([])).await
    }

    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, String> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp: Value = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Failed to send RPC request: {}", e);
                log::error!("{}", msg);
                msg
            })?
            .json()
            .await
            .map_err(|e| {
                let msg = format!("Failed to parse RPC response: {}", e);
                log::error!("{}", msg);
                msg
            })?;

        if let Some(err) = resp.get("error") {
            let msg = format!(
                "RPC error {}: {}",
                err["code"],
                err["message"].as_str().unwrap_or("unknown error")
            );
            log::error!("{}", msg);
            return Err(msg);
        }

        serde_json::from_value(resp["result"].clone()).map_err(|e| {
            let msg = format!("Failed to parse RPC result: {}", e);
            log::error!("{}", msg);
            msg
        })
    }
}
