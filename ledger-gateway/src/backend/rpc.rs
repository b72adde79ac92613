use super::{
    AddressTxidsQuery, BlockHeaderInfo, BlockchainInfo, ChainBackend, RawTransaction, SpentInfo,
    SpentInfoQuery, VerboseBlock,
};
use crate::error::{BackendError, BackendResult, RPC_INVALID_RESPONSE};
use bitcoincore_rpc::{Auth, Client, RpcApi};
use gateway_util::EndpointConfig;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::{Arc, RwLock};
use std::time::Duration;

// Page size for searchrawtransactions, newest first
const SEARCH_RAW_TRANSACTIONS_COUNT: u32 = 100;

/// A JSON-RPC connection to one chain backend node.
pub struct RpcEndpoint {
    rpc_url: String,
    auth: Auth,
    timeout: Duration,
    client: RwLock<Option<Arc<Client>>>,
}

impl RpcEndpoint {
    pub fn new(config: &EndpointConfig) -> Self {
        // The client is created on demand: the auth cookie file may not exist
        // until the node has started, and it changes when the node restarts.
        Self {
            rpc_url: config.rpc_url(),
            auth: config.auth(),
            timeout: config.timeout(),
            client: RwLock::new(None),
        }
    }

    fn update_client(&self) -> BackendResult<Arc<Client>> {
        let new_client = Client::new(&self.rpc_url, self.auth.clone()).map_err(|e| {
            let msg = format!("Failed to create RPC client for {}: {}", self.rpc_url, e);
            error!("{}", msg);
            BackendError::transport(msg)
        })?;

        let client = Arc::new(new_client);
        *self.client.write().unwrap() = Some(client.clone());

        info!("RPC client for {} updated successfully.", self.rpc_url);
        Ok(client)
    }

    fn client(&self) -> BackendResult<Arc<Client>> {
        if let Some(client) = &*self.client.read().unwrap() {
            return Ok(client.clone());
        }

        // Concurrent callers may both create a client here, the last one wins
        debug!("RPC client for {} is not initialized yet", self.rpc_url);
        self.update_client()
    }

    fn is_auth_cookie(&self) -> bool {
        matches!(self.auth, Auth::CookieFile(_))
    }

    fn on_transport_error(&self) {
        // The node may have restarted with a new auth cookie, drop the client
        // so the next call re-reads it
        if self.is_auth_cookie() {
            *self.client.write().unwrap() = None;
        }
    }

    fn to_backend_error(&self, method: &str, error: bitcoincore_rpc::Error) -> BackendError {
        use bitcoincore_rpc::jsonrpc;

        match error {
            bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Rpc(e)) => {
                debug!(
                    "{} on {} returned error {}: {}",
                    method, self.rpc_url, e.code, e.message
                );
                BackendError::new(e.code, e.message)
            }
            bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Transport(e)) => {
                self.on_transport_error();

                let msg = format!("{} on {} transport error: {}", method, self.rpc_url, e);
                warn!("{}", msg);
                BackendError::transport(msg)
            }
            e => {
                let msg = format!("{} on {} failed: {}", method, self.rpc_url, e);
                warn!("{}", msg);
                BackendError::new(RPC_INVALID_RESPONSE, msg)
            }
        }
    }

    async fn call<T>(&self, method: &'static str, args: Vec<Value>) -> BackendResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.client()?;
        let task = tokio::task::spawn_blocking(move || client.call::<T>(method, &args));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(|e| self.to_backend_error(method, e)),
            Ok(Err(e)) => {
                let msg = format!("{} on {} task join error: {}", method, self.rpc_url, e);
                error!("{}", msg);
                Err(BackendError::transport(msg))
            }
            Err(_) => {
                let msg = format!(
                    "{} on {} timed out after {:?}",
                    method, self.rpc_url, self.timeout
                );
                warn!("{}", msg);
                Err(BackendError::timeout(msg))
            }
        }
    }
}

#[async_trait::async_trait]
impl ChainBackend for RpcEndpoint {
    fn name(&self) -> &str {
        &self.rpc_url
    }

    async fn get_best_block_hash(&self) -> BackendResult<String> {
        self.call("getbestblockhash", vec![]).await
    }

    async fn get_block_hash(&self, height: u64) -> BackendResult<String> {
        self.call("getblockhash", vec![json!(height)]).await
    }

    async fn get_block(&self, hash: &str) -> BackendResult<VerboseBlock> {
        self.call("getblock", vec![json!(hash), json!(1)]).await
    }

    async fn get_raw_block(&self, hash: &str) -> BackendResult<String> {
        self.call("getblock", vec![json!(hash), json!(0)]).await
    }

    async fn get_block_header(&self, hash: &str) -> BackendResult<BlockHeaderInfo> {
        self.call("getblockheader", vec![json!(hash), json!(true)])
            .await
    }

    async fn get_raw_transaction(&self, txid: &str) -> BackendResult<RawTransaction> {
        self.call("getrawtransaction", vec![json!(txid), json!(1)])
            .await
    }

    async fn get_raw_transaction_hex(&self, txid: &str) -> BackendResult<String> {
        self.call("getrawtransaction", vec![json!(txid), json!(0)])
            .await
    }

    async fn get_address_txids(&self, query: &AddressTxidsQuery) -> BackendResult<Vec<String>> {
        self.call("getaddresstxids", vec![json!(query)]).await
    }

    async fn search_raw_transactions(&self, address: &str) -> BackendResult<Vec<RawTransaction>> {
        // verbose, skip 0, newest first, with previous output data on inputs
        self.call(
            "searchrawtransactions",
            vec![
                json!(address),
                json!(1),
                json!(0),
                json!(SEARCH_RAW_TRANSACTIONS_COUNT),
                json!(1),
                json!(true),
            ],
        )
        .await
    }

    async fn get_spent_info(&self, query: &SpentInfoQuery) -> BackendResult<SpentInfo> {
        self.call("getspentinfo", vec![json!(query)]).await
    }

    async fn send_raw_transaction(
        &self,
        hex: &str,
        allow_absurd_fees: bool,
    ) -> BackendResult<String> {
        self.call(
            "sendrawtransaction",
            vec![json!(hex), json!(allow_absurd_fees)],
        )
        .await
    }

    async fn decode_raw_transaction(&self, hex: &str) -> BackendResult<Value> {
        self.call("decoderawtransaction", vec![json!(hex)]).await
    }

    async fn estimate_fee(&self, blocks: u32) -> BackendResult<f64> {
        self.call("estimatefee", vec![json!(blocks)]).await
    }

    async fn get_blockchain_info(&self) -> BackendResult<BlockchainInfo> {
        self.call("getblockchaininfo", vec![]).await
    }

    async fn generate(&self, count: u32) -> BackendResult<Vec<String>> {
        self.call("generate", vec![json!(count)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RPC_TIMEOUT_ERROR, RPC_TRANSPORT_ERROR};
    use gateway_util::BackendAuth;

    fn unreachable_endpoint(timeout_secs: u64) -> RpcEndpoint {
        // Port 9 (discard) on loopback is expected to refuse connections
        let config = EndpointConfig {
            rpc_url: Some("http://127.0.0.1:9".to_string()),
            auth: Some(BackendAuth::UserPass("u".to_string(), "p".to_string())),
            timeout_secs,
            ..Default::default()
        };
        RpcEndpoint::new(&config)
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_transport_error() {
        let endpoint = unreachable_endpoint(10);
        assert_eq!(endpoint.name(), "http://127.0.0.1:9");

        let err = endpoint.get_best_block_hash().await.unwrap_err();
        assert!(
            err.code == RPC_TRANSPORT_ERROR || err.code == RPC_TIMEOUT_ERROR,
            "unexpected error {:?}",
            err
        );
    }
}
