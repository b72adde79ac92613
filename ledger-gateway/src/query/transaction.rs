use super::QueryEngine;
use crate::backend::RawTransaction;
use crate::error::GatewayResult;
use std::sync::Arc;

impl QueryEngine {
    /// Serialized transaction, cached by txid.
    pub async fn get_raw_transaction(&self, txid: &str) -> GatewayResult<Arc<String>> {
        if let Some(hex) = self.caches.raw_transaction.get(txid) {
            return Ok(hex);
        }

        let hex = self
            .failover
            .try_all("getrawtransaction", |backend| async move {
                backend.get_raw_transaction_hex(txid).await
            })
            .await?;
        let hex = Arc::new(hex);
        self.caches.raw_transaction.put(txid.to_string(), hex.clone());

        Ok(hex)
    }

    /// The backend's verbose view, including its current confirmation count.
    pub async fn get_transaction(&self, txid: &str) -> GatewayResult<RawTransaction> {
        self.failover
            .try_all("getrawtransaction", |backend| async move {
                backend.get_raw_transaction(txid).await
            })
            .await
    }

    pub async fn send_transaction(
        &self,
        hex: &str,
        allow_absurd_fees: bool,
    ) -> GatewayResult<String> {
        let txid = self
            .failover
            .call_once("sendrawtransaction", |backend| async move {
                backend.send_raw_transaction(hex, allow_absurd_fees).await
            })
            .await?;
        info!("Transaction {} sent", txid);

        Ok(txid)
    }

    pub async fn decode_raw_transaction(&self, hex: &str) -> GatewayResult<serde_json::Value> {
        self.failover
            .try_all("decoderawtransaction", |backend| async move {
                backend.decode_raw_transaction(hex).await
            })
            .await
    }

    /// Every transaction the backend knows for `address`, confirmed or not.
    pub async fn search_raw_transactions(
        &self,
        address: &str,
    ) -> GatewayResult<Vec<RawTransaction>> {
        self.failover
            .try_all("searchrawtransactions", |backend| async move {
                backend.search_raw_transactions(address).await
            })
            .await
    }
}
