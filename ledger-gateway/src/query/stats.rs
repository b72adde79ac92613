use super::QueryEngine;
use crate::backend::{BlockchainInfo, FailoverCaller, SpentInfo, SpentInfoQuery};
use crate::error::GatewayResult;

/// Backend verification progress as a percentage.
pub async fn sync_percentage(failover: &FailoverCaller) -> GatewayResult<f64> {
    let info = failover
        .try_all("getblockchaininfo", |backend| async move {
            backend.get_blockchain_info().await
        })
        .await?;

    Ok(info.verification_progress * 100.0)
}

pub fn is_synced_percentage(percentage: f64) -> bool {
    percentage.round() >= 100.0
}

impl QueryEngine {
    /// Where an output was spent; unknown or unspent outputs give `{}`.
    pub async fn get_spent_info(&self, query: &SpentInfoQuery) -> GatewayResult<SpentInfo> {
        self.failover
            .call_once("getspentinfo", |backend| async move {
                match backend.get_spent_info(query).await {
                    Err(e) if e.is_not_found() => Ok(SpentInfo::default()),
                    other => other,
                }
            })
            .await
    }

    pub async fn estimate_fee(&self, blocks: u32) -> GatewayResult<f64> {
        self.failover
            .call_once("estimatefee", |backend| async move {
                backend.estimate_fee(blocks).await
            })
            .await
    }

    pub async fn get_blockchain_info(&self) -> GatewayResult<BlockchainInfo> {
        self.failover
            .try_all("getblockchaininfo", |backend| async move {
                backend.get_blockchain_info().await
            })
            .await
    }

    pub async fn sync_percentage(&self) -> GatewayResult<f64> {
        sync_percentage(&self.failover).await
    }

    pub async fn is_synced(&self) -> GatewayResult<bool> {
        Ok(is_synced_percentage(self.sync_percentage().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::config::QueryConfig;
    use crate::error::BackendError;
    use crate::query::fixture;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_spent_info_not_found_is_empty() {
        let backend = Arc::new(MockBackend::new("node"));
        backend.add_spent_info(
            "aa",
            1,
            SpentInfo {
                txid: Some("bb".to_string()),
                index: Some(0),
                height: Some(10),
            },
        );
        let engine = fixture::engine(&[backend.clone()], QueryConfig::default());

        let query = SpentInfoQuery {
            txid: "aa".to_string(),
            index: 1,
        };
        let info = engine.get_spent_info(&query).await.unwrap();
        assert_eq!(info.txid.as_deref(), Some("bb"));

        let query = SpentInfoQuery {
            txid: "aa".to_string(),
            index: 0,
        };
        assert_eq!(engine.get_spent_info(&query).await.unwrap(), SpentInfo::default());

        backend.fail_with(BackendError::new(-1, "down"));
        assert_eq!(
            engine.get_spent_info(&query).await.unwrap_err().code(),
            Some(-1)
        );
    }

    #[tokio::test]
    async fn test_sync_percentage() {
        let backend = Arc::new(MockBackend::new("node"));
        let engine = fixture::engine(&[backend.clone()], QueryConfig::default());

        backend.set_verification_progress(0.5);
        assert_eq!(engine.sync_percentage().await.unwrap(), 50.0);
        assert!(!engine.is_synced().await.unwrap());

        // Rounds to 100
        backend.set_verification_progress(0.999996);
        assert!(engine.is_synced().await.unwrap());

        assert_eq!(engine.estimate_fee(6).await.unwrap(), 0.0001);
        assert_eq!(engine.get_blockchain_info().await.unwrap().chain, "regtest");
    }
}
