mod address;
mod block;
mod detail;
#[cfg(test)]
pub(crate) mod fixture;
mod mempool;
mod stats;
mod transaction;

pub use address::merge_txids;
pub use detail::*;
pub use mempool::*;
pub use stats::*;

use crate::backend::FailoverCallerRef;
use crate::cache::CacheSetRef;
use crate::config::QueryConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::tip::ChainTipRef;
use std::sync::Arc;

/// Address, transaction and block queries on top of the failover caller and
/// the cache set.
pub struct QueryEngine {
    config: QueryConfig,
    failover: FailoverCallerRef,
    caches: CacheSetRef,
    mempool: MempoolQuery,
    tip: ChainTipRef,
}

impl QueryEngine {
    pub fn new(
        config: QueryConfig,
        failover: FailoverCallerRef,
        caches: CacheSetRef,
        tip: ChainTipRef,
    ) -> Self {
        let mempool = MempoolQuery::new(failover.clone());

        Self {
            config,
            failover,
            caches,
            mempool,
            tip,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn caches(&self) -> &CacheSetRef {
        &self.caches
    }

    pub fn mempool(&self) -> &MempoolQuery {
        &self.mempool
    }

    fn tip_height(&self) -> u64 {
        self.tip.read().unwrap().height
    }
}

pub type QueryEngineRef = Arc<QueryEngine>;

/// The `[from, to)` window of `list`, clamped to its length.
pub fn paginate<T: Clone>(list: &[T], from: usize, to: usize) -> GatewayResult<Vec<T>> {
    if from >= to {
        return Err(GatewayError::validation(format!(
            "\"from\" ({}) is expected to be less than \"to\" ({})",
            from, to
        )));
    }

    let start = from.min(list.len());
    let end = to.min(list.len());
    Ok(list[start..end].to_vec())
}
