use super::RecencyCache;
use crate::backend::{BlockHeaderInfo, VerboseBlock};
use crate::config::CacheConfig;
use crate::types::{AddressBalance, BlockOverview, DetailedTransaction};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Confirmed part of an address summary: the newest-first confirmed txids and
/// the balance derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub txids: Arc<Vec<String>>,
    pub balance: AddressBalance,
}

/// All caches of one gateway instance.
///
/// Address keyed caches and block overviews depend on the chain tip and are
/// dropped together by [`CacheSet::reset_tip_scoped`]. Caches keyed by a
/// transaction id or block hash hold immutable content and only ever lose
/// entries to LRU eviction.
pub struct CacheSet {
    // Tip scoped
    pub txids: RecencyCache<String, Arc<Vec<String>>>,
    pub balance: RecencyCache<String, AddressBalance>,
    pub summary: RecencyCache<String, Arc<SummaryEntry>>,
    pub block_overview: RecencyCache<String, Arc<BlockOverview>>,

    // Content addressed
    pub detailed_transaction: RecencyCache<String, Arc<DetailedTransaction>>,
    pub raw_transaction: RecencyCache<String, Arc<String>>,
    pub block: RecencyCache<String, Arc<VerboseBlock>>,
    pub raw_block: RecencyCache<String, Arc<String>>,
    pub block_header: RecencyCache<String, Arc<BlockHeaderInfo>>,

    resets: AtomicU64,
}

impl CacheSet {
    pub fn new(config: &CacheConfig) -> Self {
        info!(
            "Creating caches: address {}, block overview {}, detailed tx {}, raw tx {}, block {}, raw block {}, header {}",
            config.address_capacity,
            config.block_overview_capacity,
            config.detailed_transaction_capacity,
            config.raw_transaction_capacity,
            config.block_capacity,
            config.raw_block_capacity,
            config.block_header_capacity
        );

        Self {
            txids: RecencyCache::new("txids", config.address_capacity),
            balance: RecencyCache::new("balance", config.address_capacity),
            summary: RecencyCache::new("summary", config.address_capacity),
            block_overview: RecencyCache::new("block_overview", config.block_overview_capacity),
            detailed_transaction: RecencyCache::new(
                "detailed_transaction",
                config.detailed_transaction_capacity,
            ),
            raw_transaction: RecencyCache::new("raw_transaction", config.raw_transaction_capacity),
            block: RecencyCache::new("block", config.block_capacity),
            raw_block: RecencyCache::new("raw_block", config.raw_block_capacity),
            block_header: RecencyCache::new("block_header", config.block_header_capacity),
            resets: AtomicU64::new(0),
        }
    }

    /// Drops everything that is only valid for the current chain tip.
    pub fn reset_tip_scoped(&self) {
        self.txids.clear();
        self.balance.clear();
        self.summary.clear();
        self.block_overview.clear();

        let resets = self.resets.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Tip scoped caches reset, total resets: {}", resets);
    }

    /// How many times the tip scoped caches have been reset.
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }
}

pub type CacheSetRef = Arc<CacheSet>;
