use super::QueryEngine;
use crate::backend::{BlockHeaderInfo, VerboseBlock};
use crate::error::GatewayResult;
use crate::types::{BlockOverview, BlockRef};
use std::sync::Arc;

// Anything shorter than a block hash that parses as a number is a height
fn parse_height(arg: &str) -> Option<u64> {
    if arg.len() < 40 {
        arg.parse::<u64>().ok()
    } else {
        None
    }
}

impl QueryEngine {
    pub async fn resolve_block_hash(&self, block: &BlockRef) -> GatewayResult<String> {
        let height = match block {
            BlockRef::Height(height) => *height,
            BlockRef::Hash(arg) => match parse_height(arg) {
                Some(height) => height,
                None => return Ok(arg.clone()),
            },
        };

        self.failover
            .try_all("getblockhash", |backend| async move {
                backend.get_block_hash(height).await
            })
            .await
    }

    /// Verbose block. Only blocks with a successor are cached, the tip block
    /// gains `nextblockhash` later.
    pub async fn get_block(&self, block: &BlockRef) -> GatewayResult<Arc<VerboseBlock>> {
        let hash = self.resolve_block_hash(block).await?;
        if let Some(block) = self.caches.block.get(&hash) {
            return Ok(block);
        }

        let hash = hash.as_str();
        let block = self
            .failover
            .try_all("getblock", |backend| async move {
                backend.get_block(hash).await
            })
            .await?;
        let block = Arc::new(block);

        if block.next_block_hash.is_some() {
            self.caches.block.put(hash.to_string(), block.clone());
        }

        Ok(block)
    }

    pub async fn get_raw_block(&self, block: &BlockRef) -> GatewayResult<Arc<String>> {
        let hash = self.resolve_block_hash(block).await?;
        if let Some(raw) = self.caches.raw_block.get(&hash) {
            return Ok(raw);
        }

        let hash = hash.as_str();
        let raw = self
            .failover
            .try_all("getblock", |backend| async move {
                backend.get_raw_block(hash).await
            })
            .await?;
        let raw = Arc::new(raw);
        self.caches.raw_block.put(hash.to_string(), raw.clone());

        Ok(raw)
    }

    pub async fn get_block_header(&self, block: &BlockRef) -> GatewayResult<Arc<BlockHeaderInfo>> {
        let hash = self.resolve_block_hash(block).await?;
        if let Some(header) = self.caches.block_header.get(&hash) {
            return Ok(header);
        }

        let hash = hash.as_str();
        let header = self
            .failover
            .try_all("getblockheader", |backend| async move {
                backend.get_block_header(hash).await
            })
            .await?;
        let header = Arc::new(header);

        if header.next_block_hash.is_some() {
            self.caches
                .block_header
                .put(hash.to_string(), header.clone());
        }

        Ok(header)
    }

    /// Header fields plus txids. Confirmations change with every block, so
    /// overviews live in a tip scoped cache.
    pub async fn get_block_overview(&self, block: &BlockRef) -> GatewayResult<Arc<BlockOverview>> {
        let hash = self.resolve_block_hash(block).await?;
        if let Some(overview) = self.caches.block_overview.get(&hash) {
            return Ok(overview);
        }

        let block = self.get_block(&BlockRef::Hash(hash.clone())).await?;
        let overview = Arc::new(BlockOverview {
            hash: block.hash.clone(),
            version: block.version,
            confirmations: block.confirmations,
            height: block.height,
            chain_work: block.chain_work.clone(),
            prev_hash: block.previous_block_hash.clone(),
            next_hash: block.next_block_hash.clone(),
            merkle_root: block.merkle_root.clone(),
            time: block.time,
            median_time: block.median_time,
            nonce: block.nonce,
            bits: block.bits.clone(),
            difficulty: block.difficulty,
            txids: block.tx.clone(),
        });
        self.caches.block_overview.put(hash, overview.clone());

        Ok(overview)
    }

    pub async fn get_best_block_hash(&self) -> GatewayResult<String> {
        self.failover
            .call_once("getbestblockhash", |backend| async move {
                backend.get_best_block_hash().await
            })
            .await
    }

    /// Mines `count` blocks on regtest style backends.
    pub async fn generate_block(&self, count: u32) -> GatewayResult<Vec<String>> {
        self.failover
            .call_once("generate", |backend| async move {
                backend.generate(count).await
            })
            .await
    }
}
