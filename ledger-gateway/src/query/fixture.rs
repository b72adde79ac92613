//! Shared ledger for query tests: five transactions touching one address,
//! whose confirmed balance is 2,800,000,000 and total received 7,800,000,000.

use super::QueryEngine;
use crate::backend::mock::{MockBackend, block, coinbase_tx, raw_tx};
use crate::backend::{ChainBackendRef, EndpointPool, FailoverCaller, FailoverCallerRef};
use crate::cache::CacheSet;
use crate::config::{CacheConfig, QueryConfig};
use crate::tip::{ChainTip, ChainTipRef};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const ADDRESS: &str = "TGEnkqNT2xxJKiPr3PJhhoWGu9pxeE3J2dorrk5Ph8UxU";
pub const TIP_HEIGHT: u64 = 6;

pub const TX_PAY_800M: &str = "66197c8d";
pub const TX_SPEND_5000M: &str = "1ba4151b";
pub const TX_PAY_1000M_A: &str = "c5586e66";
pub const TX_PAY_1000M_B: &str = "789bc446";
pub const TX_PAY_5000M: &str = "f86d3b14";

pub fn load_ledger(backend: &MockBackend) {
    // Funding outputs for the non fixture addresses
    backend.add_transaction(coinbase_tx("fund-te5a", &[("TE5ARa7W", 499982700000000)], 1));
    backend.add_transaction(coinbase_tx("fund-tjjg", &[("TJJgQv9Z", 200000000)], 1));
    backend.add_transaction(coinbase_tx("fund-tl4e", &[("TL4EobJ4", 499989000000000)], 1));
    backend.add_transaction(coinbase_tx("fund-tkvr", &[("TKvrqX3h", 500000000000000)], 1));

    backend.add_transaction(raw_tx(
        TX_PAY_5000M,
        &[("fund-tkvr", 0)],
        &[(ADDRESS, 5000000000), ("THQhMaaZ", 499995000000000)],
        Some(2),
    ));
    backend.add_transaction(raw_tx(
        TX_PAY_1000M_B,
        &[("fund-tjjg", 0), ("fund-tl4e", 0)],
        &[("THsh9NCU", 499988200000000), (ADDRESS, 1000000000)],
        Some(3),
    ));
    backend.add_transaction(raw_tx(
        TX_PAY_1000M_A,
        &[(TX_PAY_1000M_B, 0)],
        &[(ADDRESS, 1000000000), ("TSBt1xZJ", 499987200000000)],
        Some(4),
    ));
    backend.add_transaction(raw_tx(
        TX_SPEND_5000M,
        &[(TX_PAY_5000M, 0)],
        &[("TBjxPKaW", 4700000000), ("THh3sso9", 300000000)],
        Some(5),
    ));
    backend.add_transaction(raw_tx(
        TX_PAY_800M,
        &[("fund-te5a", 0)],
        &[("TEqPXsUu", 499981900000000), (ADDRESS, 800000000)],
        Some(6),
    ));

    let txids_at = |height: i64| -> Vec<&'static str> {
        match height {
            1 => vec!["fund-te5a", "fund-tjjg", "fund-tl4e", "fund-tkvr"],
            2 => vec![TX_PAY_5000M],
            3 => vec![TX_PAY_1000M_B],
            4 => vec![TX_PAY_1000M_A],
            5 => vec![TX_SPEND_5000M],
            6 => vec![TX_PAY_800M],
            _ => vec![],
        }
    };
    for height in 1..=TIP_HEIGHT {
        backend.add_block(block(
            &format!("block-{}", height),
            height,
            &txids_at(height as i64),
        ));
    }
}

/// Unconfirmed payment of `satoshis` to `address` at output 0.
pub fn add_mempool_payment(backend: &MockBackend, txid: &str, address: &str, satoshis: u64) {
    backend.add_transaction(raw_tx(
        txid,
        &[("fund-tkvr", 0)],
        &[(address, satoshis), ("change", 1000)],
        None,
    ));
}

pub fn failover(backends: &[Arc<MockBackend>]) -> FailoverCallerRef {
    let endpoints = backends
        .iter()
        .map(|b| b.clone() as ChainBackendRef)
        .collect();
    let pool = Arc::new(EndpointPool::new(endpoints).unwrap());
    Arc::new(FailoverCaller::new(pool, Duration::from_millis(1)))
}

pub fn tip(height: u64) -> ChainTipRef {
    Arc::new(RwLock::new(ChainTip {
        height,
        hash: Some(format!("block-{}", height)),
    }))
}

pub fn engine(backends: &[Arc<MockBackend>], config: QueryConfig) -> QueryEngine {
    QueryEngine::new(
        config,
        failover(backends),
        Arc::new(CacheSet::new(&CacheConfig::default())),
        tip(TIP_HEIGHT),
    )
}
