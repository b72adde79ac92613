use super::QueryEngine;
use crate::backend::{ChainBackend, RawTransaction};
use crate::error::{BackendResult, GatewayResult};
use crate::types::{
    AddressBalance, AddressDetails, AddressSet, DetailedInput, DetailedOutput,
    DetailedTransaction,
};
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Fetches `txid` and every distinct previous transaction its inputs spend,
/// all from the same endpoint.
pub async fn expand_transaction(
    backend: &dyn ChainBackend,
    txid: &str,
) -> BackendResult<DetailedTransaction> {
    let raw = backend.get_raw_transaction(txid).await?;

    let mut previous = HashMap::new();
    if !raw.is_coinbase() {
        for input in &raw.vin {
            let Some(prev_txid) = &input.txid else {
                continue;
            };
            if previous.contains_key(prev_txid) {
                continue;
            }

            let prev = backend.get_raw_transaction(prev_txid).await?;
            previous.insert(prev_txid.clone(), prev);
        }
    }

    // Nodes without the height extension only report the block hash
    let height = match (&raw.blockhash, raw.height) {
        (Some(_), Some(height)) => Some(height),
        (Some(hash), None) if !raw.is_unconfirmed() => {
            Some(backend.get_block_header(hash).await?.height as i64)
        }
        _ => None,
    };

    Ok(build_detailed_transaction(&raw, height, &previous))
}

pub fn build_detailed_transaction(
    raw: &RawTransaction,
    height: Option<i64>,
    previous: &HashMap<String, RawTransaction>,
) -> DetailedTransaction {
    let coinbase = raw.is_coinbase();

    let inputs: Vec<DetailedInput> = raw
        .vin
        .iter()
        .map(|input| {
            let prev_output = match (&input.txid, input.vout) {
                (Some(prev_txid), Some(vout)) => previous
                    .get(prev_txid)
                    .and_then(|prev| prev.vout.get(vout as usize)),
                _ => None,
            };
            if !coinbase && prev_output.is_none() {
                warn!(
                    "Previous output {:?}:{:?} of {} not resolved",
                    input.txid, input.vout, raw.txid
                );
            }

            DetailedInput {
                prev_txid: input.txid.clone(),
                output_index: input.vout,
                script: input.script_sig.as_ref().map(|s| s.hex.clone()),
                script_asm: input.script_sig.as_ref().map(|s| s.asm.clone()),
                sequence: input.sequence,
                address: prev_output.and_then(|o| o.script_pub_key.addresses.first().cloned()),
                satoshis: prev_output.map(|o| o.value.to_sat()).unwrap_or(0),
            }
        })
        .collect();

    let outputs: Vec<DetailedOutput> = raw
        .vout
        .iter()
        .map(|output| {
            let addresses = &output.script_pub_key.addresses;
            DetailedOutput {
                satoshis: output.value.to_sat(),
                script: output.script_pub_key.hex.clone(),
                script_asm: output.script_pub_key.asm.clone(),
                spent_txid: output.spent_txid.clone(),
                spent_index: output.spent_index,
                spent_height: output.spent_height,
                // Bare multisig outputs have no single owner
                address: if addresses.len() == 1 {
                    Some(addresses[0].clone())
                } else {
                    None
                },
            }
        })
        .collect();

    let input_satoshis: u64 = inputs.iter().map(|i| i.satoshis).sum();
    let output_satoshis: u64 = outputs.iter().map(|o| o.satoshis).sum();
    let fee_satoshis = if coinbase {
        0
    } else {
        input_satoshis as i64 - output_satoshis as i64
    };

    let block_hash = height.and(raw.blockhash.clone());
    DetailedTransaction {
        hex: raw.hex.clone(),
        hash: raw.txid.clone(),
        height: if block_hash.is_some() {
            height.unwrap_or(-1)
        } else {
            -1
        },
        block_hash,
        block_timestamp: raw.blocktime,
        version: raw.version,
        locktime: raw.locktime,
        coinbase,
        inputs,
        outputs,
        input_satoshis,
        output_satoshis,
        fee_satoshis,
    }
}

/// Debits and credits of `tx` for each address of the set it touches.
pub fn address_details_for_transaction(
    tx: &DetailedTransaction,
    addresses: &AddressSet,
) -> AddressDetails {
    let mut result = AddressDetails::default();

    for (index, input) in tx.inputs.iter().enumerate() {
        let Some(address) = input.address.as_deref().filter(|a| addresses.contains(a)) else {
            continue;
        };

        let delta = result.addresses.entry(address.to_string()).or_default();
        delta.input_indexes.push(index);
        delta.satoshis -= input.satoshis as i64;
        result.satoshis -= input.satoshis as i64;
    }

    for (index, output) in tx.outputs.iter().enumerate() {
        let Some(address) = output.address.as_deref().filter(|a| addresses.contains(a)) else {
            continue;
        };

        let delta = result.addresses.entry(address.to_string()).or_default();
        delta.output_indexes.push(index);
        delta.satoshis += output.satoshis as i64;
        result.satoshis += output.satoshis as i64;
    }

    result
}

/// Balance and total received of `addresses` over `transactions`.
pub fn summarize_tx_balance<'a>(
    transactions: impl IntoIterator<Item = &'a DetailedTransaction>,
    addresses: &AddressSet,
) -> AddressBalance {
    let lookup: HashSet<&str> = addresses.iter().map(String::as_str).collect();
    let owned = |address: &Option<String>| address.as_deref().is_some_and(|a| lookup.contains(a));

    let mut result = AddressBalance::default();
    for tx in transactions {
        for input in tx.inputs.iter().filter(|i| owned(&i.address)) {
            result.balance -= input.satoshis as i64;
        }

        for output in tx.outputs.iter().filter(|o| owned(&o.address)) {
            result.balance += output.satoshis as i64;
            result.received += output.satoshis as i64;
        }
    }

    result
}

impl QueryEngine {
    pub async fn get_detailed_transaction(
        &self,
        txid: &str,
    ) -> GatewayResult<Arc<DetailedTransaction>> {
        if let Some(tx) = self.caches.detailed_transaction.get(txid) {
            return Ok(tx);
        }

        let tx = self
            .failover
            .try_all("getrawtransaction", |backend| async move {
                expand_transaction(backend.as_ref(), txid).await
            })
            .await?;
        let tx = Arc::new(tx);

        // Unconfirmed details change once mined, keep only confirmed ones
        if tx.is_confirmed() {
            self.caches
                .detailed_transaction
                .put(txid.to_string(), tx.clone());
        }

        Ok(tx)
    }

    /// Expands `txids` in order, at most `transaction_concurrency` at a time.
    pub(crate) async fn get_detailed_transactions(
        &self,
        txids: &[String],
    ) -> GatewayResult<Vec<Arc<DetailedTransaction>>> {
        stream::iter(txids.iter().cloned())
            .map(|txid| async move { self.get_detailed_transaction(&txid).await })
            .buffered(self.config.transaction_concurrency.max(1))
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, coinbase_tx, raw_tx};
    use crate::config::QueryConfig;
    use crate::query::fixture;

    fn detailed(backend: &MockBackend, txid: &str) -> DetailedTransaction {
        let raw = futures::executor::block_on(backend.get_raw_transaction(txid)).unwrap();
        let mut previous = HashMap::new();
        for input in &raw.vin {
            if let Some(prev_txid) = &input.txid {
                let prev =
                    futures::executor::block_on(backend.get_raw_transaction(prev_txid)).unwrap();
                previous.insert(prev_txid.clone(), prev);
            }
        }
        build_detailed_transaction(&raw, raw.height, &previous)
    }

    fn fixture_transactions() -> Vec<DetailedTransaction> {
        let backend = MockBackend::new("node");
        fixture::load_ledger(&backend);
        [
            fixture::TX_PAY_800M,
            fixture::TX_SPEND_5000M,
            fixture::TX_PAY_1000M_A,
            fixture::TX_PAY_1000M_B,
            fixture::TX_PAY_5000M,
        ]
        .iter()
        .map(|txid| detailed(&backend, txid))
        .collect()
    }

    #[test]
    fn test_summarize_fixture_balance() {
        let transactions = fixture_transactions();
        let addresses = AddressSet::single(fixture::ADDRESS).unwrap();

        let balance = summarize_tx_balance(&transactions, &addresses);
        assert_eq!(balance.balance, 2_800_000_000);
        assert_eq!(balance.received, 7_800_000_000);
        assert_eq!(balance.sent(), 5_000_000_000);

        // Same result from the per transaction deltas
        let from_deltas: i64 = transactions
            .iter()
            .map(|tx| address_details_for_transaction(tx, &addresses).satoshis)
            .sum();
        assert_eq!(from_deltas, balance.balance);
    }

    #[test]
    fn test_address_details() {
        let backend = MockBackend::new("node");
        fixture::load_ledger(&backend);
        let addresses = AddressSet::single(fixture::ADDRESS).unwrap();

        let spend = detailed(&backend, fixture::TX_SPEND_5000M);
        let details = address_details_for_transaction(&spend, &addresses);
        assert_eq!(details.satoshis, -5_000_000_000);
        let delta = &details.addresses[fixture::ADDRESS];
        assert_eq!(delta.input_indexes, vec![0]);
        assert!(delta.output_indexes.is_empty());

        let pay = detailed(&backend, fixture::TX_PAY_800M);
        let details = address_details_for_transaction(&pay, &addresses);
        assert_eq!(details.satoshis, 800_000_000);
        assert_eq!(details.addresses[fixture::ADDRESS].output_indexes, vec![1]);

        let other = AddressSet::single("nobody").unwrap();
        assert!(
            address_details_for_transaction(&pay, &other)
                .addresses
                .is_empty()
        );
    }

    #[test]
    fn test_fee_and_coinbase() {
        let backend = MockBackend::new("node");
        backend.add_transaction(coinbase_tx("cb", &[("miner", 5_000_000_000)], 1));
        backend.add_transaction(raw_tx(
            "spend",
            &[("cb", 0)],
            &[("a", 3_000_000_000), ("b", 1_999_990_000)],
            Some(2),
        ));

        let cb = detailed(&backend, "cb");
        assert!(cb.coinbase);
        assert_eq!(cb.fee_satoshis, 0);
        assert_eq!(cb.input_satoshis, 0);
        assert_eq!(cb.inputs[0].address, None);

        let spend = detailed(&backend, "spend");
        assert!(!spend.coinbase);
        assert_eq!(spend.input_satoshis, 5_000_000_000);
        assert_eq!(spend.output_satoshis, 4_999_990_000);
        assert_eq!(spend.fee_satoshis, 10_000);
        assert_eq!(spend.inputs[0].address.as_deref(), Some("miner"));
        assert_eq!(spend.height, 2);
        assert_eq!(spend.block_hash.as_deref(), Some("block-2"));
    }

    #[tokio::test]
    async fn test_previous_transactions_fetched_once() {
        let backend = Arc::new(MockBackend::new("node"));
        backend.add_transaction(raw_tx("prev", &[], &[("a", 10), ("a", 20), ("b", 30)], Some(1)));
        backend.add_transaction(raw_tx(
            "tx",
            &[("prev", 0), ("prev", 1), ("prev", 2)],
            &[("c", 55)],
            Some(2),
        ));

        let engine = fixture::engine(&[backend.clone()], QueryConfig::default());
        let tx = engine.get_detailed_transaction("tx").await.unwrap();
        assert_eq!(tx.input_satoshis, 60);
        assert_eq!(tx.fee_satoshis, 5);
        assert_eq!(backend.call_count("getrawtransaction"), 2);
    }

    #[tokio::test]
    async fn test_confirmed_detail_served_from_cache() {
        let backend = Arc::new(MockBackend::new("node"));
        fixture::load_ledger(&backend);
        let engine = fixture::engine(&[backend.clone()], QueryConfig::default());

        let first = engine
            .get_detailed_transaction(fixture::TX_PAY_800M)
            .await
            .unwrap();
        let calls = backend.total_calls();

        let second = engine
            .get_detailed_transaction(fixture::TX_PAY_800M)
            .await
            .unwrap();
        assert_eq!(backend.total_calls(), calls);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unconfirmed_detail_not_cached() {
        let backend = Arc::new(MockBackend::new("node"));
        fixture::load_ledger(&backend);
        fixture::add_mempool_payment(&backend, "m1", fixture::ADDRESS, 1000);
        let engine = fixture::engine(&[backend.clone()], QueryConfig::default());

        let tx = engine.get_detailed_transaction("m1").await.unwrap();
        assert_eq!(tx.height, -1);
        assert!(tx.block_hash.is_none());

        engine.get_detailed_transaction("m1").await.unwrap();
        assert_eq!(backend.call_count("getrawtransaction"), 4);
    }

    #[tokio::test]
    async fn test_height_resolved_from_block_header() {
        let backend = Arc::new(MockBackend::new("node"));
        fixture::load_ledger(&backend);
        let mut tx = raw_tx("noheight", &[("fund-te5a", 0)], &[("x", 1)], Some(3));
        tx.height = None;
        backend.add_transaction(tx);

        let engine = fixture::engine(&[backend.clone()], QueryConfig::default());
        let tx = engine.get_detailed_transaction("noheight").await.unwrap();
        assert_eq!(tx.height, 3);
        assert_eq!(backend.call_count("getblockheader"), 1);
    }
}
