use crate::backend::{FailoverCallerRef, RawTransaction};
use crate::error::GatewayResult;
use crate::types::{AddressSet, MempoolDelta};
use std::collections::HashSet;

/// Unconfirmed activity of an address set, always read from the backend.
pub struct MempoolQuery {
    failover: FailoverCallerRef,
}

impl MempoolQuery {
    pub fn new(failover: FailoverCallerRef) -> Self {
        Self { failover }
    }

    /// Unconfirmed transactions touching any of `addresses`, one search per
    /// address in set order.
    pub async fn get_address_transactions(
        &self,
        addresses: &AddressSet,
    ) -> GatewayResult<Vec<RawTransaction>> {
        let mut transactions = Vec::new();

        for address in addresses.iter() {
            let found = self
                .failover
                .try_all("searchrawtransactions", |backend| async move {
                    match backend.search_raw_transactions(address).await {
                        // Address never seen by the node
                        Err(e) if e.is_not_found() => Ok(vec![]),
                        other => other,
                    }
                })
                .await?;

            transactions.extend(found.into_iter().filter(|tx| tx.is_unconfirmed()));
        }

        Ok(transactions)
    }

    pub async fn get_address_mempool(
        &self,
        addresses: &AddressSet,
    ) -> GatewayResult<Vec<MempoolDelta>> {
        let transactions = self.get_address_transactions(addresses).await?;
        let deltas = mempool_deltas(&transactions, addresses);
        debug!(
            "Mempool for {} address(es): {} tx(s), {} output(s)",
            addresses.len(),
            transactions.len(),
            deltas.len()
        );

        Ok(deltas)
    }
}

/// Projects every output whose addresses all belong to `addresses`.
pub fn mempool_deltas(transactions: &[RawTransaction], addresses: &AddressSet) -> Vec<MempoolDelta> {
    let mut deltas = Vec::new();

    for tx in transactions {
        for output in &tx.vout {
            let output_addresses = &output.script_pub_key.addresses;
            if output_addresses.is_empty() || !output_addresses.iter().all(|a| addresses.contains(a))
            {
                continue;
            }

            deltas.push(MempoolDelta {
                address: output_addresses[0].clone(),
                txid: tx.txid.clone(),
                index: output.n,
                satoshis: output.value.to_sat(),
            });
        }
    }

    deltas
}

/// Distinct txids in first-seen order.
pub fn txids_from_mempool(deltas: &[MempoolDelta]) -> Vec<String> {
    let mut seen = HashSet::new();
    deltas
        .iter()
        .filter(|d| seen.insert(d.txid.as_str()))
        .map(|d| d.txid.clone())
        .collect()
}

pub fn balance_from_mempool(deltas: &[MempoolDelta]) -> i64 {
    deltas.iter().map(|d| d.satoshis as i64).sum()
}
