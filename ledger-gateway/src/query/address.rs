use super::{QueryEngine, address_details_for_transaction, paginate, summarize_tx_balance};
use super::{balance_from_mempool, txids_from_mempool};
use crate::backend::AddressTxidsQuery;
use crate::cache::SummaryEntry;
use crate::error::{GatewayError, GatewayResult};
use crate::types::{
    AddressBalance, AddressHistory, AddressSet, AddressSummary, HistoryItem, HistoryOptions,
    MempoolDelta, SummaryOptions, TxidsOptions,
};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;

/// `reverse(mempool) ++ confirmed`, newest first.
pub fn merge_txids(mempool_txids: &[String], confirmed_txids: &[String]) -> Vec<String> {
    mempool_txids
        .iter()
        .rev()
        .chain(confirmed_txids.iter())
        .cloned()
        .collect()
}

/// Validates the `start`/`end` options and returns the range in backend
/// order (`start <= end`). Both must be given together with `end <= start`.
fn height_range(options: &TxidsOptions) -> GatewayResult<Option<(u32, u32)>> {
    match (options.start, options.end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            if end > start {
                return Err(GatewayError::range(format!(
                    "\"end\" ({}) is expected to be less than or equal to \"start\" ({})",
                    end, start
                )));
            }
            Ok(Some((end, start)))
        }
        _ => Err(GatewayError::range(
            "\"start\" and \"end\" must be given together",
        )),
    }
}

impl QueryEngine {
    pub async fn get_address_mempool(
        &self,
        addresses: &AddressSet,
    ) -> GatewayResult<Vec<MempoolDelta>> {
        self.mempool.get_address_mempool(addresses).await
    }

    /// Confirmed txids, newest first.
    async fn fetch_confirmed_txids(
        &self,
        addresses: &AddressSet,
        range: Option<(u32, u32)>,
    ) -> GatewayResult<Vec<String>> {
        let query = AddressTxidsQuery {
            addresses: addresses.as_slice().to_vec(),
            start: range.map(|(low, _)| low),
            end: range.map(|(_, high)| high),
        };

        let query = &query;
        let mut txids = self
            .failover
            .try_all("getaddresstxids", |backend| async move {
                backend.get_address_txids(query).await
            })
            .await?;

        // The address index returns oldest first
        txids.reverse();
        Ok(txids)
    }

    async fn get_confirmed_txids(&self, addresses: &AddressSet) -> GatewayResult<Arc<Vec<String>>> {
        let key = addresses.cache_key();
        if let Some(txids) = self.caches.txids.get(&key) {
            return Ok(txids);
        }

        let txids = Arc::new(self.fetch_confirmed_txids(addresses, None).await?);
        self.caches.txids.put(key, txids.clone());
        Ok(txids)
    }

    pub async fn get_address_txids(
        &self,
        addresses: &AddressSet,
        options: &TxidsOptions,
    ) -> GatewayResult<Vec<String>> {
        let range = height_range(options)?;

        if options.query_mempool_only {
            let deltas = self.mempool.get_address_mempool(addresses).await?;
            return Ok(merge_txids(&txids_from_mempool(&deltas), &[]));
        }

        // A height range never includes the mempool and is never cached
        if let Some(range) = range {
            return self.fetch_confirmed_txids(addresses, Some(range)).await;
        }

        let mempool_txids = if options.query_mempool {
            txids_from_mempool(&self.mempool.get_address_mempool(addresses).await?)
        } else {
            vec![]
        };

        let confirmed = self.get_confirmed_txids(addresses).await?;
        Ok(merge_txids(&mempool_txids, &confirmed))
    }

    pub async fn get_address_balance(
        &self,
        addresses: &AddressSet,
    ) -> GatewayResult<AddressBalance> {
        let key = addresses.cache_key();
        if let Some(balance) = self.caches.balance.get(&key) {
            return Ok(balance);
        }

        let txids = self.get_confirmed_txids(addresses).await?;
        let transactions = self.get_detailed_transactions(&txids).await?;
        let balance = summarize_tx_balance(transactions.iter().map(|tx| tx.as_ref()), addresses);

        self.caches.balance.put(key, balance);
        Ok(balance)
    }

    pub async fn get_address_history(
        &self,
        addresses: &AddressSet,
        options: &HistoryOptions,
    ) -> GatewayResult<AddressHistory> {
        if addresses.len() > self.config.max_addresses_query {
            return Err(GatewayError::validation(format!(
                "Maximum number of addresses ({}) exceeded",
                self.config.max_addresses_query
            )));
        }

        let from = options.from.unwrap_or(0);
        let to = options
            .to
            .unwrap_or(from.saturating_add(self.config.max_transaction_history));
        if from >= to {
            return Err(GatewayError::validation(format!(
                "\"from\" ({}) is expected to be less than \"to\" ({})",
                from, to
            )));
        }
        if to - from > self.config.max_transaction_history {
            return Err(GatewayError::validation(format!(
                "\"from\" ({}) and \"to\" ({}) range should be less than or equal to {}",
                from, to, self.config.max_transaction_history
            )));
        }

        let txids = self.get_address_txids(addresses, &options.txids).await?;
        let total_count = txids.len();
        let page = paginate(&txids, from, to)?;

        let items = stream::iter(page)
            .map(|txid| async move { self.get_history_item(&txid, addresses).await })
            .buffered(self.config.transaction_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(AddressHistory { total_count, items })
    }

    async fn get_history_item(
        &self,
        txid: &str,
        addresses: &AddressSet,
    ) -> GatewayResult<HistoryItem> {
        let tx = self.get_detailed_transaction(txid).await?;
        let details = address_details_for_transaction(&tx, addresses);

        Ok(HistoryItem {
            addresses: details.addresses,
            satoshis: details.satoshis,
            confirmations: tx.confirmations(self.tip_height()),
            tx: tx.as_ref().clone(),
        })
    }

    pub async fn get_address_summary(
        &self,
        addresses: &AddressSet,
        options: &SummaryOptions,
    ) -> GatewayResult<AddressSummary> {
        let window = if options.no_tx_list {
            None
        } else {
            let from = options.from.unwrap_or(0);
            let to = options
                .to
                .unwrap_or(from.saturating_add(self.config.max_txids));
            if from >= to {
                return Err(GatewayError::validation(format!(
                    "\"from\" ({}) is expected to be less than \"to\" ({})",
                    from, to
                )));
            }
            if to - from > self.config.max_txids {
                return Err(GatewayError::validation(format!(
                    "\"from\" ({}) and \"to\" ({}) range should be less than or equal to {}",
                    from, to, self.config.max_txids
                )));
            }
            Some((from, to))
        };

        let mempool_branch = async {
            if options.query_mempool {
                self.mempool.get_address_mempool(addresses).await
            } else {
                Ok(vec![])
            }
        };

        let key = addresses.cache_key();
        let (entry, deltas) = match self.caches.summary.get(&key) {
            Some(entry) => (entry, mempool_branch.await?),
            None => {
                let (txids, balance, deltas) = tokio::try_join!(
                    self.get_confirmed_txids(addresses),
                    self.get_address_balance(addresses),
                    mempool_branch
                )?;

                let entry = Arc::new(SummaryEntry { txids, balance });
                self.caches.summary.put(key, entry.clone());
                (entry, deltas)
            }
        };

        let mempool_txids = txids_from_mempool(&deltas);
        let txids = match window {
            Some((from, to)) => Some(paginate(
                &merge_txids(&mempool_txids, &entry.txids),
                from,
                to,
            )?),
            None => None,
        };

        Ok(AddressSummary {
            appearances: entry.txids.len(),
            total_received: entry.balance.received,
            total_spent: entry.balance.sent(),
            balance: entry.balance.balance,
            unconfirmed_appearances: mempool_txids.len(),
            unconfirmed_balance: balance_from_mempool(&deltas),
            txids,
        })
    }
}
