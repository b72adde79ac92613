use super::{
    AddressTxidsQuery, BlockHeaderInfo, BlockchainInfo, ChainBackend, RawTransaction, ScriptPubKey,
    SpentInfo, SpentInfoQuery, TxInput, TxOutput, VerboseBlock,
};
use crate::error::{BackendError, BackendResult};
use bitcoincore_rpc::bitcoin::Amount;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    transactions: HashMap<String, RawTransaction>,
    order: Vec<String>,
    blocks: Vec<VerboseBlock>,
    best_block_hash: Option<String>,
    verification_progress: f64,
    spent: HashMap<(String, u32), SpentInfo>,
    sent: Vec<String>,
}

/// In-memory chain backend with per-method call counters and failure injection.
pub struct MockBackend {
    name: String,
    state: Mutex<MockState>,
    calls: Mutex<HashMap<String, usize>>,
    failure: Mutex<Option<BackendError>>,
    method_failures: Mutex<HashMap<String, BackendError>>,
    delays: Mutex<HashMap<String, Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

pub fn raw_tx(
    txid: &str,
    inputs: &[(&str, u32)],
    outputs: &[(&str, u64)],
    height: Option<i64>,
) -> RawTransaction {
    let vin = inputs
        .iter()
        .map(|(prev_txid, vout)| TxInput {
            txid: Some(prev_txid.to_string()),
            vout: Some(*vout),
            coinbase: None,
            script_sig: None,
            sequence: u32::MAX,
            prev_out: None,
        })
        .collect();

    let vout = outputs
        .iter()
        .enumerate()
        .map(|(n, (address, sats))| TxOutput {
            value: Amount::from_sat(*sats),
            n: n as u32,
            script_pub_key: ScriptPubKey {
                asm: String::new(),
                hex: format!("script-{}", address),
                script_type: Some("pubkeyhash".to_string()),
                addresses: if address.is_empty() {
                    vec![]
                } else {
                    vec![address.to_string()]
                },
            },
            spent_txid: None,
            spent_index: None,
            spent_height: None,
        })
        .collect();

    RawTransaction {
        hex: format!("hex-{}", txid),
        txid: txid.to_string(),
        hash: None,
        version: 1,
        locktime: 0,
        vin,
        vout,
        blockhash: height.map(|h| format!("block-{}", h)),
        confirmations: Some(if height.is_some() { 1 } else { 0 }),
        time: height.map(|h| 1_500_000_000 + h as u64 * 600),
        blocktime: height.map(|h| 1_500_000_000 + h as u64 * 600),
        height,
    }
}

pub fn coinbase_tx(txid: &str, outputs: &[(&str, u64)], height: i64) -> RawTransaction {
    let mut tx = raw_tx(txid, &[], outputs, Some(height));
    tx.vin.push(TxInput {
        txid: None,
        vout: None,
        coinbase: Some("03a0bb0d".to_string()),
        script_sig: None,
        sequence: u32::MAX,
        prev_out: None,
    });
    tx
}

pub fn block(hash: &str, height: u64, txids: &[&str]) -> VerboseBlock {
    VerboseBlock {
        hash: hash.to_string(),
        confirmations: 1,
        size: 285,
        height,
        version: 536870912,
        merkle_root: format!("merkle-{}", hash),
        tx: txids.iter().map(|t| t.to_string()).collect(),
        time: 1_500_000_000 + height * 600,
        median_time: Some(1_500_000_000 + height * 600 - 300),
        nonce: 2,
        bits: "207fffff".to_string(),
        difficulty: 4.6565423739069247e-10,
        chain_work: Some(format!("{:064x}", height * 2 + 2)),
        previous_block_hash: None,
        next_block_hash: None,
    }
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(MockState {
                verification_progress: 1.0,
                ..Default::default()
            }),
            calls: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
            method_failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fail_with(&self, error: BackendError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
        self.method_failures.lock().unwrap().clear();
    }

    /// Fails only `method`, other calls keep working.
    pub fn fail_method(&self, method: &str, error: BackendError) {
        self.method_failures
            .lock()
            .unwrap()
            .insert(method.to_string(), error);
    }

    /// Every call to `method` sleeps for `delay` before answering.
    pub fn set_delay(&self, method: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(method.to_string(), delay);
    }

    /// Highest number of delayed calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn set_best_block_hash(&self, hash: &str) {
        self.state.lock().unwrap().best_block_hash = Some(hash.to_string());
    }

    pub fn set_verification_progress(&self, progress: f64) {
        self.state.lock().unwrap().verification_progress = progress;
    }

    pub fn add_transaction(&self, tx: RawTransaction) {
        let mut state = self.state.lock().unwrap();
        if !state.transactions.contains_key(&tx.txid) {
            state.order.push(tx.txid.clone());
        }
        state.transactions.insert(tx.txid.clone(), tx);
    }

    /// Appends a block on top of the current chain, linking prev/next hashes,
    /// and makes it the best block.
    pub fn add_block(&self, mut block: VerboseBlock) {
        let mut state = self.state.lock().unwrap();
        if let Some(prev) = state.blocks.last_mut() {
            prev.next_block_hash = Some(block.hash.clone());
            block.previous_block_hash = Some(prev.hash.clone());
        }
        state.best_block_hash = Some(block.hash.clone());
        state.blocks.push(block);
    }

    pub fn add_spent_info(&self, txid: &str, index: u32, info: SpentInfo) {
        self.state
            .lock()
            .unwrap()
            .spent
            .insert((txid.to_string(), index), info);
    }

    pub fn sent_transactions(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    fn record(&self, method: &str) -> BackendResult<()> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_insert(0) += 1;

        if let Some(e) = self.method_failures.lock().unwrap().get(method) {
            return Err(e.clone());
        }
        match &*self.failure.lock().unwrap() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn pause(&self, method: &str) {
        let delay = self.delays.lock().unwrap().get(method).copied();
        if let Some(delay) = delay {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn touches(state: &MockState, tx: &RawTransaction, addresses: &[String]) -> bool {
        let pays = tx.vout.iter().any(|out| {
            out.script_pub_key
                .addresses
                .iter()
                .any(|a| addresses.contains(a))
        });

        let spends = tx.vin.iter().any(|input| {
            let (Some(prev_txid), Some(vout)) = (&input.txid, input.vout) else {
                return false;
            };
            state
                .transactions
                .get(prev_txid)
                .and_then(|prev| prev.vout.get(vout as usize))
                .map(|out| {
                    out.script_pub_key
                        .addresses
                        .iter()
                        .any(|a| addresses.contains(a))
                })
                .unwrap_or(false)
        });

        pays || spends
    }

    fn find_block(&self, hash: &str) -> BackendResult<VerboseBlock> {
        self.state
            .lock()
            .unwrap()
            .blocks
            .iter()
            .find(|b| b.hash == hash)
            .cloned()
            .ok_or_else(|| BackendError::new(-5, "Block not found"))
    }
}

#[async_trait::async_trait]
impl ChainBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_best_block_hash(&self) -> BackendResult<String> {
        self.record("getbestblockhash")?;
        self.state
            .lock()
            .unwrap()
            .best_block_hash
            .clone()
            .ok_or_else(|| BackendError::new(-1, "No best block"))
    }

    async fn get_block_hash(&self, height: u64) -> BackendResult<String> {
        self.record("getblockhash")?;
        self.state
            .lock()
            .unwrap()
            .blocks
            .iter()
            .find(|b| b.height == height)
            .map(|b| b.hash.clone())
            .ok_or_else(|| BackendError::new(-8, "Block height out of range"))
    }

    async fn get_block(&self, hash: &str) -> BackendResult<VerboseBlock> {
        self.record("getblock")?;
        self.find_block(hash)
    }

    async fn get_raw_block(&self, hash: &str) -> BackendResult<String> {
        self.record("getrawblock")?;
        self.find_block(hash).map(|b| format!("rawblock-{}", b.hash))
    }

    async fn get_block_header(&self, hash: &str) -> BackendResult<BlockHeaderInfo> {
        self.record("getblockheader")?;
        self.pause("getblockheader").await;
        let b = self.find_block(hash)?;
        Ok(BlockHeaderInfo {
            hash: b.hash,
            confirmations: b.confirmations,
            height: b.height,
            version: b.version,
            merkle_root: b.merkle_root,
            time: b.time,
            median_time: b.median_time,
            nonce: b.nonce,
            bits: b.bits,
            difficulty: b.difficulty,
            chain_work: b.chain_work,
            previous_block_hash: b.previous_block_hash,
            next_block_hash: b.next_block_hash,
        })
    }

    async fn get_raw_transaction(&self, txid: &str) -> BackendResult<RawTransaction> {
        self.record("getrawtransaction")?;
        self.pause("getrawtransaction").await;
        self.state
            .lock()
            .unwrap()
            .transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| {
                BackendError::new(-5, "No information available about transaction")
            })
    }

    async fn get_raw_transaction_hex(&self, txid: &str) -> BackendResult<String> {
        self.record("getrawtransactionhex")?;
        self.state
            .lock()
            .unwrap()
            .transactions
            .get(txid)
            .map(|tx| tx.hex.clone())
            .ok_or_else(|| {
                BackendError::new(-5, "No information available about transaction")
            })
    }

    async fn get_address_txids(&self, query: &AddressTxidsQuery) -> BackendResult<Vec<String>> {
        self.record("getaddresstxids")?;
        let state = self.state.lock().unwrap();

        // Oldest first, like the node's address index
        let mut matched: Vec<(i64, usize, String)> = state
            .order
            .iter()
            .enumerate()
            .filter_map(|(pos, txid)| {
                let tx = state.transactions.get(txid)?;
                let height = tx.height?;
                if let (Some(start), Some(end)) = (query.start, query.end) {
                    if height < start as i64 || height > end as i64 {
                        return None;
                    }
                }
                Self::touches(&state, tx, &query.addresses).then(|| (height, pos, txid.clone()))
            })
            .collect();
        matched.sort();

        Ok(matched.into_iter().map(|(_, _, txid)| txid).collect())
    }

    async fn search_raw_transactions(&self, address: &str) -> BackendResult<Vec<RawTransaction>> {
        self.record("searchrawtransactions")?;
        let state = self.state.lock().unwrap();
        let addresses = vec![address.to_string()];

        let found: Vec<RawTransaction> = state
            .order
            .iter()
            .filter_map(|txid| state.transactions.get(txid))
            .filter(|tx| Self::touches(&state, tx, &addresses))
            .cloned()
            .collect();

        if found.is_empty() {
            return Err(BackendError::new(
                -5,
                "No information available about address",
            ));
        }
        Ok(found)
    }

    async fn get_spent_info(&self, query: &SpentInfoQuery) -> BackendResult<SpentInfo> {
        self.record("getspentinfo")?;
        self.state
            .lock()
            .unwrap()
            .spent
            .get(&(query.txid.clone(), query.index))
            .cloned()
            .ok_or_else(|| BackendError::new(-5, "Unable to get spent info"))
    }

    async fn send_raw_transaction(
        &self,
        hex: &str,
        _allow_absurd_fees: bool,
    ) -> BackendResult<String> {
        self.record("sendrawtransaction")?;
        self.state.lock().unwrap().sent.push(hex.to_string());
        Ok(format!("txid-{}", hex))
    }

    async fn decode_raw_transaction(&self, hex: &str) -> BackendResult<serde_json::Value> {
        self.record("decoderawtransaction")?;
        Ok(serde_json::json!({ "hex": hex }))
    }

    async fn estimate_fee(&self, _blocks: u32) -> BackendResult<f64> {
        self.record("estimatefee")?;
        Ok(0.0001)
    }

    async fn get_blockchain_info(&self) -> BackendResult<BlockchainInfo> {
        self.record("getblockchaininfo")?;
        let state = self.state.lock().unwrap();
        Ok(BlockchainInfo {
            chain: "regtest".to_string(),
            blocks: state.blocks.last().map(|b| b.height).unwrap_or(0),
            headers: state.blocks.last().map(|b| b.height).unwrap_or(0),
            best_block_hash: state.best_block_hash.clone().unwrap_or_default(),
            difficulty: 4.6565423739069247e-10,
            verification_progress: state.verification_progress,
            chain_work: None,
        })
    }

    async fn generate(&self, count: u32) -> BackendResult<Vec<String>> {
        self.record("generate")?;
        Ok((0..count).map(|i| format!("generated-{}", i)).collect())
    }
}
