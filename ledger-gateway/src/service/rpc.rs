use crate::backend::{BlockHeaderInfo, RawTransaction, SpentInfo, SpentInfoQuery, VerboseBlock};
use crate::status::SyncStatus;
use crate::types::{
    AddressArg, AddressBalance, AddressHistory, AddressSummary, BlockOverview, BlockRef,
    DetailedTransaction, HistoryOptions, MempoolDelta, SummaryOptions, TxidsOptions,
};
use jsonrpc_core::{BoxFuture, Result as JsonResult};
use jsonrpc_derive::rpc;

#[rpc(server)]
pub trait LedgerGatewayRpc {
    /// Gets the best block hash reported by the backend
    #[rpc(name = "get_best_block_hash")]
    fn get_best_block_hash(&self) -> BoxFuture<JsonResult<String>>;

    /// Gets the height of the tip the gateway is currently following
    #[rpc(name = "get_block_height")]
    fn get_block_height(&self) -> JsonResult<u64>;

    #[rpc(name = "get_sync_status")]
    fn get_sync_status(&self) -> JsonResult<SyncStatus>;

    /// Gets the confirmed balance and total received of one or more addresses
    #[rpc(name = "get_address_balance")]
    fn get_address_balance(&self, addresses: AddressArg) -> BoxFuture<JsonResult<AddressBalance>>;

    #[rpc(name = "get_address_mempool")]
    fn get_address_mempool(&self, addresses: AddressArg)
    -> BoxFuture<JsonResult<Vec<MempoolDelta>>>;

    /// Gets txids touching the addresses, unconfirmed first, newest first
    #[rpc(name = "get_address_txids")]
    fn get_address_txids(
        &self,
        addresses: AddressArg,
        options: Option<TxidsOptions>,
    ) -> BoxFuture<JsonResult<Vec<String>>>;

    /// Gets one page of detailed transactions touching the addresses
    #[rpc(name = "get_address_history")]
    fn get_address_history(
        &self,
        addresses: AddressArg,
        options: Option<HistoryOptions>,
    ) -> BoxFuture<JsonResult<AddressHistory>>;

    #[rpc(name = "get_address_summary")]
    fn get_address_summary(
        &self,
        addresses: AddressArg,
        options: Option<SummaryOptions>,
    ) -> BoxFuture<JsonResult<AddressSummary>>;

    #[rpc(name = "get_detailed_transaction")]
    fn get_detailed_transaction(&self, txid: String)
    -> BoxFuture<JsonResult<DetailedTransaction>>;

    /// Gets the backend's verbose transaction object
    #[rpc(name = "get_transaction")]
    fn get_transaction(&self, txid: String) -> BoxFuture<JsonResult<RawTransaction>>;

    #[rpc(name = "get_raw_transaction")]
    fn get_raw_transaction(&self, txid: String) -> BoxFuture<JsonResult<String>>;

    /// Broadcasts a serialized transaction and returns its txid
    #[rpc(name = "send_transaction")]
    fn send_transaction(
        &self,
        hex: String,
        allow_absurd_fees: Option<bool>,
    ) -> BoxFuture<JsonResult<String>>;

    #[rpc(name = "decode_raw_transaction")]
    fn decode_raw_transaction(&self, hex: String) -> BoxFuture<JsonResult<serde_json::Value>>;

    /// Gets a block by hash or height
    #[rpc(name = "get_block")]
    fn get_block(&self, block: BlockRef) -> BoxFuture<JsonResult<VerboseBlock>>;

    #[rpc(name = "get_block_header")]
    fn get_block_header(&self, block: BlockRef) -> BoxFuture<JsonResult<BlockHeaderInfo>>;

    #[rpc(name = "get_block_overview")]
    fn get_block_overview(&self, block: BlockRef) -> BoxFuture<JsonResult<BlockOverview>>;

    /// Gets the estimated fee rate for confirmation within `blocks` blocks
    #[rpc(name = "estimate_fee")]
    fn estimate_fee(&self, blocks: u32) -> BoxFuture<JsonResult<f64>>;

    #[rpc(name = "get_spent_info")]
    fn get_spent_info(&self, query: SpentInfoQuery) -> BoxFuture<JsonResult<SpentInfo>>;

    #[rpc(name = "stop")]
    fn stop(&self) -> JsonResult<()>;
}
