use super::rpc::*;
use crate::backend::{BlockHeaderInfo, RawTransaction, SpentInfo, SpentInfoQuery, VerboseBlock};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::LedgerGatewayRef;
use crate::status::SyncStatus;
use crate::types::{
    AddressArg, AddressBalance, AddressHistory, AddressSet, AddressSummary, BlockOverview,
    BlockRef, DetailedTransaction, HistoryOptions, MempoolDelta, SummaryOptions, TxidsOptions,
};
use jsonrpc_core::{BoxFuture, IoHandler};
use jsonrpc_core::{Error as JsonError, ErrorCode, Result as JsonResult};
use jsonrpc_http_server::{AccessControlAllowOrigin, DomainsValidation, ServerBuilder};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Maps a query failure onto a JSON-RPC error. Backend failures keep the
/// backend's own code and message.
pub fn to_json_error(e: GatewayError) -> JsonError {
    match e {
        GatewayError::Validation(message) | GatewayError::Range(message) => JsonError {
            code: ErrorCode::InvalidParams,
            message,
            data: None,
        },
        GatewayError::Backend { code, message } => JsonError {
            code: ErrorCode::ServerError(code as i64),
            message,
            data: None,
        },
        GatewayError::Internal(message) => JsonError {
            code: ErrorCode::InternalError,
            message,
            data: None,
        },
    }
}

#[derive(Clone)]
pub struct LedgerGatewayRpcServer {
    gateway: LedgerGatewayRef,

    // Queries run on the gateway's runtime, not on the http server's threads
    runtime: Handle,
    shutdown_tx: watch::Sender<()>,
    server_handle: Arc<Mutex<Option<jsonrpc_http_server::CloseHandle>>>,
}

impl LedgerGatewayRpcServer {
    /// Must be called from within the gateway's tokio runtime.
    pub fn new(gateway: LedgerGatewayRef, shutdown_tx: watch::Sender<()>) -> Self {
        Self {
            gateway,
            runtime: Handle::current(),
            shutdown_tx,
            server_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn io_handler(&self) -> IoHandler {
        let mut io = IoHandler::new();
        io.extend_with(self.clone().to_delegate());
        io
    }

    pub fn start(
        gateway: LedgerGatewayRef,
        shutdown_tx: watch::Sender<()>,
    ) -> Result<Self, String> {
        let port = gateway.config().rpc_server.port;
        let ret = Self::new(gateway, shutdown_tx);
        let io = ret.io_handler();

        let addr = format!("127.0.0.1:{}", port).parse().map_err(|e| {
            let msg = format!("Failed to parse RPC server address: {}", e);
            error!("{}", msg);
            msg
        })?;

        let server = ServerBuilder::new(io)
            .cors(DomainsValidation::AllowOnly(vec![
                AccessControlAllowOrigin::Any,
            ]))
            .start_http(&addr)
            .map_err(|e| {
                let msg = format!("Unable to start RPC server: {}", e);
                error!("{}", msg);
                msg
            })?;

        let handle = server.close_handle();
        info!("RPC server listening on {}", addr);
        tokio::task::spawn_blocking(move || {
            server.wait();
        });

        {
            let mut current = ret.server_handle.lock().unwrap();
            if current.is_some() {
                let msg = "RPC server is already running".to_string();
                error!("{}", msg);
                return Err(msg);
            }
            *current = Some(handle);
        }

        Ok(ret)
    }

    pub async fn close(&self) {
        let handle = self.server_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            info!("Closing RPC server.");
            if let Err(e) = tokio::task::spawn_blocking(move || handle.close()).await {
                error!("Failed to close RPC server: {}", e);
            }

            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            info!("RPC server closed.");
        } else {
            warn!("RPC server handle not found.");
        }
    }

    fn run<T, F, Fut>(&self, f: F) -> BoxFuture<JsonResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(LedgerGatewayRef) -> Fut,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    {
        let task = self.runtime.spawn(f(self.gateway.clone()));
        Box::pin(async move {
            match task.await {
                Ok(ret) => ret.map_err(to_json_error),
                Err(e) => {
                    let msg = format!("Query task failed: {}", e);
                    error!("{}", msg);
                    Err(JsonError {
                        code: ErrorCode::InternalError,
                        message: msg,
                        data: None,
                    })
                }
            }
        })
    }
}

impl LedgerGatewayRpc for LedgerGatewayRpcServer {
    fn stop(&self) -> JsonResult<()> {
        info!("Received stop command via RPC.");
        if let Err(e) = self.shutdown_tx.send(()) {
            let msg = format!("Failed to send shutdown signal: {}", e);
            error!("{}", msg);
            return Err(JsonError {
                code: ErrorCode::InternalError,
                message: msg,
                data: None,
            });
        }

        if let Some(handle) = self.server_handle.lock().unwrap().take() {
            self.runtime.spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                info!("Closing RPC server.");
                handle.close();
            });
        } else {
            warn!("RPC server handle not found.");
        }

        Ok(())
    }

    fn get_best_block_hash(&self) -> BoxFuture<JsonResult<String>> {
        self.run(|gateway| async move { gateway.query().get_best_block_hash().await })
    }

    fn get_block_height(&self) -> JsonResult<u64> {
        Ok(self.gateway.tip().height)
    }

    fn get_sync_status(&self) -> JsonResult<SyncStatus> {
        Ok(self.gateway.sync_status())
    }

    fn get_address_balance(&self, addresses: AddressArg) -> BoxFuture<JsonResult<AddressBalance>> {
        self.run(|gateway| async move {
            let addresses = AddressSet::try_from(addresses)?;
            gateway.query().get_address_balance(&addresses).await
        })
    }

    fn get_address_mempool(
        &self,
        addresses: AddressArg,
    ) -> BoxFuture<JsonResult<Vec<MempoolDelta>>> {
        self.run(|gateway| async move {
            let addresses = AddressSet::try_from(addresses)?;
            gateway.query().get_address_mempool(&addresses).await
        })
    }

    fn get_address_txids(
        &self,
        addresses: AddressArg,
        options: Option<TxidsOptions>,
    ) -> BoxFuture<JsonResult<Vec<String>>> {
        self.run(|gateway| async move {
            let addresses = AddressSet::try_from(addresses)?;
            let options = options.unwrap_or_default();
            gateway.query().get_address_txids(&addresses, &options).await
        })
    }

    fn get_address_history(
        &self,
        addresses: AddressArg,
        options: Option<HistoryOptions>,
    ) -> BoxFuture<JsonResult<AddressHistory>> {
        self.run(|gateway| async move {
            let addresses = AddressSet::try_from(addresses)?;
            let options = options.unwrap_or_default();
            gateway.query().get_address_history(&addresses, &options).await
        })
    }

    fn get_address_summary(
        &self,
        addresses: AddressArg,
        options: Option<SummaryOptions>,
    ) -> BoxFuture<JsonResult<AddressSummary>> {
        self.run(|gateway| async move {
            let addresses = AddressSet::try_from(addresses)?;
            let options = options.unwrap_or_default();
            gateway.query().get_address_summary(&addresses, &options).await
        })
    }

    fn get_detailed_transaction(
        &self,
        txid: String,
    ) -> BoxFuture<JsonResult<DetailedTransaction>> {
        self.run(|gateway| async move {
            let tx = gateway.query().get_detailed_transaction(&txid).await?;
            Ok(tx.as_ref().clone())
        })
    }

    fn get_transaction(&self, txid: String) -> BoxFuture<JsonResult<RawTransaction>> {
        self.run(|gateway| async move { gateway.query().get_transaction(&txid).await })
    }

    fn get_raw_transaction(&self, txid: String) -> BoxFuture<JsonResult<String>> {
        self.run(|gateway| async move {
            let hex = gateway.query().get_raw_transaction(&txid).await?;
            Ok(hex.as_ref().clone())
        })
    }

    fn send_transaction(
        &self,
        hex: String,
        allow_absurd_fees: Option<bool>,
    ) -> BoxFuture<JsonResult<String>> {
        self.run(|gateway| async move {
            gateway
                .query()
                .send_transaction(&hex, allow_absurd_fees.unwrap_or(false))
                .await
        })
    }

    fn decode_raw_transaction(&self, hex: String) -> BoxFuture<JsonResult<serde_json::Value>> {
        self.run(|gateway| async move { gateway.query().decode_raw_transaction(&hex).await })
    }

    fn get_block(&self, block: BlockRef) -> BoxFuture<JsonResult<VerboseBlock>> {
        self.run(|gateway| async move {
            let block = gateway.query().get_block(&block).await?;
            Ok(block.as_ref().clone())
        })
    }

    fn get_block_header(&self, block: BlockRef) -> BoxFuture<JsonResult<BlockHeaderInfo>> {
        self.run(|gateway| async move {
            let header = gateway.query().get_block_header(&block).await?;
            Ok(header.as_ref().clone())
        })
    }

    fn get_block_overview(&self, block: BlockRef) -> BoxFuture<JsonResult<BlockOverview>> {
        self.run(|gateway| async move {
            let overview = gateway.query().get_block_overview(&block).await?;
            Ok(overview.as_ref().clone())
        })
    }

    fn estimate_fee(&self, blocks: u32) -> BoxFuture<JsonResult<f64>> {
        self.run(move |gateway| async move { gateway.query().estimate_fee(blocks).await })
    }

    fn get_spent_info(&self, query: SpentInfoQuery) -> BoxFuture<JsonResult<SpentInfo>> {
        self.run(|gateway| async move { gateway.query().get_spent_info(&query).await })
    }
}
