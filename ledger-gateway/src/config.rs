use gateway_util::{EndpointConfig, LEDGER_GATEWAY_SERVICE_HTTP_PORT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn default_max_txids() -> usize {
    1000
}

fn default_max_transaction_history() -> usize {
    50
}

fn default_max_addresses_query() -> usize {
    10000
}

fn default_transaction_concurrency() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    // Upper bound of a summary txid window
    #[serde(default = "default_max_txids")]
    pub max_txids: usize,

    // Upper bound of a history page
    #[serde(default = "default_max_transaction_history")]
    pub max_transaction_history: usize,

    #[serde(default = "default_max_addresses_query")]
    pub max_addresses_query: usize,

    // Transactions expanded in parallel for one history page
    #[serde(default = "default_transaction_concurrency")]
    pub transaction_concurrency: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_txids: default_max_txids(),
            max_transaction_history: default_max_transaction_history(),
            max_addresses_query: default_max_addresses_query(),
            transaction_concurrency: default_transaction_concurrency(),
        }
    }
}

fn default_try_all_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverConfig {
    #[serde(default = "default_try_all_interval_ms")]
    pub try_all_interval_ms: u64,
}

impl FailoverConfig {
    pub fn try_all_interval(&self) -> Duration {
        Duration::from_millis(self.try_all_interval_ms)
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            try_all_interval_ms: default_try_all_interval_ms(),
        }
    }
}

fn default_debounce_window_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    15000
}

fn default_sync_progress_threshold() -> f64 {
    0.9999
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipConfig {
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,

    // How often the best block poller asks for the best block hash
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    // Verification progress from which the backend counts as caught up
    #[serde(default = "default_sync_progress_threshold")]
    pub sync_progress_threshold: f64,
}

impl TipConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TipConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: default_debounce_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            sync_progress_threshold: default_sync_progress_threshold(),
        }
    }
}

fn default_address_cache_capacity() -> usize {
    50000
}

fn default_block_overview_cache_capacity() -> usize {
    144
}

fn default_detailed_transaction_cache_capacity() -> usize {
    100000
}

fn default_raw_transaction_cache_capacity() -> usize {
    50000
}

fn default_block_cache_capacity() -> usize {
    144
}

fn default_raw_block_cache_capacity() -> usize {
    72
}

fn default_block_header_cache_capacity() -> usize {
    288
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    // Shared by the txids, balance and summary caches
    #[serde(default = "default_address_cache_capacity")]
    pub address_capacity: usize,

    #[serde(default = "default_block_overview_cache_capacity")]
    pub block_overview_capacity: usize,

    #[serde(default = "default_detailed_transaction_cache_capacity")]
    pub detailed_transaction_capacity: usize,

    #[serde(default = "default_raw_transaction_cache_capacity")]
    pub raw_transaction_capacity: usize,

    #[serde(default = "default_block_cache_capacity")]
    pub block_capacity: usize,

    #[serde(default = "default_raw_block_cache_capacity")]
    pub raw_block_capacity: usize,

    #[serde(default = "default_block_header_cache_capacity")]
    pub block_header_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            address_capacity: default_address_cache_capacity(),
            block_overview_capacity: default_block_overview_cache_capacity(),
            detailed_transaction_capacity: default_detailed_transaction_cache_capacity(),
            raw_transaction_capacity: default_raw_transaction_cache_capacity(),
            block_capacity: default_block_cache_capacity(),
            raw_block_capacity: default_raw_block_cache_capacity(),
            block_header_capacity: default_block_header_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcServer {
    #[serde(default = "default_rpc_port")]
    pub port: u16,
}

fn default_rpc_port() -> u16 {
    LEDGER_GATEWAY_SERVICE_HTTP_PORT
}

impl Default for RpcServer {
    fn default() -> Self {
        RpcServer {
            port: default_rpc_port(),
        }
    }
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![EndpointConfig::default()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub failover: FailoverConfig,

    #[serde(default)]
    pub tip: TipConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rpc_server: RpcServer,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            query: QueryConfig::default(),
            failover: FailoverConfig::default(),
            tip: TipConfig::default(),
            cache: CacheConfig::default(),
            rpc_server: RpcServer::default(),
        }
    }
}

impl GatewayConfig {
    pub fn load(root_dir: &Path) -> Result<Self, String> {
        let path = root_dir.join("config.toml");
        if !path.exists() {
            let default_config = GatewayConfig::default();
            info!(
                "Config file {} does not exist. Using default configuration.",
                path.display()
            );
            match toml::to_string_pretty(&default_config) {
                Ok(s) => info!("Default config: {}", s),
                Err(e) => warn!("Failed to render default config: {}", e),
            }
            return Ok(default_config);
        }

        info!("Loading config from {}", path.display());
        let config_data = std::fs::read_to_string(&path).map_err(|e| {
            let msg = format!("Failed to read config file {}: {}", path.display(), e);
            error!("{}", msg);
            msg
        })?;
        info!("Config data: {}", config_data);

        Self::parse(&config_data).map_err(|e| {
            let msg = format!("Failed to parse config file {}: {}", path.display(), e);
            error!("{}", msg);
            msg
        })
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        let config: GatewayConfig = toml::from_str(data).map_err(|e| e.to_string())?;
        if config.endpoints.is_empty() {
            return Err("At least one endpoint must be configured".to_string());
        }
        if config.query.transaction_concurrency == 0 {
            return Err("query.transaction_concurrency must be greater than zero".to_string());
        }

        Ok(config)
    }
}

pub type GatewayConfigRef = Arc<GatewayConfig>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GatewayConfig::parse("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.query.max_txids, 1000);
        assert_eq!(config.query.max_transaction_history, 50);
        assert_eq!(config.query.max_addresses_query, 10000);
        assert_eq!(config.query.transaction_concurrency, 5);
        assert_eq!(config.failover.try_all_interval(), Duration::from_secs(1));
        assert_eq!(config.tip.debounce_window(), Duration::from_secs(1));
        assert_eq!(config.tip.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.rpc_server.port, LEDGER_GATEWAY_SERVICE_HTTP_PORT);
        assert_eq!(config.endpoints.len(), 1);
    }

    #[test]
    fn test_parse_endpoints_and_overrides() {
        let data = r#"
[[endpoints]]
rpc_url = "http://10.0.0.1:8332"
auth = { UserPass = ["alice", "secret"] }

[[endpoints]]
rpc_url = "http://10.0.0.2:8332"
timeout_secs = 5

[query]
max_transaction_history = 100

[failover]
try_all_interval_ms = 250

[cache]
detailed_transaction_capacity = 10
"#;
        let config = GatewayConfig::parse(data).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].rpc_url(), "http://10.0.0.1:8332");
        assert_eq!(config.endpoints[1].timeout(), Duration::from_secs(5));
        assert_eq!(config.query.max_transaction_history, 100);
        assert_eq!(config.query.max_txids, 1000);
        assert_eq!(config.failover.try_all_interval_ms, 250);
        assert_eq!(config.cache.detailed_transaction_capacity, 10);
        assert_eq!(config.cache.block_header_capacity, 288);
    }

    #[test]
    fn test_rejects_empty_endpoint_list() {
        assert!(GatewayConfig::parse("endpoints = []").is_err());
        assert!(GatewayConfig::parse("[query]\ntransaction_concurrency = 0").is_err());
    }
}
