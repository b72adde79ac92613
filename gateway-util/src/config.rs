use bitcoincore_rpc::Auth;
use bitcoincore_rpc::bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendAuth {
    None,
    UserPass(String, String),
    CookieFile(PathBuf),
}

fn default_network() -> Network {
    Network::Bitcoin
}

fn default_timeout_secs() -> u64 {
    30
}

/// One chain backend endpoint the gateway may talk to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_network")]
    pub network: Network,

    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default)]
    pub auth: Option<BackendAuth>,

    // Per-attempt timeout used by the failover caller
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }

        let base_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        match self.network() {
            Network::Bitcoin => base_dir.join(".bitcoin"),
            Network::Testnet => base_dir.join(".bitcoin/testnet3"),
            Network::Testnet4 => base_dir.join(".bitcoin/testnet4"),
            Network::Signet => base_dir.join(".bitcoin/signet"),
            Network::Regtest => base_dir.join(".bitcoin/regtest"),
            #[allow(unreachable_patterns)]
            _ => base_dir.join(".bitcoin"),
        }
    }

    pub fn rpc_url(&self) -> String {
        if let Some(ref url) = self.rpc_url {
            return url.clone();
        }

        let port = match self.network() {
            Network::Bitcoin => 8332,
            Network::Testnet => 18332,
            Network::Testnet4 => 48332,
            Network::Signet => 38332,
            Network::Regtest => 18443,
            #[allow(unreachable_patterns)]
            _ => 8332,
        };

        format!("http://127.0.0.1:{}", port)
    }

    pub fn auth(&self) -> Auth {
        match self.auth {
            Some(BackendAuth::None) => Auth::None,
            Some(BackendAuth::UserPass(ref user, ref pass)) => {
                Auth::UserPass(user.clone(), pass.clone())
            }
            Some(BackendAuth::CookieFile(ref path)) => Auth::CookieFile(path.clone()),

            // Default to the cookie file inside the node data dir
            None => Auth::CookieFile(self.data_dir().join(".cookie")),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: None,
            rpc_url: None,
            auth: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gateway_rpc_url() -> String {
    format!(
        "http://127.0.0.1:{}",
        crate::constants::LEDGER_GATEWAY_SERVICE_HTTP_PORT
    )
}

/// Where clients reach a running gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayClientConfig {
    #[serde(default = "default_gateway_rpc_url")]
    pub rpc_url: String,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_gateway_rpc_url(),
        }
    }
}
