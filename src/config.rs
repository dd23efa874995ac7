use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

pub static LEDGER_RPC_URL: LazyLock<String> = LazyLock::new(|| {
    std::env::var("LEDGER_RPC_URL").unwrap_or("http://127.0.0.1:5005".to_string())
});
pub static CHANNEL_URL: LazyLock<String> =
    LazyLock::new(|| std::env::var("CHANNEL_URL").unwrap_or("ws://127.0.0.1:5000".to_string()));
pub static CHANNEL_NAMESPACE: LazyLock<String> =
    LazyLock::new(|| std::env::var("CHANNEL_NAMESPACE").unwrap_or("bet".to_string()));
pub static CHANNEL_RECONNECT_LIMIT: LazyLock<u32> =
    LazyLock::new(|| env_number("CHANNEL_RECONNECT_LIMIT", DEFAULT_RECONNECT_LIMIT));
pub static CHANNEL_READY_POLL_MS: LazyLock<u64> =
    LazyLock::new(|| env_number("CHANNEL_READY_POLL_MS", DEFAULT_READY_POLL_MS));
pub static LEDGER_FEE_DROPS: LazyLock<u64> =
    LazyLock::new(|| env_number("LEDGER_FEE_DROPS", DEFAULT_FEE_DROPS));
pub static ACCOUNT_SCAN_LIMIT: LazyLock<u32> =
    LazyLock::new(|| env_number("ACCOUNT_SCAN_LIMIT", DEFAULT_ACCOUNT_SCAN_LIMIT));

pub const DEFAULT_RECONNECT_LIMIT: u32 = 10;
pub const DEFAULT_READY_POLL_MS: u64 = 10;
pub const DEFAULT_FEE_DROPS: u64 = 10;
pub const DEFAULT_ACCOUNT_SCAN_LIMIT: u32 = 20;

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub ledger_rpc_endpoint: String,
    pub channel_endpoint: String,
    pub channel_namespace: String,
    pub reconnect_limit: u32,
    pub ready_poll_ms: u64,
    pub fee_drops: u64,
    pub account_scan_limit: u32,
}
impl EndpointConfig {
    pub fn default() -> Self {
        Self {
            ledger_rpc_endpoint: LEDGER_RPC_URL.to_string(),
            channel_endpoint: CHANNEL_URL.to_string(),
            channel_namespace: CHANNEL_NAMESPACE.to_string(),
            reconnect_limit: *CHANNEL_RECONNECT_LIMIT,
            ready_poll_ms: *CHANNEL_READY_POLL_MS,
            fee_drops: *LEDGER_FEE_DROPS,
            account_scan_limit: *ACCOUNT_SCAN_LIMIT,
        }
    }
    pub fn new(
        ledger_rpc_endpoint: String,
        channel_endpoint: String,
        channel_namespace: String,
        reconnect_limit: u32,
        ready_poll_ms: u64,
        fee_drops: u64,
        account_scan_limit: u32,
    ) -> Self {
        Self {
            ledger_rpc_endpoint,
            channel_endpoint,
            channel_namespace,
            reconnect_limit,
            ready_poll_ms,
            fee_drops,
            account_scan_limit,
        }
    }

    /// Reads the environment at call time, unlike `default()` which uses the
    /// values captured on first access.
    pub fn from_env() -> Self {
        Self {
            ledger_rpc_endpoint: std::env::var("LEDGER_RPC_URL")
                .unwrap_or("http://127.0.0.1:5005".to_string()),
            channel_endpoint: std::env::var("CHANNEL_URL")
                .unwrap_or("ws://127.0.0.1:5000".to_string()),
            channel_namespace: std::env::var("CHANNEL_NAMESPACE").unwrap_or("bet".to_string()),
            reconnect_limit: env_number("CHANNEL_RECONNECT_LIMIT", DEFAULT_RECONNECT_LIMIT),
            ready_poll_ms: env_number("CHANNEL_READY_POLL_MS", DEFAULT_READY_POLL_MS),
            fee_drops: env_number("LEDGER_FEE_DROPS", DEFAULT_FEE_DROPS),
            account_scan_limit: env_number("ACCOUNT_SCAN_LIMIT", DEFAULT_ACCOUNT_SCAN_LIMIT),
        }
    }
    pub fn update_ledger_rpc_endpoint(&mut self, endpoint: String) {
        self.ledger_rpc_endpoint = endpoint;
    }
    pub fn update_channel_endpoint(&mut self, endpoint: String) {
        self.channel_endpoint = endpoint;
    }
    pub fn update_channel_namespace(&mut self, namespace: String) {
        self.channel_namespace = namespace;
    }
    pub fn update_reconnect_limit(&mut self, limit: u32) {
        self.reconnect_limit = limit;
    }
    pub fn update_fee_drops(&mut self, fee_drops: u64) {
        self.fee_drops = fee_drops;
    }
    pub fn to_ledger_endpoint_config(&self) -> LedgerEndPointConfig {
        LedgerEndPointConfig::new(
            self.ledger_rpc_endpoint.clone(),
            self.fee_drops,
            self.account_scan_limit,
        )
    }
    pub fn to_channel_endpoint_config(&self) -> ChannelEndPointConfig {
        ChannelEndPointConfig::new(
            self.channel_endpoint.clone(),
            self.channel_namespace.clone(),
            self.reconnect_limit,
            self.ready_poll_ms,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEndPointConfig {
    pub rpc_endpoint: String,
    pub fee_drops: u64,
    /// How many sub-account indexes are searched when locating the signing
    /// identity for an address.
    pub account_scan_limit: u32,
}
impl LedgerEndPointConfig {
    pub fn new(rpc_endpoint: String, fee_drops: u64, account_scan_limit: u32) -> Self {
        Self {
            rpc_endpoint,
            fee_drops,
            account_scan_limit,
        }
    }
    pub fn default() -> Self {
        Self {
            rpc_endpoint: LEDGER_RPC_URL.to_string(),
            fee_drops: *LEDGER_FEE_DROPS,
            account_scan_limit: *ACCOUNT_SCAN_LIMIT,
        }
    }
    pub fn update_rpc_endpoint(&mut self, endpoint: String) {
        self.rpc_endpoint = endpoint;
    }
    pub fn update_fee_drops(&mut self, fee_drops: u64) {
        self.fee_drops = fee_drops;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEndPointConfig {
    pub endpoint: String,
    pub namespace: String,
    pub reconnect_limit: u32,
    pub ready_poll_ms: u64,
}
impl ChannelEndPointConfig {
    pub fn new(endpoint: String, namespace: String, reconnect_limit: u32, ready_poll_ms: u64) -> Self {
        Self {
            endpoint,
            namespace,
            reconnect_limit,
            ready_poll_ms,
        }
    }
    pub fn default() -> Self {
        Self {
            endpoint: CHANNEL_URL.to_string(),
            namespace: CHANNEL_NAMESPACE.to_string(),
            reconnect_limit: *CHANNEL_RECONNECT_LIMIT,
            ready_poll_ms: *CHANNEL_READY_POLL_MS,
        }
    }
    pub fn socket_url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.namespace)
    }
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }
    pub fn update_endpoint(&mut self, endpoint: String) {
        self.endpoint = endpoint;
    }
    pub fn update_namespace(&mut self, namespace: String) {
        self.namespace = namespace;
    }
}
