//! Bot configuration, deserialized from `config.toml`.
//!
//! Every tunable has a default so a missing or partial file still yields a
//! runnable configuration. Secrets (pinning credentials, the vault
//! passphrase, the operator key) may be left out of the file and supplied
//! through environment variables instead; the infra loader applies those
//! overrides.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the bot process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: String,
    /// Registry contract address (0x-prefixed hex).
    pub contract_address: String,
    /// Chain id used when signing transactions.
    pub chain_id: u64,
    /// Base URL for transaction/certificate explorer links.
    pub explorer_base: String,
    /// Base URL for content gateway links.
    pub gateway_base: String,
    /// SQLite database path for the wallet store.
    pub database_path: String,
    /// Directory for downloaded attachments awaiting upload.
    pub temp_dir: String,
    /// Seconds a session may sit idle before it is discarded.
    pub session_idle_secs: u64,
    /// Read-call retry attempts.
    pub read_attempts: u32,
    /// Base backoff in seconds between read retries (scaled by attempt).
    pub backoff_base_secs: u64,
    /// Receipt polling attempts for a submitted write call.
    pub poll_attempts: u32,
    /// Seconds between receipt polls.
    pub poll_interval_secs: u64,
    /// Seconds between balance-watcher sweeps.
    pub watcher_interval_secs: u64,
    /// Balance below which register entry auto-funds the wallet (decimal).
    pub funding_threshold: String,
    /// Amount sent when auto-funding (decimal).
    pub funding_amount: String,
    pub pinning: PinningConfig,
}

/// Pinning-service (file upload) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinningConfig {
    pub endpoint: String,
    /// API key; usually supplied via `PINNING_API_KEY`.
    pub api_key: Option<String>,
    /// API secret; usually supplied via `PINNING_API_SECRET`.
    pub api_secret: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: String::new(),
            chain_id: 1315,
            explorer_base: "https://aeneid.storyscan.xyz".to_string(),
            gateway_base: "https://gateway.pinata.cloud/ipfs".to_string(),
            database_path: "provenant.db".to_string(),
            temp_dir: "./tmp".to_string(),
            session_idle_secs: 900,
            read_attempts: 3,
            backoff_base_secs: 1,
            poll_attempts: 60,
            poll_interval_secs: 2,
            watcher_interval_secs: 15,
            funding_threshold: "0.001".to_string(),
            funding_amount: "0.01".to_string(),
            pinning: PinningConfig::default(),
        }
    }
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            api_key: None,
            api_secret: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.session_idle_secs, 900);
        assert_eq!(config.read_attempts, 3);
        assert_eq!(config.poll_attempts, 60);
        assert_eq!(config.poll_interval_secs, 2);
        assert!(config.pinning.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BotConfig = toml::from_str(
            r#"
            rpc_url = "https://rpc.example"
            contract_address = "0x52908400098527886e0f7030069857d2e4169ee7"

            [pinning]
            api_key = "pk"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url, "https://rpc.example");
        assert_eq!(config.session_idle_secs, 900);
        assert_eq!(config.pinning.api_key.as_deref(), Some("pk"));
        assert!(config.pinning.api_secret.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: BotConfig = toml::from_str("").unwrap();
        assert_eq!(config.chain_id, BotConfig::default().chain_id);
    }
}
