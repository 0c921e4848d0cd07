//! Configuration loader for the bot process.
//!
//! Reads `config.toml` and deserializes it into
//! [`BotConfig`](provenant_types::config::BotConfig). Falls back to defaults
//! when the file is missing or malformed, then applies environment-variable
//! overrides so secrets never have to live in the file.

use std::path::Path;

use provenant_types::config::BotConfig;

/// Load configuration from a TOML file.
///
/// - Missing file: returns [`BotConfig::default()`].
/// - Present but malformed: logs a warning and returns the default.
/// - Otherwise: the parsed config, with env overrides applied.
pub async fn load_config(path: &Path) -> BotConfig {
    let mut config = match tokio::fs::read_to_string(path).await {
        Ok(content) => match toml::from_str::<BotConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
                BotConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            BotConfig::default()
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            BotConfig::default()
        }
    };
    apply_env_overrides(&mut config);
    config
}

/// Overlay environment variables onto a loaded config.
///
/// `PROVENANT_RPC_URL`, `PROVENANT_CONTRACT_ADDRESS`, `PINNING_API_KEY`,
/// and `PINNING_API_SECRET` take precedence over file values when set.
pub fn apply_env_overrides(config: &mut BotConfig) {
    if let Ok(url) = std::env::var("PROVENANT_RPC_URL") {
        config.rpc_url = url;
    }
    if let Ok(addr) = std::env::var("PROVENANT_CONTRACT_ADDRESS") {
        config.contract_address = addr;
    }
    if let Ok(key) = std::env::var("PINNING_API_KEY") {
        config.pinning.api_key = Some(key);
    }
    if let Ok(secret) = std::env::var("PINNING_API_SECRET") {
        config.pinning.api_secret = Some(secret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config.chain_id, BotConfig::default().chain_id);
    }

    #[tokio::test]
    async fn test_valid_toml_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
rpc_url = "https://rpc.example"
chain_id = 99
poll_attempts = 10
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.rpc_url, "https://rpc.example");
        assert_eq!(config.chain_id, 99);
        assert_eq!(config.poll_attempts, 10);
        // Untouched fields keep their defaults.
        assert_eq!(config.session_idle_secs, 900);
    }

    #[tokio::test]
    async fn test_malformed_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.rpc_url, BotConfig::default().rpc_url);
    }
}
