//! Asset-registry bot entry point.
//!
//! Binary name: `provenant`
//!
//! Wires the workflow engine to its collaborators (ledger RPC, pinning
//! service, SQLite wallet store, console transport) and runs the message
//! loop until Ctrl+C. Input lines become messages for the configured user;
//! a line of the form `@<path> [image|video|audio|document]` is delivered
//! as a file attachment.

mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use provenant_core::dispatch::Dispatcher;
use provenant_core::flow::{Engine, EngineConfig};
use provenant_core::rpc::{RetryPolicy, RetryRpcClient};
use provenant_core::session::SessionStore;
use provenant_core::watch::Watcher;
use provenant_infra::config::load_config;
use provenant_infra::evm::EvmLedger;
use provenant_infra::pin::PinningClient;
use provenant_infra::rpc_http::HttpLedgerTransport;
use provenant_infra::vault::CredentialVault;
use provenant_infra::wallet_store::SqliteWalletStore;
use provenant_types::address::Address;
use provenant_types::amount::parse_units;
use provenant_types::asset::AssetType;
use provenant_types::credential::Credential;
use provenant_types::message::{AttachmentRef, InboundMessage, UserId};

#[derive(Parser)]
#[command(name = "provenant", about = "Conversational asset-registry bot")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// User identity for console input.
    #[arg(long, default_value = "console")]
    user: String,

    /// Passphrase protecting the wallet store.
    #[arg(long, env = "PROVENANT_VAULT_PASSPHRASE", hide_env_values = true)]
    vault_passphrase: String,

    /// Operator signing key for funding transfers (64 hex chars).
    #[arg(long, env = "PROVENANT_OPERATOR_KEY", hide_env_values = true)]
    operator_key: String,
}

fn parse_operator_key(hex_key: &str) -> anyhow::Result<Credential> {
    let digits = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    let bytes = hex::decode(digits).context("operator key is not valid hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("operator key must be exactly 32 bytes"))?;
    Ok(Credential::from_bytes(bytes))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    provenant_observe::tracing_setup::init_tracing()
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let cli = Cli::parse();
    let config = load_config(&cli.config).await;

    let contract: Address = config
        .contract_address
        .parse()
        .context("contract_address is not a valid address")?;
    let operator = parse_operator_key(&cli.operator_key)?;

    let temp_dir = PathBuf::from(&config.temp_dir);
    tokio::fs::create_dir_all(&temp_dir)
        .await
        .context("failed to create temp dir")?;

    let vault = CredentialVault::from_passphrase(&cli.vault_passphrase)?;
    let wallets = Arc::new(
        SqliteWalletStore::open(Path::new(&config.database_path), vault)
            .await
            .context("failed to open wallet store")?,
    );

    let policy = RetryPolicy {
        read_attempts: config.read_attempts,
        backoff_base: Duration::from_secs(config.backoff_base_secs),
        poll_attempts: config.poll_attempts,
        poll_interval: Duration::from_secs(config.poll_interval_secs),
    };
    let rpc = HttpLedgerTransport::new(&config.rpc_url)?;
    let ledger = Arc::new(EvmLedger::new(
        RetryRpcClient::with_policy(rpc, policy),
        contract,
        config.chain_id,
        &operator,
    )?);

    let transport = Arc::new(console::ConsoleTransport);
    let uploader = Arc::new(PinningClient::new(&config.pinning)?);
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        config.session_idle_secs,
    )));

    let engine_cfg = EngineConfig {
        funding_threshold: parse_units(&config.funding_threshold)
            .context("bad funding_threshold")?,
        funding_amount: parse_units(&config.funding_amount).context("bad funding_amount")?,
        gateway_base: config.gateway_base.clone(),
        explorer_base: config.explorer_base.clone(),
        temp_dir: temp_dir.clone(),
    };
    let engine = Arc::new(Engine::new(
        ledger.clone(),
        transport.clone(),
        uploader,
        wallets.clone(),
        sessions.clone(),
        engine_cfg,
    ));

    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(engine, cancel.clone());

    let watcher = Watcher::new(
        ledger,
        transport,
        wallets,
        Duration::from_secs(config.watcher_interval_secs),
    );
    let watcher_task = tokio::spawn(watcher.run(cancel.clone()));

    // Expired sessions are also dropped lazily on access; the sweep just
    // bounds memory for users who never come back.
    let sweep_sessions = sessions.clone();
    let sweep_cancel = cancel.clone();
    let sweep_task = tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(config.session_idle_secs.max(60)));
        loop {
            tokio::select! {
                _ = sweep_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let swept = sweep_sessions.sweep_stale();
                    if swept > 0 {
                        info!(swept, "stale sessions discarded");
                    }
                }
            }
        }
    });

    info!(
        rpc_url = %config.rpc_url,
        chain_id = config.chain_id,
        "bot started, reading from stdin (/help for commands)"
    );

    let user = UserId::new(cli.user);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let Some(msg) = parse_line(&user, &line) else { continue };
                        dispatcher.dispatch(msg).await;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        }
    }

    info!("shutting down");
    cancel.cancel();
    let _ = watcher_task.await;
    let _ = sweep_task.await;
    Ok(())
}

/// Turn a console line into a message, or `None` for blank input.
fn parse_line(user: &UserId, line: &str) -> Option<InboundMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('@') {
        let mut parts = rest.split_whitespace();
        let path = parts.next()?;
        let kind = parts
            .next()
            .and_then(|k| k.parse::<AssetType>().ok())
            .unwrap_or(AssetType::Image);
        return Some(InboundMessage::with_attachment(
            user.clone(),
            AttachmentRef {
                file_ref: path.to_string(),
                kind,
            },
        ));
    }
    Some(InboundMessage::text(user.clone(), line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_text() {
        let user = UserId::new("u");
        let msg = parse_line(&user, "  /register  ").unwrap();
        assert_eq!(msg.trimmed(), "/register");
        assert!(msg.attachment.is_none());
    }

    #[test]
    fn test_parse_line_attachment() {
        let user = UserId::new("u");
        let msg = parse_line(&user, "@/tmp/art.png image").unwrap();
        let attachment = msg.attachment.unwrap();
        assert_eq!(attachment.file_ref, "/tmp/art.png");
        assert_eq!(attachment.kind, AssetType::Image);
    }

    #[test]
    fn test_parse_line_attachment_defaults_to_image() {
        let user = UserId::new("u");
        let msg = parse_line(&user, "@/tmp/art.bin").unwrap();
        assert_eq!(msg.attachment.unwrap().kind, AssetType::Image);
    }

    #[test]
    fn test_parse_line_blank() {
        let user = UserId::new("u");
        assert!(parse_line(&user, "   ").is_none());
    }

    #[test]
    fn test_operator_key_parsing() {
        let key = "0x".to_string() + &"46".repeat(32);
        let credential = parse_operator_key(&key).unwrap();
        assert_eq!(credential.expose(), &[0x46; 32]);

        assert!(parse_operator_key("nothex").is_err());
        assert!(parse_operator_key("0x1234").is_err());
    }
}
