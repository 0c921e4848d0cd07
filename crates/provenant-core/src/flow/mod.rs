//! Conversational workflow state machines.
//!
//! One state machine per workflow kind, all driven by [`Engine`]. Each
//! machine consumes one inbound message at a time: validate, accumulate a
//! field, advance (or re-prompt on bad input), and on the final step submit
//! exactly one write call through the ledger API. The cancel token works in
//! every state.

mod engine;
mod input;
mod license;
mod query;
mod register;
mod transfer;
mod verify;

pub use engine::Engine;

use std::path::PathBuf;

use primitive_types::U256;
use provenant_types::error::LedgerFailure;

/// Recognized command tokens. Accepted with or without a leading slash,
/// case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Provision a wallet for a first-time user.
    Start,
    Register,
    License,
    Transfer,
    Verify,
    Balance,
    MyAssets,
    AssetsByAddress,
    /// Universal cancel token, honored in every state.
    Cancel,
    Help,
}

/// Parse a message as a command token, if it is one.
pub fn parse_command(text: &str) -> Option<Command> {
    let token = text.trim().trim_start_matches('/').to_ascii_lowercase();
    match token.as_str() {
        "start" => Some(Command::Start),
        "register" => Some(Command::Register),
        "license" => Some(Command::License),
        "transfer" => Some(Command::Transfer),
        "verify" => Some(Command::Verify),
        "balance" => Some(Command::Balance),
        "my-assets" | "myassets" => Some(Command::MyAssets),
        "assets-by-address" | "assetsbyaddress" => Some(Command::AssetsByAddress),
        "cancel" => Some(Command::Cancel),
        "help" => Some(Command::Help),
        _ => None,
    }
}

/// Engine tunables resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Gas balance below which a wallet is auto-funded before registration.
    pub funding_threshold: U256,
    /// Amount sent from the operator wallet when auto-funding.
    pub funding_amount: U256,
    /// Base URL for content links, e.g. `https://ipfs.io/ipfs`.
    pub gateway_base: String,
    /// Base URL for transaction links on the ledger explorer.
    pub explorer_base: String,
    /// Directory for attachment downloads awaiting upload.
    pub temp_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // 0.001 and 0.01 at the 10^18 scale.
            funding_threshold: U256::exp10(15),
            funding_amount: U256::exp10(16),
            gateway_base: "https://ipfs.io/ipfs".to_string(),
            explorer_base: "https://explorer.example/tx".to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// User-facing text for a classified ledger failure, with the suggested
/// remedy. Raw transport detail never reaches the user.
pub(crate) fn failure_text(failure: &LedgerFailure) -> String {
    match failure {
        LedgerFailure::InsufficientFunds => {
            "Your wallet cannot cover the network fee. Check /balance and try again.".to_string()
        }
        LedgerFailure::Duplicate => {
            "This content is already registered on the ledger.".to_string()
        }
        LedgerFailure::NotFound => "Nothing with that identifier exists on the ledger.".to_string(),
        LedgerFailure::Unauthorized => "You are not the owner of this asset.".to_string(),
        LedgerFailure::Timeout => {
            "The request was submitted but not confirmed in time. It may still go through; \
             please check the status again in a minute."
                .to_string()
        }
        LedgerFailure::Network(_) => {
            "The ledger is unreachable right now. Please try again later.".to_string()
        }
        LedgerFailure::Rejected(_) => "The ledger rejected the request.".to_string(),
        LedgerFailure::Unknown(_) => {
            "Something went wrong talking to the ledger. Please try again.".to_string()
        }
    }
}

pub(crate) const HELP_TEXT: &str = "Available commands:\n\
    /start - create your wallet\n\
    /register - register a new asset (send a file)\n\
    /license - set license terms on an asset you own\n\
    /transfer - transfer an asset you own\n\
    /verify - verify an asset by content hash or id\n\
    /balance - show your wallet balance\n\
    /my-assets - list assets you own\n\
    /assets-by-address - list assets owned by any address\n\
    /cancel - cancel the current operation";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_with_and_without_slash() {
        assert_eq!(parse_command("/register"), Some(Command::Register));
        assert_eq!(parse_command("register"), Some(Command::Register));
        assert_eq!(parse_command("  /CANCEL  "), Some(Command::Cancel));
    }

    #[test]
    fn test_parse_command_aliases() {
        assert_eq!(parse_command("/my-assets"), Some(Command::MyAssets));
        assert_eq!(parse_command("/myassets"), Some(Command::MyAssets));
        assert_eq!(
            parse_command("assets-by-address"),
            Some(Command::AssetsByAddress)
        );
    }

    #[test]
    fn test_parse_command_rejects_plain_text() {
        assert_eq!(parse_command("7"), None);
        assert_eq!(parse_command("0.5"), None);
        assert_eq!(parse_command("yes"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_failure_text_never_echoes_raw_detail() {
        let text = failure_text(&LedgerFailure::Network(
            "dns error: no record for node.internal:8545".to_string(),
        ));
        assert!(!text.contains("node.internal"));
        let text = failure_text(&LedgerFailure::Unknown(
            "rlp: expected input list".to_string(),
        ));
        assert!(!text.contains("rlp"));
    }
}
