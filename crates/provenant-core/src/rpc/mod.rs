//! Retry-aware RPC layer between the typed ledger API and the wire.
//!
//! The core owns retries, backoff, receipt polling, failure classification,
//! and per-credential write serialization. Wire encoding and signing are
//! collaborator concerns behind [`LedgerTransport`] and [`TxSigner`].

mod client;

pub use client::{RetryPolicy, RetryRpcClient};

use primitive_types::U256;
use provenant_types::address::Address;
use provenant_types::error::LedgerFailure;
use thiserror::Error;

/// A raw JSON-RPC failure as reported by the transport, before
/// classification.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The request did not complete in time.
    #[error("rpc request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, reset).
    #[error("rpc network error: {0}")]
    Network(String),

    /// The node answered with an error object (including reverts).
    #[error("ledger error: {0}")]
    Ledger(String),

    /// The response payload did not have the expected shape.
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

/// One JSON-RPC request/response exchange with the ledger node.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait LedgerTransport: Send + Sync {
    fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, RpcError>> + Send;
}

/// Parameters of a transaction prepared by the retry client, handed to the
/// signer for encoding.
#[derive(Debug, Clone)]
pub struct TxParams {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Recipient: the registry contract, or a wallet for plain transfers.
    pub to: Address,
    /// Value attached to the call, in base units.
    pub value: U256,
    /// Contract call data; empty for plain transfers.
    pub data: Vec<u8>,
}

/// Signs prepared transactions on behalf of one credential.
///
/// Wire encoding lives with the implementation (`provenant-infra::evm`);
/// the core only needs the sender address and the signed raw bytes.
pub trait TxSigner: Send + Sync {
    fn address(&self) -> Address;

    fn sign(&self, tx: &TxParams) -> Result<Vec<u8>, LedgerFailure>;
}

/// Classify a raw RPC failure into the taxonomy the engine understands.
///
/// Provider and revert messages are matched case-insensitively on
/// substrings, the same fragments the registry contract and common nodes
/// emit. Anything unmatched stays `Unknown` so no failure is silently
/// reinterpreted.
pub fn classify(err: RpcError) -> LedgerFailure {
    match err {
        RpcError::Timeout => LedgerFailure::Timeout,
        RpcError::Network(msg) => LedgerFailure::Network(msg),
        RpcError::Malformed(msg) => LedgerFailure::Unknown(msg),
        RpcError::Ledger(msg) => classify_message(&msg),
    }
}

fn classify_message(msg: &str) -> LedgerFailure {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("insufficient funds") {
        LedgerFailure::InsufficientFunds
    } else if lower.contains("already registered") || lower.contains("duplicate") {
        LedgerFailure::Duplicate
    } else if lower.contains("not found") || lower.contains("does not exist") {
        LedgerFailure::NotFound
    } else if lower.contains("not the owner")
        || lower.contains("not owner")
        || lower.contains("unauthorized")
    {
        LedgerFailure::Unauthorized
    } else if lower.contains("revert") {
        LedgerFailure::Rejected(msg.to_string())
    } else {
        LedgerFailure::Unknown(msg.to_string())
    }
}

/// Parse a JSON-RPC quantity (`"0x..."` hex string) into a u64.
pub(crate) fn quantity_u64(value: &serde_json::Value) -> Result<u64, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("expected quantity, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("bad quantity '{s}': {e}")))
}

/// Parse a JSON-RPC quantity into a U256.
pub(crate) fn quantity_u256(value: &serde_json::Value) -> Result<U256, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("expected quantity, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("bad quantity '{s}': {e}")))
}

/// Parse JSON-RPC unformatted data (`"0x..."`) into bytes.
pub(crate) fn data_bytes(value: &serde_json::Value) -> Result<Vec<u8>, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("expected data, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| RpcError::Malformed(format!("bad data '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_insufficient_funds() {
        let err = RpcError::Ledger("insufficient funds for gas * price + value".into());
        assert_eq!(classify(err), LedgerFailure::InsufficientFunds);
    }

    #[test]
    fn test_classify_duplicate() {
        let err = RpcError::Ledger("execution reverted: Asset already registered".into());
        assert_eq!(classify(err), LedgerFailure::Duplicate);
    }

    #[test]
    fn test_classify_not_found() {
        let err = RpcError::Ledger("execution reverted: Asset does not exist".into());
        assert_eq!(classify(err), LedgerFailure::NotFound);
    }

    #[test]
    fn test_classify_unauthorized() {
        let err = RpcError::Ledger("execution reverted: Not the owner".into());
        assert_eq!(classify(err), LedgerFailure::Unauthorized);
    }

    #[test]
    fn test_classify_plain_revert() {
        let err = RpcError::Ledger("execution reverted".into());
        assert!(matches!(classify(err), LedgerFailure::Rejected(_)));
    }

    #[test]
    fn test_classify_unknown_passthrough() {
        let err = RpcError::Ledger("replacement transaction underpriced".into());
        assert!(matches!(classify(err), LedgerFailure::Unknown(_)));
    }

    #[test]
    fn test_classify_transport_errors() {
        assert_eq!(classify(RpcError::Timeout), LedgerFailure::Timeout);
        assert_eq!(
            classify(RpcError::Network("connection refused".into())),
            LedgerFailure::Network("connection refused".into())
        );
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(quantity_u64(&json!("0x10")).unwrap(), 16);
        assert_eq!(quantity_u64(&json!("0x0")).unwrap(), 0);
        assert!(quantity_u64(&json!(16)).is_err());
        assert_eq!(
            quantity_u256(&json!("0xde0b6b3a7640000")).unwrap(),
            U256::exp10(18)
        );
    }

    #[test]
    fn test_data_bytes() {
        assert_eq!(data_bytes(&json!("0x0102")).unwrap(), vec![1, 2]);
        assert!(data_bytes(&json!("0xzz")).is_err());
    }
}
