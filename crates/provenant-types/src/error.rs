//! Error taxonomy for the workflow engine and its collaborators.
//!
//! `LedgerFailure` is the classification surfaced by the retry-RPC client;
//! the workflow engine maps each variant to a user-facing message and never
//! lets a raw transport error escape to the end user.

use thiserror::Error;

/// Classified failure from a ledger read or write call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerFailure {
    /// The sending wallet cannot cover gas for the call.
    #[error("insufficient funds for gas")]
    InsufficientFunds,

    /// Unique-constraint violation (content hash already registered).
    #[error("duplicate: already registered")]
    Duplicate,

    /// The referenced record does not exist on the ledger.
    #[error("not found")]
    NotFound,

    /// The ledger rejected the call because the sender is not the owner.
    #[error("unauthorized: sender is not the owner")]
    Unauthorized,

    /// Submission confirmed neither way within the polling bound.
    #[error("timed out waiting for confirmation")]
    Timeout,

    /// Transport-level failure (connection, DNS, HTTP).
    #[error("network error: {0}")]
    Network(String),

    /// The ledger explicitly rejected the transaction.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Anything that could not be classified.
    #[error("unknown ledger error: {0}")]
    Unknown(String),
}

impl LedgerFailure {
    /// Whether the retry-RPC client may retry a read that failed this way.
    /// Only transient transport failures are retryable; ledger-logic and
    /// decode failures are returned immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerFailure::Network(_) | LedgerFailure::Timeout)
    }
}

/// Recoverable validation failure: the user's input was malformed for the
/// current step. The session stays in place and the same state is
/// re-prompted with the contained corrective message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FlowReject {
    pub message: String,
}

impl FlowReject {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from the file-pinning collaborator.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload transport error: {0}")]
    Http(String),

    #[error("pinning service rejected the upload: {0}")]
    Service(String),

    #[error("file error: {0}")]
    Io(String),
}

/// Errors from the wallet/key store collaborator.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet has been provisioned for this user.
    #[error("wallet not provisioned")]
    NotProvisioned,

    #[error("wallet storage error: {0}")]
    Storage(String),

    /// Encryption or decryption of the credential failed. Never carries
    /// key material.
    #[error("credential crypto error")]
    Crypto,
}

/// Errors from the message transport adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to send message: {0}")]
    Send(String),

    #[error("failed to fetch attachment: {0}")]
    Fetch(String),
}
