//! Wallet/key-store collaborator contract.
//!
//! Maps a stable user identity to a wallet address and signing credential.
//! The credential is decrypted by the store and handed over as an opaque
//! secret; the core never sees ciphertext or key-encryption details.

use provenant_types::address::Address;
use provenant_types::credential::WalletRecord;
use provenant_types::error::WalletError;
use provenant_types::message::UserId;

/// Persistent user-wallet store.
///
/// Implementations live in `provenant-infra` (SQLite-backed).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WalletStore: Send + Sync {
    /// Resolve the wallet for a user, or `WalletError::NotProvisioned`.
    fn resolve(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<WalletRecord, WalletError>> + Send;

    /// Create and persist a wallet for a first-time user. Returns the
    /// existing record if the user is already provisioned.
    fn provision(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<WalletRecord, WalletError>> + Send;

    /// Read-only user-to-address view, for the balance watcher. Never
    /// includes credentials.
    fn all_addresses(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<(UserId, Address)>, WalletError>> + Send;
}
