//! Typed ledger contract as seen by the workflow engine.
//!
//! Every method either returns a decoded typed result or a classified
//! `LedgerFailure`; raw transport errors never cross this seam. Write
//! methods take the signing credential for the acting user. The concrete
//! implementation (`provenant-infra::evm::EvmLedger`) builds on the
//! retry-RPC client in [`crate::rpc`].

use std::fmt;

use primitive_types::U256;
use provenant_types::address::Address;
use provenant_types::asset::{Asset, AssetId, AssetType, ContentHash, HashVerification, License};
use provenant_types::credential::Credential;
use provenant_types::error::LedgerFailure;

/// Hash of a submitted transaction, for explorer links and receipts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read and write operations against the external asset registry.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait LedgerApi: Send + Sync {
    /// Register content under the caller's wallet. Returns the new asset id
    /// once the transaction confirms.
    fn register_asset(
        &self,
        credential: &Credential,
        hash: &ContentHash,
        kind: AssetType,
    ) -> impl std::future::Future<Output = Result<AssetId, LedgerFailure>> + Send;

    /// Fetch an asset record by id.
    fn get_asset(
        &self,
        id: AssetId,
    ) -> impl std::future::Future<Output = Result<Asset, LedgerFailure>> + Send;

    /// Look up whether a content hash is already registered.
    fn verify_by_hash(
        &self,
        hash: &ContentHash,
    ) -> impl std::future::Future<Output = Result<HashVerification, LedgerFailure>> + Send;

    /// Set license terms on an owned asset.
    fn set_license(
        &self,
        credential: &Credential,
        id: AssetId,
        license: &License,
    ) -> impl std::future::Future<Output = Result<TxHash, LedgerFailure>> + Send;

    /// Fetch the license record for an asset (all-zero when unset).
    fn get_license(
        &self,
        id: AssetId,
    ) -> impl std::future::Future<Output = Result<License, LedgerFailure>> + Send;

    /// Transfer an owned asset to another wallet.
    fn transfer_asset(
        &self,
        credential: &Credential,
        id: AssetId,
        to: Address,
    ) -> impl std::future::Future<Output = Result<TxHash, LedgerFailure>> + Send;

    /// Ids of all assets owned by an address.
    fn assets_by_owner(
        &self,
        owner: Address,
    ) -> impl std::future::Future<Output = Result<Vec<AssetId>, LedgerFailure>> + Send;

    /// Gas-token balance of an address, in base units.
    fn balance_of(
        &self,
        address: Address,
    ) -> impl std::future::Future<Output = Result<U256, LedgerFailure>> + Send;

    /// Total number of registered assets (ids are dense, 1-based).
    fn total_assets(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, LedgerFailure>> + Send;

    /// Send gas tokens from the operator wallet to a user wallet.
    fn fund(
        &self,
        to: Address,
        amount: U256,
    ) -> impl std::future::Future<Output = Result<TxHash, LedgerFailure>> + Send;
}
