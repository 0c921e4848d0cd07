//! Concrete I/O collaborators for Provenant.
//!
//! Implements the traits declared in `provenant-core`: the JSON-RPC HTTP
//! transport, the EVM calldata codec and transaction signer behind the
//! ledger API, the pinning-service uploader, and the SQLite wallet store
//! with its credential vault.

pub mod config;
pub mod evm;
pub mod pin;
pub mod rpc_http;
pub mod vault;
pub mod wallet_store;
