//! Session/workflow core for Provenant.
//!
//! This crate holds the engine proper: the per-user session store, the
//! conversational workflow state machines, the retry-RPC client that
//! talks to the ledger, the per-user message dispatcher, and the balance
//! watcher. All I/O goes through the
//! collaborator traits (`Transport`, `Uploader`, `WalletStore`,
//! `LedgerTransport`); concrete implementations live in `provenant-infra`.

pub mod dispatch;
pub mod flow;
pub mod ledger;
pub mod rpc;
pub mod session;
pub mod transport;
pub mod upload;
pub mod wallet;
pub mod watch;
