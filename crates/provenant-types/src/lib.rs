//! Shared domain types for Provenant.
//!
//! This crate contains the core domain types used across the Provenant
//! workflow engine: addresses, assets, licenses, sessions, message
//! contracts, credentials, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror,
//! hex, and primitive-types.

pub mod address;
pub mod amount;
pub mod asset;
pub mod config;
pub mod credential;
pub mod error;
pub mod message;
pub mod session;
