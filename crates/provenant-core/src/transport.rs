//! Message-transport collaborator contract.
//!
//! The core never talks to a chat network directly; it sends outbound
//! messages and fetches attachments through this trait.
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use std::path::{Path, PathBuf};

use provenant_types::error::TransportError;
use provenant_types::message::OutboundMessage;

/// Outbound side of the message transport.
///
/// Implementations live outside the core (console adapter in
/// `provenant-bot`, mocks in tests).
pub trait Transport: Send + Sync {
    /// Deliver one message to its user.
    fn send(
        &self,
        msg: OutboundMessage,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Download an attachment into `dest_dir`, returning the local path.
    fn fetch_attachment(
        &self,
        file_ref: &str,
        dest_dir: &Path,
    ) -> impl std::future::Future<Output = Result<PathBuf, TransportError>> + Send;
}
