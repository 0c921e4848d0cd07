//! File-pinning collaborator contract.

use std::path::Path;

use provenant_types::asset::ContentHash;
use provenant_types::error::UploadError;

/// Uploads a local file to the pinning service and returns its content hash.
///
/// Implementations live in `provenant-infra`.
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait Uploader: Send + Sync {
    fn upload(
        &self,
        path: &Path,
    ) -> impl std::future::Future<Output = Result<ContentHash, UploadError>> + Send;
}
