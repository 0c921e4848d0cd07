//! Console transport adapter.
//!
//! Stands in for a chat network during local operation: outbound messages
//! are printed to stdout, and attachment references are plain filesystem
//! paths that get copied into the engine's temp directory.

use std::path::{Path, PathBuf};

use provenant_core::transport::Transport;
use provenant_types::error::TransportError;
use provenant_types::message::OutboundMessage;

pub struct ConsoleTransport;

impl Transport for ConsoleTransport {
    async fn send(&self, msg: OutboundMessage) -> Result<(), TransportError> {
        println!("[{}]", msg.user);
        println!("{}", msg.text);
        if let Some(media) = &msg.media {
            println!("({}: {})", media.kind, media.url);
        }
        println!();
        Ok(())
    }

    async fn fetch_attachment(
        &self,
        file_ref: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransportError> {
        let source = Path::new(file_ref);
        let name = source
            .file_name()
            .ok_or_else(|| TransportError::Fetch(format!("not a file path: {file_ref}")))?;
        let dest = dest_dir.join(name);
        tokio::fs::copy(source, &dest)
            .await
            .map_err(|e| TransportError::Fetch(format!("{file_ref}: {e}")))?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_copies_into_dest() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("art.png");
        tokio::fs::write(&src, b"pixels").await.unwrap();

        let transport = ConsoleTransport;
        let fetched = transport
            .fetch_attachment(&src.display().to_string(), dest_dir.path())
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&fetched).await.unwrap(), b"pixels");
        assert!(fetched.starts_with(dest_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_fetch_error() {
        let dest_dir = TempDir::new().unwrap();
        let transport = ConsoleTransport;
        let err = transport
            .fetch_attachment("/no/such/file.png", dest_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Fetch(_)));
    }
}
