//! Pinning-service uploader.
//!
//! Streams a local file to a pinata-style `pinFileToIPFS` endpoint as
//! multipart form data and returns the content hash from the JSON reply.

use std::path::Path;

use provenant_core::upload::Uploader;
use provenant_types::asset::ContentHash;
use provenant_types::config::PinningConfig;
use provenant_types::error::UploadError;
use serde::Deserialize;
use tracing::debug;

/// HTTP client for the content pinning service.
pub struct PinningClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinningClient {
    pub fn new(config: &PinningConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| UploadError::Http(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }
}

impl Uploader for PinningClient {
    async fn upload(&self, path: &Path) -> Result<ContentHash, UploadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Io(e.to_string()))?;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.http.post(&self.endpoint).multipart(form);
        if let (Some(key), Some(secret)) = (&self.api_key, &self.api_secret) {
            request = request
                .header("pinata_api_key", key)
                .header("pinata_secret_api_key", secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Service(format!("{status}: {body}")));
        }

        let parsed: PinResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Service(format!("bad pin response: {e}")))?;
        debug!(size, hash = %parsed.ipfs_hash, "file pinned");
        Ok(ContentHash::new(parsed.ipfs_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_response_shape() {
        let parsed: PinResponse = serde_json::from_str(
            r#"{"IpfsHash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","PinSize":1234,"Timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.ipfs_hash,
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let client = PinningClient::new(&PinningConfig::default()).unwrap();
        let err = client
            .upload(Path::new("/definitely/not/a/file.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
