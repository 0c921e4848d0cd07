//! JSON-RPC 2.0 transport over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use provenant_core::rpc::{LedgerTransport, RpcError};
use serde_json::{Value, json};
use tracing::trace;

/// Per-request timeout. Submissions and reads alike; receipt polling has
/// its own bound above this layer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP JSON-RPC client for a single ledger node endpoint.
pub struct HttpLedgerTransport {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpLedgerTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Network(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }
}

impl LedgerTransport for HttpLedgerTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else {
                    RpcError::Network(e.to_string())
                }
            })?;
        if !response.status().is_success() {
            return Err(RpcError::Network(format!(
                "http status {}",
                response.status()
            )));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;
        if let Some(error) = envelope.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error");
            // Some nodes put the revert reason only in error.data.
            let detail = error
                .get("data")
                .and_then(Value::as_str)
                .map(|d| format!("{message}: {d}"))
                .unwrap_or_else(|| message.to_string());
            return Err(RpcError::Ledger(detail));
        }
        match envelope.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(RpcError::Malformed("response without result".to_string())),
        }
    }
}
