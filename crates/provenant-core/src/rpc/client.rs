//! Retrying JSON-RPC client for the external ledger.
//!
//! Reads retry transient transport failures with exponential backoff;
//! ledger-logic and decode errors return immediately. Writes resolve nonce
//! and gas, sign through a [`TxSigner`], submit, and poll for a receipt up
//! to a bound, with writes from the same credential serialized so nonces
//! stay correct.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use primitive_types::U256;
use provenant_types::address::Address;
use provenant_types::error::LedgerFailure;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{LedgerTransport, RpcError, TxParams, TxSigner, classify, data_bytes, quantity_u256, quantity_u64};
use crate::ledger::TxHash;

/// Retry and polling bounds for the client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per read call.
    pub read_attempts: u32,
    /// Backoff between read retries, scaled by the attempt index.
    pub backoff_base: Duration,
    /// Receipt polls per write call.
    pub poll_attempts: u32,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            backoff_base: Duration::from_secs(1),
            poll_attempts: 60,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Ledger RPC client with uniform retry, polling, and classification.
pub struct RetryRpcClient<T> {
    transport: T,
    policy: RetryPolicy,
    /// Per-sender write locks; nonce correctness requires that writes from
    /// one credential never overlap.
    write_locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl<T: LedgerTransport> RetryRpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            write_locks: DashMap::new(),
        }
    }

    /// Execute a read call, retrying transient transport failures only.
    ///
    /// Reads are unordered; callers may run any number concurrently.
    pub async fn read(&self, method: &str, params: Value) -> Result<Value, LedgerFailure> {
        let mut attempt = 1u32;
        loop {
            match self.transport.call(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let transient = matches!(err, RpcError::Timeout | RpcError::Network(_));
                    if !transient || attempt >= self.policy.read_attempts {
                        return Err(classify(err));
                    }
                    warn!(
                        method,
                        attempt,
                        max = self.policy.read_attempts,
                        error = %err,
                        "read call failed, backing off"
                    );
                    tokio::time::sleep(self.policy.backoff_base * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Read-only contract call (`eth_call`), returning the raw return data.
    pub async fn call_contract(
        &self,
        to: Address,
        data: &[u8],
    ) -> Result<Vec<u8>, LedgerFailure> {
        let params = json!([
            { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
            "latest",
        ]);
        let result = self.read("eth_call", params).await?;
        data_bytes(&result).map_err(classify)
    }

    /// Submit a state-changing call and wait for its receipt.
    ///
    /// Resolves nonce and gas parameters for the signer, signs, submits the
    /// raw transaction, then polls for inclusion. Exceeding the polling
    /// bound yields `Timeout` -- the transaction may still land, and the
    /// caller should advise an out-of-band status check. A reverted receipt
    /// yields `Rejected`.
    pub async fn submit_write<S: TxSigner>(
        &self,
        signer: &S,
        to: Address,
        value: U256,
        data: &[u8],
    ) -> Result<TxHash, LedgerFailure> {
        let sender = signer.address();
        let lock = self.write_locks.entry(sender).or_default().clone();
        let _serialized = lock.lock().await;

        let nonce = quantity_u64(
            &self
                .read(
                    "eth_getTransactionCount",
                    json!([sender.to_string(), "latest"]),
                )
                .await?,
        )
        .map_err(classify)?;

        let gas_price = quantity_u256(&self.read("eth_gasPrice", json!([])).await?)
            .map_err(classify)?;

        let mut call = json!({
            "from": sender.to_string(),
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        if !value.is_zero() {
            call["value"] = json!(format!("0x{value:x}"));
        }
        let estimated = quantity_u64(&self.read("eth_estimateGas", json!([call])).await?)
            .map_err(classify)?;
        // 2x the estimate so marginal state changes between estimate and
        // inclusion don't run the call out of gas.
        let gas_limit = estimated.saturating_mul(2);

        let raw = signer.sign(&TxParams {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data: data.to_vec(),
        })?;

        let tx_hash = self
            .read(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        let tx_hash = tx_hash
            .as_str()
            .ok_or_else(|| LedgerFailure::Unknown(format!("bad tx hash: {tx_hash}")))?
            .to_string();
        debug!(%sender, tx_hash, "transaction submitted, polling for receipt");

        self.wait_for_receipt(&tx_hash).await
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxHash, LedgerFailure> {
        for attempt in 0..self.policy.poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.policy.poll_interval).await;
            }
            let receipt = match self
                .transport
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await
            {
                Ok(value) => value,
                // Keep polling through transient hiccups; the bound caps us.
                Err(err) if matches!(err, RpcError::Timeout | RpcError::Network(_)) => {
                    warn!(tx_hash, error = %err, "receipt poll failed, continuing");
                    continue;
                }
                Err(err) => return Err(classify(err)),
            };
            if receipt.is_null() {
                continue;
            }
            let status = receipt.get("status").and_then(Value::as_str);
            return match status {
                Some("0x1") => {
                    debug!(tx_hash, "transaction confirmed");
                    Ok(TxHash(tx_hash.to_string()))
                }
                Some("0x0") => Err(LedgerFailure::Rejected(
                    "transaction reverted on-chain".to_string(),
                )),
                _ => Err(LedgerFailure::Unknown(format!(
                    "receipt without status for {tx_hash}"
                ))),
            };
        }
        warn!(tx_hash, "receipt polling bound exceeded");
        Err(LedgerFailure::Timeout)
    }
}

impl<T> std::fmt::Debug for RetryRpcClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryRpcClient")
            .field("policy", &self.policy)
            .field("active_senders", &self.write_locks.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            read_attempts: 3,
            backoff_base: Duration::from_millis(10),
            poll_attempts: 5,
            poll_interval: Duration::from_millis(10),
        }
    }

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    /// Transport that replays a scripted sequence of responses and records
    /// every call made against it.
    struct ScriptedTransport {
        script: StdMutex<VecDeque<Result<Value, RpcError>>>,
        calls: StdMutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Value, RpcError>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl LedgerTransport for ScriptedTransport {
        async fn call(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
            self.calls.lock().unwrap().push(method.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    /// Signer that emits a fixed payload and records what it was asked to
    /// sign.
    struct RecordingSigner {
        address: Address,
        signed: StdMutex<Vec<TxParams>>,
    }

    impl RecordingSigner {
        fn new(address: Address) -> Self {
            Self {
                address,
                signed: StdMutex::new(Vec::new()),
            }
        }
    }

    impl TxSigner for RecordingSigner {
        fn address(&self) -> Address {
            self.address
        }

        fn sign(&self, tx: &TxParams) -> Result<Vec<u8>, LedgerFailure> {
            self.signed.lock().unwrap().push(tx.clone());
            Ok(vec![0xde, 0xad])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn read_retries_transient_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(RpcError::Network("refused".into())),
            Err(RpcError::Timeout),
            Ok(json!("0x1")),
        ]);
        let client = RetryRpcClient::with_policy(transport, test_policy());

        let value = client.read("eth_blockNumber", json!([])).await.unwrap();
        assert_eq!(value, json!("0x1"));
        assert_eq!(client.transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn read_gives_up_after_bound() {
        let transport = ScriptedTransport::new(vec![
            Err(RpcError::Network("refused".into())),
            Err(RpcError::Network("refused".into())),
            Err(RpcError::Network("refused".into())),
        ]);
        let client = RetryRpcClient::with_policy(transport, test_policy());

        let err = client.read("eth_blockNumber", json!([])).await.unwrap_err();
        assert!(matches!(err, LedgerFailure::Network(_)));
        assert_eq!(client.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn read_does_not_retry_ledger_errors() {
        let transport = ScriptedTransport::new(vec![Err(RpcError::Ledger(
            "execution reverted: Asset does not exist".into(),
        ))]);
        let client = RetryRpcClient::with_policy(transport, test_policy());

        let err = client.read("eth_call", json!([])).await.unwrap_err();
        assert_eq!(err, LedgerFailure::NotFound);
        assert_eq!(client.transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_write_happy_path_doubles_gas_estimate() {
        let transport = ScriptedTransport::new(vec![
            Ok(json!("0x5")),       // nonce
            Ok(json!("0x3b9aca00")), // gas price (1 gwei)
            Ok(json!("0x5208")),    // estimate (21000)
            Ok(json!("0xabc123")),  // tx hash
            Ok(Value::Null),        // first poll, not mined yet
            Ok(json!({ "status": "0x1", "blockNumber": "0x10" })),
        ]);
        let client = RetryRpcClient::with_policy(transport, test_policy());
        let signer = RecordingSigner::new(addr(0x11));

        let hash = client
            .submit_write(&signer, addr(0x22), U256::zero(), &[0x01, 0x02])
            .await
            .unwrap();
        assert_eq!(hash.0, "0xabc123");

        let signed = signer.signed.lock().unwrap();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].nonce, 5);
        assert_eq!(signed[0].gas_limit, 21_000 * 2);
        assert_eq!(signed[0].gas_price, U256::from(1_000_000_000u64));
        assert_eq!(signed[0].to, addr(0x22));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_write_reverted_receipt_is_rejected() {
        let transport = ScriptedTransport::new(vec![
            Ok(json!("0x0")),
            Ok(json!("0x1")),
            Ok(json!("0x5208")),
            Ok(json!("0xdead")),
            Ok(json!({ "status": "0x0" })),
        ]);
        let client = RetryRpcClient::with_policy(transport, test_policy());
        let signer = RecordingSigner::new(addr(0x11));

        let err = client
            .submit_write(&signer, addr(0x22), U256::zero(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerFailure::Rejected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_write_times_out_after_poll_bound() {
        let mut script = vec![
            Ok(json!("0x0")),
            Ok(json!("0x1")),
            Ok(json!("0x5208")),
            Ok(json!("0xdead")),
        ];
        // Never mined within the 5-poll bound.
        script.extend((0..5).map(|_| Ok(Value::Null)));
        let transport = ScriptedTransport::new(script);
        let client = RetryRpcClient::with_policy(transport, test_policy());
        let signer = RecordingSigner::new(addr(0x11));

        let err = client
            .submit_write(&signer, addr(0x22), U256::zero(), &[])
            .await
            .unwrap_err();
        assert_eq!(err, LedgerFailure::Timeout);
    }

    /// Transport whose nonce answer only advances when a receipt has been
    /// served, so interleaved writes would observe a stale nonce.
    struct CountingTransport {
        confirmed: AtomicU64,
        calls: StdMutex<Vec<String>>,
    }

    impl LedgerTransport for CountingTransport {
        async fn call(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
            self.calls.lock().unwrap().push(method.to_string());
            match method {
                "eth_getTransactionCount" => {
                    Ok(json!(format!("0x{:x}", self.confirmed.load(Ordering::SeqCst))))
                }
                "eth_gasPrice" => Ok(json!("0x1")),
                "eth_estimateGas" => Ok(json!("0x5208")),
                "eth_sendRawTransaction" => Ok(json!("0xfeed")),
                "eth_getTransactionReceipt" => {
                    self.confirmed.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "status": "0x1" }))
                }
                other => panic!("unexpected method {other}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn writes_from_same_signer_are_serialized() {
        let client = Arc::new(RetryRpcClient::with_policy(
            CountingTransport {
                confirmed: AtomicU64::new(0),
                calls: StdMutex::new(Vec::new()),
            },
            test_policy(),
        ));
        let signer = Arc::new(RecordingSigner::new(addr(0x11)));

        let a = {
            let (client, signer) = (Arc::clone(&client), Arc::clone(&signer));
            tokio::spawn(async move {
                client
                    .submit_write(&*signer, addr(0x22), U256::zero(), &[])
                    .await
            })
        };
        let b = {
            let (client, signer) = (Arc::clone(&client), Arc::clone(&signer));
            tokio::spawn(async move {
                client
                    .submit_write(&*signer, addr(0x22), U256::zero(), &[])
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Serialized writes observe sequential nonces.
        let signed = signer.signed.lock().unwrap();
        let mut nonces: Vec<u64> = signed.iter().map(|tx| tx.nonce).collect();
        nonces.sort_unstable();
        assert_eq!(nonces, vec![0, 1]);

        // And the second write's nonce fetch happens after the first
        // write's receipt.
        let calls = client.transport.calls.lock().unwrap();
        let first_receipt = calls
            .iter()
            .position(|m| m == "eth_getTransactionReceipt")
            .unwrap();
        let second_nonce = calls
            .iter()
            .rposition(|m| m == "eth_getTransactionCount")
            .unwrap();
        assert!(second_nonce > first_receipt);
    }
}
