//! Legacy (pre-typed) transaction encoding and signing.
//!
//! RLP-encodes the nine-field legacy transaction with the EIP-155 replay
//! protection scheme: the signing digest covers
//! `(nonce, gasPrice, gas, to, value, data, chainId, 0, 0)`, and the final
//! `v` is `chainId * 2 + 35 + recoveryId`.

use k256::ecdsa::SigningKey;
use primitive_types::U256;
use provenant_core::rpc::TxParams;
use provenant_types::address::Address;
use provenant_types::error::LedgerFailure;
use sha3::{Digest, Keccak256};

/// RLP-encode a byte string item.
fn rlp_bytes(out: &mut Vec<u8>, data: &[u8]) {
    if data.len() == 1 && data[0] < 0x80 {
        out.push(data[0]);
    } else if data.len() <= 55 {
        out.push(0x80 + data.len() as u8);
        out.extend_from_slice(data);
    } else {
        let len_bytes = minimal_be(U256::from(data.len()));
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
    }
}

/// RLP-encode an unsigned integer item (minimal big-endian, empty for zero).
fn rlp_uint(out: &mut Vec<u8>, value: U256) {
    rlp_bytes(out, &minimal_be(value));
}

/// Wrap already-encoded payload items into an RLP list.
fn rlp_list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    if payload.len() <= 55 {
        out.push(0xc0 + payload.len() as u8);
    } else {
        let len_bytes = minimal_be(U256::from(payload.len()));
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(payload);
    out
}

/// Big-endian bytes with leading zeros stripped; empty for zero.
fn minimal_be(value: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first = buf.iter().position(|&b| b != 0).unwrap_or(32);
    buf[first..].to_vec()
}

/// The six payload fields shared by the signing digest and the final tx.
fn body_payload(tx: &TxParams) -> Vec<u8> {
    let mut payload = Vec::new();
    rlp_uint(&mut payload, U256::from(tx.nonce));
    rlp_uint(&mut payload, tx.gas_price);
    rlp_uint(&mut payload, U256::from(tx.gas_limit));
    rlp_bytes(&mut payload, tx.to.as_bytes());
    rlp_uint(&mut payload, tx.value);
    rlp_bytes(&mut payload, &tx.data);
    payload
}

/// Sign a prepared transaction, returning the raw bytes for
/// `eth_sendRawTransaction`.
pub fn sign_legacy(
    tx: &TxParams,
    chain_id: u64,
    key: &SigningKey,
) -> Result<Vec<u8>, LedgerFailure> {
    let mut unsigned = body_payload(tx);
    rlp_uint(&mut unsigned, U256::from(chain_id));
    rlp_uint(&mut unsigned, U256::zero());
    rlp_uint(&mut unsigned, U256::zero());
    let digest = Keccak256::digest(rlp_list(&unsigned));

    // Error detail deliberately carries no key or payload material.
    let (signature, recovery) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|_| LedgerFailure::Unknown("transaction signing failed".to_string()))?;

    let v = chain_id * 2 + 35 + u64::from(recovery.to_byte());
    let mut signed = body_payload(tx);
    rlp_uint(&mut signed, U256::from(v));
    rlp_uint(&mut signed, U256::from_big_endian(&signature.r().to_bytes()));
    rlp_uint(&mut signed, U256::from_big_endian(&signature.s().to_bytes()));
    Ok(rlp_list(&signed))
}

/// The 20-byte address controlled by a signing key: the last 20 bytes of
/// the keccak-256 of the uncompressed public key.
pub fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::from_bytes(bytes)
}
