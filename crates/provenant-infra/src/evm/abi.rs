//! Minimal contract ABI codec: 32-byte words, head/tail layout for
//! dynamic values. Covers exactly the types the registry contract uses
//! (uint256, address, bool, string, uint256[]).

use primitive_types::U256;
use provenant_types::address::Address;
use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("return data truncated")]
    Truncated,

    #[error("invalid {0} encoding")]
    Invalid(&'static str),
}

/// First four bytes of the keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&digest[..4]);
    sel
}

/// An encodable argument value.
#[derive(Debug, Clone)]
pub enum Token {
    Uint(U256),
    Address(Address),
    Bool(bool),
    Str(String),
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn address_word(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Encode a full call: selector followed by head/tail argument data.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut heads = Vec::with_capacity(head_len);
    let mut tail: Vec<u8> = Vec::new();

    for arg in args {
        match arg {
            Token::Uint(v) => heads.extend_from_slice(&uint_word(*v)),
            Token::Address(a) => heads.extend_from_slice(&address_word(*a)),
            Token::Bool(b) => heads.extend_from_slice(&uint_word(U256::from(*b as u8))),
            Token::Str(s) => {
                // Head holds the tail offset, relative to the start of the
                // argument area.
                heads.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&uint_word(U256::from(s.len())));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat_n(0u8, pad));
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head_len + tail.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&heads);
    out.extend_from_slice(&tail);
    out
}

/// Sequential reader over ABI-encoded return data.
///
/// Head slots are consumed in order; dynamic values follow their offset
/// word into the tail.
pub struct Decoder<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    fn head_word(&mut self) -> Result<&'a [u8], AbiError> {
        let word = self.word_at(self.cursor)?;
        self.cursor += WORD;
        Ok(word)
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        self.data
            .get(offset..offset + WORD)
            .ok_or(AbiError::Truncated)
    }

    pub fn uint(&mut self) -> Result<U256, AbiError> {
        Ok(U256::from_big_endian(self.head_word()?))
    }

    pub fn uint_u64(&mut self) -> Result<u64, AbiError> {
        let value = self.uint()?;
        if value > U256::from(u64::MAX) {
            return Err(AbiError::Invalid("u64"));
        }
        Ok(value.as_u64())
    }

    pub fn address(&mut self) -> Result<Address, AbiError> {
        let word = self.head_word()?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address::from_bytes(bytes))
    }

    pub fn bool(&mut self) -> Result<bool, AbiError> {
        let word = self.head_word()?;
        match word[WORD - 1] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(AbiError::Invalid("bool")),
        }
    }

    pub fn string(&mut self) -> Result<String, AbiError> {
        let offset = self.dyn_offset()?;
        let len = self.length_at(offset)?;
        let bytes = self
            .data
            .get(offset + WORD..offset + WORD + len)
            .ok_or(AbiError::Truncated)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::Invalid("utf8 string"))
    }

    pub fn uint_array(&mut self) -> Result<Vec<U256>, AbiError> {
        let offset = self.dyn_offset()?;
        let len = self.length_at(offset)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let word = self.word_at(offset + WORD + i * WORD)?;
            out.push(U256::from_big_endian(word));
        }
        Ok(out)
    }

    fn dyn_offset(&mut self) -> Result<usize, AbiError> {
        let offset = self.uint()?;
        if offset > U256::from(self.data.len()) {
            return Err(AbiError::Invalid("offset"));
        }
        Ok(offset.as_usize())
    }

    fn length_at(&self, offset: usize) -> Result<usize, AbiError> {
        let len = U256::from_big_endian(self.word_at(offset)?);
        if len > U256::from(self.data.len()) {
            return Err(AbiError::Invalid("length"));
        }
        Ok(len.as_usize())
    }
}
