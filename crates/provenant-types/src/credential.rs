//! Signing credentials and wallet records.
//!
//! A `Credential` wraps the raw signing key for a user's wallet. Its Debug
//! and Display output never contain key material; code that actually signs
//! must call `expose()`.

use std::fmt;

use crate::address::Address;

/// An opaque 32-byte signing credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential([u8; 32]);

impl Credential {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Access the raw key material. Only signing code should call this.
    pub fn expose(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(\"***\")")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// A user's wallet as resolved from the wallet store: the public address
/// plus the decrypted signing credential.
#[derive(Debug, Clone)]
pub struct WalletRecord {
    pub address: Address,
    pub credential: Credential,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_key() {
        let cred = Credential::from_bytes([0xab; 32]);
        let debug = format!("{cred:?}");
        assert!(!debug.contains("ab"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_credential_display_hides_key() {
        let cred = Credential::from_bytes([0xab; 32]);
        assert_eq!(cred.to_string(), "***");
    }

    #[test]
    fn test_credential_expose() {
        let cred = Credential::from_bytes([7; 32]);
        assert_eq!(cred.expose(), &[7; 32]);
    }
}
