//! Asset records and license terms as read from the external ledger.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Identifier of an asset record on the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed set of asset content types the registry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
    Audio,
    Document,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Image => "image",
            AssetType::Video => "video",
            AssetType::Audio => "audio",
            AssetType::Document => "document",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(AssetType::Image),
            "video" => Ok(AssetType::Video),
            "audio" => Ok(AssetType::Audio),
            "document" => Ok(AssetType::Document),
            other => Err(format!("unknown asset type '{other}'")),
        }
    }
}

/// A content hash as returned by the pinning service (base58, `Qm...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the hash looks like a canonical v0 content identifier:
    /// `Qm` followed by at least 44 base58 characters.
    pub fn is_canonical(&self) -> bool {
        let s = self.0.as_str();
        if !s.starts_with("Qm") || s.len() < 46 {
            return false;
        }
        s[2..].chars().all(|c| {
            c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
        })
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An asset record as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub owner: crate::address::Address,
    pub content_hash: ContentHash,
    pub asset_type: AssetType,
    /// Registration time, unix seconds as recorded by the ledger.
    pub registered_at: u64,
}

/// License terms attached to an asset.
///
/// A price of zero means no license has been set; the ledger stores an
/// all-zero record for unlicensed assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License price in base units (10^18 scale).
    pub price_wei: U256,
    /// Whether commercial use is permitted.
    pub commercial: bool,
    /// Royalty percentage on resales, 0..=100.
    pub royalty_percent: u8,
}

impl License {
    /// Whether license terms have actually been set.
    pub fn is_set(&self) -> bool {
        !self.price_wei.is_zero()
    }
}

/// Result of a verify-by-hash read call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashVerification {
    pub exists: bool,
    pub asset_id: AssetId,
    pub owner: crate::address::Address,
    pub registered_at: u64,
    pub asset_type: Option<AssetType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_roundtrip() {
        for t in [
            AssetType::Image,
            AssetType::Video,
            AssetType::Audio,
            AssetType::Document,
        ] {
            assert_eq!(t.as_str().parse::<AssetType>().unwrap(), t);
        }
    }

    #[test]
    fn test_asset_type_unknown() {
        assert!("archive".parse::<AssetType>().is_err());
    }

    #[test]
    fn test_content_hash_canonical() {
        let good = ContentHash::new("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
        assert!(good.is_canonical());

        let short = ContentHash::new("QmABC");
        assert!(!short.is_canonical());

        let bad_prefix = ContentHash::new("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi");
        assert!(!bad_prefix.is_canonical());

        // Base58 excludes 0, O, I, l.
        let bad_alphabet = ContentHash::new("Qm0wAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
        assert!(!bad_alphabet.is_canonical());
    }

    #[test]
    fn test_license_is_set() {
        let unset = License {
            price_wei: U256::zero(),
            commercial: false,
            royalty_percent: 0,
        };
        assert!(!unset.is_set());

        let set = License {
            price_wei: U256::exp10(17),
            commercial: true,
            royalty_percent: 10,
        };
        assert!(set.is_set());
    }

    #[test]
    fn test_asset_serde_roundtrip() {
        let asset = Asset {
            id: AssetId(7),
            owner: "0x52908400098527886e0f7030069857d2e4169ee7".parse().unwrap(),
            content_hash: ContentHash::new("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"),
            asset_type: AssetType::Image,
            registered_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&asset).unwrap();
        let parsed: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, asset);
    }
}
