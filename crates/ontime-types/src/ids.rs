//! Participant and instance identities.
//!
//! An [`Address`] is the last 20 bytes of the Keccak-256 hash of an
//! uncompressed secp256k1 public key. The all-zero address is reserved as
//! the "no identity" sentinel produced by failed signature recovery.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::OntimeError;

/// Length of an [`Address`] in bytes.
pub const ADDRESS_LEN: usize = 20;

/// 20-byte participant (or instance) identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The invalid sentinel identity.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from an arbitrary slice, validating its length.
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        let arr: [u8; ADDRESS_LEN] =
            bytes
                .try_into()
                .map_err(|_| OntimeError::InvalidAddress {
                    reason: format!("expected {ADDRESS_LEN} bytes, got {}", bytes.len()),
                })?;
        Ok(Self(arr))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = OntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| OntimeError::InvalidAddress {
            reason: format!("{s}: {e}"),
        })?;
        Self::from_slice(&bytes)
    }
}

// Addresses serialize as 0x-prefixed hex so config files stay readable.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
