use crate::hash::keccak256;
use crate::{strip_0x, CodecError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte Ethereum account address.
///
/// Parsing accepts bare or `0x`-prefixed hex. All-lowercase and all-uppercase
/// inputs are taken as-is; mixed case must carry a valid EIP-55 checksum.
/// Display and serialization always produce the checksummed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address of an uncompressed secp256k1 public key (64 bytes, no `0x04` tag).
    pub fn from_public_key(uncompressed: &[u8]) -> Result<Self, CodecError> {
        if uncompressed.len() != 64 {
            return Err(CodecError::InvalidAddress(format!(
                "public key must be 64 bytes, got {}",
                uncompressed.len()
            )));
        }
        let digest = keccak256(uncompressed);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case checksum encoding, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = strip_0x(s.trim());
        if body.len() != 40 {
            return Err(CodecError::InvalidAddress(format!(
                "'{s}' is not 20 bytes of hex"
            )));
        }
        let bytes =
            hex::decode(body).map_err(|e| CodecError::InvalidAddress(format!("'{s}': {e}")))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        let address = Self(out);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *body {
            return Err(CodecError::ChecksumMismatch(s.to_owned()));
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
