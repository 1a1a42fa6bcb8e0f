//! BIP-32 private key derivation over secp256k1.

use crate::WalletError;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::ff::PrimeField;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, NonZeroScalar, Scalar, SecretKey};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

/// First account of the standard Ethereum BIP-44 tree.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

const HARDENED: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// Derive the child private key for this path from a BIP-39 seed.
    pub fn derive(&self, seed: &[u8]) -> Result<SecretKey, WalletError> {
        let master = hmac_sha512(b"Bitcoin seed", &[seed])?;
        let mut key = secret_from(&master[..32])?;
        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&master[32..]);

        for index in &self.0 {
            let index_bytes = index.to_be_bytes();
            let digest = if index & HARDENED != 0 {
                let mut secret_bytes = Zeroizing::new([0u8; 32]);
                secret_bytes.copy_from_slice(&key.to_bytes());
                hmac_sha512(&chain_code[..], &[&[0u8][..], &secret_bytes[..], &index_bytes[..]])?
            } else {
                let public = key.public_key().to_encoded_point(true);
                hmac_sha512(&chain_code[..], &[public.as_bytes(), &index_bytes[..]])?
            };

            let tweak: Option<Scalar> =
                Scalar::from_repr(*FieldBytes::from_slice(&digest[..32])).into();
            let tweak = tweak.ok_or_else(|| {
                WalletError::Derivation(format!("tweak out of range at index {index}"))
            })?;
            let child = tweak + *key.to_nonzero_scalar();
            let child: Option<NonZeroScalar> = NonZeroScalar::new(child).into();
            let child = child.ok_or_else(|| {
                WalletError::Derivation(format!("zero child key at index {index}"))
            })?;

            key = SecretKey::from(child);
            chain_code.copy_from_slice(&digest[32..]);
        }
        Ok(key)
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        DEFAULT_DERIVATION_PATH
            .parse()
            .unwrap_or_else(|_| DerivationPath(vec![44 | HARDENED, 60 | HARDENED, HARDENED, 0, 0]))
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WalletError::InvalidDerivationPath(s.to_owned());
        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(invalid());
        }
        let mut indices = Vec::new();
        for part in parts {
            let (digits, hardened) = match part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
            {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            let index: u32 = digits.parse().map_err(|_| invalid())?;
            if index >= HARDENED {
                return Err(invalid());
            }
            indices.push(if hardened { index | HARDENED } else { index });
        }
        Ok(DerivationPath(indices))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, WalletError> {
    let mut mac =
        HmacSha512::new_from_slice(key).map_err(|e| WalletError::Derivation(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn secret_from(bytes: &[u8]) -> Result<SecretKey, WalletError> {
    SecretKey::from_slice(bytes).map_err(|_| WalletError::Derivation("invalid master key".to_owned()))
}
