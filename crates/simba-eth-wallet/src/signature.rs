use crate::WalletError;
use simba_eth_codec::quantity::to_be_word;
use simba_eth_codec::{decode_hex, to_hex_prefixed, U256};

/// An ECDSA signature with its Ethereum `v` value.
///
/// `v` is whatever the signing context calls for: 27/28 for messages,
/// EIP-155 encoded for legacy transactions, the bare y-parity for typed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: U256,
    pub s: U256,
    pub v: u64,
}

impl Signature {
    /// 65 bytes `r || s || v`, with `v` truncated to one byte.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&to_be_word(self.r));
        out[32..64].copy_from_slice(&to_be_word(self.s));
        out[64] = self.v as u8;
        out
    }

    pub fn to_hex(&self) -> String {
        to_hex_prefixed(&self.to_bytes())
    }

    pub fn from_hex(input: &str) -> Result<Self, WalletError> {
        let bytes = decode_hex(input)?;
        if bytes.len() != 65 {
            return Err(WalletError::Signing(format!(
                "signature must be 65 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            r: U256::from_big_endian(&bytes[..32]),
            s: U256::from_big_endian(&bytes[32..64]),
            v: u64::from(bytes[64]),
        })
    }

    /// Recovery id (0 or 1) for a message-style `v`.
    pub fn recovery_id(&self) -> Result<u8, WalletError> {
        match self.v {
            0 | 1 => Ok(self.v as u8),
            27 | 28 => Ok((self.v - 27) as u8),
            other => Err(WalletError::Signing(format!("unsupported v value {other}"))),
        }
    }
}
