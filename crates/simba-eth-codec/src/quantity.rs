use crate::{strip_0x, CodecError};
use primitive_types::U256;
use serde_json::Value;

/// Parse a JSON quantity: an unsigned integer, a `0x` hex string or a
/// decimal string.
pub fn parse_quantity(value: &Value) -> Result<U256, CodecError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| CodecError::InvalidQuantity(n.to_string())),
        Value::String(s) => parse_quantity_str(s),
        other => Err(CodecError::InvalidQuantity(other.to_string())),
    }
}

pub fn parse_quantity_str(s: &str) -> Result<U256, CodecError> {
    let trimmed = s.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        let digits = strip_0x(trimmed);
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        if digits.len() > 64 {
            return Err(CodecError::InvalidQuantity(s.to_owned()));
        }
        U256::from_str_radix(digits, 16).map_err(|_| CodecError::InvalidQuantity(s.to_owned()))
    } else {
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::InvalidQuantity(s.to_owned()));
        }
        U256::from_dec_str(trimmed).map_err(|_| CodecError::InvalidQuantity(s.to_owned()))
    }
}

/// Big-endian bytes with leading zeros removed; zero encodes as empty.
pub fn to_minimal_be_bytes(value: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first = buf.iter().position(|b| *b != 0).unwrap_or(32);
    buf[first..].to_vec()
}

pub fn to_be_word(value: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}
