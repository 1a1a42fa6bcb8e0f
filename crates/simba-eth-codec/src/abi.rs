//! Solidity ABI encoding of JSON values.
//!
//! Values arrive as `serde_json::Value` because workflow arguments and
//! contract metadata are JSON documents. Integers may be JSON numbers, decimal
//! strings or `0x` hex strings; byte values are hex strings.

use crate::address::Address;
use crate::hash::keccak256;
use crate::quantity::{parse_quantity_str, to_be_word};
use crate::{decode_hex, CodecError};
use primitive_types::U256;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
}

/// Largest inline size, in bytes, of a static fixed array.
pub const MAX_INLINE_SIZE: usize = 1 << 20;

impl ParamType {
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            _ => false,
        }
    }

    /// Size of the head slot: 32 for dynamic types, the full inline size otherwise.
    ///
    /// `None` when a static fixed array is too large to encode.
    fn head_size(&self) -> Option<usize> {
        match self {
            ParamType::FixedArray(inner, len) if !inner.is_dynamic() => inner
                .head_size()?
                .checked_mul(*len)
                .filter(|size| *size <= MAX_INLINE_SIZE),
            _ => Some(32),
        }
    }
}

impl FromStr for ParamType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unsupported = || CodecError::UnsupportedType(s.to_owned());

        if let Some(inner) = s.strip_suffix(']') {
            let open = inner.rfind('[').ok_or_else(unsupported)?;
            let element: ParamType = inner[..open].parse()?;
            let size = &inner[open + 1..];
            return if size.is_empty() {
                Ok(ParamType::Array(Box::new(element)))
            } else {
                let len = size.parse::<usize>().map_err(|_| unsupported())?;
                if len == 0 {
                    return Err(unsupported());
                }
                let ty = ParamType::FixedArray(Box::new(element), len);
                ty.head_size().ok_or_else(unsupported)?;
                Ok(ty)
            };
        }

        match s {
            "address" => return Ok(ParamType::Address),
            "bool" => return Ok(ParamType::Bool),
            "string" => return Ok(ParamType::String),
            "bytes" => return Ok(ParamType::Bytes),
            "uint" => return Ok(ParamType::Uint(256)),
            "int" => return Ok(ParamType::Int(256)),
            _ => {}
        }

        let sized = |digits: &str| -> Option<usize> { digits.parse::<usize>().ok() };
        if let Some(bits) = s.strip_prefix("uint").and_then(sized) {
            if bits > 0 && bits <= 256 && bits % 8 == 0 {
                return Ok(ParamType::Uint(bits));
            }
        } else if let Some(bits) = s.strip_prefix("int").and_then(sized) {
            if bits > 0 && bits <= 256 && bits % 8 == 0 {
                return Ok(ParamType::Int(bits));
            }
        } else if let Some(len) = s.strip_prefix("bytes").and_then(sized) {
            if (1..=32).contains(&len) {
                return Ok(ParamType::FixedBytes(len));
            }
        }
        Err(unsupported())
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => f.write_str("address"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Uint(bits) => write!(f, "uint{bits}"),
            ParamType::Int(bits) => write!(f, "int{bits}"),
            ParamType::FixedBytes(len) => write!(f, "bytes{len}"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::String => f.write_str("string"),
            ParamType::Array(inner) => write!(f, "{inner}[]"),
            ParamType::FixedArray(inner, len) => write!(f, "{inner}[{len}]"),
        }
    }
}

/// Canonical signature, e.g. `transfer(address,uint256)`.
pub fn function_signature(name: &str, types: &[ParamType]) -> String {
    let params: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("{name}({})", params.join(","))
}

pub fn function_selector(name: &str, types: &[ParamType]) -> [u8; 4] {
    let digest = keccak256(function_signature(name, types).as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Selector followed by the head/tail encoded arguments.
pub fn encode_function_call(
    name: &str,
    types: &[ParamType],
    values: &[Value],
) -> Result<Vec<u8>, CodecError> {
    let mut out = function_selector(name, types).to_vec();
    out.extend(encode(types, values)?);
    Ok(out)
}

/// Standard ABI encoding of a parameter list.
pub fn encode(types: &[ParamType], values: &[Value]) -> Result<Vec<u8>, CodecError> {
    if types.len() != values.len() {
        return Err(CodecError::ArgumentCount {
            expected: types.len(),
            actual: values.len(),
        });
    }
    let pairs: Vec<(&ParamType, &Value)> = types.iter().zip(values).collect();
    encode_sequence(&pairs)
}

fn encode_sequence(pairs: &[(&ParamType, &Value)]) -> Result<Vec<u8>, CodecError> {
    let head_len = pairs.iter().try_fold(0usize, |total, (ty, _)| {
        ty.head_size()
            .and_then(|size| total.checked_add(size))
            .ok_or_else(|| CodecError::UnsupportedType(ty.to_string()))
    })?;
    let mut head = Vec::with_capacity(pairs.len() * 32);
    let mut tail = Vec::new();
    for (ty, value) in pairs {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend(to_be_word(U256::from(head_len + tail.len())));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }
    head.extend(tail);
    Ok(head)
}

fn encode_value(ty: &ParamType, value: &Value) -> Result<Vec<u8>, CodecError> {
    match ty {
        ParamType::Address => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(parse_address(ty, value)?.as_bytes());
            Ok(word.to_vec())
        }
        ParamType::Bool => Ok(to_be_word(U256::from(u8::from(parse_bool(ty, value)?))).to_vec()),
        ParamType::Uint(bits) => Ok(to_be_word(parse_uint(ty, *bits, value)?).to_vec()),
        ParamType::Int(bits) => Ok(to_be_word(parse_int(ty, *bits, value)?).to_vec()),
        ParamType::FixedBytes(len) => {
            let bytes = parse_fixed_bytes(ty, *len, value)?;
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(word.to_vec())
        }
        ParamType::Bytes => Ok(encode_dynamic_bytes(&parse_bytes(ty, value)?)),
        ParamType::String => Ok(encode_dynamic_bytes(parse_string(ty, value)?.as_bytes())),
        ParamType::Array(inner) => {
            let items = parse_array(ty, value, None)?;
            let pairs: Vec<(&ParamType, &Value)> =
                items.iter().map(|item| (inner.as_ref(), item)).collect();
            let mut out = to_be_word(U256::from(items.len())).to_vec();
            out.extend(encode_sequence(&pairs)?);
            Ok(out)
        }
        ParamType::FixedArray(inner, len) => {
            let items = parse_array(ty, value, Some(*len))?;
            let pairs: Vec<(&ParamType, &Value)> =
                items.iter().map(|item| (inner.as_ref(), item)).collect();
            encode_sequence(&pairs)
        }
    }
}

fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = to_be_word(U256::from(data.len())).to_vec();
    out.extend_from_slice(data);
    let padding = (32 - data.len() % 32) % 32;
    out.resize(out.len() + padding, 0);
    out
}

/// Solidity `abi.encodePacked` of `(type, value)` pairs.
///
/// Static scalars use their natural width, strings and bytes are inlined
/// without a length, and array elements are padded to 32 bytes.
pub fn encode_packed(types: &[ParamType], values: &[Value]) -> Result<Vec<u8>, CodecError> {
    if types.len() != values.len() {
        return Err(CodecError::ArgumentCount {
            expected: types.len(),
            actual: values.len(),
        });
    }
    let mut out = Vec::new();
    for (ty, value) in types.iter().zip(values) {
        match ty {
            ParamType::Address => out.extend_from_slice(parse_address(ty, value)?.as_bytes()),
            ParamType::Bool => out.push(u8::from(parse_bool(ty, value)?)),
            ParamType::Uint(bits) => {
                let word = to_be_word(parse_uint(ty, *bits, value)?);
                out.extend_from_slice(&word[32 - bits / 8..]);
            }
            ParamType::Int(bits) => {
                let word = to_be_word(parse_int(ty, *bits, value)?);
                out.extend_from_slice(&word[32 - bits / 8..]);
            }
            ParamType::FixedBytes(len) => out.extend(parse_fixed_bytes(ty, *len, value)?),
            ParamType::Bytes => out.extend(parse_bytes(ty, value)?),
            ParamType::String => out.extend_from_slice(parse_string(ty, value)?.as_bytes()),
            ParamType::Array(inner) | ParamType::FixedArray(inner, _) => {
                if inner.is_dynamic() {
                    return Err(CodecError::UnsupportedType(format!("packed {ty}")));
                }
                let expected = match ty {
                    ParamType::FixedArray(_, len) => Some(*len),
                    _ => None,
                };
                for item in parse_array(ty, value, expected)? {
                    out.extend(encode_value(inner, item)?);
                }
            }
        }
    }
    Ok(out)
}

fn invalid(ty: &ParamType, value: &Value) -> CodecError {
    CodecError::InvalidValue {
        ty: ty.to_string(),
        value: value.to_string(),
    }
}

fn parse_address(ty: &ParamType, value: &Value) -> Result<Address, CodecError> {
    value
        .as_str()
        .and_then(|s| Address::from_str(s).ok())
        .ok_or_else(|| invalid(ty, value))
}

fn parse_bool(ty: &ParamType, value: &Value) -> Result<bool, CodecError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(invalid(ty, value)),
    }
}

fn parse_uint(ty: &ParamType, bits: usize, value: &Value) -> Result<U256, CodecError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => parse_quantity_str(s).ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(ty, value))?;
    if parsed.bits() > bits {
        return Err(invalid(ty, value));
    }
    Ok(parsed)
}

/// Two's complement 256-bit word for a signed value of `bits` width.
fn parse_int(ty: &ParamType, bits: usize, value: &Value) -> Result<U256, CodecError> {
    let (negative, magnitude) = match value {
        Value::Number(n) => {
            let v = n.as_i64().ok_or_else(|| invalid(ty, value))?;
            (v < 0, U256::from(v.unsigned_abs()))
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let (negative, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, trimmed),
            };
            let magnitude = parse_quantity_str(digits).map_err(|_| invalid(ty, value))?;
            (negative, magnitude)
        }
        _ => return Err(invalid(ty, value)),
    };

    let limit = U256::one() << (bits - 1);
    let in_range = if negative {
        magnitude <= limit
    } else {
        magnitude < limit
    };
    if !in_range {
        return Err(invalid(ty, value));
    }
    if negative && !magnitude.is_zero() {
        Ok((!magnitude).overflowing_add(U256::one()).0)
    } else {
        Ok(magnitude)
    }
}

fn parse_fixed_bytes(ty: &ParamType, len: usize, value: &Value) -> Result<Vec<u8>, CodecError> {
    let bytes = value
        .as_str()
        .and_then(|s| decode_hex(s).ok())
        .ok_or_else(|| invalid(ty, value))?;
    if bytes.len() > len {
        return Err(invalid(ty, value));
    }
    let mut padded = bytes;
    padded.resize(len, 0);
    Ok(padded)
}

fn parse_bytes(ty: &ParamType, value: &Value) -> Result<Vec<u8>, CodecError> {
    value
        .as_str()
        .and_then(|s| decode_hex(s).ok())
        .ok_or_else(|| invalid(ty, value))
}

fn parse_string<'a>(ty: &ParamType, value: &'a Value) -> Result<&'a str, CodecError> {
    value.as_str().ok_or_else(|| invalid(ty, value))
}

fn parse_array<'a>(
    ty: &ParamType,
    value: &'a Value,
    expected: Option<usize>,
) -> Result<&'a Vec<Value>, CodecError> {
    let items = value.as_array().ok_or_else(|| invalid(ty, value))?;
    if let Some(len) = expected {
        if items.len() != len {
            return Err(invalid(ty, value));
        }
    }
    Ok(items)
}
