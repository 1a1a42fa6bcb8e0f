//! Ethereum encodings shared by the libsimba-eth crates.
//!
//! This crate is the data layer: EIP-55 addresses (`Address`), keccak helpers
//! (`keccak_hash`, `string_to_uint256`), the bytes32 string packing used by
//! SIMBA contract arguments, JSON quantity parsing, RLP for transaction
//! serialization, and Solidity ABI encoding (standard and packed).

pub mod abi;
pub mod address;
pub mod bytes32;
pub mod hash;
pub mod quantity;
pub mod rlp;
pub mod types;

pub use abi::{
    encode, encode_function_call, encode_packed, function_selector, function_signature,
    ParamType,
};
pub use address::Address;
pub use bytes32::{convert_bytes32_to_string, convert_to_bytes32_array};
pub use hash::{keccak256, keccak_hash, string_to_uint256};
pub use primitive_types::U256;
pub use quantity::{parse_quantity, to_minimal_be_bytes};
pub use rlp::RlpItem;
pub use types::{ContractId, DeploymentId, DesignId, TxnId};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("address checksum mismatch: {0}")]
    ChecksumMismatch(String),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("unsupported ABI type: {0}")]
    UnsupportedType(String),
    #[error("invalid value for {ty}: {value}")]
    InvalidValue { ty: String, value: String },
    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("invalid UTF-8 in decoded bytes: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode a hex string with or without a `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, CodecError> {
    let stripped = strip_0x(input);
    hex::decode(stripped).map_err(|e| CodecError::InvalidHex(format!("'{input}': {e}")))
}

/// Strip an optional `0x` / `0X` prefix.
pub fn strip_0x(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
