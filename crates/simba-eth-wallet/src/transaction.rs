//! Transaction payload parsing and serialization.
//!
//! Payloads use the JSON field names of the Ethereum JSON-RPC spec
//! (`chainId`, `gasPrice`, `maxFeePerGas`, ...). Quantities may be numbers,
//! hex or decimal strings.

use crate::signature::Signature;
use crate::WalletError;
use serde::Serialize;
use serde_json::{Map, Value};
use simba_eth_codec::{
    decode_hex, keccak256, parse_quantity, Address, RlpItem, U256,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Legacy,
    AccessList,
    DynamicFee,
}

impl TransactionKind {
    fn type_byte(self) -> Option<u8> {
        match self {
            TransactionKind::Legacy => None,
            TransactionKind::AccessList => Some(0x01),
            TransactionKind::DynamicFee => Some(0x02),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub kind: TransactionKind,
    pub chain_id: Option<u64>,
    pub nonce: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessListEntry>,
}

/// Largest chain id whose EIP-155 `v` (`chain_id * 2 + 36`) fits in a `u64`.
pub const MAX_CHAIN_ID: u64 = (u64::MAX - 36) / 2;

/// Result of signing a transaction, shaped like the platform expects it.
///
/// `r` and `s` serialize as decimal strings, not JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub hash: String,
    #[serde(rename = "rawTransaction")]
    pub raw_transaction: String,
    #[serde(serialize_with = "serialize_decimal")]
    pub r: U256,
    #[serde(serialize_with = "serialize_decimal")]
    pub s: U256,
    pub v: u64,
}

fn serialize_decimal<S: serde::Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

impl UnsignedTransaction {
    /// Build a transaction from its JSON description.
    ///
    /// `to` is checked first so a payload with no recipient reports that field.
    pub fn from_json(payload: &Value) -> Result<Self, WalletError> {
        let fields = payload
            .as_object()
            .ok_or_else(|| WalletError::InvalidFields("transaction must be an object".to_owned()))?;

        let to = parse_to(fields)?;
        let kind = detect_kind(fields)?;

        let chain_id = match fields.get("chainId") {
            None | Some(Value::Null) => None,
            Some(v) => match quantity_u64(v, "chainId")? {
                id if id <= MAX_CHAIN_ID => Some(id),
                _ => return Err(WalletError::InvalidFields("chainId".to_owned())),
            },
        };
        if chain_id.is_none() && kind != TransactionKind::Legacy {
            return Err(WalletError::MissingField("chainId".to_owned()));
        }

        let nonce = quantity(required(fields, "nonce")?, "nonce")?;
        let gas = quantity(required(fields, "gas")?, "gas")?;
        let value = optional_quantity(fields, "value")?.unwrap_or_default();
        let data = match fields.get("data").or_else(|| fields.get("input")) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => {
                decode_hex(s).map_err(|_| WalletError::InvalidFields("data".to_owned()))?
            }
            Some(_) => return Err(WalletError::InvalidFields("data".to_owned())),
        };

        let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = match kind {
            TransactionKind::DynamicFee => (
                None,
                Some(quantity(required(fields, "maxFeePerGas")?, "maxFeePerGas")?),
                Some(quantity(
                    required(fields, "maxPriorityFeePerGas")?,
                    "maxPriorityFeePerGas",
                )?),
            ),
            _ => (
                Some(quantity(required(fields, "gasPrice")?, "gasPrice")?),
                None,
                None,
            ),
        };

        let access_list = match fields.get("accessList") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => parse_access_list(v)?,
        };
        if kind == TransactionKind::Legacy && !access_list.is_empty() {
            return Err(WalletError::InvalidFields("accessList".to_owned()));
        }

        Ok(Self {
            kind,
            chain_id,
            nonce,
            gas,
            gas_price,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            to,
            value,
            data,
            access_list,
        })
    }

    fn to_item(&self) -> RlpItem {
        match self.to {
            Some(address) => RlpItem::bytes(address.as_bytes().to_vec()),
            None => RlpItem::bytes(Vec::new()),
        }
    }

    fn access_list_item(&self) -> RlpItem {
        RlpItem::List(
            self.access_list
                .iter()
                .map(|entry| {
                    RlpItem::List(vec![
                        RlpItem::bytes(entry.address.as_bytes().to_vec()),
                        RlpItem::List(
                            entry
                                .storage_keys
                                .iter()
                                .map(|key| RlpItem::bytes(key.to_vec()))
                                .collect(),
                        ),
                    ])
                })
                .collect(),
        )
    }

    /// Fields common to every serialization, before any signature values.
    fn payload_fields(&self) -> Vec<RlpItem> {
        let gas_price = self.gas_price.unwrap_or_default();
        match self.kind {
            TransactionKind::Legacy => vec![
                RlpItem::uint(self.nonce),
                RlpItem::uint(gas_price),
                RlpItem::uint(self.gas),
                self.to_item(),
                RlpItem::uint(self.value),
                RlpItem::bytes(self.data.clone()),
            ],
            TransactionKind::AccessList => vec![
                RlpItem::u64(self.chain_id.unwrap_or_default()),
                RlpItem::uint(self.nonce),
                RlpItem::uint(gas_price),
                RlpItem::uint(self.gas),
                self.to_item(),
                RlpItem::uint(self.value),
                RlpItem::bytes(self.data.clone()),
                self.access_list_item(),
            ],
            TransactionKind::DynamicFee => vec![
                RlpItem::u64(self.chain_id.unwrap_or_default()),
                RlpItem::uint(self.nonce),
                RlpItem::uint(self.max_priority_fee_per_gas.unwrap_or_default()),
                RlpItem::uint(self.max_fee_per_gas.unwrap_or_default()),
                RlpItem::uint(self.gas),
                self.to_item(),
                RlpItem::uint(self.value),
                RlpItem::bytes(self.data.clone()),
                self.access_list_item(),
            ],
        }
    }

    /// The digest that gets signed (EIP-155 for legacy with a chain id).
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut fields = self.payload_fields();
        if self.kind == TransactionKind::Legacy {
            if let Some(chain_id) = self.chain_id {
                fields.push(RlpItem::u64(chain_id));
                fields.push(RlpItem::u64(0));
                fields.push(RlpItem::u64(0));
            }
        }
        keccak256(self.envelope(RlpItem::List(fields)))
    }

    /// The `v` value stored in the signed transaction for a recovery id.
    pub fn signature_v(&self, recovery_id: u8) -> u64 {
        let parity = u64::from(recovery_id);
        match (self.kind, self.chain_id) {
            (TransactionKind::Legacy, Some(chain_id)) => parity + 35 + chain_id * 2,
            (TransactionKind::Legacy, None) => parity + 27,
            _ => parity,
        }
    }

    /// Raw signed bytes plus their hash.
    pub fn encode_signed(&self, signature: &Signature) -> SignedTransaction {
        let mut fields = self.payload_fields();
        fields.push(RlpItem::u64(signature.v));
        fields.push(RlpItem::uint(signature.r));
        fields.push(RlpItem::uint(signature.s));
        let raw = self.envelope(RlpItem::List(fields));
        SignedTransaction {
            hash: simba_eth_codec::to_hex_prefixed(&keccak256(&raw)),
            raw_transaction: simba_eth_codec::to_hex_prefixed(&raw),
            r: signature.r,
            s: signature.s,
            v: signature.v,
        }
    }

    fn envelope(&self, list: RlpItem) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(type_byte) = self.kind.type_byte() {
            out.push(type_byte);
        }
        out.extend(list.encode());
        out
    }
}

fn required<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value, WalletError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(WalletError::MissingField(name.to_owned())),
        Some(v) => Ok(v),
    }
}

fn quantity(value: &Value, name: &str) -> Result<U256, WalletError> {
    parse_quantity(value).map_err(|_| WalletError::InvalidFields(name.to_owned()))
}

fn optional_quantity(fields: &Map<String, Value>, name: &str) -> Result<Option<U256>, WalletError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => quantity(v, name).map(Some),
    }
}

fn quantity_u64(value: &Value, name: &str) -> Result<u64, WalletError> {
    let parsed = quantity(value, name)?;
    if parsed > U256::from(u64::MAX) {
        return Err(WalletError::InvalidFields(name.to_owned()));
    }
    Ok(parsed.low_u64())
}

fn parse_to(fields: &Map<String, Value>) -> Result<Option<Address>, WalletError> {
    match fields.get("to") {
        None => Err(WalletError::MissingField("to".to_owned())),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() || s == "0x" => Ok(None),
        Some(Value::String(s)) => s
            .parse::<Address>()
            .map(Some)
            .map_err(|e| WalletError::InvalidFields(format!("to ({e})"))),
        Some(_) => Err(WalletError::InvalidFields("to".to_owned())),
    }
}

fn detect_kind(fields: &Map<String, Value>) -> Result<TransactionKind, WalletError> {
    if let Some(ty) = fields.get("type").filter(|v| !v.is_null()) {
        return match quantity_u64(ty, "type")? {
            0 => Ok(TransactionKind::Legacy),
            1 => Ok(TransactionKind::AccessList),
            2 => Ok(TransactionKind::DynamicFee),
            _ => Err(WalletError::InvalidFields("type".to_owned())),
        };
    }
    let has = |name: &str| fields.get(name).is_some_and(|v| !v.is_null());
    if has("maxFeePerGas") || has("maxPriorityFeePerGas") {
        if has("gasPrice") {
            return Err(WalletError::InvalidFields("gasPrice".to_owned()));
        }
        Ok(TransactionKind::DynamicFee)
    } else if has("accessList") {
        Ok(TransactionKind::AccessList)
    } else {
        Ok(TransactionKind::Legacy)
    }
}

fn parse_access_list(value: &Value) -> Result<Vec<AccessListEntry>, WalletError> {
    let invalid = || WalletError::InvalidFields("accessList".to_owned());
    let entries = value.as_array().ok_or_else(invalid)?;
    entries
        .iter()
        .map(|entry| {
            let address = entry
                .get("address")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Address>().ok())
                .ok_or_else(invalid)?;
            let keys = match entry.get("storageKeys") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(keys)) => keys
                    .iter()
                    .map(|k| {
                        let bytes = k.as_str().and_then(|s| decode_hex(s).ok()).ok_or_else(invalid)?;
                        <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| invalid())
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(invalid()),
            };
            Ok(AccessListEntry {
                address,
                storage_keys: keys,
            })
        })
        .collect()
}
