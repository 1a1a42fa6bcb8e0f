//! Key management and signing for libsimba-eth.
//!
//! `Account` wraps a single secp256k1 private key; `HdWallet` loads one from a
//! BIP-39 mnemonic (derived along a BIP-32 path, `m/44'/60'/0'/0/0` by
//! default) or from a raw key. Both implement `Signer`, which signs legacy,
//! EIP-2930 and EIP-1559 transactions given as JSON, EIP-191 personal
//! messages, and packed Solidity values.

pub mod account;
pub mod derivation;
pub mod hdwallet;
pub mod signature;
pub mod transaction;

pub use account::{recover_message_signer, Account};
pub use derivation::{DerivationPath, DEFAULT_DERIVATION_PATH};
pub use hdwallet::{HdWallet, LoadedWallet};
pub use signature::Signature;
pub use simba_eth_codec::Address;
pub use transaction::{SignedTransaction, TransactionKind, UnsignedTransaction, MAX_CHAIN_ID};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("No wallet loaded!")]
    NoWallet,
    #[error("Invalid mnemonic words: {0}")]
    InvalidMnemonic(String),
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid derivation path '{0}'")]
    InvalidDerivationPath(String),
    #[error("key derivation failed: {0}")]
    Derivation(String),
    #[error("Missing field in transaction: '{0}'")]
    MissingField(String),
    #[error("Transaction had invalid fields: {0}")]
    InvalidFields(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("codec error: {0}")]
    Codec(#[from] simba_eth_codec::CodecError),
}

impl WalletError {
    /// True for failures raised while building or signing a payload, as
    /// opposed to wallet loading.
    pub fn is_signing_error(&self) -> bool {
        matches!(
            self,
            WalletError::MissingField(_)
                | WalletError::InvalidFields(_)
                | WalletError::Signing(_)
                | WalletError::Codec(_)
        )
    }
}

/// Anything that can sign on behalf of an Ethereum address.
pub trait Signer {
    fn address(&self) -> Result<Address, WalletError>;

    /// Sign a transaction described as a JSON object.
    fn sign_transaction(&self, transaction: &Value) -> Result<SignedTransaction, WalletError>;

    /// EIP-191 personal message signature, `0x`-prefixed hex.
    fn sign_message(&self, message: &str) -> Result<String, WalletError>;

    /// Sign the keccak of the packed `(type, value)` pairs as a personal message.
    fn sign_values(&self, values: &[(&str, Value)]) -> Result<String, WalletError>;
}
