//! A single secp256k1 key and the signatures it produces.

use crate::signature::Signature;
use crate::transaction::{SignedTransaction, UnsignedTransaction};
use crate::{Signer, WalletError};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde_json::Value;
use simba_eth_codec::{decode_hex, encode_packed, keccak256, Address, ParamType, U256};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Clone)]
pub struct Account {
    key: SigningKey,
    address: Address,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Load a key from hex, `0x` prefix optional.
    pub fn from_private_key(hex_key: &str) -> Result<Self, WalletError> {
        let bytes = Zeroizing::new(
            decode_hex(hex_key.trim())
                .map_err(|_| WalletError::InvalidPrivateKey("not valid hex".to_owned()))?,
        );
        if bytes.len() != 32 {
            return Err(WalletError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| WalletError::InvalidPrivateKey("out of range for secp256k1".to_owned()))?;
        Ok(Self::from_signing_key(key))
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Private key as bare lowercase hex (no `0x`).
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }

    /// Sign a 32-byte digest. Returns the low-s signature and its recovery id.
    pub fn sign_hash(&self, digest: &[u8; 32]) -> Result<(U256, U256, u8), WalletError> {
        let (mut signature, mut recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }
        let bytes = signature.to_bytes();
        Ok((
            U256::from_big_endian(&bytes[..32]),
            U256::from_big_endian(&bytes[32..]),
            recovery_id.to_byte(),
        ))
    }

    pub fn sign_unsigned(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, WalletError> {
        let (r, s, recovery_id) = self.sign_hash(&tx.signing_hash())?;
        let signature = Signature {
            r,
            s,
            v: tx.signature_v(recovery_id),
        };
        let signed = tx.encode_signed(&signature);
        debug!(address = %self.address, hash = %signed.hash, "signed transaction");
        Ok(signed)
    }

    fn sign_personal(&self, message: &[u8]) -> Result<Signature, WalletError> {
        let (r, s, recovery_id) = self.sign_hash(&personal_message_hash(message))?;
        Ok(Signature {
            r,
            s,
            v: 27 + u64::from(recovery_id),
        })
    }
}

impl Signer for Account {
    fn address(&self) -> Result<Address, WalletError> {
        Ok(self.address)
    }

    fn sign_transaction(&self, transaction: &Value) -> Result<SignedTransaction, WalletError> {
        let tx = UnsignedTransaction::from_json(transaction)?;
        self.sign_unsigned(&tx)
    }

    fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        Ok(self.sign_personal(message.as_bytes())?.to_hex())
    }

    fn sign_values(&self, values: &[(&str, Value)]) -> Result<String, WalletError> {
        let types = values
            .iter()
            .map(|(ty, _)| ty.parse::<ParamType>())
            .collect::<Result<Vec<_>, _>>()?;
        let data: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
        let packed = encode_packed(&types, &data)?;
        Ok(self.sign_personal(&keccak256(packed))?.to_hex())
    }
}

/// keccak256 of the EIP-191 `personal_sign` envelope.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    data.extend_from_slice(message);
    keccak256(data)
}

/// Recover the address that produced a personal message signature.
pub fn recover_message_signer(message: &[u8], signature_hex: &str) -> Result<Address, WalletError> {
    let signature = Signature::from_hex(signature_hex)?;
    let recovery_id = RecoveryId::from_byte(signature.recovery_id()?)
        .ok_or_else(|| WalletError::Signing("bad recovery id".to_owned()))?;
    let bytes = signature.to_bytes();
    let ecdsa = EcdsaSignature::from_slice(&bytes[..64])
        .map_err(|e| WalletError::Signing(e.to_string()))?;
    let key = VerifyingKey::recover_from_prehash(&personal_message_hash(message), &ecdsa, recovery_id)
        .map_err(|e| WalletError::Signing(e.to_string()))?;
    Ok(address_of(&key))
}

fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let mut public = [0u8; 64];
    public.copy_from_slice(&point.as_bytes()[1..]);
    let digest = keccak256(public);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::from_bytes(out)
}
