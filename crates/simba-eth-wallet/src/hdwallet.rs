use crate::account::Account;
use crate::derivation::DerivationPath;
use crate::transaction::SignedTransaction;
use crate::{Signer, WalletError};
use bip39::{Language, Mnemonic};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use simba_eth_codec::Address;
use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

/// The key material currently held by an `HdWallet`.
#[derive(Clone)]
pub struct LoadedWallet {
    pub account: Account,
    /// Present when the wallet came from a mnemonic.
    pub mnemonic: Option<Zeroizing<String>>,
    pub path: Option<DerivationPath>,
}

impl fmt::Debug for LoadedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedWallet")
            .field("account", &self.account)
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("path", &self.path)
            .finish()
    }
}

/// A wallet that is empty until loaded from a mnemonic or private key.
#[derive(Debug, Default)]
pub struct HdWallet {
    path: DerivationPath,
    loaded: Option<LoadedWallet>,
}

impl HdWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wallet deriving along a custom BIP-32 path.
    pub fn with_path(path: DerivationPath) -> Self {
        Self { path, loaded: None }
    }

    pub fn derivation_path(&self) -> &DerivationPath {
        &self.path
    }

    /// Load from a mnemonic, generating a fresh 12-word phrase when `None`.
    ///
    /// Returns the phrase that was used.
    pub fn generate_from_mnemonic(
        &mut self,
        mnemonic: Option<&str>,
    ) -> Result<Zeroizing<String>, WalletError> {
        let phrase = match mnemonic {
            Some(words) => {
                let normalized = words
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect::<Vec<_>>()
                    .join(" ");
                Mnemonic::parse_in_normalized(Language::English, &normalized)
                    .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?
            }
            None => fresh_mnemonic(12)?,
        };
        self.load_phrase(&phrase)
    }

    /// Load a freshly generated mnemonic of `word_count` words (12, 15, 18, 21 or 24).
    pub fn generate_new(&mut self, word_count: usize) -> Result<Zeroizing<String>, WalletError> {
        let phrase = fresh_mnemonic(word_count)?;
        self.load_phrase(&phrase)
    }

    fn load_phrase(&mut self, phrase: &Mnemonic) -> Result<Zeroizing<String>, WalletError> {
        let seed = Zeroizing::new(phrase.to_seed_normalized(""));
        let secret = self.path.derive(&seed[..])?;
        let account = Account::from_signing_key(SigningKey::from(secret));
        let words = Zeroizing::new(phrase.to_string());

        info!(address = %account.address(), path = %self.path, "loaded wallet from mnemonic");
        self.loaded = Some(LoadedWallet {
            account,
            mnemonic: Some(words.clone()),
            path: Some(self.path.clone()),
        });
        Ok(words)
    }

    pub fn generate_from_private_key(&mut self, private_key: &str) -> Result<(), WalletError> {
        let account = Account::from_private_key(private_key)?;
        info!(address = %account.address(), "loaded wallet from private key");
        self.loaded = Some(LoadedWallet {
            account,
            mnemonic: None,
            path: None,
        });
        Ok(())
    }

    pub fn forget_wallet(&mut self) {
        self.loaded = None;
    }

    pub fn wallet_available(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn get_address(&self) -> Result<Address, WalletError> {
        Ok(self.loaded()?.account.address())
    }

    pub fn mnemonic(&self) -> Result<Option<Zeroizing<String>>, WalletError> {
        Ok(self.loaded()?.mnemonic.clone())
    }

    /// Private key as bare hex.
    pub fn private_key(&self) -> Result<Zeroizing<String>, WalletError> {
        Ok(self.loaded()?.account.private_key_hex())
    }

    pub fn account(&self) -> Result<&Account, WalletError> {
        Ok(&self.loaded()?.account)
    }

    fn loaded(&self) -> Result<&LoadedWallet, WalletError> {
        self.loaded.as_ref().ok_or(WalletError::NoWallet)
    }
}

impl Signer for HdWallet {
    fn address(&self) -> Result<Address, WalletError> {
        self.get_address()
    }

    fn sign_transaction(&self, transaction: &Value) -> Result<SignedTransaction, WalletError> {
        self.account()?.sign_transaction(transaction)
    }

    fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        self.account()?.sign_message(message)
    }

    fn sign_values(&self, values: &[(&str, Value)]) -> Result<String, WalletError> {
        self.account()?.sign_values(values)
    }
}

fn fresh_mnemonic(word_count: usize) -> Result<Mnemonic, WalletError> {
    if !matches!(word_count, 12 | 15 | 18 | 21 | 24) {
        return Err(WalletError::InvalidMnemonic(format!(
            "unsupported word count {word_count}"
        )));
    }
    let mut entropy = Zeroizing::new([0u8; 32]);
    let len = word_count / 3 * 4;
    OsRng.fill_bytes(&mut entropy[..len]);
    Mnemonic::from_entropy_in(Language::English, &entropy[..len])
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}
