//! Account creation, import and signing.
//!
//! # Security
//! - Mnemonics and secret keys are never logged
//! - `Debug` output redacts the mnemonic

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use subxt::utils::AccountId32;
use subxt_signer::bip39::Mnemonic;
use subxt_signer::sr25519::{self, Keypair};
use subxt_signer::SecretUri;

use crate::account::ss58;
use crate::chain::types::{ChainError, ChainResult};

/// Word counts accepted for new mnemonics.
pub const SUPPORTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Default word count for new accounts.
pub const DEFAULT_WORD_COUNT: usize = 12;

/// A Creditcoin account backed by an sr25519 keypair.
pub struct Account {
    address: String,
    mnemonic: Option<String>,
    keypair: Keypair,
    ss58_format: u16,
}

impl Account {
    fn from_keypair(keypair: Keypair, mnemonic: Option<String>, ss58_format: u16) -> ChainResult<Self> {
        let address = ss58::encode(&keypair.public_key().0, ss58_format)?;
        Ok(Self {
            address,
            mnemonic,
            keypair,
            ss58_format,
        })
    }

    /// Generate a fresh random mnemonic with the given word count.
    pub fn generate_mnemonic(word_count: usize) -> ChainResult<String> {
        if !SUPPORTED_WORD_COUNTS.contains(&word_count) {
            return Err(ChainError::Keypair(format!(
                "Unsupported mnemonic length {}; expected one of {:?}",
                word_count, SUPPORTED_WORD_COUNTS
            )));
        }

        // 32 bits of entropy per 3 words.
        let mut entropy = vec![0u8; word_count / 3 * 4];
        rand::thread_rng().fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| ChainError::Keypair(format!("Mnemonic generation failed: {}", e)))?;
        Ok(mnemonic.to_string())
    }

    /// Create a new account from a freshly generated mnemonic.
    pub fn generate(word_count: usize, ss58_format: u16) -> ChainResult<Self> {
        let phrase = Self::generate_mnemonic(word_count)?;
        let account = Self::from_mnemonic(&phrase, ss58_format)?;

        tracing::info!(address = %account.address, "Account created");
        Ok(account)
    }

    /// Import an account from a BIP-39 mnemonic.
    pub fn from_mnemonic(phrase: &str, ss58_format: u16) -> ChainResult<Self> {
        let normalized = phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        let mnemonic = Mnemonic::parse_normalized(&normalized)
            .map_err(|e| ChainError::Keypair(format!("Invalid mnemonic: {}", e)))?;

        let keypair = Keypair::from_phrase(&mnemonic, None)
            .map_err(|e| ChainError::Keypair(format!("Key derivation failed: {}", e)))?;

        Self::from_keypair(keypair, Some(normalized), ss58_format)
    }

    /// Import an account from a hex-encoded 32-byte secret key (mini secret).
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_secret_key_hex(secret_hex: &str, ss58_format: u16) -> ChainResult<Self> {
        let key_hex = secret_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let bytes = hex::decode(key_hex)
            .map_err(|e| ChainError::Keypair(format!("Invalid private key format: {}", e)))?;
        let secret: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            ChainError::Keypair(format!("Invalid private key length: {} bytes, expected 32", b.len()))
        })?;

        let keypair = Keypair::from_secret_key(secret)
            .map_err(|e| ChainError::Keypair(format!("Invalid private key: {}", e)))?;

        Self::from_keypair(keypair, None, ss58_format)
    }

    /// Import an account from a secret URI such as `"<phrase>//hard/soft"` or `"//Alice"`.
    pub fn from_uri(uri: &str, ss58_format: u16) -> ChainResult<Self> {
        let secret_uri = SecretUri::from_str(uri)
            .map_err(|e| ChainError::Keypair(format!("Invalid secret URI: {}", e)))?;

        let keypair = Keypair::from_uri(&secret_uri)
            .map_err(|e| ChainError::Keypair(format!("Key derivation failed: {}", e)))?;

        Self::from_keypair(keypair, None, ss58_format)
    }

    /// Import from whatever secret format the string holds: hex key, mnemonic
    /// or secret URI.
    pub fn from_secret(secret: &str, ss58_format: u16) -> ChainResult<Self> {
        let trimmed = secret.trim();
        let hex_body = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        if hex_body.len() == 64 && hex_body.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::from_secret_key_hex(trimmed, ss58_format)
        } else if trimmed.contains('/') {
            Self::from_uri(trimmed, ss58_format)
        } else {
            Self::from_mnemonic(trimmed, ss58_format)
        }
    }

    /// SS58 address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Mnemonic, when the account was created or imported from one.
    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public_key().0
    }

    pub fn account_id(&self) -> AccountId32 {
        AccountId32(self.public_key())
    }

    pub fn ss58_format(&self) -> u16 {
        self.ss58_format
    }

    /// Signing material for the chain-client library.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Sign arbitrary bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.keypair.sign(message).0
    }

    /// Verify an sr25519 signature against a public key.
    pub fn verify(message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool {
        sr25519::verify(
            &sr25519::Signature(*signature),
            message,
            &sr25519::PublicKey(*public_key),
        )
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("ss58_format", &self.ss58_format)
            .finish()
    }
}
