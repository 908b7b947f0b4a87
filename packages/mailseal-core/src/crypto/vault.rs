//! # Passphrase Vault
//!
//! Protects a private key at rest with a human-memorable passphrase.
//!
//! ## Seal Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VAULT SEAL                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  salt (32 random bytes)      iv (16 random bytes)                      │
//! │        │                           │                                   │
//! │        ▼                           │                                   │
//! │  PBKDF2-HMAC-SHA512(passphrase,    │                                   │
//! │                     salt,          │                                   │
//! │                     100,000)       │                                   │
//! │        │                           │                                   │
//! │        ▼                           ▼                                   │
//! │  vault key (32 bytes) ──► AES-256-GCM(iv) ──► ciphertext + authTag     │
//! │                                                                         │
//! │  VaultBlob { salt, iv, authTag, ciphertext }  (all hex on disk)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening re-derives the vault key from the stored salt. If the GCM tag
//! does not verify the result is [`Error::AuthenticationFailure`], which is
//! the only signal separating a right passphrase from a wrong one.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

use super::{TAG_SIZE, VAULT_IV_SIZE, VAULT_KDF_ROUNDS, VAULT_KEY_SIZE, VAULT_SALT_SIZE};

/// AES-256-GCM with a 128-bit IV
type VaultCipher = AesGcm<Aes256, U16>;

/// At-rest form of a private key
///
/// Never mutated once sealed: rotating keys or changing the passphrase
/// produces a fresh blob that replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultBlob {
    /// PBKDF2 salt
    #[serde(with = "hex_array")]
    pub salt: [u8; VAULT_SALT_SIZE],

    /// AES-GCM initialization vector
    #[serde(with = "hex_array")]
    pub iv: [u8; VAULT_IV_SIZE],

    /// AES-GCM authentication tag
    #[serde(with = "hex_array")]
    pub auth_tag: [u8; TAG_SIZE],

    /// Encrypted private key
    #[serde(with = "hex_vec")]
    pub ciphertext: Vec<u8>,
}

impl VaultBlob {
    /// Serialize to the private key file format
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Parse the private key file format
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::DeserializationError(e.to_string()))
    }
}

/// Seal a private key under a passphrase
///
/// Salt and IV are fresh on every call, so sealing the same key twice
/// with the same passphrase yields two different blobs.
pub fn seal_private_key(private_key: &[u8], passphrase: &str) -> Result<VaultBlob> {
    let mut salt = [0u8; VAULT_SALT_SIZE];
    let mut iv = [0u8; VAULT_IV_SIZE];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    seal_with(private_key, passphrase, salt, iv)
}

/// Open a sealed private key
///
/// ## Errors
///
/// Returns [`Error::AuthenticationFailure`] if the passphrase is wrong or
/// any field of the blob was modified. The two are indistinguishable.
pub fn open_private_key(blob: &VaultBlob, passphrase: &str) -> Result<Zeroizing<Vec<u8>>> {
    let key = derive_vault_key(passphrase, &blob.salt);
    let cipher = VaultCipher::new_from_slice(&key[..])
        .map_err(|e| Error::KeyDerivationFailed(format!("Invalid vault key: {}", e)))?;

    let mut buffer = Zeroizing::new(blob.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            aes_gcm::Nonce::<U16>::from_slice(&blob.iv),
            b"",
            &mut buffer[..],
            aes_gcm::Tag::<U16>::from_slice(&blob.auth_tag),
        )
        .map_err(|_| Error::AuthenticationFailure)?;

    tracing::debug!("Opened vault blob ({} byte key)", buffer.len());
    Ok(buffer)
}

/// Deterministic core of [`seal_private_key`]
pub(crate) fn seal_with(
    private_key: &[u8],
    passphrase: &str,
    salt: [u8; VAULT_SALT_SIZE],
    iv: [u8; VAULT_IV_SIZE],
) -> Result<VaultBlob> {
    let key = derive_vault_key(passphrase, &salt);
    let cipher = VaultCipher::new_from_slice(&key[..])
        .map_err(|e| Error::KeyDerivationFailed(format!("Invalid vault key: {}", e)))?;

    let mut ciphertext = private_key.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(
            aes_gcm::Nonce::<U16>::from_slice(&iv),
            b"",
            &mut ciphertext[..],
        )
        .map_err(|e| Error::EncryptionFailed(format!("Vault seal failed: {}", e)))?;

    let mut auth_tag = [0u8; TAG_SIZE];
    auth_tag.copy_from_slice(&tag);

    tracing::debug!("Sealed {} byte key into vault blob", private_key.len());

    Ok(VaultBlob {
        salt,
        iv,
        auth_tag,
        ciphertext,
    })
}

/// PBKDF2-HMAC-SHA512 over the passphrase
fn derive_vault_key(
    passphrase: &str,
    salt: &[u8; VAULT_SALT_SIZE],
) -> Zeroizing<[u8; VAULT_KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; VAULT_KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), salt, VAULT_KDF_ROUNDS, &mut key[..]);
    key
}

/// Serde helper for fixed-size byte arrays as hex
mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {} bytes, got {}", N, len)))
    }
}

/// Serde helper for variable-length byte strings as hex
mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
