//! # Key Management
//!
//! X25519 key pairs for receiving envelopes.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           KEY PAIR                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Private Key (32 bytes, clamped scalar)                                │
//! │  ─────────────────────────────────────                                 │
//! │  - Lives in memory or inside a passphrase-sealed VaultBlob             │
//! │  - Zeroized on drop                                                    │
//! │                                                                         │
//! │            │  scalar multiplication with the Curve25519 base point     │
//! │            ▼                                                            │
//! │                                                                         │
//! │  Public Key (32 bytes, Montgomery u-coordinate)                        │
//! │  ──────────────────────────────────────────────                        │
//! │  - Published in clear (base64 text file)                               │
//! │  - First 8 bytes double as the envelope key id                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

use super::{KEY_ID_SIZE, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// X25519 key pair used for envelope key agreement
///
/// ## Security
///
/// - The private scalar is zeroized when this struct is dropped
/// - The public key can be freely copied and published
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    /// Private scalar (secret)
    #[zeroize(skip)] // x25519_dalek handles its own zeroization
    secret: StaticSecret,
    /// Public point (derived from secret)
    #[zeroize(skip)]
    public: X25519PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    ///
    /// Draws 32 bytes from the operating system's secure random source,
    /// clamps them into a valid Curve25519 scalar and multiplies the base
    /// point to obtain the public key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        clamp_scalar(&mut bytes);

        let pair = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        pair
    }

    /// Rebuild a key pair from stored private key bytes
    ///
    /// The public key is recomputed, never taken on trust.
    pub fn from_secret_bytes(bytes: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a key pair from a private key slice of unknown length
    pub fn from_secret_slice(bytes: &[u8]) -> Result<Self> {
        let array: Zeroizing<[u8; PRIVATE_KEY_SIZE]> =
            Zeroizing::new(bytes.try_into().map_err(|_| {
                Error::InvalidKey(format!(
                    "private key must be {} bytes, got {}",
                    PRIVATE_KEY_SIZE,
                    bytes.len()
                ))
            })?);
        Ok(Self::from_secret_bytes(&array))
    }

    /// Get the private key bytes (for sealing into a vault)
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage. Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Public key, base64 encoded (the published identifier)
    pub fn public_base64(&self) -> String {
        public_key_to_base64(&self.public_bytes())
    }

    /// Key id for envelopes addressed to this pair
    pub fn key_id(&self) -> [u8; KEY_ID_SIZE] {
        key_id(&self.public_bytes())
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

/// Check that a private key produces the claimed public key
///
/// Returns `false` for mismatched keys and for inputs of the wrong length;
/// the two cases are not distinguished.
pub fn verify_key_pair(public_key: &[u8], private_key: &[u8]) -> bool {
    let Ok(claimed) = <[u8; PUBLIC_KEY_SIZE]>::try_from(public_key) else {
        return false;
    };
    match KeyPair::from_secret_slice(private_key) {
        Ok(pair) => pair.public_bytes() == claimed,
        Err(_) => false,
    }
}

/// Clamp 32 random bytes into a Curve25519 scalar (RFC 7748 §5)
pub(crate) fn clamp_scalar(bytes: &mut [u8; PRIVATE_KEY_SIZE]) {
    bytes[0] &= 248;
    bytes[31] &= 127;
    bytes[31] |= 64;
}

/// First 8 bytes of a public key
///
/// An addressing hint only; it is not checked during decryption.
pub fn key_id(public_key: &[u8; PUBLIC_KEY_SIZE]) -> [u8; KEY_ID_SIZE] {
    let mut id = [0u8; KEY_ID_SIZE];
    id.copy_from_slice(&public_key[..KEY_ID_SIZE]);
    id
}

/// Parse a raw public key, checking its length
pub fn parse_public_key(bytes: &[u8]) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    bytes.try_into().map_err(|_| {
        Error::InvalidKey(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        ))
    })
}

/// Parse a base64 public key (as published in the public key file)
pub fn parse_public_key_base64(encoded: &str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidKey(format!("public key is not valid base64: {}", e)))?;
    parse_public_key(&bytes)
}

/// Encode a public key as base64
pub fn public_key_to_base64(public_key: &[u8; PUBLIC_KEY_SIZE]) -> String {
    BASE64.encode(public_key)
}

// ============================================================================
// TESTS
// ============================================================================
