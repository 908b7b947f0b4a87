//! # Cryptography Module
//!
//! All cryptographic primitives used by mailseal.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  keys        KeyPair::generate()      X25519 scalar + public point     │
//! │                    │                                                    │
//! │       ┌────────────┴────────────┐                                      │
//! │       ▼                         ▼                                      │
//! │  vault                      envelope                                   │
//! │  seal / open private key    encrypt(public) / decrypt(private)         │
//! │  PBKDF2-HMAC-SHA512         ephemeral X25519 ECDH                      │
//! │  (100,000 rounds)           ChaCha20-Poly1305                          │
//! │  AES-256-GCM, 16-byte IV    12-byte random nonce                       │
//! │                                 │                                      │
//! │                                 ▼                                      │
//! │                             validator                                  │
//! │                             structural pre-check                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol Constants
//!
//! | Purpose | Algorithm | Parameters |
//! |---------|-----------|------------|
//! | Key agreement | X25519 | 32-byte keys |
//! | Envelope AEAD | ChaCha20-Poly1305 | 12-byte nonce, 16-byte tag |
//! | Vault AEAD | AES-256-GCM | 16-byte IV, 16-byte tag |
//! | Passphrase KDF | PBKDF2-HMAC-SHA512 | 100,000 rounds, 32-byte salt |
//!
//! These are fixed so that envelopes and vault blobs produced by one
//! implementation can be opened by any other. None of them are
//! configurable at runtime.

mod envelope;
mod keys;
mod validator;
mod vault;

pub use envelope::{decrypt, decrypt_batch, decrypt_decoded, encrypt, encrypt_batch, Envelope};
pub use keys::{
    key_id, parse_public_key, parse_public_key_base64, public_key_to_base64, verify_key_pair,
    KeyPair,
};
pub use validator::{check_envelope, is_structurally_valid, DecodedEnvelope};
pub use vault::{open_private_key, seal_private_key, VaultBlob};

/// Size of public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of private keys in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of the envelope key id (public key prefix)
pub const KEY_ID_SIZE: usize = 8;

/// Size of the ChaCha20-Poly1305 nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of an AEAD authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the vault salt in bytes
pub const VAULT_SALT_SIZE: usize = 32;

/// Size of the vault AES-GCM IV in bytes
pub const VAULT_IV_SIZE: usize = 16;

/// Size of the derived vault key in bytes (256 bits)
pub const VAULT_KEY_SIZE: usize = 32;

/// PBKDF2 iteration count for the vault key
pub const VAULT_KDF_ROUNDS: u32 = 100_000;
