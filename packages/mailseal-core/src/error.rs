//! # Error Handling
//!
//! Error types for mailseal-core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── InvalidKey            - Wrong length / not a usable point     │
//! │  │   ├── AuthenticationFailure - AEAD tag did not verify               │
//! │  │   ├── KeyDerivationFailed   - PBKDF2 could not run                  │
//! │  │   └── EncryptionFailed      - Cipher refused the input              │
//! │  │                                                                      │
//! │  ├── Envelope Errors                                                   │
//! │  │   └── MalformedEnvelope     - Bad base64 or field lengths           │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── ReadError             - Failed to read key files              │
//! │  │   ├── WriteError            - Failed to write key files             │
//! │  │   ├── NotFound              - Key file / record missing             │
//! │  │   └── Corrupted             - Stored keys do not match              │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── InvalidPayload        - Decrypted payload has wrong shape     │
//! │      ├── SerializationError                                            │
//! │      └── DeserializationError                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authentication failures
//!
//! `AuthenticationFailure` deliberately carries no detail. A wrong passphrase,
//! a flipped bit in a vault blob, an envelope sealed for someone else and a
//! tampered envelope all produce the exact same value, so callers cannot be
//! turned into an oracle that tells an attacker *why* something failed.

use thiserror::Error;

/// Result type alias for mailseal-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mailseal-core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Crypto Errors (300-349)
    // ========================================================================
    /// A supplied key has the wrong length or is not a usable curve point
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// An AEAD tag (envelope or vault) failed verification
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // ========================================================================
    // Envelope Errors (350-399)
    // ========================================================================
    /// Structural decoding failure of an envelope record
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================
    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// Item not found in storage
    #[error("Item not found: {0}")]
    StorageNotFound(String),

    /// Stored data is inconsistent
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Decrypted payload does not have the expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl Error {
    /// Get a stable numeric code for this error
    ///
    /// Codes are organized by category:
    /// - 300-349: Crypto
    /// - 350-399: Envelope structure
    /// - 400-499: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Crypto (300-349)
            Error::InvalidKey(_) => 300,
            Error::AuthenticationFailure => 301,
            Error::KeyDerivationFailed(_) => 302,
            Error::EncryptionFailed(_) => 303,

            // Envelope (350-399)
            Error::MalformedEnvelope(_) => 350,

            // Storage (400-499)
            Error::StorageReadError(_) => 400,
            Error::StorageWriteError(_) => 401,
            Error::StorageNotFound(_) => 402,
            Error::StorageCorrupted(_) => 403,

            // Internal (900-999)
            Error::InvalidPayload(_) => 900,
            Error::SerializationError(_) => 901,
            Error::DeserializationError(_) => 902,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Cryptographic failures are never transient, so nothing in the crypto
    /// or envelope categories is worth retrying. Only I/O on key files may
    /// succeed on a second attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StorageReadError(_) | Error::StorageWriteError(_))
    }

    /// Check if this is an authentication failure
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Error::AuthenticationFailure)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::DeserializationError(err.to_string())
        } else {
            Error::SerializationError(err.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::StorageNotFound(err.to_string()),
            _ => Error::StorageReadError(err.to_string()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
