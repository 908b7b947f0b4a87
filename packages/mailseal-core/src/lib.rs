//! # mailseal-core
//!
//! Receive messages encrypted under a published public key, decrypt them
//! with a private key that never touches disk unprotected.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       MAILSEAL CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │                            Crypto                                 │  │
//! │  │                                                                   │  │
//! │  │  keys        X25519 key pairs, verification                       │  │
//! │  │  vault       passphrase sealing (PBKDF2-SHA512 + AES-256-GCM)     │  │
//! │  │  envelope    hybrid encryption (X25519 + ChaCha20-Poly1305)       │  │
//! │  │  validator   structural pre-check of untrusted envelopes          │  │
//! │  └───────────────────────────────┬───────────────────────────────────┘  │
//! │                                  │                                      │
//! │  ┌─────────────────────────┐     │     ┌─────────────────────────────┐  │
//! │  │        Storage          │◄────┴────►│           Mail              │  │
//! │  │                         │           │                             │  │
//! │  │ - Key files             │           │ - MailRecord                │  │
//! │  │ - Mail store            │           │ - Typed payload merge       │  │
//! │  └─────────────────────────┘           └─────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key pairs, passphrase vault, envelopes, validation
//! - [`storage`] - Key files on disk and the mail store seam
//! - [`mail`] - Mail records and decrypted payload merging
//!
//! ## Concurrency
//!
//! Every operation is a synchronous, CPU-bound transformation of its
//! arguments. Nothing reads or writes process-wide state, so all of them
//! can run concurrently from any number of threads. The only shared
//! dependency is the operating system's random source.
//!
//! ## Example
//!
//! ```
//! use mailseal_core::crypto::{decrypt, encrypt, KeyPair};
//!
//! let holder = KeyPair::generate();
//! let envelope = encrypt(&holder.public_bytes(), b"hello world").unwrap();
//! let plaintext = decrypt(&holder, &envelope).unwrap();
//! assert_eq!(plaintext.as_slice(), b"hello world");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod mail;
pub mod storage;
/// Wall-clock helpers for timestamps.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{Envelope, KeyPair, VaultBlob};
pub use error::{Error, Result};
pub use mail::{MailContent, MailRecord, MailState};
pub use storage::{KeyFiles, MailStore, MemoryMailStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
