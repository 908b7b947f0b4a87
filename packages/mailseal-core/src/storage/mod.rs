//! # Storage Module
//!
//! Persistence around the cryptographic core.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       STORAGE ARCHITECTURE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────┐   ┌───────────────────────────────┐  │
//! │  │         Key Files             │   │          Mail Store           │  │
//! │  ├───────────────────────────────┤   ├───────────────────────────────┤  │
//! │  │                               │   │                               │  │
//! │  │  public.key  (base64)         │   │  MailStore trait              │  │
//! │  │  private.key (VaultBlob JSON) │   │  insert / list / get / update │  │
//! │  │                               │   │                               │  │
//! │  │  provision / unlock / rotate  │   │  MemoryMailStore              │  │
//! │  │                               │   │  open_all (batch decrypt)     │  │
//! │  └───────────────────────────────┘   └───────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod key_files;
mod mail_store;

pub use key_files::{KeyFiles, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
pub use mail_store::{open_all, MailStore, MemoryMailStore, OpenReport};
