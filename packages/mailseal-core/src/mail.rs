//! # Mail Records
//!
//! A received message as the surrounding service keeps it: the sealed
//! envelope plus, once opened, its decrypted content.
//!
//! ## Field Ownership
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MailRecord                                                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  id, received_at, envelope   owned by the store, set once on insert    │
//! │                                                                         │
//! │  content (MailContent)       owned by the decrypted payload            │
//! │    from, subject, body       the only fields a payload can set         │
//! │                                                                         │
//! │  state                       Sealed → Opened | Unreadable              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A payload is parsed into [`MailContent`] with unknown fields rejected, so
//! a decrypted message can never overwrite the record's identity or
//! metadata.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{decrypt, encrypt, Envelope, KeyPair};
use crate::error::{Error, Result};

/// Decrypted message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailContent {
    /// Sender address
    pub from: String,
    /// Subject line
    pub subject: String,
    /// Message body
    #[serde(default)]
    pub body: String,
}

/// Where a record is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailState {
    /// Not yet decrypted
    Sealed,
    /// Decrypted and content attached
    Opened,
    /// Decryption or payload parsing failed
    Unreadable,
}

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecord {
    id: Uuid,
    received_at: i64,
    envelope: Envelope,
    content: Option<MailContent>,
    state: MailState,
}

impl MailRecord {
    /// Wrap a freshly received envelope
    pub fn new(envelope: Envelope) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: crate::time::now_millis(),
            envelope,
            content: None,
            state: MailState::Sealed,
        }
    }

    /// Record id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Arrival time, Unix milliseconds
    pub fn received_at(&self) -> i64 {
        self.received_at
    }

    /// The sealed envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Decrypted content, if opened
    pub fn content(&self) -> Option<&MailContent> {
        self.content.as_ref()
    }

    /// Lifecycle state
    pub fn state(&self) -> MailState {
        self.state
    }

    /// Merge a decrypted JSON payload into this record
    ///
    /// ## Errors
    ///
    /// `InvalidPayload` if the plaintext is not a JSON object with exactly
    /// the [`MailContent`] fields. The record is left unchanged.
    pub fn apply_payload(&mut self, plaintext: &[u8]) -> Result<()> {
        let content: MailContent = serde_json::from_slice(plaintext)
            .map_err(|e| Error::InvalidPayload(e.to_string()))?;
        self.content = Some(content);
        self.state = MailState::Opened;
        Ok(())
    }

    /// Decrypt the envelope and merge its payload
    pub fn open(&mut self, recipient: &KeyPair) -> Result<()> {
        let plaintext = decrypt(recipient, &self.envelope)?;
        self.apply_payload(&plaintext)
    }

    pub(crate) fn mark_unreadable(&mut self) {
        self.state = MailState::Unreadable;
    }
}

/// Seal message content for a recipient (sender side)
pub fn seal_mail(recipient_public_key: &[u8], content: &MailContent) -> Result<Envelope> {
    let payload = zeroize::Zeroizing::new(
        serde_json::to_vec(content).map_err(|e| Error::SerializationError(e.to_string()))?,
    );
    encrypt(recipient_public_key, &payload)
}
