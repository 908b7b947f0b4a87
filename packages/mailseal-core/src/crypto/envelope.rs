//! # Envelope Encryption
//!
//! Hybrid public-key encryption: anyone holding a recipient's public key can
//! seal a plaintext into a self-contained [`Envelope`]; only the holder of the
//! matching private key can open it.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ENVELOPE ENCRYPTION FLOW                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER                                                                │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  Step 1: Fresh ephemeral key pair (private half discarded after use)   │
//! │                                                                         │
//! │  Step 2: X25519(ephemeral private, recipient public) → shared secret   │
//! │          The 32-byte shared secret is the ChaCha20-Poly1305 key.       │
//! │                                                                         │
//! │  Step 3: 12-byte random nonce                                          │
//! │                                                                         │
//! │  Step 4: ChaCha20-Poly1305(key, nonce, plaintext) → ciphertext ‖ tag   │
//! │                                                                         │
//! │  Step 5: Envelope { keyId, ephemeralPublicKey, nonce,                  │
//! │                     ciphertext, timestamp }                            │
//! │                                                                         │
//! │  RECIPIENT                                                             │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  X25519(recipient private, ephemeral public) → same shared secret      │
//! │  split ciphertext ‖ tag, verify tag, decrypt                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//!
//! ```json
//! {
//!   "keyId": "<hex, first 8 bytes of recipient public key>",
//!   "ephemeralPublicKey": "<base64, 32 bytes>",
//!   "nonce": "<base64, 12 bytes>",
//!   "ciphertext": "<base64, ciphertext ‖ 16-byte tag>",
//!   "timestamp": 1718000000000
//! }
//! ```
//!
//! ## Raw shared secret as key
//!
//! The X25519 output is used directly as the AEAD key, with no hash-based
//! derivation step. That is weaker than the usual practice of running the
//! secret through a KDF, but changing it would make every existing envelope
//! unreadable. Both ends must agree, so it stays as is.

use chacha20poly1305::aead::{Aead, AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, SharedSecret};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

use super::keys::{self, KeyPair};
use super::validator::{check_envelope, DecodedEnvelope};
use super::{NONCE_SIZE, PUBLIC_KEY_SIZE, TAG_SIZE};

/// A sealed message addressed to one public key
///
/// This is the wire record itself: binary fields are kept in their encoded
/// form so that a decoded-then-re-encoded envelope is byte-identical to the
/// one received. Construct one with [`encrypt`] or parse one with
/// [`Envelope::from_json`]; it cannot be modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    key_id: String,
    ephemeral_public_key: String,
    nonce: String,
    ciphertext: String,
    timestamp: i64,
}

impl Envelope {
    pub(crate) fn from_encoded_parts(
        key_id: String,
        ephemeral_public_key: String,
        nonce: String,
        ciphertext: String,
        timestamp: i64,
    ) -> Self {
        Self {
            key_id,
            ephemeral_public_key,
            nonce,
            ciphertext,
            timestamp,
        }
    }

    /// Recipient key id (hex of the first 8 public key bytes)
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Ephemeral public key, base64
    pub fn ephemeral_public_key(&self) -> &str {
        &self.ephemeral_public_key
    }

    /// AEAD nonce, base64
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Ciphertext with trailing tag, base64
    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    /// Creation time, Unix milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Whether the key id matches this public key
    ///
    /// The key id is a routing hint. A match does not mean the envelope
    /// will decrypt, and decryption never consults it.
    pub fn is_addressed_to(&self, public_key: &[u8; PUBLIC_KEY_SIZE]) -> bool {
        self.key_id.eq_ignore_ascii_case(&hex::encode(keys::key_id(public_key)))
    }

    /// Serialize to the wire record
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Parse a wire record
    ///
    /// A record that is not valid JSON or lacks one of the five fields is a
    /// [`Error::MalformedEnvelope`]. Field contents are not checked here; run
    /// the result through [`super::is_structurally_valid`] or let
    /// [`decrypt`] do it.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }
}

/// Encrypt a plaintext for a recipient
///
/// ## Errors
///
/// Returns `InvalidKey` if the recipient key is not 32 bytes or is a
/// low-order point that would give an all-zero shared secret.
pub fn encrypt(recipient_public_key: &[u8], plaintext: &[u8]) -> Result<Envelope> {
    let recipient = keys::parse_public_key(recipient_public_key)?;
    encrypt_for(&recipient, plaintext)
}

/// Encrypt several plaintexts for the same recipient
///
/// Every element gets its own ephemeral key pair and nonce.
pub fn encrypt_batch<P: AsRef<[u8]>>(
    recipient_public_key: &[u8],
    plaintexts: &[P],
) -> Result<Vec<Envelope>> {
    let recipient = keys::parse_public_key(recipient_public_key)?;
    let envelopes = plaintexts
        .iter()
        .map(|p| encrypt_for(&recipient, p.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!("Encrypted batch of {} envelopes", envelopes.len());
    Ok(envelopes)
}

/// Decrypt an envelope with the recipient's key pair
///
/// The envelope is structurally validated first, so a malformed record is
/// always reported as `MalformedEnvelope`, never as an authentication
/// failure.
///
/// ## Errors
///
/// - `MalformedEnvelope`: bad base64 or wrong field lengths
/// - `AuthenticationFailure`: wrong key, or any field was tampered with
pub fn decrypt(recipient: &KeyPair, envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
    let decoded = check_envelope(envelope)?;
    decrypt_decoded(recipient, &decoded)
}

/// Decrypt a list of envelopes
///
/// Each slot carries its own outcome; one bad envelope does not affect the
/// others. The output has the same length and order as the input.
pub fn decrypt_batch(
    recipient: &KeyPair,
    envelopes: &[Envelope],
) -> Vec<Result<Zeroizing<Vec<u8>>>> {
    let results: Vec<_> = envelopes
        .iter()
        .enumerate()
        .map(|(index, envelope)| {
            decrypt(recipient, envelope).map_err(|e| {
                tracing::warn!("Batch element {} failed: {}", index, e);
                e
            })
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::debug!(
        "Decrypted batch: {} ok, {} failed",
        results.len() - failed,
        failed
    );
    results
}

/// Decrypt an envelope whose fields are already decoded
pub fn decrypt_decoded(
    recipient: &KeyPair,
    envelope: &DecodedEnvelope,
) -> Result<Zeroizing<Vec<u8>>> {
    // X25519 ignores the top bit of the u-coordinate. An honest sender never
    // sets it, so a set bit means the field was altered.
    if envelope.ephemeral_public_key[PUBLIC_KEY_SIZE - 1] & 0x80 != 0 {
        return Err(Error::AuthenticationFailure);
    }

    let shared = recipient
        .secret()
        .diffie_hellman(&X25519PublicKey::from(envelope.ephemeral_public_key));
    if !shared.was_contributory() {
        return Err(Error::AuthenticationFailure);
    }

    if envelope.ciphertext.len() < TAG_SIZE {
        return Err(Error::AuthenticationFailure);
    }
    let (body, tag) = envelope.ciphertext.split_at(envelope.ciphertext.len() - TAG_SIZE);

    let cipher = envelope_cipher(&shared);
    let mut buffer = Zeroizing::new(body.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&envelope.nonce),
            b"",
            &mut buffer[..],
            Tag::from_slice(tag),
        )
        .map_err(|_| Error::AuthenticationFailure)?;

    tracing::debug!(
        "Decrypted envelope {} ({} bytes)",
        envelope.key_id,
        buffer.len()
    );
    Ok(buffer)
}

fn encrypt_for(recipient: &[u8; PUBLIC_KEY_SIZE], plaintext: &[u8]) -> Result<Envelope> {
    let ephemeral = KeyPair::generate();
    let shared = ephemeral
        .secret()
        .diffie_hellman(&X25519PublicKey::from(*recipient));
    if !shared.was_contributory() {
        return Err(Error::InvalidKey("recipient public key is a low-order point".into()));
    }

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = envelope_cipher(&shared)
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("Envelope seal failed: {}", e)))?;

    let decoded = DecodedEnvelope {
        key_id: hex::encode(keys::key_id(recipient)),
        ephemeral_public_key: ephemeral.public_bytes(),
        nonce,
        ciphertext,
        timestamp: crate::time::now_millis(),
    };

    tracing::debug!(
        "Encrypted {} bytes for key {}",
        plaintext.len(),
        decoded.key_id
    );
    Ok(decoded.encode())
}

fn envelope_cipher(shared: &SharedSecret) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(shared.as_bytes()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    fn tamper(envelope: &Envelope, f: impl FnOnce(&mut DecodedEnvelope)) -> Envelope {
        let mut decoded = check_envelope(envelope).unwrap();
        f(&mut decoded);
        decoded.encode()
    }

    #[test]
    fn test_hello_world_round_trip() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), "hello world".as_bytes()).unwrap();

        let plaintext = decrypt(&kp, &envelope).unwrap();
        assert_eq!(std::str::from_utf8(&plaintext).unwrap(), "hello world");

        assert_eq!(BASE64.decode(envelope.ephemeral_public_key()).unwrap().len(), 32);
        assert_eq!(BASE64.decode(envelope.nonce()).unwrap().len(), 12);
        assert_eq!(BASE64.decode(envelope.ciphertext()).unwrap().len(), 11 + TAG_SIZE);
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"").unwrap();

        assert!(decrypt(&kp, &envelope).unwrap().is_empty());
    }

    #[test]
    fn test_key_id_and_timestamp() {
        let kp = KeyPair::generate();
        let before = crate::time::now_millis();
        let envelope = encrypt(&kp.public_bytes(), b"x").unwrap();

        assert_eq!(envelope.key_id(), hex::encode(&kp.public_bytes()[..8]));
        assert!(envelope.is_addressed_to(&kp.public_bytes()));
        assert!(!envelope.is_addressed_to(&KeyPair::generate().public_bytes()));
        assert!(envelope.timestamp() >= before);
    }

    #[test]
    fn test_same_plaintext_twice_differs() {
        let kp = KeyPair::generate();
        let a = encrypt(&kp.public_bytes(), b"same message").unwrap();
        let b = encrypt(&kp.public_bytes(), b"same message").unwrap();

        assert_ne!(a.ephemeral_public_key(), b.ephemeral_public_key());
        assert_ne!(a.ciphertext(), b.ciphertext());
        assert_eq!(decrypt(&kp, &a).unwrap().as_slice(), b"same message");
        assert_eq!(decrypt(&kp, &b).unwrap().as_slice(), b"same message");
    }

    #[test]
    fn test_wrong_key_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let envelope = encrypt(&alice.public_bytes(), b"for alice").unwrap();

        assert_eq!(decrypt(&bob, &envelope).unwrap_err(), Error::AuthenticationFailure);
    }

    #[test]
    fn test_invalid_recipient_key() {
        assert!(matches!(encrypt(&[0u8; 31], b"x"), Err(Error::InvalidKey(_))));
        assert!(matches!(encrypt(&[], b"x"), Err(Error::InvalidKey(_))));
        // The identity point has order 1
        assert!(matches!(encrypt(&[0u8; 32], b"x"), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"Hello, World!").unwrap();
        let tampered = tamper(&envelope, |d| d.ciphertext[0] ^= 0x01);

        assert_eq!(decrypt(&kp, &tampered).unwrap_err(), Error::AuthenticationFailure);
    }

    #[test]
    fn test_tampered_tag_fails() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"Hello, World!").unwrap();
        let tampered = tamper(&envelope, |d| {
            let last = d.ciphertext.len() - 1;
            d.ciphertext[last] ^= 0x80;
        });

        assert_eq!(decrypt(&kp, &tampered).unwrap_err(), Error::AuthenticationFailure);
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"Hello, World!").unwrap();
        let tampered = tamper(&envelope, |d| d.nonce[11] ^= 0x01);

        assert_eq!(decrypt(&kp, &tampered).unwrap_err(), Error::AuthenticationFailure);
    }

    #[test]
    fn test_tampered_ephemeral_key_every_bit_fails() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"Hello, World!").unwrap();

        for bit in 0..(PUBLIC_KEY_SIZE * 8) {
            let tampered = tamper(&envelope, |d| {
                d.ephemeral_public_key[bit / 8] ^= 1 << (bit % 8);
            });
            assert_eq!(
                decrypt(&kp, &tampered).unwrap_err(),
                Error::AuthenticationFailure,
                "bit {} flip was not detected",
                bit
            );
        }
    }

    #[test]
    fn test_truncated_ciphertext_fails_authentication() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"").unwrap();
        let tampered = tamper(&envelope, |d| d.ciphertext.truncate(TAG_SIZE - 1));

        assert_eq!(decrypt(&kp, &tampered).unwrap_err(), Error::AuthenticationFailure);
    }

    #[test]
    fn test_key_id_not_checked_on_decrypt() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"routing hint only").unwrap();
        let relabelled = tamper(&envelope, |d| d.key_id = "0000000000000000".into());

        assert_eq!(decrypt(&kp, &relabelled).unwrap().as_slice(), b"routing hint only");
    }

    #[test]
    fn test_malformed_reported_before_authentication() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let envelope = encrypt(&other.public_bytes(), b"x").unwrap();
        let broken = Envelope::from_encoded_parts(
            envelope.key_id().to_string(),
            "!!not-base64!!".into(),
            envelope.nonce().to_string(),
            envelope.ciphertext().to_string(),
            envelope.timestamp(),
        );

        assert!(matches!(decrypt(&kp, &broken), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_batch_round_trip_preserves_order() {
        let kp = KeyPair::generate();
        let plaintexts = ["one", "two", "three"];
        let envelopes = encrypt_batch(&kp.public_bytes(), &plaintexts).unwrap();
        assert_eq!(envelopes.len(), 3);

        let results = decrypt_batch(&kp, &envelopes);
        let recovered: Vec<String> = results
            .into_iter()
            .map(|r| String::from_utf8(r.unwrap().to_vec()).unwrap())
            .collect();
        assert_eq!(recovered, plaintexts);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let kp = KeyPair::generate();
        let mut envelopes =
            encrypt_batch(&kp.public_bytes(), &["a", "b", "c", "d"]).unwrap();
        envelopes[2] = tamper(&envelopes[2], |d| d.ciphertext[0] ^= 0xFF);

        let results = decrypt_batch(&kp, &envelopes);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().as_slice(), b"a");
        assert_eq!(results[1].as_ref().unwrap().as_slice(), b"b");
        assert_eq!(results[2].as_ref().unwrap_err(), &Error::AuthenticationFailure);
        assert_eq!(results[3].as_ref().unwrap().as_slice(), b"d");
    }

    #[test]
    fn test_batch_invalid_key_fails_fast() {
        let result = encrypt_batch(&[1u8; 16], &["a", "b"]);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"wire").unwrap();
        let json = envelope.to_json().unwrap();

        let parsed = Envelope::from_json(&json).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.to_json().unwrap(), json);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for field in ["keyId", "ephemeralPublicKey", "nonce", "ciphertext", "timestamp"] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_from_json_missing_field_is_malformed() {
        let json = r#"{"keyId":"00","nonce":"AAAA","ciphertext":"AAAA","timestamp":0}"#;
        assert!(matches!(Envelope::from_json(json), Err(Error::MalformedEnvelope(_))));
        assert!(matches!(Envelope::from_json("not json"), Err(Error::MalformedEnvelope(_))));
    }
}
