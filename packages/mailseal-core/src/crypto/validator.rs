//! Structural checks on envelopes received from untrusted sources.
//!
//! Validation is cheap and never touches key material. Passing it only
//! means the fields have the right encoding and lengths; whether the
//! envelope actually decrypts is decided by the AEAD tag.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{Error, Result};

use super::envelope::Envelope;
use super::{NONCE_SIZE, PUBLIC_KEY_SIZE};

/// An envelope with its binary fields decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Recipient key id hint, as carried on the wire
    pub key_id: String,
    /// Sender's ephemeral X25519 public key
    pub ephemeral_public_key: [u8; PUBLIC_KEY_SIZE],
    /// ChaCha20-Poly1305 nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the 16-byte tag appended
    pub ciphertext: Vec<u8>,
    /// Creation time, Unix milliseconds
    pub timestamp: i64,
}

impl DecodedEnvelope {
    /// Re-encode into the wire record
    pub fn encode(&self) -> Envelope {
        Envelope::from_encoded_parts(
            self.key_id.clone(),
            BASE64.encode(self.ephemeral_public_key),
            BASE64.encode(self.nonce),
            BASE64.encode(&self.ciphertext),
            self.timestamp,
        )
    }
}

/// Quick yes/no structural check
///
/// Checks that the ephemeral public key decodes to 32 bytes, the nonce to
/// 12 bytes and the ciphertext to at least one byte.
pub fn is_structurally_valid(envelope: &Envelope) -> bool {
    check_envelope(envelope).is_ok()
}

/// Decode and check an envelope's fields
///
/// ## Errors
///
/// Returns `MalformedEnvelope` naming the first field that failed.
pub fn check_envelope(envelope: &Envelope) -> Result<DecodedEnvelope> {
    let ephemeral_public_key =
        decode_fixed::<PUBLIC_KEY_SIZE>("ephemeralPublicKey", envelope.ephemeral_public_key())?;
    let nonce = decode_fixed::<NONCE_SIZE>("nonce", envelope.nonce())?;

    let ciphertext = decode_field("ciphertext", envelope.ciphertext())?;
    if ciphertext.is_empty() {
        return Err(Error::MalformedEnvelope("ciphertext is empty".into()));
    }

    Ok(DecodedEnvelope {
        key_id: envelope.key_id().to_string(),
        ephemeral_public_key,
        nonce,
        ciphertext,
        timestamp: envelope.timestamp(),
    })
}

fn decode_field(name: &str, encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| Error::MalformedEnvelope(format!("{} is not valid base64: {}", name, e)))
}

fn decode_fixed<const N: usize>(name: &str, encoded: &str) -> Result<[u8; N]> {
    let bytes = decode_field(name, encoded)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        Error::MalformedEnvelope(format!("{} must be {} bytes, got {}", name, N, len))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encrypt, KeyPair};

    fn sample() -> Envelope {
        let kp = KeyPair::generate();
        encrypt(&kp.public_bytes(), b"validate me").unwrap()
    }

    fn with_fields(base: &Envelope, eph: &str, nonce: &str, ct: &str) -> Envelope {
        Envelope::from_encoded_parts(
            base.key_id().to_string(),
            eph.to_string(),
            nonce.to_string(),
            ct.to_string(),
            base.timestamp(),
        )
    }

    #[test]
    fn test_fresh_envelope_is_valid() {
        let envelope = sample();
        assert!(is_structurally_valid(&envelope));

        let decoded = check_envelope(&envelope).unwrap();
        assert_eq!(decoded.encode(), envelope);
    }

    #[test]
    fn test_bad_base64_is_invalid() {
        let base = sample();
        let bad = with_fields(&base, "%%%", base.nonce(), base.ciphertext());
        assert!(!is_structurally_valid(&bad));
        assert!(matches!(check_envelope(&bad), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_wrong_lengths_are_invalid() {
        let base = sample();
        let short_key = BASE64.encode([7u8; 31]);
        let long_nonce = BASE64.encode([7u8; 13]);

        assert!(!is_structurally_valid(&with_fields(
            &base,
            &short_key,
            base.nonce(),
            base.ciphertext()
        )));
        assert!(!is_structurally_valid(&with_fields(
            &base,
            base.ephemeral_public_key(),
            &long_nonce,
            base.ciphertext()
        )));
    }

    #[test]
    fn test_empty_ciphertext_is_invalid() {
        let base = sample();
        let empty = with_fields(&base, base.ephemeral_public_key(), base.nonce(), "");
        assert!(!is_structurally_valid(&empty));
    }

    #[test]
    fn test_valid_structure_does_not_imply_decryptable() {
        let base = sample();
        let garbage = with_fields(
            &base,
            &BASE64.encode([9u8; 32]),
            &BASE64.encode([1u8; 12]),
            &BASE64.encode([0u8; 40]),
        );
        assert!(is_structurally_valid(&garbage));

        let kp = KeyPair::generate();
        assert!(crate::crypto::decrypt(&kp, &garbage).is_err());
    }

    #[test]
    fn test_error_names_field() {
        let base = sample();
        let bad = with_fields(&base, base.ephemeral_public_key(), "AAAA", base.ciphertext());
        match check_envelope(&bad) {
            Err(Error::MalformedEnvelope(msg)) => assert!(msg.contains("nonce"), "{}", msg),
            other => panic!("expected MalformedEnvelope, got {:?}", other),
        }
    }
}
