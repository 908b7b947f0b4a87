//! Property tests for the passphrase vault.
//!
//! PBKDF2 runs 100,000 rounds per call, so case counts are kept small.

use mailseal_core::crypto::{open_private_key, seal_private_key, KeyPair, VaultBlob};
use mailseal_core::Error;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Field {
    Salt,
    Iv,
    AuthTag,
    Ciphertext,
}

fn flip_bit(blob: &VaultBlob, field: Field, bit: usize) -> VaultBlob {
    let mut blob = blob.clone();
    let bytes: &mut [u8] = match field {
        Field::Salt => &mut blob.salt,
        Field::Iv => &mut blob.iv,
        Field::AuthTag => &mut blob.auth_tag,
        Field::Ciphertext => &mut blob.ciphertext,
    };
    let bit = bit % (bytes.len() * 8);
    bytes[bit / 8] ^= 1 << (bit % 8);
    blob
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn seal_open_round_trip(key in any::<[u8; 32]>(), passphrase in "[ -~]{1,40}") {
        let blob = seal_private_key(&key, &passphrase).unwrap();
        let opened = open_private_key(&blob, &passphrase).unwrap();
        prop_assert_eq!(opened.as_slice(), &key[..]);
    }

    #[test]
    fn other_passphrase_fails(
        key in any::<[u8; 32]>(),
        passphrase in "[a-z]{8,20}",
        other in "[A-Z]{8,20}",
    ) {
        let blob = seal_private_key(&key, &passphrase).unwrap();
        prop_assert_eq!(open_private_key(&blob, &other).unwrap_err(), Error::AuthenticationFailure);
    }

    #[test]
    fn any_bit_flip_fails(
        field in prop_oneof![
            Just(Field::Salt),
            Just(Field::Iv),
            Just(Field::AuthTag),
            Just(Field::Ciphertext),
        ],
        bit in any::<usize>(),
    ) {
        let key = KeyPair::generate();
        let blob = seal_private_key(&*key.secret_bytes(), "passphrase").unwrap();
        let tampered = flip_bit(&blob, field, bit);

        prop_assert_eq!(
            open_private_key(&tampered, "passphrase").unwrap_err(),
            Error::AuthenticationFailure
        );
    }
}

#[test]
fn sealed_key_still_decrypts_mail() {
    let passphrase = "correct-horse-battery-staple1234";
    let holder = KeyPair::generate();
    let envelope = mailseal_core::crypto::encrypt(&holder.public_bytes(), b"hello world").unwrap();

    let blob = seal_private_key(&*holder.secret_bytes(), passphrase).unwrap();
    let json = blob.to_json().unwrap();

    let restored_blob = VaultBlob::from_json(&json).unwrap();
    let secret = open_private_key(&restored_blob, passphrase).unwrap();
    let restored = KeyPair::from_secret_slice(&secret).unwrap();

    assert_eq!(restored.public_bytes(), holder.public_bytes());
    let plaintext = mailseal_core::crypto::decrypt(&restored, &envelope).unwrap();
    assert_eq!(plaintext.as_slice(), b"hello world");

    assert_eq!(
        open_private_key(&restored_blob, "wrong-passphrase-wrong-passphras").unwrap_err(),
        Error::AuthenticationFailure
    );
}
