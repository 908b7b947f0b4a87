//! # Vault Demo
//!
//! Seals a private key under a passphrase and opens it again.
//!
//! ## Run
//!
//! ```bash
//! cargo run --release --example vault_demo
//! ```

use mailseal_core::crypto::{open_private_key, seal_private_key, verify_key_pair, KeyPair};

fn main() {
    println!("=== mailseal: Vault Demo ===\n");

    let pair = KeyPair::generate();
    let passphrase = "correct-horse-battery-staple1234";

    println!("Sealing private key (PBKDF2-HMAC-SHA512, 100,000 rounds)...");
    let blob = seal_private_key(&*pair.secret_bytes(), passphrase).expect("seal failed");
    println!("{}", blob.to_json().expect("serialize failed"));
    println!();

    println!("Opening with the right passphrase...");
    let secret = open_private_key(&blob, passphrase).expect("open failed");
    println!(
        "  Matches public key: {}",
        verify_key_pair(&pair.public_bytes(), &secret)
    );
    println!();

    println!("Opening with the wrong passphrase...");
    match open_private_key(&blob, "wrong-passphrase-wrong-passphras") {
        Ok(_) => println!("  Unexpectedly opened!"),
        Err(e) => println!("  Rejected: {}", e),
    }
}
