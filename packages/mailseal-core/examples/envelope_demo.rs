//! # Envelope Demo
//!
//! Seals a message for a recipient and opens it again.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example envelope_demo
//! ```

use mailseal_core::crypto::{decrypt, encrypt, is_structurally_valid, Envelope, KeyPair};

fn main() {
    println!("=== mailseal: Envelope Demo ===\n");

    println!("Step 1: Recipient generates a key pair...");
    let recipient = KeyPair::generate();
    println!("  Public key: {}", recipient.public_base64());
    println!("  Key id:     {}", hex::encode(recipient.key_id()));
    println!();

    println!("Step 2: Sender encrypts for the recipient's public key...");
    let envelope = encrypt(&recipient.public_bytes(), b"hello world").expect("encrypt failed");
    let json = envelope.to_json().expect("serialize failed");
    println!("  {}", json);
    println!();

    println!("Step 3: Envelope travels as JSON and is validated on arrival...");
    let received = Envelope::from_json(&json).expect("parse failed");
    println!("  Structurally valid: {}", is_structurally_valid(&received));
    println!();

    println!("Step 4: Recipient decrypts...");
    let plaintext = decrypt(&recipient, &received).expect("decrypt failed");
    println!("  Plaintext: {}", String::from_utf8_lossy(&plaintext));
    println!();

    println!("Step 5: Someone else tries...");
    let stranger = KeyPair::generate();
    match decrypt(&stranger, &received) {
        Ok(_) => println!("  Unexpectedly decrypted!"),
        Err(e) => println!("  Rejected: {} (code {})", e, e.code()),
    }
}
