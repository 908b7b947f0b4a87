//! Subcommand implementations
//!
//! Each command writes its result to `out` so the binary can hand in stdout
//! and the tests a buffer. Diagnostics go through `tracing` (stderr).

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use color_eyre::eyre::{eyre, Result, WrapErr};
use mailseal_core::crypto::{
    check_envelope, decrypt, decrypt_batch, encrypt, parse_public_key_base64,
};
use mailseal_core::{Envelope, KeyFiles, KeyPair};
use serde::Serialize;

use crate::config::Settings;

// ============================================================================
// KEY MANAGEMENT
// ============================================================================

pub fn keygen(settings: &Settings, force: bool, out: &mut dyn Write) -> Result<()> {
    let files = settings.key_files();
    if files.exists() && !force {
        return Err(eyre!(
            "Key files already exist in {}; pass --force to replace them",
            files.dir().display()
        ));
    }
    let passphrase = settings.new_passphrase(None)?;
    let pair = if files.exists() {
        tracing::warn!("Replacing existing key files in {}", files.dir().display());
        files.rotate(&passphrase)?
    } else {
        files.provision(&passphrase)?
    };
    writeln!(out, "{}", pair.public_base64())?;
    Ok(())
}

/// Replace the key pair, keeping the passphrase
///
/// The current passphrase must unlock the existing files first.
pub fn rotate(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let files = settings.key_files();
    let passphrase = settings.passphrase()?;
    files
        .unlock(&passphrase)
        .wrap_err("Could not unlock the current key pair")?;
    let pair = files.rotate(&passphrase)?;
    writeln!(out, "{}", pair.public_base64())?;
    Ok(())
}

pub fn change_passphrase(
    settings: &Settings,
    new_passphrase: Option<String>,
    out: &mut dyn Write,
) -> Result<()> {
    let files = settings.key_files();
    let old = settings.passphrase()?;
    let new = settings.replacement_passphrase(new_passphrase)?;
    if *new == *old {
        return Err(eyre!("New passphrase is the same as the current one"));
    }
    files.change_passphrase(&old, &new)?;
    writeln!(out, "Passphrase changed")?;
    Ok(())
}

pub fn public_key(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let public = settings.key_files().read_public_key()?;
    writeln!(out, "{}", mailseal_core::crypto::public_key_to_base64(&public))?;
    Ok(())
}

pub fn verify(settings: &Settings, out: &mut dyn Write) -> Result<()> {
    let pair = unlock(&settings.key_files(), settings)?;
    writeln!(out, "OK {}", hex_key_id(&pair))?;
    Ok(())
}

// ============================================================================
// ENVELOPES
// ============================================================================

/// Seal input for `to`, or for the stored public key
pub fn encrypt_input(
    settings: &Settings,
    to: Option<String>,
    input: Option<PathBuf>,
    out: &mut dyn Write,
) -> Result<()> {
    let recipient = match to {
        Some(encoded) => {
            parse_public_key_base64(&encoded).wrap_err("Invalid recipient public key")?
        }
        None => settings.key_files().read_public_key()?,
    };
    let plaintext = zeroize::Zeroizing::new(read_input(input.as_deref())?);
    let envelope = encrypt(&recipient, &plaintext)?;
    writeln!(out, "{}", envelope.to_json()?)?;
    Ok(())
}

/// One element of batch decrypt output
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchItem {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    plaintext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
}

/// Open one envelope, or a JSON array of envelopes
///
/// A single envelope's plaintext is written raw. An array produces one JSON
/// line per element with base64 plaintext or the element's error; a failed
/// element does not stop the rest.
pub fn decrypt_input(
    settings: &Settings,
    input: Option<PathBuf>,
    out: &mut dyn Write,
) -> Result<()> {
    let text = String::from_utf8(read_input(input.as_deref())?)
        .wrap_err("Envelope input is not UTF-8")?;
    let pair = unlock(&settings.key_files(), settings)?;

    if text.trim_start().starts_with('[') {
        let envelopes: Vec<Envelope> =
            serde_json::from_str(&text).wrap_err("Input is not an array of envelopes")?;
        let results = decrypt_batch(&pair, &envelopes);
        let failed = results.iter().filter(|r| r.is_err()).count();

        for (index, result) in results.into_iter().enumerate() {
            let item = match result {
                Ok(plaintext) => BatchItem {
                    index,
                    plaintext: Some(STANDARD.encode(&*plaintext)),
                    error: None,
                    code: None,
                },
                Err(e) => BatchItem {
                    index,
                    plaintext: None,
                    error: Some(e.to_string()),
                    code: Some(e.code()),
                },
            };
            writeln!(out, "{}", serde_json::to_string(&item)?)?;
        }
        tracing::info!("Decrypted {} of {} envelopes", envelopes.len() - failed, envelopes.len());
        return Ok(());
    }

    let envelope = Envelope::from_json(&text)?;
    let plaintext = decrypt(&pair, &envelope)?;
    out.write_all(&plaintext)?;
    Ok(())
}

/// Structural check only; no key is needed
pub fn validate(input: Option<PathBuf>, out: &mut dyn Write) -> Result<()> {
    let text = String::from_utf8(read_input(input.as_deref())?)
        .wrap_err("Envelope input is not UTF-8")?;
    let decoded = Envelope::from_json(&text).and_then(|e| check_envelope(&e))?;
    writeln!(
        out,
        "valid: key {} sealed {} ({} bytes)",
        decoded.key_id,
        mailseal_core::time::format_millis(decoded.timestamp),
        decoded.ciphertext.len()
    )?;
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn unlock(files: &KeyFiles, settings: &Settings) -> Result<KeyPair> {
    let passphrase = settings.passphrase()?;
    let pair = files.unlock(&passphrase).map_err(|e| {
        if e.is_authentication_failure() {
            eyre!("Wrong passphrase or damaged private key file")
        } else {
            color_eyre::Report::new(e)
        }
    })?;
    tracing::debug!("Unlocked key {}", hex_key_id(&pair));
    Ok(pair)
}

fn hex_key_id(pair: &KeyPair) -> String {
    hex::encode(pair.key_id())
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            fs::read(path).wrap_err_with(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
