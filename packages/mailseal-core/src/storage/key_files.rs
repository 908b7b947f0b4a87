//! # Key Files
//!
//! The holder's key pair on disk.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KEY DIRECTORY                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  public.key    base64 public key, plain text, one line                 │
//! │                                                                         │
//! │  private.key   VaultBlob as JSON                                       │
//! │                { "salt", "iv", "authTag", "ciphertext" } (hex)         │
//! │                owner read/write only on Unix                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No plaintext private key material is ever written. Files are replaced
//! by writing a temporary sibling and renaming it over the original, so a
//! sealed blob is never modified in place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crypto::{
    open_private_key, parse_public_key_base64, public_key_to_base64, seal_private_key,
    verify_key_pair, KeyPair, VaultBlob, PUBLIC_KEY_SIZE,
};
use crate::error::{Error, Result};

/// File name of the public key
pub const PUBLIC_KEY_FILE: &str = "public.key";

/// File name of the sealed private key
pub const PRIVATE_KEY_FILE: &str = "private.key";

/// Key files in one directory
#[derive(Debug, Clone)]
pub struct KeyFiles {
    dir: PathBuf,
}

impl KeyFiles {
    /// Key files rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The key directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the public key file
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Path of the sealed private key file
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Check if either key file is present
    pub fn exists(&self) -> bool {
        self.public_key_path().exists() || self.private_key_path().exists()
    }

    /// Generate a key pair and write both files
    ///
    /// ## Errors
    ///
    /// Refuses with `StorageWriteError` if key files already exist; use
    /// [`KeyFiles::rotate`] to replace them.
    pub fn provision(&self, passphrase: &str) -> Result<KeyPair> {
        if self.exists() {
            return Err(Error::StorageWriteError(format!(
                "key files already exist in {}",
                self.dir.display()
            )));
        }
        let pair = KeyPair::generate();
        self.write_pair(&pair, passphrase)?;
        tracing::info!("Provisioned key pair {}", hex::encode(pair.key_id()));
        Ok(pair)
    }

    /// Replace the stored key pair with a freshly generated one
    ///
    /// Envelopes sealed for the old public key can no longer be opened
    /// from these files afterwards.
    pub fn rotate(&self, passphrase: &str) -> Result<KeyPair> {
        let pair = KeyPair::generate();
        self.write_pair(&pair, passphrase)?;
        tracing::info!("Rotated to key pair {}", hex::encode(pair.key_id()));
        Ok(pair)
    }

    /// Read the public key file
    pub fn read_public_key(&self) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        let text = read_file(&self.public_key_path())?;
        parse_public_key_base64(&text)
            .map_err(|e| Error::StorageCorrupted(format!("{}: {}", PUBLIC_KEY_FILE, e)))
    }

    /// Read the sealed private key file
    pub fn read_vault_blob(&self) -> Result<VaultBlob> {
        let text = read_file(&self.private_key_path())?;
        VaultBlob::from_json(&text)
            .map_err(|e| Error::StorageCorrupted(format!("{}: {}", PRIVATE_KEY_FILE, e)))
    }

    /// Open the private key and check it against the public key file
    ///
    /// ## Errors
    ///
    /// - `AuthenticationFailure`: wrong passphrase or tampered blob
    /// - `StorageCorrupted`: the files do not belong together
    pub fn unlock(&self, passphrase: &str) -> Result<KeyPair> {
        let public = self.read_public_key()?;
        let blob = self.read_vault_blob()?;
        let secret = open_private_key(&blob, passphrase)?;

        if !verify_key_pair(&public, &secret) {
            return Err(Error::StorageCorrupted(
                "private key does not match public key".into(),
            ));
        }
        let pair = KeyPair::from_secret_slice(&secret)?;
        tracing::debug!("Unlocked key pair {}", hex::encode(pair.key_id()));
        Ok(pair)
    }

    /// Reseal the private key under a new passphrase
    ///
    /// The key pair itself is unchanged; only the private key file is
    /// replaced.
    pub fn change_passphrase(&self, old_passphrase: &str, new_passphrase: &str) -> Result<()> {
        let pair = self.unlock(old_passphrase)?;
        let blob = seal_private_key(&*pair.secret_bytes(), new_passphrase)?;
        write_private(&self.private_key_path(), &blob.to_json()?)?;
        tracing::info!("Changed passphrase for key pair {}", hex::encode(pair.key_id()));
        Ok(())
    }

    fn write_pair(&self, pair: &KeyPair, passphrase: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::StorageWriteError(format!("create {}: {}", self.dir.display(), e))
        })?;

        let blob = seal_private_key(&*pair.secret_bytes(), passphrase)?;

        // Private first: a crash in between leaves a mismatch that unlock()
        // reports, never a public key without its private half.
        write_private(&self.private_key_path(), &blob.to_json()?)?;
        write_atomic(
            &self.public_key_path(),
            &format!("{}\n", public_key_to_base64(&pair.public_bytes())),
            0o644,
        )
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::StorageNotFound(path.display().to_string()),
        _ => Error::StorageReadError(format!("{}: {}", path.display(), e)),
    })
}

fn write_private(path: &Path, contents: &str) -> Result<()> {
    write_atomic(path, contents, 0o600)
}

/// Write `contents` to a temporary sibling created with `mode`, then
/// rename it over `path`
fn write_atomic(path: &Path, contents: &str, mode: u32) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let map_err =
        |e: std::io::Error| Error::StorageWriteError(format!("{}: {}", path.display(), e));

    // A stale temp file from an interrupted write keeps its old mode
    match fs::remove_file(&tmp) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(map_err(e)),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(&tmp).map_err(map_err)?;
    file.write_all(contents.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(map_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(map_err)
}

// ============================================================================
// TESTS
// ============================================================================
