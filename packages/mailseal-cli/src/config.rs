// Settings resolved from flags, environment and platform defaults

use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Result};
use mailseal_core::KeyFiles;
use zeroize::Zeroizing;

/// Name of the key directory under the platform data dir
const APP_DIR: &str = "mailseal";

/// Reads a secret from the user
pub type Prompt = fn(&str) -> Result<Zeroizing<String>>;

pub struct Settings {
    key_dir: PathBuf,
    passphrase: Option<Zeroizing<String>>,
    prompt: Prompt,
}

impl Settings {
    pub fn resolve(key_dir: Option<PathBuf>, passphrase: Option<String>) -> Result<Self> {
        let key_dir = match key_dir {
            Some(dir) => dir,
            None => default_key_dir()
                .ok_or_else(|| eyre!("Could not determine a data directory; pass --key-dir"))?,
        };
        Ok(Self {
            key_dir,
            passphrase: passphrase.map(Zeroizing::new),
            prompt: terminal_prompt,
        })
    }

    /// Replace the terminal prompt (tests feed answers through this)
    #[cfg(test)]
    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    pub fn key_files(&self) -> KeyFiles {
        KeyFiles::new(&self.key_dir)
    }

    /// The configured passphrase, or one read from the terminal
    pub fn passphrase(&self) -> Result<Zeroizing<String>> {
        match &self.passphrase {
            Some(p) => Ok(p.clone()),
            None => (self.prompt)("Passphrase: "),
        }
    }

    /// A passphrase for sealing; prompted twice when interactive
    pub fn new_passphrase(&self, given: Option<String>) -> Result<Zeroizing<String>> {
        if given.is_none() {
            if let Some(p) = &self.passphrase {
                return Ok(p.clone());
            }
        }
        self.replacement_passphrase(given)
    }

    /// A passphrase to replace the configured one
    ///
    /// Never falls back to `--passphrase`, which names the current one.
    pub fn replacement_passphrase(&self, given: Option<String>) -> Result<Zeroizing<String>> {
        if let Some(p) = given {
            return Ok(Zeroizing::new(p));
        }
        let first = (self.prompt)("New passphrase: ")?;
        let second = (self.prompt)("Repeat passphrase: ")?;
        if *first != *second {
            return Err(eyre!("Passphrases do not match"));
        }
        Ok(first)
    }
}

/// `<data dir>/mailseal`, e.g. `~/.local/share/mailseal` on Linux
pub fn default_key_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

fn terminal_prompt(label: &str) -> Result<Zeroizing<String>> {
    let value = Zeroizing::new(rpassword::prompt_password(label)?);
    if value.is_empty() {
        return Err(eyre!("Empty passphrase"));
    }
    Ok(value)
}
