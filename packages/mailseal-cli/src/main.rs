//! mailseal command-line front end
//!
//! Generates and stores the holder's key pair, seals envelopes for a public
//! key and opens envelopes addressed to the stored key.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use config::Settings;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mailseal", version, about = "Public-key envelopes with passphrase-sealed keys")]
struct Cli {
    /// Directory holding public.key and private.key
    #[arg(long, global = true, env = "MAILSEAL_KEY_DIR")]
    key_dir: Option<PathBuf>,

    /// Passphrase protecting the private key (prompted if absent)
    #[arg(long, global = true, env = "MAILSEAL_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a key pair and store it
    Keygen {
        /// Replace existing key files
        #[arg(long)]
        force: bool,
    },
    /// Replace the stored key pair with a new one (same passphrase)
    Rotate,
    /// Reseal the private key under a new passphrase
    ChangePassphrase {
        /// New passphrase (prompted if absent)
        #[arg(long, env = "MAILSEAL_NEW_PASSPHRASE", hide_env_values = true)]
        new_passphrase: Option<String>,
    },
    /// Print the stored public key
    PublicKey,
    /// Encrypt input into an envelope (JSON on stdout)
    Encrypt {
        /// Recipient public key, base64 (defaults to the stored key)
        #[arg(long)]
        to: Option<String>,
        /// Input file (stdin if absent)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Decrypt an envelope, or a JSON array of envelopes
    Decrypt {
        /// Envelope file (stdin if absent)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Check an envelope's structure without decrypting it
    Validate {
        /// Envelope file (stdin if absent)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Check that the stored key files unlock and belong together
    Verify,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    color_eyre::install()?;

    // Logs go to stderr; stdout carries envelopes and plaintext
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailseal=info,mailseal_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(cli.key_dir, cli.passphrase)?;
    tracing::debug!("Using key directory {}", settings.key_dir().display());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Keygen { force } => commands::keygen(&settings, force, &mut out),
        Command::Rotate => commands::rotate(&settings, &mut out),
        Command::ChangePassphrase { new_passphrase } => {
            commands::change_passphrase(&settings, new_passphrase, &mut out)
        }
        Command::PublicKey => commands::public_key(&settings, &mut out),
        Command::Encrypt { to, input } => commands::encrypt_input(&settings, to, input, &mut out),
        Command::Decrypt { input } => commands::decrypt_input(&settings, input, &mut out),
        Command::Validate { input } => commands::validate(input, &mut out),
        Command::Verify => commands::verify(&settings, &mut out),
    }
}
