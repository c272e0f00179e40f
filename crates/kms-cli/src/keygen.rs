//! # Keygen Subcommand
//!
//! Generates fresh key material in the shape a catalog algorithm requires
//! and emits it as a private JWK, ready for `kms roundtrip --import` or any
//! other importer.
//!
//! ## Security Invariant
//!
//! The JWK text is held in a `Zeroizing` buffer and wiped after writing.
//! Written files are created owner-readable only on Unix.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use kms_crypto::{resolve, KeyMaterial};

/// Arguments for the `kms keygen` subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Catalog identifier the key is for, e.g. `A256GCM/A256KW` or `ES384`.
    #[arg(long, short)]
    pub algorithm: String,

    /// Write the JWK to this file instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Execute the keygen subcommand.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let jwk = generate_jwk(&args.algorithm)?;
    match &args.out {
        Some(path) => {
            write_secret(path, &jwk)?;
            println!("OK: wrote private JWK to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(jwk.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(0)
}

/// Generate a private JWK for `algorithm`.
pub fn generate_jwk(algorithm: &str) -> Result<Zeroizing<String>> {
    let spec = resolve(algorithm)?;
    let material = KeyMaterial::generate(spec.key_shape())
        .with_context(|| format!("failed to generate {} key", spec.key_shape()))?;
    let jwk = material
        .to_private_jwk()
        .to_json()
        .context("failed to serialize JWK")?;
    tracing::info!(algorithm = %spec, shape = %spec.key_shape(), "generated private JWK");
    Ok(jwk)
}

fn write_secret(path: &Path, jwk: &str) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create key file: {}", path.display()))?;
    file.write_all(jwk.as_bytes())
        .with_context(|| format!("failed to write key file: {}", path.display()))?;
    Ok(())
}
