//! # Roundtrip Subcommand
//!
//! Drives one pool of an in-memory service through its whole life: create,
//! generate or import the first material key, encrypt→decrypt (or
//! sign→verify) under it, then rotate `--rotations` times. After each
//! rotation every message produced so far is opened again, so old keys are
//! shown to stay usable for decrypt/verify while new messages go to the
//! newest key.

use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use kms_core::{ElasticKeyId, MaterialKeyId};
use kms_crypto::{resolve, AlgorithmFamily};
use kms_service::{CreatePool, KeyPoolService, RequestContext, ServiceConfig};

/// Arguments for the `kms roundtrip` subcommand.
#[derive(Args, Debug)]
pub struct RoundtripArgs {
    /// Catalog identifier of the pool algorithm.
    #[arg(long, short)]
    pub algorithm: String,

    /// Message to encrypt or sign.
    #[arg(long, short, default_value = "hello, elastic key pool")]
    pub message: String,

    /// Context bound into the protected header.
    #[arg(long)]
    pub context: Option<String>,

    /// Import this private JWK as the first key instead of generating one.
    #[arg(long, value_name = "FILE")]
    pub import: Option<PathBuf>,

    /// Number of key rotations after the first key.
    #[arg(long, default_value_t = 0)]
    pub rotations: u32,
}

/// What a completed round-trip did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundtripReport {
    pub pool: ElasticKeyId,
    /// Material keys in creation order.
    pub keys: Vec<MaterialKeyId>,
    /// Successful open operations across all rounds.
    pub opened: usize,
}

/// Execute the roundtrip subcommand.
pub fn run_roundtrip(args: &RoundtripArgs, config: ServiceConfig) -> Result<u8> {
    let report = roundtrip(args, config)?;
    println!(
        "OK: {} pool {}: {} key(s), {} message(s) opened",
        args.algorithm,
        report.pool,
        report.keys.len(),
        report.opened
    );
    Ok(0)
}

/// Run the round-trip and report what it did.
pub fn roundtrip(args: &RoundtripArgs, config: ServiceConfig) -> Result<RoundtripReport> {
    let spec = resolve(&args.algorithm)?;
    let service = KeyPoolService::in_memory(config).context("failed to build service")?;
    let ctx = RequestContext::background();

    let request = CreatePool::new("roundtrip", "kms roundtrip", spec.identifier())
        .import_allowed(args.import.is_some())
        .versioning_allowed(args.rotations > 0);
    let pool = service.create_pool(&ctx, &request)?;

    let first = match &args.import {
        Some(path) => {
            let jwk = Zeroizing::new(
                std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read JWK: {}", path.display()))?,
            );
            service.import_material_key(&ctx, pool.id, &jwk)?
        }
        None => match service.list_material_keys(&ctx, pool.id)?.pop() {
            Some(initial) => initial,
            None => service.generate_material_key(&ctx, pool.id)?,
        },
    };
    let mut keys = vec![first.material_key_id];

    let message = args.message.as_bytes();
    let context = args.context.as_deref().map(str::as_bytes);
    let mut produced: Vec<(MaterialKeyId, String)> = Vec::new();
    let mut opened = 0;

    for round in 0..=args.rotations {
        if round > 0 {
            let rotated = service.generate_material_key(&ctx, pool.id)?;
            tracing::info!(round, key = %rotated.material_key_id, "rotated");
            keys.push(rotated.material_key_id);
        }
        let current = *keys.last().context("pool has no material key")?;

        let compact = match spec.family() {
            AlgorithmFamily::Signature => service.sign(&ctx, pool.id, message, context)?,
            AlgorithmFamily::KeyWrap | AlgorithmFamily::Direct => {
                service.encrypt(&ctx, pool.id, message, context)?
            }
        };
        produced.push((current, compact));

        for (kid, compact) in &produced {
            let (opened_by, payload_ok, context_ok) = match spec.family() {
                AlgorithmFamily::Signature => {
                    let verified = service.verify(&ctx, pool.id, compact)?;
                    (
                        verified.material_key_id,
                        verified.payload == message,
                        verified.context.as_deref() == context,
                    )
                }
                AlgorithmFamily::KeyWrap | AlgorithmFamily::Direct => {
                    let decrypted = service.decrypt(&ctx, pool.id, compact)?;
                    (
                        decrypted.material_key_id,
                        decrypted.plaintext.as_slice() == message,
                        decrypted.context.as_deref() == context,
                    )
                }
            };
            ensure!(payload_ok, "round {round}: opened payload differs from input");
            ensure!(context_ok, "round {round}: opened context differs from input");
            if opened_by != *kid {
                bail!("round {round}: message for key {kid} was opened by {opened_by}");
            }
            opened += 1;
        }
        println!("  round {round}: key {current}, {} message(s) opened", produced.len());
    }

    Ok(RoundtripReport {
        pool: pool.id,
        keys,
        opened,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(algorithm: &str) -> RoundtripArgs {
        RoundtripArgs {
            algorithm: algorithm.into(),
            message: "payload".into(),
            context: None,
            import: None,
            rotations: 0,
        }
    }

    #[test]
    fn generated_key_encrypt_decrypt() {
        let report = roundtrip(&args("A256GCM/A256KW"), ServiceConfig::default()).unwrap();
        assert_eq!(report.keys.len(), 1);
        assert_eq!(report.opened, 1);
    }

    #[test]
    fn signature_with_context_and_rotations() {
        let mut a = args("HS384");
        a.context = Some("tenant-7".into());
        a.rotations = 2;
        let report = roundtrip(&a, ServiceConfig::default()).unwrap();
        assert_eq!(report.keys.len(), 3);
        // 1 + 2 + 3 messages opened across three rounds.
        assert_eq!(report.opened, 6);
    }

    #[test]
    fn initial_key_from_config_is_reused() {
        let config = ServiceConfig {
            generate_initial_key: true,
            ..ServiceConfig::default()
        };
        let report = roundtrip(&args("A128GCM/dir"), config).unwrap();
        assert_eq!(report.keys.len(), 1);
    }

    #[test]
    fn imported_key_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ed.jwk");
        std::fs::write(&path, crate::keygen::generate_jwk("EdDSA").unwrap().as_bytes()).unwrap();

        let mut a = args("EdDSA");
        a.import = Some(path);
        a.rotations = 1;
        let report = roundtrip(&a, ServiceConfig::default()).unwrap();
        assert_eq!(report.keys.len(), 2);
        assert_eq!(report.opened, 3);
    }

    #[test]
    fn mismatched_import_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hs.jwk");
        std::fs::write(&path, crate::keygen::generate_jwk("HS256").unwrap().as_bytes()).unwrap();

        let mut a = args("ES256");
        a.import = Some(path);
        let err = roundtrip(&a, ServiceConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid key material"));
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(roundtrip(&args("RS999"), ServiceConfig::default()).is_err());
    }
}
