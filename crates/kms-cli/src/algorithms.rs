//! # Algorithms Subcommand
//!
//! Lists the algorithm catalog, optionally restricted to one family, as an
//! aligned table or as JSON.

use std::io::Write;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use kms_crypto::{AlgorithmCatalog, AlgorithmFamily};

/// Arguments for the `kms algorithms` subcommand.
#[derive(Args, Debug)]
pub struct AlgorithmsArgs {
    /// Only list one family: `key-wrap`, `direct`, or `signature`.
    #[arg(long, value_parser = parse_family)]
    pub family: Option<AlgorithmFamily>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One catalog entry as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRow {
    pub identifier: &'static str,
    pub family: AlgorithmFamily,
    pub key_shape: String,
    pub asymmetric: bool,
}

fn parse_family(value: &str) -> Result<AlgorithmFamily> {
    Ok(match value {
        "key-wrap" => AlgorithmFamily::KeyWrap,
        "direct" => AlgorithmFamily::Direct,
        "signature" => AlgorithmFamily::Signature,
        other => bail!("unknown family {other:?} (expected key-wrap, direct, or signature)"),
    })
}

/// Catalog entries in catalog order, filtered by `family`.
pub fn catalog_rows(family: Option<AlgorithmFamily>) -> Vec<CatalogRow> {
    AlgorithmCatalog::global()
        .entries()
        .iter()
        .filter(|spec| family.map_or(true, |f| spec.family() == f))
        .map(|spec| CatalogRow {
            identifier: spec.identifier(),
            family: spec.family(),
            key_shape: spec.key_shape().to_string(),
            asymmetric: spec.is_asymmetric(),
        })
        .collect()
}

/// Execute the algorithms subcommand.
pub fn run_algorithms(args: &AlgorithmsArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    write_algorithms(args, &mut stdout.lock())?;
    Ok(0)
}

fn write_algorithms(args: &AlgorithmsArgs, out: &mut impl Write) -> Result<()> {
    let rows = catalog_rows(args.family);
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }
    let width = rows.iter().map(|r| r.identifier.len()).max().unwrap_or(0);
    for row in &rows {
        writeln!(
            out,
            "{:<width$}  {:<9}  {}",
            row.identifier,
            row.family.as_str(),
            row.key_shape,
        )?;
    }
    tracing::info!(count = rows.len(), "listed algorithms");
    Ok(())
}
