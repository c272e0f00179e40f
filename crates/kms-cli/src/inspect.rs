//! # Inspect Subcommand
//!
//! Decodes the protected header of a compact JWE (five segments) or JWS
//! (three segments) without touching any key. The `ctx` header is shown
//! both as sent and decoded.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use kms_crypto::{JweMessage, JwsMessage};

/// Arguments for the `kms inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// The compact serialization to decode.
    #[arg(value_name = "COMPACT")]
    pub compact: String,
}

/// The decoded view of one compact message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub format: &'static str,
    pub header: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let inspection = inspect(args.compact.trim())?;
    println!("{}", serde_json::to_string_pretty(&inspection)?);
    Ok(0)
}

/// Decode `compact` into its header view.
pub fn inspect(compact: &str) -> Result<Inspection> {
    let (format, header, context) = match compact.split('.').count() {
        5 => {
            let message = JweMessage::parse(compact).context("not a well-formed compact JWE")?;
            let context = message.context().context("JWE ctx is not base64url")?;
            ("JWE", serde_json::to_value(message.header())?, context)
        }
        3 => {
            let message = JwsMessage::parse(compact).context("not a well-formed compact JWS")?;
            let context = message.context().context("JWS ctx is not base64url")?;
            ("JWS", serde_json::to_value(message.header())?, context)
        }
        n => bail!("expected 5 (JWE) or 3 (JWS) segments, found {n}"),
    };
    Ok(Inspection {
        format,
        header,
        context: context.map(|c| String::from_utf8_lossy(&c).into_owned()),
    })
}
