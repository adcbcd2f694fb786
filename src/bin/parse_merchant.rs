// src/bin/parse_merchant.rs
//
// Shows how merchant names parse: one JSON object per name. Names come from
// the arguments, or from stdin (one per line) when none are given.
use anyhow::{Context, Result};
use blocking_lib::parsing::classify::{classify, matching_types};
use blocking_lib::parsing::parse_merchant;
use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Print the parse of merchant names as JSON lines",
    long_about = None
)]
struct ParseArgs {
    /// Names to parse; read from stdin when empty
    names: Vec<String>,

    /// Also list every type whose signals matched, not only the winner
    #[arg(long)]
    all_types: bool,
}

fn describe(name: &str, all_types: bool) -> serde_json::Value {
    let parsed = parse_merchant(name);
    let classification = classify(&parsed.normalized);
    let mut value = json!({
        "raw_name": parsed.raw_name,
        "normalized": parsed.normalized,
        "merchant_type": parsed.merchant_type,
        "signal": classification.signal.map(|s| s.to_string()),
        "core": parsed.core,
        "suffix": parsed.suffix,
        "locality": parsed.locality,
        "block_key": parsed.block_key().to_string(),
    });
    if all_types {
        value["matching_types"] = json!(matching_types(&parsed.normalized));
    }
    value
}

fn main() -> Result<()> {
    env_logger::init();
    let args = ParseArgs::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.names.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("Failed to read name from stdin")?;
            writeln!(out, "{}", describe(&line, args.all_types))?;
        }
    } else {
        for name in &args.names {
            writeln!(out, "{}", describe(name, args.all_types))?;
        }
    }
    Ok(())
}
