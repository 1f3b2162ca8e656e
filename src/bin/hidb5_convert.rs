//! `hidb5-convert IN.json OUT.bin`: re-serializes the `hidb-v5` JSON
//! intermediate form to the binary container (§6). `.xz` handling is the
//! caller's concern — this tool operates on already-decompressed files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hidb5::json::HidbJson;

#[derive(Parser)]
#[command(name = "hidb5-convert", about = "Convert a hidb-v5 JSON database to the binary container")]
struct Args {
    /// Input hidb-v5 JSON file.
    infile: PathBuf,
    /// Output binary database path.
    outfile: PathBuf,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let raw = std::fs::read(&args.infile).with_context(|| format!("reading {}", args.infile.display()))?;
    let doc: HidbJson = serde_json::from_slice(&raw).with_context(|| format!("parsing {}", args.infile.display()))?;
    let bytes = hidb5::json::encode_to_binary(&doc).context("encoding database")?;
    std::fs::write(&args.outfile, &bytes).with_context(|| format!("writing {}", args.outfile.display()))?;
    tracing::info!(
        infile = %args.infile.display(),
        outfile = %args.outfile.display(),
        bytes = bytes.len(),
        "converted database"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb5-convert failed");
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
