//! `hidb5-dates FILE`: prints the date range and a per-year histogram of
//! antigen dates in a database (§6).

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hidb5::database::Database;
use hidb5::date::format_date;

#[derive(Parser)]
#[command(name = "hidb5-dates", about = "Print the date range and per-year histogram of a hidb5 database")]
struct Args {
    file: PathBuf,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let db = Database::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;

    let mut min = None;
    let mut max = None;
    let mut histogram: BTreeMap<String, usize> = BTreeMap::new();
    for antigen in db.antigens() {
        for &date in &antigen.dates() {
            min = Some(min.map_or(date, |m: u32| m.min(date)));
            max = Some(max.map_or(date, |m: u32| m.max(date)));
            let year = format_date(date)[..4].to_string();
            *histogram.entry(year).or_default() += 1;
        }
    }

    match (min, max) {
        (Some(min), Some(max)) => println!("range: {} .. {}", format_date(min), format_date(max)),
        _ => println!("range: (no dated antigens)"),
    }
    for (year, count) in histogram {
        println!("{year}: {count}");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb5-dates failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
