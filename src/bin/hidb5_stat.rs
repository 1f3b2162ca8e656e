//! `hidb5-stat --start D --end D OUT.json`: per-(virus_type, lab, date,
//! continent) antigen counts across every subtype known to the registry
//! (§6).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use hidb5::{locationdb, query, HidbError};

const SUBTYPES: &[&str] = &["A(H3N2)", "A(H1N1)", "B"];

#[derive(Parser)]
#[command(name = "hidb5-stat", about = "Count antigens by virus type, lab, date, and continent")]
struct Args {
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
    outfile: PathBuf,
}

#[derive(Debug, Serialize)]
struct StatRow {
    virus_type: String,
    lab: String,
    date: String,
    continent: String,
    count: usize,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut rows: Vec<StatRow> = Vec::new();

    for &virus_type in SUBTYPES {
        let db = match hidb5::registry::get(virus_type) {
            Ok(db) => db,
            Err(HidbError::Io(_)) => {
                tracing::warn!(virus_type, "no database for subtype, skipping");
                continue;
            }
            Err(err) => return Err(err).context("opening registry database"),
        };

        let mut counts: std::collections::BTreeMap<(String, String, String), usize> = std::collections::BTreeMap::new();
        for &index in &query::date_range(&db, &args.start, &args.end) {
            let antigen = db.antigen(index);
            let continent = locationdb::continent(antigen.location());
            for &table in &antigen.tables() {
                let view = db.table(table as usize);
                let key = (view.lab().to_string(), view.date().to_string(), continent.clone());
                *counts.entry(key).or_default() += 1;
            }
        }

        for ((lab, date, continent), count) in counts {
            rows.push(StatRow { virus_type: virus_type.to_string(), lab, date, continent, count });
        }
    }

    let json = serde_json::to_string_pretty(&rows).context("serializing stats")?;
    std::fs::write(&args.outfile, json).with_context(|| format!("writing {}", args.outfile.display()))?;
    tracing::info!(outfile = %args.outfile.display(), rows = rows.len(), "wrote stats");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb5-stat failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
