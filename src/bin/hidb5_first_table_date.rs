//! `hidb5-first-table-date [--db-dir D] PREFIX`: emits one CSV per subtype
//! of the oldest table date for each `(lab, assay, rbc)` group (§6).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hidb5::query::{self, TableOrder};
use hidb5::HidbError;

const SUBTYPES: &[&str] = &["A(H3N2)", "A(H1N1)", "B"];

#[derive(Parser)]
#[command(name = "hidb5-first-table-date", about = "Emit per-subtype CSVs of first-table dates by (lab, assay, rbc)")]
struct Args {
    /// Override the registry's database directory (default `$HOME/AD/data`).
    #[arg(long = "db-dir")]
    db_dir: Option<PathBuf>,
    /// Output filename prefix; one `{PREFIX}-{subtype}.csv` is written per subtype.
    prefix: String,
}

fn subtype_key(virus_type: &str) -> &'static str {
    match virus_type {
        "A(H3N2)" => "h3",
        "A(H1N1)" => "h1",
        "B" => "b",
        _ => "unknown",
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    if let Some(dir) = &args.db_dir {
        hidb5::registry::setup(dir.clone());
    }

    for &virus_type in SUBTYPES {
        let db = match hidb5::registry::get(virus_type) {
            Ok(db) => db,
            Err(HidbError::Io(_)) => {
                tracing::warn!(virus_type, "no database for subtype, skipping");
                continue;
            }
            Err(err) => return Err(err).context("opening registry database"),
        };

        let all: Vec<usize> = (0..db.table_count()).collect();
        let groups = query::group_tables(&db, &all, TableOrder::OldestFirst);

        let mut csv = String::from("lab,assay,rbc,first_date\n");
        for group in groups {
            let Some(&first) = group.first() else { continue };
            let view = db.table(first);
            csv.push_str(&format!("{},{},{},{}\n", view.lab(), view.assay(), view.rbc(), view.date()));
        }

        let path = format!("{}-{}.csv", args.prefix, subtype_key(virus_type));
        std::fs::write(&path, &csv).with_context(|| format!("writing {path}"))?;
        tracing::info!(path, "wrote first-table-date csv");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb5-first-table-date failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
