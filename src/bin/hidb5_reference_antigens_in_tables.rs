//! `hidb5-reference-antigens-in-tables [--start D]`: emits a canonical CSV
//! of reference antigens per table, across every subtype known to the
//! registry (§4.3 supplemental).

use anyhow::{Context, Result};
use clap::Parser;

use hidb5::date::parse_date;
use hidb5::query;
use hidb5::HidbError;

const SUBTYPES: &[&str] = &["A(H3N2)", "A(H1N1)", "B"];

#[derive(Parser)]
#[command(name = "hidb5-reference-antigens-in-tables", about = "Emit a CSV of reference antigens per table")]
struct Args {
    /// Only consider tables on or after this date (`YYYYMMDD` or `YYYY-MM-DD`).
    #[arg(long)]
    start: Option<String>,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let start = args.start.as_deref().map(parse_date).transpose().context("parsing --start")?;

    println!("virus_type,lab,assay,date,antigen");
    for &virus_type in SUBTYPES {
        let db = match hidb5::registry::get(virus_type) {
            Ok(db) => db,
            Err(HidbError::Io(_)) => {
                tracing::warn!(virus_type, "no database for subtype, skipping");
                continue;
            }
            Err(err) => return Err(err).context("opening registry database"),
        };

        for table_index in 0..db.table_count() {
            let view = db.table(table_index);
            if let Some(start) = start {
                if parse_date(view.date()).map_or(true, |d| d < start) {
                    continue;
                }
            }
            for antigen_index in query::reference_antigens(&db, table_index) {
                let antigen = db.antigen(antigen_index);
                println!("{virus_type},{},{},{},{}", view.lab(), view.assay(), view.date(), antigen.name());
            }
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb5-reference-antigens-in-tables failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
