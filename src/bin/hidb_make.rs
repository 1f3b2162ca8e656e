//! `hidb-make OUTFILE CHART...`: builds a database from one or more chart
//! files and writes the binary container to `OUTFILE`. Exits 0 on success,
//! 2 on error (§6).
//!
//! Chart parsing itself is out of scope (§6 names it an external
//! collaborator); this binary reads a small JSON chart schema sufficient to
//! drive the builder end to end, rather than a real cartography file format.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use hidb5::build::Builder;
use hidb5::chart::{Antigen, Chart, Info, Passage, Serum, Titers};

#[derive(Parser)]
#[command(name = "hidb-make", about = "Build a hidb5 database from chart files")]
struct Args {
    /// Output binary database path.
    outfile: PathBuf,
    /// One or more chart files (JSON).
    #[arg(required = true)]
    charts: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ChartFileAntigen {
    #[serde(default)]
    host: String,
    location: String,
    isolation: String,
    year: String,
    #[serde(default)]
    reassortant: String,
    #[serde(default)]
    passage: String,
    #[serde(default)]
    annotations: Vec<String>,
    #[serde(default)]
    lineage: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    lab_id: Option<String>,
    #[serde(default)]
    distinct: bool,
}

#[derive(Debug, Deserialize)]
struct ChartFileSerum {
    #[serde(default)]
    host: String,
    location: String,
    isolation: String,
    year: String,
    #[serde(default)]
    reassortant: String,
    #[serde(default)]
    annotations: Vec<String>,
    #[serde(default)]
    lineage: String,
    serum_id: String,
    #[serde(default)]
    serum_species: String,
    #[serde(default)]
    homologous_antigen: Option<usize>,
    #[serde(default)]
    distinct: bool,
}

#[derive(Debug, Deserialize)]
struct ChartFile {
    virus: String,
    virus_type: String,
    #[serde(default)]
    subset: String,
    assay: String,
    date: String,
    lab: String,
    rbc_species: String,
    #[serde(default)]
    lineage: String,
    antigens: Vec<ChartFileAntigen>,
    sera: Vec<ChartFileSerum>,
    titers: Vec<Vec<String>>,
}

fn into_chart(virus_type: &str, file: ChartFile) -> Chart {
    let antigens = file
        .antigens
        .into_iter()
        .map(|a| {
            let antigen = Antigen {
                virus_type: virus_type.to_string(),
                host: a.host,
                location: a.location,
                isolation: a.isolation,
                year: a.year,
                reassortant: a.reassortant,
                passage: Passage::new(a.passage),
                annotations: a.annotations,
                lineage: a.lineage,
                date: a.date,
                lab_id: a.lab_id,
                ..Default::default()
            };
            if a.distinct {
                antigen.mark_distinct()
            } else {
                antigen
            }
        })
        .collect();

    let sera = file
        .sera
        .into_iter()
        .map(|s| {
            let serum = Serum {
                virus_type: virus_type.to_string(),
                host: s.host,
                location: s.location,
                isolation: s.isolation,
                year: s.year,
                reassortant: s.reassortant,
                annotations: s.annotations,
                lineage: s.lineage,
                serum_id: s.serum_id,
                serum_species: s.serum_species,
                homologous_antigen: s.homologous_antigen,
                ..Default::default()
            };
            if s.distinct {
                serum.mark_distinct()
            } else {
                serum
            }
        })
        .collect();

    Chart {
        info: Info {
            virus: file.virus,
            virus_type: virus_type.to_string(),
            subset: file.subset,
            assay: file.assay,
            date: file.date,
            lab: file.lab,
            rbc_species: file.rbc_species,
            lineage: file.lineage,
        },
        antigens,
        sera,
        titers: Titers::new(file.titers),
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut builder = Builder::new();

    for path in &args.charts {
        let raw = std::fs::read(path).with_context(|| format!("reading chart {}", path.display()))?;
        let file: ChartFile = serde_json::from_slice(&raw).with_context(|| format!("parsing chart {}", path.display()))?;
        let virus_type = file.virus_type.clone();
        let chart = into_chart(&virus_type, file);
        builder.add(&chart).with_context(|| format!("adding chart {}", path.display()))?;
        tracing::info!(path = %path.display(), "added chart");
    }

    let bytes = builder.encode().context("encoding database")?;
    std::fs::write(&args.outfile, &bytes).with_context(|| format!("writing {}", args.outfile.display()))?;
    tracing::info!(outfile = %args.outfile.display(), bytes = bytes.len(), "wrote database");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb-make failed");
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
