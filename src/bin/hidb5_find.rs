//! `hidb5-find (VIRUSTYPE|FILE) (NAME...|all) [-s|-t|--lab-id] [--lab L]
//! [--first-table]`: searches antigens, sera, or tables by name (§6). Exits
//! 0 on success, 1 on error.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use hidb5::binary::table::TableView;
use hidb5::database::Database;
use hidb5::query::{self, FindOptions, TableOrder};

#[derive(Parser)]
#[command(name = "hidb5-find", about = "Search a hidb5 database by name, lab-id, or table")]
struct Args {
    /// Virus type (e.g. A(H3N2)) to look up via the registry, or a path to a database file.
    target: String,
    /// One or more names to search for, or the literal `all`.
    #[arg(required = true)]
    names: Vec<String>,
    /// Search sera instead of antigens.
    #[arg(short = 's', long = "sera")]
    sera: bool,
    /// Search tables instead of antigens.
    #[arg(short = 't', long = "tables")]
    tables: bool,
    /// Treat `names` as lab-ids rather than antigen/serum names.
    #[arg(long = "lab-id")]
    lab_id: bool,
    /// Restrict results to this lab.
    #[arg(long)]
    lab: Option<String>,
    /// Show only the oldest table for each match.
    #[arg(long = "first-table")]
    first_table: bool,
}

fn open_target(target: &str) -> Result<Arc<Database>> {
    if Path::new(target).is_file() {
        Ok(Arc::new(Database::open(target).with_context(|| format!("opening {target}"))?))
    } else {
        hidb5::registry::get(target).with_context(|| format!("looking up virus type {target}"))
    }
}

fn lab_matches(db: &Database, tables: &[u32], lab: &Option<String>) -> bool {
    match lab {
        None => true,
        Some(lab) => tables.iter().any(|&t| db.table(t as usize).lab().eq_ignore_ascii_case(lab)),
    }
}

fn print_table_line(db: &Database, t: u32) {
    let view: TableView = db.table(t as usize);
    println!("    table {t}: {}:{}:{} {}", view.lab(), view.assay(), view.rbc(), view.date());
}

fn print_antigen_match(db: &Database, index: usize, first_table: bool) {
    let view = db.antigen(index);
    println!("antigen {index}: {}", view.name());
    let mut tables = view.tables();
    if first_table {
        if let Some(&t) = tables.iter().min_by_key(|&&t| db.table(t as usize).date()) {
            tables = vec![t];
        }
    }
    for t in tables {
        print_table_line(db, t);
    }
}

fn print_serum_match(db: &Database, index: usize, first_table: bool) {
    let view = db.serum(index);
    println!("serum {index}: {} ({})", view.name(), view.serum_id());
    let mut tables = view.tables();
    if first_table {
        if let Some(&t) = tables.iter().min_by_key(|&&t| db.table(t as usize).date()) {
            tables = vec![t];
        }
    }
    for t in tables {
        print_table_line(db, t);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let db = open_target(&args.target)?;
    let opts = FindOptions::default();
    let wants_all = args.names.iter().any(|n| n == "all");

    if args.lab_id {
        for name in &args.names {
            for index in query::find_labid(&db, name) {
                print_antigen_match(&db, index, args.first_table);
            }
        }
        return Ok(());
    }

    if args.tables {
        let all: Vec<usize> = (0..db.table_count()).collect();
        for group in query::group_tables(&db, &all, TableOrder::OldestFirst) {
            let Some(&first) = group.first() else { continue };
            let view = db.table(first);
            if let Some(lab) = &args.lab {
                if !view.lab().eq_ignore_ascii_case(lab) {
                    continue;
                }
            }
            println!("{}:{}:{} — {} tables, first {}", view.lab(), view.assay(), view.rbc(), group.len(), view.date());
        }
        return Ok(());
    }

    if args.sera {
        let indices: Vec<usize> = if wants_all {
            (0..db.serum_count()).collect()
        } else {
            args.names.iter().flat_map(|name| query::find_sera(&db, name, opts)).collect()
        };
        for index in indices {
            let tables = db.serum(index).tables();
            if lab_matches(&db, &tables, &args.lab) {
                print_serum_match(&db, index, args.first_table);
            }
        }
        return Ok(());
    }

    let indices: Vec<usize> = if wants_all {
        (0..db.antigen_count()).collect()
    } else {
        args.names.iter().flat_map(|name| query::find_antigens(&db, name, opts)).collect()
    };
    for index in indices {
        let tables = db.antigen(index).tables();
        if lab_matches(&db, &tables, &args.lab) {
            print_antigen_match(&db, index, args.first_table);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(?err, "hidb5-find failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
