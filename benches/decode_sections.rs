//! Benchmark decode times for each section to see where file layout costs go.

use std::time::Instant;

use hidb5::binary::Header;
use hidb5::build::Builder;
use hidb5::chart::{Antigen, Chart, Info, Passage, Serum, Titers};
use hidb5::database::Database;

/// Builds a synthetic chart set with `tables` tables of `per_table` antigens
/// and sera each, so the benchmark doesn't depend on fixture files on disk.
fn synthetic_charts(tables: usize, per_table: usize) -> Vec<Chart> {
    (0..tables)
        .map(|t| {
            let antigens = (0..per_table)
                .map(|i| Antigen {
                    virus_type: "A(H3N2)".into(),
                    host: "HUMAN".into(),
                    location: "SINGAPORE".into(),
                    isolation: (t * per_table + i).to_string(),
                    year: "2019".into(),
                    passage: Passage::new("MDCK1"),
                    date: Some("2019-03-15".into()),
                    lab_id: Some(format!("CDC#{t}{i}")),
                    ..Default::default()
                })
                .collect::<Vec<_>>();
            let sera = (0..per_table)
                .map(|i| Serum {
                    virus_type: "A(H3N2)".into(),
                    host: "FERRET".into(),
                    location: "SINGAPORE".into(),
                    isolation: (t * per_table + i).to_string(),
                    year: "2019".into(),
                    serum_id: format!("F{t}{i}"),
                    serum_species: "SHEEP".into(),
                    homologous_antigen: Some(i),
                    ..Default::default()
                })
                .collect::<Vec<_>>();
            let rows = (0..per_table).map(|_| vec!["160".to_string(); per_table]).collect();
            Chart {
                info: Info {
                    virus: "FLU".into(),
                    virus_type: "A(H3N2)".into(),
                    subset: String::new(),
                    assay: "HI".into(),
                    date: format!("2019-03-{:02}", 1 + (t % 28)),
                    lab: "CDC".into(),
                    rbc_species: "TURKEY".into(),
                    lineage: String::new(),
                },
                antigens,
                sera,
                titers: Titers::new(rows),
            }
        })
        .collect()
}

fn encode(tables: usize, per_table: usize) -> Vec<u8> {
    let mut builder = Builder::new();
    for chart in synthetic_charts(tables, per_table) {
        builder.add(&chart).unwrap();
    }
    builder.encode().unwrap()
}

fn main() {
    // This is a test benchmark, run with: cargo test --bench decode_sections -- --nocapture
    println!("Run with: cargo test --bench decode_sections -- --nocapture");
}

#[test]
fn benchmark_section_decode_times() {
    let small = encode(5, 10);
    let large = encode(20, 30);

    println!("\n=== SECTION DECODE TIMING BENCHMARK ===\n");

    for (name, bytes) in [("SMALL (50 antigens)", &small), ("LARGE (600 antigens)", &large)] {
        println!("--- {} ({} KB) ---", name, bytes.len() / 1024);
        benchmark_sections(bytes);
        println!();
    }
}

fn benchmark_sections(bytes: &[u8]) {
    const ITERATIONS: u32 = 100;

    struct Section {
        name: &'static str,
        size: usize,
        time_ns: u128,
        deps: &'static str,
    }

    let mut results = vec![];

    // HEADER
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        let _ = Header::read(bytes).unwrap();
    }
    results.push(Section {
        name: "HEADER",
        size: hidb5::binary::HEADER_LEN,
        time_ns: start.elapsed().as_nanos() / ITERATIONS as u128,
        deps: "-",
    });

    // FULL DECODE (header + three section tables + cross-index validation)
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        let _ = Database::from_binary(bytes.to_vec()).unwrap();
    }
    results.push(Section {
        name: "FULL_DECODE",
        size: bytes.len(),
        time_ns: start.elapsed().as_nanos() / ITERATIONS as u128,
        deps: "HEADER",
    });

    let db = Database::from_binary(bytes.to_vec()).unwrap();

    // ANTIGENS (per-record view construction)
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        for i in 0..db.antigen_count() {
            let _ = db.antigen(i).name();
        }
    }
    results.push(Section {
        name: "ANTIGENS",
        size: db.antigen_count(),
        time_ns: start.elapsed().as_nanos() / ITERATIONS as u128,
        deps: "FULL_DECODE",
    });

    // SERA
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        for i in 0..db.serum_count() {
            let _ = db.serum(i).name();
        }
    }
    results.push(Section {
        name: "SERA",
        size: db.serum_count(),
        time_ns: start.elapsed().as_nanos() / ITERATIONS as u128,
        deps: "FULL_DECODE",
    });

    // TABLES
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        for i in 0..db.table_count() {
            let _ = db.table(i).date();
        }
    }
    results.push(Section {
        name: "TABLES",
        size: db.table_count(),
        time_ns: start.elapsed().as_nanos() / ITERATIONS as u128,
        deps: "FULL_DECODE",
    });

    // Print table
    println!(
        "{:<15} {:>10} {:>12} {:>10} {:<15}",
        "SECTION", "SIZE", "TIME_NS", "NS/UNIT", "DEPENDS_ON"
    );
    println!("{:-<65}", "");
    for s in &results {
        let ns_per_unit = if s.size > 0 { s.time_ns as f64 / s.size as f64 } else { 0.0 };
        println!(
            "{:<15} {:>10} {:>12} {:>10.2} {:<15}",
            s.name, s.size, s.time_ns, ns_per_unit, s.deps
        );
    }
    println!("{:-<65}", "");
    println!(
        "{:<15} {:>10} {:>12}",
        "TOTAL",
        bytes.len(),
        results.iter().map(|s| s.time_ns).sum::<u128>()
    );
}
