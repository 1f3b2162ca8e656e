//! End-to-end tests driving the public API the way the CLI binaries do:
//! build a database from charts, round-trip it through a file, then query,
//! classify vaccines, and reject malformed input.

use std::io::Write;

use hidb5::build::Builder;
use hidb5::chart::{Antigen, Chart, Info, Passage, Serum, Titers};
use hidb5::database::Database;
use hidb5::error::HidbError;
use hidb5::query::{self, FindOptions, PassageStrictness, TableOrder};
use hidb5::vaccine;

fn sample_charts() -> Vec<Chart> {
    vec![
        Chart {
            info: Info {
                virus: "FLU".into(),
                virus_type: "A(H3N2)".into(),
                subset: String::new(),
                assay: "HI".into(),
                date: "2019-03-15".into(),
                lab: "CDC".into(),
                rbc_species: "TURKEY".into(),
                lineage: String::new(),
            },
            antigens: vec![
                Antigen {
                    virus_type: "A(H3N2)".into(),
                    host: "HUMAN".into(),
                    location: "BRISBANE".into(),
                    isolation: "02".into(),
                    year: "2018".into(),
                    passage: Passage::new("E3"),
                    date: Some("2018-06-01".into()),
                    lab_id: Some("CDC#201812345".into()),
                    ..Default::default()
                },
                Antigen {
                    virus_type: "A(H3N2)".into(),
                    host: "HUMAN".into(),
                    location: "SINGAPORE".into(),
                    isolation: "16".into(),
                    year: "2016".into(),
                    passage: Passage::new("MDCK1"),
                    date: Some("2016-05-12".into()),
                    ..Default::default()
                },
            ],
            sera: vec![Serum {
                virus_type: "A(H3N2)".into(),
                host: "FERRET".into(),
                location: "BRISBANE".into(),
                isolation: "02".into(),
                year: "2018".into(),
                serum_id: "F1".into(),
                serum_species: "SHEEP".into(),
                homologous_antigen: Some(0),
                ..Default::default()
            }],
            titers: Titers::new(vec![vec!["1280".into()], vec!["320".into()]]),
        },
        Chart {
            info: Info {
                virus: "FLU".into(),
                virus_type: "A(H3N2)".into(),
                subset: String::new(),
                assay: "HI".into(),
                date: "2019-07-01".into(),
                lab: "CDC".into(),
                rbc_species: "TURKEY".into(),
                lineage: String::new(),
            },
            antigens: vec![Antigen {
                virus_type: "A(H3N2)".into(),
                host: "HUMAN".into(),
                location: "BRISBANE".into(),
                isolation: "02".into(),
                year: "2018".into(),
                passage: Passage::new("E3"),
                date: Some("2018-06-01".into()),
                ..Default::default()
            }],
            sera: vec![Serum {
                virus_type: "A(H3N2)".into(),
                host: "FERRET".into(),
                location: "BRISBANE".into(),
                isolation: "02".into(),
                year: "2018".into(),
                serum_id: "F2".into(),
                serum_species: "SHEEP".into(),
                homologous_antigen: Some(0),
                ..Default::default()
            }],
            titers: Titers::new(vec![vec!["640".into()]]),
        },
    ]
}

fn build_database() -> Database {
    let mut builder = Builder::new();
    for chart in sample_charts() {
        builder.add(&chart).unwrap();
    }
    let bytes = builder.encode().unwrap();
    Database::from_binary(bytes).unwrap()
}

#[test]
fn round_trips_through_a_real_file() {
    let db = build_database();
    let mut builder = Builder::new();
    for chart in sample_charts() {
        builder.add(&chart).unwrap();
    }
    let bytes = builder.encode().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let reopened = Database::open(file.path()).unwrap();
    assert_eq!(reopened.antigen_count(), db.antigen_count());
    assert_eq!(reopened.virus_type(), "A(H3N2)");
}

#[test]
fn distinct_antigens_merge_across_tables() {
    let db = build_database();
    // BRISBANE/02/2018 appears in both charts and should merge into one antigen.
    assert_eq!(db.antigen_count(), 2);
    let merged = db.antigens().find(|a| a.isolation() == "02").unwrap();
    assert_eq!(merged.tables().len(), 2);
}

#[test]
fn find_antigens_supports_exact_and_fuzzy_queries() {
    let db = build_database();
    let exact = query::find_antigens(&db, "A/BRISBANE/02/2018", FindOptions::default());
    assert_eq!(exact.len(), 1);

    let fuzzy = FindOptions { fuzzy: true, ..Default::default() };
    let prefix = query::find_antigens(&db, "A/BRISBANE/0/2018", fuzzy);
    assert!(!prefix.is_empty());
}

#[test]
fn group_tables_orders_oldest_first() {
    let db = build_database();
    let all: Vec<usize> = (0..db.table_count()).collect();
    let groups = query::group_tables(&db, &all, TableOrder::OldestFirst);
    assert_eq!(groups.len(), 1, "both tables share (lab, assay, rbc)");
    let dates: Vec<&str> = groups[0].iter().map(|&t| db.table(t).date()).collect();
    assert_eq!(dates, vec!["2019-03-15", "2019-07-01"]);
}

#[test]
fn vaccine_resolve_classifies_egg_passage_antigen() {
    let db = build_database();
    let charts = sample_charts();
    let vaccine_names = vec![charts[0].antigens[0].full_name()];
    let classification = vaccine::resolve(&db, &charts[0].antigens, &vaccine_names);
    assert_eq!(classification.egg.len(), 1);
    assert!(classification.cell.is_empty());
    assert!(!classification.egg[0].homologous_sera.is_empty());
}

#[test]
fn find_matching_antigen_respects_passage_strictness() {
    let db = build_database();
    let charts = sample_charts();
    let found = query::find_matching_antigen(&db, &charts[0].antigens[0], PassageStrictness::Strict);
    assert!(found.is_some());
}

#[test]
fn rejects_truncated_file_instead_of_panicking() {
    let mut builder = Builder::new();
    for chart in sample_charts() {
        builder.add(&chart).unwrap();
    }
    let bytes = builder.encode().unwrap();
    let truncated = &bytes[..bytes.len() / 2];

    let err = Database::from_binary(truncated.to_vec()).unwrap_err();
    assert!(matches!(err, HidbError::BadFile { .. } | HidbError::OffsetOverflow { .. }));
}

#[test]
fn rejects_file_with_no_recognizable_signature() {
    let garbage = vec![0u8; 64];
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&garbage).unwrap();

    let err = Database::open(file.path()).unwrap_err();
    assert!(matches!(err, HidbError::BadFile { .. }));
}

#[test]
fn registry_surfaces_missing_database_as_io_error() {
    let dir = tempfile::tempdir().unwrap();
    hidb5::registry::setup(dir.path().to_path_buf());
    let err = hidb5::registry::get("A(H3N2)").unwrap_err();
    assert!(matches!(err, HidbError::Io(_)));
}
