//! Vaccine strain classification (§4.5): matches a season's recommended
//! vaccine names against a database, buckets the matches by passage history
//! (egg/cell/reassortant) and orders each bucket by how well-characterized
//! the match is.

use crate::chart;
use crate::database::Database;
use crate::query::{self, PassageStrictness};

/// One matched vaccine antigen: which DB antigen it resolved to, how many
/// tables reference it, the most recent of those tables' dates, and the
/// homologous sera found for it (already sorted, see [`resolve`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineMatch {
    pub antigen_index: usize,
    pub number_of_tables: usize,
    pub most_recent_table_date: String,
    pub homologous_sera: Vec<usize>,
}

/// A season's vaccine antigens, bucketed by passage history. A reassortant
/// antigen (non-empty `reassortant`) is classified as reassortant regardless
/// of its passage; otherwise egg passage vs. everything else decides the
/// bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaccineClassification {
    pub egg: Vec<VaccineMatch>,
    pub cell: Vec<VaccineMatch>,
    pub reassortant: Vec<VaccineMatch>,
}

fn most_recent_table_date(db: &Database, tables: &[u32]) -> String {
    tables
        .iter()
        .map(|&t| db.table(t as usize).date().to_string())
        .max()
        .unwrap_or_default()
}

/// Sorts homologous-serum indices for display: non-sheep sera first (the
/// NIMR "sheep sera demoted" rule), then by number of tables descending,
/// then by most recent table date descending.
fn sort_serum_indices(db: &Database, indices: &mut [usize]) {
    indices.sort_by(|&a, &b| {
        let sa = db.serum(a);
        let sb = db.serum(b);
        let sheep_a = sa.serum_species().eq_ignore_ascii_case("SHEEP");
        let sheep_b = sb.serum_species().eq_ignore_ascii_case("SHEEP");
        sheep_a.cmp(&sheep_b).then_with(|| {
            let tables_a = sa.tables();
            let tables_b = sb.tables();
            tables_b
                .len()
                .cmp(&tables_a.len())
                .then_with(|| most_recent_table_date(db, &tables_b).cmp(&most_recent_table_date(db, &tables_a)))
        })
    });
}

fn sort_matches(matches: &mut [VaccineMatch]) {
    matches.sort_by(|a, b| {
        b.number_of_tables
            .cmp(&a.number_of_tables)
            .then_with(|| b.most_recent_table_date.cmp(&a.most_recent_table_date))
    });
}

/// Matches `vaccine_names` against `chart_antigens`' names, resolves each
/// match against `db`, and classifies the resolved antigens into
/// egg/cell/reassortant buckets, each sorted by how well-characterized the
/// match is. Chart antigens whose name isn't in `vaccine_names`, or that
/// don't resolve to a DB antigen, are skipped.
pub fn resolve(db: &Database, chart_antigens: &[chart::Antigen], vaccine_names: &[String]) -> VaccineClassification {
    let mut result = VaccineClassification::default();

    for antigen in chart_antigens {
        if !vaccine_names.iter().any(|name| name == &antigen.full_name()) {
            continue;
        }
        let Some(antigen_index) = query::find_matching_antigen(db, antigen, PassageStrictness::IgnoreIfEmptyInQuery) else {
            continue;
        };
        let view = db.antigen(antigen_index);
        let tables = view.tables();
        let mut homologous_sera = query::find_homologous_sera(db, antigen_index);
        sort_serum_indices(db, &mut homologous_sera);

        let vaccine_match = VaccineMatch {
            antigen_index,
            number_of_tables: tables.len(),
            most_recent_table_date: most_recent_table_date(db, &tables),
            homologous_sera,
        };

        if !view.reassortant().is_empty() {
            result.reassortant.push(vaccine_match);
        } else if antigen.passage.is_egg() {
            result.egg.push(vaccine_match);
        } else {
            result.cell.push(vaccine_match);
        }
    }

    sort_matches(&mut result.egg);
    sort_matches(&mut result.cell);
    sort_matches(&mut result.reassortant);
    result
}
