//! The query engine: name-parsed lookup, fuzzy fallback, lab-id search,
//! date-range scan, chart-matching, homologous-serum resolution, and table
//! grouping/statistics. See SPEC_FULL.md §4.3.
//!
//! Every entry point here takes a `&Database` and returns antigen/serum/
//! table section indices (or views derived from them) in section-index
//! order — the ordering guarantee from §5: stable across runs because it is
//! just the identity sort order the binary container already carries.

use std::collections::HashSet;

use crate::binary::table::{self, TableView};
use crate::chart;
use crate::database::Database;
use crate::date;
use crate::names::{self, SlashSplit};

/// The components of a query name, as parsed by [`parse_query_name`]. Any
/// component the grammar didn't supply is `None` and is simply not filtered
/// on, per the fallback chain described in §4.3.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryName {
    pub host: Option<String>,
    pub location: Option<String>,
    pub isolation: Option<String>,
    pub year: Option<String>,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parses a query string through the generic `VT/HOST/LOC/ISO/YEAR` grammar
/// first, then the CDC short form `LL ISO`/`LL-ISO`, then a raw slash-split
/// by arity, exactly the fallback chain §4.3 specifies for query-side
/// parsing (the query engine never fails here; it degrades).
pub fn parse_query_name(name: &str) -> QueryName {
    if let Ok(parsed) = names::virus_name_split(name) {
        return QueryName {
            host: non_empty(parsed.host),
            location: non_empty(parsed.location),
            isolation: non_empty(parsed.isolation),
            year: non_empty(parsed.year),
        };
    }
    if let Some((location, isolation)) = names::split_cdc_name(name) {
        return QueryName {
            host: None,
            location: Some(location),
            isolation: Some(isolation),
            year: None,
        };
    }
    match names::slash_split(name) {
        SlashSplit::LocationOnly { location } => QueryName { location: Some(location), ..Default::default() },
        SlashSplit::LocationIsolation { location, isolation } => QueryName {
            location: Some(location),
            isolation: Some(isolation),
            ..Default::default()
        },
        SlashSplit::HostLocationIsolation { host, location, isolation } => QueryName {
            host: Some(host),
            location: Some(location),
            isolation: Some(isolation),
            ..Default::default()
        },
        SlashSplit::TooManyParts => {
            tracing::warn!(name, "too many slash-separated parts in query name, skipping");
            QueryName::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Retry an empty isolation match using the query isolation as a prefix
    /// of the stored isolation.
    pub fuzzy: bool,
    /// Pass the location token through [`crate::locationdb::find`] before
    /// searching.
    pub fix_location: bool,
}

/// First index `i` in `0..count` for which `less(i)` is false, assuming
/// `less` is true on a prefix and false afterwards — the "branch-free
/// lower-bound lookup" of §4.1/§4.3, expressed over indices rather than raw
/// offset bytes so it works uniformly over antigen and serum views.
fn lower_bound(count: usize, mut less: impl FnMut(usize) -> bool) -> usize {
    let mut lo = 0usize;
    let mut hi = count;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if less(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// The subset of accessors shared by [`crate::binary::antigen::AntigenView`]
/// and [`crate::binary::serum::SerumView`] that the name-parsed search needs.
trait Named<'a> {
    fn location(&self) -> &'a str;
    fn isolation(&self) -> &'a str;
    fn year(&self) -> &'a str;
}

impl<'a> Named<'a> for crate::binary::antigen::AntigenView<'a> {
    fn location(&self) -> &'a str {
        crate::binary::antigen::AntigenView::location(self)
    }
    fn isolation(&self) -> &'a str {
        crate::binary::antigen::AntigenView::isolation(self)
    }
    fn year(&self) -> &'a str {
        crate::binary::antigen::AntigenView::year(self)
    }
}

impl<'a> Named<'a> for crate::binary::serum::SerumView<'a> {
    fn location(&self) -> &'a str {
        crate::binary::serum::SerumView::location(self)
    }
    fn isolation(&self) -> &'a str {
        crate::binary::serum::SerumView::isolation(self)
    }
    fn year(&self) -> &'a str {
        crate::binary::serum::SerumView::year(self)
    }
}

/// Shared search over one section's sorted run: a location lower-bound
/// range, narrowed by an exact isolation filter (falling back to a prefix
/// filter in fuzzy mode when the exact filter is empty), narrowed again by
/// an exact year filter. Records are visited in section-index order, so the
/// result is already in the §5 ordering guarantee.
fn search_section<'a, V: Named<'a>>(count: usize, at: impl Fn(usize) -> V, query: &QueryName, fuzzy: bool) -> Vec<usize> {
    let Some(location) = &query.location else {
        return Vec::new();
    };
    let lo = lower_bound(count, |i| at(i).location() < location.as_str());
    let hi = lower_bound(count, |i| at(i).location() <= location.as_str());
    let mut run: Vec<usize> = (lo..hi).collect();

    if let Some(isolation) = &query.isolation {
        let exact: Vec<usize> = run.iter().copied().filter(|&i| at(i).isolation() == isolation).collect();
        run = if exact.is_empty() && fuzzy {
            run.into_iter().filter(|&i| at(i).isolation().starts_with(isolation.as_str())).collect()
        } else {
            exact
        };
    }
    if let Some(year) = &query.year {
        run.retain(|&i| at(i).year() == year);
    }
    run
}

/// Finds antigens matching a query name, in section-index order.
pub fn find_antigens(db: &Database, name: &str, opts: FindOptions) -> Vec<usize> {
    let mut query = parse_query_name(name);
    if opts.fix_location {
        if let Some(location) = &query.location {
            query.location = Some(crate::locationdb::find(location));
        }
    }
    search_section(db.antigen_count(), |i| db.antigen(i), &query, opts.fuzzy)
}

/// Finds sera matching a query name, in section-index order.
pub fn find_sera(db: &Database, name: &str, opts: FindOptions) -> Vec<usize> {
    let mut query = parse_query_name(name);
    if opts.fix_location {
        if let Some(location) = &query.location {
            query.location = Some(crate::locationdb::find(location));
        }
    }
    search_section(db.serum_count(), |i| db.serum(i), &query, opts.fuzzy)
}

/// Lab-id search (§4.3): if the query already has a `#`, it's used
/// literally; otherwise the engine probes `CDC#`, `MELB#`, `NIID#` in turn
/// and stops at the first prefix that yields any match, finally falling
/// back to the literal query.
pub fn find_labid(db: &Database, query: &str) -> Vec<usize> {
    if query.contains('#') {
        return scan_labid(db, query);
    }
    for prefix in ["CDC#", "MELB#", "NIID#"] {
        let candidate = format!("{prefix}{query}");
        let hits = scan_labid(db, &candidate);
        if !hits.is_empty() {
            return hits;
        }
    }
    scan_labid(db, query)
}

fn scan_labid(db: &Database, target: &str) -> Vec<usize> {
    (0..db.antigen_count()).filter(|&i| db.antigen(i).lab_ids().contains(&target)).collect()
}

/// Antigens whose raw date falls in `[first, after_last)`. Empty bounds
/// default to §4.3's `10000101`/`30000101`.
pub fn date_range(db: &Database, first: &str, after_last: &str) -> Vec<usize> {
    let lo = if first.is_empty() { date::MIN_DATE } else { date::parse_date(first).unwrap_or(date::MIN_DATE) };
    let hi = if after_last.is_empty() {
        date::MAX_DATE
    } else {
        date::parse_date(after_last).unwrap_or(date::MAX_DATE)
    };
    (0..db.antigen_count())
        .filter(|&i| db.antigen(i).dates().iter().any(|&d| d >= lo && d < hi))
        .collect()
}

/// Passage-matching policy used when joining a chart antigen to a DB
/// antigen (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageStrictness {
    Strict,
    IgnoreIfEmptyInQuery,
    AlwaysIgnore,
}

fn annotations_match(stored: &[&str], query: &[String]) -> bool {
    let mut stored: Vec<&str> = stored.to_vec();
    stored.sort_unstable();
    let mut query: Vec<&str> = query.iter().map(String::as_str).collect();
    query.sort_unstable();
    stored == query
}

/// Finds the first DB antigen matching a chart antigen's name, annotations,
/// reassortant and (subject to `strictness`) passage. A chart antigen
/// flagged "distinct" never matches (§4.3).
pub fn find_matching_antigen(db: &Database, chart_antigen: &chart::Antigen, strictness: PassageStrictness) -> Option<usize> {
    if chart_antigen.distinct() {
        return None;
    }
    let candidates = find_antigens(db, &chart_antigen.full_name(), FindOptions::default());
    candidates.into_iter().find(|&i| {
        let view = db.antigen(i);
        let passage_ok = match strictness {
            PassageStrictness::Strict => view.passage() == chart_antigen.passage.raw,
            PassageStrictness::IgnoreIfEmptyInQuery => {
                chart_antigen.passage.raw.is_empty() || view.passage() == chart_antigen.passage.raw
            }
            PassageStrictness::AlwaysIgnore => true,
        };
        passage_ok
            && view.reassortant() == chart_antigen.reassortant
            && annotations_match(&view.annotations(), &chart_antigen.annotations)
    })
}

/// Serum analogue of [`find_matching_antigen`], keyed on `serum_id`. A
/// chart serum_id of `"UNKNOWN"` additionally matches a stored empty
/// serum_id, per §4.3.
pub fn find_matching_serum(db: &Database, chart_serum: &chart::Serum, _strictness: PassageStrictness) -> Option<usize> {
    if chart_serum.distinct() {
        return None;
    }
    let candidates = find_sera(db, &chart_serum.full_name(), FindOptions::default());
    candidates.into_iter().find(|&i| {
        let view = db.serum(i);
        let serum_id_ok =
            view.serum_id() == chart_serum.serum_id || (chart_serum.serum_id == "UNKNOWN" && view.serum_id().is_empty());
        serum_id_ok
            && view.reassortant() == chart_serum.reassortant
            && annotations_match(&view.annotations(), &chart_serum.annotations)
    })
}

/// Sera whose `(location, isolation, year)` match the given antigen's and
/// whose stored homologous-antigen list contains it (§4.3).
pub fn find_homologous_sera(db: &Database, antigen_index: usize) -> Vec<usize> {
    let antigen = db.antigen(antigen_index);
    let (location, isolation, year) = (antigen.location(), antigen.isolation(), antigen.year());
    (0..db.serum_count())
        .filter(|&i| {
            let serum = db.serum(i);
            serum.location() == location
                && serum.isolation() == isolation
                && serum.year() == year
                && serum.homologous_antigens().contains(&(antigen_index as u32))
        })
        .collect()
}

/// Table ordering direction for [`group_tables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOrder {
    OldestFirst,
    RecentFirst,
}

fn group_key(view: &TableView) -> (&str, &str, &str) {
    (view.lab(), view.assay(), view.rbc())
}

/// Sorts `indices` by `(lab, assay, rbc, date)` — date ascending or
/// descending per `order` — then run-length-partitions the sorted sequence
/// into groups keyed by `(lab, assay, rbc)`. Group order is first-occurrence
/// order in the sorted sequence; per-group order is the date direction.
/// Regrouping an already-grouped, flattened sequence reproduces the same
/// groups (§8 invariant 8).
pub fn group_tables(db: &Database, indices: &[usize], order: TableOrder) -> Vec<Vec<usize>> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        let ta = db.table(a);
        let tb = db.table(b);
        group_key(&ta).cmp(&group_key(&tb)).then_with(|| match order {
            TableOrder::OldestFirst => ta.date().cmp(tb.date()),
            TableOrder::RecentFirst => tb.date().cmp(ta.date()),
        })
    });

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current_key: Option<(String, String, String)> = None;
    for idx in sorted {
        let view = db.table(idx);
        let (lab, assay, rbc) = group_key(&view);
        let key = (lab.to_string(), assay.to_string(), rbc.to_string());
        if current_key.as_ref() == Some(&key) {
            groups.last_mut().unwrap().push(idx);
        } else {
            groups.push(vec![idx]);
            current_key = Some(key);
        }
    }
    groups
}

/// The table with the most recent date among `indices`, or `None` if empty.
pub fn most_recent(db: &Database, indices: &[usize]) -> Option<usize> {
    indices.iter().copied().max_by(|&a, &b| db.table(a).date().cmp(db.table(b).date()))
}

/// The table with the oldest date among `indices`, or `None` if empty.
pub fn oldest(db: &Database, indices: &[usize]) -> Option<usize> {
    indices.iter().copied().min_by(|&a, &b| db.table(a).date().cmp(db.table(b).date()))
}

/// An aggregate over a group of tables sharing `(assay, lab, rbc)`: count,
/// most recent date, oldest date. Backs `hidb5-stat`; see §4.3 supplemental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStat {
    pub assay: String,
    pub lab: String,
    pub rbc: String,
    pub count: usize,
    pub most_recent_date: String,
    pub oldest_date: String,
}

impl TableStat {
    /// `"{lab}:{assay}"`, with the rbc abbreviated (`"tu"`/`"gp"`) appended
    /// only for the HI assay.
    pub fn title(&self) -> String {
        let abbreviation = table::rbc_abbreviation(&self.assay, &self.rbc);
        if abbreviation.is_empty() {
            format!("{}:{}", self.lab, self.assay)
        } else {
            format!("{}:{}:{}", self.lab, self.assay, abbreviation)
        }
    }
}

/// Groups `indices` by `(assay, lab, rbc)` (a different grouping order from
/// [`group_tables`], per §4.3 supplemental) and reports per-group stats.
pub fn table_stats(db: &Database, indices: &[usize]) -> Vec<TableStat> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        let ta = db.table(a);
        let tb = db.table(b);
        (ta.assay(), ta.lab(), ta.rbc()).cmp(&(tb.assay(), tb.lab(), tb.rbc()))
    });

    let mut stats: Vec<TableStat> = Vec::new();
    let mut current: Option<(String, String, String)> = None;
    for idx in sorted {
        let view = db.table(idx);
        let key = (view.assay().to_string(), view.lab().to_string(), view.rbc().to_string());
        if current.as_ref() != Some(&key) {
            stats.push(TableStat {
                assay: key.0.clone(),
                lab: key.1.clone(),
                rbc: key.2.clone(),
                count: 0,
                most_recent_date: String::new(),
                oldest_date: view.date().to_string(),
            });
            current = Some(key);
        }
        let stat = stats.last_mut().unwrap();
        stat.count += 1;
        if view.date() > stat.most_recent_date.as_str() {
            stat.most_recent_date = view.date().to_string();
        }
        if stat.oldest_date.is_empty() || view.date() < stat.oldest_date.as_str() {
            stat.oldest_date = view.date().to_string();
        }
    }
    stats
}

/// Within one table, the antigens that are also named by a serum present in
/// the same table (§4.3 supplemental; "reference antigens").
pub fn reference_antigens(db: &Database, table_index: usize) -> Vec<usize> {
    let view = db.table(table_index);
    let serum_names: HashSet<String> = view.sera().into_iter().map(|s| db.serum(s as usize).name()).collect();
    view.antigens()
        .into_iter()
        .filter(|&a| serum_names.contains(&db.antigen(a as usize).name()))
        .collect()
}
