//! The builder: ingests charts, deduplicates and sorts antigens/sera/tables,
//! and assigns indices exactly once before serialization. See
//! SPEC_FULL.md §4.2 and the "back-pointer graphs during build" design note.
//!
//! Antigens, sera and tables each live in an arena (`Vec<Entry>`, stable
//! indices for the lifetime of the build); back-references between them are
//! arena indices, not the final section indices, which don't exist until
//! [`Builder::finalize`] sorts each arena and resolves every reference.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::binary::antigen::AntigenFields;
use crate::binary::serum::SerumFields;
use crate::binary::table::TableFields;
use crate::binary::{self, Header};
use crate::chart::Chart;
use crate::error::{HidbError, Result};
use crate::names::split_cdc_name;

type AntigenKey = (String, String, String, String, String, String, String, String);
type SerumKey = (String, String, String, String, String, String, String, String);
type TableKey = (String, String, String, String, String, String, String, String);

#[derive(Debug, Clone, Default)]
struct AntigenEntry {
    virus_type: String,
    host: String,
    location: String,
    isolation: String,
    year: String,
    reassortant: String,
    passage: String,
    annotations: Vec<String>,
    lineage: Option<char>,
    dates: BTreeSet<u32>,
    lab_ids: BTreeSet<String>,
    tables: BTreeSet<usize>,
}

impl AntigenEntry {
    fn annotations_joined(&self) -> String {
        self.annotations.join(" ")
    }

    fn identity(&self) -> AntigenKey {
        (
            self.virus_type.clone(),
            self.host.clone(),
            self.location.clone(),
            self.isolation.clone(),
            self.year.clone(),
            self.annotations_joined(),
            self.reassortant.clone(),
            self.passage.clone(),
        )
    }

    fn sort_key(&self) -> AntigenKey {
        (
            self.location.clone(),
            self.isolation.clone(),
            self.year.clone(),
            self.host.clone(),
            self.annotations_joined(),
            self.reassortant.clone(),
            self.passage.clone(),
            String::new(),
        )
    }
}

#[derive(Debug, Clone, Default)]
struct SerumEntry {
    virus_type: String,
    host: String,
    location: String,
    isolation: String,
    year: String,
    reassortant: String,
    serum_id: String,
    serum_species: String,
    annotations: Vec<String>,
    lineage: Option<char>,
    homologous: BTreeSet<usize>,
    tables: BTreeSet<usize>,
}

impl SerumEntry {
    fn annotations_joined(&self) -> String {
        self.annotations.join(" ")
    }

    fn identity(&self) -> SerumKey {
        (
            self.virus_type.clone(),
            self.host.clone(),
            self.location.clone(),
            self.isolation.clone(),
            self.year.clone(),
            self.annotations_joined(),
            self.reassortant.clone(),
            self.serum_id.clone(),
        )
    }

    fn sort_key(&self) -> SerumKey {
        (
            self.location.clone(),
            self.isolation.clone(),
            self.year.clone(),
            self.host.clone(),
            self.annotations_joined(),
            self.reassortant.clone(),
            self.serum_id.clone(),
            String::new(),
        )
    }
}

#[derive(Debug, Clone, Default)]
struct TableEntry {
    virus: String,
    virus_type: String,
    subset: String,
    assay: String,
    date: String,
    lab: String,
    rbc_species: String,
    lineage: String,
    antigens: BTreeSet<usize>,
    sera: BTreeSet<usize>,
    titer_by_pair: HashMap<(usize, usize), String>,
}

impl TableEntry {
    fn identity(&self) -> TableKey {
        (
            self.virus.clone(),
            self.virus_type.clone(),
            self.subset.clone(),
            self.lineage.clone(),
            self.assay.clone(),
            self.lab.clone(),
            self.rbc_species.clone(),
            self.date.clone(),
        )
    }

    fn title(&self) -> String {
        format!("{}:{}:{}:{}", self.lab, self.assay, self.rbc_species, self.date)
    }
}

/// The fully resolved object model, ready to be written out as JSON or
/// encoded to the binary container. Produced once by [`Builder::finalize`].
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub virus_type: String,
    pub antigens: Vec<AntigenFields>,
    pub sera: Vec<SerumFields>,
    pub tables: Vec<TableFields>,
}

impl Model {
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        let antigen_records: Result<Vec<Vec<u8>>> = self.antigens.iter().map(binary::antigen::encode).collect();
        let serum_records: Result<Vec<Vec<u8>>> = self.sera.iter().map(binary::serum::encode).collect();
        let table_records: Result<Vec<Vec<u8>>> = self.tables.iter().map(binary::table::encode).collect();

        let antigen_section = binary::section::encode(&antigen_records?);
        let serum_section = binary::section::encode(&serum_records?);
        let table_section = binary::section::encode(&table_records?);

        let header = Header {
            antigen_section_offset: binary::HEADER_LEN as u32,
            serum_section_offset: (binary::HEADER_LEN + antigen_section.len()) as u32,
            table_section_offset: (binary::HEADER_LEN + antigen_section.len() + serum_section.len()) as u32,
            virus_type: self.virus_type.clone(),
        };

        let mut out = Vec::with_capacity(
            binary::HEADER_LEN + antigen_section.len() + serum_section.len() + table_section.len(),
        );
        header.write(&mut out)?;
        out.extend_from_slice(&antigen_section);
        out.extend_from_slice(&serum_section);
        out.extend_from_slice(&table_section);
        Ok(out)
    }
}

#[derive(Default)]
pub struct Builder {
    antigens: Vec<AntigenEntry>,
    antigen_index: HashMap<AntigenKey, usize>,
    sera: Vec<SerumEntry>,
    serum_index: HashMap<SerumKey, usize>,
    tables: Vec<TableEntry>,
    table_index: HashMap<TableKey, usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one chart: inserts its table (rejecting a duplicate
    /// identity), then its non-distinct antigens and sera, then its titers.
    pub fn add(&mut self, chart: &Chart) -> Result<()> {
        let mut table_entry = TableEntry {
            virus: chart.info.virus.clone(),
            virus_type: chart.info.virus_type.clone(),
            subset: chart.info.subset.clone(),
            assay: chart.info.assay.clone(),
            date: chart.info.date.clone(),
            lab: chart.info.lab.clone(),
            rbc_species: chart.info.rbc_species.clone(),
            lineage: chart.info.lineage.clone(),
            ..Default::default()
        };
        let key = table_entry.identity();
        if self.table_index.contains_key(&key) {
            return Err(HidbError::DuplicateTable { title: table_entry.title() });
        }

        // Antigens first: sera may reference them as homologous.
        let mut row_to_arena = vec![None; chart.antigens.len()];
        for (row, antigen) in chart.antigens.iter().enumerate() {
            if antigen.distinct() {
                continue;
            }
            let cdc_split = if antigen.location.is_empty() {
                let split = split_cdc_name(&antigen.isolation);
                if split.is_none() {
                    return Err(HidbError::UnrecognizedName { name: antigen.full_name() });
                }
                split
            } else {
                None
            };
            let arena_idx = self.upsert_antigen(antigen, cdc_split);
            row_to_arena[row] = Some(arena_idx);
        }

        let mut col_to_arena = vec![None; chart.sera.len()];
        for (col, serum) in chart.sera.iter().enumerate() {
            if serum.distinct() {
                continue;
            }
            let arena_idx = self.upsert_serum(serum);
            if let Some(homologous_row) = serum.homologous_antigen {
                if let Some(Some(antigen_arena)) = row_to_arena.get(homologous_row) {
                    self.sera[arena_idx].homologous.insert(*antigen_arena);
                }
            }
            col_to_arena[col] = Some(arena_idx);
        }

        let table_arena_idx = self.tables.len();
        for row in row_to_arena.iter().flatten() {
            table_entry.antigens.insert(*row);
            self.antigens[*row].tables.insert(table_arena_idx);
        }
        for col in col_to_arena.iter().flatten() {
            table_entry.sera.insert(*col);
            self.sera[*col].tables.insert(table_arena_idx);
        }
        for (row, ag_arena) in row_to_arena.iter().enumerate() {
            let Some(ag_arena) = ag_arena else { continue };
            for (col, sr_arena) in col_to_arena.iter().enumerate() {
                let Some(sr_arena) = sr_arena else { continue };
                if let Some(titer) = chart.titers.rows.get(row).and_then(|r| r.get(col)) {
                    table_entry.titer_by_pair.insert((*ag_arena, *sr_arena), titer.clone());
                }
            }
        }

        self.table_index.insert(key, table_arena_idx);
        self.tables.push(table_entry);
        Ok(())
    }

    /// `cdc_split`, when present, is the `(location, isolation)` recovered
    /// from the CDC short-form fallback (`LL ISO`/`LL-ISO`) and takes
    /// precedence over the chart antigen's own (empty) location/isolation.
    fn upsert_antigen(
        &mut self,
        antigen: &crate::chart::Antigen,
        cdc_split: Option<(String, String)>,
    ) -> usize {
        let (location, isolation) = match cdc_split {
            Some((location, isolation)) => (location, isolation),
            None => (antigen.location.clone(), antigen.isolation.clone()),
        };
        let entry = AntigenEntry {
            virus_type: antigen.virus_type.clone(),
            host: antigen.host.clone(),
            location,
            isolation,
            year: antigen.year.clone(),
            reassortant: antigen.reassortant.clone(),
            passage: antigen.passage.raw.clone(),
            annotations: antigen.annotations.clone(),
            lineage: antigen.lineage.chars().next(),
            dates: BTreeSet::new(),
            lab_ids: BTreeSet::new(),
            tables: BTreeSet::new(),
        };
        let key = entry.identity();
        let arena_idx = if let Some(&existing) = self.antigen_index.get(&key) {
            existing
        } else {
            let idx = self.antigens.len();
            self.antigen_index.insert(key, idx);
            self.antigens.push(entry);
            idx
        };

        let existing = &mut self.antigens[arena_idx];
        if let Some(date) = &antigen.date {
            if let Ok(parsed) = crate::date::parse_date(date) {
                existing.dates.insert(parsed);
            }
        }
        if let Some(lab_id) = &antigen.lab_id {
            existing.lab_ids.insert(lab_id.clone());
        }
        if let Some(new_lineage) = antigen.lineage.chars().next() {
            match existing.lineage {
                None => existing.lineage = Some(new_lineage),
                Some(current) if current != new_lineage => {
                    warn!(
                        location = %existing.location,
                        isolation = %existing.isolation,
                        %current,
                        %new_lineage,
                        "conflicting antigen lineages"
                    );
                }
                _ => {}
            }
        }
        arena_idx
    }

    fn upsert_serum(&mut self, serum: &crate::chart::Serum) -> usize {
        let entry = SerumEntry {
            virus_type: serum.virus_type.clone(),
            host: serum.host.clone(),
            location: serum.location.clone(),
            isolation: serum.isolation.clone(),
            year: serum.year.clone(),
            reassortant: serum.reassortant.clone(),
            serum_id: serum.serum_id.clone(),
            serum_species: serum.serum_species.clone(),
            annotations: serum.annotations.clone(),
            lineage: serum.lineage.chars().next(),
            homologous: BTreeSet::new(),
            tables: BTreeSet::new(),
        };
        let key = entry.identity();
        if let Some(&existing) = self.serum_index.get(&key) {
            if let Some(new_lineage) = serum.lineage.chars().next() {
                let current = self.sera[existing].lineage;
                match current {
                    None => self.sera[existing].lineage = Some(new_lineage),
                    Some(c) if c != new_lineage => {
                        warn!(existing, %new_lineage, "conflicting serum lineages");
                    }
                    _ => {}
                }
            }
            existing
        } else {
            let idx = self.sera.len();
            self.serum_index.insert(key, idx);
            self.sera.push(entry);
            idx
        }
    }

    /// Assigns final section indices to every antigen, serum and table, in
    /// sort order, then resolves every back-reference into those indices.
    /// This is the only place indices are assigned (§3 lifecycle rule).
    pub fn finalize(&self) -> Result<Model> {
        let mut antigen_order: Vec<usize> = (0..self.antigens.len()).collect();
        antigen_order.sort_by_key(|&i| self.antigens[i].sort_key());
        let mut antigen_final = vec![0usize; self.antigens.len()];
        for (final_idx, &arena_idx) in antigen_order.iter().enumerate() {
            antigen_final[arena_idx] = final_idx;
        }

        let mut serum_order: Vec<usize> = (0..self.sera.len()).collect();
        serum_order.sort_by_key(|&i| self.sera[i].sort_key());
        let mut serum_final = vec![0usize; self.sera.len()];
        for (final_idx, &arena_idx) in serum_order.iter().enumerate() {
            serum_final[arena_idx] = final_idx;
        }

        let mut table_order: Vec<usize> = (0..self.tables.len()).collect();
        table_order.sort_by_key(|&i| self.tables[i].identity());
        let mut table_final = vec![0usize; self.tables.len()];
        for (final_idx, &arena_idx) in table_order.iter().enumerate() {
            table_final[arena_idx] = final_idx;
        }

        let mut virus_type_votes: HashMap<&str, usize> = HashMap::new();
        for a in &self.antigens {
            *virus_type_votes.entry(a.virus_type.as_str()).or_default() += 1;
        }
        for s in &self.sera {
            *virus_type_votes.entry(s.virus_type.as_str()).or_default() += 1;
        }
        let virus_type = virus_type_votes
            .into_iter()
            .max_by_key(|&(_, count)| count)
            .map(|(vt, _)| vt.to_string())
            .unwrap_or_default();

        let mut antigens = Vec::with_capacity(self.antigens.len());
        for &arena_idx in &antigen_order {
            let entry = &self.antigens[arena_idx];
            let mut tables: Vec<u32> = entry.tables.iter().map(|&t| table_final[t] as u32).collect();
            tables.sort_unstable();
            if tables.is_empty() {
                return Err(HidbError::EmptyTableIndexList {
                    kind: "Antigen",
                    identity: format!("{}/{}/{}", entry.location, entry.isolation, entry.year),
                });
            }
            let mut lab_ids: Vec<String> = entry.lab_ids.iter().take(5).cloned().collect();
            lab_ids.sort();
            antigens.push(AntigenFields {
                virus_type: entry.virus_type.clone(),
                host: entry.host.clone(),
                location: entry.location.clone(),
                isolation: entry.isolation.clone(),
                passage: entry.passage.clone(),
                reassortant: entry.reassortant.clone(),
                annotations: entry.annotations.iter().take(3).cloned().collect(),
                lab_ids,
                dates: entry.dates.iter().copied().collect(),
                year: entry.year.clone(),
                lineage: entry.lineage,
                tables,
            });
        }

        let mut sera = Vec::with_capacity(self.sera.len());
        for &arena_idx in &serum_order {
            let entry = &self.sera[arena_idx];
            let mut tables: Vec<u32> = entry.tables.iter().map(|&t| table_final[t] as u32).collect();
            tables.sort_unstable();
            if tables.is_empty() {
                return Err(HidbError::EmptyTableIndexList {
                    kind: "Serum",
                    identity: format!("{}/{}/{}", entry.location, entry.isolation, entry.year),
                });
            }
            let mut homologous_antigens: Vec<u32> =
                entry.homologous.iter().map(|&a| antigen_final[a] as u32).collect();
            homologous_antigens.sort_unstable();
            sera.push(SerumFields {
                virus_type: entry.virus_type.clone(),
                host: entry.host.clone(),
                location: entry.location.clone(),
                isolation: entry.isolation.clone(),
                passage: String::new(),
                reassortant: entry.reassortant.clone(),
                annotations: entry.annotations.iter().take(3).cloned().collect(),
                serum_id: entry.serum_id.clone(),
                serum_species: entry.serum_species.clone(),
                year: entry.year.clone(),
                lineage: entry.lineage,
                homologous_antigens,
                tables,
            });
        }

        let mut tables = Vec::with_capacity(self.tables.len());
        for &arena_idx in &table_order {
            let entry = &self.tables[arena_idx];
            let mut ag_arena: Vec<usize> = entry.antigens.iter().copied().collect();
            ag_arena.sort_by_key(|&a| antigen_final[a]);
            let mut sr_arena: Vec<usize> = entry.sera.iter().copied().collect();
            sr_arena.sort_by_key(|&s| serum_final[s]);

            let titers = ag_arena
                .iter()
                .map(|&a| {
                    sr_arena
                        .iter()
                        .map(|&s| entry.titer_by_pair.get(&(a, s)).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();

            tables.push(TableFields {
                virus: entry.virus.clone(),
                virus_type: entry.virus_type.clone(),
                subset: entry.subset.clone(),
                assay: entry.assay.clone(),
                date: entry.date.clone(),
                lab: entry.lab.clone(),
                rbc: entry.rbc_species.clone(),
                lineage: entry.lineage.chars().next(),
                antigens: ag_arena.iter().map(|&a| antigen_final[a] as u32).collect(),
                sera: sr_arena.iter().map(|&s| serum_final[s] as u32).collect(),
                titers,
            });
        }

        Ok(Model { virus_type, antigens, sera, tables })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.finalize()?.to_binary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Antigen, Info, Passage, Serum, Titers};

    fn chart_with_table(date: &str, antigen_location: &str, antigen_year: &str, dates: Option<&str>) -> Chart {
        Chart {
            info: Info {
                virus: "FLU".into(),
                virus_type: "A(H3N2)".into(),
                subset: String::new(),
                assay: "HI".into(),
                date: date.into(),
                lab: "CDC".into(),
                rbc_species: "TURKEY".into(),
                lineage: String::new(),
            },
            antigens: vec![Antigen {
                virus_type: "A(H3N2)".into(),
                host: "HUMAN".into(),
                location: antigen_location.into(),
                isolation: "1".into(),
                year: antigen_year.into(),
                passage: Passage::new("MDCK1"),
                date: dates.map(String::from),
                ..Default::default()
            }],
            sera: vec![Serum {
                virus_type: "A(H3N2)".into(),
                host: "FERRET".into(),
                location: antigen_location.into(),
                isolation: "1".into(),
                year: antigen_year.into(),
                serum_id: "F1".into(),
                homologous_antigen: Some(0),
                ..Default::default()
            }],
            titers: Titers::new(vec![vec!["160".into()]]),
        }
    }

    #[test]
    fn scenario_s6_duplicate_table_is_an_error() {
        let mut builder = Builder::new();
        builder.add(&chart_with_table("2019-01-01", "ALGIERS", "2019", None)).unwrap();
        let err = builder.add(&chart_with_table("2019-01-01", "ALGIERS", "2019", None)).unwrap_err();
        assert!(matches!(err, HidbError::DuplicateTable { .. }));
    }

    #[test]
    fn scenario_s6_shared_antigen_unions_dates() {
        let mut builder = Builder::new();
        builder.add(&chart_with_table("2019-01-01", "ALGIERS", "2019", Some("2019-01-01"))).unwrap();
        builder.add(&chart_with_table("2019-02-01", "ALGIERS", "2019", Some("2019-02-01"))).unwrap();
        let model = builder.finalize().unwrap();
        assert_eq!(model.antigens.len(), 1);
        assert_eq!(model.antigens[0].dates.len(), 2);
        assert_eq!(model.antigens[0].tables.len(), 2);
    }

    #[test]
    fn homologous_antigens_are_populated_from_the_chart() {
        let mut builder = Builder::new();
        builder.add(&chart_with_table("2019-01-01", "ALGIERS", "2019", None)).unwrap();
        let model = builder.finalize().unwrap();
        assert_eq!(model.sera[0].homologous_antigens, vec![0]);
    }

    #[test]
    fn cdc_short_name_fallback_splits_location_and_isolation() {
        let mut chart = chart_with_table("2019-01-01", "ALGIERS", "2019", None);
        chart.antigens[0].location = String::new();
        chart.antigens[0].isolation = "CA 7".into();
        let mut builder = Builder::new();
        builder.add(&chart).unwrap();
        let model = builder.finalize().unwrap();
        assert_eq!(model.antigens.len(), 1);
        assert_eq!(model.antigens[0].location, "CA");
        assert_eq!(model.antigens[0].isolation, "7");
    }

    #[test]
    fn unrecognized_empty_location_name_is_an_error() {
        let mut chart = chart_with_table("2019-01-01", "ALGIERS", "2019", None);
        chart.antigens[0].location = String::new();
        chart.antigens[0].isolation = "CALIFORNIA 7".into();
        let mut builder = Builder::new();
        let err = builder.add(&chart).unwrap_err();
        assert!(matches!(err, HidbError::UnrecognizedName { .. }));
    }
}
