//! The opened, immutable database: header + three sections over an
//! in-memory byte buffer. See SPEC_FULL.md §4.1 and §5 (resource model).

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::binary::antigen::AntigenView;
use crate::binary::section::Section;
use crate::binary::serum::SerumView;
use crate::binary::table::{self, TableView};
use crate::binary::{self, Header};
use crate::error::{HidbError, Result};
use crate::json;

/// Owns the raw bytes of one opened database file. Reader handles
/// ([`AntigenView`], [`SerumView`], [`TableView`]) borrow from the shared
/// buffer and are valid for as long as this `Database` (or a clone of its
/// `Arc`) is alive — producing one that outlives the buffer is prevented by
/// the borrow checker, not left as a documented hazard.
pub struct Database {
    bytes: Arc<Vec<u8>>,
    header: Header,
    antigen_section_len: usize,
    serum_section_len: usize,
}

impl Database {
    /// Opens a file, auto-detecting binary vs. the `hidb-v5` JSON
    /// intermediate form (§6: "File-version autodetection").
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(HidbError::Io)?;
        if binary::has_signature(&raw) {
            Self::from_binary(raw)
        } else if json::looks_like_hidb_json(&raw) {
            let doc: json::HidbJson = serde_json::from_slice(&raw)?;
            let bytes = json::encode_to_binary(&doc)?;
            Self::from_binary(bytes)
        } else {
            Err(HidbError::BadFile { path: path.to_path_buf() })
        }
    }

    pub fn from_binary(bytes: Vec<u8>) -> Result<Self> {
        let header = Header::read(&bytes)?;
        let section_at = |offset: u32| -> Result<&[u8]> {
            bytes
                .get(offset as usize..)
                .ok_or_else(|| HidbError::BadFile { path: "<memory>".into() })
        };
        let (antigens, _) = Section::parse(section_at(header.antigen_section_offset)?)?;
        let (sera, _) = Section::parse(section_at(header.serum_section_offset)?)?;
        let (tables, _) = Section::parse(section_at(header.table_section_offset)?)?;

        let db = Self {
            bytes: Arc::new(bytes),
            header,
            antigen_section_len: antigens.len(),
            serum_section_len: sera.len(),
        };
        db.validate_cross_section_indices()?;
        Ok(db)
    }

    fn raw(&self) -> &[u8] {
        &self.bytes
    }

    pub fn virus_type(&self) -> &str {
        &self.header.virus_type
    }

    fn antigen_section(&self) -> Section<'_> {
        Section::parse(&self.raw()[self.header.antigen_section_offset as usize..]).unwrap().0
    }

    fn serum_section(&self) -> Section<'_> {
        Section::parse(&self.raw()[self.header.serum_section_offset as usize..]).unwrap().0
    }

    fn table_section(&self) -> Section<'_> {
        Section::parse(&self.raw()[self.header.table_section_offset as usize..]).unwrap().0
    }

    pub fn antigen_count(&self) -> usize {
        self.antigen_section_len
    }

    pub fn serum_count(&self) -> usize {
        self.serum_section_len
    }

    pub fn table_count(&self) -> usize {
        self.table_section().len()
    }

    pub fn antigen(&self, index: usize) -> AntigenView<'_> {
        AntigenView::new(self.antigen_section().record(index))
    }

    pub fn serum(&self, index: usize) -> SerumView<'_> {
        SerumView::new(self.serum_section().record(index))
    }

    pub fn table(&self, index: usize) -> TableView<'_> {
        TableView::new(self.table_section().record(index))
    }

    pub fn antigens(&self) -> impl Iterator<Item = AntigenView<'_>> {
        (0..self.antigen_count()).map(move |i| self.antigen(i))
    }

    pub fn sera(&self) -> impl Iterator<Item = SerumView<'_>> {
        (0..self.serum_count()).map(move |i| self.serum(i))
    }

    pub fn tables(&self) -> impl Iterator<Item = TableView<'_>> {
        (0..self.table_count()).map(move |i| self.table(i))
    }

    /// Invariant 3: every index stored in a record is within range of the
    /// section it references.
    fn validate_cross_section_indices(&self) -> Result<()> {
        let table_count = self.table_count();
        let antigen_count = self.antigen_count();
        let serum_count = self.serum_count();

        for antigen in self.antigens() {
            for t in antigen.tables() {
                if t as usize >= table_count {
                    return Err(HidbError::BadFile { path: "<memory>".into() });
                }
            }
        }
        for serum in self.sera() {
            for t in serum.tables() {
                if t as usize >= table_count {
                    return Err(HidbError::BadFile { path: "<memory>".into() });
                }
            }
            for a in serum.homologous_antigens() {
                if a as usize >= antigen_count {
                    return Err(HidbError::BadFile { path: "<memory>".into() });
                }
            }
        }
        for t in self.tables() {
            table::validate_indices(&t, antigen_count, serum_count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Builder;
    use crate::chart::{Antigen, Chart, Info, Passage, Serum, Titers};

    fn two_table_chart() -> Vec<Chart> {
        vec![Chart {
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
            antigens: vec![Antigen {
                virus_type: "A(H3N2)".into(),
                host: "HUMAN".into(),
                location: "ALGIERS".into(),
                isolation: "1".into(),
                year: "2019".into(),
                passage: Passage::new("MDCK1"),
                date: Some("2019-03-15".into()),
                lab_id: Some("CDC#201812345".into()),
                ..Default::default()
            }],
            sera: vec![Serum {
                virus_type: "A(H3N2)".into(),
                host: "FERRET".into(),
                location: "ALGIERS".into(),
                isolation: "1".into(),
                year: "2019".into(),
                serum_id: "F1".into(),
                serum_species: "SHEEP".into(),
                homologous_antigen: Some(0),
                ..Default::default()
            }],
            titers: Titers::new(vec![vec!["160".into()]]),
        }]
    }

    #[test]
    fn round_trips_through_a_binary_file() {
        let mut builder = Builder::new();
        for chart in two_table_chart() {
            builder.add(&chart).unwrap();
        }
        let bytes = builder.encode().unwrap();
        let db = Database::from_binary(bytes).unwrap();
        assert_eq!(db.antigen_count(), 1);
        assert_eq!(db.serum_count(), 1);
        assert_eq!(db.table_count(), 1);
        assert_eq!(db.antigen(0).isolation(), "1");
        assert_eq!(db.virus_type(), "A(H3N2)");
    }
}
