//! Minimal chart collaborator types (§6: "chart parsing ... provides
//! antigen/serum/titer iterators and a virus-type/lineage string").
//!
//! A real antigenic-cartography chart reader is out of scope; this module
//! gives the builder something concrete to consume and gives the test suite
//! fixtures to build with.

use std::fmt;

/// Passage category, used by the vaccine resolver to bucket antigens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassageKind {
    #[default]
    Unknown,
    Egg,
    Cell,
}

#[derive(Debug, Clone, Default)]
pub struct Passage {
    pub raw: String,
    pub kind: PassageKind,
}

impl Passage {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let kind = if raw.to_ascii_uppercase().contains('E') && !raw.is_empty() {
            PassageKind::Egg
        } else if raw.is_empty() {
            PassageKind::Unknown
        } else {
            PassageKind::Cell
        };
        Self { raw, kind }
    }

    pub fn is_egg(&self) -> bool {
        self.kind == PassageKind::Egg
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A single antigen as produced by chart parsing.
#[derive(Debug, Clone, Default)]
pub struct Antigen {
    pub virus_type: String,
    pub host: String,
    pub location: String,
    pub isolation: String,
    pub year: String,
    pub reassortant: String,
    pub passage: Passage,
    pub annotations: Vec<String>,
    pub lineage: String,
    pub date: Option<String>,
    pub lab_id: Option<String>,
    distinct: bool,
}

impl Antigen {
    pub fn distinct(&self) -> bool {
        self.distinct
    }

    pub fn mark_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `host/location/isolation/year`, or the bare slash-form when host is empty.
    pub fn full_name(&self) -> String {
        if self.host.is_empty() {
            format!("{}/{}/{}/{}", self.virus_type, self.location, self.isolation, self.year)
        } else {
            format!(
                "{}/{}/{}/{}/{}",
                self.virus_type, self.host, self.location, self.isolation, self.year
            )
        }
    }
}

/// A single serum as produced by chart parsing.
#[derive(Debug, Clone, Default)]
pub struct Serum {
    pub virus_type: String,
    pub host: String,
    pub location: String,
    pub isolation: String,
    pub year: String,
    pub reassortant: String,
    pub annotations: Vec<String>,
    pub lineage: String,
    pub serum_id: String,
    pub serum_species: String,
    /// Antigen this serum was raised against, if the chart records it.
    pub homologous_antigen: Option<usize>,
    distinct: bool,
}

impl Serum {
    pub fn distinct(&self) -> bool {
        self.distinct
    }

    pub fn mark_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn full_name(&self) -> String {
        if self.host.is_empty() {
            format!("{}/{}/{}/{}", self.virus_type, self.location, self.isolation, self.year)
        } else {
            format!(
                "{}/{}/{}/{}/{}",
                self.virus_type, self.host, self.location, self.isolation, self.year
            )
        }
    }
}

/// Chart-level metadata: identifies which table a chart's titers belong to.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub virus: String,
    pub virus_type: String,
    pub subset: String,
    pub assay: String,
    pub date: String,
    pub lab: String,
    pub rbc_species: String,
    pub lineage: String,
}

/// Dense antigen-by-serum titer matrix, row-major (one row per antigen).
#[derive(Debug, Clone, Default)]
pub struct Titers {
    pub rows: Vec<Vec<String>>,
}

impl Titers {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn number_of_antigens(&self) -> usize {
        self.rows.len()
    }

    pub fn number_of_sera(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn longest(&self) -> usize {
        self.rows.iter().flatten().map(String::len).max().unwrap_or(0)
    }
}

/// One chart: a table's worth of antigens, sera and titers.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    pub info: Info,
    pub antigens: Vec<Antigen>,
    pub sera: Vec<Serum>,
    pub titers: Titers,
}
