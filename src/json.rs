//! The `hidb-v5` JSON intermediate form: a human-diffable artifact between
//! the builder and the binary encoder, and an alternate on-disk format
//! alongside the binary container. See SPEC_FULL.md §6.
//!
//! Per the resolved Open Question there (§9): the table object's subset
//! field serializes under the distinct key `"su"` rather than reusing `"s"`,
//! which is reserved for the serum index array within a table object (the
//! source collides the two under the same letter; this crate resolves the
//! ambiguity at the type level instead of reproducing it).

use serde::{Deserialize, Serialize};

use crate::binary::antigen::AntigenFields;
use crate::binary::serum::SerumFields;
use crate::binary::table::TableFields;
use crate::build::Model;
use crate::error::Result;

pub const VERSION: &str = "hidb-v5";
const VERSION_MARKER: &str = "\"  version\": \"hidb-v5\"";
const VERSION_MARKER_SPACED: &str = "\"  version\":\"hidb-v5\"";

/// File-version autodetection (§6): does `data` look like `hidb-v5` JSON?
/// Checked as a cheap substring scan, not a full parse, since this runs
/// before we know the file is well-formed JSON at all.
pub fn looks_like_hidb_json(data: &[u8]) -> bool {
    let text = String::from_utf8_lossy(data);
    text.contains(VERSION_MARKER) || text.contains(VERSION_MARKER_SPACED)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct JsonAntigen {
    #[serde(rename = "V", default, skip_serializing_if = "String::is_empty")]
    pub virus_type: String,
    #[serde(rename = "H", default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(rename = "O", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(rename = "i", default, skip_serializing_if = "String::is_empty")]
    pub isolation: String,
    #[serde(rename = "y", default, skip_serializing_if = "String::is_empty")]
    pub year: String,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<char>,
    #[serde(rename = "P", default, skip_serializing_if = "String::is_empty")]
    pub passage: String,
    #[serde(rename = "R", default, skip_serializing_if = "String::is_empty")]
    pub reassortant: String,
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    #[serde(rename = "D", default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<u32>,
    #[serde(rename = "l", default, skip_serializing_if = "Vec::is_empty")]
    pub lab_ids: Vec<String>,
    #[serde(rename = "T", default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<u32>,
}

impl From<&AntigenFields> for JsonAntigen {
    fn from(f: &AntigenFields) -> Self {
        Self {
            virus_type: f.virus_type.clone(),
            host: f.host.clone(),
            location: f.location.clone(),
            isolation: f.isolation.clone(),
            year: f.year.clone(),
            lineage: f.lineage,
            passage: f.passage.clone(),
            reassortant: f.reassortant.clone(),
            annotations: f.annotations.clone(),
            dates: f.dates.clone(),
            lab_ids: f.lab_ids.clone(),
            tables: f.tables.clone(),
        }
    }
}

impl From<&JsonAntigen> for AntigenFields {
    fn from(j: &JsonAntigen) -> Self {
        Self {
            virus_type: j.virus_type.clone(),
            host: j.host.clone(),
            location: j.location.clone(),
            isolation: j.isolation.clone(),
            passage: j.passage.clone(),
            reassortant: j.reassortant.clone(),
            annotations: j.annotations.clone(),
            lab_ids: j.lab_ids.clone(),
            dates: j.dates.clone(),
            year: j.year.clone(),
            lineage: j.lineage,
            tables: j.tables.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct JsonSerum {
    #[serde(rename = "V", default, skip_serializing_if = "String::is_empty")]
    pub virus_type: String,
    #[serde(rename = "H", default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(rename = "O", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(rename = "i", default, skip_serializing_if = "String::is_empty")]
    pub isolation: String,
    #[serde(rename = "y", default, skip_serializing_if = "String::is_empty")]
    pub year: String,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<char>,
    #[serde(rename = "P", default, skip_serializing_if = "String::is_empty")]
    pub passage: String,
    #[serde(rename = "R", default, skip_serializing_if = "String::is_empty")]
    pub reassortant: String,
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    #[serde(rename = "I", default, skip_serializing_if = "String::is_empty")]
    pub serum_id: String,
    #[serde(rename = "s", default, skip_serializing_if = "String::is_empty")]
    pub serum_species: String,
    #[serde(rename = "h", default, skip_serializing_if = "Vec::is_empty")]
    pub homologous_antigens: Vec<u32>,
    #[serde(rename = "T", default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<u32>,
}

impl From<&SerumFields> for JsonSerum {
    fn from(f: &SerumFields) -> Self {
        Self {
            virus_type: f.virus_type.clone(),
            host: f.host.clone(),
            location: f.location.clone(),
            isolation: f.isolation.clone(),
            year: f.year.clone(),
            lineage: f.lineage,
            passage: f.passage.clone(),
            reassortant: f.reassortant.clone(),
            annotations: f.annotations.clone(),
            serum_id: f.serum_id.clone(),
            serum_species: f.serum_species.clone(),
            homologous_antigens: f.homologous_antigens.clone(),
            tables: f.tables.clone(),
        }
    }
}

impl From<&JsonSerum> for SerumFields {
    fn from(j: &JsonSerum) -> Self {
        Self {
            virus_type: j.virus_type.clone(),
            host: j.host.clone(),
            location: j.location.clone(),
            isolation: j.isolation.clone(),
            passage: j.passage.clone(),
            reassortant: j.reassortant.clone(),
            annotations: j.annotations.clone(),
            serum_id: j.serum_id.clone(),
            serum_species: j.serum_species.clone(),
            year: j.year.clone(),
            lineage: j.lineage,
            homologous_antigens: j.homologous_antigens.clone(),
            tables: j.tables.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct JsonTable {
    #[serde(rename = "v", default, skip_serializing_if = "String::is_empty")]
    pub virus: String,
    #[serde(rename = "V", default, skip_serializing_if = "String::is_empty")]
    pub virus_type: String,
    #[serde(rename = "su", default, skip_serializing_if = "String::is_empty")]
    pub subset: String,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<char>,
    #[serde(rename = "A", default, skip_serializing_if = "String::is_empty")]
    pub assay: String,
    #[serde(rename = "D", default, skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(rename = "l", default, skip_serializing_if = "String::is_empty")]
    pub lab: String,
    #[serde(rename = "r", default, skip_serializing_if = "String::is_empty")]
    pub rbc: String,
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    pub antigens: Vec<u32>,
    #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
    pub sera: Vec<u32>,
    #[serde(rename = "t", default, skip_serializing_if = "Vec::is_empty")]
    pub titers: Vec<Vec<String>>,
}

impl From<&TableFields> for JsonTable {
    fn from(f: &TableFields) -> Self {
        Self {
            virus: f.virus.clone(),
            virus_type: f.virus_type.clone(),
            subset: f.subset.clone(),
            lineage: f.lineage,
            assay: f.assay.clone(),
            date: f.date.clone(),
            lab: f.lab.clone(),
            rbc: f.rbc.clone(),
            antigens: f.antigens.clone(),
            sera: f.sera.clone(),
            titers: f.titers.clone(),
        }
    }
}

impl From<&JsonTable> for TableFields {
    fn from(j: &JsonTable) -> Self {
        Self {
            virus: j.virus.clone(),
            virus_type: j.virus_type.clone(),
            subset: j.subset.clone(),
            assay: j.assay.clone(),
            date: j.date.clone(),
            lab: j.lab.clone(),
            rbc: j.rbc.clone(),
            lineage: j.lineage,
            antigens: j.antigens.clone(),
            sera: j.sera.clone(),
            titers: j.titers.clone(),
        }
    }
}

/// The top-level `hidb-v5` document: `"  version"` (two leading spaces, per
/// the source), then the antigen/serum/table arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HidbJson {
    #[serde(rename = "  version")]
    pub version: String,
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    pub antigens: Vec<JsonAntigen>,
    #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
    pub sera: Vec<JsonSerum>,
    #[serde(rename = "t", default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<JsonTable>,
}

impl From<&Model> for HidbJson {
    fn from(model: &Model) -> Self {
        Self {
            version: VERSION.to_string(),
            antigens: model.antigens.iter().map(JsonAntigen::from).collect(),
            sera: model.sera.iter().map(JsonSerum::from).collect(),
            tables: model.tables.iter().map(JsonTable::from).collect(),
        }
    }
}

/// Most frequent non-empty `virus_type` across a document's antigens and
/// sera, mirroring the builder's own vote (§4.2) for a document that didn't
/// come from [`Model`] (e.g. hand-written or externally produced JSON).
fn vote_virus_type(doc: &HidbJson) -> String {
    use std::collections::HashMap;
    let mut votes: HashMap<&str, usize> = HashMap::new();
    for a in &doc.antigens {
        if !a.virus_type.is_empty() {
            *votes.entry(a.virus_type.as_str()).or_default() += 1;
        }
    }
    for s in &doc.sera {
        if !s.virus_type.is_empty() {
            *votes.entry(s.virus_type.as_str()).or_default() += 1;
        }
    }
    votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(vt, _)| vt.to_string())
        .unwrap_or_default()
}

impl HidbJson {
    pub fn to_model(&self) -> Model {
        Model {
            virus_type: vote_virus_type(self),
            antigens: self.antigens.iter().map(AntigenFields::from).collect(),
            sera: self.sera.iter().map(SerumFields::from).collect(),
            tables: self.tables.iter().map(TableFields::from).collect(),
        }
    }
}

/// Encodes a `hidb-v5` JSON document straight to the binary container,
/// without going through [`crate::build::Builder`] — used by
/// `hidb5-convert` and by [`crate::database::Database::open`] when a file
/// turns out to be JSON rather than binary.
pub fn encode_to_binary(doc: &HidbJson) -> Result<Vec<u8>> {
    doc.to_model().to_binary()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> Model {
        Model {
            virus_type: "A(H3N2)".into(),
            antigens: vec![AntigenFields {
                virus_type: "A(H3N2)".into(),
                host: "HUMAN".into(),
                location: "ALGIERS".into(),
                isolation: "1".into(),
                passage: "MDCK1".into(),
                year: "2019".into(),
                tables: vec![0],
                ..Default::default()
            }],
            sera: vec![SerumFields {
                virus_type: "A(H3N2)".into(),
                host: "FERRET".into(),
                location: "ALGIERS".into(),
                isolation: "1".into(),
                serum_id: "F1".into(),
                year: "2019".into(),
                tables: vec![0],
                ..Default::default()
            }],
            tables: vec![TableFields {
                virus: "FLU".into(),
                virus_type: "A(H3N2)".into(),
                assay: "HI".into(),
                date: "2019-03-15".into(),
                lab: "CDC".into(),
                rbc: "TURKEY".into(),
                antigens: vec![0],
                sera: vec![0],
                titers: vec![vec!["160".into()]],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn detects_json_version_marker() {
        let json = serde_json::to_vec(&HidbJson::from(&sample_model())).unwrap();
        assert!(looks_like_hidb_json(&json));
        assert!(!looks_like_hidb_json(crate::binary::SIGNATURE));
    }

    #[test]
    fn round_trips_model_through_json() {
        let model = sample_model();
        let doc = HidbJson::from(&model);
        let text = serde_json::to_string(&doc).unwrap();
        assert!(text.contains("\"O\":\"ALGIERS\""));
        assert!(!text.contains("\"su\""), "empty subset must be omitted, not collide with the serum array");

        let parsed: HidbJson = serde_json::from_str(&text).unwrap();
        let rebuilt = parsed.to_model();
        assert_eq!(rebuilt.virus_type, model.virus_type);
        assert_eq!(rebuilt.antigens.len(), 1);
        assert_eq!(rebuilt.antigens[0].location, "ALGIERS");
        assert_eq!(rebuilt.tables[0].titers, vec![vec!["160".to_string()]]);
    }

    #[test]
    fn json_and_binary_agree_on_one_database() {
        let model = sample_model();
        let doc = HidbJson::from(&model);
        let via_json = encode_to_binary(&doc).unwrap();
        let via_binary = model.to_binary().unwrap();
        assert_eq!(via_json, via_binary);
    }
}
