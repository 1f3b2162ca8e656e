//! Serum record: fixed 17-byte prefix, followed by a variable payload.
//! See SPEC_FULL.md §3.

use std::convert::TryInto;

use crate::error::{HidbError, Result};

pub const PREFIX_LEN: usize = 17;
const MAX_ANNOTATIONS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct SerumFields {
    /// Carried only for JSON-intermediate fidelity (§6 `V` field); the
    /// binary record omits it since one container holds a single virus type.
    pub virus_type: String,
    pub host: String,
    pub location: String,
    pub isolation: String,
    pub passage: String,
    pub reassortant: String,
    pub annotations: Vec<String>,
    pub serum_id: String,
    pub serum_species: String,
    pub year: String,
    pub lineage: Option<char>,
    /// Antigen section indices this serum was raised against, sorted ascending.
    pub homologous_antigens: Vec<u32>,
    pub tables: Vec<u32>,
}

fn set_u8_offset(field: &'static str, offset: usize) -> Result<u8> {
    u8::try_from(offset).map_err(|_| HidbError::OffsetOverflow { field, offset })
}

pub fn encode(fields: &SerumFields) -> Result<Vec<u8>> {
    debug_assert!(fields.annotations.len() <= MAX_ANNOTATIONS);
    debug_assert!(!fields.tables.is_empty(), "invariant: serum must reference at least one table");

    let mut payload = Vec::new();
    payload.extend_from_slice(fields.host.as_bytes());

    let location_offset = set_u8_offset("location_offset", payload.len())?;
    payload.extend_from_slice(fields.location.as_bytes());
    let isolation_offset = set_u8_offset("isolation_offset", payload.len())?;
    payload.extend_from_slice(fields.isolation.as_bytes());
    let passage_offset = set_u8_offset("passage_offset", payload.len())?;
    payload.extend_from_slice(fields.passage.as_bytes());
    let reassortant_offset = set_u8_offset("reassortant_offset", payload.len())?;
    payload.extend_from_slice(fields.reassortant.as_bytes());

    let mut annotation_offset = [0u8; MAX_ANNOTATIONS];
    for i in 0..MAX_ANNOTATIONS {
        annotation_offset[i] = set_u8_offset("annotation_offset", payload.len())?;
        if let Some(a) = fields.annotations.get(i) {
            payload.extend_from_slice(a.as_bytes());
        }
    }

    let serum_id_offset = set_u8_offset("serum_id_offset", payload.len())?;
    payload.extend_from_slice(fields.serum_id.as_bytes());
    let serum_species_offset = set_u8_offset("serum_species_offset", payload.len())?;
    payload.extend_from_slice(fields.serum_species.as_bytes());

    while payload.len() % 4 != 0 {
        payload.push(0);
    }
    let homologous_antigen_index_offset = set_u8_offset("homologous_antigen_index_offset", payload.len())?;
    for idx in &fields.homologous_antigens {
        payload.extend_from_slice(&idx.to_le_bytes());
    }
    let table_index_offset = set_u8_offset("table_index_offset", payload.len())?;
    payload.extend_from_slice(&(fields.tables.len() as u32).to_le_bytes());
    for t in &fields.tables {
        payload.extend_from_slice(&t.to_le_bytes());
    }

    let mut year_data = [0u8; 4];
    if fields.year.len() == 4 {
        year_data.copy_from_slice(fields.year.as_bytes());
    }

    let mut record = Vec::with_capacity(PREFIX_LEN + payload.len());
    record.push(location_offset);
    record.push(isolation_offset);
    record.push(passage_offset);
    record.push(reassortant_offset);
    record.extend_from_slice(&annotation_offset);
    record.push(serum_id_offset);
    record.push(serum_species_offset);
    record.push(homologous_antigen_index_offset);
    record.push(table_index_offset);
    record.push(fields.lineage.map_or(0, |c| c as u8));
    record.push(0); // pad
    record.extend_from_slice(&year_data);
    debug_assert_eq!(record.len(), PREFIX_LEN);
    record.extend_from_slice(&payload);

    while record.len() % 4 != 0 {
        record.push(0);
    }
    Ok(record)
}

#[derive(Debug, Clone, Copy)]
pub struct SerumView<'a> {
    data: &'a [u8],
}

impl<'a> SerumView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= PREFIX_LEN);
        Self { data }
    }

    fn location_offset(&self) -> usize {
        self.data[0] as usize
    }
    fn isolation_offset(&self) -> usize {
        self.data[1] as usize
    }
    fn passage_offset(&self) -> usize {
        self.data[2] as usize
    }
    fn reassortant_offset(&self) -> usize {
        self.data[3] as usize
    }
    fn annotation_offset(&self, i: usize) -> usize {
        self.data[4 + i] as usize
    }
    fn serum_id_offset(&self) -> usize {
        self.data[7] as usize
    }
    fn serum_species_offset(&self) -> usize {
        self.data[8] as usize
    }
    fn homologous_antigen_index_offset(&self) -> usize {
        self.data[9] as usize
    }
    fn table_index_offset(&self) -> usize {
        self.data[10] as usize
    }

    fn start(&self) -> &'a [u8] {
        &self.data[PREFIX_LEN..]
    }

    fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        debug_assert!(start <= end, "invariant 2: fixed-prefix offsets must be monotone");
        &self.start()[start..end]
    }

    fn trimmed(bytes: &[u8]) -> &[u8] {
        let mut end = bytes.len();
        while end > 0 && bytes[end - 1] == 0 {
            end -= 1;
        }
        &bytes[..end]
    }

    fn str_at(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).unwrap_or("")
    }

    pub fn host(&self) -> &'a str {
        Self::str_at(self.slice(0, self.location_offset()))
    }
    pub fn location(&self) -> &'a str {
        Self::str_at(self.slice(self.location_offset(), self.isolation_offset()))
    }
    pub fn isolation(&self) -> &'a str {
        Self::str_at(self.slice(self.isolation_offset(), self.passage_offset()))
    }
    pub fn passage(&self) -> &'a str {
        Self::str_at(self.slice(self.passage_offset(), self.reassortant_offset()))
    }
    pub fn reassortant(&self) -> &'a str {
        Self::str_at(self.slice(self.reassortant_offset(), self.annotation_offset(0)))
    }

    pub fn annotations(&self) -> Vec<&'a str> {
        (0..MAX_ANNOTATIONS)
            .map(|i| {
                let start = self.annotation_offset(i);
                let end = if i + 1 < MAX_ANNOTATIONS {
                    self.annotation_offset(i + 1)
                } else {
                    self.serum_id_offset()
                };
                Self::str_at(self.slice(start, end))
            })
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn serum_id(&self) -> &'a str {
        Self::str_at(self.slice(self.serum_id_offset(), self.serum_species_offset()))
    }

    pub fn serum_species(&self) -> &'a str {
        Self::str_at(Self::trimmed(self.slice(
            self.serum_species_offset(),
            self.homologous_antigen_index_offset(),
        )))
    }

    pub fn year(&self) -> &'a str {
        let bytes = &self.data[13..17];
        if bytes[0] == 0 {
            ""
        } else {
            std::str::from_utf8(bytes).unwrap_or("")
        }
    }

    pub fn lineage(&self) -> Option<char> {
        let b = self.data[11];
        if b == 0 {
            None
        } else {
            Some(b as char)
        }
    }

    pub fn homologous_antigens(&self) -> Vec<u32> {
        let bytes = self.slice(self.homologous_antigen_index_offset(), self.table_index_offset());
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    pub fn tables(&self) -> Vec<u32> {
        let start = self.table_index_offset();
        let count_bytes = self.slice(start, start + 4);
        let count = u32::from_le_bytes(count_bytes.try_into().unwrap()) as usize;
        let indices = &self.start()[start + 4..start + 4 + count * 4];
        indices
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    pub fn name(&self) -> String {
        if self.host().is_empty() && self.location().len() == 2 {
            format!("{} {}", self.location(), self.isolation())
        } else {
            format!("{}/{}/{}/{}", self.host(), self.location(), self.isolation(), self.year())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SerumFields {
        SerumFields {
            virus_type: "A(H3N2)".into(),
            host: "FERRET".into(),
            location: "ALGIERS".into(),
            isolation: "1".into(),
            passage: String::new(),
            reassortant: String::new(),
            annotations: vec![],
            serum_id: "F1234".into(),
            serum_species: "SHEEP".into(),
            year: "2019".into(),
            lineage: None,
            homologous_antigens: vec![3, 9],
            tables: vec![7],
        }
    }

    #[test]
    fn round_trips_fields() {
        let fields = sample();
        let bytes = encode(&fields).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        let view = SerumView::new(&bytes);
        assert_eq!(view.serum_id(), "F1234");
        assert_eq!(view.serum_species(), "SHEEP");
        assert_eq!(view.homologous_antigens(), vec![3, 9]);
        assert_eq!(view.tables(), vec![7]);
    }

    #[test]
    fn serum_species_trims_trailing_padding() {
        let mut fields = sample();
        fields.serum_species = "F".into();
        let bytes = encode(&fields).unwrap();
        let view = SerumView::new(&bytes);
        assert_eq!(view.serum_species(), "F");
    }
}
