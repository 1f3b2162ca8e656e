//! Table record: fixed 16-byte prefix, followed by a variable payload
//! holding antigen/serum index arrays and the dense titer matrix. See
//! SPEC_FULL.md §3. `virus`, `virus_type` and `subset` are part of a
//! table's identity tuple used for dedup and sort during build but are not
//! retained in the binary record — the container is already scoped to one
//! virus type.

use std::convert::TryInto;

use crate::error::{HidbError, Result};

pub const PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct TableFields {
    /// `virus`, `virus_type` and `subset` are part of a table's identity
    /// tuple (§3) and the JSON intermediate (§6 `v`/`V`/`su`), but are not
    /// retained in the binary record itself — the container is already
    /// scoped to one virus type, and `subset` has no query-time use.
    pub virus: String,
    pub virus_type: String,
    pub subset: String,
    pub assay: String,
    pub date: String,
    pub lab: String,
    pub rbc: String,
    pub lineage: Option<char>,
    /// Antigen section indices, sorted ascending.
    pub antigens: Vec<u32>,
    /// Serum section indices, sorted ascending.
    pub sera: Vec<u32>,
    /// Row-major `antigens.len() x sera.len()` titer strings.
    pub titers: Vec<Vec<String>>,
}

fn set_u8_offset(field: &'static str, offset: usize) -> Result<u8> {
    u8::try_from(offset).map_err(|_| HidbError::OffsetOverflow { field, offset })
}

pub fn encode(fields: &TableFields) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    payload.extend_from_slice(fields.assay.as_bytes());
    let date_offset = set_u8_offset("date_offset", payload.len())?;
    payload.extend_from_slice(fields.date.as_bytes());
    let lab_offset = set_u8_offset("lab_offset", payload.len())?;
    payload.extend_from_slice(fields.lab.as_bytes());
    let rbc_offset = set_u8_offset("rbc_offset", payload.len())?;
    payload.extend_from_slice(fields.rbc.as_bytes());

    while payload.len() % 4 != 0 {
        payload.push(0);
    }
    let antigen_index_offset = payload.len() as u32;
    for a in &fields.antigens {
        payload.extend_from_slice(&a.to_le_bytes());
    }
    let serum_index_offset = payload.len() as u32;
    for s in &fields.sera {
        payload.extend_from_slice(&s.to_le_bytes());
    }
    let titer_offset = payload.len() as u32;

    let width = fields.titers.iter().flatten().map(String::len).max().unwrap_or(0).max(1);
    payload.push(width as u8);
    for row in &fields.titers {
        for cell in row {
            let mut padded = vec![0u8; width];
            padded[..cell.len()].copy_from_slice(cell.as_bytes());
            payload.extend_from_slice(&padded);
        }
    }

    let mut record = Vec::with_capacity(PREFIX_LEN + payload.len());
    record.push(date_offset);
    record.push(lab_offset);
    record.push(rbc_offset);
    record.push(fields.lineage.map_or(0, |c| c as u8));
    record.extend_from_slice(&antigen_index_offset.to_le_bytes());
    record.extend_from_slice(&serum_index_offset.to_le_bytes());
    record.extend_from_slice(&titer_offset.to_le_bytes());
    debug_assert_eq!(record.len(), PREFIX_LEN);
    record.extend_from_slice(&payload);

    while record.len() % 4 != 0 {
        record.push(0);
    }
    Ok(record)
}

#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    data: &'a [u8],
}

impl<'a> TableView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= PREFIX_LEN);
        Self { data }
    }

    fn date_offset(&self) -> usize {
        self.data[0] as usize
    }
    fn lab_offset(&self) -> usize {
        self.data[1] as usize
    }
    fn rbc_offset(&self) -> usize {
        self.data[2] as usize
    }
    fn antigen_index_offset(&self) -> usize {
        u32::from_le_bytes(self.data[4..8].try_into().unwrap()) as usize
    }
    fn serum_index_offset(&self) -> usize {
        u32::from_le_bytes(self.data[8..12].try_into().unwrap()) as usize
    }
    fn titer_offset(&self) -> usize {
        u32::from_le_bytes(self.data[12..16].try_into().unwrap()) as usize
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

    pub fn assay(&self) -> &'a str {
        Self::str_at(self.slice(0, self.date_offset()))
    }
    pub fn date(&self) -> &'a str {
        Self::str_at(self.slice(self.date_offset(), self.lab_offset()))
    }
    pub fn lab(&self) -> &'a str {
        Self::str_at(self.slice(self.lab_offset(), self.rbc_offset()))
    }
    pub fn rbc(&self) -> &'a str {
        Self::str_at(Self::trimmed(self.slice(self.rbc_offset(), self.antigen_index_offset())))
    }
    pub fn lineage(&self) -> Option<char> {
        let b = self.data[3];
        if b == 0 {
            None
        } else {
            Some(b as char)
        }
    }

    pub fn number_of_antigens(&self) -> usize {
        (self.serum_index_offset() - self.antigen_index_offset()) / 4
    }

    pub fn number_of_sera(&self) -> usize {
        (self.titer_offset() - self.serum_index_offset()) / 4
    }

    pub fn antigens(&self) -> Vec<u32> {
        let n = self.number_of_antigens();
        self.slice(self.antigen_index_offset(), self.antigen_index_offset() + n * 4)
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    pub fn sera(&self) -> Vec<u32> {
        let n = self.number_of_sera();
        self.slice(self.serum_index_offset(), self.serum_index_offset() + n * 4)
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    fn titer_width(&self) -> usize {
        self.start()[self.titer_offset()] as usize
    }

    pub fn titer(&self, antigen_row: usize, serum_col: usize) -> &'a str {
        let width = self.titer_width();
        let cells_start = self.titer_offset() + 1;
        let index = antigen_row * self.number_of_sera() + serum_col;
        let start = cells_start + index * width;
        Self::str_at(Self::trimmed(&self.start()[start..start + width]))
    }

    pub fn titers(&self) -> Vec<Vec<&'a str>> {
        (0..self.number_of_antigens())
            .map(|row| (0..self.number_of_sera()).map(|col| self.titer(row, col)).collect())
            .collect()
    }
}

/// Returns `"tu"`/`"gp"` for a table's RBC species, only meaningful for the
/// HI assay, used by `TableStat::title` (§4.3 supplemental).
pub fn rbc_abbreviation(assay: &str, rbc_species: &str) -> &'static str {
    if !assay.eq_ignore_ascii_case("HI") {
        return "";
    }
    match rbc_species.to_ascii_uppercase().as_str() {
        "TURKEY" => "tu",
        "GUINEA-PIG" | "GUINEA PIG" => "gp",
        _ => "",
    }
}

pub fn validate_indices(view: &TableView, antigen_count: usize, serum_count: usize) -> Result<()> {
    for a in view.antigens() {
        if a as usize >= antigen_count {
            return Err(HidbError::BadFile { path: "<memory>".into() });
        }
    }
    for s in view.sera() {
        if s as usize >= serum_count {
            return Err(HidbError::BadFile { path: "<memory>".into() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableFields {
        TableFields {
            virus: "FLU".into(),
            virus_type: "A(H3N2)".into(),
            subset: String::new(),
            assay: "HI".into(),
            date: "2019-03-15".into(),
            lab: "CDC".into(),
            rbc: "TURKEY".into(),
            lineage: None,
            antigens: vec![0, 2, 4],
            sera: vec![1, 3],
            titers: vec![
                vec!["40".into(), "<10".into()],
                vec!["80".into(), "160".into()],
                vec!["320".into(), "20".into()],
            ],
        }
    }

    #[test]
    fn round_trips_indices_and_titers() {
        let fields = sample();
        let bytes = encode(&fields).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        let view = TableView::new(&bytes);
        assert_eq!(view.assay(), "HI");
        assert_eq!(view.lab(), "CDC");
        assert_eq!(view.rbc(), "TURKEY");
        assert_eq!(view.antigens(), vec![0, 2, 4]);
        assert_eq!(view.sera(), vec![1, 3]);
        assert_eq!(view.titer(0, 0), "40");
        assert_eq!(view.titer(0, 1), "<10");
        assert_eq!(view.titer(2, 0), "320");
    }

    #[test]
    fn rbc_abbreviation_only_for_hi() {
        assert_eq!(rbc_abbreviation("HI", "TURKEY"), "tu");
        assert_eq!(rbc_abbreviation("FRA", "TURKEY"), "");
    }
}
