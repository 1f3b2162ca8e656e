//! The on-disk binary container: an 8-byte signature header followed by
//! three sections (antigens, sera, tables), each a `count:u32` + cumulative
//! offset table + concatenated sorted records. See SPEC_FULL.md §3-4.1.

pub mod antigen;
pub mod section;
pub mod serum;
pub mod table;

use std::convert::TryInto;

use crate::error::{HidbError, Result};

pub const SIGNATURE: &[u8; 8] = b"HIDB0500";
pub const HEADER_LEN: usize = 32;
const VIRUS_TYPE_MAX: usize = 7;

/// True if `data` starts with the binary signature.
pub fn has_signature(data: &[u8]) -> bool {
    data.len() >= SIGNATURE.len() && &data[..SIGNATURE.len()] == SIGNATURE
}

/// The fixed 32-byte container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub antigen_section_offset: u32,
    pub serum_section_offset: u32,
    pub table_section_offset: u32,
    pub virus_type: String,
}

impl Header {
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.virus_type.len() > VIRUS_TYPE_MAX {
            return Err(HidbError::OffsetOverflow {
                field: "virus_type",
                offset: self.virus_type.len(),
            });
        }
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&self.antigen_section_offset.to_le_bytes());
        out.extend_from_slice(&self.serum_section_offset.to_le_bytes());
        out.extend_from_slice(&self.table_section_offset.to_le_bytes());
        out.push(self.virus_type.len() as u8);
        let mut virus_type_bytes = [0u8; VIRUS_TYPE_MAX];
        virus_type_bytes[..self.virus_type.len()].copy_from_slice(self.virus_type.as_bytes());
        out.extend_from_slice(&virus_type_bytes);
        debug_assert_eq!(out.len(), HEADER_LEN);
        Ok(())
    }

    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN || !has_signature(data) {
            return Err(HidbError::BadFile { path: "<memory>".into() });
        }
        let antigen_section_offset = u32::from_le_bytes(data[8..12].try_into().unwrap());
        let serum_section_offset = u32::from_le_bytes(data[12..16].try_into().unwrap());
        let table_section_offset = u32::from_le_bytes(data[16..20].try_into().unwrap());
        let virus_type_len = data[20] as usize;
        if virus_type_len > VIRUS_TYPE_MAX {
            return Err(HidbError::BadFile { path: "<memory>".into() });
        }
        let virus_type_bytes = &data[21..21 + virus_type_len];
        let virus_type = String::from_utf8_lossy(virus_type_bytes).into_owned();
        Ok(Self {
            antigen_section_offset,
            serum_section_offset,
            table_section_offset,
            virus_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header {
            antigen_section_offset: 32,
            serum_section_offset: 1000,
            table_section_offset: 2000,
            virus_type: "H3".to_string(),
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert!(has_signature(&bytes));
        assert_eq!(Header::read(&bytes).unwrap(), header);
    }

    #[test]
    fn rejects_virus_type_too_long() {
        let header = Header {
            antigen_section_offset: 0,
            serum_section_offset: 0,
            table_section_offset: 0,
            virus_type: "TOOLONGVT".to_string(),
        };
        let mut bytes = Vec::new();
        assert!(header.write(&mut bytes).is_err());
    }

    #[test]
    fn rejects_missing_signature() {
        let bytes = vec![0u8; HEADER_LEN];
        assert!(Header::read(&bytes).is_err());
    }
}
