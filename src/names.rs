//! Virus-name splitting: the narrow interface the spec calls an external
//! collaborator (§6, `virus_name_split`). The full tokenizer that resolves
//! arbitrary lab shorthand is out of scope; this module implements the two
//! grammars the core itself must recognize in order to build and query
//! records: the generic `A(H3N2)/HOST/LOCATION/ISOLATION/YEAR` form and the
//! CDC short form `LL ISO` / `LL-ISO`.

use crate::error::{HidbError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedName {
    pub virus_type: String,
    pub host: String,
    pub location: String,
    pub isolation: String,
    pub year: String,
    pub passage: String,
}

/// Splits a full antigen/serum name of the form
/// `A(H3N2)/HUMAN/ALGIERS/1/2019` (host optional) into its components.
///
/// Returns [`HidbError::UnrecognizedName`] when the generic grammar doesn't
/// match; callers fall back to [`split_cdc_name`] or the raw slash-split
/// heuristics described in §4.3.
pub fn virus_name_split(name: &str) -> Result<ParsedName> {
    let parts: Vec<&str> = name.split('/').collect();
    match parts.as_slice() {
        [virus_type, location, isolation, year] => Ok(ParsedName {
            virus_type: (*virus_type).to_string(),
            host: String::new(),
            location: (*location).to_string(),
            isolation: (*isolation).to_string(),
            year: (*year).to_string(),
            passage: String::new(),
        }),
        [virus_type, host, location, isolation, year] => Ok(ParsedName {
            virus_type: (*virus_type).to_string(),
            host: (*host).to_string(),
            location: (*location).to_string(),
            isolation: (*isolation).to_string(),
            year: (*year).to_string(),
            passage: String::new(),
        }),
        _ => Err(HidbError::UnrecognizedName { name: name.to_string() }),
    }
}

/// Splits `LL ISO` or `LL-ISO` (a two-letter CDC location abbreviation
/// followed by a separator and the isolation number) into `(location,
/// isolation)`. Used both to recognize names during build and as the last
/// resort in query name parsing (§4.3).
pub fn split_cdc_name(name: &str) -> Option<(String, String)> {
    let bytes = name.as_bytes();
    if bytes.len() < 4 {
        return None;
    }
    if !(bytes[0].is_ascii_alphabetic() && bytes[1].is_ascii_alphabetic()) {
        return None;
    }
    let sep = bytes[2];
    if sep != b' ' && sep != b'-' {
        return None;
    }
    let location = name[0..2].to_string();
    let isolation = name[3..].to_string();
    if isolation.is_empty() {
        return None;
    }
    Some((location, isolation))
}

/// Query-side fallback name parsing described in §4.3: when the generic
/// grammar and the CDC form both fail, split on `/` and interpret by arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashSplit {
    LocationOnly { location: String },
    LocationIsolation { location: String, isolation: String },
    HostLocationIsolation {
        host: String,
        location: String,
        isolation: String,
    },
    TooManyParts,
}

pub fn slash_split(name: &str) -> SlashSplit {
    let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [location] => SlashSplit::LocationOnly {
            location: (*location).to_string(),
        },
        [location, isolation] => SlashSplit::LocationIsolation {
            location: (*location).to_string(),
            isolation: (*isolation).to_string(),
        },
        [host, location, isolation] => SlashSplit::HostLocationIsolation {
            host: (*host).to_string(),
            location: (*location).to_string(),
            isolation: (*isolation).to_string(),
        },
        _ => SlashSplit::TooManyParts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_generic_name_with_host() {
        let parsed = virus_name_split("A(H3N2)/HUMAN/ALGIERS/1/2019").unwrap();
        assert_eq!(parsed.virus_type, "A(H3N2)");
        assert_eq!(parsed.host, "HUMAN");
        assert_eq!(parsed.location, "ALGIERS");
        assert_eq!(parsed.isolation, "1");
        assert_eq!(parsed.year, "2019");
    }

    #[test]
    fn splits_generic_name_without_host() {
        let parsed = virus_name_split("A(H3N2)/ALGIERS/1/2019").unwrap();
        assert_eq!(parsed.host, "");
        assert_eq!(parsed.location, "ALGIERS");
    }

    #[test]
    fn rejects_names_with_wrong_arity() {
        assert!(virus_name_split("A(H3N2)/ALGIERS").is_err());
    }

    #[test]
    fn splits_cdc_name_forms() {
        assert_eq!(split_cdc_name("CA 7").unwrap(), ("CA".to_string(), "7".to_string()));
        assert_eq!(split_cdc_name("CA-7").unwrap(), ("CA".to_string(), "7".to_string()));
        assert!(split_cdc_name("CALIFORNIA 7").is_none());
    }

    #[test]
    fn slash_split_by_arity() {
        assert_eq!(
            slash_split("ALGIERS"),
            SlashSplit::LocationOnly { location: "ALGIERS".to_string() }
        );
        assert_eq!(
            slash_split("ALGIERS/1"),
            SlashSplit::LocationIsolation {
                location: "ALGIERS".to_string(),
                isolation: "1".to_string()
            }
        );
        assert_eq!(slash_split("A/B/C/D"), SlashSplit::TooManyParts);
    }
}
