//! Date parsing and formatting for the `YYYYMMDD` integer representation
//! stored in antigen records and table identities.

use crate::error::{HidbError, Result};

pub const MIN_DATE: u32 = 10_000_101;
pub const MAX_DATE: u32 = 30_000_101;

/// Parses `YYYYMMDD` or `YYYY-MM-DD` into the packed integer form, validating
/// that the result falls in `[MIN_DATE, MAX_DATE)`.
pub fn parse_date(raw: &str) -> Result<u32> {
    let digits: String = if raw.len() == 10 && raw.as_bytes()[4] == b'-' && raw.as_bytes()[7] == b'-' {
        let (y, rest) = raw.split_at(4);
        let (m, d) = rest[1..].split_at(2);
        format!("{y}{m}{}", &d[1..])
    } else if raw.len() == 8 {
        raw.to_string()
    } else {
        return Err(HidbError::InvalidDate { raw: raw.to_string() });
    };

    let value: u32 = digits
        .parse()
        .map_err(|_| HidbError::InvalidDate { raw: raw.to_string() })?;
    if !(MIN_DATE..MAX_DATE).contains(&value) {
        return Err(HidbError::InvalidDate { raw: raw.to_string() });
    }
    Ok(value)
}

/// Formats a packed `YYYYMMDD` integer as `YYYY-MM-DD`.
///
/// Inverse of [`parse_date`] for every value it can produce: `parse_date(&format_date(d)) == Ok(d)`.
pub fn format_date(value: u32) -> String {
    let digits = format!("{value:08}");
    format!("{}-{}-{}", &digits[0..4], &digits[4..6], &digits[6..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_both_date_forms() {
        assert_eq!(parse_date("20190315").unwrap(), 20_190_315);
        assert_eq!(parse_date("2019-03-15").unwrap(), 20_190_315);
    }

    #[test]
    fn rejects_out_of_range_dates() {
        assert!(parse_date("00010101").is_err());
        assert!(parse_date("30000101").is_err());
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_date("2019/03/15").is_err());
    }

    proptest! {
        #[test]
        fn make_date_round_trips(d in MIN_DATE..MAX_DATE) {
            // Invariant 7: make_date(make_date_inv(d)) == d for all valid d.
            let text = format_date(d);
            prop_assert_eq!(parse_date(&text).unwrap(), d);
        }
    }
}
