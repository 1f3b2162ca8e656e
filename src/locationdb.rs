//! Minimal location lookup (§6 external collaborator: "the location
//! database ... maps location → country/continent and resolves CDC
//! abbreviations"). A real location database covers tens of thousands of
//! place names and aliases; this module covers the handful the query
//! engine's tests exercise and falls back to the identity for anything else.

use std::collections::HashMap;

/// `(canonical name, country, continent)` for a small set of CDC two-letter
/// location abbreviations and their expansions, enough to exercise
/// [`find`]/[`country`]/[`continent`] end to end.
const ENTRIES: &[(&str, &str, &str, &str)] = &[
    ("CA", "CALIFORNIA", "UNITED STATES OF AMERICA", "NORTH AMERICA"),
    ("NY", "NEW YORK", "UNITED STATES OF AMERICA", "NORTH AMERICA"),
    ("TX", "TEXAS", "UNITED STATES OF AMERICA", "NORTH AMERICA"),
    ("HI", "HAWAII", "UNITED STATES OF AMERICA", "NORTH AMERICA"),
    ("ALGIERS", "ALGIERS", "ALGERIA", "AFRICA"),
    ("BRISBANE", "BRISBANE", "AUSTRALIA", "OCEANIA"),
    ("SINGAPORE", "SINGAPORE", "SINGAPORE", "ASIA"),
];

fn lookup(token: &str) -> Option<&'static (&'static str, &'static str, &'static str, &'static str)> {
    let token = token.to_ascii_uppercase();
    ENTRIES.iter().find(|(abbr, canonical, _, _)| *abbr == token || *canonical == token)
}

/// Canonical name for a location token, resolving CDC abbreviations (e.g.
/// `"CA"` → `"CALIFORNIA"`). Unknown tokens pass through unchanged.
pub fn find(token: &str) -> String {
    lookup(token).map_or_else(|| token.to_string(), |(_, canonical, _, _)| (*canonical).to_string())
}

/// Country for a (possibly abbreviated) location. Empty when unknown.
pub fn country(location: &str) -> String {
    lookup(location).map(|(_, _, country, _)| (*country).to_string()).unwrap_or_default()
}

/// Continent for a (possibly abbreviated) location. Empty when unknown.
pub fn continent(location: &str) -> String {
    lookup(location).map(|(_, _, _, continent)| (*continent).to_string()).unwrap_or_default()
}

/// Builds the full table, mostly for introspection tools like `hidb5-stat`
/// that group by continent.
pub fn table() -> HashMap<&'static str, (&'static str, &'static str, &'static str)> {
    ENTRIES.iter().map(|(abbr, canonical, country, continent)| (*abbr, (*canonical, *country, *continent))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_cdc_abbreviation() {
        assert_eq!(find("CA"), "CALIFORNIA");
        assert_eq!(country("CA"), "UNITED STATES OF AMERICA");
        assert_eq!(continent("CA"), "NORTH AMERICA");
    }

    #[test]
    fn unknown_location_passes_through() {
        assert_eq!(find("NOWHERESVILLE"), "NOWHERESVILLE");
        assert_eq!(country("NOWHERESVILLE"), "");
    }
}
