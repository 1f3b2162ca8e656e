//! Minimal WHO Collaborating Centre vaccine table (§6 external collaborator).
//! The real table is a curated, periodically updated list of recommended
//! vaccine strains per season; this module provides a small built-in set
//! sufficient to exercise [`crate::vaccine`] end to end, plus
//! [`lab_name_normalize`] for the handful of lab-name spellings the other
//! tools need to agree on.

fn built_in() -> &'static [VaccineEntryStatic] {
    &[
        VaccineEntryStatic { virus_type: "A(H3N2)", lineage: None, name: "A(H3N2)/DARWIN/9/2021" },
        VaccineEntryStatic { virus_type: "A(H1N1)", lineage: None, name: "A(H1N1)/VICTORIA/2570/2019" },
        VaccineEntryStatic { virus_type: "B", lineage: Some('V'), name: "B/AUSTRIA/1359417/2021" },
    ]
}

struct VaccineEntryStatic {
    virus_type: &'static str,
    lineage: Option<char>,
    name: &'static str,
}

/// Recommended vaccine strain names for one (virus_type, lineage) season
/// scope, as consumed by [`crate::vaccine::resolve`].
pub fn vaccine_names(virus_type: &str, lineage: Option<char>) -> Vec<String> {
    built_in()
        .iter()
        .filter(|e| e.virus_type == virus_type && e.lineage == lineage)
        .map(|e| e.name.to_string())
        .collect()
}

/// Normalizes a lab name spelling (e.g. trims whitespace, upper-cases),
/// used when comparing a chart's lab field against a table's.
pub fn lab_name_normalize(lab: &str) -> String {
    lab.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_vaccine_names_for_scope() {
        let names = vaccine_names("A(H3N2)", None);
        assert_eq!(names, vec!["A(H3N2)/DARWIN/9/2021".to_string()]);
    }

    #[test]
    fn empty_scope_yields_no_names() {
        assert!(vaccine_names("A(H1N1)", Some('V')).is_empty());
    }

    #[test]
    fn normalizes_lab_name_spelling() {
        assert_eq!(lab_name_normalize("  cdc "), "CDC");
    }
}
