//! Ordered keyword rules mapping gap text to a guideline.
//!
//! First match wins and there is no scoring: this is a heuristic, kept
//! deterministic and total rather than precise.

use compliance_core_types::Guideline;

use super::catalog::GuidelineCatalog;

/// Case-sensitive markers that turn a log line into a gap finding.
pub const GAP_SIGNALS: [&str; 3] = ["Gap", "Risk", "Finding"];

#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    /// Matched against the lower-cased action text.
    pub keyword: &'static str,
    pub id_fragments: &'static [&'static str],
}

pub const KEYWORD_RULES: [KeywordRule; 3] = [
    KeywordRule {
        keyword: "encrypt",
        id_fragments: &["3.1"],
    },
    KeywordRule {
        keyword: "access",
        id_fragments: &["8.3", "CC6"],
    },
    KeywordRule {
        keyword: "data",
        id_fragments: &["Art.5"],
    },
];

pub fn is_gap_signal(action: &str) -> bool {
    GAP_SIGNALS.iter().any(|signal| action.contains(signal))
}

/// Walk the rules in order; the first keyword found in the text decides.
/// A matched rule whose guideline is missing from the catalog, or no match
/// at all, maps to the catalog's first entry.
pub fn match_guideline<'a>(catalog: &'a GuidelineCatalog, action: &str) -> &'a Guideline {
    let lowered = action.to_lowercase();
    KEYWORD_RULES
        .iter()
        .find(|rule| lowered.contains(rule.keyword))
        .and_then(|rule| catalog.find_by_id_fragment(rule.id_fragments))
        .unwrap_or_else(|| catalog.default_guideline())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_are_case_sensitive() {
        assert!(is_gap_signal("Critical Gap found"));
        assert!(is_gap_signal("Risk: large transfer"));
        assert!(is_gap_signal("Finding #3"));
        assert!(!is_gap_signal("no gap here"));
        assert!(!is_gap_signal("risky business"));
    }

    #[test]
    fn keyword_chain_picks_first_matching_rule() {
        let catalog = GuidelineCatalog::standard();
        assert_eq!(
            match_guideline(&catalog, "Unencrypted PII in logs — Gap detected").id,
            "PCI-DSS-3.1"
        );
        assert_eq!(match_guideline(&catalog, "Weak access control Gap").id, "PCI-DSS-8.3");
        assert_eq!(
            match_guideline(&catalog, "Risk: Data retained for 5 years").id,
            "GDPR-Art.5"
        );
        // "encrypt" outranks "data" when both appear.
        assert_eq!(
            match_guideline(&catalog, "Gap: data not ENCRYPTED at rest").id,
            "PCI-DSS-3.1"
        );
        assert_eq!(match_guideline(&catalog, "Finding: anomaly").id, "PCI-DSS-3.1");
    }

    #[test]
    fn missing_rule_target_falls_back_to_first_entry() {
        let catalog = GuidelineCatalog::new(vec![
            Guideline::new("ISO-27001-A.9", "Access control policy", "Access Control"),
            Guideline::new("GDPR-Art.5", "Data minimisation", "Data Governance"),
        ])
        .unwrap();
        assert_eq!(match_guideline(&catalog, "Weak access Gap").id, "ISO-27001-A.9");
        assert_eq!(match_guideline(&catalog, "Gap in data retention").id, "GDPR-Art.5");
    }
}
