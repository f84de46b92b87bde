pub mod catalog;
pub mod rules;

use std::sync::Arc;

use compliance_core_types::{GapRecord, NormalizedEntry};

pub use catalog::GuidelineCatalog;
pub use rules::{is_gap_signal, match_guideline, GAP_SIGNALS, KEYWORD_RULES};

/// Scans normalised entries for gap signals and maps each to a guideline.
#[derive(Debug, Clone)]
pub struct GapClassifier {
    catalog: Arc<GuidelineCatalog>,
}

impl GapClassifier {
    pub fn new(catalog: Arc<GuidelineCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &GuidelineCatalog {
        &self.catalog
    }

    /// One record per signalled entry, in input order.
    pub fn classify(&self, entries: &[NormalizedEntry]) -> Vec<GapRecord> {
        entries
            .iter()
            .filter(|entry| is_gap_signal(&entry.action))
            .map(|entry| GapRecord {
                agent: entry.agent.clone(),
                finding: entry.action.clone(),
                client: entry.client.clone(),
                guideline: match_guideline(&self.catalog, &entry.action).clone(),
            })
            .collect()
    }
}

impl Default for GapClassifier {
    fn default() -> Self {
        Self::new(Arc::new(GuidelineCatalog::standard()))
    }
}
