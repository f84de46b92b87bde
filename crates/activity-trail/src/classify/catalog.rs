use compliance_core_types::Guideline;

use crate::errors::{TrailError, TrailResult};

/// Fixed, ordered guideline catalog. Never empty, so the first entry is
/// always available as the default mapping.
#[derive(Debug, Clone)]
pub struct GuidelineCatalog {
    entries: Vec<Guideline>,
}

impl GuidelineCatalog {
    pub fn new(entries: Vec<Guideline>) -> TrailResult<Self> {
        if entries.is_empty() {
            return Err(TrailError::InvalidArg(
                "guideline catalog must contain at least one entry".into(),
            ));
        }
        Ok(Self { entries })
    }

    /// The catalog shipped with the dashboard.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                Guideline::new(
                    "PCI-DSS-3.1",
                    "Encrypt stored cardholder data",
                    "Data Protection",
                ),
                Guideline::new(
                    "PCI-DSS-8.3",
                    "Enforce strong authentication for user access",
                    "Access Control",
                ),
                Guideline::new(
                    "SOC2-CC6.1",
                    "Restrict logical access to information assets",
                    "Access Control",
                ),
                Guideline::new(
                    "GDPR-Art.5",
                    "Limit personal data to what is necessary and retain it no longer than needed",
                    "Data Governance",
                ),
                Guideline::new(
                    "GDPR-Art.32",
                    "Ensure security of processing",
                    "Security",
                ),
                Guideline::new(
                    "PCI-DSS-10.2",
                    "Record audit logs for user and system events",
                    "Monitoring",
                ),
            ],
        }
    }

    pub fn default_guideline(&self) -> &Guideline {
        &self.entries[0]
    }

    /// First guideline, in catalog order, whose id contains any fragment.
    pub fn find_by_id_fragment(&self, fragments: &[&str]) -> Option<&Guideline> {
        self.entries
            .iter()
            .find(|guideline| fragments.iter().any(|frag| guideline.id.contains(frag)))
    }
}

impl Default for GuidelineCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
