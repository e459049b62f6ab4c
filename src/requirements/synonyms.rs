//! Synonym groups for category labels.

use crate::requirements::normalize_label;
use serde::{Deserialize, Serialize};

/// Groups of labels naming the same document category.
///
/// Labels are stored normalized (lowercase, single spaces). Membership in a
/// group both merges near-duplicate categories during parsing and widens the
/// variant set scored during matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymTable {
    groups: Vec<Vec<String>>,
}

impl SynonymTable {
    pub fn new<G, L>(groups: G) -> Self
    where
        G: IntoIterator<Item = L>,
        L: IntoIterator<Item = String>,
    {
        let groups = groups
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|label| normalize_label(&label))
                    .filter(|label| !label.is_empty())
                    .collect()
            })
            .collect();
        Self { groups }
    }

    pub fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// Labels in the same group as `label`, excluding the label itself.
    pub fn synonyms_of(&self, label: &str) -> Vec<String> {
        self.groups
            .iter()
            .find(|group| group.iter().any(|s| s == label))
            .map(|group| {
                group
                    .iter()
                    .filter(|s| s.as_str() != label)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether two labels belong to the same group.
    pub fn same_group(&self, a: &str, b: &str) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().any(|s| s == a) && group.iter().any(|s| s == b))
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        let groups: &[&[&str]] = &[
            &["certificate", "cert", "certification", "iso certificate"],
            &["audit report", "annual audit", "audit"],
            &["license", "licence", "licensing"],
            &["registration", "company registration"],
            &["catalogue", "catalog"],
            &["datasheet", "data sheet", "spec sheet", "specification sheet"],
            &["profile", "company profile"],
            &["statement", "financial statement"],
            &["reference", "reference letter"],
            &["contract", "signed contract"],
        ];
        Self::new(
            groups
                .iter()
                .map(|group| group.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
        )
    }
}
