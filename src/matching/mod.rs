//! Category-to-candidate matching.
//!
//! Scores every candidate filename against each required category and keeps
//! the ones above the configured threshold. Fully deterministic: identical
//! categories and catalog always produce identical match records.

use crate::config::EngineConfig;
use crate::report::{CandidateFile, MatchRecord, RequiredCategory, ScoredFile};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Bonus applied when the normalized filename contains a category variant
/// outright.
const SUBSTRING_BONUS: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct Matcher {
    threshold: f64,
}

impl Matcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.score_threshold,
        }
    }

    /// Produce one record per category, in category order.
    pub fn match_categories(
        &self,
        categories: &[RequiredCategory],
        catalog: &[CandidateFile],
    ) -> Vec<MatchRecord> {
        let records: Vec<MatchRecord> = categories
            .iter()
            .map(|category| self.match_category(category, catalog))
            .collect();

        let matched = records.iter().filter(|r| !r.is_empty()).count();
        tracing::debug!(
            categories = categories.len(),
            matched,
            candidates = catalog.len(),
            "matched categories against catalog"
        );
        records
    }

    fn match_category(
        &self,
        category: &RequiredCategory,
        catalog: &[CandidateFile],
    ) -> MatchRecord {
        let mut files: Vec<ScoredFile> = catalog
            .iter()
            .filter_map(|candidate| {
                let score = score_candidate(category, candidate);
                (score >= self.threshold).then(|| ScoredFile {
                    file: candidate.clone(),
                    score,
                })
            })
            .collect();

        // ties break toward the shorter, lexicographically smaller name
        files.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.file.file_name.len().cmp(&b.file.file_name.len()))
                .then_with(|| a.file.path.cmp(&b.file.path))
        });

        MatchRecord {
            category: category.label.clone(),
            files,
        }
    }
}

/// Best Jaccard ratio across the category's variants, plus the containment
/// bonus.
fn score_candidate(category: &RequiredCategory, candidate: &CandidateFile) -> f64 {
    let candidate_tokens: BTreeSet<&str> = candidate.tokens.iter().map(String::as_str).collect();
    if candidate_tokens.is_empty() {
        return 0.0;
    }

    let mut best = 0.0_f64;
    let mut contained = false;
    let squashed = candidate.tokens.join(" ");

    for variant in variants(category) {
        let variant_tokens: BTreeSet<&str> = variant.split(' ').collect();
        let ratio = jaccard(&candidate_tokens, &variant_tokens);
        if ratio > best {
            best = ratio;
        }
        if !variant.is_empty() && squashed.contains(variant) {
            contained = true;
        }
    }

    if contained {
        best + SUBSTRING_BONUS
    } else {
        best
    }
}

fn variants(category: &RequiredCategory) -> impl Iterator<Item = &str> {
    std::iter::once(category.label.as_str())
        .chain(category.synonyms.iter().map(String::as_str))
}

fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    if intersection == 0 {
        return 0.0;
    }
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
