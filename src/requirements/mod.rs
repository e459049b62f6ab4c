//! Requirement parsing.
//!
//! Turns extracted text blocks into a normalized, deduplicated, order-stable
//! list of required document categories. Candidates come from three scans:
//! numbered/bulleted list items, lines following a "required documents"
//! heading, and whole-word hits from a built-in lexicon of document nouns.
//! Near-duplicates are merged by edit distance or shared synonym group.

pub mod synonyms;

pub use synonyms::SynonymTable;

use crate::extract::PageText;
use crate::report::RequiredCategory;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequirementError {
    /// Non-fatal: the orchestrator degrades to an empty-result report.
    #[error("no document requirements found in the specification text")]
    NoRequirementsFound,
}

/// Labels with fewer alphabetic characters than this are noise.
const MIN_ALPHABETIC: usize = 2;

/// Labels within this edit distance are considered the same category.
const MERGE_DISTANCE: usize = 2;

/// Labels shorter than this never merge by edit distance.
const MERGE_MIN_LEN: usize = 5;

/// Free-form labels are clipped to this many tokens.
const MAX_LABEL_TOKENS: usize = 6;

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+\s*[.)]|[-*•·]|\([a-z0-9]{1,3}\))\s+(.+)$").expect("list item pattern")
});

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:required documents?|documents? required|following documents?|submit the following)\b")
        .expect("heading pattern")
});

static QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s+(.+)$").expect("quantity pattern"));

/// Document-noun lexicon, adapted from the kinds of attachments tender
/// specifications ask for. Longer phrases win over their substrings.
static LEXICON: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let entries: &[(&str, &str)] = &[
        ("audit report", r"(?i)\baudit\s+reports?\b"),
        ("annual audit", r"(?i)\bannual\s+audits?\b"),
        ("certificate", r"(?i)\b(?:certificates?|certifications?)\b"),
        ("license", r"(?i)\b(?:licenses?|licences?)\b"),
        ("permit", r"(?i)\bpermits?\b"),
        ("registration", r"(?i)\bregistrations?\b"),
        ("contract", r"(?i)\bcontracts?\b"),
        ("agreement", r"(?i)\bagreements?\b"),
        ("reference", r"(?i)\breferences?\b"),
        ("brochure", r"(?i)\bbrochures?\b"),
        ("catalogue", r"(?i)\b(?:catalogues?|catalogs?)\b"),
        ("datasheet", r"(?i)\b(?:datasheets?|data\s+sheets?)\b"),
        ("statement", r"(?i)\bstatements?\b"),
        ("profile", r"(?i)\bprofiles?\b"),
        ("experience", r"(?i)\bexperiences?\b"),
        ("plan", r"(?i)\bplans?\b"),
        ("iso", r"(?i)\biso\b"),
    ];
    entries
        .iter()
        .map(|(label, pattern)| (*label, Regex::new(pattern).expect("lexicon pattern")))
        .collect()
});

/// Extract required categories from ordered text blocks.
///
/// Order-stable: repeated parses of the same input yield the same list in
/// the same first-seen order.
pub fn parse_requirements(
    pages: &[PageText],
    table: &SynonymTable,
) -> Result<Vec<RequiredCategory>, RequirementError> {
    let mut raw: Vec<(String, usize)> = Vec::new();
    let mut in_required_section = false;

    for page in pages {
        for line in page.text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                in_required_section = false;
                continue;
            }

            if HEADING.is_match(trimmed) {
                in_required_section = true;
                continue;
            }

            if let Some(caps) = LIST_ITEM.captures(trimmed) {
                push_candidate(&mut raw, &caps[1]);
                continue;
            }

            if in_required_section {
                push_candidate(&mut raw, trimmed);
                continue;
            }

            for hit in lexicon_hits(trimmed) {
                raw.push((hit, 1));
            }
        }
    }

    let categories = merge_candidates(raw, table);
    if categories.is_empty() {
        return Err(RequirementError::NoRequirementsFound);
    }

    tracing::debug!(categories = categories.len(), "parsed requirements");
    Ok(categories)
}

/// Record one candidate phrase, narrowing it through the lexicon when
/// possible and honoring a leading quantity ("2 certificates").
fn push_candidate(raw: &mut Vec<(String, usize)>, content: &str) {
    let (quantity, body) = match QUANTITY.captures(content) {
        Some(caps) => {
            let qty = caps[1].parse::<usize>().unwrap_or(1).max(1);
            (qty, caps[2].to_string())
        }
        None => (1, content.to_string()),
    };

    let hits = lexicon_hits(&body);
    if hits.is_empty() {
        raw.push((clipped_label(&body), quantity));
    } else {
        for hit in hits {
            raw.push((hit, quantity));
        }
    }
}

/// Deduplicate and merge raw candidates into the final category list.
fn merge_candidates(raw: Vec<(String, usize)>, table: &SynonymTable) -> Vec<RequiredCategory> {
    let mut categories: Vec<RequiredCategory> = Vec::new();

    for (label, quantity) in raw {
        if label.chars().filter(|c| c.is_alphabetic()).count() < MIN_ALPHABETIC {
            continue;
        }

        if let Some(existing) = categories.iter_mut().find(|c| {
            c.label == label || table.same_group(&c.label, &label) || close_enough(&c.label, &label)
        }) {
            existing.min_expected = existing.min_expected.max(quantity);
            continue;
        }

        let synonyms = table.synonyms_of(&label);
        categories.push(RequiredCategory {
            label,
            synonyms,
            min_expected: quantity,
        });
    }

    categories
}

/// Whole-word lexicon hits in position order, leftmost-longest.
fn lexicon_hits(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, usize, &str)> = Vec::new();
    for (label, pattern) in LEXICON.iter() {
        for hit in pattern.find_iter(text) {
            found.push((hit.start(), hit.end(), *label));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut hits = Vec::new();
    let mut last_end = 0;
    for (start, end, label) in found {
        if start >= last_end {
            hits.push(label.to_string());
            last_end = end;
        }
    }
    hits
}

fn clipped_label(text: &str) -> String {
    normalize_label(text)
        .split(' ')
        .take(MAX_LABEL_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn close_enough(a: &str, b: &str) -> bool {
    a.chars().count() >= MERGE_MIN_LEN
        && b.chars().count() >= MERGE_MIN_LEN
        && levenshtein(a, b) <= MERGE_DISTANCE
}

/// Lowercase, strip punctuation, collapse whitespace.
pub(crate) fn normalize_label(s: &str) -> String {
    let lowered = s.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0; b_len + 1]; a_len + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b_len {
        matrix[0][j] = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}
