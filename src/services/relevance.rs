//! Text scoring used by the in-memory store. Mirrors what Postgres does with
//! `ts_rank` and `word_similarity`, closely enough to preserve ordering
//! contracts: more term hits rank higher, exact substrings rank highest.

use crate::models::listing::Listing;
use crate::services::search_plan::TermQuery;

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn listing_document(listing: &Listing) -> Vec<String> {
    let mut doc = tokenize(&listing.title);
    doc.extend(tokenize(&listing.company));
    doc.extend(tokenize(&listing.description));
    doc
}

/// `None` when no term occurs in `doc`. Each term contributes `tf / (tf + 1)`
/// so repeated hits raise the score with diminishing returns.
pub fn rank(doc: &[String], query: &TermQuery) -> Option<f64> {
    let mut score = 0.0;
    let mut matched = false;
    for term in query.terms() {
        let tf = doc.iter().filter(|token| *token == term).count();
        if tf > 0 {
            matched = true;
            score += tf as f64 / (tf as f64 + 1.0);
        }
    }
    matched.then_some(score)
}

/// 1.0 when `location` contains `reference` case-insensitively; otherwise the
/// best bigram similarity against any `/`-separated alternative, kept below 1.
pub fn location_similarity(reference: &str, location: &str) -> f64 {
    let reference = reference.trim().to_lowercase();
    if reference.is_empty() {
        return 0.0;
    }
    let location = location.to_lowercase();
    if location.contains(&reference) {
        return 1.0;
    }
    location
        .split('/')
        .map(|alt| strsim::sorensen_dice(&reference, alt.trim()))
        .fold(0.0_f64, f64::max)
        * 0.99
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
