//! Token-set text metrics.
//!
//! Every similarity judgement in the system (provocateur novelty, scaffold
//! and heuristic contradiction) goes through this module.

use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "if", "in", "into", "is", "it", "its", "no", "not", "of", "on", "or", "our", "should", "that",
    "the", "then", "this", "to", "we", "what", "when", "which", "why", "will", "with", "would",
];

const NEGATORS: &[&str] = &["not", "no", "without", "avoid", "cannot", "dont"];

/// `(surface form, canonical stem, negates)`.
const ANTONYMS: &[(&str, &str, bool)] = &[
    ("always", "always", false),
    ("never", "always", true),
    ("allow", "allow", false),
    ("allows", "allow", false),
    ("allowed", "allow", false),
    ("permit", "allow", false),
    ("forbid", "allow", true),
    ("forbids", "allow", true),
    ("forbidden", "allow", true),
    ("deny", "allow", true),
    ("denies", "allow", true),
    ("denied", "allow", true),
    ("prohibit", "allow", true),
    ("prohibits", "allow", true),
    ("prohibited", "allow", true),
    ("enable", "enable", false),
    ("enables", "enable", false),
    ("enabled", "enable", false),
    ("disable", "enable", true),
    ("disables", "enable", true),
    ("disabled", "enable", true),
    ("increase", "increase", false),
    ("increases", "increase", false),
    ("increased", "increase", false),
    ("decrease", "increase", true),
    ("decreases", "increase", true),
    ("decreased", "increase", true),
    ("accept", "accept", false),
    ("accepts", "accept", false),
    ("accepted", "accept", false),
    ("reject", "accept", true),
    ("rejects", "accept", true),
    ("rejected", "accept", true),
];

/// Lowercase alphanumeric tokens in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn stem(token: &str) -> String {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Stemmed tokens with stop words removed.
pub fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .map(|t| stem(&t))
        .collect()
}

/// Jaccard index of two sets. Two empty sets are identical.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

/// Highest similarity of `candidate` against any text in `history` (0 if empty).
pub fn max_similarity<'a, I>(candidate: &str, history: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let tokens = token_set(candidate);
    history
        .into_iter()
        .map(|h| jaccard(&tokens, &token_set(h)))
        .fold(0.0, f64::max)
}

/// Normalized form of a constraint: stems plus overall polarity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polarized {
    pub stems: BTreeSet<String>,
    pub positive: bool,
}

pub fn polarize(text: &str) -> Polarized {
    let mut stems = BTreeSet::new();
    let mut positive = true;
    for token in tokenize(text) {
        if NEGATORS.contains(&token.as_str()) {
            positive = !positive;
            continue;
        }
        if let Some((_, canonical, negates)) = ANTONYMS.iter().find(|(s, _, _)| *s == token) {
            stems.insert((*canonical).to_string());
            if *negates {
                positive = !positive;
            }
            continue;
        }
        if is_stop_word(&token) {
            continue;
        }
        stems.insert(stem(&token));
    }
    Polarized { stems, positive }
}

/// Overlap of two constraints after antonym normalization.
pub fn constraint_overlap(a: &str, b: &str) -> f64 {
    jaccard(&polarize(a).stems, &polarize(b).stems)
}

/// Two constraints contradict when they talk about the same thing
/// (overlap at or above `threshold`) with opposite polarity.
pub fn contradicts(a: &str, b: &str, threshold: f64) -> bool {
    let pa = polarize(a);
    let pb = polarize(b);
    if pa.stems.is_empty() || pb.stems.is_empty() {
        return false;
    }
    pa.positive != pb.positive && jaccard(&pa.stems, &pb.stems) >= threshold
}

/// Up to `n` distinct content terms in order of first appearance.
pub fn focus_terms(text: &str, n: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for token in tokenize(text) {
        if token.len() < 4 || is_stop_word(&token) || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let stemmed = stem(&token);
        if seen.insert(stemmed.clone()) {
            out.push(stemmed);
            if out.len() == n {
                break;
            }
        }
    }
    out
}
