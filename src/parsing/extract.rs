// src/parsing/extract.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::parsing::classify::Signal;
use crate::parsing::normalize::tokenize;

/// Generic descriptors that never identify a brand.
pub const GENERIC_TOKENS: [&str; 10] = [
    "CH", "CUA", "HANG", "TIEM", "SHOP", "STORE", "MART", "POS", "QUAN", "AN",
];

/// Vietnamese legal-form markers.
pub const LEGAL_FORM_TOKENS: [&str; 9] = [
    "CONG", "TY", "CTY", "CT", "TNHH", "MTV", "CP", "DNTN", "HKD",
];

/// Trailing district / branch markers, besides digits and `T<n>`.
pub const LOCALITY_TOKENS: [&str; 18] = [
    "BTL", "Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7", "Q8", "Q9", "Q10", "Q11", "Q12", "GO",
    "VAP", "GV", "OCP", "CPC",
];

static STOPLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    GENERIC_TOKENS
        .iter()
        .chain(LEGAL_FORM_TOKENS.iter())
        .copied()
        .collect()
});

static FLOOR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^T\d+$").expect("static regex"));

pub fn is_stoplisted(token: &str) -> bool {
    STOPLIST.contains(token)
}

/// Split of a normalized name around its core token.
///
/// The normalized tokens are partitioned as `prefix ++ [core] ++ suffix`;
/// `prefix` holds the removed signal/stoplist tokens that precede the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub core: String,
    pub suffix: String,
}

/// Picks the brand token of `normalized` once the classification signal and
/// the stoplist are discounted. Falls back to the whole name when nothing is
/// left, so the core is empty only for an empty name.
pub fn extract(normalized: &str, signal: Option<&Signal>) -> Extraction {
    let tokens = tokenize(normalized);
    if tokens.is_empty() {
        return Extraction {
            core: String::new(),
            suffix: String::new(),
        };
    }

    let consumed: Vec<usize> = signal
        .and_then(|s| s.locate(&tokens))
        .unwrap_or_default();

    let core_idx = tokens
        .iter()
        .enumerate()
        .position(|(i, tok)| !consumed.contains(&i) && !is_stoplisted(tok));

    match core_idx {
        Some(idx) => Extraction {
            core: tokens[idx].to_string(),
            suffix: tokens[idx + 1..].join(" "),
        },
        None => Extraction {
            core: tokens.join(" "),
            suffix: String::new(),
        },
    }
}

/// Trailing run of district / branch markers (`... Q1`, `... T2 12`).
pub fn extract_locality(normalized: &str) -> String {
    let tokens = tokenize(normalized);
    let start = tokens
        .iter()
        .rposition(|tok| !is_locality_token(tok))
        .map(|i| i + 1)
        .unwrap_or(0);
    tokens[start..].join(" ")
}

fn is_locality_token(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
        || FLOOR_TOKEN.is_match(token)
        || LOCALITY_TOKENS.contains(&token)
}
