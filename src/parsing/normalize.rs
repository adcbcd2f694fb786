// src/parsing/normalize.rs
//
// Normalization is a fixed pipeline:
//   1. Unicode uppercase
//   2. diacritic folding (NFD, drop combining marks, Đ -> D)
//   3. ordered lexical rewrites
//   4. anything other than a letter, digit or whitespace becomes a space
//   5. collapse whitespace, trim
//
// Every rewrite pattern contains punctuation, so a normalized string can never
// match one again. That keeps `normalize` idempotent.
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Applied in order on the uppercased, folded text, before punctuation is
/// stripped. Each pattern only matches a whole word, never inside a longer one.
pub const LEXICAL_REWRITES: [(&str, &str); 3] = [
    (r"\bCO[.\-]OP\b", "COOP"),
    (r"\bH\.K\.D\b", "HKD"),
    (r"\bC\.TY\b", "CTY"),
];

static REWRITE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    LEXICAL_REWRITES
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("static regex"), *replacement))
        .collect()
});

pub fn normalize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let upper = raw.to_uppercase();
    let mut folded = fold_diacritics(&upper);

    for (pattern, replacement) in REWRITE_PATTERNS.iter() {
        if pattern.is_match(&folded) {
            folded = pattern.replace_all(&folded, *replacement).into_owned();
        }
    }

    let cleaned: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips Vietnamese (and any other combining) diacritics.
/// `Đ`/`đ` carry a stroke rather than a combining mark and are mapped by hand.
pub fn fold_diacritics(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'Đ' => 'D',
            'đ' => 'd',
            other => other,
        })
        .collect()
}

/// Splits a normalized name into its tokens. The empty name has none.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
