// src/parsing/classify.rs
//
// Merchant type detection. The rule table is evaluated top to bottom and the
// first rule with a matching signal wins, so the table order IS the tie-break
// policy (e.g. a name carrying both CAFE and SHOP signals is a CAFE).
use std::fmt;

use crate::models::MerchantType;
use crate::parsing::normalize::tokenize;

/// A pattern over the tokens of a normalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A single token present anywhere.
    Token(&'static str),
    /// A contiguous token sequence.
    Phrase(&'static [&'static str]),
    /// Every token present, in any order and position.
    Together(&'static [&'static str]),
}

impl Signal {
    /// Token positions consumed by the first occurrence of this signal, or
    /// `None` if it does not occur.
    pub fn locate(&self, tokens: &[&str]) -> Option<Vec<usize>> {
        match self {
            Signal::Token(token) => tokens.iter().position(|t| t == token).map(|i| vec![i]),
            Signal::Phrase(seq) => {
                if seq.is_empty() || tokens.len() < seq.len() {
                    return None;
                }
                tokens
                    .windows(seq.len())
                    .position(|w| w == *seq)
                    .map(|start| (start..start + seq.len()).collect())
            }
            Signal::Together(parts) => {
                if parts.is_empty() {
                    return None;
                }
                let mut positions = Vec::with_capacity(parts.len());
                for part in parts.iter() {
                    positions.push(tokens.iter().position(|t| t == part)?);
                }
                positions.sort_unstable();
                positions.dedup();
                Some(positions)
            }
        }
    }

    pub fn matches(&self, tokens: &[&str]) -> bool {
        self.locate(tokens).is_some()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Token(token) => f.write_str(token),
            Signal::Phrase(seq) => f.write_str(&seq.join(" ")),
            Signal::Together(parts) => f.write_str(&parts.join("+")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeRule {
    pub merchant_type: MerchantType,
    pub signals: &'static [Signal],
}

/// Priority-ordered classification rules. OTHER is the implicit fallback.
pub static TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        merchant_type: MerchantType::HouseholdHkd,
        signals: &[Signal::Token("HKD"), Signal::Phrase(&["HO", "KINH", "DOANH"])],
    },
    TypeRule {
        merchant_type: MerchantType::Pharmacy,
        signals: &[
            Signal::Phrase(&["NHA", "THUOC"]),
            Signal::Phrase(&["QUAY", "THUOC"]),
            Signal::Token("PHARMACY"),
        ],
    },
    TypeRule {
        merchant_type: MerchantType::RestaurantQuan,
        signals: &[
            Signal::Phrase(&["QUAN", "AN"]),
            Signal::Phrase(&["NHA", "HANG"]),
            Signal::Token("RESTAURANT"),
        ],
    },
    TypeRule {
        merchant_type: MerchantType::HairSalon,
        signals: &[Signal::Together(&["SALON", "TOC"]), Signal::Phrase(&["TIEM", "TOC"])],
    },
    TypeRule {
        merchant_type: MerchantType::Gas,
        signals: &[Signal::Token("GAS"), Signal::Phrase(&["XANG", "DAU"])],
    },
    TypeRule {
        merchant_type: MerchantType::Cafe,
        signals: &[
            Signal::Token("CAFE"),
            Signal::Token("COFFEE"),
            Signal::Phrase(&["CA", "PHE"]),
        ],
    },
    TypeRule {
        merchant_type: MerchantType::Shop,
        signals: &[
            Signal::Together(&["CUA", "HANG"]),
            Signal::Token("SHOP"),
            Signal::Token("STORE"),
            Signal::Token("MART"),
        ],
    },
    TypeRule {
        merchant_type: MerchantType::OfficeVp,
        signals: &[Signal::Token("VP"), Signal::Phrase(&["VAN", "PHONG"])],
    },
    TypeRule {
        merchant_type: MerchantType::CompanyCt,
        signals: &[
            Signal::Token("CT"),
            Signal::Token("CTY"),
            Signal::Together(&["CONG", "TY"]),
            Signal::Token("TNHH"),
        ],
    },
];

/// Outcome of classification: the type and the signal that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub merchant_type: MerchantType,
    pub signal: Option<&'static Signal>,
}

impl Classification {
    pub const OTHER: Classification = Classification {
        merchant_type: MerchantType::Other,
        signal: None,
    };
}

pub fn classify(normalized: &str) -> Classification {
    classify_tokens(&tokenize(normalized))
}

pub fn classify_tokens(tokens: &[&str]) -> Classification {
    if tokens.is_empty() {
        return Classification::OTHER;
    }
    for rule in TYPE_RULES {
        if let Some(signal) = rule.signals.iter().find(|s| s.matches(tokens)) {
            return Classification {
                merchant_type: rule.merchant_type,
                signal: Some(signal),
            };
        }
    }
    Classification::OTHER
}

/// Every type whose rule matches, in priority order. Only the first is ever
/// used for blocking; this exists so tie-breaks can be inspected.
pub fn matching_types(normalized: &str) -> Vec<MerchantType> {
    let tokens = tokenize(normalized);
    TYPE_RULES
        .iter()
        .filter(|rule| rule.signals.iter().any(|s| s.matches(&tokens)))
        .map(|rule| rule.merchant_type)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table_priority_order() {
        let order: Vec<MerchantType> = TYPE_RULES.iter().map(|r| r.merchant_type).collect();
        assert_eq!(
            order,
            vec![
                MerchantType::HouseholdHkd,
                MerchantType::Pharmacy,
                MerchantType::RestaurantQuan,
                MerchantType::HairSalon,
                MerchantType::Gas,
                MerchantType::Cafe,
                MerchantType::Shop,
                MerchantType::OfficeVp,
                MerchantType::CompanyCt,
            ]
        );
        assert!(!order.contains(&MerchantType::Other));
    }

    #[test]
    fn test_classify_examples() {
        let c = classify("COOP MART QUAN 1");
        assert_eq!(c.merchant_type, MerchantType::Shop);
        assert_eq!(c.signal.map(|s| s.to_string()), Some("MART".to_string()));

        let c = classify("NHA THUOC LONG CHAU");
        assert_eq!(c.merchant_type, MerchantType::Pharmacy);
        assert_eq!(c.signal.map(|s| s.to_string()), Some("NHA THUOC".to_string()));

        assert_eq!(classify("HKD NGUYEN VAN A").merchant_type, MerchantType::HouseholdHkd);
        assert_eq!(classify("QUAN AN BA BA").merchant_type, MerchantType::RestaurantQuan);
        assert_eq!(classify("TOC DEP SALON MINH").merchant_type, MerchantType::HairSalon);
        assert_eq!(classify("CUA HANG XANG DAU SO 5").merchant_type, MerchantType::Gas);
        assert_eq!(classify("VAN PHONG LUAT HUNG").merchant_type, MerchantType::OfficeVp);
        assert_eq!(classify("CONG TY TNHH HOA SEN").merchant_type, MerchantType::CompanyCt);
    }

    #[test]
    fn test_multi_signal_tie_break_is_first_rule() {
        // CAFE is declared before SHOP
        let name = "SHOP CAFE MINH";
        assert_eq!(
            matching_types(name),
            vec![MerchantType::Cafe, MerchantType::Shop]
        );
        assert_eq!(classify(name).merchant_type, MerchantType::Cafe);

        // HKD outranks everything
        let name = "HKD NHA THUOC AN KHANG";
        assert_eq!(classify(name).merchant_type, MerchantType::HouseholdHkd);

        for _ in 0..10 {
            assert_eq!(classify("CTY CAFE SHOP VP").merchant_type, MerchantType::Cafe);
        }
    }

    #[test]
    fn test_phrase_requires_contiguity() {
        assert_ne!(classify("NHA MAY THUOC").merchant_type, MerchantType::Pharmacy);
        // QUAN alone is not a restaurant signal
        assert_eq!(classify("QUAN 1 BEN THANH").merchant_type, MerchantType::Other);
    }

    #[test]
    fn test_together_matches_any_order() {
        assert_eq!(classify("HANG CUA BINH").merchant_type, MerchantType::Shop);
        assert_eq!(classify("TY CONG AN").merchant_type, MerchantType::CompanyCt);
    }

    #[test]
    fn test_classify_is_total() {
        assert_eq!(classify(""), Classification::OTHER);
        assert_eq!(classify("PHO 24").merchant_type, MerchantType::Other);
        assert!(classify("PHO 24").signal.is_none());
    }

    #[test]
    fn test_signal_locate_positions() {
        let tokens = ["A", "NHA", "THUOC", "B"];
        assert_eq!(Signal::Phrase(&["NHA", "THUOC"]).locate(&tokens), Some(vec![1, 2]));
        assert_eq!(Signal::Token("B").locate(&tokens), Some(vec![3]));
        assert_eq!(Signal::Together(&["B", "A"]).locate(&tokens), Some(vec![0, 3]));
        assert_eq!(Signal::Token("C").locate(&tokens), None);
    }
}
