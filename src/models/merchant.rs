// src/models/merchant.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of business inferred from the signals in a merchant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchantType {
    CompanyCt,
    HouseholdHkd,
    Pharmacy,
    Gas,
    Shop,
    Cafe,
    RestaurantQuan,
    HairSalon,
    OfficeVp,
    Other,
}

impl MerchantType {
    pub const ALL: [MerchantType; 10] = [
        MerchantType::CompanyCt,
        MerchantType::HouseholdHkd,
        MerchantType::Pharmacy,
        MerchantType::Gas,
        MerchantType::Shop,
        MerchantType::Cafe,
        MerchantType::RestaurantQuan,
        MerchantType::HairSalon,
        MerchantType::OfficeVp,
        MerchantType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MerchantType::CompanyCt => "COMPANY_CT",
            MerchantType::HouseholdHkd => "HOUSEHOLD_HKD",
            MerchantType::Pharmacy => "PHARMACY",
            MerchantType::Gas => "GAS",
            MerchantType::Shop => "SHOP",
            MerchantType::Cafe => "CAFE",
            MerchantType::RestaurantQuan => "RESTAURANT_QUAN",
            MerchantType::HairSalon => "HAIR_SALON",
            MerchantType::OfficeVp => "OFFICE_VP",
            MerchantType::Other => "OTHER",
        }
    }
}

impl fmt::Display for MerchantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MerchantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MerchantType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown merchant type '{}'", s))
    }
}

/// One cell of a source column, keyed by its 0-based row ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub row_id: u64,
    pub raw_name: String,
    /// Set when the cell was missing or not valid UTF-8. `raw_name` then holds
    /// the lossy text and the parser sees an empty string.
    pub malformed: bool,
}

impl RawRecord {
    pub fn new(row_id: u64, raw_name: impl Into<String>) -> Self {
        Self {
            row_id,
            raw_name: raw_name.into(),
            malformed: false,
        }
    }

    pub fn malformed(row_id: u64, lossy: impl Into<String>) -> Self {
        Self {
            row_id,
            raw_name: lossy.into(),
            malformed: true,
        }
    }
}

/// A merchant name after normalization, classification and core extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedMerchant {
    pub row_id: u64,
    pub raw_name: String,
    pub normalized: String,
    pub merchant_type: MerchantType,
    pub core: String,
    pub suffix: String,
    /// Trailing district / branch markers (`Q1`, `T2`, `BTL`, ...). Not part of the key.
    pub locality: String,
}

impl ParsedMerchant {
    pub fn block_key(&self) -> BlockKey {
        BlockKey {
            merchant_type: self.merchant_type,
            core: self.core.clone(),
        }
    }

    pub fn has_empty_core(&self) -> bool {
        self.core.is_empty()
    }
}

/// Join key shared by every record of a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub merchant_type: MerchantType,
    pub core: String,
}

pub const BLOCK_KEY_SEPARATOR: char = '|';

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.merchant_type, BLOCK_KEY_SEPARATOR, self.core)
    }
}

/// Two records, one per side, that share a block key.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePair<'a> {
    pub left: &'a ParsedMerchant,
    pub right: &'a ParsedMerchant,
}

impl<'a> CandidatePair<'a> {
    pub fn new(left: &'a ParsedMerchant, right: &'a ParsedMerchant) -> Self {
        debug_assert_eq!(left.merchant_type, right.merchant_type);
        debug_assert_eq!(left.core, right.core);
        Self { left, right }
    }

    pub fn block_key(&self) -> String {
        self.left.block_key().to_string()
    }
}
