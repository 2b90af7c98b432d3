//! Core types and constants

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source timestamp, kept in the offset it was recorded in
pub type Timestamp = DateTime<FixedOffset>;

/// Generation timestamp stamped on output rows
pub type GeneratedAt = DateTime<Utc>;

/// Monetary amount (fixed-point, never binary float)
pub type Money = Decimal;

/// Percentage on the 0-100 scale, rounded to 2 places
pub type Percent = Decimal;

/// Order source platform
///
/// Variant order is the canonical merge order for unified collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Shopify,
    Amazon,
    Lazada,
    Shopee,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Shopify,
        Platform::Amazon,
        Platform::Lazada,
        Platform::Shopee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Shopify => "shopify",
            Platform::Amazon => "amazon",
            Platform::Lazada => "lazada",
            Platform::Shopee => "shopee",
        }
    }

    /// Position in the canonical enumeration order
    pub fn index(&self) -> usize {
        match self {
            Platform::Shopify => 0,
            Platform::Amazon => 1,
            Platform::Lazada => 2,
            Platform::Shopee => 3,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = crate::error::DataPulseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shopify" => Ok(Platform::Shopify),
            "amazon" => Ok(Platform::Amazon),
            "lazada" => Ok(Platform::Lazada),
            "shopee" => Ok(Platform::Shopee),
            other => Err(crate::error::DataPulseError::Config(format!(
                "Unknown platform: {}",
                other
            ))),
        }
    }
}

/// Composite key joining items to orders; order ids are platform-scoped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    pub platform: Platform,
    pub order_id: String,
}

impl OrderKey {
    pub fn new(platform: Platform, order_id: impl Into<String>) -> Self {
        Self {
            platform,
            order_id: order_id.into(),
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.order_id)
    }
}
