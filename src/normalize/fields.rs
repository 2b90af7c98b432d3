//! Field extraction shared by the platform normalizers
//!
//! Every helper reports failures as a mapping error carrying the platform,
//! the record identifier and the field name.

use crate::error::{DataPulseError, Result};
use crate::types::{Money, Platform, Timestamp};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Placeholder product id for lines whose platform omitted it
pub const UNKNOWN_PRODUCT_ID: &str = "unknown";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Deserialize an identifier or amount that may arrive as a JSON string or number
///
/// Blank strings are treated as missing.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        UInt(u64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Str(s)) => non_empty(Some(s)),
        Some(Raw::Int(i)) => Some(i.to_string()),
        Some(Raw::UInt(u)) => Some(u.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
    })
}

/// Trim and drop blank strings
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse an RFC 3339 timestamp, or a naive one interpreted at +00:00
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    let utc = FixedOffset::east_opt(0)?;
    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .and_then(|naive| naive.and_local_timezone(utc).single())
    })
}

/// Context for the record currently being normalized
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub platform: Platform,
    pub record_id: String,
}

impl RecordContext {
    /// Use the record's identifier when present, its position otherwise
    pub fn new(platform: Platform, id: Option<&String>, index: usize) -> Self {
        let record_id = match id {
            Some(id) => id.clone(),
            None => format!("#{}", index),
        };
        Self {
            platform,
            record_id,
        }
    }

    pub fn error(&self, field: &'static str, reason: impl Into<String>) -> DataPulseError {
        DataPulseError::mapping(self.platform, self.record_id.clone(), field, reason)
    }

    pub fn required(&self, field: &'static str, value: Option<&String>) -> Result<String> {
        value
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| self.error(field, "is missing"))
    }

    pub fn amount(&self, field: &'static str, value: Option<&String>) -> Result<Option<Money>> {
        match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => Decimal::from_str(v)
                .or_else(|_| Decimal::from_scientific(v))
                .map(Some)
                .map_err(|_| self.error(field, format!("is not a decimal amount: {:?}", v))),
        }
    }

    /// Amount defaulting to zero when absent
    pub fn amount_or_zero(&self, field: &'static str, value: Option<&String>) -> Result<Money> {
        Ok(self.amount(field, value)?.unwrap_or(Decimal::ZERO))
    }

    pub fn timestamp(&self, field: &'static str, value: Option<&String>) -> Result<Option<Timestamp>> {
        match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => parse_timestamp(v)
                .map(Some)
                .ok_or_else(|| self.error(field, format!("is not a timestamp: {:?}", v))),
        }
    }

    pub fn required_timestamp(&self, field: &'static str, value: Option<&String>) -> Result<Timestamp> {
        self.timestamp(field, value)?
            .ok_or_else(|| self.error(field, "is missing"))
    }

    /// Epoch seconds, interpreted in UTC
    pub fn epoch(&self, field: &'static str, value: Option<i64>) -> Result<Option<Timestamp>> {
        match value {
            None => Ok(None),
            Some(secs) => DateTime::from_timestamp(secs, 0)
                .map(|ts| Some(ts.fixed_offset()))
                .ok_or_else(|| self.error(field, format!("is out of range: {}", secs))),
        }
    }

    pub fn quantity(&self, field: &'static str, value: Option<i64>) -> Result<Option<u32>> {
        match value {
            None => Ok(None),
            Some(q) => u32::try_from(q)
                .map(Some)
                .map_err(|_| self.error(field, format!("must be a non-negative count, got {}", q))),
        }
    }

    pub fn required_quantity(&self, field: &'static str, value: Option<i64>) -> Result<u32> {
        self.quantity(field, value)?
            .ok_or_else(|| self.error(field, "is missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> RecordContext {
        RecordContext::new(Platform::Shopify, Some(&"3000001".to_string()), 0)
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let with_offset = parse_timestamp("2024-01-05T10:00:00+08:00").unwrap();
        assert_eq!(with_offset.offset().local_minus_utc(), 8 * 3600);

        let naive = parse_timestamp("2024-01-05 10:00:00").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);
        assert_eq!(naive.to_rfc3339(), "2024-01-05T10:00:00+00:00");

        assert!(parse_timestamp("2024-01-05T10:00:00.123").is_some());
        assert!(parse_timestamp("05/01/2024").is_none());
    }

    #[test]
    fn test_amount_parsing() {
        let c = ctx();
        assert_eq!(c.amount("total_price", Some(&"19.99".to_string())).unwrap(), Some(dec!(19.99)));
        assert_eq!(c.amount("total_price", None).unwrap(), None);
        assert_eq!(c.amount_or_zero("total_tax", Some(&" ".to_string())).unwrap(), Decimal::ZERO);

        let err = c.amount("total_price", Some(&"abc".to_string())).unwrap_err();
        assert!(err.to_string().contains("total_price"));
        assert!(err.to_string().contains("3000001"));
    }

    #[test]
    fn test_record_id_falls_back_to_position() {
        let c = RecordContext::new(Platform::Lazada, None, 7);
        assert_eq!(c.record_id, "#7");
        let err = c.required("order_id", None).unwrap_err();
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_quantity_rejects_negative() {
        let c = ctx();
        assert_eq!(c.required_quantity("quantity", Some(3)).unwrap(), 3);
        assert!(c.required_quantity("quantity", Some(-1)).is_err());
        assert!(c.required_quantity("quantity", None).is_err());
    }

    #[test]
    fn test_epoch() {
        let c = ctx();
        let ts = c.epoch("create_time", Some(1_704_067_200)).unwrap().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(c.epoch("pay_time", None).unwrap(), None);
    }

    #[test]
    fn test_string_or_number_deserializer() {
        #[derive(Deserialize)]
        struct IdField {
            #[serde(default, deserialize_with = "opt_string_or_number")]
            id: Option<String>,
        }
        let p: IdField = serde_json::from_str(r#"{"id": 3000001}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("3000001"));
        let p: IdField = serde_json::from_str(r#"{"id": "  "}"#).unwrap();
        assert_eq!(p.id, None);
        let p: IdField = serde_json::from_str(r#"{"id": 12.5}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("12.5"));
        let p: IdField = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.id, None);
    }
}
