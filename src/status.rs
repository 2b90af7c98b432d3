//! Payment and fulfillment status classification
//!
//! Platforms report free-text status vocabularies. The lenient policy matches
//! them against fixed literal sets shared by every platform. The translated
//! policy looks each `(platform, native status)` pair up in an explicit table
//! and surfaces anything missing as `Unmapped` instead of silently treating it
//! as unpaid or unfulfilled.

use crate::error::{DataPulseError, Result};
use crate::order::Order;
use crate::types::Platform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Payment statuses counted as paid under the lenient policy (case-sensitive)
pub const PAID_STATUSES: [&str; 3] = ["paid", "authorized", "partially_paid"];

/// Fulfillment statuses counted as fulfilled under the lenient policy (case-sensitive)
pub const FULFILLED_STATUSES: [&str; 5] = ["fulfilled", "shipped", "delivered", "COMPLETED", "Shipped"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentClass {
    Paid,
    Unpaid,
    Unmapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentClass {
    Fulfilled,
    Unfulfilled,
    Unmapped,
}

/// Which status field a native value was reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusField {
    Payment,
    Fulfillment,
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusField::Payment => write!(f, "payment"),
            StatusField::Fulfillment => write!(f, "fulfillment"),
        }
    }
}

/// A native status with no entry in the translation table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnmappedStatus {
    pub platform: Platform,
    pub field: StatusField,
    pub native: String,
}

impl fmt::Display for UnmappedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.platform, self.field, self.native)
    }
}

/// Translation table for one platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatusMap {
    #[serde(default)]
    pub payment: BTreeMap<String, PaymentClass>,
    #[serde(default)]
    pub fulfillment: BTreeMap<String, FulfillmentClass>,
}

/// Explicit `(platform, native status)` to canonical class table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTranslation {
    platforms: BTreeMap<Platform, PlatformStatusMap>,
    /// Reject a run when any observed status is unmapped
    pub require_complete: bool,
}

impl StatusTranslation {
    pub fn new(require_complete: bool) -> Self {
        Self {
            platforms: BTreeMap::new(),
            require_complete,
        }
    }

    pub fn insert_payment(&mut self, platform: Platform, native: &str, class: PaymentClass) {
        self.platforms
            .entry(platform)
            .or_default()
            .payment
            .insert(native.to_string(), class);
    }

    pub fn insert_fulfillment(&mut self, platform: Platform, native: &str, class: FulfillmentClass) {
        self.platforms
            .entry(platform)
            .or_default()
            .fulfillment
            .insert(native.to_string(), class);
    }

    pub fn set_platform(&mut self, platform: Platform, map: PlatformStatusMap) {
        self.platforms.insert(platform, map);
    }

    pub fn payment(&self, platform: Platform, native: &str) -> Option<PaymentClass> {
        self.platforms.get(&platform)?.payment.get(native).copied()
    }

    pub fn fulfillment(&self, platform: Platform, native: &str) -> Option<FulfillmentClass> {
        self.platforms.get(&platform)?.fulfillment.get(native).copied()
    }

    pub fn len(&self) -> usize {
        self.platforms
            .values()
            .map(|m| m.payment.len() + m.fulfillment.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How native statuses become the paid and fulfilled flags
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StatusPolicy {
    /// Literal match against the shared status sets
    #[default]
    Lenient,
    Translated(StatusTranslation),
}

impl StatusPolicy {
    /// Classify a payment status. A missing status is never paid and never unmapped.
    pub fn classify_payment(&self, platform: Platform, status: Option<&str>) -> PaymentClass {
        let Some(status) = status else {
            return PaymentClass::Unpaid;
        };
        match self {
            StatusPolicy::Lenient => {
                if PAID_STATUSES.contains(&status) {
                    PaymentClass::Paid
                } else {
                    PaymentClass::Unpaid
                }
            }
            StatusPolicy::Translated(table) => table
                .payment(platform, status)
                .unwrap_or(PaymentClass::Unmapped),
        }
    }

    /// Classify a fulfillment status. A missing status is never fulfilled and never unmapped.
    pub fn classify_fulfillment(&self, platform: Platform, status: Option<&str>) -> FulfillmentClass {
        let Some(status) = status else {
            return FulfillmentClass::Unfulfilled;
        };
        match self {
            StatusPolicy::Lenient => {
                if FULFILLED_STATUSES.contains(&status) {
                    FulfillmentClass::Fulfilled
                } else {
                    FulfillmentClass::Unfulfilled
                }
            }
            StatusPolicy::Translated(table) => table
                .fulfillment(platform, status)
                .unwrap_or(FulfillmentClass::Unmapped),
        }
    }

    /// Every observed native status the policy cannot classify, sorted
    pub fn unmapped(&self, orders: &[Order]) -> Vec<UnmappedStatus> {
        if matches!(self, StatusPolicy::Lenient) {
            return Vec::new();
        }
        let mut missing = BTreeSet::new();
        for order in orders {
            let payment = order.payment_status.as_deref();
            if self.classify_payment(order.platform, payment) == PaymentClass::Unmapped {
                missing.insert(UnmappedStatus {
                    platform: order.platform,
                    field: StatusField::Payment,
                    native: payment.unwrap_or_default().to_string(),
                });
            }
            let fulfillment = order.fulfillment_status.as_deref();
            if self.classify_fulfillment(order.platform, fulfillment) == FulfillmentClass::Unmapped {
                missing.insert(UnmappedStatus {
                    platform: order.platform,
                    field: StatusField::Fulfillment,
                    native: fulfillment.unwrap_or_default().to_string(),
                });
            }
        }
        missing.into_iter().collect()
    }

    /// Check the table covers every observed status
    ///
    /// Unmapped statuses are an error when the table requires completeness and
    /// a warning otherwise.
    pub fn validate(&self, orders: &[Order]) -> Result<()> {
        let StatusPolicy::Translated(table) = self else {
            return Ok(());
        };
        let missing = self.unmapped(orders);
        if missing.is_empty() {
            return Ok(());
        }
        let pairs: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
        if table.require_complete {
            return Err(DataPulseError::UnmappedStatus(pairs));
        }
        for pair in &pairs {
            log::warn!("Unmapped status {}", pair);
        }
        Ok(())
    }
}
