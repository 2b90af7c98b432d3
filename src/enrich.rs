//! Order enrichment
//!
//! Adds the USD amount, calendar bucket keys and status flags to every
//! unified order. Enrichment is a pure function of the order, the rate table
//! and the status policy.

use crate::calendar::CalendarBuckets;
use crate::currency::{normalize_code, CurrencyRates, RateLookup};
use crate::error::{DataPulseError, Result};
use crate::order::Order;
use crate::status::{FulfillmentClass, PaymentClass, StatusPolicy};
use crate::types::{Money, Platform};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical order plus derived currency, calendar and status fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub total_amount_usd: Money,
    pub order_date: NaiveDate,
    pub order_week: NaiveDate,
    pub order_month: NaiveDate,
    pub order_quarter: NaiveDate,
    pub order_year: NaiveDate,
    pub order_hour: u32,
    /// 0 = Sunday
    pub order_day_of_week: u32,
    pub payment_class: PaymentClass,
    pub fulfillment_class: FulfillmentClass,
    pub is_paid: bool,
    pub is_fulfilled: bool,
    pub is_cancelled: bool,
}

impl EnrichedOrder {
    pub fn platform(&self) -> Platform {
        self.order.platform
    }

    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }

    /// Total minus discount, in platform currency
    pub fn net_amount(&self) -> Money {
        self.order.total_amount - self.order.discount_amount
    }
}

/// Enriches orders against a rate table and a status policy
#[derive(Debug, Clone, Copy)]
pub struct Enricher<'a> {
    rates: &'a CurrencyRates,
    policy: &'a StatusPolicy,
}

impl<'a> Enricher<'a> {
    pub fn new(rates: &'a CurrencyRates, policy: &'a StatusPolicy) -> Self {
        Self { rates, policy }
    }

    pub fn enrich_order(&self, order: &Order) -> Result<EnrichedOrder> {
        let total_amount_usd = self
            .rates
            .try_convert(order.total_amount, &order.currency_code)
            .ok_or_else(|| DataPulseError::MissingCurrencyRate {
                currency: order.currency_code.clone(),
                platform: order.platform,
                order_id: order.order_id.clone(),
            })?;

        let buckets = CalendarBuckets::from_timestamp(&order.created_at);
        let payment_class = self
            .policy
            .classify_payment(order.platform, order.payment_status.as_deref());
        let fulfillment_class = self
            .policy
            .classify_fulfillment(order.platform, order.fulfillment_status.as_deref());

        Ok(EnrichedOrder {
            order: order.clone(),
            total_amount_usd,
            order_date: buckets.date,
            order_week: buckets.week,
            order_month: buckets.month,
            order_quarter: buckets.quarter,
            order_year: buckets.year,
            order_hour: buckets.hour,
            order_day_of_week: buckets.day_of_week,
            payment_class,
            fulfillment_class,
            is_paid: payment_class == PaymentClass::Paid,
            is_fulfilled: fulfillment_class == FulfillmentClass::Fulfilled,
            is_cancelled: order.cancelled_at.is_some(),
        })
    }

    /// Enrich every order, preserving input order
    ///
    /// Codes converted at the identity rate are logged once each.
    pub fn enrich(&self, orders: &[Order]) -> Result<Vec<EnrichedOrder>> {
        let enriched = orders
            .iter()
            .map(|o| self.enrich_order(o))
            .collect::<Result<Vec<_>>>()?;

        let unknown: BTreeSet<String> = orders
            .iter()
            .filter(|o| self.rates.lookup(&o.currency_code) == RateLookup::Unknown)
            .map(|o| normalize_code(&o.currency_code))
            .collect();
        for code in unknown {
            log::warn!("No rate for currency {}, converting at 1.0", code);
        }

        log::info!("Enriched {} orders", enriched.len());
        Ok(enriched)
    }
}
