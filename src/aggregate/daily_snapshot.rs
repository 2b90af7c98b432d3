//! Cross-platform daily snapshot
//!
//! One row per calendar date over non-cancelled orders, with moving averages
//! and day-over-day / week-over-week deltas taken along the date series.

use super::RunContext;
use crate::calendar::days_between;
use crate::config::PipelineConfig;
use crate::enrich::EnrichedOrder;
use crate::trend::{lag, lag_delta, moving_average, percent_of, round2};
use crate::types::{GeneratedAt, Money, Percent, Platform};
use chrono::NaiveDate;
use hashbrown::HashSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Window and lag settings for the snapshot series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotWindows {
    pub short_window: usize,
    pub long_window: usize,
    pub week_lag: usize,
    /// Emit zero rows for dates without orders between the first and last order
    pub fill_missing_dates: bool,
}

impl Default for SnapshotWindows {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for SnapshotWindows {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            short_window: config.short_window,
            long_window: config.long_window,
            week_lag: config.week_lag,
            fill_missing_dates: config.fill_missing_dates,
        }
    }
}

/// Orders and USD revenue of one platform on one date
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformTotals {
    pub orders: u64,
    pub revenue_usd: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub order_date: NaiveDate,
    pub total_orders: u64,
    pub total_revenue_usd: Money,
    pub avg_order_value_usd: Money,
    pub total_items_sold: u64,
    /// Always holds all four platforms
    pub platforms: BTreeMap<Platform, PlatformTotals>,
    pub unique_customers: u64,
    pub fulfilled_orders: u64,
    /// Fulfilled over all orders of the day
    pub fulfillment_rate: Percent,
    pub revenue_7d_avg: Money,
    pub orders_7d_avg: Decimal,
    pub revenue_30d_avg: Money,
    pub orders_30d_avg: Decimal,
    pub revenue_dod_change: Option<Money>,
    pub orders_dod_change: Option<i64>,
    pub revenue_wow_change: Option<Money>,
    pub orders_wow_change: Option<i64>,
    pub generated_at: GeneratedAt,
}

impl DailySnapshot {
    pub fn platform(&self, platform: Platform) -> PlatformTotals {
        self.platforms.get(&platform).copied().unwrap_or_default()
    }
}

#[derive(Default)]
struct DayTotals<'a> {
    orders: u64,
    revenue_usd: Money,
    items: u64,
    fulfilled: u64,
    customers: HashSet<(Platform, &'a str)>,
    platforms: [PlatformTotals; 4],
}

impl<'a> DayTotals<'a> {
    fn add(&mut self, order: &'a EnrichedOrder) {
        self.orders += 1;
        self.revenue_usd += order.total_amount_usd;
        self.items += u64::from(order.order.item_count);
        if order.is_fulfilled {
            self.fulfilled += 1;
        }
        if let Some(customer) = order.order.customer_id.as_deref() {
            self.customers.insert((order.platform(), customer));
        }
        let slot = &mut self.platforms[order.platform().index()];
        slot.orders += 1;
        slot.revenue_usd += order.total_amount_usd;
    }
}

/// Build the snapshot table, newest date first
pub fn build_daily_snapshots(
    orders: &[EnrichedOrder],
    windows: &SnapshotWindows,
    ctx: &RunContext,
) -> Vec<DailySnapshot> {
    let mut by_date: BTreeMap<NaiveDate, DayTotals<'_>> = BTreeMap::new();
    for order in orders.iter().filter(|o| !o.is_cancelled) {
        by_date.entry(order.order_date).or_default().add(order);
    }

    let (Some(&first), Some(&last)) = (by_date.keys().next(), by_date.keys().next_back()) else {
        return Vec::new();
    };
    let dates = if windows.fill_missing_dates {
        days_between(first, last)
    } else {
        by_date.keys().copied().collect()
    };
    let filled = dates.len() - by_date.len();
    if filled > 0 {
        log::debug!("Filled {} dates without orders between {} and {}", filled, first, last);
    }

    let empty = DayTotals::default();
    let days: Vec<&DayTotals<'_>> = dates.iter().map(|d| by_date.get(d).unwrap_or(&empty)).collect();

    let revenue: Vec<Money> = days.iter().map(|d| d.revenue_usd).collect();
    let counts: Vec<i64> = days.iter().map(|d| d.orders as i64).collect();
    let counts_dec: Vec<Decimal> = counts.iter().map(|&c| Decimal::from(c)).collect();

    let revenue_short = moving_average(&revenue, windows.short_window);
    let revenue_long = moving_average(&revenue, windows.long_window);
    let orders_short = moving_average(&counts_dec, windows.short_window);
    let orders_long = moving_average(&counts_dec, windows.long_window);
    let revenue_dod = lag_delta(&revenue, 1);
    let revenue_wow = lag_delta(&revenue, windows.week_lag);
    let orders_prev_day = lag(&counts, 1);
    let orders_prev_week = lag(&counts, windows.week_lag);

    let mut rows: Vec<DailySnapshot> = dates
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            let day = days[i];
            let avg_order_value_usd = if day.orders == 0 {
                Decimal::ZERO
            } else {
                round2(day.revenue_usd / Decimal::from(day.orders))
            };
            DailySnapshot {
                order_date: date,
                total_orders: day.orders,
                total_revenue_usd: day.revenue_usd,
                avg_order_value_usd,
                total_items_sold: day.items,
                platforms: Platform::ALL
                    .iter()
                    .map(|p| (*p, day.platforms[p.index()]))
                    .collect(),
                unique_customers: day.customers.len() as u64,
                fulfilled_orders: day.fulfilled,
                fulfillment_rate: percent_of(Decimal::from(day.fulfilled), Decimal::from(day.orders)),
                revenue_7d_avg: round2(revenue_short[i]),
                orders_7d_avg: round2(orders_short[i]),
                revenue_30d_avg: round2(revenue_long[i]),
                orders_30d_avg: round2(orders_long[i]),
                revenue_dod_change: revenue_dod[i],
                orders_dod_change: orders_prev_day[i].map(|p| counts[i] - p),
                revenue_wow_change: revenue_wow[i],
                orders_wow_change: orders_prev_week[i].map(|p| counts[i] - p),
                generated_at: ctx.generated_at,
            }
        })
        .collect();

    rows.reverse();
    log::debug!("Built {} daily snapshots", rows.len());
    rows
}
