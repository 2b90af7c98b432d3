//! Per-platform overview
//!
//! Order counts include cancelled orders; revenue and averages do not.
//! Month and day windows are relative to the run's `as_of` date.

use super::RunContext;
use crate::calendar::{month_start, previous_month_start};
use crate::enrich::EnrichedOrder;
use crate::trend::{growth_pct, percent_of, round2};
use crate::types::{GeneratedAt, Money, Percent, Platform};
use chrono::NaiveDate;
use hashbrown::HashSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformOverview {
    pub platform: Platform,
    pub total_orders: u64,
    pub completed_orders: u64,
    pub cancelled_orders: u64,
    pub total_revenue_usd: Money,
    pub orders_this_month: u64,
    pub revenue_this_month_usd: Money,
    pub orders_last_month: u64,
    pub revenue_last_month_usd: Money,
    pub orders_today: u64,
    pub revenue_today_usd: Money,
    pub avg_order_value_usd: Money,
    pub avg_items_per_order: Decimal,
    /// Paid over all orders
    pub payment_rate: Percent,
    /// Fulfilled over paid orders
    pub fulfillment_rate: Percent,
    /// Cancelled over all orders
    pub cancellation_rate: Percent,
    pub first_order_date: NaiveDate,
    pub last_order_date: NaiveDate,
    pub active_days: u64,
    pub revenue_mom_growth_pct: Percent,
    pub orders_mom_growth_pct: Percent,
    pub generated_at: GeneratedAt,
}

/// One row per platform with at least one order, in platform order
pub fn build_platform_overview(orders: &[EnrichedOrder], ctx: &RunContext) -> Vec<PlatformOverview> {
    let this_month = month_start(ctx.as_of);
    let last_month = previous_month_start(ctx.as_of);

    Platform::ALL
        .iter()
        .filter_map(|&platform| {
            let rows: Vec<&EnrichedOrder> = orders.iter().filter(|o| o.platform() == platform).collect();
            overview_for(platform, &rows, this_month, last_month, ctx)
        })
        .collect()
}

fn overview_for(
    platform: Platform,
    rows: &[&EnrichedOrder],
    this_month: NaiveDate,
    last_month: NaiveDate,
    ctx: &RunContext,
) -> Option<PlatformOverview> {
    let first_order_date = rows.iter().map(|o| o.order_date).min()?;
    let last_order_date = rows.iter().map(|o| o.order_date).max()?;

    let count = |pred: &dyn Fn(&EnrichedOrder) -> bool| rows.iter().filter(|&&o| pred(o)).count() as u64;
    let revenue = |pred: &dyn Fn(&EnrichedOrder) -> bool| -> Money {
        rows.iter()
            .filter(|&&o| !o.is_cancelled && pred(o))
            .map(|o| o.total_amount_usd)
            .sum()
    };

    let total_orders = rows.len() as u64;
    let cancelled_orders = count(&|o| o.is_cancelled);
    let completed_orders = total_orders - cancelled_orders;
    let paid = count(&|o| o.is_paid);
    let fulfilled = count(&|o| o.is_fulfilled);

    let orders_this_month = count(&|o| o.order_month == this_month);
    let orders_last_month = count(&|o| o.order_month == last_month);
    let revenue_this_month_usd = revenue(&|o| o.order_month == this_month);
    let revenue_last_month_usd = revenue(&|o| o.order_month == last_month);

    let (avg_order_value_usd, avg_items_per_order) = if completed_orders == 0 {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let n = Decimal::from(completed_orders);
        let items: u64 = rows
            .iter()
            .filter(|o| !o.is_cancelled)
            .map(|o| u64::from(o.order.item_count))
            .sum();
        (round2(revenue(&|_| true) / n), round2(Decimal::from(items) / n))
    };

    let active_days = rows.iter().map(|o| o.order_date).collect::<HashSet<_>>().len() as u64;

    Some(PlatformOverview {
        platform,
        total_orders,
        completed_orders,
        cancelled_orders,
        total_revenue_usd: revenue(&|_| true),
        orders_this_month,
        revenue_this_month_usd,
        orders_last_month,
        revenue_last_month_usd,
        orders_today: count(&|o| o.order_date == ctx.as_of),
        revenue_today_usd: revenue(&|o| o.order_date == ctx.as_of),
        avg_order_value_usd,
        avg_items_per_order,
        payment_rate: percent_of(Decimal::from(paid), Decimal::from(total_orders)),
        fulfillment_rate: percent_of(Decimal::from(fulfilled), Decimal::from(paid)),
        cancellation_rate: percent_of(Decimal::from(cancelled_orders), Decimal::from(total_orders)),
        first_order_date,
        last_order_date,
        active_days,
        revenue_mom_growth_pct: growth_pct(revenue_this_month_usd, Some(revenue_last_month_usd)),
        orders_mom_growth_pct: growth_pct(
            Decimal::from(orders_this_month),
            Some(Decimal::from(orders_last_month)),
        ),
        generated_at: ctx.generated_at,
    })
}
