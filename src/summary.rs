//! Dashboard summary across platforms

use crate::aggregate::{Aggregates, DailySnapshot, PlatformOverview, RunContext};
use crate::enrich::EnrichedOrder;
use crate::trend::{growth_pct, round2};
use crate::types::{GeneratedAt, Money, Percent, Platform};
use chrono::{Duration, NaiveDate};
use hashbrown::HashSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_revenue_usd: Money,
    pub total_orders: u64,
    pub avg_order_value_usd: Money,
    pub revenue_growth_pct: Percent,
    pub orders_growth_pct: Percent,
    /// Distinct `(platform, customer_id)` pairs
    pub total_customers: u64,
    /// Highest revenue first
    pub platforms: Vec<PlatformOverview>,
    /// Snapshots in the `recent_days` window ending at `as_of`, newest first
    pub recent_days: Vec<DailySnapshot>,
    pub generated_at: GeneratedAt,
}

/// Roll the platform overview up into headline numbers
pub fn build_dashboard_summary(
    orders: &[EnrichedOrder],
    aggregates: &Aggregates,
    recent_days: usize,
    ctx: &RunContext,
) -> DashboardSummary {
    let overview = &aggregates.platform_overview;
    let total_revenue: Money = overview.iter().map(|p| p.total_revenue_usd).sum();
    let total_orders: u64 = overview.iter().map(|p| p.total_orders).sum();
    let revenue_this_month: Money = overview.iter().map(|p| p.revenue_this_month_usd).sum();
    let revenue_last_month: Money = overview.iter().map(|p| p.revenue_last_month_usd).sum();
    let orders_this_month: u64 = overview.iter().map(|p| p.orders_this_month).sum();
    let orders_last_month: u64 = overview.iter().map(|p| p.orders_last_month).sum();

    let avg_order_value_usd = if total_orders == 0 {
        Decimal::ZERO
    } else {
        round2(total_revenue / Decimal::from(total_orders))
    };

    let customers: HashSet<(Platform, &str)> = orders
        .iter()
        .filter_map(|o| o.order.customer_id.as_deref().map(|c| (o.platform(), c)))
        .collect();

    let mut platforms = overview.clone();
    platforms.sort_by(|a, b| b.total_revenue_usd.cmp(&a.total_revenue_usd));

    let window_start = i64::try_from(recent_days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|span| ctx.as_of.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN);
    let recent: Vec<DailySnapshot> = aggregates
        .daily_snapshots
        .iter()
        .filter(|d| d.order_date >= window_start && d.order_date <= ctx.as_of)
        .take(recent_days)
        .cloned()
        .collect();

    DashboardSummary {
        total_revenue_usd: round2(total_revenue),
        total_orders,
        avg_order_value_usd,
        revenue_growth_pct: growth_pct(revenue_this_month, Some(revenue_last_month)),
        orders_growth_pct: growth_pct(
            Decimal::from(orders_this_month),
            Some(Decimal::from(orders_last_month)),
        ),
        total_customers: customers.len() as u64,
        platforms,
        recent_days: recent,
        generated_at: ctx.generated_at,
    }
}
