//! Daily revenue per platform
//!
//! Rows are keyed by `(order_date, platform)` over non-cancelled orders.
//! Previous-day values, month-to-date totals and growth are computed along
//! each platform's own date sequence.

use super::RunContext;
use crate::calendar::month_start;
use crate::enrich::EnrichedOrder;
use crate::trend::{growth_pct, lag, partition_by, round2, running_total_by};
use crate::types::{GeneratedAt, Money, Percent, Platform};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub order_date: NaiveDate,
    pub platform: Platform,
    pub total_orders: u64,
    /// Platform currency
    pub gross_revenue: Money,
    pub gross_revenue_usd: Money,
    /// Gross minus discounts, platform currency
    pub net_revenue: Money,
    pub avg_order_value: Money,
    pub avg_order_value_usd: Money,
    pub paid_orders: u64,
    pub unpaid_orders: u64,
    pub fulfilled_orders: u64,
    /// Paid but not yet fulfilled
    pub pending_fulfillment: u64,
    /// USD revenue of the platform's previous row
    pub prev_day_revenue: Option<Money>,
    pub revenue_change: Option<Money>,
    pub mtd_revenue_usd: Money,
    pub mtd_orders: u64,
    pub revenue_growth_pct: Percent,
    pub generated_at: GeneratedAt,
}

#[derive(Default)]
struct DayPlatform {
    orders: u64,
    gross: Money,
    gross_usd: Money,
    net: Money,
    paid: u64,
    fulfilled: u64,
    pending: u64,
}

/// Build the revenue table ordered by date, then platform
pub fn build_revenue_summary(orders: &[EnrichedOrder], ctx: &RunContext) -> Vec<RevenueSummary> {
    let mut groups: BTreeMap<(NaiveDate, Platform), DayPlatform> = BTreeMap::new();
    for order in orders.iter().filter(|o| !o.is_cancelled) {
        let g = groups.entry((order.order_date, order.platform())).or_default();
        g.orders += 1;
        g.gross += order.order.total_amount;
        g.gross_usd += order.total_amount_usd;
        g.net += order.net_amount();
        if order.is_paid {
            g.paid += 1;
            if !order.is_fulfilled {
                g.pending += 1;
            }
        }
        if order.is_fulfilled {
            g.fulfilled += 1;
        }
    }

    let mut rows: Vec<RevenueSummary> = groups
        .into_iter()
        .map(|((order_date, platform), g)| {
            let n = Decimal::from(g.orders);
            RevenueSummary {
                order_date,
                platform,
                total_orders: g.orders,
                gross_revenue: g.gross,
                gross_revenue_usd: g.gross_usd,
                net_revenue: g.net,
                avg_order_value: round2(g.gross / n),
                avg_order_value_usd: round2(g.gross_usd / n),
                paid_orders: g.paid,
                unpaid_orders: g.orders - g.paid,
                fulfilled_orders: g.fulfilled,
                pending_fulfillment: g.pending,
                prev_day_revenue: None,
                revenue_change: None,
                mtd_revenue_usd: Decimal::ZERO,
                mtd_orders: 0,
                revenue_growth_pct: Decimal::ZERO,
                generated_at: ctx.generated_at,
            }
        })
        .collect();

    let partitions = partition_by(&rows, |r| r.platform, |r| r.order_date);
    for indices in partitions.values() {
        let revenue: Vec<Money> = indices.iter().map(|&i| rows[i].gross_revenue_usd).collect();
        let counts: Vec<Decimal> = indices.iter().map(|&i| Decimal::from(rows[i].total_orders)).collect();
        let months: Vec<NaiveDate> = indices.iter().map(|&i| month_start(rows[i].order_date)).collect();

        let previous = lag(&revenue, 1);
        let mtd_revenue = running_total_by(&revenue, &months);
        let mtd_orders = running_total_by(&counts, &months);

        for (pos, &i) in indices.iter().enumerate() {
            let row = &mut rows[i];
            row.prev_day_revenue = previous[pos];
            row.revenue_change = previous[pos].map(|p| revenue[pos] - p);
            row.mtd_revenue_usd = mtd_revenue[pos];
            row.mtd_orders = mtd_orders[pos].try_into().unwrap_or(u64::MAX);
            row.revenue_growth_pct = growth_pct(revenue[pos], previous[pos]);
        }
    }

    log::debug!("Built {} revenue summary rows", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn php(platform: Platform, id: &str, ts: &str, total: Money) -> crate::order::Order {
        let mut o = order(platform, id, ts, total);
        o.currency_code = "PHP".to_string();
        o
    }

    #[test]
    fn test_partitioned_lag_and_growth() {
        let orders = enrich(&[
            order(Platform::Shopify, "1", "2024-01-30T10:00:00+00:00", dec!(100)),
            order(Platform::Shopify, "2", "2024-01-31T10:00:00+00:00", dec!(150)),
            order(Platform::Shopify, "3", "2024-02-01T10:00:00+00:00", dec!(75)),
            php(Platform::Lazada, "9", "2024-01-31T10:00:00+00:00", dec!(1000)),
        ]);
        let rows = build_revenue_summary(&orders, &ctx("2024-02-01"));
        assert_eq!(rows.len(), 4);

        let shopify: Vec<&RevenueSummary> = rows.iter().filter(|r| r.platform == Platform::Shopify).collect();
        assert_eq!(shopify[0].prev_day_revenue, None);
        assert_eq!(shopify[0].revenue_growth_pct, Decimal::ZERO);
        assert_eq!(shopify[1].prev_day_revenue, Some(dec!(100)));
        assert_eq!(shopify[1].revenue_change, Some(dec!(50)));
        assert_eq!(shopify[1].revenue_growth_pct, dec!(50.00));
        assert_eq!(shopify[1].mtd_revenue_usd, dec!(250));
        assert_eq!(shopify[1].mtd_orders, 2);
        // Month-to-date resets on February 1st
        assert_eq!(shopify[2].mtd_revenue_usd, dec!(75));
        assert_eq!(shopify[2].mtd_orders, 1);
        assert_eq!(shopify[2].revenue_growth_pct, dec!(-50.00));

        let lazada = rows.iter().find(|r| r.platform == Platform::Lazada).unwrap();
        assert_eq!(lazada.gross_revenue, dec!(1000));
        assert_eq!(lazada.gross_revenue_usd, dec!(18.000));
        assert_eq!(lazada.prev_day_revenue, None);
    }

    #[test]
    fn test_status_counts_and_net_revenue() {
        let mut unpaid = order(Platform::Shopify, "2", "2024-01-30T12:00:00+00:00", dec!(50));
        unpaid.payment_status = Some("pending".to_string());
        unpaid.discount_amount = dec!(5);
        let mut done = order(Platform::Shopify, "3", "2024-01-30T13:00:00+00:00", dec!(30));
        done.fulfillment_status = Some("fulfilled".to_string());
        let orders = enrich(&[
            order(Platform::Shopify, "1", "2024-01-30T10:00:00+00:00", dec!(100)),
            unpaid,
            done,
        ]);
        let rows = build_revenue_summary(&orders, &ctx("2024-01-31"));
        let r = &rows[0];
        assert_eq!(r.total_orders, 3);
        assert_eq!(r.net_revenue, dec!(175));
        assert_eq!(r.paid_orders, 2);
        assert_eq!(r.unpaid_orders, 1);
        assert_eq!(r.fulfilled_orders, 1);
        assert_eq!(r.pending_fulfillment, 1);
        assert_eq!(r.avg_order_value_usd, dec!(60));
    }
}
