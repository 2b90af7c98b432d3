//! Ranked product performance per platform
//!
//! Items are inner-joined to non-cancelled orders on `(order_id, platform)`;
//! items of cancelled or unknown orders do not count.

use super::RunContext;
use crate::calendar::month_start;
use crate::enrich::EnrichedOrder;
use crate::order::OrderItem;
use crate::ranking::{dense_rank_by, percentile_rank_by, PerformanceTier};
use crate::trend::{mean, round2};
use crate::types::{GeneratedAt, Money, OrderKey, Platform};
use chrono::NaiveDate;
use hashbrown::{HashMap, HashSet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub platform: Platform,
    pub product_id: String,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub total_orders: u64,
    pub total_units_sold: u64,
    /// Sum of line totals, platform currency
    pub total_revenue: Money,
    /// Mean of reported unit prices; `None` when no line reported one
    pub avg_selling_price: Option<Money>,
    pub days_with_sales: u64,
    pub first_sale_date: NaiveDate,
    pub last_sale_date: NaiveDate,
    pub units_this_month: u64,
    pub revenue_this_month: Money,
    /// Units per day with sales
    pub avg_daily_units: Decimal,
    pub revenue_rank: u32,
    pub units_rank: u32,
    pub revenue_percentile: f64,
    pub performance_tier: PerformanceTier,
    pub generated_at: GeneratedAt,
}

struct ProductTotals<'a> {
    product_name: Option<&'a str>,
    sku: Option<&'a str>,
    orders: HashSet<&'a str>,
    units: u64,
    revenue: Money,
    unit_prices: Vec<Money>,
    dates: HashSet<NaiveDate>,
    first: NaiveDate,
    last: NaiveDate,
    units_this_month: u64,
    revenue_this_month: Money,
}

impl<'a> ProductTotals<'a> {
    fn new(date: NaiveDate) -> Self {
        Self {
            product_name: None,
            sku: None,
            orders: HashSet::new(),
            units: 0,
            revenue: Decimal::ZERO,
            unit_prices: Vec::new(),
            dates: HashSet::new(),
            first: date,
            last: date,
            units_this_month: 0,
            revenue_this_month: Decimal::ZERO,
        }
    }

    fn add(&mut self, item: &'a OrderItem, order: &EnrichedOrder, this_month: NaiveDate) {
        if self.product_name.is_none() {
            self.product_name = item.product_name.as_deref();
        }
        if self.sku.is_none() {
            self.sku = item.sku.as_deref();
        }
        self.orders.insert(item.order_id.as_str());
        self.units += u64::from(item.quantity);
        self.revenue += item.line_total;
        if let Some(price) = item.unit_price {
            self.unit_prices.push(price);
        }
        self.dates.insert(order.order_date);
        self.first = self.first.min(order.order_date);
        self.last = self.last.max(order.order_date);
        if order.order_month == this_month {
            self.units_this_month += u64::from(item.quantity);
            self.revenue_this_month += item.line_total;
        }
    }
}

/// Build the product table, grouped by platform then product id
pub fn build_product_performance(
    orders: &[EnrichedOrder],
    items: &[OrderItem],
    ctx: &RunContext,
) -> Vec<ProductPerformance> {
    let this_month = month_start(ctx.as_of);
    let live: HashMap<OrderKey, &EnrichedOrder> = orders
        .iter()
        .filter(|o| !o.is_cancelled)
        .map(|o| (o.order.key(), o))
        .collect();

    let mut products: BTreeMap<(Platform, &str), ProductTotals<'_>> = BTreeMap::new();
    let mut unmatched = 0usize;
    for item in items {
        let Some(order) = live.get(&item.order_key()) else {
            unmatched += 1;
            continue;
        };
        products
            .entry((item.platform, item.product_id.as_str()))
            .or_insert_with(|| ProductTotals::new(order.order_date))
            .add(item, order, this_month);
    }
    if unmatched > 0 {
        log::debug!("Skipped {} items without a live order", unmatched);
    }

    let platforms: Vec<Platform> = products.keys().map(|(p, _)| *p).collect();
    let revenue: Vec<Money> = products.values().map(|t| t.revenue).collect();
    let units: Vec<Decimal> = products.values().map(|t| Decimal::from(t.units)).collect();
    let revenue_rank = dense_rank_by(&platforms, &revenue);
    let units_rank = dense_rank_by(&platforms, &units);
    let percentile = percentile_rank_by(&platforms, &revenue);

    products
        .into_iter()
        .enumerate()
        .map(|(i, ((platform, product_id), t))| {
            let days = t.dates.len() as u64;
            ProductPerformance {
                platform,
                product_id: product_id.to_string(),
                product_name: t.product_name.map(str::to_string),
                sku: t.sku.map(str::to_string),
                total_orders: t.orders.len() as u64,
                total_units_sold: t.units,
                total_revenue: t.revenue,
                avg_selling_price: if t.unit_prices.is_empty() {
                    None
                } else {
                    Some(round2(mean(&t.unit_prices)))
                },
                days_with_sales: days,
                first_sale_date: t.first,
                last_sale_date: t.last,
                units_this_month: t.units_this_month,
                revenue_this_month: t.revenue_this_month,
                avg_daily_units: if days == 0 {
                    Decimal::ZERO
                } else {
                    round2(Decimal::from(t.units) / Decimal::from(days))
                },
                revenue_rank: revenue_rank[i],
                units_rank: units_rank[i],
                revenue_percentile: percentile[i],
                performance_tier: PerformanceTier::assign(revenue_rank[i], percentile[i]),
                generated_at: ctx.generated_at,
            }
        })
        .collect()
}
