//! KPI aggregators
//!
//! Each aggregator is a pure function of the enriched orders (and, for
//! products, the unified items) plus a [`RunContext`] carrying the reference
//! date. The four run independently and may execute in parallel.

pub mod daily_snapshot;
pub mod platform_overview;
pub mod product_performance;
pub mod revenue_summary;

pub use daily_snapshot::{build_daily_snapshots, DailySnapshot, PlatformTotals, SnapshotWindows};
pub use platform_overview::{build_platform_overview, PlatformOverview};
pub use product_performance::{build_product_performance, ProductPerformance};
pub use revenue_summary::{build_revenue_summary, RevenueSummary};

use crate::enrich::EnrichedOrder;
use crate::order::OrderItem;
use crate::types::GeneratedAt;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference values injected into every aggregator
///
/// Nothing below this point reads the system clock; "today" and "this month"
/// are always relative to `as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Current date for this-month, last-month and today metrics
    pub as_of: NaiveDate,
    /// Stamped on every output row
    pub generated_at: GeneratedAt,
    pub run_id: Uuid,
}

impl RunContext {
    pub fn new(as_of: NaiveDate, generated_at: GeneratedAt) -> Self {
        Self {
            as_of,
            generated_at,
            run_id: Uuid::new_v4(),
        }
    }

    /// Context for a run happening now, with `as_of` set to today in UTC
    pub fn now() -> Self {
        let generated_at = Utc::now();
        Self::new(generated_at.date_naive(), generated_at)
    }

    /// Same clock, different reference date
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }
}

/// All four output tables of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    /// Ordered by date descending
    pub daily_snapshots: Vec<DailySnapshot>,
    pub platform_overview: Vec<PlatformOverview>,
    pub revenue_summary: Vec<RevenueSummary>,
    pub product_performance: Vec<ProductPerformance>,
}

/// Run every aggregator over the same inputs
///
/// In parallel mode each aggregator runs as its own rayon task; results land
/// in fixed fields so output never depends on scheduling.
pub fn aggregate_all(
    orders: &[EnrichedOrder],
    items: &[OrderItem],
    windows: &SnapshotWindows,
    ctx: &RunContext,
    parallel: bool,
) -> Aggregates {
    let daily = || build_daily_snapshots(orders, windows, ctx);
    let overview = || build_platform_overview(orders, ctx);
    let revenue = || build_revenue_summary(orders, ctx);
    let products = || build_product_performance(orders, items, ctx);

    let (daily_snapshots, platform_overview, revenue_summary, product_performance) = if parallel {
        let ((a, b), (c, d)) = rayon::join(|| rayon::join(daily, overview), || rayon::join(revenue, products));
        (a, b, c, d)
    } else {
        (daily(), overview(), revenue(), products())
    };

    log::info!(
        "Aggregated {} daily snapshots, {} platform rows, {} revenue rows, {} product rows",
        daily_snapshots.len(),
        platform_overview.len(),
        revenue_summary.len(),
        product_performance.len()
    );

    Aggregates {
        daily_snapshots,
        platform_overview,
        revenue_summary,
        product_performance,
    }
}
