//! End-to-end pipeline run
//!
//! Stages form a strict chain, each handing an owned, immutable collection to
//! the next:
//!
//! ```text
//! RawRecords -> normalize -> unify -> integrity -> enrich -> aggregate -> PipelineOutput
//! ```
//!
//! Any stage error aborts the run; there is no partial output.

use crate::aggregate::{
    aggregate_all, Aggregates, DailySnapshot, PlatformOverview, ProductPerformance,
    RevenueSummary, RunContext, SnapshotWindows,
};
use crate::config::{DataPulseConfig, PipelineConfig};
use crate::currency::CurrencyRates;
use crate::enrich::{EnrichedOrder, Enricher};
use crate::error::Result;
use crate::normalize::{normalize_all, RawRecords};
use crate::status::StatusPolicy;
use crate::summary::{build_dashboard_summary, DashboardSummary};
use crate::types::Platform;
use crate::unify::UnifiedCollections;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Record counts observed during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub orders_by_platform: BTreeMap<Platform, usize>,
    pub items_by_platform: BTreeMap<Platform, usize>,
    pub cancelled_orders: usize,
}

impl RunStats {
    fn collect(unified: &UnifiedCollections, enriched: &[EnrichedOrder]) -> Self {
        Self {
            orders_by_platform: Platform::ALL.iter().map(|&p| (p, unified.order_count(p))).collect(),
            items_by_platform: Platform::ALL.iter().map(|&p| (p, unified.item_count(p))).collect(),
            cancelled_orders: enriched.iter().filter(|o| o.is_cancelled).count(),
        }
    }

    pub fn total_orders(&self) -> usize {
        self.orders_by_platform.values().sum()
    }

    pub fn total_items(&self) -> usize {
        self.items_by_platform.values().sum()
    }
}

/// Everything a run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub context: RunContext,
    pub tables: Aggregates,
    pub summary: DashboardSummary,
    pub stats: RunStats,
}

impl PipelineOutput {
    /// Newest date first
    pub fn daily_snapshots(&self) -> &[DailySnapshot] {
        &self.tables.daily_snapshots
    }

    pub fn platform_overview(&self) -> &[PlatformOverview] {
        &self.tables.platform_overview
    }

    pub fn revenue_summary(&self) -> &[RevenueSummary] {
        &self.tables.revenue_summary
    }

    pub fn product_performance(&self) -> &[ProductPerformance] {
        &self.tables.product_performance
    }
}

/// Configured pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    policy: StatusPolicy,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            policy: StatusPolicy::Lenient,
        }
    }

    pub fn from_config(config: &DataPulseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.pipeline.clone(),
            policy: config.status.build_policy()?,
        })
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn status_policy(&self) -> &StatusPolicy {
        &self.policy
    }

    /// Normalize, unify and check keys and references
    pub fn normalize(&self, raw: &RawRecords) -> Result<UnifiedCollections> {
        let batches = normalize_all(raw, self.config.parallel)?;
        let unified = UnifiedCollections::from_batches(batches);
        unified.check_integrity()?;
        Ok(unified)
    }

    /// Validate the rate table and status policy, then enrich every order
    pub fn enrich(&self, unified: &UnifiedCollections, rates: &CurrencyRates) -> Result<Vec<EnrichedOrder>> {
        rates.validate()?;
        self.policy.validate(&unified.orders)?;
        Enricher::new(rates, &self.policy).enrich(&unified.orders)
    }

    pub fn aggregate(&self, orders: &[EnrichedOrder], unified: &UnifiedCollections, ctx: &RunContext) -> Aggregates {
        let windows = SnapshotWindows::from(&self.config);
        aggregate_all(orders, &unified.items, &windows, ctx, self.config.parallel)
    }

    /// Run every stage over `raw`
    pub fn run(&self, raw: &RawRecords, rates: &CurrencyRates, ctx: &RunContext) -> Result<PipelineOutput> {
        let started = Instant::now();
        log::info!(
            "Starting run {} as of {} with {} raw records",
            ctx.run_id,
            ctx.as_of,
            raw.record_count()
        );

        let unified = self.normalize(raw)?;
        let enriched = self.enrich(&unified, rates)?;
        let tables = self.aggregate(&enriched, &unified, ctx);
        let summary = build_dashboard_summary(&enriched, &tables, self.config.recent_days, ctx);
        let stats = RunStats::collect(&unified, &enriched);

        log::info!(
            "Run {} finished in {:?}: {} orders, {} items",
            ctx.run_id,
            started.elapsed(),
            stats.total_orders(),
            stats.total_items()
        );

        Ok(PipelineOutput {
            context: *ctx,
            tables,
            summary,
            stats,
        })
    }
}

/// Run with default settings and the lenient status policy
pub fn run(raw: &RawRecords, rates: &CurrencyRates, ctx: &RunContext) -> Result<PipelineOutput> {
    Pipeline::default().run(raw, rates, ctx)
}
