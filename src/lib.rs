//! # DataPulse
//!
//! Order normalization and KPI aggregation across e-commerce storefronts.
//!
//! Raw order and item records from Shopify, Amazon, Lazada and Shopee are
//! mapped into one canonical schema, enriched with USD amounts and calendar
//! buckets, and rolled up into four output tables: daily snapshots, a
//! per-platform overview, daily revenue per platform and ranked product
//! performance.
//!
//! ## Example
//!
//! ```rust,no_run
//! use datapulse::prelude::*;
//!
//! let raw = RawRecords::from_json(&std::fs::read_to_string("orders.json")?)?;
//! let ctx = RunContext::now();
//! let output = Pipeline::default().run(&raw, &CurrencyRates::with_defaults(), &ctx)?;
//!
//! for row in output.platform_overview() {
//!     println!("{}: {} USD", row.platform, row.total_revenue_usd);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod currency;
pub mod enrich;
pub mod error;
pub mod export;
pub mod normalize;
pub mod order;
pub mod pipeline;
pub mod ranking;
#[cfg(feature = "rusqlite-support")]
pub mod sink;
pub mod status;
pub mod summary;
pub mod trend;
pub mod types;
pub mod unify;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::aggregate::{
        Aggregates, DailySnapshot, PlatformOverview, ProductPerformance, RevenueSummary, RunContext,
    };
    pub use crate::config::DataPulseConfig;
    pub use crate::currency::CurrencyRates;
    pub use crate::enrich::EnrichedOrder;
    pub use crate::error::{DataPulseError, ErrorKind, Result};
    pub use crate::export::ExportFormat;
    pub use crate::normalize::{PlatformNormalizer, RawRecords};
    pub use crate::order::{Order, OrderItem};
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::ranking::PerformanceTier;
    pub use crate::status::StatusPolicy;
    pub use crate::summary::DashboardSummary;
    pub use crate::types::*;
}
