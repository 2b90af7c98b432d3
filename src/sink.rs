//! SQLite persistence for the output tables
//!
//! Every write replaces the contents of the four mart tables inside one
//! transaction, so a failed write leaves the previous run in place. Money columns are stored as TEXT so decimal values survive
//! unchanged; dates are ISO-8601 strings.

use crate::aggregate::{DailySnapshot, PlatformOverview, ProductPerformance, RevenueSummary, RunContext};
use crate::error::Result;
use crate::pipeline::PipelineOutput;
use crate::types::Platform;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

pub const MART_TABLES: [&str; 4] = [
    "mart_daily_snapshots",
    "mart_platform_overview",
    "mart_revenue_summary",
    "mart_product_performance",
];

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS mart_daily_snapshots (
        order_date TEXT PRIMARY KEY,
        total_orders INTEGER NOT NULL,
        total_revenue_usd TEXT NOT NULL,
        avg_order_value_usd TEXT NOT NULL,
        total_items_sold INTEGER NOT NULL,
        shopify_orders INTEGER NOT NULL,
        shopify_revenue_usd TEXT NOT NULL,
        amazon_orders INTEGER NOT NULL,
        amazon_revenue_usd TEXT NOT NULL,
        lazada_orders INTEGER NOT NULL,
        lazada_revenue_usd TEXT NOT NULL,
        shopee_orders INTEGER NOT NULL,
        shopee_revenue_usd TEXT NOT NULL,
        unique_customers INTEGER NOT NULL,
        fulfilled_orders INTEGER NOT NULL,
        fulfillment_rate TEXT NOT NULL,
        revenue_7d_avg TEXT NOT NULL,
        orders_7d_avg TEXT NOT NULL,
        revenue_30d_avg TEXT NOT NULL,
        orders_30d_avg TEXT NOT NULL,
        revenue_dod_change TEXT,
        orders_dod_change INTEGER,
        revenue_wow_change TEXT,
        orders_wow_change INTEGER,
        generated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS mart_platform_overview (
        platform TEXT PRIMARY KEY,
        total_orders INTEGER NOT NULL,
        completed_orders INTEGER NOT NULL,
        cancelled_orders INTEGER NOT NULL,
        total_revenue_usd TEXT NOT NULL,
        orders_this_month INTEGER NOT NULL,
        revenue_this_month_usd TEXT NOT NULL,
        orders_last_month INTEGER NOT NULL,
        revenue_last_month_usd TEXT NOT NULL,
        orders_today INTEGER NOT NULL,
        revenue_today_usd TEXT NOT NULL,
        avg_order_value_usd TEXT NOT NULL,
        avg_items_per_order TEXT NOT NULL,
        payment_rate TEXT NOT NULL,
        fulfillment_rate TEXT NOT NULL,
        cancellation_rate TEXT NOT NULL,
        first_order_date TEXT NOT NULL,
        last_order_date TEXT NOT NULL,
        active_days INTEGER NOT NULL,
        revenue_mom_growth_pct TEXT NOT NULL,
        orders_mom_growth_pct TEXT NOT NULL,
        generated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS mart_revenue_summary (
        order_date TEXT NOT NULL,
        platform TEXT NOT NULL,
        total_orders INTEGER NOT NULL,
        gross_revenue TEXT NOT NULL,
        gross_revenue_usd TEXT NOT NULL,
        net_revenue TEXT NOT NULL,
        avg_order_value TEXT NOT NULL,
        avg_order_value_usd TEXT NOT NULL,
        paid_orders INTEGER NOT NULL,
        unpaid_orders INTEGER NOT NULL,
        fulfilled_orders INTEGER NOT NULL,
        pending_fulfillment INTEGER NOT NULL,
        prev_day_revenue TEXT,
        revenue_change TEXT,
        mtd_revenue_usd TEXT NOT NULL,
        mtd_orders INTEGER NOT NULL,
        revenue_growth_pct TEXT NOT NULL,
        generated_at TEXT NOT NULL,
        PRIMARY KEY (order_date, platform)
    );

    CREATE TABLE IF NOT EXISTS mart_product_performance (
        platform TEXT NOT NULL,
        product_id TEXT NOT NULL,
        product_name TEXT,
        sku TEXT,
        total_orders INTEGER NOT NULL,
        total_units_sold INTEGER NOT NULL,
        total_revenue TEXT NOT NULL,
        avg_selling_price TEXT,
        days_with_sales INTEGER NOT NULL,
        first_sale_date TEXT NOT NULL,
        last_sale_date TEXT NOT NULL,
        units_this_month INTEGER NOT NULL,
        revenue_this_month TEXT NOT NULL,
        avg_daily_units TEXT NOT NULL,
        revenue_rank INTEGER NOT NULL,
        units_rank INTEGER NOT NULL,
        revenue_percentile REAL NOT NULL,
        performance_tier TEXT NOT NULL,
        generated_at TEXT NOT NULL,
        PRIMARY KEY (platform, product_id)
    );
    CREATE INDEX IF NOT EXISTS idx_product_revenue_rank ON mart_product_performance(platform, revenue_rank);

    CREATE TABLE IF NOT EXISTS mart_runs (
        run_id TEXT PRIMARY KEY,
        as_of TEXT NOT NULL,
        generated_at TEXT NOT NULL,
        total_orders INTEGER NOT NULL
    );
";

fn text<T: ToString>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Output tables backed by SQLite
pub struct MartStore {
    conn: Connection,
}

impl MartStore {
    /// Create or open database at path
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let mut store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// Create in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// Create any missing tables; existing rows are kept
    pub fn create_tables(&mut self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Replace all mart tables with `output`
    pub fn write_output(&mut self, output: &PipelineOutput) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in MART_TABLES {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        insert_daily_snapshots(&tx, output.daily_snapshots())?;
        insert_platform_overview(&tx, output.platform_overview())?;
        insert_revenue_summary(&tx, output.revenue_summary())?;
        insert_product_performance(&tx, output.product_performance())?;
        insert_run(&tx, &output.context, output.stats.total_orders())?;
        tx.commit()?;

        log::info!("Stored run {} in SQLite mart", output.context.run_id);
        Ok(())
    }

    fn row_count(&self, table: &'static str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Stored USD revenue for a platform, as written
    pub fn platform_revenue(&self, platform: Platform) -> Result<Option<String>> {
        let revenue = self
            .conn
            .query_row(
                "SELECT total_revenue_usd FROM mart_platform_overview WHERE platform = ?1",
                params![platform.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(revenue)
    }

    /// Row count of each mart table
    pub fn table_counts(&self) -> Result<Vec<(&'static str, u64)>> {
        MART_TABLES
            .iter()
            .map(|&table| Ok((table, self.row_count(table)?)))
            .collect()
    }

    /// Number of runs recorded in this database
    pub fn run_count(&self) -> Result<u64> {
        self.row_count("mart_runs")
    }
}

fn insert_daily_snapshots(tx: &Transaction<'_>, rows: &[DailySnapshot]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO mart_daily_snapshots VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
            ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
        )",
    )?;
    for r in rows {
        let [shopify, amazon, lazada, shopee] = Platform::ALL.map(|p| r.platform(p));
        stmt.execute(params![
            r.order_date.to_string(),
            r.total_orders as i64,
            r.total_revenue_usd.to_string(),
            r.avg_order_value_usd.to_string(),
            r.total_items_sold as i64,
            shopify.orders as i64,
            shopify.revenue_usd.to_string(),
            amazon.orders as i64,
            amazon.revenue_usd.to_string(),
            lazada.orders as i64,
            lazada.revenue_usd.to_string(),
            shopee.orders as i64,
            shopee.revenue_usd.to_string(),
            r.unique_customers as i64,
            r.fulfilled_orders as i64,
            r.fulfillment_rate.to_string(),
            r.revenue_7d_avg.to_string(),
            r.orders_7d_avg.to_string(),
            r.revenue_30d_avg.to_string(),
            r.orders_30d_avg.to_string(),
            text(r.revenue_dod_change),
            r.orders_dod_change,
            text(r.revenue_wow_change),
            r.orders_wow_change,
            r.generated_at.to_rfc3339(),
        ])?;
    }
    Ok(())
}

fn insert_platform_overview(tx: &Transaction<'_>, rows: &[PlatformOverview]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO mart_platform_overview VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
        )",
    )?;
    for r in rows {
        stmt.execute(params![
            r.platform.as_str(),
            r.total_orders as i64,
            r.completed_orders as i64,
            r.cancelled_orders as i64,
            r.total_revenue_usd.to_string(),
            r.orders_this_month as i64,
            r.revenue_this_month_usd.to_string(),
            r.orders_last_month as i64,
            r.revenue_last_month_usd.to_string(),
            r.orders_today as i64,
            r.revenue_today_usd.to_string(),
            r.avg_order_value_usd.to_string(),
            r.avg_items_per_order.to_string(),
            r.payment_rate.to_string(),
            r.fulfillment_rate.to_string(),
            r.cancellation_rate.to_string(),
            r.first_order_date.to_string(),
            r.last_order_date.to_string(),
            r.active_days as i64,
            r.revenue_mom_growth_pct.to_string(),
            r.orders_mom_growth_pct.to_string(),
            r.generated_at.to_rfc3339(),
        ])?;
    }
    Ok(())
}

fn insert_revenue_summary(tx: &Transaction<'_>, rows: &[RevenueSummary]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO mart_revenue_summary VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
        )",
    )?;
    for r in rows {
        stmt.execute(params![
            r.order_date.to_string(),
            r.platform.as_str(),
            r.total_orders as i64,
            r.gross_revenue.to_string(),
            r.gross_revenue_usd.to_string(),
            r.net_revenue.to_string(),
            r.avg_order_value.to_string(),
            r.avg_order_value_usd.to_string(),
            r.paid_orders as i64,
            r.unpaid_orders as i64,
            r.fulfilled_orders as i64,
            r.pending_fulfillment as i64,
            text(r.prev_day_revenue),
            text(r.revenue_change),
            r.mtd_revenue_usd.to_string(),
            r.mtd_orders as i64,
            r.revenue_growth_pct.to_string(),
            r.generated_at.to_rfc3339(),
        ])?;
    }
    Ok(())
}

fn insert_product_performance(tx: &Transaction<'_>, rows: &[ProductPerformance]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO mart_product_performance VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19
        )",
    )?;
    for r in rows {
        stmt.execute(params![
            r.platform.as_str(),
            &r.product_id,
            &r.product_name,
            &r.sku,
            r.total_orders as i64,
            r.total_units_sold as i64,
            r.total_revenue.to_string(),
            text(r.avg_selling_price),
            r.days_with_sales as i64,
            r.first_sale_date.to_string(),
            r.last_sale_date.to_string(),
            r.units_this_month as i64,
            r.revenue_this_month.to_string(),
            r.avg_daily_units.to_string(),
            r.revenue_rank,
            r.units_rank,
            r.revenue_percentile,
            r.performance_tier.label(),
            r.generated_at.to_rfc3339(),
        ])?;
    }
    Ok(())
}

fn insert_run(tx: &Transaction<'_>, ctx: &RunContext, total_orders: usize) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO mart_runs (run_id, as_of, generated_at, total_orders) VALUES (?1, ?2, ?3, ?4)",
        params![
            ctx.run_id.to_string(),
            ctx.as_of.to_string(),
            ctx.generated_at.to_rfc3339(),
            total_orders as i64,
        ],
    )?;
    Ok(())
}
