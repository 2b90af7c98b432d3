//! Writing run output to disk
//!
//! Each table lands in its own file under the output directory. CSV rows are
//! flat; the daily snapshot's per-platform totals become
//! `<platform>_orders` / `<platform>_revenue_usd` column pairs. The dashboard
//! summary is nested and is always written as JSON.

use crate::aggregate::DailySnapshot;
use crate::error::{DataPulseError, Result};
use crate::pipeline::PipelineOutput;
use crate::types::Platform;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DAILY_SNAPSHOTS: &str = "daily_snapshots";
pub const PLATFORM_OVERVIEW: &str = "platform_overview";
pub const REVENUE_SUMMARY: &str = "revenue_summary";
pub const PRODUCT_PERFORMANCE: &str = "product_performance";
pub const DASHBOARD_SUMMARY: &str = "dashboard_summary";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = DataPulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(DataPulseError::Config(format!("Unknown export format: {}", other))),
        }
    }
}

/// Serialize rows with the csv crate's struct mapping
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn daily_header() -> Vec<String> {
    let mut header: Vec<String> = [
        "order_date",
        "total_orders",
        "total_revenue_usd",
        "avg_order_value_usd",
        "total_items_sold",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for platform in Platform::ALL {
        header.push(format!("{}_orders", platform));
        header.push(format!("{}_revenue_usd", platform));
    }
    header.extend(
        [
            "unique_customers",
            "fulfilled_orders",
            "fulfillment_rate",
            "revenue_7d_avg",
            "orders_7d_avg",
            "revenue_30d_avg",
            "orders_30d_avg",
            "revenue_dod_change",
            "orders_dod_change",
            "revenue_wow_change",
            "orders_wow_change",
            "generated_at",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    header
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Daily snapshots with per-platform columns spelled out
pub fn write_daily_snapshots_csv(path: &Path, rows: &[DailySnapshot]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(daily_header())?;

    for row in rows {
        let mut record = vec![
            row.order_date.to_string(),
            row.total_orders.to_string(),
            row.total_revenue_usd.to_string(),
            row.avg_order_value_usd.to_string(),
            row.total_items_sold.to_string(),
        ];
        for platform in Platform::ALL {
            let totals = row.platform(platform);
            record.push(totals.orders.to_string());
            record.push(totals.revenue_usd.to_string());
        }
        record.extend([
            row.unique_customers.to_string(),
            row.fulfilled_orders.to_string(),
            row.fulfillment_rate.to_string(),
            row.revenue_7d_avg.to_string(),
            row.orders_7d_avg.to_string(),
            row.revenue_30d_avg.to_string(),
            row.orders_30d_avg.to_string(),
            optional(row.revenue_dod_change),
            optional(row.orders_dod_change),
            optional(row.revenue_wow_change),
            optional(row.orders_wow_change),
            row.generated_at.to_rfc3339(),
        ]);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write every table of `output` into `dir`, creating it when needed
///
/// Returns the written paths in table order, summary last.
pub fn write_output(output: &PipelineOutput, dir: &Path, format: ExportFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let path = |name: &str, ext: &str| dir.join(format!("{}.{}", name, ext));
    let ext = format.extension();

    let written = vec![
        path(DAILY_SNAPSHOTS, ext),
        path(PLATFORM_OVERVIEW, ext),
        path(REVENUE_SUMMARY, ext),
        path(PRODUCT_PERFORMANCE, ext),
        path(DASHBOARD_SUMMARY, "json"),
    ];

    match format {
        ExportFormat::Csv => {
            write_daily_snapshots_csv(&written[0], output.daily_snapshots())?;
            write_csv(&written[1], output.platform_overview())?;
            write_csv(&written[2], output.revenue_summary())?;
            write_csv(&written[3], output.product_performance())?;
        }
        ExportFormat::Json => {
            write_json(&written[0], output.daily_snapshots())?;
            write_json(&written[1], output.platform_overview())?;
            write_json(&written[2], output.revenue_summary())?;
            write_json(&written[3], output.product_performance())?;
        }
    }
    write_json(&written[4], &output.summary)?;

    log::info!("Wrote {} {} files to {}", written.len(), format, dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RunContext;
    use crate::currency::CurrencyRates;
    use crate::normalize::RawRecords;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn output() -> PipelineOutput {
        let raw = RawRecords::from_json(
            r#"{
                "shopify": {
                    "orders": [
                        {"id": 1, "created_at": "2024-03-01T10:00:00Z", "total_price": "100.00",
                         "currency": "USD", "financial_status": "paid"},
                        {"id": 2, "created_at": "2024-03-03T10:00:00Z", "total_price": "50.00",
                         "currency": "USD", "financial_status": "paid"}
                    ],
                    "items": [{"id": 11, "order_id": 1, "product_id": 7, "title": "Mug, large",
                               "quantity": 2, "price": "50.00"}]
                }
            }"#,
        )
        .unwrap();
        let ctx = RunContext::new(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
        );
        crate::pipeline::run(&raw, &CurrencyRates::with_defaults(), &ctx).unwrap()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("parquet".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_csv_export_flattens_daily_platforms() {
        let dir = TempDir::new().unwrap();
        let paths = write_output(&output(), dir.path(), ExportFormat::Csv).unwrap();
        assert_eq!(paths.len(), 5);
        assert!(paths.iter().all(|p| p.exists()));

        let mut reader = csv::Reader::from_path(dir.path().join("daily_snapshots.csv")).unwrap();
        let header = reader.headers().unwrap().clone();
        assert!(header.iter().any(|h| h == "shopify_orders"));
        assert!(header.iter().any(|h| h == "shopee_revenue_usd"));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        // Gap-filled 1st..3rd, newest first
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "2024-03-03");
        assert_eq!(&rows[1][1], "0");

        let products = std::fs::read_to_string(dir.path().join("product_performance.csv")).unwrap();
        assert!(products.contains("\"Mug, large\""));
        assert!(products.contains("Top 10"));
    }

    #[test]
    fn test_json_export_round_trips_summary() {
        let dir = TempDir::new().unwrap();
        let out = output();
        write_output(&out, dir.path(), ExportFormat::Json).unwrap();

        let text = std::fs::read_to_string(dir.path().join("dashboard_summary.json")).unwrap();
        let summary: crate::summary::DashboardSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(summary, out.summary);

        let text = std::fs::read_to_string(dir.path().join("platform_overview.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["platform"], "shopify");
    }
}
