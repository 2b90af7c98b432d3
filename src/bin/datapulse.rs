//! datapulse CLI - run the order pipeline over landed platform records
//!
//! ## Example Usage
//!
//! ```bash
//! # Aggregate a landed JSON extract into CSV tables
//! datapulse run orders.json --as-of 2024-03-15 --output out/
//!
//! # Also persist the tables to SQLite
//! datapulse run orders.json --format json --sqlite mart.db
//!
//! # Check mappings and key integrity only
//! datapulse validate orders.json
//!
//! # Show the effective rate table
//! datapulse rates
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use datapulse::aggregate::RunContext;
use datapulse::config::DataPulseConfig;
use datapulse::export::{write_output, ExportFormat};
use datapulse::normalize::RawRecords;
use datapulse::pipeline::{Pipeline, PipelineOutput};
use datapulse::types::Platform;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

/// datapulse: cross-platform e-commerce KPI pipeline
#[derive(Parser)]
#[command(name = "datapulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Normalize storefront orders and build KPI tables", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (default: ~/.datapulse/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the output tables
    Run {
        /// JSON document with raw records keyed by platform
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Reference date for this-month and today metrics (YYYY-MM-DD, default: today UTC)
        #[arg(short = 'a', long)]
        as_of: Option<String>,

        /// Output directory
        #[arg(short = 'o', long, default_value = "datapulse-out")]
        output: PathBuf,

        /// Table format (csv, json)
        #[arg(short = 'f', long, default_value = "csv")]
        format: String,

        /// SQLite database to replace the mart tables in
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },

    /// Normalize and check integrity without aggregating
    Validate {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Print the effective currency rate table
    Rates,

    /// Print the effective configuration as TOML
    Config,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".datapulse").join("config.toml"))
}

fn load_config(path: Option<&Path>) -> Result<DataPulseConfig> {
    if let Some(path) = path {
        return DataPulseConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => DataPulseConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        _ => Ok(DataPulseConfig::default()),
    }
}

fn read_records(path: &Path) -> Result<RawRecords> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    RawRecords::from_json(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(2);
        }
    };

    if cli.verbose {
        println!("{} v{}", "datapulse".cyan().bold(), env!("CARGO_PKG_VERSION"));
    }

    let result = match cli.command {
        Commands::Run {
            input,
            as_of,
            output,
            format,
            sqlite,
        } => run_pipeline(RunConfig {
            input,
            as_of,
            output,
            format,
            sqlite,
            verbose: cli.verbose,
            config,
        }),
        Commands::Validate { input } => validate(&input, &config),
        Commands::Rates => show_rates(&config),
        Commands::Config => show_config(&config),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

struct RunConfig {
    input: PathBuf,
    as_of: Option<String>,
    output: PathBuf,
    format: String,
    sqlite: Option<PathBuf>,
    verbose: bool,
    config: DataPulseConfig,
}

fn run_pipeline(cfg: RunConfig) -> Result<()> {
    let started = Instant::now();
    let format: ExportFormat = cfg.format.parse()?;
    let ctx = match cfg.as_of.as_deref() {
        Some(s) => {
            let as_of = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid --as-of date: {}", s))?;
            RunContext::new(as_of, Utc::now())
        }
        None => RunContext::now(),
    };

    let raw = read_records(&cfg.input)?;
    let rates = cfg.config.currency.build_rates()?;
    let pipeline = Pipeline::from_config(&cfg.config)?;

    println!(
        "{} {} records from {} (as of {})",
        "Processing".cyan().bold(),
        raw.record_count(),
        cfg.input.display(),
        ctx.as_of
    );
    let output = pipeline.run(&raw, &rates, &ctx)?;

    let written = write_output(&output, &cfg.output, format)?;
    if cfg.verbose {
        for path in &written {
            println!("  {}", path.display().to_string().dimmed());
        }
    }

    if let Some(db_path) = cfg.sqlite.as_deref() {
        write_sqlite(db_path, &output)?;
    }

    print_report(&output);
    println!(
        "{} Wrote {} files to {} in {:.2?}",
        "✓".green().bold(),
        written.len(),
        cfg.output.display(),
        started.elapsed()
    );
    Ok(())
}

#[cfg(feature = "rusqlite-support")]
fn write_sqlite(path: &Path, output: &PipelineOutput) -> Result<()> {
    let mut store = datapulse::sink::MartStore::new(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    store.write_output(output)?;
    println!("{} Mart tables replaced in {}", "✓".green().bold(), path.display());
    Ok(())
}

#[cfg(not(feature = "rusqlite-support"))]
fn write_sqlite(_path: &Path, _output: &PipelineOutput) -> Result<()> {
    anyhow::bail!("SQLite output requires the rusqlite-support feature")
}

fn print_report(output: &PipelineOutput) {
    let summary = &output.summary;
    println!();
    println!("{}", "Summary".cyan().bold());
    println!("  Total Revenue:    {}", format!("${}", summary.total_revenue_usd).bright_green());
    println!("  Total Orders:     {}", summary.total_orders);
    println!("  Avg Order Value:  ${}", summary.avg_order_value_usd);
    println!("  Customers:        {}", summary.total_customers);
    let growth = format!("{}%", summary.revenue_growth_pct);
    if summary.revenue_growth_pct.is_sign_negative() {
        println!("  Revenue MoM:      {}", growth.red());
    } else {
        println!("  Revenue MoM:      {}", growth.green());
    }

    println!();
    println!("{}", "Platforms".cyan().bold());
    for row in &summary.platforms {
        println!(
            "  {:<8} {:>8} orders  ${:>12}  cancelled {}%",
            row.platform.to_string().bold(),
            row.total_orders,
            row.total_revenue_usd,
            row.cancellation_rate
        );
    }
    println!();
}

fn validate(input: &Path, config: &DataPulseConfig) -> Result<()> {
    let raw = read_records(input)?;
    let pipeline = Pipeline::from_config(config)?;
    let unified = pipeline.normalize(&raw)?;

    println!("{} {}", "Valid:".green().bold(), input.display());
    for platform in Platform::ALL {
        println!(
            "  {:<8} {:>8} orders {:>8} items",
            platform,
            unified.order_count(platform),
            unified.item_count(platform)
        );
    }

    let unmapped = pipeline.status_policy().unmapped(&unified.orders);
    if !unmapped.is_empty() {
        println!("{} {} unmapped statuses", "Warning:".yellow(), unmapped.len());
        for status in unmapped {
            println!("  {}", status);
        }
    }
    Ok(())
}

fn show_rates(config: &DataPulseConfig) -> Result<()> {
    let rates = config.currency.build_rates()?;
    println!("{}", "Currency Rates (to USD)".cyan().bold());
    for (code, rate) in rates.iter() {
        println!("  {}  {}", code.bold(), rate);
    }
    let required: Vec<&str> = rates.required().collect();
    if !required.is_empty() {
        println!("  Required: {}", required.join(", "));
    }
    if rates.is_strict() {
        println!("  {}", "Strict: unknown codes are rejected".yellow());
    }
    Ok(())
}

fn show_config(config: &DataPulseConfig) -> Result<()> {
    let text = toml::to_string_pretty(config).context("Failed to render config")?;
    println!("{}", text);
    Ok(())
}
