//! Pipeline configuration
//!
//! Loaded from TOML. Every section and field is optional; missing values take
//! the defaults below.
//!
//! ```toml
//! [pipeline]
//! short_window = 7
//! long_window = 30
//! week_lag = 7
//! fill_missing_dates = true
//! parallel = true
//!
//! [currency]
//! strict = false
//! required = ["PHP"]
//! [currency.rates]
//! PHP = "0.018"
//!
//! [status]
//! mode = "translated"
//! require_complete = true
//! [status.platforms.lazada.payment]
//! COD = "paid"
//! ```

use crate::currency::CurrencyRates;
use crate::error::{DataPulseError, Result};
use crate::status::{PlatformStatusMap, StatusPolicy, StatusTranslation};
use crate::types::Platform;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPulseConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// Window sizes and execution switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Short moving-average window, in days
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    /// Long moving-average window, in days
    #[serde(default = "default_long_window")]
    pub long_window: usize,
    /// Lag for the week-over-week delta
    #[serde(default = "default_week_lag")]
    pub week_lag: usize,
    /// Insert zero rows for dates without orders so lags count calendar days
    #[serde(default = "default_true")]
    pub fill_missing_dates: bool,
    /// Run normalizers and aggregators on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Number of daily snapshots included in the dashboard summary
    #[serde(default = "default_recent_days")]
    pub recent_days: usize,
}

fn default_short_window() -> usize {
    7
}

fn default_long_window() -> usize {
    30
}

fn default_week_lag() -> usize {
    7
}

/// Upper bound for `pipeline.recent_days`
pub const MAX_RECENT_DAYS: usize = 3660;

fn default_recent_days() -> usize {
    7
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
            week_lag: default_week_lag(),
            fill_missing_dates: true,
            parallel: true,
            recent_days: default_recent_days(),
        }
    }
}

/// Rate table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Start from the built-in rate table
    #[serde(default = "default_true")]
    pub use_defaults: bool,
    /// Additional or overriding rates, code to USD multiplier
    #[serde(default)]
    pub rates: BTreeMap<String, Decimal>,
    /// CSV file of `code,rate` rows merged after `rates`
    #[serde(default)]
    pub rates_file: Option<PathBuf>,
    #[serde(default)]
    pub strict: bool,
    /// Codes that must have a rate even when not strict
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            use_defaults: true,
            rates: BTreeMap::new(),
            rates_file: None,
            strict: false,
            required: Vec::new(),
        }
    }
}

impl CurrencyConfig {
    /// Build the effective rate table
    pub fn build_rates(&self) -> Result<CurrencyRates> {
        let mut table = if self.use_defaults {
            CurrencyRates::with_defaults()
        } else {
            CurrencyRates::new()
        };
        for (code, rate) in &self.rates {
            table.add_rate(code, *rate)?;
        }
        if let Some(path) = &self.rates_file {
            let loaded = table.load_from_csv(&fs::read_to_string(path)?)?;
            log::debug!("Loaded {} rates from {}", loaded, path.display());
        }
        table.set_strict(self.strict);
        for code in &self.required {
            table.require(code);
        }
        table.validate()?;
        Ok(table)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    #[default]
    Lenient,
    Translated,
}

/// Status classification settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub mode: StatusMode,
    #[serde(default)]
    pub require_complete: bool,
    /// Per-platform translation tables, keyed by platform name
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformStatusMap>,
}

impl StatusConfig {
    pub fn build_policy(&self) -> Result<StatusPolicy> {
        match self.mode {
            StatusMode::Lenient => {
                if !self.platforms.is_empty() {
                    log::warn!("Status tables are ignored in lenient mode");
                }
                Ok(StatusPolicy::Lenient)
            }
            StatusMode::Translated => {
                let mut table = StatusTranslation::new(self.require_complete);
                for (name, map) in &self.platforms {
                    let platform: Platform = name.parse()?;
                    table.set_platform(platform, map.clone());
                }
                Ok(StatusPolicy::Translated(table))
            }
        }
    }
}

impl DataPulseConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DataPulseConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        if p.short_window == 0 || p.long_window == 0 {
            return Err(DataPulseError::Config(
                "Moving-average windows must be at least 1 day".to_string(),
            ));
        }
        if p.week_lag == 0 {
            return Err(DataPulseError::Config("week_lag must be at least 1".to_string()));
        }
        if p.recent_days > MAX_RECENT_DAYS {
            return Err(DataPulseError::Config(format!(
                "recent_days must be at most {}, got {}",
                MAX_RECENT_DAYS, p.recent_days
            )));
        }
        for (code, rate) in &self.currency.rates {
            if *rate <= Decimal::ZERO {
                return Err(DataPulseError::Config(format!(
                    "Rate for {} must be positive, got {}",
                    code, rate
                )));
            }
        }
        for name in self.status.platforms.keys() {
            name.parse::<Platform>()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PaymentClass;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DataPulseConfig::from_toml_str("").unwrap();
        assert_eq!(config, DataPulseConfig::default());
        assert_eq!(config.pipeline.short_window, 7);
        assert!(config.pipeline.fill_missing_dates);
        assert_eq!(config.status.build_policy().unwrap(), StatusPolicy::Lenient);
    }

    #[test]
    fn test_parse_full_config() {
        let config = DataPulseConfig::from_toml_str(
            r#"
            [pipeline]
            long_window = 14
            parallel = false

            [currency]
            strict = true
            required = ["php"]
            [currency.rates]
            PHP = "0.02"
            VND = "0.00004"

            [status]
            mode = "translated"
            require_complete = true
            [status.platforms.lazada.payment]
            COD = "paid"
            [status.platforms.lazada.fulfillment]
            delivered = "fulfilled"
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.long_window, 14);
        assert_eq!(config.pipeline.short_window, 7);
        assert!(!config.pipeline.parallel);

        let rates = config.currency.build_rates().unwrap();
        assert_eq!(rates.convert(dec!(100), "PHP"), dec!(2.00));
        assert_eq!(rates.convert(dec!(100000), "VND"), dec!(4.00000));
        assert!(rates.is_strict());

        match config.status.build_policy().unwrap() {
            StatusPolicy::Translated(table) => {
                assert!(table.require_complete);
                assert_eq!(table.payment(Platform::Lazada, "COD"), Some(PaymentClass::Paid));
            }
            other => panic!("unexpected policy: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_window() {
        let err = DataPulseConfig::from_toml_str("[pipeline]\nshort_window = 0\n").unwrap_err();
        assert!(matches!(err, DataPulseError::Config(_)));
    }

    #[test]
    fn test_rejects_oversized_recent_days() {
        let err = DataPulseConfig::from_toml_str("[pipeline]\nrecent_days = 1125899906842624\n").unwrap_err();
        assert!(matches!(err, DataPulseError::Config(_)));
        assert!(err.to_string().contains("recent_days"));

        let config = DataPulseConfig::from_toml_str("[pipeline]\nrecent_days = 3660\n").unwrap();
        assert_eq!(config.pipeline.recent_days, MAX_RECENT_DAYS);
    }

    #[test]
    fn test_rejects_unknown_platform_table() {
        let err = DataPulseConfig::from_toml_str(
            "[status]\nmode = \"translated\"\n[status.platforms.ebay.payment]\npaid = \"paid\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("ebay"));
    }

    #[test]
    fn test_required_currency_without_rate() {
        let config = DataPulseConfig::from_toml_str(
            "[currency]\nuse_defaults = false\nrequired = [\"MYR\"]\n",
        )
        .unwrap();
        let err = config.currency.build_rates().unwrap_err();
        assert!(err.to_string().contains("MYR"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pipeline]\nweek_lag = 14\n").unwrap();
        let config = DataPulseConfig::from_file(&path).unwrap();
        assert_eq!(config.pipeline.week_lag, 14);
    }
}
