//! Run-aborting errors and their context

use chrono::{NaiveDate, TimeZone, Utc};
use datapulse::{
    aggregate::RunContext,
    config::DataPulseConfig,
    currency::CurrencyRates,
    error::{DataPulseError, ErrorKind},
    normalize::RawRecords,
    pipeline::{run, Pipeline},
    types::Platform,
};
use rust_decimal_macros::dec;

fn ctx() -> RunContext {
    RunContext::new(
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
    )
}

fn run_json(json: &str) -> datapulse::error::Result<datapulse::pipeline::PipelineOutput> {
    let raw = RawRecords::from_json(json).unwrap();
    run(&raw, &CurrencyRates::with_defaults(), &ctx())
}

mod mapping_errors {
    use super::*;

    #[test]
    fn test_missing_created_timestamp() {
        let err = run_json(r#"{"shopify": {"orders": [{"id": 77, "total_price": "1.00"}]}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        let msg = err.to_string();
        assert!(msg.contains("shopify"));
        assert!(msg.contains("77"));
        assert!(msg.contains("created_at"));
    }

    #[test]
    fn test_unparseable_amount() {
        let err = run_json(
            r#"{"lazada": {"orders": [{"order_id": "L-9", "created_at": "2024-03-01 00:00:00", "price": "12,50"}]}}"#,
        )
        .unwrap_err();
        match err {
            DataPulseError::Mapping {
                platform,
                record_id,
                field,
                ..
            } => {
                assert_eq!(platform, Platform::Lazada);
                assert_eq!(record_id, "L-9");
                assert_eq!(field, "price");
            }
            other => panic!("expected mapping error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_quantity() {
        let err = run_json(
            r#"{"shopify": {
                "orders": [{"id": 1, "created_at": "2024-03-01T00:00:00Z"}],
                "items": [{"id": 10, "order_id": 1, "quantity": -1, "price": "5.00"}]
            }}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_shopee_item_without_order_reference() {
        let err = run_json(
            r#"{"shopee": {"items": [{"item_id": 1, "model_quantity_purchased": 1}]}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        assert!(err.to_string().contains("order_sn"));
    }
}

mod integrity_errors {
    use super::*;

    #[test]
    fn test_duplicate_order_within_platform() {
        let err = run_json(
            r#"{"amazon": {"orders": [
                {"amazon_order_id": "A-1", "purchase_date": "2024-03-01T00:00:00Z"},
                {"amazon_order_id": "A-1", "purchase_date": "2024-03-02T00:00:00Z"}
            ]}}"#,
        )
        .unwrap_err();
        assert!(err.is_integrity());
        assert!(matches!(err, DataPulseError::DuplicateOrder { platform: Platform::Amazon, .. }));
    }

    #[test]
    fn test_same_order_id_on_two_platforms_is_allowed() {
        let output = run_json(
            r#"{
                "shopify": {"orders": [{"id": "1", "created_at": "2024-03-01T00:00:00Z"}]},
                "lazada": {"orders": [{"order_id": "1", "created_at": "2024-03-01 00:00:00"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(output.stats.total_orders(), 2);
    }

    #[test]
    fn test_orphan_item() {
        let err = run_json(
            r#"{"lazada": {
                "orders": [{"order_id": "L-1", "created_at": "2024-03-01 00:00:00"}],
                "items": [{"order_item_id": "LI-1", "order_id": "L-404"}]
            }}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataPulseError::OrphanItem { ref order_id, .. } if order_id == "L-404"));
    }

    #[test]
    fn test_item_cannot_join_across_platforms() {
        // Shopify item points at an order id that only exists on Lazada
        let err = run_json(
            r#"{
                "shopify": {"items": [{"id": 5, "order_id": "L-1", "quantity": 1}]},
                "lazada": {"orders": [{"order_id": "L-1", "created_at": "2024-03-01 00:00:00"}]}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }
}

mod config_errors {
    use super::*;

    #[test]
    fn test_strict_rates_reject_unknown_currency() {
        let raw = RawRecords::from_json(
            r#"{"shopify": {"orders": [
                {"id": 1, "created_at": "2024-03-01T00:00:00Z", "total_price": "10", "currency": "EUR"}
            ]}}"#,
        )
        .unwrap();
        let mut rates = CurrencyRates::with_defaults();
        run(&raw, &rates, &ctx()).unwrap();

        rates.set_strict(true);
        let err = run(&raw, &rates, &ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(matches!(err, DataPulseError::MissingCurrencyRate { ref currency, .. } if currency == "EUR"));
    }

    #[test]
    fn test_usd_rate_must_be_identity() {
        let err = CurrencyRates::new().with_rate("usd", dec!(1.1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let err = DataPulseConfig::from_toml_str("[pipeline]\nshort_window = 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let config = DataPulseConfig::from_toml_str(
            r#"
            [status]
            mode = "translated"
            require_complete = true

            [status.platforms.shopify.payment]
            paid = "paid"
            "#,
        )
        .unwrap();
        let pipeline = Pipeline::from_config(&config).unwrap();
        let raw = RawRecords::from_json(
            r#"{"shopify": {"orders": [
                {"id": 1, "created_at": "2024-03-01T00:00:00Z", "financial_status": "voided"}
            ]}}"#,
        )
        .unwrap();
        let err = pipeline.run(&raw, &CurrencyRates::with_defaults(), &ctx()).unwrap_err();
        assert!(err.to_string().contains("shopify/payment:voided"));
    }
}
