//! Canonical order and order-line types shared by every platform

use crate::types::{Money, OrderKey, Platform, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical order, one per source order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Platform-scoped order identifier
    pub order_id: String,
    pub platform: Platform,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub processed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    /// Amounts are in `currency_code`, not converted
    pub total_amount: Money,
    pub subtotal_amount: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub currency_code: String,
    /// Platform-native payment status, untranslated
    pub payment_status: Option<String>,
    /// Platform-native fulfillment status, untranslated
    pub fulfillment_status: Option<String>,
    pub cancel_reason: Option<String>,
    pub item_count: u32,
    pub order_source: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

impl Order {
    /// Create an order with every optional field at its documented default
    pub fn new(platform: Platform, order_id: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            order_id: order_id.into(),
            platform,
            created_at,
            updated_at: None,
            processed_at: None,
            cancelled_at: None,
            closed_at: None,
            customer_id: None,
            customer_email: None,
            total_amount: Decimal::ZERO,
            subtotal_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            currency_code: "USD".to_string(),
            payment_status: None,
            fulfillment_status: None,
            cancel_reason: None,
            item_count: 0,
            order_source: None,
            tags: None,
            notes: None,
        }
    }

    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.platform, self.order_id.clone())
    }
}

/// Canonical order line
///
/// `line_total` is stored as reported and may already reflect discounts, so it
/// is not required to equal `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Platform-scoped line identifier
    pub line_item_id: String,
    pub order_id: String,
    pub platform: Platform,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub product_name: Option<String>,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub quantity: u32,
    /// None when the platform only reports a line amount and quantity is 0
    pub unit_price: Option<Money>,
    pub line_total: Money,
    pub discount_amount: Money,
    pub fulfillment_status: Option<String>,
    pub fulfillable_quantity: i64,
    pub is_gift_card: bool,
    pub is_taxable: bool,
    pub requires_shipping: bool,
}

impl OrderItem {
    pub fn new(
        platform: Platform,
        line_item_id: impl Into<String>,
        order_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            line_item_id: line_item_id.into(),
            order_id: order_id.into(),
            platform,
            product_id: product_id.into(),
            variant_id: None,
            product_name: None,
            variant_title: None,
            sku: None,
            quantity,
            unit_price: None,
            line_total: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            fulfillment_status: None,
            fulfillable_quantity: 0,
            is_gift_card: false,
            is_taxable: true,
            requires_shipping: true,
        }
    }

    /// Key of the order this line belongs to
    pub fn order_key(&self) -> OrderKey {
        OrderKey::new(self.platform, self.order_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_order_defaults() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T10:00:00+08:00").unwrap();
        let order = Order::new(Platform::Lazada, "5000001", ts);
        assert_eq!(order.tax_amount, Decimal::ZERO);
        assert!(order.cancel_reason.is_none());
        assert_eq!(order.key(), OrderKey::new(Platform::Lazada, "5000001"));
    }

    #[test]
    fn test_item_joins_on_composite_key() {
        let item = OrderItem::new(Platform::Amazon, "AMZ-1-0", "AMZ-1", "ASIN1", 2);
        assert_eq!(item.order_key(), OrderKey::new(Platform::Amazon, "AMZ-1"));
        assert!(item.unit_price.is_none());
    }
}
