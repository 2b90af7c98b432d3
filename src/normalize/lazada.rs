//! Lazada order and order-item mapping
//!
//! Lazada settles in PHP and lands one item row per purchased unit, so every
//! line has quantity 1.

use super::fields::{non_empty, opt_string_or_number, RecordContext, UNKNOWN_PRODUCT_ID};
use super::PlatformNormalizer;
use crate::error::Result;
use crate::order::{Order, OrderItem};
use crate::types::Platform;
use serde::{Deserialize, Serialize};

pub const LAZADA_CURRENCY: &str = "PHP";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LazadaOrder {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub buyer_email: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub price: Option<String>,
    #[serde(default)]
    pub items_count: Option<i64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub voucher: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub statuses: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LazadaOrderItem {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_item_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub variation: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub paid_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub voucher_amount: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LazadaNormalizer;

impl PlatformNormalizer for LazadaNormalizer {
    type RawOrder = LazadaOrder;
    type RawItem = LazadaOrderItem;

    const PLATFORM: Platform = Platform::Lazada;

    fn normalize_order(&self, raw: &LazadaOrder, index: usize) -> Result<Order> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.order_id.as_ref(), index);
        let order_id = ctx.required("order_id", raw.order_id.as_ref())?;
        let created_at = ctx.required_timestamp("created_at", raw.created_at.as_ref())?;
        let price = ctx.amount_or_zero("price", raw.price.as_ref())?;

        let mut order = Order::new(Self::PLATFORM, order_id, created_at);
        order.updated_at = ctx.timestamp("updated_at", raw.updated_at.as_ref())?;
        order.customer_id = raw.customer_id.clone();
        order.customer_email = non_empty(raw.buyer_email.clone());
        order.total_amount = price;
        order.subtotal_amount = price;
        order.discount_amount = ctx.amount_or_zero("voucher", raw.voucher.as_ref())?;
        order.currency_code = LAZADA_CURRENCY.to_string();
        order.payment_status = non_empty(raw.payment_method.clone());
        order.fulfillment_status = non_empty(raw.statuses.clone());
        order.item_count = ctx.quantity("items_count", raw.items_count)?.unwrap_or(0);
        order.order_source = Some(Self::PLATFORM.as_str().to_string());
        order.notes = non_empty(raw.remarks.clone());
        Ok(order)
    }

    fn normalize_item(&self, raw: &LazadaOrderItem, index: usize) -> Result<OrderItem> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.order_item_id.as_ref(), index);
        let line_item_id = ctx.required("order_item_id", raw.order_item_id.as_ref())?;
        let order_id = ctx.required("order_id", raw.order_id.as_ref())?;
        let product_id = raw
            .product_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_PRODUCT_ID.to_string());
        let paid = ctx.amount_or_zero("paid_price", raw.paid_price.as_ref())?;

        let mut item = OrderItem::new(Self::PLATFORM, line_item_id, order_id, product_id, 1);
        item.product_name = non_empty(raw.name.clone());
        item.variant_title = non_empty(raw.variation.clone());
        item.sku = non_empty(raw.sku.clone());
        item.unit_price = Some(paid);
        item.line_total = paid;
        item.discount_amount = ctx.amount_or_zero("voucher_amount", raw.voucher_amount.as_ref())?;
        item.fulfillment_status = non_empty(raw.status.clone());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_order_defaults() {
        let raw = LazadaOrder {
            order_id: Some("5000001".to_string()),
            created_at: Some("2024-02-01 08:00:00".to_string()),
            price: Some("5500.00".to_string()),
            payment_method: Some("COD".to_string()),
            statuses: Some("delivered".to_string()),
            ..Default::default()
        };
        let order = LazadaNormalizer.normalize_order(&raw, 0).unwrap();
        assert_eq!(order.currency_code, "PHP");
        assert_eq!(order.total_amount, dec!(5500.00));
        assert_eq!(order.discount_amount, Decimal::ZERO);
        assert_eq!(order.order_source.as_deref(), Some("lazada"));
        assert_eq!(order.fulfillment_status.as_deref(), Some("delivered"));
    }

    #[test]
    fn test_item_is_single_unit() {
        let raw: LazadaOrderItem = serde_json::from_str(
            r#"{"order_item_id": 500000100, "order_id": 5000001, "product_id": 2000001,
                "name": "Premium Widget 1", "paid_price": 1100.0, "status": "delivered"}"#,
        )
        .unwrap();
        let item = LazadaNormalizer.normalize_item(&raw, 0).unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.unit_price, Some(dec!(1100)));
        assert_eq!(item.line_total, dec!(1100));
        assert_eq!(item.order_id, "5000001");
    }

    #[test]
    fn test_bad_price_is_mapping_error() {
        let raw = LazadaOrder {
            order_id: Some("5000002".to_string()),
            created_at: Some("2024-02-01 08:00:00".to_string()),
            price: Some("12,50".to_string()),
            ..Default::default()
        };
        let err = LazadaNormalizer.normalize_order(&raw, 0).unwrap_err();
        assert!(err.to_string().contains("price"));
    }
}
