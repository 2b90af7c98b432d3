//! Shopee order and order-item mapping
//!
//! Shopee reports epoch-second timestamps, a single order status from which
//! payment state is inferred, and per-unit original/discounted prices.

use super::fields::{non_empty, opt_string_or_number, RecordContext};
use super::PlatformNormalizer;
use crate::currency::BASE_CURRENCY;
use crate::error::Result;
use crate::order::{Order, OrderItem};
use crate::types::Platform;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopeeOrder {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_sn: Option<String>,
    #[serde(default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default)]
    pub pay_time: Option<i64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub buyer_user_id: Option<String>,
    #[serde(default)]
    pub buyer_username: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub total_amount: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub estimated_shipping_fee: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub voucher_absorbed: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub message_to_seller: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopeeOrderItem {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_sn: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_sku: Option<String>,
    #[serde(default)]
    pub model_quantity_purchased: Option<i64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub model_original_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub model_discounted_price: Option<String>,
}

/// Payment state implied by an order status
pub fn payment_status_for(order_status: Option<&str>) -> &'static str {
    match order_status {
        Some("READY_TO_SHIP") | Some("PROCESSED") | Some("SHIPPED") | Some("COMPLETED") => "paid",
        Some("UNPAID") => "pending",
        _ => "unknown",
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShopeeNormalizer;

impl PlatformNormalizer for ShopeeNormalizer {
    type RawOrder = ShopeeOrder;
    type RawItem = ShopeeOrderItem;

    const PLATFORM: Platform = Platform::Shopee;

    fn normalize_order(&self, raw: &ShopeeOrder, index: usize) -> Result<Order> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.order_sn.as_ref(), index);
        let order_id = ctx.required("order_sn", raw.order_sn.as_ref())?;
        let created_at = ctx
            .epoch("create_time", raw.create_time)?
            .ok_or_else(|| ctx.error("create_time", "is missing"))?;
        let updated_at = ctx.epoch("update_time", raw.update_time)?;
        let status = non_empty(raw.order_status.clone());

        let total = ctx.amount_or_zero("total_amount", raw.total_amount.as_ref())?;
        let shipping = ctx.amount_or_zero("estimated_shipping_fee", raw.estimated_shipping_fee.as_ref())?;

        let mut order = Order::new(Self::PLATFORM, order_id, created_at);
        order.updated_at = updated_at;
        order.processed_at = ctx.epoch("pay_time", raw.pay_time)?;
        order.cancelled_at = match status.as_deref() {
            Some("CANCELLED") => updated_at,
            _ => None,
        };
        order.closed_at = match status.as_deref() {
            Some("COMPLETED") => updated_at,
            _ => None,
        };
        order.customer_id = raw.buyer_user_id.clone();
        order.customer_email = non_empty(raw.buyer_username.clone());
        order.total_amount = total;
        order.subtotal_amount = total - shipping;
        order.discount_amount = ctx.amount_or_zero("voucher_absorbed", raw.voucher_absorbed.as_ref())?;
        order.currency_code =
            non_empty(raw.currency.clone()).unwrap_or_else(|| BASE_CURRENCY.to_string());
        order.payment_status = Some(payment_status_for(status.as_deref()).to_string());
        order.fulfillment_status = status;
        order.cancel_reason = non_empty(raw.cancel_reason.clone());
        order.item_count = 1;
        order.order_source = Some(Self::PLATFORM.as_str().to_string());
        order.notes = non_empty(raw.message_to_seller.clone());
        Ok(order)
    }

    fn normalize_item(&self, raw: &ShopeeOrderItem, index: usize) -> Result<OrderItem> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.order_sn.as_ref(), index);
        let order_id = ctx.required("order_sn", raw.order_sn.as_ref())?;
        let product_id = ctx.required("item_id", raw.item_id.as_ref())?;
        let quantity = ctx.required_quantity("model_quantity_purchased", raw.model_quantity_purchased)?;
        let original = ctx.amount("model_original_price", raw.model_original_price.as_ref())?;
        let discounted = ctx.amount("model_discounted_price", raw.model_discounted_price.as_ref())?;
        let units = Decimal::from(quantity);

        let line_item_id = format!("{}_{}", order_id, product_id);
        let mut item = OrderItem::new(Self::PLATFORM, line_item_id, order_id, product_id, quantity);
        item.variant_id = raw.model_id.clone();
        item.product_name = non_empty(raw.item_name.clone());
        item.variant_title = non_empty(raw.model_name.clone());
        item.sku = non_empty(raw.model_sku.clone());
        item.unit_price = discounted;
        item.line_total = discounted.map(|p| p * units).unwrap_or(Decimal::ZERO);
        item.discount_amount = match (original, discounted) {
            (Some(orig), Some(disc)) => (orig - disc) * units,
            _ => Decimal::ZERO,
        };
        item.fulfillment_status = Some("pending".to_string());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw_order(status: &str) -> ShopeeOrder {
        ShopeeOrder {
            order_sn: Some("SHP6000001".to_string()),
            create_time: Some(1_704_067_200),
            update_time: Some(1_704_153_600),
            pay_time: Some(1_704_070_800),
            buyer_user_id: Some("1000002".to_string()),
            total_amount: Some("2250.00".to_string()),
            estimated_shipping_fee: Some("50.00".to_string()),
            voucher_absorbed: Some("20.00".to_string()),
            currency: Some("PHP".to_string()),
            order_status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_completed_order() {
        let order = ShopeeNormalizer.normalize_order(&raw_order("COMPLETED"), 0).unwrap();
        assert_eq!(order.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(order.subtotal_amount, dec!(2200.00));
        assert_eq!(order.payment_status.as_deref(), Some("paid"));
        assert_eq!(order.fulfillment_status.as_deref(), Some("COMPLETED"));
        assert_eq!(order.closed_at, order.updated_at);
        assert!(order.cancelled_at.is_none());
        assert_eq!(order.item_count, 1);
    }

    #[test]
    fn test_cancelled_order_sets_cancelled_at() {
        let order = ShopeeNormalizer.normalize_order(&raw_order("CANCELLED"), 0).unwrap();
        assert!(order.cancelled_at.is_some());
        assert!(order.closed_at.is_none());
        assert_eq!(order.payment_status.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_payment_status_inference() {
        assert_eq!(payment_status_for(Some("READY_TO_SHIP")), "paid");
        assert_eq!(payment_status_for(Some("UNPAID")), "pending");
        assert_eq!(payment_status_for(Some("IN_CANCEL")), "unknown");
        assert_eq!(payment_status_for(None), "unknown");
    }

    #[test]
    fn test_item_discount_from_unit_prices() {
        let raw = ShopeeOrderItem {
            order_sn: Some("SHP6000001".to_string()),
            item_id: Some("2000003".to_string()),
            model_id: Some("20000030".to_string()),
            model_quantity_purchased: Some(2),
            model_original_price: Some("1210.00".to_string()),
            model_discounted_price: Some("1100.00".to_string()),
            ..Default::default()
        };
        let item = ShopeeNormalizer.normalize_item(&raw, 0).unwrap();
        assert_eq!(item.line_item_id, "SHP6000001_2000003");
        assert_eq!(item.unit_price, Some(dec!(1100.00)));
        assert_eq!(item.line_total, dec!(2200.00));
        assert_eq!(item.discount_amount, dec!(220.00));
    }

    #[test]
    fn test_missing_create_time() {
        let mut raw = raw_order("SHIPPED");
        raw.create_time = None;
        let err = ShopeeNormalizer.normalize_order(&raw, 0).unwrap_err();
        assert!(err.to_string().contains("create_time"));
    }

    #[test]
    fn test_numeric_order_sn() {
        let raw = crate::normalize::RawRecords::from_json(
            r#"{"shopee": {
                "orders": [{"order_sn": 240301, "create_time": 1709251200}],
                "items": [{"order_sn": 240301, "item_id": 42, "model_quantity_purchased": 1}]
            }}"#,
        )
        .unwrap();
        let order = ShopeeNormalizer.normalize_order(&raw.shopee.orders[0], 0).unwrap();
        assert_eq!(order.order_id, "240301");
        let item = ShopeeNormalizer.normalize_item(&raw.shopee.items[0], 0).unwrap();
        assert_eq!(item.line_item_id, "240301_42");
        assert_eq!(item.order_id, "240301");
    }
}
