//! Amazon order and order-item mapping
//!
//! Amazon exposes no tax or discount split at order level and reports the
//! payment method where other platforms report a payment status.

use super::fields::{non_empty, opt_string_or_number, RecordContext, UNKNOWN_PRODUCT_ID};
use super::PlatformNormalizer;
use crate::currency::BASE_CURRENCY;
use crate::error::Result;
use crate::order::{Order, OrderItem};
use crate::trend::round2;
use crate::types::Platform;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Money object as returned by the orders API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmazonMoney {
    #[serde(rename = "Amount", default, deserialize_with = "opt_string_or_number")]
    pub amount: Option<String>,
    #[serde(rename = "CurrencyCode", default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmazonOrder {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub amazon_order_id: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub last_update_date: Option<String>,
    #[serde(default)]
    pub buyer_email: Option<String>,
    #[serde(default)]
    pub order_total: Option<AmazonMoney>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub number_of_items_shipped: Option<i64>,
    #[serde(default)]
    pub number_of_items_unshipped: Option<i64>,
    #[serde(default)]
    pub sales_channel: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmazonOrderItem {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_item_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub amazon_order_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub asin: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub seller_sku: Option<String>,
    #[serde(default)]
    pub quantity_ordered: Option<i64>,
    #[serde(default)]
    pub quantity_shipped: Option<i64>,
    /// Line amount (unit price times quantity)
    #[serde(default)]
    pub item_price: Option<AmazonMoney>,
    #[serde(default)]
    pub promotion_discount: Option<AmazonMoney>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AmazonNormalizer;

impl PlatformNormalizer for AmazonNormalizer {
    type RawOrder = AmazonOrder;
    type RawItem = AmazonOrderItem;

    const PLATFORM: Platform = Platform::Amazon;

    fn normalize_order(&self, raw: &AmazonOrder, index: usize) -> Result<Order> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.amazon_order_id.as_ref(), index);
        let order_id = ctx.required("amazon_order_id", raw.amazon_order_id.as_ref())?;
        let created_at = ctx.required_timestamp("purchase_date", raw.purchase_date.as_ref())?;

        let total = raw.order_total.as_ref();
        let amount = ctx.amount_or_zero("order_total.Amount", total.and_then(|t| t.amount.as_ref()))?;
        let shipped = ctx
            .quantity("number_of_items_shipped", raw.number_of_items_shipped)?
            .unwrap_or(0);
        let unshipped = ctx
            .quantity("number_of_items_unshipped", raw.number_of_items_unshipped)?
            .unwrap_or(0);

        let mut order = Order::new(Self::PLATFORM, order_id, created_at);
        order.updated_at = ctx.timestamp("last_update_date", raw.last_update_date.as_ref())?;
        order.customer_email = non_empty(raw.buyer_email.clone());
        order.customer_id = order.customer_email.clone();
        order.total_amount = amount;
        order.subtotal_amount = amount;
        order.currency_code = non_empty(total.and_then(|t| t.currency_code.clone()))
            .unwrap_or_else(|| BASE_CURRENCY.to_string());
        order.payment_status = non_empty(raw.payment_method.clone());
        order.fulfillment_status = non_empty(raw.order_status.clone());
        order.item_count = shipped.saturating_add(unshipped);
        order.order_source = non_empty(raw.sales_channel.clone());
        Ok(order)
    }

    fn normalize_item(&self, raw: &AmazonOrderItem, index: usize) -> Result<OrderItem> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.order_item_id.as_ref(), index);
        let line_item_id = ctx.required("order_item_id", raw.order_item_id.as_ref())?;
        let order_id = ctx.required("amazon_order_id", raw.amazon_order_id.as_ref())?;
        let ordered = ctx.required_quantity("quantity_ordered", raw.quantity_ordered)?;
        let shipped = ctx
            .quantity("quantity_shipped", raw.quantity_shipped)?
            .unwrap_or(0);
        let product_id =
            non_empty(raw.asin.clone()).unwrap_or_else(|| UNKNOWN_PRODUCT_ID.to_string());

        let line_total = ctx.amount_or_zero(
            "item_price.Amount",
            raw.item_price.as_ref().and_then(|p| p.amount.as_ref()),
        )?;
        let discount = ctx.amount_or_zero(
            "promotion_discount.Amount",
            raw.promotion_discount.as_ref().and_then(|p| p.amount.as_ref()),
        )?;

        let mut item = OrderItem::new(Self::PLATFORM, line_item_id, order_id, product_id, ordered);
        item.product_name = non_empty(raw.title.clone());
        item.sku = non_empty(raw.seller_sku.clone());
        item.unit_price = unit_price(line_total, ordered);
        item.line_total = line_total;
        item.discount_amount = discount;
        item.fulfillment_status = Some(if shipped > 0 { "shipped" } else { "pending" }.to_string());
        item.fulfillable_quantity = ordered as i64 - shipped as i64;
        Ok(item)
    }
}

/// Line amount spread over quantity at money scale; none for a zero-quantity line
fn unit_price(line_total: Decimal, quantity: u32) -> Option<Decimal> {
    if quantity == 0 {
        None
    } else {
        Some(round2(line_total / Decimal::from(quantity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw_item(quantity: i64, shipped: i64) -> AmazonOrderItem {
        AmazonOrderItem {
            order_item_id: Some("AMZ-4000001-0".to_string()),
            amazon_order_id: Some("AMZ-4000001".to_string()),
            asin: Some("ASIN2000010".to_string()),
            quantity_ordered: Some(quantity),
            quantity_shipped: Some(shipped),
            item_price: Some(AmazonMoney {
                amount: Some("90.00".to_string()),
                currency_code: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_order() {
        let raw: AmazonOrder = serde_json::from_str(
            r#"{
                "amazon_order_id": "AMZ-4000001",
                "purchase_date": "2024-02-10T14:00:00Z",
                "buyer_email": "buyer1@amazon.com",
                "order_total": {"Amount": "180.00", "CurrencyCode": "USD"},
                "payment_method": "Credit Card",
                "order_status": "Shipped",
                "number_of_items_shipped": 2,
                "number_of_items_unshipped": 1,
                "sales_channel": "Amazon.com"
            }"#,
        )
        .unwrap();
        let order = AmazonNormalizer.normalize_order(&raw, 0).unwrap();
        assert_eq!(order.total_amount, dec!(180.00));
        assert_eq!(order.subtotal_amount, dec!(180.00));
        assert_eq!(order.tax_amount, Decimal::ZERO);
        assert_eq!(order.customer_id.as_deref(), Some("buyer1@amazon.com"));
        assert_eq!(order.payment_status.as_deref(), Some("Credit Card"));
        assert_eq!(order.fulfillment_status.as_deref(), Some("Shipped"));
        assert_eq!(order.item_count, 3);
        assert!(order.processed_at.is_none());
    }

    #[test]
    fn test_unit_price_divides_line_amount() {
        let item = AmazonNormalizer.normalize_item(&raw_item(2, 2), 0).unwrap();
        assert_eq!(item.unit_price, Some(dec!(45)));
        assert_eq!(item.line_total, dec!(90.00));
        assert_eq!(item.fulfillment_status.as_deref(), Some("shipped"));
        assert_eq!(item.fulfillable_quantity, 0);
    }

    #[test]
    fn test_unit_price_is_rounded_to_cents() {
        let item = AmazonNormalizer.normalize_item(&raw_item(7, 7), 0).unwrap();
        assert_eq!(item.unit_price, Some(dec!(12.86)));
        assert_eq!(item.unit_price.map(|p| p.scale()), Some(2));
        assert_eq!(item.line_total, dec!(90.00));
    }

    #[test]
    fn test_zero_quantity_has_no_unit_price() {
        let item = AmazonNormalizer.normalize_item(&raw_item(0, 0), 0).unwrap();
        assert_eq!(item.unit_price, None);
        assert_eq!(item.line_total, dec!(90.00));
        assert_eq!(item.fulfillment_status.as_deref(), Some("pending"));
    }

    #[test]
    fn test_missing_order_reference() {
        let mut raw = raw_item(1, 0);
        raw.amazon_order_id = None;
        let err = AmazonNormalizer.normalize_item(&raw, 4).unwrap_err();
        assert!(err.to_string().contains("amazon_order_id"));
        assert!(err.to_string().contains("AMZ-4000001-0"));
    }

    #[test]
    fn test_numeric_identifiers() {
        let raw = crate::normalize::RawRecords::from_json(
            r#"{"amazon": {
                "orders": [{"amazon_order_id": 1110001, "purchase_date": "2024-03-01T00:00:00Z"}],
                "items": [{"order_item_id": 77, "amazon_order_id": 1110001, "asin": 4006381333931,
                           "quantity_ordered": 1}]
            }}"#,
        )
        .unwrap();
        let order = AmazonNormalizer.normalize_order(&raw.amazon.orders[0], 0).unwrap();
        assert_eq!(order.order_id, "1110001");
        let item = AmazonNormalizer.normalize_item(&raw.amazon.items[0], 0).unwrap();
        assert_eq!(item.line_item_id, "77");
        assert_eq!(item.order_id, "1110001");
        assert_eq!(item.product_id, "4006381333931");
    }
}
