//! Shopify order and line-item mapping

use super::fields::{non_empty, opt_string_or_number, RecordContext, UNKNOWN_PRODUCT_ID};
use super::PlatformNormalizer;
use crate::currency::BASE_CURRENCY;
use crate::error::Result;
use crate::order::{Order, OrderItem};
use crate::types::Platform;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Landed Shopify order row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopifyOrder {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub total_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub subtotal_price: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub total_tax: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub total_discounts: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub line_items_count: Option<i64>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Landed Shopify order line row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopifyLineItem {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Unit price
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub total_discount: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub fulfillable_quantity: Option<i64>,
    #[serde(default)]
    pub gift_card: Option<bool>,
    #[serde(default)]
    pub taxable: Option<bool>,
    #[serde(default)]
    pub requires_shipping: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShopifyNormalizer;

impl PlatformNormalizer for ShopifyNormalizer {
    type RawOrder = ShopifyOrder;
    type RawItem = ShopifyLineItem;

    const PLATFORM: Platform = Platform::Shopify;

    fn normalize_order(&self, raw: &ShopifyOrder, index: usize) -> Result<Order> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.id.as_ref(), index);
        let order_id = ctx.required("id", raw.id.as_ref())?;
        let created_at = ctx.required_timestamp("created_at", raw.created_at.as_ref())?;

        let mut order = Order::new(Self::PLATFORM, order_id, created_at);
        order.updated_at = ctx.timestamp("updated_at", raw.updated_at.as_ref())?;
        order.processed_at = ctx.timestamp("processed_at", raw.processed_at.as_ref())?;
        order.cancelled_at = ctx.timestamp("cancelled_at", raw.cancelled_at.as_ref())?;
        order.closed_at = ctx.timestamp("closed_at", raw.closed_at.as_ref())?;
        order.customer_id = raw.customer_id.clone();
        order.customer_email = non_empty(raw.email.clone());
        order.total_amount = ctx.amount_or_zero("total_price", raw.total_price.as_ref())?;
        order.subtotal_amount = ctx.amount_or_zero("subtotal_price", raw.subtotal_price.as_ref())?;
        order.tax_amount = ctx.amount_or_zero("total_tax", raw.total_tax.as_ref())?;
        order.discount_amount = ctx.amount_or_zero("total_discounts", raw.total_discounts.as_ref())?;
        order.currency_code =
            non_empty(raw.currency.clone()).unwrap_or_else(|| BASE_CURRENCY.to_string());
        order.payment_status = non_empty(raw.financial_status.clone());
        order.fulfillment_status = non_empty(raw.fulfillment_status.clone());
        order.cancel_reason = non_empty(raw.cancel_reason.clone());
        order.item_count = ctx
            .quantity("line_items_count", raw.line_items_count)?
            .unwrap_or(0);
        order.order_source = non_empty(raw.source_name.clone());
        order.tags = non_empty(raw.tags.clone());
        order.notes = non_empty(raw.note.clone());
        Ok(order)
    }

    fn normalize_item(&self, raw: &ShopifyLineItem, index: usize) -> Result<OrderItem> {
        let ctx = RecordContext::new(Self::PLATFORM, raw.id.as_ref(), index);
        let line_item_id = ctx.required("id", raw.id.as_ref())?;
        let order_id = ctx.required("order_id", raw.order_id.as_ref())?;
        let quantity = ctx.required_quantity("quantity", raw.quantity)?;
        let product_id = raw
            .product_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_PRODUCT_ID.to_string());

        let mut item = OrderItem::new(Self::PLATFORM, line_item_id, order_id, product_id, quantity);
        item.variant_id = raw.variant_id.clone();
        item.product_name = non_empty(raw.title.clone());
        item.variant_title = non_empty(raw.variant_title.clone());
        item.sku = non_empty(raw.sku.clone());
        item.unit_price = ctx.amount("price", raw.price.as_ref())?;
        item.line_total = item
            .unit_price
            .map(|price| price * Decimal::from(quantity))
            .unwrap_or(Decimal::ZERO);
        item.discount_amount = ctx.amount_or_zero("total_discount", raw.total_discount.as_ref())?;
        item.fulfillment_status = non_empty(raw.fulfillment_status.clone());
        item.fulfillable_quantity = raw.fulfillable_quantity.unwrap_or(0);
        item.is_gift_card = raw.gift_card.unwrap_or(false);
        item.is_taxable = raw.taxable.unwrap_or(true);
        item.requires_shipping = raw.requires_shipping.unwrap_or(true);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rust_decimal_macros::dec;

    fn raw_order() -> ShopifyOrder {
        serde_json::from_str(
            r#"{
                "id": 3000001,
                "created_at": "2024-03-04 09:15:00",
                "customer_id": 1000003,
                "email": "jane.johnson1@email.com",
                "total_price": "107.99",
                "subtotal_price": "104.99",
                "total_tax": 8.0,
                "total_discounts": "5.00",
                "currency": "USD",
                "financial_status": "paid",
                "fulfillment_status": "fulfilled",
                "line_items_count": 2,
                "source_name": "web"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_order() {
        let order = ShopifyNormalizer.normalize_order(&raw_order(), 0).unwrap();
        assert_eq!(order.order_id, "3000001");
        assert_eq!(order.platform, Platform::Shopify);
        assert_eq!(order.total_amount, dec!(107.99));
        assert_eq!(order.tax_amount, dec!(8));
        assert_eq!(order.customer_id.as_deref(), Some("1000003"));
        assert_eq!(order.payment_status.as_deref(), Some("paid"));
        assert_eq!(order.item_count, 2);
        assert!(order.cancelled_at.is_none());
        assert!(order.tags.is_none());
    }

    #[test]
    fn test_missing_created_at_is_mapping_error() {
        let mut raw = raw_order();
        raw.created_at = None;
        let err = ShopifyNormalizer.normalize_order(&raw, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        assert!(err.to_string().contains("created_at"));
    }

    #[test]
    fn test_line_total_from_unit_price() {
        let raw = ShopifyLineItem {
            id: Some("300000100".to_string()),
            order_id: Some("3000001".to_string()),
            product_id: Some("2000005".to_string()),
            quantity: Some(3),
            price: Some("19.50".to_string()),
            ..Default::default()
        };
        let item = ShopifyNormalizer.normalize_item(&raw, 0).unwrap();
        assert_eq!(item.unit_price, Some(dec!(19.50)));
        assert_eq!(item.line_total, dec!(58.50));
        assert_eq!(item.discount_amount, Decimal::ZERO);
        assert!(item.is_taxable);
        assert!(!item.is_gift_card);
    }

    #[test]
    fn test_item_requires_quantity() {
        let raw = ShopifyLineItem {
            id: Some("1".to_string()),
            order_id: Some("3000001".to_string()),
            ..Default::default()
        };
        let err = ShopifyNormalizer.normalize_item(&raw, 0).unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }
}
