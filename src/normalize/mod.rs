//! Platform normalizers
//!
//! Each platform lands its own order and item record shapes. A
//! [`PlatformNormalizer`] maps one raw record into exactly one canonical
//! [`Order`] or [`OrderItem`], failing with a mapping error that names the
//! platform, the record and the offending field.

pub mod amazon;
pub mod fields;
pub mod lazada;
pub mod shopee;
pub mod shopify;

pub use amazon::{AmazonMoney, AmazonNormalizer, AmazonOrder, AmazonOrderItem};
pub use lazada::{LazadaNormalizer, LazadaOrder, LazadaOrderItem};
pub use shopee::{ShopeeNormalizer, ShopeeOrder, ShopeeOrderItem};
pub use shopify::{ShopifyLineItem, ShopifyNormalizer, ShopifyOrder};

use crate::error::Result;
use crate::order::{Order, OrderItem};
use crate::types::Platform;
use serde::{Deserialize, Serialize};

/// Maps one platform's raw records into the canonical schema
pub trait PlatformNormalizer: Send + Sync {
    type RawOrder;
    type RawItem;

    const PLATFORM: Platform;

    fn normalize_order(&self, raw: &Self::RawOrder, index: usize) -> Result<Order>;

    fn normalize_item(&self, raw: &Self::RawItem, index: usize) -> Result<OrderItem>;
}

/// Landed order and item records for one platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "O: Serialize, I: Serialize",
    deserialize = "O: Deserialize<'de>, I: Deserialize<'de>"
))]
pub struct RawBatch<O, I> {
    #[serde(default = "Vec::new")]
    pub orders: Vec<O>,
    #[serde(default = "Vec::new")]
    pub items: Vec<I>,
}

impl<O, I> Default for RawBatch<O, I> {
    fn default() -> Self {
        Self {
            orders: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<O, I> RawBatch<O, I> {
    pub fn new(orders: Vec<O>, items: Vec<I>) -> Self {
        Self { orders, items }
    }

    pub fn len(&self) -> usize {
        self.orders.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.items.is_empty()
    }
}

/// Raw records for every platform, as handed to a pipeline run
///
/// A platform missing from the input document is treated as having no records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecords {
    #[serde(default)]
    pub shopify: RawBatch<ShopifyOrder, ShopifyLineItem>,
    #[serde(default)]
    pub amazon: RawBatch<AmazonOrder, AmazonOrderItem>,
    #[serde(default)]
    pub lazada: RawBatch<LazadaOrder, LazadaOrderItem>,
    #[serde(default)]
    pub shopee: RawBatch<ShopeeOrder, ShopeeOrderItem>,
}

impl RawRecords {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Orders and items across all platforms
    pub fn record_count(&self) -> usize {
        self.shopify.len() + self.amazon.len() + self.lazada.len() + self.shopee.len()
    }

    pub fn order_count(&self, platform: Platform) -> usize {
        match platform {
            Platform::Shopify => self.shopify.orders.len(),
            Platform::Amazon => self.amazon.orders.len(),
            Platform::Lazada => self.lazada.orders.len(),
            Platform::Shopee => self.shopee.orders.len(),
        }
    }
}

/// Canonical records produced by one platform normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub platform: Platform,
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
}

impl NormalizedBatch {
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            orders: Vec::new(),
            items: Vec::new(),
        }
    }
}

/// Normalize every record of one platform, in source order
///
/// Stops at the first record that cannot be mapped.
pub fn normalize_batch<N: PlatformNormalizer>(
    normalizer: &N,
    raw: &RawBatch<N::RawOrder, N::RawItem>,
) -> Result<NormalizedBatch> {
    let orders = raw
        .orders
        .iter()
        .enumerate()
        .map(|(i, r)| normalizer.normalize_order(r, i))
        .collect::<Result<Vec<_>>>()?;
    let items = raw
        .items
        .iter()
        .enumerate()
        .map(|(i, r)| normalizer.normalize_item(r, i))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Normalized {} orders and {} items from {}",
        orders.len(),
        items.len(),
        N::PLATFORM
    );

    Ok(NormalizedBatch {
        platform: N::PLATFORM,
        orders,
        items,
    })
}

/// Run all four normalizers and return their batches in platform order
///
/// With `parallel` the platforms are normalized on the rayon pool; each
/// branch owns its output so the merge order never depends on scheduling.
/// When several platforms fail, the error of the earliest platform wins.
pub fn normalize_all(raw: &RawRecords, parallel: bool) -> Result<Vec<NormalizedBatch>> {
    let shopify = || normalize_batch(&ShopifyNormalizer, &raw.shopify);
    let amazon = || normalize_batch(&AmazonNormalizer, &raw.amazon);
    let lazada = || normalize_batch(&LazadaNormalizer, &raw.lazada);
    let shopee = || normalize_batch(&ShopeeNormalizer, &raw.shopee);

    let (shopify, amazon, lazada, shopee) = if parallel {
        let ((a, b), (c, d)) = rayon::join(
            || rayon::join(shopify, amazon),
            || rayon::join(lazada, shopee),
        );
        (a, b, c, d)
    } else {
        (shopify(), amazon(), lazada(), shopee())
    };

    let batches = vec![shopify?, amazon?, lazada?, shopee?];
    log::info!(
        "Normalized {} orders and {} items across {} platforms",
        batches.iter().map(|b| b.orders.len()).sum::<usize>(),
        batches.iter().map(|b| b.items.len()).sum::<usize>(),
        batches.len()
    );
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawRecords {
        RawRecords::from_json(
            r#"{
                "shopify": {
                    "orders": [{"id": 1, "created_at": "2024-01-01T10:00:00Z", "total_price": "10.00"}],
                    "items": [{"id": 11, "order_id": 1, "product_id": 7, "quantity": 1, "price": "10.00"}]
                },
                "lazada": {
                    "orders": [{"order_id": 1, "created_at": "2024-01-01 12:00:00", "price": 500}]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_platforms_default_to_empty() {
        let raw = sample();
        assert!(raw.amazon.is_empty());
        assert!(raw.shopee.is_empty());
        assert_eq!(raw.record_count(), 3);
        assert_eq!(raw.order_count(Platform::Lazada), 1);
    }

    #[test]
    fn test_normalize_all_is_platform_ordered() {
        let raw = sample();
        let sequential = normalize_all(&raw, false).unwrap();
        let parallel = normalize_all(&raw, true).unwrap();
        assert_eq!(sequential, parallel);

        let platforms: Vec<Platform> = sequential.iter().map(|b| b.platform).collect();
        assert_eq!(platforms, Platform::ALL.to_vec());
        assert_eq!(sequential[0].orders[0].order_id, "1");
        assert_eq!(sequential[2].orders[0].order_id, "1");
        assert!(sequential[1].orders.is_empty());
    }

    #[test]
    fn test_first_failing_platform_is_reported() {
        let mut raw = sample();
        raw.shopee.orders.push(ShopeeOrder::default());
        raw.amazon.orders.push(AmazonOrder::default());
        let err = normalize_all(&raw, true).unwrap_err();
        assert!(err.to_string().contains("amazon"));
    }
}
