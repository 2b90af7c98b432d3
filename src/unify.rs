//! Unified canonical collections
//!
//! Normalized batches are concatenated in platform order, keeping every
//! record. Key and reference checks are run separately so callers can surface
//! integrity violations without the unifier ever dropping a row.

use crate::error::{DataPulseError, Result};
use crate::normalize::NormalizedBatch;
use crate::order::{Order, OrderItem};
use crate::types::{OrderKey, Platform};
use hashbrown::{HashMap, HashSet};

/// All orders and all items across platforms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedCollections {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
}

impl UnifiedCollections {
    /// Concatenate batches in the order given
    pub fn from_batches(batches: Vec<NormalizedBatch>) -> Self {
        let order_total = batches.iter().map(|b| b.orders.len()).sum();
        let item_total = batches.iter().map(|b| b.items.len()).sum();
        let mut orders = Vec::with_capacity(order_total);
        let mut items = Vec::with_capacity(item_total);

        for batch in batches {
            orders.extend(batch.orders);
            items.extend(batch.items);
        }

        log::info!("Unified {} orders and {} items", orders.len(), items.len());
        Self { orders, items }
    }

    pub fn order_count(&self, platform: Platform) -> usize {
        self.orders.iter().filter(|o| o.platform == platform).count()
    }

    pub fn item_count(&self, platform: Platform) -> usize {
        self.items.iter().filter(|i| i.platform == platform).count()
    }

    /// Index of each order by its composite key
    ///
    /// When keys collide the first occurrence wins; run
    /// [`check_integrity`](Self::check_integrity) first to reject duplicates.
    pub fn order_index(&self) -> HashMap<OrderKey, usize> {
        let mut index = HashMap::with_capacity(self.orders.len());
        for (i, order) in self.orders.iter().enumerate() {
            index.entry(order.key()).or_insert(i);
        }
        index
    }

    /// Reject duplicate order keys, duplicate line keys and orphaned items
    ///
    /// Violations are reported in collection order.
    pub fn check_integrity(&self) -> Result<()> {
        let mut seen_orders = HashSet::with_capacity(self.orders.len());
        for order in &self.orders {
            if !seen_orders.insert(order.key()) {
                return Err(DataPulseError::DuplicateOrder {
                    platform: order.platform,
                    order_id: order.order_id.clone(),
                });
            }
        }

        let mut seen_lines: HashSet<(Platform, &str)> = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen_lines.insert((item.platform, item.line_item_id.as_str())) {
                return Err(DataPulseError::DuplicateLineItem {
                    platform: item.platform,
                    line_item_id: item.line_item_id.clone(),
                });
            }
            if !seen_orders.contains(&item.order_key()) {
                return Err(DataPulseError::OrphanItem {
                    platform: item.platform,
                    line_item_id: item.line_item_id.clone(),
                    order_id: item.order_id.clone(),
                });
            }
        }

        log::debug!("Integrity check passed for {} orders", self.orders.len());
        Ok(())
    }
}
