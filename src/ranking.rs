//! Dense rank, percentile rank and performance tiers
//!
//! All results are returned in input order so they can be zipped back onto
//! the rows they were computed from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Highest rank that still counts as "Top 10"
pub const TOP_RANK_CUTOFF: u32 = 10;
pub const TOP_PERFORMER_PERCENTILE: f64 = 0.8;
pub const AVERAGE_PERCENTILE: f64 = 0.5;

/// Dense rank, highest score first
///
/// Equal scores share a rank and the next distinct score takes the next
/// integer, so ranks have no gaps.
pub fn dense_rank(scores: &[Decimal]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].cmp(&scores[a]));

    let mut ranks = vec![0u32; scores.len()];
    let mut rank = 0u32;
    let mut previous: Option<Decimal> = None;
    for i in order {
        if previous != Some(scores[i]) {
            rank += 1;
            previous = Some(scores[i]);
        }
        ranks[i] = rank;
    }
    ranks
}

/// Fraction of entities with a strictly lower score, on `[0, 1)`
pub fn percentile_rank(scores: &[Decimal]) -> Vec<f64> {
    let n = scores.len();
    let mut sorted = scores.to_vec();
    sorted.sort();
    scores
        .iter()
        .map(|score| {
            let lower = sorted.partition_point(|s| s < score);
            lower as f64 / n as f64
        })
        .collect()
}

/// Apply a per-partition ranking to rows keyed by `partitions`
fn by_partition<K, T, F>(partitions: &[K], scores: &[Decimal], rank: F, fill: T) -> Vec<T>
where
    K: Ord,
    T: Copy,
    F: Fn(&[Decimal]) -> Vec<T>,
{
    let mut groups: BTreeMap<&K, Vec<usize>> = BTreeMap::new();
    for (i, key) in partitions.iter().enumerate() {
        groups.entry(key).or_default().push(i);
    }

    let mut out = vec![fill; scores.len()];
    for indices in groups.values() {
        let group_scores: Vec<Decimal> = indices.iter().map(|&i| scores[i]).collect();
        for (&i, value) in indices.iter().zip(rank(&group_scores)) {
            out[i] = value;
        }
    }
    out
}

/// [`dense_rank`] computed independently within each partition
pub fn dense_rank_by<K: Ord>(partitions: &[K], scores: &[Decimal]) -> Vec<u32> {
    by_partition(partitions, scores, dense_rank, 0)
}

/// [`percentile_rank`] computed independently within each partition
pub fn percentile_rank_by<K: Ord>(partitions: &[K], scores: &[Decimal]) -> Vec<f64> {
    by_partition(partitions, scores, percentile_rank, 0.0)
}

/// Product performance classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    #[serde(rename = "Top 10")]
    Top10,
    #[serde(rename = "Top Performer")]
    TopPerformer,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Underperformer")]
    Underperformer,
}

impl PerformanceTier {
    /// Rank takes precedence over percentile
    pub fn assign(rank: u32, percentile: f64) -> Self {
        if rank <= TOP_RANK_CUTOFF {
            PerformanceTier::Top10
        } else if percentile >= TOP_PERFORMER_PERCENTILE {
            PerformanceTier::TopPerformer
        } else if percentile >= AVERAGE_PERCENTILE {
            PerformanceTier::Average
        } else {
            PerformanceTier::Underperformer
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceTier::Top10 => "Top 10",
            PerformanceTier::TopPerformer => "Top Performer",
            PerformanceTier::Average => "Average",
            PerformanceTier::Underperformer => "Underperformer",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
