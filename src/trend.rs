//! Windowed computations over date-ordered series
//!
//! Every function here takes values already sorted ascending by date within a
//! single partition. [`partition_by`] produces those orderings as index arrays
//! over an arena of rows, so callers never rely on implicit input order.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Round to 2 places, halves away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator * 100` rounded to 2 places; 0 for a zero denominator
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        round2(numerator * Decimal::ONE_HUNDRED / denominator)
    }
}

/// Percentage growth from `previous` to `current`, rounded to 2 places
///
/// Zero when there is no previous value or it is zero.
pub fn growth_pct(current: Decimal, previous: Option<Decimal>) -> Decimal {
    match previous {
        Some(prev) if !prev.is_zero() => round2((current - prev) * Decimal::ONE_HUNDRED / prev),
        _ => Decimal::ZERO,
    }
}

/// Mean of `values`, 0 when empty
pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        Decimal::ZERO
    } else {
        values.iter().sum::<Decimal>() / Decimal::from(values.len())
    }
}

/// Trailing moving average over `window` points
///
/// The window shrinks at the start of the series, so point `i` averages
/// `max(0, i - window + 1)..=i`. A zero window is treated as 1.
pub fn moving_average(values: &[Decimal], window: usize) -> Vec<Decimal> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = Decimal::ZERO;

    for (i, value) in values.iter().enumerate() {
        sum += *value;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / Decimal::from(count));
    }
    out
}

/// Value `lag` points earlier, `None` for the first `lag` points
pub fn lag<T: Copy>(values: &[T], lag: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).map(|j| values[j]))
        .collect()
}

/// `value[i] - value[i - lag]`, `None` where `i < lag`
pub fn lag_delta(values: &[Decimal], lag_by: usize) -> Vec<Option<Decimal>> {
    lag(values, lag_by)
        .into_iter()
        .zip(values)
        .map(|(prev, current)| prev.map(|p| *current - p))
        .collect()
}

/// Running sum that restarts whenever the period key changes
///
/// With month-start keys this is a month-to-date total.
pub fn running_total_by<K: PartialEq>(values: &[Decimal], periods: &[K]) -> Vec<Decimal> {
    let mut out = Vec::with_capacity(values.len());
    let mut total = Decimal::ZERO;
    for (i, (value, period)) in values.iter().zip(periods).enumerate() {
        if i > 0 && periods[i - 1] != *period {
            total = Decimal::ZERO;
        }
        total += *value;
        out.push(total);
    }
    out
}

/// Row indices grouped by partition key, each sorted ascending by date
///
/// Sorting is stable, so rows sharing a date keep their arena order. Shared
/// dates within a partition are kept and logged.
pub fn partition_by<T, K, FK, FD>(rows: &[T], key: FK, date: FD) -> BTreeMap<K, Vec<usize>>
where
    K: Ord + Clone + std::fmt::Debug,
    FK: Fn(&T) -> K,
    FD: Fn(&T) -> NaiveDate,
{
    let mut partitions: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        partitions.entry(key(row)).or_default().push(i);
    }

    for (k, indices) in partitions.iter_mut() {
        indices.sort_by_key(|&i| date(&rows[i]));
        let duplicates = indices
            .windows(2)
            .filter(|pair| date(&rows[pair[0]]) == date(&rows[pair[1]]))
            .count();
        if duplicates > 0 {
            log::warn!(
                "Partition {:?} has {} repeated dates; rows kept in input order",
                k,
                duplicates
            );
        }
    }
    partitions
}
