//! Small statistics helpers shared by the detectors.

use bias_core::TradeRecord;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;

/// Arithmetic mean, `None` for no values.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Median (average of the two middle values for even counts).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Sample standard deviation (n - 1), `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().std_dev())
}

/// Standard deviation over mean. `None` unless the mean is positive.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    let cv = sample_std(values)? / m;
    cv.is_finite().then_some(cv)
}

/// `part / whole`, zero when `whole` is zero.
#[inline]
pub fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Round to a fixed number of decimals for display metrics, halves to even.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Row indices per asset, assets in sorted order.
pub fn rows_by_asset(trades: &[TradeRecord]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, trade) in trades.iter().enumerate() {
        groups.entry(trade.asset.as_str()).or_default().push(idx);
    }
    groups
}

/// Seconds elapsed since the previous trade; `None` for the first row.
pub fn gaps_since_previous(trades: &[TradeRecord]) -> Vec<Option<f64>> {
    let mut gaps = Vec::with_capacity(trades.len());
    let mut prev: Option<&TradeRecord> = None;
    for trade in trades {
        gaps.push(prev.map(|p| {
            (trade.timestamp - p.timestamp).num_milliseconds() as f64 / 1000.0
        }));
        prev = Some(trade);
    }
    gaps
}
