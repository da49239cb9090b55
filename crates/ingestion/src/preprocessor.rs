//! Trade table cleaning.
//!
//! Drops invalid and out-of-range rows, removes P/L and balance outliers with
//! IQR fences, deduplicates, and leaves the table in chronological order.

use crate::normalizer::{NormalizedRow, NormalizedTable};
use bias_core::config::PreprocessConfig;
use bias_core::{Action, PreprocessStats, Timestamp, TradeRecord};
use chrono::DateTime;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Column an outlier filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutlierColumn {
    Pnl,
    Balance,
}

impl OutlierColumn {
    fn value(self, trade: &TradeRecord) -> Option<f64> {
        match self {
            OutlierColumn::Pnl => trade.pnl,
            OutlierColumn::Balance => trade.balance,
        }
    }

    fn name(self) -> &'static str {
        match self {
            OutlierColumn::Pnl => "pnl",
            OutlierColumn::Balance => "balance",
        }
    }
}

/// Table cleaner.
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a new preprocessor.
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Clean a normalized table.
    ///
    /// The returned trades satisfy every validity predicate, contain no
    /// duplicate (timestamp, asset, action, quantity, price) tuples and are
    /// sorted chronologically.
    pub fn process(&self, table: &NormalizedTable) -> (Vec<TradeRecord>, PreprocessStats) {
        let mut stats = PreprocessStats {
            rows_before: table.len(),
            ..Default::default()
        };
        if table.is_empty() {
            return (Vec::new(), stats);
        }

        // 1. Validity predicates
        let mut trades: Vec<TradeRecord> = table.rows.iter().filter_map(validate_row).collect();

        // 2. Timestamp range
        match self.range_bounds() {
            Some((lo, hi)) => trades.retain(|t| t.timestamp >= lo && t.timestamp < hi),
            None => warn!(
                min = self.config.min_epoch_secs,
                max = self.config.max_epoch_secs,
                "timestamp range not representable, skipping range filter"
            ),
        }
        stats.dropped_invalid = stats.rows_before - trades.len();

        // 3. IQR outliers, pnl first, survivors feed balance
        let columns = [
            (OutlierColumn::Pnl, table.has_pnl),
            (OutlierColumn::Balance, table.has_balance),
        ];
        for (column, present) in columns {
            if present {
                stats.dropped_outliers += self.remove_outliers(&mut trades, column);
            }
        }

        // 4. Deduplicate; sorting first makes duplicates adjacent
        trades.sort_by(chronological);
        let before = trades.len();
        trades.dedup_by(|later, earlier| same_identity(later, earlier));
        stats.dropped_duplicates = before - trades.len();
        stats.rows_after = trades.len();

        debug!(
            rows_before = stats.rows_before,
            dropped_invalid = stats.dropped_invalid,
            dropped_outliers = stats.dropped_outliers,
            dropped_duplicates = stats.dropped_duplicates,
            rows_after = stats.rows_after,
            "preprocessing complete"
        );
        (trades, stats)
    }

    fn range_bounds(&self) -> Option<(Timestamp, Timestamp)> {
        let lo = DateTime::from_timestamp(self.config.min_epoch_secs, 0)?.naive_utc();
        let hi = DateTime::from_timestamp(self.config.max_epoch_secs, 0)?.naive_utc();
        Some((lo, hi))
    }

    /// Drop rows outside the IQR fences of `column`. Returns the number removed.
    fn remove_outliers(&self, trades: &mut Vec<TradeRecord>, column: OutlierColumn) -> usize {
        let values: Vec<f64> = trades.iter().filter_map(|t| column.value(t)).collect();
        if values.len() < self.config.outlier_min_values {
            debug!(
                column = column.name(),
                non_null = values.len(),
                "too few values, skipping outlier filter"
            );
            return 0;
        }

        let Some((low, high)) = iqr_fences(values, self.config.iqr_multiplier) else {
            debug!(column = column.name(), "zero IQR, skipping outlier filter");
            return 0;
        };

        let before = trades.len();
        trades.retain(|t| column.value(t).map_or(true, |v| v >= low && v <= high));
        let removed = before - trades.len();
        debug!(column = column.name(), low, high, removed, "outlier filter applied");
        removed
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

/// Convert a row into a trade if all validity predicates hold.
fn validate_row(row: &NormalizedRow) -> Option<TradeRecord> {
    let timestamp = row.timestamp?;
    let action = Action::from_label(&row.action)?;
    let asset = row.asset.as_deref().map(str::trim).filter(|a| !a.is_empty())?;
    let quantity = row.quantity.filter(|q| q.is_finite() && *q > 0.0)?;
    let price = row.price.filter(|p| p.is_finite() && *p > 0.0)?;

    Some(TradeRecord {
        timestamp,
        action,
        asset: asset.to_string(),
        quantity,
        price,
        pnl: row.pnl,
        balance: row.balance,
    })
}

/// Total chronological order: timestamp first, then the remaining fields so
/// ties resolve the same way regardless of input order.
fn chronological(a: &TradeRecord, b: &TradeRecord) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.asset.cmp(&b.asset))
        .then_with(|| a.action.cmp(&b.action))
        .then_with(|| OrderedFloat(a.quantity).cmp(&OrderedFloat(b.quantity)))
        .then_with(|| OrderedFloat(a.price).cmp(&OrderedFloat(b.price)))
        .then_with(|| a.pnl.map(OrderedFloat).cmp(&b.pnl.map(OrderedFloat)))
        .then_with(|| a.balance.map(OrderedFloat).cmp(&b.balance.map(OrderedFloat)))
}

fn same_identity(a: &TradeRecord, b: &TradeRecord) -> bool {
    a.timestamp == b.timestamp
        && a.asset == b.asset
        && a.action == b.action
        && a.quantity == b.quantity
        && a.price == b.price
}

/// `[Q1 - k*IQR, Q3 + k*IQR]`, or `None` when the IQR is not positive.
fn iqr_fences(mut values: Vec<f64>, multiplier: f64) -> Option<(f64, f64)> {
    values.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile_linear(&values, 0.25)?;
    let q3 = quantile_linear(&values, 0.75)?;
    let iqr = q3 - q1;
    (iqr > 0.0).then(|| (q1 - multiplier * iqr, q3 + multiplier * iqr))
}

/// Quantile of sorted values with linear interpolation between closest ranks.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
