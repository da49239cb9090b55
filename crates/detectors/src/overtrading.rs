//! Overtrading detection.
//!
//! Two signals: trade frequency (busiest calendar hour against the mean per
//! active hour, plus an absolute trades-per-hour threshold) and ticket size
//! (notional above a fraction of the account balance).

use crate::detector::{cap_score, make_finding, Detection, Detector};
use crate::stats::{round_to, share};
use bias_core::config::OvertradingConfig;
use bias_core::{hour_bucket, BiasKind, Details, TradeRecord};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Cap on each of the two score components.
const COMPONENT_CAP: f64 = 50.0;
/// Points per unit of frequency ratio above 1.
const RATIO_WEIGHT: f64 = 25.0;
/// Points per trade above the absolute hourly threshold.
const EXCESS_TRADE_WEIGHT: f64 = 8.0;
/// Points per unit share of oversized tickets.
const OVERSIZE_WEIGHT: f64 = 250.0;

pub struct OvertradingDetector {
    config: OvertradingConfig,
    min_score: f64,
}

impl OvertradingDetector {
    pub fn new(config: OvertradingConfig, min_score: f64) -> Self {
        Self { config, min_score }
    }

    fn is_oversized(&self, trade: &TradeRecord) -> bool {
        match trade.balance {
            Some(balance) if balance != 0.0 => {
                let pct = trade.notional() / balance;
                pct.is_finite() && pct > self.config.balance_fraction
            }
            _ => false,
        }
    }
}

impl Detector for OvertradingDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::Overtrading
    }

    fn detect(&self, trades: &[TradeRecord]) -> Detection {
        let n = trades.len();
        if n < self.config.min_rows {
            return Detection::none();
        }

        let mut hours: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, trade) in trades.iter().enumerate() {
            hours.entry(hour_bucket(&trade.timestamp)).or_default().push(idx);
        }

        let max_per_hour = hours.values().map(Vec::len).max().unwrap_or(0);
        let mean_per_hour = n as f64 / hours.len().max(1) as f64;
        let ratio = max_per_hour as f64 / mean_per_hour.max(self.config.mean_per_hour_floor);

        let threshold = self.config.max_trades_per_hour;
        let relative = ((ratio - 1.0) * RATIO_WEIGHT).clamp(0.0, COMPONENT_CAP);
        let absolute = if max_per_hour > threshold {
            ((max_per_hour - threshold) as f64 * EXCESS_TRADE_WEIGHT).min(COMPONENT_CAP)
        } else {
            0.0
        };
        let frequency_score = relative.max(absolute);

        let oversized: BTreeSet<usize> = trades
            .iter()
            .enumerate()
            .filter(|(_, t)| self.is_oversized(t))
            .map(|(idx, _)| idx)
            .collect();
        let pct_over_balance = share(oversized.len(), n);
        let size_score = (pct_over_balance * OVERSIZE_WEIGHT).min(COMPONENT_CAP);

        let score = cap_score(frequency_score + size_score);
        if score < self.min_score {
            return Detection::none();
        }

        let mut flagged = oversized.clone();
        for rows in hours.values().filter(|rows| rows.len() > threshold) {
            flagged.extend(rows.iter().copied());
        }

        let mut description = format!(
            "Trade frequency reached {max_per_hour} trades in a single hour \
             ({ratio:.1}x your average of {mean_per_hour:.1} per active hour, threshold {threshold}). "
        );
        if !oversized.is_empty() {
            description.push_str(&format!(
                "{} trade(s) exceeded {:.0}% of account balance per ticket.",
                oversized.len(),
                self.config.balance_fraction * 100.0
            ));
        }

        let mut details = Details::new();
        details.insert("max_trades_per_hour".into(), json!(max_per_hour));
        details.insert("mean_trades_per_hour".into(), json!(round_to(mean_per_hour, 2)));
        details.insert("frequency_ratio".into(), json!(round_to(ratio, 2)));
        details.insert("over_balance_count".into(), json!(oversized.len()));
        details.insert("over_balance_pct".into(), json!(round_to(pct_over_balance * 100.0, 2)));
        details.insert("biased_trade_count".into(), json!(flagged.len()));

        let finding = make_finding(
            BiasKind::Overtrading,
            score,
            "Overtrading Detected",
            description.trim_end().to_string(),
            details,
        );
        Detection::found(finding, flagged)
    }
}
