//! Revenge trading detection.
//!
//! A revenge trade follows a loss within a short window and sizes up sharply
//! against the trade that lost.

use crate::detector::{cap_score, make_finding, Detection, Detector};
use crate::stats::{round_to, share};
use bias_core::config::RevengeTradingConfig;
use bias_core::{BiasKind, Details, TradeRecord};
use serde_json::json;
use std::collections::BTreeSet;

/// Points per unit of revenge rate.
const RATE_WEIGHT: f64 = 400.0;

pub struct RevengeTradingDetector {
    config: RevengeTradingConfig,
    min_score: f64,
}

impl RevengeTradingDetector {
    pub fn new(config: RevengeTradingConfig, min_score: f64) -> Self {
        Self { config, min_score }
    }

    fn is_revenge(&self, prev: &TradeRecord, cur: &TradeRecord) -> bool {
        let window_secs = (self.config.window_minutes * 60) as f64;
        let gap_secs = (cur.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        prev.is_loss()
            && gap_secs > 0.0
            && gap_secs <= window_secs
            && cur.quantity > self.config.size_multiplier * prev.quantity
    }
}

impl Detector for RevengeTradingDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::RevengeTrading
    }

    fn detect(&self, trades: &[TradeRecord]) -> Detection {
        let n = trades.len();
        if n < self.config.min_rows {
            return Detection::none();
        }

        let flagged: BTreeSet<usize> = trades
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| self.is_revenge(&pair[0], &pair[1]))
            .map(|(idx, _)| idx + 1)
            .collect();

        let count = flagged.len();
        let revenge_rate = share(count, n);
        let score = cap_score(revenge_rate * RATE_WEIGHT);
        if count == 0 || score < self.min_score {
            return Detection::none();
        }

        let description = format!(
            "{count} trade(s) opened within {} minutes of a loss with quantity >{}x the previous trade.",
            self.config.window_minutes, self.config.size_multiplier
        );

        let mut details = Details::new();
        details.insert("revenge_trade_count".into(), json!(count));
        details.insert("revenge_rate".into(), json!(round_to(revenge_rate, 4)));
        details.insert("window_minutes".into(), json!(self.config.window_minutes));
        details.insert("size_multiplier".into(), json!(self.config.size_multiplier));

        let finding = make_finding(
            BiasKind::RevengeTrading,
            score,
            "Revenge Trading Pattern",
            description,
            details,
        );
        Detection::found(finding, flagged)
    }
}
