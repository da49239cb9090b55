//! Confirmation bias detection.
//!
//! Looks for assets traded almost exclusively in one direction, the trading
//! footprint of a fixed thesis that is never challenged by the other side.

use crate::detector::{cap_score, make_finding, Detection, Detector};
use crate::stats::{mean, round_to, rows_by_asset, share};
use bias_core::config::ConfirmationConfig;
use bias_core::{Action, BiasKind, Details, TradeRecord};
use serde_json::json;
use std::collections::BTreeSet;

const SHARE_WEIGHT: f64 = 65.0;
const RATIO_WEIGHT: f64 = 100.0;
const ASSET_WEIGHT: f64 = 5.0;

const STRATEGY_PRIMARY: &str =
    "Before adding to a position, write the strongest case for the opposite side.";
const STRATEGY_SECONDARY: &str =
    "Define in advance the evidence that would invalidate the thesis and exit when it appears.";

pub struct ConfirmationBiasDetector {
    config: ConfirmationConfig,
    min_score: f64,
}

impl ConfirmationBiasDetector {
    pub fn new(config: ConfirmationConfig, min_score: f64) -> Self {
        Self { config, min_score }
    }
}

impl Detector for ConfirmationBiasDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::ConfirmationBias
    }

    fn detect(&self, trades: &[TradeRecord]) -> Detection {
        let n = trades.len();
        if n < self.config.min_rows {
            return Detection::none();
        }

        let mut biased_assets = Vec::new();
        let mut ratios = Vec::new();
        let mut biased_trades = 0usize;
        let mut flagged = BTreeSet::new();
        for (asset, rows) in rows_by_asset(trades) {
            if rows.len() < self.config.min_asset_trades {
                continue;
            }
            let buys = rows.iter().filter(|&&i| trades[i].action == Action::Buy).count();
            let sells = rows.len() - buys;
            let dominant = if buys >= sells { Action::Buy } else { Action::Sell };
            let ratio = share(buys.max(sells), rows.len());
            if ratio >= self.config.dominant_ratio {
                biased_assets.push(asset.to_string());
                ratios.push(ratio);
                biased_trades += rows.len();
                flagged.extend(rows.iter().copied().filter(|&i| trades[i].action == dominant));
            }
        }

        let Some(avg_ratio) = mean(&ratios) else {
            return Detection::none();
        };

        let biased_trade_share = share(biased_trades, n);
        let score = cap_score(
            biased_trade_share * SHARE_WEIGHT
                + (avg_ratio - self.config.ratio_baseline).max(0.0) * RATIO_WEIGHT
                + biased_assets.len() as f64 * ASSET_WEIGHT,
        );
        if score < self.min_score {
            return Detection::none();
        }

        let description = format!(
            "{} asset(s) ({}) were traded one-sided, with {:.0}% of their trades on the same side \
             on average, covering {:.0}% of all trades.",
            biased_assets.len(),
            biased_assets.join(", "),
            avg_ratio * 100.0,
            biased_trade_share * 100.0
        );

        let mut details = Details::new();
        details.insert("biased_assets".into(), json!(biased_assets));
        details.insert("biased_asset_count".into(), json!(biased_assets.len()));
        details.insert("biased_trade_share".into(), json!(round_to(biased_trade_share, 4)));
        details.insert("avg_dominant_ratio".into(), json!(round_to(avg_ratio, 4)));
        details.insert("strategy_primary".into(), json!(STRATEGY_PRIMARY));
        details.insert("strategy_secondary".into(), json!(STRATEGY_SECONDARY));

        let finding = make_finding(
            BiasKind::ConfirmationBias,
            score,
            "Confirmation Bias",
            description,
            details,
        );
        Detection::found(finding, flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bias_core::Severity;
    use chrono::{Duration, NaiveDate};

    fn make_trades(rows: &[(&str, Action)]) -> Vec<TradeRecord> {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(asset, action))| TradeRecord {
                timestamp: t0 + Duration::minutes(i as i64 * 15),
                action,
                asset: asset.to_string(),
                quantity: 1.0,
                price: 100.0 + i as f64,
                pnl: None,
                balance: None,
            })
            .collect()
    }

    fn detector() -> ConfirmationBiasDetector {
        ConfirmationBiasDetector::new(ConfirmationConfig::default(), 15.0)
    }

    #[test]
    fn test_one_sided_asset() {
        let mut rows = vec![("AMD", Action::Buy); 7];
        rows.extend([
            ("MSFT", Action::Buy),
            ("MSFT", Action::Sell),
            ("MSFT", Action::Buy),
            ("MSFT", Action::Sell),
            ("MSFT", Action::Buy),
        ]);
        let detection = detector().detect(&make_trades(&rows));

        // share 7/12 -> 37.9; ratio 1.0 -> 30; one asset -> 5
        let finding = detection.finding.expect("confirmation expected");
        assert_eq!(finding.score, 73);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.details["biased_assets"], json!(["AMD"]));
        assert_eq!(detection.flagged, (0..7).collect::<BTreeSet<usize>>());
    }

    #[test]
    fn test_flags_only_dominant_side() {
        let mut rows = vec![("ETH", Action::Sell); 9];
        rows.push(("ETH", Action::Buy));
        let detection = detector().detect(&make_trades(&rows));

        assert!(detection.finding.is_some());
        assert_eq!(detection.flagged.len(), 9);
        assert!(!detection.flagged.contains(&9));
    }

    #[test]
    fn test_balanced_sides_not_flagged() {
        let rows: Vec<(&str, Action)> = (0..12)
            .map(|i| ("QQQ", if i % 2 == 0 { Action::Buy } else { Action::Sell }))
            .collect();
        assert_eq!(detector().detect(&make_trades(&rows)), Detection::none());
    }
}
