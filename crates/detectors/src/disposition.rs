//! Disposition effect detection.
//!
//! Compares how far losing trades moved against how far winning trades moved,
//! using P/L over notional as a return proxy. Losers running materially
//! further than winners indicates cutting gains early and letting losses run.

use crate::detector::{cap_score, make_finding, Detection, Detector};
use crate::stats::{mean, round_to, share};
use bias_core::config::DispositionConfig;
use bias_core::{BiasKind, Details, TradeRecord};
use serde_json::json;
use std::collections::BTreeSet;

const MOVE_WEIGHT: f64 = 55.0;
const LOSS_SHARE_CAP: f64 = 35.0;

const STRATEGY_PRIMARY: &str =
    "Set a stop-loss at entry and honor it: decide the maximum loss before the trade, not during it.";
const STRATEGY_SECONDARY: &str =
    "Let winners run with a trailing stop instead of closing them at the first sign of profit.";

pub struct DispositionDetector {
    config: DispositionConfig,
    min_score: f64,
}

impl DispositionDetector {
    pub fn new(config: DispositionConfig, min_score: f64) -> Self {
        Self { config, min_score }
    }
}

impl Detector for DispositionDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::DispositionEffect
    }

    fn detect(&self, trades: &[TradeRecord]) -> Detection {
        if trades.len() < self.config.min_rows {
            return Detection::none();
        }

        let mut win_moves = Vec::new();
        let mut loss_moves: Vec<(usize, f64)> = Vec::new();
        for (idx, trade) in trades.iter().enumerate() {
            let Some(ret) = trade.return_proxy() else { continue };
            if trade.is_win() {
                win_moves.push(ret.abs());
            } else if trade.is_loss() {
                loss_moves.push((idx, ret.abs()));
            }
        }

        if win_moves.len() < self.config.min_wins || loss_moves.len() < self.config.min_losses {
            return Detection::none();
        }

        let loss_values: Vec<f64> = loss_moves.iter().map(|(_, m)| *m).collect();
        let (Some(avg_win_move), Some(avg_loss_move)) = (mean(&win_moves), mean(&loss_values))
        else {
            return Detection::none();
        };
        if avg_win_move <= 0.0 {
            return Detection::none();
        }

        let move_ratio = avg_loss_move / avg_win_move;
        if move_ratio <= self.config.min_move_ratio {
            return Detection::none();
        }

        let loss_share = share(loss_moves.len(), loss_moves.len() + win_moves.len());
        let score = cap_score(
            ((move_ratio - 1.0) * MOVE_WEIGHT).max(0.0) + (loss_share * LOSS_SHARE_CAP).min(LOSS_SHARE_CAP),
        );
        if score < self.min_score {
            return Detection::none();
        }

        // Losers that moved further than the typical winner
        let flagged: BTreeSet<usize> = loss_moves
            .iter()
            .filter(|(_, m)| *m > avg_win_move)
            .map(|(idx, _)| *idx)
            .collect();

        let description = format!(
            "Losing trades moved {:.2}% against you on average versus {:.2}% for winners \
             ({move_ratio:.2}x). Gains are being taken early while losses are allowed to run.",
            avg_loss_move * 100.0,
            avg_win_move * 100.0
        );

        let mut details = Details::new();
        details.insert("avg_win_move_pct".into(), json!(round_to(avg_win_move * 100.0, 4)));
        details.insert("avg_loss_move_pct".into(), json!(round_to(avg_loss_move * 100.0, 4)));
        details.insert("move_ratio".into(), json!(round_to(move_ratio, 2)));
        details.insert("loss_share".into(), json!(round_to(loss_share, 4)));
        details.insert("win_count".into(), json!(win_moves.len()));
        details.insert("loss_count".into(), json!(loss_moves.len()));
        details.insert("strategy_primary".into(), json!(STRATEGY_PRIMARY));
        details.insert("strategy_secondary".into(), json!(STRATEGY_SECONDARY));

        let finding = make_finding(
            BiasKind::DispositionEffect,
            score,
            "Disposition Effect",
            description,
            details,
        );
        Detection::found(finding, flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bias_core::Action;
    use chrono::{Duration, NaiveDate};

    /// Trades with notional 1000, so pnl 10 is a 1% move.
    fn make_trades(pnls: &[Option<f64>]) -> Vec<TradeRecord> {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        pnls.iter()
            .enumerate()
            .map(|(i, &pnl)| TradeRecord {
                timestamp: t0 + Duration::hours(i as i64),
                action: Action::Sell,
                asset: "NVDA".to_string(),
                quantity: 10.0,
                price: 100.0,
                pnl,
                balance: None,
            })
            .collect()
    }

    fn detector() -> DispositionDetector {
        DispositionDetector::new(DispositionConfig::default(), 15.0)
    }

    #[test]
    fn test_losers_run_further() {
        // Wins move 1%, losses move 3% (and 1% once)
        let trades = make_trades(&[
            Some(10.0),
            Some(-30.0),
            Some(10.0),
            Some(-30.0),
            Some(10.0),
            Some(-30.0),
            Some(-10.0),
            None,
        ]);
        let detection = detector().detect(&trades);

        // avg loss move = 2.5%, ratio 2.5 -> 82.5; loss share 4/7 -> 20; total capped at 100
        let finding = detection.finding.expect("disposition expected");
        assert_eq!(finding.score, 100);
        assert_eq!(finding.details["move_ratio"], json!(2.5));
        assert!(finding.details.contains_key("strategy_primary"));
        assert!(finding.details.contains_key("strategy_secondary"));
        assert_eq!(detection.flagged, BTreeSet::from([1, 3, 5]));
    }

    #[test]
    fn test_moderate_ratio_scores() {
        // Wins 2%, losses 3%: ratio 1.5 -> 27.5; loss share 0.5 -> 17.5; total 45
        let trades = make_trades(&[
            Some(20.0),
            Some(-30.0),
            Some(20.0),
            Some(-30.0),
            Some(20.0),
            Some(-30.0),
            None,
            None,
        ]);
        let finding = detector().detect(&trades).finding.expect("disposition expected");
        assert_eq!(finding.score, 45);
    }

    #[test]
    fn test_ratio_below_threshold_suppressed() {
        let trades = make_trades(&[
            Some(10.0),
            Some(-11.0),
            Some(10.0),
            Some(-11.0),
            Some(10.0),
            Some(-11.0),
            None,
            None,
        ]);
        assert!(detector().detect(&trades).finding.is_none());
    }

    #[test]
    fn test_needs_three_of_each() {
        let trades = make_trades(&[
            Some(10.0),
            Some(-50.0),
            Some(10.0),
            Some(-50.0),
            Some(10.0),
            None,
            None,
            None,
        ]);
        assert_eq!(detector().detect(&trades), Detection::none());
    }
}
