//! Loss aversion detection.
//!
//! Holding time is approximated by the gap since the previous trade. Losers
//! held longer than winners, and losses larger than wins, both raise the score.

use crate::detector::{cap_score, make_finding, Detection, Detector};
use crate::stats::{gaps_since_previous, mean, median, round_to};
use bias_core::config::LossAversionConfig;
use bias_core::{BiasKind, Details, TradeRecord};
use serde_json::json;
use std::collections::BTreeSet;

const COMPONENT_CAP: f64 = 50.0;
const DURATION_WEIGHT: f64 = 40.0;
const SIZE_WEIGHT: f64 = 25.0;

pub struct LossAversionDetector {
    config: LossAversionConfig,
    min_score: f64,
}

impl LossAversionDetector {
    pub fn new(config: LossAversionConfig, min_score: f64) -> Self {
        Self { config, min_score }
    }
}

impl Detector for LossAversionDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::LossAversion
    }

    fn detect(&self, trades: &[TradeRecord]) -> Detection {
        if trades.len() < self.config.min_rows {
            return Detection::none();
        }

        let gaps = gaps_since_previous(trades);
        let mut win_pnls = Vec::new();
        let mut loss_pnls = Vec::new();
        let mut win_gaps = Vec::new();
        // (row, gap) for losing rows with a finite gap
        let mut loss_gaps: Vec<(usize, f64)> = Vec::new();

        for (idx, (trade, gap)) in trades.iter().zip(&gaps).enumerate() {
            let Some(pnl) = trade.pnl else { continue };
            let gap = gap.filter(|g| g.is_finite());
            if pnl > 0.0 {
                win_pnls.push(pnl);
                win_gaps.extend(gap);
            } else if pnl < 0.0 {
                loss_pnls.push(pnl.abs());
                loss_gaps.extend(gap.map(|g| (idx, g)));
            }
        }

        if win_pnls.is_empty() || loss_pnls.is_empty() {
            return Detection::none();
        }
        let loss_gap_values: Vec<f64> = loss_gaps.iter().map(|(_, g)| *g).collect();
        let (Some(avg_duration_win), Some(avg_duration_loss)) =
            (mean(&win_gaps), mean(&loss_gap_values))
        else {
            return Detection::none();
        };

        let avg_win = mean(&win_pnls).unwrap_or(0.0);
        let avg_loss = mean(&loss_pnls).unwrap_or(0.0);
        let loss_win_ratio = if avg_win > 0.0 { avg_loss / avg_win } else { 0.0 };
        let duration_ratio = if avg_duration_win > 0.0 {
            avg_duration_loss / avg_duration_win
        } else {
            0.0
        };

        let trigger = self.config.ratio_trigger;
        let held_longer = duration_ratio > trigger;
        let mut score = 0.0;
        if held_longer {
            score += ((duration_ratio - 1.0) * DURATION_WEIGHT).min(COMPONENT_CAP);
        }
        if loss_win_ratio > trigger {
            score += ((loss_win_ratio - 1.0) * SIZE_WEIGHT).min(COMPONENT_CAP);
        }
        let score = cap_score(score);
        if score < self.min_score {
            return Detection::none();
        }

        // Losers held at least as long as the median loser
        let flagged: BTreeSet<usize> = match median(&loss_gap_values) {
            Some(cutoff) => loss_gaps
                .iter()
                .filter(|(_, g)| *g >= cutoff)
                .map(|(idx, _)| *idx)
                .collect(),
            None => BTreeSet::new(),
        };

        let mut description = String::new();
        if held_longer {
            description.push_str(&format!(
                "Losing trades are held longer (avg {:.1} min) than winners (avg {:.1} min). ",
                avg_duration_loss / 60.0,
                avg_duration_win / 60.0
            ));
        }
        description.push_str(&format!(
            "Average loss ${avg_loss:.2} vs average win ${avg_win:.2} (ratio {loss_win_ratio:.2})."
        ));

        let mut details = Details::new();
        details.insert("avg_duration_win_min".into(), json!(round_to(avg_duration_win / 60.0, 2)));
        details.insert("avg_duration_loss_min".into(), json!(round_to(avg_duration_loss / 60.0, 2)));
        details.insert("avg_win".into(), json!(round_to(avg_win, 2)));
        details.insert("avg_loss".into(), json!(round_to(avg_loss, 2)));
        details.insert("loss_win_ratio".into(), json!(round_to(loss_win_ratio, 2)));
        details.insert("duration_ratio".into(), json!(round_to(duration_ratio, 2)));

        let finding = make_finding(
            BiasKind::LossAversion,
            score,
            "Loss Aversion Bias",
            description,
            details,
        );
        Detection::found(finding, flagged)
    }
}
