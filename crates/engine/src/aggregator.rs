//! Report assembly.
//!
//! Collects detector outputs into the analysis report: findings sorted by
//! score, a flag set for every kind, the composite score, the hour-of-day
//! histogram and the capped trade listing.

use bias_core::config::ReportConfig;
use bias_core::{
    empty_trade_flags, hour_histogram, AnalysisReport, BiasKind, PreprocessStats, TradeRecord,
    TradeRow,
};
use bias_detectors::Detection;
use tracing::{debug, warn};

/// Combines detections into an [`AnalysisReport`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    trades_cap: usize,
}

impl Aggregator {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            trades_cap: config.trades_cap,
        }
    }

    /// Build the report for one cleaned table and its detections.
    pub fn assemble(
        &self,
        trades: &[TradeRecord],
        preprocess: PreprocessStats,
        detections: Vec<(BiasKind, Detection)>,
    ) -> AnalysisReport {
        if trades.is_empty() {
            return AnalysisReport::empty(preprocess);
        }

        let n = trades.len();
        let mut trade_flags = empty_trade_flags();
        let mut biases = Vec::new();
        for (kind, detection) in detections {
            let rows: Vec<usize> = detection.flagged.into_iter().filter(|&i| i < n).collect();
            if let Some(finding) = detection.finding {
                debug!(kind = kind.as_str(), score = finding.score, flagged = rows.len(), "bias found");
                biases.push(finding);
            }
            if let Some(slot) = trade_flags.get_mut(&kind) {
                *slot = rows;
            } else {
                warn!(kind = kind.as_str(), "detection for unknown kind ignored");
            }
        }

        // Stable: ties keep detector order
        biases.sort_by(|a, b| b.score.cmp(&a.score));
        let scores: Vec<u8> = biases.iter().map(|b| b.score).collect();

        AnalysisReport {
            bias_score: composite_score(&scores),
            biases,
            trade_flags,
            trades: trades.iter().take(self.trades_cap).map(TradeRow::from).collect(),
            total_trades: n,
            hour_counts: hour_histogram(trades),
            preprocess,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(&ReportConfig::default())
    }
}

/// Lower median of the finding scores, 0 when there are none.
pub fn composite_score(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_unstable();
    sorted[(sorted.len() - 1) / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bias_core::{Action, BiasFinding, Details, Severity};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn make_trade(hour: u32) -> TradeRecord {
        TradeRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            action: Action::Buy,
            asset: "AAPL".to_string(),
            quantity: 1.0,
            price: 10.0,
            pnl: None,
            balance: None,
        }
    }

    fn make_detection(kind: BiasKind, score: u8, flagged: &[usize]) -> (BiasKind, Detection) {
        let finding = BiasFinding {
            kind,
            severity: Severity::Medium,
            title: kind.as_str().to_string(),
            description: String::new(),
            details: Details::new(),
            score,
        };
        (kind, Detection::found(finding, flagged.iter().copied().collect::<BTreeSet<_>>()))
    }

    #[test]
    fn test_composite_is_lower_median() {
        assert_eq!(composite_score(&[]), 0);
        assert_eq!(composite_score(&[40]), 40);
        assert_eq!(composite_score(&[90, 20]), 20);
        assert_eq!(composite_score(&[30, 90, 50]), 50);
        assert_eq!(composite_score(&[100, 20, 30, 80]), 30);
    }

    #[test]
    fn test_assemble_sorts_and_fills_flags() {
        let trades: Vec<_> = (9..13).map(make_trade).collect();
        let detections = vec![
            make_detection(BiasKind::Overtrading, 30, &[0, 1]),
            (BiasKind::LossAversion, Detection::none()),
            make_detection(BiasKind::Anchoring, 80, &[2, 3]),
        ];
        let report = Aggregator::default().assemble(&trades, PreprocessStats::default(), detections);

        assert_eq!(report.biases.len(), 2);
        assert_eq!(report.biases[0].kind, BiasKind::Anchoring);
        assert_eq!(report.bias_score, 30);
        assert_eq!(report.trade_flags.len(), 6);
        assert_eq!(report.flags(BiasKind::Overtrading), &[0, 1]);
        assert!(report.flags(BiasKind::ConfirmationBias).is_empty());
        assert_eq!(report.hour_counts[9], 1);
        assert_eq!(report.total_trades, 4);
    }

    #[test]
    fn test_trades_capped_but_counted() {
        let trades: Vec<_> = (0..24).map(make_trade).collect();
        let aggregator = Aggregator::new(&ReportConfig {
            trades_cap: 5,
            ..ReportConfig::default()
        });
        let report = aggregator.assemble(&trades, PreprocessStats::default(), Vec::new());

        assert_eq!(report.trades.len(), 5);
        assert_eq!(report.total_trades, 24);
        assert_eq!(report.hour_counts.iter().sum::<usize>(), 24);
    }

    #[test]
    fn test_empty_table_short_circuits() {
        let detections = vec![make_detection(BiasKind::Overtrading, 50, &[0])];
        let report = Aggregator::default().assemble(&[], PreprocessStats::default(), detections);
        assert_eq!(report, AnalysisReport::empty(PreprocessStats::default()));
    }
}
