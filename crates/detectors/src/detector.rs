//! Detector interface and finding construction.

use bias_core::{BiasFinding, BiasKind, Details, Severity, TradeRecord};
use std::collections::BTreeSet;

/// Output of one detector run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// `None` when the bias was not found or scored below the threshold.
    pub finding: Option<BiasFinding>,
    /// Offending row indices into the cleaned table.
    pub flagged: BTreeSet<usize>,
}

impl Detection {
    /// Nothing found.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(finding: BiasFinding, flagged: BTreeSet<usize>) -> Self {
        Self {
            finding: Some(finding),
            flagged,
        }
    }

    pub fn score(&self) -> Option<u8> {
        self.finding.as_ref().map(|f| f.score)
    }
}

/// A stateless bias detector over a cleaned, chronologically sorted table.
pub trait Detector: Send + Sync {
    /// Which bias this detector reports.
    fn kind(&self) -> BiasKind;

    /// Score the table and flag offending rows.
    fn detect(&self, trades: &[TradeRecord]) -> Detection;
}

/// Clamp a raw score into `[0, 100]`.
#[inline]
pub fn cap_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Build a finding from a capped, non-suppressed score. Halves round to even.
pub fn make_finding(
    kind: BiasKind,
    score: f64,
    title: &str,
    description: String,
    details: Details,
) -> BiasFinding {
    BiasFinding {
        kind,
        severity: Severity::from_score(score, kind.severity_scale()),
        title: title.to_string(),
        description,
        details,
        score: score.round_ties_even() as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_score() {
        assert_eq!(cap_score(-3.0), 0.0);
        assert_eq!(cap_score(140.0), 100.0);
        assert_eq!(cap_score(f64::NAN), 0.0);
        assert_eq!(cap_score(42.5), 42.5);
    }

    #[test]
    fn test_make_finding_rounds_and_grades() {
        let finding = make_finding(
            BiasKind::RevengeTrading,
            70.5,
            "Revenge Trading Pattern",
            "x".to_string(),
            Details::new(),
        );
        assert_eq!(finding.score, 70);
        assert_eq!(finding.severity, Severity::Critical);

        let finding = make_finding(BiasKind::Anchoring, 70.5, "Anchoring Bias", "x".to_string(), Details::new());
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_half_scores_round_to_even() {
        let score_of = |raw: f64| {
            make_finding(BiasKind::Overtrading, raw, "Overtrading Detected", String::new(), Details::new()).score
        };
        assert_eq!(score_of(62.5), 62);
        assert_eq!(score_of(63.5), 64);
        assert_eq!(score_of(15.5), 16);
        assert_eq!(score_of(62.51), 63);
    }
}
