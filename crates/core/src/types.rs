//! Core data types for the bias detector.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wall-clock timestamp, taken literally from the input (no timezone inference).
pub type Timestamp = NaiveDateTime;

/// Output format for timestamps in serialized trades.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Seconds since Unix epoch, treating the wall clock as UTC.
#[inline]
pub fn epoch_secs(ts: &Timestamp) -> i64 {
    ts.and_utc().timestamp()
}

/// Calendar-hour bucket (hours since epoch) of a timestamp.
#[inline]
pub fn hour_bucket(ts: &Timestamp) -> i64 {
    epoch_secs(ts).div_euclid(3600)
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Canonical lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }

    /// Parse a canonical label. Only exact `"buy"` / `"sell"` are accepted.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "buy" => Some(Action::Buy),
            "sell" => Some(Action::Sell),
            _ => None,
        }
    }
}

/// A single cleaned trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: Timestamp,
    pub action: Action,
    /// Non-blank asset identifier.
    pub asset: String,
    /// Positive, finite.
    pub quantity: f64,
    /// Positive, finite.
    pub price: f64,
    /// Realized P/L, if reported.
    pub pnl: Option<f64>,
    /// Account balance after the trade, if reported.
    pub balance: Option<f64>,
}

impl TradeRecord {
    /// Dollar exposure: quantity x price.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    #[inline]
    pub fn is_win(&self) -> bool {
        self.pnl.is_some_and(|p| p > 0.0)
    }

    #[inline]
    pub fn is_loss(&self) -> bool {
        self.pnl.is_some_and(|p| p < 0.0)
    }

    /// P/L relative to notional. `None` when P/L is missing or the ratio is not finite.
    pub fn return_proxy(&self) -> Option<f64> {
        let pnl = self.pnl?;
        let ret = pnl / self.notional();
        ret.is_finite().then_some(ret)
    }
}

/// The six detector kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Overtrading,
    LossAversion,
    RevengeTrading,
    DispositionEffect,
    Anchoring,
    ConfirmationBias,
}

impl BiasKind {
    /// All kinds, in report order.
    pub const ALL: [BiasKind; 6] = [
        BiasKind::Overtrading,
        BiasKind::LossAversion,
        BiasKind::RevengeTrading,
        BiasKind::DispositionEffect,
        BiasKind::Anchoring,
        BiasKind::ConfirmationBias,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BiasKind::Overtrading => "overtrading",
            BiasKind::LossAversion => "loss_aversion",
            BiasKind::RevengeTrading => "revenge_trading",
            BiasKind::DispositionEffect => "disposition_effect",
            BiasKind::Anchoring => "anchoring",
            BiasKind::ConfirmationBias => "confirmation_bias",
        }
    }

    /// Severity breakpoints used for this kind.
    pub fn severity_scale(self) -> SeverityScale {
        match self {
            BiasKind::LossAversion | BiasKind::RevengeTrading => SeverityScale::SENSITIVE,
            _ => SeverityScale::STANDARD,
        }
    }
}

/// Finding severity, monotonic in score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a score onto a severity using the given breakpoints (strictly greater than).
    pub fn from_score(score: f64, scale: SeverityScale) -> Self {
        if score > scale.critical {
            Severity::Critical
        } else if score > scale.high {
            Severity::High
        } else if score > scale.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Score breakpoints for severity levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityScale {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl SeverityScale {
    /// Overtrading, disposition, anchoring, confirmation.
    pub const STANDARD: SeverityScale = SeverityScale {
        critical: 75.0,
        high: 50.0,
        medium: 25.0,
    };

    /// Loss aversion, revenge trading.
    pub const SENSITIVE: SeverityScale = SeverityScale {
        critical: 70.0,
        high: 45.0,
        medium: 25.0,
    };
}

/// Detector-specific metrics attached to a finding.
pub type Details = BTreeMap<String, serde_json::Value>;

/// One detected bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFinding {
    #[serde(rename = "type")]
    pub kind: BiasKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub details: Details,
    /// Integer score in `[min_score, 100]`.
    pub score: u8,
}

/// Row accounting from the cleaning stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessStats {
    pub rows_before: usize,
    /// Removed by the validity and timestamp-range filters.
    pub dropped_invalid: usize,
    /// Removed by the IQR filters, both columns combined.
    pub dropped_outliers: usize,
    pub dropped_duplicates: usize,
    pub rows_after: usize,
}

/// A cleaned trade as serialized in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub timestamp: String,
    pub buy_sell: Action,
    pub asset: String,
    pub quantity: f64,
    pub price: f64,
    pub p_l: Option<f64>,
    pub balance: Option<f64>,
}

impl From<&TradeRecord> for TradeRow {
    fn from(t: &TradeRecord) -> Self {
        TradeRow {
            timestamp: t.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            buy_sell: t.action,
            asset: t.asset.clone(),
            quantity: t.quantity,
            price: t.price,
            p_l: t.pnl,
            balance: t.balance,
        }
    }
}

/// Row indices flagged per detector kind.
pub type TradeFlags = BTreeMap<BiasKind, Vec<usize>>;

/// Flag map with every kind present and empty.
pub fn empty_trade_flags() -> TradeFlags {
    BiasKind::ALL.iter().map(|&k| (k, Vec::new())).collect()
}

/// Hour-of-day histogram over trades.
pub fn hour_histogram(trades: &[TradeRecord]) -> [usize; 24] {
    let mut counts = [0usize; 24];
    for t in trades {
        counts[t.timestamp.hour() as usize] += 1;
    }
    counts
}

/// Full output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Findings, descending by score.
    pub biases: Vec<BiasFinding>,
    pub trade_flags: TradeFlags,
    /// Composite score in `[0, 100]`.
    pub bias_score: u8,
    /// Cleaned trades, chronological, capped.
    pub trades: Vec<TradeRow>,
    /// Uncapped cleaned row count.
    pub total_trades: usize,
    pub hour_counts: [usize; 24],
    pub preprocess: PreprocessStats,
}

impl AnalysisReport {
    /// Well-formed report for an analysis with no surviving rows.
    pub fn empty(preprocess: PreprocessStats) -> Self {
        Self {
            biases: Vec::new(),
            trade_flags: empty_trade_flags(),
            bias_score: 0,
            trades: Vec::new(),
            total_trades: 0,
            hour_counts: [0; 24],
            preprocess,
        }
    }

    /// Finding for a kind, if reported.
    pub fn finding(&self, kind: BiasKind) -> Option<&BiasFinding> {
        self.biases.iter().find(|b| b.kind == kind)
    }

    /// Flagged rows for a kind.
    pub fn flags(&self, kind: BiasKind) -> &[usize] {
        self.trade_flags.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
