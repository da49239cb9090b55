//! Configuration structures for the bias detector.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the analysis pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upload limits.
    pub ingest: IngestConfig,
    /// Cleaning thresholds.
    pub preprocess: PreprocessConfig,
    /// Detector thresholds.
    pub detectors: DetectorConfig,
    /// Report assembly.
    pub report: ReportConfig,
    /// Coaching collaborator.
    pub coach: CoachConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.max_upload_bytes == 0 {
            return Err(Error::config("ingest.max_upload_bytes must be positive"));
        }
        if self.ingest.read_chunk_bytes == 0
            || self.ingest.read_chunk_bytes > self.ingest.max_upload_bytes
        {
            return Err(Error::config(
                "ingest.read_chunk_bytes must be in 1..=max_upload_bytes",
            ));
        }
        if self.preprocess.min_epoch_secs >= self.preprocess.max_epoch_secs {
            return Err(Error::config("preprocess epoch range is empty"));
        }
        if self.preprocess.iqr_multiplier < 0.0 {
            return Err(Error::config("preprocess.iqr_multiplier must be >= 0"));
        }
        if !(0.0..=100.0).contains(&self.detectors.min_score) {
            return Err(Error::config("detectors.min_score must be in 0..=100"));
        }
        Ok(())
    }
}

/// Upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Hard ceiling on upload size in bytes.
    pub max_upload_bytes: usize,
    /// Chunk size for bounded reads.
    pub read_chunk_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 150 * 1024 * 1024,
            read_chunk_bytes: 1024 * 1024,
        }
    }
}

/// Preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Earliest accepted timestamp (epoch seconds, inclusive). 1990-01-01.
    pub min_epoch_secs: i64,
    /// Latest accepted timestamp (epoch seconds, exclusive). 2030-01-01.
    pub max_epoch_secs: i64,
    /// Minimum non-null values before the IQR filter runs on a column.
    pub outlier_min_values: usize,
    /// IQR fence multiplier.
    pub iqr_multiplier: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_epoch_secs: 631_152_000,
            max_epoch_secs: 1_893_456_000,
            outlier_min_values: 10,
            iqr_multiplier: 1.5,
        }
    }
}

/// Thresholds for all six detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Findings scoring below this are suppressed.
    pub min_score: f64,
    pub overtrading: OvertradingConfig,
    pub loss_aversion: LossAversionConfig,
    pub revenge_trading: RevengeTradingConfig,
    pub disposition_effect: DispositionConfig,
    pub anchoring: AnchoringConfig,
    pub confirmation_bias: ConfirmationConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_score: 15.0,
            overtrading: OvertradingConfig::default(),
            loss_aversion: LossAversionConfig::default(),
            revenge_trading: RevengeTradingConfig::default(),
            disposition_effect: DispositionConfig::default(),
            anchoring: AnchoringConfig::default(),
            confirmation_bias: ConfirmationConfig::default(),
        }
    }
}

/// Overtrading thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertradingConfig {
    pub min_rows: usize,
    /// Absolute trades-per-hour threshold.
    pub max_trades_per_hour: usize,
    /// Floor for the mean trades per hour in the frequency ratio.
    pub mean_per_hour_floor: f64,
    /// Notional above this fraction of balance counts as oversized.
    pub balance_fraction: f64,
}

impl Default for OvertradingConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            max_trades_per_hour: 5,
            mean_per_hour_floor: 0.5,
            balance_fraction: 0.10,
        }
    }
}

/// Loss aversion thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LossAversionConfig {
    pub min_rows: usize,
    /// Duration and size ratios only contribute above this.
    pub ratio_trigger: f64,
}

impl Default for LossAversionConfig {
    fn default() -> Self {
        Self {
            min_rows: 3,
            ratio_trigger: 1.1,
        }
    }
}

/// Revenge trading thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevengeTradingConfig {
    pub min_rows: usize,
    /// Window after a loss, in minutes.
    pub window_minutes: i64,
    /// Quantity multiple of the preceding trade.
    pub size_multiplier: f64,
}

impl Default for RevengeTradingConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            window_minutes: 30,
            size_multiplier: 1.5,
        }
    }
}

/// Disposition effect thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispositionConfig {
    pub min_rows: usize,
    pub min_wins: usize,
    pub min_losses: usize,
    /// Loss/win move ratio at or below this is not reported.
    pub min_move_ratio: f64,
}

impl Default for DispositionConfig {
    fn default() -> Self {
        Self {
            min_rows: 8,
            min_wins: 3,
            min_losses: 3,
            min_move_ratio: 1.2,
        }
    }
}

/// Anchoring thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchoringConfig {
    pub min_rows: usize,
    /// Trades needed before an asset is considered.
    pub min_asset_trades: usize,
    /// Assets at or below this price CV are anchored.
    pub max_cv: f64,
    /// CV at which tightness reaches zero.
    pub tightness_reference: f64,
}

impl Default for AnchoringConfig {
    fn default() -> Self {
        Self {
            min_rows: 10,
            min_asset_trades: 4,
            max_cv: 0.06,
            tightness_reference: 0.08,
        }
    }
}

/// Confirmation bias thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub min_rows: usize,
    pub min_asset_trades: usize,
    /// Dominant-side share at or above which an asset is biased.
    pub dominant_ratio: f64,
    /// Average dominant ratio above this adds to the score.
    pub ratio_baseline: f64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            min_rows: 10,
            min_asset_trades: 4,
            dominant_ratio: 0.82,
            ratio_baseline: 0.7,
        }
    }
}

/// Report assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Maximum number of trade rows serialized in the report.
    pub trades_cap: usize,
    /// Run detectors on the rayon pool.
    pub parallel_detectors: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            trades_cap: 10_000,
            parallel_detectors: true,
        }
    }
}

/// Coaching collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Gateway API key. `None` or blank means not configured.
    pub api_key: Option<String>,
    /// Chat model identifier.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Distinct assets named in the trade summary.
    pub max_assets_in_summary: usize,
}

impl CoachConfig {
    /// Whether the coaching collaborator can be called.
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "google/gemini-3-flash-preview".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            max_assets_in_summary: 5,
        }
    }
}
