//! Analysis engine.
//!
//! Wires normalization, cleaning, the detector set and report assembly into
//! one synchronous, request-scoped computation.

use crate::aggregator::Aggregator;
use bias_core::{AnalysisReport, BiasKind, Config, Error, Result, TradeRecord};
use bias_detectors::{default_detectors, Detection, Detector};
use bias_ingestion::{normalize_csv, read_bounded, NormalizedTable, Preprocessor};
use rayon::prelude::*;
use std::io::Read;
use tracing::{debug, info};

/// Bias analysis engine.
pub struct BiasEngine {
    config: Config,
    preprocessor: Preprocessor,
    detectors: Vec<Box<dyn Detector>>,
    aggregator: Aggregator,
}

impl BiasEngine {
    /// Create a new engine from configuration.
    pub fn new(config: Config) -> Self {
        Self {
            preprocessor: Preprocessor::new(config.preprocess.clone()),
            detectors: default_detectors(&config.detectors),
            aggregator: Aggregator::new(&config.report),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze an upload stream.
    ///
    /// The stream is read under the configured byte ceiling. A CSV without
    /// data rows is rejected with [`Error::NoDataRows`] before analysis.
    pub fn analyze_upload<R: Read>(&self, reader: R) -> Result<AnalysisReport> {
        let bytes = read_bounded(reader, &self.config.ingest)?;
        let table = normalize_csv(&bytes)?;
        if table.is_empty() {
            return Err(Error::NoDataRows);
        }
        Ok(self.run(&table))
    }

    /// Analyze CSV bytes. A headers-only CSV yields the empty report.
    pub fn analyze_csv(&self, bytes: &[u8]) -> Result<AnalysisReport> {
        let table = normalize_csv(bytes)?;
        Ok(self.run(&table))
    }

    /// Clean a normalized table, run every detector and assemble the report.
    pub fn run(&self, table: &NormalizedTable) -> AnalysisReport {
        let (trades, stats) = self.preprocessor.process(table);
        info!(
            rows_before = stats.rows_before,
            rows_after = stats.rows_after,
            "table cleaned"
        );
        if trades.is_empty() {
            return AnalysisReport::empty(stats);
        }

        let detections = self.detect_all(&trades);
        let report = self.aggregator.assemble(&trades, stats, detections);
        info!(
            biases = report.biases.len(),
            bias_score = report.bias_score,
            total_trades = report.total_trades,
            "analysis complete"
        );
        report
    }

    fn detect_all(&self, trades: &[TradeRecord]) -> Vec<(BiasKind, Detection)> {
        let run_one = |detector: &Box<dyn Detector>| {
            let detection = detector.detect(trades);
            debug!(
                kind = detector.kind().as_str(),
                score = ?detection.score(),
                "detector finished"
            );
            (detector.kind(), detection)
        };

        if self.config.report.parallel_detectors {
            debug!(detectors = self.detectors.len(), "running detectors in parallel");
            self.detectors.par_iter().map(run_one).collect()
        } else {
            debug!(detectors = self.detectors.len(), "running detectors sequentially");
            self.detectors.iter().map(run_one).collect()
        }
    }
}

impl Default for BiasEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bias_core::config::IngestConfig;

    const HEADER_ONLY: &[u8] = b"timestamp,action,asset,quantity,price\n";

    #[test]
    fn test_analyze_csv_headers_only_is_empty_report() {
        let report = BiasEngine::default().analyze_csv(HEADER_ONLY).unwrap();
        assert_eq!(report.bias_score, 0);
        assert!(report.biases.is_empty());
        assert_eq!(report.total_trades, 0);
    }

    #[test]
    fn test_analyze_upload_rejects_no_rows() {
        let err = BiasEngine::default().analyze_upload(HEADER_ONLY).unwrap_err();
        assert!(matches!(err, Error::NoDataRows));
    }

    #[test]
    fn test_analyze_upload_rejects_oversized() {
        let config = Config {
            ingest: IngestConfig {
                max_upload_bytes: 16,
                read_chunk_bytes: 4,
            },
            ..Config::default()
        };
        let err = BiasEngine::new(config).analyze_upload(HEADER_ONLY).unwrap_err();
        assert!(matches!(err, Error::UploadTooLarge { limit_bytes: 16 }));
    }

    #[test]
    fn test_schema_error_surfaces() {
        let err = BiasEngine::default()
            .analyze_csv(b"when,what\n2024-01-02,buy\n")
            .unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let csv = b"timestamp,action,asset,quantity,price,pnl\n\
            2024-01-02 09:00:00,sell,AAPL,10,100,-50\n\
            2024-01-02 09:10:00,buy,AAPL,20,100,\n";
        let parallel = BiasEngine::default().analyze_csv(csv).unwrap();

        let mut config = Config::default();
        config.report.parallel_detectors = false;
        let sequential = BiasEngine::new(config).analyze_csv(csv).unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel.flags(BiasKind::RevengeTrading), &[1]);
    }
}
