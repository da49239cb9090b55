//! Anchoring detection.
//!
//! An asset is anchored when its execution prices barely move across
//! repeated trades (low coefficient of variation), suggesting entries tied
//! to a reference price rather than to current conditions.

use crate::detector::{cap_score, make_finding, Detection, Detector};
use crate::stats::{coefficient_of_variation, mean, round_to, rows_by_asset, share};
use bias_core::config::AnchoringConfig;
use bias_core::{BiasKind, Details, TradeRecord};
use serde_json::json;
use std::collections::BTreeSet;

const SHARE_WEIGHT: f64 = 70.0;
const TIGHTNESS_WEIGHT: f64 = 20.0;
const ASSET_WEIGHT: f64 = 6.0;

const STRATEGY_PRIMARY: &str =
    "Re-derive entry levels from current structure each session instead of reusing old prices.";
const STRATEGY_SECONDARY: &str =
    "Write down why a price level matters before trading it; drop levels you cannot justify.";

pub struct AnchoringDetector {
    config: AnchoringConfig,
    min_score: f64,
}

impl AnchoringDetector {
    pub fn new(config: AnchoringConfig, min_score: f64) -> Self {
        Self { config, min_score }
    }
}

impl Detector for AnchoringDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::Anchoring
    }

    fn detect(&self, trades: &[TradeRecord]) -> Detection {
        let n = trades.len();
        if n < self.config.min_rows {
            return Detection::none();
        }

        let mut anchored_assets = Vec::new();
        let mut anchored_cvs = Vec::new();
        let mut flagged = BTreeSet::new();
        for (asset, rows) in rows_by_asset(trades) {
            if rows.len() < self.config.min_asset_trades {
                continue;
            }
            let prices: Vec<f64> = rows.iter().map(|&i| trades[i].price).collect();
            let Some(cv) = coefficient_of_variation(&prices) else { continue };
            if cv <= self.config.max_cv {
                anchored_assets.push(asset.to_string());
                anchored_cvs.push(cv);
                flagged.extend(rows.iter().copied());
            }
        }

        let Some(avg_cv) = mean(&anchored_cvs) else {
            return Detection::none();
        };

        let anchored_share = share(flagged.len(), n);
        let reference = self.config.tightness_reference;
        let tightness = if reference > 0.0 {
            ((reference - avg_cv) / reference).max(0.0)
        } else {
            0.0
        };
        let score = cap_score(
            anchored_share * SHARE_WEIGHT
                + tightness * TIGHTNESS_WEIGHT
                + anchored_assets.len() as f64 * ASSET_WEIGHT,
        );
        if score < self.min_score {
            return Detection::none();
        }

        let description = format!(
            "{} asset(s) ({}) were traded repeatedly within a narrow price band \
             (avg price variation {:.2}%), covering {:.0}% of trades.",
            anchored_assets.len(),
            anchored_assets.join(", "),
            avg_cv * 100.0,
            anchored_share * 100.0
        );

        let mut details = Details::new();
        details.insert("anchored_assets".into(), json!(anchored_assets));
        details.insert("anchored_asset_count".into(), json!(anchored_assets.len()));
        details.insert("anchored_share".into(), json!(round_to(anchored_share, 4)));
        details.insert("avg_cv".into(), json!(round_to(avg_cv, 4)));
        details.insert("tightness".into(), json!(round_to(tightness, 4)));
        details.insert("strategy_primary".into(), json!(STRATEGY_PRIMARY));
        details.insert("strategy_secondary".into(), json!(STRATEGY_SECONDARY));

        let finding = make_finding(BiasKind::Anchoring, score, "Anchoring Bias", description, details);
        Detection::found(finding, flagged)
    }
}
