//! Behavioral bias detectors.
//!
//! This crate handles:
//! - The `Detector` interface and shared scoring helpers
//! - Overtrading, loss aversion and revenge trading
//! - Disposition effect, anchoring and confirmation bias

pub mod detector;
pub mod stats;
pub mod overtrading;
pub mod loss_aversion;
pub mod revenge;
pub mod disposition;
pub mod anchoring;
pub mod confirmation;

pub use detector::{Detection, Detector};
pub use overtrading::OvertradingDetector;
pub use loss_aversion::LossAversionDetector;
pub use revenge::RevengeTradingDetector;
pub use disposition::DispositionDetector;
pub use anchoring::AnchoringDetector;
pub use confirmation::ConfirmationBiasDetector;

use bias_core::config::DetectorConfig;

/// One detector per bias kind, in report order.
pub fn default_detectors(config: &DetectorConfig) -> Vec<Box<dyn Detector>> {
    let min_score = config.min_score;
    vec![
        Box::new(OvertradingDetector::new(config.overtrading.clone(), min_score)),
        Box::new(LossAversionDetector::new(config.loss_aversion.clone(), min_score)),
        Box::new(RevengeTradingDetector::new(config.revenge_trading.clone(), min_score)),
        Box::new(DispositionDetector::new(config.disposition_effect.clone(), min_score)),
        Box::new(AnchoringDetector::new(config.anchoring.clone(), min_score)),
        Box::new(ConfirmationBiasDetector::new(config.confirmation_bias.clone(), min_score)),
    ]
}
