//! Analysis pipeline for the bias detector.
//!
//! This crate handles:
//! - Running the detectors over a cleaned table
//! - Report assembly (composite score, flags, histogram)
//! - Context building for the coaching collaborator

pub mod aggregator;
pub mod pipeline;
pub mod coach;

pub use aggregator::{composite_score, Aggregator};
pub use pipeline::BiasEngine;
pub use coach::{ChatMessage, ChatRequest, Role};
