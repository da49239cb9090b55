//! Core types and configuration for the trading bias detector.
//!
//! This crate provides shared types used across all other crates:
//! - Trade records, findings and the analysis report
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
