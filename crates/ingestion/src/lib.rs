//! Data ingestion and cleaning for the bias detector.
//!
//! This crate handles:
//! - Bounded upload reads
//! - CSV header mapping and cell coercion
//! - Validity, range, outlier and duplicate filtering

pub mod upload;
pub mod normalizer;
pub mod preprocessor;

pub use upload::{ensure_csv_filename, read_bounded};
pub use normalizer::{normalize_csv, Column, NormalizedRow, NormalizedTable};
pub use preprocessor::Preprocessor;
