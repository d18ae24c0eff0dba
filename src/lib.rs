//! Raman QC
//!
//! Edge decision engine for Raman spectra in battery-material manufacturing.
//! A spectrum is scored band by band against a recipe (expected bands plus
//! global thresholds) and aggregated into a GREEN / AMBER / RED verdict with
//! human-readable reasons.

pub mod classifier;
pub mod config;
pub mod decision;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod recipe;
pub mod spectrum;
pub mod types;

pub use classifier::Classifier;
pub use error::{QcError, QcResult};
pub use pipeline::evaluate;
#[cfg(feature = "parallel")]
pub use pipeline::evaluate_parallel;
pub use types::{BandLabel, BandResult, Decision, Recipe, SampleResult};
