//! Biosignature Engine - Deterministic health synergy scoring
//!
//! The engine turns noisy, partially missing biometric and environmental
//! samples into a composite health score through a deterministic pipeline:
//! weekly aggregation → metric normalization → composite scoring → band
//! classification → pattern mapping, with a 7-day snapshot gate for
//! persisted history.
//!
//! ## Modules
//!
//! - **Scoring**: normalizer, composite strategies, band classifier, pattern mapper
//! - **History**: aggregation periods and the weekly snapshot gate

pub mod band;
pub mod config;
pub mod encoder;
pub mod error;
pub mod normalizer;
pub mod pattern;
pub mod period;
pub mod pipeline;
pub mod scoring;
pub mod snapshot;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use band::{classify, BandClassifier};
pub use config::EngineConfig;
pub use error::ComputeError;
pub use normalizer::{normalize_raw, Normalizer};
pub use pattern::map_pattern;
pub use period::{week_start, week_start_key, AggregationPeriod};
pub use pipeline::{
    metrics_to_report_json, samples_to_weekly_json, SynergyEngine, SynergyReport, WeeklyOutcome,
};
pub use scoring::{quality_score, synergy_score, ScoringStrategy};
pub use snapshot::{should_snapshot, SnapshotDecision, SnapshotGate};
pub use types::{Band, CompositeScore, MetricKind, MetricSample, MetricValues, PatternConfig};

/// Engine version embedded in all reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "biosignature-engine";
