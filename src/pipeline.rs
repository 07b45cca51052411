//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It wires the stages
//! together: samples → weekly buckets → per-metric mean → normalization →
//! composite scoring → band classification → pattern mapping, plus the
//! snapshot gate for persisted history.

use crate::band::BandClassifier;
use crate::config::{DefaultsFor, EngineConfig};
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::normalizer::Normalizer;
use crate::pattern::pattern_for;
use crate::period::{aggregate, group_by_week, valid_sample_count, AggregationPeriod};
use crate::scoring::{quality_score, synergy_score, validate_weight_tables, QualityComponents};
use crate::snapshot::{SnapshotDecision, SnapshotGate};
use crate::types::{
    CompositeScore, EnvironmentReading, MetricSample, MetricValues, NormalizedMetrics,
    PatternConfig,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Live health synergy result for one aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyReport {
    /// Raw aggregated inputs
    pub values: MetricValues,
    /// Normalized scores under the synergy default profile
    pub normalized: NormalizedMetrics,
    /// Health synergy score and band
    pub composite: CompositeScore,
    /// Visualization parameters for the composite
    pub pattern: PatternConfig,
}

/// Scored week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyScore {
    pub week_start: NaiveDate,
    pub period: AggregationPeriod,
    /// Valid samples that contributed to the aggregate
    pub sample_count: usize,
    pub values: MetricValues,
    /// Health synergy score and band
    pub synergy: CompositeScore,
    /// Biosignature quality components (quality default profile)
    pub components: QualityComponents,
    /// Biosignature quality score and band
    pub quality: CompositeScore,
}

/// Result of scoring one week of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeeklyOutcome {
    Scored(WeeklyScore),
    /// Too few valid samples; callers typically show a placeholder
    InsufficientData {
        week_start: NaiveDate,
        sample_count: usize,
        required: usize,
    },
}

impl WeeklyOutcome {
    pub fn week_start(&self) -> NaiveDate {
        match self {
            WeeklyOutcome::Scored(score) => score.week_start,
            WeeklyOutcome::InsufficientData { week_start, .. } => *week_start,
        }
    }

    pub fn scored(&self) -> Option<&WeeklyScore> {
        match self {
            WeeklyOutcome::Scored(score) => Some(score),
            WeeklyOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Configured scoring engine.
///
/// Holds no mutable state; one engine can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct SynergyEngine {
    config: EngineConfig,
    synergy_normalizer: Normalizer,
    quality_normalizer: Normalizer,
    classifier: BandClassifier,
    gate: SnapshotGate,
}

impl SynergyEngine {
    /// Build an engine, failing fast on invalid configuration or weights
    pub fn new(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        validate_weight_tables()?;

        let defaults = &config.defaults;
        Ok(Self {
            synergy_normalizer: Normalizer::new(*defaults.profile(DefaultsFor::Synergy)),
            quality_normalizer: Normalizer::new(*defaults.profile(DefaultsFor::Quality)),
            classifier: BandClassifier::new(config.band_thresholds)?,
            gate: SnapshotGate::new(
                config.snapshot_cadence_days,
                *defaults.profile(DefaultsFor::Snapshot),
            )?,
            config,
        })
    }

    /// Engine with the built-in configuration
    pub fn with_defaults() -> Result<Self, ComputeError> {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &BandClassifier {
        &self.classifier
    }

    pub fn gate(&self) -> &SnapshotGate {
        &self.gate
    }

    /// Score one aggregate with the health synergy strategy
    pub fn evaluate(&self, values: &MetricValues) -> SynergyReport {
        let normalized = self.synergy_normalizer.normalize_all(values);
        let composite = self.classifier.composite(synergy_score(&normalized));
        let pattern = pattern_for(&composite);

        SynergyReport {
            values: values.clone(),
            normalized,
            composite,
            pattern,
        }
    }

    /// Biosignature quality score for one aggregate
    pub fn quality(&self, values: &MetricValues) -> (QualityComponents, CompositeScore) {
        let normalized = self.quality_normalizer.normalize_all(values);
        let components = QualityComponents::from_normalized(&normalized);
        let composite = self.classifier.composite(quality_score(&components));
        (components, composite)
    }

    /// Score the samples of a single week.
    ///
    /// Fails only when `week_start` has no representable aggregation period.
    pub fn score_week(
        &self,
        week_start: NaiveDate,
        samples: &[MetricSample],
    ) -> Result<WeeklyOutcome, ComputeError> {
        let period = AggregationPeriod::for_week(week_start)?;
        let sample_count = valid_sample_count(samples);
        let required = self.config.min_samples_per_week;

        if sample_count < required {
            tracing::debug!(%week_start, sample_count, required, "insufficient data for week");
            return Ok(WeeklyOutcome::InsufficientData {
                week_start,
                sample_count,
                required,
            });
        }

        let values = aggregate(samples);
        let synergy = self.evaluate(&values).composite;
        let (components, quality) = self.quality(&values);

        tracing::debug!(
            %week_start,
            sample_count,
            synergy = synergy.score,
            quality = quality.score,
            "scored week"
        );

        Ok(WeeklyOutcome::Scored(WeeklyScore {
            week_start,
            period,
            sample_count,
            values,
            synergy,
            components,
            quality,
        }))
    }

    /// Group samples into weeks and score each, oldest week first
    pub fn score_samples(
        &self,
        samples: &[MetricSample],
    ) -> Result<Vec<WeeklyOutcome>, ComputeError> {
        group_by_week(samples)
            .into_iter()
            .map(|(week_start, week)| self.score_week(week_start, &week))
            .collect()
    }

    /// Evaluate the snapshot gate and build a snapshot when due
    pub fn snapshot(
        &self,
        latest_created_at: Option<DateTime<Utc>>,
        values: &MetricValues,
        latest_env: Option<&EnvironmentReading>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> SnapshotDecision {
        self.gate
            .evaluate(latest_created_at, values, latest_env, user_id, now)
    }
}

/// Score a JSON `MetricValues` object and return a JSON report (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let report = metrics_to_report_json(r#"{"glucose": 95.0, "sleep": 8.0}"#.to_string())?;
/// ```
pub fn metrics_to_report_json(metrics_json: String) -> Result<String, ComputeError> {
    let values: MetricValues = serde_json::from_str(&metrics_json)?;
    let engine = SynergyEngine::with_defaults()?;
    ReportEncoder::new().encode_to_json(&engine.evaluate(&values))
}

/// Score a JSON array of samples week by week and return a JSON report.
pub fn samples_to_weekly_json(samples_json: String) -> Result<String, ComputeError> {
    let samples: Vec<MetricSample> = serde_json::from_str(&samples_json)?;
    let engine = SynergyEngine::with_defaults()?;
    ReportEncoder::new().encode_to_json(&engine.score_samples(&samples)?)
}
