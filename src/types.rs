//! Core types for the biosignature engine
//!
//! This module defines the records that flow through each stage of the
//! engine: raw samples, per-period aggregates, normalized scores, composite
//! scores, pattern parameters and persisted snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One of the seven supported biometric or environmental signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Blood glucose (mg/dL)
    Glucose,
    /// Active hours
    Activity,
    /// Recovery (%)
    Recovery,
    /// Strain index
    Strain,
    /// Air quality index
    Aqi,
    /// Heart rate (bpm)
    HeartRate,
    /// Sleep duration (hours)
    Sleep,
}

impl MetricKind {
    /// All metric kinds in a stable order
    pub const ALL: [MetricKind; 7] = [
        MetricKind::Glucose,
        MetricKind::Activity,
        MetricKind::Recovery,
        MetricKind::Strain,
        MetricKind::Aqi,
        MetricKind::HeartRate,
        MetricKind::Sleep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Glucose => "glucose",
            MetricKind::Activity => "activity",
            MetricKind::Recovery => "recovery",
            MetricKind::Strain => "strain",
            MetricKind::Aqi => "aqi",
            MetricKind::HeartRate => "heart_rate",
            MetricKind::Sleep => "sleep",
        }
    }
}

/// A single physiological or environmental reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Which signal this reading belongs to
    pub kind: MetricKind,
    /// Raw value in the metric's native unit
    pub value: f64,
    /// When the reading was captured (UTC)
    pub captured_at: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(kind: MetricKind, value: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            value,
            captured_at,
        }
    }

    /// A sample only counts toward aggregation when its value is finite
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// Aggregated raw values for one period, one slot per metric kind.
///
/// `None` means the metric had no valid samples in the period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    #[serde(default)]
    pub glucose: Option<f64>,
    #[serde(default)]
    pub activity: Option<f64>,
    #[serde(default)]
    pub recovery: Option<f64>,
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub aqi: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<f64>,
    #[serde(default)]
    pub sleep: Option<f64>,
}

impl MetricValues {
    /// Raw value for a metric kind, if present
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Glucose => self.glucose,
            MetricKind::Activity => self.activity,
            MetricKind::Recovery => self.recovery,
            MetricKind::Strain => self.strain,
            MetricKind::Aqi => self.aqi,
            MetricKind::HeartRate => self.heart_rate,
            MetricKind::Sleep => self.sleep,
        }
    }

    pub fn set(&mut self, kind: MetricKind, value: Option<f64>) {
        let slot = match kind {
            MetricKind::Glucose => &mut self.glucose,
            MetricKind::Activity => &mut self.activity,
            MetricKind::Recovery => &mut self.recovery,
            MetricKind::Strain => &mut self.strain,
            MetricKind::Aqi => &mut self.aqi,
            MetricKind::HeartRate => &mut self.heart_rate,
            MetricKind::Sleep => &mut self.sleep,
        };
        *slot = value;
    }

    /// Builder-style setter
    pub fn with(mut self, kind: MetricKind, value: f64) -> Self {
        self.set(kind, Some(value));
        self
    }

    /// Metric kinds with no usable (finite) value
    pub fn absent_kinds(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .iter()
            .copied()
            .filter(|kind| !self.get(*kind).is_some_and(f64::is_finite))
            .collect()
    }
}

/// Normalized 0-100 goodness score for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetricScore {
    pub kind: MetricKind,
    /// Score in [0, 100]
    pub score: f64,
    /// True when the neutral default was substituted for an absent value
    pub imputed: bool,
}

/// Normalized scores for all seven metric kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub scores: Vec<NormalizedMetricScore>,
}

impl NormalizedMetrics {
    /// Score for a kind; a missing entry counts as 0
    pub fn get(&self, kind: MetricKind) -> f64 {
        self.scores
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.score)
            .unwrap_or(0.0)
    }

    /// Build from explicit per-kind scores (none imputed)
    pub fn from_scores(scores: &[(MetricKind, f64)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(kind, score)| NormalizedMetricScore {
                    kind: *kind,
                    score: *score,
                    imputed: false,
                })
                .collect(),
        }
    }

    /// Kinds whose score came from the default table
    pub fn imputed_kinds(&self) -> Vec<MetricKind> {
        self.scores
            .iter()
            .filter(|s| s.imputed)
            .map(|s| s.kind)
            .collect()
    }
}

/// Coarse three-level health classification, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Poor,
    Transitional,
    Optimal,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Poor => "poor",
            Band::Transitional => "transitional",
            Band::Optimal => "optimal",
        }
    }
}

/// Composite health score with its band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeScore {
    /// Integer score in [0, 100]
    pub score: u8,
    pub band: Band,
}

/// Visualization parameters derived from a composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub density: f64,
    pub symmetry: f64,
    pub animation_speed: f64,
    pub color_intensity: f64,
    pub jitter: f64,
    pub band: Band,
    pub score: u8,
}

/// Latest environmental reading supplied alongside a snapshot build
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub aqi: f64,
    pub captured_at: DateTime<Utc>,
}

/// Persisted weekly biosignature record (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiosignatureSnapshot {
    /// Storage key: `{user_id}_{week_start}`
    pub document_id: String,
    pub user_id: String,
    /// Monday of the week this snapshot belongs to
    pub week_start: NaiveDate,
    pub glucose: f64,
    pub activity: f64,
    pub recovery: f64,
    pub strain: f64,
    pub aqi: f64,
    pub heart_rate: f64,
    pub sleep: f64,
    /// Display-level change fingerprint, not a dedup key
    pub pattern_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
