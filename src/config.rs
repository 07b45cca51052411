//! Engine configuration
//!
//! Collects every tunable the engine depends on: the neutral default tables
//! used when a metric is absent, band thresholds, the weekly minimum sample
//! count and the snapshot cadence. Configuration is validated once, when an
//! engine is constructed, never per call.

use crate::error::ComputeError;
use crate::types::MetricKind;
use serde::{Deserialize, Serialize};

/// Default neutral score for the live health synergy consumer
pub const SYNERGY_NEUTRAL_SCORE: f64 = 70.0;

/// Default neutral score for the weekly biosignature quality consumer
pub const QUALITY_NEUTRAL_SCORE: f64 = 75.0;

/// "Unknown" sentinel used by snapshot assembly
pub const SNAPSHOT_UNKNOWN_SCORE: f64 = 0.0;

/// Default minimum number of valid samples required to score a week
pub const DEFAULT_MIN_SAMPLES_PER_WEEK: usize = 3;

/// Default snapshot cadence in days
pub const DEFAULT_SNAPSHOT_CADENCE_DAYS: u32 = 7;

/// Per-metric values (0-100) substituted for absent metrics.
///
/// The synergy and quality tables hold neutral normalized *scores*. The
/// snapshot table holds the sentinel written into raw-unit snapshot fields,
/// so its values are read as "unknown", not as a reading or a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultProfile {
    pub glucose: f64,
    pub activity: f64,
    pub recovery: f64,
    pub strain: f64,
    pub aqi: f64,
    pub heart_rate: f64,
    pub sleep: f64,
}

impl DefaultProfile {
    /// Profile with the same default for every metric
    pub const fn uniform(score: f64) -> Self {
        Self {
            glucose: score,
            activity: score,
            recovery: score,
            strain: score,
            aqi: score,
            heart_rate: score,
            sleep: score,
        }
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
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

    fn validate(&self, name: &str) -> Result<(), ComputeError> {
        for kind in MetricKind::ALL {
            let value = self.get(kind);
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ComputeError::InvalidConfig(format!(
                    "default profile '{name}' has {} = {value}, expected 0-100",
                    kind.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Which consumer's default table to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultsFor {
    /// Live health synergy score and pattern
    Synergy,
    /// Weekly biosignature quality score
    Quality,
    /// Snapshot assembly
    Snapshot,
}

/// One default table per consumer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultTables {
    pub synergy: DefaultProfile,
    pub quality: DefaultProfile,
    pub snapshot: DefaultProfile,
}

impl Default for DefaultTables {
    fn default() -> Self {
        Self {
            synergy: DefaultProfile::uniform(SYNERGY_NEUTRAL_SCORE),
            quality: DefaultProfile::uniform(QUALITY_NEUTRAL_SCORE),
            snapshot: DefaultProfile::uniform(SNAPSHOT_UNKNOWN_SCORE),
        }
    }
}

impl DefaultTables {
    pub fn profile(&self, consumer: DefaultsFor) -> &DefaultProfile {
        match consumer {
            DefaultsFor::Synergy => &self.synergy,
            DefaultsFor::Quality => &self.quality,
            DefaultsFor::Snapshot => &self.snapshot,
        }
    }
}

/// Lower bounds for the optimal and transitional bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandThresholds {
    /// Scores at or above this are optimal
    pub optimal_min: u8,
    /// Scores at or above this (and below `optimal_min`) are transitional
    pub transitional_min: u8,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            optimal_min: 75,
            transitional_min: 40,
        }
    }
}

impl BandThresholds {
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.transitional_min == 0
            || self.transitional_min >= self.optimal_min
            || self.optimal_min > 100
        {
            return Err(ComputeError::InvalidConfig(format!(
                "band thresholds must satisfy 0 < transitional_min ({}) < optimal_min ({}) <= 100",
                self.transitional_min, self.optimal_min
            )));
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub defaults: DefaultTables,
    pub band_thresholds: BandThresholds,
    pub min_samples_per_week: usize,
    pub snapshot_cadence_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultTables::default(),
            band_thresholds: BandThresholds::default(),
            min_samples_per_week: DEFAULT_MIN_SAMPLES_PER_WEEK,
            snapshot_cadence_days: DEFAULT_SNAPSHOT_CADENCE_DAYS,
        }
    }
}

impl EngineConfig {
    /// Check every field; called by engine constructors
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.defaults.synergy.validate("synergy")?;
        self.defaults.quality.validate("quality")?;
        self.defaults.snapshot.validate("snapshot")?;
        self.band_thresholds.validate()?;

        if self.min_samples_per_week == 0 {
            return Err(ComputeError::InvalidConfig(
                "min_samples_per_week must be at least 1".to_string(),
            ));
        }
        if self.snapshot_cadence_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "snapshot_cadence_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.defaults.synergy.get(MetricKind::Glucose), 70.0);
        assert_eq!(config.defaults.quality.get(MetricKind::Sleep), 75.0);
        assert_eq!(config.defaults.snapshot.get(MetricKind::Aqi), 0.0);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = EngineConfig::default();
        config.band_thresholds = BandThresholds {
            optimal_min: 40,
            transitional_min: 75,
        };
        assert!(matches!(
            config.validate(),
            Err(ComputeError::InvalidConfig(_))
        ));

        config.band_thresholds = BandThresholds {
            optimal_min: 101,
            transitional_min: 40,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_default_rejected() {
        let mut config = EngineConfig::default();
        config.defaults.quality.recovery = 140.0;
        assert!(config.validate().is_err());

        config.defaults.quality.recovery = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let config = EngineConfig {
            snapshot_cadence_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"min_samples_per_week": 5}"#).unwrap();
        assert_eq!(config.min_samples_per_week, 5);
        assert_eq!(config.snapshot_cadence_days, 7);
        assert_eq!(config.band_thresholds, BandThresholds::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        let loaded = EngineConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }
}
