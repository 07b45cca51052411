//! Composite scoring
//!
//! Two independent weighting strategies share the metric normalizer:
//! - Health synergy: per-request score over the seven normalized metrics
//! - Biosignature quality: weekly score over five derived components
//!
//! The strategies serve different consumers and are never merged into one
//! configurable table; changing either one changes the meaning of history.

use crate::error::ComputeError;
use crate::types::{MetricKind, NormalizedMetrics};
use serde::{Deserialize, Serialize};

/// Required sum of a weight table, in percent
pub const WEIGHT_PERCENT_TOTAL: u32 = 100;

/// Named scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    HealthSynergy,
    BiosignatureQuality,
}

/// Fixed weight table with a name for error reporting.
///
/// Weights are whole percents so that a weighted sum of integer scores is
/// exact and ties land on exactly `.5`.
#[derive(Debug, Clone, Copy)]
pub struct WeightTable<K: 'static> {
    pub name: &'static str,
    pub entries: &'static [(K, u32)],
}

impl<K: 'static> WeightTable<K> {
    pub fn sum(&self) -> u32 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Fails when the weights do not sum to 100 percent
    pub fn validate(&self) -> Result<(), ComputeError> {
        let sum = self.sum();
        if sum != WEIGHT_PERCENT_TOTAL {
            return Err(ComputeError::InvalidWeights {
                name: self.name,
                sum,
            });
        }
        Ok(())
    }
}

/// Health synergy weights over normalized metrics
pub const HEALTH_SYNERGY_WEIGHTS: WeightTable<MetricKind> = WeightTable {
    name: "health_synergy",
    entries: &[
        (MetricKind::Glucose, 25),
        (MetricKind::Recovery, 20),
        (MetricKind::Sleep, 15),
        (MetricKind::Aqi, 15),
        (MetricKind::HeartRate, 10),
        (MetricKind::Activity, 10),
        (MetricKind::Strain, 5),
    ],
};

/// Inputs of the biosignature quality strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityComponent {
    Energy,
    Recovery,
    SleepQuality,
    Readiness,
    Metabolic,
}

/// Biosignature quality weights over derived components
pub const BIOSIGNATURE_QUALITY_WEIGHTS: WeightTable<QualityComponent> = WeightTable {
    name: "biosignature_quality",
    entries: &[
        (QualityComponent::Energy, 20),
        (QualityComponent::Recovery, 25),
        (QualityComponent::SleepQuality, 15),
        (QualityComponent::Readiness, 20),
        (QualityComponent::Metabolic, 20),
    ],
};

/// Check both built-in weight tables
pub fn validate_weight_tables() -> Result<(), ComputeError> {
    HEALTH_SYNERGY_WEIGHTS.validate()?;
    BIOSIGNATURE_QUALITY_WEIGHTS.validate()
}

/// Component scores (0-100) for the biosignature quality strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityComponents {
    pub energy: f64,
    pub recovery: f64,
    pub sleep_quality: f64,
    pub readiness: f64,
    pub metabolic: f64,
}

impl QualityComponents {
    /// Derive components from normalized metrics
    ///
    /// energy = mean(activity, strain), readiness = mean(recovery, heart rate),
    /// metabolic = mean(glucose, aqi).
    pub fn from_normalized(normalized: &NormalizedMetrics) -> Self {
        let mean = |a: MetricKind, b: MetricKind| (normalized.get(a) + normalized.get(b)) / 2.0;
        Self {
            energy: mean(MetricKind::Activity, MetricKind::Strain),
            recovery: normalized.get(MetricKind::Recovery),
            sleep_quality: normalized.get(MetricKind::Sleep),
            readiness: mean(MetricKind::Recovery, MetricKind::HeartRate),
            metabolic: mean(MetricKind::Glucose, MetricKind::Aqi),
        }
    }

    pub fn get(&self, component: QualityComponent) -> f64 {
        match component {
            QualityComponent::Energy => self.energy,
            QualityComponent::Recovery => self.recovery,
            QualityComponent::SleepQuality => self.sleep_quality,
            QualityComponent::Readiness => self.readiness,
            QualityComponent::Metabolic => self.metabolic,
        }
    }
}

/// Health synergy composite score in [0, 100]
pub fn synergy_score(normalized: &NormalizedMetrics) -> u8 {
    weighted_score(&HEALTH_SYNERGY_WEIGHTS, |kind| normalized.get(kind))
}

/// Biosignature quality composite score in [0, 100]
pub fn quality_score(components: &QualityComponents) -> u8 {
    weighted_score(&BIOSIGNATURE_QUALITY_WEIGHTS, |c| components.get(c))
}

/// Score normalized metrics with the given strategy
pub fn score_with(strategy: ScoringStrategy, normalized: &NormalizedMetrics) -> u8 {
    match strategy {
        ScoringStrategy::HealthSynergy => synergy_score(normalized),
        ScoringStrategy::BiosignatureQuality => {
            quality_score(&QualityComponents::from_normalized(normalized))
        }
    }
}

fn weighted_score<K: Copy + 'static>(table: &WeightTable<K>, score_of: impl Fn(K) -> f64) -> u8 {
    let total_hundredths: f64 = table
        .entries
        .iter()
        .map(|(key, percent)| f64::from(*percent) * score_of(*key).clamp(0.0, 100.0))
        .sum();
    round_hundredths(total_hundredths)
}

/// Round a score expressed in hundredths half away from zero and clamp
/// into [0, 100]
pub fn round_hundredths(hundredths: f64) -> u8 {
    if !hundredths.is_finite() || hundredths <= 0.0 {
        return 0;
    }
    let whole = (hundredths / 100.0).floor();
    let remainder = hundredths - whole * 100.0;
    let rounded = if remainder >= 50.0 { whole + 1.0 } else { whole };
    rounded.min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(score: f64) -> NormalizedMetrics {
        let scores: Vec<(MetricKind, f64)> =
            MetricKind::ALL.iter().map(|k| (*k, score)).collect();
        NormalizedMetrics::from_scores(&scores)
    }

    #[test]
    fn test_weight_tables_sum_to_one() {
        assert_eq!(HEALTH_SYNERGY_WEIGHTS.sum(), WEIGHT_PERCENT_TOTAL);
        assert_eq!(BIOSIGNATURE_QUALITY_WEIGHTS.sum(), WEIGHT_PERCENT_TOTAL);
        assert!(validate_weight_tables().is_ok());
    }

    #[test]
    fn test_malformed_table_rejected() {
        static BAD: &[(MetricKind, u32)] = &[(MetricKind::Glucose, 50), (MetricKind::Sleep, 40)];
        let table = WeightTable {
            name: "bad",
            entries: BAD,
        };
        assert!(matches!(
            table.validate(),
            Err(ComputeError::InvalidWeights { name: "bad", sum: 90 })
        ));
    }

    #[test]
    fn test_synergy_extremes() {
        assert_eq!(synergy_score(&uniform(100.0)), 100);
        assert_eq!(synergy_score(&uniform(0.0)), 0);
    }

    #[test]
    fn test_synergy_weighting() {
        let normalized = NormalizedMetrics::from_scores(&[(MetricKind::Glucose, 100.0)]);
        assert_eq!(synergy_score(&normalized), 25);

        let normalized = NormalizedMetrics::from_scores(&[(MetricKind::Strain, 100.0)]);
        assert_eq!(synergy_score(&normalized), 5);
    }


    #[test]
    fn test_round_hundredths_half_away_from_zero() {
        assert_eq!(round_hundredths(5550.0), 56);
        assert_eq!(round_hundredths(5549.0), 55);
        assert_eq!(round_hundredths(50.0), 1);
        assert_eq!(round_hundredths(49.999), 0);
        assert_eq!(round_hundredths(-120.0), 0);
        assert_eq!(round_hundredths(f64::INFINITY), 0);
        assert_eq!(round_hundredths(10_000.0), 100);
    }

    #[test]
    fn test_synergy_ties_round_up() {
        // glucose, recovery, sleep, aqi, heart rate, activity, strain
        let normalized = NormalizedMetrics::from_scores(&[
            (MetricKind::Glucose, 55.0),
            (MetricKind::Recovery, 22.0),
            (MetricKind::Sleep, 95.0),
            (MetricKind::Aqi, 88.0),
            (MetricKind::HeartRate, 13.0),
            (MetricKind::Activity, 37.0),
            (MetricKind::Strain, 98.0),
        ]);
        // 13.75 + 4.4 + 14.25 + 13.2 + 1.3 + 3.7 + 4.9 = 55.5
        assert_eq!(synergy_score(&normalized), 56);

        let normalized = NormalizedMetrics::from_scores(&[
            (MetricKind::Sleep, 1.0),
            (MetricKind::Aqi, 2.0),
        ]);
        // 0.15 + 0.3 = 0.45
        assert_eq!(synergy_score(&normalized), 0);

        let normalized = NormalizedMetrics::from_scores(&[(MetricKind::Strain, 10.0)]);
        // 0.05 * 10 = 0.5
        assert_eq!(synergy_score(&normalized), 1);
    }

    #[test]
    fn test_synergy_rounding_matches_integer_arithmetic() {
        for sleep in (1..100).step_by(2) {
            for strain in (0..100).step_by(10) {
                let normalized = NormalizedMetrics::from_scores(&[
                    (MetricKind::Sleep, f64::from(sleep)),
                    (MetricKind::Strain, f64::from(strain)),
                ]);
                let hundredths = 15 * sleep + 5 * strain;
                let expected = ((hundredths + 50) / 100) as u8;
                assert_eq!(synergy_score(&normalized), expected, "sleep={sleep} strain={strain}");
            }
        }
    }

    #[test]
    fn test_quality_ties_round_up() {
        let components = QualityComponents {
            energy: 0.0,
            recovery: 0.0,
            sleep_quality: 1.0,
            readiness: 0.0,
            metabolic: 2.5,
        };
        // 0.15 + 0.5 = 0.65
        assert_eq!(quality_score(&components), 1);

        let components = QualityComponents {
            energy: 0.0,
            recovery: 0.0,
            sleep_quality: 3.0,
            readiness: 0.0,
            metabolic: 0.0,
        };
        // 0.15 * 3 = 0.45
        assert_eq!(quality_score(&components), 0);

        let components = QualityComponents {
            energy: 0.0,
            recovery: 2.0,
            sleep_quality: 0.0,
            readiness: 0.0,
            metabolic: 0.0,
        };
        // 0.25 * 2 = 0.5
        assert_eq!(quality_score(&components), 1);
    }

    #[test]
    fn test_quality_components() {
        let normalized = NormalizedMetrics::from_scores(&[
            (MetricKind::Glucose, 100.0),
            (MetricKind::Aqi, 50.0),
            (MetricKind::Activity, 80.0),
            (MetricKind::Strain, 40.0),
            (MetricKind::Recovery, 80.0),
            (MetricKind::HeartRate, 70.0),
            (MetricKind::Sleep, 60.0),
        ]);
        let components = QualityComponents::from_normalized(&normalized);
        assert_eq!(components.energy, 60.0);
        assert_eq!(components.readiness, 75.0);
        assert_eq!(components.metabolic, 75.0);

        // 0.2*60 + 0.25*80 + 0.15*60 + 0.2*75 + 0.2*75 = 71
        assert_eq!(quality_score(&components), 71);
    }

    #[test]
    fn test_strategies_differ() {
        let normalized = NormalizedMetrics::from_scores(&[(MetricKind::Glucose, 100.0)]);
        assert_eq!(score_with(ScoringStrategy::HealthSynergy, &normalized), 25);
        assert_eq!(score_with(ScoringStrategy::BiosignatureQuality, &normalized), 10);
    }
}
