//! Metric normalization
//!
//! Maps raw physiological and environmental readings onto a common 0-100
//! "goodness" scale with metric-specific piecewise-linear curves:
//! - An optimal band scores 100
//! - Transition zones interpolate linearly between the band and its floor/ceiling
//! - Sub-floor values scale toward 0 proportionally to the value
//! - Super-ceiling values fall off linearly from the ceiling score
//!
//! Non-finite input is treated as absent and replaced by the neutral default
//! of the active consumer profile.

use crate::config::DefaultProfile;
use crate::types::{MetricKind, MetricValues, NormalizedMetricScore, NormalizedMetrics};

/// Lower edge of a curve: below `at` the score is `value / at * score`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorEdge {
    pub at: f64,
    pub score: f64,
}

/// Upper edge of a curve: past `at` the score drops by 100 every `span` units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CeilingEdge {
    pub at: f64,
    pub score: f64,
    pub span: f64,
}

/// Piecewise-linear scoring curve for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricCurve {
    /// Lowest value scoring 100 (`None` = unbounded below)
    pub optimal_low: Option<f64>,
    /// Highest value scoring 100 (`None` = unbounded above)
    pub optimal_high: Option<f64>,
    pub floor: Option<FloorEdge>,
    pub ceiling: Option<CeilingEdge>,
}

impl MetricCurve {
    /// Curve for a metric kind
    pub const fn for_kind(kind: MetricKind) -> Self {
        match kind {
            // mg/dL
            MetricKind::Glucose => Self {
                optimal_low: Some(80.0),
                optimal_high: Some(120.0),
                floor: Some(FloorEdge { at: 70.0, score: 50.0 }),
                ceiling: Some(CeilingEdge { at: 180.0, score: 50.0, span: 100.0 }),
            },
            // hours
            MetricKind::Activity => Self {
                optimal_low: Some(7.0),
                optimal_high: Some(12.0),
                floor: Some(FloorEdge { at: 3.0, score: 50.0 }),
                ceiling: Some(CeilingEdge { at: 15.0, score: 50.0, span: 10.0 }),
            },
            // Capped at 100 with no super-ceiling penalty
            MetricKind::Recovery => Self {
                optimal_low: Some(70.0),
                optimal_high: None,
                floor: Some(FloorEdge { at: 50.0, score: 60.0 }),
                ceiling: None,
            },
            MetricKind::Strain => Self {
                optimal_low: Some(8.0),
                optimal_high: Some(14.0),
                floor: Some(FloorEdge { at: 5.0, score: 50.0 }),
                ceiling: Some(CeilingEdge { at: 18.0, score: 50.0, span: 5.0 }),
            },
            // Lower is always better; 150 and above scores 0
            MetricKind::Aqi => Self {
                optimal_low: None,
                optimal_high: Some(50.0),
                floor: None,
                ceiling: Some(CeilingEdge { at: 150.0, score: 0.0, span: 1.0 }),
            },
            // bpm
            MetricKind::HeartRate => Self {
                optimal_low: Some(60.0),
                optimal_high: Some(80.0),
                floor: Some(FloorEdge { at: 50.0, score: 50.0 }),
                ceiling: Some(CeilingEdge { at: 100.0, score: 50.0, span: 50.0 }),
            },
            // hours
            MetricKind::Sleep => Self {
                optimal_low: Some(7.0),
                optimal_high: Some(9.0),
                floor: Some(FloorEdge { at: 5.0, score: 50.0 }),
                ceiling: Some(CeilingEdge { at: 10.0, score: 50.0, span: 4.0 }),
            },
        }
    }

    /// Evaluate the curve. Returns `None` for non-finite input.
    pub fn evaluate(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }

        let score = if let Some(low) = self.optimal_low.filter(|low| value < *low) {
            match self.floor {
                Some(floor) if value < floor.at => value / floor.at * floor.score,
                Some(floor) => lerp(value, floor.at, low, floor.score, 100.0),
                None => 100.0,
            }
        } else if let Some(high) = self.optimal_high.filter(|high| value > *high) {
            match self.ceiling {
                Some(ceiling) if value > ceiling.at => {
                    ceiling.score - (value - ceiling.at) / ceiling.span * 100.0
                }
                Some(ceiling) => lerp(value, high, ceiling.at, 100.0, ceiling.score),
                None => 100.0,
            }
        } else {
            100.0
        };

        Some(score.clamp(0.0, 100.0))
    }
}

/// Linear interpolation of `value` from [x0, x1] onto [y0, y1]
fn lerp(value: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if x1 <= x0 {
        return y1;
    }
    y0 + (value - x0) / (x1 - x0) * (y1 - y0)
}

/// Normalize a raw value with the metric's curve, without default substitution
pub fn normalize_raw(kind: MetricKind, value: f64) -> Option<f64> {
    MetricCurve::for_kind(kind).evaluate(value)
}

/// Normalizer bound to one consumer's default table
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    defaults: DefaultProfile,
}

impl Normalizer {
    pub fn new(defaults: DefaultProfile) -> Self {
        Self { defaults }
    }

    /// Normalize a raw value to [0, 100], substituting the neutral default
    /// for non-finite input
    pub fn normalize(&self, kind: MetricKind, value: f64) -> f64 {
        self.score(kind, Some(value)).score
    }

    /// Normalize an optional raw value, recording whether the default was used
    pub fn score(&self, kind: MetricKind, value: Option<f64>) -> NormalizedMetricScore {
        match value.and_then(|v| normalize_raw(kind, v)) {
            Some(score) => NormalizedMetricScore {
                kind,
                score,
                imputed: false,
            },
            None => {
                tracing::debug!(metric = kind.as_str(), "metric absent, using neutral default");
                NormalizedMetricScore {
                    kind,
                    score: self.defaults.get(kind),
                    imputed: true,
                }
            }
        }
    }

    /// Normalize every metric in an aggregate
    pub fn normalize_all(&self, values: &MetricValues) -> NormalizedMetrics {
        NormalizedMetrics {
            scores: MetricKind::ALL
                .iter()
                .map(|kind| self.score(*kind, values.get(*kind)))
                .collect(),
        }
    }
}
