//! Band classification
//!
//! Maps a composite score to one of three ordered bands. Classification is a
//! total function over [0, 100] with no hysteresis, so repeated evaluation of
//! the same score always agrees.

use crate::config::BandThresholds;
use crate::error::ComputeError;
use crate::types::{Band, CompositeScore};

/// Classifier bound to validated thresholds
#[derive(Debug, Clone, Copy)]
pub struct BandClassifier {
    thresholds: BandThresholds,
}

impl Default for BandClassifier {
    fn default() -> Self {
        Self {
            thresholds: BandThresholds::default(),
        }
    }
}

impl BandClassifier {
    /// Create a classifier, rejecting thresholds that would leave gaps
    pub fn new(thresholds: BandThresholds) -> Result<Self, ComputeError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> BandThresholds {
        self.thresholds
    }

    pub fn classify(&self, score: u8) -> Band {
        if score >= self.thresholds.optimal_min {
            Band::Optimal
        } else if score >= self.thresholds.transitional_min {
            Band::Transitional
        } else {
            Band::Poor
        }
    }

    /// Pair a score with its band
    pub fn composite(&self, score: u8) -> CompositeScore {
        CompositeScore {
            score,
            band: self.classify(score),
        }
    }
}

/// Classify with the default thresholds (>=75 optimal, 40-74 transitional)
pub fn classify(score: u8) -> Band {
    BandClassifier::default().classify(score)
}
