//! Pattern parameter mapping
//!
//! Derives visualization parameters from a composite score. Each band
//! interpolates linearly on a local position within the band; the result is
//! a presentation view recomputed on demand, never stored as health state.

use crate::types::{Band, CompositeScore, PatternConfig};

/// Map a score and its band to pattern parameters, every field in [0, 1]
pub fn map_pattern(score: u8, band: Band) -> PatternConfig {
    let s = f64::from(score);

    let (density, symmetry, animation_speed, color_intensity, jitter) = match band {
        Band::Optimal => {
            let above = (s - 75.0).max(0.0);
            (
                (0.85 + above / 100.0).min(1.0),
                0.95,
                1.0,
                0.9 + above / 250.0,
                0.05,
            )
        }
        Band::Transitional => {
            let t = ((s - 40.0) / 35.0).clamp(0.0, 1.0);
            (
                0.5 + 0.35 * t,
                0.6 + 0.35 * t,
                0.7 + 0.3 * t,
                0.6 + 0.3 * t,
                0.3 - 0.25 * t,
            )
        }
        Band::Poor => {
            let t = (s / 40.0).clamp(0.0, 1.0);
            (
                0.2 + 0.3 * t,
                0.2 + 0.4 * t,
                0.3 + 0.4 * t,
                0.3 + 0.3 * t,
                0.7 - 0.4 * t,
            )
        }
    };

    PatternConfig {
        density: unit(density),
        symmetry: unit(symmetry),
        animation_speed: unit(animation_speed),
        color_intensity: unit(color_intensity),
        jitter: unit(jitter),
        band,
        score,
    }
}

/// Pattern for an already classified score
pub fn pattern_for(composite: &CompositeScore) -> PatternConfig {
    map_pattern(composite.score, composite.band)
}

fn unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::classify;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_all_fields_in_unit_range() {
        for score in 0..=100u8 {
            for band in [Band::Poor, Band::Transitional, Band::Optimal] {
                let p = map_pattern(score, band);
                for value in [
                    p.density,
                    p.symmetry,
                    p.animation_speed,
                    p.color_intensity,
                    p.jitter,
                ] {
                    assert!((0.0..=1.0).contains(&value), "{band:?} {score}: {value}");
                }
            }
        }
    }

    #[test]
    fn test_optimal_band() {
        let p = map_pattern(75, Band::Optimal);
        assert!(approx(p.density, 0.85));
        assert!(approx(p.color_intensity, 0.9));
        assert!(approx(p.jitter, 0.05));

        let p = map_pattern(100, Band::Optimal);
        assert!(approx(p.density, 1.0));
        assert!(approx(p.color_intensity, 1.0));
        assert!(approx(p.symmetry, 0.95));
    }

    #[test]
    fn test_transitional_band() {
        let p = map_pattern(40, Band::Transitional);
        assert!(approx(p.density, 0.5));
        assert!(approx(p.jitter, 0.3));

        let p = map_pattern(75, Band::Transitional);
        assert!(approx(p.density, 0.85));
        assert!(approx(p.jitter, 0.05));
    }

    #[test]
    fn test_poor_band() {
        let p = map_pattern(0, Band::Poor);
        assert!(approx(p.density, 0.2));
        assert!(approx(p.jitter, 0.7));
        assert!(approx(p.animation_speed, 0.3));

        let p = map_pattern(20, Band::Poor);
        assert!(approx(p.symmetry, 0.4));
        assert!(approx(p.jitter, 0.5));
    }

    #[test]
    fn test_density_non_decreasing_with_score() {
        let mut previous = 0.0;
        for score in 0..=100u8 {
            let p = map_pattern(score, classify(score));
            assert!(p.density >= previous - 1e-9, "density dropped at {score}");
            previous = p.density;
        }
    }
}
