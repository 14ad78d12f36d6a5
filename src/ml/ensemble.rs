//! Merges the predictors' per-period estimates into a single point
//! estimate with a confidence band, using the fixed convex weights.

use crate::config::ForecastConfig;
use crate::ml::predictor::Estimate;
use crate::models::Trend;

/// Two estimates closer than this count as `flat`.
const TREND_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedPoint {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
    pub trend: Trend,
}

pub struct EnsembleCombiner<'a> {
    cfg: &'a ForecastConfig,
}

impl<'a> EnsembleCombiner<'a> {
    pub fn new(cfg: &'a ForecastConfig) -> Self {
        Self { cfg }
    }

    /// `columns` holds one (weight, estimates) pair per predictor, all
    /// aligned to the same horizon. The combiner is agnostic to which
    /// strategies produced them; it only requires the weights to be the
    /// validated convex set. `reference` seeds the trend comparison for
    /// period 1.
    pub fn combine(&self, columns: &[(f64, Vec<Estimate>)], reference: f64) -> Vec<CombinedPoint> {
        let horizon = columns.first().map_or(0, |(_, col)| col.len());
        let mut points = Vec::with_capacity(horizon);
        let mut prev = reference;

        for i in 0..horizon {
            let value: f64 = columns.iter().map(|(w, col)| w * col[i].value).sum();

            // Band width comes from inter-predictor disagreement: the
            // weighted standard deviation of the estimates around the
            // combined point, clamped into [min, max] spread.
            let variance: f64 = columns
                .iter()
                .map(|(w, col)| w * (col[i].value - value).powi(2))
                .sum();
            let disagreement = variance.sqrt();

            let raw_fraction = if value.abs() > f64::EPSILON {
                disagreement / value.abs()
            } else {
                0.0
            };
            let fraction = raw_fraction
                .min(self.cfg.max_spread_fraction)
                .max(self.cfg.min_spread_fraction);

            let margin = fraction * value.abs();
            let trend = if value > prev + TREND_EPSILON {
                Trend::Up
            } else if value < prev - TREND_EPSILON {
                Trend::Down
            } else {
                Trend::Flat
            };

            points.push(CombinedPoint {
                value,
                lower: (value - margin).max(0.0),
                upper: value + margin,
                confidence_level: self.cfg.confidence_level,
                trend,
            });
            prev = value;
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimates(values: &[f64]) -> Vec<Estimate> {
        values
            .iter()
            .map(|&value| Estimate {
                value,
                uncertainty: 0.0,
            })
            .collect()
    }

    fn columns(rows: &[(f64, &[f64])]) -> Vec<(f64, Vec<Estimate>)> {
        rows.iter().map(|(w, v)| (*w, estimates(v))).collect()
    }

    #[test]
    fn test_convex_combination_of_agreeing_predictors() {
        let cfg = ForecastConfig::default();
        let combiner = EnsembleCombiner::new(&cfg);

        let cols = columns(&[
            (0.15, &[1000.0][..]),
            (0.30, &[1000.0][..]),
            (0.35, &[1000.0][..]),
            (0.20, &[1000.0][..]),
        ]);

        let points = combiner.combine(&cols, 900.0);
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 1000.0).abs() < 1e-9);
        // perfect agreement still carries the minimum band
        assert!((points[0].lower - 950.0).abs() < 1e-9);
        assert!((points[0].upper - 1050.0).abs() < 1e-9);
        assert_eq!(points[0].trend, Trend::Up);
    }

    #[test]
    fn test_wild_disagreement_is_capped() {
        let cfg = ForecastConfig::default();
        let combiner = EnsembleCombiner::new(&cfg);

        let cols = columns(&[
            (0.15, &[100.0][..]),
            (0.30, &[5000.0][..]),
            (0.35, &[200.0][..]),
            (0.20, &[3000.0][..]),
        ]);

        let points = combiner.combine(&cols, 0.0);
        let value = points[0].value;
        assert!((points[0].upper - value * 1.20).abs() < 1e-6);
        assert!((points[0].lower - value * 0.80).abs() < 1e-6);
    }

    #[test]
    fn test_trend_labels() {
        let cfg = ForecastConfig::default();
        let combiner = EnsembleCombiner::new(&cfg);

        let cols = columns(&[(1.0, &[100.0, 150.0, 150.0, 90.0][..])]);
        let points = combiner.combine(&cols, 100.0);
        assert_eq!(points[0].trend, Trend::Flat);
        assert_eq!(points[1].trend, Trend::Up);
        assert_eq!(points[2].trend, Trend::Flat);
        assert_eq!(points[3].trend, Trend::Down);
    }

    #[test]
    fn test_bounds_bracket_the_point() {
        let cfg = ForecastConfig::default();
        let combiner = EnsembleCombiner::new(&cfg);

        let cols = columns(&[
            (0.15, &[1800.0, 2100.0][..]),
            (0.30, &[2000.0, 2300.0][..]),
            (0.35, &[2500.0, 1900.0][..]),
            (0.20, &[2200.0, 2000.0][..]),
        ]);

        for point in combiner.combine(&cols, 2000.0) {
            assert!(point.lower <= point.value);
            assert!(point.value <= point.upper);
            assert_eq!(point.confidence_level, 0.85);
        }
    }
}
