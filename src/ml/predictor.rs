//! The four forecasting strategies behind the yield ensemble. Each is a
//! pure function of its inputs: same series, factors and horizon always
//! produce the same estimates.

use crate::config::FactorRanges;
use crate::models::FactorReading;

/// Point estimate plus an uncertainty signal for one future period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub value: f64,
    pub uncertainty: f64,
}

/// Request-scoped inputs shared by every predictor.
pub struct PredictorInput<'a> {
    /// Chronological yield series; may be empty (cold start).
    pub series: &'a [f64],
    pub factors: &'a FactorReading,
    /// Resolved crop baseline yield.
    pub baseline: f64,
    /// Per-period growth assumed when no history exists.
    pub growth_rate: f64,
}

impl PredictorInput<'_> {
    /// Cold-start fallback: baseline growing by `growth_rate` per period.
    /// Every predictor anchors on this curve when the series is empty.
    pub fn baseline_curve(&self, period: usize) -> f64 {
        self.baseline * (1.0 + self.growth_rate * period as f64)
    }

    pub fn series_mean(&self) -> Option<f64> {
        if self.series.is_empty() {
            None
        } else {
            Some(self.series.iter().sum::<f64>() / self.series.len() as f64)
        }
    }
}

pub trait YieldPredictor {
    /// Estimates for periods 1..=horizon.
    fn forecast(&self, input: &PredictorInput<'_>, horizon: usize) -> Vec<Estimate>;
}

fn cold_start(input: &PredictorInput<'_>, horizon: usize) -> Vec<Estimate> {
    (1..=horizon)
        .map(|h| Estimate {
            value: input.baseline_curve(h),
            uncertainty: 0.0,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Arithmetic mean of the last `window` values. Predicted values are
/// appended to the working window, so periods beyond the history
/// average over the extended series.
pub struct MovingAveragePredictor {
    pub window: usize,
}

impl YieldPredictor for MovingAveragePredictor {
    fn forecast(&self, input: &PredictorInput<'_>, horizon: usize) -> Vec<Estimate> {
        if input.series.is_empty() {
            return cold_start(input, horizon);
        }

        let mut working = input.series.to_vec();
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let take = self.window.min(working.len());
            let tail = &working[working.len() - take..];
            let ma = mean(tail);
            out.push(Estimate {
                value: ma,
                uncertainty: sample_std(tail),
            });
            working.push(ma);
        }
        out
    }
}

/// Holt's linear smoothing: level updated with `alpha`, trend with
/// `beta`; future periods carry the final level forward along the
/// trend. Reacts faster to recent shifts than the moving average.
pub struct ExpSmoothingPredictor {
    pub alpha: f64,
    pub beta: f64,
}

impl YieldPredictor for ExpSmoothingPredictor {
    fn forecast(&self, input: &PredictorInput<'_>, horizon: usize) -> Vec<Estimate> {
        if input.series.is_empty() {
            return cold_start(input, horizon);
        }

        let mut level = input.series[0];
        let mut trend = if input.series.len() > 1 {
            input.series[1] - input.series[0]
        } else {
            0.0
        };

        for &y in &input.series[1..] {
            let prev = level;
            level = self.alpha * y + (1.0 - self.alpha) * (prev + trend);
            trend = self.beta * (level - prev) + (1.0 - self.beta) * trend;
        }

        (1..=horizon)
            .map(|h| Estimate {
                // yield cannot go negative
                value: (level + h as f64 * trend).max(0.0),
                uncertainty: trend.abs() * h as f64,
            })
            .collect()
    }
}

/// Seasonal decomposition over a fixed cycle: per-phase index = value at
/// that phase / cycle mean, indices normalized to mean 1. Needs at
/// least one full cycle of history; degrades to a neutral index over
/// the series mean otherwise.
pub struct SeasonalPredictor {
    pub cycle: usize,
}

impl YieldPredictor for SeasonalPredictor {
    fn forecast(&self, input: &PredictorInput<'_>, horizon: usize) -> Vec<Estimate> {
        if input.series.is_empty() {
            return cold_start(input, horizon);
        }

        let n = input.series.len();
        let anchor = mean(input.series);

        if n < self.cycle || anchor.abs() < f64::EPSILON {
            // insufficient history for meaningful indices
            return (1..=horizon)
                .map(|_| Estimate {
                    value: anchor.max(0.0),
                    uncertainty: 0.0,
                })
                .collect();
        }

        let mut phase_ratios: Vec<Vec<f64>> = vec![Vec::new(); self.cycle];
        for (i, &y) in input.series.iter().enumerate() {
            phase_ratios[i % self.cycle].push(y / anchor);
        }

        let mut indices: Vec<f64> = phase_ratios
            .iter()
            .map(|ratios| if ratios.is_empty() { 1.0 } else { mean(ratios) })
            .collect();

        // normalize so the indices average to 1 across the cycle
        let index_mean = mean(&indices);
        if index_mean.abs() > f64::EPSILON {
            for idx in &mut indices {
                *idx /= index_mean;
            }
        }

        (1..=horizon)
            .map(|h| {
                let phase = (n + h - 1) % self.cycle;
                Estimate {
                    value: (anchor * indices[phase]).max(0.0),
                    uncertainty: anchor * sample_std(&phase_ratios[phase]),
                }
            })
            .collect()
    }
}

/// Scores the current environmental readings against their optimal
/// ranges and scales the baseline accordingly: full baseline at score 1,
/// half baseline when every factor is maximally unfavorable. Missing
/// factors are excluded from the mean, not defaulted to zero.
pub struct MultiFactorPredictor {
    pub ranges: FactorRanges,
}

impl MultiFactorPredictor {
    /// Mean favorability over the factors actually present; `None` when
    /// the reading is empty.
    pub fn aggregate_score(&self, factors: &FactorReading) -> Option<f64> {
        let pairs = [
            (factors.temperature, &self.ranges.temperature),
            (factors.rainfall, &self.ranges.rainfall),
            (factors.fertilizer, &self.ranges.fertilizer),
            (factors.soil_ph, &self.ranges.soil_ph),
            (factors.sunshine, &self.ranges.sunshine),
        ];

        let scores: Vec<f64> = pairs
            .iter()
            .filter_map(|(reading, range)| reading.map(|v| range.score(v)))
            .collect();

        if scores.is_empty() {
            None
        } else {
            Some(mean(&scores))
        }
    }
}

impl YieldPredictor for MultiFactorPredictor {
    fn forecast(&self, input: &PredictorInput<'_>, horizon: usize) -> Vec<Estimate> {
        // no readings at all reads as neutral conditions
        let score = self.aggregate_score(input.factors).unwrap_or(1.0);
        let history_mean = input.series_mean();

        (1..=horizon)
            .map(|h| {
                let anchor = history_mean.unwrap_or_else(|| input.baseline_curve(h));
                Estimate {
                    value: anchor * (0.5 + 0.5 * score),
                    uncertainty: anchor * 0.5 * (1.0 - score),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(series: &'a [f64], factors: &'a FactorReading) -> PredictorInput<'a> {
        PredictorInput {
            series,
            factors,
            baseline: 2200.0,
            growth_rate: 0.05,
        }
    }

    #[test]
    fn test_cold_start_follows_baseline_curve() {
        let factors = FactorReading::new();
        let inp = input(&[], &factors);
        let predictor = MovingAveragePredictor { window: 3 };

        let estimates = predictor.forecast(&inp, 3);
        assert_eq!(estimates.len(), 3);
        assert!((estimates[0].value - 2310.0).abs() < 1e-9);
        assert!((estimates[1].value - 2420.0).abs() < 1e-9);
        assert!((estimates[2].value - 2530.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_extends_window() {
        let factors = FactorReading::new();
        let series = [100.0, 110.0, 120.0];
        let inp = input(&series, &factors);
        let predictor = MovingAveragePredictor { window: 3 };

        let estimates = predictor.forecast(&inp, 2);
        assert!((estimates[0].value - 110.0).abs() < 1e-9);
        // second period averages over [110, 120, 110]
        assert!((estimates[1].value - (110.0 + 120.0 + 110.0) / 3.0).abs() < 1e-9);
        assert!(estimates[0].uncertainty > 0.0);
    }

    #[test]
    fn test_moving_average_stable_series_has_zero_uncertainty() {
        let factors = FactorReading::new();
        let series = [500.0; 6];
        let inp = input(&series, &factors);
        let predictor = MovingAveragePredictor { window: 3 };

        let estimates = predictor.forecast(&inp, 1);
        assert_eq!(estimates[0].value, 500.0);
        assert_eq!(estimates[0].uncertainty, 0.0);
    }

    #[test]
    fn test_exp_smoothing_follows_trend() {
        let factors = FactorReading::new();
        let series: Vec<f64> = (0..12).map(|i| 1000.0 + 50.0 * i as f64).collect();
        let inp = input(&series, &factors);
        let predictor = ExpSmoothingPredictor {
            alpha: 0.3,
            beta: 0.1,
        };

        let estimates = predictor.forecast(&inp, 3);
        // a linearly rising series keeps rising
        assert!(estimates[0].value > series[series.len() - 1] * 0.9);
        assert!(estimates[1].value > estimates[0].value);
        assert!(estimates[2].value > estimates[1].value);
    }

    #[test]
    fn test_exp_smoothing_never_negative() {
        let factors = FactorReading::new();
        let series = [500.0, 300.0, 100.0, 20.0];
        let inp = input(&series, &factors);
        let predictor = ExpSmoothingPredictor {
            alpha: 0.3,
            beta: 0.1,
        };

        for estimate in predictor.forecast(&inp, 12) {
            assert!(estimate.value >= 0.0);
        }
    }

    #[test]
    fn test_seasonal_short_history_is_neutral() {
        let factors = FactorReading::new();
        let series = [800.0, 1200.0];
        let inp = input(&series, &factors);
        let predictor = SeasonalPredictor { cycle: 12 };

        let estimates = predictor.forecast(&inp, 4);
        for estimate in estimates {
            assert!((estimate.value - 1000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_seasonal_indices_repeat_the_cycle() {
        let factors = FactorReading::new();
        // two identical cycles of length 4
        let series = [100.0, 200.0, 300.0, 400.0, 100.0, 200.0, 300.0, 400.0];
        let inp = input(&series, &factors);
        let predictor = SeasonalPredictor { cycle: 4 };

        let estimates = predictor.forecast(&inp, 4);
        assert!((estimates[0].value - 100.0).abs() < 1e-6);
        assert!((estimates[1].value - 200.0).abs() < 1e-6);
        assert!((estimates[2].value - 300.0).abs() < 1e-6);
        assert!((estimates[3].value - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_multi_factor_neutral_without_readings() {
        let factors = FactorReading::new();
        let series = [1000.0, 1000.0];
        let inp = input(&series, &factors);
        let predictor = MultiFactorPredictor {
            ranges: FactorRanges::default(),
        };

        let estimates = predictor.forecast(&inp, 2);
        assert_eq!(estimates[0].value, 1000.0);
        assert_eq!(estimates[0].uncertainty, 0.0);
    }

    #[test]
    fn test_multi_factor_unfavorable_conditions_halve_baseline() {
        let factors = FactorReading {
            temperature: Some(-40.0),
            rainfall: Some(900.0),
            ..FactorReading::new()
        };
        let series = [1000.0];
        let inp = input(&series, &factors);
        let predictor = MultiFactorPredictor {
            ranges: FactorRanges::default(),
        };

        let estimates = predictor.forecast(&inp, 1);
        assert!((estimates[0].value - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_factor_ignores_missing_factors() {
        let predictor = MultiFactorPredictor {
            ranges: FactorRanges::default(),
        };
        let factors = FactorReading {
            temperature: Some(25.0),
            soil_ph: Some(6.5),
            ..FactorReading::new()
        };
        // both present factors are optimal, absent ones do not dilute
        assert_eq!(predictor.aggregate_score(&factors), Some(1.0));
        assert_eq!(predictor.aggregate_score(&FactorReading::new()), None);
    }
}
