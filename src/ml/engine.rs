//! Forecast orchestrator: normalizes the request, drives the four
//! predictors and the combiner across the horizon and assembles the
//! report. Stateless per request; the only shared data is the immutable
//! configuration loaded at startup.

use crate::config::ForecastConfig;
use crate::ml::ensemble::EnsembleCombiner;
use crate::ml::predictor::{
    Estimate, ExpSmoothingPredictor, MovingAveragePredictor, MultiFactorPredictor,
    PredictorInput, SeasonalPredictor, YieldPredictor,
};
use crate::models::{
    AlgorithmInfo, FactorInfo, FactorReading, ForecastReport, ForecastSummary, PointForecast,
    PredictorInfo,
};

pub struct ForecastEngine {
    cfg: ForecastConfig,
}

impl ForecastEngine {
    /// Re-checks the configuration invariants so a test-constructed
    /// engine cannot bypass them either.
    pub fn new(cfg: ForecastConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.cfg
    }

    /// Crop name as the report will carry it: trimmed, falling back to
    /// the configured default crop when absent or blank. Callers that
    /// fetch history should resolve through this first so the series
    /// lookup and the report agree.
    pub fn resolve_crop(&self, crop: Option<&str>) -> String {
        match crop {
            Some(c) if !c.trim().is_empty() => c.trim().to_string(),
            _ => self.cfg.baselines.default_crop.clone(),
        }
    }

    /// All inputs are normalized, never rejected: unknown crop falls
    /// back to the default baseline, missing or invalid `periods` to
    /// the default horizon, oversized horizons to the maximum.
    ///
    /// The period-1 trend is labeled against the last observed value
    /// when history exists; only a cold start compares against the
    /// crop baseline.
    pub fn predict(
        &self,
        crop: Option<&str>,
        periods: Option<i64>,
        series: &[f64],
        factors: &FactorReading,
    ) -> ForecastReport {
        let crop = self.resolve_crop(crop);
        let horizon = self.normalize_periods(periods);
        let baseline = self.cfg.baselines.resolve(&crop);

        let input = PredictorInput {
            series,
            factors,
            baseline,
            growth_rate: self.cfg.growth_rate,
        };

        let columns = self.run_predictors(&input, horizon as usize);

        // Trend for period 1 compares against the last known value, or
        // the crop baseline on cold start.
        let reference = series.last().copied().unwrap_or(baseline);
        let points = EnsembleCombiner::new(&self.cfg).combine(&columns, reference);

        let predictions: Vec<PointForecast> = points
            .iter()
            .enumerate()
            .map(|(i, point)| PointForecast {
                period: i as u32 + 1,
                predicted_yield: round_yield(point.value),
                confidence_lower: round_yield(point.lower),
                confidence_upper: round_yield(point.upper),
                confidence_level: point.confidence_level,
                trend: point.trend,
            })
            .collect();

        // Rounding happens after summation so per-period rounding error
        // does not compound into the totals.
        let total_raw: f64 = points.iter().map(|p| p.value).sum();
        let overall_confidence = points
            .iter()
            .map(|p| p.confidence_level)
            .sum::<f64>()
            / points.len().max(1) as f64;

        let summary = ForecastSummary {
            total_predicted_yield: round_yield(total_raw),
            average_monthly_yield: round_yield(total_raw / horizon as f64),
            overall_confidence,
            prediction_range: [
                round_yield(total_raw * (1.0 - self.cfg.range_fraction)),
                round_yield(total_raw * (1.0 + self.cfg.range_fraction)),
            ],
        };

        tracing::debug!(
            crop = %crop,
            periods = horizon,
            total = summary.total_predicted_yield,
            history_points = series.len(),
            "yield forecast computed"
        );

        ForecastReport {
            crop,
            forecast_periods: horizon,
            predictions,
            summary,
        }
    }

    fn run_predictors(
        &self,
        input: &PredictorInput<'_>,
        horizon: usize,
    ) -> Vec<(f64, Vec<Estimate>)> {
        let weights = &self.cfg.weights;
        let ma = MovingAveragePredictor {
            window: self.cfg.ma_window,
        };
        let es = ExpSmoothingPredictor {
            alpha: self.cfg.smoothing_alpha,
            beta: self.cfg.trend_beta,
        };
        let seasonal = SeasonalPredictor {
            cycle: self.cfg.season_length,
        };
        let multi_factor = MultiFactorPredictor {
            ranges: self.cfg.factors.clone(),
        };

        vec![
            (weights.moving_average, ma.forecast(input, horizon)),
            (weights.exponential_smoothing, es.forecast(input, horizon)),
            (weights.seasonal, seasonal.forecast(input, horizon)),
            (weights.multi_factor, multi_factor.forecast(input, horizon)),
        ]
    }

    fn normalize_periods(&self, periods: Option<i64>) -> u32 {
        match periods {
            Some(p) if p >= 1 => (p as u64).min(self.cfg.max_periods as u64) as u32,
            _ => self.cfg.default_periods,
        }
    }

    /// Static self-description built from the live configuration, so it
    /// always matches what the combiner actually does.
    pub fn algorithm_info(&self) -> AlgorithmInfo {
        let weights = &self.cfg.weights;
        let factors = &self.cfg.factors;
        AlgorithmInfo {
            name: "Ensemble Forecasting".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description:
                "Weighted combination of four forecasting strategies for crop yield".into(),
            components: vec![
                PredictorInfo {
                    name: "移动平均预测器".into(),
                    kind: "MovingAveragePredictor".into(),
                    weight: weights.moving_average,
                    description: "基于近期数据的算术平均，适用于短期预测".into(),
                },
                PredictorInfo {
                    name: "指数平滑预测器".into(),
                    kind: "ExpSmoothingPredictor".into(),
                    weight: weights.exponential_smoothing,
                    description: "对近期数据赋予更高权重，捕捉趋势变化".into(),
                },
                PredictorInfo {
                    name: "季节性预测器".into(),
                    kind: "SeasonalPredictor".into(),
                    weight: weights.seasonal,
                    description: "识别并利用农业生产的季节性规律".into(),
                },
                PredictorInfo {
                    name: "多因素预测器".into(),
                    kind: "MultiFactorPredictor".into(),
                    weight: weights.multi_factor,
                    description: "综合考虑温度、降雨、施肥等环境因素".into(),
                },
            ],
            factors_considered: vec![
                FactorInfo {
                    name: "temperature".into(),
                    description: "环境温度".into(),
                    optimal_range: [factors.temperature.min, factors.temperature.max],
                    unit: "°C".into(),
                },
                FactorInfo {
                    name: "rainfall".into(),
                    description: "月降雨量".into(),
                    optimal_range: [factors.rainfall.min, factors.rainfall.max],
                    unit: "mm".into(),
                },
                FactorInfo {
                    name: "fertilizer".into(),
                    description: "施肥量".into(),
                    optimal_range: [factors.fertilizer.min, factors.fertilizer.max],
                    unit: "kg/亩".into(),
                },
                FactorInfo {
                    name: "soil_ph".into(),
                    description: "土壤酸碱度".into(),
                    optimal_range: [factors.soil_ph.min, factors.soil_ph.max],
                    unit: "pH".into(),
                },
                FactorInfo {
                    name: "sunshine".into(),
                    description: "日照时长".into(),
                    optimal_range: [factors.sunshine.min, factors.sunshine.max],
                    unit: "小时/天".into(),
                },
            ],
            confidence_level: self.cfg.confidence_level,
        }
    }
}

/// Displayed yields round to the nearest integer, half away from zero.
fn round_yield(value: f64) -> i64 {
    value.round() as i64
}
