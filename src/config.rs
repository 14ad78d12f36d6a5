use std::collections::BTreeMap;

use serde::Deserialize;

/// Tolerance for the ensemble weight sum invariant.
pub const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Fixed contribution of each predictor to the combined estimate.
/// Must sum to 1.0; checked once at startup, immutable afterwards.
#[derive(Debug, Deserialize, Clone)]
pub struct PredictorWeights {
    pub moving_average: f64,
    pub exponential_smoothing: f64,
    pub seasonal: f64,
    pub multi_factor: f64,
}

impl Default for PredictorWeights {
    fn default() -> Self {
        // Seasonal carries the most weight: agricultural yield is
        // strongly cyclical by growth stage.
        Self {
            moving_average: 0.15,
            exponential_smoothing: 0.30,
            seasonal: 0.35,
            multi_factor: 0.20,
        }
    }
}

impl PredictorWeights {
    pub fn sum(&self) -> f64 {
        self.moving_average + self.exponential_smoothing + self.seasonal + self.multi_factor
    }
}

/// Inclusive range considered ideal for one environmental factor.
/// `decay` is the distance outside the range at which favorability
/// reaches zero.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct OptimalRange {
    pub min: f64,
    pub max: f64,
    pub decay: f64,
}

impl OptimalRange {
    const fn new(min: f64, max: f64, decay: f64) -> Self {
        Self { min, max, decay }
    }

    /// Favorability in [0, 1]: 1 inside the range, decaying linearly
    /// to 0 at `decay` outside it.
    pub fn score(&self, value: f64) -> f64 {
        let distance = if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            return 1.0;
        };
        (1.0 - distance / self.decay).max(0.0)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FactorRanges {
    #[serde(default = "default_temperature_range")]
    pub temperature: OptimalRange,
    #[serde(default = "default_rainfall_range")]
    pub rainfall: OptimalRange,
    #[serde(default = "default_fertilizer_range")]
    pub fertilizer: OptimalRange,
    #[serde(default = "default_soil_ph_range")]
    pub soil_ph: OptimalRange,
    #[serde(default = "default_sunshine_range")]
    pub sunshine: OptimalRange,
}

fn default_temperature_range() -> OptimalRange {
    OptimalRange::new(20.0, 30.0, 15.0)
}
fn default_rainfall_range() -> OptimalRange {
    OptimalRange::new(100.0, 200.0, 150.0)
}
fn default_fertilizer_range() -> OptimalRange {
    OptimalRange::new(40.0, 60.0, 40.0)
}
fn default_soil_ph_range() -> OptimalRange {
    OptimalRange::new(6.0, 7.0, 2.0)
}
fn default_sunshine_range() -> OptimalRange {
    OptimalRange::new(6.0, 10.0, 6.0)
}

impl Default for FactorRanges {
    fn default() -> Self {
        Self {
            temperature: default_temperature_range(),
            rainfall: default_rainfall_range(),
            fertilizer: default_fertilizer_range(),
            soil_ph: default_soil_ph_range(),
            sunshine: default_sunshine_range(),
        }
    }
}

/// Default yield per crop, used when no historical series is available.
#[derive(Debug, Deserialize, Clone)]
pub struct CropBaselines {
    #[serde(default = "default_crop_table")]
    pub crops: BTreeMap<String, f64>,
    /// Applied to crops absent from the table; missing-crop is an
    /// expected condition, never an error.
    #[serde(default = "default_fallback_yield")]
    pub fallback: f64,
    #[serde(default = "default_crop")]
    pub default_crop: String,
}

fn default_crop_table() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("水稻".to_string(), 2200.0),
        ("玉米".to_string(), 1800.0),
        ("蔬菜".to_string(), 800.0),
        ("小麦".to_string(), 1500.0),
    ])
}

fn default_fallback_yield() -> f64 {
    2000.0
}

fn default_crop() -> String {
    "水稻".into()
}

impl Default for CropBaselines {
    fn default() -> Self {
        Self {
            crops: default_crop_table(),
            fallback: default_fallback_yield(),
            default_crop: default_crop(),
        }
    }
}

impl CropBaselines {
    pub fn resolve(&self, crop: &str) -> f64 {
        self.crops.get(crop).copied().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    #[serde(default)]
    pub weights: PredictorWeights,
    #[serde(default)]
    pub baselines: CropBaselines,
    #[serde(default)]
    pub factors: FactorRanges,
    /// Horizon substituted when `periods` is absent or invalid.
    #[serde(default = "default_periods")]
    pub default_periods: u32,
    /// Requested horizons above this are clamped, not rejected.
    #[serde(default = "default_max_periods")]
    pub max_periods: u32,
    /// Calibrated ensemble confidence, fixed per period.
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    #[serde(default = "default_min_spread")]
    pub min_spread_fraction: f64,
    #[serde(default = "default_max_spread")]
    pub max_spread_fraction: f64,
    /// Outer bound on the summary total, distinct from per-period bands.
    #[serde(default = "default_range_fraction")]
    pub range_fraction: f64,
    /// Per-period growth assumed for the cold-start baseline curve.
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,
    #[serde(default = "default_alpha")]
    pub smoothing_alpha: f64,
    #[serde(default = "default_beta")]
    pub trend_beta: f64,
    /// Periods per seasonal cycle (12 for monthly data).
    #[serde(default = "default_season_length")]
    pub season_length: usize,
}

fn default_periods() -> u32 {
    3
}
fn default_max_periods() -> u32 {
    12
}
fn default_confidence_level() -> f64 {
    0.85
}
fn default_min_spread() -> f64 {
    0.05
}
fn default_max_spread() -> f64 {
    0.20
}
fn default_range_fraction() -> f64 {
    0.10
}
fn default_growth_rate() -> f64 {
    0.05
}
fn default_ma_window() -> usize {
    3
}
fn default_alpha() -> f64 {
    0.3
}
fn default_beta() -> f64 {
    0.1
}
fn default_season_length() -> usize {
    12
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            weights: PredictorWeights::default(),
            baselines: CropBaselines::default(),
            factors: FactorRanges::default(),
            default_periods: default_periods(),
            max_periods: default_max_periods(),
            confidence_level: default_confidence_level(),
            min_spread_fraction: default_min_spread(),
            max_spread_fraction: default_max_spread(),
            range_fraction: default_range_fraction(),
            growth_rate: default_growth_rate(),
            ma_window: default_ma_window(),
            smoothing_alpha: default_alpha(),
            trend_beta: default_beta(),
            season_length: default_season_length(),
        }
    }
}

impl ForecastConfig {
    /// Startup invariants. A violation here is fatal: the combiner must
    /// never run with a non-convex weight set or a malformed range.
    pub fn validate(&self) -> anyhow::Result<()> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            anyhow::bail!("predictor weights must sum to 1.0, got {sum}");
        }
        for (name, w) in [
            ("moving_average", self.weights.moving_average),
            ("exponential_smoothing", self.weights.exponential_smoothing),
            ("seasonal", self.weights.seasonal),
            ("multi_factor", self.weights.multi_factor),
        ] {
            if w <= 0.0 || w > 1.0 {
                anyhow::bail!("weight '{name}' must be in (0, 1], got {w}");
            }
        }
        for (name, range) in [
            ("temperature", &self.factors.temperature),
            ("rainfall", &self.factors.rainfall),
            ("fertilizer", &self.factors.fertilizer),
            ("soil_ph", &self.factors.soil_ph),
            ("sunshine", &self.factors.sunshine),
        ] {
            if range.min > range.max {
                anyhow::bail!(
                    "optimal range for '{name}' is inverted: {} > {}",
                    range.min,
                    range.max
                );
            }
            if range.decay <= 0.0 {
                anyhow::bail!("decay for '{name}' must be positive, got {}", range.decay);
            }
        }
        if self.max_periods == 0 {
            anyhow::bail!("max_periods must be at least 1");
        }
        if self.default_periods == 0 || self.default_periods > self.max_periods {
            anyhow::bail!(
                "default_periods must be in [1, {}], got {}",
                self.max_periods,
                self.default_periods
            );
        }
        if self.min_spread_fraction < 0.0 || self.max_spread_fraction < self.min_spread_fraction {
            anyhow::bail!("spread fractions must satisfy 0 <= min <= max");
        }
        if !(0.0..=1.0).contains(&self.confidence_level) {
            anyhow::bail!(
                "confidence_level must be in [0, 1], got {}",
                self.confidence_level
            );
        }
        if self.ma_window == 0 || self.season_length == 0 {
            anyhow::bail!("ma_window and season_length must be at least 1");
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("AGROMIND").separator("__"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.forecast.validate()?;
        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_convex() {
        let cfg = ForecastConfig::default();
        assert!((cfg.weights.sum() - 1.0).abs() <= WEIGHT_EPSILON);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_bad_weight_sum_rejected() {
        let mut cfg = ForecastConfig::default();
        cfg.weights.seasonal = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut cfg = ForecastConfig::default();
        cfg.factors.soil_ph = OptimalRange::new(7.0, 6.0, 2.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_score_inside_and_outside_range() {
        let range = OptimalRange::new(20.0, 30.0, 15.0);
        assert_eq!(range.score(25.0), 1.0);
        assert_eq!(range.score(20.0), 1.0);
        assert_eq!(range.score(30.0), 1.0);
        // 7.5 below the range: halfway to the decay distance
        assert!((range.score(12.5) - 0.5).abs() < 1e-12);
        // far outside clips at zero
        assert_eq!(range.score(-40.0), 0.0);
    }

    #[test]
    fn test_unknown_crop_uses_fallback() {
        let baselines = CropBaselines::default();
        assert_eq!(baselines.resolve("榴莲"), 2000.0);
        assert_eq!(baselines.resolve("水稻"), 2200.0);
    }
}
