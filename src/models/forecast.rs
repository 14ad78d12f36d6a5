use serde::{Deserialize, Deserializer, Serialize};

use crate::models::FactorReading;

/// Direction of the point estimate relative to the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// One forecast period. Yields are integers by contract; rounding is
/// half away from zero, applied at the edge of the engine only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointForecast {
    pub period: u32,
    pub predicted_yield: i64,
    pub confidence_lower: i64,
    pub confidence_upper: i64,
    pub confidence_level: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub total_predicted_yield: i64,
    pub average_monthly_yield: i64,
    pub overall_confidence: f64,
    pub prediction_range: [i64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub crop: String,
    pub forecast_periods: u32,
    pub predictions: Vec<PointForecast>,
    pub summary: ForecastSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictorInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorInfo {
    pub name: String,
    pub description: String,
    pub optimal_range: [f64; 2],
    pub unit: String,
}

/// Self-description of the live engine configuration. Built from the
/// same struct the combiner reads, so it cannot drift from behavior.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub components: Vec<PredictorInfo>,
    pub factors_considered: Vec<FactorInfo>,
    pub confidence_level: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQueryParams {
    pub crop: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub periods: Option<i64>,
}

/// `crops` is a comma-separated list of crop names.
#[derive(Debug, Default, Deserialize)]
pub struct CompareQueryParams {
    pub crops: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub periods: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastRequest {
    pub crop: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub periods: Option<i64>,
    pub factors: Option<FactorReading>,
}

/// The predict contract never rejects a bad `periods`: anything that
/// does not parse as an integer is treated as absent and replaced by
/// the default horizon downstream.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    }))
}
