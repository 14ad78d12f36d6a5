use serde::{Deserialize, Serialize};

/// Current environmental readings for a plot. All factors are optional:
/// a partially populated reading is still usable, missing factors are
/// simply excluded from favorability scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorReading {
    pub temperature: Option<f64>,
    pub rainfall: Option<f64>,
    pub fertilizer: Option<f64>,
    pub soil_ph: Option<f64>,
    pub sunshine: Option<f64>,
}

impl FactorReading {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One observed harvest period for a crop, as supplied by the history
/// provider. Insertion order is chronological order.
#[derive(Debug, Clone, Serialize)]
pub struct YieldRecord {
    /// Month label, `YYYY-MM`.
    pub date: String,
    pub crop: String,
    #[serde(rename = "yield")]
    pub yield_value: f64,
    /// Planted area in mu.
    pub area: f64,
    #[serde(flatten)]
    pub factors: FactorReading,
}
