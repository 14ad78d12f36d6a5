//! Factor & Series Provider seam. The forecasting engine never persists
//! anything itself; history arrives through this trait, here backed by
//! a deterministic in-memory generator until real field telemetry is
//! wired in.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{FactorReading, YieldRecord};

pub trait YieldHistoryProvider: Send + Sync {
    /// Chronological records for one crop; empty for unknown crops.
    fn records(&self, crop: &str) -> Vec<YieldRecord>;

    /// Just the yield values, in chronological order.
    fn series(&self, crop: &str) -> Vec<f64> {
        self.records(crop)
            .iter()
            .map(|r| r.yield_value)
            .collect()
    }
}

/// Synthetic monthly history: seasonal shape per crop, mild seeded
/// noise, plus plausible environmental factor columns. Seeded so every
/// process start serves the same series.
pub struct MockHistoryProvider {
    by_crop: BTreeMap<String, Vec<YieldRecord>>,
}

const SEED: u64 = 42;
const MONTHS: u32 = 24;

/// Relative monthly output per crop (zero = out of season).
const SEASONAL_SHAPE: &[(&str, f64, [f64; 12])] = &[
    (
        "水稻",
        2200.0,
        [0.0, 0.0, 0.5, 0.8, 1.0, 1.2, 0.0, 0.0, 1.3, 1.5, 0.3, 0.0],
    ),
    (
        "玉米",
        1800.0,
        [0.0, 0.0, 0.0, 0.0, 0.6, 1.0, 1.3, 1.5, 0.8, 0.0, 0.0, 0.0],
    ),
    (
        "蔬菜",
        800.0,
        [0.6, 0.7, 0.9, 1.0, 1.1, 0.8, 0.5, 0.4, 0.8, 1.0, 0.9, 0.7],
    ),
];

impl MockHistoryProvider {
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut by_crop: BTreeMap<String, Vec<YieldRecord>> = BTreeMap::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid start date");

        for month in 0..MONTHS {
            let date = start + Months::new(month);
            let month_idx = (date.month0()) as usize;

            for (crop, base, shape) in SEASONAL_SHAPE {
                let seasonal = shape[month_idx];
                if seasonal <= 0.0 {
                    continue;
                }

                let noise: f64 = rng.gen_range(-0.1..0.1);
                let yield_value = (base * seasonal * (1.0 + noise)).max(0.0).round();
                let phase = month_idx as f64 * std::f64::consts::PI / 6.0;

                by_crop.entry(crop.to_string()).or_default().push(YieldRecord {
                    date: date.format("%Y-%m").to_string(),
                    crop: crop.to_string(),
                    yield_value,
                    area: [3.0, 5.0, 8.0][rng.gen_range(0..3usize)],
                    factors: FactorReading {
                        temperature: Some(20.0 + 10.0 * phase.sin() + rng.gen_range(-2.0..2.0)),
                        rainfall: Some(100.0 + 50.0 * phase.cos() + rng.gen_range(-20.0..20.0)),
                        fertilizer: Some(40.0 + rng.gen_range(-10.0..10.0)),
                        soil_ph: Some(6.5 + rng.gen_range(-0.3..0.3)),
                        sunshine: Some(6.0 + 3.0 * phase.sin() + rng.gen_range(-1.0..1.0)),
                    },
                });
            }
        }

        Self { by_crop }
    }
}

impl Default for MockHistoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YieldHistoryProvider for MockHistoryProvider {
    fn records(&self, crop: &str) -> Vec<YieldRecord> {
        self.by_crop.get(crop).cloned().unwrap_or_default()
    }
}
