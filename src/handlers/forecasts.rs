use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{
    AlgorithmInfo, CompareQueryParams, FactorReading, ForecastQueryParams, ForecastReport,
    ForecastRequest, YieldRecord,
};

/// GET /api/v1/forecast/predict?crop=水稻&periods=3
///
/// Always answers: unknown crops and bad `periods` are normalized by
/// the engine, never rejected.
pub async fn predict(
    State(state): State<AppState>,
    Query(params): Query<ForecastQueryParams>,
) -> Json<ForecastReport> {
    // resolve once so the history lookup and the report use the same name
    let crop = state.engine.resolve_crop(params.crop.as_deref());
    let series = state.history.series(&crop);

    Json(
        state
            .engine
            .predict(Some(&crop), params.periods, &series, &FactorReading::new()),
    )
}

/// POST /api/v1/forecast/predict — same contract as GET, plus optional
/// current environmental readings in the body.
pub async fn predict_with_factors(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Json<ForecastReport> {
    let crop = state.engine.resolve_crop(request.crop.as_deref());
    let series = state.history.series(&crop);
    let factors = request.factors.unwrap_or_default();

    Json(
        state
            .engine
            .predict(Some(&crop), request.periods, &series, &factors),
    )
}

/// GET /api/v1/forecast/compare?crops=水稻,玉米&periods=3
///
/// One report per requested crop, keyed by crop name, for side-by-side
/// comparison. Crop handling is as lenient as `predict`: unknown names
/// fall back to the baseline, an empty list to the default crop.
pub async fn compare(
    State(state): State<AppState>,
    Query(params): Query<CompareQueryParams>,
) -> Json<BTreeMap<String, ForecastReport>> {
    let mut crops: Vec<String> = params
        .crops
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if crops.is_empty() {
        crops.push(state.engine.config().baselines.default_crop.clone());
    }

    let mut results = BTreeMap::new();
    for crop in crops {
        let series = state.history.series(&crop);
        let report = state
            .engine
            .predict(Some(&crop), params.periods, &series, &FactorReading::new());
        results.insert(crop, report);
    }
    Json(results)
}

/// GET /api/v1/forecast/algorithm/info
pub async fn algorithm_info(State(state): State<AppState>) -> Json<AlgorithmInfo> {
    Json(state.engine.algorithm_info())
}

/// GET /api/v1/forecast/history/:crop
pub async fn history(
    State(state): State<AppState>,
    Path(crop): Path<String>,
) -> Result<Json<Vec<YieldRecord>>, AppError> {
    let records = state.history.records(&crop);
    if records.is_empty() {
        return Err(AppError::not_found("historical data for crop", &crop));
    }
    Ok(Json(records))
}
