pub mod forecasts;
pub mod health;

use std::sync::Arc;

use crate::data::YieldHistoryProvider;
use crate::ml::engine::ForecastEngine;

/// Shared application state available to all handlers. Everything here
/// is immutable after startup, so parallel requests need no locking.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ForecastEngine>,
    pub history: Arc<dyn YieldHistoryProvider>,
}
