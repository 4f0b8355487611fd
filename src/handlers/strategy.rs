use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::warn;

use crate::AppState;
use betting_strategy::data::PersistedStrategy;
use betting_strategy::error::StrategyError;
use betting_strategy::models::{StrategyRequest, StrategyResponse};
use betting_strategy::strategy::{StrategyConfig, StrategyEngine};

/// Build combinations and stakes for the posted bets
pub async fn process(
    state: web::Data<Arc<AppState>>,
    req: web::Json<StrategyRequest>,
) -> Result<HttpResponse, StrategyError> {
    let req = req.into_inner();

    let config = StrategyConfig::new(req.total_budget, req.strategy_type, req.risk_preference)
        .with_folds(req.folds)
        .with_allocation_method(req.allocation_method)
        .with_max_combinations(state.max_combinations)
        .with_max_enumeration(state.max_enumeration);

    let strategy = StrategyEngine::new(config).process(&req.bets)?;

    let warning = strategy.warning();
    if let Some(ref message) = warning {
        warn!("{}", message);
    }

    let response = StrategyResponse {
        strategy: PersistedStrategy::from_strategy(&strategy),
        summary: strategy.summary(),
        warning,
    };

    Ok(HttpResponse::Ok().json(response))
}
