// src/handlers/forecast.rs
use log::{debug, error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::models::{ExogenousInput, ForecastResponse};
use crate::services::engine::ForecastEngine;
use crate::services::sarimax::ModelError;

pub async fn post_forecast(
    input: ExogenousInput,
    engine: Arc<ForecastEngine>,
) -> Result<Json, Rejection> {
    info!("Handling monthly expense prediction request");
    debug!("Exogenous input: {:?}", input);

    let forecasted_expense = engine.forecast(&input).map_err(|e| match e {
        ModelError::NonFiniteInput => {
            error!("Rejecting forecast request: {}", e);
            warp::reject::custom(ApiError::invalid_input(e.to_string()))
        }
        _ => {
            error!("Forecast failed: {}", e);
            warp::reject::custom(ApiError::model_error(e.to_string()))
        }
    })?;

    debug!("Forecasted expense: {}", forecasted_expense);
    Ok(warp::reply::json(&ForecastResponse { forecasted_expense }))
}
