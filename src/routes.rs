// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;

use log::info;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::forecast::post_forecast;
use crate::services::engine::ForecastEngine;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status();
        message = api_error.message.clone();
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        // malformed request body fails only that call
        code = warp::http::StatusCode::BAD_REQUEST;
        message = body_error.to_string();
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    engine: Arc<ForecastEngine>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let engine_filter = warp::any().map(move || engine.clone());

    // Route path matches what the backend consumer already calls.
    let forecast_route = warp::path!("monthly_expense_prediction")
        .and(warp::post())
        .and(warp::body::json())
        .and(engine_filter)
        .and_then(post_forecast);

    info!("All routes configured successfully.");

    forecast_route.recover(handle_rejection)
}
