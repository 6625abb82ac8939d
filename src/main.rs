use dotenv::dotenv;
use log::{error, info, warn};
use warp::Filter;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use wealthmate_forecast::routes;
use wealthmate_forecast::services::engine::ForecastEngine;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize the logger
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let history_path = env::var("HISTORY_CSV").unwrap_or_else(|_| {
        warn!("$HISTORY_CSV not set, defaulting to data/history.csv");
        "data/history.csv".to_string()
    });

    // The history is loaded and the model fit exactly once, before any
    // request is served. A malformed dataset is a fatal start-up error.
    let engine = match ForecastEngine::from_csv_path(&PathBuf::from(&history_path)) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Failed to initialize forecast engine: {:#}", e);
            std::process::exit(1);
        }
    };

    let port_str = env::var("PORT").unwrap_or_else(|_| {
        warn!("$PORT not set, defaulting to 3030");
        "3030".to_string()
    });
    let port: u16 = port_str.parse().expect("PORT must be a number");
    info!("Using PORT: {}", port);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!("Will bind to: {}", addr);

    // Set up CORS
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(engine).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
}
