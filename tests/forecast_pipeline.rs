// End-to-end coverage of the forecasting pipeline: bundled CSV in,
// prepared history, one-time fit, concurrent predictions out.
use std::path::Path;
use std::sync::Arc;
use std::thread;

use wealthmate_forecast::models::ExogenousInput;
use wealthmate_forecast::services::dataprep;
use wealthmate_forecast::services::engine::ForecastEngine;

fn bundled_history() -> Vec<wealthmate_forecast::models::HistoricalRecord> {
    dataprep::load_history(Path::new("data/history.csv")).expect("bundled dataset is well formed")
}

#[test]
fn csv_to_forecast_end_to_end() {
    let history = bundled_history();
    assert_eq!(history.len(), 36);

    let engine = ForecastEngine::new(history).unwrap();
    let forecast = engine
        .forecast(&ExogenousInput::new(10_000_000.0, 5.0, 3.0, 0.0))
        .unwrap();

    assert!(forecast.is_finite());
    assert!(forecast > 0.0);
}

#[test]
fn repeated_predictions_match() {
    let engine = ForecastEngine::new(bundled_history()).unwrap();
    let input = ExogenousInput::new(14_000_000.0, 4.5, 3.2, 1.0);
    assert_eq!(
        engine.forecast(&input).unwrap(),
        engine.forecast(&input).unwrap()
    );
}

#[test]
fn concurrent_predictions_do_not_cross_contaminate() {
    let engine = Arc::new(ForecastEngine::new(bundled_history()).unwrap());

    let inputs: Vec<ExogenousInput> = (0..8)
        .map(|i| {
            ExogenousInput::new(
                9_000_000.0 + 1_000_000.0 * i as f64,
                4.0 + 0.25 * i as f64,
                2.5 + 0.2 * i as f64,
                (i % 2) as f64,
            )
        })
        .collect();

    let serial: Vec<f64> = inputs
        .iter()
        .map(|input| engine.forecast(input).unwrap())
        .collect();

    let handles: Vec<_> = inputs
        .iter()
        .cloned()
        .map(|input| {
            let engine = engine.clone();
            thread::spawn(move || engine.forecast(&input).unwrap())
        })
        .collect();
    let parallel: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // each call sees exactly the forecast its own input produces
    assert_eq!(serial, parallel);
}
