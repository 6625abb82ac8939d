// src/services/engine.rs
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::models::{ExogenousInput, HistoricalRecord};
use crate::services::dataprep;
use crate::services::sarimax::{ModelError, SarimaxModel};

/// Owns the prepared history and the fitted model.
///
/// Built once during start-up and shared read-only behind an `Arc`
/// afterwards; `forecast` never mutates it, so concurrent calls need no
/// locking.
pub struct ForecastEngine {
    history: Vec<HistoricalRecord>,
    model: SarimaxModel,
}

impl ForecastEngine {
    pub fn new(history: Vec<HistoricalRecord>) -> Result<Self, ModelError> {
        let model = SarimaxModel::fit(&history)?;
        Ok(ForecastEngine { history, model })
    }

    /// Load the historical dataset, prepare it and fit the model.
    /// Any failure here is a start-up failure.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let history = dataprep::load_history(path)
            .with_context(|| format!("preparing history from {}", path.display()))?;
        let engine = ForecastEngine::new(history).context("fitting forecast model")?;
        info!(
            "Forecast engine ready: {} months of history through {}",
            engine.history.len(),
            engine.last_period()
        );
        Ok(engine)
    }

    /// One-step-ahead expense forecast for the month following the end of
    /// the history.
    pub fn forecast(&self, input: &ExogenousInput) -> Result<f64, ModelError> {
        self.model.predict(input)
    }

    pub fn history(&self) -> &[HistoricalRecord] {
        &self.history
    }

    fn last_period(&self) -> chrono::NaiveDate {
        // non-empty by construction: fit rejects short histories
        self.history[self.history.len() - 1].period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history(n: usize) -> Vec<HistoricalRecord> {
        (0..n)
            .map(|t| HistoricalRecord {
                period: NaiveDate::from_ymd_opt(2022 + (t / 12) as i32, (t % 12) as u32 + 1, 1)
                    .unwrap(),
                total_expense: 8_000_000.0
                    + 100_000.0 * (t % 12) as f64
                    + 15_000.0 * ((t * 13) % 7) as f64,
                income: 12_000_000.0 + 80_000.0 * t as f64,
                interest_rate: 4.0 + 0.1 * ((t * 3) % 5) as f64,
                inflation_rate: 3.0 + 0.05 * ((t * 7) % 6) as f64,
                holiday_flag: if t % 12 == 0 { 1.0 } else { 0.0 },
            })
            .collect()
    }

    #[test]
    fn rejects_short_history() {
        assert!(ForecastEngine::new(history(12)).is_err());
    }

    #[test]
    fn forecasts_from_owned_state() {
        let engine = ForecastEngine::new(history(30)).unwrap();
        let value = engine
            .forecast(&ExogenousInput::new(13_000_000.0, 4.2, 3.1, 0.0))
            .unwrap();
        assert!(value.is_finite());
        assert_eq!(engine.history().len(), 30);
    }
}
