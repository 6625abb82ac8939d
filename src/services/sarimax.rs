// src/services/sarimax.rs
use log::{debug, info};
use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::models::{ExogenousInput, HistoricalRecord};

pub const SEASONAL_PERIOD: usize = 12;

/// Two full seasonal cycles, the shortest history the seasonal
/// differencing pass leaves anything usable from.
pub const MIN_HISTORY: usize = 2 * SEASONAL_PERIOD;

/// Lag set of the multiplicative (1,1,1)(1,1,1,12) polynomials:
/// (1 - aB)(1 - bB^12) touches lags 1, 12 and 13.
const LAGS: [usize; 3] = [1, SEASONAL_PERIOD, SEASONAL_PERIOD + 1];

/// A lag is only estimated when it leaves this many usable rows;
/// otherwise its coefficient stays at zero.
const MIN_LAG_OBS: usize = 4;

/// Keeps the forecast recursion away from the explosive region.
const COEFF_LIMIT: f64 = 0.98;

const RIDGE: f64 = 1e-8;
const VAR_EPS: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("history too short: need at least {MIN_HISTORY} monthly rows, got {0}")]
    TooShort(usize),

    #[error("exogenous input contains a non-finite value")]
    NonFiniteInput,

    #[error("forecast evaluated to a non-finite value")]
    NonFiniteForecast,
}

/// Fitted seasonal ARIMA-with-exogenous-regressors state.
///
/// Fit once over the full history; afterwards it is read-only, so any
/// number of predict calls may run against it concurrently.
#[derive(Debug, Clone)]
pub struct SarimaxModel {
    exog_coeffs: [f64; 4],
    ar_coeffs: [f64; 3],
    ma_coeffs: [f64; 3],
    residual_std: f64,
    // Tails of the fitted series needed to invert the differencing and
    // feed the ARMA recursion one step past the end of the history.
    y: Vec<f64>,
    exog: Vec<[f64; 4]>,
    noise: Vec<f64>,
    shocks: Vec<f64>,
}

impl SarimaxModel {
    /// Fit against the prepared history with the fixed orders
    /// (1,1,1)(1,1,1,12).
    ///
    /// Estimation is conditional least squares: both differencing passes
    /// are applied to the expense series and every exogenous column, the
    /// differenced series is regressed on the differenced exogenous
    /// columns, and the ARMA coefficients come from a two-stage
    /// Hannan-Rissanen pass over the regression residuals.
    pub fn fit(history: &[HistoricalRecord]) -> Result<Self, ModelError> {
        let n = history.len();
        if n < MIN_HISTORY {
            return Err(ModelError::TooShort(n));
        }

        let y: Vec<f64> = history.iter().map(|r| r.total_expense).collect();
        let exog: Vec<[f64; 4]> = history
            .iter()
            .map(|r| [r.income, r.interest_rate, r.inflation_rate, r.holiday_flag])
            .collect();

        let w = seasonal_difference(&difference(&y), SEASONAL_PERIOD);
        let m = w.len();

        let mut xd: [Vec<f64>; 4] = Default::default();
        for j in 0..4 {
            let col: Vec<f64> = exog.iter().map(|row| row[j]).collect();
            xd[j] = seasonal_difference(&difference(&col), SEASONAL_PERIOD);
        }

        // A column that is constant after differencing carries no signal
        // and would make the normal equations degenerate.
        let active: Vec<usize> = (0..4).filter(|&j| variance(&xd[j]) > VAR_EPS).collect();
        if active.len() < 4 {
            debug!(
                "{} exogenous column(s) constant after differencing, excluded from regression",
                4 - active.len()
            );
        }

        let mut exog_coeffs = [0.0; 4];
        if !active.is_empty() {
            let design = Array2::from_shape_fn((m, active.len()), |(t, k)| xd[active[k]][t]);
            let target = Array1::from_vec(w.clone());
            let beta = solve_least_squares(&design, &target);
            for (k, &j) in active.iter().enumerate() {
                exog_coeffs[j] = beta[k];
            }
        }

        let noise: Vec<f64> = (0..m)
            .map(|t| w[t] - (0..4).map(|j| exog_coeffs[j] * xd[j][t]).sum::<f64>())
            .collect();

        let (ar_coeffs, ma_coeffs) = estimate_arma(&noise);

        let mut shocks = vec![0.0; m];
        for t in 0..m {
            let mut pred = 0.0;
            for (k, &lag) in LAGS.iter().enumerate() {
                if t >= lag {
                    pred += ar_coeffs[k] * noise[t - lag];
                    pred += ma_coeffs[k] * shocks[t - lag];
                }
            }
            shocks[t] = noise[t] - pred;
        }
        let residual_std = (shocks.iter().map(|e| e * e).sum::<f64>() / m as f64).sqrt();

        info!(
            "Fitted SARIMAX(1,1,1)(1,1,1,{}) on {} rows, residual std {:.2}",
            SEASONAL_PERIOD, n, residual_std
        );

        Ok(SarimaxModel {
            exog_coeffs,
            ar_coeffs,
            ma_coeffs,
            residual_std,
            y,
            exog,
            noise,
            shocks,
        })
    }

    /// Forecast the expense for the period immediately following the end
    /// of the fitted history. Read-only; pure arithmetic over the fitted
    /// state, so identical inputs always produce identical forecasts.
    pub fn predict(&self, input: &ExogenousInput) -> Result<f64, ModelError> {
        if !input.is_finite() {
            return Err(ModelError::NonFiniteInput);
        }

        let n = self.y.len();
        let m = self.noise.len();
        let x_next = input.as_row();

        // Exogenous effect on the doubly differenced scale:
        // xd_{T+1} = (x_{T+1} - x_T) - (x_{T-11} - x_{T-12})
        let mut w_next = 0.0;
        for j in 0..4 {
            let xd = (x_next[j] - self.exog[n - 1][j])
                - (self.exog[n - SEASONAL_PERIOD][j] - self.exog[n - SEASONAL_PERIOD - 1][j]);
            w_next += self.exog_coeffs[j] * xd;
        }

        for (k, &lag) in LAGS.iter().enumerate() {
            if lag <= m {
                w_next += self.ar_coeffs[k] * self.noise[m - lag];
                w_next += self.ma_coeffs[k] * self.shocks[m - lag];
            }
        }

        // Undo both differencing passes:
        // y_{T+1} = w_{T+1} + y_T + y_{T-11} - y_{T-12}
        let forecast = w_next + self.y[n - 1] + self.y[n - SEASONAL_PERIOD]
            - self.y[n - SEASONAL_PERIOD - 1];

        if !forecast.is_finite() {
            return Err(ModelError::NonFiniteForecast);
        }
        Ok(forecast)
    }

    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }
}

fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

fn seasonal_difference(series: &[f64], period: usize) -> Vec<f64> {
    if series.len() <= period {
        return Vec::new();
    }
    (period..series.len())
        .map(|t| series[t] - series[t - period])
        .collect()
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

fn supported_lags(len: usize) -> Vec<usize> {
    LAGS.iter()
        .copied()
        .filter(|&lag| len > lag && len - lag >= MIN_LAG_OBS)
        .collect()
}

fn clamp(value: f64) -> f64 {
    value.clamp(-COEFF_LIMIT, COEFF_LIMIT)
}

/// Two-stage Hannan-Rissanen over the regression residuals: an AR-only
/// pass supplies provisional innovations, then AR and MA terms are
/// re-estimated jointly against the lagged innovations. Returns
/// coefficients in LAGS order; lags without sample support stay zero.
fn estimate_arma(noise: &[f64]) -> ([f64; 3], [f64; 3]) {
    let m = noise.len();
    let lags = supported_lags(m);
    let mut ar = [0.0; 3];
    let mut ma = [0.0; 3];
    if lags.is_empty() {
        return (ar, ma);
    }
    let l_max = *lags.iter().max().unwrap();
    let rows = m - l_max;

    // Stage 1: AR only.
    let design = Array2::from_shape_fn((rows, lags.len()), |(r, k)| noise[r + l_max - lags[k]]);
    let target = Array1::from_vec(noise[l_max..].to_vec());
    let phi: Vec<f64> = solve_least_squares(&design, &target)
        .into_iter()
        .map(clamp)
        .collect();

    // Provisional innovations from the AR fit.
    let mut innovations = vec![0.0; m];
    for t in 0..m {
        let mut pred = 0.0;
        for (k, &lag) in lags.iter().enumerate() {
            if t >= lag {
                pred += phi[k] * noise[t - lag];
            }
        }
        innovations[t] = noise[t] - pred;
    }

    // Stage 2: joint AR + MA against the lagged innovations.
    let cols = lags.len() * 2;
    let design = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let t = r + l_max;
        if c < lags.len() {
            noise[t - lags[c]]
        } else {
            innovations[t - lags[c - lags.len()]]
        }
    });
    let coeffs = solve_least_squares(&design, &target);

    for (k, &lag) in lags.iter().enumerate() {
        let slot = LAGS.iter().position(|&l| l == lag).unwrap();
        ar[slot] = clamp(coeffs[k]);
        ma[slot] = clamp(coeffs[lags.len() + k]);
    }
    (ar, ma)
}

/// Least squares via the normal equations with a small ridge term, then
/// Gaussian elimination with partial pivoting.
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Vec<f64> {
    let k = x.ncols();
    if k == 0 {
        return Vec::new();
    }

    let xt = x.t();
    let mut ata = xt.dot(x);
    let atb = xt.dot(y);

    let scale = (0..k).map(|i| ata[[i, i]]).sum::<f64>() / k as f64;
    let ridge = RIDGE * (1.0 + scale);
    for i in 0..k {
        ata[[i, i]] += ridge;
    }

    let mut aug = Array2::<f64>::zeros((k, k + 1));
    for i in 0..k {
        for j in 0..k {
            aug[[i, j]] = ata[[i, j]];
        }
        aug[[i, k]] = atb[i];
    }

    for i in 0..k {
        let mut pivot_row = i;
        for r in (i + 1)..k {
            if aug[[r, i]].abs() > aug[[pivot_row, i]].abs() {
                pivot_row = r;
            }
        }
        if pivot_row != i {
            for c in 0..=k {
                aug.swap([i, c], [pivot_row, c]);
            }
        }
        let pivot = aug[[i, i]];
        if pivot.abs() < 1e-12 {
            continue;
        }
        for r in (i + 1)..k {
            let factor = aug[[r, i]] / pivot;
            for c in i..=k {
                let head = aug[[i, c]];
                aug[[r, c]] -= factor * head;
            }
        }
    }

    let mut solution = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = aug[[i, k]];
        for j in (i + 1)..k {
            sum -= aug[[i, j]] * solution[j];
        }
        let pivot = aug[[i, i]];
        solution[i] = if pivot.abs() < 1e-12 { 0.0 } else { sum / pivot };
    }
    solution
}
