// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One month of prepared history. Periods are strictly increasing,
/// consecutive calendar months, and every field is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub period: NaiveDate,
    pub total_expense: f64,
    pub income: f64,
    pub interest_rate: f64,
    pub inflation_rate: f64,
    pub holiday_flag: f64,
}

/// Exogenous values for one forecast request. Field names on the wire
/// match the historical dataset's column headers, which is what the
/// existing backend consumer sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExogenousInput {
    #[serde(rename = "Income (VND)")]
    pub income: f64,
    #[serde(rename = "Interest rate (%)")]
    pub interest_rate: f64,
    #[serde(rename = "Inflation rate (%)")]
    pub inflation_rate: f64,
    #[serde(rename = "Holidays")]
    pub holiday_flag: f64,
}

impl ExogenousInput {
    pub fn new(income: f64, interest_rate: f64, inflation_rate: f64, holiday_flag: f64) -> Self {
        ExogenousInput {
            income,
            interest_rate,
            inflation_rate,
            holiday_flag,
        }
    }

    /// Regressor vector in the column order the model was fit with.
    pub fn as_row(&self) -> [f64; 4] {
        [
            self.income,
            self.interest_rate,
            self.inflation_rate,
            self.holiday_flag,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.as_row().iter().all(|v| v.is_finite())
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub forecasted_expense: f64,
}

/// One line of a parsed budget allocation, e.g. "Nhà ở: 3000000 VND".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: String,
    pub amount: f64,
}
