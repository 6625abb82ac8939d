// src/services/dataprep.rs
use chrono::{Datelike, NaiveDate};
use csv::Reader;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::HistoricalRecord;

pub const TIME_COL: &str = "Time";
pub const EXPENSE_COL: &str = "Total expense (VND)";
pub const INCOME_COL: &str = "Income (VND)";
pub const INTEREST_COL: &str = "Interest rate (%)";
pub const INFLATION_COL: &str = "Inflation rate (%)";
pub const HOLIDAY_COL: &str = "Holidays";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}' in history CSV")]
    MissingColumn(&'static str),

    #[error("row {row}: malformed number {value:?} in column '{column}'")]
    MalformedNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: malformed timestamp {value:?} (expected YYYY-MM-DD or YYYY-MM)")]
    MalformedTimestamp { row: usize, value: String },

    #[error("row {row}: period {current} does not follow {previous} by one calendar month")]
    IrregularSpacing {
        row: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("history is empty after dropping incomplete rows")]
    Empty,
}

/// Load and prepare the historical dataset from a CSV file on disk.
///
/// Rows with any missing field are dropped; everything that survives must
/// parse cleanly and sit on a strictly increasing monthly grid, otherwise
/// preparation fails. This runs once at start-up, so failures are fatal.
pub fn load_history(path: &Path) -> Result<Vec<HistoricalRecord>, HistoryError> {
    info!("Loading history from {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_history(&text)
}

/// Prepare a historical dataset from raw CSV text.
pub fn parse_history(csv_text: &str) -> Result<Vec<HistoricalRecord>, HistoryError> {
    let mut rdr = Reader::from_reader(csv_text.as_bytes());

    let headers = rdr.headers()?.clone();
    let col = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(HistoryError::MissingColumn(name))
    };
    let idx_time = col(TIME_COL)?;
    let idx_expense = col(EXPENSE_COL)?;
    let idx_income = col(INCOME_COL)?;
    let idx_interest = col(INTEREST_COL)?;
    let idx_inflation = col(INFLATION_COL)?;
    let idx_holiday = col(HOLIDAY_COL)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let row = result?;
        // 1-based data row number, for error messages
        let row_no = i + 1;

        let cells: Vec<&str> = [
            idx_time,
            idx_expense,
            idx_income,
            idx_interest,
            idx_inflation,
            idx_holiday,
        ]
        .iter()
        .map(|&idx| row.get(idx).unwrap_or("").trim())
        .collect();

        // Missing data is discarded, not imputed
        if cells.iter().any(|c| c.is_empty()) {
            debug!("Dropping row {} with missing fields", row_no);
            dropped += 1;
            continue;
        }

        records.push(HistoricalRecord {
            period: parse_period(cells[0], row_no)?,
            total_expense: parse_currency(cells[1], EXPENSE_COL, row_no)?,
            income: parse_currency(cells[2], INCOME_COL, row_no)?,
            interest_rate: parse_number(cells[3], INTEREST_COL, row_no)?,
            inflation_rate: parse_number(cells[4], INFLATION_COL, row_no)?,
            holiday_flag: parse_number(cells[5], HOLIDAY_COL, row_no)?,
        });
    }

    if dropped > 0 {
        info!("Dropped {} incomplete history rows", dropped);
    }
    if records.is_empty() {
        return Err(HistoryError::Empty);
    }

    validate_monthly(&records)?;
    info!("Prepared {} history rows", records.len());
    Ok(records)
}

fn parse_period(value: &str, row: usize) -> Result<NaiveDate, HistoryError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    // "2023-04" style months map to their first day
    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").map_err(|_| {
        HistoryError::MalformedTimestamp {
            row,
            value: value.to_string(),
        }
    })
}

/// Currency cells carry comma thousands separators ("12,500,000").
fn parse_currency(value: &str, column: &'static str, row: usize) -> Result<f64, HistoryError> {
    let cleaned = value.replace(',', "");
    parse_number(&cleaned, column, row).map_err(|_| HistoryError::MalformedNumber {
        row,
        column,
        value: value.to_string(),
    })
}

fn parse_number(value: &str, column: &'static str, row: usize) -> Result<f64, HistoryError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| HistoryError::MalformedNumber {
            row,
            column,
            value: value.to_string(),
        })
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

/// The seasonal fit assumes a regular monthly grid, so anything else is
/// rejected here rather than silently degrading the model downstream.
fn validate_monthly(records: &[HistoricalRecord]) -> Result<(), HistoryError> {
    for (i, pair) in records.windows(2).enumerate() {
        if month_index(pair[1].period) - month_index(pair[0].period) != 1 {
            return Err(HistoryError::IrregularSpacing {
                row: i + 2,
                previous: pair[0].period,
                current: pair[1].period,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Time,Total expense (VND),Income (VND),Interest rate (%),Inflation rate (%),Holidays";

    fn csv_with_rows(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn parses_clean_rows() {
        let text = csv_with_rows(&[
            "2023-01-01,\"8,500,000\",\"12,000,000\",4.5,3.2,1",
            "2023-02-01,\"7,900,000\",\"12,000,000\",4.5,3.1,0",
        ]);
        let records = parse_history(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_expense, 8_500_000.0);
        assert_eq!(records[1].income, 12_000_000.0);
        assert_eq!(records[0].holiday_flag, 1.0);
    }

    #[test]
    fn accepts_year_month_periods() {
        let text = csv_with_rows(&[
            "2023-01,\"8,500,000\",\"12,000,000\",4.5,3.2,1",
            "2023-02,\"7,900,000\",\"12,000,000\",4.5,3.1,0",
        ]);
        let records = parse_history(&text).unwrap();
        assert_eq!(
            records[0].period,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn drops_rows_with_missing_fields() {
        let text = csv_with_rows(&[
            "2023-01-01,\"8,500,000\",\"12,000,000\",4.5,3.2,1",
            "2023-02-01,\"7,900,000\",,4.5,3.1,0",
            "2023-02-01,\"8,100,000\",\"12,000,000\",4.5,3.1,0",
        ]);
        let records = parse_history(&text).unwrap();
        // one row dropped, two retained
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn malformed_currency_is_fatal() {
        let text = csv_with_rows(&[
            "2023-01-01,\"8,5x0,000\",\"12,000,000\",4.5,3.2,1",
        ]);
        let err = parse_history(&text).unwrap_err();
        assert!(matches!(
            err,
            HistoryError::MalformedNumber {
                column: EXPENSE_COL,
                ..
            }
        ));
    }

    #[test]
    fn malformed_timestamp_is_fatal() {
        let text = csv_with_rows(&["January,\"8,500,000\",\"12,000,000\",4.5,3.2,1"]);
        let err = parse_history(&text).unwrap_err();
        assert!(matches!(err, HistoryError::MalformedTimestamp { row: 1, .. }));
    }

    #[test]
    fn rejects_gaps_in_the_monthly_grid() {
        let text = csv_with_rows(&[
            "2023-01-01,\"8,500,000\",\"12,000,000\",4.5,3.2,1",
            "2023-03-01,\"7,900,000\",\"12,000,000\",4.5,3.1,0",
        ]);
        let err = parse_history(&text).unwrap_err();
        assert!(matches!(err, HistoryError::IrregularSpacing { row: 2, .. }));
    }

    #[test]
    fn rejects_out_of_order_periods() {
        let text = csv_with_rows(&[
            "2023-02-01,\"8,500,000\",\"12,000,000\",4.5,3.2,1",
            "2023-01-01,\"7,900,000\",\"12,000,000\",4.5,3.1,0",
        ]);
        assert!(parse_history(&text).is_err());
    }

    #[test]
    fn missing_column_is_reported() {
        let text = "Time,Income (VND)\n2023-01-01,\"12,000,000\"";
        let err = parse_history(text).unwrap_err();
        assert!(matches!(err, HistoryError::MissingColumn(EXPENSE_COL)));
    }

    #[test]
    fn empty_table_is_an_error() {
        let text = csv_with_rows(&[",,,,,"]);
        assert!(matches!(parse_history(&text), Err(HistoryError::Empty)));
    }
}
