// src/services/allocation.rs
//
// Parsers for the text the budget-suggestion model produces. The model is
// instructed to answer strictly as
// `Ăn uống: 3000000 VND, Nhà ở: 3000000 VND, ...`; anything outside that
// grammar is an explicit error.
use regex::Regex;
use thiserror::Error;

use crate::models::BudgetLine;

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("allocation text is empty")]
    Empty,

    #[error("malformed allocation entry: {0:?}")]
    MalformedEntry(String),

    #[error("malformed amount {amount:?} in entry for {category:?}")]
    MalformedAmount { category: String, amount: String },
}

/// Parse one allocation suggestion into budget lines.
///
/// Grammar: `entry (',' entry)*` with `entry := category ':' amount ["VND"]`.
/// The category is any non-empty text without `:` or `,`; the amount is
/// digits with optional `.` thousands separators. The comma belongs to the
/// entry separator, so it cannot appear inside an amount.
pub fn parse_allocation(text: &str) -> Result<Vec<BudgetLine>, AllocationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AllocationError::Empty);
    }

    let mut lines = Vec::new();
    for entry in trimmed.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (category, rest) = entry
            .split_once(':')
            .ok_or_else(|| AllocationError::MalformedEntry(entry.to_string()))?;
        let category = category.trim();
        if category.is_empty() {
            return Err(AllocationError::MalformedEntry(entry.to_string()));
        }

        let amount_text = rest
            .trim()
            .trim_end_matches("VND")
            .trim_end_matches("vnd")
            .trim();
        let amount = parse_amount_digits(amount_text).ok_or_else(|| {
            AllocationError::MalformedAmount {
                category: category.to_string(),
                amount: amount_text.to_string(),
            }
        })?;

        lines.push(BudgetLine {
            category: category.to_string(),
            amount,
        });
    }

    if lines.is_empty() {
        return Err(AllocationError::Empty);
    }
    Ok(lines)
}

/// Digits with optional thousands separators; no sign, no free text.
fn parse_amount_digits(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let mut digits = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            '.' => {}
            _ => return None,
        }
    }
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// Pull the transaction amount out of a free-text description, honoring
/// the local shorthand where a trailing `k` multiplies by 1000
/// ("ăn sáng 20k" is 20,000). Returns `None` when no number appears.
pub fn extract_amount(prompt: &str) -> Option<i64> {
    let re = Regex::new(r"(\d+)\s*(k|K)?").ok()?;
    let caps = re.captures(prompt)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        Some(amount * 1000)
    } else {
        Some(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_suggestion() {
        let text = "Ăn uống: 3000000 VND, Nhà ở: 3000000 VND, Tiết kiệm: 2000000 VND, Các mục khác: 2000000 VND";
        let lines = parse_allocation(text).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].category, "Ăn uống");
        assert_eq!(lines[0].amount, 3_000_000.0);
        assert_eq!(lines[3].category, "Các mục khác");
        assert_eq!(lines[3].amount, 2_000_000.0);
    }

    #[test]
    fn accepts_separators_and_missing_unit() {
        let lines = parse_allocation("Tiết kiệm: 1.500.000").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, 1_500_000.0);
    }

    #[test]
    fn rejects_entry_without_colon() {
        let err = parse_allocation("Ăn uống 3000000 VND").unwrap_err();
        assert!(matches!(err, AllocationError::MalformedEntry(_)));
    }

    #[test]
    fn rejects_free_text_amounts() {
        let err = parse_allocation("Ăn uống: khoảng ba triệu").unwrap_err();
        assert!(matches!(err, AllocationError::MalformedAmount { .. }));
    }

    #[test]
    fn rejects_empty_text() {
        assert_eq!(parse_allocation("  "), Err(AllocationError::Empty));
    }

    #[test]
    fn extracts_plain_and_shorthand_amounts() {
        assert_eq!(extract_amount("ăn sáng 20k"), Some(20_000));
        assert_eq!(extract_amount("mua sách 150000"), Some(150_000));
        assert_eq!(extract_amount("đi chợ 35K sáng nay"), Some(35_000));
        assert_eq!(extract_amount("không có số"), None);
    }
}
