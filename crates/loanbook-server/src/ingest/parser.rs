//! Catalog file parser
//!
//! Decodes an uploaded tabular catalog into [`ProductRecord`]s. The parse is
//! all-or-nothing: a file with any unreadable date or identifier is rejected
//! before a batch is created, so staging never holds half of an upload.
//!
//! Field coercion is deliberately forgiving about formatting: thousands
//! separators, spreadsheet serial dates, and surrounding whitespace are
//! tolerated, and a numeric cell that cannot be read at all ("TBC", "n/a")
//! coerces to empty the same way a blank cell does. Dates are the exception;
//! a misread date silently corrupts withdrawal handling, so an unreadable
//! date rejects the row.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{ProductRecord, MAX_PRODUCT_ID_LEN};

/// Number of row errors included in a rejection message.
const MAX_REPORTED_ERRORS: usize = 10;

/// Spreadsheet serial dates count days from 1899-12-30.
const SERIAL_DATE_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial dates outside this window are treated as bad data rather than
/// dates (serial 1 is 1899-12-31; 109_574 is 2199-12-31).
const SERIAL_DATE_MIN: i64 = 1;
const SERIAL_DATE_MAX: i64 = 109_574;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Uploaded file is empty")]
    EmptyInput,

    #[error("Uploaded file has a header but no data rows")]
    NoRows,

    #[error("Uploaded file is not a readable CSV: {0}")]
    Malformed(String),

    #[error("Uploaded file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Uploaded file was rejected: {summary}")]
    InvalidRows {
        summary: String,
        errors: Vec<RowError>,
    },
}

/// One unreadable cell, addressed by its spreadsheet row number.
#[derive(Debug, Clone)]
pub struct RowError {
    /// 1-based file row; the header is row 1, so the first data row is 2.
    pub row_number: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.message)
    }
}

/// Column positions resolved from the header row.
struct ColumnMap {
    product_id: usize,
    product_name: Option<usize>,
    loan_start_date: Option<usize>,
    withdrawn_date: Option<usize>,
    pricing: Option<usize>,
    min_loan: Option<usize>,
    max_loan: Option<usize>,
    min_ltv: Option<usize>,
    max_ltv: Option<usize>,
    term_months: Option<usize>,
    product_fee: Option<usize>,
    cashback_min: Option<usize>,
    cashback_max: Option<usize>,
}

/// Header names are matched case-insensitively with spaces, underscores,
/// and hyphens ignored, so "Product ID", "product_id", and "ProductID"
/// all resolve to the same column.
fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ParseError> {
        let positions: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(index, name)| (normalize_header(name), index))
            .collect();

        let find = |name: &str| positions.get(name).copied();

        Ok(ColumnMap {
            product_id: find("productid")
                .ok_or_else(|| ParseError::MissingColumn("ProductID".to_string()))?,
            product_name: find("productname"),
            loan_start_date: find("loanstartdate"),
            withdrawn_date: find("withdrawndate"),
            pricing: find("pricing"),
            min_loan: find("minloan"),
            max_loan: find("maxloan"),
            min_ltv: find("minltv"),
            max_ltv: find("maxltv"),
            term_months: find("term").or_else(|| find("termmonths")),
            product_fee: find("productfee"),
            cashback_min: find("cashbackmin"),
            cashback_max: find("cashbackmax"),
        })
    }
}

/// Parse an uploaded catalog file into records, preserving file order.
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<ProductRecord>, ParseError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ParseError::EmptyInput);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Malformed(e.to_string()))?
        .clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut records = Vec::new();
    let mut errors: Vec<RowError> = Vec::new();

    for (index, result) in reader.records().enumerate() {
        // Header is file row 1.
        let row_number = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                errors.push(RowError {
                    row_number,
                    message: e.to_string(),
                });
                continue;
            }
        };

        match parse_row(&columns, &row) {
            Ok(record) => records.push(record),
            Err(row_errors) => {
                for message in row_errors {
                    errors.push(RowError {
                        row_number,
                        message,
                    });
                }
            }
        }
    }

    if !errors.is_empty() {
        let total = errors.len();
        errors.truncate(MAX_REPORTED_ERRORS);
        let shown = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let summary = if total > MAX_REPORTED_ERRORS {
            format!("{} (and {} more)", shown, total - MAX_REPORTED_ERRORS)
        } else {
            shown
        };
        return Err(ParseError::InvalidRows { summary, errors });
    }

    if records.is_empty() {
        return Err(ParseError::NoRows);
    }

    Ok(records)
}

/// Non-empty trimmed cell content, or `None` for an absent or blank cell.
fn cell<'a>(row: &'a csv::StringRecord, index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|i| row.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_row(columns: &ColumnMap, row: &csv::StringRecord) -> Result<ProductRecord, Vec<String>> {
    let mut errors = Vec::new();

    let cell = |index: Option<usize>| cell(row, index);

    let product_id = match cell(Some(columns.product_id)) {
        Some(id) if id.len() <= MAX_PRODUCT_ID_LEN => id.to_string(),
        Some(id) => {
            errors.push(format!(
                "ProductID exceeds {} characters ({} given)",
                MAX_PRODUCT_ID_LEN,
                id.len()
            ));
            String::new()
        }
        None => {
            errors.push("ProductID is missing".to_string());
            String::new()
        }
    };

    // Unreadable numeric cells coerce to empty rather than rejecting the
    // row; a "TBC" price carries the same information as no price.
    let number = |index: Option<usize>| cell(index).and_then(parse_decimal);

    let pricing = number(columns.pricing);
    let min_loan = number(columns.min_loan);
    let max_loan = number(columns.max_loan);
    let min_ltv = number(columns.min_ltv);
    let max_ltv = number(columns.max_ltv);
    let product_fee = number(columns.product_fee);
    let cashback_min = number(columns.cashback_min);
    let cashback_max = number(columns.cashback_max);

    let term_months = cell(columns.term_months).and_then(parse_integer);

    let mut date = |index: Option<usize>, name: &str| -> Option<NaiveDate> {
        match cell(index).map(parse_date) {
            Some(Ok(value)) => Some(value),
            Some(Err(message)) => {
                errors.push(format!("{name}: {message}"));
                None
            }
            None => None,
        }
    };

    let loan_start_date = date(columns.loan_start_date, "LoanStartDate");
    let withdrawn_date = date(columns.withdrawn_date, "WithdrawnDate");

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ProductRecord {
        product_id,
        product_name: cell(columns.product_name).map(str::to_string),
        loan_start_date,
        withdrawn_date,
        pricing,
        min_loan,
        max_loan,
        min_ltv,
        max_ltv,
        term_months,
        product_fee,
        cashback_min,
        cashback_max,
    })
}

/// Parse a decimal cell, tolerating thousands separators, and round to two
/// decimal places half away from zero to match the catalog's precision.
/// Content that is not a finite number coerces to `None`.
fn parse_decimal(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', "").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(round2(value))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse an integer cell. A decimal representation is accepted when it is
/// exactly integral ("24.0" from spreadsheet exports); anything else
/// coerces to `None`.
fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = cleaned.parse().ok()?;
    if value.fract() != 0.0 || !value.is_finite() || value.abs() > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Parse a date cell in ISO (2024-03-01), UK (01/03/2024), or spreadsheet
/// serial form.
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Ok(date);
    }
    if let Ok(serial) = raw.parse::<i64>() {
        if (SERIAL_DATE_MIN..=SERIAL_DATE_MAX).contains(&serial) {
            let (year, month, day) = SERIAL_DATE_EPOCH;
            let epoch = NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| "internal date epoch error".to_string())?;
            return epoch
                .checked_add_days(chrono::Days::new(serial as u64))
                .ok_or_else(|| format!("'{raw}' is out of range for a serial date"));
        }
    }
    Err(format!("'{raw}' is not a recognized date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ProductID,ProductName,LoanStartDate,WithdrawnDate,Pricing,MinLoan,MaxLoan,MinLTV,MaxLTV,Term,ProductFee,CashbackMin,CashbackMax";

    fn file(rows: &[&str]) -> Vec<u8> {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.into_bytes()
    }

    #[test]
    fn test_parses_full_row() {
        let bytes = file(&[
            "FIX-2Y-75,2yr Fixed 75% LTV,2024-03-01,,4.99,\"25,000\",\"500,000\",0,75,24,999,0,250",
        ]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.product_id, "FIX-2Y-75");
        assert_eq!(r.product_name.as_deref(), Some("2yr Fixed 75% LTV"));
        assert_eq!(
            r.loan_start_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(r.withdrawn_date, None);
        assert_eq!(r.pricing, Some(4.99));
        assert_eq!(r.min_loan, Some(25_000.0));
        assert_eq!(r.max_loan, Some(500_000.0));
        assert_eq!(r.term_months, Some(24));
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(parse_catalog(b"  \n "), Err(ParseError::EmptyInput)));
    }

    #[test]
    fn test_header_only_rejected() {
        let bytes = file(&[]);
        assert!(matches!(parse_catalog(&bytes), Err(ParseError::NoRows)));
    }

    #[test]
    fn test_missing_product_id_column_rejected() {
        let result = parse_catalog(b"Name,Pricing\nfoo,1.0");
        assert!(matches!(result, Err(ParseError::MissingColumn(_))));
    }

    #[test]
    fn test_header_matching_ignores_case_and_spaces() {
        let bytes = b"product id,PRICING\nP-1,3.5";
        let records = parse_catalog(bytes).unwrap();
        assert_eq!(records[0].product_id, "P-1");
        assert_eq!(records[0].pricing, Some(3.5));
    }

    #[test]
    fn test_blank_product_id_rejects_whole_file() {
        let bytes = file(&[
            "P-1,,,,1.0,,,,,,,,",
            " ,,,,2.0,,,,,,,,",
        ]);
        match parse_catalog(&bytes) {
            Err(ParseError::InvalidRows { errors, .. }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].row_number, 3);
                assert!(errors[0].message.contains("ProductID"));
            }
            other => panic!("expected InvalidRows, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_overlong_product_id_rejected() {
        let long_id = "X".repeat(MAX_PRODUCT_ID_LEN + 1);
        let bytes = file(&[&format!("{long_id},,,,1.0,,,,,,,,")]);
        assert!(matches!(
            parse_catalog(&bytes),
            Err(ParseError::InvalidRows { .. })
        ));
    }

    #[test]
    fn test_error_report_caps_at_ten_rows() {
        let rows: Vec<String> = (0..15).map(|_| ",,,,bad,,,,,,,,".to_string()).collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        match parse_catalog(&file(&refs)) {
            Err(ParseError::InvalidRows { summary, errors }) => {
                assert_eq!(errors.len(), MAX_REPORTED_ERRORS);
                assert!(summary.contains("more"));
            }
            other => panic!("expected InvalidRows, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_decimal_rounds_to_two_places() {
        let bytes = file(&["P-1,,,,4.567,,,,,,,,"]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(records[0].pricing, Some(4.57));
    }

    #[test]
    fn test_uk_date_format() {
        let bytes = file(&["P-1,,01/03/2024,,,,,,,,,,"]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(
            records[0].loan_start_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_spreadsheet_serial_date() {
        // 45352 days after 1899-12-30 is 2024-03-01.
        let bytes = file(&["P-1,,45352,,,,,,,,,,"]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(
            records[0].loan_start_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_unparseable_date_rejected() {
        let bytes = file(&["P-1,,March 1st,,,,,,,,,,"]);
        assert!(matches!(
            parse_catalog(&bytes),
            Err(ParseError::InvalidRows { .. })
        ));
    }

    #[test]
    fn test_term_accepts_integral_decimal() {
        let bytes = file(&["P-1,,,,,,,,,24.0,,,"]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(records[0].term_months, Some(24));
    }

    #[test]
    fn test_fractional_term_coerces_to_empty() {
        let bytes = file(&["P-1,,,,,,,,,24.5,,,"]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(records[0].term_months, None);
    }

    #[test]
    fn test_non_numeric_decimal_coerces_to_empty() {
        let records = parse_catalog(b"ProductID,Pricing\nP-1,TBC\n").unwrap();
        assert_eq!(records[0].product_id, "P-1");
        assert_eq!(records[0].pricing, None);
    }

    #[test]
    fn test_non_numeric_term_coerces_to_empty() {
        let bytes = file(&["P-1,,,,4.5,,,,,two years,,,"]);
        let records = parse_catalog(&bytes).unwrap();
        assert_eq!(records[0].term_months, None);
        assert_eq!(records[0].pricing, Some(4.5));
    }

    #[test]
    fn test_preserves_file_order() {
        let bytes = file(&[
            "P-3,,,,1.0,,,,,,,,",
            "P-1,,,,1.0,,,,,,,,",
            "P-2,,,,1.0,,,,,,,,",
        ]);
        let records = parse_catalog(&bytes).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P-3", "P-1", "P-2"]);
    }
}
