use crate::error::{AnalysisError, Result};
use crate::types::{RawTransaction, REQUIRED_COLUMNS};
use crate::util::{parse_count_safe, parse_date_safe, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Positions of the required columns in the header row.
struct ColumnIndex {
    date: usize,
    product: usize,
    region: usize,
    price: usize,
    quantity: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::Schema { missing });
        }
        // Every lookup succeeded above.
        let idx = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            date: idx("date"),
            product: idx("product"),
            region: idx("region"),
            price: idx("price"),
            quantity: idx("quantity"),
        })
    }
}

/// Load the raw transaction table from a CSV file.
///
/// Rows with empty fields are kept (as `None`) for the cleaning step to drop.
/// Any field that is present but cannot be coerced aborts the whole load.
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<RawTransaction>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnalysisError::SourceNotFound {
            path: path.display().to_string(),
        });
    }
    let file = File::open(path)?;
    let rows = load_transactions_from_reader(file)?;
    log::info!("loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn load_transactions_from_reader<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = ColumnIndex::from_headers(rdr.headers()?)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(i as u64 + 2);
        rows.push(parse_record(&record, &columns, line)?);
    }
    log::debug!("parsed {} raw rows", rows.len());
    Ok(rows)
}

fn parse_record(record: &StringRecord, columns: &ColumnIndex, line: u64) -> Result<RawTransaction> {
    let date = match field(record, columns.date) {
        Some(s) => Some(
            parse_date_safe(s).ok_or_else(|| parse_error(line, "date", s, "not an ISO date"))?,
        ),
        None => None,
    };
    let price = match field(record, columns.price) {
        Some(s) => {
            let v = parse_f64_safe(s).ok_or_else(|| parse_error(line, "price", s, "not a number"))?;
            if !v.is_finite() || v < 0.0 {
                return Err(parse_error(line, "price", s, "must be a non-negative number"));
            }
            Some(v)
        }
        None => None,
    };
    let quantity = match field(record, columns.quantity) {
        Some(s) => Some(parse_count_safe(s).ok_or_else(|| {
            parse_error(line, "quantity", s, "not a non-negative integer")
        })?),
        None => None,
    };
    Ok(RawTransaction {
        date,
        product: field(record, columns.product).map(str::to_string),
        region: field(record, columns.region).map(str::to_string),
        price,
        quantity,
    })
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_error(line: u64, column: &str, value: &str, reason: &str) -> AnalysisError {
    AnalysisError::Parse {
        line,
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
