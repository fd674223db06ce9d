//! CSV file data adapter.
//!
//! Prices live in `<base_path>/<SYMBOL>.csv` with a header row naming the
//! columns (`date,open,high,low,close[,volume]`, any case, any order). A value
//! that is not a number reads as undefined (`NAN`); a bar whose defined
//! prices break `high >= close >= low` is dropped.

use crate::domain::error::TallyError;
use crate::domain::ohlcv::{PriceBar, PriceColumn, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Reads a `date,predicted` file produced by an external model.
    pub fn load_predictions(path: &Path) -> Result<Vec<(NaiveDate, f64)>, TallyError> {
        let mut rdr = open_reader(path)?;
        let headers = header_index(&mut rdr)?;
        let date_idx = required(&headers, "date")?;
        let value_idx = required(&headers, "predicted")?;

        let mut predictions = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TallyError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let date = parse_date(record.get(date_idx), row)?;
            predictions.push((date, parse_value(record.get(value_idx))));
        }

        debug!(path = %path.display(), rows = predictions.len(), "predictions loaded");
        Ok(predictions)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TallyError> {
        let path = self.csv_path(symbol);
        let mut rdr = open_reader(&path)?;
        let headers = header_index(&mut rdr)?;

        let date_idx = required(&headers, "date")?;
        let mut price_idx: HashMap<PriceColumn, usize> = HashMap::new();
        for (name, &i) in &headers {
            if let Some(column) = PriceColumn::from_header(name) {
                price_idx.insert(column, i);
            }
        }
        for column in PriceColumn::REQUIRED {
            if !price_idx.contains_key(&column) {
                return Err(TallyError::MissingColumn {
                    column: column.name().to_string(),
                });
            }
        }

        let value = |record: &csv::StringRecord, column: PriceColumn, default: f64| {
            price_idx
                .get(&column)
                .map_or(default, |&i| parse_value(record.get(i)))
        };

        let mut bars = Vec::new();
        let mut dropped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TallyError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date = parse_date(record.get(date_idx), row)?;
            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            let bar = PriceBar {
                date,
                open: value(&record, PriceColumn::Open, f64::NAN),
                high: value(&record, PriceColumn::High, f64::NAN),
                low: value(&record, PriceColumn::Low, f64::NAN),
                close: value(&record, PriceColumn::Close, f64::NAN),
                volume: value(&record, PriceColumn::Volume, 0.0),
            };
            if bar.is_malformed() {
                warn!(
                    %symbol,
                    %date,
                    high = bar.high,
                    low = bar.low,
                    close = bar.close,
                    "dropping bar outside its high/low range"
                );
                dropped += 1;
                continue;
            }
            bars.push(bar);
        }

        debug!(%symbol, bars = bars.len(), dropped, "prices loaded");
        PriceSeries::new(symbol, bars)
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, TallyError> {
    let file = fs::File::open(path).map_err(|e| TallyError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

/// Lower-cased header name to column position.
fn header_index(rdr: &mut csv::Reader<fs::File>) -> Result<HashMap<String, usize>, TallyError> {
    let headers = rdr.headers().map_err(|e| TallyError::Data {
        reason: format!("CSV header error: {}", e),
    })?;
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect())
}

fn required(headers: &HashMap<String, usize>, name: &str) -> Result<usize, TallyError> {
    headers
        .get(name)
        .copied()
        .ok_or_else(|| TallyError::MissingColumn {
            column: name.to_string(),
        })
}

fn parse_date(raw: Option<&str>, row: usize) -> Result<NaiveDate, TallyError> {
    let raw = raw.unwrap_or_default();
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| TallyError::Data {
        reason: format!("invalid date '{}' on data row {}: {}", raw, row + 1, e),
    })
}

/// Non-numeric or empty cells read as undefined.
fn parse_value(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.parse::<f64>().ok()).unwrap_or(f64::NAN)
}
