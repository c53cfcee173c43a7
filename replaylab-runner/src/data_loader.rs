//! Bar loading for the runner.
//!
//! A [`BarSource`] turns `(symbol, timeframe)` into a validated
//! [`BarSeries`]. Two sources exist:
//! - [`CsvSource`]: a header-first CSV file (`timestamp, open, high, low,
//!   close, volume`, then any number of feature columns)
//! - [`SyntheticSource`](crate::synthetic::SyntheticSource): seeded random walk
//!
//! Synthetic data is a developer-only mode. Results produced on it are
//! tagged so they are never mistaken for real replays.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use replaylab_core::domain::{Bar, BarSeries, Column, SeriesError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{DataConfig, SourceConfig};
use crate::synthetic::SyntheticSource;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("duplicate column '{0}' (headers are case-insensitive)")]
    DuplicateColumn(String),

    #[error("row {row}: cannot parse timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: cannot parse '{value}' in column '{column}'")]
    BadValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("unsupported timeframe '{0}'")]
    Timeframe(String),

    #[error("invalid bars: {0}")]
    Series(#[from] SeriesError),
}

/// Collaborator that produces a bar series.
pub trait BarSource: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self, symbol: &str, timeframe: &str) -> Result<BarSeries, LoadError>;

    /// True for generated data.
    fn is_synthetic(&self) -> bool {
        false
    }
}

/// Result of loading bars, including provenance.
#[derive(Debug)]
pub struct LoadedData {
    pub series: BarSeries,
    /// BLAKE3 over every bar and column.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Build the source a data config names.
pub fn source_for(config: &DataConfig) -> Box<dyn BarSource> {
    match &config.source {
        SourceConfig::Csv { path } => Box::new(CsvSource::new(path)),
        SourceConfig::Synthetic {
            seed,
            bars,
            start_price,
            volatility,
        } => Box::new(
            SyntheticSource::new(*seed, *bars)
                .with_start_price(*start_price)
                .with_volatility(*volatility),
        ),
    }
}

/// Load the configured series and fingerprint it.
pub fn load_bars(config: &DataConfig) -> Result<LoadedData, LoadError> {
    let source = source_for(config);
    let series = source.load(&config.symbol, &config.timeframe)?;
    if source.is_synthetic() {
        warn!(
            symbol = %config.symbol,
            "using synthetic data; results are tagged synthetic"
        );
    }
    debug!(source = source.name(), bars = series.len(), "bars loaded");
    Ok(LoadedData {
        dataset_hash: compute_dataset_hash(&series),
        synthetic: source.is_synthetic(),
        series,
    })
}

/// Deterministic BLAKE3 hash over bar data and feature columns.
///
/// Columns hash in name order, so insertion order does not matter.
pub fn compute_dataset_hash(series: &BarSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    hasher.update(series.timeframe().as_bytes());
    for bar in series.bars() {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    for name in series.column_names() {
        hasher.update(name.as_bytes());
        match series.column(name) {
            Some(Column::Numeric(values)) => {
                for v in values {
                    hasher.update(&v.to_le_bytes());
                }
            }
            Some(Column::Flag(values)) => {
                for &v in values {
                    hasher.update(&[u8::from(v)]);
                }
            }
            None => {}
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ── CSV ──────────────────────────────────────────────────────────────

const TIMESTAMP: &str = "timestamp";
const OHLCV: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Reads bars from a CSV file with a header row.
///
/// Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or integer
/// epoch milliseconds. Extra columns become feature columns: all-boolean
/// columns (`true`/`false`) become flags, the rest numeric, with empty
/// cells read as `NaN`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn read_str(&self, text: &str, symbol: &str, timeframe: &str) -> Result<BarSeries, LoadError> {
        parse_csv(csv::Reader::from_reader(text.as_bytes()), symbol, timeframe)
    }
}

impl BarSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, symbol: &str, timeframe: &str) -> Result<BarSeries, LoadError> {
        let file = std::fs::File::open(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_csv(csv::Reader::from_reader(file), symbol, timeframe)
    }
}

fn parse_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    symbol: &str,
    timeframe: &str,
) -> Result<BarSeries, LoadError> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    for (i, h) in headers.iter().enumerate() {
        if headers[..i].contains(h) {
            return Err(LoadError::DuplicateColumn(h.clone()));
        }
    }
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let ts_idx = find(TIMESTAMP)?;
    let ohlcv_idx = OHLCV.map(find);
    let [open_i, high_i, low_i, close_i, vol_i] = match ohlcv_idx {
        [Ok(a), Ok(b), Ok(c), Ok(d), Ok(e)] => [a, b, c, d, e],
        other => {
            let missing = other.into_iter().find_map(Result::err);
            return Err(missing.unwrap_or_else(|| LoadError::MissingColumn("ohlcv".into())));
        }
    };
    let extra: Vec<usize> = (0..headers.len())
        .filter(|i| *i != ts_idx && !OHLCV.contains(&headers[*i].as_str()))
        .collect();

    let mut bars = Vec::new();
    let mut raw: BTreeMap<usize, Vec<String>> = extra.iter().map(|&i| (i, Vec::new())).collect();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim();
        let number = |i: usize| -> Result<f64, LoadError> {
            cell(i).parse::<f64>().map_err(|_| LoadError::BadValue {
                row,
                column: headers[i].clone(),
                value: cell(i).to_string(),
            })
        };
        bars.push(Bar::new(
            parse_timestamp(cell(ts_idx), row)?,
            number(open_i)?,
            number(high_i)?,
            number(low_i)?,
            number(close_i)?,
            number(vol_i)?,
        ));
        for (&i, values) in raw.iter_mut() {
            values.push(cell(i).to_string());
        }
    }

    let mut series = BarSeries::new(symbol, timeframe, bars)?;
    for (i, values) in raw {
        let column = parse_column(&headers[i], &values)?;
        series.insert_column(headers[i].clone(), column)?;
    }
    Ok(series)
}

fn parse_timestamp(value: &str, row: usize) -> Result<DateTime<Utc>, LoadError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&t));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: value.to_string(),
        })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_column(name: &str, values: &[String]) -> Result<Column, LoadError> {
    let non_empty = values.iter().filter(|v| !v.is_empty());
    let all_bool = non_empty.clone().count() > 0 && non_empty.clone().all(|v| parse_bool(v).is_some());
    if all_bool {
        return Ok(Column::Flag(
            values.iter().map(|v| parse_bool(v).unwrap_or(false)).collect(),
        ));
    }
    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            if v.is_empty() {
                return Ok(f64::NAN);
            }
            v.parse::<f64>().map_err(|_| LoadError::BadValue {
                row,
                column: name.to_string(),
                value: v.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Column::Numeric)
}
