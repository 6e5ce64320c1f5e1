//! Bar loading for the CLI: CSV files on disk, with a seeded synthetic
//! fallback for runs without real data.
//!
//! CSV files live in one directory, named `<symbol>-<timeframe>.csv`
//! (e.g. `BTC-USDT-1h.csv`) with columns
//! `open_time,open,high,low,close,volume` and RFC 3339 open times.

use crate::config::RunConfig;
use chrono::{DateTime, Utc};
use leverlab_core::data::{random_walk, InMemorySource};
use leverlab_core::domain::{Bar, Timeframe};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: bad row {row}: {reason}")]
    BadRow {
        path: String,
        row: usize,
        reason: String,
    },
    #[error("{path}: bars are not ordered by time (row {row})")]
    Unordered { path: String, row: usize },
}

/// Load every (symbol, timeframe) the config requires from CSV files in
/// `dir`. A missing file surfaces later as the engine's missing-history
/// error, so partial directories fail cleanly instead of silently trading
/// on nothing.
pub fn load_csv_dir(dir: &Path, config: &RunConfig) -> Result<InMemorySource, LoadError> {
    let mut source = InMemorySource::new();
    for symbol in &config.symbols {
        let mut timeframes = vec![symbol.trading_timeframe];
        for &tf in &symbol.extra_timeframes {
            if !timeframes.contains(&tf) {
                timeframes.push(tf);
            }
        }
        for timeframe in timeframes {
            let path = dir.join(format!("{}-{}.csv", symbol.symbol, timeframe.as_str()));
            if !path.exists() {
                continue;
            }
            let bars = load_csv_file(&path, &symbol.symbol, timeframe)?;
            source.insert(&symbol.symbol, timeframe, bars);
        }
    }
    Ok(source)
}

fn load_csv_file(path: &Path, symbol: &str, timeframe: Timeframe) -> Result<Vec<Bar>, LoadError> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let mut bars = Vec::new();
    let mut last_time: Option<DateTime<Utc>> = None;

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: display.clone(),
            source,
        })?;
        let bad = |reason: &str| LoadError::BadRow {
            path: display.clone(),
            row,
            reason: reason.to_string(),
        };

        let open_time = record
            .get(0)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| bad("invalid open_time"))?;
        let field = |i: usize, name: &str| -> Result<f64, LoadError> {
            record
                .get(i)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| bad(name))
        };
        let bar = Bar {
            symbol: symbol.to_string(),
            timeframe,
            open: field(1, "invalid open")?,
            high: field(2, "invalid high")?,
            low: field(3, "invalid low")?,
            close: field(4, "invalid close")?,
            volume: field(5, "invalid volume")?,
            open_time,
            close_time: open_time + timeframe.duration(),
        };
        if !bar.is_sane() {
            return Err(bad("inconsistent OHLC values"));
        }
        if let Some(last) = last_time {
            if bar.close_time < last {
                return Err(LoadError::Unordered {
                    path: display.clone(),
                    row,
                });
            }
        }
        last_time = Some(bar.close_time);
        bars.push(bar);
    }
    tracing::debug!(symbol, timeframe = timeframe.as_str(), bars = bars.len(), "loaded series");
    Ok(bars)
}

/// Generate a seeded random-walk series for every (symbol, timeframe) the
/// config requires, spanning warmup history plus the full simulated range.
pub fn synthetic_source(config: &RunConfig, seed: u64) -> InMemorySource {
    let mut source = InMemorySource::new();
    for (i, symbol) in config.symbols.iter().enumerate() {
        let mut timeframes = vec![symbol.trading_timeframe];
        for &tf in &symbol.extra_timeframes {
            if !timeframes.contains(&tf) {
                timeframes.push(tf);
            }
        }
        for timeframe in timeframes {
            let step = timeframe.duration();
            let warmup = step * config.max_window as i32;
            let data_start = config.start - warmup;
            let span = config.end - data_start;
            let n = (span.num_seconds() / step.num_seconds()).max(1) as usize + 1;
            let bars = random_walk(
                &symbol.symbol,
                timeframe,
                data_start,
                n,
                seed.wrapping_add(i as u64),
                1_000.0,
                0.01,
            );
            source.insert(&symbol.symbol, timeframe, bars);
        }
    }
    source
}
