//! CSV export for trade logs and equity curves.

use crate::result::BacktestResult;
use leverlab_core::domain::TradeRecord;
use leverlab_core::engine::EquitySample;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write one row per fill. Columns are flat and spreadsheet-friendly.
pub fn write_trades_csv<W: Write>(writer: W, trades: &[TradeRecord]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "date",
        "symbol",
        "side",
        "kind",
        "action",
        "quantity",
        "price",
        "fee",
        "realized_pnl",
        "balance",
    ])?;
    for trade in trades {
        csv.write_record([
            trade.date.to_rfc3339(),
            trade.symbol.clone(),
            format!("{:?}", trade.side),
            format!("{:?}", trade.kind),
            trade.action.as_str().to_string(),
            trade.quantity.to_string(),
            trade.price.to_string(),
            trade.fee.to_string(),
            trade.realized_pnl.to_string(),
            trade.balance.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_equity_csv<W: Write>(writer: W, curve: &[EquitySample]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["time", "total_balance", "unrealized_pnl"])?;
    for sample in curve {
        csv.write_record([
            sample.time.to_rfc3339(),
            sample.total_balance.to_string(),
            sample.unrealized_pnl.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Dump the full result bundle as pretty JSON alongside the CSVs. Files are
/// named by the run id so reruns of the same config overwrite their own
/// artifacts and nothing else.
pub fn write_result_files(dir: &Path, result: &BacktestResult) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir)?;
    let trades_path = dir.join(format!("{}-trades.csv", &result.run_id[..12]));
    write_trades_csv(std::fs::File::create(trades_path)?, &result.trades)?;
    let equity_path = dir.join(format!("{}-equity.csv", &result.run_id[..12]));
    write_equity_csv(std::fs::File::create(equity_path)?, &result.equity_curve)?;
    let report_path = dir.join(format!("{}-report.json", &result.run_id[..12]));
    let json = serde_json::to_string_pretty(&result.report)?;
    std::fs::write(report_path, json)?;
    Ok(())
}
