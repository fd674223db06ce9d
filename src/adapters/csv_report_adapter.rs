//! CSV report adapter.
//!
//! Signal reports hold one row per price bar: close, every frame column, the
//! contribution of each enabled rule, `Votes` and `Composite_Signal`.
//! Backtest reports hold one row per step; the trade log is written next to
//! it as `<stem>_trades.csv`.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TallyError;
use crate::domain::frame::{FrameColumn, IndicatorFrame};
use crate::domain::voting::SignalSequence;
use crate::ports::report_port::ReportPort;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Sibling path of the trade log for a backtest report.
    pub fn trades_path(output_path: &str) -> PathBuf {
        let path = Path::new(output_path);
        let stem = path
            .file_stem()
            .map_or_else(|| "report".to_string(), |s| s.to_string_lossy().into_owned());
        path.with_file_name(format!("{}_trades.csv", stem))
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_err(e: csv::Error) -> TallyError {
    TallyError::Data {
        reason: format!("CSV write error: {}", e),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

impl ReportPort for CsvReportAdapter {
    fn write_signals(
        &self,
        frame: &IndicatorFrame,
        signals: &SignalSequence,
        output_path: &str,
    ) -> Result<(), TallyError> {
        if frame.len() != signals.len() {
            return Err(TallyError::LengthMismatch {
                what: "frame rows vs signal rows".to_string(),
                left: frame.len(),
                right: signals.len(),
            });
        }

        let mut wtr = csv::Writer::from_path(output_path).map_err(csv_err)?;
        let rules: Vec<String> = signals
            .rows()
            .first()
            .map(|r| r.rule_votes.iter().map(|(rule, _)| rule.to_string()).collect())
            .unwrap_or_default();

        let mut header = vec!["date".to_string(), "close".to_string()];
        header.extend(FrameColumn::ALL.iter().map(|c| c.label().to_string()));
        header.extend(rules.iter().cloned());
        header.push("Votes".to_string());
        header.push("Composite_Signal".to_string());
        wtr.write_record(&header).map_err(csv_err)?;

        for (i, row) in signals.rows().iter().enumerate() {
            let mut record = vec![row.date.to_string(), cell(row.close)];
            record.extend(FrameColumn::ALL.iter().map(|&c| cell(frame.value(c, i))));
            record.extend(row.rule_votes.iter().map(|(_, v)| v.to_string()));
            record.push(row.votes.to_string());
            record.push(row.signal.to_string());
            wtr.write_record(&record).map_err(csv_err)?;
        }
        wtr.flush()?;

        info!(path = output_path, rows = signals.len(), "signal report written");
        Ok(())
    }

    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), TallyError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(csv_err)?;
        wtr.write_record(["step", "portfolio_value", "action", "drawdown"])
            .map_err(csv_err)?;
        for (i, ((value, action), drawdown)) in result
            .history
            .iter()
            .zip(&result.actions)
            .zip(&result.drawdowns)
            .enumerate()
        {
            wtr.write_record([
                i.to_string(),
                format!("{:.2}", value),
                action.to_string(),
                format!("{:.6}", drawdown),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;

        let trades_path = Self::trades_path(output_path);
        let mut wtr = csv::Writer::from_path(&trades_path).map_err(csv_err)?;
        wtr.write_record([
            "entry_step",
            "exit_step",
            "entry_price",
            "exit_price",
            "return_pct",
        ])
        .map_err(csv_err)?;
        for trade in &result.trades {
            wtr.write_record([
                trade.entry_index.to_string(),
                trade.exit_index.to_string(),
                trade.entry_price.to_string(),
                trade.exit_price.to_string(),
                format!("{:.4}", trade.return_pct),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;

        info!(
            path = output_path,
            trades_path = %trades_path.display(),
            steps = result.history.len(),
            "backtest report written"
        );
        Ok(())
    }
}
