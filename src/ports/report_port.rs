//! Report export port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TallyError;
use crate::domain::frame::IndicatorFrame;
use crate::domain::voting::SignalSequence;

/// Port for exporting a run for display.
pub trait ReportPort {
    /// Writes the frame with its per-row votes and composite signal.
    fn write_signals(
        &self,
        frame: &IndicatorFrame,
        signals: &SignalSequence,
        output_path: &str,
    ) -> Result<(), TallyError>;

    /// Writes the per-step portfolio trajectory and the trade log.
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), TallyError>;
}
