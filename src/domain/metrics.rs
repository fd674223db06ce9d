//! Performance metrics over a portfolio trajectory.

use crate::domain::backtest::ClosedTrade;

/// Per-step drawdown fraction `(peak - value) / peak`, with the running peak
/// starting at `starting_capital`.
pub fn drawdown_series(history: &[f64], starting_capital: f64) -> Vec<f64> {
    let mut peak = starting_capital;
    history
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 { (peak - value) / peak } else { 0.0 }
        })
        .collect()
}

/// Largest drawdown in percent, 0 for an empty series.
pub fn max_drawdown_pct(drawdowns: &[f64]) -> f64 {
    drawdowns.iter().copied().fold(0.0_f64, f64::max) * 100.0
}

/// Return on the final value in percent, 0 when there are no steps.
pub fn roi_pct(history: &[f64], starting_capital: f64) -> f64 {
    match history.last() {
        Some(&last) if starting_capital > 0.0 => (last - starting_capital) / starting_capital * 100.0,
        _ => 0.0,
    }
}

/// Share of closed trades sold above their entry price, in percent.
pub fn win_rate_pct(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

/// Summary of closed round trips, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub trades_won: usize,
    pub trades_lost: usize,
    pub avg_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
}

impl TradeStats {
    pub fn compute(trades: &[ClosedTrade]) -> Self {
        let trades_won = trades.iter().filter(|t| t.is_win()).count();
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();

        let avg_return = if returns.is_empty() {
            0.0
        } else {
            returns.iter().sum::<f64>() / returns.len() as f64
        };

        TradeStats {
            trades_won,
            trades_lost: trades.len() - trades_won,
            avg_return,
            best_return: returns.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_return: returns.iter().copied().reduce(f64::min).unwrap_or(0.0),
        }
    }
}
