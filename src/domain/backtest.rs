//! Backtest simulator.
//!
//! Replays a signal sequence against a price sequence with a single,
//! all-in/all-out long position. No averaging in, no shorting, no costs.
//!
//! | State | Signal | Action | Next  |
//! |-------|--------|--------|-------|
//! | Flat  | Buy    | BUY    | Long  |
//! | Long  | Sell   | SELL   | Flat  |
//! | any   | other  | HOLD   | same  |

use crate::domain::error::TallyError;
use crate::domain::metrics::{drawdown_series, max_drawdown_pct, roi_pct, win_rate_pct};
use crate::domain::voting::Signal;
use std::fmt;
use tracing::{debug, info, warn};

pub const DEFAULT_STARTING_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub starting_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            starting_capital: DEFAULT_STARTING_CAPITAL,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), TallyError> {
        validate_capital(self.starting_capital)
    }
}

fn validate_capital(capital: f64) -> Result<(), TallyError> {
    if !capital.is_finite() || capital <= 0.0 {
        return Err(TallyError::invalid(
            "backtest",
            "starting_capital",
            format!("{} must be a positive number", capital),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// A completed buy/sell round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.exit_price > self.entry_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestState {
    pub balance: f64,
    pub shares: f64,
    pub entry_price: Option<f64>,
    entry_index: Option<usize>,
}

impl BacktestState {
    pub fn new(starting_capital: f64) -> Self {
        Self {
            balance: starting_capital,
            shares: 0.0,
            entry_price: None,
            entry_index: None,
        }
    }

    pub fn is_long(&self) -> bool {
        self.shares > 0.0
    }

    pub fn value(&self, price: f64) -> f64 {
        self.balance + self.shares * price
    }

    /// Applies one signal at `price`, returning the action taken and the
    /// trade it closed, if any.
    pub fn step(&mut self, index: usize, signal: Signal, price: f64) -> (Action, Option<ClosedTrade>) {
        match signal {
            Signal::Buy if !self.is_long() => {
                self.shares = self.balance / price;
                self.balance = 0.0;
                self.entry_price = Some(price);
                self.entry_index = Some(index);
                (Action::Buy, None)
            }
            Signal::Sell if self.is_long() => {
                self.balance = self.shares * price;
                self.shares = 0.0;
                let trade = self.entry_price.take().map(|entry_price| ClosedTrade {
                    entry_index: self.entry_index.unwrap_or(index),
                    exit_index: index,
                    entry_price,
                    exit_price: price,
                    return_pct: (price - entry_price) / entry_price * 100.0,
                });
                self.entry_index = None;
                (Action::Sell, trade)
            }
            _ => (Action::Hold, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub starting_capital: f64,
    pub history: Vec<f64>,
    pub actions: Vec<Action>,
    pub drawdowns: Vec<f64>,
    pub trades: Vec<ClosedTrade>,
    pub final_value: f64,
    pub roi: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub trade_count: usize,
}

pub fn run_backtest(
    signals: &[Signal],
    prices: &[f64],
    starting_capital: f64,
) -> Result<BacktestResult, TallyError> {
    validate_capital(starting_capital)?;
    if signals.len() != prices.len() {
        return Err(TallyError::LengthMismatch {
            what: "signals vs prices".to_string(),
            left: signals.len(),
            right: prices.len(),
        });
    }
    if let Some((index, &price)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(TallyError::InvalidPrice { index, price });
    }

    let mut state = BacktestState::new(starting_capital);
    let mut history = Vec::with_capacity(prices.len());
    let mut actions = Vec::with_capacity(prices.len());
    let mut trades = Vec::new();

    for (i, (&signal, &price)) in signals.iter().zip(prices).enumerate() {
        let (action, closed) = state.step(i, signal, price);
        if action != Action::Hold {
            debug!(step = i, %action, price, "position changed");
        }
        if let Some(trade) = closed {
            trades.push(trade);
        }
        actions.push(action);
        history.push(state.value(price));
    }

    let drawdowns = drawdown_series(&history, starting_capital);
    let result = BacktestResult {
        starting_capital,
        final_value: history.last().copied().unwrap_or(starting_capital),
        roi: roi_pct(&history, starting_capital),
        win_rate: win_rate_pct(&trades),
        max_drawdown: max_drawdown_pct(&drawdowns),
        trade_count: trades.len(),
        history,
        actions,
        drawdowns,
        trades,
    };

    info!(
        steps = result.history.len(),
        trades = result.trade_count,
        final_value = result.final_value,
        roi = result.roi,
        "backtest complete"
    );
    Ok(result)
}

/// Backtest over a close column that may hold undefined values.
///
/// A row whose close is undefined (non-finite or non-positive) is not
/// tradable: its signal is replaced by `Hold` and it is valued at the last
/// defined close, or the first defined close for leading rows.
/// `run_backtest` still rejects such prices when called directly.
pub fn run_backtest_on_closes(
    signals: &[Signal],
    closes: &[f64],
    starting_capital: f64,
) -> Result<BacktestResult, TallyError> {
    validate_capital(starting_capital)?;
    if signals.len() != closes.len() {
        return Err(TallyError::LengthMismatch {
            what: "signals vs prices".to_string(),
            left: signals.len(),
            right: closes.len(),
        });
    }

    let (signals, prices, masked) = tradable_inputs(signals, closes)?;
    if !masked.is_empty() {
        warn!(rows = ?masked, "undefined closes held and valued at the last defined close");
    }
    run_backtest(&signals, &prices, starting_capital)
}

fn tradable_inputs(
    signals: &[Signal],
    closes: &[f64],
) -> Result<(Vec<Signal>, Vec<f64>, Vec<usize>), TallyError> {
    let defined = |p: f64| p.is_finite() && p > 0.0;
    let Some(mut last) = closes.iter().copied().find(|&p| defined(p)) else {
        if closes.is_empty() {
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }
        return Err(TallyError::Data {
            reason: "no defined close price to trade on".to_string(),
        });
    };

    let mut out_signals = Vec::with_capacity(signals.len());
    let mut prices = Vec::with_capacity(closes.len());
    let mut masked = Vec::new();
    for (i, (&signal, &close)) in signals.iter().zip(closes).enumerate() {
        if defined(close) {
            last = close;
            out_signals.push(signal);
        } else {
            masked.push(i);
            out_signals.push(Signal::Hold);
        }
        prices.push(last);
    }
    Ok((out_signals, prices, masked))
}
