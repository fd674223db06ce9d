//! Voting engine.
//!
//! Each enabled rule is a boolean predicate over frame row t (and t-1 for the
//! MACD crossover). A rule that holds contributes its weight; a rule that is
//! false or whose inputs are undefined contributes 0. The composite signal is
//! `Buy` at `votes >= 2`, `Sell` at `votes <= -2` and `Hold` otherwise.
//!
//! Voting is stateless: the same frame and config always give the same
//! sequence.

use crate::domain::error::TallyError;
use crate::domain::frame::{FrameColumn, IndicatorFrame};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const BUY_THRESHOLD: i32 = 2;
pub const SELL_THRESHOLD: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "Buy"),
            Signal::Hold => write!(f, "Hold"),
            Signal::Sell => write!(f, "Sell"),
        }
    }
}

impl FromStr for Signal {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Signal::Buy),
            "hold" => Ok(Signal::Hold),
            "sell" => Ok(Signal::Sell),
            other => Err(TallyError::Data {
                reason: format!("unknown signal '{}'", other),
            }),
        }
    }
}

/// Maps a vote total to a composite signal.
pub fn composite_signal(votes: i32) -> Signal {
    if votes >= BUY_THRESHOLD {
        Signal::Buy
    } else if votes <= SELL_THRESHOLD {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteRule {
    MacdCrossover,
    BollingerBounce,
    StochasticOversold,
    RsiOversold,
    AdxTrending,
}

impl VoteRule {
    pub const ALL: [VoteRule; 5] = [
        VoteRule::MacdCrossover,
        VoteRule::BollingerBounce,
        VoteRule::StochasticOversold,
        VoteRule::RsiOversold,
        VoteRule::AdxTrending,
    ];

    pub fn weight(&self) -> i32 {
        1
    }

    pub fn name(&self) -> &'static str {
        match self {
            VoteRule::MacdCrossover => "macd_crossover",
            VoteRule::BollingerBounce => "bollinger_bounce",
            VoteRule::StochasticOversold => "stochastic_oversold",
            VoteRule::RsiOversold => "rsi_oversold",
            VoteRule::AdxTrending => "adx_trending",
        }
    }

    /// `None` when an input at `index` (or `index - 1`) is undefined.
    pub fn evaluate(
        &self,
        frame: &IndicatorFrame,
        index: usize,
        thresholds: &VoteThresholds,
    ) -> Option<bool> {
        let at = |column: FrameColumn| frame.value(column, index);
        match self {
            VoteRule::MacdCrossover => {
                let prev = index.checked_sub(1)?;
                let macd = at(FrameColumn::Macd)?;
                let signal = at(FrameColumn::MacdSignal)?;
                let macd_prev = frame.value(FrameColumn::Macd, prev)?;
                let signal_prev = frame.value(FrameColumn::MacdSignal, prev)?;
                Some(macd > signal && macd_prev <= signal_prev)
            }
            VoteRule::BollingerBounce => Some(frame.close(index)? < at(FrameColumn::BbLow)?),
            VoteRule::StochasticOversold => {
                let k = at(FrameColumn::StochK)?;
                let d = at(FrameColumn::StochD)?;
                Some(k > d && k < thresholds.stoch_oversold)
            }
            VoteRule::RsiOversold => Some(at(FrameColumn::Rsi)? < thresholds.rsi_oversold),
            VoteRule::AdxTrending => Some(at(FrameColumn::Adx)? > thresholds.adx_trending),
        }
    }
}

impl fmt::Display for VoteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteThresholds {
    pub stoch_oversold: f64,
    pub rsi_oversold: f64,
    pub adx_trending: f64,
}

impl Default for VoteThresholds {
    fn default() -> Self {
        Self {
            stoch_oversold: 20.0,
            rsi_oversold: 30.0,
            adx_trending: 25.0,
        }
    }
}

impl VoteThresholds {
    pub fn validate(&self) -> Result<(), TallyError> {
        for (key, value) in [
            ("stoch_oversold", self.stoch_oversold),
            ("rsi_oversold", self.rsi_oversold),
            ("adx_trending", self.adx_trending),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TallyError::invalid(
                    "voting",
                    key,
                    format!("{} must be within [0, 100]", value),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteConfig {
    pub use_macd: bool,
    pub use_bb: bool,
    pub use_stoch: bool,
    pub use_rsi: bool,
    pub use_adx: bool,
    pub thresholds: VoteThresholds,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            use_macd: true,
            use_bb: true,
            use_stoch: true,
            use_rsi: true,
            use_adx: true,
            thresholds: VoteThresholds::default(),
        }
    }
}

impl VoteConfig {
    pub fn is_enabled(&self, rule: VoteRule) -> bool {
        match rule {
            VoteRule::MacdCrossover => self.use_macd,
            VoteRule::BollingerBounce => self.use_bb,
            VoteRule::StochasticOversold => self.use_stoch,
            VoteRule::RsiOversold => self.use_rsi,
            VoteRule::AdxTrending => self.use_adx,
        }
    }

    pub fn enabled_rules(&self) -> Vec<VoteRule> {
        VoteRule::ALL
            .into_iter()
            .filter(|r| self.is_enabled(*r))
            .collect()
    }

    pub fn validate(&self) -> Result<(), TallyError> {
        self.thresholds.validate()
    }
}

/// One voted row, kept for display alongside the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: Option<f64>,
    /// Contribution of every enabled rule, in rule order.
    pub rule_votes: Vec<(VoteRule, i32)>,
    pub votes: i32,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSequence {
    rows: Vec<SignalRow>,
}

impl SignalSequence {
    pub fn rows(&self) -> &[SignalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.rows.iter().map(|r| r.signal).collect()
    }

    pub fn votes(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.votes).collect()
    }
}

pub fn apply_voting(frame: &IndicatorFrame, config: &VoteConfig) -> SignalSequence {
    let rules = config.enabled_rules();

    let rows: Vec<SignalRow> = frame
        .series()
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let rule_votes: Vec<(VoteRule, i32)> = rules
                .iter()
                .map(|rule| {
                    let holds = rule.evaluate(frame, i, &config.thresholds) == Some(true);
                    (*rule, if holds { rule.weight() } else { 0 })
                })
                .collect();
            let votes = rule_votes.iter().map(|(_, v)| v).sum();
            SignalRow {
                date: bar.date,
                close: frame.close(i),
                rule_votes,
                votes,
                signal: composite_signal(votes),
            }
        })
        .collect();

    debug!(
        rows = rows.len(),
        rules = rules.len(),
        buys = rows.iter().filter(|r| r.signal == Signal::Buy).count(),
        "voting applied"
    );

    SignalSequence { rows }
}
