//! Static symbol catalog.
//!
//! Listed companies per market with the symbol their price files are stored
//! under. Symbols outside the catalog are still accepted everywhere; the
//! catalog only names what is known.

use crate::domain::error::TallyError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    /// Philippine Stock Exchange, `.PS` suffixed symbols.
    Ph,
    Global,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::Ph, Market::Global];

    pub fn name(&self) -> &'static str {
        match self {
            Market::Ph => "ph",
            Market::Global => "global",
        }
    }

    pub fn listings(&self) -> &'static [Listing] {
        match self {
            Market::Ph => PH_LISTINGS,
            Market::Global => GLOBAL_LISTINGS,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Market {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ph" | "pse" => Ok(Market::Ph),
            "global" | "us" => Ok(Market::Global),
            other => Err(TallyError::Data {
                reason: format!("unknown market '{}' (expected ph or global)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub name: &'static str,
    pub symbol: &'static str,
}

const fn listing(name: &'static str, symbol: &'static str) -> Listing {
    Listing { name, symbol }
}

const PH_LISTINGS: &[Listing] = &[
    listing("Jollibee Foods Corporation", "JFC.PS"),
    listing("Ayala Land, Inc.", "ALI.PS"),
    listing("SM Prime Holdings, Inc.", "SMPH.PS"),
    listing("SM Investments Corporation", "SM.PS"),
    listing("BDO Unibank, Inc.", "BDO.PS"),
    listing("Bank of the Philippine Islands", "BPI.PS"),
    listing("Ayala Corporation", "AC.PS"),
    listing("Globe Telecom, Inc.", "GLO.PS"),
    listing("PLDT Inc.", "TEL.PS"),
    listing("Universal Robina Corporation", "URC.PS"),
    listing("Manila Electric Company", "MER.PS"),
];

const GLOBAL_LISTINGS: &[Listing] = &[
    listing("Apple Inc.", "AAPL"),
    listing("Microsoft Corporation", "MSFT"),
    listing("NVIDIA Corporation", "NVDA"),
    listing("Alphabet Inc.", "GOOGL"),
    listing("JPMorgan Chase & Co.", "JPM"),
    listing("Bank of America Corporation", "BAC"),
    listing("Exxon Mobil Corporation", "XOM"),
    listing("Tesla, Inc.", "TSLA"),
    listing("Amazon.com, Inc.", "AMZN"),
];

/// Finds a symbol in any market, ignoring case.
pub fn lookup(symbol: &str) -> Option<(Market, &'static Listing)> {
    let symbol = symbol.trim();
    Market::ALL.iter().find_map(|&market| {
        market
            .listings()
            .iter()
            .find(|l| l.symbol.eq_ignore_ascii_case(symbol))
            .map(|l| (market, l))
    })
}

/// Listings of one market, or of every market when `market` is `None`.
pub fn listings(market: Option<Market>) -> Vec<(Market, &'static Listing)> {
    Market::ALL
        .iter()
        .filter(|m| market.is_none_or(|wanted| wanted == **m))
        .flat_map(|&m| m.listings().iter().map(move |l| (m, l)))
        .collect()
}
