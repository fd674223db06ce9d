//! Data access port trait.

use crate::domain::error::TallyError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Ordered, deduplicated bars for `symbol` within the inclusive date
    /// range. An empty result is `TallyError::NoData`.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TallyError>;
}
