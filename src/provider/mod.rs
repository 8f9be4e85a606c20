use anyhow::Result;

use crate::fund::Fund;

pub mod kh;

/// One element of a fetched rate series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatePoint {
    pub timestamp_ms: i64,
    pub rate: Option<f64>,
}

impl RatePoint {
    pub fn new(timestamp_ms: i64, rate: Option<f64>) -> Self {
        Self { timestamp_ms, rate }
    }
}

pub trait HistoryProvider {
    /// Fetches the rate series of `fund` between two epoch milliseconds.
    async fn get_history(&self, fund: &Fund, from_ms: i64, to_ms: i64) -> Result<Vec<RatePoint>>;
}
