use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{canonical_day, days_since_from, parse_day};

pub const MIN_LOOKBACK_DAYS: i64 = 60;

/// Extra days fetched before the oldest purchase so it has a rate to carry.
const LOOKBACK_MARGIN_DAYS: i64 = 2;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Fund {
    #[serde(alias = "nev")]
    pub name: String,
    pub isin: String,
    #[serde(alias = "vetel", default)]
    pub purchases: BTreeSet<String>,
}

impl Fund {
    pub fn new(name: &str, isin: &str, purchases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            isin: isin.to_string(),
            purchases: purchases.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Copy of the fund with every purchase date zero-padded.
    pub fn canonical(&self) -> Result<Fund> {
        let purchases = self
            .purchases
            .iter()
            .map(|day| {
                canonical_day(day)
                    .with_context(|| format!("Bad purchase date for fund {}", self.name))
            })
            .collect::<Result<BTreeSet<String>>>()?;
        Ok(Fund {
            purchases,
            ..self.clone()
        })
    }

    /// Unix timestamp of the oldest purchase, or `None` without purchases.
    pub fn oldest_purchase(&self) -> Result<Option<i64>> {
        let mut oldest = None;
        for purchase in &self.purchases {
            let ts = parse_day(purchase)
                .with_context(|| format!("Bad purchase date for fund {}", self.name))?;
            oldest = Some(oldest.map_or(ts, |o: i64| o.min(ts)));
        }
        Ok(oldest)
    }

    /// Number of days to fetch so every purchase falls inside the window.
    pub fn lookback_days(&self, now: DateTime<Utc>, min_days: i64) -> Result<i64> {
        let oldest = self.oldest_purchase()?.unwrap_or(now.timestamp());
        let days = days_since_from(now, oldest) + LOOKBACK_MARGIN_DAYS;
        Ok(days.max(min_days).max(MIN_LOOKBACK_DAYS))
    }
}

pub fn load_funds(path: impl AsRef<Path>) -> Result<Vec<Fund>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read fund list {}", path.display()))?;
    let funds: Vec<Fund> = serde_json::from_str(&content)
        .with_context(|| format!("Could not parse fund list {}", path.display()))?;
    funds.iter().map(Fund::canonical).collect()
}
