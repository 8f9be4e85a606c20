use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::chart::write_chart;
use crate::dates::{days_ago_from, format_day};
use crate::fund::{Fund, MIN_LOOKBACK_DAYS};
use crate::index::{clean_charts, write_index};
use crate::provider::HistoryProvider;
use crate::reconcile::reconcile;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub min_days: i64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            min_days: MIN_LOOKBACK_DAYS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FundSummary {
    pub name: String,
    pub chart: PathBuf,
    pub latest_rate: f64,
    pub best_gain: f64,
    pub purchases: usize,
}

pub async fn process_fund<P: HistoryProvider>(
    provider: &P,
    fund: &Fund,
    options: &RunOptions,
) -> Result<FundSummary> {
    let fund = &fund.canonical()?;
    let now = Utc::now();
    let days = fund.lookback_days(now, options.min_days)?;
    let cutoff = days_ago_from(now, days);
    info!(
        "Fetching {} ({}) since {}",
        fund.name,
        fund.isin,
        format_day(cutoff)?
    );

    let series = provider
        .get_history(fund, cutoff * 1000, now.timestamp_millis())
        .await
        .with_context(|| format!("Could not fetch history of {}", fund.name))?;
    let report = reconcile(series, cutoff, &fund.purchases)
        .with_context(|| format!("Could not reconcile {}", fund.name))?;
    let chart = write_chart(&options.output_dir, &fund.name, &report)?;

    Ok(FundSummary {
        name: fund.name.clone(),
        chart,
        latest_rate: report.latest_rate,
        best_gain: report.best_gain(),
        purchases: fund.purchases.len(),
    })
}

/// Cleans the output directory, charts every fund in order and writes the index.
///
/// The first failing fund aborts the run.
pub async fn run<P: HistoryProvider>(
    provider: &P,
    funds: &[Fund],
    options: &RunOptions,
) -> Result<Vec<FundSummary>> {
    let removed = clean_charts(&options.output_dir)?;
    info!("Removed {} old charts", removed);

    let mut summaries = Vec::with_capacity(funds.len());
    for fund in funds {
        summaries.push(process_fund(provider, fund, options).await?);
    }

    write_index(&options.output_dir)?;
    Ok(summaries)
}
