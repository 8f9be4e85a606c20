use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fund_charts::chart::format_gain;
use fund_charts::fund::MIN_LOOKBACK_DAYS;
use fund_charts::*;

#[derive(Parser, Debug)]
#[command(about = "Chart mutual fund rates against purchase dates")]
struct Args {
    /// JSON list of funds with their purchase dates
    #[arg(long, env = "FUNDS_FILE", default_value = "funds.json")]
    funds: PathBuf,
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
    /// Minimum lookback window in days
    #[arg(long, env = "MIN_DAYS", default_value_t = MIN_LOOKBACK_DAYS)]
    min_days: i64,
    /// Fail instead of falling back when the provider series is missing
    #[arg(long, env = "STRICT_SERIES")]
    strict_series: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "fund_charts=debug,{}=debug,reqwest=info",
                env!("CARGO_CRATE_NAME")
            )
            .into()
        }))
        .with(fmt::layer())
        .init();

    let args = Args::parse();

    let funds = load_funds(&args.funds)?;
    info!("Loaded {} funds from {}", funds.len(), args.funds.display());

    let provider = KhProvider::new(args.strict_series).context("Could not build HTTP client")?;
    let options = RunOptions {
        output_dir: args.output_dir,
        min_days: args.min_days,
    };

    let summaries = run(&provider, &funds, &options).await?;

    for summary in summaries {
        info!(
            "{} : latest {} / best gain {} over {} purchases -> {}",
            summary.name.green(),
            summary.latest_rate.to_string().yellow(),
            format_gain(Some(summary.best_gain)).purple(),
            summary.purchases,
            summary.chart.display()
        );
    }

    Ok(())
}
