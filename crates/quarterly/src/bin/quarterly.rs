//! Command-line front end: one ticker lookup per invocation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use quarterly::{
    DEFAULT_MAX_PERIODS, Exchange, FinancialsPipeline, Normalizer, StockAnalysisFetcher,
    TickerQuery,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Fetch a company's quarterly financials and print them as a tidy table.
#[derive(Parser, Debug)]
#[command(name = "quarterly")]
#[command(version)]
#[command(about = "Quarterly financials from stockanalysis.com as a tidy table")]
struct Cli {
    /// Ticker symbol (TSLA, NVDA) or, for other exchanges, EXCH:TICKER (NSE:TATACONSUM, ETR:BMW)
    ticker: String,

    /// Exchange mode: "nasdaq" or "other"
    #[arg(short, long, default_value = "nasdaq")]
    exchange: Exchange,

    /// Additional metric column to include (repeatable)
    #[arg(short = 'c', long = "column")]
    columns: Vec<String>,

    /// Parse Period Ending values as-is instead of isolating a "Mon D, YYYY" date
    #[arg(long)]
    loose_dates: bool,

    /// Number of most recent quarters to keep
    #[arg(long, default_value_t = DEFAULT_MAX_PERIODS)]
    max_periods: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Only list the metric columns available for --column
    #[arg(long)]
    list_metrics: bool,

    /// Generate a narrative analyst report from the table
    #[cfg(feature = "report")]
    #[arg(long)]
    report: bool,

    /// Model used for --report
    #[cfg(feature = "report")]
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let query = TickerQuery::new(cli.exchange, &cli.ticker)?;

    let fetcher = StockAnalysisFetcher::with_options(
        quarterly_stockanalysis::DEFAULT_USER_AGENT,
        Duration::from_secs(cli.timeout_secs),
    )?;
    let normalizer = Normalizer::new()
        .with_extra_columns(&cli.columns)
        .strict_date_pattern(!cli.loose_dates)
        .with_max_periods(cli.max_periods);
    #[allow(unused_mut)]
    let mut pipeline = FinancialsPipeline::new(Arc::new(fetcher)).with_normalizer(normalizer);

    #[cfg(feature = "report")]
    if cli.report {
        let mut generator = quarterly::ChatReportGenerator::from_env()?;
        if let Some(model) = &cli.model {
            generator = generator.with_model(model);
        }
        pipeline = pipeline.with_reporter(Arc::new(generator));
    }

    if cli.list_metrics {
        let (_, extraction) = pipeline
            .extract(&query)
            .await
            .context("Failed to fetch the financial data")?;
        for metric in quarterly::available_metrics(&extraction.records) {
            println!("{metric}");
        }
        return Ok(());
    }

    let financials = pipeline
        .run(&query)
        .await
        .context("Failed to fetch the financial data")?;
    info!(periods = financials.table.len(), url = %financials.url, "Financial data retrieved");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&financials)?);
    } else {
        if let Some(label) = &financials.context_label {
            println!("{label}\n");
        }
        print!("{}", financials.table);
    }

    #[cfg(feature = "report")]
    if cli.report {
        let report = pipeline
            .report(&financials.table)
            .await
            .context("Failed to generate the report")?;
        println!("\n{report}");
    }

    Ok(())
}
