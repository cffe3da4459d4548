#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quarterly/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! stockanalysis.com fetcher and table extractor.
//!
//! This crate implements the first two pipeline stages:
//!
//! - [`StockAnalysisFetcher`] implements [`PageFetcher`]: one GET per call,
//!   a fixed `User-Agent`, a bounded timeout, no retries
//! - [`TableExtractor`] turns the page body into transposed records
//!
//! # Example
//!
//! ```no_run
//! use quarterly_core::{Exchange, PageFetcher, TickerQuery};
//! use quarterly_stockanalysis::{StockAnalysisFetcher, TableExtractor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = StockAnalysisFetcher::new()?;
//! let query = TickerQuery::new(Exchange::Nasdaq, "AAPL")?;
//!
//! let page = fetcher.fetch(&query.url()).await?;
//! let extraction = TableExtractor::new().extract(&page)?;
//! println!("{} columns", extraction.records.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use quarterly_core::{FetchError, PageFetcher, RawPage, TickerQuery};
use reqwest::{Client, header};
use tracing::debug;

mod extract;
pub use extract::{TableExtractor, parse_financials_table};

/// User agent sent with every page request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Upper bound on a single page request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches pages from stockanalysis.com.
#[derive(Debug, Clone)]
pub struct StockAnalysisFetcher {
    client: Client,
    user_agent: String,
}

impl StockAnalysisFetcher {
    /// Create a fetcher with the default user agent and a 10 second timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom user agent and timeout.
    pub fn with_options(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    /// Create a fetcher around a pre-configured HTTP client.
    ///
    /// The default user agent is still sent with each request; the timeout is
    /// whatever the client was built with.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Fetches the quarterly financials page for a ticker.
    pub async fn fetch_financials_page(&self, query: &TickerQuery) -> Result<RawPage, FetchError> {
        self.fetch(&query.url()).await
    }
}

#[async_trait]
impl PageFetcher for StockAnalysisFetcher {
    fn name(&self) -> &str {
        "stockanalysis.com"
    }

    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        debug!(url, "Fetching page");

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        debug!(url, status = status.as_u16(), bytes = body.len(), "Fetched page");
        Ok(RawPage::new(url, status.as_u16(), body))
    }
}
