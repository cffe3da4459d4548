//! Exchange modes and ticker URL construction.
//!
//! This module defines [`Exchange`], the two ways a ticker can be entered, and
//! [`TickerQuery`], which turns raw ticker text into the quarterly financials
//! page URL on stockanalysis.com.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default host serving the financials pages.
pub const STOCKANALYSIS_BASE_URL: &str = "https://stockanalysis.com";

/// Query string selecting the quarterly view of a financials page.
const QUARTERLY_QUERY: &str = "?p=quarterly";

/// How a ticker symbol should be resolved to a page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// The primary exchange (NASDAQ); the ticker is used as-is, lowercased.
    #[default]
    Nasdaq,
    /// Any other exchange, entered as `EXCH:TICKER` (or a bare ticker).
    Other,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nasdaq => write!(f, "nasdaq"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Exchange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nasdaq" | "primary" => Ok(Self::Nasdaq),
            "other" => Ok(Self::Other),
            other => Err(Error::InvalidExchange(format!(
                "'{other}', expected 'nasdaq' or 'other'"
            ))),
        }
    }
}

/// A validated ticker lookup.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickerQuery {
    exchange: Exchange,
    ticker: String,
}

impl TickerQuery {
    /// Validates raw ticker text for the given exchange mode.
    ///
    /// Surrounding whitespace is trimmed. An empty ticker, or an `EXCH:TICKER`
    /// form with an empty side, is rejected.
    pub fn new(exchange: Exchange, ticker: &str) -> Result<Self> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(Error::InvalidTicker("empty ticker".to_string()));
        }

        if exchange == Exchange::Other {
            if let Some((prefix, value)) = ticker.split_once(':') {
                if prefix.trim().is_empty() || value.trim().is_empty() {
                    return Err(Error::InvalidTicker(format!(
                        "'{ticker}' must look like EXCH:TICKER"
                    )));
                }
            }
        }

        Ok(Self {
            exchange,
            ticker: ticker.to_string(),
        })
    }

    /// Returns the exchange mode.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Returns the trimmed ticker text as entered.
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Builds the quarterly financials URL on stockanalysis.com.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_with_base(STOCKANALYSIS_BASE_URL)
    }

    /// Builds the quarterly financials URL against another host.
    ///
    /// | Mode | Input | Path |
    /// |---|---|---|
    /// | Nasdaq | `TICKER` | `/stocks/{lowercase ticker}/financials/` |
    /// | Other | `EXCH:TICKER` | `/quote/{lowercase exch}/{ticker}/financials/` |
    /// | Other | `TICKER` | `/stocks/{ticker}/financials/` |
    #[must_use]
    pub fn url_with_base(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        match self.exchange {
            Exchange::Nasdaq => format!(
                "{base}/stocks/{}/financials/{QUARTERLY_QUERY}",
                self.ticker.to_lowercase()
            ),
            Exchange::Other => match self.ticker.split_once(':') {
                Some((prefix, value)) => format!(
                    "{base}/quote/{}/{}/financials/{QUARTERLY_QUERY}",
                    prefix.trim().to_lowercase(),
                    value.trim()
                ),
                None => format!("{base}/stocks/{}/financials/{QUARTERLY_QUERY}", self.ticker),
            },
        }
    }
}

impl fmt::Display for TickerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ticker, self.exchange)
    }
}
