#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quarterly/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Quarterly financials as tidy tables.
//!
//! This crate re-exports the core types and the stage implementations, and
//! provides [`FinancialsPipeline`], which handles one ticker request at a time:
//!
//! 1. fetch the stockanalysis.com quarterly financials page
//! 2. extract and transpose its table
//! 3. normalize it into a [`TidyTable`]
//! 4. optionally hand the table to a [`ReportGenerator`]
//!
//! # Features
//!
//! - `report` - [`ChatReportGenerator`] for chat-completions APIs (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use quarterly::{Exchange, FinancialsPipeline, TickerQuery};
//!
//! #[tokio::main]
//! async fn main() -> quarterly::Result<()> {
//!     let pipeline = FinancialsPipeline::stockanalysis()?;
//!     let query = TickerQuery::new(Exchange::Other, "NSE:TATACONSUM")?;
//!
//!     let financials = pipeline.run(&query).await?;
//!     if let Some(label) = &financials.context_label {
//!         println!("{label}");
//!     }
//!     println!("{}", financials.table);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use quarterly_core::*;

// Stages
pub use quarterly_stockanalysis::{StockAnalysisFetcher, TableExtractor};
pub use quarterly_tidy::{DEFAULT_MAX_PERIODS, Normalizer, available_metrics};

#[cfg(feature = "report")]
pub use quarterly_report::ChatReportGenerator;

mod pipeline;
pub use pipeline::{FinancialsPipeline, QuarterlyFinancials};
