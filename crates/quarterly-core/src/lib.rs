#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quarterly/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the quarterly financials pipeline.
//!
//! This crate provides the foundations shared by every stage:
//!
//! - [`PageFetcher`](provider::PageFetcher) - Fetches raw pages
//! - [`ReportGenerator`](provider::ReportGenerator) - Narrative report collaborator
//! - [`TickerQuery`](exchange::TickerQuery) - Ticker text to page URL
//! - [`TransposedRecord`](types::TransposedRecord) - Extractor output, with its JSON wire format
//! - [`TidyTable`](types::TidyTable) - Normalized output

/// Error types for every pipeline stage.
pub mod error;
/// Exchange modes and URL construction.
pub mod exchange;
/// Traits at the pipeline's external seams.
pub mod provider;
/// Core data types (RawTable, TransposedRecord, TidyTable, etc.).
pub mod types;
/// JSON wire format for transposed records.
pub mod wire;

// Re-export commonly used items at crate root
pub use error::{Error, ExtractError, FetchError, NormalizeError, ReportError, Result};
pub use exchange::{Exchange, STOCKANALYSIS_BASE_URL, TickerQuery};
pub use provider::{PageFetcher, ReportGenerator};
pub use types::{
    Extraction, FISCAL_QUARTER, HEADER_KEY, NET_INCOME, PERIOD_ENDING, QUARTER, REQUIRED_COLUMNS,
    REVENUE, RawPage, RawTable, TidyRow, TidyTable, TransposedRecord, YEAR, row_key,
};
pub use wire::{records_from_json, records_to_json};
