//! Traits at the pipeline's external seams.
//!
//! - [`PageFetcher`] - Retrieves a page for a URL
//! - [`ReportGenerator`] - Turns a finished tidy table into narrative text

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{FetchError, ReportError},
    types::{RawPage, TidyTable},
};

/// Retrieves raw pages over the network.
///
/// Implementations make exactly one attempt per call; a failed attempt is
/// terminal for the request.
#[async_trait]
pub trait PageFetcher: Send + Sync + Debug {
    /// Returns the name of this fetcher (e.g., "stockanalysis.com").
    fn name(&self) -> &str;

    /// Fetches the page at `url`.
    ///
    /// Fails with [`FetchError::Http`] on a non-success status and with
    /// [`FetchError::Network`] when no response was received.
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError>;
}

/// Produces a narrative analyst report from a tidy table.
#[async_trait]
pub trait ReportGenerator: Send + Sync + Debug {
    /// Returns the name of this generator.
    fn name(&self) -> &str;

    /// Generates the report text. The response is treated as opaque text.
    async fn generate(&self, table: &TidyTable) -> Result<String, ReportError>;
}
