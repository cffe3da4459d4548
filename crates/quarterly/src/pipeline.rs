//! Per-request pipeline: fetch, extract, normalize, and optionally report.

use std::sync::Arc;

use quarterly_core::{
    Error, Extraction, PageFetcher, ReportError, ReportGenerator, Result, TickerQuery, TidyTable,
};
use quarterly_stockanalysis::{StockAnalysisFetcher, TableExtractor};
use quarterly_tidy::{Normalizer, available_metrics};
use serde::Serialize;
use tracing::{Instrument, Span, debug, error, info_span};

/// Result of one successful financials request.
#[derive(Clone, Debug, Serialize)]
pub struct QuarterlyFinancials {
    /// Page the table came from.
    pub url: String,
    /// Currency/units disclosure shown next to the table.
    pub context_label: Option<String>,
    /// Metric columns that could be added with extra column selection.
    pub available_metrics: Vec<String>,
    /// The normalized table.
    pub table: TidyTable,
}

/// Runs the fetch, extract and normalize stages for one ticker at a time.
///
/// Stages run strictly in sequence and share no state between requests. A
/// failure in any stage ends the request; nothing is retried.
///
/// # Example
///
/// ```rust,ignore
/// use quarterly::{Exchange, FinancialsPipeline, Normalizer, TickerQuery};
///
/// let pipeline = FinancialsPipeline::stockanalysis()?
///     .with_normalizer(Normalizer::new().with_extra_column("Gross Profit"));
///
/// let query = TickerQuery::new(Exchange::Nasdaq, "AAPL")?;
/// let financials = pipeline.run(&query).await?;
/// println!("{}", financials.table);
/// ```
pub struct FinancialsPipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: TableExtractor,
    normalizer: Normalizer,
    reporter: Option<Arc<dyn ReportGenerator>>,
    span: Span,
}

impl std::fmt::Debug for FinancialsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinancialsPipeline")
            .field("fetcher", &self.fetcher.name())
            .field("normalizer", &self.normalizer)
            .field("reporter", &self.reporter.as_ref().map(|r| r.name()))
            .finish()
    }
}

impl FinancialsPipeline {
    /// Create a pipeline around any page fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            extractor: TableExtractor::new(),
            normalizer: Normalizer::new(),
            reporter: None,
            span: info_span!("financials"),
        }
    }

    /// Create a pipeline fetching from stockanalysis.com with default settings.
    pub fn stockanalysis() -> Result<Self> {
        Ok(Self::new(Arc::new(StockAnalysisFetcher::new()?)))
    }

    /// Set the normalizer configuration.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the report generator used by [`report`](Self::report).
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ReportGenerator>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set the span every stage's logs are recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the normalizer configuration.
    #[must_use]
    pub const fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Fetches the page for `query` and extracts its transposed records.
    pub async fn extract(&self, query: &TickerQuery) -> Result<(String, Extraction)> {
        let url = query.url();
        async {
            debug!(ticker = %query, url = %url, "Starting financials request");

            let page = self.fetcher.fetch(&url).await.map_err(|e| {
                error!(url = %url, error = %e, "Error fetching the page");
                Error::from(e)
            })?;

            let extraction = self.extractor.extract(&page).map_err(|e| {
                error!(url = %url, error = %e, "Error processing table data");
                Error::from(e)
            })?;

            Ok::<_, Error>((url.clone(), extraction))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Normalizes extracted records with this pipeline's normalizer.
    pub fn normalize(&self, url: String, extraction: Extraction) -> Result<QuarterlyFinancials> {
        let _entered = self.span.enter();

        let table = self
            .normalizer
            .normalize(&extraction.records)
            .map_err(|e| {
                error!(url = %url, error = %e, "Error processing the financials table");
                Error::from(e)
            })?;

        Ok(QuarterlyFinancials {
            url,
            context_label: extraction.context_label,
            available_metrics: available_metrics(&extraction.records),
            table,
        })
    }

    /// Runs fetch, extract and normalize for one ticker.
    pub async fn run(&self, query: &TickerQuery) -> Result<QuarterlyFinancials> {
        let (url, extraction) = self.extract(query).await?;
        self.normalize(url, extraction)
    }

    /// Generates a narrative report for a finished table.
    pub async fn report(&self, table: &TidyTable) -> Result<String> {
        let Some(reporter) = &self.reporter else {
            let e = ReportError::MissingCredential("no report generator configured".to_string());
            error!(error = %e, "Cannot generate report");
            return Err(e.into());
        };

        async {
            debug!(generator = reporter.name(), "Generating analyst report");
            reporter.generate(table).await.map_err(|e| {
                error!(generator = reporter.name(), error = %e, "Report generation failed");
                Error::from(e)
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Runs the pipeline and then generates a report for the resulting table.
    pub async fn run_with_report(&self, query: &TickerQuery) -> Result<(QuarterlyFinancials, String)> {
        let financials = self.run(query).await?;
        let report = self.report(&financials.table).await?;
        Ok((financials, report))
    }
}
