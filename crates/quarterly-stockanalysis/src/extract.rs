//! Financials table extraction.

use quarterly_core::{ExtractError, Extraction, RawPage, RawTable};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Element carrying the currency/units disclosure next to the table.
const CONTEXT_SELECTOR: &str = r#"div[class="hidden pb-1 text-sm text-faded lg:block"]"#;

/// Extracts the financials table from a page and transposes it.
///
/// The first `<table>` on the page is used. Its first row holds the column
/// headers (`<th>`), the second row a secondary header row (`<th>`) that is
/// kept as the first data row when non-empty, and every later row is a data
/// row (`<td>`) kept only when it is exactly as wide as the header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableExtractor;

impl TableExtractor {
    /// Create a new extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extracts transposed records and the context label from a fetched page.
    pub fn extract(&self, page: &RawPage) -> Result<Extraction, ExtractError> {
        debug!(url = %page.url, bytes = page.body.len(), "Extracting financials table");
        self.extract_html(&page.body)
    }

    /// Extracts transposed records and the context label from HTML text.
    pub fn extract_html(&self, html: &str) -> Result<Extraction, ExtractError> {
        let (table, context_label) = parse_financials_table(html)?;
        let records = table.transpose();
        debug!(
            columns = records.len(),
            rows = records.first().map_or(0, |r| r.row_count()),
            "Transposed financials table"
        );
        Ok(Extraction {
            records,
            context_label,
        })
    }
}

/// Parses the first table on the page and the context label beside it.
pub fn parse_financials_table(html: &str) -> Result<(RawTable, Option<String>), ExtractError> {
    let document = Html::parse_document(html);

    let table = document
        .select(&selector("table")?)
        .next()
        .ok_or(ExtractError::NoTableFound)?;

    let context_label = document
        .select(&selector(CONTEXT_SELECTOR)?)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty());

    let rows: Vec<ElementRef<'_>> = table.select(&selector("tr")?).collect();
    if rows.len() < 2 {
        return Err(ExtractError::InsufficientHeaders { found: rows.len() });
    }

    let th = selector("th")?;
    let td = selector("td")?;

    let mut raw = RawTable::new(cell_texts(rows[0], &th), cell_texts(rows[1], &th))?;

    let mut dropped = 0usize;
    for row in &rows[2..] {
        if !raw.push_row(cell_texts(*row, &td)) {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!(
            dropped,
            width = raw.headers().len(),
            "Dropped rows whose width differs from the header row"
        );
    }

    Ok((raw, context_label))
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css)
        .map_err(|e| ExtractError::MalformedTable(format!("invalid selector '{css}': {e}")))
}

fn cell_texts(row: ElementRef<'_>, cells: &Selector) -> Vec<String> {
    row.select(cells).map(element_text).collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
