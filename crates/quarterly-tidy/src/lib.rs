#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quarterly/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Normalization of transposed financials records.
//!
//! [`Normalizer`] runs the steps in order:
//!
//! 1. Pivot the records back into one row per fiscal period
//! 2. Select `Fiscal Quarter`, `Period Ending`, `Revenue`, `Net Income` and any
//!    extra columns, failing with every missing name at once
//! 3. Derive `Year` and `Quarter` from `Fiscal Quarter`
//! 4. Clean and parse `Period Ending`; unparseable dates become `None`
//! 5. Keep the first 8 periods
//!
//! # Example
//!
//! ```
//! use quarterly_core::TransposedRecord;
//! use quarterly_tidy::Normalizer;
//!
//! let records = vec![
//!     TransposedRecord::new(
//!         "Fiscal Quarter",
//!         vec!["Period Ending".into(), "Revenue".into(), "Net Income".into()],
//!     ),
//!     TransposedRecord::new(
//!         "Q4 2023",
//!         vec!["Dec 31, 2023".into(), "500".into(), "50".into()],
//!     ),
//! ];
//!
//! let table = Normalizer::new().normalize(&records).unwrap();
//! assert_eq!(table.rows()[0].year, 2023);
//! assert_eq!(table.rows()[0].quarter, "Q4");
//! ```

use quarterly_core::{
    FISCAL_QUARTER, NET_INCOME, NormalizeError, PERIOD_ENDING, REQUIRED_COLUMNS, REVENUE,
    TidyRow, TidyTable, TransposedRecord, records_from_json,
};
use tracing::{debug, warn};

mod period;
mod pivot;

pub use period::{clean_period_ending, decompose_fiscal_period, parse_period_ending};
pub use pivot::{PivotedTable, pivot};

/// Number of most recent periods kept by default.
pub const DEFAULT_MAX_PERIODS: usize = 8;

/// Configurable normalizer for transposed financials records.
#[derive(Clone, Debug)]
pub struct Normalizer {
    extra_columns: Vec<String>,
    strict_date_pattern: bool,
    max_periods: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            extra_columns: Vec::new(),
            strict_date_pattern: true,
            max_periods: DEFAULT_MAX_PERIODS,
        }
    }
}

impl Normalizer {
    /// Create a normalizer with no extra columns, strict date matching and
    /// an 8-period limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds extra metric columns to select.
    ///
    /// Names are trimmed. Repeats and names of required columns are ignored,
    /// so the first occurrence decides a column's position.
    #[must_use]
    pub fn with_extra_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            self = self.with_extra_column(column.as_ref());
        }
        self
    }

    /// Adds one extra metric column to select.
    #[must_use]
    pub fn with_extra_column(mut self, column: &str) -> Self {
        let column = column.trim();
        if !column.is_empty()
            && !REQUIRED_COLUMNS.contains(&column)
            && !self.extra_columns.iter().any(|c| c == column)
        {
            self.extra_columns.push(column.to_string());
        }
        self
    }

    /// Sets whether a `Mon D, YYYY` match is isolated from surrounding text
    /// before a date is parsed. Enabled by default.
    #[must_use]
    pub const fn strict_date_pattern(mut self, strict: bool) -> Self {
        self.strict_date_pattern = strict;
        self
    }

    /// Sets how many periods are kept from the front of the table.
    #[must_use]
    pub const fn with_max_periods(mut self, max_periods: usize) -> Self {
        self.max_periods = max_periods;
        self
    }

    /// Returns the extra columns that will be selected.
    #[must_use]
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Normalizes transposed records into a tidy table.
    pub fn normalize(&self, records: &[TransposedRecord]) -> Result<TidyTable, NormalizeError> {
        let pivoted = pivot(records)?;

        let required: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .chain(self.extra_columns.iter().map(String::as_str))
            .collect();
        let missing: Vec<String> = required
            .iter()
            .filter(|name| pivoted.column_index(name).is_none())
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "Pivoted table lacks required columns");
            return Err(NormalizeError::MissingColumns(missing));
        }

        let index = |name: &str| pivoted.column_index(name).unwrap_or_default();
        let fiscal_quarter = index(FISCAL_QUARTER);
        let period_ending = index(PERIOD_ENDING);
        let revenue = index(REVENUE);
        let net_income = index(NET_INCOME);
        let extras: Vec<(&String, usize)> = self
            .extra_columns
            .iter()
            .map(|name| (name, index(name.as_str())))
            .collect();

        let mut unparsed_dates = 0usize;
        let rows: Vec<TidyRow> = pivoted
            .rows()
            .iter()
            .take(self.max_periods)
            .map(|cells| {
                let (year, quarter) = decompose_fiscal_period(&cells[fiscal_quarter]);
                let raw_date = &cells[period_ending];
                let date = parse_period_ending(clean_period_ending(
                    raw_date,
                    self.strict_date_pattern,
                ));
                if date.is_none() {
                    unparsed_dates += 1;
                    debug!(value = %raw_date, "Period Ending could not be parsed");
                }

                TidyRow {
                    period_ending: date,
                    revenue: cells[revenue].clone(),
                    net_income: cells[net_income].clone(),
                    extra: extras
                        .iter()
                        .map(|(name, i)| ((*name).clone(), cells[*i].clone()))
                        .collect(),
                    year,
                    quarter,
                }
            })
            .collect();

        if unparsed_dates > 0 {
            warn!(unparsed_dates, "Some Period Ending values were set to null");
        }
        debug!(
            periods = rows.len(),
            available = pivoted.rows().len(),
            "Normalized financials table"
        );

        Ok(TidyTable::new(self.extra_columns.clone(), rows))
    }

    /// Normalizes records given as their JSON wire text.
    pub fn normalize_json(&self, json: &str) -> Result<TidyTable, NormalizeError> {
        let records = records_from_json(json)?;
        self.normalize(&records)
    }
}

/// Lists metric columns a caller may add on top of the required ones.
///
/// These are the pivoted column names (the first record's fields) other than
/// the four required columns, in table order, without repeats.
#[must_use]
pub fn available_metrics(records: &[TransposedRecord]) -> Vec<String> {
    let mut metrics: Vec<String> = Vec::new();
    if let Some(first) = records.first() {
        for name in first.cells() {
            if !name.is_empty()
                && !REQUIRED_COLUMNS.contains(&name)
                && !metrics.iter().any(|m| m == name)
            {
                metrics.push(name.to_string());
            }
        }
    }
    metrics
}
