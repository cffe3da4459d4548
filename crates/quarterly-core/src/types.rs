//! Core data types for the financials pipeline.
//!
//! This module defines the structures that flow between stages:
//!
//! - [`RawPage`] - Fetched page body
//! - [`RawTable`] - Parsed source table before reshaping
//! - [`TransposedRecord`] - One source column, keyed `Header`, `Row 1`..`Row N`
//! - [`Extraction`] - Records plus the currency/units context label
//! - [`TidyRow`] - One normalized fiscal period
//! - [`TidyTable`] - Normalized periods, most recent first

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ExtractError;

/// Column holding the combined fiscal year and quarter label.
pub const FISCAL_QUARTER: &str = "Fiscal Quarter";
/// Column holding the period-ending date.
pub const PERIOD_ENDING: &str = "Period Ending";
/// Revenue column.
pub const REVENUE: &str = "Revenue";
/// Net income column.
pub const NET_INCOME: &str = "Net Income";
/// Derived fiscal year column.
pub const YEAR: &str = "Year";
/// Derived quarter label column.
pub const QUARTER: &str = "Quarter";

/// Columns every normalized table must be built from.
pub const REQUIRED_COLUMNS: [&str; 4] = [FISCAL_QUARTER, PERIOD_ENDING, REVENUE, NET_INCOME];

/// Key of the source-column label in a serialized [`TransposedRecord`].
pub const HEADER_KEY: &str = "Header";

const ROW_KEY_PREFIX: &str = "Row ";

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Builds the `Row {n}` key for a 1-based row index.
#[must_use]
pub fn row_key(index: usize) -> String {
    format!("{ROW_KEY_PREFIX}{index}")
}

/// A fetched page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPage {
    /// URL the page was fetched from.
    pub url: String,
    /// HTTP status of the response.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl RawPage {
    /// Creates a page from its URL, status and body.
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }
}

/// A financials table as laid out on the page, before reshaping.
///
/// Rows whose width differs from `headers` are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    secondary_headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Creates a table from its two header rows.
    ///
    /// `headers` must be non-empty. A non-empty `secondary_headers` must be at
    /// least as wide as `headers`; cells beyond that width are ignored.
    pub fn new(
        headers: Vec<String>,
        mut secondary_headers: Vec<String>,
    ) -> Result<Self, ExtractError> {
        if headers.is_empty() {
            return Err(ExtractError::MalformedTable(
                "header row has no cells".to_string(),
            ));
        }
        if !secondary_headers.is_empty() && secondary_headers.len() < headers.len() {
            return Err(ExtractError::MalformedTable(format!(
                "secondary header row has {} cells, expected {}",
                secondary_headers.len(),
                headers.len()
            )));
        }
        secondary_headers.truncate(headers.len());

        Ok(Self {
            headers,
            secondary_headers,
            rows: Vec::new(),
        })
    }

    /// Adds a data row if its width matches the header row.
    ///
    /// Returns `false` when the row was dropped.
    pub fn push_row(&mut self, cells: Vec<String>) -> bool {
        if cells.len() != self.headers.len() {
            return false;
        }
        self.rows.push(cells);
        true
    }

    /// Returns the first header row.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the second header row (empty when the page had none).
    #[must_use]
    pub fn secondary_headers(&self) -> &[String] {
        &self.secondary_headers
    }

    /// Returns the retained data rows, excluding the secondary header row.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Iterates data rows with a non-empty secondary header row first.
    pub fn data_rows(&self) -> impl Iterator<Item = &[String]> {
        let secondary = (!self.secondary_headers.is_empty()).then_some(&self.secondary_headers);
        secondary
            .into_iter()
            .chain(self.rows.iter())
            .map(Vec::as_slice)
    }

    /// Swaps axes: one record per header column, one `Row i` value per data row.
    #[must_use]
    pub fn transpose(&self) -> Vec<TransposedRecord> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| TransposedRecord {
                header: header.clone(),
                values: self.data_rows().map(|row| row[col].clone()).collect(),
            })
            .collect()
    }
}

/// One source column after transposition.
///
/// Serializes as a JSON object with keys `Header`, `Row 1`..`Row N` in that
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransposedRecord {
    /// The source column's header label.
    pub header: String,
    /// Values of that column, `values[i]` being `Row {i + 1}`.
    pub values: Vec<String>,
}

impl TransposedRecord {
    /// Creates a record from a header and its row values.
    #[must_use]
    pub fn new(header: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            header: header.into(),
            values,
        }
    }

    /// Looks a field up by its wire key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == HEADER_KEY {
            return Some(&self.header);
        }
        let index = parse_row_key(key)?;
        self.values.get(index - 1).map(String::as_str)
    }

    /// Number of `Row i` fields.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    /// Iterates `Header` then every value, in wire order.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.header.as_str()).chain(self.values.iter().map(String::as_str))
    }
}

fn parse_row_key(key: &str) -> Option<usize> {
    key.strip_prefix(ROW_KEY_PREFIX)?
        .parse::<usize>()
        .ok()
        .filter(|index| *index >= 1)
}

impl Serialize for TransposedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(HEADER_KEY, &self.header)?;
        for (i, value) in self.values.iter().enumerate() {
            map.serialize_entry(&row_key(i + 1), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TransposedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = TransposedRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a \"Header\" key and \"Row 1\"..\"Row N\" string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut header = None;
        let mut indexed: Vec<(usize, String)> = Vec::new();

        while let Some(key) = access.next_key::<String>()? {
            if key == HEADER_KEY {
                if header.is_some() {
                    return Err(de::Error::duplicate_field(HEADER_KEY));
                }
                header = Some(access.next_value::<String>()?);
            } else if let Some(index) = parse_row_key(&key) {
                indexed.push((index, access.next_value::<String>()?));
            } else {
                return Err(de::Error::custom(format!("unexpected key '{key}'")));
            }
        }

        let header = header.ok_or_else(|| de::Error::missing_field(HEADER_KEY))?;
        indexed.sort_by_key(|(index, _)| *index);
        for (expected, (index, _)) in indexed.iter().enumerate() {
            if *index != expected + 1 {
                return Err(de::Error::custom(format!(
                    "row keys must run from 'Row 1' without gaps, found '{}'",
                    row_key(*index)
                )));
            }
        }

        Ok(TransposedRecord {
            header,
            values: indexed.into_iter().map(|(_, value)| value).collect(),
        })
    }
}

/// Output of the table extractor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// One record per source column, in column order.
    pub records: Vec<TransposedRecord>,
    /// Currency/units disclosure shown next to the table, if present.
    pub context_label: Option<String>,
}

/// One normalized fiscal period.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TidyRow {
    /// Date the period ended, `None` when the source value could not be parsed.
    pub period_ending: Option<NaiveDate>,
    /// Revenue as shown on the page.
    pub revenue: String,
    /// Net income as shown on the page.
    pub net_income: String,
    /// Additional selected metrics, in selection order.
    pub extra: Vec<(String, String)>,
    /// Fiscal year, 0 when the label had no year.
    pub year: i32,
    /// Quarter label `Q<digit>`, `Q0` when the label had no quarter.
    pub quarter: String,
}

impl TidyRow {
    /// Returns `period_ending` as `YYYY-MM-DD`.
    #[must_use]
    pub fn period_ending_iso(&self) -> Option<String> {
        self.period_ending
            .map(|date| date.format("%Y-%m-%d").to_string())
    }

    /// Looks up a metric value by column name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&str> {
        match name {
            REVENUE => Some(&self.revenue),
            NET_INCOME => Some(&self.net_income),
            _ => self
                .extra
                .iter()
                .find(|(column, _)| column == name)
                .map(|(_, value)| value.as_str()),
        }
    }

    fn display_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.extra.len() + 5);
        cells.push(self.period_ending_iso().unwrap_or_default());
        cells.push(self.revenue.clone());
        cells.push(self.net_income.clone());
        cells.extend(self.extra.iter().map(|(_, value)| value.clone()));
        cells.push(self.year.to_string());
        cells.push(self.quarter.clone());
        cells
    }
}

impl Serialize for TidyRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 5))?;
        map.serialize_entry(PERIOD_ENDING, &self.period_ending_iso())?;
        map.serialize_entry(REVENUE, &self.revenue)?;
        map.serialize_entry(NET_INCOME, &self.net_income)?;
        for (column, value) in &self.extra {
            map.serialize_entry(column, value)?;
        }
        map.serialize_entry(YEAR, &self.year)?;
        map.serialize_entry(QUARTER, &self.quarter)?;
        map.end()
    }
}

/// A tidy table: one row per fiscal period, one column per metric.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TidyTable {
    extra_columns: Vec<String>,
    rows: Vec<TidyRow>,
}

impl TidyTable {
    /// Creates a table from its extra metric columns and rows.
    #[must_use]
    pub const fn new(extra_columns: Vec<String>, rows: Vec<TidyRow>) -> Self {
        Self {
            extra_columns,
            rows,
        }
    }

    /// Returns every column name in output order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![PERIOD_ENDING, REVENUE, NET_INCOME];
        columns.extend(self.extra_columns.iter().map(String::as_str));
        columns.push(YEAR);
        columns.push(QUARTER);
        columns
    }

    /// Returns the extra metric columns.
    #[must_use]
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Returns the rows, most recent period first.
    #[must_use]
    pub fn rows(&self) -> &[TidyRow] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &TidyRow> {
        self.rows.iter()
    }

    /// Consumes the table and returns the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<TidyRow> {
        self.rows
    }

    /// Serializes the table as a pretty-printed JSON array of row objects.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Converts the table into a polars DataFrame.
    ///
    /// `Period Ending` is a `Date` column (null where unparsed), `Year` is
    /// `Int32`, every metric and `Quarter` stay strings.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let days: Vec<Option<i32>> = self
            .rows
            .iter()
            .map(|row| {
                row.period_ending
                    .map(|date| date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            })
            .collect();
        let revenue: Vec<String> = self.rows.iter().map(|r| r.revenue.clone()).collect();
        let net_income: Vec<String> = self.rows.iter().map(|r| r.net_income.clone()).collect();

        let mut columns = vec![
            Column::new(PERIOD_ENDING.into(), days),
            Column::new(REVENUE.into(), revenue),
            Column::new(NET_INCOME.into(), net_income),
        ];
        for (i, name) in self.extra_columns.iter().enumerate() {
            let values: Vec<String> = self
                .rows
                .iter()
                .map(|row| {
                    row.extra
                        .get(i)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default()
                })
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        let years: Vec<i32> = self.rows.iter().map(|r| r.year).collect();
        let quarters: Vec<String> = self.rows.iter().map(|r| r.quarter.clone()).collect();
        columns.push(Column::new(YEAR.into(), years));
        columns.push(Column::new(QUARTER.into(), quarters));

        DataFrame::new(columns)?
            .lazy()
            .with_column(col(PERIOD_ENDING).cast(DataType::Date))
            .collect()
    }
}

impl Serialize for TidyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

impl<'a> IntoIterator for &'a TidyTable {
    type Item = &'a TidyRow;
    type IntoIter = std::slice::Iter<'a, TidyRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl fmt::Display for TidyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.columns();
        let body: Vec<Vec<String>> = self.rows.iter().map(TidyRow::display_cells).collect();

        let mut widths: Vec<usize> = header.iter().map(|c| c.chars().count()).collect();
        for cells in &body {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let write_line = |f: &mut fmt::Formatter<'_>, cells: &[&str]| -> fmt::Result {
            let line = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}", width = *width))
                .collect::<Vec<_>>()
                .join(" | ");
            writeln!(f, "{}", line.trim_end())
        };

        write_line(f, &header)?;
        let rule = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{rule}")?;
        for cells in &body {
            let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
            write_line(f, &cells)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample_table() -> RawTable {
        let mut table = RawTable::new(
            strings(&["Fiscal Quarter", "Q4 2023", "Q3 2023"]),
            strings(&["Period Ending", "Dec 31, 2023", "Sep 30, 2023"]),
        )
        .unwrap();
        assert!(table.push_row(strings(&["Revenue", "500", "450"])));
        assert!(!table.push_row(strings(&["Upgrade", "to Pro"])));
        assert!(table.push_row(strings(&["Net Income", "50", "40"])));
        table
    }

    fn sample_row() -> TidyRow {
        TidyRow {
            period_ending: NaiveDate::from_ymd_opt(2024, 3, 31),
            revenue: "1,200".to_string(),
            net_income: "-15".to_string(),
            extra: vec![("EPS (Basic)".to_string(), "0.42".to_string())],
            year: 2024,
            quarter: "Q1".to_string(),
        }
    }

    #[test]
    fn test_raw_table_rejects_bad_header_rows() {
        assert!(matches!(
            RawTable::new(Vec::new(), Vec::new()),
            Err(ExtractError::MalformedTable(_))
        ));
        assert!(matches!(
            RawTable::new(strings(&["a", "b"]), strings(&["x"])),
            Err(ExtractError::MalformedTable(_))
        ));

        let table = RawTable::new(strings(&["a", "b"]), strings(&["x", "y", "z"])).unwrap();
        assert_eq!(table.secondary_headers(), &strings(&["x", "y"])[..]);
    }

    #[test]
    fn test_transpose_prepends_secondary_headers() {
        let records = sample_table().transpose();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].header, "Fiscal Quarter");
        assert_eq!(
            records[0].values,
            strings(&["Period Ending", "Revenue", "Net Income"])
        );
        assert_eq!(records[1].header, "Q4 2023");
        assert_eq!(records[1].values, strings(&["Dec 31, 2023", "500", "50"]));
        assert!(records.iter().all(|r| r.row_count() == 3));
    }

    #[test]
    fn test_transpose_without_secondary_headers() {
        let mut table = RawTable::new(strings(&["a", "b"]), Vec::new()).unwrap();
        table.push_row(strings(&["1", "2"]));
        let records = table.transpose();
        assert_eq!(records[0].values, strings(&["1"]));
        assert_eq!(records[1].values, strings(&["2"]));
    }

    #[test]
    fn test_record_wire_order_and_lookup() {
        let record = TransposedRecord::new("Q1 2024", strings(&["Mar 31, 2024", "10"]));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"Header":"Q1 2024","Row 1":"Mar 31, 2024","Row 2":"10"}"#
        );
        assert_eq!(record.get("Header"), Some("Q1 2024"));
        assert_eq!(record.get("Row 2"), Some("10"));
        assert_eq!(record.get("Row 3"), None);
        assert_eq!(record.get("Row 0"), None);
    }

    #[test]
    fn test_record_deserialize_sorts_row_keys() {
        let record: TransposedRecord =
            serde_json::from_str(r#"{"Row 2":"b","Header":"h","Row 1":"a"}"#).unwrap();
        assert_eq!(record, TransposedRecord::new("h", strings(&["a", "b"])));
    }

    #[test]
    fn test_record_deserialize_rejects_malformed_objects() {
        assert!(serde_json::from_str::<TransposedRecord>(r#"{"Row 1":"a"}"#).is_err());
        assert!(serde_json::from_str::<TransposedRecord>(r#"{"Header":"h","Row 2":"a"}"#).is_err());
        assert!(serde_json::from_str::<TransposedRecord>(r#"{"Header":"h","Other":"a"}"#).is_err());
        assert!(serde_json::from_str::<TransposedRecord>(r#"{"Header":"h","Row 1":5}"#).is_err());
    }

    #[test]
    fn test_tidy_row_json_uses_iso_dates_and_column_order() {
        let mut missing_date = sample_row();
        missing_date.period_ending = None;
        let table = TidyTable::new(
            vec!["EPS (Basic)".to_string()],
            vec![sample_row(), missing_date],
        );

        let value: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
        assert_eq!(value[0]["Period Ending"], "2024-03-31");
        assert_eq!(value[0]["Year"], 2024);
        assert_eq!(value[0]["EPS (Basic)"], "0.42");
        assert!(value[1]["Period Ending"].is_null());

        let compact = serde_json::to_string(&table.rows()[0]).unwrap();
        assert!(compact.starts_with(r#"{"Period Ending":"2024-03-31","Revenue":"1,200""#));
        assert!(compact.ends_with(r#""Year":2024,"Quarter":"Q1"}"#));
    }

    #[test]
    fn test_tidy_row_metric_lookup() {
        let row = sample_row();
        assert_eq!(row.metric("Revenue"), Some("1,200"));
        assert_eq!(row.metric("Net Income"), Some("-15"));
        assert_eq!(row.metric("EPS (Basic)"), Some("0.42"));
        assert_eq!(row.metric("Free Cash Flow"), None);
    }

    #[test]
    fn test_to_dataframe_types_columns() {
        let table = TidyTable::new(vec!["EPS (Basic)".to_string()], vec![sample_row()]);
        let df = table.to_dataframe().unwrap();

        assert_eq!(df.height(), 1);
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Period Ending",
                "Revenue",
                "Net Income",
                "EPS (Basic)",
                "Year",
                "Quarter"
            ]
        );
        assert_eq!(df.column("Period Ending").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("Year").unwrap().dtype(), &DataType::Int32);
    }

    #[test]
    fn test_display_renders_header_and_rows() {
        let table = TidyTable::new(Vec::new(), vec![sample_row()]);
        let text = table.to_string();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Period Ending | Revenue"));
        assert!(lines.next().unwrap().starts_with("-------------"));
        assert!(lines.next().unwrap().starts_with("2024-03-31"));
    }
}
