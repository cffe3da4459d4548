//! Pivoting transposed records back into a period-major table.

use quarterly_core::{NormalizeError, TransposedRecord};

/// A table recovered from transposed records.
///
/// The first record supplies the column names; every later record is one row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PivotedTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PivotedTable {
    /// Returns the column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows, each as wide as [`columns`](Self::columns).
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the index of a column.
    ///
    /// When several columns share a name, the first one wins.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns the cell at `row` in the named column.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }
}

/// Undoes the extractor's transposition.
///
/// `records[0]` becomes the header row; each later record becomes a data row
/// keyed by those names. Every record must have the same number of fields.
pub fn pivot(records: &[TransposedRecord]) -> Result<PivotedTable, NormalizeError> {
    let (first, rest) = records.split_first().ok_or_else(|| {
        NormalizeError::EmptyOrInvalidInput("no records to pivot".to_string())
    })?;

    let columns: Vec<String> = first.cells().map(str::to_string).collect();
    let rows = rest
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if record.row_count() != first.row_count() {
                return Err(NormalizeError::EmptyOrInvalidInput(format!(
                    "record {} has {} row fields, expected {}",
                    i + 1,
                    record.row_count(),
                    first.row_count()
                )));
            }
            Ok(record.cells().map(str::to_string).collect())
        })
        .collect::<Result<Vec<Vec<String>>, _>>()?;

    Ok(PivotedTable { columns, rows })
}
