//! Error types for pipeline operations.
//!
//! Each stage has its own error enum so callers can tell a transport failure
//! from a page that no longer has the expected table. [`Error`] wraps all of
//! them for code that drives the whole pipeline.

use thiserror::Error;

/// Errors raised while fetching a page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not complete (DNS, refused connection, timeout, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// The URL that was requested.
        url: String,
    },
}

/// Errors raised while locating and reshaping the financials table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The page body has no `<table>` element.
    #[error("No table found on the page")]
    NoTableFound,

    /// The table has fewer than the two header rows the layout requires.
    #[error("Insufficient table data: expected at least 2 rows, found {found}")]
    InsufficientHeaders {
        /// Number of rows found in the table.
        found: usize,
    },

    /// The table exists but its structure cannot be reshaped.
    #[error("Malformed table: {0}")]
    MalformedTable(String),
}

/// Errors raised while turning transposed records into a tidy table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// One or more required columns are absent from the pivoted table.
    #[error("Missing expected columns: {0:?}")]
    MissingColumns(Vec<String>),

    /// The input is empty or not a list of transposed records.
    #[error("Empty or invalid input: {0}")]
    EmptyOrInvalidInput(String),
}

/// Errors raised by a report generator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// No API credential was configured.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The request to the generation service could not complete.
    #[error("Network error: {0}")]
    Network(String),

    /// The generation service rejected the request.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// Response status code.
        status: u16,
        /// Body or message returned by the service.
        message: String,
    },

    /// The service answered without any generated text.
    #[error("Empty response from report generator")]
    EmptyResponse,

    /// The table could not be serialized into the prompt.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Any error that can end a financials request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The ticker text cannot be turned into a URL.
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// The exchange mode is not one of the supported modes.
    #[error("Unknown exchange mode: {0}")]
    InvalidExchange(String),

    /// Fetching the page failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Extracting the table failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Normalizing the table failed.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Generating the narrative report failed.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = NormalizeError::MissingColumns(vec!["Net Income".to_string()]);
        assert_eq!(err.to_string(), r#"Missing expected columns: ["Net Income"]"#);
    }

    #[test]
    fn test_stage_errors_convert_transparently() {
        let err: Error = FetchError::Http {
            status: 404,
            url: "https://example.com".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com");
        assert!(matches!(err, Error::Fetch(FetchError::Http { status: 404, .. })));

        let err: Error = ExtractError::NoTableFound.into();
        assert!(matches!(err, Error::Extract(ExtractError::NoTableFound)));
    }
}
