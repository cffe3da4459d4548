//! JSON wire format between extraction and normalization.
//!
//! The extractor's output crosses this boundary as a JSON array of objects
//! keyed `Header`, `Row 1`..`Row N`, all values strings.

use crate::error::NormalizeError;
use crate::types::TransposedRecord;

/// Serializes records as a pretty-printed JSON array (2-space indent).
pub fn records_to_json(records: &[TransposedRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Parses records from their JSON text.
///
/// Empty text, an empty array, or anything that is not an array of record
/// objects is [`NormalizeError::EmptyOrInvalidInput`].
pub fn records_from_json(text: &str) -> Result<Vec<TransposedRecord>, NormalizeError> {
    if text.trim().is_empty() {
        return Err(NormalizeError::EmptyOrInvalidInput(
            "input JSON is empty".to_string(),
        ));
    }

    let records: Vec<TransposedRecord> = serde_json::from_str(text)
        .map_err(|e| NormalizeError::EmptyOrInvalidInput(format!("invalid JSON: {e}")))?;

    if records.is_empty() {
        return Err(NormalizeError::EmptyOrInvalidInput(
            "JSON array has no records".to_string(),
        ));
    }

    Ok(records)
}
