use std::io::Cursor;
use bytes::Bytes;
use polars::prelude::*;
use crate::error::AppError;

/// Cell tokens read as missing in every column, alongside empty cells.
const NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

/// Parses an uploaded CSV (header row required) into a DataFrame.
///
/// Schema inference scans the whole file, so a column is numeric only when
/// every non-empty, non-marker cell in it parses as a number. An upload
/// with no data rows, including a blank one, is `EmptyInput`.
pub fn load_csv(data: Bytes) -> Result<DataFrame, AppError> {
    let text = std::str::from_utf8(&data)
        .map_err(|e| AppError::InvalidInput(format!("upload is not valid UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Err(AppError::EmptyInput);
    }

    let df = CsvReader::new(Cursor::new(data))
        .has_header(true)
        .infer_schema(None)
        .with_null_values(Some(NullValues::AllColumns(
            NULL_MARKERS.iter().map(|m| m.to_string()).collect(),
        )))
        .finish()
        .map_err(|e| {
            tracing::warn!("Failed to parse CSV: {}", e);
            AppError::InvalidInput(format!("failed to parse CSV: {}", e))
        })?;

    if df.height() == 0 {
        return Err(AppError::EmptyInput);
    }

    Ok(df)
}
