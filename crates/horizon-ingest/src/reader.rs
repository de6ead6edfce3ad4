//! CSV file reading and shape validation.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

fn open_error(path: &Path, err: std::io::Error) -> IngestError {
    if err.kind() == std::io::ErrorKind::NotFound {
        IngestError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        IngestError::FileRead {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// Rejects UTF-16 files; UTF-8 with or without BOM is accepted.
pub fn validate_encoding(path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| open_error(path, e))?;
    let mut buffer = [0u8; 2];
    let bytes_read = file.read(&mut buffer).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if bytes_read == 2 {
        if buffer == [0xFF, 0xFE] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 LE",
            });
        }
        if buffer == [0xFE, 0xFF] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 BE",
            });
        }
    }
    Ok(())
}

/// Reads a single-header CSV file into a DataFrame.
///
/// Schema inference scans the whole file so that a late non-numeric value in
/// a lab column does not abort the read.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    validate_encoding(path)?;
    let parse_error = |e: PolarsError| IngestError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(parse_error)?
        .finish()
        .map_err(parse_error)?;

    // A UTF-8 BOM ends up glued to the first column name.
    let first = df
        .get_column_names()
        .first()
        .map(|name| name.to_string());
    if let Some(first) = first
        && let Some(stripped) = first.strip_prefix('\u{feff}')
    {
        df.rename(&first, stripped.into())?;
    }
    Ok(df)
}

/// Validates the DataFrame shape after loading.
///
/// Checks required columns, empty column names and (when `require_rows`)
/// an empty body.
pub fn validate_shape(
    df: &DataFrame,
    path: &Path,
    required: &[&str],
    require_rows: bool,
) -> Result<()> {
    for name in df.get_column_names() {
        if name.trim().is_empty() {
            return Err(IngestError::EmptyColumnName {
                path: path.to_path_buf(),
            });
        }
    }
    for column in required {
        if df.column(column).is_err() {
            return Err(IngestError::MissingColumn {
                column: (*column).to_string(),
                path: path.to_path_buf(),
            });
        }
    }
    if require_rows && df.height() == 0 {
        return Err(IngestError::EmptyTable {
            path: path.to_path_buf(),
        });
    }
    if df.width() > 500 {
        tracing::warn!(
            path = %path.display(),
            columns = df.width(),
            "table has more than 500 columns"
        );
    }
    Ok(())
}
