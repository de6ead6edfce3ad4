//! Polars column and `AnyValue` helpers.

use polars::prelude::*;

/// Converts a Polars `AnyValue` to a trimmed string; null and blank become `None`.
pub fn any_to_string(value: AnyValue<'_>) -> Option<String> {
    let text = match value {
        AnyValue::Null => return None,
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(v) if v.is_nan() => return None,
        AnyValue::Float32(v) if v.is_nan() => return None,
        other => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a string as `f64`, returning `None` for invalid, empty or NaN input.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Reads a column as `f64` values.
///
/// The cast is non-strict, so text that does not parse becomes null. NaN is
/// treated as missing.
pub fn numeric_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let values = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_f64))
            .collect(),
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|value| value.filter(|v| !v.is_nan()))
                .collect()
        }
    };
    Ok(values)
}

/// Reads a column as trimmed strings; null and blank entries become `None`.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    if let DataType::String = column.dtype() {
        let values = column
            .str()?
            .into_iter()
            .map(|value| {
                value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .collect();
        return Ok(values);
    }
    let cast = column.cast(&DataType::String)?;
    let values = cast
        .str()?
        .into_iter()
        .map(|value| value.and_then(|v| any_to_string(AnyValue::String(v))))
        .collect();
    Ok(values)
}

/// Builds a nullable `Float64` column.
pub fn f64_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Series::new(name.into(), values).into_column()
}

/// Builds a nullable `String` column.
pub fn string_column(name: &str, values: Vec<Option<String>>) -> Column {
    Series::new(name.into(), values).into_column()
}
