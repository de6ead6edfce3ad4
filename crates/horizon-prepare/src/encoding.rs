//! Feature selection and one-hot encoding of categorical columns.

use std::collections::BTreeSet;

use horizon_common::{column_names, numeric_values, string_values};
use horizon_model::columns::{ENCOUNTER_ID, HORIZON};
use horizon_model::{CategoricalColumn, PreparationOptions, outcome_columns};
use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::matrix::RawMatrix;

/// Category assigned to missing categorical values.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Indicator columns for one categorical column.
///
/// Aliases are applied first and missing values become `unknown`. Every
/// observed category gets a `<column>_<category>` indicator, in sorted order,
/// except the reference category.
pub fn one_hot(values: &[Option<String>], column: &CategoricalColumn) -> Vec<(String, Vec<f64>)> {
    let canonical: Vec<&str> = values
        .iter()
        .map(|value| match value.as_deref() {
            Some(raw) => column
                .aliases
                .get(raw)
                .map(String::as_str)
                .unwrap_or(raw),
            None => UNKNOWN_CATEGORY,
        })
        .collect();
    let categories: BTreeSet<&str> = canonical.iter().copied().collect();
    categories
        .into_iter()
        .filter(|category| *category != column.reference)
        .map(|category| {
            let indicator = canonical
                .iter()
                .map(|value| if *value == category { 1.0 } else { 0.0 })
                .collect();
            (format!("{}_{}", column.name, category), indicator)
        })
        .collect()
}

/// Builds the raw feature matrix of a horizon table.
///
/// Key, horizon and outcome columns are never features. Excluded columns are
/// dropped, the remaining non-categorical columns are coerced to numbers in
/// table order, and the configured categorical columns are appended as
/// indicators in configuration order.
pub(crate) fn encode_features(table: &DataFrame, options: &PreparationOptions) -> Result<RawMatrix> {
    let reserved = outcome_columns();
    let mut matrix = RawMatrix::new(table.height());
    let mut dropped = 0usize;
    for name in column_names(table) {
        if name == ENCOUNTER_ID || name == HORIZON || reserved.contains(&name) {
            continue;
        }
        if options.is_excluded(&name) {
            dropped += 1;
            continue;
        }
        if options.categorical_column(&name).is_some() {
            continue;
        }
        let values = numeric_values(table, &name)?;
        matrix.push(name, values);
    }
    for column in &options.categorical {
        if table.column(&column.name).is_err() || options.is_excluded(&column.name) {
            debug!(column = %column.name, "categorical column not present");
            continue;
        }
        let values = string_values(table, &column.name)?;
        for (name, indicator) in one_hot(&values, column) {
            matrix.push(name, indicator.into_iter().map(Some).collect());
        }
    }
    debug!(
        excluded = dropped,
        features = matrix.columns.len(),
        "encoded feature columns"
    );
    Ok(matrix)
}
