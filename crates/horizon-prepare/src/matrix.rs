//! Column-major numeric matrices exchanged between preparation steps.

use horizon_common::f64_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Working matrix that may still hold missing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub height: usize,
}

impl RawMatrix {
    pub fn new(height: usize) -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
            height,
        }
    }

    pub fn push(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.height);
        self.columns.push(name.into());
        self.values.push(values);
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|column| rows.iter().map(|&row| column[row]).collect())
                .collect(),
            height: rows.len(),
        }
    }
}

/// Fully numeric, schema-locked feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    /// One vector per column.
    values: Vec<Vec<f64>>,
    height: usize,
}

impl FeatureMatrix {
    pub(crate) fn new(columns: Vec<String>, values: Vec<Vec<f64>>, height: usize) -> Self {
        Self {
            columns,
            values,
            height,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(&self.values[index])
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, values)| f64_column(name, values.iter().copied().map(Some).collect()))
            .collect();
        DataFrame::new(columns)
    }
}

/// The two outcome columns for one modelled outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeFrame {
    pub time_column: String,
    pub indicator_column: String,
    /// Re-based time to event or censor, in days; always positive.
    pub time: Vec<f64>,
    pub indicator: Vec<i32>,
}

impl OutcomeFrame {
    pub fn height(&self) -> usize {
        self.time.len()
    }

    pub fn events(&self) -> usize {
        self.indicator.iter().filter(|&&flag| flag == 1).count()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            f64_column(&self.time_column, self.time.iter().copied().map(Some).collect()),
            Series::new(self.indicator_column.as_str().into(), self.indicator.clone())
                .into_column(),
        ])
    }
}
