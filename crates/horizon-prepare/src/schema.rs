//! Declared feature schema: produced by fit, enforced on every other partition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepareError, Result};
use crate::matrix::RawMatrix;

/// Ordered feature columns of the training partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Keeps columns with at least one non-null, non-zero value, in input order.
    ///
    /// All-null columns carry nothing to impute from and are dropped as well.
    pub(crate) fn fit(matrix: &RawMatrix) -> Result<Self> {
        let columns: Vec<String> = matrix
            .columns
            .iter()
            .zip(&matrix.values)
            .filter(|(_, values)| values.iter().any(|v| v.is_some_and(|v| v != 0.0)))
            .map(|(name, _)| name.clone())
            .collect();
        if columns.is_empty() {
            return Err(PrepareError::SchemaCollapse);
        }
        debug!(
            kept = columns.len(),
            dropped = matrix.columns.len() - columns.len(),
            "fitted feature schema"
        );
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Forces `matrix` onto this schema: missing columns are filled with 0.0
    /// and extra columns are dropped.
    pub(crate) fn align(&self, matrix: &RawMatrix) -> Result<RawMatrix> {
        let mut aligned = RawMatrix::new(matrix.height);
        let mut filled = 0usize;
        for name in &self.columns {
            match matrix.position(name) {
                Some(index) => aligned.push(name.clone(), matrix.values[index].clone()),
                None => {
                    filled += 1;
                    aligned.push(name.clone(), vec![Some(0.0); matrix.height]);
                }
            }
        }
        if aligned.columns != self.columns {
            return Err(PrepareError::SchemaMismatch {
                expected: self.columns.len(),
                actual: aligned.columns.len(),
            });
        }
        let extra = matrix
            .columns
            .iter()
            .filter(|name| !self.contains(name))
            .count();
        debug!(filled, extra, "aligned partition to fitted schema");
        Ok(aligned)
    }
}
