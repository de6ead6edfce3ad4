//! Standard scaling of the configured numeric columns.

use serde::{Deserialize, Serialize};

use crate::error::{PrepareError, Result};

/// Mean and population standard deviation per scaled column.
///
/// A column with zero spread keeps scale 1 so it is only centred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FittedScaler {
    /// Fits on the columns of `names` that exist in `columns`, keeping the
    /// order of `columns`.
    pub(crate) fn fit(names: &[String], columns: &[String], values: &[Vec<f64>]) -> Self {
        let mut scaler = Self {
            columns: Vec::new(),
            mean: Vec::new(),
            scale: Vec::new(),
        };
        for (name, column) in columns.iter().zip(values) {
            if !names.contains(name) {
                continue;
            }
            let n = column.len() as f64;
            let mean = if column.is_empty() {
                0.0
            } else {
                column.iter().sum::<f64>() / n
            };
            let variance = if column.is_empty() {
                0.0
            } else {
                column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
            };
            let std = variance.sqrt();
            scaler.columns.push(name.clone());
            scaler.mean.push(mean);
            scaler.scale.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }
        scaler
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub(crate) fn transform(&self, columns: &[String], values: &mut [Vec<f64>]) -> Result<()> {
        for ((name, mean), scale) in self.columns.iter().zip(&self.mean).zip(&self.scale) {
            let index = columns
                .iter()
                .position(|column| column == name)
                .ok_or_else(|| PrepareError::MissingColumn {
                    column: name.clone(),
                })?;
            for value in &mut values[index] {
                *value = (*value - mean) / scale;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_only_configured_columns() {
        let columns = vec!["age".to_string(), "gender_Male".to_string()];
        let mut values = vec![vec![20.0, 40.0], vec![1.0, 0.0]];
        let scaler = FittedScaler::fit(&["age".to_string()], &columns, &values);
        assert_eq!(scaler.mean(), [30.0]);
        assert_eq!(scaler.scale(), [10.0]);
        scaler.transform(&columns, &mut values).unwrap();
        assert_eq!(values, vec![vec![-1.0, 1.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn constant_column_keeps_unit_scale() {
        let columns = vec!["ph".to_string()];
        let values = vec![vec![7.4, 7.4]];
        let scaler = FittedScaler::fit(&columns, &columns, &values);
        assert_eq!(scaler.scale(), [1.0]);
    }
}
