//! Imputers fitted on the training partition.
//!
//! The fitted state is plain data so it can be cached and compared; applying
//! it never changes it.

use horizon_model::ImputeStrategy;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepareError, Result};
use crate::matrix::RawMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum FittedImputer {
    Median { fill: Vec<f64> },
    Mean { fill: Vec<f64> },
    /// Draws replacements from the observed training values of each column.
    HotDeck { seed: u64, pools: Vec<Vec<f64>> },
}

fn observed(column: &[Option<f64>]) -> Vec<f64> {
    column.iter().flatten().copied().collect()
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Per-column generator; one fresh stream per column and per call.
fn column_rng(seed: u64, column: usize) -> Pcg32 {
    Pcg32::seed_from_u64(seed.wrapping_add(column as u64))
}

impl FittedImputer {
    pub(crate) fn fit(strategy: ImputeStrategy, seed: u64, matrix: &RawMatrix) -> Self {
        let fitted = match strategy {
            ImputeStrategy::Median => Self::Median {
                fill: matrix.values.iter().map(|c| median(observed(c))).collect(),
            },
            ImputeStrategy::Mean => Self::Mean {
                fill: matrix.values.iter().map(|c| mean(&observed(c))).collect(),
            },
            ImputeStrategy::HotDeck => Self::HotDeck {
                seed,
                pools: matrix.values.iter().map(|c| observed(c)).collect(),
            },
        };
        debug!(strategy = ?strategy, columns = matrix.columns.len(), "fitted imputer");
        fitted
    }

    pub fn strategy(&self) -> ImputeStrategy {
        match self {
            Self::Median { .. } => ImputeStrategy::Median,
            Self::Mean { .. } => ImputeStrategy::Mean,
            Self::HotDeck { .. } => ImputeStrategy::HotDeck,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::Median { fill } | Self::Mean { fill } => fill.len(),
            Self::HotDeck { pools, .. } => pools.len(),
        }
    }

    /// Replaces every missing value. Output is column-major like the input.
    pub(crate) fn transform(&self, matrix: &RawMatrix) -> Result<Vec<Vec<f64>>> {
        if matrix.values.len() != self.width() {
            return Err(PrepareError::SchemaMismatch {
                expected: self.width(),
                actual: matrix.values.len(),
            });
        }
        let imputed: Vec<Vec<f64>> = matrix
            .values
            .iter()
            .enumerate()
            .map(|(index, column)| match self {
                Self::Median { fill } | Self::Mean { fill } => {
                    column.iter().map(|v| v.unwrap_or(fill[index])).collect::<Vec<f64>>()
                }
                Self::HotDeck { seed, pools } => {
                    let pool = &pools[index];
                    let mut rng = column_rng(*seed, index);
                    column
                        .iter()
                        .map(|v| match v {
                            Some(v) => *v,
                            None if pool.is_empty() => 0.0,
                            None => pool[rng.random_range(0..pool.len())],
                        })
                        .collect::<Vec<f64>>()
                }
            })
            .collect();
        Ok(imputed)
    }
}
