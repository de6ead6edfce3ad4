//! The two-state preparation pipeline.
//!
//! An [`UnfitPipeline`] holds configuration only. [`UnfitPipeline::fit`]
//! returns a new, independent [`FittedPipeline`] holding the feature schema,
//! imputer and scaler learned from the training partition.
//! [`FittedPipeline::apply`] replays them on any other partition and never
//! changes them.

use horizon_common::{numeric_values, string_values};
use horizon_model::columns::ENCOUNTER_ID;
use horizon_model::{OutcomeKind, PipelineConfig, PreparationOptions};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::encoding::encode_features;
use crate::error::{PrepareError, Result};
use crate::impute::FittedImputer;
use crate::matrix::{FeatureMatrix, OutcomeFrame, RawMatrix};
use crate::scale::FittedScaler;
use crate::schema::FeatureSchema;

/// Partition name used for the training output of [`UnfitPipeline::fit`].
pub const TRAIN_PARTITION: &str = "train";

/// Model-ready output of one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedPartition {
    pub name: String,
    pub x: FeatureMatrix,
    pub y: OutcomeFrame,
    /// Row of the input table behind each prepared row.
    pub row_index: Vec<usize>,
    pub encounter_ids: Vec<String>,
}

/// Configuration of a pipeline that has not seen training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfitPipeline {
    options: PreparationOptions,
    outcome: OutcomeKind,
    seed: u64,
}

/// Frozen transform learned from one training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    config: UnfitPipeline,
    schema: FeatureSchema,
    imputer: FittedImputer,
    scaler: FittedScaler,
}

/// Either state, for callers that hold a pipeline before knowing whether it
/// was fitted (for example after a cache lookup).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Unfit(UnfitPipeline),
    Fit(FittedPipeline),
}

/// Risk-set rows of a partition before alignment.
struct Selected {
    features: RawMatrix,
    y: OutcomeFrame,
    row_index: Vec<usize>,
    encounter_ids: Vec<String>,
}

impl UnfitPipeline {
    pub fn new(options: PreparationOptions, outcome: OutcomeKind, seed: u64) -> Self {
        Self {
            options,
            outcome,
            seed,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.preparation.clone(), config.outcome, config.seed)
    }

    pub fn outcome(&self) -> OutcomeKind {
        self.outcome
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn options(&self) -> &PreparationOptions {
        &self.options
    }

    /// Learns schema, imputer and scaler from `table` and returns them with the
    /// prepared training partition.
    pub fn fit(&self, table: &DataFrame) -> Result<(FittedPipeline, PreparedPartition)> {
        let _span = info_span!("fit", outcome = %self.outcome, seed = self.seed).entered();
        let selected = self.select(TRAIN_PARTITION, table)?;

        let schema = FeatureSchema::fit(&selected.features)?;
        let aligned = schema.align(&selected.features)?;
        let imputer = FittedImputer::fit(self.options.imputer, self.seed, &aligned);
        let mut values = imputer.transform(&aligned)?;
        let scaler = FittedScaler::fit(&self.options.numeric, schema.columns(), &values);
        scaler.transform(schema.columns(), &mut values)?;

        let fitted = FittedPipeline {
            config: self.clone(),
            schema,
            imputer,
            scaler,
        };
        let partition = fitted.finish(TRAIN_PARTITION, selected, values);
        info!(
            rows = partition.x.height(),
            columns = partition.x.width(),
            scaled = fitted.scaler.columns().len(),
            events = partition.y.events(),
            "fitted preparation pipeline"
        );
        Ok((fitted, partition))
    }

    /// Drops excluded columns, encodes categoricals and keeps the rows still
    /// at risk for the configured outcome.
    fn select(&self, name: &str, table: &DataFrame) -> Result<Selected> {
        if table.height() == 0 {
            return Err(PrepareError::DataInsufficient {
                partition: name.to_string(),
                stage: "loading".to_string(),
            });
        }
        let time_column = self.outcome.time_column();
        let indicator_column = self.outcome.indicator_column();
        for column in [&time_column, &indicator_column] {
            if table.column(column).is_err() {
                return Err(PrepareError::MissingColumn {
                    column: column.clone(),
                });
            }
        }

        let features = encode_features(table, &self.options)?;
        let times = numeric_values(table, &time_column)?;
        let indicators = numeric_values(table, &indicator_column)?;
        let row_index: Vec<usize> = times
            .iter()
            .enumerate()
            .filter(|(_, time)| time.is_some_and(|t| t > 0.0))
            .map(|(row, _)| row)
            .collect();
        let excluded = table.height() - row_index.len();
        if excluded > 0 {
            info!(
                partition = name,
                excluded, "excluded rows outside the risk set"
            );
        }
        if row_index.is_empty() {
            return Err(PrepareError::DataInsufficient {
                partition: name.to_string(),
                stage: "risk-set filter".to_string(),
            });
        }

        let ids = if table.column(ENCOUNTER_ID).is_ok() {
            string_values(table, ENCOUNTER_ID)?
        } else {
            vec![None; table.height()]
        };
        let y = OutcomeFrame {
            time_column,
            indicator_column,
            time: row_index.iter().filter_map(|&row| times[row]).collect(),
            indicator: row_index
                .iter()
                .map(|&row| i32::from(indicators[row].is_some_and(|flag| flag >= 0.5)))
                .collect(),
        };
        Ok(Selected {
            features: features.select_rows(&row_index),
            y,
            encounter_ids: row_index
                .iter()
                .map(|&row| ids[row].clone().unwrap_or_else(|| row.to_string()))
                .collect(),
            row_index,
        })
    }
}

impl FittedPipeline {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn imputer(&self) -> &FittedImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    pub fn outcome(&self) -> OutcomeKind {
        self.config.outcome
    }

    /// The configuration this transform was fitted from, for refitting.
    pub fn unfit(&self) -> &UnfitPipeline {
        &self.config
    }

    /// Replays the frozen transform on another partition.
    ///
    /// The output has exactly the fitted schema's columns, whatever raw
    /// columns `table` has.
    pub fn apply(&self, name: &str, table: &DataFrame) -> Result<PreparedPartition> {
        let _span = info_span!("apply", partition = name, outcome = %self.config.outcome).entered();
        let selected = self.config.select(name, table)?;
        let aligned = self.schema.align(&selected.features)?;
        let mut values = self.imputer.transform(&aligned)?;
        self.scaler.transform(self.schema.columns(), &mut values)?;
        let partition = self.finish(name, selected, values);
        info!(
            rows = partition.x.height(),
            columns = partition.x.width(),
            "applied preparation pipeline"
        );
        Ok(partition)
    }

    /// Applies the transform to every partition.
    ///
    /// A failing partition is logged and reported in place; the others still run.
    pub fn apply_all<'a>(
        &self,
        partitions: impl IntoIterator<Item = (&'a str, &'a DataFrame)>,
    ) -> Vec<(String, Result<PreparedPartition>)> {
        partitions
            .into_iter()
            .map(|(name, table)| {
                let result = self.apply(name, table);
                if let Err(err) = &result {
                    warn!(partition = name, error = %err, "partition preparation failed");
                }
                (name.to_string(), result)
            })
            .collect()
    }

    fn finish(&self, name: &str, selected: Selected, values: Vec<Vec<f64>>) -> PreparedPartition {
        let height = selected.row_index.len();
        PreparedPartition {
            name: name.to_string(),
            x: FeatureMatrix::new(self.schema.columns().to_vec(), values, height),
            y: selected.y,
            row_index: selected.row_index,
            encounter_ids: selected.encounter_ids,
        }
    }
}

impl PipelineState {
    pub fn is_fit(&self) -> bool {
        matches!(self, Self::Fit(_))
    }

    /// Fits from the held configuration, returning a new `Fit` state.
    ///
    /// `self` is left untouched, so refitting never alters an existing transform.
    pub fn fit(&self, table: &DataFrame) -> Result<(PipelineState, PreparedPartition)> {
        let config = match self {
            Self::Unfit(config) => config,
            Self::Fit(fitted) => fitted.unfit(),
        };
        let (fitted, partition) = config.fit(table)?;
        Ok((Self::Fit(fitted), partition))
    }

    pub fn apply(&self, name: &str, table: &DataFrame) -> Result<PreparedPartition> {
        match self {
            Self::Unfit(_) => Err(PrepareError::UnfitTransform),
            Self::Fit(fitted) => fitted.apply(name, table),
        }
    }
}
