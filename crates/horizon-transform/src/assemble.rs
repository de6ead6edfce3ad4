//! Per-horizon output tables: snapshot features joined with re-based outcomes.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use horizon_common::f64_column;
use horizon_model::columns::HORIZON;
use horizon_model::{EncounterId, Horizon, OutcomeKind};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{Result, TransformError};
use crate::normalize::row_encounters;
use crate::outcome::{EncounterOutcomes, rebase};

/// File name of one horizon table: `{prefix}_day{h}.csv`.
pub fn horizon_table_name(prefix: &str, horizon: Horizon) -> String {
    format!("{prefix}_{horizon}.csv")
}

/// Joins a horizon's snapshot with its re-based outcomes.
///
/// `outcomes` are the un-rebased labels from `compute_outcomes`. Encounters
/// without labels are dropped. The result holds `encounter_id`, the snapshot
/// feature columns, then the six outcome columns in contract order. Rows are
/// not filtered by risk set here; that depends on the modelled outcome.
pub fn assemble_horizon_table(
    snapshot: &DataFrame,
    outcomes: &[EncounterOutcomes],
    horizon: Horizon,
) -> Result<DataFrame> {
    let rebased = rebase(outcomes, horizon);
    let by_id: HashMap<&EncounterId, &EncounterOutcomes> =
        rebased.iter().map(|row| (&row.encounter_id, row)).collect();

    let ids = row_encounters(snapshot)?;
    let matched: Vec<Option<&EncounterOutcomes>> = ids
        .iter()
        .map(|id| id.as_ref().and_then(|id| by_id.get(id).copied()))
        .collect();
    let mask: Vec<bool> = matched.iter().map(Option::is_some).collect();
    let labelled: Vec<&EncounterOutcomes> = matched.into_iter().flatten().collect();

    let unlabelled = snapshot.height() - labelled.len();
    if unlabelled > 0 {
        debug!(
            horizon = %horizon,
            unlabelled,
            "dropping snapshots without outcome labels"
        );
    }

    let mask = BooleanChunked::from_slice("labelled".into(), &mask);
    let mut table = snapshot.filter(&mask)?;
    if table.column(HORIZON).is_ok() {
        table = table.drop(HORIZON)?;
    }
    for kind in OutcomeKind::ALL {
        let time = kind.time_column();
        let indicator = kind.indicator_column();
        if table.column(&time).is_ok() || table.column(&indicator).is_ok() {
            return Err(TransformError::DataFrame {
                message: format!("snapshot already has an outcome column for {kind}"),
            });
        }
        table.with_column(f64_column(
            &time,
            labelled
                .iter()
                .map(|row| Some(row.get(kind).time_days))
                .collect(),
        ))?;
        table.with_column(
            Series::new(
                indicator.as_str().into(),
                labelled
                    .iter()
                    .map(|row| i32::from(row.get(kind).indicator))
                    .collect::<Vec<i32>>(),
            )
            .into_column(),
        )?;
    }

    info!(
        horizon = %horizon,
        rows = table.height(),
        columns = table.width(),
        "assembled horizon table"
    );
    Ok(table)
}

/// Writes a horizon table as CSV, creating parent directories.
pub fn write_horizon_table(table: &mut DataFrame, path: &Path) -> Result<()> {
    let write_error = |message: String| TransformError::Write {
        path: path.display().to_string(),
        message,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
    }
    let mut file = File::create(path).map_err(|e| write_error(e.to_string()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(table)
        .map_err(|e| write_error(e.to_string()))?;
    Ok(())
}
