//! Event normalizer: first-visit selection and timeline ordering.

use std::collections::{BTreeMap, HashSet};

use horizon_common::{numeric_values, string_values};
use horizon_model::columns::{ENCOUNTER_ID, TIME_OFFSET};
use horizon_model::{EncounterId, EncounterRecord};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{Result, TransformError};

/// Keeps one encounter per parent stay.
///
/// The retained encounter has the largest admission offset; a missing offset
/// ranks below any recorded one. Ties go to the smallest encounter id.
/// Output is ordered by encounter id.
pub fn select_first_visits(encounters: &[EncounterRecord]) -> Vec<EncounterRecord> {
    let mut chosen: BTreeMap<&str, &EncounterRecord> = BTreeMap::new();
    for encounter in encounters {
        chosen
            .entry(encounter.patient_id.as_str())
            .and_modify(|current| {
                if prefer(encounter, current) {
                    *current = encounter;
                }
            })
            .or_insert(encounter);
    }
    let mut kept: Vec<EncounterRecord> = chosen.into_values().cloned().collect();
    kept.sort_by(|a, b| a.encounter_id.cmp(&b.encounter_id));
    debug!(
        input = encounters.len(),
        kept = kept.len(),
        "selected one encounter per parent stay"
    );
    kept
}

fn prefer(candidate: &EncounterRecord, current: &EncounterRecord) -> bool {
    let rank = |offset: Option<f64>| offset.unwrap_or(f64::NEG_INFINITY);
    let (a, b) = (
        rank(candidate.admission_offset),
        rank(current.admission_offset),
    );
    if a > b {
        true
    } else if a < b {
        false
    } else {
        candidate.encounter_id < current.encounter_id
    }
}

/// Reads the parsed encounter id of every row. Blank ids become `None`.
pub(crate) fn row_encounters(df: &DataFrame) -> Result<Vec<Option<EncounterId>>> {
    if df.column(ENCOUNTER_ID).is_err() {
        return Err(TransformError::MissingColumn {
            column: ENCOUNTER_ID.to_string(),
        });
    }
    Ok(string_values(df, ENCOUNTER_ID)?
        .into_iter()
        .map(|id| id.and_then(|id| EncounterId::new(id).ok()))
        .collect())
}

pub(crate) fn row_offsets(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    if df.column(TIME_OFFSET).is_err() {
        return Err(TransformError::MissingColumn {
            column: TIME_OFFSET.to_string(),
        });
    }
    Ok(numeric_values(df, TIME_OFFSET)?)
}

/// Stable order of row positions by (encounter id, time offset).
///
/// Rows sharing an offset keep their input order, so later rows still win
/// when values are carried forward. Rows without an id or offset are left out.
pub(crate) fn timeline_order(
    ids: &[Option<EncounterId>],
    offsets: &[Option<f64>],
) -> Vec<usize> {
    let mut rows: Vec<(&EncounterId, f64, usize)> = ids
        .iter()
        .zip(offsets)
        .enumerate()
        .filter_map(|(row, (id, offset))| Some((id.as_ref()?, (*offset)?, row)))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0).then(a.1.total_cmp(&b.1)));
    rows.into_iter().map(|(_, _, row)| row).collect()
}

pub(crate) fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let indices: Vec<IdxSize> = rows.iter().map(|&row| row as IdxSize).collect();
    let indices = IdxCa::from_vec("row".into(), indices);
    Ok(df.take(&indices)?)
}

/// Restricts wide event rows to the given encounters and sorts them by
/// encounter then time offset.
pub fn normalize_events(wide: &DataFrame, encounters: &[EncounterRecord]) -> Result<DataFrame> {
    let keep: HashSet<&EncounterId> = encounters.iter().map(|e| &e.encounter_id).collect();
    let ids: Vec<Option<EncounterId>> = row_encounters(wide)?
        .into_iter()
        .map(|id| id.filter(|id| keep.contains(id)))
        .collect();
    let offsets = row_offsets(wide)?;
    let order = timeline_order(&ids, &offsets);

    let dropped = wide.height() - order.len();
    if dropped > 0 {
        debug!(dropped, "dropping event rows outside the selected encounters");
    }
    let normalized = take_rows(wide, &order)?;
    info!(
        rows = normalized.height(),
        encounters = encounters.len(),
        "normalized event rows"
    );
    Ok(normalized)
}
