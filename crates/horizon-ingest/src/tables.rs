//! Loaders for the three input tables.

use std::collections::HashSet;
use std::path::Path;

use horizon_common::{f64_column, has_column, numeric_values, string_column, string_values};
use horizon_model::columns::{
    ADMISSION_OFFSET, DISCHARGE_OFFSET, DISCHARGE_STATUS, ENCOUNTER_ID, EVENT_OFFSET,
    EVENT_TYPE_TAG, PATIENT_ID, TIME_OFFSET,
};
use horizon_model::{EncounterId, EncounterRecord, EventRecord};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::reader::{read_csv_frame, validate_shape};

/// Loads the wide event-row table.
///
/// Key columns are normalized: `encounter_id` becomes text and `time_offset`
/// becomes `f64`. Rows missing either key are dropped with a warning because
/// they cannot be placed on an encounter timeline. Variable columns are left
/// as read; typing happens in the snapshot extractor.
pub fn read_wide_rows(path: &Path) -> Result<DataFrame> {
    let mut df = read_csv_frame(path)?;
    validate_shape(&df, path, &[ENCOUNTER_ID, TIME_OFFSET], true)?;

    let ids = string_values(&df, ENCOUNTER_ID)?;
    let offsets = numeric_values(&df, TIME_OFFSET)?;
    let mask: Vec<bool> = ids
        .iter()
        .zip(&offsets)
        .map(|(id, offset)| id.is_some() && offset.is_some())
        .collect();
    let dropped = mask.iter().filter(|keep| !**keep).count();

    df.with_column(string_column(ENCOUNTER_ID, ids))?;
    df.with_column(f64_column(TIME_OFFSET, offsets))?;
    if dropped > 0 {
        warn!(
            path = %path.display(),
            dropped,
            "dropping wide rows without encounter id or time offset"
        );
        let mask = BooleanChunked::from_slice("keep".into(), &mask);
        df = df.filter(&mask)?;
    }

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded wide event rows"
    );
    Ok(df)
}

/// Loads the encounters table.
///
/// A missing `patient_id` makes the encounter its own parent stay.
/// Duplicate encounter ids are rejected.
pub fn read_encounters(path: &Path) -> Result<Vec<EncounterRecord>> {
    let df = read_csv_frame(path)?;
    validate_shape(
        &df,
        path,
        &[ENCOUNTER_ID, PATIENT_ID, ADMISSION_OFFSET, DISCHARGE_OFFSET],
        true,
    )?;

    let ids = string_values(&df, ENCOUNTER_ID)?;
    let patients = string_values(&df, PATIENT_ID)?;
    let admissions = numeric_values(&df, ADMISSION_OFFSET)?;
    let discharges = numeric_values(&df, DISCHARGE_OFFSET)?;
    let statuses = if has_column(&df, DISCHARGE_STATUS) {
        string_values(&df, DISCHARGE_STATUS)?
    } else {
        vec![None; df.height()]
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for (row, id) in ids.into_iter().enumerate() {
        let Some(id) = id else {
            skipped += 1;
            continue;
        };
        let encounter_id = EncounterId::new(id).map_err(|e| IngestError::DataFrame {
            message: e.to_string(),
        })?;
        if !seen.insert(encounter_id.clone()) {
            return Err(IngestError::DuplicateEncounter {
                encounter_id: encounter_id.to_string(),
                path: path.to_path_buf(),
            });
        }
        let patient_id = patients[row]
            .clone()
            .unwrap_or_else(|| encounter_id.to_string());
        records.push(EncounterRecord {
            encounter_id,
            patient_id,
            admission_offset: admissions[row],
            discharge_offset: discharges[row],
            discharge_status: statuses[row].clone(),
        });
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipping encounters without id");
    }

    info!(path = %path.display(), encounters = records.len(), "loaded encounters");
    Ok(records)
}

/// Loads the outcome/treatment events table. A header-only file is valid.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    let df = read_csv_frame(path)?;
    validate_shape(&df, path, &[ENCOUNTER_ID, EVENT_OFFSET, EVENT_TYPE_TAG], false)?;

    let ids = string_values(&df, ENCOUNTER_ID)?;
    let offsets = numeric_values(&df, EVENT_OFFSET)?;
    let tags = string_values(&df, EVENT_TYPE_TAG)?;

    let mut records = Vec::with_capacity(df.height());
    let mut incomplete = 0usize;
    for ((id, offset), tag) in ids.into_iter().zip(offsets).zip(tags) {
        match (id, offset, tag) {
            (Some(id), Some(offset), Some(tag)) => {
                let encounter_id =
                    EncounterId::new(id).map_err(|e| IngestError::DataFrame {
                        message: e.to_string(),
                    })?;
                records.push(EventRecord {
                    encounter_id,
                    offset,
                    tag,
                });
            }
            _ => incomplete += 1,
        }
    }
    if incomplete > 0 {
        debug!(path = %path.display(), incomplete, "skipping incomplete event rows");
    }

    info!(path = %path.display(), events = records.len(), "loaded events");
    Ok(records)
}
