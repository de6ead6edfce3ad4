//! Temporal snapshot extraction with last-observation-carried-forward.
//!
//! For every horizon `h`, rows recorded after `h * 1440` minutes are removed
//! *before* any value is carried forward. A snapshot therefore cannot see the
//! future, whatever the carry-forward logic does afterwards.

use horizon_common::{f64_column, has_column, numeric_values, string_column, string_values};
use horizon_model::columns::{ENCOUNTER_ID, HORIZON, TIME_OFFSET};
use horizon_model::{CarryForwardVar, EncounterId, Horizon, InstrumentPreference, VariableKind};
use polars::prelude::*;
use tracing::{debug, info_span, warn};

use crate::error::{Result, TransformError};
use crate::normalize::{row_encounters, row_offsets, timeline_order};

/// Snapshot tables keyed by horizon, in ascending horizon order.
///
/// Each table holds `encounter_id`, `horizon`, then one column per
/// carry-forward variable, with one row per encounter that had at least one
/// event row at or before the cutoff.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    tables: Vec<(Horizon, DataFrame)>,
}

impl SnapshotSet {
    pub fn get(&self, horizon: Horizon) -> Option<&DataFrame> {
        self.tables
            .iter()
            .find(|(h, _)| *h == horizon)
            .map(|(_, df)| df)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Horizon, &DataFrame)> {
        self.tables.iter().map(|(h, df)| (*h, df))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Replaces alternate instrument columns by a single target column.
///
/// Per row the first non-null source in preference order wins; readings are
/// never averaged. Source columns are dropped afterwards. Sources missing from
/// the table are skipped.
pub fn coalesce_instruments(
    events: &DataFrame,
    preferences: &[InstrumentPreference],
) -> Result<DataFrame> {
    let mut df = events.clone();
    for preference in preferences {
        let present: Vec<&String> = preference
            .sources
            .iter()
            .filter(|source| has_column(&df, source))
            .collect();
        if present.is_empty() {
            warn!(
                target_variable = %preference.target,
                "no instrument source columns present"
            );
            continue;
        }
        let mut merged: Vec<Option<f64>> = vec![None; df.height()];
        for source in &present {
            let values = numeric_values(&df, source)?;
            for (slot, value) in merged.iter_mut().zip(values) {
                if slot.is_none() {
                    *slot = value;
                }
            }
        }
        for source in &present {
            if **source != preference.target {
                df = df.drop(source)?;
            }
        }
        df.with_column(f64_column(&preference.target, merged))?;
        debug!(
            target_variable = %preference.target,
            sources = present.len(),
            "coalesced instrument columns"
        );
    }
    Ok(df)
}

/// Fails if any row of `frame` lies after the horizon cutoff.
pub fn ensure_within_horizon(frame: &DataFrame, horizon: Horizon) -> Result<()> {
    let cutoff = horizon.cutoff_minutes();
    let ids = row_encounters(frame)?;
    let offsets = row_offsets(frame)?;
    for (id, offset) in ids.iter().zip(offsets) {
        if let Some(offset) = offset
            && offset > cutoff
        {
            return Err(TransformError::TemporalCausalityViolation {
                encounter_id: id.as_ref().map(ToString::to_string).unwrap_or_default(),
                horizon,
                offset,
                cutoff,
            });
        }
    }
    Ok(())
}

enum VarValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Absent,
}

impl VarValues {
    fn read(df: &DataFrame, var: &CarryForwardVar) -> Result<Self> {
        if !has_column(df, &var.name) {
            return Ok(Self::Absent);
        }
        Ok(match var.kind {
            VariableKind::Numeric => Self::Numeric(numeric_values(df, &var.name)?),
            VariableKind::Categorical => Self::Categorical(string_values(df, &var.name)?),
        })
    }

    fn is_present(&self, row: usize) -> bool {
        match self {
            Self::Numeric(values) => values[row].is_some(),
            Self::Categorical(values) => values[row].is_some(),
            Self::Absent => false,
        }
    }

    fn column(&self, var: &CarryForwardVar, picks: &[Option<usize>]) -> Column {
        match self {
            Self::Numeric(values) => f64_column(
                &var.name,
                picks.iter().map(|p| p.and_then(|row| values[row])).collect(),
            ),
            Self::Categorical(values) => string_column(
                &var.name,
                picks
                    .iter()
                    .map(|p| p.and_then(|row| values[row].clone()))
                    .collect(),
            ),
            Self::Absent => match var.kind {
                VariableKind::Numeric => f64_column(&var.name, vec![None; picks.len()]),
                VariableKind::Categorical => string_column(&var.name, vec![None; picks.len()]),
            },
        }
    }
}

/// Builds one snapshot per (encounter, horizon).
///
/// The value of a variable is taken from the row with the largest offset not
/// after the cutoff that has it non-null; among rows sharing that offset the
/// later input row wins. Variables never observed stay null.
pub fn extract(
    events: &DataFrame,
    horizons: &[Horizon],
    carry_forward: &[CarryForwardVar],
) -> Result<SnapshotSet> {
    for var in carry_forward {
        if !has_column(events, &var.name) {
            warn!(variable = %var.name, "carry-forward variable not present; snapshots stay null");
        }
    }

    let mut ordered = horizons.to_vec();
    ordered.sort();
    ordered.dedup();

    let mut tables = Vec::with_capacity(ordered.len());
    for horizon in ordered {
        let _span = info_span!("snapshot", horizon = %horizon).entered();
        let visible = events
            .clone()
            .lazy()
            .filter(col(TIME_OFFSET).lt_eq(lit(horizon.cutoff_minutes())))
            .collect()?;
        if cfg!(debug_assertions) {
            ensure_within_horizon(&visible, horizon)?;
        }
        let table = carry_forward_at(&visible, horizon, carry_forward)?;
        debug!(
            rows_visible = visible.height(),
            encounters = table.height(),
            "extracted snapshot"
        );
        tables.push((horizon, table));
    }
    Ok(SnapshotSet { tables })
}

fn carry_forward_at(
    visible: &DataFrame,
    horizon: Horizon,
    carry_forward: &[CarryForwardVar],
) -> Result<DataFrame> {
    let ids = row_encounters(visible)?;
    let offsets = row_offsets(visible)?;
    let order = timeline_order(&ids, &offsets);
    let values: Vec<VarValues> = carry_forward
        .iter()
        .map(|var| VarValues::read(visible, var))
        .collect::<Result<_>>()?;

    let mut encounters: Vec<EncounterId> = Vec::new();
    // Per variable, the row supplying each encounter's snapshot value.
    let mut picks: Vec<Vec<Option<usize>>> = vec![Vec::new(); carry_forward.len()];
    let mut current: Option<&EncounterId> = None;
    for row in order {
        let Some(id) = ids[row].as_ref() else {
            continue;
        };
        if current != Some(id) {
            encounters.push(id.clone());
            for var_picks in &mut picks {
                var_picks.push(None);
            }
            current = Some(id);
        }
        for (var_picks, var_values) in picks.iter_mut().zip(&values) {
            if var_values.is_present(row)
                && let Some(slot) = var_picks.last_mut()
            {
                *slot = Some(row);
            }
        }
    }

    let mut columns = Vec::with_capacity(carry_forward.len() + 2);
    columns.push(string_column(
        ENCOUNTER_ID,
        encounters.iter().map(|id| Some(id.to_string())).collect(),
    ));
    columns.push(
        Series::new(HORIZON.into(), vec![horizon.index(); encounters.len()]).into_column(),
    );
    for ((var, var_values), var_picks) in carry_forward.iter().zip(&values).zip(&picks) {
        columns.push(var_values.column(var, var_picks));
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> DataFrame {
        DataFrame::new(vec![
            string_column(
                ENCOUNTER_ID,
                ["1", "1", "1", "2"].iter().map(|s| Some(s.to_string())).collect(),
            ),
            f64_column(
                TIME_OFFSET,
                vec![Some(-10.0), Some(100.0), Some(2000.0), Some(1500.0)],
            ),
            f64_column("hr", vec![Some(80.0), None, Some(120.0), Some(95.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn encounters_without_visible_rows_have_no_snapshot() {
        let set = extract(
            &events(),
            &[Horizon(0), Horizon(1)],
            &[CarryForwardVar::numeric("hr")],
        )
        .unwrap();
        assert_eq!(set.get(Horizon(0)).unwrap().height(), 1);
        assert_eq!(set.get(Horizon(1)).unwrap().height(), 1);
        assert_eq!(
            numeric_values(set.get(Horizon(1)).unwrap(), "hr").unwrap(),
            vec![Some(80.0)]
        );
    }

    #[test]
    fn causality_check_reports_late_rows() {
        let err = ensure_within_horizon(&events(), Horizon(1)).unwrap_err();
        assert!(matches!(
            err,
            TransformError::TemporalCausalityViolation { offset, .. } if offset == 2000.0
        ));
        assert!(ensure_within_horizon(&events(), Horizon(2)).is_ok());
    }

    #[test]
    fn absent_variable_stays_null() {
        let set = extract(&events(), &[Horizon(2)], &[CarryForwardVar::numeric("lactate")])
            .unwrap();
        let snapshot = set.get(Horizon(2)).unwrap();
        assert_eq!(numeric_values(snapshot, "lactate").unwrap(), vec![None, None]);
    }
}
