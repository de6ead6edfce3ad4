//! Outcome and censoring calculation.
//!
//! Each encounter gets, per tracked outcome, a time in days and a binary
//! indicator. With an event the time is the earliest qualifying offset;
//! without one it is the unit discharge (right-censoring). Times are then
//! re-based per horizon and encounters whose re-based time is not positive
//! leave that outcome's risk set.

use std::collections::{BTreeMap, HashMap};

use horizon_model::{
    EncounterId, EncounterRecord, EventRecord, EventTagSets, Horizon, OutcomeKind,
    minutes_to_days,
};
use tracing::{debug, info, warn};

/// A raw event tag resolved to a tracked outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeEvent {
    pub encounter_id: EncounterId,
    pub kind: OutcomeKind,
    /// Minutes since encounter start.
    pub offset: f64,
}

/// Time-to-event-or-censor and indicator for one outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeValue {
    /// Days; re-based tables measure from the horizon.
    pub time_days: f64,
    pub indicator: u8,
}

impl OutcomeValue {
    /// Whether the encounter is still at risk for this outcome.
    pub fn is_at_risk(self) -> bool {
        self.time_days > 0.0
    }
}

/// All outcome labels of one encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterOutcomes {
    pub encounter_id: EncounterId,
    pub death: OutcomeValue,
    pub vasopressor: OutcomeValue,
    pub ventilator: OutcomeValue,
}

impl EncounterOutcomes {
    pub fn get(&self, kind: OutcomeKind) -> OutcomeValue {
        match kind {
            OutcomeKind::Death => self.death,
            OutcomeKind::Vasopressor => self.vasopressor,
            OutcomeKind::Ventilator => self.ventilator,
        }
    }

    fn map(&self, f: impl Fn(OutcomeValue) -> OutcomeValue) -> Self {
        Self {
            encounter_id: self.encounter_id.clone(),
            death: f(self.death),
            vasopressor: f(self.vasopressor),
            ventilator: f(self.ventilator),
        }
    }
}

/// Maps raw event tags to outcomes; unrelated tags are dropped and counted.
pub fn classify_events(events: &[EventRecord], tags: &EventTagSets) -> Vec<OutcomeEvent> {
    let mut ignored = 0usize;
    let classified: Vec<OutcomeEvent> = events
        .iter()
        .filter_map(|event| {
            let kind = tags.classify(&event.tag);
            if kind.is_none() {
                ignored += 1;
            }
            Some(OutcomeEvent {
                encounter_id: event.encounter_id.clone(),
                kind: kind?,
                offset: event.offset,
            })
        })
        .collect();
    debug!(
        classified = classified.len(),
        ignored, "classified outcome events"
    );
    classified
}

/// Death events for encounters whose discharge status contains `marker`
/// (case-insensitive), placed at the discharge offset.
pub fn discharge_status_deaths(encounters: &[EncounterRecord], marker: &str) -> Vec<OutcomeEvent> {
    let marker = marker.to_lowercase();
    encounters
        .iter()
        .filter(|encounter| {
            encounter
                .discharge_status
                .as_deref()
                .is_some_and(|status| status.to_lowercase().contains(&marker))
        })
        .filter_map(|encounter| {
            Some(OutcomeEvent {
                encounter_id: encounter.encounter_id.clone(),
                kind: OutcomeKind::Death,
                offset: encounter.discharge_offset?,
            })
        })
        .collect()
}

/// Derives un-rebased outcome labels for every encounter with a discharge offset.
///
/// Encounters without any qualifying event get indicator 0, never a missing
/// value. Encounters without a discharge offset cannot be censored and are
/// dropped with a warning. Output is ordered by encounter id.
pub fn compute_outcomes(
    events: &[OutcomeEvent],
    encounters: &[EncounterRecord],
) -> Vec<EncounterOutcomes> {
    let mut earliest: HashMap<(&EncounterId, OutcomeKind), f64> = HashMap::new();
    for event in events {
        earliest
            .entry((&event.encounter_id, event.kind))
            .and_modify(|offset| *offset = offset.min(event.offset))
            .or_insert(event.offset);
    }

    let mut rows: BTreeMap<&EncounterId, EncounterOutcomes> = BTreeMap::new();
    let mut uncensorable = 0usize;
    for encounter in encounters {
        let Some(discharge) = encounter.discharge_offset else {
            uncensorable += 1;
            continue;
        };
        let value = |kind: OutcomeKind| match earliest.get(&(&encounter.encounter_id, kind)) {
            Some(offset) => OutcomeValue {
                time_days: minutes_to_days(*offset),
                indicator: 1,
            },
            None => OutcomeValue {
                time_days: minutes_to_days(discharge),
                indicator: 0,
            },
        };
        rows.insert(
            &encounter.encounter_id,
            EncounterOutcomes {
                encounter_id: encounter.encounter_id.clone(),
                death: value(OutcomeKind::Death),
                vasopressor: value(OutcomeKind::Vasopressor),
                ventilator: value(OutcomeKind::Ventilator),
            },
        );
    }
    if uncensorable > 0 {
        warn!(
            dropped = uncensorable,
            "dropping encounters without a discharge offset"
        );
    }
    info!(encounters = rows.len(), "computed outcomes");
    rows.into_values().collect()
}

/// Shifts every outcome time so that it is measured from the horizon.
pub fn rebase(outcomes: &[EncounterOutcomes], horizon: Horizon) -> Vec<EncounterOutcomes> {
    let shift = horizon.days();
    outcomes
        .iter()
        .map(|row| {
            row.map(|value| OutcomeValue {
                time_days: value.time_days - shift,
                indicator: value.indicator,
            })
        })
        .collect()
}

/// Re-based rows still at risk for `kind`.
pub fn risk_set(rebased: &[EncounterOutcomes], kind: OutcomeKind) -> Vec<&EncounterOutcomes> {
    rebased
        .iter()
        .filter(|row| row.get(kind).is_at_risk())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> EncounterId {
        EncounterId::new(value).unwrap()
    }

    fn encounter(value: &str, discharge: Option<f64>, status: Option<&str>) -> EncounterRecord {
        EncounterRecord {
            encounter_id: id(value),
            patient_id: value.to_string(),
            admission_offset: Some(0.0),
            discharge_offset: discharge,
            discharge_status: status.map(str::to_string),
        }
    }

    #[test]
    fn earliest_event_sets_time() {
        let events = vec![
            OutcomeEvent {
                encounter_id: id("1"),
                kind: OutcomeKind::Vasopressor,
                offset: 2880.0,
            },
            OutcomeEvent {
                encounter_id: id("1"),
                kind: OutcomeKind::Vasopressor,
                offset: 1440.0,
            },
        ];
        let rows = compute_outcomes(&events, &[encounter("1", Some(4320.0), None)]);
        assert_eq!(
            rows[0].vasopressor,
            OutcomeValue {
                time_days: 1.0,
                indicator: 1
            }
        );
        assert_eq!(
            rows[0].death,
            OutcomeValue {
                time_days: 3.0,
                indicator: 0
            }
        );
    }

    #[test]
    fn missing_discharge_drops_encounter() {
        let rows = compute_outcomes(&[], &[encounter("1", None, None), encounter("2", Some(60.0), None)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].encounter_id.as_str(), "2");
    }

    #[test]
    fn expired_status_is_a_death_at_discharge() {
        let encounters = vec![
            encounter("1", Some(2880.0), Some("Expired")),
            encounter("2", Some(1440.0), Some("Alive")),
        ];
        let deaths = discharge_status_deaths(&encounters, "expired");
        assert_eq!(deaths.len(), 1);
        let rows = compute_outcomes(&deaths, &encounters);
        assert_eq!(rows[0].death.indicator, 1);
        assert_eq!(rows[0].death.time_days, 2.0);
        assert_eq!(rows[1].death.indicator, 0);
    }

    #[test]
    fn rebase_and_risk_set_are_per_outcome() {
        let row = EncounterOutcomes {
            encounter_id: id("1"),
            death: OutcomeValue {
                time_days: 3.0,
                indicator: 0,
            },
            vasopressor: OutcomeValue {
                time_days: 1.0,
                indicator: 1,
            },
            ventilator: OutcomeValue {
                time_days: 2.5,
                indicator: 1,
            },
        };
        let rebased = rebase(&[row], Horizon(1));
        assert_eq!(rebased[0].vasopressor.time_days, 0.0);
        assert!(risk_set(&rebased, OutcomeKind::Vasopressor).is_empty());
        assert_eq!(risk_set(&rebased, OutcomeKind::Ventilator).len(), 1);
        assert_eq!(risk_set(&rebased, OutcomeKind::Death).len(), 1);
    }
}
