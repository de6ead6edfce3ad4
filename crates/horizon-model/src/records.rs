//! Typed rows of the encounters and events input tables.

use serde::{Deserialize, Serialize};

use crate::ids::EncounterId;

/// One hospital/ICU encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub encounter_id: EncounterId,
    /// Parent stay; at most one encounter per parent stay survives normalization.
    pub patient_id: String,
    pub admission_offset: Option<f64>,
    /// Unit discharge, in minutes since encounter start.
    pub discharge_offset: Option<f64>,
    pub discharge_status: Option<String>,
}

/// One raw treatment or outcome occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub encounter_id: EncounterId,
    /// Minutes since encounter start.
    pub offset: f64,
    pub tag: String,
}
