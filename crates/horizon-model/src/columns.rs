//! Column names shared by the input tables and the horizon outputs.

/// Encounter identifier column in every table.
pub const ENCOUNTER_ID: &str = "encounter_id";
/// Minutes since encounter start for wide event rows.
pub const TIME_OFFSET: &str = "time_offset";
/// Horizon index column on snapshot tables.
pub const HORIZON: &str = "horizon";

/// Parent stay column in the encounters table.
pub const PATIENT_ID: &str = "patient_id";
/// Hospital admission offset column in the encounters table.
pub const ADMISSION_OFFSET: &str = "admission_offset";
/// Unit discharge offset column in the encounters table (minutes).
pub const DISCHARGE_OFFSET: &str = "discharge_offset";
/// Optional discharge status column in the encounters table.
pub const DISCHARGE_STATUS: &str = "discharge_status";

/// Event offset column in the events table (minutes).
pub const EVENT_OFFSET: &str = "event_offset";
/// Raw event tag column in the events table.
pub const EVENT_TYPE_TAG: &str = "event_type_tag";

/// Columns of the wide table that are never carried forward.
pub const EVENT_KEY_COLUMNS: [&str; 2] = [ENCOUNTER_ID, TIME_OFFSET];
