//! Input table ingestion.
//!
//! Reads the three CSV inputs of the horizon pipeline into Polars frames or
//! typed records:
//!
//! - **wide rows**: `encounter_id, time_offset, <variables...>`
//! - **encounters**: `encounter_id, patient_id, admission_offset, discharge_offset[, discharge_status]`
//! - **events**: `encounter_id, event_offset, event_type_tag`

mod error;
mod reader;
mod tables;

pub use error::{IngestError, Result};
pub use reader::{read_csv_frame, validate_encoding, validate_shape};
pub use tables::{read_encounters, read_events, read_wide_rows};
