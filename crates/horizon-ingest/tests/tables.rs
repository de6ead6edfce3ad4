//! Integration tests for the input table loaders.

use std::io::Write;

use horizon_common::{numeric_values, string_values};
use horizon_ingest::{IngestError, read_encounters, read_events, read_wide_rows};
use tempfile::NamedTempFile;

fn csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[test]
fn wide_rows_normalize_keys_and_drop_unplaceable_rows() {
    let file = csv(
        "encounter_id,time_offset,heart_rate,gender\n\
         101,-30,88,Male\n\
         101,,90,Male\n\
         ,10,70,Female\n\
         102,60,n/a,Female\n",
    );
    let df = read_wide_rows(file.path()).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(
        string_values(&df, "encounter_id").unwrap(),
        vec![Some("101".to_string()), Some("102".to_string())]
    );
    assert_eq!(
        numeric_values(&df, "time_offset").unwrap(),
        vec![Some(-30.0), Some(60.0)]
    );
    assert_eq!(
        numeric_values(&df, "heart_rate").unwrap(),
        vec![Some(88.0), None]
    );
}

#[test]
fn wide_rows_require_time_offset() {
    let file = csv("encounter_id,heart_rate\n1,80\n");
    let err = read_wide_rows(file.path()).unwrap_err();
    assert!(matches!(err, IngestError::MissingColumn { .. }));
}

#[test]
fn encounters_read_optional_status() {
    let file = csv(
        "encounter_id,patient_id,admission_offset,discharge_offset,discharge_status\n\
         1,A,0,2880,Alive\n\
         2,,-100,1440,Expired\n",
    );
    let encounters = read_encounters(file.path()).unwrap();
    assert_eq!(encounters.len(), 2);
    assert_eq!(encounters[0].patient_id, "A");
    assert_eq!(encounters[0].discharge_offset, Some(2880.0));
    assert_eq!(encounters[1].patient_id, "2");
    assert_eq!(encounters[1].admission_offset, Some(-100.0));
    assert_eq!(encounters[1].discharge_status.as_deref(), Some("Expired"));
}

#[test]
fn encounters_without_status_column() {
    let file = csv("encounter_id,patient_id,admission_offset,discharge_offset\n7,P,0,\n");
    let encounters = read_encounters(file.path()).unwrap();
    assert_eq!(encounters[0].discharge_offset, None);
    assert_eq!(encounters[0].discharge_status, None);
}

#[test]
fn duplicate_encounters_are_rejected() {
    let file = csv(
        "encounter_id,patient_id,admission_offset,discharge_offset\n1,A,0,10\n1,A,5,20\n",
    );
    assert!(matches!(
        read_encounters(file.path()),
        Err(IngestError::DuplicateEncounter { .. })
    ));
}

#[test]
fn events_skip_incomplete_rows() {
    let file = csv(
        "encounter_id,event_offset,event_type_tag\n\
         1,300,vasopressor\n\
         1,,ventilator\n\
         2,50,\n",
    );
    let events = read_events(file.path()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].encounter_id.as_str(), "1");
    assert_eq!(events[0].offset, 300.0);
    assert_eq!(events[0].tag, "vasopressor");
}

#[test]
fn header_only_events_table_is_empty() {
    let file = csv("encounter_id,event_offset,event_type_tag\n");
    assert!(read_events(file.path()).unwrap().is_empty());
}
