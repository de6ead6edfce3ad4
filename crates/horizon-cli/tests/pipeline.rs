//! End-to-end runs of the extract, split and prepare stages.

use std::fs;
use std::path::{Path, PathBuf};

use horizon_cli::pipeline::{ExtractInputs, PrepareRequest, run_extract, run_prepare, run_split};
use horizon_model::{Horizon, ImputeStrategy, OutcomeKind, PipelineConfig, outcome_columns};
use polars::prelude::*;
use tempfile::TempDir;

const WIDE: &str = "\
encounter_id,time_offset,age,gender,wbc,temperature
101,0,65,Male,8.1,36.6
101,1800,,,12.0,38.2
109,0,65,Male,5.0,36.0
102,0,70,Female,9.2,
102,1800,,,9.0,37.1
103,0,55,Male,10.5,37.0
104,0,80,Female,7.7,36.8
104,1800,,,14.1,
105,0,45,gender:m,,36.9
106,-30,60,Female,11.0,37.4
107,0,72,Male,6.5,36.5
108,0,50,Female,9.9,37.2
";

const ENCOUNTERS: &str = "\
encounter_id,patient_id,admission_offset,discharge_offset,discharge_status
101,p1,0,5760,Alive
109,p1,-5000,900,Alive
102,p2,0,4320,Alive
103,p3,0,2880,Expired
104,p4,0,7200,Alive
105,p5,0,1000,Alive
106,p6,0,8640,Alive
107,p7,0,5000,Alive
108,p8,0,6000,Alive
";

const EVENTS: &str = "\
encounter_id,event_offset,event_type_tag
101,4320,death
102,720,vasopressor
104,3000,Ventilator
106,8000,death
107,100,antibiotics
109,100,death
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ws = Self { dir };
        ws.write("wide.csv", WIDE);
        ws.write("encounters.csv", ENCOUNTERS);
        ws.write("events.csv", EVENTS);
        ws
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.path(name), contents).unwrap();
    }

    fn inputs(&self) -> ExtractInputs {
        ExtractInputs {
            wide: self.path("wide.csv"),
            encounters: self.path("encounters.csv"),
            events: self.path("events.csv"),
        }
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.extraction.horizons = vec![Horizon(0), Horizon(1)];
        config.cache.directory = self.path("cache");
        config
    }
}

fn read(path: &Path) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .unwrap()
        .finish()
        .unwrap()
}

fn extract_and_split(ws: &Workspace, config: &PipelineConfig) -> (PathBuf, PathBuf) {
    let horizons = ws.path("horizons");
    run_extract(&ws.inputs(), config, &horizons).unwrap();
    let split = run_split(&horizons.join("any_day0.csv"), config, &ws.path("split"), false).unwrap();
    (split.outputs[0].1.clone(), split.outputs[1].1.clone())
}

#[test]
fn extract_writes_one_table_per_horizon() {
    let ws = Workspace::new();
    let result = run_extract(&ws.inputs(), &ws.config(), &ws.path("horizons")).unwrap();

    assert_eq!(result.encounters, 9);
    assert_eq!(result.first_visits, 8);
    assert_eq!(result.outputs.len(), 2);

    let day0 = &result.outputs[0];
    assert!(day0.path.ends_with("any_day0.csv"));
    assert_eq!((day0.rows, day0.columns), (8, 11));
    // 105 is discharged before day 1 and 102 had its vasopressor at 0.5 days.
    assert_eq!(result.outputs[0].at_risk, [8, 8, 8]);
    assert_eq!(result.outputs[1].at_risk, [7, 6, 7]);

    let table = read(&day0.path);
    let names: Vec<String> = table
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    insta::assert_snapshot!(names.join("\n"), @r"
    encounter_id
    age
    gender
    wbc
    temperature
    censor_or_deceased_days
    deceased_indicator
    censor_or_vasopressor_days
    vasopressor_indicator
    censor_or_ventilator_days
    ventilator_indicator
    ");
    assert_eq!(&names[5..], outcome_columns().as_slice());
    assert!(!names.contains(&"time_offset".to_string()));

    let deaths = table
        .column("deceased_indicator")
        .unwrap()
        .as_materialized_series()
        .sum::<i64>()
        .unwrap();
    // 101 and 106 by event, 103 by discharge status; 109 is not a first visit.
    assert_eq!(deaths, 3);
}

#[test]
fn later_horizon_carries_the_latest_value() {
    let ws = Workspace::new();
    let result = run_extract(&ws.inputs(), &ws.config(), &ws.path("horizons")).unwrap();
    let table = read(&result.outputs[1].path);

    let ids: Vec<i64> = table
        .column("encounter_id")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    let row = ids.iter().position(|id| *id == 101).unwrap();
    let wbc = table.column("wbc").unwrap().f64().unwrap().get(row);
    let age = table
        .column("age")
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .get(row);
    // The 1800-minute reading is past the day-1 cutoff (1440).
    assert_eq!(wbc, Some(8.1));
    assert_eq!(age, Some(65.0));
}

#[test]
fn split_is_reproducible_and_complete() {
    let ws = Workspace::new();
    let config = ws.config();
    let horizons = ws.path("horizons");
    run_extract(&ws.inputs(), &config, &horizons).unwrap();

    let input = horizons.join("any_day0.csv");
    let first = run_split(&input, &config, &ws.path("a"), false).unwrap();
    let second = run_split(&input, &config, &ws.path("b"), false).unwrap();

    assert_eq!(first.outputs[0].2, 5);
    assert_eq!(first.outputs[1].2, 3);
    for (left, right) in first.outputs.iter().zip(&second.outputs) {
        assert_eq!(fs::read(&left.1).unwrap(), fs::read(&right.1).unwrap());
    }
}

#[test]
fn minimum_age_filters_before_splitting() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.split.min_age = Some(60.0);
    let horizons = ws.path("horizons");
    run_extract(&ws.inputs(), &config, &horizons).unwrap();

    let result = run_split(&horizons.join("any_day0.csv"), &config, &ws.path("ext"), true).unwrap();
    assert_eq!(result.filtered, 3);
    assert_eq!(result.outputs.len(), 1);
    assert_eq!(result.outputs[0].0, "external");
    assert_eq!(result.outputs[0].2, 5);
}

#[test]
fn prepare_caches_and_detects_changed_inputs() {
    let ws = Workspace::new();
    let config = ws.config();
    let (train, test) = extract_and_split(&ws, &config);
    let request = PrepareRequest {
        horizon: Horizon(0),
        train,
        held_out: vec![("test".to_string(), test.clone())],
    };

    let computed = run_prepare(&request, &config).unwrap();
    assert!(!computed.cached);
    assert!(!computed.has_failures());
    assert!(computed.path.ends_with("any_day0_deceased_seed42.bundle"));
    assert_eq!(computed.bundle.train.x.height(), 5);
    let test_partition = computed.bundle.partition("test").unwrap();
    assert_eq!(test_partition.x.height(), 3);
    assert_eq!(test_partition.x.columns(), computed.bundle.train.x.columns());

    let cached = run_prepare(&request, &config).unwrap();
    assert!(cached.cached);
    assert_eq!(cached.bundle, computed.bundle);

    let mut forced_config = config.clone();
    forced_config.cache.force = true;
    let forced = run_prepare(&request, &forced_config).unwrap();
    assert!(!forced.cached);
    assert_eq!(forced.bundle.train, computed.bundle.train);

    let contents = fs::read_to_string(&test).unwrap();
    let mut lines: Vec<&str> = contents.lines().collect();
    lines[1..].reverse();
    fs::write(&test, lines.join("\n") + "\n").unwrap();
    let recomputed = run_prepare(&request, &config).unwrap();
    assert!(!recomputed.cached);
}

#[test]
fn changed_imputer_recomputes_bundle() {
    let ws = Workspace::new();
    let config = ws.config();
    let (train, test) = extract_and_split(&ws, &config);
    let request = PrepareRequest {
        horizon: Horizon(0),
        train,
        held_out: vec![("test".to_string(), test)],
    };

    let first = run_prepare(&request, &config).unwrap();
    assert!(!first.cached);
    assert_eq!(first.bundle.imputer().strategy(), ImputeStrategy::Median);

    let mut mean_config = config.clone();
    mean_config.preparation.imputer = ImputeStrategy::Mean;
    let second = run_prepare(&request, &mean_config).unwrap();
    assert!(!second.cached);
    assert_eq!(second.path, first.path);
    assert_eq!(second.bundle.imputer().strategy(), ImputeStrategy::Mean);

    let repeated = run_prepare(&request, &mean_config).unwrap();
    assert!(repeated.cached);
    assert_eq!(repeated.bundle, second.bundle);

    let back = run_prepare(&request, &config).unwrap();
    assert!(!back.cached);
    assert_eq!(back.bundle.imputer().strategy(), ImputeStrategy::Median);
}

#[test]
fn unreadable_held_out_does_not_stop_siblings() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.outcome = OutcomeKind::Vasopressor;
    let (train, test) = extract_and_split(&ws, &config);
    ws.write("empty.csv", "");
    let request = PrepareRequest {
        horizon: Horizon(0),
        train,
        held_out: vec![
            ("broken".to_string(), ws.path("empty.csv")),
            ("test".to_string(), test),
        ],
    };

    let result = run_prepare(&request, &config).unwrap();
    assert!(result.has_failures());
    assert_eq!(result.bundle.failures[0].name, "broken");
    assert!(result.bundle.partition("test").is_some());
    assert!(result.path.ends_with("any_day0_vasopressor_seed42.bundle"));
}
