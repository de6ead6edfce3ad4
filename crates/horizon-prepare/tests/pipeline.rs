//! Tests for the fit/apply preparation pipeline.

use horizon_common::{f64_column, string_column};
use horizon_model::{
    CategoricalColumn, ImputeStrategy, OutcomeKind, PreparationOptions, outcome_columns,
};
use horizon_prepare::{
    PipelineState, PrepareError, PreparedPartition, TRAIN_PARTITION, UnfitPipeline,
};
use polars::prelude::*;
use proptest::prelude::*;

fn options(imputer: ImputeStrategy) -> PreparationOptions {
    PreparationOptions {
        excluded: vec!["fio2".to_string()],
        numeric: vec!["age".to_string(), "lab".to_string()],
        categorical: vec![
            CategoricalColumn::new("gender", "Female").with_alias("gender:m", "Male"),
        ],
        imputer,
    }
}

fn text(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

/// Six outcome columns; every outcome shares the death times for simplicity.
fn outcomes(times: &[f64], indicators: &[i32]) -> Vec<Column> {
    let names = outcome_columns();
    names
        .chunks(2)
        .flat_map(|pair| {
            [
                f64_column(&pair[0], times.iter().copied().map(Some).collect()),
                Series::new(pair[1].as_str().into(), indicators.to_vec()).into_column(),
            ]
        })
        .collect()
}

fn train_table() -> DataFrame {
    let mut columns = vec![
        string_column("encounter_id", text(&[Some("1"), Some("2"), Some("3"), Some("4"), Some("5")])),
        f64_column("age", vec![Some(60.0), Some(70.0), Some(80.0), Some(50.0), Some(40.0)]),
        f64_column("lab", vec![Some(1.0), None, Some(3.0), Some(5.0), None]),
        f64_column("zero", vec![Some(0.0); 5]),
        f64_column("fio2", vec![Some(0.4); 5]),
        string_column(
            "gender",
            text(&[Some("Male"), Some("Female"), None, Some("gender:m"), Some("Female")]),
        ),
    ];
    columns.extend(outcomes(&[2.0, 1.5, -0.5, 3.0, 0.0], &[1, 0, 1, 0, 0]));
    DataFrame::new(columns).unwrap()
}

fn test_table() -> DataFrame {
    let mut columns = vec![
        string_column("encounter_id", text(&[Some("10"), Some("11")])),
        f64_column("age", vec![Some(65.0), Some(55.0)]),
        f64_column("new_col", vec![Some(9.0), Some(9.0)]),
        string_column("gender", text(&[Some("Male"), Some("Other")])),
    ];
    columns.extend(outcomes(&[1.0, 2.0], &[0, 1]));
    DataFrame::new(columns).unwrap()
}

fn unfit(imputer: ImputeStrategy) -> UnfitPipeline {
    UnfitPipeline::new(options(imputer), OutcomeKind::Death, 42)
}

#[test]
fn fit_learns_schema_from_training_risk_set() {
    let (fitted, train) = unfit(ImputeStrategy::Median).fit(&train_table()).unwrap();

    insta::assert_snapshot!(fitted.schema().columns().join("\n"), @r"
    age
    lab
    gender_Male
    ");
    assert_eq!(train.name, TRAIN_PARTITION);
    assert_eq!(train.row_index, vec![0, 1, 3]);
    assert_eq!(train.encounter_ids, vec!["1", "2", "4"]);
    assert_eq!(train.y.time, vec![2.0, 1.5, 3.0]);
    assert_eq!(train.y.indicator, vec![1, 0, 0]);
    assert_eq!(train.y.time_column, "censor_or_deceased_days");
}

#[test]
fn training_matrix_is_imputed_and_scaled() {
    let (fitted, train) = unfit(ImputeStrategy::Median).fit(&train_table()).unwrap();
    let lab = train.x.column("lab").unwrap();
    let age = train.x.column("age").unwrap();
    let spread = (8.0f64 / 3.0).sqrt();
    assert!((lab[1]).abs() < 1e-12);
    assert!((lab[0] + 2.0 / spread).abs() < 1e-12);
    assert!((age[1] - 10.0 / (200.0f64 / 3.0).sqrt()).abs() < 1e-12);
    assert_eq!(train.x.column("gender_Male").unwrap(), [1.0, 0.0, 1.0]);
    assert_eq!(fitted.scaler().columns(), ["age".to_string(), "lab".to_string()]);
}

#[test]
fn apply_forces_fitted_schema() {
    let (fitted, _) = unfit(ImputeStrategy::Median).fit(&train_table()).unwrap();
    let test = fitted.apply("test", &test_table()).unwrap();
    assert_eq!(test.x.columns(), fitted.schema().columns());
    assert_eq!(test.x.height(), 2);
    // Absent column is zero-filled before scaling with the training parameters.
    let lab = test.x.column("lab").unwrap();
    assert!((lab[0] + 3.0 / (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
    assert_eq!(test.x.column("gender_Male").unwrap(), [1.0, 0.0]);
}

#[test]
fn apply_never_changes_the_fitted_transform() {
    let (fitted, _) = unfit(ImputeStrategy::HotDeck).fit(&train_table()).unwrap();
    let before = serde_json::to_vec(&fitted).unwrap();
    let snapshot = fitted.clone();

    let first = fitted.apply("test", &test_table()).unwrap();
    fitted.apply("train-again", &train_table()).unwrap();
    let second = fitted.apply("test", &test_table()).unwrap();

    assert_eq!(fitted, snapshot);
    assert_eq!(serde_json::to_vec(&fitted).unwrap(), before);
    assert_eq!(first, second);
}

#[test]
fn identical_inputs_give_identical_matrices() {
    let run = || -> (Vec<u8>, Vec<u8>) {
        let (fitted, train) = unfit(ImputeStrategy::HotDeck).fit(&train_table()).unwrap();
        let test = fitted.apply("test", &test_table()).unwrap();
        (
            serde_json::to_vec(&train).unwrap(),
            serde_json::to_vec(&test).unwrap(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn refit_returns_an_independent_transform() {
    let state = PipelineState::Unfit(unfit(ImputeStrategy::Median));
    assert!(matches!(
        state.apply("test", &test_table()),
        Err(PrepareError::UnfitTransform)
    ));

    let (fit_state, _) = state.fit(&train_table()).unwrap();
    assert!(fit_state.is_fit());
    let (refit_state, _) = fit_state.fit(&test_table()).unwrap();
    assert_ne!(fit_state, refit_state);
    assert!(fit_state.apply("test", &test_table()).is_ok());
}

#[test]
fn empty_risk_set_is_data_insufficient() {
    let mut table = train_table();
    table
        .with_column(f64_column("censor_or_deceased_days", vec![Some(-1.0); 5]))
        .unwrap();
    let err = unfit(ImputeStrategy::Median).fit(&table).unwrap_err();
    assert!(matches!(err, PrepareError::DataInsufficient { .. }));
}

#[test]
fn all_zero_features_collapse_the_schema() {
    let mut columns = vec![
        string_column("encounter_id", text(&[Some("1"), Some("2")])),
        f64_column("zero", vec![Some(0.0), None]),
    ];
    columns.extend(outcomes(&[1.0, 1.0], &[0, 0]));
    let table = DataFrame::new(columns).unwrap();
    let err = unfit(ImputeStrategy::Median).fit(&table).unwrap_err();
    assert!(matches!(err, PrepareError::SchemaCollapse));
}

#[test]
fn failing_partition_does_not_stop_siblings() {
    let (fitted, _) = unfit(ImputeStrategy::Median).fit(&train_table()).unwrap();
    let mut censored = test_table();
    censored
        .with_column(f64_column("censor_or_deceased_days", vec![Some(0.0); 2]))
        .unwrap();
    let test = test_table();
    let results = fitted.apply_all([("external", &censored), ("internal", &test)]);
    assert_eq!(results.len(), 2);
    assert!(matches!(
        results[0].1,
        Err(PrepareError::DataInsufficient { .. })
    ));
    let internal: &PreparedPartition = results[1].1.as_ref().unwrap();
    assert_eq!(internal.x.height(), 2);
}

#[test]
fn missing_outcome_column_is_reported() {
    let table = train_table().drop("deceased_indicator").unwrap();
    let err = unfit(ImputeStrategy::Median).fit(&table).unwrap_err();
    assert!(matches!(err, PrepareError::MissingColumn { column } if column == "deceased_indicator"));
}

proptest! {
    #[test]
    fn apply_output_always_matches_schema(
        keep_age in any::<bool>(),
        keep_gender in any::<bool>(),
        extra in proptest::collection::vec("[a-z]{3,8}", 0..4),
    ) {
        let (fitted, _) = unfit(ImputeStrategy::Median).fit(&train_table()).unwrap();
        let mut table = test_table();
        if !keep_age {
            table = table.drop("age").unwrap();
        }
        if !keep_gender {
            table = table.drop("gender").unwrap();
        }
        for name in extra {
            if table.column(&name).is_err() {
                table.with_column(f64_column(&name, vec![Some(1.0), None])).unwrap();
            }
        }
        let prepared = fitted.apply("test", &table).unwrap();
        prop_assert_eq!(prepared.x.columns(), fitted.schema().columns());
        prop_assert!(prepared.x.to_dataframe().unwrap().height() == 2);
    }
}
