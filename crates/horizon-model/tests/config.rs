//! Tests for pipeline configuration loading.

use std::path::Path;

use horizon_model::{
    CarryForwardVar, Horizon, ImputeStrategy, ModelError, OutcomeKind, PipelineConfig,
};

#[test]
fn partial_toml_keeps_defaults() {
    let text = r#"
        seed = 7
        outcome = "ventilator"

        [extraction]
        horizons = [0, 3]

        [cache]
        cohort_prefix = "mimic"
    "#;
    let config = PipelineConfig::from_toml_str(text, Path::new("inline.toml")).unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.outcome, OutcomeKind::Ventilator);
    assert_eq!(config.horizons(), vec![Horizon(0), Horizon(3)]);
    assert_eq!(config.preparation.imputer, ImputeStrategy::Median);
    assert_eq!(config.preparation.numeric.len(), 46);
    assert_eq!(config.cache.cohort_prefix, "mimic");
}

#[test]
fn empty_horizons_are_rejected() {
    let text = "[extraction]\nhorizons = []\n";
    let err = PipelineConfig::from_toml_str(text, Path::new("inline.toml")).unwrap_err();
    assert!(matches!(err, ModelError::EmptyHorizons));
}

#[test]
fn bad_train_fraction_is_rejected() {
    let text = "[split]\ntrain_fraction = 1.5\n";
    let err = PipelineConfig::from_toml_str(text, Path::new("inline.toml")).unwrap_err();
    assert!(matches!(err, ModelError::InvalidConfig(_)));
}

#[test]
fn malformed_toml_reports_origin() {
    let err = PipelineConfig::from_toml_str("seed = [", Path::new("broken.toml")).unwrap_err();
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = PipelineConfig::load(Path::new("/nonexistent/icu-horizon.toml")).unwrap_err();
    assert!(matches!(err, ModelError::ConfigRead { .. }));
}

#[test]
fn carry_forward_resolves_kinds_and_instruments() {
    let text = r#"
        [[extraction.instruments]]
        target = "sao2"
        sources = ["sao2_invasive", "sao2_pulse"]
    "#;
    let config = PipelineConfig::from_toml_str(text, Path::new("inline.toml")).unwrap();
    let available: Vec<String> = [
        "encounter_id",
        "time_offset",
        "heart_rate",
        "gender",
        "sao2_invasive",
        "sao2_pulse",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let vars = config.carry_forward_vars(&available);
    assert_eq!(
        vars,
        vec![
            CarryForwardVar::numeric("heart_rate"),
            CarryForwardVar::categorical("gender"),
            CarryForwardVar::numeric("sao2"),
        ]
    );
}

#[test]
fn event_tags_classify_treatment_strings() {
    let config = PipelineConfig::default();
    let tags = &config.extraction.event_tags;
    assert_eq!(tags.classify("death"), Some(OutcomeKind::Death));
    assert_eq!(tags.classify("Vasopressor"), Some(OutcomeKind::Vasopressor));
    assert_eq!(
        tags.classify("cardiovascular|shock|vasopressors|vasopressin"),
        Some(OutcomeKind::Vasopressor)
    );
    assert_eq!(
        tags.classify("pulmonary|ventilation and oxygenation|mechanical ventilation"),
        Some(OutcomeKind::Ventilator)
    );
    assert_eq!(tags.classify("antibiotics"), None);
}

#[test]
fn gender_aliases_are_configured_by_default() {
    let config = PipelineConfig::default();
    let gender = config.preparation.categorical_column("gender").unwrap();
    assert_eq!(gender.reference, "Female");
    assert_eq!(gender.aliases.get("gender:m").map(String::as_str), Some("Male"));
}

#[test]
fn shipped_eicu_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/eicu.toml");
    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.cache.cohort_prefix, "eicu");
    assert_eq!(config.split.min_age, Some(18.0));
    assert_eq!(config.extraction.instruments[0].target, "temperature");
    assert_eq!(
        config.extraction.event_tags.classify("Expired"),
        Some(OutcomeKind::Death)
    );
    // Untouched sections keep their defaults.
    assert!(config.preparation.numeric.contains(&"wbc".to_string()));
    assert_eq!(config.preparation.imputer, ImputeStrategy::Median);
}
