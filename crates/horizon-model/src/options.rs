//! Configuration options for extraction, preparation and caching.
//!
//! Every section has defaults mirroring the pneumonia ICU cohorts the pipeline
//! was built for, so a TOML file only needs to name what differs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::columns::EVENT_KEY_COLUMNS;
use crate::error::{ModelError, Result};
use crate::horizon::{DEFAULT_HORIZONS, Horizon};
use crate::outcome::{OutcomeKind, outcome_columns};

/// How a carried-forward variable is typed in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// Coerced to `f64`; unparseable values become null.
    Numeric,
    /// Kept as text for later one-hot encoding.
    Categorical,
}

/// One variable tracked by the snapshot extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryForwardVar {
    pub name: String,
    pub kind: VariableKind,
}

impl CarryForwardVar {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Numeric,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Categorical,
        }
    }
}

/// Ordered alternate sources for one physiological variable.
///
/// The first non-null source on a row wins; readings are never averaged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentPreference {
    pub target: String,
    pub sources: Vec<String>,
}

/// Raw event tags that count as each outcome.
///
/// Canonical tags (`death`, `vasopressor`, `ventilator`) are always
/// recognised; these lists add source-specific treatment strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTagSets {
    pub death: Vec<String>,
    pub vasopressor: Vec<String>,
    pub ventilator: Vec<String>,
}

impl EventTagSets {
    /// Classify a raw tag, returning `None` for unrelated treatments.
    pub fn classify(&self, tag: &str) -> Option<OutcomeKind> {
        let trimmed = tag.trim();
        for kind in OutcomeKind::ALL {
            if trimmed.eq_ignore_ascii_case(kind.tag()) {
                return Some(kind);
            }
        }
        let matches = |list: &[String]| list.iter().any(|entry| entry.trim() == trimmed);
        if matches(&self.death) {
            Some(OutcomeKind::Death)
        } else if matches(&self.vasopressor) {
            Some(OutcomeKind::Vasopressor)
        } else if matches(&self.ventilator) {
            Some(OutcomeKind::Ventilator)
        } else {
            None
        }
    }
}

impl Default for EventTagSets {
    fn default() -> Self {
        Self {
            death: Vec::new(),
            vasopressor: to_strings(&DEFAULT_VASOPRESSOR_TAGS),
            ventilator: to_strings(&DEFAULT_VENTILATOR_TAGS),
        }
    }
}

/// Options for the event normalizer, snapshot extractor and outcome calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// Horizons to materialise, in days.
    pub horizons: Vec<Horizon>,
    /// Variables to carry forward. Empty means every non-key column.
    pub carry_forward: Vec<String>,
    /// Alternate instrument sources, coalesced before carry-forward.
    pub instruments: Vec<InstrumentPreference>,
    /// Raw event tags per outcome.
    pub event_tags: EventTagSets,
    /// Discharge status fragment marking in-unit death (case-insensitive).
    pub expired_status_marker: String,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            horizons: DEFAULT_HORIZONS.to_vec(),
            carry_forward: Vec::new(),
            instruments: Vec::new(),
            event_tags: EventTagSets::default(),
            expired_status_marker: "expired".to_string(),
        }
    }
}

/// A categorical column and the reference category dropped after encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub reference: String,
    /// Raw value -> canonical category, applied before encoding.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl CategoricalColumn {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(raw.into(), canonical.into());
        self
    }
}

/// Imputation algorithm fitted on the training partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImputeStrategy {
    /// Per-column median of observed training values.
    #[default]
    Median,
    /// Per-column mean of observed training values.
    Mean,
    /// Seeded random draw from observed training values.
    HotDeck,
}

/// Options for the feature preparation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationOptions {
    /// Columns dropped before anything else (outcome leaks, irrelevant fields).
    pub excluded: Vec<String>,
    /// Columns standardised by the fitted scaler.
    pub numeric: Vec<String>,
    /// Columns one-hot encoded with a dropped reference category.
    pub categorical: Vec<CategoricalColumn>,
    pub imputer: ImputeStrategy,
}

impl Default for PreparationOptions {
    fn default() -> Self {
        Self {
            excluded: to_strings(&DEFAULT_EXCLUDED),
            numeric: to_strings(&DEFAULT_NUMERIC),
            categorical: vec![
                CategoricalColumn::new("ethnicity", "Other"),
                CategoricalColumn::new("gender", "Female")
                    .with_alias("gender:m", "Male")
                    .with_alias("gender:f", "Female"),
            ],
            imputer: ImputeStrategy::default(),
        }
    }
}

impl PreparationOptions {
    pub fn categorical_column(&self, name: &str) -> Option<&CategoricalColumn> {
        self.categorical.iter().find(|column| column.name == name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|column| column == name)
    }
}

/// Options for the seeded train/test split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    pub train_fraction: f64,
    /// Drop rows whose age is below this bound before splitting.
    pub min_age: Option<f64>,
    pub age_column: String,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_fraction: 0.7,
            min_age: None,
            age_column: "age".to_string(),
        }
    }
}

/// Options for the prepared-artifact cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub cohort_prefix: String,
    pub directory: PathBuf,
    /// Recompute even when a cache entry exists.
    pub force: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cohort_prefix: "any".to_string(),
            directory: PathBuf::from("cache"),
            force: false,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    pub outcome: OutcomeKind,
    pub extraction: ExtractionOptions,
    pub preparation: PreparationOptions,
    pub split: SplitOptions,
    pub cache: CacheOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            outcome: OutcomeKind::Death,
            extraction: ExtractionOptions::default(),
            preparation: PreparationOptions::default(),
            split: SplitOptions::default(),
            cache: CacheOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Parse and validate TOML text; `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ModelError::ConfigParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction.horizons.is_empty() {
            return Err(ModelError::EmptyHorizons);
        }
        let fraction = self.split.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "train_fraction must be in (0, 1), got {fraction}"
            )));
        }
        for column in &self.preparation.categorical {
            if column.reference.trim().is_empty() {
                return Err(ModelError::InvalidConfig(format!(
                    "categorical column '{}' has no reference category",
                    column.name
                )));
            }
        }
        for preference in &self.extraction.instruments {
            if preference.sources.is_empty() {
                return Err(ModelError::InvalidConfig(format!(
                    "instrument preference for '{}' lists no sources",
                    preference.target
                )));
            }
        }
        Ok(())
    }

    /// Sorted, de-duplicated horizons.
    pub fn horizons(&self) -> Vec<Horizon> {
        let mut horizons = self.extraction.horizons.clone();
        horizons.sort();
        horizons.dedup();
        horizons
    }

    /// Resolve the carry-forward variable set against the columns of a wide table.
    ///
    /// Instrument targets are included even though the raw table only holds
    /// their source columns; source columns themselves are not carried, and
    /// neither are columns named like outcome labels.
    pub fn carry_forward_vars(&self, available: &[String]) -> Vec<CarryForwardVar> {
        let instrument_sources: Vec<&str> = self
            .extraction
            .instruments
            .iter()
            .flat_map(|preference| preference.sources.iter().map(String::as_str))
            .collect();
        let outcome_names = outcome_columns();
        let mut names: Vec<String> = if self.extraction.carry_forward.is_empty() {
            available
                .iter()
                .filter(|name| !EVENT_KEY_COLUMNS.contains(&name.as_str()))
                .filter(|name| !outcome_names.contains(name))
                .filter(|name| !instrument_sources.contains(&name.as_str()))
                .cloned()
                .collect()
        } else {
            self.extraction.carry_forward.clone()
        };
        for preference in &self.extraction.instruments {
            if !names.contains(&preference.target) {
                names.push(preference.target.clone());
            }
        }
        names
            .into_iter()
            .map(|name| {
                if self.preparation.categorical_column(&name).is_some() {
                    CarryForwardVar::categorical(name)
                } else {
                    CarryForwardVar::numeric(name)
                }
            })
            .collect()
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

const DEFAULT_EXCLUDED: [&str; 9] = [
    "Unnamed: 0",
    "fibrinogen",
    "ferritin",
    "crp",
    "smoking",
    "d.dimer",
    "nursing_home",
    "chest_xray",
    "fio2",
];

const DEFAULT_NUMERIC: [&str; 46] = [
    "rbcs",
    "wbc",
    "platelets",
    "hemoglobin",
    "hct",
    "rdw",
    "mcv",
    "mch",
    "mchc",
    "neutrophils",
    "lymphocytes",
    "monocytes",
    "eosinophils",
    "basophils",
    "bun",
    "temperature",
    "ph",
    "sodium",
    "glucose",
    "pao2",
    "ldh",
    "direct_bilirubin",
    "total_bilirubin",
    "total_protein",
    "albumin",
    "pt",
    "ptt",
    "ast",
    "alt",
    "creatinine",
    "troponin",
    "alkaline_phosphatase",
    "bands",
    "bicarbonate",
    "calcium",
    "chloride",
    "potassium",
    "age",
    "heart_rate",
    "sao2",
    "gcs",
    "respiratory_rate",
    "bp_systolic",
    "bp_diastolic",
    "bp_mean_arterial",
    "orientation",
];

const DEFAULT_VASOPRESSOR_TAGS: [&str; 14] = [
    "cardiovascular|shock|vasopressors|norepinephrine > 0.1 micrograms/kg/min",
    "cardiovascular|shock|vasopressors|dopamine >15 micrograms/kg/min",
    "cardiovascular|shock|vasopressors|epinephrine > 0.1 micrograms/kg/min",
    "cardiovascular|shock|vasopressors",
    "cardiovascular|shock|vasopressors|vasopressin",
    "cardiovascular|shock|vasopressors|dopamine  5-15 micrograms/kg/min",
    "cardiovascular|shock|vasopressors|phenylephrine (Neosynephrine)",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors|norepinephrine <= 0.1 micrograms/kg/min",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors|norepinephrine > 0.1 micrograms/kg/min",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors|phenylephrine (Neosynephrine)",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors|dopamine 5-15 micrograms/kg/min",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors|epinephrine > 0.1 micrograms/kg/min",
    "neurologic|therapy for controlling cerebral perfusion pressure|vasopressors|dopamine > 15 micrograms/kg/min",
];

const DEFAULT_VENTILATOR_TAGS: [&str; 14] = [
    "pulmonary|ventilation and oxygenation|mechanical ventilation",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|tidal volume < 6 ml/kg",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|pressure controlled",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|assist controlled",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|synchronized intermittent",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|tidal volume 6-10 ml/kg",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|volume controlled",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|non-invasive ventilation",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|pressure support",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|permissive hypercapnea",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|tidal volume > 10 ml/kg",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|non-invasive ventilation|face mask",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|volume assured",
    "pulmonary|ventilation and oxygenation|mechanical ventilation|non-invasive ventilation|nasal mask",
];
