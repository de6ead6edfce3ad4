pub mod columns;
pub mod error;
pub mod horizon;
pub mod ids;
pub mod options;
pub mod outcome;
pub mod records;

pub use error::{ModelError, Result};
pub use horizon::{DEFAULT_HORIZONS, Horizon, MINUTES_PER_DAY, minutes_to_days};
pub use ids::EncounterId;
pub use options::{
    CacheOptions, CarryForwardVar, CategoricalColumn, EventTagSets, ExtractionOptions,
    ImputeStrategy, InstrumentPreference, PipelineConfig, PreparationOptions, SplitOptions,
    VariableKind,
};
pub use outcome::{OutcomeKind, outcome_columns};
pub use records::{EncounterRecord, EventRecord};
