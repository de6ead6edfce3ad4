//! Temporal transformation of ICU event streams.
//!
//! - **normalize**: one encounter per parent stay, rows ordered by time
//! - **snapshot**: fixed-horizon snapshots with last-observation-carried-forward
//! - **outcome**: right-censored time-to-event labels and horizon re-basing
//! - **assemble**: per-horizon output tables and their CSV form
//! - **split**: seeded train/test partitioning

pub mod assemble;
pub mod error;
pub mod normalize;
pub mod outcome;
pub mod snapshot;
pub mod split;

pub use assemble::{assemble_horizon_table, horizon_table_name, write_horizon_table};
pub use error::{Result, TransformError};
pub use normalize::{normalize_events, select_first_visits};
pub use outcome::{
    EncounterOutcomes, OutcomeEvent, OutcomeValue, classify_events, compute_outcomes,
    discharge_status_deaths, rebase, risk_set,
};
pub use snapshot::{SnapshotSet, coalesce_instruments, ensure_within_horizon, extract};
pub use split::{filter_min_age, shuffle_rows, split_train_test};
