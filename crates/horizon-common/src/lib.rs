//! Shared utilities for the horizon crates.
//!
//! Typed column access and construction helpers over Polars frames, so the
//! pipeline stages read named columns the same way everywhere.

pub mod polars;

pub use polars::{
    any_to_string, column_names, f64_column, has_column, numeric_values, parse_f64,
    string_column, string_values,
};
