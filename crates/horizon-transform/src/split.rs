//! Seeded train/test partitioning of horizon tables.

use horizon_common::numeric_values;
use polars::prelude::*;
use rand::SeedableRng as _;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use crate::error::{Result, TransformError};
use crate::normalize::take_rows;

/// Drops rows whose `column` is below `min` or missing.
pub fn filter_min_age(table: &DataFrame, column: &str, min: f64) -> Result<DataFrame> {
    if table.column(column).is_err() {
        return Err(TransformError::MissingColumn {
            column: column.to_string(),
        });
    }
    let mask: Vec<bool> = numeric_values(table, column)?
        .into_iter()
        .map(|age| age.is_some_and(|age| age >= min))
        .collect();
    let dropped = mask.iter().filter(|keep| !**keep).count();
    debug!(column, min, dropped, "applied minimum age filter");
    let mask = BooleanChunked::from_slice("adult".into(), &mask);
    Ok(table.filter(&mask)?)
}

/// Shuffles rows with a PCG generator seeded from `seed` and splits them.
///
/// The first `floor(n * train_fraction)` shuffled rows form the training
/// partition. The same table and seed always give the same partitions.
pub fn split_train_test(
    table: &DataFrame,
    train_fraction: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(TransformError::InvalidSplit(format!(
            "train fraction must be in (0, 1), got {train_fraction}"
        )));
    }
    let mut rows: Vec<usize> = (0..table.height()).collect();
    let mut rng = Pcg32::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let cut = (table.height() as f64 * train_fraction).floor() as usize;
    let (train_rows, test_rows) = rows.split_at(cut);
    let train = take_rows(table, train_rows)?;
    let test = take_rows(table, test_rows)?;
    info!(
        seed,
        train = train.height(),
        test = test.height(),
        "split horizon table"
    );
    Ok((train, test))
}

/// Shuffles all rows without splitting, for external validation cohorts.
pub fn shuffle_rows(table: &DataFrame, seed: u64) -> Result<DataFrame> {
    let mut rows: Vec<usize> = (0..table.height()).collect();
    rows.shuffle(&mut Pcg32::seed_from_u64(seed));
    take_rows(table, &rows)
}
