//! Run stages of the horizon tool.
//!
//! 1. **Extract**: wide rows, encounters and events into one CSV per horizon
//! 2. **Split**: a horizon table into seeded train/test partitions
//! 3. **Prepare**: fit on the training partition, replay on held-out
//!    partitions, and cache the bundle
//!
//! Each stage is a plain function over an explicit [`PipelineConfig`], so the
//! binary and the integration tests drive the same code.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};

use horizon_common::column_names;
use horizon_ingest::{read_csv_frame, read_encounters, read_events, read_wide_rows};
use horizon_model::{Horizon, OutcomeKind, PipelineConfig};
use horizon_persistence::{
    ArtifactBundle, ArtifactCache, CacheKey, CacheLookup, PartitionFailure, fingerprint_sources,
};
use horizon_prepare::UnfitPipeline;
use horizon_transform::{
    EncounterOutcomes, assemble_horizon_table, classify_events, coalesce_instruments,
    compute_outcomes, discharge_status_deaths, extract, filter_min_age, horizon_table_name,
    normalize_events, rebase, risk_set, select_first_visits, shuffle_rows, split_train_test,
    write_horizon_table,
};

// ============================================================================
// Stage 1: Extract
// ============================================================================

/// Paths of the three input tables.
#[derive(Debug, Clone)]
pub struct ExtractInputs {
    pub wide: PathBuf,
    pub encounters: PathBuf,
    pub events: PathBuf,
}

/// One written horizon table.
#[derive(Debug, Clone)]
pub struct HorizonOutput {
    pub horizon: Horizon,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    /// Encounters with a positive time-to-event per outcome, in contract order.
    pub at_risk: [usize; 3],
}

#[derive(Debug)]
pub struct ExtractResult {
    pub encounters: usize,
    pub first_visits: usize,
    pub outcome_events: usize,
    pub outputs: Vec<HorizonOutput>,
}

pub fn run_extract(
    inputs: &ExtractInputs,
    config: &PipelineConfig,
    output_dir: &Path,
) -> Result<ExtractResult> {
    let _span = info_span!("extract", prefix = %config.cache.cohort_prefix).entered();
    let start = Instant::now();

    let encounters = read_encounters(&inputs.encounters).context("read encounters table")?;
    let events = read_events(&inputs.events).context("read events table")?;
    let wide = read_wide_rows(&inputs.wide).context("read wide event rows")?;

    let first = select_first_visits(&encounters);
    let normalized = normalize_events(&wide, &first).context("normalize event rows")?;
    let coalesced = coalesce_instruments(&normalized, &config.extraction.instruments)
        .context("coalesce instrument columns")?;
    let variables = config.carry_forward_vars(&column_names(&coalesced));
    let horizons = config.horizons();
    let snapshots = extract(&coalesced, &horizons, &variables).context("extract snapshots")?;

    let mut outcome_events = classify_events(&events, &config.extraction.event_tags);
    outcome_events.extend(discharge_status_deaths(
        &first,
        &config.extraction.expired_status_marker,
    ));
    let outcomes = compute_outcomes(&outcome_events, &first);

    let mut outputs = Vec::with_capacity(snapshots.len());
    for (horizon, snapshot) in snapshots.iter() {
        let mut table = assemble_horizon_table(snapshot, &outcomes, horizon)
            .with_context(|| format!("assemble horizon table {horizon}"))?;
        let path = output_dir.join(horizon_table_name(&config.cache.cohort_prefix, horizon));
        write_horizon_table(&mut table, &path)
            .with_context(|| format!("write {}", path.display()))?;
        let at_risk = at_risk_counts(&outcomes, horizon);
        info!(
            %horizon,
            rows = table.height(),
            columns = table.width(),
            path = %path.display(),
            "wrote horizon table"
        );
        outputs.push(HorizonOutput {
            horizon,
            path,
            rows: table.height(),
            columns: table.width(),
            at_risk,
        });
    }

    info!(
        encounters = encounters.len(),
        first_visits = first.len(),
        horizons = outputs.len(),
        duration_ms = start.elapsed().as_millis(),
        "extraction complete"
    );
    Ok(ExtractResult {
        encounters: encounters.len(),
        first_visits: first.len(),
        outcome_events: outcome_events.len(),
        outputs,
    })
}

fn at_risk_counts(outcomes: &[EncounterOutcomes], horizon: Horizon) -> [usize; 3] {
    let rebased = rebase(outcomes, horizon);
    OutcomeKind::ALL.map(|kind| risk_set(&rebased, kind).len())
}

// ============================================================================
// Stage 2: Split
// ============================================================================

#[derive(Debug)]
pub struct SplitResult {
    pub input_rows: usize,
    /// Rows dropped by the minimum age filter.
    pub filtered: usize,
    pub outputs: Vec<(String, PathBuf, usize)>,
}

/// Splits a horizon table into `{stem}_train.csv` and `{stem}_test.csv`.
///
/// With `shuffle_only` the table is an external cohort: it is shuffled and
/// written whole as `{stem}_external.csv`.
pub fn run_split(
    input: &Path,
    config: &PipelineConfig,
    output_dir: &Path,
    shuffle_only: bool,
) -> Result<SplitResult> {
    let _span = info_span!("split", input = %input.display(), seed = config.seed).entered();
    let table = read_csv_frame(input).context("read horizon table")?;
    let input_rows = table.height();
    let table = match config.split.min_age {
        Some(min) => filter_min_age(&table, &config.split.age_column, min)
            .context("apply minimum age filter")?,
        None => table,
    };
    let filtered = input_rows - table.height();

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());

    let partitions: Vec<(&str, DataFrame)> = if shuffle_only {
        vec![("external", shuffle_rows(&table, config.seed)?)]
    } else {
        let (train, test) = split_train_test(&table, config.split.train_fraction, config.seed)?;
        vec![("train", train), ("test", test)]
    };

    let mut outputs = Vec::with_capacity(partitions.len());
    for (name, mut frame) in partitions {
        let path = output_dir.join(format!("{stem}_{name}.csv"));
        write_horizon_table(&mut frame, &path)
            .with_context(|| format!("write {}", path.display()))?;
        outputs.push((name.to_string(), path, frame.height()));
    }
    Ok(SplitResult {
        input_rows,
        filtered,
        outputs,
    })
}

// ============================================================================
// Stage 3: Prepare
// ============================================================================

/// Tables for one preparation run.
#[derive(Debug, Clone)]
pub struct PrepareRequest {
    pub horizon: Horizon,
    pub train: PathBuf,
    /// Named held-out partitions in the order they should be prepared.
    pub held_out: Vec<(String, PathBuf)>,
}

impl PrepareRequest {
    fn sources(&self) -> Vec<PathBuf> {
        std::iter::once(self.train.clone())
            .chain(self.held_out.iter().map(|(_, path)| path.clone()))
            .collect()
    }
}

#[derive(Debug)]
pub struct PrepareResult {
    pub bundle: ArtifactBundle,
    pub path: PathBuf,
    /// True when the bundle came from the cache unchanged.
    pub cached: bool,
}

impl PrepareResult {
    pub fn has_failures(&self) -> bool {
        !self.bundle.failures.is_empty()
    }
}

pub fn run_prepare(request: &PrepareRequest, config: &PipelineConfig) -> Result<PrepareResult> {
    let key = CacheKey::new(
        config.cache.cohort_prefix.clone(),
        request.horizon,
        config.outcome,
        config.seed,
    );
    let _span = info_span!("prepare", key = %key).entered();
    let cache = ArtifactCache::new(&config.cache.directory);
    let sources = fingerprint_sources(&request.sources()).context("fingerprint input tables")?;

    let unfit = UnfitPipeline::from_config(config);

    match cache.lookup(&key, &sources, &unfit, config.cache.force) {
        CacheLookup::Hit(bundle) => {
            return Ok(PrepareResult {
                bundle: *bundle,
                path: cache.path_for(&key),
                cached: true,
            });
        }
        CacheLookup::Stale { reason } => info!(%reason, "recomputing stale bundle"),
        CacheLookup::Miss | CacheLookup::Forced => {}
    }

    let train_table = read_csv_frame(&request.train).context("read training table")?;
    let (fitted, train) = unfit.fit(&train_table).context("fit preparation pipeline")?;

    let mut failures = Vec::new();
    let mut tables: Vec<(String, DataFrame)> = Vec::with_capacity(request.held_out.len());
    for (name, path) in &request.held_out {
        match read_csv_frame(path) {
            Ok(frame) => tables.push((name.clone(), frame)),
            Err(err) => {
                warn!(partition = %name, error = %err, "held-out table unreadable");
                failures.push(PartitionFailure {
                    name: name.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    let mut bundle = ArtifactBundle::new(key, fitted, train, sources);
    let results = bundle
        .pipeline
        .apply_all(tables.iter().map(|(name, frame)| (name.as_str(), frame)));
    for (name, result) in results {
        match result {
            Ok(partition) => bundle.held_out.push(partition),
            Err(err) => failures.push(PartitionFailure {
                name,
                message: err.to_string(),
            }),
        }
    }
    bundle.failures = failures;

    let path = cache.store(&bundle).context("store artifact bundle")?;
    Ok(PrepareResult {
        bundle,
        path,
        cached: false,
    })
}
