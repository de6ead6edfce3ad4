use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use horizon_cli::pipeline::{
    ExtractInputs, ExtractResult, PrepareRequest, PrepareResult, SplitResult, run_extract,
    run_prepare, run_split,
};
use horizon_model::{Horizon, ImputeStrategy, PipelineConfig};

use crate::cli::{ConfigArgs, ExtractArgs, ImputerArg, PrepareArgs, SplitArgs};

/// Loads the config file (or defaults) and applies the shared overrides.
fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(prefix) = &args.prefix {
        config.cache.cohort_prefix = prefix.clone();
    }
    Ok(config)
}

fn finish_config(config: PipelineConfig) -> Result<PipelineConfig> {
    config.validate().context("invalid configuration")?;
    debug!(
        seed = config.seed,
        outcome = %config.outcome,
        prefix = %config.cache.cohort_prefix,
        "resolved configuration"
    );
    Ok(config)
}

pub fn run_extract_command(args: &ExtractArgs) -> Result<ExtractResult> {
    let mut config = load_config(&args.config)?;
    if !args.horizons.is_empty() {
        config.extraction.horizons = args.horizons.iter().copied().map(Horizon).collect();
    }
    let config = finish_config(config)?;
    let inputs = ExtractInputs {
        wide: args.wide.clone(),
        encounters: args.encounters.clone(),
        events: args.events.clone(),
    };
    run_extract(&inputs, &config, &args.output_dir)
}

pub fn run_split_command(args: &SplitArgs) -> Result<SplitResult> {
    let mut config = load_config(&args.config)?;
    if let Some(fraction) = args.train_fraction {
        config.split.train_fraction = fraction;
    }
    if args.min_age.is_some() {
        config.split.min_age = args.min_age;
    }
    let config = finish_config(config)?;
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| args.input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    run_split(&args.input, &config, &output_dir, args.external)
}

pub fn run_prepare_command(args: &PrepareArgs) -> Result<PrepareResult> {
    let mut config = load_config(&args.config)?;
    if let Some(outcome) = args.outcome {
        config.outcome = outcome;
    }
    if let Some(imputer) = args.imputer {
        config.preparation.imputer = match imputer {
            ImputerArg::Median => ImputeStrategy::Median,
            ImputerArg::Mean => ImputeStrategy::Mean,
            ImputerArg::HotDeck => ImputeStrategy::HotDeck,
        };
    }
    if let Some(dir) = &args.cache_dir {
        config.cache.directory = dir.clone();
    }
    config.cache.force |= args.force;
    let config = finish_config(config)?;

    let request = PrepareRequest {
        horizon: Horizon(args.horizon),
        train: args.train.clone(),
        held_out: args.held_out.clone(),
    };
    let result = run_prepare(&request, &config)?;
    info!(
        path = %result.path.display(),
        cached = result.cached,
        failures = result.bundle.failures.len(),
        "preparation finished"
    );
    Ok(result)
}
