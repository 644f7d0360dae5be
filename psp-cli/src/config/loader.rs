use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use psp_core::PspConfig;

/// Command-line values that take precedence over the run file
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Maximum number of loop passes
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Samples each region needs before it stops being explored
    #[arg(long)]
    pub population: Option<u32>,

    /// Master seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Suppress per-iteration progress
    #[arg(short, long)]
    pub quiet: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a run file, apply overrides and validate the result
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<PspConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file {}", path.display()))?;
        let config = PspConfig::from_toml(&contents)
            .with_context(|| format!("Invalid run file {}", path.display()))?;

        let config = Self::apply(config, overrides);
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Overlay values override the file only if explicitly set
    fn apply(mut config: PspConfig, overrides: &ConfigOverrides) -> PspConfig {
        config.iterations = overrides.iterations.or(config.iterations);
        config.population = overrides.population.or(config.population);
        config.seed = overrides.seed.or(config.seed);
        config.quiet = overrides.quiet || config.quiet;
        config
    }
}
