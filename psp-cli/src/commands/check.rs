use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::{ConfigLoader, ConfigOverrides};

#[derive(Args)]
pub struct CheckArgs {
    /// TOML run file
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let config = ConfigLoader::load(&args.config, &args.overrides)?;
    println!(
        "{} is valid: {} parameters, {} starting point(s)",
        args.config.display(),
        config.dimensions(),
        config.initial_points().len()
    );
    println!();
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}
