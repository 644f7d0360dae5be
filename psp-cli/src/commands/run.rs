//! Run an exploration against an external model.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use psp_core::{
    CancellationToken, CsvRecorder, Evaluator, Exploration, ExplorationLoop, OrdinalDiscretizer,
};
use tracing::{info, warn};

use crate::config::{ConfigLoader, ConfigOverrides};
use crate::oracle::{CommandDiscretizer, CommandOracle};

/// Run arguments.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML run file
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Model executable, looked up on PATH
    #[arg(long)]
    pub model: String,

    /// Extra argument passed to the model (repeatable)
    #[arg(long = "model-arg", allow_hyphen_values = true)]
    pub model_args: Vec<String>,

    /// Discretizer executable for continuous responses
    #[arg(long, conflicts_with = "ordinal")]
    pub discretizer: Option<String>,

    /// Extra argument passed to the discretizer (repeatable)
    #[arg(long = "discretizer-arg", allow_hyphen_values = true)]
    pub discretizer_args: Vec<String>,

    /// Discretize continuous responses by pairwise sign
    #[arg(long)]
    pub ordinal: bool,

    /// Directory for the parameter and response streams
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// File name prefix for the recorded streams
    #[arg(long, default_value = "psp")]
    pub prefix: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the exploration and print its result.
pub async fn run(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load(&args.config, &args.overrides)?;

    let model = CommandOracle::resolve(&args.model, args.model_args.clone())
        .with_context(|| format!("Cannot use model {}", args.model))?;
    let mut evaluator = Evaluator::new(model, config.response_len(), config.dimensionality);
    if let Some(name) = &args.discretizer {
        let discretizer = CommandDiscretizer::resolve(name, args.discretizer_args.clone())
            .with_context(|| format!("Cannot use discretizer {name}"))?;
        evaluator = evaluator.with_discretizer(discretizer);
    } else if args.ordinal {
        evaluator = evaluator.with_discretizer(OrdinalDiscretizer);
    }

    let shutdown = CancellationToken::new();
    let mut explorer = ExplorationLoop::new(config, evaluator)?.with_shutdown(shutdown.clone());
    if let Some(dir) = &args.output_dir {
        let recorder = CsvRecorder::create(dir, &args.prefix)
            .with_context(|| format!("Failed to create streams in {}", dir.display()))?;
        explorer = explorer.with_recorder(recorder);
        info!(dir = %dir.display(), prefix = %args.prefix, "Recording iterations");
    }

    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current pass");
            interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || explorer.run())
        .await
        .context("Exploration task panicked")??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &Exploration) {
    if result.region_count() == 0 {
        println!("No regions discovered.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Region").fg(Color::Cyan),
        Cell::new("Population").fg(Color::Cyan),
        Cell::new("Representative").fg(Color::Cyan),
        Cell::new("Pattern").fg(Color::Cyan),
    ]);

    for (index, pattern) in result.patterns.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(result.populations[index]),
            Cell::new(format_point(&result.representatives[index])),
            Cell::new(pattern),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "{} regions, {} samples, {} iterations ({})",
        result.region_count(),
        result.total_population(),
        result.iterations,
        result.termination
    );
}

fn format_point(point: &[f64]) -> String {
    let values: Vec<String> = point.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", values.join(", "))
}
