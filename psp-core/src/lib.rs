//! psp-core - Parameter-space partitioning
//!
//! Maps the parameter space of a model into regions, one per qualitatively
//! distinct ordinal pattern the model can produce. Exploration starts at one or
//! more initial points and repeatedly jumps around the representative of every
//! region that still needs samples, discovering new patterns as it goes.
//!
//! The model is an opaque oracle (see [`ModelOracle`]); a run is described by a
//! [`PspConfig`] and driven by an [`ExplorationLoop`].

pub mod bounds;
pub mod config;
pub mod error;
pub mod exploration;
pub mod matcher;
pub mod oracle;
pub mod recorder;
pub mod registry;
pub mod result;
pub mod sampling;
pub mod types;

pub use bounds::BoundsClamper;
pub use config::{InitialPoints, PspConfig};
pub use error::{ConfigError, OracleError, PspError, Result};
pub use exploration::ExplorationLoop;
pub use matcher::{Candidate, MatchKind, MatchOutcome, PatternMatcher};
pub use oracle::{
    Discretizer, Evaluation, Evaluator, ModelOracle, OrdinalDiscretizer, Response, discretizer_fn,
    model_fn,
};
pub use recorder::{CsvRecorder, IterationRecord, NullRecorder, Recorder, stream_paths};
pub use registry::RegionRegistry;
pub use result::{Exploration, Termination};
pub use sampling::{HypersphereSampler, PassSeeder};
pub use types::*;

// Cancellation handle accepted by `ExplorationLoop::with_shutdown`
pub use tokio_util::sync::CancellationToken;
