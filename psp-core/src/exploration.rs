//! Adaptive exploration loop
//!
//! Drives the `INIT → (SAMPLE → EVALUATE → MATCH → UPDATE)* → TERMINATED`
//! state machine:
//!
//! 1. **Init** evaluates the starting point(s) and seeds the registry
//!    (recorded as iteration 0).
//! 2. Every **pass** draws a fresh sampling stream, jumps around the
//!    representative of each underpopulated region, clamps the candidates
//!    into the parameter box, evaluates them one by one, and matches the
//!    resulting patterns against the registry.
//! 3. The loop **terminates** before a pass when the iteration limit is
//!    reached, when no region is underpopulated, or when cancellation was
//!    requested. Cancellation is never honored mid-pass.
//!
//! Passes are strictly sequential: each pass samples around the
//! representatives left by the previous one.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::bounds::BoundsClamper;
use crate::config::PspConfig;
use crate::error::{PspError, Result};
use crate::matcher::{Candidate, PatternMatcher};
use crate::oracle::{Evaluation, Evaluator};
use crate::recorder::{IterationRecord, NullRecorder, Recorder};
use crate::registry::RegionRegistry;
use crate::result::{Exploration, Termination};
use crate::sampling::{HypersphereSampler, PassSeeder};
use crate::types::ParameterVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Init,
    Running,
    Terminated(Termination),
    Failed,
}

/// Orchestrates one exploration run
pub struct ExplorationLoop {
    config: PspConfig,
    evaluator: Evaluator,
    recorder: Box<dyn Recorder + Send>,
    shutdown: CancellationToken,
    registry: RegionRegistry,
    matcher: PatternMatcher,
    seeder: PassSeeder,
    sampler: HypersphereSampler,
    clamper: BoundsClamper,
    iteration: u32,
    state: LoopState,
}

impl ExplorationLoop {
    /// Validate `config` and prepare a run.
    ///
    /// Fails with a configuration error before the oracle is ever called.
    pub fn new(config: PspConfig, evaluator: Evaluator) -> Result<Self> {
        config.validate()?;

        let seeder = match config.seed {
            Some(seed) => PassSeeder::with_seed(seed),
            None => PassSeeder::from_entropy(),
        };
        let sampler = HypersphereSampler::new(config.radius, config.samples_per_region);
        let clamper = BoundsClamper::new(config.lower_bounds(), config.upper_bounds());

        Ok(Self {
            config,
            evaluator,
            recorder: Box::new(NullRecorder),
            shutdown: CancellationToken::new(),
            registry: RegionRegistry::new(),
            matcher: PatternMatcher::new(),
            seeder,
            sampler,
            clamper,
            iteration: 0,
            state: LoopState::Init,
        })
    }

    /// Persist every evaluated candidate through `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: impl Recorder + Send + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    /// Stop between passes once `shutdown` is cancelled.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &PspConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Passes completed so far.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The termination reason, once the loop has stopped.
    pub fn termination(&self) -> Option<Termination> {
        match self.state {
            LoopState::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    /// Run to termination and assemble the result.
    #[instrument(
        name = "psp::run",
        skip_all,
        fields(dimensions = self.config.dimensions(), radius = self.config.radius)
    )]
    pub fn run(mut self) -> Result<Exploration> {
        while self.step()?.is_none() {}
        self.finish()
    }

    /// Advance the state machine by one pass.
    ///
    /// The first call performs initialization. Returns the termination reason
    /// once the loop has stopped; further calls are no-ops. Any error is
    /// final: later calls return [`PspError::Aborted`] without touching the
    /// oracle or the recorder.
    pub fn step(&mut self) -> Result<Option<Termination>> {
        match self.state {
            LoopState::Terminated(reason) => return Ok(Some(reason)),
            LoopState::Failed => return Err(PspError::Aborted),
            LoopState::Init | LoopState::Running => {}
        }

        self.advance().inspect_err(|err| {
            warn!(iteration = self.iteration, error = %err, "Exploration aborted");
            self.state = LoopState::Failed;
        })
    }

    fn advance(&mut self) -> Result<Option<Termination>> {
        if self.state == LoopState::Init {
            self.initialize()?;
        }

        if let Some(reason) = self.stop_reason() {
            self.recorder.flush()?;
            self.state = LoopState::Terminated(reason);
            info!(
                iterations = self.iteration,
                regions = self.registry.len(),
                %reason,
                "Exploration terminated"
            );
            return Ok(Some(reason));
        }

        self.pass()?;
        Ok(None)
    }

    /// Freeze the registry and assemble the result.
    ///
    /// A loop that has not terminated yet is treated as cancelled.
    pub fn finish(mut self) -> Result<Exploration> {
        if self.state == LoopState::Failed {
            return Err(PspError::Aborted);
        }
        self.recorder.flush()?;
        let termination = self.termination().unwrap_or(Termination::Cancelled);
        Ok(Exploration::assemble(
            self.registry,
            self.iteration,
            termination,
        ))
    }

    fn initialize(&mut self) -> Result<()> {
        self.recorder.write_headers(
            &self.config.parameter_labels(),
            &self.config.response_labels(),
        )?;

        let points = self.config.initial_points();
        let evaluated = self.evaluate_all(points)?;
        self.apply(evaluated)?;

        debug!(regions = self.registry.len(), "Registry seeded");
        self.state = LoopState::Running;
        Ok(())
    }

    fn stop_reason(&self) -> Option<Termination> {
        if self
            .config
            .iterations
            .is_some_and(|limit| self.iteration >= limit)
        {
            return Some(Termination::IterationLimit);
        }
        if self.registry.underpopulated(self.config.population).is_empty() {
            return Some(Termination::PopulationReached);
        }
        if self.shutdown.is_cancelled() {
            return Some(Termination::Cancelled);
        }
        None
    }

    fn pass(&mut self) -> Result<()> {
        let (seed, mut rng) = self.seeder.next_pass();
        let targets = self.registry.underpopulated(self.config.population);
        self.iteration += 1;
        debug!(
            iteration = self.iteration,
            seed,
            targets = targets.len(),
            "Starting pass"
        );

        let mut points = Vec::with_capacity(targets.len() * self.sampler.count());
        for id in targets {
            let Some(region) = self.registry.get(id) else {
                continue;
            };
            let mut sampled = self.sampler.sample(&mut rng, region.representative());
            self.clamper.clamp(&mut sampled);
            points.extend(sampled.rows().into_iter().map(|row| row.to_owned()));
        }

        let evaluated = self.evaluate_all(points)?;
        self.apply(evaluated)?;
        self.recorder.flush()?;

        let iteration = self.iteration;
        let regions = self.registry.len();
        let underpopulated = self.registry.underpopulated(self.config.population).len();
        if self.config.quiet {
            debug!(iteration, regions, underpopulated, "Iteration complete");
        } else {
            info!(iteration, regions, underpopulated, "Iteration complete");
        }
        Ok(())
    }

    /// Evaluate every point in generation order, aborting on the first failure.
    fn evaluate_all(
        &mut self,
        points: Vec<ParameterVector>,
    ) -> Result<Vec<(ParameterVector, Evaluation)>> {
        let iteration = self.iteration;
        points
            .into_iter()
            .enumerate()
            .map(|(candidate, point)| match self.evaluator.evaluate(&point) {
                Ok(evaluation) => Ok((point, evaluation)),
                Err(source) => Err(PspError::oracle(iteration, candidate, &point, source)),
            })
            .collect()
    }

    /// Match evaluated candidates against the registry and record them.
    fn apply(&mut self, evaluated: Vec<(ParameterVector, Evaluation)>) -> Result<()> {
        let mut pending = Vec::with_capacity(evaluated.len());
        let mut candidates = Vec::with_capacity(evaluated.len());
        for (point, evaluation) in evaluated {
            candidates.push(Candidate::new(point.clone(), evaluation.pattern));
            pending.push((point, evaluation.response));
        }

        let outcomes = self.matcher.apply(&mut self.registry, candidates);
        for ((point, response), outcome) in pending.into_iter().zip(outcomes) {
            self.recorder.record(&IterationRecord {
                iteration: self.iteration,
                point,
                response,
                region: outcome.region,
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExplorationLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationLoop")
            .field("iteration", &self.iteration)
            .field("regions", &self.registry.len())
            .field("state", &self.state)
            .finish()
    }
}
