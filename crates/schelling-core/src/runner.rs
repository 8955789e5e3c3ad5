//! Simulation Runner
//!
//! Drives the iterate-until-equilibrium loop. The runner owns the topology
//! exclusively; occupancy changes only between evaluation passes.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use schelling_events::{History, RunStats, RunStatus, Snapshot};

use crate::components::{AgentPool, Topology};
use crate::config::RunConfig;
use crate::error::{ConfigError, EngineError};
use crate::moves::{self, MoveEngine, MoveRule};
use crate::output::summarize;
use crate::utility::UtilityModel;

/// Cooperative cancellation flag, checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub history: History,
    pub stats: RunStats,
}

impl RunReport {
    pub fn status(&self) -> Option<RunStatus> {
        self.history.status()
    }
}

pub struct SimulationRunner {
    topology: Topology,
    pool: AgentPool,
    model: Arc<dyn UtilityModel>,
    config: RunConfig,
    engine: MoveEngine,
    rng: SmallRng,
    history: History,
    iteration: u64,
    data: Option<Arc<dyn Any + Send + Sync>>,
    cancel: CancelToken,
    initial_utilities: Option<Vec<f64>>,
    failure: Option<EngineError>,
}

impl SimulationRunner {
    /// Validates the inputs and records the initial snapshot.
    ///
    /// Every agent must be placed, every placed agent must be in the pool,
    /// and every happiness threshold must lie in the model's score range.
    pub fn new(
        topology: Topology,
        pool: AgentPool,
        model: Arc<dyn UtilityModel>,
        config: RunConfig,
    ) -> Result<Self, ConfigError> {
        topology.check_pool(&pool)?;
        let range = model.range();
        for agent in pool.iter() {
            let threshold = agent.happiness_threshold();
            if threshold.is_nan() {
                return Err(ConfigError::InvalidThreshold(agent.id()));
            }
            if !range.contains(threshold) {
                return Err(ConfigError::ThresholdOutOfRange {
                    agent: agent.id(),
                    threshold,
                    lo: range.lo,
                    hi: range.hi,
                });
            }
        }

        let history = History::new(Snapshot::initial(topology.placement()));
        Ok(Self {
            engine: MoveEngine::new(config.rule, config.evaluation),
            rng: SmallRng::seed_from_u64(config.seed),
            topology,
            pool,
            model,
            config,
            history,
            iteration: 0,
            data: None,
            cancel: CancelToken::new(),
            initial_utilities: None,
            failure: None,
        })
    }

    /// Auxiliary data handed to the utility model on every evaluation.
    pub fn with_context_data(mut self, data: Arc<dyn Any + Send + Sync>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Current utility of every agent, in ascending id order.
    pub fn utilities(&self) -> Result<Vec<f64>, EngineError> {
        self.engine
            .utilities(&self.topology, &self.pool, self.model.as_ref(), self.data.as_deref())
    }

    fn finish(&mut self, status: RunStatus) -> RunStatus {
        match status {
            RunStatus::Equilibrium => {
                tracing::info!("Equilibrium reached at iteration {}", self.iteration)
            }
            RunStatus::IterationBudgetExhausted => tracing::warn!(
                "Iteration budget of {} exhausted without equilibrium",
                self.config.max_iterations
            ),
            RunStatus::Cancelled => tracing::warn!("Run cancelled after iteration {}", self.iteration),
        }
        self.history.finish(status);
        status
    }

    /// Runs one iteration.
    ///
    /// Returns the terminal status once the run has ended; further calls
    /// keep returning it without doing any work. An error aborts the run:
    /// moves applied before it are recorded, and every later call returns
    /// the same error.
    pub fn step(&mut self) -> Result<Option<RunStatus>, EngineError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let result = self.advance();
        if let Err(err) = &result {
            tracing::error!("Run aborted at iteration {}: {}", self.iteration, err);
            self.failure = Some(err.clone());
        }
        result
    }

    pub fn failure(&self) -> Option<&EngineError> {
        self.failure.as_ref()
    }

    fn advance(&mut self) -> Result<Option<RunStatus>, EngineError> {
        if let Some(status) = self.history.status() {
            return Ok(Some(status));
        }
        if self.cancel.is_cancelled() {
            return Ok(Some(self.finish(RunStatus::Cancelled)));
        }
        if self.initial_utilities.is_none() {
            self.initial_utilities = Some(self.utilities()?);
        }

        if self.iteration >= self.config.max_iterations {
            // One more search tells a settled state apart from a cut-off one
            let status = if self.search()?.is_some() {
                RunStatus::IterationBudgetExhausted
            } else {
                RunStatus::Equilibrium
            };
            return Ok(Some(self.finish(status)));
        }

        let mut applied = Vec::new();
        let mut failure = None;
        for _ in 0..self.config.moves_per_iteration.max(1) {
            let mv = match self.search() {
                Ok(Some(mv)) => mv,
                Ok(None) => break,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            if let Err(err) = moves::apply(&mut self.topology, &self.pool, &mv) {
                failure = Some(err.into());
                break;
            }
            tracing::debug!("Iteration {}: {}", self.iteration + 1, mv);
            applied.push(mv);
        }

        let placement = self.topology.placement();
        if !applied.is_empty() || placement != self.history.last().placement {
            self.iteration += 1;
            self.history.push(Snapshot::new(self.iteration, placement, applied));
        } else if failure.is_none() {
            return Ok(Some(self.finish(RunStatus::Equilibrium)));
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    fn search(&mut self) -> Result<Option<schelling_events::Move>, EngineError> {
        self.engine.next_move(
            &self.topology,
            &self.pool,
            self.model.as_ref(),
            self.data.as_deref(),
            &mut self.rng,
        )
    }

    /// Steps until the run ends and returns its history and statistics.
    pub fn run(mut self) -> Result<RunReport, EngineError> {
        tracing::info!(
            "Starting run: rule={}, seed={}, max_iterations={}, agents={}",
            self.config.rule,
            self.config.seed,
            self.config.max_iterations,
            self.pool.len()
        );

        let status = loop {
            if let Some(status) = self.step()? {
                break status;
            }
        };

        let last = self.utilities()?;
        let initial = self.initial_utilities.take().unwrap_or_else(|| last.clone());
        let stats = summarize(&self.history, &self.pool, &initial, &last);
        tracing::info!(
            "Run finished: {} after {} iterations ({} moves)",
            status,
            stats.iterations,
            stats.total_moves()
        );

        Ok(RunReport {
            history: self.history,
            stats,
        })
    }
}

/// Runs a simulation to completion with default evaluation settings.
pub fn run(
    topology: Topology,
    pool: AgentPool,
    model: Arc<dyn UtilityModel>,
    rule: MoveRule,
    max_iterations: u64,
    seed: u64,
) -> Result<RunReport, EngineError> {
    let config = RunConfig::new(rule, max_iterations, seed);
    SimulationRunner::new(topology, pool, model, config)?.run()
}
