//! Iteration orchestrator
//!
//! [`Simulation`] owns the scenario, the clock and the two collaborators
//! and drives them through the growth cycle:
//!
//! ```text
//! ResetRates → ResolveTimeStep → Shuffle → Grow → Death → Division → CommitClock
//! ```
//!
//! [`Simulation::advance_phase`] performs exactly one transition per call;
//! [`Simulation::perform_growth_and_division`] runs the cycle to the commit.
//! Spreading, detachment and the solute update are separate phases invoked
//! by [`Simulation::perform_full_iteration`] after the cycle.
//!
//! # Errors
//!
//! A failing phase aborts the iteration. Collaborator and integrator errors
//! are wrapped in [`ModelError::PhaseFailed`] with the phase that produced
//! them, except [`ModelError::Starvation`], which is returned as is.
//! Nothing is retried.

use std::fmt;

use crate::error::{ModelError, Result};
use crate::random::RandomStream;
use crate::solver::{
    ConstraintSource,
    FieldSolver,
    FieldUpdate,
    KineticsContext,
    ParticleMechanics,
    ReactorGeometry,
    ResolvedStep,
    Scenario,
    SimulationClock,
    TerminationEvaluator,
    TerminationSnapshot,
    TimeStepConstraint,
    TimeStepResolver,
};

// =================================================================================================
// Phases
// =================================================================================================

/// Phase of the simulation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterationPhase {
    Initialize,
    ResetRates,
    ResolveTimeStep,
    Shuffle,
    Grow,
    Death,
    Division,
    CommitClock,
    Spread,
    Detach,
    UpdateSolutes,
}

impl IterationPhase {
    /// Successor in the growth cycle (`None` outside the cycle)
    pub fn next_in_cycle(self) -> Option<IterationPhase> {
        use IterationPhase::*;
        match self {
            ResetRates => Some(ResolveTimeStep),
            ResolveTimeStep => Some(Shuffle),
            Shuffle => Some(Grow),
            Grow => Some(Death),
            Death => Some(Division),
            Division => Some(CommitClock),
            CommitClock => Some(ResetRates),
            Initialize | Spread | Detach | UpdateSolutes => None,
        }
    }
}

impl fmt::Display for IterationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IterationPhase::Initialize => "initialize",
            IterationPhase::ResetRates => "reset rates",
            IterationPhase::ResolveTimeStep => "resolve time step",
            IterationPhase::Shuffle => "shuffle",
            IterationPhase::Grow => "grow",
            IterationPhase::Death => "remove dead biomass",
            IterationPhase::Division => "divide and excrete",
            IterationPhase::CommitClock => "commit clock",
            IterationPhase::Spread => "spread",
            IterationPhase::Detach => "detach",
            IterationPhase::UpdateSolutes => "update solutes",
        };
        f.write_str(name)
    }
}

/// Attach the phase to a failure, leaving starvation untouched
fn in_phase<T>(phase: IterationPhase, result: Result<T>) -> Result<T> {
    result.map_err(|error| {
        if error.is_starvation() {
            error
        } else {
            ModelError::PhaseFailed {
                phase,
                source: Box::new(error),
            }
        }
    })
}

// =================================================================================================
// Constraint adapter
// =================================================================================================

/// Feeds the resolver from the particle collaborator and the solutes
struct IterationConstraints<'a, P: ParticleMechanics> {
    particles: &'a mut P,
    kinetics: KineticsContext<'a>,
    geometry: &'a ReactorGeometry,
}

impl<P: ParticleMechanics> ConstraintSource for IterationConstraints<'_, P> {
    fn particle_doubling(&mut self) -> Result<TimeStepConstraint> {
        self.particles.particle_doubling_time_constraint(self.kinetics)
    }

    fn global_size_change(&mut self) -> Result<TimeStepConstraint> {
        self.particles.global_size_change_constraint(self.kinetics)
    }

    fn solute_constraints(&mut self) -> Result<Vec<TimeStepConstraint>> {
        Ok(self
            .kinetics
            .solutes
            .iter()
            .map(|solute| solute.stability_constraint(self.geometry))
            .collect())
    }
}

// =================================================================================================
// Simulation
// =================================================================================================

/// The iteration orchestrator
///
/// Single threaded: one iteration completes before the next begins.
pub struct Simulation<P: ParticleMechanics, F: FieldSolver> {
    scenario: Scenario,
    particles: P,
    field_solver: F,
    resolver: TimeStepResolver,
    clock: SimulationClock,
    termination: TerminationEvaluator,
    random: RandomStream,
    cycle_phase: Option<IterationPhase>,
    pending_step: Option<ResolvedStep>,
    initialized: bool,
}

impl<P: ParticleMechanics, F: FieldSolver> Simulation<P, F> {
    /// Assemble a simulation from a built scenario and its collaborators
    pub fn new(scenario: Scenario, particles: P, field_solver: F) -> Result<Self> {
        let resolver = TimeStepResolver::new(scenario.policy.clone())?;
        let termination = TerminationEvaluator::new(scenario.termination.clone())?;
        let clock = SimulationClock::starting_at(scenario.start_time)?;
        let random = RandomStream::new(scenario.seed);

        log::debug!(
            "Simulation assembled with {} (seed {}, start time {})",
            field_solver.name(),
            scenario.seed,
            scenario.start_time
        );

        Ok(Self {
            scenario,
            particles,
            field_solver,
            resolver,
            clock,
            termination,
            random,
            cycle_phase: None,
            pending_step: None,
            initialized: false,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------------------------------

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn particles(&self) -> &P {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut P {
        &mut self.particles
    }

    pub fn field_solver(&self) -> &F {
        &self.field_solver
    }

    pub fn termination(&self) -> &TerminationEvaluator {
        &self.termination
    }

    /// Run-wide random stream (placement, inoculation)
    pub fn random_mut(&mut self) -> &mut RandomStream {
        &mut self.random
    }

    /// Last completed phase of the growth cycle
    pub fn phase(&self) -> Option<IterationPhase> {
        self.cycle_phase
    }

    /// Whether an external writer should persist the last iteration
    pub fn is_output_eligible(&self) -> bool {
        self.clock.output_eligible()
    }

    /// True once the fields were solved for the initial state
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn kinetics(scenario: &Scenario) -> KineticsContext<'_> {
        KineticsContext {
            reactions: &scenario.reactions,
            solutes: &scenario.solutes,
            particulates: &scenario.particulates,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Initialization
    // ---------------------------------------------------------------------------------------------

    /// Solve the fields for the initial biomass and record the first rates
    pub fn initialize(&mut self) -> Result<()> {
        in_phase(IterationPhase::Initialize, self.solve_and_record())?;
        self.initialized = true;

        log::info!(
            "Simulation initialized at time {} with {} solutes",
            self.clock.time(),
            self.scenario.solutes.len()
        );
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Growth cycle
    // ---------------------------------------------------------------------------------------------

    /// Perform the next transition of the growth cycle and return it
    pub fn advance_phase(&mut self) -> Result<IterationPhase> {
        let phase = self
            .cycle_phase
            .and_then(IterationPhase::next_in_cycle)
            .unwrap_or(IterationPhase::ResetRates);

        match phase {
            IterationPhase::ResetRates => {
                self.scenario.reactions.reset_global_rates();
            }
            IterationPhase::ResolveTimeStep => {
                let mut source = IterationConstraints {
                    particles: &mut self.particles,
                    kinetics: Self::kinetics(&self.scenario),
                    geometry: &self.scenario.geometry,
                };
                let step = in_phase(phase, self.resolver.resolve(&self.clock, &mut source))?;
                self.pending_step = Some(step);
            }
            IterationPhase::Shuffle => {
                in_phase(phase, self.particles.shuffle(&mut self.random))?;
            }
            IterationPhase::Grow => {
                let dt = self.pending_value(phase)?;
                in_phase(phase, self.particles.grow(dt, Self::kinetics(&self.scenario)))?;
            }
            IterationPhase::Death => {
                in_phase(phase, self.particles.remove_dead_biomass())?;
            }
            IterationPhase::Division => {
                in_phase(phase, self.particles.divide_and_excrete(&mut self.random))?;
            }
            IterationPhase::CommitClock => {
                let step = self.pending_step.take().ok_or_else(|| Self::missing_step(phase))?;
                in_phase(phase, self.clock.commit(step))?;
                log::debug!("{}", self.clock.iteration_parameters());
            }
            other => {
                return Err(ModelError::invalid(format!("{other} is not part of the growth cycle")));
            }
        }

        self.cycle_phase = Some(phase);
        Ok(phase)
    }

    /// Run the growth cycle up to and including the clock commit
    ///
    /// Returns the step that was applied.
    pub fn perform_growth_and_division(&mut self) -> Result<f64> {
        while self.advance_phase()? != IterationPhase::CommitClock {}
        Ok(self.clock.time_step())
    }

    fn pending_value(&self, phase: IterationPhase) -> Result<f64> {
        self.pending_step
            .as_ref()
            .map(ResolvedStep::value)
            .ok_or_else(|| Self::missing_step(phase))
    }

    fn missing_step(phase: IterationPhase) -> ModelError {
        ModelError::invalid(format!("phase {phase} reached without a resolved time step"))
    }

    // ---------------------------------------------------------------------------------------------
    // Independent phases
    // ---------------------------------------------------------------------------------------------

    /// Relax particle overlaps
    pub fn spread(&mut self) -> Result<()> {
        in_phase(IterationPhase::Spread, self.particles.spread())
    }

    /// Erode biomass over the last step
    pub fn detach(&mut self) -> Result<()> {
        let dt = self.clock.time_step();
        in_phase(IterationPhase::Detach, self.particles.detach(dt))
    }

    /// Advance bulk values over the last step, solve the fields and record rates
    pub fn update_solute_concentrations(&mut self) -> Result<()> {
        let phase = IterationPhase::UpdateSolutes;
        let dt = self.clock.time_step();

        let Scenario { reactions, solutes, geometry, .. } = &mut self.scenario;
        for solute in solutes.iter_mut() {
            let value = in_phase(phase, solute.advance_bulk(dt, geometry))?;
            reactions.update_flux_bulk(solute.id(), value);
        }

        in_phase(phase, self.solve_and_record())
    }

    fn solve_and_record(&mut self) -> Result<()> {
        let Scenario { reactions, solutes, particulates, .. } = &mut self.scenario;

        self.field_solver.solve(FieldUpdate {
            reactions: &mut *reactions,
            solutes: solutes.as_slice(),
            particulates: particulates.as_slice(),
            particles: &self.particles,
        })?;

        for solute in solutes.iter_mut() {
            solute.record_rate(reactions)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Driving
    // ---------------------------------------------------------------------------------------------

    /// Growth cycle, spreading, detachment, then the solute update
    pub fn perform_full_iteration(&mut self) -> Result<f64> {
        let dt = self.perform_growth_and_division()?;
        self.spread()?;
        self.detach()?;
        self.update_solute_concentrations()?;
        Ok(dt)
    }

    /// Evaluate the stopping criteria against the current state
    ///
    /// Advances the consumption accumulator when one is configured.
    pub fn should_stop(&mut self) -> bool {
        let snapshot = TerminationSnapshot {
            time: self.clock.time(),
            biovolume: self.particles.current_biovolume(),
            height: self.particles.current_height(),
            consumption_rate: self.scenario.consumption_solute().map(|s| s.latest_rate()),
        };
        self.termination.should_stop(&snapshot)
    }

    /// Stop before the next iteration
    pub fn request_stop(&mut self) {
        self.termination.request_stop();
    }

    /// Iterate until a stopping criterion holds
    ///
    /// Initializes first when needed. Returns the number of iterations performed.
    pub fn run(&mut self) -> Result<u64> {
        if !self.initialized {
            self.initialize()?;
        }

        let first = self.clock.iteration();
        log::info!("Run started at time {} (iteration {first})", self.clock.time());

        while !self.should_stop() {
            self.perform_full_iteration()?;
        }

        let performed = self.clock.iteration() - first;
        log::info!(
            "Run finished at time {} after {performed} iterations",
            self.clock.time()
        );
        Ok(performed)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
