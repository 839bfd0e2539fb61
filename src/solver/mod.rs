//! Simulation control
//!
//! This module turns the kinetics into a running simulation: it decides how
//! long each iteration lasts, keeps the clock, integrates the bulk liquid,
//! decides when to stop, and drives the external collaborators through the
//! iteration in a fixed order.
//!
//! # Core Concepts
//!
//! ## The Architecture (WHAT vs HOW)
//!
//! 1. **Scenario** ([`Scenario`]) - WHAT is simulated
//!    - Solutes with bulk concentrations, particulates
//!    - Reactions and net reactions
//!    - Reactor geometry, time-step policy, stopping criteria, seed
//!
//! 2. **Collaborators** ([`ParticleMechanics`], [`FieldSolver`]) - HOW space is handled
//!    - Particle growth, death, division, shoving, detachment
//!    - Reaction-diffusion of the solute fields
//!
//! 3. **Orchestrator** ([`Simulation`]) - WHEN things happen
//!    - Resets the global rates
//!    - Resolves the time step
//!    - Calls the collaborators in order and commits the clock
//!
//! # Module Organization
//!
//! - **`timestep`**: [`TimeStepConstraint`], [`TimeStepPolicy`], [`TimeStepResolver`]
//! - **`clock`**: [`SimulationClock`]
//! - **`boundary`**: [`BoundaryConditions`] with planar and granule variants
//! - **`bulk`**: [`BulkConcentration`] integrator and stability bound
//! - **`termination`**: [`TerminationCriteria`], [`TerminationEvaluator`]
//! - **`scenario`**: species definitions, [`ReactorGeometry`], [`ScenarioBuilder`]
//! - **`traits`**: collaborator contracts
//! - **`simulation`**: the orchestrator
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │ ScenarioBuilder │  (species, reactions, policy, criteria)
//! └────────┬────────┘
//!          │ build() validates everything
//! ┌────────▼────────┐   ┌───────────────────┐
//! │ Scenario        │   │ ParticleMechanics │
//! └────────┬────────┘   │ FieldSolver       │
//!          │            └─────────┬─────────┘
//! ┌────────▼──────────────────────▼─┐
//! │ Simulation                      │
//! │  reset → resolve → grow → commit│ ← one iteration
//! │  spread → detach → solutes      │
//! └────────┬────────────────────────┘
//!          │ should_stop()
//! ┌────────▼────────┐
//! │ Clock + series  │ ← read by external writers
//! └─────────────────┘
//! ```
//!
//! # Time Step Selection
//!
//! In adaptive mode the step is the smallest of the particle doubling
//! time, the global size-change bound and every solute's bulk stability
//! bound. It is then aligned to the compulsory output interval (if any)
//! and clamped to the configured maximum and minimum. An infinite step
//! means nothing limits growth, which is reported as
//! [`ModelError::Starvation`](crate::error::ModelError::Starvation).
//!
//! # Error Handling
//!
//! All operations return [`crate::error::Result`]. Configuration is
//! validated before the first iteration; errors during an iteration are
//! fatal for the run and carry the phase that failed.

// =================================================================================================
// Module Declarations
// =================================================================================================
mod timestep;
mod clock;
mod boundary;
mod bulk;
mod termination;
mod scenario;
mod traits;
mod simulation;

// =================================================================================================
// Parallel Execution Threshold
// =================================================================================================
//
// Deciding when per-cell rate evaluation is handed to Rayon is an execution
// concern of the solver, not of the kinetics. The threshold is an
// AtomicUsize so benchmarks and tests can change it at runtime. Relaxed
// ordering: the value is a performance hint, not a synchronisation point.
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default number of active cells above which source terms are evaluated
/// in parallel.
///
/// Below roughly a thousand cells Rayon's dispatch costs more than the
/// rate evaluations it spreads.
const DEFAULT_PARALLEL_THRESHOLD: usize = 999;

/// Runtime-configurable parallel-execution threshold.
///
/// Read via [`parallel_threshold()`], written via [`set_parallel_threshold()`].
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Return the current parallel-execution threshold.
///
/// [`SourceTermEvaluator`](crate::kinetics::SourceTermEvaluator) evaluates
/// cells sequentially below this count and with Rayon above it, when the
/// crate is compiled with the `parallel` feature.
///
/// # Example
///
/// ```rust
/// use biofilm_rs::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel-execution threshold to a new value.
///
/// # Panics
///
/// Panics when `threshold == 0`.
///
/// # Example
///
/// ```rust
/// use biofilm_rs::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = parallel_threshold();
/// set_parallel_threshold(2048);
/// assert_eq!(parallel_threshold(), 2048);
///
/// // Restore so other tests are not affected.
/// set_parallel_threshold(previous);
/// ```
pub fn set_parallel_threshold(threshold: usize) {
    assert!(threshold > 0, "parallel threshold must be at least 1");
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

/// RAII guard that saves the current threshold on construction and restores
/// it on drop.
///
/// Only compiled in test builds.
///
/// ```rust,ignore
/// let _guard = crate::solver::ThresholdGuard::save(50);
/// // threshold is now 50 …
/// // … and is automatically restored when _guard is dropped.
/// ```
#[cfg(test)]
pub(crate) struct ThresholdGuard {
    previous: usize,
}

#[cfg(test)]
impl ThresholdGuard {
    /// Set the threshold to `new_value` and return a guard that will
    /// restore the previous value on drop.
    pub(crate) fn save(new_value: usize) -> Self {
        let previous = parallel_threshold();
        set_parallel_threshold(new_value);
        Self { previous }
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        PARALLEL_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use timestep::{
    clamp_maximum,
    clamp_minimum,
    snap_to_compulsory,
    ConstraintSource,
    ResolvedStep,
    TimeStepConstraint,
    TimeStepMode,
    TimeStepPolicy,
    TimeStepResolver,
    COMPULSORY_LABEL,
    COMPULSORY_PRECISION,
    FIXED_LABEL,
    MAXIMUM_LABEL,
    MINIMUM_LABEL,
};

pub use clock::{SimulationClock, ITERATION_PARAMETERS_HEADER};
pub use boundary::{BoundaryConditions, CarrierCondition, GranuleBoundaries, PlanarBoundaries};
pub use bulk::{BulkConcentration, DEFAULT_MAX_FRACTION, DEFAULT_PRECISION};
pub use termination::{ConsumptionCriterion, TerminationCriteria, TerminationEvaluator, TerminationSnapshot};
pub use scenario::{ParticulateSpecies, ReactorGeometry, Scenario, ScenarioBuilder, SoluteSpecies};
pub use traits::{FieldSolver, FieldUpdate, KineticsContext, ParticleMechanics};
pub use simulation::{IterationPhase, Simulation};

// =================================================================================================
// Tests
// =================================================================================================
