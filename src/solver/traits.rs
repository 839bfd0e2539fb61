//! Collaborator contracts
//!
//! # Design Philosophy
//!
//! The kernel schedules an iteration; it does not move particles or solve
//! diffusion. Those jobs belong to two collaborators plugged into the
//! [`Simulation`](crate::solver::Simulation):
//!
//! - [`ParticleMechanics`]: the particle container (growth, death,
//!   division, shoving, detachment) and the biomass-derived constraints
//! - [`FieldSolver`]: the reaction-diffusion solver that brings every
//!   solute field to its new state and fills the reactions' global-rate
//!   accumulators
//!
//! Both receive the kinetics read-only through a [`KineticsContext`], so
//! they evaluate rates with the same reactions the kernel integrates.
//!
//! # Contracts
//!
//! - Constraint queries return values `> 0` or `+∞`; anything else is
//!   rejected by the resolver
//! - `FieldSolver::solve` must leave each reaction's global rate equal to
//!   the integral of its local rate over the non-carrier interior
//!   (see [`SourceTermEvaluator::accumulate_global_rates`](crate::kinetics::SourceTermEvaluator::accumulate_global_rates))
//! - Errors returned by collaborators are reported by the kernel wrapped
//!   in [`ModelError::PhaseFailed`](crate::error::ModelError::PhaseFailed)

use crate::error::Result;
use crate::kinetics::ReactionRegistry;
use crate::physics::FieldSet;
use crate::random::RandomStream;
use crate::solver::{ParticulateSpecies, SoluteSpecies, TimeStepConstraint};

// =================================================================================================
// Shared views
// =================================================================================================

/// Read-only view of the kinetics handed to collaborators
#[derive(Debug, Clone, Copy)]
pub struct KineticsContext<'a> {
    pub reactions: &'a ReactionRegistry,
    pub solutes: &'a [SoluteSpecies],
    pub particulates: &'a [ParticulateSpecies],
}

/// Input of one field update
///
/// The reactions are mutable so the solver can accumulate global rates.
pub struct FieldUpdate<'a> {
    pub reactions: &'a mut ReactionRegistry,
    pub solutes: &'a [SoluteSpecies],
    pub particulates: &'a [ParticulateSpecies],
    pub particles: &'a dyn ParticleMechanics,
}

// =================================================================================================
// Particle mechanics
// =================================================================================================

/// The particle container driven by the kernel
///
/// Calls arrive in iteration order: constraints, `shuffle`, `grow`,
/// `remove_dead_biomass`, `divide_and_excrete`, then `spread` and `detach`.
pub trait ParticleMechanics {
    /// Shortest time for any particle to double its mass
    fn particle_doubling_time_constraint(&mut self, kinetics: KineticsContext<'_>) -> Result<TimeStepConstraint>;

    /// Bound keeping the relative change of the aggregate small
    fn global_size_change_constraint(&mut self, kinetics: KineticsContext<'_>) -> Result<TimeStepConstraint>;

    /// Randomize the processing order of particles
    fn shuffle(&mut self, random: &mut RandomStream) -> Result<()>;

    /// Grow every particle over `dt`
    fn grow(&mut self, dt: f64, kinetics: KineticsContext<'_>) -> Result<()>;

    /// Drop particles that fell below their minimum mass
    fn remove_dead_biomass(&mut self) -> Result<()>;

    /// Split oversized particles and release excreted capsule mass
    fn divide_and_excrete(&mut self, random: &mut RandomStream) -> Result<()>;

    /// Total particle volume
    fn current_biovolume(&self) -> f64;

    /// Height of the highest particle above the carrier
    fn current_height(&self) -> f64;

    /// Discretize particulate mass onto the grids of `fields`
    ///
    /// Species without a grid in `fields` are skipped.
    fn deposit_biomass(&self, fields: &mut FieldSet) -> Result<()>;

    /// Relax overlaps between particles
    fn spread(&mut self) -> Result<()> {
        Ok(())
    }

    /// Erode biomass over `dt`
    fn detach(&mut self, _dt: f64) -> Result<()> {
        Ok(())
    }
}

// =================================================================================================
// Field solver
// =================================================================================================

/// Reaction-diffusion solver for the solute fields
pub trait FieldSolver {
    /// Bring every solute field to its new state
    ///
    /// Bulk values are read from `update.solutes`. On return the global
    /// rate of every reaction must hold the domain integral of its local
    /// rate at the new fields.
    fn solve(&mut self, update: FieldUpdate<'_>) -> Result<()>;

    /// Name for diagnostics
    fn name(&self) -> &str {
        "field solver"
    }
}
