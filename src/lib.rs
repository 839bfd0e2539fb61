//! biofilm-rs: Biofilm Simulation Control Kernel
//!
//! The control core of an individual-based biofilm simulator: reaction
//! kinetics, adaptive time stepping, bulk-liquid mass balance, stopping
//! criteria and the orchestration of one iteration. Particle mechanics
//! and the reaction-diffusion solver are plugged in as collaborators.
//!
//! # Architecture
//!
//! biofilm-rs is built on two core principles:
//!
//! 1. **Separation of Kinetics and Control**
//!    - Kinetics define rates (what happens locally)
//!    - The solver decides the step and drives the collaborators (when it happens)
//!
//! 2. **Explicit State**
//!    - Species and reactions live in registries owned by the scenario
//!    - The simulation owns its clock, random stream and collaborators
//!    - No global mutable state besides the parallel-execution hint
//!
//! # Quick Start
//!
//! ```rust
//! use biofilm_rs::prelude::*;
//! use biofilm_rs::physics::FieldSet;
//! use biofilm_rs::random::RandomStream;
//!
//! # struct Colony { volume: f64 }
//! # impl ParticleMechanics for Colony {
//! #     fn particle_doubling_time_constraint(&mut self, _: KineticsContext<'_>) -> Result<TimeStepConstraint> {
//! #         Ok(TimeStepConstraint::new(0.5, "particle"))
//! #     }
//! #     fn global_size_change_constraint(&mut self, _: KineticsContext<'_>) -> Result<TimeStepConstraint> {
//! #         Ok(TimeStepConstraint::unbounded("size"))
//! #     }
//! #     fn shuffle(&mut self, _: &mut RandomStream) -> Result<()> { Ok(()) }
//! #     fn grow(&mut self, dt: f64, _: KineticsContext<'_>) -> Result<()> { self.volume += dt; Ok(()) }
//! #     fn remove_dead_biomass(&mut self) -> Result<()> { Ok(()) }
//! #     fn divide_and_excrete(&mut self, _: &mut RandomStream) -> Result<()> { Ok(()) }
//! #     fn current_biovolume(&self) -> f64 { self.volume }
//! #     fn current_height(&self) -> f64 { 0.0 }
//! #     fn deposit_biomass(&self, _: &mut FieldSet) -> Result<()> { Ok(()) }
//! # }
//! # struct Idle;
//! # impl FieldSolver for Idle {
//! #     fn solve(&mut self, _: FieldUpdate<'_>) -> Result<()> { Ok(()) }
//! # }
//! # fn main() -> Result<()> {
//! // 1. Describe species, reactions and criteria
//! let mut builder = ScenarioBuilder::new();
//! let substrate = builder.solute("S", 1e-4, BulkConcentration::decreasing(10.0))?;
//! let biomass = builder.particulate("X", 200.0)?;
//! let growth = builder.reaction(
//!     Reaction::catalyzed("growth", biomass, 0.5).with_factor(KineticFactor::saturation(substrate, 1.0)),
//! )?;
//! builder.net_reaction(substrate, NetReaction::new().with_term(growth, -2.0))?;
//! builder.termination(TerminationCriteria::default().with_finish_time(2.0));
//! let scenario = builder.build()?;
//!
//! // 2. Plug in the collaborators
//! let mut simulation = Simulation::new(scenario, Colony { volume: 0.0 }, Idle)?;
//!
//! // 3. Run until a stopping criterion holds
//! let iterations = simulation.run()?;
//!
//! assert_eq!(iterations, 4);
//! assert_eq!(simulation.clock().time(), 2.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`physics`]: Species, concentration lookup and fields
//! - [`kinetics`]: Kinetic factors, reactions and net reactions
//! - [`solver`]: Time stepping, bulk integration, termination and the orchestrator
//! - [`random`]: The seeded random stream of a run
//! - [`error`]: Error taxonomy

// Core modules
pub mod error;
pub mod physics;
pub mod kinetics;
pub mod solver;
pub mod random;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //!
    //! use biofilm_rs::prelude::*;
    //! ```
    pub use crate::error::{ModelError, Result};
    pub use crate::kinetics::{KineticFactor,
                              NetReaction,
                              Reaction,
                              ReactionId,
                              ReactionRegistry};
    pub use crate::physics::{Concentrations,
                             SpeciesId,
                             SpeciesKind};
    pub use crate::solver::{BulkConcentration,
                            FieldSolver,
                            FieldUpdate,
                            KineticsContext,
                            ParticleMechanics,
                            ReactorGeometry,
                            Scenario,
                            ScenarioBuilder,
                            Simulation,
                            TerminationCriteria,
                            TimeStepConstraint,
                            TimeStepPolicy};
}
