//! Reaction kinetics
//!
//! Rate laws are composed from three layers:
//!
//! 1. **Kinetic factors** ([`KineticFactor`]): dimensionless multipliers of
//!    one or two fields (saturation, steps, sigmoid, feedback)
//! 2. **Reactions** ([`Reaction`]): `μmax × catalyst × Π factors`, or a bulk
//!    exchange flux, each with a domain-integrated rate accumulator
//! 3. **Net reactions** ([`NetReaction`]): the stoichiometric sum giving one
//!    species' source or sink term
//!
//! Reactions live in a [`ReactionRegistry`] owned by the scenario; net
//! reactions refer to them by [`ReactionId`]. The [`SourceTermEvaluator`]
//! evaluates net reactions on a grid for the field solver.
//!
//! # Example
//!
//! ```rust
//! use biofilm_rs::kinetics::{KineticFactor, NetReaction, Reaction, ReactionRegistry};
//! use biofilm_rs::physics::{LocalConcentrations, SpeciesKind, SpeciesRegistry};
//!
//! let mut species = SpeciesRegistry::new();
//! let substrate = species.register("S", SpeciesKind::Solute).unwrap();
//! let biomass = species.register("X", SpeciesKind::Particulate).unwrap();
//!
//! let mut reactions = ReactionRegistry::new();
//! let growth = reactions
//!     .add(Reaction::catalyzed("growth", biomass, 1.0)
//!         .with_factor(KineticFactor::saturation(substrate, 0.5)))
//!     .unwrap();
//!
//! // Yield 0.5: two units of substrate per unit of biomass
//! let substrate_net = NetReaction::new().with_term(growth, -2.0);
//!
//! let env = LocalConcentrations::from_values(vec![0.5, 1.0]);
//! assert_eq!(substrate_net.local_rate(&reactions, &env).unwrap(), -1.0);
//! ```

pub mod factor;
pub mod reaction;
pub mod net;
pub mod source;

pub use factor::KineticFactor;
pub use net::NetReaction;
pub use reaction::{Reaction, ReactionId, ReactionKind, ReactionRegistry};
pub use source::SourceTermEvaluator;
