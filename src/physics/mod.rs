//! Species and fields
//!
//! This module provides the vocabulary kinetics and solvers share:
//! which species exist, how a concentration is looked up at one location,
//! and how a scalar field is stored on the padded grid.
//!
//! # Core Concepts
//!
//! - **Species**: a solute (diffusing field) or particulate (biomass component),
//!   registered once by name and referred to by [`SpeciesId`] afterwards
//! - **Concentrations**: read-only lookup of every species at one location
//! - **FieldGrid**: one scalar field with a one-cell ghost layer
//!
//! # Architecture
//!
//! Kinetic rate laws are **separate from the fields they read**:
//! - A factor stores a `SpeciesId` resolved at construction
//! - The caller decides where it is evaluated (grid cell, particle, well-mixed tank)
//!
//! # Example
//!
//! ```rust
//! use biofilm_rs::physics::{Concentrations, LocalConcentrations, SpeciesKind, SpeciesRegistry};
//!
//! let mut species = SpeciesRegistry::new();
//! let substrate = species.register("S", SpeciesKind::Solute).unwrap();
//!
//! let mut local = LocalConcentrations::zeros(species.len());
//! local.set(substrate, 2.5);
//!
//! assert_eq!(local.value(substrate), 2.5);
//! ```

pub mod species;
pub mod grid;

pub use grid::{CellConcentrations, FieldGrid, FieldSet};
pub use species::{
    Concentrations,
    LocalConcentrations,
    SpeciesId,
    SpeciesKind,
    SpeciesRegistry, };
