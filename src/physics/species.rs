//! Species identifiers and concentration lookups
//!
//! This module defines the core vocabulary shared by kinetics and solver:
//! - `SpeciesId`: type-safe handle to a registered species
//! - `SpeciesKind`: solute (diffusing field) or particulate (biomass)
//! - `SpeciesRegistry`: name → id resolution, done once at construction
//! - `Concentrations`: read-only view of field values at one location

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ModelError, Result};

// =================================================================================================
// Species identifiers
// =================================================================================================

/// Handle to a registered species
///
/// Ids are dense indices into the registry, so they can address
/// `DVector` rows and field arrays directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

impl SpeciesId {
    /// Index into per-species storage
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesKind {
    /// Diffusing chemical (substrate, product, signal molecule)
    Solute,

    /// Particulate component of biomass (active mass, EPS, inert)
    Particulate,
}

impl fmt::Display for SpeciesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeciesKind::Solute => write!(f, "Solute"),
            SpeciesKind::Particulate => write!(f, "Particulate"),
        }
    }
}

// =================================================================================================
// Species registry
// =================================================================================================

/// Registry of species names
///
/// Every kinetic factor and reaction refers to species through a
/// [`SpeciesId`] resolved here at construction time. Names are unique
/// across solutes and particulates.
///
/// # Example
///
/// ```rust
/// use biofilm_rs::physics::{SpeciesKind, SpeciesRegistry};
///
/// let mut registry = SpeciesRegistry::new();
/// let oxygen = registry.register("O2", SpeciesKind::Solute).unwrap();
///
/// assert_eq!(registry.lookup("O2").unwrap(), oxygen);
/// assert!(registry.lookup("NH4").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    names: Vec<String>,
    kinds: Vec<SpeciesKind>,
    index: HashMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new species and return its id
    pub fn register(&mut self, name: impl Into<String>, kind: SpeciesKind) -> Result<SpeciesId> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(ModelError::invalid("species name cannot be empty"));
        }
        if self.index.contains_key(&name) {
            return Err(ModelError::DuplicateSpecies { name });
        }

        let id = SpeciesId(self.names.len());
        self.index.insert(name.clone(), id);
        self.names.push(name);
        self.kinds.push(kind);

        Ok(id)
    }

    /// Resolve a name to its id
    pub fn lookup(&self, name: &str) -> Result<SpeciesId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownSpecies { name: name.to_string() })
    }

    /// Name of a registered species
    pub fn name(&self, id: SpeciesId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Kind of a registered species
    pub fn kind(&self, id: SpeciesId) -> Option<SpeciesKind> {
        self.kinds.get(id.index()).copied()
    }

    /// Check an id belongs to this registry
    pub fn contains(&self, id: SpeciesId) -> bool {
        id.index() < self.names.len()
    }

    /// Number of registered species
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All ids of a given kind, in registration order
    pub fn ids_of_kind(&self, kind: SpeciesKind) -> Vec<SpeciesId> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == kind)
            .map(|(i, _)| SpeciesId(i))
            .collect()
    }
}

// =================================================================================================
// Concentration lookup
// =================================================================================================

/// Read-only view of species concentrations at one location
///
/// Kinetic factors never own the field they read. They hold a
/// [`SpeciesId`] and are evaluated against whatever implements this trait:
/// a grid cell, a particle position or a well-mixed reactor.
pub trait Concentrations {
    /// Local concentration of a species
    fn value(&self, species: SpeciesId) -> f64;

    /// Upper bound of the species concentration over the domain
    ///
    /// Used for stability estimates (`maximumValue` of a factor).
    fn maximum(&self, species: SpeciesId) -> f64;
}

/// Concentrations of every registered species at one location
///
/// Values and maxima are dense `DVector`s indexed by [`SpeciesId`].
/// Missing entries read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalConcentrations {
    values: DVector<f64>,
    maxima: DVector<f64>,
}

impl LocalConcentrations {
    /// All-zero concentrations for `n` species
    pub fn zeros(n: usize) -> Self {
        Self {
            values: DVector::zeros(n),
            maxima: DVector::zeros(n),
        }
    }

    /// Build from values; maxima default to the values themselves
    pub fn from_values(values: Vec<f64>) -> Self {
        let values = DVector::from_vec(values);
        Self {
            maxima: values.clone(),
            values,
        }
    }

    /// Build from explicit values and maxima
    pub fn with_maxima(values: DVector<f64>, maxima: DVector<f64>) -> Self {
        debug_assert_eq!(values.len(), maxima.len());
        Self { values, maxima }
    }

    /// Set the local value of a species
    ///
    /// Raises the stored maximum if the new value exceeds it.
    pub fn set(&mut self, species: SpeciesId, value: f64) {
        let i = species.index();
        if i >= self.values.len() {
            self.values = self.values.clone().resize_vertically(i + 1, 0.0);
            self.maxima = self.maxima.clone().resize_vertically(i + 1, 0.0);
        }
        self.values[i] = value;
        if value > self.maxima[i] {
            self.maxima[i] = value;
        }
    }

    /// Set the domain maximum of a species
    pub fn set_maximum(&mut self, species: SpeciesId, maximum: f64) {
        let i = species.index();
        if i < self.maxima.len() {
            self.maxima[i] = maximum;
        }
    }

    /// Number of species slots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Underlying values
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }
}

impl Concentrations for LocalConcentrations {
    fn value(&self, species: SpeciesId) -> f64 {
        self.values.get(species.index()).copied().unwrap_or(0.0)
    }

    fn maximum(&self, species: SpeciesId) -> f64 {
        self.maxima.get(species.index()).copied().unwrap_or(0.0)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
