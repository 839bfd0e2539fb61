//! Reactions and the reaction registry
//!
//! A [`Reaction`] turns kinetic factors into a rate law. Two kinds exist:
//!
//! - **Catalyzed**: `μmax × catalyst × Π factors`, the usual biomass-driven
//!   conversion
//! - **Flux**: `bulk − local` for one solute, used by lumped well-mixed models
//!   where exchange with the bulk liquid replaces particulate kinetics
//!
//! Every reaction owns an accumulator of its domain-integrated rate. The
//! accumulator is zeroed once per iteration through
//! [`ReactionRegistry::reset_global_rates`] and summed by whoever visits the
//! grid (see `SourceTermEvaluator`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, Result};
use crate::kinetics::KineticFactor;
use crate::physics::{Concentrations, SpeciesId};

// =================================================================================================
// Reaction identifiers
// =================================================================================================

/// Handle to a reaction stored in a [`ReactionRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionId(pub usize);

impl ReactionId {
    /// Index into the registry
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

// =================================================================================================
// Reaction
// =================================================================================================

/// Rate law of a reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReactionKind {
    /// Rate = `specific_rate_max × catalyst × Π factors`
    Catalyzed {
        catalyst: SpeciesId,
        specific_rate_max: f64,
        factors: Vec<KineticFactor>,
    },

    /// Rate = `bulk_concentration − local(solute)`
    ///
    /// No particulate is involved, so every growth query returns zero.
    Flux {
        solute: SpeciesId,
        bulk_concentration: f64,
    },
}

/// A named rate law with its global-rate accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    name: String,
    kind: ReactionKind,
    #[serde(skip)]
    global_rate: f64,
}

impl Reaction {
    /// Catalyzed reaction with no factors yet
    ///
    /// # Example
    ///
    /// ```rust
    /// use biofilm_rs::kinetics::{KineticFactor, Reaction};
    /// use biofilm_rs::physics::{LocalConcentrations, SpeciesId};
    ///
    /// let substrate = SpeciesId(0);
    /// let biomass = SpeciesId(1);
    ///
    /// let growth = Reaction::catalyzed("growth", biomass, 2.0)
    ///     .with_factor(KineticFactor::saturation(substrate, 1.0));
    ///
    /// let env = LocalConcentrations::from_values(vec![1.0, 3.0]);
    /// assert_eq!(growth.local_rate(&env), 3.0);
    /// ```
    pub fn catalyzed(name: impl Into<String>, catalyst: SpeciesId, specific_rate_max: f64) -> Self {
        Self {
            name: name.into(),
            kind: ReactionKind::Catalyzed {
                catalyst,
                specific_rate_max,
                factors: Vec::new(),
            },
            global_rate: 0.0,
        }
    }

    /// Flux between the bulk liquid and the local value of `solute`
    pub fn flux(name: impl Into<String>, solute: SpeciesId, bulk_concentration: f64) -> Self {
        Self {
            name: name.into(),
            kind: ReactionKind::Flux { solute, bulk_concentration },
            global_rate: 0.0,
        }
    }

    /// Append a kinetic factor (builder style)
    ///
    /// Has no effect on flux reactions.
    pub fn with_factor(mut self, factor: KineticFactor) -> Self {
        self.add_factor(factor);
        self
    }

    /// Append a kinetic factor
    pub fn add_factor(&mut self, factor: KineticFactor) {
        if let ReactionKind::Catalyzed { factors, .. } = &mut self.kind {
            factors.push(factor);
        } else {
            log::warn!("Reaction '{}': factor {} ignored on a flux reaction", self.name, factor.name());
        }
    }

    /// Reaction name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rate law
    pub fn kind(&self) -> &ReactionKind {
        &self.kind
    }

    /// Catalytic species, absent for flux reactions
    pub fn catalyst(&self) -> Option<SpeciesId> {
        match &self.kind {
            ReactionKind::Catalyzed { catalyst, .. } => Some(*catalyst),
            ReactionKind::Flux { .. } => None,
        }
    }

    /// Every species this reaction reads
    pub fn species(&self) -> Vec<SpeciesId> {
        match &self.kind {
            ReactionKind::Catalyzed { catalyst, factors, .. } => {
                let mut ids = vec![*catalyst];
                ids.extend(factors.iter().flat_map(KineticFactor::species));
                ids
            }
            ReactionKind::Flux { solute, .. } => vec![*solute],
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::invalid("reaction name cannot be empty"));
        }

        match &self.kind {
            ReactionKind::Catalyzed { specific_rate_max, factors, .. } => {
                if !(*specific_rate_max >= 0.0) || !specific_rate_max.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "reaction '{}': maximum specific rate must be finite and >= 0, got {}",
                        self.name, specific_rate_max
                    )));
                }
                for factor in factors {
                    factor.validate()?;
                }
                Ok(())
            }
            ReactionKind::Flux { bulk_concentration, .. } => {
                if !bulk_concentration.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "reaction '{}': bulk concentration must be finite, got {}",
                        self.name, bulk_concentration
                    )));
                }
                Ok(())
            }
        }
    }

    // ====================================== rate queries ========================================

    /// Local volumetric rate
    pub fn local_rate<C: Concentrations + ?Sized>(&self, env: &C) -> f64 {
        match &self.kind {
            ReactionKind::Catalyzed { catalyst, .. } => {
                self.specific_rate_factor(env) * env.value(*catalyst)
            }
            ReactionKind::Flux { solute, bulk_concentration } => {
                bulk_concentration - env.value(*solute)
            }
        }
    }

    /// Specific rate `μmax × Π factors` (per unit catalyst)
    pub fn specific_rate_factor<C: Concentrations + ?Sized>(&self, env: &C) -> f64 {
        match &self.kind {
            ReactionKind::Catalyzed { specific_rate_max, factors, .. } => {
                factors.iter().fold(*specific_rate_max, |acc, f| acc * f.value(env))
            }
            ReactionKind::Flux { .. } => 0.0,
        }
    }

    /// Mass growth rate of a particle holding `catalyst_mass` of the catalyst
    pub fn mass_growth_rate<C: Concentrations + ?Sized>(&self, env: &C, catalyst_mass: f64) -> f64 {
        self.specific_rate_factor(env) * catalyst_mass
    }

    /// Upper bound of the specific rate, `μmax × Π maximum_value`
    pub fn specific_rate_maximum<C: Concentrations + ?Sized>(&self, env: &C) -> f64 {
        match &self.kind {
            ReactionKind::Catalyzed { specific_rate_max, factors, .. } => {
                factors.iter().fold(*specific_rate_max, |acc, f| acc * f.maximum_value(env))
            }
            ReactionKind::Flux { .. } => 0.0,
        }
    }

    /// Partial derivative of the local rate with respect to one species
    ///
    /// Product rule over the factors; the catalyst enters linearly.
    pub fn rate_derivative<C: Concentrations + ?Sized>(&self, env: &C, with_respect_to: SpeciesId) -> f64 {
        match &self.kind {
            ReactionKind::Catalyzed { catalyst, specific_rate_max, factors } => {
                let values: Vec<f64> = factors.iter().map(|f| f.value(env)).collect();

                let mut sum = 0.0;
                for (i, factor) in factors.iter().enumerate() {
                    let d = factor.derivative(env, with_respect_to);
                    if d == 0.0 {
                        continue;
                    }
                    let others: f64 = values
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, v)| *v)
                        .product();
                    sum += d * others;
                }

                let mut derivative = specific_rate_max * env.value(*catalyst) * sum;
                if *catalyst == with_respect_to {
                    derivative += specific_rate_max * values.iter().product::<f64>();
                }
                derivative
            }
            ReactionKind::Flux { solute, .. } => {
                if *solute == with_respect_to { -1.0 } else { 0.0 }
            }
        }
    }

    // ===================================== accumulation =========================================

    /// Domain-integrated rate accumulated since the last reset
    pub fn global_rate(&self) -> f64 {
        self.global_rate
    }

    /// Add `local_rate × cell_volume` to the accumulator
    pub fn accumulate(&mut self, local_rate: f64, cell_volume: f64) {
        self.global_rate += local_rate * cell_volume;
    }

    /// Zero the accumulator
    pub fn reset(&mut self) {
        self.global_rate = 0.0;
    }

    /// Update the bulk value a flux reaction exchanges with
    pub fn set_bulk_concentration(&mut self, value: f64) {
        if let ReactionKind::Flux { bulk_concentration, .. } = &mut self.kind {
            *bulk_concentration = value;
        }
    }
}

// =================================================================================================
// Reaction registry
// =================================================================================================

/// Owner of every reaction of a run
///
/// Created by the scenario builder and handed to the simulation; reactions
/// are addressed by [`ReactionId`] from net reactions.
#[derive(Debug, Clone, Default)]
pub struct ReactionRegistry {
    reactions: Vec<Reaction>,
}

impl ReactionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a reaction
    pub fn add(&mut self, reaction: Reaction) -> Result<ReactionId> {
        reaction.validate()?;

        if self.reactions.iter().any(|r| r.name == reaction.name) {
            return Err(ModelError::invalid(format!(
                "reaction '{}' is already registered",
                reaction.name
            )));
        }

        let id = ReactionId(self.reactions.len());
        self.reactions.push(reaction);
        Ok(id)
    }

    /// Borrow a reaction
    pub fn get(&self, id: ReactionId) -> Result<&Reaction> {
        self.reactions
            .get(id.index())
            .ok_or(ModelError::UnknownReaction { id: id.index() })
    }

    /// Mutably borrow a reaction
    pub fn get_mut(&mut self, id: ReactionId) -> Result<&mut Reaction> {
        self.reactions
            .get_mut(id.index())
            .ok_or(ModelError::UnknownReaction { id: id.index() })
    }

    /// Find a reaction by name
    pub fn lookup(&self, name: &str) -> Option<ReactionId> {
        self.reactions.iter().position(|r| r.name == name).map(ReactionId)
    }

    /// Zero every accumulator
    pub fn reset_global_rates(&mut self) {
        for reaction in &mut self.reactions {
            reaction.reset();
        }
    }

    /// Add to one reaction's accumulator
    pub fn accumulate(&mut self, id: ReactionId, local_rate: f64, cell_volume: f64) -> Result<()> {
        self.get_mut(id)?.accumulate(local_rate, cell_volume);
        Ok(())
    }

    /// Push a new bulk value to every flux reaction on `solute`
    pub fn update_flux_bulk(&mut self, solute: SpeciesId, value: f64) {
        for reaction in &mut self.reactions {
            if let ReactionKind::Flux { solute: s, .. } = reaction.kind
                && s == solute
            {
                reaction.set_bulk_concentration(value);
            }
        }
    }

    /// Iterate over `(id, reaction)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (ReactionId, &Reaction)> {
        self.reactions.iter().enumerate().map(|(i, r)| (ReactionId(i), r))
    }

    /// Iterate mutably over reactions
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Reaction> {
        self.reactions.iter_mut()
    }

    /// Number of reactions
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}

// =================================================================================================
// Tests
// =================================================================================================
