//! Net reactions
//!
//! The net reaction of a species is the stoichiometrically weighted sum of
//! the reactions it takes part in:
//!
//! $$r_{net} = \sum_i \nu_i \, r_i$$
//!
//! Coefficients are negative for consumption, positive for production, and
//! may be zero (the reaction is tracked but does not contribute).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::kinetics::{Reaction, ReactionId, ReactionRegistry};
use crate::physics::{Concentrations, SpeciesId};

/// Weighted sum of reactions for one species
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetReaction {
    terms: Vec<(ReactionId, f64)>,
}

impl NetReaction {
    /// Net reaction with no terms
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a term (builder style)
    pub fn with_term(mut self, reaction: ReactionId, coefficient: f64) -> Self {
        self.terms.push((reaction, coefficient));
        self
    }

    /// Append a term
    pub fn add_term(&mut self, reaction: ReactionId, coefficient: f64) {
        self.terms.push((reaction, coefficient));
    }

    /// Terms in insertion order
    pub fn terms(&self) -> &[(ReactionId, f64)] {
        &self.terms
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Borrow every term's reaction from the registry
    ///
    /// Fails on the first unknown id. Hot loops resolve once and then
    /// evaluate without further lookups.
    pub fn resolve<'r>(&self, registry: &'r ReactionRegistry) -> Result<Vec<(&'r Reaction, f64)>> {
        self.terms
            .iter()
            .map(|&(id, coefficient)| Ok((registry.get(id)?, coefficient)))
            .collect()
    }

    /// Net local rate `Σ ν × local_rate`
    pub fn local_rate<C: Concentrations + ?Sized>(&self, registry: &ReactionRegistry, env: &C) -> Result<f64> {
        Ok(self.resolve(registry)?.iter().map(|(r, nu)| nu * r.local_rate(env)).sum())
    }

    /// Net specific growth rate `Σ ν × specific_rate_factor` of a particulate
    pub fn specific_rate<C: Concentrations + ?Sized>(&self, registry: &ReactionRegistry, env: &C) -> Result<f64> {
        Ok(self
            .resolve(registry)?
            .iter()
            .map(|(r, nu)| nu * r.specific_rate_factor(env))
            .sum())
    }

    /// Net domain-integrated rate `Σ ν × global_rate`
    pub fn global_rate(&self, registry: &ReactionRegistry) -> Result<f64> {
        Ok(self.resolve(registry)?.iter().map(|(r, nu)| nu * r.global_rate()).sum())
    }

    /// Net rate derivative with respect to one species
    pub fn rate_derivative<C: Concentrations + ?Sized>(
        &self,
        registry: &ReactionRegistry,
        env: &C,
        with_respect_to: SpeciesId,
    ) -> Result<f64> {
        Ok(self
            .resolve(registry)?
            .iter()
            .map(|(r, nu)| nu * r.rate_derivative(env, with_respect_to))
            .sum())
    }

    /// Upper bound of the specific growth rate
    ///
    /// Only producing terms (`ν > 0`) can raise the bound.
    pub fn maximum_specific_rate<C: Concentrations + ?Sized>(&self, registry: &ReactionRegistry, env: &C) -> Result<f64> {
        Ok(self
            .resolve(registry)?
            .iter()
            .filter(|(_, nu)| *nu > 0.0)
            .map(|(r, nu)| nu * r.specific_rate_maximum(env))
            .sum())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
