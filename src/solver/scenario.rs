//! Simulation scenario definition
//!
//! A scenario holds everything that is fixed before the first iteration:
//! the species, the reactions and their stoichiometry, the reactor geometry,
//! the time-step policy, the stopping criteria and the random seed.
//!
//! Scenarios are assembled with a [`ScenarioBuilder`], which resolves every
//! name to an id and validates the whole configuration in [`ScenarioBuilder::build`].
//! No iteration can start from an invalid scenario.
//!
//! # Example
//!
//! ```rust
//! use biofilm_rs::kinetics::{KineticFactor, NetReaction, Reaction};
//! use biofilm_rs::solver::{BulkConcentration, ScenarioBuilder, TerminationCriteria};
//!
//! let mut builder = ScenarioBuilder::new();
//! let substrate = builder.solute("S", 1e-4, BulkConcentration::decreasing(10.0)).unwrap();
//! let biomass = builder.particulate("X", 200.0).unwrap();
//!
//! let growth = builder
//!     .reaction(Reaction::catalyzed("growth", biomass, 0.5)
//!         .with_factor(KineticFactor::saturation(substrate, 1.0)))
//!     .unwrap();
//!
//! builder.net_reaction(substrate, NetReaction::new().with_term(growth, -2.0)).unwrap();
//! builder.net_reaction(biomass, NetReaction::new().with_term(growth, 1.0)).unwrap();
//! builder.termination(TerminationCriteria::default().with_finish_time(24.0));
//!
//! let scenario = builder.build().unwrap();
//! assert_eq!(scenario.solutes().len(), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::kinetics::{NetReaction, Reaction, ReactionId, ReactionKind, ReactionRegistry};
use crate::physics::{Concentrations, SpeciesId, SpeciesKind, SpeciesRegistry};
use crate::solver::{BulkConcentration, TerminationCriteria, TimeStepConstraint, TimeStepPolicy};

// =================================================================================================
// Reactor geometry
// =================================================================================================

/// Scaling between the computational volume and the reactor
///
/// Global rates are integrated over the computational volume. The reactor
/// holds `computational_volume_multiplier` such volumes in
/// `reactor_volume` of liquid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactorGeometry {
    pub computational_volume_multiplier: f64,
    pub reactor_volume: f64,
}

impl Default for ReactorGeometry {
    fn default() -> Self {
        Self {
            computational_volume_multiplier: 1.0,
            reactor_volume: 1.0,
        }
    }
}

impl ReactorGeometry {
    /// Geometry from explicit values
    pub fn new(computational_volume_multiplier: f64, reactor_volume: f64) -> Self {
        Self { computational_volume_multiplier, reactor_volume }
    }

    /// Geometry from carrier areas
    ///
    /// The multiplier is the reactor's carrier area over the carrier area of
    /// the computational volume.
    pub fn from_carrier_area(carrier_area: f64, computational_carrier_area: f64, reactor_volume: f64) -> Self {
        Self::new(carrier_area / computational_carrier_area, reactor_volume)
    }

    /// Factor turning a rate per computational volume into a rate per reactor volume
    pub fn rate_scale(&self) -> f64 {
        self.computational_volume_multiplier / self.reactor_volume
    }

    /// Validate
    pub fn validate(&self) -> Result<()> {
        let m = self.computational_volume_multiplier;
        let v = self.reactor_volume;
        if !(m > 0.0 && m.is_finite()) {
            return Err(ModelError::invalid(format!(
                "computational volume multiplier must be positive and finite, got {m}"
            )));
        }
        if !(v > 0.0 && v.is_finite()) {
            return Err(ModelError::invalid(format!("reactor volume must be positive and finite, got {v}")));
        }
        Ok(())
    }
}

// =================================================================================================
// Species
// =================================================================================================

/// A diffusing species with its bulk concentration and rate history
#[derive(Debug, Clone, PartialEq)]
pub struct SoluteSpecies {
    id: SpeciesId,
    name: String,
    diffusivity: f64,
    bulk: BulkConcentration,
    net: NetReaction,
    rate_series: Vec<f64>,
    bulk_series: Vec<f64>,
}

impl SoluteSpecies {
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn diffusivity(&self) -> f64 {
        self.diffusivity
    }

    pub fn bulk(&self) -> &BulkConcentration {
        &self.bulk
    }

    /// Current bulk value
    pub fn bulk_concentration(&self) -> f64 {
        self.bulk.value()
    }

    pub fn net_reaction(&self) -> &NetReaction {
        &self.net
    }

    /// Recorded global rates, one per field update
    pub fn rate_series(&self) -> &[f64] {
        &self.rate_series
    }

    /// Bulk value at each recorded field update
    pub fn bulk_series(&self) -> &[f64] {
        &self.bulk_series
    }

    /// Latest recorded global rate, zero before the first record
    pub fn latest_rate(&self) -> f64 {
        self.rate_series.last().copied().unwrap_or(0.0)
    }

    /// Snapshot `Σ ν × global_rate` and the current bulk value
    pub fn record_rate(&mut self, reactions: &ReactionRegistry) -> Result<f64> {
        let rate = self.net.global_rate(reactions)?;
        if !rate.is_finite() {
            return Err(ModelError::NumericalStability {
                quantity: format!("global rate of '{}'", self.name),
                value: rate,
            });
        }
        self.rate_series.push(rate);
        self.bulk_series.push(self.bulk.value());
        Ok(rate)
    }

    /// Bulk stability bound from the latest recorded rate, labelled with the solute name
    pub fn stability_constraint(&self, geometry: &ReactorGeometry) -> TimeStepConstraint {
        TimeStepConstraint::new(
            self.bulk.stability_bound(self.latest_rate(), geometry.rate_scale()),
            self.name.as_str(),
        )
    }

    /// Integrate the bulk value over `dt` with the latest recorded rate
    pub fn advance_bulk(&mut self, dt: f64, geometry: &ReactorGeometry) -> Result<f64> {
        let rate = self.latest_rate();
        self.bulk.advance(dt, rate, geometry.rate_scale()).map_err(|error| match error {
            ModelError::NumericalStability { value, .. } => ModelError::NumericalStability {
                quantity: format!("bulk concentration of '{}'", self.name),
                value,
            },
            other => other,
        })
    }

    fn validate(&self) -> Result<()> {
        if !(self.diffusivity > 0.0 && self.diffusivity.is_finite()) {
            return Err(ModelError::invalid(format!(
                "solute '{}': diffusivity must be positive and finite, got {}",
                self.name, self.diffusivity
            )));
        }
        self.bulk.validate()
    }
}

/// A biomass component (active mass, EPS, inert)
#[derive(Debug, Clone, PartialEq)]
pub struct ParticulateSpecies {
    id: SpeciesId,
    name: String,
    specific_mass: f64,
    net: NetReaction,
}

impl ParticulateSpecies {
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mass per volume of particle
    pub fn specific_mass(&self) -> f64 {
        self.specific_mass
    }

    pub fn net_reaction(&self) -> &NetReaction {
        &self.net
    }

    /// Net specific growth rate at a location
    pub fn specific_growth_rate<C: Concentrations + ?Sized>(&self, reactions: &ReactionRegistry, env: &C) -> Result<f64> {
        self.net.specific_rate(reactions, env)
    }

    /// Upper bound of the specific growth rate
    pub fn maximum_specific_growth_rate<C: Concentrations + ?Sized>(
        &self,
        reactions: &ReactionRegistry,
        env: &C,
    ) -> Result<f64> {
        self.net.maximum_specific_rate(reactions, env)
    }

    fn validate(&self) -> Result<()> {
        if !(self.specific_mass > 0.0 && self.specific_mass.is_finite()) {
            return Err(ModelError::invalid(format!(
                "particulate '{}': specific mass must be positive and finite, got {}",
                self.name, self.specific_mass
            )));
        }
        Ok(())
    }
}

// =================================================================================================
// Scenario
// =================================================================================================

/// Validated simulation setup
#[derive(Debug, Clone)]
pub struct Scenario {
    pub(crate) species: SpeciesRegistry,
    pub(crate) reactions: ReactionRegistry,
    pub(crate) solutes: Vec<SoluteSpecies>,
    pub(crate) particulates: Vec<ParticulateSpecies>,
    pub(crate) geometry: ReactorGeometry,
    pub(crate) policy: TimeStepPolicy,
    pub(crate) termination: TerminationCriteria,
    pub(crate) seed: u64,
    pub(crate) start_time: f64,
    pub(crate) consumption_solute: Option<usize>,
}

impl Scenario {
    pub fn species(&self) -> &SpeciesRegistry {
        &self.species
    }

    pub fn reactions(&self) -> &ReactionRegistry {
        &self.reactions
    }

    pub fn solutes(&self) -> &[SoluteSpecies] {
        &self.solutes
    }

    pub fn particulates(&self) -> &[ParticulateSpecies] {
        &self.particulates
    }

    pub fn geometry(&self) -> &ReactorGeometry {
        &self.geometry
    }

    pub fn policy(&self) -> &TimeStepPolicy {
        &self.policy
    }

    pub fn termination(&self) -> &TerminationCriteria {
        &self.termination
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulated time of the first iteration
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Solute by name
    pub fn solute(&self, name: &str) -> Option<&SoluteSpecies> {
        self.solutes.iter().find(|s| s.name == name)
    }

    /// Solute watched by the consumption criterion
    pub fn consumption_solute(&self) -> Option<&SoluteSpecies> {
        self.consumption_solute.and_then(|i| self.solutes.get(i))
    }
}

// =================================================================================================
// Builder
// =================================================================================================

/// Incremental, validating scenario construction
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    species: SpeciesRegistry,
    reactions: ReactionRegistry,
    solutes: Vec<SoluteSpecies>,
    particulates: Vec<ParticulateSpecies>,
    net_assigned: Vec<SpeciesId>,
    geometry: ReactorGeometry,
    policy: TimeStepPolicy,
    termination: TerminationCriteria,
    seed: u64,
    start_time: f64,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a solute
    pub fn solute(&mut self, name: &str, diffusivity: f64, bulk: BulkConcentration) -> Result<SpeciesId> {
        let id = self.species.register(name, SpeciesKind::Solute)?;
        self.solutes.push(SoluteSpecies {
            id,
            name: name.to_string(),
            diffusivity,
            bulk,
            net: NetReaction::new(),
            rate_series: Vec::new(),
            bulk_series: Vec::new(),
        });
        Ok(id)
    }

    /// Register a particulate species
    pub fn particulate(&mut self, name: &str, specific_mass: f64) -> Result<SpeciesId> {
        let id = self.species.register(name, SpeciesKind::Particulate)?;
        self.particulates.push(ParticulateSpecies {
            id,
            name: name.to_string(),
            specific_mass,
            net: NetReaction::new(),
        });
        Ok(id)
    }

    /// Register a reaction
    pub fn reaction(&mut self, reaction: Reaction) -> Result<ReactionId> {
        self.reactions.add(reaction)
    }

    /// Assign the net reaction of a species (once per species)
    pub fn net_reaction(&mut self, species: SpeciesId, net: NetReaction) -> Result<()> {
        if self.net_assigned.contains(&species) {
            return Err(ModelError::invalid(format!(
                "species '{}' already has a net reaction",
                self.species.name(species).unwrap_or("?")
            )));
        }

        if let Some(solute) = self.solutes.iter_mut().find(|s| s.id == species) {
            solute.net = net;
        } else if let Some(particulate) = self.particulates.iter_mut().find(|p| p.id == species) {
            particulate.net = net;
        } else {
            return Err(ModelError::UnknownSpecies { name: species.to_string() });
        }

        self.net_assigned.push(species);
        Ok(())
    }

    pub fn geometry(&mut self, geometry: ReactorGeometry) -> &mut Self {
        self.geometry = geometry;
        self
    }

    pub fn policy(&mut self, policy: TimeStepPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    pub fn termination(&mut self, criteria: TerminationCriteria) -> &mut Self {
        self.termination = criteria;
        self
    }

    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Resume from `time` instead of zero
    pub fn start_time(&mut self, time: f64) -> &mut Self {
        self.start_time = time;
        self
    }

    /// Registered species (for name lookups while building)
    pub fn species(&self) -> &SpeciesRegistry {
        &self.species
    }

    /// Validate everything and produce the scenario
    pub fn build(self) -> Result<Scenario> {
        self.geometry.validate()?;
        self.policy.validate()?;
        self.termination.validate()?;
        if !(self.start_time >= 0.0) || !self.start_time.is_finite() {
            return Err(ModelError::invalid(format!(
                "start time must be finite and >= 0, got {}",
                self.start_time
            )));
        }

        for solute in &self.solutes {
            solute.validate()?;
        }
        for particulate in &self.particulates {
            particulate.validate()?;
        }

        for (id, reaction) in self.reactions.iter() {
            self.check_reaction_species(id, reaction)?;
        }

        for net in self
            .solutes
            .iter()
            .map(|s| &s.net)
            .chain(self.particulates.iter().map(|p| &p.net))
        {
            net.resolve(&self.reactions)?;
        }

        let consumption_solute = match &self.termination.consumption {
            Some(criterion) => Some(
                self.solutes
                    .iter()
                    .position(|s| s.name == criterion.solute)
                    .ok_or_else(|| ModelError::UnknownSpecies { name: criterion.solute.clone() })?,
            ),
            None => None,
        };

        let mut reactions = self.reactions;
        for solute in &self.solutes {
            reactions.update_flux_bulk(solute.id, solute.bulk.value());
        }

        log::debug!(
            "Scenario built: {} solutes, {} particulates, {} reactions, policy {}",
            self.solutes.len(),
            self.particulates.len(),
            reactions.len(),
            self.policy.mode.name()
        );

        Ok(Scenario {
            species: self.species,
            reactions,
            solutes: self.solutes,
            particulates: self.particulates,
            geometry: self.geometry,
            policy: self.policy,
            termination: self.termination,
            seed: self.seed,
            start_time: self.start_time,
            consumption_solute,
        })
    }

    fn check_reaction_species(&self, id: ReactionId, reaction: &Reaction) -> Result<()> {
        for species in reaction.species() {
            if !self.species.contains(species) {
                return Err(ModelError::invalid(format!(
                    "reaction {id} '{}' refers to unregistered species {species}",
                    reaction.name()
                )));
            }
        }

        let (required, role, species) = match reaction.kind() {
            ReactionKind::Catalyzed { catalyst, .. } => (SpeciesKind::Particulate, "catalyst", *catalyst),
            ReactionKind::Flux { solute, .. } => (SpeciesKind::Solute, "flux species", *solute),
        };
        if self.species.kind(species) != Some(required) {
            return Err(ModelError::invalid(format!(
                "reaction '{}': {role} {species} must be a {required}",
                reaction.name()
            )));
        }
        Ok(())
    }
}

// ================================================================================================
// Tests
// ================================================================================================
