//! Mock collaborators for integration tests
//!
//! A well-mixed compartment: every solute sits at its bulk value and the
//! biomass is spread uniformly over one grid cell. Growth follows the
//! scenario's kinetics, so mass balances can be checked exactly.

use biofilm_rs::error::{ModelError, Result};
use biofilm_rs::kinetics::SourceTermEvaluator;
use biofilm_rs::physics::{FieldGrid, FieldSet, LocalConcentrations, SpeciesId, SpeciesKind, SpeciesRegistry};
use biofilm_rs::random::RandomStream;
use biofilm_rs::solver::{
    FieldSolver,
    FieldUpdate,
    GranuleBoundaries,
    KineticsContext,
    ParticleMechanics,
    TimeStepConstraint,
};

// =================================================================================================
// Particles
// =================================================================================================

/// Point particles of one biomass species in a well-mixed compartment
#[derive(Debug, Clone)]
pub struct MockParticles {
    pub biomass: SpeciesId,
    pub masses: Vec<f64>,
    pub specific_mass: f64,
    pub compartment_volume: f64,
    pub division_mass: f64,
    pub death_mass: f64,
    pub size_change_limit: Option<f64>,
    pub detach_fraction: f64,
    pub spread_calls: usize,
}

impl MockParticles {
    pub fn new(biomass: SpeciesId, masses: Vec<f64>) -> Self {
        Self {
            biomass,
            masses,
            specific_mass: 1.0,
            compartment_volume: 1.0,
            division_mass: f64::INFINITY,
            death_mass: 0.0,
            size_change_limit: None,
            detach_fraction: 0.0,
            spread_calls: 0,
        }
    }

    pub fn with_division_mass(mut self, mass: f64) -> Self {
        self.division_mass = mass;
        self
    }

    pub fn with_death_mass(mut self, mass: f64) -> Self {
        self.death_mass = mass;
        self
    }

    pub fn with_size_change_limit(mut self, fraction: f64) -> Self {
        self.size_change_limit = Some(fraction);
        self
    }

    pub fn with_detach_fraction(mut self, fraction: f64) -> Self {
        self.detach_fraction = fraction;
        self
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    /// Concentrations seen by every particle
    fn environment(&self, kinetics: &KineticsContext<'_>) -> LocalConcentrations {
        let n = kinetics.solutes.len() + kinetics.particulates.len();
        let mut env = LocalConcentrations::zeros(n);
        for solute in kinetics.solutes {
            env.set(solute.id(), solute.bulk_concentration());
        }
        env.set(self.biomass, self.total_mass() / self.compartment_volume);
        env
    }

    fn specific_growth_rate(&self, kinetics: &KineticsContext<'_>) -> Result<f64> {
        let species = kinetics
            .particulates
            .iter()
            .find(|p| p.id() == self.biomass)
            .ok_or_else(|| ModelError::UnknownSpecies { name: self.biomass.to_string() })?;
        species.specific_growth_rate(kinetics.reactions, &self.environment(kinetics))
    }
}

impl ParticleMechanics for MockParticles {
    fn particle_doubling_time_constraint(&mut self, kinetics: KineticsContext<'_>) -> Result<TimeStepConstraint> {
        let mu = self.specific_growth_rate(&kinetics)?;
        if self.masses.is_empty() || mu <= 0.0 {
            return Ok(TimeStepConstraint::unbounded("Particle doubling"));
        }
        Ok(TimeStepConstraint::new(1.0 / mu, "Particle doubling"))
    }

    fn global_size_change_constraint(&mut self, kinetics: KineticsContext<'_>) -> Result<TimeStepConstraint> {
        let mu = self.specific_growth_rate(&kinetics)?;
        match self.size_change_limit {
            Some(fraction) if mu > 0.0 => Ok(TimeStepConstraint::new(fraction / mu, "Global size change")),
            _ => Ok(TimeStepConstraint::unbounded("Global size change")),
        }
    }

    fn shuffle(&mut self, random: &mut RandomStream) -> Result<()> {
        random.shuffle(&mut self.masses);
        Ok(())
    }

    fn grow(&mut self, dt: f64, kinetics: KineticsContext<'_>) -> Result<()> {
        let mu = self.specific_growth_rate(&kinetics)?;
        for mass in &mut self.masses {
            *mass += mu * *mass * dt;
        }
        Ok(())
    }

    fn remove_dead_biomass(&mut self) -> Result<()> {
        let death_mass = self.death_mass;
        self.masses.retain(|&m| m >= death_mass);
        Ok(())
    }

    fn divide_and_excrete(&mut self, random: &mut RandomStream) -> Result<()> {
        let mut daughters = Vec::new();
        for mass in &mut self.masses {
            if *mass > self.division_mass {
                let fraction = 0.4 + 0.2 * random.next_uniform();
                let daughter = *mass * fraction;
                *mass -= daughter;
                daughters.push(daughter);
            }
        }
        self.masses.extend(daughters);
        Ok(())
    }

    fn current_biovolume(&self) -> f64 {
        self.total_mass() / self.specific_mass
    }

    fn current_height(&self) -> f64 {
        self.current_biovolume().cbrt()
    }

    fn deposit_biomass(&self, fields: &mut FieldSet) -> Result<()> {
        if let Some(grid) = fields.get_mut(self.biomass) {
            let concentration = self.total_mass() / grid.cell_volume();
            grid.set(1, 1, 1, concentration);
        }
        Ok(())
    }

    fn spread(&mut self) -> Result<()> {
        self.spread_calls += 1;
        Ok(())
    }

    fn detach(&mut self, dt: f64) -> Result<()> {
        let kept = (1.0 - self.detach_fraction * dt).max(0.0);
        for mass in &mut self.masses {
            *mass *= kept;
        }
        Ok(())
    }
}

// =================================================================================================
// Field solver
// =================================================================================================

/// One-cell field solver: solutes equal their bulk values
#[derive(Debug, Clone)]
pub struct WellMixedFieldSolver {
    fields: FieldSet,
    pub solves: usize,
}

impl WellMixedFieldSolver {
    /// One 1×1×1 grid per registered species, cell volume `voxel_side³`
    pub fn new(species: &SpeciesRegistry, voxel_side: f64) -> Result<Self> {
        let mut fields = FieldSet::new();
        for kind in [SpeciesKind::Solute, SpeciesKind::Particulate] {
            for id in species.ids_of_kind(kind) {
                fields.insert(id, FieldGrid::uniform((1, 1, 1), voxel_side, 0.0)?)?;
            }
        }
        Ok(Self { fields, solves: 0 })
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }
}

impl FieldSolver for WellMixedFieldSolver {
    fn solve(&mut self, update: FieldUpdate<'_>) -> Result<()> {
        for solute in update.solutes {
            if let Some(grid) = self.fields.get_mut(solute.id()) {
                grid.set(1, 1, 1, solute.bulk_concentration());
            }
        }
        update.particles.deposit_biomass(&mut self.fields)?;

        self.fields.refresh_ghost_layers(&GranuleBoundaries);
        self.fields.refresh_maxima();

        SourceTermEvaluator::new(&self.fields, &GranuleBoundaries)?.accumulate_global_rates(update.reactions)?;
        self.solves += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "well-mixed compartment"
    }
}
