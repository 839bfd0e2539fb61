//! Helper functions for integration tests

use biofilm_rs::kinetics::{KineticFactor, NetReaction, Reaction, ReactionId};
use biofilm_rs::physics::SpeciesId;
use biofilm_rs::solver::{BulkConcentration, Scenario, ScenarioBuilder, Simulation};

use super::mock_collaborators::{MockParticles, WellMixedFieldSolver};

/// Ids of the single-substrate growth scenario
#[derive(Debug, Clone, Copy)]
pub struct MonodIds {
    pub substrate: SpeciesId,
    pub biomass: SpeciesId,
    pub growth: ReactionId,
}

/// Builder for `X` growing on `S` with Monod kinetics and yield `yield_coefficient`
///
/// Policy, termination and geometry are left for the test to set.
pub fn monod_builder(
    bulk: BulkConcentration,
    mu_max: f64,
    half_saturation: f64,
    yield_coefficient: f64,
) -> (ScenarioBuilder, MonodIds) {
    let mut builder = ScenarioBuilder::new();
    let substrate = builder.solute("S", 1.0, bulk).unwrap();
    let biomass = builder.particulate("X", 1.0).unwrap();
    let growth = builder
        .reaction(
            Reaction::catalyzed("growth", biomass, mu_max)
                .with_factor(KineticFactor::saturation(substrate, half_saturation)),
        )
        .unwrap();

    builder
        .net_reaction(substrate, NetReaction::new().with_term(growth, -1.0 / yield_coefficient))
        .unwrap();
    builder
        .net_reaction(biomass, NetReaction::new().with_term(growth, 1.0))
        .unwrap();

    (builder, MonodIds { substrate, biomass, growth })
}

/// Simulation over a unit well-mixed compartment
pub fn well_mixed_simulation(
    scenario: Scenario,
    particles: MockParticles,
) -> Simulation<MockParticles, WellMixedFieldSolver> {
    let solver = WellMixedFieldSolver::new(scenario.species(), 1.0).unwrap();
    Simulation::new(scenario, particles, solver).unwrap()
}

/// Compute relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}
