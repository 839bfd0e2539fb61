//! Integration tests: time-step policies driving full simulations

use approx::assert_relative_eq;
use biofilm_rs::solver::{
    BulkConcentration,
    ReactorGeometry,
    TerminationCriteria,
    TimeStepPolicy,
    COMPULSORY_LABEL,
    FIXED_LABEL,
    MAXIMUM_LABEL,
    MINIMUM_LABEL,
};

mod common;
use common::{monod_builder, well_mixed_simulation, MockParticles};

/// Constant substrate: the doubling time stays at 2.2
fn steady_simulation(
    policy: TimeStepPolicy,
    finish: f64,
) -> biofilm_rs::solver::Simulation<MockParticles, common::WellMixedFieldSolver> {
    let (mut builder, ids) = monod_builder(BulkConcentration::constant(10.0), 0.5, 1.0, 0.5);
    builder
        .policy(policy)
        .termination(TerminationCriteria::default().with_finish_time(finish));
    well_mixed_simulation(builder.build().unwrap(), MockParticles::new(ids.biomass, vec![0.1; 4]))
}

#[test]
fn test_compulsory_boundaries_are_hit() {
    let mut sim = steady_simulation(TimeStepPolicy::adaptive().with_compulsory(5.0), 20.0);
    sim.initialize().unwrap();

    let mut eligible_times = Vec::new();
    while !sim.should_stop() {
        sim.perform_full_iteration().unwrap();

        let label = sim.clock().last_constraint().map(|c| c.label().to_string()).unwrap();
        if sim.is_output_eligible() {
            assert_eq!(label, COMPULSORY_LABEL);
            eligible_times.push(sim.clock().time());
        } else {
            assert_eq!(label, "Particle doubling");
        }
    }

    assert_eq!(eligible_times.len(), 4);
    for (n, time) in eligible_times.iter().enumerate() {
        assert_relative_eq!(*time, 5.0 * (n + 1) as f64, max_relative = 1e-9);
    }
}

#[test]
fn test_maximum_clamp_binds() {
    let mut sim = steady_simulation(TimeStepPolicy::adaptive().with_maximum(1.0), 3.0);
    let iterations = sim.run().unwrap();

    assert_eq!(iterations, 3);
    assert!(sim.clock().constraints().iter().all(|c| c.label() == MAXIMUM_LABEL && c.value() == 1.0));
    assert_eq!(sim.clock().time(), 3.0);
}

#[test]
fn test_minimum_clamp_binds() {
    let mut sim = steady_simulation(TimeStepPolicy::adaptive().with_minimum(3.0), 6.0);
    let iterations = sim.run().unwrap();

    assert_eq!(iterations, 2);
    assert!(sim.clock().constraints().iter().all(|c| c.label() == MINIMUM_LABEL));
    assert_eq!(sim.clock().time(), 6.0);
}

#[test]
fn test_fixed_policy_output_period() {
    let mut sim = steady_simulation(TimeStepPolicy::fixed(0.5).with_output_every(3), 1e9);
    sim.initialize().unwrap();

    let eligibility: Vec<bool> = (0..6)
        .map(|_| {
            sim.perform_full_iteration().unwrap();
            sim.is_output_eligible()
        })
        .collect();

    assert_eq!(eligibility, vec![true, false, false, true, false, false]);
    assert_eq!(sim.clock().time(), 3.0);
    assert!(sim.clock().constraints().iter().all(|c| c.label() == FIXED_LABEL));
}

#[test]
fn test_size_change_constraint_binds() {
    let (mut builder, ids) = monod_builder(BulkConcentration::constant(10.0), 0.5, 1.0, 0.5);
    builder.termination(TerminationCriteria::default().with_finish_time(1.0));
    let particles = MockParticles::new(ids.biomass, vec![0.1; 4]).with_size_change_limit(0.1);
    let mut sim = well_mixed_simulation(builder.build().unwrap(), particles);

    sim.initialize().unwrap();
    let dt = sim.perform_full_iteration().unwrap();

    assert_relative_eq!(dt, 0.22, max_relative = 1e-12);
    assert_eq!(sim.clock().last_constraint().map(|c| c.label()), Some("Global size change"));
}

#[test]
fn test_bulk_stability_bounds_relative_change() {
    let (mut builder, ids) = monod_builder(BulkConcentration::decreasing(1.0), 1.0, 1.0, 0.5);
    builder.termination(TerminationCriteria::default().with_finish_time(1.0));
    let particles = MockParticles::new(ids.biomass, vec![10.0; 5]);
    let mut sim = well_mixed_simulation(builder.build().unwrap(), particles);

    sim.run().unwrap();

    let solute = sim.scenario().solute("S").unwrap();
    let series = solute.bulk_series();
    for pair in series.windows(2) {
        assert!(pair[1] >= 0.05 * pair[0] * (1.0 - 1e-9), "step {:?} exceeds the allowed fraction", pair);
        assert!(pair[1] >= 1e-5);
    }
    assert!(sim.clock().constraints().iter().any(|c| c.label() == "S"));
    assert_eq!(solute.bulk_concentration(), 1e-5);
}

#[test]
fn test_reactor_geometry_scales_bulk_update() {
    let (mut builder, ids) = monod_builder(BulkConcentration::decreasing(10.0), 0.5, 1.0, 0.5);
    builder
        .geometry(ReactorGeometry::new(2.0, 4.0))
        .termination(TerminationCriteria::default().with_finish_time(1.0));
    let mut sim = well_mixed_simulation(builder.build().unwrap(), MockParticles::new(ids.biomass, vec![0.1; 4]));

    sim.initialize().unwrap();
    sim.perform_full_iteration().unwrap();

    // Half of the 0.8 units consumed in the computational volume
    assert_relative_eq!(sim.scenario().solute("S").unwrap().bulk_concentration(), 9.6, max_relative = 1e-12);
}

#[test]
fn test_policy_and_criteria_from_json() {
    let policy: TimeStepPolicy = serde_json::from_str(
        r#"{"mode": {"Fixed": {"step": 0.25, "output_every": null}}, "maximum": null, "minimum": null}"#,
    )
    .unwrap();
    let criteria: TerminationCriteria = serde_json::from_str(
        r#"{"finish_time": 1.0, "max_biovolume": 1e9, "max_height": 1e9, "consumption": null}"#,
    )
    .unwrap();

    let (mut builder, ids) = monod_builder(BulkConcentration::constant(10.0), 0.5, 1.0, 0.5);
    builder.policy(policy).termination(criteria);
    let mut sim = well_mixed_simulation(builder.build().unwrap(), MockParticles::new(ids.biomass, vec![0.1; 4]));

    assert_eq!(sim.run().unwrap(), 4);
    assert_eq!(sim.clock().time(), 1.0);
}

#[test]
fn test_invalid_policy_rejected_before_run() {
    let (mut builder, _) = monod_builder(BulkConcentration::constant(10.0), 0.5, 1.0, 0.5);
    builder.policy(TimeStepPolicy::adaptive().with_minimum(2.0).with_maximum(1.0));

    assert!(builder.build().is_err());
}
