//! Performance benchmarks for rate evaluation over grids
//!
//! The field solver asks for a net-rate field per solute on every
//! relaxation sweep, so per-cell kinetics dominate the cost of an iteration.
//!
//! # What We're Measuring
//!
//! 1. **Net rate field**: one `NetReaction` over every active cell
//! 2. **Global rate integration**: every reaction summed over the grid
//! 3. **Threshold crossover**: sequential vs parallel evaluation of the same
//!    grid (only differs when built with `--features parallel`)
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench --bench kinetics_performance
//!
//! # With rayon
//! cargo bench --bench kinetics_performance --features parallel
//!
//! # Only the crossover group
//! cargo bench --bench kinetics_performance crossover
//! ```
//!
//! # Expected Results
//!
//! Time scales linearly with the number of cells. With `parallel`, grids
//! above the threshold should gain roughly the core count on the rate
//! field; integration stays sequential and does not.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use biofilm_rs::kinetics::{KineticFactor, NetReaction, Reaction, ReactionRegistry, SourceTermEvaluator};
use biofilm_rs::physics::{FieldGrid, FieldSet, SpeciesKind, SpeciesRegistry};
use biofilm_rs::solver::{parallel_threshold, set_parallel_threshold, CarrierCondition, PlanarBoundaries};

// =================================================================================================
// Kinetic Setup
// =================================================================================================

/// Nitrifying biofilm: ammonium and oxygen consumed by one autotroph
///
/// Two saturation factors and a step keep the per-cell
/// work representative of real scenarios.
struct Setup {
    fields: FieldSet,
    registry: ReactionRegistry,
    oxygen_net: NetReaction,
}

fn setup(side: usize) -> Setup {
    let mut species = SpeciesRegistry::new();
    let ammonium = species.register("NH4", SpeciesKind::Solute).unwrap();
    let oxygen = species.register("O2", SpeciesKind::Solute).unwrap();
    let autotroph = species.register("AOB", SpeciesKind::Particulate).unwrap();

    let mut registry = ReactionRegistry::new();
    let growth = registry
        .add(
            Reaction::catalyzed("nitrification", autotroph, 0.08)
                .with_factor(KineticFactor::saturation(ammonium, 1.5))
                .with_factor(KineticFactor::saturation(oxygen, 0.5))
                .with_factor(KineticFactor::step(ammonium, 1e-3)),
        )
        .unwrap();
    registry.add(Reaction::catalyzed("decay", autotroph, 0.01)).unwrap();

    let mut fields = FieldSet::new();
    let dims = (side, side, side);
    fields.insert(ammonium, ramp(dims, 4.0)).unwrap();
    fields.insert(oxygen, ramp(dims, 8.0)).unwrap();
    fields.insert(autotroph, FieldGrid::uniform(dims, 4e-6, 150.0).unwrap()).unwrap();

    let oxygen_net = NetReaction::new().with_term(growth, -3.43 / 0.15);

    Setup { fields, registry, oxygen_net }
}

/// Concentration rising linearly with height
fn ramp(dims: (usize, usize, usize), top: f64) -> FieldGrid {
    let mut grid = FieldGrid::uniform(dims, 4e-6, 0.0).unwrap();
    let n = dims.0 as f64;
    for (i, j, k) in grid.interior_indices() {
        grid.set(i, j, k, top * i as f64 / n);
    }
    grid
}

fn carrier() -> PlanarBoundaries {
    PlanarBoundaries::new(CarrierCondition::ZeroFlux)
}

// =================================================================================================
// Benchmarks
// =================================================================================================

/// Net rate field for grid sides 8, 16, 32 (512 to 32768 cells)
fn benchmark_net_rate_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("Net rate field");

    for side in [8, 16, 32].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(side), side, |b, &side| {
            let setup = setup(side);
            let boundaries = carrier();
            let evaluator = SourceTermEvaluator::new(&setup.fields, &boundaries).unwrap();

            b.iter(|| {
                evaluator
                    .net_rate_field(black_box(&setup.oxygen_net), black_box(&setup.registry))
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Global-rate integration of every reaction
fn benchmark_global_rates(c: &mut Criterion) {
    let mut group = c.benchmark_group("Global rate integration");

    for side in [8, 16, 32].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(side), side, |b, &side| {
            let mut setup = setup(side);
            let boundaries = carrier();

            b.iter(|| {
                setup.registry.reset_global_rates();
                let evaluator = SourceTermEvaluator::new(&setup.fields, &boundaries).unwrap();
                evaluator.accumulate_global_rates(black_box(&mut setup.registry)).unwrap();
            });
        });
    }

    group.finish();
}

/// Same 32³ grid evaluated below and above the parallel threshold
fn benchmark_threshold_crossover(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossover");
    let setup = setup(32);
    let boundaries = carrier();
    let evaluator = SourceTermEvaluator::new(&setup.fields, &boundaries).unwrap();
    let previous = parallel_threshold();

    for (name, threshold) in [("sequential", usize::MAX), ("parallel", 1)] {
        set_parallel_threshold(threshold);
        group.bench_function(name, |b| {
            b.iter(|| {
                evaluator
                    .net_rate_field(black_box(&setup.oxygen_net), black_box(&setup.registry))
                    .unwrap()
            });
        });
    }

    set_parallel_threshold(previous);
    group.finish();
}

criterion_group!(
    benches,
    benchmark_net_rate_field,
    benchmark_global_rates,
    benchmark_threshold_crossover,
);
criterion_main!(benches);
