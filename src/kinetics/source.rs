//! Source terms for the field solver
//!
//! The field solver needs, for every solute, the net reaction rate in each
//! grid cell, and the reactor mass balance needs every reaction's
//! domain-integrated rate. [`SourceTermEvaluator`] provides both over the
//! non-carrier interior cells of a [`FieldSet`].
//!
//! # Parallelism
//!
//! Per-cell rate fields are independent, so with the `parallel` feature they
//! are computed with rayon once the number of active cells exceeds
//! [`crate::solver::parallel_threshold`]. Global-rate integration is always
//! folded sequentially in cell order so accumulated values do not depend on
//! thread scheduling.

use crate::error::{ModelError, Result};
use crate::kinetics::{NetReaction, Reaction, ReactionRegistry};
use crate::physics::{FieldGrid, FieldSet, SpeciesId};
use crate::solver::BoundaryConditions;

/// Evaluates reactions over the active cells of a field set
pub struct SourceTermEvaluator<'a> {
    fields: &'a FieldSet,
    cells: Vec<(usize, usize, usize)>,
}

impl<'a> SourceTermEvaluator<'a> {
    /// Collect the interior cells that are not carrier
    pub fn new(fields: &'a FieldSet, conditions: &dyn BoundaryConditions) -> Result<Self> {
        let template = fields
            .template()
            .ok_or_else(|| ModelError::invalid("source terms need at least one field"))?;

        let cells = template
            .interior_indices()
            .filter(|&(i, j, k)| !conditions.is_carrier(i, j, k))
            .collect();

        Ok(Self { fields, cells })
    }

    /// Number of cells visited
    pub fn active_cells(&self) -> usize {
        self.cells.len()
    }

    /// Net local rate in every active cell; carrier and ghost cells hold zero
    pub fn net_rate_field(&self, net: &NetReaction, registry: &ReactionRegistry) -> Result<FieldGrid> {
        let terms = net.resolve(registry)?;
        self.map_cells(|cell| {
            terms.iter().map(|(r, nu)| nu * r.local_rate(cell)).sum()
        })
    }

    /// Net rate derivative in every active cell
    pub fn rate_derivative_field(
        &self,
        net: &NetReaction,
        registry: &ReactionRegistry,
        with_respect_to: SpeciesId,
    ) -> Result<FieldGrid> {
        let terms = net.resolve(registry)?;
        self.map_cells(|cell| {
            terms
                .iter()
                .map(|(r, nu)| nu * r.rate_derivative(cell, with_respect_to))
                .sum()
        })
    }

    /// Add `local_rate × cell_volume` of every active cell to each reaction's accumulator
    pub fn accumulate_global_rates(&self, registry: &mut ReactionRegistry) -> Result<()> {
        let volume = self.cell_volume()?;

        for reaction in registry.iter_mut() {
            self.accumulate_reaction(reaction, volume);
        }
        Ok(())
    }

    fn accumulate_reaction(&self, reaction: &mut Reaction, volume: f64) {
        for &(i, j, k) in &self.cells {
            let rate = reaction.local_rate(&self.fields.cell(i, j, k));
            reaction.accumulate(rate, volume);
        }

        let total = reaction.global_rate();
        if !total.is_finite() {
            log::warn!("Reaction '{}' accumulated a non-finite global rate {total}", reaction.name());
        }
    }

    fn cell_volume(&self) -> Result<f64> {
        self.fields
            .template()
            .map(FieldGrid::cell_volume)
            .ok_or_else(|| ModelError::invalid("source terms need at least one field"))
    }

    // Shared kernel for per-cell fields: sequential below the threshold,
    // rayon above it when the feature is compiled in.
    fn map_cells<F>(&self, kernel: F) -> Result<FieldGrid>
    where
        F: Fn(&crate::physics::CellConcentrations<'_>) -> f64 + Sync,
    {
        let template = self
            .fields
            .template()
            .ok_or_else(|| ModelError::invalid("source terms need at least one field"))?;
        let mut output = FieldGrid::uniform(template.interior_dims(), template.voxel_side(), 0.0)?;

        let evaluate = |&(i, j, k): &(usize, usize, usize)| kernel(&self.fields.cell(i, j, k));

        let values: Vec<f64> = if self.cells.len() > crate::solver::parallel_threshold() {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                self.cells.par_iter().map(evaluate).collect()
            }
            #[cfg(not(feature = "parallel"))]
            {
                self.cells.iter().map(evaluate).collect()
            }
        } else {
            self.cells.iter().map(evaluate).collect()
        };

        for (&(i, j, k), value) in self.cells.iter().zip(values) {
            output.set(i, j, k, value);
        }
        Ok(output)
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::{KineticFactor, Reaction};
    use crate::solver::{CarrierCondition, GranuleBoundaries, PlanarBoundaries, ThresholdGuard};
    use approx::assert_relative_eq;

    const S: SpeciesId = SpeciesId(0);
    const X: SpeciesId = SpeciesId(1);

    fn fields(n: usize) -> FieldSet {
        let mut set = FieldSet::new();
        set.insert(S, FieldGrid::uniform((n, 2, 1), 0.5, 1.0).unwrap()).unwrap();
        set.insert(X, FieldGrid::uniform((n, 2, 1), 0.5, 2.0).unwrap()).unwrap();
        set
    }

    fn registry() -> (ReactionRegistry, NetReaction) {
        let mut registry = ReactionRegistry::new();
        let growth = registry
            .add(Reaction::catalyzed("growth", X, 1.0).with_factor(KineticFactor::saturation(S, 1.0)))
            .unwrap();
        (registry, NetReaction::new().with_term(growth, -2.0))
    }

    #[test]
    fn test_net_rate_field_uniform() {
        let fields = fields(3);
        let (registry, net) = registry();
        let evaluator = SourceTermEvaluator::new(&fields, &GranuleBoundaries).unwrap();

        let rates = evaluator.net_rate_field(&net, &registry).unwrap();

        assert_eq!(evaluator.active_cells(), 6);
        for (i, j, k) in rates.interior_indices() {
            // -2 * (1 * 2 * 0.5)
            assert_relative_eq!(rates.get(i, j, k), -2.0);
        }
        assert_eq!(rates.get(0, 0, 0), 0.0);
    }

    #[test]
    fn test_carrier_cells_are_skipped() {
        let fields = fields(3);
        let (mut registry, net) = registry();
        let planar = PlanarBoundaries::new(CarrierCondition::ZeroFlux);
        let evaluator = SourceTermEvaluator::new(&fields, &planar).unwrap();

        // Interior cells sit at i >= 1, so the carrier plane holds no interior cell
        assert_eq!(evaluator.active_cells(), 6);

        evaluator.accumulate_global_rates(&mut registry).unwrap();
        let growth = registry.get(net.terms()[0].0).unwrap();
        // 6 cells * rate 1 * volume 0.125
        assert_relative_eq!(growth.global_rate(), 0.75);
        assert_relative_eq!(net.global_rate(&registry).unwrap(), -1.5);
    }

    #[test]
    fn test_accumulation_adds_to_existing_total() {
        let fields = fields(2);
        let (mut registry, net) = registry();
        let evaluator = SourceTermEvaluator::new(&fields, &GranuleBoundaries).unwrap();

        evaluator.accumulate_global_rates(&mut registry).unwrap();
        evaluator.accumulate_global_rates(&mut registry).unwrap();

        assert_relative_eq!(net.global_rate(&registry).unwrap(), -2.0);

        registry.reset_global_rates();
        assert_eq!(net.global_rate(&registry).unwrap(), 0.0);
    }

    #[test]
    fn test_rate_derivative_field() {
        let fields = fields(2);
        let (registry, net) = registry();
        let evaluator = SourceTermEvaluator::new(&fields, &GranuleBoundaries).unwrap();

        let derivative = evaluator.rate_derivative_field(&net, &registry, S).unwrap();
        // -2 * 2 * 1/4
        assert_relative_eq!(derivative.get(1, 1, 1), -1.0);
    }

    #[test]
    fn test_same_result_above_threshold() {
        let fields = fields(8);
        let (registry, net) = registry();
        let evaluator = SourceTermEvaluator::new(&fields, &GranuleBoundaries).unwrap();

        let below = evaluator.net_rate_field(&net, &registry).unwrap();
        let _guard = ThresholdGuard::save(1);
        let above = evaluator.net_rate_field(&net, &registry).unwrap();

        assert_eq!(below, above);
    }

    #[test]
    fn test_empty_field_set_rejected() {
        let empty = FieldSet::new();
        assert!(SourceTermEvaluator::new(&empty, &GranuleBoundaries).is_err());
    }
}
