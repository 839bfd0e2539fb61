//! Grid boundary conditions
//!
//! # Design Philosophy
//!
//! Fields live on padded grids (see [`crate::physics::FieldGrid`]): interior
//! cells `1..=n` on every axis plus one ghost cell per face. A boundary
//! condition is the rule that refreshes those ghost cells from the interior,
//! plus the knowledge of which cells belong to the solid carrier.
//!
//! Two geometries are provided:
//!
//! | Variant              | Axis 0 (height)                           | Axes 1, 2 |
//! |----------------------|-------------------------------------------|-----------|
//! | [`PlanarBoundaries`] | carrier at `i = 0`, zero flux at `n + 1`  | periodic  |
//! | [`GranuleBoundaries`]| periodic                                  | periodic  |
//!
//! A periodic axis copies interior layer `1` into ghost layer `n + 1` and
//! interior layer `n` into ghost layer `0`. Axes are refreshed in the order
//! 2, 1, 0 over full slices, so edge and corner ghosts are filled too.

use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, Result};

// =================================================================================================
// Contract
// =================================================================================================

/// Ghost-layer refresh rule and carrier geometry
pub trait BoundaryConditions: Send + Sync {
    /// Overwrite the ghost layer of a padded grid from its interior
    fn refresh_ghost_layer(&self, grid: &mut Array3<f64>);

    /// True when the padded index `(i, j, k)` is solid carrier
    fn is_carrier(&self, i: usize, j: usize, k: usize) -> bool;

    /// Name for diagnostics
    fn name(&self) -> &str;
}

/// Copy interior layer `1` into ghost `n + 1` and layer `n` into ghost `0`
fn wrap_axis(grid: &mut Array3<f64>, axis: usize) {
    let last = grid.len_of(Axis(axis)) - 2;

    let low = grid.index_axis(Axis(axis), 1).to_owned();
    let high = grid.index_axis(Axis(axis), last).to_owned();

    grid.index_axis_mut(Axis(axis), 0).assign(&high);
    grid.index_axis_mut(Axis(axis), last + 1).assign(&low);
}

// =================================================================================================
// Granule
// =================================================================================================

/// Periodic on all six faces, no carrier
///
/// Used for suspended aggregates (granules, flocs) that grow away from any
/// substratum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranuleBoundaries;

impl BoundaryConditions for GranuleBoundaries {
    fn refresh_ghost_layer(&self, grid: &mut Array3<f64>) {
        for axis in [2, 1, 0] {
            wrap_axis(grid, axis);
        }
    }

    fn is_carrier(&self, _i: usize, _j: usize, _k: usize) -> bool {
        false
    }

    fn name(&self) -> &str {
        "Granule"
    }
}

// =================================================================================================
// Planar
// =================================================================================================

/// What the carrier face imposes on the field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CarrierCondition {
    /// Ghost cells hold a constant value
    FixedValue(f64),

    /// Ghost cells mirror the first interior layer (no flux through the carrier)
    ZeroFlux,
}

impl fmt::Display for CarrierCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarrierCondition::FixedValue(v) => write!(f, "fixed value {v}"),
            CarrierCondition::ZeroFlux => write!(f, "zero flux"),
        }
    }
}

/// Biofilm on a flat carrier
///
/// The carrier is the `i = 0` plane, outside the computational domain.
/// The opposite face is zero flux; the lateral faces are periodic.
///
/// # Example
///
/// ```rust
/// use biofilm_rs::physics::FieldGrid;
/// use biofilm_rs::solver::{BoundaryConditions, CarrierCondition, PlanarBoundaries};
///
/// let planar = PlanarBoundaries::new(CarrierCondition::FixedValue(0.0));
/// let mut field = FieldGrid::uniform((4, 4, 1), 1.0, 2.0).unwrap();
/// field.refresh(&planar);
///
/// assert_eq!(field.get(0, 2, 1), 0.0);
/// assert_eq!(field.get(5, 2, 1), 2.0);
/// assert!(planar.is_carrier(0, 2, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarBoundaries {
    carrier: CarrierCondition,
}

impl PlanarBoundaries {
    /// Planar geometry with the given carrier condition
    pub fn new(carrier: CarrierCondition) -> Self {
        Self { carrier }
    }

    /// Carrier condition
    pub fn carrier(&self) -> CarrierCondition {
        self.carrier
    }

    /// Validate
    pub fn validate(&self) -> Result<()> {
        if let CarrierCondition::FixedValue(v) = self.carrier
            && !v.is_finite()
        {
            return Err(ModelError::invalid(format!("carrier value must be finite, got {v}")));
        }
        Ok(())
    }
}

impl BoundaryConditions for PlanarBoundaries {
    fn refresh_ghost_layer(&self, grid: &mut Array3<f64>) {
        wrap_axis(grid, 2);
        wrap_axis(grid, 1);

        let n = grid.len_of(Axis(0)) - 2;

        let top = grid.index_axis(Axis(0), n).to_owned();
        grid.index_axis_mut(Axis(0), n + 1).assign(&top);

        match self.carrier {
            CarrierCondition::FixedValue(value) => grid.index_axis_mut(Axis(0), 0).fill(value),
            CarrierCondition::ZeroFlux => {
                let bottom = grid.index_axis(Axis(0), 1).to_owned();
                grid.index_axis_mut(Axis(0), 0).assign(&bottom);
            }
        }
    }

    fn is_carrier(&self, i: usize, _j: usize, _k: usize) -> bool {
        i == 0
    }

    fn name(&self) -> &str {
        "Planar"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
