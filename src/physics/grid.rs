//! Padded scalar fields
//!
//! A [`FieldGrid`] stores one scalar field (a solute concentration, a
//! particulate density) on a regular 3-D grid with **one ghost cell on every
//! face**. Interior cells are indexed `1..=n`, `1..=m`, `1..=l`; indices `0`
//! and `n + 1` (resp. `m + 1`, `l + 1`) form the ghost layer that boundary
//! conditions refresh.
//!
//! 2-D systems use `l = 1`.
//!
//! # Memory Layout
//!
//! Storage is an `ndarray::Array3<f64>` of shape `(n + 2, m + 2, l + 2)`.
//!
//! A [`FieldSet`] groups the grids of several species sharing one geometry
//! and hands out a [`Concentrations`] view of any cell.

use ndarray::Array3;

use crate::error::{ModelError, Result};
use crate::physics::{Concentrations, SpeciesId};
use crate::solver::BoundaryConditions;

/// Scalar field on a padded regular grid
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid {
    data: Array3<f64>,
    voxel_side: f64,
}

impl FieldGrid {
    /// Create a uniform field with `(n, m, l)` interior cells
    pub fn uniform(interior: (usize, usize, usize), voxel_side: f64, value: f64) -> Result<Self> {
        let (n, m, l) = interior;

        if n == 0 || m == 0 || l == 0 {
            return Err(ModelError::invalid(format!(
                "grid must have at least one interior cell per axis, got ({n}, {m}, {l})"
            )));
        }
        if !(voxel_side > 0.0) || !voxel_side.is_finite() {
            return Err(ModelError::invalid(format!(
                "voxel side must be positive and finite, got {voxel_side}"
            )));
        }

        Ok(Self {
            data: Array3::from_elem((n + 2, m + 2, l + 2), value),
            voxel_side,
        })
    }

    /// Wrap an existing padded array
    pub fn from_padded(data: Array3<f64>, voxel_side: f64) -> Result<Self> {
        let shape = data.shape();
        if shape.iter().any(|&s| s < 3) {
            return Err(ModelError::invalid(format!(
                "padded array must be at least 3 cells per axis, got {shape:?}"
            )));
        }
        if !(voxel_side > 0.0) {
            return Err(ModelError::invalid(format!(
                "voxel side must be positive, got {voxel_side}"
            )));
        }
        Ok(Self { data, voxel_side })
    }

    /// Interior dimensions `(n, m, l)`
    pub fn interior_dims(&self) -> (usize, usize, usize) {
        let (a, b, c) = self.data.dim();
        (a - 2, b - 2, c - 2)
    }

    /// Edge length of one grid cell
    pub fn voxel_side(&self) -> f64 {
        self.voxel_side
    }

    /// Volume of one grid cell
    pub fn cell_volume(&self) -> f64 {
        self.voxel_side.powi(3)
    }

    /// Value at a padded index
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[[i, j, k]]
    }

    /// Set the value at a padded index
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        self.data[[i, j, k]] = value;
    }

    /// Padded storage
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Mutable padded storage
    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    /// Iterate over interior indices in row-major order
    pub fn interior_indices(&self) -> impl Iterator<Item = (usize, usize, usize)> + use<> {
        let (n, m, l) = self.interior_dims();
        (1..=n).flat_map(move |i| (1..=m).flat_map(move |j| (1..=l).map(move |k| (i, j, k))))
    }

    /// Maximum over interior cells
    pub fn interior_maximum(&self) -> f64 {
        self.interior_indices()
            .map(|(i, j, k)| self.get(i, j, k))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sum over interior cells multiplied by the cell volume
    pub fn integrate(&self) -> f64 {
        let sum: f64 = self.interior_indices().map(|(i, j, k)| self.get(i, j, k)).sum();
        sum * self.cell_volume()
    }

    /// Refresh the ghost layer with the given boundary conditions
    pub fn refresh(&mut self, conditions: &dyn BoundaryConditions) {
        conditions.refresh_ghost_layer(&mut self.data);
    }
}

// =================================================================================================
// Field sets
// =================================================================================================

/// Grids of several species on a common geometry
///
/// Species without a grid read as zero. Maxima are cached per grid and
/// refreshed by [`FieldSet::refresh_maxima`] after the fields change.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    entries: Vec<(SpeciesId, FieldGrid, f64)>,
}

impl FieldSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the grid of one species
    ///
    /// All grids must share interior dimensions and voxel side.
    pub fn insert(&mut self, species: SpeciesId, grid: FieldGrid) -> Result<()> {
        if let Some((_, first, _)) = self.entries.first()
            && (first.interior_dims() != grid.interior_dims() || first.voxel_side() != grid.voxel_side())
        {
            return Err(ModelError::invalid(format!(
                "grid of species {species} has geometry {:?}/{} but the set uses {:?}/{}",
                grid.interior_dims(),
                grid.voxel_side(),
                first.interior_dims(),
                first.voxel_side()
            )));
        }

        let maximum = grid.interior_maximum();
        match self.entries.iter_mut().find(|(id, _, _)| *id == species) {
            Some(entry) => *entry = (species, grid, maximum),
            None => self.entries.push((species, grid, maximum)),
        }
        Ok(())
    }

    /// Grid of one species
    pub fn get(&self, species: SpeciesId) -> Option<&FieldGrid> {
        self.entries.iter().find(|(id, _, _)| *id == species).map(|(_, g, _)| g)
    }

    /// Mutable grid of one species
    pub fn get_mut(&mut self, species: SpeciesId) -> Option<&mut FieldGrid> {
        self.entries.iter_mut().find(|(id, _, _)| *id == species).map(|(_, g, _)| g)
    }

    /// Species with a grid, in insertion order
    pub fn species(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.entries.iter().map(|(id, _, _)| *id)
    }

    /// Geometry template (the first grid), if any
    pub fn template(&self) -> Option<&FieldGrid> {
        self.entries.first().map(|(_, g, _)| g)
    }

    /// Recompute the cached interior maxima
    pub fn refresh_maxima(&mut self) {
        for (_, grid, maximum) in &mut self.entries {
            *maximum = grid.interior_maximum();
        }
    }

    /// Refresh every ghost layer
    pub fn refresh_ghost_layers(&mut self, conditions: &dyn BoundaryConditions) {
        for (_, grid, _) in &mut self.entries {
            grid.refresh(conditions);
        }
    }

    /// Concentration view of one padded cell
    pub fn cell(&self, i: usize, j: usize, k: usize) -> CellConcentrations<'_> {
        CellConcentrations { fields: self, index: (i, j, k) }
    }

    /// Number of grids
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only view of every field at one cell
#[derive(Debug, Clone, Copy)]
pub struct CellConcentrations<'a> {
    fields: &'a FieldSet,
    index: (usize, usize, usize),
}

impl Concentrations for CellConcentrations<'_> {
    fn value(&self, species: SpeciesId) -> f64 {
        let (i, j, k) = self.index;
        self.fields.get(species).map_or(0.0, |g| g.get(i, j, k))
    }

    fn maximum(&self, species: SpeciesId) -> f64 {
        self.fields
            .entries
            .iter()
            .find(|(id, _, _)| *id == species)
            .map_or(0.0, |(_, _, m)| *m)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
