//! Common utilities for integration tests

pub mod mock_collaborators;
pub mod test_helpers;

// Re-export commonly used items
pub use mock_collaborators::{MockParticles, WellMixedFieldSolver};
pub use test_helpers::{
    monod_builder,
    relative_error,
    well_mixed_simulation,
    MonodIds,
};
