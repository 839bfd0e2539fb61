//! Error types for biofilm-rs
//!
//! Every fallible operation in the crate returns [`Result`], whose error
//! type is the strongly typed [`ModelError`]. Callers can match on the
//! variant to decide whether to abort a run, reconfigure a scenario or
//! report a collaborator failure.
//!
//! # Taxonomy
//!
//! | Variant                | When                                            | Recoverable |
//! |------------------------|-------------------------------------------------|-------------|
//! | `InvalidConfiguration` | Malformed thresholds detected at setup          | No          |
//! | `UnknownSpecies`       | A name does not resolve to a registered species | No          |
//! | `DuplicateSpecies`     | Two species registered under the same name      | No          |
//! | `UnknownReaction`      | A net reaction references an unknown reaction   | No          |
//! | `InvalidConstraint`    | A collaborator returned a step bound `<= 0`     | No          |
//! | `Starvation`           | Resolved time step is infinite                  | No (fatal)  |
//! | `NumericalStability`   | NaN or infinity in an integrated quantity       | No          |
//! | `PhaseFailed`          | A collaborator failed during an iteration phase | Caller      |
//!
//! Relative-change stability limits never surface as errors: the time-step
//! resolver always lowers the step instead.

use thiserror::Error;

use crate::solver::{IterationPhase, TimeStepConstraint};

/// Errors raised by the simulation kernel.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        reason: String,
    },

    #[error("Unknown species '{name}'")]
    UnknownSpecies {
        name: String,
    },

    #[error("Species '{name}' is already registered")]
    DuplicateSpecies {
        name: String,
    },

    #[error("Unknown reaction id {id}")]
    UnknownReaction {
        id: usize,
    },

    #[error("Time step constraint '{label}' has non-positive value {value}")]
    InvalidConstraint {
        label: String,
        value: f64,
    },

    #[error("Biofilm is not growing for lack of nutrients (iteration {iteration}, time {time}, constraint '{}')", .constraint.label())]
    Starvation {
        constraint: TimeStepConstraint,
        time: f64,
        iteration: u64,
    },

    #[error("Non-finite value {value} detected in {quantity}")]
    NumericalStability {
        quantity: String,
        value: f64,
    },

    #[error("Phase {phase} failed: {source}")]
    PhaseFailed {
        phase: IterationPhase,
        #[source]
        source: Box<ModelError>,
    },
}

impl ModelError {
    /// Shorthand for [`ModelError::InvalidConfiguration`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }

    /// True when the error is (or wraps) a starvation fault.
    pub fn is_starvation(&self) -> bool {
        match self {
            ModelError::Starvation { .. } => true,
            ModelError::PhaseFailed { source, .. } => source.is_starvation(),
            _ => false,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ModelError>;
