//! Time-step resolution
//!
//! Every iteration advances the simulation by one step whose size is the
//! tightest of several independent bounds:
//!
//! 1. the particle doubling time (computed first, the size estimate uses it)
//! 2. the global biomass size change
//! 3. the bulk-concentration stability bound of every solute
//!
//! The resolver then applies the configured policy: snapping to compulsory
//! output boundaries, or a fixed step, and finally the maximum/minimum clamps.
//!
//! # Example
//!
//! ```rust
//! use biofilm_rs::solver::{SimulationClock, TimeStepConstraint, TimeStepPolicy, TimeStepResolver};
//! # use biofilm_rs::solver::ConstraintSource;
//! # use biofilm_rs::error::Result;
//! # struct Fixed;
//! # impl ConstraintSource for Fixed {
//! #     fn particle_doubling(&mut self) -> Result<TimeStepConstraint> { Ok(TimeStepConstraint::new(2.0, "particle")) }
//! #     fn global_size_change(&mut self) -> Result<TimeStepConstraint> { Ok(TimeStepConstraint::new(5.0, "size")) }
//! #     fn solute_constraints(&mut self) -> Result<Vec<TimeStepConstraint>> { Ok(vec![TimeStepConstraint::new(3.0, "S")]) }
//! # }
//!
//! let resolver = TimeStepResolver::new(TimeStepPolicy::adaptive().with_maximum(1.5)).unwrap();
//! let clock = SimulationClock::new();
//!
//! let step = resolver.resolve(&clock, &mut Fixed).unwrap();
//! assert_eq!(step.value(), 1.5);
//! assert_eq!(step.constraint().label(), "Maximum time step");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, Result};
use crate::solver::SimulationClock;

/// Label of a step snapped to a compulsory boundary
pub const COMPULSORY_LABEL: &str = "Compulsory time step";

/// Label of a step truncated to the configured maximum
pub const MAXIMUM_LABEL: &str = "Maximum time step";

/// Label of a step raised to the configured minimum
pub const MINIMUM_LABEL: &str = "Minimum time step";

/// Label of a step set by the fixed-step mode
pub const FIXED_LABEL: &str = "Fixed time step";

/// Relative gap below which the next compulsory boundary is skipped
pub const COMPULSORY_PRECISION: f64 = 1e-3;

// =================================================================================================
// Time step constraint
// =================================================================================================

/// A named upper bound on the time step
///
/// `value` is positive or `+∞` (no restriction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStepConstraint {
    value: f64,
    label: String,
}

impl TimeStepConstraint {
    /// Create a constraint
    pub fn new(value: f64, label: impl Into<String>) -> Self {
        Self { value, label: label.into() }
    }

    /// Constraint that restricts nothing
    pub fn unbounded(label: impl Into<String>) -> Self {
        Self::new(f64::INFINITY, label)
    }

    /// Bound on the step
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Name of the bound, for diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True for `+∞`
    pub fn is_unbounded(&self) -> bool {
        self.value == f64::INFINITY
    }

    /// Same constraint with a new value and label
    pub fn replaced(self, value: f64, label: &str) -> Self {
        Self::new(value, label)
    }

    /// Check `value > 0` (NaN fails)
    pub fn validate(&self) -> Result<()> {
        if self.value > 0.0 {
            Ok(())
        } else {
            Err(ModelError::InvalidConstraint {
                label: self.label.clone(),
                value: self.value,
            })
        }
    }

    /// Smallest constraint of a sequence; ties keep the first
    ///
    /// An empty sequence yields an unbounded constraint.
    ///
    /// # Example
    ///
    /// ```rust
    /// use biofilm_rs::solver::TimeStepConstraint;
    ///
    /// let winner = TimeStepConstraint::minimum([
    ///     TimeStepConstraint::new(3.0, "a"),
    ///     TimeStepConstraint::new(1.0, "b"),
    ///     TimeStepConstraint::new(1.0, "c"),
    /// ]);
    /// assert_eq!(winner.label(), "b");
    /// ```
    pub fn minimum<I>(constraints: I) -> Self
    where
        I: IntoIterator<Item = TimeStepConstraint>,
    {
        constraints
            .into_iter()
            .reduce(|best, next| if next.value < best.value { next } else { best })
            .unwrap_or_else(|| Self::unbounded("Unconstrained"))
    }
}

impl fmt::Display for TimeStepConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.label)
    }
}

// =================================================================================================
// Policy
// =================================================================================================

/// How the step size is chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeStepMode {
    /// Tightest of the physical constraints
    ///
    /// With `compulsory`, steps are snapped to multiples of that interval.
    Adaptive {
        compulsory: Option<f64>,
    },

    /// Constant step, bypassing the physical constraints
    ///
    /// With `output_every = Some(n)` only every `n`-th iteration is output-eligible.
    Fixed {
        step: f64,
        output_every: Option<u64>,
    },
}

impl TimeStepMode {
    /// Get name identifier
    pub fn name(&self) -> &str {
        match self {
            TimeStepMode::Adaptive { .. } => "Adaptive",
            TimeStepMode::Fixed { .. } => "Fixed",
        }
    }

    /// Validate that parameters are meaningful
    pub fn validate(&self) -> Result<()> {
        match self {
            TimeStepMode::Adaptive { compulsory } => {
                if let Some(dc) = compulsory
                    && !(*dc > 0.0 && dc.is_finite())
                {
                    return Err(ModelError::invalid(format!(
                        "compulsory time step must be positive and finite, got {dc}"
                    )));
                }
                Ok(())
            }
            TimeStepMode::Fixed { step, output_every } => {
                if !(*step > 0.0 && step.is_finite()) {
                    return Err(ModelError::invalid(format!(
                        "fixed time step must be positive and finite, got {step}"
                    )));
                }
                if *output_every == Some(0) {
                    return Err(ModelError::invalid("output period must be at least 1 iteration"));
                }
                Ok(())
            }
        }
    }
}

/// Time-step policy
///
/// # Examples
///
/// ```rust
/// use biofilm_rs::solver::TimeStepPolicy;
///
/// // Adaptive, snapped to 1 h output boundaries, never above 0.5 h
/// let policy = TimeStepPolicy::adaptive().with_compulsory(1.0).with_maximum(0.5);
/// assert!(policy.validate().is_ok());
///
/// // Fixed 0.1 h step, output every 10 iterations
/// let policy = TimeStepPolicy::fixed(0.1).with_output_every(10);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStepPolicy {
    pub mode: TimeStepMode,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
}

impl Default for TimeStepPolicy {
    fn default() -> Self {
        Self::adaptive()
    }
}

impl TimeStepPolicy {
    /// Adaptive resolution without compulsory step or clamps
    pub fn adaptive() -> Self {
        Self {
            mode: TimeStepMode::Adaptive { compulsory: None },
            maximum: None,
            minimum: None,
        }
    }

    /// Fixed step, every iteration output-eligible
    pub fn fixed(step: f64) -> Self {
        Self {
            mode: TimeStepMode::Fixed { step, output_every: None },
            maximum: None,
            minimum: None,
        }
    }

    /// Snap adaptive steps to multiples of `interval`
    ///
    /// Switches a fixed policy back to adaptive.
    pub fn with_compulsory(mut self, interval: f64) -> Self {
        self.mode = TimeStepMode::Adaptive { compulsory: Some(interval) };
        self
    }

    /// Output only every `n`-th iteration (fixed mode only)
    pub fn with_output_every(mut self, n: u64) -> Self {
        if let TimeStepMode::Fixed { output_every, .. } = &mut self.mode {
            *output_every = Some(n);
        }
        self
    }

    /// Truncate steps above `maximum`
    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Raise steps below `minimum`
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Validate
    pub fn validate(&self) -> Result<()> {
        self.mode.validate()?;

        if let Some(max) = self.maximum
            && !(max > 0.0)
        {
            return Err(ModelError::invalid(format!("maximum time step must be positive, got {max}")));
        }
        if let Some(min) = self.minimum
            && !(min > 0.0 && min.is_finite())
        {
            return Err(ModelError::invalid(format!(
                "minimum time step must be positive and finite, got {min}"
            )));
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum)
            && min > max
        {
            return Err(ModelError::invalid(format!(
                "minimum time step {min} exceeds maximum time step {max}"
            )));
        }
        Ok(())
    }
}

// =================================================================================================
// Resolver
// =================================================================================================

/// Supplier of the physical constraints of one iteration
///
/// The resolver queries in this order: particle doubling, global size
/// change, then solutes.
pub trait ConstraintSource {
    /// Minimum time for any particle to double its mass
    fn particle_doubling(&mut self) -> Result<TimeStepConstraint>;

    /// Bound on the relative change of the aggregate biomass size
    fn global_size_change(&mut self) -> Result<TimeStepConstraint>;

    /// Bulk-concentration stability bound of every solute
    fn solute_constraints(&mut self) -> Result<Vec<TimeStepConstraint>>;
}

/// Outcome of one resolution: the step and whether it may be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    constraint: TimeStepConstraint,
    output_eligible: bool,
}

impl ResolvedStep {
    /// Build from parts
    pub fn new(constraint: TimeStepConstraint, output_eligible: bool) -> Self {
        Self { constraint, output_eligible }
    }

    /// Step size
    pub fn value(&self) -> f64 {
        self.constraint.value()
    }

    /// Winning constraint
    pub fn constraint(&self) -> &TimeStepConstraint {
        &self.constraint
    }

    /// Whether an external writer should persist this iteration
    pub fn output_eligible(&self) -> bool {
        self.output_eligible
    }

    /// Split into parts
    pub fn into_parts(self) -> (TimeStepConstraint, bool) {
        (self.constraint, self.output_eligible)
    }
}

/// Resolves the step of each iteration under a [`TimeStepPolicy`]
#[derive(Debug, Clone)]
pub struct TimeStepResolver {
    policy: TimeStepPolicy,
}

impl TimeStepResolver {
    /// Create a resolver; the policy is validated
    pub fn new(policy: TimeStepPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// Active policy
    pub fn policy(&self) -> &TimeStepPolicy {
        &self.policy
    }

    /// Resolve the step of the iteration following `clock`
    ///
    /// Does not advance the clock.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidConstraint`] when a source returns a value `<= 0` or NaN
    /// - [`ModelError::Starvation`] when every constraint is unbounded
    pub fn resolve(&self, clock: &SimulationClock, source: &mut dyn ConstraintSource) -> Result<ResolvedStep> {
        let (mut constraint, output_eligible) = match &self.policy.mode {
            TimeStepMode::Adaptive { compulsory } => {
                let particle = checked(source.particle_doubling()?)?;
                let size = checked(source.global_size_change()?)?;

                let solutes = source
                    .solute_constraints()?
                    .into_iter()
                    .map(checked)
                    .collect::<Result<Vec<_>>>()?;
                let solute = TimeStepConstraint::minimum(solutes);

                let adaptive = TimeStepConstraint::minimum([particle, size, solute]);

                if adaptive.is_unbounded() {
                    log::error!(
                        "Iteration {}: unbounded time step ({}), biofilm is starving",
                        clock.iteration(),
                        adaptive.label()
                    );
                    return Err(ModelError::Starvation {
                        constraint: adaptive,
                        time: clock.time(),
                        iteration: clock.iteration(),
                    });
                }

                match compulsory {
                    Some(interval) => snap_to_compulsory(adaptive, clock.time(), *interval),
                    None => (adaptive, true),
                }
            }
            TimeStepMode::Fixed { step, output_every } => {
                let eligible = output_every.is_none_or(|n| clock.iteration() % n == 0);
                (TimeStepConstraint::new(*step, FIXED_LABEL), eligible)
            }
        };

        if let Some(maximum) = self.policy.maximum {
            let clamped = clamp_maximum(constraint.clone(), maximum);
            if clamped != constraint {
                log::warn!("Time step {} truncated to maximum {maximum}", constraint);
            }
            constraint = clamped;
        }
        if let Some(minimum) = self.policy.minimum {
            let raised = clamp_minimum(constraint.clone(), minimum);
            if raised != constraint {
                log::warn!("Time step {} raised to minimum {minimum}", constraint);
            }
            constraint = raised;
        }

        log::debug!(
            "Iteration {}: time step {} set by '{}'",
            clock.iteration() + 1,
            constraint.value(),
            constraint.label()
        );

        Ok(ResolvedStep::new(constraint, output_eligible))
    }
}

fn checked(constraint: TimeStepConstraint) -> Result<TimeStepConstraint> {
    constraint.validate()?;
    Ok(constraint)
}

// =================================================================================================
// Policy helpers
// =================================================================================================

/// Snap a step to the next multiple of `interval` after `time`
///
/// Returns the (possibly relabelled) constraint and the output-eligibility
/// of the iteration. A gap shorter than `1e-3 × step` is skipped in favour of
/// the following boundary.
pub fn snap_to_compulsory(constraint: TimeStepConstraint, time: f64, interval: f64) -> (TimeStepConstraint, bool) {
    let step = constraint.value();

    let mut next = ((time / interval).floor() + 1.0) * interval;
    let mut gap = next - time;

    if gap < step * COMPULSORY_PRECISION {
        next += interval;
        gap += interval;
    }

    if gap <= step || next == time + step {
        (constraint.replaced(gap, COMPULSORY_LABEL), true)
    } else {
        (constraint, false)
    }
}

/// Truncate to `maximum`, relabelling when it binds
pub fn clamp_maximum(constraint: TimeStepConstraint, maximum: f64) -> TimeStepConstraint {
    if constraint.value() > maximum {
        constraint.replaced(maximum, MAXIMUM_LABEL)
    } else {
        constraint
    }
}

/// Raise to `minimum`, relabelling when it binds
pub fn clamp_minimum(constraint: TimeStepConstraint, minimum: f64) -> TimeStepConstraint {
    if constraint.value() < minimum {
        constraint.replaced(minimum, MINIMUM_LABEL)
    } else {
        constraint
    }
}

// =================================================================================================
// Tests
// =================================================================================================
