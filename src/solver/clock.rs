//! Simulation clock
//!
//! The clock owns the iteration counter, the simulated time and the
//! append-only histories of time points and winning constraints. The time
//! series starts with the initial time, so after `n` iterations it holds
//! `n + 1` entries while the constraint history holds `n`.

use crate::error::{ModelError, Result};
use crate::solver::{ResolvedStep, TimeStepConstraint};

/// Header matching [`SimulationClock::iteration_parameters`]
pub const ITERATION_PARAMETERS_HEADER: &str = "Iteration\tTime\tTime step\tConstraint";

/// Iteration counter, time and their histories
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    iteration: u64,
    time: f64,
    time_step: f64,
    time_series: Vec<f64>,
    constraints: Vec<TimeStepConstraint>,
    output_eligible: bool,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            iteration: 0,
            time: 0.0,
            time_step: 0.0,
            time_series: vec![0.0],
            constraints: Vec::new(),
            output_eligible: true,
        }
    }
}

impl SimulationClock {
    /// Clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock at an arbitrary start time
    pub fn starting_at(time: f64) -> Result<Self> {
        if !(time >= 0.0) || !time.is_finite() {
            return Err(ModelError::invalid(format!(
                "start time must be finite and >= 0, got {time}"
            )));
        }
        Ok(Self {
            time,
            time_series: vec![time],
            ..Self::default()
        })
    }

    /// Advance by a resolved step
    ///
    /// Increments the counter, advances the time and appends to both histories.
    pub fn commit(&mut self, step: ResolvedStep) -> Result<()> {
        let dt = step.value();
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(ModelError::NumericalStability {
                quantity: format!("time step ({})", step.constraint().label()),
                value: dt,
            });
        }

        let (constraint, output_eligible) = step.into_parts();

        self.iteration += 1;
        self.time += dt;
        self.time_step = dt;
        self.output_eligible = output_eligible;
        self.time_series.push(self.time);
        self.constraints.push(constraint);

        Ok(())
    }

    /// Completed iterations
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Simulated time
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step of the last iteration (zero before the first)
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Every time point, starting with the initial time
    pub fn time_series(&self) -> &[f64] {
        &self.time_series
    }

    /// Winning constraint of every iteration
    pub fn constraints(&self) -> &[TimeStepConstraint] {
        &self.constraints
    }

    /// Winning constraint of the last iteration
    pub fn last_constraint(&self) -> Option<&TimeStepConstraint> {
        self.constraints.last()
    }

    /// Whether the last iteration should be persisted
    pub fn output_eligible(&self) -> bool {
        self.output_eligible
    }

    /// Tab-separated summary of the last iteration
    pub fn iteration_parameters(&self) -> String {
        let label = self.last_constraint().map_or("Initial time point", TimeStepConstraint::label);
        format!("{}\t{}\t{}\t{}", self.iteration, self.time, self.time_step, label)
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn step(value: f64, label: &str) -> ResolvedStep {
        ResolvedStep::new(TimeStepConstraint::new(value, label), true)
    }

    #[test]
    fn test_initial_state() {
        let clock = SimulationClock::new();

        assert_eq!(clock.iteration(), 0);
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.time_series(), &[0.0]);
        assert!(clock.last_constraint().is_none());
        assert!(clock.output_eligible());
        assert_eq!(clock.iteration_parameters(), "0\t0\t0\tInitial time point");
    }

    #[test]
    fn test_commit_advances_by_exactly_one_iteration() {
        let mut clock = SimulationClock::starting_at(10.0).unwrap();
        clock.commit(step(2.0, "particle")).unwrap();

        assert_eq!(clock.iteration(), 1);
        assert_eq!(clock.time(), 12.0);
        assert_eq!(clock.time_step(), 2.0);
        assert_eq!(clock.time_series(), &[10.0, 12.0]);
        assert_eq!(clock.last_constraint().map(|c| c.label()), Some("particle"));
    }

    #[test]
    fn test_histories_stay_aligned() {
        let mut clock = SimulationClock::new();
        for (i, dt) in [0.5, 0.25, 1.0].into_iter().enumerate() {
            clock.commit(step(dt, "x")).unwrap();
            assert_eq!(clock.time_series().len(), i + 2);
            assert_eq!(clock.constraints().len(), i + 1);
        }

        let series = clock.time_series();
        for (i, c) in clock.constraints().iter().enumerate() {
            assert_eq!(series[i + 1], series[i] + c.value());
        }
    }

    #[test]
    fn test_commit_rejects_non_finite_step() {
        let mut clock = SimulationClock::new();

        assert!(clock.commit(step(f64::INFINITY, "x")).is_err());
        assert!(clock.commit(step(0.0, "x")).is_err());
        assert_eq!(clock.iteration(), 0);
    }

    #[test]
    fn test_invalid_start_time() {
        assert!(SimulationClock::starting_at(-1.0).is_err());
        assert!(SimulationClock::starting_at(f64::NAN).is_err());
    }
}
