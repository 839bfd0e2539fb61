//! Stopping criteria
//!
//! A run stops as soon as any of these holds:
//!
//! - `time >= finish_time`
//! - a manual stop was requested
//! - `biovolume >= max_biovolume`
//! - `height > max_height`
//! - the consumption criterion is met
//!
//! Every threshold defaults to `+∞` (never triggers).
//!
//! # Consumption criterion
//!
//! When configured, each evaluation adds the designated solute's latest
//! global rate to a running total and reports `total <= threshold`. Since
//! consumption rates are negative, a negative threshold means "stop once
//! this much has been consumed". The accumulation happens on *every*
//! evaluation, so evaluating twice in one iteration counts the rate twice.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Stop on the cumulative rate of one solute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionCriterion {
    /// Name of the solute whose rate is accumulated
    pub solute: String,
    /// Stop once the running total is `<=` this value
    pub threshold: f64,
}

/// Thresholds of the stopping predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationCriteria {
    pub finish_time: f64,
    pub max_biovolume: f64,
    pub max_height: f64,
    pub consumption: Option<ConsumptionCriterion>,
}

impl Default for TerminationCriteria {
    fn default() -> Self {
        Self {
            finish_time: f64::INFINITY,
            max_biovolume: f64::INFINITY,
            max_height: f64::INFINITY,
            consumption: None,
        }
    }
}

impl TerminationCriteria {
    /// Stop at `time`
    pub fn with_finish_time(mut self, time: f64) -> Self {
        self.finish_time = time;
        self
    }

    /// Stop at `biovolume`
    pub fn with_max_biovolume(mut self, biovolume: f64) -> Self {
        self.max_biovolume = biovolume;
        self
    }

    /// Stop above `height`
    pub fn with_max_height(mut self, height: f64) -> Self {
        self.max_height = height;
        self
    }

    /// Stop on the cumulative rate of `solute`
    pub fn with_consumption(mut self, solute: impl Into<String>, threshold: f64) -> Self {
        self.consumption = Some(ConsumptionCriterion {
            solute: solute.into(),
            threshold,
        });
        self
    }

    /// Validate (NaN thresholds are rejected)
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("finish time", self.finish_time),
            ("maximum biovolume", self.max_biovolume),
            ("maximum height", self.max_height),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ModelError::invalid(format!("{name} must be >= 0, got {value}")));
            }
        }
        if let Some(consumption) = &self.consumption
            && consumption.threshold.is_nan()
        {
            return Err(ModelError::invalid(format!(
                "consumption threshold for '{}' is NaN",
                consumption.solute
            )));
        }
        Ok(())
    }
}

/// State inspected by the evaluator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationSnapshot {
    pub time: f64,
    pub biovolume: f64,
    pub height: f64,
    /// Latest global rate of the consumption solute, when one is configured
    pub consumption_rate: Option<f64>,
}

/// Evaluates [`TerminationCriteria`] every iteration
#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    criteria: TerminationCriteria,
    manual_stop: bool,
    cumulative_consumption: f64,
}

impl TerminationEvaluator {
    /// Create an evaluator; the criteria are validated
    pub fn new(criteria: TerminationCriteria) -> Result<Self> {
        criteria.validate()?;
        Ok(Self {
            criteria,
            manual_stop: false,
            cumulative_consumption: 0.0,
        })
    }

    /// Thresholds
    pub fn criteria(&self) -> &TerminationCriteria {
        &self.criteria
    }

    /// Raise the manual stop flag
    pub fn request_stop(&mut self) {
        self.manual_stop = true;
    }

    /// Manual stop flag
    pub fn stop_requested(&self) -> bool {
        self.manual_stop
    }

    /// Running total of the consumption criterion
    pub fn cumulative_consumption(&self) -> f64 {
        self.cumulative_consumption
    }

    /// Evaluate every predicate
    ///
    /// All predicates are evaluated, including the consumption accumulation,
    /// even when an earlier one already holds.
    pub fn should_stop(&mut self, snapshot: &TerminationSnapshot) -> bool {
        let finished = snapshot.time >= self.criteria.finish_time;
        let biovolume = snapshot.biovolume >= self.criteria.max_biovolume;
        let height = snapshot.height > self.criteria.max_height;
        let consumed = self.consumption_met(snapshot.consumption_rate);

        let stop = finished | self.manual_stop | biovolume | height | consumed;
        if stop {
            log::info!(
                "Stopping at time {}: finished={finished}, manual={}, biovolume={biovolume}, height={height}, consumption={consumed}",
                snapshot.time,
                self.manual_stop
            );
        }
        stop
    }

    fn consumption_met(&mut self, rate: Option<f64>) -> bool {
        let Some(criterion) = &self.criteria.consumption else {
            return false;
        };
        let Some(rate) = rate else {
            log::warn!("No rate available for consumption criterion on '{}'", criterion.solute);
            return false;
        };

        self.cumulative_consumption += rate;
        self.cumulative_consumption <= criterion.threshold
    }
}

// =================================================================================================
// Tests
// =================================================================================================
