//! Bulk concentration integrators
//!
//! The bulk liquid of the reactor is well mixed: each solute has one bulk
//! concentration that changes with the domain-integrated consumption or
//! production of that solute. The update is a forward Euler step
//!
//! $$C^{n+1} = C^n + \Delta t \cdot \frac{V_{mult}}{V_{reactor}} \cdot R$$
//!
//! where $R$ is the global rate per computational volume and the ratio
//! converts it into a rate per reactor volume.
//!
//! # Stability
//!
//! Explicit Euler can overshoot. The companion bound
//!
//! $$\Delta t_{max} = f_{max} \frac{C}{|r|}$$
//!
//! keeps the relative change of one step below `max_fraction`, and is handed
//! to the time-step resolver rather than enforced here. Near the precision
//! floor no bound is needed: the value is clamped instead.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Concentration below which a solute is treated as exhausted
pub const DEFAULT_PRECISION: f64 = 1e-5;

/// Largest relative change allowed in one step
pub const DEFAULT_MAX_FRACTION: f64 = 0.95;

/// Reactor-scale concentration of one solute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BulkConcentration {
    /// Held constant (chemostat feed, fixed boundary)
    Constant {
        value: f64,
    },

    /// Depleted (or enriched) by the biofilm's net rate
    Decreasing {
        value: f64,
        precision: f64,
        max_fraction: f64,
    },
}

impl BulkConcentration {
    /// Constant bulk value
    pub fn constant(value: f64) -> Self {
        Self::Constant { value }
    }

    /// Integrated bulk value with default precision and fraction
    pub fn decreasing(initial: f64) -> Self {
        Self::decreasing_with(initial, DEFAULT_PRECISION, DEFAULT_MAX_FRACTION)
    }

    /// Integrated bulk value with explicit precision floor and fraction
    pub fn decreasing_with(initial: f64, precision: f64, max_fraction: f64) -> Self {
        Self::Decreasing {
            value: initial,
            precision,
            max_fraction,
        }
    }

    /// Current value
    pub fn value(&self) -> f64 {
        match self {
            BulkConcentration::Constant { value } | BulkConcentration::Decreasing { value, .. } => *value,
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            BulkConcentration::Constant { value } => {
                if !(*value >= 0.0) || !value.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "bulk concentration must be finite and >= 0, got {value}"
                    )));
                }
            }
            BulkConcentration::Decreasing { value, precision, max_fraction } => {
                if !(*value >= 0.0) || !value.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "initial bulk concentration must be finite and >= 0, got {value}"
                    )));
                }
                if !(*precision >= 0.0) || !precision.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "bulk precision must be finite and >= 0, got {precision}"
                    )));
                }
                if !(*max_fraction > 0.0 && *max_fraction <= 1.0) {
                    return Err(ModelError::invalid(format!(
                        "maximum fraction must lie in (0, 1], got {max_fraction}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Advance by one explicit step and return the new value
    ///
    /// `global_rate` is per computational volume; `rate_scale` is the
    /// computational-volume multiplier over the reactor volume.
    pub fn advance(&mut self, dt: f64, global_rate: f64, rate_scale: f64) -> Result<f64> {
        match self {
            BulkConcentration::Constant { value } => Ok(*value),
            BulkConcentration::Decreasing { value, precision, .. } => {
                let mut next = *value + dt * rate_scale * global_rate;

                if next.is_nan() || next.is_infinite() {
                    return Err(ModelError::NumericalStability {
                        quantity: "bulk concentration".to_string(),
                        value: next,
                    });
                }

                if next <= *precision {
                    if next < *precision {
                        log::warn!("Bulk concentration {next} clamped to precision floor {precision}");
                    }
                    next = *precision;
                }

                *value = next;
                Ok(next)
            }
        }
    }

    /// Largest step keeping the relative change below `max_fraction`
    ///
    /// `+∞` for constant values, at or below the precision floor, and for a
    /// zero rate.
    pub fn stability_bound(&self, global_rate: f64, rate_scale: f64) -> f64 {
        match self {
            BulkConcentration::Constant { .. } => f64::INFINITY,
            BulkConcentration::Decreasing { value, precision, max_fraction } => {
                if *value <= *precision {
                    return f64::INFINITY;
                }
                let rate = (rate_scale * global_rate).abs();
                if rate == 0.0 {
                    return f64::INFINITY;
                }
                max_fraction * value / rate
            }
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
