//! Kinetic factors
//!
//! A kinetic factor is a dimensionless multiplier of a reaction's maximum
//! specific rate. It reads one or two fields through a [`Concentrations`]
//! lookup and returns:
//!
//! - `value`: the current multiplier, in `[0, maximum_value]`
//! - `maximum_value`: an upper bound over the attainable range of the field(s),
//!   used for stability estimates (not necessarily reached)
//! - `derivative`: the partial derivative with respect to one species, used
//!   by semi-implicit consumers
//!
//! # Variants
//!
//! | Variant                   | Value                                         |
//! |---------------------------|-----------------------------------------------|
//! | `Saturation`              | $c / (c + K)$                                 |
//! | `Step`                    | $1$ if $c > \theta$ else $0$                  |
//! | `UpRegulationStep`        | $1$ if $\max(c, 0) > \theta$ else $0$         |
//! | `DownRegulationStep`      | $0$ if $\max(c, 0) > \theta$ else $1$         |
//! | `SigmoidalUtilization`    | $\tanh((c - h) s) + 1$                        |
//! | `PositiveFeedback`        | $f$ if $c > \theta$ else $1$                  |
//! | `SubstrateAndGoodStep`    | $0$ unless $g > \theta$, then $c / (c + K)$   |
//! | `SubstrateAndInducerStep` | $0$ unless $i > \theta$, then $c / (c + K)$   |
//! | `ConstantPassthrough`     | $1$                                           |
//!
//! # Linearization policy
//!
//! Step-like variants are not differentiable at their threshold. They report
//! a derivative of `0` everywhere; gated saturations report `0` with respect
//! to the gating field. Semi-implicit consumers must treat these as a
//! linearization, not as the true derivative.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::physics::{Concentrations, SpeciesId};

/// Dimensionless rate multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KineticFactor {
    /// Monod saturation on one field
    Saturation {
        species: SpeciesId,
        half_saturation: f64,
    },

    /// Hard switch on one field
    Step {
        species: SpeciesId,
        threshold: f64,
    },

    /// Quorum-sensing switch turning a process on above the threshold
    UpRegulationStep {
        species: SpeciesId,
        threshold: f64,
    },

    /// Quorum-sensing switch turning a process off above the threshold
    DownRegulationStep {
        species: SpeciesId,
        threshold: f64,
    },

    /// Smooth utilisation curve, ranging over `[0, 2]`
    SigmoidalUtilization {
        species: SpeciesId,
        steepness: f64,
        half_point: f64,
    },

    /// Multiplicative enhancement above a threshold
    PositiveFeedback {
        species: SpeciesId,
        threshold: f64,
        enhancement: f64,
    },

    /// Saturation on a substrate, gated by a public-good field
    SubstrateAndGoodStep {
        substrate: SpeciesId,
        good: SpeciesId,
        half_saturation: f64,
        threshold: f64,
    },

    /// Saturation on a substrate, gated by an inducer field
    SubstrateAndInducerStep {
        substrate: SpeciesId,
        inducer: SpeciesId,
        half_saturation: f64,
        threshold: f64,
    },

    /// Always one
    ConstantPassthrough,
}

impl KineticFactor {

    // ======================================= constructors =======================================

    /// Monod saturation `c / (c + K)`
    pub fn saturation(species: SpeciesId, half_saturation: f64) -> Self {
        Self::Saturation { species, half_saturation }
    }

    /// Step switching to one strictly above `threshold`
    pub fn step(species: SpeciesId, threshold: f64) -> Self {
        Self::Step { species, threshold }
    }

    /// Step when `enabled`, otherwise a passthrough
    pub fn step_or_passthrough(species: SpeciesId, threshold: f64, enabled: bool) -> Self {
        if enabled {
            Self::step(species, threshold)
        } else {
            Self::ConstantPassthrough
        }
    }

    /// Up-regulation switch
    pub fn up_regulation(species: SpeciesId, threshold: f64) -> Self {
        Self::UpRegulationStep { species, threshold }
    }

    /// Down-regulation switch
    pub fn down_regulation(species: SpeciesId, threshold: f64) -> Self {
        Self::DownRegulationStep { species, threshold }
    }

    /// Sigmoidal utilisation `tanh((c - h) s) + 1`
    pub fn sigmoidal(species: SpeciesId, steepness: f64, half_point: f64) -> Self {
        Self::SigmoidalUtilization { species, steepness, half_point }
    }

    /// Positive feedback returning `enhancement` above `threshold`
    pub fn positive_feedback(species: SpeciesId, threshold: f64, enhancement: f64) -> Self {
        Self::PositiveFeedback { species, threshold, enhancement }
    }

    /// Substrate saturation gated by a public good
    pub fn substrate_and_good(
        substrate: SpeciesId,
        good: SpeciesId,
        half_saturation: f64,
        threshold: f64,
    ) -> Self {
        Self::SubstrateAndGoodStep { substrate, good, half_saturation, threshold }
    }

    /// Substrate saturation gated by an inducer
    pub fn substrate_and_inducer(
        substrate: SpeciesId,
        inducer: SpeciesId,
        half_saturation: f64,
        threshold: f64,
    ) -> Self {
        Self::SubstrateAndInducerStep { substrate, inducer, half_saturation, threshold }
    }

    // ========================================= queries ==========================================

    /// Variant name (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            KineticFactor::Saturation { .. } => "Saturation",
            KineticFactor::Step { .. } => "Step",
            KineticFactor::UpRegulationStep { .. } => "UpRegulationStep",
            KineticFactor::DownRegulationStep { .. } => "DownRegulationStep",
            KineticFactor::SigmoidalUtilization { .. } => "SigmoidalUtilization",
            KineticFactor::PositiveFeedback { .. } => "PositiveFeedback",
            KineticFactor::SubstrateAndGoodStep { .. } => "SubstrateAndGoodStep",
            KineticFactor::SubstrateAndInducerStep { .. } => "SubstrateAndInducerStep",
            KineticFactor::ConstantPassthrough => "ConstantPassthrough",
        }
    }

    /// Species read by this factor
    pub fn species(&self) -> Vec<SpeciesId> {
        match self {
            KineticFactor::Saturation { species, .. }
            | KineticFactor::Step { species, .. }
            | KineticFactor::UpRegulationStep { species, .. }
            | KineticFactor::DownRegulationStep { species, .. }
            | KineticFactor::SigmoidalUtilization { species, .. }
            | KineticFactor::PositiveFeedback { species, .. } => vec![*species],
            KineticFactor::SubstrateAndGoodStep { substrate, good: gate, .. }
            | KineticFactor::SubstrateAndInducerStep { substrate, inducer: gate, .. } => {
                vec![*substrate, *gate]
            }
            KineticFactor::ConstantPassthrough => Vec::new(),
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        let finite = |label: &str, x: f64| -> Result<()> {
            if x.is_finite() {
                Ok(())
            } else {
                Err(ModelError::invalid(format!("{}: {label} must be finite, got {x}", self.name())))
            }
        };

        match self {
            KineticFactor::Saturation { half_saturation, .. }
            | KineticFactor::SubstrateAndGoodStep { half_saturation, .. }
            | KineticFactor::SubstrateAndInducerStep { half_saturation, .. } => {
                if !(*half_saturation > 0.0) || !half_saturation.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "{}: half-saturation constant must be positive, got {half_saturation}",
                        self.name()
                    )));
                }
                if let KineticFactor::SubstrateAndGoodStep { threshold, .. }
                | KineticFactor::SubstrateAndInducerStep { threshold, .. } = self
                {
                    finite("threshold", *threshold)?;
                }
                Ok(())
            }
            KineticFactor::Step { threshold, .. }
            | KineticFactor::UpRegulationStep { threshold, .. }
            | KineticFactor::DownRegulationStep { threshold, .. } => finite("threshold", *threshold),
            KineticFactor::SigmoidalUtilization { steepness, half_point, .. } => {
                finite("steepness", *steepness)?;
                finite("half point", *half_point)
            }
            KineticFactor::PositiveFeedback { threshold, enhancement, .. } => {
                finite("threshold", *threshold)?;
                if !(*enhancement >= 1.0) || !enhancement.is_finite() {
                    return Err(ModelError::invalid(format!(
                        "PositiveFeedback: enhancement must be finite and >= 1, got {enhancement}"
                    )));
                }
                Ok(())
            }
            KineticFactor::ConstantPassthrough => Ok(()),
        }
    }

    // ======================================= evaluation =========================================

    /// Current value of the multiplier
    pub fn value<C: Concentrations + ?Sized>(&self, env: &C) -> f64 {
        match self {
            KineticFactor::Saturation { species, half_saturation } => {
                monod(env.value(*species), *half_saturation)
            }
            KineticFactor::Step { species, threshold } => {
                indicator(env.value(*species) > *threshold)
            }
            KineticFactor::UpRegulationStep { species, threshold } => {
                indicator(non_negative(env.value(*species)) > *threshold)
            }
            KineticFactor::DownRegulationStep { species, threshold } => {
                indicator(!(non_negative(env.value(*species)) > *threshold))
            }
            KineticFactor::SigmoidalUtilization { species, steepness, half_point } => {
                ((env.value(*species) - half_point) * steepness).tanh() + 1.0
            }
            KineticFactor::PositiveFeedback { species, threshold, enhancement } => {
                if env.value(*species) > *threshold { *enhancement } else { 1.0 }
            }
            KineticFactor::SubstrateAndGoodStep { substrate, good: gate, half_saturation, threshold }
            | KineticFactor::SubstrateAndInducerStep { substrate, inducer: gate, half_saturation, threshold } => {
                if env.value(*gate) > *threshold {
                    monod(env.value(*substrate), *half_saturation)
                } else {
                    0.0
                }
            }
            KineticFactor::ConstantPassthrough => 1.0,
        }
    }

    /// Upper bound of the multiplier over the attainable field range
    pub fn maximum_value<C: Concentrations + ?Sized>(&self, env: &C) -> f64 {
        match self {
            KineticFactor::Saturation { species, half_saturation } => {
                monod(env.maximum(*species), *half_saturation)
            }
            KineticFactor::Step { .. }
            | KineticFactor::UpRegulationStep { .. }
            | KineticFactor::DownRegulationStep { .. }
            | KineticFactor::ConstantPassthrough => 1.0,
            KineticFactor::SigmoidalUtilization { species, steepness, half_point } => {
                ((env.maximum(*species) - half_point) * steepness).tanh() + 1.0
            }
            KineticFactor::PositiveFeedback { enhancement, .. } => *enhancement,
            // The gate is ignored: the bound is the ungated saturation
            KineticFactor::SubstrateAndGoodStep { substrate, half_saturation, .. }
            | KineticFactor::SubstrateAndInducerStep { substrate, half_saturation, .. } => {
                monod(env.maximum(*substrate), *half_saturation)
            }
        }
    }

    /// Partial derivative of the multiplier with respect to `with_respect_to`
    pub fn derivative<C: Concentrations + ?Sized>(&self, env: &C, with_respect_to: SpeciesId) -> f64 {
        match self {
            KineticFactor::Saturation { species, half_saturation } => {
                if *species == with_respect_to {
                    let c = env.value(*species);
                    half_saturation / ((c + half_saturation) * (c + half_saturation))
                } else {
                    0.0
                }
            }
            KineticFactor::SigmoidalUtilization { species, steepness, half_point } => {
                if *species == with_respect_to {
                    let c = env.value(*species);
                    steepness * (1.0 - ((c - half_point) * steepness).tanh())
                } else {
                    0.0
                }
            }
            KineticFactor::SubstrateAndGoodStep { substrate, good: gate, half_saturation, threshold }
            | KineticFactor::SubstrateAndInducerStep { substrate, inducer: gate, half_saturation, threshold } => {
                if !(env.value(*gate) > *threshold) || *substrate != with_respect_to {
                    return 0.0;
                }
                let c = env.value(*substrate);
                half_saturation / ((c + half_saturation) * (c + half_saturation))
            }
            KineticFactor::Step { .. }
            | KineticFactor::UpRegulationStep { .. }
            | KineticFactor::DownRegulationStep { .. }
            | KineticFactor::PositiveFeedback { .. }
            | KineticFactor::ConstantPassthrough => 0.0,
        }
    }
}

fn monod(c: f64, k: f64) -> f64 {
    c / (c + k)
}

fn indicator(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

// Upstream PDE noise can leave slightly negative concentrations
fn non_negative(c: f64) -> f64 {
    if c < 0.0 { 0.0 } else { c }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::LocalConcentrations;
    use approx::assert_relative_eq;

    const S: SpeciesId = SpeciesId(0);
    const G: SpeciesId = SpeciesId(1);

    fn at(values: &[f64]) -> LocalConcentrations {
        LocalConcentrations::from_values(values.to_vec())
    }

    // ====== Saturation ======

    #[test]
    fn test_saturation_is_half_at_constant() {
        for k in [1e-5, 0.3, 1.0, 42.0] {
            let factor = KineticFactor::saturation(S, k);
            assert_eq!(factor.value(&at(&[k])), 0.5);
        }
    }

    #[test]
    fn test_saturation_derivative() {
        let factor = KineticFactor::saturation(S, 2.0);
        let env = at(&[1.0]);

        assert_relative_eq!(factor.derivative(&env, S), 2.0 / 9.0, epsilon = 1e-15);
        assert_eq!(factor.derivative(&env, G), 0.0);
    }

    #[test]
    fn test_saturation_maximum_uses_field_maximum() {
        let factor = KineticFactor::saturation(S, 1.0);
        let mut env = at(&[1.0]);
        env.set_maximum(S, 3.0);

        assert_relative_eq!(factor.maximum_value(&env), 0.75);
    }

    // ====== Steps ======

    #[test]
    fn test_step_is_strict() {
        let factor = KineticFactor::step(S, 0.9);

        assert_eq!(factor.value(&at(&[0.9])), 0.0);
        assert_eq!(factor.value(&at(&[0.9 + 1e-9])), 1.0);
        assert_eq!(factor.maximum_value(&at(&[0.0])), 1.0);
        assert_eq!(factor.derivative(&at(&[5.0]), S), 0.0);
    }

    #[test]
    fn test_step_or_passthrough() {
        let disabled = KineticFactor::step_or_passthrough(S, 0.9, false);
        assert_eq!(disabled, KineticFactor::ConstantPassthrough);
        assert_eq!(disabled.value(&at(&[0.0])), 1.0);

        let enabled = KineticFactor::step_or_passthrough(S, 0.9, true);
        assert_eq!(enabled.value(&at(&[0.0])), 0.0);
    }

    #[test]
    fn test_regulation_steps_mirror_each_other() {
        let up = KineticFactor::up_regulation(S, 0.5);
        let down = KineticFactor::down_regulation(S, 0.5);

        for c in [-1.0, 0.0, 0.5, 0.6, 10.0] {
            let env = at(&[c]);
            assert_eq!(up.value(&env) + down.value(&env), 1.0);
        }
        assert_eq!(up.value(&at(&[0.6])), 1.0);
        assert_eq!(down.value(&at(&[0.6])), 0.0);
    }

    #[test]
    fn test_regulation_clamps_negative_concentrations() {
        // With a negative threshold, a clamped zero is still above it
        let up = KineticFactor::up_regulation(S, -0.5);
        assert_eq!(up.value(&at(&[-3.0])), 1.0);

        let down = KineticFactor::down_regulation(S, -0.5);
        assert_eq!(down.value(&at(&[-3.0])), 0.0);

        // A plain step does not clamp
        let step = KineticFactor::step(S, -0.5);
        assert_eq!(step.value(&at(&[-3.0])), 0.0);
    }

    // ====== Sigmoid and feedback ======

    #[test]
    fn test_sigmoidal_utilization() {
        let factor = KineticFactor::sigmoidal(S, 4.0, 0.5);

        assert_relative_eq!(factor.value(&at(&[0.5])), 1.0);
        assert_relative_eq!(factor.derivative(&at(&[0.5]), S), 4.0);
        assert!(factor.value(&at(&[100.0])) <= 2.0);
        assert!(factor.value(&at(&[-100.0])) >= 0.0);

        let expected = (0.25f64 * 4.0).tanh() + 1.0;
        assert_relative_eq!(factor.value(&at(&[0.75])), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_positive_feedback() {
        let factor = KineticFactor::positive_feedback(S, 1.0, 3.0);

        assert_eq!(factor.value(&at(&[1.0])), 1.0);
        assert_eq!(factor.value(&at(&[1.5])), 3.0);
        assert_eq!(factor.maximum_value(&at(&[0.0])), 3.0);
        assert_eq!(factor.derivative(&at(&[1.5]), S), 0.0);
    }

    // ====== Gated saturations ======

    #[test]
    fn test_substrate_and_good_gate() {
        let factor = KineticFactor::substrate_and_good(S, G, 1.0, 0.2);

        // Gate closed at and below the threshold
        assert_eq!(factor.value(&at(&[1.0, 0.2])), 0.0);
        assert_eq!(factor.value(&at(&[1.0, 0.0])), 0.0);

        // Gate open: plain saturation on the substrate
        assert_relative_eq!(factor.value(&at(&[1.0, 0.3])), 0.5);
        assert_relative_eq!(factor.derivative(&at(&[1.0, 0.3]), S), 0.25);
        assert_eq!(factor.derivative(&at(&[1.0, 0.3]), G), 0.0);
        assert_eq!(factor.derivative(&at(&[1.0, 0.1]), S), 0.0);
    }

    #[test]
    fn test_substrate_and_inducer_maximum_ignores_gate() {
        let factor = KineticFactor::substrate_and_inducer(S, G, 1.0, 5.0);
        let mut env = at(&[1.0, 0.0]);
        env.set_maximum(S, 1.0);

        assert_eq!(factor.value(&env), 0.0);
        assert_relative_eq!(factor.maximum_value(&env), 0.5);
        assert_eq!(factor.species(), vec![S, G]);
    }

    // ====== Validation ======

    #[test]
    fn test_validation() {
        assert!(KineticFactor::saturation(S, 1.0).validate().is_ok());
        assert!(KineticFactor::saturation(S, 0.0).validate().is_err());
        assert!(KineticFactor::saturation(S, f64::NAN).validate().is_err());
        assert!(KineticFactor::step(S, f64::INFINITY).validate().is_err());
        assert!(KineticFactor::positive_feedback(S, 1.0, 0.5).validate().is_err());
        assert!(KineticFactor::positive_feedback(S, 1.0, 2.0).validate().is_ok());
        assert!(KineticFactor::ConstantPassthrough.validate().is_ok());
    }
}
