//! Compiler configuration.
//!
//! [`CompilerConfig`] holds every tunable the compiler consults: the default initial
//! concentration of balanced mics, the formation energy of water, the probabilities the
//! percentile prior form refers to, and the family-level default priors. It can be built
//! programmatically or read from JSON with [`crate::io::load_config`]; fields missing
//! from the JSON fall back to their defaults.

use std::collections::BTreeMap;

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::parameters::ParameterFamily;

/// Gas constant in kJ/(mol K).
pub const GAS_CONSTANT: f64 = 0.008314;

/// Faraday constant in kJ/(mol mV).
pub const FARADAY_CONSTANT: f64 = 0.0964853;

/// Family-level default prior.
///
/// For strictly positive families both values refer to the natural logarithm of the
/// parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DefaultPrior {
    pub location: f64,
    pub scale: f64,
}

impl DefaultPrior {
    pub fn new(location: f64, scale: f64) -> Self {
        Self { location, scale }
    }
}

/// Configuration of a compilation.
///
/// # Examples
///
/// ```
/// use kinetic_compiler::config::CompilerConfigBuilder;
///
/// let config = CompilerConfigBuilder::default()
///     .default_initial_concentration(0.1)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.dgf_water, -157.6);
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct CompilerConfig {
    /// Initial concentration of balanced mics without measurement or override.
    #[builder(default = "0.01")]
    pub default_initial_concentration: f64,

    /// Standard formation energy of water in kJ/mol.
    #[builder(default = "-157.6")]
    pub dgf_water: f64,

    /// Cumulative probabilities of the `pct1` and `pct99` prior form.
    #[builder(default = "(0.01, 0.99)")]
    pub quantile_probabilities: (f64, f64),

    /// Default prior per family. Families without an entry have no default, so every
    /// coordinate of them needs an explicit prior.
    #[builder(default = "default_priors()", setter(into, each(name = "to_default_priors")))]
    pub default_priors: BTreeMap<ParameterFamily, DefaultPrior>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_initial_concentration: 0.01,
            dgf_water: -157.6,
            quantile_probabilities: (0.01, 0.99),
            default_priors: default_priors(),
        }
    }
}

impl CompilerConfig {
    /// The default prior of a family, if one is configured.
    pub fn default_prior(&self, family: ParameterFamily) -> Option<DefaultPrior> {
        self.default_priors.get(&family).copied()
    }
}

/// Weakly informative defaults. Concentrations are in mM, energies in kJ/mol.
pub fn default_priors() -> BTreeMap<ParameterFamily, DefaultPrior> {
    BTreeMap::from([
        (ParameterFamily::Kcat, DefaultPrior::new(0.0, 2.0)),
        (ParameterFamily::Km, DefaultPrior::new(-2.0, 2.0)),
        (ParameterFamily::Ki, DefaultPrior::new(-2.0, 2.0)),
        (ParameterFamily::DissociationConstant, DefaultPrior::new(-2.0, 2.0)),
        (ParameterFamily::TransferConstant, DefaultPrior::new(0.0, 2.0)),
        (ParameterFamily::KcatPhos, DefaultPrior::new(0.0, 2.0)),
        (ParameterFamily::Psi, DefaultPrior::new(0.0, 10.0)),
        (ParameterFamily::Dgf, DefaultPrior::new(0.0, 50.0)),
        (ParameterFamily::ConcEnzyme, DefaultPrior::new(-2.0, 2.0)),
        (ParameterFamily::ConcUnbalanced, DefaultPrior::new(-2.0, 2.0)),
        (ParameterFamily::Drain, DefaultPrior::new(0.0, 1.0)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_matches_default() {
        let built = CompilerConfigBuilder::default().build().unwrap();
        assert_eq!(built, CompilerConfig::default());
        assert_eq!(built.default_priors.len(), ParameterFamily::ALL.len());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: CompilerConfig = serde_json::from_str(
            r#"{"default_initial_concentration": 0.5, "default_priors": {"km": {"location": -1.0, "scale": 1.0}}}"#,
        )
        .unwrap();

        assert_eq!(config.default_initial_concentration, 0.5);
        assert_eq!(config.quantile_probabilities, (0.01, 0.99));
        assert_eq!(
            config.default_prior(ParameterFamily::Km),
            Some(DefaultPrior::new(-1.0, 1.0))
        );
        // An explicit map replaces the defaults entirely.
        assert_eq!(config.default_prior(ParameterFamily::Kcat), None);
    }

    #[test]
    fn test_each_setter_collects_entries() {
        let config = CompilerConfigBuilder::default()
            .to_default_priors((ParameterFamily::Drain, DefaultPrior::new(1.0, 0.5)))
            .build()
            .unwrap();
        assert_eq!(
            config.default_prior(ParameterFamily::Drain),
            Some(DefaultPrior::new(1.0, 0.5))
        );
    }
}
