//! User-facing prior specifications.
//!
//! A [`PriorAtom`] states the prior of one coordinate of one parameter family in exactly
//! one of three forms:
//!
//! - `location` and `scale` directly
//! - `exploc` and `scale`, where the location is `ln(exploc)`
//! - `pct1` and `pct99`, the values below which 1% and 99% of the prior mass lie
//!
//! Locations and scales of strictly positive families refer to the logarithm of the
//! parameter, so the percentile form is matched against a log-normal distribution for
//! those and against a normal distribution otherwise.
//!
//! A [`MultivariatePrior`] states a joint normal prior over formation energies.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::PriorError;
use super::quantile::{lognormal_quantile_match, quantile_match};
use crate::parameters::{FamilyShape, ParameterFamily};

/// Prior of a single parameter coordinate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, PartialEq)]
pub struct PriorAtom {
    /// Family the parameter belongs to.
    pub parameter: ParameterFamily,

    /// Id of the parameter within its family, e.g. `e1_a_c` for a Km.
    #[builder(setter(into))]
    pub target: String,

    /// Experiment id, required exactly for per-experiment families.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub experiment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub location: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub exploc: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub scale: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub pct1: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub pct99: Option<f64>,
}

impl PriorAtom {
    /// Human readable coordinate, e.g. `km[e1_a_c]` or `conc_enzyme[x1, e1]`.
    pub fn coordinate(&self) -> String {
        match &self.experiment {
            Some(experiment) => format!("{}[{}, {}]", self.parameter, experiment, self.target),
            None => format!("{}[{}]", self.parameter, self.target),
        }
    }

    /// Checks that the atom names an experiment exactly when its family needs one.
    pub fn check_shape(&self) -> Result<(), PriorError> {
        match (self.parameter.shape(), &self.experiment) {
            (FamilyShape::Matrix, None) => Err(PriorError::MissingExperiment {
                family: self.parameter,
                coordinate: self.coordinate(),
            }),
            (FamilyShape::Vector | FamilyShape::Multivariate, Some(_)) => {
                Err(PriorError::UnexpectedExperiment {
                    family: self.parameter,
                    coordinate: self.coordinate(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Converts the atom to `(location, scale)`.
    ///
    /// # Arguments
    ///
    /// * `probabilities` - The cumulative probabilities `pct1` and `pct99` refer to
    ///
    /// # Returns
    ///
    /// Returns `(location, scale)` on the scale the family is modelled on, or a
    /// [`PriorError`] if the atom uses no form, several forms, or invalid values.
    pub fn resolve(&self, probabilities: (f64, f64)) -> Result<(f64, f64), PriorError> {
        let coordinate = self.coordinate();
        let non_negative = self.parameter.is_non_negative();

        let forms = [
            self.location.is_some(),
            self.exploc.is_some(),
            self.pct1.is_some() || self.pct99.is_some(),
        ];
        let found = forms.iter().filter(|f| **f).count();
        let percentiles_with_scale = forms[2] && self.scale.is_some();

        if found != 1 || percentiles_with_scale {
            return Err(PriorError::SpecificationForms {
                coordinate,
                found: found + usize::from(percentiles_with_scale),
            });
        }

        let (location, scale) = match (self.location, self.exploc, self.pct1, self.pct99) {
            (Some(location), _, _, _) => (location, self.required_scale()?),
            (_, Some(exploc), _, _) => {
                if exploc <= 0.0 {
                    return Err(PriorError::NonPositiveValue {
                        family: self.parameter,
                        coordinate,
                        field: "exploc",
                        value: exploc,
                    });
                }
                (exploc.ln(), self.required_scale()?)
            }
            (_, _, Some(pct1), Some(pct99)) => {
                if pct1 >= pct99 {
                    return Err(PriorError::InvalidPercentiles {
                        coordinate,
                        pct1,
                        pct99,
                    });
                }
                let (p1, p99) = probabilities;
                if non_negative {
                    if pct1 <= 0.0 {
                        return Err(PriorError::NonPositiveValue {
                            family: self.parameter,
                            coordinate,
                            field: "pct1",
                            value: pct1,
                        });
                    }
                    lognormal_quantile_match(pct1, p1, pct99, p99)?
                } else {
                    quantile_match(pct1, p1, pct99, p99)?
                }
            }
            (_, _, Some(_), None) => {
                return Err(PriorError::IncompleteSpecification {
                    coordinate,
                    missing: "pct99",
                })
            }
            (_, _, None, _) => {
                return Err(PriorError::IncompleteSpecification {
                    coordinate,
                    missing: "pct1",
                })
            }
        };

        check_location_scale(&self.coordinate(), location, scale)?;
        Ok((location, scale))
    }

    fn required_scale(&self) -> Result<f64, PriorError> {
        self.scale
            .ok_or_else(|| PriorError::IncompleteSpecification {
                coordinate: self.coordinate(),
                missing: "scale",
            })
    }
}

/// Checks that a location is finite and a scale positive and finite.
pub(crate) fn check_location_scale(
    coordinate: &str,
    location: f64,
    scale: f64,
) -> Result<(), PriorError> {
    if !location.is_finite() {
        return Err(PriorError::InvalidLocation {
            coordinate: coordinate.to_string(),
        });
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(PriorError::InvalidScale {
            coordinate: coordinate.to_string(),
            scale,
        });
    }
    Ok(())
}

/// Joint normal prior over the formation energies of all metabolites.
///
/// `ids` may list the metabolites in any order; the assembler reorders mean and
/// covariance to metabolite code order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, PartialEq)]
pub struct MultivariatePrior {
    #[builder(setter(into, each(name = "to_ids")))]
    pub ids: Vec<String>,

    #[builder(setter(into, each(name = "to_mean_vector")))]
    pub mean_vector: Vec<f64>,

    /// Row-major covariance matrix.
    #[builder(setter(into, each(name = "to_covariance_matrix")))]
    pub covariance_matrix: Vec<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn atom(family: ParameterFamily) -> PriorAtomBuilder {
        let mut builder = PriorAtomBuilder::default();
        builder.parameter(family).target("e1_a_c");
        builder
    }

    #[test]
    fn test_location_scale() {
        let atom = atom(ParameterFamily::Km)
            .location(-1.0)
            .scale(0.5)
            .build()
            .unwrap();
        assert_eq!(atom.resolve((0.01, 0.99)).unwrap(), (-1.0, 0.5));
    }

    #[test]
    fn test_exploc_is_logged() {
        let atom = atom(ParameterFamily::Km)
            .exploc(std::f64::consts::E)
            .scale(0.5)
            .build()
            .unwrap();
        let (location, scale) = atom.resolve((0.01, 0.99)).unwrap();
        assert_relative_eq!(location, 1.0, epsilon = 1e-12);
        assert_eq!(scale, 0.5);
    }

    #[test]
    fn test_percentiles_non_negative_family() {
        let atom = atom(ParameterFamily::Kcat)
            .pct1(0.4)
            .pct99(6.8)
            .build()
            .unwrap();
        let (location, scale) = atom.resolve((0.01, 0.99)).unwrap();
        assert_relative_eq!(location, 0.500, epsilon = 1e-3);
        assert_relative_eq!(scale, 0.609, epsilon = 1e-3);
    }

    #[test]
    fn test_percentiles_real_family() {
        let atom = PriorAtomBuilder::default()
            .parameter(ParameterFamily::Psi)
            .target("x1")
            .pct1(-3.0)
            .pct99(2.0)
            .build()
            .unwrap();
        let (location, scale) = atom.resolve((0.1, 0.6)).unwrap();
        assert_relative_eq!(location, 1.175, epsilon = 1e-3);
        assert_relative_eq!(scale, 3.258, epsilon = 1e-3);
    }

    #[test]
    fn test_both_forms_rejected() {
        let atom = atom(ParameterFamily::Km)
            .location(0.0)
            .scale(1.0)
            .pct1(0.1)
            .pct99(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            atom.resolve((0.01, 0.99)),
            Err(PriorError::SpecificationForms { found: 3, .. })
        ));
    }

    #[test]
    fn test_no_form_rejected() {
        let atom = atom(ParameterFamily::Km).scale(1.0).build().unwrap();
        assert!(matches!(
            atom.resolve((0.01, 0.99)),
            Err(PriorError::SpecificationForms { found: 0, .. })
        ));
    }

    #[test]
    fn test_incomplete_and_invalid_values() {
        let missing_scale = atom(ParameterFamily::Km).location(0.0).build().unwrap();
        assert!(matches!(
            missing_scale.resolve((0.01, 0.99)),
            Err(PriorError::IncompleteSpecification { missing: "scale", .. })
        ));

        let missing_pct99 = atom(ParameterFamily::Km).pct1(0.1).build().unwrap();
        assert!(matches!(
            missing_pct99.resolve((0.01, 0.99)),
            Err(PriorError::IncompleteSpecification { missing: "pct99", .. })
        ));

        let negative_scale = atom(ParameterFamily::Km)
            .location(0.0)
            .scale(-1.0)
            .build()
            .unwrap();
        assert!(matches!(
            negative_scale.resolve((0.01, 0.99)),
            Err(PriorError::InvalidScale { .. })
        ));

        let swapped = atom(ParameterFamily::Km)
            .pct1(2.0)
            .pct99(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            swapped.resolve((0.01, 0.99)),
            Err(PriorError::InvalidPercentiles { .. })
        ));

        let non_positive = atom(ParameterFamily::Km)
            .exploc(0.0)
            .scale(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            non_positive.resolve((0.01, 0.99)),
            Err(PriorError::NonPositiveValue { field: "exploc", .. })
        ));
    }

    #[test]
    fn test_experiment_shape() {
        let with_experiment = atom(ParameterFamily::Km)
            .experiment("x1")
            .location(0.0)
            .scale(1.0)
            .build()
            .unwrap();
        assert!(with_experiment.check_shape().is_err());

        let without_experiment = PriorAtomBuilder::default()
            .parameter(ParameterFamily::ConcEnzyme)
            .target("e1")
            .location(0.0)
            .scale(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            without_experiment.check_shape(),
            Err(PriorError::MissingExperiment { .. })
        ));
        assert_eq!(without_experiment.coordinate(), "conc_enzyme[e1]");
    }

    #[test]
    fn test_atom_from_json() {
        let atom: PriorAtom = serde_json::from_str(
            r#"{"parameter": "conc_enzyme", "target": "e1", "experiment": "x1", "exploc": 0.5, "scale": 0.1}"#,
        )
        .unwrap();
        assert_eq!(atom.coordinate(), "conc_enzyme[x1, e1]");
        assert!(atom.check_shape().is_ok());
    }
}
