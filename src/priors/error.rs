use thiserror::Error;

use crate::parameters::ParameterFamily;

/// Error types that can occur while assembling priors.
///
/// Every variant is fatal. Coordinates are rendered as `family[target]` for per-id
/// families and `family[experiment, target]` for per-experiment families.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriorError {
    #[error("Prior target '{target}' is not a parameter of family '{family}'")]
    UnknownTarget {
        family: ParameterFamily,
        target: String,
    },

    #[error("Prior for {coordinate} refers to unknown experiment '{experiment}'")]
    UnknownExperiment {
        coordinate: String,
        experiment: String,
    },

    #[error("Prior for {coordinate} names an experiment, but family '{family}' is not resolved per experiment")]
    UnexpectedExperiment {
        family: ParameterFamily,
        coordinate: String,
    },

    #[error("Prior for {coordinate} must name an experiment, since family '{family}' is resolved per experiment")]
    MissingExperiment {
        family: ParameterFamily,
        coordinate: String,
    },

    #[error("More than one prior is given for {coordinate}")]
    DuplicateAtom { coordinate: String },

    #[error("Prior for {coordinate} must use exactly one of (location, scale), (exploc, scale) or (pct1, pct99), found {found}")]
    SpecificationForms { coordinate: String, found: usize },

    #[error("Prior for {coordinate} is incomplete: '{missing}' is missing")]
    IncompleteSpecification {
        coordinate: String,
        missing: &'static str,
    },

    #[error("Prior for {coordinate} has pct1 = {pct1} which is not below pct99 = {pct99}")]
    InvalidPercentiles {
        coordinate: String,
        pct1: f64,
        pct99: f64,
    },

    #[error("Prior for {coordinate} has {field} = {value}, but family '{family}' is strictly positive")]
    NonPositiveValue {
        family: ParameterFamily,
        coordinate: String,
        field: &'static str,
        value: f64,
    },

    #[error("Prior for {coordinate} has scale {scale}, expected a positive finite number")]
    InvalidScale { coordinate: String, scale: f64 },

    #[error("Prior for {coordinate} has a non-finite location")]
    InvalidLocation { coordinate: String },

    #[error("Quantile matching requires 0 < p1 < p2 < 1 and x1 < x2, got ({x1}, {p1}) and ({x2}, {p2})")]
    InvalidQuantiles { x1: f64, p1: f64, x2: f64, p2: f64 },

    #[error("No prior for {coordinate} and no default for family '{family}'")]
    MissingPrior {
        family: ParameterFamily,
        coordinate: String,
    },

    #[error("Independent priors for 'dgf' cannot be combined with a multivariate 'dgf' prior")]
    ConflictingDgf,

    #[error("Multivariate prior ids must be a permutation of the metabolite ids: {reason}")]
    MultivariateIds { reason: String },

    #[error("Multivariate prior has a {what} of size {found}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Covariance matrix is not symmetric at ({row}, {col})")]
    AsymmetricCovariance { row: usize, col: usize },

    #[error("Covariance matrix is not positive definite")]
    NotPositiveDefinite,
}
