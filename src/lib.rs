//! Kinetic Model Compiler
//!
//! This library compiles declarative metabolic kinetic models into the artifacts a
//! numerical solver consumes:
//! - Validating the model records and building an immutable entity graph
//! - Assigning dense, deterministic integer codes to every entity and parameter
//! - Deriving the network edges and the stoichiometric matrix
//! - Generating rate-law and flux expressions as program text
//! - Assembling priors, the keyed numeric input and initial parameter values
//! - Writing the artifacts, skipping unchanged program text by its content hash

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::compile::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::io::*;
    pub use crate::model::*;
    pub use crate::parameters::ParameterFamily;
    pub use crate::priors::error::PriorError;
    pub use crate::priors::spec::*;
}

/// Model records and the validated entity graph
pub mod model;

/// Validation of model records
pub mod validation {
    /// Main consistency interface
    pub mod consistency;
    /// Validation of experiments and measurements
    mod experiments;
    /// Validation of identifiers
    mod identifiers;
    /// Validation of reactions and stoichiometry
    mod reactions;
    /// Validation of references between entities
    mod references;
}

/// Loading of validated models
pub mod loader;

/// Dense integer codes for entities
pub mod codify;

/// Edges and the stoichiometric matrix
pub mod stoich;

/// Flattened encoding of variable-length groups
pub mod ragged;

/// Parameter families and their layout
pub mod parameters;

/// Rate law and flux expression generation
pub mod ratelaw {
    pub mod context;
    pub mod expression;
    pub mod generate;
    mod regulation;
    pub mod template;
}

/// Prior specification and assembly
pub mod priors {
    pub mod assemble;
    pub mod error;
    mod quantile;
    pub mod spec;

    pub use crate::priors::quantile::{lognormal_quantile_match, quantile_match};
}

/// Program text and content hash
pub mod program;

/// Numeric input and initial values
pub mod data;

/// Compiler configuration
pub mod config;

/// End-to-end compilation
pub mod compile;

/// Error types
pub mod error;

/// IO functionality
pub mod io;
