//! Model Loader
//!
//! Turns raw records into the validated [`KineticModel`]. Every structural check of
//! [`crate::validation::consistency`] runs before the graph is built, and all violations
//! are reported together. Warnings are logged and do not prevent loading.

use thiserror::Error;

use crate::model::{KineticModel, RawModel};
use crate::validation::consistency::{check_consistency, Report};

/// Structural rejection of a raw model.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// The model violates one or more structural invariants.
    ///
    /// The wrapped report lists every violation with the offending entity and a
    /// JSON pointer to its location in the input.
    #[error("Model '{name}' is structurally invalid:\n{report}")]
    Invalid { name: String, report: Report },
}

impl LoadError {
    /// The validation report describing every violation.
    pub fn report(&self) -> &Report {
        match self {
            LoadError::Invalid { report, .. } => report,
        }
    }
}

/// Validates raw records and builds the immutable entity graph.
///
/// # Arguments
///
/// * `raw` - The already-parsed model records
///
/// # Returns
///
/// Returns the validated [`KineticModel`], or [`LoadError::Invalid`] carrying the full
/// validation report if any check failed with error severity.
pub fn load_model(raw: RawModel) -> Result<KineticModel, LoadError> {
    let report = check_consistency(&raw);

    for warning in report.warnings() {
        log::warn!("{}: {}", warning.location(), warning.message());
    }

    if !report.is_valid {
        log::error!(
            "Model '{}' failed validation with {} error(s)",
            raw.name,
            report.errors().count()
        );
        return Err(LoadError::Invalid {
            name: raw.name,
            report,
        });
    }

    log::info!(
        "Loaded model '{}': {} mics, {} reactions, {} enzymes, {} experiments",
        raw.name,
        raw.mics.len(),
        raw.reactions.len(),
        raw.enzymes.len(),
        raw.experiments.len()
    );

    Ok(KineticModel::from_validated(raw))
}
