//! Consistency module for checking the structure of raw kinetic models.
//!
//! This module validates a [`RawModel`] before anything else touches it by checking:
//! - Identifier uniqueness and the absence of the id separator
//! - References between entities (mics, edges, modifiers, phosphorylations)
//! - Reaction stoichiometry and mechanism shape
//! - Experiments, measurements, initial states and knockouts
//!
//! The main entry point is the `check_consistency` function which runs all checks,
//! collects every issue instead of stopping at the first one, and returns a `Report`.

use std::fmt;

use colored::Colorize;

use crate::model::RawModel;
use crate::validation::experiments::check_experiments;
use crate::validation::identifiers::check_identifiers;
use crate::validation::reactions::check_reactions;
use crate::validation::references::check_references;

/// Runs every structural check on a raw model.
///
/// # Arguments
///
/// * `model` - A reference to the `RawModel` to be checked.
///
/// # Returns
///
/// Returns a `Report` containing the results of the consistency checks.
pub fn check_consistency(model: &RawModel) -> Report {
    let mut report = Report::new();

    check_identifiers(model, &mut report);
    check_references(model, &mut report);
    check_reactions(model, &mut report);
    check_experiments(model, &mut report);

    report
}

/// The `Report` struct is used to store the results of the validation checks.
///
/// Contains a boolean indicating overall validity and a vector of individual validation results.
/// The model is considered invalid if any validation results have Error severity.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct Report {
    /// Whether the model is valid overall. False if any errors were found.
    pub is_valid: bool,
    /// Vector of individual validation results found during checks.
    pub errors: Vec<ValidationResult>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    /// Creates a new, valid and empty `Report`.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Adds a validation result to the report.
    ///
    /// # Arguments
    ///
    /// * `result` - The `ValidationResult` to be added.
    ///
    /// If the result has Error severity, marks the overall report as invalid.
    pub fn add_result(&mut self, result: ValidationResult) {
        if result.severity == Severity::Error {
            self.is_valid = false;
        }
        self.errors.push(result);
    }

    /// Shorthand for adding an error about a specific entity.
    pub(crate) fn error(&mut self, location: String, message: String, identifier: &str) {
        self.add_result(ValidationResult::new(
            location,
            message,
            Severity::Error,
            Some(identifier.to_string()),
        ));
    }

    /// Shorthand for adding a warning about a specific entity.
    pub(crate) fn warning(&mut self, location: String, message: String, identifier: &str) {
        self.add_result(ValidationResult::new(
            location,
            message,
            Severity::Warning,
            Some(identifier.to_string()),
        ));
    }

    /// Filters the results by the identifier.
    ///
    /// # Arguments
    ///
    /// * `identifier` - The identifier of the offending entity.
    ///
    /// # Returns
    ///
    /// Returns a vector of `ValidationResult`s with the given identifier.
    pub fn filter_results(&self, identifier: &str) -> Vec<ValidationResult> {
        self.errors
            .iter()
            .filter(|result| result.identifier.as_deref() == Some(identifier))
            .cloned()
            .collect()
    }

    /// Iterates over results of Error severity.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationResult> {
        self.errors
            .iter()
            .filter(|result| result.severity == Severity::Error)
    }

    /// Iterates over results of Warning severity.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.errors
            .iter()
            .filter(|result| result.severity == Severity::Warning)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.errors {
            writeln!(f, "{result}")?;
        }
        Ok(())
    }
}

/// The `ValidationResult` struct represents a single validation issue found during checking.
///
/// Contains the location where the issue was found, a descriptive message, the severity level
/// and the id of the offending entity.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    /// JSON pointer path to the location of the validation issue
    location: String,
    /// Human readable description of the validation issue
    message: String,
    /// Severity level of the validation issue
    severity: Severity,
    /// The identifier of the offending entity, if any
    identifier: Option<String>,
}

impl ValidationResult {
    /// Creates a new `ValidationResult`.
    ///
    /// # Arguments
    ///
    /// * `location` - The location of the validation issue as a JSON pointer path.
    /// * `message` - A message describing the broken invariant.
    /// * `severity` - The severity of the validation issue.
    /// * `identifier` - The id of the offending entity.
    pub fn new(
        location: String,
        message: String,
        severity: Severity,
        identifier: Option<String>,
    ) -> Self {
        Self {
            location,
            message,
            severity,
            identifier,
        }
    }

    /// JSON pointer path of the offending record, e.g. `/reactions/2/stoichiometry/a_c`.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> &Severity {
        &self.severity
    }

    /// The id of the entity the issue is about, if the issue concerns a single entity.
    pub fn identifier(&self) -> &Option<String> {
        &self.identifier
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self.severity {
            Severity::Error => self.message.bold().red(),
            Severity::Warning => self.message.bold().yellow(),
        };

        let severity = match self.severity {
            Severity::Error => "Error".bold().red(),
            Severity::Warning => "Warning".bold().yellow(),
        };

        write!(
            f,
            "[{}] {}:\n\t└── {}",
            self.location.bold(),
            severity,
            message
        )
    }
}

/// Severity levels for validation issues.
///
/// - Error: The model is structurally invalid and must not be compiled
/// - Warning: The model compiles but probably not as the modeller intended
#[derive(Debug, Clone, PartialEq, Eq, Copy, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}
