use std::collections::HashSet;

use crate::model::{RawModel, ID_SEPARATOR};
use crate::validation::consistency::Report;

/// Validates identifiers of all entity kinds by checking:
/// - The model name can be used as a file name prefix
/// - Declared ids are non-empty and free of the id separator
/// - Ids are unique within their kind, including derived ids
///
/// # Arguments
/// * `model` - The raw model whose identifiers are checked
/// * `report` - Validation report to add any validation errors to
pub(super) fn check_identifiers(model: &RawModel, report: &mut Report) {
    check_model_name(&model.name, report);

    check_declared(
        report,
        "compartments",
        model.compartments.iter().map(|c| c.id.as_str()),
    );
    check_declared(
        report,
        "metabolites",
        model.metabolites.iter().map(|m| m.id.as_str()),
    );
    check_declared(report, "enzymes", model.enzymes.iter().map(|e| e.id.as_str()));
    check_declared(
        report,
        "reactions",
        model.reactions.iter().map(|r| r.id.as_str()),
    );
    check_declared(
        report,
        "experiments",
        model.experiments.iter().map(|e| e.id.as_str()),
    );

    check_unique(report, "mics", model.mics.iter().map(|m| m.id()));
    check_unique(
        report,
        "enzyme_reactions",
        model.enzyme_reactions.iter().map(|er| er.id()),
    );
    check_unique(report, "allosteries", model.allosteries.iter().map(|a| a.id()));
    check_unique(
        report,
        "competitive_inhibitions",
        model.competitive_inhibitions.iter().map(|ci| ci.id()),
    );
    check_unique(
        report,
        "phosphorylations",
        model.phosphorylations.iter().map(|p| p.id()),
    );
}

/// Artifacts are named after the model, so the name must stay inside the output directory.
fn check_model_name(name: &str, report: &mut Report) {
    let problem = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains(['/', '\\']) {
        Some("must not contain a path separator")
    } else if name == "." || name == ".." {
        Some("must not be a relative directory")
    } else {
        None
    };

    if let Some(problem) = problem {
        report.error(
            "/name".to_string(),
            format!("Model name '{name}' {problem}."),
            name,
        );
    }
}

/// Checks ids the user declares directly. These must not contain the separator,
/// otherwise derived ids could collide.
fn check_declared<'a>(report: &mut Report, kind: &str, ids: impl Iterator<Item = &'a str>) {
    let ids = ids.collect::<Vec<_>>();

    for (idx, id) in ids.iter().enumerate() {
        if id.is_empty() {
            report.error(
                format!("/{kind}/{idx}/id"),
                format!("Entity {idx} of kind '{kind}' has an empty id."),
                id,
            );
        } else if id.contains(ID_SEPARATOR) {
            report.error(
                format!("/{kind}/{idx}/id"),
                format!(
                    "Id '{id}' of kind '{kind}' contains the reserved separator '{ID_SEPARATOR}'."
                ),
                id,
            );
        }
    }

    check_unique(report, kind, ids.into_iter().map(str::to_string));
}

fn check_unique(report: &mut Report, kind: &str, ids: impl Iterator<Item = String>) {
    let mut seen = HashSet::new();

    for (idx, id) in ids.enumerate() {
        if !seen.insert(id.clone()) {
            report.error(
                format!("/{kind}/{idx}"),
                format!("Id '{id}' occurs more than once in '{kind}'."),
                &id,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    #[test]
    fn test_separator_in_declared_id() {
        let model = RawModelBuilder::default()
            .name("m")
            .to_metabolites(MetaboliteBuilder::default().id("glc_D").build().unwrap())
            .build()
            .unwrap();

        let mut report = Report::new();
        check_identifiers(&model, &mut report);

        assert!(!report.is_valid);
        assert_eq!(report.filter_results("glc_D").len(), 1);
    }

    #[test]
    fn test_empty_and_duplicate_ids() {
        let model = RawModelBuilder::default()
            .name("m")
            .to_enzymes(EnzymeBuilder::default().id("").build().unwrap())
            .to_enzymes(EnzymeBuilder::default().id("e").build().unwrap())
            .to_enzymes(EnzymeBuilder::default().id("e").build().unwrap())
            .build()
            .unwrap();

        let mut report = Report::new();
        check_identifiers(&model, &mut report);

        assert_eq!(report.errors().count(), 2);
        assert_eq!(report.filter_results("e").len(), 1);
        assert_eq!(report.errors[1].location(), "/enzymes/2");
    }

    #[test]
    fn test_model_name_must_be_a_file_name() {
        for name in ["", "  ", "../escape", "nested/model", "win\\model", ".."] {
            let model = RawModelBuilder::default().name(name).build().unwrap();

            let mut report = Report::new();
            check_identifiers(&model, &mut report);

            assert!(!report.is_valid, "name {name:?} was accepted");
            assert_eq!(report.errors[0].location(), "/name");
        }

        let model = RawModelBuilder::default().name("glycolysis").build().unwrap();
        let mut report = Report::new();
        check_identifiers(&model, &mut report);
        assert!(report.is_valid);
    }

    #[test]
    fn test_duplicate_derived_ids() {
        let edge = EnzymeReactionBuilder::default()
            .enzyme_id("e")
            .reaction_id("r")
            .build()
            .unwrap();
        let model = RawModelBuilder::default()
            .name("m")
            .to_enzyme_reactions(edge.clone())
            .to_enzyme_reactions(edge)
            .build()
            .unwrap();

        let mut report = Report::new();
        check_identifiers(&model, &mut report);

        assert_eq!(report.filter_results("e_r").len(), 1);
    }
}
