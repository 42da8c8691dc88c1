use std::collections::HashSet;

use crate::model::{Mechanism, RawModel, Reaction};
use crate::validation::consistency::Report;

/// Validates reactions and the quantities their rate laws depend on by checking:
/// - Stoichiometry keys are mics and coefficients are finite and non-zero
/// - The stoichiometry fits the declared mechanism
/// - Compartment volumes are positive and enzymes have at least one subunit
///
/// Also warns about reactions without a catalysing enzyme and mics no reaction touches.
///
/// # Arguments
/// * `model` - The raw model whose reactions are checked
/// * `report` - Validation report to add any validation errors to
pub(super) fn check_reactions(model: &RawModel, report: &mut Report) {
    let mics = model.mics.iter().map(|m| m.id()).collect::<HashSet<_>>();
    let catalysed = model
        .enzyme_reactions
        .iter()
        .map(|er| er.reaction_id.as_str())
        .collect::<HashSet<_>>();

    for (idx, reaction) in model.reactions.iter().enumerate() {
        check_stoichiometry(report, reaction, idx, &mics);
        check_mechanism_shape(report, reaction, idx);

        if !reaction.mechanism.is_drain() && !catalysed.contains(reaction.id.as_str()) {
            report.warning(
                format!("/reactions/{idx}"),
                format!(
                    "Reaction '{}' is not catalysed by any enzyme and carries no flux.",
                    reaction.id
                ),
                &reaction.id,
            );
        }
    }

    let touched = model
        .reactions
        .iter()
        .flat_map(|r| r.stoichiometry.keys())
        .collect::<HashSet<_>>();

    for (idx, mic) in model.mics.iter().enumerate() {
        let id = mic.id();
        if !touched.contains(&id) {
            report.warning(
                format!("/mics/{idx}"),
                format!("Mic '{id}' does not take part in any reaction."),
                &id,
            );
        }
    }

    for (idx, compartment) in model.compartments.iter().enumerate() {
        if !(compartment.volume.is_finite() && compartment.volume > 0.0) {
            report.error(
                format!("/compartments/{idx}/volume"),
                format!(
                    "Compartment '{}' has volume {}, expected a positive number.",
                    compartment.id, compartment.volume
                ),
                &compartment.id,
            );
        }
    }

    for (idx, enzyme) in model.enzymes.iter().enumerate() {
        if enzyme.subunits < 1 {
            report.error(
                format!("/enzymes/{idx}/subunits"),
                format!("Enzyme '{}' must have at least one subunit.", enzyme.id),
                &enzyme.id,
            );
        }
    }
}

fn check_stoichiometry(
    report: &mut Report,
    reaction: &Reaction,
    reaction_idx: usize,
    mics: &HashSet<String>,
) {
    for (mic_id, coefficient) in &reaction.stoichiometry {
        if !mics.contains(mic_id) {
            report.error(
                format!("/reactions/{reaction_idx}/stoichiometry/{mic_id}"),
                format!(
                    "Mic '{mic_id}' in the stoichiometry of reaction '{}' is not defined in the model.",
                    reaction.id
                ),
                mic_id,
            );
        }

        if !coefficient.is_finite() || *coefficient == 0.0 {
            report.error(
                format!("/reactions/{reaction_idx}/stoichiometry/{mic_id}"),
                format!(
                    "Coefficient {coefficient} of mic '{mic_id}' in reaction '{}' must be finite and non-zero.",
                    reaction.id
                ),
                &reaction.id,
            );
        }
    }

    for (field, value) in [
        ("water_stoichiometry", reaction.water_stoichiometry),
        ("transported_charge", reaction.transported_charge),
    ] {
        if !value.is_finite() {
            report.error(
                format!("/reactions/{reaction_idx}/{field}"),
                format!("Reaction '{}' has a non-finite {field}.", reaction.id),
                &reaction.id,
            );
        }
    }
}

fn check_mechanism_shape(report: &mut Report, reaction: &Reaction, reaction_idx: usize) {
    let has_substrate = reaction.stoichiometry.values().any(|c| *c < 0.0);
    let has_product = reaction.stoichiometry.values().any(|c| *c > 0.0);

    let problem = match reaction.mechanism {
        Mechanism::ReversibleSaturating if !(has_substrate && has_product) => {
            Some("a reversible reaction needs at least one substrate and one product")
        }
        Mechanism::IrreversibleSaturating if !has_substrate => {
            Some("an irreversible reaction needs at least one substrate")
        }
        Mechanism::Drain if reaction.stoichiometry.is_empty() => {
            Some("a drain needs a non-empty stoichiometry")
        }
        _ => None,
    };

    if let Some(problem) = problem {
        report.error(
            format!("/reactions/{reaction_idx}/stoichiometry"),
            format!("Reaction '{}' is malformed: {problem}.", reaction.id),
            &reaction.id,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn model_with(reaction: Reaction) -> RawModel {
        RawModelBuilder::default()
            .name("m")
            .to_compartments(CompartmentBuilder::default().id("c").build().unwrap())
            .to_mics(
                MetaboliteInCompartmentBuilder::default()
                    .metabolite_id("a")
                    .compartment_id("c")
                    .build()
                    .unwrap(),
            )
            .to_mics(
                MetaboliteInCompartmentBuilder::default()
                    .metabolite_id("b")
                    .compartment_id("c")
                    .build()
                    .unwrap(),
            )
            .to_enzymes(EnzymeBuilder::default().id("e").build().unwrap())
            .to_enzyme_reactions(
                EnzymeReactionBuilder::default()
                    .enzyme_id("e")
                    .reaction_id(reaction.id.clone())
                    .build()
                    .unwrap(),
            )
            .to_reactions(reaction)
            .build()
            .unwrap()
    }

    #[test]
    fn test_unknown_mic_in_stoichiometry() {
        let reaction = ReactionBuilder::default()
            .id("r")
            .to_stoichiometry(("a_c".to_string(), -1.0))
            .to_stoichiometry(("z_c".to_string(), 1.0))
            .build()
            .unwrap();

        let mut report = Report::new();
        check_reactions(&model_with(reaction), &mut report);

        assert!(!report.is_valid);
        let results = report.filter_results("z_c");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].location(), "/reactions/0/stoichiometry/z_c");
    }

    #[test]
    fn test_zero_and_non_finite_coefficients() {
        let reaction = ReactionBuilder::default()
            .id("r")
            .to_stoichiometry(("a_c".to_string(), 0.0))
            .to_stoichiometry(("b_c".to_string(), f64::NAN))
            .build()
            .unwrap();

        let mut report = Report::new();
        check_reactions(&model_with(reaction), &mut report);

        // Two coefficient errors plus the malformed reversible shape.
        assert_eq!(report.errors().count(), 3);
    }

    #[test]
    fn test_irreversible_without_substrate() {
        let reaction = ReactionBuilder::default()
            .id("r")
            .mechanism(Mechanism::IrreversibleSaturating)
            .to_stoichiometry(("b_c".to_string(), 1.0))
            .build()
            .unwrap();

        let mut report = Report::new();
        check_reactions(&model_with(reaction), &mut report);

        assert_eq!(report.filter_results("r").len(), 1);
        // a_c is not part of any reaction
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_non_positive_volume_and_subunits() {
        let mut model = model_with(
            ReactionBuilder::default()
                .id("r")
                .to_stoichiometry(("a_c".to_string(), -1.0))
                .to_stoichiometry(("b_c".to_string(), 1.0))
                .build()
                .unwrap(),
        );
        model.compartments[0].volume = 0.0;
        model.enzymes[0].subunits = 0;

        let mut report = Report::new();
        check_reactions(&model, &mut report);

        assert_eq!(report.filter_results("c").len(), 1);
        assert_eq!(report.filter_results("e").len(), 1);
    }
}
