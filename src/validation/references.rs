use std::collections::HashSet;

use crate::model::RawModel;
use crate::validation::consistency::Report;

/// Ids of every entity kind, used to resolve references.
pub(super) struct KnownIds<'a> {
    pub compartments: HashSet<&'a str>,
    pub metabolites: HashSet<&'a str>,
    pub mics: HashSet<String>,
    pub enzymes: HashSet<&'a str>,
    pub reactions: HashSet<&'a str>,
    pub drains: HashSet<&'a str>,
    pub edges: HashSet<String>,
    pub phosphorylations: HashSet<String>,
}

impl<'a> KnownIds<'a> {
    pub fn collect(model: &'a RawModel) -> Self {
        Self {
            compartments: model.compartments.iter().map(|c| c.id.as_str()).collect(),
            metabolites: model.metabolites.iter().map(|m| m.id.as_str()).collect(),
            mics: model.mics.iter().map(|m| m.id()).collect(),
            enzymes: model.enzymes.iter().map(|e| e.id.as_str()).collect(),
            reactions: model.reactions.iter().map(|r| r.id.as_str()).collect(),
            drains: model
                .reactions
                .iter()
                .filter(|r| r.mechanism.is_drain())
                .map(|r| r.id.as_str())
                .collect(),
            edges: model.enzyme_reactions.iter().map(|er| er.id()).collect(),
            phosphorylations: model.phosphorylations.iter().map(|p| p.id()).collect(),
        }
    }
}

/// Validates references between entities by checking:
/// - Mics point to existing metabolites and compartments
/// - Enzyme-reaction pairs point to an existing enzyme and a non-drain reaction
/// - Allosteries and competitive inhibitions point to existing enzymes, edges and mics
/// - Phosphorylations point to existing enzymes
///
/// Competitive inhibitions are resolved against the full (enzyme, reaction) edge, never
/// against the enzyme alone.
///
/// # Arguments
/// * `model` - The raw model whose references are checked
/// * `report` - Validation report to add any validation errors to
pub(super) fn check_references(model: &RawModel, report: &mut Report) {
    let known = KnownIds::collect(model);

    for (idx, mic) in model.mics.iter().enumerate() {
        if !known.metabolites.contains(mic.metabolite_id.as_str()) {
            report.error(
                format!("/mics/{idx}/metabolite_id"),
                format!(
                    "Mic '{}' references unknown metabolite '{}'.",
                    mic.id(),
                    mic.metabolite_id
                ),
                &mic.id(),
            );
        }
        if !known.compartments.contains(mic.compartment_id.as_str()) {
            report.error(
                format!("/mics/{idx}/compartment_id"),
                format!(
                    "Mic '{}' references unknown compartment '{}'.",
                    mic.id(),
                    mic.compartment_id
                ),
                &mic.id(),
            );
        }
    }

    for (idx, edge) in model.enzyme_reactions.iter().enumerate() {
        if !known.enzymes.contains(edge.enzyme_id.as_str()) {
            report.error(
                format!("/enzyme_reactions/{idx}/enzyme_id"),
                format!(
                    "Enzyme-reaction '{}' references unknown enzyme '{}'.",
                    edge.id(),
                    edge.enzyme_id
                ),
                &edge.id(),
            );
        }
        if !known.reactions.contains(edge.reaction_id.as_str()) {
            report.error(
                format!("/enzyme_reactions/{idx}/reaction_id"),
                format!(
                    "Enzyme-reaction '{}' references unknown reaction '{}'.",
                    edge.id(),
                    edge.reaction_id
                ),
                &edge.id(),
            );
        } else if known.drains.contains(edge.reaction_id.as_str()) {
            report.error(
                format!("/enzyme_reactions/{idx}/reaction_id"),
                format!(
                    "Drain reaction '{}' cannot be catalysed by enzyme '{}'.",
                    edge.reaction_id, edge.enzyme_id
                ),
                &edge.id(),
            );
        }
    }

    for (idx, allostery) in model.allosteries.iter().enumerate() {
        if !known.enzymes.contains(allostery.enzyme_id.as_str()) {
            report.error(
                format!("/allosteries/{idx}/enzyme_id"),
                format!(
                    "Allostery '{}' references unknown enzyme '{}'.",
                    allostery.id(),
                    allostery.enzyme_id
                ),
                &allostery.id(),
            );
        }
        if !known.mics.contains(&allostery.mic_id) {
            report.error(
                format!("/allosteries/{idx}/mic_id"),
                format!(
                    "Allostery '{}' references unknown mic '{}'.",
                    allostery.id(),
                    allostery.mic_id
                ),
                &allostery.id(),
            );
        }
    }

    for (idx, inhibition) in model.competitive_inhibitions.iter().enumerate() {
        if !known.edges.contains(&inhibition.edge_id()) {
            report.error(
                format!("/competitive_inhibitions/{idx}"),
                format!(
                    "Competitive inhibition '{}' acts on enzyme '{}' and reaction '{}', which are not declared as an enzyme-reaction pair.",
                    inhibition.id(),
                    inhibition.enzyme_id,
                    inhibition.reaction_id
                ),
                &inhibition.id(),
            );
        }
        if !known.mics.contains(&inhibition.mic_id) {
            report.error(
                format!("/competitive_inhibitions/{idx}/mic_id"),
                format!(
                    "Competitive inhibition '{}' references unknown mic '{}'.",
                    inhibition.id(),
                    inhibition.mic_id
                ),
                &inhibition.id(),
            );
        }
    }

    for (idx, phosphorylation) in model.phosphorylations.iter().enumerate() {
        for (field, enzyme_id) in [
            ("modifying_enzyme_id", &phosphorylation.modifying_enzyme_id),
            ("modified_enzyme_id", &phosphorylation.modified_enzyme_id),
        ] {
            if !known.enzymes.contains(enzyme_id.as_str()) {
                report.error(
                    format!("/phosphorylations/{idx}/{field}"),
                    format!(
                        "Phosphorylation '{}' references unknown enzyme '{enzyme_id}'.",
                        phosphorylation.id()
                    ),
                    &phosphorylation.id(),
                );
            }
        }
    }
}
