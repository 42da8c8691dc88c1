//! Stoichiometry & Edge Builder
//!
//! An edge is one column of the network: an enzyme catalysing a reaction, or a drain
//! that carries flux without an enzyme. Edges are ordered drains first, then
//! enzyme-reaction pairs, each in declaration order, and the stoichiometric matrix
//! follows that order column by column.
//!
//! Regulatory modifiers are attached to edges here so that later stages never search
//! for them. Competitive inhibitions are matched by the full (enzyme, reaction) edge
//! identity; allosteries and phosphorylations are properties of the enzyme and are
//! attached to every edge that enzyme catalyses.

use std::collections::HashMap;

use ndarray::Array2;

use crate::codify::ModelCodes;
use crate::error::EncodingError;
use crate::model::{join_ids, KineticModel, Mechanism, ModificationType, Reaction};

/// A mic taking part in an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub mic_id: String,
    pub mic_code: usize,
    /// Absolute stoichiometric coefficient.
    pub coefficient: f64,
}

/// A competitive inhibitor of one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitiveInhibitor {
    /// Code in the competitive inhibition space, which is also the `ki` code.
    pub code: usize,
    pub mic_code: usize,
}

/// An allosteric regulator of the edge's enzyme.
#[derive(Debug, Clone, PartialEq)]
pub struct AllostericRegulator {
    /// Code in the allostery space, which is also the dissociation constant code.
    pub code: usize,
    pub mic_code: usize,
    pub modification_type: ModificationType,
}

/// A phosphorylation acting on the edge's enzyme.
#[derive(Debug, Clone, PartialEq)]
pub struct PhosphorylationModifier {
    /// Code in the phosphorylation space, which is also the `kcat_phos` code.
    pub code: usize,
    pub modifying_enzyme_code: usize,
    pub modification_type: ModificationType,
}

/// The enzyme of an enzyme-catalysed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalyst {
    pub enzyme_id: String,
    pub enzyme_code: usize,
    pub subunits: u32,
    /// Code in the enzyme-reaction space, which is also the `kcat` code.
    pub enzyme_reaction_code: usize,
}

/// One column of the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub code: usize,
    pub reaction_id: String,
    pub reaction_code: usize,
    pub mechanism: Mechanism,
    /// The catalysing enzyme; `None` for drains.
    pub catalyst: Option<Catalyst>,
    /// Code in the drain space; `None` for enzyme-catalysed edges.
    pub drain_code: Option<usize>,
    /// Mics with a negative coefficient, in sorted mic id order.
    pub substrates: Vec<Participant>,
    /// Mics with a positive coefficient, in sorted mic id order.
    pub products: Vec<Participant>,
    pub water_stoichiometry: f64,
    pub transported_charge: f64,
    pub competitive_inhibitors: Vec<CompetitiveInhibitor>,
    pub allosteric_regulators: Vec<AllostericRegulator>,
    pub phosphorylations: Vec<PhosphorylationModifier>,
}

impl Edge {
    pub fn is_drain(&self) -> bool {
        self.catalyst.is_none()
    }

    pub fn is_reversible(&self) -> bool {
        matches!(self.mechanism, Mechanism::ReversibleSaturating)
    }

    /// Substrates followed by products, with signed coefficients.
    pub fn signed_participants(&self) -> impl Iterator<Item = (&Participant, f64)> {
        self.substrates
            .iter()
            .map(|p| (p, -p.coefficient))
            .chain(self.products.iter().map(|p| (p, p.coefficient)))
    }
}

/// The edge list together with its stoichiometric matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    edges: Vec<Edge>,
    stoichiometry: Array2<f64>,
}

impl Network {
    /// Edges in code order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Dense matrix with one row per mic and one column per edge, both in code order.
    pub fn stoichiometry(&self) -> &Array2<f64> {
        &self.stoichiometry
    }

    pub fn enzymatic_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.is_drain())
    }
}

/// Builds the ordered edge list and the stoichiometric matrix of a model.
///
/// # Arguments
///
/// * `model` - The validated entity graph
/// * `codes` - The entity code spaces of the same model
///
/// # Returns
///
/// Returns the [`Network`], or an [`EncodingError`] if an id of the model has no code,
/// which indicates that `codes` was derived from a different model.
pub fn build_network(model: &KineticModel, codes: &ModelCodes) -> Result<Network, EncodingError> {
    let mut edges = Vec::with_capacity(codes.edge.len());

    for reaction in model.drains() {
        edges.push(build_edge(model, codes, reaction, None)?);
    }

    for enzyme_reaction in model.enzyme_reactions() {
        let reaction = model
            .reaction(&enzyme_reaction.reaction_id)
            .ok_or_else(|| EncodingError::UnknownId {
                space: "reaction".to_string(),
                id: enzyme_reaction.reaction_id.clone(),
            })?;
        edges.push(build_edge(model, codes, reaction, Some(&enzyme_reaction.enzyme_id))?);
    }

    attach_modifiers(model, codes, &mut edges)?;

    let stoichiometry = derive_stoichiometric_matrix(&edges, codes.mic.len());

    log::debug!(
        "Built {} edges over {} mics ({} balanced)",
        edges.len(),
        codes.mic.len(),
        codes.balanced_mic.len()
    );

    Ok(Network {
        edges,
        stoichiometry,
    })
}

fn build_edge(
    model: &KineticModel,
    codes: &ModelCodes,
    reaction: &Reaction,
    enzyme_id: Option<&String>,
) -> Result<Edge, EncodingError> {
    let (id, catalyst, drain_code) = match enzyme_id {
        Some(enzyme_id) => {
            let enzyme = model
                .enzyme(enzyme_id)
                .ok_or_else(|| EncodingError::UnknownId {
                    space: "enzyme".to_string(),
                    id: enzyme_id.clone(),
                })?;
            let id = join_ids(&[enzyme_id.as_str(), reaction.id.as_str()]);
            let catalyst = Catalyst {
                enzyme_id: enzyme_id.clone(),
                enzyme_code: codes.enzyme.code(enzyme_id)?,
                subunits: enzyme.subunits,
                enzyme_reaction_code: codes.enzyme_reaction.code(&id)?,
            };
            (id, Some(catalyst), None)
        }
        None => (
            reaction.id.clone(),
            None,
            Some(codes.drain.code(&reaction.id)?),
        ),
    };

    let mut substrates = Vec::new();
    let mut products = Vec::new();
    for (mic_id, &coefficient) in &reaction.stoichiometry {
        let participant = Participant {
            mic_id: mic_id.clone(),
            mic_code: codes.mic.code(mic_id)?,
            coefficient: coefficient.abs(),
        };
        if coefficient < 0.0 {
            substrates.push(participant);
        } else {
            products.push(participant);
        }
    }

    Ok(Edge {
        code: codes.edge.code(&id)?,
        id,
        reaction_id: reaction.id.clone(),
        reaction_code: codes.reaction.code(&reaction.id)?,
        mechanism: reaction.mechanism,
        catalyst,
        drain_code,
        substrates,
        products,
        water_stoichiometry: reaction.water_stoichiometry,
        transported_charge: reaction.transported_charge,
        competitive_inhibitors: Vec::new(),
        allosteric_regulators: Vec::new(),
        phosphorylations: Vec::new(),
    })
}

/// Attaches every modifier to the edges it acts on.
fn attach_modifiers(
    model: &KineticModel,
    codes: &ModelCodes,
    edges: &mut [Edge],
) -> Result<(), EncodingError> {
    let by_edge_id = edges
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect::<HashMap<_, _>>();

    for inhibition in model.competitive_inhibitions() {
        let edge_id = inhibition.edge_id();
        let &index = by_edge_id
            .get(&edge_id)
            .ok_or_else(|| EncodingError::UnknownId {
                space: "edge".to_string(),
                id: edge_id.clone(),
            })?;
        edges[index].competitive_inhibitors.push(CompetitiveInhibitor {
            code: codes.competitive_inhibition.code(&inhibition.id())?,
            mic_code: codes.mic.code(&inhibition.mic_id)?,
        });
    }

    for edge in edges.iter_mut() {
        let Some(catalyst) = &edge.catalyst else {
            continue;
        };

        for allostery in model
            .allosteries()
            .iter()
            .filter(|a| a.enzyme_id == catalyst.enzyme_id)
        {
            edge.allosteric_regulators.push(AllostericRegulator {
                code: codes.allostery.code(&allostery.id())?,
                mic_code: codes.mic.code(&allostery.mic_id)?,
                modification_type: allostery.modification_type,
            });
        }

        for phosphorylation in model
            .phosphorylations()
            .iter()
            .filter(|p| p.modified_enzyme_id == catalyst.enzyme_id)
        {
            edge.phosphorylations.push(PhosphorylationModifier {
                code: codes.phosphorylation.code(&phosphorylation.id())?,
                modifying_enzyme_code: codes.enzyme.code(&phosphorylation.modifying_enzyme_id)?,
                modification_type: phosphorylation.modification_type,
            });
        }
    }

    Ok(())
}

/// Derives the stoichiometric matrix of an edge list.
///
/// Each row corresponds to a mic and each column to an edge. Negative values are
/// consumed, positive values produced.
///
/// # Arguments
///
/// * `edges` - The edges in code order
/// * `n_mic` - Number of mics, i.e. rows
///
/// # Returns
///
/// The `n_mic × n_edge` matrix.
pub fn derive_stoichiometric_matrix(edges: &[Edge], n_mic: usize) -> Array2<f64> {
    let mut matrix = Array2::zeros((n_mic, edges.len()));

    for (j, edge) in edges.iter().enumerate() {
        for (participant, coefficient) in edge.signed_participants() {
            matrix[(participant.mic_code - 1, j)] = coefficient;
        }
    }

    matrix
}
