//! Entity Model for Kinetic Networks
//!
//! This module defines the records a kinetic model is built from and the validated,
//! immutable entity graph the rest of the compiler works on.
//!
//! # Structure
//!
//! - [`RawModel`]: the already-parsed declarative input (compartments, metabolites,
//!   metabolites-in-compartments, enzymes, reactions, enzyme-reaction pairs, regulatory
//!   modifiers, experiments and prior atoms). Records are plain data and can be
//!   deserialised from JSON or assembled with the generated builders.
//! - [`KineticModel`]: the entity graph produced by [`crate::loader::load_model`] after
//!   every structural invariant has been checked. It cannot be constructed any other way
//!   and exposes no mutating methods.
//!
//! # Derived identifiers
//!
//! Several entities do not carry an id of their own; their identity is the combination of
//! the ids they reference, joined with [`ID_SEPARATOR`]. Declared ids may therefore not
//! contain the separator, which keeps every derived id unambiguous.

use std::collections::{BTreeMap, HashMap};

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::priors::spec::{MultivariatePrior, PriorAtom};

/// Separator used to join the parts of derived identifiers.
pub const ID_SEPARATOR: char = '_';

/// Joins identifier parts into a derived identifier.
pub fn join_ids(parts: &[&str]) -> String {
    parts.join(&ID_SEPARATOR.to_string())
}

/// Root record of a kinetic model as handed over by the input parser.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct RawModel {
    /// Name of the model, used to name generated artifacts.
    #[builder(setter(into))]
    pub name: String,

    /// Compartments metabolites can live in.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_compartments")))]
    pub compartments: Vec<Compartment>,

    /// Metabolites, independent of their location.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_metabolites")))]
    pub metabolites: Vec<Metabolite>,

    /// Metabolites placed in a compartment; the unit of concentration state.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_mics")))]
    pub mics: Vec<MetaboliteInCompartment>,

    /// Enzymes catalysing reactions.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_enzymes")))]
    pub enzymes: Vec<Enzyme>,

    /// Reactions including drains.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_reactions")))]
    pub reactions: Vec<Reaction>,

    /// Which enzyme catalyses which reaction.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_enzyme_reactions")))]
    pub enzyme_reactions: Vec<EnzymeReaction>,

    /// Allosteric regulation of enzymes by metabolites.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_allosteries")))]
    pub allosteries: Vec<Allostery>,

    /// Competitive inhibition of enzyme-reaction pairs by metabolites.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_competitive_inhibitions")))]
    pub competitive_inhibitions: Vec<CompetitiveInhibition>,

    /// Phosphorylation of enzymes by other enzymes.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_phosphorylations")))]
    pub phosphorylations: Vec<Phosphorylation>,

    /// Experiments including their measurements and knockouts.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_experiments")))]
    pub experiments: Vec<Experiment>,

    /// Independent prior atoms for all parameter families.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_priors")))]
    pub priors: Vec<PriorAtom>,

    /// Joint prior over formation energies, if given as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub dgf_multivariate: Option<MultivariatePrior>,
}

/// A compartment with a fixed volume.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Compartment {
    #[builder(setter(into))]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    /// Volume of the compartment. Must be strictly positive.
    #[serde(default = "unit_volume")]
    #[builder(default = "1.0")]
    pub volume: f64,
}

fn unit_volume() -> f64 {
    1.0
}

/// A metabolite, independent of where it is located.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Metabolite {
    #[builder(setter(into))]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    /// External identifier such as an InChI key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub inchi_key: Option<String>,
}

/// A metabolite within one specific compartment.
///
/// Whether the concentration is an implicit steady-state unknown (`balanced`) or an
/// independent quantity is declared explicitly and never re-derived from the network.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct MetaboliteInCompartment {
    #[builder(setter(into))]
    pub metabolite_id: String,

    #[builder(setter(into))]
    pub compartment_id: String,

    #[serde(default = "enabled")]
    #[builder(default = "true")]
    pub balanced: bool,
}

impl MetaboliteInCompartment {
    /// Derived identifier `metabolite_compartment`.
    pub fn id(&self) -> String {
        join_ids(&[&self.metabolite_id, &self.compartment_id])
    }
}

/// An enzyme.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Enzyme {
    #[builder(setter(into))]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    /// Number of subunits, the exponent of allosteric cooperativity.
    #[serde(default = "single_subunit")]
    #[builder(default = "1")]
    pub subunits: u32,
}

fn single_subunit() -> u32 {
    1
}

/// The fixed set of supported reaction mechanisms.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Reversible, saturable enzyme kinetics.
    #[default]
    ReversibleSaturating,
    /// Irreversible, saturable enzyme kinetics.
    IrreversibleSaturating,
    /// Zero-order exchange flux without an enzyme.
    Drain,
}

impl Mechanism {
    /// Integer tag used in the numeric input (`edge_type`).
    pub fn code(&self) -> i64 {
        match self {
            Mechanism::ReversibleSaturating => 1,
            Mechanism::IrreversibleSaturating => 2,
            Mechanism::Drain => 3,
        }
    }

    pub fn is_drain(&self) -> bool {
        matches!(self, Mechanism::Drain)
    }
}

/// A reaction with its stoichiometry over metabolites-in-compartments.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Reaction {
    #[builder(setter(into))]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    #[serde(default)]
    #[builder(default)]
    pub mechanism: Mechanism,

    /// Signed coefficients keyed by mic id. Negative entries are substrates.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_stoichiometry")))]
    pub stoichiometry: BTreeMap<String, f64>,

    #[serde(default)]
    #[builder(default)]
    pub water_stoichiometry: f64,

    #[serde(default)]
    #[builder(default)]
    pub transported_charge: f64,
}

/// An enzyme catalysing a reaction. Each pair is one edge of the network.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct EnzymeReaction {
    #[builder(setter(into))]
    pub enzyme_id: String,

    #[builder(setter(into))]
    pub reaction_id: String,
}

impl EnzymeReaction {
    /// Derived identifier `enzyme_reaction`.
    pub fn id(&self) -> String {
        join_ids(&[&self.enzyme_id, &self.reaction_id])
    }
}

/// Direction of a regulatory modification.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    #[default]
    Activation,
    Inhibition,
}

/// Allosteric regulation of an enzyme by a metabolite-in-compartment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Allostery {
    #[builder(setter(into))]
    pub enzyme_id: String,

    #[builder(setter(into))]
    pub mic_id: String,

    pub modification_type: ModificationType,
}

impl Allostery {
    /// Derived identifier `enzyme_mic`.
    pub fn id(&self) -> String {
        join_ids(&[&self.enzyme_id, &self.mic_id])
    }
}

/// Competitive inhibition of one enzyme-reaction edge by a metabolite-in-compartment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct CompetitiveInhibition {
    #[builder(setter(into))]
    pub enzyme_id: String,

    #[builder(setter(into))]
    pub reaction_id: String,

    #[builder(setter(into))]
    pub mic_id: String,
}

impl CompetitiveInhibition {
    /// Derived identifier `enzyme_reaction_mic`.
    pub fn id(&self) -> String {
        join_ids(&[&self.enzyme_id, &self.reaction_id, &self.mic_id])
    }

    /// Identifier of the edge this inhibition acts on.
    pub fn edge_id(&self) -> String {
        join_ids(&[&self.enzyme_id, &self.reaction_id])
    }
}

/// Phosphorylation of one enzyme by another.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Phosphorylation {
    #[builder(setter(into))]
    pub modifying_enzyme_id: String,

    #[builder(setter(into))]
    pub modified_enzyme_id: String,

    pub modification_type: ModificationType,
}

impl Phosphorylation {
    /// Derived identifier `modifying_modified`.
    pub fn id(&self) -> String {
        join_ids(&[&self.modifying_enzyme_id, &self.modified_enzyme_id])
    }
}

/// What a measurement observes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    /// Concentration of a metabolite-in-compartment.
    Concentration,
    /// Steady-state flux through a reaction.
    Flux,
    /// Concentration of an enzyme.
    EnzymeConcentration,
}

/// A single measured value within an experiment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, PartialEq)]
pub struct Measurement {
    pub target_type: MeasurementType,

    /// Mic id, reaction id or enzyme id depending on `target_type`.
    #[builder(setter(into))]
    pub target_id: String,

    pub value: f64,

    /// Standard deviation of the measurement error.
    pub error_scale: f64,
}

/// An experimental condition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, PartialEq)]
pub struct Experiment {
    #[builder(setter(into))]
    pub id: String,

    /// Temperature in Kelvin.
    #[serde(default = "standard_temperature")]
    #[builder(default = "298.15")]
    pub temperature: f64,

    #[serde(default = "enabled")]
    #[builder(default = "true")]
    pub is_train: bool,

    #[serde(default)]
    #[builder(default)]
    pub is_test: bool,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_measurements")))]
    pub measurements: Vec<Measurement>,

    /// Initial concentration guesses for balanced mics, keyed by mic id.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_initial_state")))]
    pub initial_state: BTreeMap<String, f64>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_enzyme_knockouts")))]
    pub enzyme_knockouts: Vec<String>,

    /// Knocked-out phosphorylations, by derived phosphorylation id.
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_phosphorylation_knockouts")))]
    pub phosphorylation_knockouts: Vec<String>,
}

fn standard_temperature() -> f64 {
    298.15
}

fn enabled() -> bool {
    true
}

impl Experiment {
    /// Returns the measurement of the given type and target, if any.
    pub fn measurement(&self, target_type: MeasurementType, target_id: &str) -> Option<&Measurement> {
        self.measurements
            .iter()
            .find(|m| m.target_type == target_type && m.target_id == target_id)
    }
}

/// Validated, immutable entity graph.
///
/// Obtained from [`crate::loader::load_model`]. Every reference between entities is
/// guaranteed to resolve, every id is unique within its kind and every stoichiometric
/// coefficient is a finite, non-zero number.
#[derive(Debug, Clone)]
pub struct KineticModel {
    raw: RawModel,
    mic_index: HashMap<String, usize>,
    enzyme_index: HashMap<String, usize>,
    reaction_index: HashMap<String, usize>,
    compartment_index: HashMap<String, usize>,
}

impl KineticModel {
    /// Wraps records that already passed validation.
    pub(crate) fn from_validated(raw: RawModel) -> Self {
        let mic_index = raw
            .mics
            .iter()
            .enumerate()
            .map(|(i, mic)| (mic.id(), i))
            .collect();
        let enzyme_index = index_by(&raw.enzymes, |e| &e.id);
        let reaction_index = index_by(&raw.reactions, |r| &r.id);
        let compartment_index = index_by(&raw.compartments, |c| &c.id);

        Self {
            raw,
            mic_index,
            enzyme_index,
            reaction_index,
            compartment_index,
        }
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.raw.compartments
    }

    pub fn metabolites(&self) -> &[Metabolite] {
        &self.raw.metabolites
    }

    pub fn mics(&self) -> &[MetaboliteInCompartment] {
        &self.raw.mics
    }

    pub fn enzymes(&self) -> &[Enzyme] {
        &self.raw.enzymes
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.raw.reactions
    }

    pub fn enzyme_reactions(&self) -> &[EnzymeReaction] {
        &self.raw.enzyme_reactions
    }

    pub fn allosteries(&self) -> &[Allostery] {
        &self.raw.allosteries
    }

    pub fn competitive_inhibitions(&self) -> &[CompetitiveInhibition] {
        &self.raw.competitive_inhibitions
    }

    pub fn phosphorylations(&self) -> &[Phosphorylation] {
        &self.raw.phosphorylations
    }

    pub fn experiments(&self) -> &[Experiment] {
        &self.raw.experiments
    }

    pub fn priors(&self) -> &[PriorAtom] {
        &self.raw.priors
    }

    pub fn dgf_multivariate(&self) -> Option<&MultivariatePrior> {
        self.raw.dgf_multivariate.as_ref()
    }

    /// Drain reactions in declaration order.
    pub fn drains(&self) -> impl Iterator<Item = &Reaction> {
        self.raw.reactions.iter().filter(|r| r.mechanism.is_drain())
    }

    pub fn mic(&self, id: &str) -> Option<&MetaboliteInCompartment> {
        self.mic_index.get(id).map(|&i| &self.raw.mics[i])
    }

    pub fn enzyme(&self, id: &str) -> Option<&Enzyme> {
        self.enzyme_index.get(id).map(|&i| &self.raw.enzymes[i])
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reaction_index.get(id).map(|&i| &self.raw.reactions[i])
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.compartment_index.get(id).map(|&i| &self.raw.compartments[i])
    }

    /// Returns the records the model was built from.
    pub fn raw(&self) -> &RawModel {
        &self.raw
    }
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> &String) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item).clone(), i))
        .collect()
}
