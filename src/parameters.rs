//! Parameter Families and Layout
//!
//! Each kinetic or thermodynamic quantity the solver estimates belongs to one
//! [`ParameterFamily`], and each family has its own code space. This module derives those
//! code spaces from a model ([`ParameterSpace`]) and fixes how families are laid out in
//! the experiment-resolved parameter vector the generated program reads
//! ([`ParameterLayout`]) and in the vector of known real constants
//! ([`KnownRealLayout`]).
//!
//! # Parameter vector
//!
//! Global families come first in the order of [`PROGRAM_ORDER`], followed by the
//! slice of every per-experiment family that belongs to the experiment being simulated.
//! `psi` occupies a single slot. Offsets are computed from the family sizes only.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::codify::{CodeMap, ModelCodes};
use crate::error::EncodingError;
use crate::model::{join_ids, KineticModel};
use crate::stoich::Network;

/// A family of parameters sharing one code space, one prior array and one initial-value array.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ParameterFamily {
    Kcat,
    Km,
    Ki,
    DissociationConstant,
    TransferConstant,
    KcatPhos,
    Psi,
    Dgf,
    ConcEnzyme,
    ConcUnbalanced,
    Drain,
}

/// How a family is indexed and how its prior is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyShape {
    /// One independent value per id.
    Vector,
    /// One independent value per (experiment, id).
    Matrix,
    /// One jointly normal vector over all ids.
    Multivariate,
}

/// Order of the global and per-experiment families in the parameter vector.
pub const PROGRAM_ORDER: [ParameterFamily; 10] = [
    ParameterFamily::Kcat,
    ParameterFamily::Km,
    ParameterFamily::Ki,
    ParameterFamily::DissociationConstant,
    ParameterFamily::TransferConstant,
    ParameterFamily::KcatPhos,
    ParameterFamily::Dgf,
    ParameterFamily::ConcEnzyme,
    ParameterFamily::Drain,
    ParameterFamily::Psi,
];

impl ParameterFamily {
    pub const ALL: [ParameterFamily; 11] = [
        ParameterFamily::Kcat,
        ParameterFamily::Km,
        ParameterFamily::Ki,
        ParameterFamily::DissociationConstant,
        ParameterFamily::TransferConstant,
        ParameterFamily::KcatPhos,
        ParameterFamily::Psi,
        ParameterFamily::Dgf,
        ParameterFamily::ConcEnzyme,
        ParameterFamily::ConcUnbalanced,
        ParameterFamily::Drain,
    ];

    /// Name used for data keys and initial values.
    pub fn name(&self) -> &'static str {
        match self {
            ParameterFamily::Kcat => "kcat",
            ParameterFamily::Km => "km",
            ParameterFamily::Ki => "ki",
            ParameterFamily::DissociationConstant => "dissociation_constant",
            ParameterFamily::TransferConstant => "transfer_constant",
            ParameterFamily::KcatPhos => "kcat_phos",
            ParameterFamily::Psi => "psi",
            ParameterFamily::Dgf => "dgf",
            ParameterFamily::ConcEnzyme => "conc_enzyme",
            ParameterFamily::ConcUnbalanced => "conc_unbalanced",
            ParameterFamily::Drain => "drain",
        }
    }

    /// Whether the family is strictly positive and therefore modelled on a log scale.
    pub fn is_non_negative(&self) -> bool {
        !matches!(
            self,
            ParameterFamily::Psi | ParameterFamily::Dgf | ParameterFamily::Drain
        )
    }

    pub fn shape(&self) -> FamilyShape {
        match self {
            ParameterFamily::Dgf => FamilyShape::Multivariate,
            ParameterFamily::ConcEnzyme
            | ParameterFamily::ConcUnbalanced
            | ParameterFamily::Drain => FamilyShape::Matrix,
            _ => FamilyShape::Vector,
        }
    }
}

impl fmt::Display for ParameterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The code space of every parameter family of one model.
///
/// For [`FamilyShape::Matrix`] families the code space indexes the columns; rows are
/// indexed by the experiment code space.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    kcat: CodeMap,
    km: CodeMap,
    ki: CodeMap,
    dissociation_constant: CodeMap,
    transfer_constant: CodeMap,
    kcat_phos: CodeMap,
    psi: CodeMap,
    dgf: CodeMap,
    conc_enzyme: CodeMap,
    conc_unbalanced: CodeMap,
    drain: CodeMap,
    experiment: CodeMap,
}

impl ParameterSpace {
    /// Derives the code spaces of all parameter families.
    ///
    /// Km ids are `enzyme_mic` pairs collected over the enzymatic edges in edge order:
    /// substrates of every edge, and products of reversible edges. A pair shared by
    /// several edges gets one code. Transfer constants exist for enzymes with at least one
    /// allosteric regulator.
    ///
    /// # Arguments
    ///
    /// * `model` - The validated entity graph
    /// * `codes` - Entity code spaces of the model
    /// * `network` - The edge list of the model
    ///
    /// # Returns
    ///
    /// Returns the parameter space or an [`EncodingError`] on duplicate ids.
    pub fn derive(
        model: &KineticModel,
        codes: &ModelCodes,
        network: &Network,
    ) -> Result<Self, EncodingError> {
        let km_ids = network.enzymatic_edges().flat_map(|edge| {
            let enzyme_id = edge
                .catalyst
                .as_ref()
                .map(|c| c.enzyme_id.clone())
                .unwrap_or_default();
            let products = if edge.is_reversible() {
                edge.products.as_slice()
            } else {
                &[]
            };
            edge.substrates
                .iter()
                .chain(products)
                .map(move |p| join_ids(&[enzyme_id.as_str(), p.mic_id.as_str()]))
                .collect::<Vec<_>>()
        });

        let allosteric_enzymes = model
            .enzymes()
            .iter()
            .filter(|e| model.allosteries().iter().any(|a| a.enzyme_id == e.id))
            .map(|e| e.id.clone());

        let space = Self {
            kcat: CodeMap::new("kcat", codes.enzyme_reaction.ids().iter().cloned())?,
            km: CodeMap::first_appearance("km", km_ids),
            ki: CodeMap::new("ki", codes.competitive_inhibition.ids().iter().cloned())?,
            dissociation_constant: CodeMap::new(
                "dissociation_constant",
                codes.allostery.ids().iter().cloned(),
            )?,
            transfer_constant: CodeMap::new("transfer_constant", allosteric_enzymes)?,
            kcat_phos: CodeMap::new("kcat_phos", codes.phosphorylation.ids().iter().cloned())?,
            psi: CodeMap::new("psi", codes.experiment.ids().iter().cloned())?,
            dgf: CodeMap::new("dgf", codes.metabolite.ids().iter().cloned())?,
            conc_enzyme: CodeMap::new("conc_enzyme", codes.enzyme.ids().iter().cloned())?,
            conc_unbalanced: CodeMap::new(
                "conc_unbalanced",
                codes.unbalanced_mic.ids().iter().cloned(),
            )?,
            drain: CodeMap::new("drain", codes.drain.ids().iter().cloned())?,
            experiment: codes.experiment.clone(),
        };

        log::debug!(
            "Parameter space: {}",
            ParameterFamily::ALL
                .iter()
                .map(|f| format!("{}={}", f, space.targets(*f).len()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(space)
    }

    /// The ids a family is indexed by (columns for matrix families).
    pub fn targets(&self, family: ParameterFamily) -> &CodeMap {
        match family {
            ParameterFamily::Kcat => &self.kcat,
            ParameterFamily::Km => &self.km,
            ParameterFamily::Ki => &self.ki,
            ParameterFamily::DissociationConstant => &self.dissociation_constant,
            ParameterFamily::TransferConstant => &self.transfer_constant,
            ParameterFamily::KcatPhos => &self.kcat_phos,
            ParameterFamily::Psi => &self.psi,
            ParameterFamily::Dgf => &self.dgf,
            ParameterFamily::ConcEnzyme => &self.conc_enzyme,
            ParameterFamily::ConcUnbalanced => &self.conc_unbalanced,
            ParameterFamily::Drain => &self.drain,
        }
    }

    /// Rows of matrix families.
    pub fn experiments(&self) -> &CodeMap {
        &self.experiment
    }

    /// Code of a parameter id within its family.
    pub fn code(&self, family: ParameterFamily, id: &str) -> Result<usize, EncodingError> {
        self.targets(family).code(id)
    }

    /// Number of scalar parameters of a family, counting every experiment for matrix families.
    pub fn size(&self, family: ParameterFamily) -> usize {
        match family.shape() {
            FamilyShape::Matrix => self.experiment.len() * self.targets(family).len(),
            FamilyShape::Vector | FamilyShape::Multivariate => self.targets(family).len(),
        }
    }
}

/// Positions of every family within the experiment-resolved parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLayout {
    /// `(family, offset, size)` in [`PROGRAM_ORDER`].
    slots: Vec<(ParameterFamily, usize, usize)>,
    len: usize,
}

impl ParameterLayout {
    pub fn new(space: &ParameterSpace) -> Self {
        let mut slots = Vec::with_capacity(PROGRAM_ORDER.len());
        let mut offset = 0;

        for family in PROGRAM_ORDER {
            let size = match family {
                ParameterFamily::Psi => 1,
                _ => space.targets(family).len(),
            };
            slots.push((family, offset, size));
            offset += size;
        }

        Self { slots, len: offset }
    }

    /// 1-based position of the parameter with the given code.
    ///
    /// For per-experiment families the code is the column code; the row is implied by
    /// the experiment being simulated. `psi` only has code 1.
    pub fn index(&self, family: ParameterFamily, code: usize) -> Result<usize, EncodingError> {
        let (_, offset, size) = self
            .slots
            .iter()
            .find(|(f, _, _)| *f == family)
            .copied()
            .ok_or_else(|| EncodingError::UnknownId {
                space: "parameter vector".to_string(),
                id: family.to_string(),
            })?;

        if code == 0 || code > size {
            return Err(EncodingError::UnknownCode {
                space: family.to_string(),
                code,
                size,
            });
        }

        Ok(offset + code)
    }

    /// `(family, offset, size)` of every slot in vector order.
    pub fn slots(&self) -> &[(ParameterFamily, usize, usize)] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Positions within the vector of known real constants.
///
/// `[temperature, enzyme knockout mask..., phosphorylation knockout mask...]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownRealLayout {
    n_enzyme: usize,
    n_phosphorylation: usize,
}

impl KnownRealLayout {
    pub fn new(n_enzyme: usize, n_phosphorylation: usize) -> Self {
        Self {
            n_enzyme,
            n_phosphorylation,
        }
    }

    pub fn temperature(&self) -> usize {
        1
    }

    /// Position of the knockout mask entry of an enzyme code.
    pub fn enzyme_mask(&self, enzyme_code: usize) -> usize {
        1 + enzyme_code
    }

    /// Position of the knockout mask entry of a phosphorylation code.
    pub fn phosphorylation_mask(&self, phosphorylation_code: usize) -> usize {
        1 + self.n_enzyme + phosphorylation_code
    }

    pub fn len(&self) -> usize {
        1 + self.n_enzyme + self.n_phosphorylation
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_model;
    use crate::model::*;
    use crate::stoich::build_network;

    fn create_test_model() -> KineticModel {
        let mic = |m: &str| {
            MetaboliteInCompartmentBuilder::default()
                .metabolite_id(m)
                .compartment_id("c")
                .balanced(m != "z")
                .build()
                .unwrap()
        };

        let raw = RawModelBuilder::default()
            .name("params")
            .to_compartments(CompartmentBuilder::default().id("c").build().unwrap())
            .to_metabolites(MetaboliteBuilder::default().id("a").build().unwrap())
            .to_metabolites(MetaboliteBuilder::default().id("b").build().unwrap())
            .to_metabolites(MetaboliteBuilder::default().id("z").build().unwrap())
            .to_mics(mic("a"))
            .to_mics(mic("b"))
            .to_mics(mic("z"))
            .to_enzymes(EnzymeBuilder::default().id("e1").build().unwrap())
            .to_enzymes(EnzymeBuilder::default().id("e2").build().unwrap())
            .to_reactions(
                ReactionBuilder::default()
                    .id("r1")
                    .to_stoichiometry(("a_c".to_string(), -1.0))
                    .to_stoichiometry(("b_c".to_string(), 1.0))
                    .build()
                    .unwrap(),
            )
            .to_reactions(
                ReactionBuilder::default()
                    .id("r2")
                    .mechanism(Mechanism::IrreversibleSaturating)
                    .to_stoichiometry(("b_c".to_string(), -1.0))
                    .to_stoichiometry(("z_c".to_string(), 1.0))
                    .build()
                    .unwrap(),
            )
            .to_reactions(
                ReactionBuilder::default()
                    .id("d")
                    .mechanism(Mechanism::Drain)
                    .to_stoichiometry(("a_c".to_string(), 1.0))
                    .build()
                    .unwrap(),
            )
            .to_enzyme_reactions(
                EnzymeReactionBuilder::default()
                    .enzyme_id("e1")
                    .reaction_id("r1")
                    .build()
                    .unwrap(),
            )
            .to_enzyme_reactions(
                EnzymeReactionBuilder::default()
                    .enzyme_id("e1")
                    .reaction_id("r2")
                    .build()
                    .unwrap(),
            )
            .to_enzyme_reactions(
                EnzymeReactionBuilder::default()
                    .enzyme_id("e2")
                    .reaction_id("r2")
                    .build()
                    .unwrap(),
            )
            .to_allosteries(
                AllosteryBuilder::default()
                    .enzyme_id("e2")
                    .mic_id("z_c")
                    .modification_type(ModificationType::Inhibition)
                    .build()
                    .unwrap(),
            )
            .to_experiments(ExperimentBuilder::default().id("x1").build().unwrap())
            .to_experiments(ExperimentBuilder::default().id("x2").build().unwrap())
            .build()
            .unwrap();

        load_model(raw).expect("Failed to load test model")
    }

    fn space() -> ParameterSpace {
        let model = create_test_model();
        let codes = ModelCodes::codify(&model).unwrap();
        let network = build_network(&model, &codes).unwrap();
        ParameterSpace::derive(&model, &codes, &network).unwrap()
    }

    #[test]
    fn test_km_ids_follow_first_appearance() {
        let space = space();
        // e1_r1 is reversible and contributes its product; e1_r2 repeats e1_b_c.
        assert_eq!(
            space.targets(ParameterFamily::Km).ids(),
            &["e1_a_c", "e1_b_c", "e2_b_c"]
        );
    }

    #[test]
    fn test_family_targets() {
        let space = space();
        assert_eq!(
            space.targets(ParameterFamily::Kcat).ids(),
            &["e1_r1", "e1_r2", "e2_r2"]
        );
        assert_eq!(space.targets(ParameterFamily::TransferConstant).ids(), &["e2"]);
        assert_eq!(space.targets(ParameterFamily::Dgf).ids(), &["a", "b", "z"]);
        assert_eq!(space.targets(ParameterFamily::ConcUnbalanced).ids(), &["z_c"]);
        assert_eq!(space.targets(ParameterFamily::Drain).ids(), &["d"]);
        assert_eq!(space.size(ParameterFamily::ConcEnzyme), 4);
        assert_eq!(space.size(ParameterFamily::Psi), 2);
    }

    #[test]
    fn test_layout_offsets() {
        let layout = ParameterLayout::new(&space());

        // kcat 3, km 3, ki 0, diss 1, tc 1, kcat_phos 0, dgf 3, conc_enzyme 2, drain 1, psi 1
        assert_eq!(layout.index(ParameterFamily::Kcat, 1).unwrap(), 1);
        assert_eq!(layout.index(ParameterFamily::Km, 3).unwrap(), 6);
        assert_eq!(layout.index(ParameterFamily::DissociationConstant, 1).unwrap(), 7);
        assert_eq!(layout.index(ParameterFamily::TransferConstant, 1).unwrap(), 8);
        assert_eq!(layout.index(ParameterFamily::Dgf, 1).unwrap(), 9);
        assert_eq!(layout.index(ParameterFamily::ConcEnzyme, 2).unwrap(), 13);
        assert_eq!(layout.index(ParameterFamily::Drain, 1).unwrap(), 14);
        assert_eq!(layout.index(ParameterFamily::Psi, 1).unwrap(), 15);
        assert_eq!(layout.len(), 15);
    }

    #[test]
    fn test_layout_rejects_out_of_range_codes() {
        let layout = ParameterLayout::new(&space());
        assert!(layout.index(ParameterFamily::Ki, 1).is_err());
        assert!(layout.index(ParameterFamily::Kcat, 0).is_err());
        assert!(layout.index(ParameterFamily::ConcUnbalanced, 1).is_err());
    }

    #[test]
    fn test_known_real_layout() {
        let layout = KnownRealLayout::new(3, 2);
        assert_eq!(layout.temperature(), 1);
        assert_eq!(layout.enzyme_mask(3), 4);
        assert_eq!(layout.phosphorylation_mask(1), 5);
        assert_eq!(layout.len(), 6);
    }

    #[test]
    fn test_family_serde_names() {
        let json = serde_json::to_string(&ParameterFamily::DissociationConstant).unwrap();
        assert_eq!(json, "\"dissociation_constant\"");
        for family in ParameterFamily::ALL {
            let parsed: ParameterFamily =
                serde_json::from_str(&format!("\"{}\"", family.name())).unwrap();
            assert_eq!(parsed, family);
        }
    }
}
