use crate::codify::ModelCodes;
use crate::config::CompilerConfig;
use crate::error::EncodingError;
use crate::model::{join_ids, KineticModel};
use crate::parameters::{KnownRealLayout, ParameterFamily, ParameterLayout, ParameterSpace};

/// Resolves names to positional array accesses while rate laws are generated.
///
/// Every access the generated text contains goes through this type, so no name survives
/// into the emitted program.
#[derive(Debug, Clone)]
pub struct RateLawContext<'a> {
    space: &'a ParameterSpace,
    layout: &'a ParameterLayout,
    known: KnownRealLayout,
    /// Metabolite code of each mic, indexed by mic code - 1.
    mic_to_metabolite: Vec<usize>,
    dgf_water: f64,
}

impl<'a> RateLawContext<'a> {
    pub fn new(
        model: &KineticModel,
        codes: &ModelCodes,
        space: &'a ParameterSpace,
        layout: &'a ParameterLayout,
        config: &CompilerConfig,
    ) -> Result<Self, EncodingError> {
        let mic_to_metabolite = model
            .mics()
            .iter()
            .map(|mic| codes.metabolite.code(&mic.metabolite_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            space,
            layout,
            known: KnownRealLayout::new(codes.enzyme.len(), codes.phosphorylation.len()),
            mic_to_metabolite,
            dgf_water: config.dgf_water,
        })
    }

    /// `parameter[j]` for a parameter code of a family.
    pub fn parameter(&self, family: ParameterFamily, code: usize) -> Result<String, EncodingError> {
        Ok(format!("parameter[{}]", self.layout.index(family, code)?))
    }

    /// `parameter[j]` for a parameter id of a family.
    pub fn parameter_by_id(&self, family: ParameterFamily, id: &str) -> Result<String, EncodingError> {
        self.parameter(family, self.space.code(family, id)?)
    }

    /// Km of an enzyme for a mic.
    pub fn km(&self, enzyme_id: &str, mic_id: &str) -> Result<String, EncodingError> {
        self.parameter_by_id(ParameterFamily::Km, &join_ids(&[enzyme_id, mic_id]))
    }

    /// Formation energy of the metabolite a mic is an instance of.
    pub fn dgf(&self, mic_code: usize) -> Result<String, EncodingError> {
        let metabolite_code = mic_code
            .checked_sub(1)
            .and_then(|i| self.mic_to_metabolite.get(i))
            .copied()
            .ok_or_else(|| EncodingError::UnknownCode {
                space: "mic".to_string(),
                code: mic_code,
                size: self.mic_to_metabolite.len(),
            })?;
        self.parameter(ParameterFamily::Dgf, metabolite_code)
    }

    pub fn metabolite(&self, mic_code: usize) -> String {
        format!("metabolite[{mic_code}]")
    }

    pub fn temperature(&self) -> String {
        format!("known_real[{}]", self.known.temperature())
    }

    pub fn enzyme_mask(&self, enzyme_code: usize) -> String {
        format!("known_real[{}]", self.known.enzyme_mask(enzyme_code))
    }

    pub fn phosphorylation_mask(&self, phosphorylation_code: usize) -> String {
        format!("known_real[{}]", self.known.phosphorylation_mask(phosphorylation_code))
    }

    pub fn dgf_water(&self) -> f64 {
        self.dgf_water
    }
}
