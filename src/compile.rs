//! End-to-end compilation.
//!
//! [`compile`] runs every stage in order and either returns the three artifacts of a
//! model or the first error. Stages never run on a model that failed validation, and no
//! partial result is handed out on failure.

use crate::codify::ModelCodes;
use crate::config::CompilerConfig;
use crate::data::{assemble_data, initial_parameter_values, DataSources, NumericInput};
use crate::error::CompileError;
use crate::loader::load_model;
use crate::model::RawModel;
use crate::parameters::{KnownRealLayout, ParameterLayout, ParameterSpace};
use crate::priors::assemble::assemble_priors;
use crate::program::{assemble_program, Program};
use crate::ratelaw::context::RateLawContext;
use crate::ratelaw::generate::generate_fluxes;
use crate::stoich::build_network;

/// The artifacts of a compiled model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModel {
    /// Name of the model, used to name the artifact files.
    pub name: String,
    /// Program text and its hash.
    pub program: Program,
    /// Keyed numeric input.
    pub data: NumericInput,
    /// Initial parameter values keyed by family name.
    pub inits: NumericInput,
}

/// Compiles a declarative model into program text, numeric input and initial values.
///
/// # Arguments
///
/// * `raw` - The parsed model records
/// * `config` - Compiler configuration
///
/// # Returns
///
/// The [`CompiledModel`], or a [`CompileError`] naming the stage that failed.
///
/// # Examples
///
/// ```
/// use kinetic_compiler::compile::compile;
/// use kinetic_compiler::config::CompilerConfig;
/// use kinetic_compiler::model::RawModel;
///
/// let raw: RawModel = serde_json::from_str(r#"{
///     "name": "exchange",
///     "compartments": [{"id": "c"}],
///     "metabolites": [{"id": "a"}],
///     "mics": [{"metabolite_id": "a", "compartment_id": "c"}],
///     "reactions": [
///         {"id": "in", "mechanism": "drain", "stoichiometry": {"a_c": 1.0}},
///         {"id": "out", "mechanism": "drain", "stoichiometry": {"a_c": -1.0}}
///     ],
///     "experiments": [{"id": "x"}]
/// }"#).unwrap();
///
/// let compiled = compile(raw, &CompilerConfig::default()).unwrap();
/// assert!(compiled.program.text().contains("flux[2] = parameter[3];"));
/// ```
pub fn compile(raw: RawModel, config: &CompilerConfig) -> Result<CompiledModel, CompileError> {
    let model = load_model(raw)?;
    let codes = ModelCodes::codify(&model)?;
    let network = build_network(&model, &codes)?;
    let space = ParameterSpace::derive(&model, &codes, &network)?;
    let layout = ParameterLayout::new(&space);
    let known = KnownRealLayout::new(codes.enzyme.len(), codes.phosphorylation.len());

    let priors = assemble_priors(&model, &space, config)?;

    let ctx = RateLawContext::new(&model, &codes, &space, &layout, config)?;
    let expressions = generate_fluxes(&network, &ctx)?;
    let program = assemble_program(&model, &codes, &network, &expressions, &layout, &known)?;

    let data = assemble_data(DataSources {
        model: &model,
        codes: &codes,
        network: &network,
        space: &space,
        layout: &layout,
        priors: &priors,
        config,
    })?;
    let inits = initial_parameter_values(&priors);

    log::info!(
        "Compiled '{}': {} edges, {} parameters",
        model.name(),
        network.edges().len(),
        layout.len()
    );

    Ok(CompiledModel {
        name: model.name().to_string(),
        program,
        data,
        inits,
    })
}
