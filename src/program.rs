//! Program Text
//!
//! Assembles the generated functions into the text of the solver program and computes
//! its content hash. The text is a pure function of the compiled model: iteration is
//! always in code order, so compiling the same input twice gives byte-identical text
//! and the hash can be used to skip rewriting an unchanged program.
//!
//! The program defines three functions:
//!
//! - `get_fluxes(metabolite, parameter, known_real)`: the auxiliaries and flux of every edge.
//! - `ode_func(t, balanced, unbalanced, parameter, known_real)`: the rate of change of
//!   every balanced mic, divided by its compartment volume.
//! - `steady_state_equation(balanced, unbalanced, parameter, known_real)`: `ode_func` at `t = 0`.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::codify::ModelCodes;
use crate::error::EncodingError;
use crate::model::KineticModel;
use crate::parameters::{KnownRealLayout, ParameterLayout};
use crate::ratelaw::expression::EdgeExpressions;
use crate::stoich::Network;

const INDENT: &str = "  ";

/// Generated program text together with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    text: String,
    hash: String,
}

impl Program {
    pub fn new(text: String) -> Self {
        let hash = content_hash(&text);
        Self { text, hash }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hex-encoded SHA-256 of the text.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Hex-encoded SHA-256 digest of a string.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Assembles the program of a compiled model.
///
/// # Arguments
///
/// * `model` - The validated entity graph, for names and compartment volumes
/// * `codes` - Entity code spaces
/// * `network` - Edges and stoichiometric matrix
/// * `expressions` - Generated expressions of every edge, in edge code order
/// * `layout` - Layout of the parameter vector, listed in the header
/// * `known` - Layout of the known real vector, listed in the header
///
/// # Returns
///
/// The [`Program`], or an [`EncodingError`] if a mic or compartment has no code.
pub fn assemble_program(
    model: &KineticModel,
    codes: &ModelCodes,
    network: &Network,
    expressions: &[EdgeExpressions],
    layout: &ParameterLayout,
    known: &KnownRealLayout,
) -> Result<Program, EncodingError> {
    let mut lines = header(model, codes, layout, known);

    lines.push("functions {".to_string());
    lines.extend(get_fluxes(expressions, network.edges().len()));
    lines.push(String::new());
    lines.extend(ode_func(model, codes, network)?);
    lines.push(String::new());
    lines.extend(steady_state_equation());
    lines.push("}".to_string());

    let mut text = lines.join("\n");
    text.push('\n');

    let program = Program::new(text);
    log::info!(
        "Assembled program for '{}' ({} bytes, sha256 {})",
        model.name(),
        program.text().len(),
        program.hash()
    );

    Ok(program)
}

fn header(
    model: &KineticModel,
    codes: &ModelCodes,
    layout: &ParameterLayout,
    known: &KnownRealLayout,
) -> Vec<String> {
    let mut lines = vec![
        format!("// Kinetic model '{}'", model.name()),
        "//".to_string(),
        format!("// metabolite[1..{}]: mic concentrations by mic code", codes.mic.len()),
        format!("// parameter[1..{}]:", layout.len()),
    ];

    for (family, offset, size) in layout.slots() {
        if *size > 0 {
            lines.push(format!(
                "//   {family}: [{}..{}]",
                offset + 1,
                offset + size
            ));
        }
    }

    let mut known_line = format!("// known_real[1..{}]: temperature [1]", known.len());
    if !codes.enzyme.is_empty() {
        let _ = write!(
            known_line,
            ", enzyme mask [{}..{}]",
            known.enzyme_mask(1),
            known.enzyme_mask(codes.enzyme.len())
        );
    }
    if !codes.phosphorylation.is_empty() {
        let _ = write!(
            known_line,
            ", phosphorylation mask [{}..{}]",
            known.phosphorylation_mask(1),
            known.phosphorylation_mask(codes.phosphorylation.len())
        );
    }
    lines.push(known_line);
    lines.push(String::new());

    lines
}

fn get_fluxes(expressions: &[EdgeExpressions], n_edge: usize) -> Vec<String> {
    let mut lines = vec![
        format!("{INDENT}vector get_fluxes(vector metabolite, vector parameter, vector known_real) {{"),
        format!("{INDENT}{INDENT}vector[{n_edge}] flux;"),
    ];

    for edge in expressions {
        lines.push(format!(
            "{INDENT}{INDENT}// {} ({})",
            edge.edge_id, edge.rate_law
        ));
        for auxiliary in &edge.auxiliaries {
            lines.push(format!(
                "{INDENT}{INDENT}real {} = {};",
                auxiliary.name, auxiliary.expression
            ));
        }
        lines.push(format!(
            "{INDENT}{INDENT}flux[{}] = {};",
            edge.edge_code, edge.flux
        ));
    }

    lines.push(format!("{INDENT}{INDENT}return flux;"));
    lines.push(format!("{INDENT}}}"));
    lines
}

fn ode_func(
    model: &KineticModel,
    codes: &ModelCodes,
    network: &Network,
) -> Result<Vec<String>, EncodingError> {
    let n_mic = codes.mic.len();
    let n_balanced = codes.balanced_mic.len();
    let n_edge = network.edges().len();

    let mut lines = vec![
        format!(
            "{INDENT}vector ode_func(real t, vector balanced, vector unbalanced, vector parameter, vector known_real) {{"
        ),
        format!("{INDENT}{INDENT}vector[{n_mic}] metabolite;"),
    ];

    for (mic_code, mic_id) in codes.mic.iter() {
        let source = match codes.balanced_mic.get(mic_id) {
            Some(code) => format!("balanced[{code}]"),
            None => format!("unbalanced[{}]", codes.unbalanced_mic.code(mic_id)?),
        };
        lines.push(format!("{INDENT}{INDENT}metabolite[{mic_code}] = {source};"));
    }

    lines.push(format!(
        "{INDENT}{INDENT}vector[{n_edge}] flux = get_fluxes(metabolite, parameter, known_real);"
    ));
    lines.push(format!("{INDENT}{INDENT}vector[{n_balanced}] dbdt;"));

    let stoichiometry = network.stoichiometry();
    for (balanced_code, mic_id) in codes.balanced_mic.iter() {
        let row = codes.mic.code(mic_id)? - 1;
        let terms = stoichiometry
            .row(row)
            .iter()
            .enumerate()
            .filter(|(_, coefficient)| **coefficient != 0.0)
            .map(|(column, coefficient)| format!("{coefficient:?}*flux[{}]", column + 1))
            .collect::<Vec<_>>();

        let rate = if terms.is_empty() {
            "0".to_string()
        } else {
            terms.join(" + ")
        };

        let volume = compartment_volume(model, mic_id)?;
        let rhs = if volume == 1.0 {
            rate
        } else {
            format!("({rate})/{volume:?}")
        };
        lines.push(format!("{INDENT}{INDENT}dbdt[{balanced_code}] = {rhs};"));
    }

    lines.push(format!("{INDENT}{INDENT}return dbdt;"));
    lines.push(format!("{INDENT}}}"));
    Ok(lines)
}

fn steady_state_equation() -> Vec<String> {
    vec![
        format!(
            "{INDENT}vector steady_state_equation(vector balanced, vector unbalanced, vector parameter, vector known_real) {{"
        ),
        format!("{INDENT}{INDENT}return ode_func(0, balanced, unbalanced, parameter, known_real);"),
        format!("{INDENT}}}"),
    ]
}

fn compartment_volume(model: &KineticModel, mic_id: &str) -> Result<f64, EncodingError> {
    model
        .mic(mic_id)
        .and_then(|mic| model.compartment(&mic.compartment_id))
        .map(|compartment| compartment.volume)
        .ok_or_else(|| EncodingError::UnknownId {
            space: "compartment".to_string(),
            id: mic_id.to_string(),
        })
}
