//! Numeric Input Assembler
//!
//! Produces the keyed numeric input the solver reads next to the program: counts of
//! every code space, index arrays, the stoichiometric matrix, ragged per-edge and
//! per-experiment collections, measurements, known constants, prior arrays and initial
//! concentrations. Every array is in code order, so positions agree with the program.
//!
//! The same [`NumericInput`] container also carries the initial parameter values, keyed
//! by family name.

use std::borrow::Cow;
use std::collections::BTreeMap;

use nalgebra::DMatrix;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::codify::ModelCodes;
use crate::config::CompilerConfig;
use crate::error::EncodingError;
use crate::model::{join_ids, Experiment, KineticModel, MeasurementType};
use crate::parameters::{KnownRealLayout, ParameterFamily, ParameterLayout, ParameterSpace};
use crate::priors::assemble::PriorSet;
use crate::ragged::RaggedArray;
use crate::stoich::{Edge, Network};

/// One value of the numeric input.
///
/// JSON carries no element type for empty arrays, so `[]` and rows of `[]` read back
/// as the integer variants. Accessors and equality treat an empty integer array and an
/// empty real array of the same shape as the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Int(i64),
    Real(f64),
    IntVector(Vec<i64>),
    RealVector(Vec<f64>),
    IntMatrix(Vec<Vec<i64>>),
    RealMatrix(Vec<Vec<f64>>),
}

impl DataValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            DataValue::Real(value) => Some(*value),
            DataValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_int_vector(&self) -> Option<&[i64]> {
        match self {
            DataValue::IntVector(values) => Some(values),
            DataValue::RealVector(values) if values.is_empty() => Some(&[] as &[i64]),
            _ => None,
        }
    }

    pub fn as_real_vector(&self) -> Option<&[f64]> {
        match self {
            DataValue::RealVector(values) => Some(values),
            DataValue::IntVector(values) if values.is_empty() => Some(&[] as &[f64]),
            _ => None,
        }
    }

    pub fn as_int_matrix(&self) -> Option<Cow<'_, [Vec<i64>]>> {
        match self {
            DataValue::IntMatrix(rows) => Some(Cow::Borrowed(rows)),
            DataValue::RealMatrix(rows) if all_empty(rows) => {
                Some(Cow::Owned(vec![Vec::new(); rows.len()]))
            }
            _ => None,
        }
    }

    pub fn as_real_matrix(&self) -> Option<Cow<'_, [Vec<f64>]>> {
        match self {
            DataValue::RealMatrix(rows) => Some(Cow::Borrowed(rows)),
            DataValue::IntMatrix(rows) if all_empty(rows) => {
                Some(Cow::Owned(vec![Vec::new(); rows.len()]))
            }
            _ => None,
        }
    }
}

fn all_empty<T>(rows: &[Vec<T>]) -> bool {
    rows.iter().all(Vec::is_empty)
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        use DataValue::*;

        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Real(a), Real(b)) => a == b,
            (IntVector(a), IntVector(b)) => a == b,
            (RealVector(a), RealVector(b)) => a == b,
            (IntMatrix(a), IntMatrix(b)) => a == b,
            (RealMatrix(a), RealMatrix(b)) => a == b,
            (IntVector(a), RealVector(b)) | (RealVector(b), IntVector(a)) => {
                a.is_empty() && b.is_empty()
            }
            (IntMatrix(a), RealMatrix(b)) | (RealMatrix(b), IntMatrix(a)) => {
                a.len() == b.len() && all_empty(a) && all_empty(b)
            }
            _ => false,
        }
    }
}

/// Keyed numeric input, serialised as a flat JSON object with sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumericInput(BTreeMap<String, DataValue>);

impl NumericInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: DataValue) {
        self.0.insert(key.into(), value);
    }

    fn count(&mut self, key: impl Into<String>, n: usize) {
        self.insert(key, DataValue::Int(n as i64));
    }

    fn ints<I: IntoIterator<Item = usize>>(&mut self, key: impl Into<String>, values: I) {
        self.insert(
            key,
            DataValue::IntVector(values.into_iter().map(|v| v as i64).collect()),
        );
    }

    fn reals<I: IntoIterator<Item = f64>>(&mut self, key: impl Into<String>, values: I) {
        self.insert(key, DataValue::RealVector(values.into_iter().collect()));
    }

    fn real_matrix(&mut self, key: impl Into<String>, rows: Vec<Vec<f64>>) {
        self.insert(key, DataValue::RealMatrix(rows));
    }

    /// Inserts `<name>` (flat) and `<name>_bounds` (one row per group).
    fn ragged(&mut self, name: &str, ragged: &RaggedArray) {
        self.ints(name, ragged.flat().iter().copied());
        self.insert(
            format!("{name}_bounds"),
            DataValue::IntMatrix(
                ragged
                    .bounds()
                    .iter()
                    .map(|&(start, end)| vec![start as i64, end as i64])
                    .collect(),
            ),
        );
    }
}

impl<'a> IntoIterator for &'a NumericInput {
    type Item = (&'a String, &'a DataValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, DataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything [`assemble_data`] reads.
#[derive(Debug, Clone, Copy)]
pub struct DataSources<'a> {
    pub model: &'a KineticModel,
    pub codes: &'a ModelCodes,
    pub network: &'a Network,
    pub space: &'a ParameterSpace,
    pub layout: &'a ParameterLayout,
    pub priors: &'a PriorSet,
    pub config: &'a CompilerConfig,
}

/// Assembles the numeric input of a compiled model.
///
/// # Returns
///
/// The [`NumericInput`], or an [`EncodingError`] if an id referenced by the model has no
/// code in its space.
pub fn assemble_data(sources: DataSources) -> Result<NumericInput, EncodingError> {
    let DataSources {
        model,
        codes,
        network,
        space,
        layout,
        priors,
        config,
    } = sources;
    let known = KnownRealLayout::new(codes.enzyme.len(), codes.phosphorylation.len());
    let mut data = NumericInput::new();

    insert_counts(&mut data, codes, space, layout, &known);
    insert_structure(&mut data, model, codes, network)?;
    insert_edge_groups(&mut data, network, space)?;
    insert_experiments(&mut data, model, codes, &known)?;
    insert_measurements(&mut data, model, codes)?;
    insert_priors(&mut data, priors);

    let conc_init = initial_concentrations(model, codes, priors, config)?;
    data.real_matrix("conc_init", rows(&conc_init));

    log::info!("Assembled numeric input with {} keys", data.len());
    Ok(data)
}

fn insert_counts(
    data: &mut NumericInput,
    codes: &ModelCodes,
    space: &ParameterSpace,
    layout: &ParameterLayout,
    known: &KnownRealLayout,
) {
    let entity_spaces = [
        &codes.metabolite,
        &codes.compartment,
        &codes.mic,
        &codes.balanced_mic,
        &codes.unbalanced_mic,
        &codes.enzyme,
        &codes.reaction,
        &codes.drain,
        &codes.enzyme_reaction,
        &codes.edge,
        &codes.experiment,
        &codes.competitive_inhibition,
        &codes.allostery,
        &codes.phosphorylation,
    ];
    for map in entity_spaces {
        data.count(format!("N_{}", map.space()), map.len());
    }

    for family in ParameterFamily::ALL {
        data.count(format!("N_{family}"), space.targets(family).len());
    }

    data.count("N_parameter", layout.len());
    data.count("N_known_real", known.len());
}

fn insert_structure(
    data: &mut NumericInput,
    model: &KineticModel,
    codes: &ModelCodes,
    network: &Network,
) -> Result<(), EncodingError> {
    data.real_matrix("S", rows(network.stoichiometry()));

    let balanced = codes.balanced_mic.ids().iter().map(String::as_str);
    data.ints("balanced_mic_ix", codes.mic.codes(balanced)?);
    let unbalanced = codes.unbalanced_mic.ids().iter().map(String::as_str);
    data.ints("unbalanced_mic_ix", codes.mic.codes(unbalanced)?);

    let mic_to_met = model
        .mics()
        .iter()
        .map(|mic| codes.metabolite.code(&mic.metabolite_id))
        .collect::<Result<Vec<_>, _>>()?;
    data.ints("mic_to_met", mic_to_met);

    let mic_to_compartment = model
        .mics()
        .iter()
        .map(|mic| codes.compartment.code(&mic.compartment_id))
        .collect::<Result<Vec<_>, _>>()?;
    data.ints("mic_to_compartment", mic_to_compartment);
    data.reals(
        "compartment_volume",
        model.compartments().iter().map(|c| c.volume),
    );
    data.ints(
        "subunits",
        model.enzymes().iter().map(|e| e.subunits as usize),
    );

    let edges = network.edges();
    data.ints("edge_type", edges.iter().map(|e| e.mechanism.code() as usize));
    data.ints(
        "edge_to_enzyme",
        edges
            .iter()
            .map(|e| e.catalyst.as_ref().map_or(0, |c| c.enzyme_code)),
    );
    data.ints("edge_to_reaction", edges.iter().map(|e| e.reaction_code));
    data.ints("edge_to_drain", edges.iter().map(|e| e.drain_code.unwrap_or(0)));
    data.reals(
        "water_stoichiometry",
        edges.iter().map(|e| e.water_stoichiometry),
    );
    data.reals(
        "transported_charge",
        edges.iter().map(|e| e.transported_charge),
    );

    Ok(())
}

fn insert_edge_groups(
    data: &mut NumericInput,
    network: &Network,
    space: &ParameterSpace,
) -> Result<(), EncodingError> {
    let edges = network.edges();

    data.ragged(
        "edge_substrate",
        &RaggedArray::encode(edges.iter().map(|e| e.substrates.iter().map(|p| p.mic_code))),
    );
    data.ragged(
        "edge_product",
        &RaggedArray::encode(edges.iter().map(|e| e.products.iter().map(|p| p.mic_code))),
    );

    let substrate_km = edges
        .iter()
        .map(|e| km_codes(e, space, false))
        .collect::<Result<Vec<_>, _>>()?;
    data.ragged("edge_substrate_km", &RaggedArray::encode(substrate_km));

    let product_km = edges
        .iter()
        .map(|e| km_codes(e, space, true))
        .collect::<Result<Vec<_>, _>>()?;
    data.ragged("edge_product_km", &RaggedArray::encode(product_km));

    data.ragged(
        "edge_ci",
        &RaggedArray::encode(
            edges
                .iter()
                .map(|e| e.competitive_inhibitors.iter().map(|ci| ci.code)),
        ),
    );
    data.ragged(
        "edge_allostery",
        &RaggedArray::encode(
            edges
                .iter()
                .map(|e| e.allosteric_regulators.iter().map(|a| a.code)),
        ),
    );
    data.ragged(
        "edge_phosphorylation",
        &RaggedArray::encode(edges.iter().map(|e| e.phosphorylations.iter().map(|p| p.code))),
    );

    Ok(())
}

/// Km codes of an edge's substrates, or of its products if it is reversible.
fn km_codes(edge: &Edge, space: &ParameterSpace, products: bool) -> Result<Vec<usize>, EncodingError> {
    let Some(catalyst) = &edge.catalyst else {
        return Ok(Vec::new());
    };
    let participants = match (products, edge.is_reversible()) {
        (false, _) => &edge.substrates,
        (true, true) => &edge.products,
        (true, false) => return Ok(Vec::new()),
    };

    participants
        .iter()
        .map(|p| {
            space.code(
                ParameterFamily::Km,
                &join_ids(&[catalyst.enzyme_id.as_str(), p.mic_id.as_str()]),
            )
        })
        .collect()
}

fn insert_experiments(
    data: &mut NumericInput,
    model: &KineticModel,
    codes: &ModelCodes,
    known: &KnownRealLayout,
) -> Result<(), EncodingError> {
    let experiments = model.experiments();

    data.reals("temperature", experiments.iter().map(|e| e.temperature));
    data.ints("is_train", experiments.iter().map(|e| usize::from(e.is_train)));
    data.ints("is_test", experiments.iter().map(|e| usize::from(e.is_test)));

    let enzyme_knockouts = experiments
        .iter()
        .map(|e| codes.enzyme.codes(e.enzyme_knockouts.iter().map(String::as_str)))
        .collect::<Result<Vec<_>, _>>()?;
    let phosphorylation_knockouts = experiments
        .iter()
        .map(|e| {
            codes
                .phosphorylation
                .codes(e.phosphorylation_knockouts.iter().map(String::as_str))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let known_reals = experiments
        .iter()
        .zip(enzyme_knockouts.iter().zip(&phosphorylation_knockouts))
        .map(|(experiment, (enzymes, phosphorylations))| {
            known_real_row(experiment, enzymes, phosphorylations, known)
        })
        .collect::<Vec<_>>();
    data.real_matrix("known_reals", known_reals);

    data.ragged("enzyme_knockout", &RaggedArray::encode(enzyme_knockouts));
    data.ragged(
        "phosphorylation_knockout",
        &RaggedArray::encode(phosphorylation_knockouts),
    );

    Ok(())
}

/// `[temperature, enzyme mask..., phosphorylation mask...]` of one experiment.
fn known_real_row(
    experiment: &Experiment,
    enzyme_knockouts: &[usize],
    phosphorylation_knockouts: &[usize],
    known: &KnownRealLayout,
) -> Vec<f64> {
    let mut row = vec![1.0; known.len()];
    row[known.temperature() - 1] = experiment.temperature;

    for &code in enzyme_knockouts {
        row[known.enzyme_mask(code) - 1] = 0.0;
    }
    for &code in phosphorylation_knockouts {
        row[known.phosphorylation_mask(code) - 1] = 0.0;
    }

    row
}

/// One measurement type as parallel arrays.
#[derive(Default)]
struct MeasurementColumns {
    values: Vec<f64>,
    sigmas: Vec<f64>,
    experiments: Vec<usize>,
    targets: Vec<usize>,
}

fn insert_measurements(
    data: &mut NumericInput,
    model: &KineticModel,
    codes: &ModelCodes,
) -> Result<(), EncodingError> {
    let kinds = [
        (MeasurementType::Concentration, "conc", "mic_ix_yconc", &codes.mic),
        (MeasurementType::Flux, "flux", "reaction_ix_yflux", &codes.reaction),
        (
            MeasurementType::EnzymeConcentration,
            "enz",
            "enzyme_ix_yenz",
            &codes.enzyme,
        ),
    ];

    for (measurement_type, suffix, target_key, targets) in kinds {
        let mut columns = MeasurementColumns::default();

        for (experiment_code, experiment) in model.experiments().iter().enumerate() {
            for measurement in experiment
                .measurements
                .iter()
                .filter(|m| m.target_type == measurement_type)
            {
                columns.values.push(measurement.value);
                columns.sigmas.push(measurement.error_scale);
                columns.experiments.push(experiment_code + 1);
                columns.targets.push(targets.code(&measurement.target_id)?);
            }
        }

        data.count(format!("N_y_{suffix}"), columns.values.len());
        data.reals(format!("y_{suffix}"), columns.values);
        data.reals(format!("sigma_{suffix}"), columns.sigmas);
        data.ints(format!("experiment_y{suffix}"), columns.experiments);
        data.ints(target_key, columns.targets);
    }

    Ok(())
}

fn insert_priors(data: &mut NumericInput, priors: &PriorSet) {
    for (family, prior) in priors.vectors() {
        data.reals(format!("prior_loc_{family}"), prior.location.iter().copied());
        data.reals(format!("prior_scale_{family}"), prior.scale.iter().copied());
    }

    for (family, prior) in priors.matrices() {
        data.real_matrix(format!("prior_loc_{family}"), rows(&prior.location));
        data.real_matrix(format!("prior_scale_{family}"), rows(&prior.scale));
    }

    let dgf = priors.dgf();
    data.reals("prior_loc_dgf", dgf.mean.iter().copied());
    data.real_matrix("prior_cov_dgf", dmatrix_rows(&dgf.covariance));
}

/// Initial concentration of every mic in every experiment.
///
/// A measured concentration wins. Otherwise unbalanced mics start at the median of their
/// prior and balanced mics at the experiment's initial state, or the configured default.
///
/// # Returns
///
/// An `N_experiment × N_mic` matrix.
pub fn initial_concentrations(
    model: &KineticModel,
    codes: &ModelCodes,
    priors: &PriorSet,
    config: &CompilerConfig,
) -> Result<Array2<f64>, EncodingError> {
    let mut conc_init = Array2::zeros((codes.experiment.len(), codes.mic.len()));
    let unbalanced_prior = priors.matrix(ParameterFamily::ConcUnbalanced);

    for (row, experiment) in model.experiments().iter().enumerate() {
        for (mic_code, mic_id) in codes.mic.iter() {
            let measured = experiment
                .measurement(MeasurementType::Concentration, mic_id)
                .map(|m| m.value);

            let value = match (measured, codes.unbalanced_mic.get(mic_id)) {
                (Some(value), _) => value,
                (None, Some(unbalanced_code)) => {
                    let prior = unbalanced_prior.ok_or_else(|| EncodingError::UnknownId {
                        space: "prior".to_string(),
                        id: ParameterFamily::ConcUnbalanced.to_string(),
                    })?;
                    prior.location[(row, unbalanced_code - 1)].exp()
                }
                (None, None) => experiment
                    .initial_state
                    .get(mic_id)
                    .copied()
                    .unwrap_or(config.default_initial_concentration),
            };

            conc_init[(row, mic_code - 1)] = value;
        }
    }

    Ok(conc_init)
}

/// Initial values of every parameter family, keyed by family name.
///
/// Each coordinate starts at its prior location, exponentiated for families modelled on
/// a log scale. Formation energies start at the mean of their joint prior.
pub fn initial_parameter_values(priors: &PriorSet) -> NumericInput {
    let mut inits = NumericInput::new();
    let natural = |family: ParameterFamily, value: f64| {
        if family.is_non_negative() {
            value.exp()
        } else {
            value
        }
    };

    for (family, prior) in priors.vectors() {
        inits.reals(
            family.name(),
            prior.location.iter().map(|&v| natural(*family, v)),
        );
    }
    for (family, prior) in priors.matrices() {
        inits.real_matrix(
            family.name(),
            rows(&prior.location.mapv(|v| natural(*family, v))),
        );
    }
    inits.reals(
        ParameterFamily::Dgf.name(),
        priors.dgf().mean.iter().copied(),
    );

    inits
}

fn rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn dmatrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|i| matrix.row(i).iter().copied().collect())
        .collect()
}
