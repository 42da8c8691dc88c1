//! Prior assembly.
//!
//! Maps the prior atoms of a model onto the codified parameter space. Every coordinate
//! of every family ends up with exactly one `(location, scale)` pair, taken from its
//! atom if one was declared and from the family default otherwise. Formation energies
//! get a joint normal prior, either declared as a whole or synthesised from independent
//! priors by placing their variances on the diagonal of the covariance matrix.

use std::collections::{BTreeMap, HashMap, HashSet};

use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::Array2;

use super::error::PriorError;
use super::spec::{check_location_scale, MultivariatePrior, PriorAtom};
use crate::config::CompilerConfig;
use crate::model::KineticModel;
use crate::parameters::{FamilyShape, ParameterFamily, ParameterSpace};

/// Independent priors of a family with one value per id.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPrior {
    pub location: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Independent priors of a family with one value per (experiment, id).
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixPrior {
    /// Rows are experiments, columns ids, both in code order.
    pub location: Array2<f64>,
    pub scale: Array2<f64>,
}

/// Joint normal prior, in code order.
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariateNormalPrior {
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

/// The assembled priors of all families.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorSet {
    vectors: BTreeMap<ParameterFamily, VectorPrior>,
    matrices: BTreeMap<ParameterFamily, MatrixPrior>,
    dgf: MultivariateNormalPrior,
}

impl PriorSet {
    /// Priors of a per-id family. `None` for other shapes.
    pub fn vector(&self, family: ParameterFamily) -> Option<&VectorPrior> {
        self.vectors.get(&family)
    }

    /// Priors of a per-experiment family. `None` for other shapes.
    pub fn matrix(&self, family: ParameterFamily) -> Option<&MatrixPrior> {
        self.matrices.get(&family)
    }

    pub fn dgf(&self) -> &MultivariateNormalPrior {
        &self.dgf
    }

    pub fn vectors(&self) -> impl Iterator<Item = (&ParameterFamily, &VectorPrior)> {
        self.vectors.iter()
    }

    pub fn matrices(&self) -> impl Iterator<Item = (&ParameterFamily, &MatrixPrior)> {
        self.matrices.iter()
    }
}

/// Key of a resolved atom: family, experiment code (0 for per-id families) and id code.
type Coordinate = (ParameterFamily, usize, usize);

/// Assembles the priors of every parameter family.
///
/// # Arguments
///
/// * `model` - The validated entity graph, providing the prior atoms
/// * `space` - The parameter code spaces of the model
/// * `config` - Default priors and the probabilities of the percentile form
///
/// # Returns
///
/// Returns the [`PriorSet`], or the first [`PriorError`] encountered.
pub fn assemble_priors(
    model: &KineticModel,
    space: &ParameterSpace,
    config: &CompilerConfig,
) -> Result<PriorSet, PriorError> {
    let resolved = resolve_atoms(model.priors(), space, config)?;

    let mut vectors = BTreeMap::new();
    let mut matrices = BTreeMap::new();

    for family in ParameterFamily::ALL {
        match family.shape() {
            FamilyShape::Vector => {
                vectors.insert(family, vector_prior(family, space, config, &resolved)?);
            }
            FamilyShape::Matrix => {
                matrices.insert(family, matrix_prior(family, space, config, &resolved)?);
            }
            FamilyShape::Multivariate => {}
        }
    }

    let dgf = match model.dgf_multivariate() {
        Some(declared) => {
            if resolved.keys().any(|(f, _, _)| *f == ParameterFamily::Dgf) {
                return Err(PriorError::ConflictingDgf);
            }
            multivariate_prior(declared, space)?
        }
        None => {
            let independent = vector_prior(ParameterFamily::Dgf, space, config, &resolved)?;
            synthesise_multivariate(&independent)
        }
    };
    check_positive_definite(&dgf.covariance)?;

    log::info!(
        "Assembled priors from {} atom(s), {} coordinate(s) use family defaults",
        resolved.len(),
        ParameterFamily::ALL
            .iter()
            .map(|f| space.size(*f))
            .sum::<usize>()
            .saturating_sub(resolved.len())
    );

    Ok(PriorSet {
        vectors,
        matrices,
        dgf,
    })
}

/// Resolves every atom to `(location, scale)` keyed by its coordinate codes.
fn resolve_atoms(
    atoms: &[PriorAtom],
    space: &ParameterSpace,
    config: &CompilerConfig,
) -> Result<HashMap<Coordinate, (f64, f64)>, PriorError> {
    let mut resolved = HashMap::with_capacity(atoms.len());

    for atom in atoms {
        atom.check_shape()?;

        let target = space
            .targets(atom.parameter)
            .get(&atom.target)
            .ok_or_else(|| PriorError::UnknownTarget {
                family: atom.parameter,
                target: atom.target.clone(),
            })?;

        let experiment = match &atom.experiment {
            Some(experiment) => space.experiments().get(experiment).ok_or_else(|| {
                PriorError::UnknownExperiment {
                    coordinate: atom.coordinate(),
                    experiment: experiment.clone(),
                }
            })?,
            None => 0,
        };

        let value = atom.resolve(config.quantile_probabilities)?;
        if resolved
            .insert((atom.parameter, experiment, target), value)
            .is_some()
        {
            return Err(PriorError::DuplicateAtom {
                coordinate: atom.coordinate(),
            });
        }
    }

    Ok(resolved)
}

/// Looks up a coordinate, falling back to the family default.
fn lookup(
    family: ParameterFamily,
    coordinate: (usize, usize),
    describe: impl Fn() -> String,
    config: &CompilerConfig,
    resolved: &HashMap<Coordinate, (f64, f64)>,
) -> Result<(f64, f64), PriorError> {
    if let Some(value) = resolved.get(&(family, coordinate.0, coordinate.1)) {
        return Ok(*value);
    }

    let default = config
        .default_prior(family)
        .ok_or_else(|| PriorError::MissingPrior {
            family,
            coordinate: describe(),
        })?;
    check_location_scale(&describe(), default.location, default.scale)?;
    Ok((default.location, default.scale))
}

fn vector_prior(
    family: ParameterFamily,
    space: &ParameterSpace,
    config: &CompilerConfig,
    resolved: &HashMap<Coordinate, (f64, f64)>,
) -> Result<VectorPrior, PriorError> {
    let targets = space.targets(family);
    let mut location = Vec::with_capacity(targets.len());
    let mut scale = Vec::with_capacity(targets.len());

    for (code, id) in targets.iter() {
        let (loc, sc) = lookup(
            family,
            (0, code),
            || format!("{family}[{id}]"),
            config,
            resolved,
        )?;
        location.push(loc);
        scale.push(sc);
    }

    Ok(VectorPrior { location, scale })
}

fn matrix_prior(
    family: ParameterFamily,
    space: &ParameterSpace,
    config: &CompilerConfig,
    resolved: &HashMap<Coordinate, (f64, f64)>,
) -> Result<MatrixPrior, PriorError> {
    let experiments = space.experiments();
    let targets = space.targets(family);
    let shape = (experiments.len(), targets.len());
    let mut location = Array2::zeros(shape);
    let mut scale = Array2::zeros(shape);

    for (row, experiment) in experiments.iter() {
        for (col, id) in targets.iter() {
            let (loc, sc) = lookup(
                family,
                (row, col),
                || format!("{family}[{experiment}, {id}]"),
                config,
                resolved,
            )?;
            location[(row - 1, col - 1)] = loc;
            scale[(row - 1, col - 1)] = sc;
        }
    }

    Ok(MatrixPrior { location, scale })
}

/// Independent priors as a joint prior with diagonal covariance.
fn synthesise_multivariate(independent: &VectorPrior) -> MultivariateNormalPrior {
    let variances = independent.scale.iter().map(|s| s * s).collect::<Vec<_>>();

    MultivariateNormalPrior {
        mean: DVector::from_vec(independent.location.clone()),
        covariance: DMatrix::from_diagonal(&DVector::from_vec(variances)),
    }
}

/// Validates a declared joint prior and reorders it to code order.
fn multivariate_prior(
    declared: &MultivariatePrior,
    space: &ParameterSpace,
) -> Result<MultivariateNormalPrior, PriorError> {
    let targets = space.targets(ParameterFamily::Dgf);
    let n = targets.len();

    if declared.ids.len() != n {
        return Err(PriorError::ShapeMismatch {
            what: "id list",
            expected: n,
            found: declared.ids.len(),
        });
    }
    if declared.mean_vector.len() != n {
        return Err(PriorError::ShapeMismatch {
            what: "mean vector",
            expected: n,
            found: declared.mean_vector.len(),
        });
    }
    if declared.covariance_matrix.len() != n {
        return Err(PriorError::ShapeMismatch {
            what: "covariance matrix",
            expected: n,
            found: declared.covariance_matrix.len(),
        });
    }
    if let Some(row) = declared.covariance_matrix.iter().find(|row| row.len() != n) {
        return Err(PriorError::ShapeMismatch {
            what: "covariance row",
            expected: n,
            found: row.len(),
        });
    }

    // Position in the declared order of the metabolite with code i + 1.
    let mut seen = HashSet::with_capacity(n);
    let mut declared_position = vec![0; n];
    for (position, id) in declared.ids.iter().enumerate() {
        let code = targets.get(id).ok_or_else(|| PriorError::MultivariateIds {
            reason: format!("'{id}' is not a metabolite"),
        })?;
        if !seen.insert(code) {
            return Err(PriorError::MultivariateIds {
                reason: format!("'{id}' is listed twice"),
            });
        }
        declared_position[code - 1] = position;
    }

    if let Some(value) = declared.mean_vector.iter().find(|v| !v.is_finite()) {
        return Err(PriorError::InvalidLocation {
            coordinate: format!("dgf mean {value}"),
        });
    }

    let mean = DVector::from_fn(n, |i, _| declared.mean_vector[declared_position[i]]);
    let covariance = DMatrix::from_fn(n, n, |i, j| {
        declared.covariance_matrix[declared_position[i]][declared_position[j]]
    });

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (covariance[(i, j)], covariance[(j, i)]);
            if (a - b).abs() > 1e-9 * a.abs().max(b.abs()).max(1.0) {
                return Err(PriorError::AsymmetricCovariance { row: i + 1, col: j + 1 });
            }
        }
    }

    Ok(MultivariateNormalPrior { mean, covariance })
}

/// Checks positive definiteness by attempting a Cholesky decomposition.
pub fn check_positive_definite(matrix: &DMatrix<f64>) -> Result<(), PriorError> {
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(PriorError::NotPositiveDefinite);
    }
    Cholesky::new(matrix.clone())
        .map(|_| ())
        .ok_or(PriorError::NotPositiveDefinite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codify::ModelCodes;
    use crate::config::{CompilerConfigBuilder, DefaultPrior};
    use crate::loader::load_model;
    use crate::model::*;
    use crate::priors::spec::{MultivariatePriorBuilder, PriorAtomBuilder};
    use crate::stoich::build_network;
    use approx::assert_relative_eq;

    fn raw_model() -> RawModelBuilder {
        let mic = |m: &str, balanced: bool| {
            MetaboliteInCompartmentBuilder::default()
                .metabolite_id(m)
                .compartment_id("c")
                .balanced(balanced)
                .build()
                .unwrap()
        };

        let mut builder = RawModelBuilder::default();
        builder
            .name("priors")
            .to_compartments(CompartmentBuilder::default().id("c").build().unwrap())
            .to_metabolites(MetaboliteBuilder::default().id("a").build().unwrap())
            .to_metabolites(MetaboliteBuilder::default().id("b").build().unwrap())
            .to_mics(mic("a", true))
            .to_mics(mic("b", false))
            .to_enzymes(EnzymeBuilder::default().id("e").build().unwrap())
            .to_reactions(
                ReactionBuilder::default()
                    .id("r")
                    .to_stoichiometry(("a_c".to_string(), -1.0))
                    .to_stoichiometry(("b_c".to_string(), 1.0))
                    .build()
                    .unwrap(),
            )
            .to_enzyme_reactions(
                EnzymeReactionBuilder::default()
                    .enzyme_id("e")
                    .reaction_id("r")
                    .build()
                    .unwrap(),
            )
            .to_experiments(ExperimentBuilder::default().id("x1").build().unwrap())
            .to_experiments(ExperimentBuilder::default().id("x2").build().unwrap());
        builder
    }

    fn assemble(raw: RawModel, config: &CompilerConfig) -> Result<PriorSet, PriorError> {
        let model = load_model(raw).expect("Failed to load model");
        let codes = ModelCodes::codify(&model).unwrap();
        let network = build_network(&model, &codes).unwrap();
        let space = ParameterSpace::derive(&model, &codes, &network).unwrap();
        assemble_priors(&model, &space, config)
    }

    #[test]
    fn test_defaults_fill_every_coordinate() {
        let priors = assemble(raw_model().build().unwrap(), &CompilerConfig::default()).unwrap();

        let km = priors.vector(ParameterFamily::Km).unwrap();
        assert_eq!(km.location, vec![-2.0, -2.0]);
        assert_eq!(km.scale, vec![2.0, 2.0]);

        let conc = priors.matrix(ParameterFamily::ConcEnzyme).unwrap();
        assert_eq!(conc.location.dim(), (2, 1));

        let dgf = priors.dgf();
        assert_eq!(dgf.covariance, DMatrix::from_diagonal_element(2, 2, 2500.0));
    }

    #[test]
    fn test_atoms_override_defaults() {
        let raw = raw_model()
            .to_priors(
                PriorAtomBuilder::default()
                    .parameter(ParameterFamily::Kcat)
                    .target("e_r")
                    .pct1(0.4)
                    .pct99(6.8)
                    .build()
                    .unwrap(),
            )
            .to_priors(
                PriorAtomBuilder::default()
                    .parameter(ParameterFamily::ConcUnbalanced)
                    .target("b_c")
                    .experiment("x2")
                    .exploc(2.0)
                    .scale(0.1)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let priors = assemble(raw, &CompilerConfig::default()).unwrap();

        let kcat = priors.vector(ParameterFamily::Kcat).unwrap();
        assert_relative_eq!(kcat.location[0], 0.500, epsilon = 1e-3);
        assert_relative_eq!(kcat.scale[0], 0.609, epsilon = 1e-3);

        let conc = priors.matrix(ParameterFamily::ConcUnbalanced).unwrap();
        assert_eq!(conc.location[(0, 0)], -2.0);
        assert_relative_eq!(conc.location[(1, 0)], 2.0_f64.ln());
        assert_eq!(conc.scale[(1, 0)], 0.1);
    }

    #[test]
    fn test_missing_default_is_an_error() {
        let config = CompilerConfigBuilder::default()
            .to_default_priors((ParameterFamily::Kcat, DefaultPrior::new(0.0, 1.0)))
            .build()
            .unwrap();

        let err = assemble(raw_model().build().unwrap(), &config).unwrap_err();
        assert!(matches!(err, PriorError::MissingPrior { .. }));
    }

    #[test]
    fn test_unknown_target_and_duplicates() {
        let atom = |target: &str| {
            PriorAtomBuilder::default()
                .parameter(ParameterFamily::Km)
                .target(target)
                .location(0.0)
                .scale(1.0)
                .build()
                .unwrap()
        };

        let unknown = raw_model().to_priors(atom("e_z_c")).build().unwrap();
        assert!(matches!(
            assemble(unknown, &CompilerConfig::default()),
            Err(PriorError::UnknownTarget { .. })
        ));

        let duplicate = raw_model()
            .to_priors(atom("e_a_c"))
            .to_priors(atom("e_a_c"))
            .build()
            .unwrap();
        assert!(matches!(
            assemble(duplicate, &CompilerConfig::default()),
            Err(PriorError::DuplicateAtom { .. })
        ));
    }

    #[test]
    fn test_multivariate_is_reordered() {
        let raw = raw_model()
            .dgf_multivariate(
                MultivariatePriorBuilder::default()
                    .ids(vec!["b".to_string(), "a".to_string()])
                    .mean_vector(vec![-10.0, -20.0])
                    .covariance_matrix(vec![vec![4.0, 1.0], vec![1.0, 9.0]])
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let priors = assemble(raw, &CompilerConfig::default()).unwrap();
        let dgf = priors.dgf();
        assert_eq!(dgf.mean.as_slice(), &[-20.0, -10.0]);
        assert_eq!(dgf.covariance[(0, 0)], 9.0);
        assert_eq!(dgf.covariance[(1, 1)], 4.0);
        assert_eq!(dgf.covariance[(0, 1)], 1.0);
    }

    #[test]
    fn test_negative_eigenvalue_rejected() {
        // Eigenvalues 3 and -1.
        let raw = raw_model()
            .dgf_multivariate(
                MultivariatePriorBuilder::default()
                    .ids(vec!["a".to_string(), "b".to_string()])
                    .mean_vector(vec![0.0, 0.0])
                    .covariance_matrix(vec![vec![1.0, 2.0], vec![2.0, 1.0]])
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(
            assemble(raw, &CompilerConfig::default()),
            Err(PriorError::NotPositiveDefinite)
        );
    }

    #[test]
    fn test_multivariate_validation() {
        let declare = |ids: Vec<&str>, cov: Vec<Vec<f64>>| {
            raw_model()
                .dgf_multivariate(
                    MultivariatePriorBuilder::default()
                        .ids(ids.into_iter().map(String::from).collect::<Vec<_>>())
                        .mean_vector(vec![0.0, 0.0])
                        .covariance_matrix(cov)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap()
        };
        let identity = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        assert!(matches!(
            assemble(declare(vec!["a", "a"], identity.clone()), &CompilerConfig::default()),
            Err(PriorError::MultivariateIds { .. })
        ));
        assert!(matches!(
            assemble(
                declare(vec!["a", "b"], vec![vec![1.0, 0.5], vec![0.0, 1.0]]),
                &CompilerConfig::default()
            ),
            Err(PriorError::AsymmetricCovariance { row: 1, col: 2 })
        ));
        assert!(matches!(
            assemble(declare(vec!["a", "b"], vec![vec![1.0]]), &CompilerConfig::default()),
            Err(PriorError::ShapeMismatch { .. })
        ));

        let conflicting = {
            let mut raw = declare(vec!["a", "b"], identity);
            raw.priors.push(
                PriorAtomBuilder::default()
                    .parameter(ParameterFamily::Dgf)
                    .target("a")
                    .location(0.0)
                    .scale(1.0)
                    .build()
                    .unwrap(),
            );
            raw
        };
        assert_eq!(
            assemble(conflicting, &CompilerConfig::default()),
            Err(PriorError::ConflictingDgf)
        );
    }
}
