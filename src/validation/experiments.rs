use std::collections::HashSet;

use crate::model::{Experiment, MeasurementType, RawModel};
use crate::validation::consistency::Report;
use crate::validation::references::KnownIds;

/// Validates experiments by checking:
/// - Temperatures are positive
/// - Measurement targets exist for their measurement type, error scales are positive
///   and no target is measured twice
/// - Initial-state keys are mics
/// - Knocked-out enzymes and phosphorylations exist
///
/// Warns about experiments that are used neither for training nor for testing.
///
/// # Arguments
/// * `model` - The raw model whose experiments are checked
/// * `report` - Validation report to add any validation errors to
pub(super) fn check_experiments(model: &RawModel, report: &mut Report) {
    let known = KnownIds::collect(model);

    for (idx, experiment) in model.experiments.iter().enumerate() {
        if !(experiment.temperature.is_finite() && experiment.temperature > 0.0) {
            report.error(
                format!("/experiments/{idx}/temperature"),
                format!(
                    "Experiment '{}' has temperature {} K, expected a positive number.",
                    experiment.id, experiment.temperature
                ),
                &experiment.id,
            );
        }

        if !experiment.is_train && !experiment.is_test {
            report.warning(
                format!("/experiments/{idx}"),
                format!(
                    "Experiment '{}' is used neither for training nor for testing.",
                    experiment.id
                ),
                &experiment.id,
            );
        }

        check_measurements(report, experiment, idx, &known);
        check_initial_state(report, experiment, idx, &known);
        check_knockouts(report, experiment, idx, &known);
    }
}

fn check_measurements(
    report: &mut Report,
    experiment: &Experiment,
    experiment_idx: usize,
    known: &KnownIds,
) {
    let mut seen = HashSet::new();

    for (idx, measurement) in experiment.measurements.iter().enumerate() {
        let location = format!("/experiments/{experiment_idx}/measurements/{idx}");
        let target = measurement.target_id.as_str();

        let exists = match measurement.target_type {
            MeasurementType::Concentration => known.mics.contains(target),
            MeasurementType::Flux => known.reactions.contains(target),
            MeasurementType::EnzymeConcentration => known.enzymes.contains(target),
        };

        if !exists {
            report.error(
                location.clone(),
                format!(
                    "Measurement in experiment '{}' targets unknown {:?} target '{target}'.",
                    experiment.id, measurement.target_type
                ),
                target,
            );
        }

        if !(measurement.error_scale.is_finite() && measurement.error_scale > 0.0) {
            report.error(
                format!("{location}/error_scale"),
                format!(
                    "Measurement of '{target}' in experiment '{}' has error scale {}, expected a positive number.",
                    experiment.id, measurement.error_scale
                ),
                target,
            );
        }

        if !measurement.value.is_finite() {
            report.error(
                format!("{location}/value"),
                format!(
                    "Measurement of '{target}' in experiment '{}' has a non-finite value.",
                    experiment.id
                ),
                target,
            );
        }

        if !seen.insert((measurement.target_type, target)) {
            report.error(
                location,
                format!(
                    "Target '{target}' is measured more than once in experiment '{}'.",
                    experiment.id
                ),
                target,
            );
        }
    }
}

fn check_initial_state(
    report: &mut Report,
    experiment: &Experiment,
    experiment_idx: usize,
    known: &KnownIds,
) {
    for (mic_id, value) in &experiment.initial_state {
        let location = format!("/experiments/{experiment_idx}/initial_state/{mic_id}");

        if !known.mics.contains(mic_id) {
            report.error(
                location,
                format!(
                    "Initial state of experiment '{}' refers to unknown mic '{mic_id}'.",
                    experiment.id
                ),
                mic_id,
            );
        } else if !(value.is_finite() && *value > 0.0) {
            report.error(
                location,
                format!(
                    "Initial concentration {value} of '{mic_id}' in experiment '{}' must be positive.",
                    experiment.id
                ),
                mic_id,
            );
        }
    }
}

fn check_knockouts(
    report: &mut Report,
    experiment: &Experiment,
    experiment_idx: usize,
    known: &KnownIds,
) {
    for (idx, enzyme_id) in experiment.enzyme_knockouts.iter().enumerate() {
        if !known.enzymes.contains(enzyme_id.as_str()) {
            report.error(
                format!("/experiments/{experiment_idx}/enzyme_knockouts/{idx}"),
                format!(
                    "Experiment '{}' knocks out unknown enzyme '{enzyme_id}'.",
                    experiment.id
                ),
                enzyme_id,
            );
        }
    }

    for (idx, phosphorylation_id) in experiment.phosphorylation_knockouts.iter().enumerate() {
        if !known.phosphorylations.contains(phosphorylation_id) {
            report.error(
                format!("/experiments/{experiment_idx}/phosphorylation_knockouts/{idx}"),
                format!(
                    "Experiment '{}' knocks out unknown phosphorylation '{phosphorylation_id}'.",
                    experiment.id
                ),
                phosphorylation_id,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn model_with(experiment: Experiment) -> RawModel {
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
            .to_enzymes(EnzymeBuilder::default().id("e").build().unwrap())
            .to_reactions(ReactionBuilder::default().id("r").build().unwrap())
            .to_experiments(experiment)
            .build()
            .unwrap()
    }

    fn measurement(target_type: MeasurementType, target: &str, error_scale: f64) -> Measurement {
        MeasurementBuilder::default()
            .target_type(target_type)
            .target_id(target)
            .value(1.0)
            .error_scale(error_scale)
            .build()
            .unwrap()
    }

    #[test]
    fn test_measurement_targets_resolve_per_type() {
        let experiment = ExperimentBuilder::default()
            .id("x")
            .to_measurements(measurement(MeasurementType::Concentration, "a_c", 0.1))
            .to_measurements(measurement(MeasurementType::Flux, "r", 0.1))
            .to_measurements(measurement(MeasurementType::EnzymeConcentration, "e", 0.1))
            // a reaction id is not a valid concentration target
            .to_measurements(measurement(MeasurementType::Concentration, "r", 0.1))
            .build()
            .unwrap();

        let mut report = Report::new();
        check_experiments(&model_with(experiment), &mut report);

        assert_eq!(report.errors().count(), 1);
        assert_eq!(
            report.errors[0].location(),
            "/experiments/0/measurements/3"
        );
    }

    #[test]
    fn test_non_positive_error_scale_and_duplicates() {
        let experiment = ExperimentBuilder::default()
            .id("x")
            .to_measurements(measurement(MeasurementType::Flux, "r", 0.0))
            .to_measurements(measurement(MeasurementType::Flux, "r", 0.1))
            .build()
            .unwrap();

        let mut report = Report::new();
        check_experiments(&model_with(experiment), &mut report);

        assert_eq!(report.filter_results("r").len(), 2);
    }

    #[test]
    fn test_unknown_knockouts_and_initial_state() {
        let experiment = ExperimentBuilder::default()
            .id("x")
            .temperature(-1.0)
            .to_enzyme_knockouts("ghost".to_string())
            .to_phosphorylation_knockouts("k_e".to_string())
            .to_initial_state(("b_c".to_string(), 1.0))
            .build()
            .unwrap();

        let mut report = Report::new();
        check_experiments(&model_with(experiment), &mut report);

        assert_eq!(report.errors().count(), 4);
        assert_eq!(report.filter_results("x").len(), 1);
    }

    #[test]
    fn test_unused_experiment_warns() {
        let experiment = ExperimentBuilder::default()
            .id("x")
            .is_train(false)
            .build()
            .unwrap();

        let mut report = Report::new();
        check_experiments(&model_with(experiment), &mut report);

        assert!(report.is_valid);
        assert_eq!(report.warnings().count(), 1);
    }
}
