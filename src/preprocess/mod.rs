mod dependent_variable_extractor;
mod flippable_variable_pair_extractor;
mod gf2_solver;
mod problem_size_reducer;
mod selection_extractor;
mod verifier;

pub use dependent_variable_extractor::DependentVariableExtractor;
pub use flippable_variable_pair_extractor::{
    FlippableVariablePair, FlippableVariablePairExtractor,
};
pub use gf2_solver::Gf2Solver;
pub use problem_size_reducer::ProblemSizeReducer;
pub use selection_extractor::SelectionExtractor;
pub use verifier::{Verifier, VerifierError};

use crate::{ConstraintType, Model, Options};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("The problem was proven infeasible during presolve: {0}")]
    Infeasible(String),

    #[error(transparent)]
    Verifier(#[from] VerifierError),
}

/// Run the whole presolve pipeline: verification, reduction to a fixed
/// point, structure extraction, and initial-value correction. Leaves the
/// model with every cache consistent.
pub fn execute(model: &mut Model, options: &Options) -> Result<(), PreprocessError> {
    Verifier::new(model).verify_problem()?;
    model.setup();

    if options.preprocess.is_enabled_presolve {
        let mut reducer = ProblemSizeReducer::new(model);
        reducer.reduce_problem_size()?;
        model.setup();

        let preprocess = &options.preprocess;
        let mut reducer = ProblemSizeReducer::new(model);
        let mut newly_disabled = 0;
        let mut newly_fixed = 0;
        if preprocess.is_enabled_remove_redundant_set_variables {
            newly_fixed += reducer.remove_redundant_set_variables();
        }
        if preprocess.is_enabled_remove_redundant_set_constraints {
            let (disabled, fixed) = reducer.remove_redundant_set_constraints();
            newly_disabled += disabled;
            newly_fixed += fixed;
        }
        if preprocess.is_enabled_extract_implicit_equality_constraints {
            newly_disabled += reducer.extract_implicit_equality_constraints();
        }
        if preprocess.is_enabled_remove_duplicated_constraints {
            newly_disabled += reducer.remove_duplicated_constraints();
        }
        if newly_disabled > 0 || newly_fixed > 0 {
            let mut reducer = ProblemSizeReducer::new(model);
            reducer.reduce_problem_size()?;
        }
        model.setup();
    }

    SelectionExtractor::new(model).extract(options.neighborhood.selection_mode);
    model.setup();

    if DependentVariableExtractor::new(model).extract(&options.preprocess) > 0 {
        model.setup();
    }

    let reference = model.constraint_type_reference();
    let gf2_count = reference.of(ConstraintType::Gf2).len();
    if gf2_count > 0 && model.number_of_enabled_constraints() == gf2_count {
        if Gf2Solver::new(model).solve() {
            model.setup();
        }
    }

    let mut verifier = Verifier::new(model);
    verifier.verify_and_correct_selection_variables_initial_values(true)?;
    verifier.verify_and_correct_binary_variables_initial_values(true)?;
    verifier.verify_and_correct_integer_variables_initial_values(true)?;
    model.update();

    Ok(())
}
