use crate::{ConstraintID, ConstraintSense, Model, VariableID};
use fnv::FnvHashMap;
use tracing::warn;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("No variables are defined")]
    NoVariables,

    #[error("Neither objective nor constraint functions are defined")]
    NoObjectiveOrConstraints,

    #[error("The fixed variable {name} has an invalid initial value {value}")]
    InvalidFixedVariable { name: String, value: i64 },

    #[error("More than one fixed variable is selected in a selection block")]
    MultipleFixedSelectedVariables,

    #[error("More than one variable is selected in a selection block")]
    MultipleSelectedVariables,

    #[error("No variable is selected in a selection block")]
    NoSelectedVariable,

    #[error("No unfixed candidate is available to select in a selection block")]
    NoSelectableCandidate,

    #[error("The initial value {value} of the variable {name} violates its bounds")]
    OutOfBoundInitialValue { name: String, value: i64 },
}

/// Validates the built problem and repairs invalid initial values when
/// correction is enabled.
pub struct Verifier<'a> {
    model: &'a mut Model,
}

impl<'a> Verifier<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self { model }
    }

    pub fn verify_problem(&self) -> Result<(), VerifierError> {
        if self.model.number_of_variables() == 0 {
            return Err(VerifierError::NoVariables);
        }
        if self.model.number_of_constraints() == 0 && !self.model.objective().is_defined() {
            return Err(VerifierError::NoObjectiveOrConstraints);
        }
        Ok(())
    }

    /// Violation a candidate selection variable would add, given the running
    /// per-constraint totals of already-committed selections.
    fn candidate_violation(
        model: &Model,
        variable: VariableID,
        committed_values: &FnvHashMap<ConstraintID, f64>,
    ) -> f64 {
        let mut violation = 0.0;
        for &(constraint, sensitivity) in model.variable(variable).constraint_sensitivities() {
            let value = committed_values.get(&constraint).copied().unwrap_or(0.0)
                + sensitivity
                + model.constraint(constraint).expression().constant_value();
            violation += match model.constraint(constraint).sense() {
                ConstraintSense::Less => value.max(0.0),
                ConstraintSense::Equal => value.abs(),
                ConstraintSense::Greater => (-value).max(0.0),
            };
        }
        violation
    }

    fn commit_selected(
        model: &Model,
        variable: VariableID,
        committed_values: &mut FnvHashMap<ConstraintID, f64>,
    ) {
        for &(constraint, sensitivity) in model.variable(variable).constraint_sensitivities() {
            *committed_values.entry(constraint).or_insert(0.0) += sensitivity;
        }
    }

    /// Enforce the exactly-one invariant on every selection block: keep the
    /// first marked variable (preferring a fixed one), clear the rest, and
    /// when none is marked pick the unfixed candidate whose added constraint
    /// violation is minimal.
    pub fn verify_and_correct_selection_variables_initial_values(
        &mut self,
        is_enabled_correction: bool,
    ) -> Result<(), VerifierError> {
        let mut committed_values: FnvHashMap<ConstraintID, f64> = FnvHashMap::default();

        for selection_index in 0..self.model.selections().len() {
            let selection_variables = self.model.selections()[selection_index].variables.clone();

            let mut fixed_selected: Vec<VariableID> = Vec::new();
            let mut selected: Vec<VariableID> = Vec::new();
            let mut invalid: Vec<VariableID> = Vec::new();

            for &variable in &selection_variables {
                let v = self.model.variable(variable);
                if v.value() == 1 {
                    selected.push(variable);
                    if v.is_fixed() {
                        fixed_selected.push(variable);
                    }
                } else if v.value() != 0 {
                    if v.is_fixed() {
                        return Err(VerifierError::InvalidFixedVariable {
                            name: v.name().to_string(),
                            value: v.value(),
                        });
                    }
                    invalid.push(variable);
                }
            }

            if fixed_selected.len() > 1 {
                return Err(VerifierError::MultipleFixedSelectedVariables);
            }

            if !invalid.is_empty() {
                if !is_enabled_correction {
                    return Err(VerifierError::OutOfBoundInitialValue {
                        name: self.model.variable(invalid[0]).name().to_string(),
                        value: self.model.variable(invalid[0]).value(),
                    });
                }
                for &variable in &invalid {
                    let old_value = self.model.variable(variable).value();
                    self.model.variable_mut(variable).set_value_if_mutable(0);
                    warn!(
                        "The initial value {} = {old_value} was corrected to 0.",
                        self.model.variable(variable).name()
                    );
                }
            }

            let chosen = if fixed_selected.len() == 1 {
                if !is_enabled_correction && selected.len() >= 2 {
                    return Err(VerifierError::MultipleSelectedVariables);
                }
                fixed_selected[0]
            } else if selected.len() > 1 {
                if !is_enabled_correction {
                    return Err(VerifierError::MultipleSelectedVariables);
                }
                *selected
                    .iter()
                    .min_by(|&&a, &&b| {
                        Self::candidate_violation(self.model, a, &committed_values)
                            .total_cmp(&Self::candidate_violation(
                                self.model,
                                b,
                                &committed_values,
                            ))
                    })
                    .expect("selected is non-empty")
            } else if selected.is_empty() {
                if !is_enabled_correction {
                    return Err(VerifierError::NoSelectedVariable);
                }
                let candidate = selection_variables
                    .iter()
                    .filter(|&&v| !self.model.variable(v).is_fixed())
                    .min_by(|&&a, &&b| {
                        Self::candidate_violation(self.model, a, &committed_values)
                            .total_cmp(&Self::candidate_violation(
                                self.model,
                                b,
                                &committed_values,
                            ))
                    })
                    .copied();
                let Some(candidate) = candidate else {
                    return Err(VerifierError::NoSelectableCandidate);
                };
                warn!(
                    "The initial value {} = 0 was corrected to 1.",
                    self.model.variable(candidate).name()
                );
                candidate
            } else {
                selected[0]
            };

            for &variable in &selection_variables {
                if variable != chosen && self.model.variable(variable).value() == 1 {
                    self.model.variable_mut(variable).set_value_if_mutable(0);
                    warn!(
                        "The initial value {} = 1 was corrected to 0.",
                        self.model.variable(variable).name()
                    );
                }
            }
            self.model.variable_mut(chosen).set_value_if_mutable(1);
            Self::commit_selected(self.model, chosen, &mut committed_values);

            self.model.selections[selection_index].selected_variable = Some(chosen);
        }
        Ok(())
    }

    pub fn verify_and_correct_binary_variables_initial_values(
        &mut self,
        is_enabled_correction: bool,
    ) -> Result<(), VerifierError> {
        let binary = self.model.variable_reference().binary.clone();
        self.clamp_initial_values(&binary, is_enabled_correction)
    }

    pub fn verify_and_correct_integer_variables_initial_values(
        &mut self,
        is_enabled_correction: bool,
    ) -> Result<(), VerifierError> {
        let integer = self.model.variable_reference().integer.clone();
        self.clamp_initial_values(&integer, is_enabled_correction)
    }

    fn clamp_initial_values(
        &mut self,
        variables: &[VariableID],
        is_enabled_correction: bool,
    ) -> Result<(), VerifierError> {
        for &variable in variables {
            let v = self.model.variable(variable);
            if v.value() >= v.lower_bound() && v.value() <= v.upper_bound() {
                continue;
            }
            if v.is_fixed() {
                return Err(VerifierError::InvalidFixedVariable {
                    name: v.name().to_string(),
                    value: v.value(),
                });
            }
            if !is_enabled_correction {
                return Err(VerifierError::OutOfBoundInitialValue {
                    name: v.name().to_string(),
                    value: v.value(),
                });
            }
            let old_value = v.value();
            let new_value = old_value.clamp(v.lower_bound(), v.upper_bound());
            self.model
                .variable_mut(variable)
                .set_value_if_mutable(new_value);
            warn!(
                "The initial value {} = {old_value} was corrected to {new_value}.",
                self.model.variable(variable).name()
            );
        }
        Ok(())
    }
}
