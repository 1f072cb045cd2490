use crate::{
    BinaryMatrix, ConstraintID, ConstraintSense, ConstraintType, Expression, Model,
    PreprocessOption, VariableID, DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND,
};
use fnv::FnvHashMap;
use tracing::info;

const CANDIDATE_TYPES: [ConstraintType; 10] = [
    ConstraintType::ExclusiveOr,
    ConstraintType::ExclusiveNor,
    ConstraintType::InvertedIntegers,
    ConstraintType::BalancedIntegers,
    ConstraintType::ConstantSumIntegers,
    ConstraintType::ConstantDifferenceIntegers,
    ConstraintType::ConstantRatioIntegers,
    ConstraintType::TrinomialExclusiveNor,
    ConstraintType::AllOrNothing,
    ConstraintType::Intermediate,
];

fn is_enabled_for(option: &PreprocessOption, constraint_type: ConstraintType) -> bool {
    match constraint_type {
        ConstraintType::ExclusiveOr => option.is_enabled_extract_dependent_exclusive_or,
        ConstraintType::ExclusiveNor => option.is_enabled_extract_dependent_exclusive_nor,
        ConstraintType::InvertedIntegers => option.is_enabled_extract_dependent_inverted_integers,
        ConstraintType::BalancedIntegers => option.is_enabled_extract_dependent_balanced_integers,
        ConstraintType::ConstantSumIntegers => {
            option.is_enabled_extract_dependent_constant_sum_integers
        }
        ConstraintType::ConstantDifferenceIntegers => {
            option.is_enabled_extract_dependent_constant_difference_integers
        }
        ConstraintType::ConstantRatioIntegers => {
            option.is_enabled_extract_dependent_constant_ratio_integers
        }
        ConstraintType::TrinomialExclusiveNor => {
            option.is_enabled_extract_dependent_trinomial_exclusive_nor
        }
        ConstraintType::AllOrNothing => option.is_enabled_extract_dependent_all_or_nothing,
        ConstraintType::Intermediate => option.is_enabled_extract_dependent_intermediate,
        _ => false,
    }
}

/// Identifies variables whose values are determined by substitution from
/// others, rebinding them to defining expressions and disabling the
/// constraints that defined them.
pub struct DependentVariableExtractor<'a> {
    model: &'a mut Model,
}

impl<'a> DependentVariableExtractor<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self { model }
    }

    fn collect_candidate_constraints(&self) -> Vec<ConstraintID> {
        let reference = self.model.constraint_type_reference();
        CANDIDATE_TYPES
            .iter()
            .flat_map(|&t| reference.of(t).iter().copied())
            .filter(|&c| self.model.constraint(c).is_enabled())
            .collect()
    }

    /// Count how many candidate constraints designate each variable as a
    /// candidate dependent.
    fn count_candidate_dependent_variables(
        &self,
        candidates: &[ConstraintID],
    ) -> FnvHashMap<VariableID, usize> {
        let mut counts: FnvHashMap<VariableID, usize> = FnvHashMap::default();
        for &constraint in candidates {
            let constraint = self.model.constraint(constraint);
            let key_variable = constraint.key_variable();
            if constraint.has_representative_variable() {
                for &variable in constraint.expression().sensitivities().keys() {
                    if Some(variable) != key_variable {
                        *counts.entry(variable).or_insert(0) += 1;
                    }
                }
            } else if let Some(key) = key_variable {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Edge i → j iff substituting through constraint i touches a variable
    /// appearing in constraint j.
    fn create_constraint_adjacency(&self, candidates: &[ConstraintID]) -> BinaryMatrix {
        let size = candidates.len();
        let mut adjacency = BinaryMatrix::identity(size);

        let mut variable_to_constraint_indices: FnvHashMap<VariableID, Vec<usize>> =
            FnvHashMap::default();
        for (index, &constraint) in candidates.iter().enumerate() {
            for &variable in self
                .model
                .constraint(constraint)
                .expression()
                .sensitivities()
                .keys()
            {
                variable_to_constraint_indices
                    .entry(variable)
                    .or_default()
                    .push(index);
            }
        }

        for (i, &constraint_id) in candidates.iter().enumerate() {
            let constraint = self.model.constraint(constraint_id);
            let key_variable = constraint.key_variable();

            if constraint.has_representative_variable() {
                for &variable in constraint.expression().sensitivities().keys() {
                    if Some(variable) == key_variable
                        || self.model.variable(variable).is_fixed()
                    {
                        continue;
                    }
                    let Some(indices) = variable_to_constraint_indices.get(&variable) else {
                        continue;
                    };
                    for &j in indices {
                        if i != j {
                            adjacency.set(i, j, 1);
                        }
                    }
                }
            } else if let Some(key) = key_variable {
                for (j, &other) in candidates.iter().enumerate() {
                    if i != j
                        && self
                            .model
                            .constraint(other)
                            .expression()
                            .sensitivities()
                            .contains_key(&key)
                    {
                        adjacency.set(i, j, 1);
                    }
                }
            }
        }
        adjacency
    }

    /// A candidate is extractable iff it is not mutually reachable with any
    /// other candidate, which would make the substitutions cyclic.
    fn create_extractable_flags(adjacency: &BinaryMatrix) -> Vec<bool> {
        let size = adjacency.number_of_rows();
        let mut flags = vec![true; size];
        let reachability = adjacency.reachability();
        for i in 0..size {
            for j in (i + 1)..size {
                if reachability.get(i, j) > 0 && reachability.get(j, i) > 0 {
                    flags[i] = false;
                    flags[j] = false;
                }
            }
        }
        flags
    }

    pub fn extract(&mut self, option: &PreprocessOption) -> usize {
        let candidates = self.collect_candidate_constraints();
        if candidates.is_empty() {
            return 0;
        }

        let counts = self.count_candidate_dependent_variables(&candidates);
        let adjacency = self.create_constraint_adjacency(&candidates);
        let extractable_flags = Self::create_extractable_flags(&adjacency);

        let mut dependent_variables: Vec<(VariableID, Expression)> = Vec::new();
        let mut target_constraints: Vec<ConstraintID> = Vec::new();
        let mut additional_constraints: Vec<(String, Expression, ConstraintSense)> = Vec::new();

        for (index, &constraint_id) in candidates.iter().enumerate() {
            if !extractable_flags[index] {
                continue;
            }
            let constraint = self.model.constraint(constraint_id);
            if !is_enabled_for(option, constraint.constraint_type()) {
                continue;
            }
            let key_variable = constraint.key_variable();

            if constraint.has_representative_variable() {
                let Some(key) = key_variable else { continue };
                let members: Vec<VariableID> = constraint
                    .expression()
                    .sensitivities()
                    .keys()
                    .copied()
                    .filter(|&v| v != key && !self.model.variable(v).is_fixed())
                    .collect();
                if members
                    .iter()
                    .any(|variable| counts.get(variable).copied().unwrap_or(0) != 1)
                {
                    continue;
                }
                target_constraints.push(constraint_id);
                for variable in members {
                    info!(
                        "The variable {} in the constraint {} was extracted as a dependent \
                         variable.",
                        self.model.variable(variable).name(),
                        self.model.constraint(constraint_id).name()
                    );
                    let mut expression = Expression::variable(key);
                    expression
                        .set_name(format!("{}_dependent", self.model.variable(variable).name()));
                    dependent_variables.push((variable, expression));
                }
            } else {
                let Some(key) = key_variable else { continue };
                if counts.get(&key).copied().unwrap_or(0) != 1 {
                    continue;
                }
                info!(
                    "The variable {} in the constraint {} was extracted as a dependent \
                     variable.",
                    self.model.variable(key).name(),
                    constraint.name()
                );
                target_constraints.push(constraint_id);

                let mut expression = constraint.expression().solve(key);
                expression.set_name(format!("{}_dependent", self.model.variable(key).name()));

                // A compensating inequality is needed only when the defining
                // expression can leave the variable's declared bounds.
                let key_lower = self.model.variable(key).lower_bound();
                let key_upper = self.model.variable(key).upper_bound();
                if key_lower != DEFAULT_LOWER_BOUND
                    && (key_lower as f64) > expression.lower_bound(&self.model.variables)
                {
                    let mut guard = expression.clone_terms();
                    guard.add_constant(-(key_lower as f64));
                    additional_constraints.push((
                        format!("{}_greater", constraint.name()),
                        guard,
                        ConstraintSense::Greater,
                    ));
                }
                if key_upper != DEFAULT_UPPER_BOUND
                    && (key_upper as f64) < expression.upper_bound(&self.model.variables)
                {
                    let mut guard = expression.clone_terms();
                    guard.add_constant(-(key_upper as f64));
                    additional_constraints.push((
                        format!("{}_less", constraint.name()),
                        guard,
                        ConstraintSense::Less,
                    ));
                }

                dependent_variables.push((key, expression));
            }
        }

        for &constraint in &target_constraints {
            self.model.constraints[*constraint].disable();
            self.model.constraints[*constraint].set_is_defining_dependent_variable(true);
        }

        let number_of_extracted = dependent_variables.len();
        for (variable, mut expression) in dependent_variables {
            expression.setup_fixed_sensitivities();
            let expression_id = self.model.add_dependent_expression(expression);
            self.model.variables[*variable].set_dependent_expression(expression_id);
        }
        for (name, expression, sense) in additional_constraints {
            info!("An extra constraint {name} was added.");
            self.model.create_constraint(name, expression, sense);
        }

        number_of_extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariableSense;

    /// x - y = 0 with x also appearing in one other constraint.
    fn balanced_model() -> (Model, VariableID, VariableID) {
        let mut model = Model::new("dependent");
        let x = model.create_variable("x", 0, 10).unwrap();
        let y = model.create_variable("y", 0, 10).unwrap();
        let z = model.create_variable("z", 0, 10).unwrap();

        let mut defining = Expression::new();
        defining.add_term(x, 1.0);
        defining.add_term(y, -1.0);
        model.create_constraint("link", defining, ConstraintSense::Equal);

        let mut other = Expression::new();
        other.add_term(x, 1.0);
        other.add_term(z, 1.0);
        other.add_constant(-8.0);
        model.create_constraint("cap", other, ConstraintSense::Less);

        model.setup();
        (model, x, y)
    }

    #[test]
    fn test_balanced_integers_extraction() {
        let (mut model, x, y) = balanced_model();
        let option = PreprocessOption::default();

        let extracted = DependentVariableExtractor::new(&mut model).extract(&option);
        assert_eq!(extracted, 1);

        // The key variable (smaller name, x) became dependent and its
        // defining constraint is disabled.
        let link = crate::ConstraintID::from(0usize);
        assert!(!model.constraint(link).is_enabled());
        assert!(model.constraint(link).is_defining_dependent_variable());
        assert_eq!(model.variable(x).sense(), VariableSense::DependentInteger);
        assert!(model.variable(x).dependent_expression().is_some());

        // The defining expression evaluates to y.
        let expression_id = model.variable(x).dependent_expression().unwrap();
        let defining = model.dependent_expression(expression_id);
        assert_eq!(defining.sensitivities().len(), 1);
        assert_eq!(defining.sensitivities()[&y], 1.0);
    }

    #[test]
    fn test_dependent_value_tracks_defining_expression() {
        let (mut model, x, y) = balanced_model();
        let option = PreprocessOption::default();
        DependentVariableExtractor::new(&mut model).extract(&option);

        model.variables[*y].set_value_force(7);
        model.update();
        assert_eq!(model.variable(x).value(), 7);
    }

    #[test]
    fn test_extraction_respects_toggle() {
        let (mut model, _, _) = balanced_model();
        let option = PreprocessOption {
            is_enabled_extract_dependent_balanced_integers: false,
            ..Default::default()
        };
        assert_eq!(DependentVariableExtractor::new(&mut model).extract(&option), 0);
    }

    #[test]
    fn test_mutually_dependent_candidates_are_skipped() {
        // x - y = 0 and y - x = 0 reach each other; neither is extractable.
        let mut model = Model::new("cyclic");
        let x = model.create_variable("x", 0, 10).unwrap();
        let y = model.create_variable("y", 0, 10).unwrap();

        let mut first = Expression::new();
        first.add_term(x, 1.0);
        first.add_term(y, -1.0);
        model.create_constraint("first", first, ConstraintSense::Equal);

        let mut second = Expression::new();
        second.add_term(y, 1.0);
        second.add_term(x, -1.0);
        model.create_constraint("second", second, ConstraintSense::Equal);

        model.setup();
        let option = PreprocessOption::default();
        assert_eq!(DependentVariableExtractor::new(&mut model).extract(&option), 0);
    }

    #[test]
    fn test_compensating_constraint_added_when_range_exceeds_bounds() {
        // x - y = 0 with x in [0, 3] but y in [0, 10]: the defining
        // expression can exceed x's upper bound.
        let mut model = Model::new("guard");
        let x = model.create_variable("x", 0, 3).unwrap();
        let y = model.create_variable("y", 0, 10).unwrap();
        let z = model.create_variable("z", 0, 10).unwrap();

        let mut defining = Expression::new();
        defining.add_term(x, 1.0);
        defining.add_term(y, -1.0);
        model.create_constraint("link", defining, ConstraintSense::Equal);

        let mut other = Expression::new();
        other.add_term(x, 1.0);
        other.add_term(z, 1.0);
        other.add_constant(-8.0);
        model.create_constraint("cap", other, ConstraintSense::Less);

        model.setup();
        let before = model.number_of_constraints();
        let option = PreprocessOption::default();
        DependentVariableExtractor::new(&mut model).extract(&option);

        assert_eq!(model.number_of_constraints(), before + 1);
        let guard = model.constraint(crate::ConstraintID::from(before));
        assert_eq!(guard.sense(), ConstraintSense::Less);
        assert!(guard.name().ends_with("_less"));
    }
}
