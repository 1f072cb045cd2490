use crate::preprocess::PreprocessError;
use crate::{
    atol::COEFFICIENT_EPSILON, ConstraintID, ConstraintSense, ConstraintType, Model, VariableID,
};
use fnv::FnvHashSet;
use tracing::info;

/// Tightenings beyond this magnitude are suppressed to avoid runaway bounds
/// derived from big-M rows.
const BOUND_LIMIT: i64 = 100_000;

/// Shrinks the problem to a fixed point: redundant constraints disabled,
/// implied bounds tightened, implicitly determined variables fixed.
pub struct ProblemSizeReducer<'a> {
    model: &'a mut Model,
    variable_bound_update_count_in_preprocess: usize,
    variable_bound_update_count_in_optimization: usize,
    is_preprocess: bool,
}

impl<'a> ProblemSizeReducer<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self {
            model,
            variable_bound_update_count_in_preprocess: 0,
            variable_bound_update_count_in_optimization: 0,
            is_preprocess: true,
        }
    }

    pub fn variable_bound_update_count_in_preprocess(&self) -> usize {
        self.variable_bound_update_count_in_preprocess
    }

    pub fn variable_bound_update_count_in_optimization(&self) -> usize {
        self.variable_bound_update_count_in_optimization
    }

    /// Bound updates made after the search has started are counted
    /// separately from the presolve phase.
    pub fn set_is_preprocess(&mut self, is_preprocess: bool) {
        self.is_preprocess = is_preprocess;
    }


    /// Run the reduction loop to a fixed point. Returns whether anything
    /// was reduced.
    pub fn reduce_problem_size(&mut self) -> Result<bool, PreprocessError> {
        let mut number_of_disabled_constraints = 0;
        let mut number_of_fixed_variables = self.remove_independent_variables();

        loop {
            let newly_disabled_constraints =
                self.remove_redundant_constraints_with_tightening_variable_bounds()?;
            let newly_fixed_variables = self.remove_implicit_fixed_variables();

            number_of_disabled_constraints += newly_disabled_constraints;
            number_of_fixed_variables += newly_fixed_variables;

            if newly_disabled_constraints == 0 && newly_fixed_variables == 0 {
                break;
            }
        }

        Ok(number_of_disabled_constraints > 0 || number_of_fixed_variables > 0)
    }

    /// Fix variables with no related constraint to whichever bound (or
    /// zero) minimizes the signed objective contribution.
    pub fn remove_independent_variables(&mut self) -> usize {
        let is_minimization = self.model.is_minimization();
        let mut number_of_newly_fixed_variables = 0;

        for variable in self.model.variables.iter_mut() {
            if variable.is_fixed() || !variable.related_constraints().is_empty() {
                continue;
            }
            let sensitivity = variable.objective_sensitivity();
            let fix_value = if sensitivity.abs() < COEFFICIENT_EPSILON {
                0
            } else if (sensitivity > 0.0) == is_minimization {
                variable.lower_bound()
            } else {
                variable.upper_bound()
            };
            info!(
                "The value of the variable {} was fixed at {fix_value} because it has no \
                 sensitivity to any constraint.",
                variable.name()
            );
            variable.fix_by(fix_value);
            number_of_newly_fixed_variables += 1;
        }
        number_of_newly_fixed_variables
    }

    pub fn remove_redundant_constraints_with_tightening_variable_bounds(
        &mut self,
    ) -> Result<usize, PreprocessError> {
        let mut number_of_newly_disabled_constraints = 0;
        for index in 0..self.model.constraints.len() {
            if !self.model.constraints[index].is_enabled() {
                continue;
            }
            if self.remove_redundant_constraint_with_tightening_variable_bound(
                ConstraintID::from(index),
            )? {
                number_of_newly_disabled_constraints += 1;
            }
        }
        Ok(number_of_newly_disabled_constraints)
    }

    fn remove_redundant_constraint_with_tightening_variable_bound(
        &mut self,
        id: ConstraintID,
    ) -> Result<bool, PreprocessError> {
        let Self {
            model,
            variable_bound_update_count_in_preprocess,
            variable_bound_update_count_in_optimization,
            is_preprocess,
        } = self;
        let bound_update_count = if *is_preprocess {
            variable_bound_update_count_in_preprocess
        } else {
            variable_bound_update_count_in_optimization
        };
        let Model {
            variables,
            constraints,
            ..
        } = &mut **model;
        let constraint = &mut constraints[*id];

        let mutable_sensitivities: Vec<(VariableID, f64)> = constraint
            .expression()
            .sensitivities()
            .iter()
            .filter(|(&variable, _)| !variables[*variable].is_fixed())
            .map(|(&variable, &coefficient)| (variable, coefficient))
            .collect();

        let constraint_lower_bound = constraint.expression().lower_bound(variables);
        let constraint_upper_bound = constraint.expression().upper_bound(variables);
        let constraint_fixed_term_value = constraint.expression().fixed_term_value(variables);
        let constraint_constant_value = constraint.expression().constant_value();

        // Trivially satisfied over the variable boxes.
        let is_redundant = match constraint.sense() {
            ConstraintSense::Equal => {
                constraint_lower_bound == 0.0 && constraint_upper_bound == 0.0
            }
            ConstraintSense::Less => constraint_upper_bound <= 0.0,
            ConstraintSense::Greater => constraint_lower_bound >= 0.0,
        };
        if is_redundant {
            info!("The redundant constraint {} was removed.", constraint.name());
            constraint.disable();
            return Ok(true);
        }

        // A singleton is disabled in favor of fixing or tightening its
        // variable.
        if mutable_sensitivities.len() == 1 {
            let (variable, coefficient) = mutable_sensitivities[0];
            let variable_lower_bound = variables[*variable].lower_bound();
            let variable_upper_bound = variables[*variable].upper_bound();
            let bound_temp =
                -(constraint_fixed_term_value + constraint_constant_value) / coefficient;

            match constraint.sense() {
                ConstraintSense::Equal => {
                    // ax + b = 0 fixes x at -b/a.
                    info!(
                        "The constraint {} was removed instead of fixing the value of the \
                         variable {} at {bound_temp}.",
                        constraint.name(),
                        variables[*variable].name()
                    );
                    variables[*variable].fix_by(bound_temp as i64);
                    constraint.disable();
                    return Ok(true);
                }
                sense => {
                    let tightens_upper = (sense == ConstraintSense::Less && coefficient > 0.0)
                        || (sense == ConstraintSense::Greater && coefficient < 0.0);
                    if tightens_upper {
                        // ax + b <= 0 with a > 0 caps x at floor(-b/a).
                        let bound_floor = bound_temp.floor() as i64;
                        if bound_floor < variable_upper_bound && bound_floor.abs() < BOUND_LIMIT {
                            info!(
                                "The constraint {} was removed instead of tightening the upper \
                                 bound of the variable {} by {bound_floor}.",
                                constraint.name(),
                                variables[*variable].name()
                            );
                            variables[*variable]
                                .set_bound(variable_lower_bound, bound_floor)
                                .map_err(|e| PreprocessError::Infeasible(e.to_string()))?;
                            *bound_update_count += 1;
                        } else {
                            info!(
                                "The redundant constraint {} was removed.",
                                constraint.name()
                            );
                        }
                    } else {
                        // ax + b >= 0 with a > 0 lifts x to ceil(-b/a).
                        let bound_ceil = bound_temp.ceil() as i64;
                        if bound_ceil > variable_lower_bound && bound_ceil.abs() < BOUND_LIMIT {
                            info!(
                                "The constraint {} was removed instead of tightening the lower \
                                 bound of the variable {} by {bound_ceil}.",
                                constraint.name(),
                                variables[*variable].name()
                            );
                            variables[*variable]
                                .set_bound(bound_ceil, variable_upper_bound)
                                .map_err(|e| PreprocessError::Infeasible(e.to_string()))?;
                            *bound_update_count += 1;
                        } else {
                            info!(
                                "The redundant constraint {} was removed.",
                                constraint.name()
                            );
                        }
                    }
                    constraint.disable();
                    return Ok(true);
                }
            }
        }

        // Multi-variable case: derive a one-sided bound for each mutable
        // variable by pushing every other variable to its extreme.
        let is_less_or_equal = constraint.is_less_or_equal();
        let is_greater_or_equal = constraint.is_greater_or_equal();

        for &(variable, coefficient) in &mutable_sensitivities {
            let variable_lower_bound = variables[*variable].lower_bound();
            let variable_upper_bound = variables[*variable].upper_bound();

            if coefficient > 0.0 {
                if is_greater_or_equal {
                    let bound_temp = -(constraint_upper_bound
                        - coefficient * variable_upper_bound as f64)
                        / coefficient;
                    let bound_ceil = bound_temp.ceil() as i64;
                    if bound_ceil > variable_lower_bound && bound_ceil.abs() < BOUND_LIMIT {
                        info!(
                            "The lower bound of the variable {} was tightened by {bound_ceil}.",
                            variables[*variable].name()
                        );
                        variables[*variable]
                            .set_bound(bound_ceil, variable_upper_bound)
                            .map_err(|e| PreprocessError::Infeasible(e.to_string()))?;
                        *bound_update_count += 1;
                    }
                }
                if is_less_or_equal {
                    let bound_temp = -(constraint_lower_bound
                        - coefficient * variable_lower_bound as f64)
                        / coefficient;
                    let bound_floor = bound_temp.floor() as i64;
                    if bound_floor < variable_upper_bound && bound_floor.abs() < BOUND_LIMIT {
                        info!(
                            "The upper bound of the variable {} was tightened by {bound_floor}.",
                            variables[*variable].name()
                        );
                        variables[*variable]
                            .set_bound(variable_lower_bound, bound_floor)
                            .map_err(|e| PreprocessError::Infeasible(e.to_string()))?;
                        *bound_update_count += 1;
                    }
                }
            } else {
                if is_greater_or_equal {
                    let bound_temp = -(constraint_upper_bound
                        - coefficient * variable_lower_bound as f64)
                        / coefficient;
                    let bound_floor = bound_temp.floor() as i64;
                    if bound_floor < variable_upper_bound && bound_floor.abs() < BOUND_LIMIT {
                        info!(
                            "The upper bound of the variable {} was tightened by {bound_floor}.",
                            variables[*variable].name()
                        );
                        variables[*variable]
                            .set_bound(variable_lower_bound, bound_floor)
                            .map_err(|e| PreprocessError::Infeasible(e.to_string()))?;
                        *bound_update_count += 1;
                    }
                }
                if is_less_or_equal {
                    let bound_temp = -(constraint_lower_bound
                        - coefficient * variable_upper_bound as f64)
                        / coefficient;
                    let bound_ceil = bound_temp.ceil() as i64;
                    if bound_ceil > variable_lower_bound && bound_ceil.abs() < BOUND_LIMIT {
                        info!(
                            "The lower bound of the variable {} was tightened by {bound_ceil}.",
                            variables[*variable].name()
                        );
                        variables[*variable]
                            .set_bound(bound_ceil, variable_upper_bound)
                            .map_err(|e| PreprocessError::Infeasible(e.to_string()))?;
                        *bound_update_count += 1;
                    }
                }
            }
        }
        Ok(false)
    }

    /// Fix variables whose bounds have collapsed to a single value.
    pub fn remove_implicit_fixed_variables(&mut self) -> usize {
        let mut number_of_newly_fixed_variables = 0;
        for variable in self.model.variables.iter_mut() {
            if variable.is_fixed() {
                continue;
            }
            if variable.lower_bound() == variable.upper_bound() {
                let fixed_value = variable.lower_bound();
                info!(
                    "The value of the variable {} was fixed at {fixed_value} because the lower \
                     and upper bounds implicitly fix the value.",
                    variable.name()
                );
                variable.fix_by(fixed_value);
                number_of_newly_fixed_variables += 1;
            }
        }
        number_of_newly_fixed_variables
    }

    /// On pure set-partitioning/packing/covering problems, fix all but the
    /// objective-best variable of each identical constraint pattern to 0.
    pub fn remove_redundant_set_variables(&mut self) -> usize {
        let reference = self.model.constraint_type_reference();
        let set_constraints = reference.of(ConstraintType::SetPartitioning).len()
            + reference.of(ConstraintType::SetPacking).len()
            + reference.of(ConstraintType::SetCovering).len();

        if self.model.number_of_enabled_constraints() == 0
            || self.model.number_of_enabled_constraints() != set_constraints
        {
            return 0;
        }

        for variable in self.model.variables.iter_mut() {
            variable.setup_hash();
        }

        let is_minimization = self.model.is_minimization();
        let variables = &mut self.model.variables;
        let mut order: Vec<usize> = (0..variables.len()).collect();
        order.sort_by(|&a, &b| {
            if variables[a].hash() == variables[b].hash() {
                let (sa, sb) = (
                    variables[a].objective_sensitivity(),
                    variables[b].objective_sensitivity(),
                );
                if is_minimization {
                    sa.total_cmp(&sb)
                } else {
                    sb.total_cmp(&sa)
                }
            } else {
                variables[a].hash().cmp(&variables[b].hash())
            }
        });

        let mut number_of_newly_fixed_variables = 0;
        let size = order.len();
        let mut i = 0;
        while i < size {
            if variables[order[i]].is_fixed() {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < size {
                if variables[order[i]].hash() != variables[order[j]].hash() {
                    break;
                }
                if variables[order[j]].is_fixed() && variables[order[j]].value() == 0 {
                    j += 1;
                    continue;
                }
                if variables[order[i]].related_constraints()
                    == variables[order[j]].related_constraints()
                {
                    variables[order[j]].fix_by(0);
                    info!(
                        "The value of redundant variable {} was fixed at 0.",
                        variables[order[j]].name()
                    );
                    number_of_newly_fixed_variables += 1;
                }
                j += 1;
            }
            i = j;
        }
        number_of_newly_fixed_variables
    }

    /// Disable exclusive-OR / set-partitioning constraints whose variable
    /// set strictly contains another's, fixing the extra variables to 0.
    pub fn remove_redundant_set_constraints(&mut self) -> (usize, usize) {
        let reference = self.model.constraint_type_reference();
        let mut candidates: Vec<ConstraintID> = reference.of(ConstraintType::ExclusiveOr).to_vec();
        candidates.extend_from_slice(reference.of(ConstraintType::SetPartitioning));

        candidates.sort_by_key(|&c| {
            std::cmp::Reverse(self.model.constraints[*c].expression().sensitivities().len())
        });

        let variable_sets: Vec<FnvHashSet<VariableID>> = candidates
            .iter()
            .map(|&c| {
                self.model.constraints[*c]
                    .expression()
                    .sensitivities()
                    .keys()
                    .copied()
                    .collect()
            })
            .collect();

        let mut number_of_newly_disabled_constraints = 0;
        let mut number_of_newly_fixed_variables = 0;

        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                if !variable_sets[j].is_subset(&variable_sets[i]) {
                    continue;
                }
                self.model.constraints[*candidates[i]].disable();
                info!(
                    "The redundant constraint {} was removed.",
                    self.model.constraints[*candidates[i]].name()
                );
                for &variable in variable_sets[i].difference(&variable_sets[j]) {
                    self.model.variables[*variable].fix_by(0);
                    info!(
                        "The value of redundant variable {} was fixed at 0.",
                        self.model.variables[*variable].name()
                    );
                    number_of_newly_fixed_variables += 1;
                }
                number_of_newly_disabled_constraints += 1;
                break;
            }
        }
        (
            number_of_newly_disabled_constraints,
            number_of_newly_fixed_variables,
        )
    }

    fn implicit_equality_candidates(&self) -> Vec<ConstraintID> {
        let reference = self.model.constraint_type_reference();
        let mut candidates: Vec<ConstraintID> = Vec::new();
        for constraint_type in [
            ConstraintType::Precedence,
            ConstraintType::VariableBound,
            ConstraintType::SetPacking,
            ConstraintType::SetCovering,
            ConstraintType::InvariantKnapsack,
            ConstraintType::MultipleCovering,
            ConstraintType::MinMax,
            ConstraintType::MaxMin,
            ConstraintType::BinPacking,
            ConstraintType::Knapsack,
        ] {
            candidates.extend_from_slice(reference.of(constraint_type));
        }
        // Equality constraints are excluded: an opposing pair is only
        // implicit between two inequalities.
        for &constraint in reference.of(ConstraintType::GeneralLinear) {
            if self.model.constraints[*constraint].sense() != ConstraintSense::Equal {
                candidates.push(constraint);
            }
        }
        candidates
    }

    /// Replace an opposing pair of inequalities over the same expression by
    /// the equality they imply.
    pub fn extract_implicit_equality_constraints(&mut self) -> usize {
        let mut candidates = self.implicit_equality_candidates();
        if candidates.len() <= 1 {
            return 0;
        }

        for &constraint in &candidates {
            self.model.constraints[*constraint].expression.setup_hash();
        }
        candidates.sort_by_key(|&c| self.model.constraints[*c].expression().hash());

        let size = candidates.len();
        let mut additional: Vec<(String, crate::Expression)> = Vec::new();
        let mut number_of_newly_disabled_constraints = 0;

        let mut i = 0;
        while i < size {
            let first = candidates[i];
            if !self.model.constraints[*first].is_enabled()
                || self.model.constraints[*first].sense() == ConstraintSense::Equal
            {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            let mut advanced = false;
            while j < size {
                let second = candidates[j];
                if self.model.constraints[*first].expression().hash()
                    != self.model.constraints[*second].expression().hash()
                {
                    i = j;
                    advanced = true;
                    break;
                }
                if !self.model.constraints[*second].is_enabled() {
                    j += 1;
                    continue;
                }

                let senses_differ = self.model.constraints[*first].sense()
                    != self.model.constraints[*second].sense();
                let direct_equal = self.model.constraints[*first]
                    .expression()
                    .equal(self.model.constraints[*second].expression());

                let mut inverted_equal = false;
                if !senses_differ && !direct_equal {
                    let mut inverted = self.model.constraints[*second].expression().negated();
                    inverted.setup_hash();
                    inverted_equal =
                        self.model.constraints[*first].expression().equal(&inverted);
                }

                if (senses_differ && direct_equal) || (!senses_differ && inverted_equal) {
                    self.model.constraints[*first].disable();
                    self.model.constraints[*second].disable();
                    info!(
                        "The constraints {} and {} were removed instead of adding the equality \
                         constraint that these implicitly imply.",
                        self.model.constraints[*first].name(),
                        self.model.constraints[*second].name()
                    );
                    additional.push((
                        format!(
                            "{}_implicit_equality",
                            self.model.constraints[*first].name()
                        ),
                        self.model.constraints[*first].expression().clone_terms(),
                    ));
                    number_of_newly_disabled_constraints += 1;
                    i += 1;
                    advanced = true;
                    break;
                }
                j += 1;
            }
            if !advanced {
                break;
            }
        }

        for (name, expression) in additional {
            self.model
                .create_constraint(name, expression, ConstraintSense::Equal);
        }
        number_of_newly_disabled_constraints
    }

    /// Keep one representative per equivalence class of duplicated
    /// constraints, grouped first by structural type.
    pub fn remove_duplicated_constraints(&mut self) -> usize {
        let groups: Vec<Vec<ConstraintID>> = [
            ConstraintType::Singleton,
            ConstraintType::ExclusiveOr,
            ConstraintType::ExclusiveNor,
            ConstraintType::InvertedIntegers,
            ConstraintType::BalancedIntegers,
            ConstraintType::ConstantSumIntegers,
            ConstraintType::ConstantDifferenceIntegers,
            ConstraintType::ConstantRatioIntegers,
            ConstraintType::Aggregation,
            ConstraintType::Precedence,
            ConstraintType::VariableBound,
            ConstraintType::TrinomialExclusiveNor,
            ConstraintType::AllOrNothing,
            ConstraintType::SetPartitioning,
            ConstraintType::SetPacking,
            ConstraintType::SetCovering,
            ConstraintType::Cardinality,
            ConstraintType::InvariantKnapsack,
            ConstraintType::MultipleCovering,
            ConstraintType::BinaryFlow,
            ConstraintType::IntegerFlow,
            ConstraintType::SoftSelection,
            ConstraintType::MinMax,
            ConstraintType::MaxMin,
            ConstraintType::Intermediate,
            ConstraintType::EquationKnapsack,
            ConstraintType::BinPacking,
            ConstraintType::Knapsack,
            ConstraintType::IntegerKnapsack,
            ConstraintType::Gf2,
            ConstraintType::GeneralLinear,
        ]
        .iter()
        .map(|&t| self.model.constraint_type_reference().of(t).to_vec())
        .collect();

        let mut number_of_newly_disabled_constraints = 0;
        for group in groups {
            number_of_newly_disabled_constraints += self.remove_duplicated_in_group(&group);
        }
        number_of_newly_disabled_constraints
    }

    fn remove_duplicated_in_group(&mut self, constraints: &[ConstraintID]) -> usize {
        if constraints.len() <= 1 {
            return 0;
        }
        let mut candidates = constraints.to_vec();
        for &constraint in &candidates {
            self.model.constraints[*constraint].expression.setup_hash();
        }
        candidates.sort_by_key(|&c| self.model.constraints[*c].expression().hash());

        let size = candidates.len();
        let mut number_of_newly_disabled_constraints = 0;
        let mut i = 0;
        while i < size {
            if !self.model.constraints[*candidates[i]].is_enabled() {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < size {
                if self.model.constraints[*candidates[i]].expression().hash()
                    != self.model.constraints[*candidates[j]].expression().hash()
                {
                    break;
                }
                if self.model.constraints[*candidates[j]].is_enabled()
                    && self.model.constraints[*candidates[i]].sense()
                        == self.model.constraints[*candidates[j]].sense()
                    && self.model.constraints[*candidates[i]]
                        .expression()
                        .equal(self.model.constraints[*candidates[j]].expression())
                {
                    self.model.constraints[*candidates[j]].disable();
                    info!(
                        "The duplicated constraint {} was removed.",
                        self.model.constraints[*candidates[j]].name()
                    );
                    number_of_newly_disabled_constraints += 1;
                }
                j += 1;
            }
            i = j;
        }
        number_of_newly_disabled_constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expression;

    #[test]
    fn test_singleton_equality_fixes_variable() {
        // 2x - 4 = 0 fixes x at 2.
        let mut model = Model::new("singleton");
        let x = model.create_variable("x", 0, 5).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 2.0);
        e.add_constant(-4.0);
        let c = model.create_constraint("c", e, ConstraintSense::Equal);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        reducer.reduce_problem_size().unwrap();

        assert!(model.variable(x).is_fixed());
        assert_eq!(model.variable(x).value(), 2);
        assert!(!model.constraint(c).is_enabled());
    }

    #[test]
    fn test_singleton_tightening_reports_infeasibility() {
        // 3x + 6 <= 0 with 0 <= x <= 5: the implied upper bound -2 crosses
        // the lower bound.
        let mut model = Model::new("infeasible");
        let x = model.create_variable("x", 0, 5).unwrap();
        model.create_variable("y", 0, 5).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 3.0);
        e.add_constant(6.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        assert!(matches!(
            reducer.reduce_problem_size(),
            Err(PreprocessError::Infeasible(_))
        ));
    }

    #[test]
    fn test_redundant_constraint_removal() {
        // x + y <= 20 is satisfied over the whole box [0,5]^2.
        let mut model = Model::new("redundant");
        let x = model.create_variable("x", 0, 5).unwrap();
        let y = model.create_variable("y", 0, 5).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 1.0);
        e.add_term(y, 1.0);
        e.add_constant(-20.0);
        let c = model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        let reduced = reducer.reduce_problem_size().unwrap();
        assert!(reduced);
        assert!(!model.constraint(c).is_enabled());
    }

    #[test]
    fn test_multi_variable_bound_tightening() {
        // x + y <= 3 over [0,5]^2 caps both variables at 3.
        let mut model = Model::new("tighten");
        let x = model.create_variable("x", 0, 5).unwrap();
        let y = model.create_variable("y", 0, 5).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 1.0);
        e.add_term(y, 1.0);
        e.add_constant(-3.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        reducer.reduce_problem_size().unwrap();

        assert!(reducer.variable_bound_update_count_in_preprocess() >= 2);
        assert_eq!(model.variable(x).upper_bound(), 3);
        assert_eq!(model.variable(y).upper_bound(), 3);
    }

    #[test]
    fn test_independent_variable_fixing() {
        // min 2x: x has no related constraint, fixed at its lower bound.
        let mut model = Model::new("independent");
        let x = model.create_variable("x", -3, 5).unwrap();
        let mut objective = Expression::new();
        objective.add_term(x, 2.0);
        model.minimize(objective);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        reducer.reduce_problem_size().unwrap();
        assert!(model.variable(x).is_fixed());
        assert_eq!(model.variable(x).value(), -3);
    }

    #[test]
    fn test_fixed_point_runs_one_extra_silent_pass() {
        let mut model = Model::new("fixed_point");
        let x = model.create_variable("x", 0, 5).unwrap();
        let y = model.create_variable("y", 0, 5).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 1.0);
        e.add_term(y, 1.0);
        e.add_constant(-3.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        reducer.reduce_problem_size().unwrap();

        // One more pass must find nothing to do.
        let disabled = reducer
            .remove_redundant_constraints_with_tightening_variable_bounds()
            .unwrap();
        let fixed = reducer.remove_implicit_fixed_variables();
        assert_eq!(disabled, 0);
        assert_eq!(fixed, 0);
    }

    #[test]
    fn test_redundant_set_variable_removal() {
        // Pure set partitioning with three interchangeable variables: all
        // but the objective-best one are fixed at 0.
        let mut model = Model::new("set_variables");
        let a = model.create_binary_variable("a").unwrap();
        let b = model.create_binary_variable("b").unwrap();
        let c = model.create_binary_variable("c").unwrap();

        let mut partition = Expression::new();
        partition.add_term(a, 1.0);
        partition.add_term(b, 1.0);
        partition.add_term(c, 1.0);
        partition.add_constant(-1.0);
        model.create_constraint("partition", partition, crate::ConstraintSense::Equal);

        let mut objective = Expression::new();
        objective.add_term(a, 1.0);
        objective.add_term(b, 2.0);
        objective.add_term(c, 3.0);
        model.minimize(objective);
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        let fixed = reducer.remove_redundant_set_variables();
        assert_eq!(fixed, 2);

        // The cheapest variable stays free.
        assert!(!model.variable(a).is_fixed());
        assert!(model.variable(b).is_fixed());
        assert!(model.variable(c).is_fixed());
        assert_eq!(model.variable(b).value(), 0);
        assert_eq!(model.variable(c).value(), 0);
    }

    #[test]
    fn test_duplicate_constraint_removal() {
        let mut model = Model::new("duplicates");
        let x = model.create_variable("x", 0, 5).unwrap();
        let y = model.create_variable("y", 0, 5).unwrap();
        for name in ["c0", "c1"] {
            let mut e = Expression::new();
            e.add_term(x, 2.0);
            e.add_term(y, 7.0);
            e.add_constant(-3.0);
            model.create_constraint(name, e, ConstraintSense::Less);
        }
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        let disabled = reducer.remove_duplicated_constraints();
        assert_eq!(disabled, 1);
        assert_eq!(model.number_of_enabled_constraints(), 1);
    }

    #[test]
    fn test_implicit_equality_extraction() {
        // e <= 0 and e >= 0 collapse to e = 0.
        let mut model = Model::new("implicit");
        let x = model.create_variable("x", 0, 5).unwrap();
        let y = model.create_variable("y", 0, 5).unwrap();
        for (name, sense) in [("le", ConstraintSense::Less), ("ge", ConstraintSense::Greater)] {
            let mut e = Expression::new();
            e.add_term(x, 2.0);
            e.add_term(y, -7.0);
            e.add_constant(-3.0);
            model.create_constraint(name, e, sense);
        }
        model.setup();

        let mut reducer = ProblemSizeReducer::new(&mut model);
        let disabled = reducer.extract_implicit_equality_constraints();
        assert_eq!(disabled, 1);
        assert_eq!(model.number_of_constraints(), 3);

        let added = model.constraint(crate::ConstraintID::from(2usize));
        assert_eq!(added.sense(), ConstraintSense::Equal);
        assert!(added.is_enabled());
        assert_eq!(model.number_of_enabled_constraints(), 1);
    }
}
