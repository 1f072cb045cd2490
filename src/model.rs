use crate::{
    ATol, Constraint, ConstraintID, ConstraintSense, ConstraintType, ConstraintTypeClassifier,
    Expression, ExpressionID, Move, MoveSense, Objective, Selection, SelectionID, SolutionScore,
    Variable, VariableError, VariableID, VariableSense,
};
use fnv::FnvHashMap;
use std::collections::HashMap;
use tracing::warn;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error("Variable name {name} is already defined")]
    DuplicateVariableName { name: String },
}

/// Enabled constraints grouped by structural category, rebuilt by
/// `Model::categorize_constraints`.
#[derive(Debug, Default)]
pub struct ConstraintTypeReference {
    groups: FnvHashMap<ConstraintType, Vec<ConstraintID>>,
}

impl ConstraintTypeReference {
    pub fn of(&self, constraint_type: ConstraintType) -> &[ConstraintID] {
        self.groups
            .get(&constraint_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn clear(&mut self) {
        self.groups.clear();
    }

    fn push(&mut self, constraint_type: ConstraintType, constraint: ConstraintID) {
        self.groups.entry(constraint_type).or_default().push(constraint);
    }
}

/// Structural counts of a model state, for logging and status reports.
///
/// `constraint_counts` lists the enabled constraints per structural
/// category in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemSummary {
    pub number_of_variables: usize,
    pub number_of_fixed_variables: usize,
    pub number_of_binary_variables: usize,
    pub number_of_integer_variables: usize,
    pub number_of_selection_variables: usize,
    pub number_of_dependent_variables: usize,
    pub number_of_constraints: usize,
    pub number_of_enabled_constraints: usize,
    pub number_of_selections: usize,
    pub constraint_counts: Vec<(ConstraintType, usize)>,
}

/// Variables grouped by role, rebuilt by `Model::categorize_variables`.
#[derive(Debug, Default)]
pub struct VariableReference {
    pub mutable: Vec<VariableID>,
    pub fixed: Vec<VariableID>,
    pub binary: Vec<VariableID>,
    pub integer: Vec<VariableID>,
    pub selection: Vec<VariableID>,
    pub dependent: Vec<VariableID>,
}

/// The optimization model: owner of every variable, constraint, selection
/// block and dependent-variable defining expression.
///
/// All engines (presolve, extractors, neighborhood) receive a mutable
/// reference to the model at setup and operate through it; indices stored in
/// moves and related-constraint lists stay valid for the model's lifetime.
#[derive(Debug, Default)]
pub struct Model {
    name: String,
    pub(crate) variables: Vec<Variable>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) dependent_expressions: Vec<Expression>,
    pub(crate) objective: Objective,
    pub(crate) selections: Vec<Selection>,

    is_minimization: bool,
    atol: ATol,

    variable_names: FnvHashMap<String, VariableID>,
    pub(crate) constraint_type_reference: ConstraintTypeReference,
    pub(crate) variable_reference: VariableReference,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_minimization: true,
            atol: ATol::default(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atol(&self) -> ATol {
        self.atol
    }

    // ------------------------------------------------------------------
    // Builder surface
    // ------------------------------------------------------------------

    pub fn create_variable(
        &mut self,
        name: impl Into<String>,
        lower_bound: i64,
        upper_bound: i64,
    ) -> Result<VariableID, ModelError> {
        let name = name.into();
        if self.variable_names.contains_key(&name) {
            return Err(ModelError::DuplicateVariableName { name });
        }
        let id = VariableID::from(self.variables.len());
        let mut variable = Variable::new(id, name.clone());
        variable.set_bound(lower_bound, upper_bound)?;
        self.variables.push(variable);
        self.variable_names.insert(name, id);
        Ok(id)
    }

    pub fn create_binary_variable(
        &mut self,
        name: impl Into<String>,
    ) -> Result<VariableID, ModelError> {
        self.create_variable(name, 0, 1)
    }

    /// Register the constraint `expression ⋈ 0`.
    pub fn create_constraint(
        &mut self,
        name: impl Into<String>,
        expression: Expression,
        sense: ConstraintSense,
    ) -> ConstraintID {
        let id = ConstraintID::from(self.constraints.len());
        self.constraints
            .push(Constraint::new(id, name, expression, sense));
        id
    }

    pub fn minimize(&mut self, expression: Expression) {
        self.objective = Objective::new(expression);
        self.is_minimization = true;
    }

    pub fn maximize(&mut self, expression: Expression) {
        self.objective = Objective::new(expression);
        self.is_minimization = false;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VariableID) -> &Variable {
        &self.variables[*id]
    }

    pub fn variable_mut(&mut self, id: VariableID) -> &mut Variable {
        &mut self.variables[*id]
    }

    pub fn variable_by_name(&self, name: &str) -> Option<VariableID> {
        self.variable_names.get(name).copied()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, id: ConstraintID) -> &Constraint {
        &self.constraints[*id]
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn selection(&self, id: SelectionID) -> &Selection {
        &self.selections[*id]
    }

    pub fn dependent_expression(&self, id: ExpressionID) -> &Expression {
        &self.dependent_expressions[*id]
    }

    pub fn constraint_type_reference(&self) -> &ConstraintTypeReference {
        &self.constraint_type_reference
    }

    pub fn variable_reference(&self) -> &VariableReference {
        &self.variable_reference
    }

    pub fn is_minimization(&self) -> bool {
        self.is_minimization
    }

    /// `+1` for minimization, `-1` for maximization.
    pub fn sign(&self) -> f64 {
        if self.is_minimization {
            1.0
        } else {
            -1.0
        }
    }

    pub fn number_of_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn number_of_fixed_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_fixed()).count()
    }

    pub fn number_of_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn number_of_enabled_constraints(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_enabled()).count()
    }

    pub fn has_fixed_variables(&self) -> bool {
        self.variables.iter().any(|v| v.is_fixed())
    }

    pub fn has_selection_variables(&self) -> bool {
        self.variables
            .iter()
            .any(|v| v.sense() == VariableSense::Selection)
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Assemble the cross-reference graph and all evaluation caches. Called
    /// after building and again after any structural change (presolve,
    /// extraction) so that the cached state is consistent.
    pub fn setup(&mut self) {
        self.setup_variable_related_constraints();
        self.setup_variable_sensitivities();
        self.categorize_constraints();
        self.categorize_variables();
        self.setup_expression_caches();
        self.update();
    }

    fn setup_variable_related_constraints(&mut self) {
        let Self {
            variables,
            constraints,
            ..
        } = self;

        for variable in variables.iter_mut() {
            variable.related_constraints.clear();
        }
        for constraint in constraints.iter() {
            if !constraint.is_enabled() {
                continue;
            }
            for &variable in constraint.expression().sensitivities().keys() {
                variables[*variable].related_constraints.push(constraint.id());
            }
        }
        for variable in variables.iter_mut() {
            variable
                .related_constraints
                .sort_by(|&a, &b| constraints[*a].name.cmp(&constraints[*b].name));
            variable.related_constraints.dedup();
        }
    }

    fn setup_variable_sensitivities(&mut self) {
        let Self {
            variables,
            constraints,
            objective,
            ..
        } = self;

        for variable in variables.iter_mut() {
            variable.constraint_sensitivities.clear();
            variable.set_objective_sensitivity(0.0);
        }
        for constraint in constraints.iter() {
            if !constraint.is_enabled() {
                continue;
            }
            for (&variable, &coefficient) in constraint.expression().sensitivities() {
                variables[*variable]
                    .constraint_sensitivities
                    .push((constraint.id(), coefficient));
            }
        }
        for variable in variables.iter_mut() {
            variable
                .constraint_sensitivities
                .sort_by(|&(a, _), &(b, _)| constraints[*a].name.cmp(&constraints[*b].name));
        }
        for (&variable, &coefficient) in objective.expression().sensitivities() {
            variables[*variable].set_objective_sensitivity(coefficient);
        }
    }

    /// Classify every constraint and rebuild the per-type reference from
    /// the enabled ones.
    pub(crate) fn categorize_constraints(&mut self) {
        let classifications: Vec<_> = self
            .constraints
            .iter()
            .map(|constraint| ConstraintTypeClassifier::new(constraint, &self.variables).classify())
            .collect();

        self.constraint_type_reference.clear();
        for (constraint, (constraint_type, key_variable)) in
            self.constraints.iter_mut().zip(classifications)
        {
            constraint.set_constraint_type(constraint_type, key_variable);
            if constraint.is_enabled() {
                self.constraint_type_reference
                    .push(constraint_type, constraint.id());
            }
        }
    }

    pub(crate) fn categorize_variables(&mut self) {
        let reference = &mut self.variable_reference;
        *reference = VariableReference::default();
        for variable in &self.variables {
            if variable.is_fixed() {
                reference.fixed.push(variable.id());
                continue;
            }
            reference.mutable.push(variable.id());
            match variable.sense() {
                VariableSense::Binary => reference.binary.push(variable.id()),
                VariableSense::Integer => reference.integer.push(variable.id()),
                VariableSense::Selection => reference.selection.push(variable.id()),
                VariableSense::DependentBinary | VariableSense::DependentInteger => {
                    reference.dependent.push(variable.id())
                }
            }
        }
    }

    fn setup_expression_caches(&mut self) {
        let Self {
            variables,
            constraints,
            dependent_expressions,
            objective,
            ..
        } = self;

        for constraint in constraints.iter_mut() {
            constraint.expression.setup_fixed_sensitivities();
            constraint
                .expression
                .setup_mutable_variable_sensitivities(variables);
            constraint.expression.setup_hash();
        }
        for expression in dependent_expressions.iter_mut() {
            expression.setup_fixed_sensitivities();
        }
        objective.expression.setup_fixed_sensitivities();
    }

    pub(crate) fn add_selection(&mut self, selection: Selection) -> SelectionID {
        let id = SelectionID::from(self.selections.len());
        for &variable in &selection.variables {
            self.variables[*variable].set_selection(id);
        }
        self.selections.push(selection);
        id
    }

    pub(crate) fn add_dependent_expression(&mut self, expression: Expression) -> ExpressionID {
        let id = ExpressionID::from(self.dependent_expressions.len());
        self.dependent_expressions.push(expression);
        id
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Recompute every cached expression, constraint and objective value
    /// from the live variable values.
    pub fn update(&mut self) {
        let Self {
            variables,
            constraints,
            dependent_expressions,
            objective,
            selections,
            ..
        } = self;

        for expression in dependent_expressions.iter_mut() {
            expression.update(variables);
        }
        for variable in variables.iter_mut() {
            if let Some(expression) = variable.dependent_expression() {
                variable.set_value_force(dependent_expressions[*expression].value().round() as i64);
            }
        }
        for constraint in constraints.iter_mut() {
            constraint.update(variables);
        }
        objective.update(variables);

        for selection in selections.iter_mut() {
            selection.selected_variable = selection
                .variables
                .iter()
                .copied()
                .find(|&v| variables[*v].value() == 1);
        }
    }

    /// Commit a move: refresh the objective, the related enabled
    /// constraints and the dependent expressions incrementally, then write
    /// the alterations back into the variables.
    pub fn update_move(&mut self, mv: &Move) {
        let Self {
            variables,
            constraints,
            dependent_expressions,
            objective,
            selections,
            ..
        } = self;

        objective.update_move(mv, variables);
        for &constraint in &mv.related_constraints {
            let constraint = &mut constraints[*constraint];
            if constraint.is_enabled() {
                constraint.update_move(mv, variables);
            }
        }
        for expression in dependent_expressions.iter_mut() {
            expression.update_move(mv, variables);
        }

        for alteration in &mv.alterations {
            let variable = &mut variables[*alteration.variable];
            variable.set_value_if_mutable(alteration.target);
            variable.increment_update_count();
        }
        for variable in variables.iter_mut() {
            if let Some(expression) = variable.dependent_expression() {
                variable.set_value_force(dependent_expressions[*expression].value().round() as i64);
            }
        }

        if mv.sense == MoveSense::Selection {
            let incoming = mv.alterations[1].variable;
            if let Some(selection) = variables[*incoming].selection() {
                selections[*selection].selected_variable = Some(incoming);
            }
        }
    }

    // ------------------------------------------------------------------
    // Evaluate
    // ------------------------------------------------------------------

    /// Score a candidate move against every enabled constraint. Used for
    /// the initial state and as the slow-path reference for the incremental
    /// evaluator.
    pub fn evaluate_all(
        &self,
        mv: &Move,
        local_penalty_coefficients: &[f64],
        global_penalty_coefficients: &[f64],
    ) -> SolutionScore {
        let mut total_violation = 0.0;
        let mut local_penalty = 0.0;
        let mut global_penalty = 0.0;
        let mut is_constraint_improvable = false;

        for constraint in &self.constraints {
            if !constraint.is_enabled() {
                continue;
            }
            let violation = constraint.evaluate_violation_move(mv, &self.variables);
            if violation < constraint.violation_value() {
                is_constraint_improvable = true;
            }
            total_violation += violation;
            local_penalty += local_penalty_coefficients[*constraint.id()] * violation;
            global_penalty += global_penalty_coefficients[*constraint.id()] * violation;
        }

        self.compose_score(
            mv,
            total_violation,
            local_penalty,
            global_penalty,
            is_constraint_improvable,
        )
    }

    /// Score a candidate move incrementally from the current score,
    /// visiting only the move's related constraints.
    pub fn evaluate_move(
        &self,
        mv: &Move,
        current_score: &SolutionScore,
        local_penalty_coefficients: &[f64],
        global_penalty_coefficients: &[f64],
    ) -> SolutionScore {
        let mut total_violation = current_score.total_violation;
        let mut local_penalty = current_score.local_penalty;
        let mut global_penalty = current_score.global_penalty;
        let mut is_constraint_improvable = false;

        for &constraint in &mv.related_constraints {
            let constraint = &self.constraints[*constraint];
            if !constraint.is_enabled() {
                continue;
            }
            let violation_diff = constraint.evaluate_violation_move(mv, &self.variables)
                - constraint.violation_value();
            total_violation += violation_diff;
            if violation_diff < 0.0 {
                is_constraint_improvable = true;
            }
            local_penalty += violation_diff * local_penalty_coefficients[*constraint.id()];
            global_penalty += violation_diff * global_penalty_coefficients[*constraint.id()];
        }

        self.compose_score(
            mv,
            total_violation,
            local_penalty,
            global_penalty,
            is_constraint_improvable,
        )
    }

    fn compose_score(
        &self,
        mv: &Move,
        total_violation: f64,
        local_penalty: f64,
        global_penalty: f64,
        is_constraint_improvable: bool,
    ) -> SolutionScore {
        let objective = self.objective.evaluate_move(mv, &self.variables) * self.sign();
        let objective_improvement = (self.objective.value() * self.sign()) - objective;

        SolutionScore {
            objective,
            objective_improvement,
            total_violation,
            local_penalty,
            global_penalty,
            local_augmented_objective: objective + local_penalty,
            global_augmented_objective: objective + global_penalty,
            is_objective_improvable: objective_improvement > *self.atol,
            is_constraint_improvable,
            is_feasible: total_violation <= *self.atol,
        }
    }

    /// A constraint-indexed coefficient vector filled with `value`, shaped
    /// for the penalty arguments of the evaluators.
    pub fn generate_constraint_parameters(&self, value: f64) -> Vec<f64> {
        vec![value; self.constraints.len()]
    }

    /// Structural counts of the current model state.
    pub fn summary(&self) -> ProblemSummary {
        let reference = &self.variable_reference;
        let mut constraint_counts = Vec::new();
        for constraint in &self.constraints {
            if constraint.is_enabled() {
                let constraint_type = constraint.constraint_type();
                match constraint_counts
                    .iter_mut()
                    .find(|(t, _)| *t == constraint_type)
                {
                    Some((_, count)) => *count += 1,
                    None => constraint_counts.push((constraint_type, 1)),
                }
            }
        }
        ProblemSummary {
            number_of_variables: self.variables.len(),
            number_of_fixed_variables: reference.fixed.len(),
            number_of_binary_variables: reference.binary.len(),
            number_of_integer_variables: reference.integer.len(),
            number_of_selection_variables: reference.selection.len(),
            number_of_dependent_variables: reference.dependent.len(),
            number_of_constraints: self.constraints.len(),
            number_of_enabled_constraints: self.number_of_enabled_constraints(),
            number_of_selections: self.selections.len(),
            constraint_counts,
        }
    }

    // ------------------------------------------------------------------
    // Solution import
    // ------------------------------------------------------------------

    /// Replay a name → value assignment through the mutable write path.
    /// Fixed variables keep their values; unknown names are skipped with a
    /// warning.
    pub fn import_solution(&mut self, solution: &HashMap<String, i64>) {
        for (name, &value) in solution {
            match self.variable_names.get(name) {
                Some(&id) => self.variables[*id].set_value_if_mutable(value),
                None => warn!("The variable {name} in the initial solution is not defined."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Alteration;

    /// min 2x + 3y  s.t.  x + y - 2 >= 0,  0 <= x, y <= 5
    fn small_model() -> Model {
        let mut model = Model::new("small");
        let x = model.create_variable("x", 0, 5).unwrap();
        let y = model.create_variable("y", 0, 5).unwrap();

        let mut g = Expression::new();
        g.add_term(x, 1.0);
        g.add_term(y, 1.0);
        g.add_constant(-2.0);
        model.create_constraint("g", g, ConstraintSense::Greater);

        let mut objective = Expression::new();
        objective.add_term(x, 2.0);
        objective.add_term(y, 3.0);
        model.minimize(objective);

        model.setup();
        model
    }

    fn shift(variable: VariableID, target: i64, related: Vec<ConstraintID>) -> Move {
        Move {
            alterations: vec![Alteration { variable, target }],
            sense: MoveSense::Integer,
            related_constraints: related,
        }
    }

    #[test]
    fn test_setup_builds_related_constraints() {
        let model = small_model();
        assert_eq!(model.variable(VariableID::from(0usize)).related_constraints(), &[ConstraintID::from(0usize)]);
        assert_eq!(
            model.variable(VariableID::from(0usize)).objective_sensitivity(),
            2.0
        );
        assert_eq!(
            model.variable(VariableID::from(1usize)).objective_sensitivity(),
            3.0
        );
    }

    #[test]
    fn test_update_populates_caches() {
        let mut model = small_model();
        model.update();
        // x = y = 0: g = -2, violation 2.
        let constraint = model.constraint(ConstraintID::from(0usize));
        assert_eq!(constraint.constraint_value(), -2.0);
        assert_eq!(constraint.violation_value(), 2.0);
        assert_eq!(model.objective().value(), 0.0);
    }

    #[test]
    fn test_evaluate_move_matches_full_evaluation() {
        let mut model = small_model();
        model.update();

        let penalties = vec![1.0; model.number_of_constraints()];
        let current = model.evaluate_all(&Move::default(), &penalties, &penalties);
        assert!(!current.is_feasible);
        assert_eq!(current.total_violation, 2.0);

        let mv = shift(VariableID::from(0usize), 2, vec![ConstraintID::from(0usize)]);
        let incremental = model.evaluate_move(&mv, &current, &penalties, &penalties);
        let full = model.evaluate_all(&mv, &penalties, &penalties);

        assert_eq!(incremental.total_violation, full.total_violation);
        assert_eq!(incremental.objective, full.objective);
        assert!(incremental.is_feasible);
        assert!(incremental.is_constraint_improvable);
    }

    #[test]
    fn test_update_move_then_rebuild_agrees() {
        let mut model = small_model();
        model.update();

        let mv = shift(VariableID::from(1usize), 2, vec![ConstraintID::from(0usize)]);
        model.update_move(&mv);

        assert_eq!(model.variable(VariableID::from(1usize)).value(), 2);
        assert_eq!(model.objective().value(), 6.0);
        let cached_violation = model.constraint(ConstraintID::from(0usize)).violation_value();

        // Rebuilding from scratch gives the same values.
        model.update();
        assert_eq!(model.objective().value(), 6.0);
        assert_eq!(
            model.constraint(ConstraintID::from(0usize)).violation_value(),
            cached_violation
        );
    }

    #[test]
    fn test_maximization_sign() {
        let mut model = Model::new("max");
        let x = model.create_variable("x", 0, 5).unwrap();
        let mut objective = Expression::new();
        objective.add_term(x, 1.0);
        model.maximize(objective);
        model.setup();

        let mv = shift(x, 3, vec![]);
        let score = model.evaluate_all(&mv, &[], &[]);
        // Signed objective: smaller is better, so raising x improves it.
        assert_eq!(score.objective, -3.0);
        assert!(score.is_objective_improvable);
    }

    #[test]
    fn test_import_solution() {
        let mut model = small_model();
        model.variable_mut(VariableID::from(0usize)).fix_by(1);

        let mut solution = HashMap::new();
        solution.insert("x".to_string(), 4);
        solution.insert("y".to_string(), 3);
        solution.insert("phantom".to_string(), 9);
        model.import_solution(&solution);

        // x is fixed and keeps its value; y is written.
        assert_eq!(model.variable(VariableID::from(0usize)).value(), 1);
        assert_eq!(model.variable(VariableID::from(1usize)).value(), 3);
    }

    #[test]
    fn test_summary_counts() {
        let model = small_model();
        let summary = model.summary();
        assert_eq!(summary.number_of_variables, 2);
        assert_eq!(summary.number_of_integer_variables, 2);
        assert_eq!(summary.number_of_enabled_constraints, 1);
        assert_eq!(summary.constraint_counts.len(), 1);
        assert_eq!(summary.constraint_counts[0].1, 1);
    }

    #[test]
    fn test_generate_constraint_parameters() {
        let model = small_model();
        assert_eq!(model.generate_constraint_parameters(1e7), vec![1e7]);
    }

    #[test]
    fn test_duplicate_variable_name() {
        let mut model = Model::new("dup");
        model.create_variable("x", 0, 1).unwrap();
        assert!(matches!(
            model.create_variable("x", 0, 1),
            Err(ModelError::DuplicateVariableName { .. })
        ));
    }
}
