use crate::Model;
use serde::Serialize;
use std::collections::BTreeMap;

/// Name-keyed export of an incumbent: variable values, expression values,
/// constraint values and violations, plus the raw objective and a
/// feasibility verdict.
#[derive(Debug, Clone, Serialize)]
pub struct NamedSolution {
    pub variables: BTreeMap<String, i64>,
    pub expressions: BTreeMap<String, f64>,
    pub constraints: BTreeMap<String, f64>,
    pub violations: BTreeMap<String, f64>,
    pub objective: f64,
    pub is_feasible: bool,
}

impl NamedSolution {
    /// Snapshot the model's current state. The caches must be up to date
    /// (`Model::update` has run since the last change).
    pub fn from_model(model: &Model) -> Self {
        let variables = model
            .variables()
            .iter()
            .map(|variable| (variable.name().to_string(), variable.value()))
            .collect();

        let mut expressions = BTreeMap::new();
        for variable in model.variables() {
            if let Some(expression) = variable.dependent_expression() {
                let expression = model.dependent_expression(expression);
                expressions.insert(expression.name().to_string(), expression.value());
            }
        }

        let mut constraints = BTreeMap::new();
        let mut violations = BTreeMap::new();
        let mut total_violation = 0.0;
        for constraint in model.constraints() {
            constraints.insert(constraint.name().to_string(), constraint.constraint_value());
            violations.insert(constraint.name().to_string(), constraint.violation_value());
            if constraint.is_enabled() {
                total_violation += constraint.violation_value();
            }
        }

        Self {
            variables,
            expressions,
            constraints,
            violations,
            objective: model.objective().value(),
            is_feasible: total_violation <= *model.atol(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text incumbent listing, one `name = value` line per variable.
    pub fn write_text<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (name, value) in &self.variables {
            writeln!(writer, "{name} = {value}")?;
        }
        Ok(())
    }
}

/// Archive of the feasible solutions visited during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolutionArchive {
    pub solutions: Vec<NamedSolution>,
}

impl SolutionArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the model's current state if it is feasible.
    pub fn push_if_feasible(&mut self, model: &Model) -> bool {
        let solution = NamedSolution::from_model(model);
        if solution.is_feasible {
            self.solutions.push(solution);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
