use crate::Model;
use serde::Serialize;
use std::collections::BTreeMap;

/// Run status exported next to the incumbent: per-constraint penalty
/// coefficients and update counts, plus outer-driver counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status {
    pub penalty_coefficients: BTreeMap<String, f64>,
    pub update_counts: BTreeMap<String, u64>,
    pub is_found_feasible_solution: bool,
    pub elapsed_time: f64,
    pub number_of_lagrange_dual_iterations: u64,
    pub number_of_local_search_iterations: u64,
    pub number_of_tabu_search_iterations: u64,
    pub number_of_tabu_search_loops: u64,
}

impl Status {
    /// Snapshot the per-constraint fields from the model; the outer driver
    /// fills in the counters afterwards.
    pub fn from_model(model: &Model, penalty_coefficients: &[f64]) -> Self {
        let mut status = Self::default();
        for constraint in model.constraints() {
            status.penalty_coefficients.insert(
                constraint.name().to_string(),
                penalty_coefficients
                    .get(*constraint.id())
                    .copied()
                    .unwrap_or(0.0),
            );
            status
                .update_counts
                .insert(constraint.name().to_string(), constraint.update_count());
        }
        status
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstraintSense, Expression};

    #[test]
    fn test_from_model() {
        let mut model = Model::new("status");
        let x = model.create_variable("x", 0, 5).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 1.0);
        e.add_constant(-2.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();

        let mut status = Status::from_model(&model, &[10.0]);
        status.is_found_feasible_solution = true;
        status.number_of_tabu_search_loops = 3;

        assert_eq!(status.penalty_coefficients["c"], 10.0);
        assert_eq!(status.update_counts["c"], 0);

        let json = status.to_json().unwrap();
        assert!(json.contains("\"number_of_tabu_search_loops\": 3"));
        assert!(json.contains("\"is_found_feasible_solution\": true"));
    }
}
