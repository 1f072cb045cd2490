use crate::{BinaryMatrix, ConstraintID, ConstraintType, Model, VariableID};
use fnv::{FnvHashMap, FnvHashSet};
use tracing::info;

/// Solves the problem outright when, after presolve, every enabled
/// constraint is a GF(2) equation `(sum +-x_i) + 2k = c` over binaries with
/// one integer slack each.
pub struct Gf2Solver<'a> {
    model: &'a mut Model,
}

impl<'a> Gf2Solver<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self { model }
    }

    /// Attempt the elimination. Returns false (leaving the model untouched)
    /// when the system does not cover the problem, the shapes do not match,
    /// or the binary matrix is rank-deficient.
    pub fn solve(&mut self) -> bool {
        info!("Attempting to solve GF(2) equations...");

        let equations: Vec<ConstraintID> = self
            .model
            .constraint_type_reference()
            .of(ConstraintType::Gf2)
            .iter()
            .copied()
            .filter(|&c| self.model.constraint(c).is_enabled())
            .collect();
        let size = equations.len();
        if size == 0 || self.model.number_of_enabled_constraints() != size {
            info!("Failed.");
            return false;
        }

        let mut binary_variables: FnvHashSet<VariableID> = FnvHashSet::default();
        let mut key_variables: FnvHashSet<VariableID> = FnvHashSet::default();
        for &constraint in &equations {
            let constraint = self.model.constraint(constraint);
            let key_variable = constraint.key_variable();
            for &variable in constraint.expression().sensitivities().keys() {
                if Some(variable) == key_variable {
                    key_variables.insert(variable);
                } else {
                    binary_variables.insert(variable);
                }
            }
        }

        // The equations and the binary variables must map onto the same
        // square shape, with one distinct slack per equation.
        if binary_variables.len() != size || key_variables.len() != size {
            info!("Failed.");
            return false;
        }

        let binary_order: Vec<VariableID> = binary_variables.iter().copied().collect();
        let column_of: FnvHashMap<VariableID, usize> = binary_order
            .iter()
            .enumerate()
            .map(|(index, &variable)| (variable, index))
            .collect();

        let mut matrix = BinaryMatrix::zeros(size, size);
        let mut constants = vec![0u8; size];
        for (row, &constraint) in equations.iter().enumerate() {
            let constraint = self.model.constraint(constraint);
            let key_variable = constraint.key_variable();
            for &variable in constraint.expression().sensitivities().keys() {
                if Some(variable) != key_variable {
                    matrix.set(row, column_of[&variable], 1);
                }
            }
            constants[row] = (constraint.expression().constant_value() as i64 & 1) as u8;
        }

        let (inverse, rank) = matrix.inverse_and_rank();
        if rank != size {
            info!("Failed.");
            return false;
        }

        let solution = inverse.dot(&constants);
        for (index, &variable) in binary_order.iter().enumerate() {
            self.model.variables[*variable].fix_by(solution[index] as i64);
        }

        // Back-solve each slack from its equation.
        for &constraint_id in &equations {
            let constraint = self.model.constraint(constraint_id);
            let key_variable = constraint
                .key_variable()
                .expect("a GF(2) equation always has a key variable");
            let mut value = constraint.expression().constant_value();
            for (&variable, &coefficient) in constraint.expression().sensitivities() {
                if variable != key_variable {
                    value += coefficient * self.model.variable(variable).value() as f64;
                }
            }
            let key_coefficient = constraint.expression().sensitivities()[&key_variable];
            let key_value = (-value / key_coefficient) as i64;
            self.model.variables[*key_variable].fix_by(key_value);
        }

        for &variable in binary_order.iter().chain(key_variables.iter()) {
            info!(
                "The value of variable {} was fixed at {}.",
                self.model.variable(variable).name(),
                self.model.variable(variable).value()
            );
        }
        info!("Done.");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstraintSense, Expression};

    /// x1 + x2 + 2k1 = 1; x2 + x3 + 2k2 = 1; x1 + 2k3 = 0.
    fn gf2_model() -> (Model, Vec<VariableID>, Vec<VariableID>) {
        let mut model = Model::new("gf2");
        let xs: Vec<VariableID> = (0..3)
            .map(|i| model.create_binary_variable(format!("x[{i}]")).unwrap())
            .collect();
        let ks: Vec<VariableID> = (0..3)
            .map(|i| model.create_variable(format!("k[{i}]"), -4, 4).unwrap())
            .collect();

        for (index, (members, constant)) in [
            (vec![xs[0], xs[1]], -1.0),
            (vec![xs[1], xs[2]], -1.0),
            (vec![xs[0]], 0.0),
        ]
        .into_iter()
        .enumerate()
        {
            let mut e = Expression::new();
            for member in members {
                e.add_term(member, 1.0);
            }
            e.add_term(ks[index], 2.0);
            e.add_constant(constant);
            model.create_constraint(format!("p[{index}]"), e, ConstraintSense::Equal);
        }
        model.setup();
        (model, xs, ks)
    }

    #[test]
    fn test_classified_as_gf2() {
        let (model, _, _) = gf2_model();
        assert_eq!(
            model
                .constraint_type_reference()
                .of(ConstraintType::Gf2)
                .len(),
            3
        );
    }

    #[test]
    fn test_solve_fixes_all_variables() {
        let (mut model, xs, ks) = gf2_model();
        assert!(Gf2Solver::new(&mut model).solve());

        for &variable in xs.iter().chain(ks.iter()) {
            assert!(model.variable(variable).is_fixed());
        }

        // Every equation holds exactly at the fixed assignment.
        model.update();
        for constraint in model.constraints() {
            assert_eq!(constraint.violation_value(), 0.0);
        }

        // Parity solution: x1 = 0, x2 = 1, x3 = 0 up to the slack choice.
        let x_values: Vec<i64> = xs.iter().map(|&v| model.variable(v).value()).collect();
        assert_eq!(x_values, vec![0, 1, 0]);
    }

    #[test]
    fn test_solve_refuses_mixed_problems() {
        let (mut model, xs, _) = gf2_model();
        // An extra non-GF(2) row keeps the solver away.
        let mut e = Expression::new();
        e.add_term(xs[0], 3.0);
        e.add_constant(-2.0);
        model.create_constraint("extra", e, ConstraintSense::Less);
        model.setup();

        assert!(!Gf2Solver::new(&mut model).solve());
        assert!(!model.variable(xs[0]).is_fixed());
    }
}
