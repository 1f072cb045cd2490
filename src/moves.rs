use crate::{ConstraintID, Variable, VariableID, VariableSense};

/// A single proposed write: variable → target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alteration {
    pub variable: VariableID,
    pub target: i64,
}

/// Structural tag of a move, matching the generator that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveSense {
    Binary,
    Integer,
    Aggregation,
    Precedence,
    VariableBound,
    Exclusive,
    Selection,
    UserDefined,
}

/// A proposed set of alterations together with the constraints whose values
/// they can change.
///
/// For Selection moves, `alterations[0]` clears the currently selected
/// variable and `alterations[1]` sets the incoming one; the related set is
/// capped to the selection block's own constraint list.
#[derive(Debug, Clone)]
pub struct Move {
    pub alterations: Vec<Alteration>,
    pub sense: MoveSense,
    pub related_constraints: Vec<ConstraintID>,
}

impl Move {
    pub fn new(sense: MoveSense) -> Self {
        Self {
            alterations: Vec::new(),
            sense,
            related_constraints: Vec::new(),
        }
    }
}

impl Default for Move {
    fn default() -> Self {
        Self::new(MoveSense::UserDefined)
    }
}

pub fn has_fixed_variable(mv: &Move, variables: &[Variable]) -> bool {
    mv.alterations
        .iter()
        .any(|alteration| variables[*alteration.variable].is_fixed())
}

pub fn has_selection_variable(mv: &Move, variables: &[Variable]) -> bool {
    mv.alterations
        .iter()
        .any(|alteration| variables[*alteration.variable].sense() == VariableSense::Selection)
}

pub fn has_bound_violation(mv: &Move, variables: &[Variable]) -> bool {
    mv.alterations.iter().any(|alteration| {
        let variable = &variables[*alteration.variable];
        alteration.target < variable.lower_bound() || alteration.target > variable.upper_bound()
    })
}

pub fn has_improvable_variable(mv: &Move, variables: &[Variable]) -> bool {
    mv.alterations
        .iter()
        .any(|alteration| variables[*alteration.variable].is_improvable())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> Vec<Variable> {
        (0..3)
            .map(|i| {
                let mut v = Variable::new(VariableID::from(i), format!("x[{i}]"));
                v.set_bound(0, 1).unwrap();
                v
            })
            .collect()
    }

    fn flip(variable: usize, target: i64) -> Move {
        Move {
            alterations: vec![Alteration {
                variable: VariableID::from(variable),
                target,
            }],
            sense: MoveSense::Binary,
            related_constraints: Vec::new(),
        }
    }

    #[test]
    fn test_has_fixed_variable() {
        let mut vs = variables();
        assert!(!has_fixed_variable(&flip(0, 1), &vs));
        vs[0].fix_by(1);
        assert!(has_fixed_variable(&flip(0, 0), &vs));
        assert!(!has_fixed_variable(&flip(1, 1), &vs));
    }

    #[test]
    fn test_has_bound_violation() {
        let vs = variables();
        assert!(!has_bound_violation(&flip(0, 1), &vs));
        assert!(has_bound_violation(&flip(0, 2), &vs));
        assert!(has_bound_violation(&flip(0, -1), &vs));
    }

    #[test]
    fn test_has_improvable_variable() {
        let mut vs = variables();
        assert!(!has_improvable_variable(&flip(0, 1), &vs));
        vs[0].set_is_feasibility_improvable(true);
        assert!(has_improvable_variable(&flip(0, 1), &vs));
    }
}
