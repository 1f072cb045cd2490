use crate::{Constraint, ConstraintID, Variable, VariableID};
use derive_more::{Deref, From};
use fnv::{FnvHashMap, FnvHashSet};

/// Index of a selection block in the model arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct SelectionID(usize);

impl SelectionID {
    pub fn into_inner(&self) -> usize {
        self.0
    }
}

impl std::fmt::Debug for SelectionID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SelectionID({})", self.0)
    }
}

/// A set-partitioning constraint elevated to a first-class structural
/// object so that it can be swapped atomically.
///
/// Invariant: exactly one member variable has value 1 at all times outside
/// of a pending move.
#[derive(Debug, Clone)]
pub struct Selection {
    pub constraint: ConstraintID,
    pub variables: Vec<VariableID>,
    pub selected_variable: Option<VariableID>,
    /// Deduplicated union of the member variables' related constraints,
    /// including disabled ones, heuristically ordered for cache locality on
    /// move scoring.
    pub related_constraints: Vec<ConstraintID>,
}

impl Selection {
    pub fn from_constraint(constraint: &Constraint) -> Self {
        Self {
            constraint: constraint.id(),
            variables: constraint.expression().sensitivities().keys().copied().collect(),
            selected_variable: None,
            related_constraints: Vec::new(),
        }
    }

    /// Build the related-constraint list.
    ///
    /// The union is gathered by scanning the whole constraint arena for
    /// sensitivities on member variables: the per-variable cache covers
    /// enabled constraints only, but disabled ones must stay in this list so
    /// their cached values can be refreshed after a swap.
    ///
    /// Member variables are visited by descending constraint count (names
    /// break ties); each member's constraints are appended unseen-first,
    /// ordered by ascending sensitivity size while the list is less than half
    /// assembled and by descending size afterwards. The resulting order keeps
    /// the constraints a swap touches most often close together.
    pub fn setup_related_constraints(
        &mut self,
        variables: &[Variable],
        constraints: &[Constraint],
    ) {
        let members: FnvHashSet<VariableID> = self.variables.iter().copied().collect();
        let mut member_constraints: FnvHashMap<VariableID, Vec<ConstraintID>> =
            FnvHashMap::default();
        let mut related_set: FnvHashSet<ConstraintID> = FnvHashSet::default();
        for constraint in constraints {
            for &variable in constraint.expression().sensitivities().keys() {
                if members.contains(&variable) {
                    member_constraints
                        .entry(variable)
                        .or_default()
                        .push(constraint.id());
                    related_set.insert(constraint.id());
                }
            }
        }

        self.variables
            .sort_by(|&a, &b| variables[*a].name().cmp(variables[*b].name()));
        self.variables.sort_by_key(|&v| {
            std::cmp::Reverse(member_constraints.get(&v).map_or(0, Vec::len))
        });

        let mut inserted: FnvHashSet<ConstraintID> = FnvHashSet::default();
        self.related_constraints.clear();

        for &variable in &self.variables {
            let mut candidate_constraints = member_constraints
                .get(&variable)
                .cloned()
                .unwrap_or_default();
            candidate_constraints
                .sort_by(|&a, &b| constraints[*a].name().cmp(constraints[*b].name()));
            if self.related_constraints.len() < related_set.len() / 2 {
                candidate_constraints.sort_by_key(|&c| {
                    constraints[*c].expression().sensitivities().len()
                });
            } else {
                candidate_constraints.sort_by_key(|&c| {
                    std::cmp::Reverse(constraints[*c].expression().sensitivities().len())
                });
            }
            for constraint in candidate_constraints {
                if constraint == self.constraint {
                    continue;
                }
                if inserted.insert(constraint) {
                    self.related_constraints.push(constraint);
                }
            }
        }
    }
}
