use crate::{
    has_bound_violation, has_fixed_variable, has_improvable_variable, has_selection_variable,
    parallel, Alteration, ConstraintID, ConstraintSense, ConstraintType,
    ImprovabilityScreeningMode, Model, Move, MoveSense, Options, Selection, Variable, VariableID,
};
use fnv::{FnvHashMap, FnvHashSet};
use rand::seq::SliceRandom;
use rand::Rng;

/// Identifies the template pool a candidate move lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovePool {
    Binary,
    Integer,
    Precedence,
    Aggregation,
    VariableBound,
    Exclusive,
    UserDefined,
    Selection,
}

const MOVE_POOLS: [MovePool; 8] = [
    MovePool::Binary,
    MovePool::Integer,
    MovePool::Precedence,
    MovePool::Aggregation,
    MovePool::VariableBound,
    MovePool::Exclusive,
    MovePool::UserDefined,
    MovePool::Selection,
];

/// Reference to a move template: pool plus index within the pool.
pub type MoveRef = (MovePool, usize);

/// Two-variable constraint data captured at setup for template refresh.
#[derive(Debug, Clone)]
struct TwoTermRow {
    variables: [VariableID; 2],
    coefficients: [f64; 2],
    constant: f64,
    sense: ConstraintSense,
}

type MoveUpdater = Box<dyn Fn(&mut Vec<Move>) + Send + Sync>;

/// The library of structured move generators.
///
/// Each generator builds a pool of move templates once at setup; every outer
/// iteration `update_moves` refreshes the templates' alterations from the
/// live variable values, screens them for admissibility and gathers the
/// admitted ones into a single candidate sequence.
#[derive(Default)]
pub struct Neighborhood {
    binary_variables: Vec<VariableID>,
    binary_moves: Vec<Move>,
    binary_move_flags: Vec<u8>,

    integer_variables: Vec<VariableID>,
    integer_moves: Vec<Move>,
    integer_move_flags: Vec<u8>,

    precedence_rows: Vec<TwoTermRow>,
    precedence_moves: Vec<Move>,
    precedence_move_flags: Vec<u8>,

    aggregation_rows: Vec<TwoTermRow>,
    aggregation_moves: Vec<Move>,
    aggregation_move_flags: Vec<u8>,

    variable_bound_rows: Vec<TwoTermRow>,
    variable_bound_moves: Vec<Move>,
    variable_bound_move_flags: Vec<u8>,

    exclusive_moves: Vec<Move>,
    exclusive_move_flags: Vec<u8>,

    selection_variables: Vec<VariableID>,
    selection_moves: Vec<Move>,
    selection_move_flags: Vec<u8>,

    user_defined_moves: Vec<Move>,
    user_defined_move_flags: Vec<u8>,
    user_defined_move_updater: Option<MoveUpdater>,

    candidate_moves: Vec<MoveRef>,

    has_fixed_variables: bool,
    has_selection_variables: bool,
    enabled: FnvHashMap<MovePool, bool>,
}

impl std::fmt::Debug for Neighborhood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neighborhood")
            .field("binary_moves", &self.binary_moves.len())
            .field("integer_moves", &self.integer_moves.len())
            .field("precedence_moves", &self.precedence_moves.len())
            .field("aggregation_moves", &self.aggregation_moves.len())
            .field("variable_bound_moves", &self.variable_bound_moves.len())
            .field("exclusive_moves", &self.exclusive_moves.len())
            .field("selection_moves", &self.selection_moves.len())
            .field("user_defined_moves", &self.user_defined_moves.len())
            .field("candidate_moves", &self.candidate_moves.len())
            .finish()
    }
}

fn union_related_constraints(variables: &[Variable], members: &[VariableID]) -> Vec<ConstraintID> {
    let mut seen: FnvHashSet<ConstraintID> = FnvHashSet::default();
    let mut related: Vec<ConstraintID> = Vec::new();
    for &member in members {
        for &constraint in variables[*member].related_constraints() {
            if seen.insert(constraint) {
                related.push(constraint);
            }
        }
    }
    related
}

impl Neighborhood {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire every generator from the model's current structure, honoring
    /// the per-generator toggles.
    pub fn setup(&mut self, model: &Model, options: &Options) {
        self.has_fixed_variables = model.has_fixed_variables();
        self.has_selection_variables = model.has_selection_variables();

        let neighborhood = &options.neighborhood;
        self.set_enabled(MovePool::Binary, neighborhood.is_enabled_binary_move);
        self.set_enabled(MovePool::Integer, neighborhood.is_enabled_integer_move);
        self.set_enabled(MovePool::Precedence, neighborhood.is_enabled_precedence_move);
        self.set_enabled(MovePool::Aggregation, neighborhood.is_enabled_aggregation_move);
        self.set_enabled(
            MovePool::VariableBound,
            neighborhood.is_enabled_variable_bound_move,
        );
        self.set_enabled(MovePool::Exclusive, neighborhood.is_enabled_exclusive_move);
        self.set_enabled(MovePool::Selection, neighborhood.is_enabled_selection_move);
        self.set_enabled(
            MovePool::UserDefined,
            neighborhood.is_enabled_user_defined_move,
        );

        let reference = model.variable_reference();
        self.setup_binary_moves(model, reference.binary.clone());
        self.setup_integer_moves(model, reference.integer.clone());

        let type_reference = model.constraint_type_reference();
        self.setup_precedence_moves(model, type_reference.of(ConstraintType::Precedence));
        self.setup_aggregation_moves(model, type_reference.of(ConstraintType::Aggregation));
        self.setup_variable_bound_moves(model, type_reference.of(ConstraintType::VariableBound));
        self.setup_exclusive_moves(
            model,
            type_reference.of(ConstraintType::SetPartitioning),
            type_reference.of(ConstraintType::SetPacking),
        );
        self.setup_selection_moves(model, reference.selection.clone());
    }

    pub fn is_enabled(&self, pool: MovePool) -> bool {
        self.enabled.get(&pool).copied().unwrap_or(false)
    }

    pub fn set_enabled(&mut self, pool: MovePool, is_enabled: bool) {
        self.enabled.insert(pool, is_enabled);
    }

    /// Legacy compatibility: a user-defined updater supersedes the built-in
    /// generators. Gated by
    /// `NeighborhoodOption::is_enabled_user_defined_move_exclusive`.
    pub fn disable_default_moves(&mut self) {
        for pool in MOVE_POOLS {
            if pool != MovePool::UserDefined {
                self.set_enabled(pool, false);
            }
        }
    }

    pub fn set_user_defined_move_updater(&mut self, updater: MoveUpdater) {
        self.user_defined_move_updater = Some(updater);
        self.set_enabled(MovePool::UserDefined, true);
    }

    // ------------------------------------------------------------------
    // Template pool construction
    // ------------------------------------------------------------------

    /// One flip template per binary variable.
    fn setup_binary_moves(&mut self, model: &Model, variables: Vec<VariableID>) {
        self.binary_moves = variables
            .iter()
            .map(|&variable| Move {
                alterations: Vec::new(),
                sense: MoveSense::Binary,
                related_constraints: model.variable(variable).related_constraints().to_vec(),
            })
            .collect();
        self.binary_move_flags = vec![0; variables.len()];
        self.binary_variables = variables;
    }

    /// Two shift templates (+1 / -1) per integer variable.
    fn setup_integer_moves(&mut self, model: &Model, variables: Vec<VariableID>) {
        self.integer_moves = variables
            .iter()
            .flat_map(|&variable| {
                let related = model.variable(variable).related_constraints().to_vec();
                [
                    Move {
                        alterations: Vec::new(),
                        sense: MoveSense::Integer,
                        related_constraints: related.clone(),
                    },
                    Move {
                        alterations: Vec::new(),
                        sense: MoveSense::Integer,
                        related_constraints: related,
                    },
                ]
            })
            .collect();
        self.integer_move_flags = vec![0; 2 * variables.len()];
        self.integer_variables = variables;
    }

    fn two_term_rows(model: &Model, constraints: &[ConstraintID]) -> Vec<TwoTermRow> {
        constraints
            .iter()
            .filter(|&&c| model.constraint(c).is_enabled())
            .map(|&c| {
                let constraint = model.constraint(c);
                let mut terms = constraint.expression().sensitivities().iter();
                let (&v0, &c0) = terms.next().expect("a two-term constraint");
                let (&v1, &c1) = terms.next().expect("a two-term constraint");
                TwoTermRow {
                    variables: [v0, v1],
                    coefficients: [c0, c1],
                    constant: constraint.expression().constant_value(),
                    sense: constraint.sense(),
                }
            })
            .collect()
    }

    fn two_term_moves(
        model: &Model,
        rows: &[TwoTermRow],
        sense: MoveSense,
        moves_per_row: usize,
    ) -> Vec<Move> {
        rows.iter()
            .flat_map(|row| {
                let related = union_related_constraints(model.variables(), &row.variables);
                std::iter::repeat_with(move || Move {
                    alterations: Vec::new(),
                    sense,
                    related_constraints: related.clone(),
                })
                .take(moves_per_row)
            })
            .collect()
    }

    /// Two co-moving templates per two-variable precedence constraint.
    fn setup_precedence_moves(&mut self, model: &Model, constraints: &[ConstraintID]) {
        self.precedence_rows = Self::two_term_rows(model, constraints);
        self.precedence_moves =
            Self::two_term_moves(model, &self.precedence_rows, MoveSense::Precedence, 2);
        self.precedence_move_flags = vec![0; self.precedence_moves.len()];
    }

    /// Four templates per two-variable equation: each of {x±1, y±1} paired
    /// with the forced value of the other variable.
    fn setup_aggregation_moves(&mut self, model: &Model, constraints: &[ConstraintID]) {
        self.aggregation_rows = Self::two_term_rows(model, constraints);
        self.aggregation_moves =
            Self::two_term_moves(model, &self.aggregation_rows, MoveSense::Aggregation, 4);
        self.aggregation_move_flags = vec![0; self.aggregation_moves.len()];
    }

    /// Four templates per two-variable inequality, mirroring Aggregation
    /// but clamping the partner with floor/ceil by sense.
    fn setup_variable_bound_moves(&mut self, model: &Model, constraints: &[ConstraintID]) {
        self.variable_bound_rows = Self::two_term_rows(model, constraints);
        self.variable_bound_moves = Self::two_term_moves(
            model,
            &self.variable_bound_rows,
            MoveSense::VariableBound,
            4,
        );
        self.variable_bound_move_flags = vec![0; self.variable_bound_moves.len()];
    }

    /// One template per variable appearing in a non-selection partitioning
    /// or packing constraint: set the variable, clear every associate. The
    /// alterations are static and never refreshed.
    fn setup_exclusive_moves(
        &mut self,
        model: &Model,
        set_partitionings: &[ConstraintID],
        set_packings: &[ConstraintID],
    ) {
        let mut associations: FnvHashMap<VariableID, FnvHashSet<VariableID>> =
            FnvHashMap::default();
        for &constraint in set_partitionings.iter().chain(set_packings.iter()) {
            let constraint = model.constraint(constraint);
            if !constraint.is_enabled() {
                continue;
            }
            let members: Vec<VariableID> =
                constraint.expression().sensitivities().keys().copied().collect();
            for &first in &members {
                for &second in &members {
                    if first != second {
                        associations.entry(first).or_default().insert(second);
                    }
                }
            }
        }

        self.exclusive_moves = associations
            .iter()
            .map(|(&variable, associates)| {
                let mut members = vec![variable];
                members.extend(associates.iter().copied());
                let mut alterations = vec![Alteration {
                    variable,
                    target: 1,
                }];
                alterations.extend(associates.iter().map(|&associate| Alteration {
                    variable: associate,
                    target: 0,
                }));
                Move {
                    alterations,
                    sense: MoveSense::Exclusive,
                    related_constraints: union_related_constraints(model.variables(), &members),
                }
            })
            .collect();
        self.exclusive_move_flags = vec![0; self.exclusive_moves.len()];
    }

    /// One swap template per member of a selection block. The related set
    /// is capped to the block's own constraint list.
    fn setup_selection_moves(&mut self, model: &Model, variables: Vec<VariableID>) {
        self.selection_moves = variables
            .iter()
            .map(|&variable| {
                let related = model
                    .variable(variable)
                    .selection()
                    .map(|selection| model.selection(selection).related_constraints.clone())
                    .unwrap_or_default();
                Move {
                    alterations: Vec::new(),
                    sense: MoveSense::Selection,
                    related_constraints: related,
                }
            })
            .collect();
        self.selection_move_flags = vec![0; variables.len()];
        self.selection_variables = variables;
    }

    // ------------------------------------------------------------------
    // Per-iteration refresh, screening, gathering
    // ------------------------------------------------------------------

    /// Refresh template alterations, screen for admissibility, and gather
    /// the admitted references. Refresh and screening run through the
    /// parallel-for abstraction when `in_parallel` is set.
    pub fn update_moves(
        &mut self,
        variables: &[Variable],
        selections: &[Selection],
        improvability_screening_mode: ImprovabilityScreeningMode,
        in_parallel: bool,
    ) {
        let screening = improvability_screening_mode == ImprovabilityScreeningMode::On;

        self.refresh_moves(variables, selections, in_parallel);
        self.screen_moves(variables, screening, in_parallel);
        self.gather_candidate_moves();
    }

    fn refresh_moves(&mut self, variables: &[Variable], selections: &[Selection], in_parallel: bool) {
        if self.is_enabled(MovePool::Binary) {
            let ids = &self.binary_variables;
            parallel::for_each_mut(&mut self.binary_moves, in_parallel, |index, mv| {
                let variable = ids[index];
                mv.alterations.clear();
                mv.alterations.push(Alteration {
                    variable,
                    target: 1 - variables[*variable].value(),
                });
            });
        }

        if self.is_enabled(MovePool::Integer) {
            let ids = &self.integer_variables;
            parallel::for_each_mut(&mut self.integer_moves, in_parallel, |index, mv| {
                let variable = ids[index / 2];
                let delta = if index % 2 == 0 { 1 } else { -1 };
                mv.alterations.clear();
                mv.alterations.push(Alteration {
                    variable,
                    target: variables[*variable].value() + delta,
                });
            });
        }

        if self.is_enabled(MovePool::Precedence) {
            let rows = &self.precedence_rows;
            parallel::for_each_mut(&mut self.precedence_moves, in_parallel, |index, mv| {
                let row = &rows[index / 2];
                let delta = if index % 2 == 0 { 1 } else { -1 };
                mv.alterations.clear();
                for &variable in &row.variables {
                    mv.alterations.push(Alteration {
                        variable,
                        target: variables[*variable].value() + delta,
                    });
                }
            });
        }

        if self.is_enabled(MovePool::Aggregation) {
            let rows = &self.aggregation_rows;
            parallel::for_each_mut(&mut self.aggregation_moves, in_parallel, |index, mv| {
                let row = &rows[index / 4];
                let j = (index % 4) / 2;
                let delta = if index % 2 == 0 { 1 } else { -1 };

                let driver = row.variables[j];
                let partner = row.variables[1 - j];
                let driver_target = variables[*driver].value() + delta;
                let forced = (-row.constant - row.coefficients[j] * driver_target as f64)
                    / row.coefficients[1 - j];

                mv.alterations.clear();
                mv.alterations.push(Alteration {
                    variable: driver,
                    target: driver_target,
                });
                mv.alterations.push(Alteration {
                    variable: partner,
                    target: forced as i64,
                });
            });
        }

        if self.is_enabled(MovePool::VariableBound) {
            let rows = &self.variable_bound_rows;
            parallel::for_each_mut(&mut self.variable_bound_moves, in_parallel, |index, mv| {
                let row = &rows[index / 4];
                let j = (index % 4) / 2;
                let delta = if index % 2 == 0 { 1 } else { -1 };

                let driver = row.variables[j];
                let partner = row.variables[1 - j];
                let partner_value = variables[*partner].value();
                let driver_target = variables[*driver].value() + delta;
                let target_temp = (-row.constant - row.coefficients[j] * driver_target as f64)
                    / row.coefficients[1 - j];

                let partner_coefficient = row.coefficients[1 - j];
                let target = if (partner_coefficient > 0.0 && row.sense == ConstraintSense::Less)
                    || (partner_coefficient < 0.0 && row.sense == ConstraintSense::Greater)
                {
                    partner_value.min(target_temp.floor() as i64)
                } else {
                    partner_value.max(target_temp.ceil() as i64)
                };

                mv.alterations.clear();
                mv.alterations.push(Alteration {
                    variable: driver,
                    target: driver_target,
                });
                mv.alterations.push(Alteration {
                    variable: partner,
                    target,
                });
            });
        }

        // Exclusive templates are static and need no refresh.

        if self.is_enabled(MovePool::UserDefined) {
            if let Some(updater) = &self.user_defined_move_updater {
                updater(&mut self.user_defined_moves);
                self.user_defined_move_flags.resize(self.user_defined_moves.len(), 0);
            }
        }

        if self.is_enabled(MovePool::Selection) {
            let ids = &self.selection_variables;
            parallel::for_each_mut(&mut self.selection_moves, in_parallel, |index, mv| {
                let variable = ids[index];
                let selected = variables[*variable]
                    .selection()
                    .and_then(|selection| selections[*selection].selected_variable)
                    .unwrap_or(variable);
                mv.alterations.clear();
                mv.alterations.push(Alteration {
                    variable: selected,
                    target: 0,
                });
                mv.alterations.push(Alteration {
                    variable,
                    target: 1,
                });
            });
        }
    }

    fn screen_moves(&mut self, variables: &[Variable], screening: bool, in_parallel: bool) {
        let has_fixed = self.has_fixed_variables;
        let has_selection = self.has_selection_variables;

        let base_screen = |mv: &Move| -> bool {
            if has_fixed && has_fixed_variable(mv, variables) {
                return false;
            }
            if has_selection && has_selection_variable(mv, variables) {
                return false;
            }
            if screening && !has_improvable_variable(mv, variables) {
                return false;
            }
            true
        };

        if self.is_enabled(MovePool::Binary) {
            let moves = &self.binary_moves;
            parallel::for_each_mut(&mut self.binary_move_flags, in_parallel, |index, flag| {
                // Flips are in-bounds by construction.
                *flag = base_screen(&moves[index]) as u8;
            });
        }

        for (pool, moves, flags) in [
            (
                MovePool::Integer,
                &self.integer_moves,
                &mut self.integer_move_flags,
            ),
            (
                MovePool::Precedence,
                &self.precedence_moves,
                &mut self.precedence_move_flags,
            ),
            (
                MovePool::Aggregation,
                &self.aggregation_moves,
                &mut self.aggregation_move_flags,
            ),
            (
                MovePool::VariableBound,
                &self.variable_bound_moves,
                &mut self.variable_bound_move_flags,
            ),
            (
                MovePool::UserDefined,
                &self.user_defined_moves,
                &mut self.user_defined_move_flags,
            ),
        ] {
            if !self.enabled.get(&pool).copied().unwrap_or(false) {
                continue;
            }
            parallel::for_each_mut(flags, in_parallel, |index, flag| {
                let mv = &moves[index];
                *flag = (base_screen(mv) && !has_bound_violation(mv, variables)) as u8;
            });
        }

        if self.is_enabled(MovePool::Exclusive) {
            let moves = &self.exclusive_moves;
            let screen = |mv: &Move| -> bool {
                if has_fixed && has_fixed_variable(mv, variables) {
                    return false;
                }
                if has_selection && has_selection_variable(mv, variables) {
                    return false;
                }
                // Setting an already-set variable is a no-op.
                if variables[*mv.alterations[0].variable].value() == 1 {
                    return false;
                }
                if screening && !has_improvable_variable(mv, variables) {
                    return false;
                }
                true
            };
            parallel::for_each_mut(&mut self.exclusive_move_flags, in_parallel, |index, flag| {
                *flag = screen(&moves[index]) as u8;
            });
        }

        if self.is_enabled(MovePool::Selection) {
            let moves = &self.selection_moves;
            parallel::for_each_mut(&mut self.selection_move_flags, in_parallel, |index, flag| {
                let mv = &moves[index];
                let mut admitted = true;
                if has_fixed && has_fixed_variable(mv, variables) {
                    admitted = false;
                }
                if mv.alterations[0].variable == mv.alterations[1].variable {
                    admitted = false;
                }
                if screening && !has_improvable_variable(mv, variables) {
                    admitted = false;
                }
                *flag = admitted as u8;
            });
        }
    }

    fn gather_candidate_moves(&mut self) {
        let Self {
            candidate_moves,
            enabled,
            binary_move_flags,
            integer_move_flags,
            precedence_move_flags,
            aggregation_move_flags,
            variable_bound_move_flags,
            exclusive_move_flags,
            user_defined_move_flags,
            selection_move_flags,
            ..
        } = self;

        candidate_moves.clear();
        for pool in MOVE_POOLS {
            if !enabled.get(&pool).copied().unwrap_or(false) {
                continue;
            }
            let flags: &[u8] = match pool {
                MovePool::Binary => binary_move_flags,
                MovePool::Integer => integer_move_flags,
                MovePool::Precedence => precedence_move_flags,
                MovePool::Aggregation => aggregation_move_flags,
                MovePool::VariableBound => variable_bound_move_flags,
                MovePool::Exclusive => exclusive_move_flags,
                MovePool::UserDefined => user_defined_move_flags,
                MovePool::Selection => selection_move_flags,
            };
            for (index, &flag) in flags.iter().enumerate() {
                if flag > 0 {
                    candidate_moves.push((pool, index));
                }
            }
        }
    }

    pub fn move_of(&self, reference: MoveRef) -> &Move {
        let (pool, index) = reference;
        match pool {
            MovePool::Binary => &self.binary_moves[index],
            MovePool::Integer => &self.integer_moves[index],
            MovePool::Precedence => &self.precedence_moves[index],
            MovePool::Aggregation => &self.aggregation_moves[index],
            MovePool::VariableBound => &self.variable_bound_moves[index],
            MovePool::Exclusive => &self.exclusive_moves[index],
            MovePool::UserDefined => &self.user_defined_moves[index],
            MovePool::Selection => &self.selection_moves[index],
        }
    }

    /// Admitted moves in gathering order (insertion order unless shuffled).
    pub fn candidate_moves(&self) -> &[MoveRef] {
        &self.candidate_moves
    }

    pub fn shuffle_moves<R: Rng>(&mut self, rng: &mut R) {
        self.candidate_moves.shuffle(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expression, SelectionMode};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn flip_targets(neighborhood: &Neighborhood) -> Vec<(VariableID, i64)> {
        neighborhood
            .candidate_moves()
            .iter()
            .map(|&r| {
                let mv = neighborhood.move_of(r);
                (mv.alterations[0].variable, mv.alterations[0].target)
            })
            .collect()
    }

    #[test]
    fn test_binary_flip_pool() {
        let mut model = Model::new("flips");
        let a = model.create_binary_variable("a").unwrap();
        let b = model.create_binary_variable("b").unwrap();
        let mut e = Expression::new();
        e.add_term(a, 1.0);
        e.add_term(b, 1.0);
        e.add_constant(-1.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        let mut objective = Expression::new();
        objective.add_term(a, 1.0);
        model.minimize(objective);
        model.setup();
        model.variables[*b].set_value_force(1);
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        let targets = flip_targets(&neighborhood);
        assert!(targets.contains(&(a, 1)));
        assert!(targets.contains(&(b, 0)));
    }

    #[test]
    fn test_fixed_variable_is_screened_out() {
        let mut model = Model::new("fixed");
        let a = model.create_binary_variable("a").unwrap();
        let b = model.create_binary_variable("b").unwrap();
        let mut e = Expression::new();
        e.add_term(a, 1.0);
        e.add_term(b, 1.0);
        e.add_constant(-1.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();
        model.variables[*a].fix_by(1);
        model.categorize_variables();
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        // a's flip template exists but never reaches the candidate list.
        let targets = flip_targets(&neighborhood);
        assert!(targets.iter().all(|&(variable, _)| variable != a));
    }

    #[test]
    fn test_integer_shift_respects_bounds() {
        let mut model = Model::new("shift");
        let x = model.create_variable("x", 0, 2).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 1.0);
        e.add_constant(-1.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        // x = 0: only the +1 shift survives the bound screen.
        let targets = flip_targets(&neighborhood);
        assert_eq!(targets, vec![(x, 1)]);
    }

    #[test]
    fn test_selection_swap_moves() {
        let mut model = Model::new("selection");
        let variables: Vec<VariableID> = (0..3)
            .map(|i| model.create_binary_variable(format!("x[{i}]")).unwrap())
            .collect();
        let mut e = Expression::new();
        for &v in &variables {
            e.add_term(v, 1.0);
        }
        e.add_constant(-1.0);
        model.create_constraint("partition", e, ConstraintSense::Equal);
        model.setup();

        crate::preprocess::SelectionExtractor::new(&mut model).extract(SelectionMode::Defined);
        model.setup();
        model.variables[*variables[0]].set_value_force(1);
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        // Swaps to the two unselected members; the self-swap is rejected.
        assert_eq!(neighborhood.candidate_moves().len(), 2);
        for &reference in neighborhood.candidate_moves() {
            let mv = neighborhood.move_of(reference);
            assert_eq!(mv.sense, MoveSense::Selection);
            assert_eq!(mv.alterations[0].variable, variables[0]);
            assert_eq!(mv.alterations[0].target, 0);
            assert_eq!(mv.alterations[1].target, 1);
        }
    }

    #[test]
    fn test_improvability_screening() {
        let mut model = Model::new("screening");
        model.create_binary_variable("a").unwrap();
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 1.0);
        e.add_constant(-1.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);

        // No variable is flagged improvable: the screen rejects everything.
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::On,
            false,
        );
        assert!(neighborhood.candidate_moves().is_empty());

        model.variables[0].set_is_objective_improvable(true);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::On,
            false,
        );
        assert_eq!(neighborhood.candidate_moves().len(), 1);
    }

    #[test]
    fn test_aggregation_moves_force_partner() {
        // 2x + 3y - 12 = 0, a genuine aggregation (mixed coefficients).
        let mut model = Model::new("aggregation");
        let x = model.create_variable("x", 0, 10).unwrap();
        let y = model.create_variable("y", 0, 10).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 2.0);
        e.add_term(y, 3.0);
        e.add_constant(-12.0);
        model.create_constraint("agg", e, ConstraintSense::Equal);
        model.setup();
        model.variables[*x].set_value_force(3);
        model.variables[*y].set_value_force(2);
        model.update();

        assert_eq!(
            model.constraint(ConstraintID::from(0usize)).constraint_type(),
            ConstraintType::Aggregation
        );

        let mut options = Options::default();
        options.neighborhood.is_enabled_aggregation_move = true;
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        // Each admitted template shifts one variable by one and derives the
        // partner value from the equation.
        let coefficient_of = |variable: VariableID| -> f64 {
            model.constraint(ConstraintID::from(0usize)).expression().sensitivities()[&variable]
        };
        let aggregation_moves: Vec<&Move> = neighborhood
            .candidate_moves()
            .iter()
            .filter(|(pool, _)| *pool == MovePool::Aggregation)
            .map(|&r| neighborhood.move_of(r))
            .collect();
        assert!(!aggregation_moves.is_empty());
        for mv in aggregation_moves {
            let driver = &mv.alterations[0];
            let partner = &mv.alterations[1];
            let delta = driver.target - model.variable(driver.variable).value();
            assert_eq!(delta.abs(), 1);

            let forced = (12.0 - coefficient_of(driver.variable) * driver.target as f64)
                / coefficient_of(partner.variable);
            assert_eq!(partner.target, forced as i64);
        }
    }

    #[test]
    fn test_user_defined_moves_and_exclusive_compatibility() {
        let mut model = Model::new("user");
        let x = model.create_variable("x", 0, 9).unwrap();
        let mut e = Expression::new();
        e.add_term(x, 1.0);
        e.add_constant(-5.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.set_user_defined_move_updater(Box::new(move |moves| {
            moves.clear();
            moves.push(Move {
                alterations: vec![Alteration {
                    variable: x,
                    target: 5,
                }],
                sense: MoveSense::UserDefined,
                related_constraints: vec![ConstraintID::from(0usize)],
            });
        }));
        neighborhood.disable_default_moves();
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        assert_eq!(neighborhood.candidate_moves().len(), 1);
        let (pool, _) = neighborhood.candidate_moves()[0];
        assert_eq!(pool, MovePool::UserDefined);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut model = Model::new("shuffle");
        for i in 0..20 {
            model.create_binary_variable(format!("x[{i}]")).unwrap();
        }
        let mut e = Expression::new();
        for i in 0..20 {
            e.add_term(VariableID::from(i), 1.0);
        }
        e.add_constant(-10.0);
        model.create_constraint("c", e, ConstraintSense::Less);
        model.setup();
        model.update();

        let options = Options::default();
        let mut neighborhood = Neighborhood::new();
        neighborhood.setup(&model, &options);
        neighborhood.update_moves(
            model.variables(),
            model.selections(),
            ImprovabilityScreeningMode::Off,
            false,
        );

        let mut before: Vec<MoveRef> = neighborhood.candidate_moves().to_vec();
        let mut rng = SmallRng::seed_from_u64(7);
        neighborhood.shuffle_moves(&mut rng);
        let mut after: Vec<MoveRef> = neighborhood.candidate_moves().to_vec();

        before.sort_by_key(|&(_, index)| index);
        after.sort_by_key(|&(_, index)| index);
        assert_eq!(before, after);
    }
}
