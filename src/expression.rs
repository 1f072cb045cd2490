use crate::{
    atol::COEFFICIENT_EPSILON, FixedSizeHashMap, Move, Variable, VariableID,
};
use derive_more::{Deref, From};
use fnv::FnvHashMap;

/// Index of a dependent-variable defining expression in the model arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct ExpressionID(usize);

impl ExpressionID {
    pub fn into_inner(&self) -> usize {
        self.0
    }
}

impl std::fmt::Debug for ExpressionID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExpressionID({})", self.0)
    }
}

impl std::fmt::Display for ExpressionID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Sparse linear form `sum a_i x_i + c` with caches for incremental
/// re-evaluation under a move.
///
/// Invariants
/// ----------
/// - Coefficients below `COEFFICIENT_EPSILON` in magnitude are purged after
///   substitution.
/// - After `setup_fixed_sensitivities`, the open-addressed mirror agrees
///   with `sensitivities` on every key.
/// - After `setup_mutable_variable_sensitivities`, the two sign-partitioned
///   sub-maps together cover exactly the non-fixed entries.
#[derive(Debug, Clone, Default)]
pub struct Expression {
    pub(crate) name: String,
    sensitivities: FnvHashMap<VariableID, f64>,
    constant_value: f64,
    value: f64,

    mutable_variable_sensitivities: FnvHashMap<VariableID, f64>,
    positive_coefficient_mutable_variable_sensitivities: FnvHashMap<VariableID, f64>,
    negative_coefficient_mutable_variable_sensitivities: FnvHashMap<VariableID, f64>,

    fixed_sensitivities: FixedSizeHashMap,
    hash: u64,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensitivities(
        sensitivities: FnvHashMap<VariableID, f64>,
        constant_value: f64,
    ) -> Self {
        Self {
            sensitivities,
            constant_value,
            ..Self::default()
        }
    }

    /// The expression `x` for a single variable.
    pub fn variable(variable: VariableID) -> Self {
        let mut sensitivities = FnvHashMap::default();
        sensitivities.insert(variable, 1.0);
        Self::with_sensitivities(sensitivities, 0.0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn sensitivities(&self) -> &FnvHashMap<VariableID, f64> {
        &self.sensitivities
    }

    pub fn constant_value(&self) -> f64 {
        self.constant_value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn add_term(&mut self, variable: VariableID, coefficient: f64) {
        *self.sensitivities.entry(variable).or_insert(0.0) += coefficient;
    }

    pub fn add_constant(&mut self, constant: f64) {
        self.constant_value += constant;
    }

    pub fn erase(&mut self, variable: VariableID) {
        self.sensitivities.remove(&variable);
    }

    /// Full recomputation from the live variable values.
    pub fn evaluate(&self, variables: &[Variable]) -> f64 {
        let mut value = self.constant_value;
        for (&variable, &coefficient) in &self.sensitivities {
            value += variables[*variable].value() as f64 * coefficient;
        }
        value
    }

    /// Incremental evaluation under a proposed move. Requires
    /// `setup_fixed_sensitivities` to have been called; the coefficient
    /// lookup goes through the open-addressed mirror.
    #[inline]
    pub fn evaluate_move(&self, mv: &Move, variables: &[Variable]) -> f64 {
        let mut new_value = self.value;
        for alteration in &mv.alterations {
            new_value += self.fixed_sensitivities.at(alteration.variable)
                * (alteration.target - variables[*alteration.variable].value()) as f64;
        }
        new_value
    }

    pub fn update(&mut self, variables: &[Variable]) {
        self.value = self.evaluate(variables);
    }

    pub fn update_move(&mut self, mv: &Move, variables: &[Variable]) {
        self.value = self.evaluate_move(mv, variables);
    }

    /// Partition the non-fixed entries by coefficient sign.
    pub fn setup_mutable_variable_sensitivities(&mut self, variables: &[Variable]) {
        self.mutable_variable_sensitivities.clear();
        self.positive_coefficient_mutable_variable_sensitivities.clear();
        self.negative_coefficient_mutable_variable_sensitivities.clear();

        for (&variable, &coefficient) in &self.sensitivities {
            if variables[*variable].is_fixed() {
                continue;
            }
            if coefficient > 0.0 {
                self.positive_coefficient_mutable_variable_sensitivities
                    .insert(variable, coefficient);
            } else {
                self.negative_coefficient_mutable_variable_sensitivities
                    .insert(variable, coefficient);
            }
            self.mutable_variable_sensitivities.insert(variable, coefficient);
        }
    }

    /// Rebuild the open-addressed mirror used on the move-evaluation path.
    pub fn setup_fixed_sensitivities(&mut self) {
        self.fixed_sensitivities.setup(&self.sensitivities);
    }

    /// Identity hash over the variable set, for duplicate detection.
    pub fn setup_hash(&mut self) {
        let mut hash: u64 = 0;
        for &variable in self.sensitivities.keys() {
            hash = hash.wrapping_add((*variable as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        }
        self.hash = hash;
    }

    pub fn mutable_variable_sensitivities(&self) -> &FnvHashMap<VariableID, f64> {
        &self.mutable_variable_sensitivities
    }

    pub fn positive_coefficient_mutable_variable_sensitivities(
        &self,
    ) -> &FnvHashMap<VariableID, f64> {
        &self.positive_coefficient_mutable_variable_sensitivities
    }

    pub fn negative_coefficient_mutable_variable_sensitivities(
        &self,
    ) -> &FnvHashMap<VariableID, f64> {
        &self.negative_coefficient_mutable_variable_sensitivities
    }

    /// Lower bound of the expression value over the variable boxes, with
    /// fixed variables pinned at their values.
    pub fn lower_bound(&self, variables: &[Variable]) -> f64 {
        let mut lower_bound = self.constant_value;
        for (&variable, &coefficient) in &self.sensitivities {
            let v = &variables[*variable];
            let value = if v.is_fixed() {
                v.value()
            } else if coefficient > 0.0 {
                v.lower_bound()
            } else {
                v.upper_bound()
            };
            lower_bound += coefficient * value as f64;
        }
        lower_bound
    }

    pub fn upper_bound(&self, variables: &[Variable]) -> f64 {
        let mut upper_bound = self.constant_value;
        for (&variable, &coefficient) in &self.sensitivities {
            let v = &variables[*variable];
            let value = if v.is_fixed() {
                v.value()
            } else if coefficient > 0.0 {
                v.upper_bound()
            } else {
                v.lower_bound()
            };
            upper_bound += coefficient * value as f64;
        }
        upper_bound
    }

    pub fn range(&self, variables: &[Variable]) -> f64 {
        self.upper_bound(variables) - self.lower_bound(variables)
    }

    /// Contribution of the fixed variables.
    pub fn fixed_term_value(&self, variables: &[Variable]) -> f64 {
        let mut fixed_term_value = 0.0;
        for (&variable, &coefficient) in &self.sensitivities {
            if variables[*variable].is_fixed() {
                fixed_term_value += coefficient * variables[*variable].value() as f64;
            }
        }
        fixed_term_value
    }

    pub fn number_of_mutable_variables(&self, variables: &[Variable]) -> usize {
        self.sensitivities
            .keys()
            .filter(|&&variable| !variables[*variable].is_fixed())
            .count()
    }

    /// Solve `self = 0` for `variable`: a new expression representing
    /// `-(sum_{i != k} a_i x_i + c) / a_k`.
    pub fn solve(&self, variable: VariableID) -> Expression {
        let coefficient_reciprocal = 1.0 / self.sensitivities[&variable];
        let mut result = self.clone_terms();
        result.erase(variable);
        for coefficient in result.sensitivities.values_mut() {
            *coefficient *= -coefficient_reciprocal;
        }
        result.constant_value *= -coefficient_reciprocal;
        result
    }

    /// Replace `variable` by the given defining expression, purging
    /// near-zero coefficients afterwards.
    pub fn substitute(&mut self, variable: VariableID, expression: &Expression) {
        let Some(coefficient) = self.sensitivities.remove(&variable) else {
            return;
        };
        for (&v, &c) in &expression.sensitivities {
            *self.sensitivities.entry(v).or_insert(0.0) += coefficient * c;
        }
        self.constant_value += coefficient * expression.constant_value;
        self.sensitivities
            .retain(|_, c| c.abs() >= COEFFICIENT_EPSILON);
    }

    /// Structural equality modulo coefficient order, short-circuiting on
    /// unequal hashes and unequal sizes.
    pub fn equal(&self, other: &Expression) -> bool {
        if self.hash > 0 && other.hash > 0 && self.hash != other.hash {
            return false;
        }
        if self.sensitivities.len() != other.sensitivities.len() {
            return false;
        }
        if self.constant_value != other.constant_value {
            return false;
        }
        self.sensitivities == other.sensitivities
    }

    /// A fresh expression carrying only the sparse map and constant, with
    /// all caches reset.
    pub fn clone_terms(&self) -> Expression {
        Expression::with_sensitivities(self.sensitivities.clone(), self.constant_value)
    }

    pub fn negated(&self) -> Expression {
        let mut result = self.clone_terms();
        for coefficient in result.sensitivities.values_mut() {
            *coefficient = -*coefficient;
        }
        result.constant_value = -result.constant_value;
        result
    }
}

impl std::ops::AddAssign<&Expression> for Expression {
    fn add_assign(&mut self, rhs: &Expression) {
        for (&variable, &coefficient) in &rhs.sensitivities {
            *self.sensitivities.entry(variable).or_insert(0.0) += coefficient;
        }
        self.constant_value += rhs.constant_value;
    }
}

impl std::ops::SubAssign<&Expression> for Expression {
    fn sub_assign(&mut self, rhs: &Expression) {
        for (&variable, &coefficient) in &rhs.sensitivities {
            *self.sensitivities.entry(variable).or_insert(0.0) -= coefficient;
        }
        self.constant_value -= rhs.constant_value;
    }
}

impl std::ops::MulAssign<f64> for Expression {
    fn mul_assign(&mut self, rhs: f64) {
        for coefficient in self.sensitivities.values_mut() {
            *coefficient *= rhs;
        }
        self.constant_value *= rhs;
    }
}

impl std::ops::DivAssign<f64> for Expression {
    fn div_assign(&mut self, rhs: f64) {
        for coefficient in self.sensitivities.values_mut() {
            *coefficient /= rhs;
        }
        self.constant_value /= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alteration, MoveSense};

    fn variables(bounds: &[(i64, i64, i64)]) -> Vec<Variable> {
        bounds
            .iter()
            .enumerate()
            .map(|(i, &(value, lower, upper))| {
                let mut v = Variable::new(VariableID::from(i), format!("x[{i}]"));
                v.set_bound(lower, upper).unwrap();
                v.set_value(value).unwrap();
                v
            })
            .collect()
    }

    fn shift_move(alterations: Vec<(usize, i64)>) -> Move {
        Move {
            alterations: alterations
                .into_iter()
                .map(|(variable, target)| Alteration {
                    variable: VariableID::from(variable),
                    target,
                })
                .collect(),
            sense: MoveSense::UserDefined,
            related_constraints: Vec::new(),
        }
    }

    #[test]
    fn test_evaluate() {
        // 2x - y + 3 with x = 1, y = 2
        let variables = variables(&[(1, 0, 10), (2, 0, 10)]);
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 2.0);
        e.add_term(VariableID::from(1usize), -1.0);
        e.add_constant(3.0);
        assert_eq!(e.evaluate(&variables), 3.0);
    }

    #[test]
    fn test_evaluate_move_agrees_with_full() {
        // Scenario from the delta-vs-full property: 2x - y + 3, x=1, y=2,
        // move {x <- 3, y <- 0}.
        let mut vs = variables(&[(1, 0, 10), (2, 0, 10)]);
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 2.0);
        e.add_term(VariableID::from(1usize), -1.0);
        e.add_constant(3.0);
        e.setup_fixed_sensitivities();
        e.update(&vs);

        let mv = shift_move(vec![(0, 3), (1, 0)]);
        let fast = e.evaluate_move(&mv, &vs);
        assert_eq!(fast, 9.0);

        vs[0].set_value(3).unwrap();
        vs[1].set_value(0).unwrap();
        assert_eq!(e.evaluate(&vs), fast);
    }

    #[test]
    fn test_bounds() {
        // x - 2y + 1 with x in [0, 3], y in [1, 2]
        let vs = variables(&[(0, 0, 3), (1, 1, 2)]);
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 1.0);
        e.add_term(VariableID::from(1usize), -2.0);
        e.add_constant(1.0);
        assert_eq!(e.lower_bound(&vs), 0.0 - 4.0 + 1.0);
        assert_eq!(e.upper_bound(&vs), 3.0 - 2.0 + 1.0);
    }

    #[test]
    fn test_bounds_with_fixed_variable() {
        let mut vs = variables(&[(0, 0, 3), (1, 1, 2)]);
        vs[1].fix_by(2);
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 1.0);
        e.add_term(VariableID::from(1usize), -2.0);
        assert_eq!(e.lower_bound(&vs), -4.0);
        assert_eq!(e.upper_bound(&vs), -1.0);
        assert_eq!(e.fixed_term_value(&vs), -4.0);
        assert_eq!(e.number_of_mutable_variables(&vs), 1);
    }

    #[test]
    fn test_solve() {
        // 2x + 4y - 6 = 0 solved for x gives x = -2y + 3
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 2.0);
        e.add_term(VariableID::from(1usize), 4.0);
        e.add_constant(-6.0);

        let solved = e.solve(VariableID::from(0usize));
        assert_eq!(solved.sensitivities()[&VariableID::from(1usize)], -2.0);
        assert!(!solved.sensitivities().contains_key(&VariableID::from(0usize)));
        assert_eq!(solved.constant_value(), 3.0);
    }

    #[test]
    fn test_substitute_purges_cancelled_terms() {
        // x + y, substitute x = -y + 1: the y terms cancel.
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 1.0);
        e.add_term(VariableID::from(1usize), 1.0);

        let mut defining = Expression::new();
        defining.add_term(VariableID::from(1usize), -1.0);
        defining.add_constant(1.0);

        e.substitute(VariableID::from(0usize), &defining);
        assert!(e.sensitivities().is_empty());
        assert_eq!(e.constant_value(), 1.0);
    }

    #[test]
    fn test_equal() {
        let mut a = Expression::new();
        a.add_term(VariableID::from(0usize), 1.0);
        a.add_term(VariableID::from(1usize), 2.0);
        a.add_constant(-1.0);

        let mut b = a.clone_terms();
        a.setup_hash();
        b.setup_hash();
        assert!(a.equal(&b));

        b.add_constant(1.0);
        assert!(!a.equal(&b));

        let mut c = Expression::new();
        c.add_term(VariableID::from(2usize), 1.0);
        c.add_term(VariableID::from(1usize), 2.0);
        c.add_constant(-1.0);
        c.setup_hash();
        assert!(!a.equal(&c));
    }

    #[test]
    fn test_mutable_sensitivity_partition() {
        let mut vs = variables(&[(0, 0, 1), (0, 0, 1), (0, 0, 1)]);
        vs[2].fix_by(0);
        let mut e = Expression::new();
        e.add_term(VariableID::from(0usize), 1.5);
        e.add_term(VariableID::from(1usize), -0.5);
        e.add_term(VariableID::from(2usize), 2.0);
        e.setup_mutable_variable_sensitivities(&vs);

        assert_eq!(e.mutable_variable_sensitivities().len(), 2);
        assert_eq!(
            e.positive_coefficient_mutable_variable_sensitivities().len(),
            1
        );
        assert_eq!(
            e.negative_coefficient_mutable_variable_sensitivities().len(),
            1
        );
    }
}
