use crate::{
    Constraint, ConstraintSense, ConstraintType, Variable, VariableID, VariableSense,
    DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND,
};

fn is_integer(value: f64) -> bool {
    (value - value.round()).abs() < 1e-9
}

/// Digest of a constraint expression over the mutable variables, computed
/// once per classification.
#[derive(Debug, Default)]
pub struct ExpressionStructure {
    pub number_of_variables: usize,
    pub constant_value: f64,

    pub is_integer: bool,
    pub has_only_binary_coefficient: bool,
    pub has_only_binary_or_selection_variable: bool,
    pub has_only_integer_variables: bool,
    pub has_only_plus_or_minus_one_coefficient: bool,
    pub has_bin_packing_variable: bool,

    pub max_abs_coefficient: f64,

    pub plus_one_coefficient_variables: Vec<VariableID>,
    pub minus_one_coefficient_variables: Vec<VariableID>,
    pub plus_one_coefficient_integer_variables: Vec<VariableID>,
    pub minus_one_coefficient_integer_variables: Vec<VariableID>,
    pub plus_n_minus_one_coefficient_integer_variables: Vec<VariableID>,
    pub minus_n_minus_one_coefficient_integer_variables: Vec<VariableID>,
    pub positive_coefficient_variables: Vec<VariableID>,
    pub negative_coefficient_variables: Vec<VariableID>,

    pub variables: Vec<VariableID>,
    pub coefficients: Vec<f64>,
}

impl ExpressionStructure {
    /// Fixed variables fold into the constant; every list covers mutable
    /// variables only.
    pub fn of(constraint: &Constraint, variables: &[Variable]) -> Self {
        let expression = constraint.expression();
        let mut structure = ExpressionStructure {
            constant_value: expression.constant_value(),
            is_integer: true,
            has_only_binary_coefficient: true,
            has_only_binary_or_selection_variable: true,
            has_only_integer_variables: true,
            has_only_plus_or_minus_one_coefficient: true,
            ..Default::default()
        };

        for (&variable, &coefficient) in expression.sensitivities() {
            if variables[*variable].is_fixed() {
                structure.constant_value += coefficient * variables[*variable].value() as f64;
            } else {
                structure.number_of_variables += 1;
            }
        }

        if !is_integer(structure.constant_value) {
            structure.is_integer = false;
        }

        let n = structure.number_of_variables;
        structure.variables.reserve(n);
        structure.coefficients.reserve(n);

        for (&variable, &coefficient) in expression.sensitivities() {
            let v = &variables[*variable];
            if v.is_fixed() {
                continue;
            }

            if !is_integer(coefficient) {
                structure.is_integer = false;
            }
            if coefficient != 1.0 {
                structure.has_only_binary_coefficient = false;
            }
            if !matches!(v.sense(), VariableSense::Binary | VariableSense::Selection) {
                structure.has_only_binary_or_selection_variable = false;
            }
            if v.sense() != VariableSense::Integer {
                structure.has_only_integer_variables = false;
            }
            if coefficient.abs() != 1.0 {
                structure.has_only_plus_or_minus_one_coefficient = false;
            }
            if coefficient == -structure.constant_value {
                structure.has_bin_packing_variable = true;
            }
            structure.max_abs_coefficient = structure.max_abs_coefficient.max(coefficient.abs());

            if coefficient == 1.0 {
                structure.plus_one_coefficient_variables.push(variable);
                if v.sense() == VariableSense::Integer {
                    structure.plus_one_coefficient_integer_variables.push(variable);
                }
            } else if coefficient == -1.0 {
                structure.minus_one_coefficient_variables.push(variable);
                if v.sense() == VariableSense::Integer {
                    structure.minus_one_coefficient_integer_variables.push(variable);
                }
            }

            if coefficient == (n as f64) - 1.0 {
                structure
                    .plus_n_minus_one_coefficient_integer_variables
                    .push(variable);
            } else if coefficient == -((n as f64) - 1.0) {
                structure
                    .minus_n_minus_one_coefficient_integer_variables
                    .push(variable);
            }

            if coefficient > 0.0 {
                structure.positive_coefficient_variables.push(variable);
            } else if coefficient < 0.0 {
                structure.negative_coefficient_variables.push(variable);
            }

            structure.variables.push(variable);
            structure.coefficients.push(coefficient);
        }

        structure
    }
}

/// Maps a constraint to its structural category; the predicates run in a
/// fixed order and the first match wins. Classification is a pure function
/// of the coefficient multiset, the variable senses, the folded constant and
/// the constraint sense.
pub struct ConstraintTypeClassifier<'a> {
    constraint: &'a Constraint,
    structure: ExpressionStructure,
    sense: ConstraintSense,
    variables: &'a [Variable],
}

type Classification = (ConstraintType, Option<VariableID>);

impl<'a> ConstraintTypeClassifier<'a> {
    pub fn new(constraint: &'a Constraint, variables: &'a [Variable]) -> Self {
        Self {
            constraint,
            structure: ExpressionStructure::of(constraint, variables),
            sense: constraint.sense(),
            variables,
        }
    }

    pub fn structure(&self) -> &ExpressionStructure {
        &self.structure
    }

    pub fn classify(&self) -> Classification {
        let checks: [fn(&Self) -> Option<Classification>; 32] = [
            Self::check_empty,
            Self::check_singleton,
            Self::check_exclusive_or,
            Self::check_exclusive_nor,
            Self::check_inverted_integers,
            Self::check_balanced_integers,
            Self::check_constant_sum_integers,
            Self::check_constant_difference_integers,
            Self::check_constant_ratio_integers,
            Self::check_intermediate_two_term,
            Self::check_aggregation,
            Self::check_precedence,
            Self::check_variable_bound,
            Self::check_trinomial_exclusive_nor,
            Self::check_all_or_nothing,
            Self::check_set_partitioning,
            Self::check_set_packing,
            Self::check_set_covering,
            Self::check_cardinality,
            Self::check_invariant_knapsack,
            Self::check_multiple_covering,
            Self::check_soft_selection,
            Self::check_binary_flow,
            Self::check_integer_flow,
            Self::check_min_max,
            Self::check_max_min,
            Self::check_intermediate_multi_term,
            Self::check_equation_knapsack,
            Self::check_bin_packing,
            Self::check_knapsack,
            Self::check_integer_knapsack,
            Self::check_gf2,
        ];

        for check in checks {
            if let Some(result) = check(self) {
                return result;
            }
        }
        (ConstraintType::GeneralLinear, None)
    }

    /// Tie-break for two-variable patterns: the variable with the smaller
    /// name is the key.
    fn key_by_name(&self, first: VariableID, second: VariableID) -> VariableID {
        if self.variables[*first].name() < self.variables[*second].name() {
            first
        } else {
            second
        }
    }

    fn two_binary_terms(&self) -> Option<(VariableID, VariableID, f64, f64)> {
        if self.structure.number_of_variables != 2 {
            return None;
        }
        let (a, b) = (self.structure.variables[0], self.structure.variables[1]);
        if self.variables[*a].sense() != VariableSense::Binary
            || self.variables[*b].sense() != VariableSense::Binary
        {
            return None;
        }
        Some((a, b, self.structure.coefficients[0], self.structure.coefficients[1]))
    }

    fn two_integer_terms(&self) -> Option<(VariableID, VariableID, f64, f64)> {
        if self.structure.number_of_variables != 2 {
            return None;
        }
        let (a, b) = (self.structure.variables[0], self.structure.variables[1]);
        if self.variables[*a].sense() != VariableSense::Integer
            || self.variables[*b].sense() != VariableSense::Integer
        {
            return None;
        }
        Some((a, b, self.structure.coefficients[0], self.structure.coefficients[1]))
    }

    fn check_empty(&self) -> Option<Classification> {
        (self.structure.number_of_variables == 0).then_some((ConstraintType::Empty, None))
    }

    fn check_singleton(&self) -> Option<Classification> {
        (self.structure.number_of_variables == 1).then_some((ConstraintType::Singleton, None))
    }

    fn check_exclusive_or(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        let (a, b, ca, cb) = self.two_binary_terms()?;
        let matches = (ca == 1.0 && cb == 1.0 && self.structure.constant_value == -1.0)
            || (ca == -1.0 && cb == -1.0 && self.structure.constant_value == 1.0);
        matches.then(|| (ConstraintType::ExclusiveOr, Some(self.key_by_name(a, b))))
    }

    fn check_exclusive_nor(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        let (a, b, ca, cb) = self.two_binary_terms()?;
        let matches = self.structure.constant_value == 0.0
            && ((ca == 1.0 && cb == -1.0) || (ca == -1.0 && cb == 1.0));
        matches.then(|| (ConstraintType::ExclusiveNor, Some(self.key_by_name(a, b))))
    }

    fn check_inverted_integers(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        let (a, b, ca, cb) = self.two_integer_terms()?;
        let matches = self.structure.constant_value == 0.0
            && ((ca == 1.0 && cb == 1.0) || (ca == -1.0 && cb == -1.0));
        matches.then(|| (ConstraintType::InvertedIntegers, Some(self.key_by_name(a, b))))
    }

    fn check_balanced_integers(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        let (a, b, ca, cb) = self.two_integer_terms()?;
        let matches = self.structure.constant_value == 0.0
            && ((ca == 1.0 && cb == -1.0) || (ca == -1.0 && cb == 1.0));
        matches.then(|| (ConstraintType::BalancedIntegers, Some(self.key_by_name(a, b))))
    }

    fn check_constant_sum_integers(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        let (a, b, ca, cb) = self.two_integer_terms()?;
        let matches = self.structure.constant_value != 0.0
            && ((ca == 1.0 && cb == 1.0) || (ca == -1.0 && cb == -1.0));
        matches.then(|| (ConstraintType::ConstantSumIntegers, Some(self.key_by_name(a, b))))
    }

    fn check_constant_difference_integers(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        let (a, b, ca, cb) = self.two_integer_terms()?;
        let matches = self.structure.constant_value != 0.0
            && ((ca == 1.0 && cb == -1.0) || (ca == -1.0 && cb == 1.0));
        matches.then(|| {
            (
                ConstraintType::ConstantDifferenceIntegers,
                Some(self.key_by_name(a, b)),
            )
        })
    }

    fn check_constant_ratio_integers(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal || self.structure.constant_value != 0.0 {
            return None;
        }
        let (a, b, ca, cb) = self.two_integer_terms()?;
        if ca.abs() == 1.0 && cb.abs() != 1.0 {
            return Some((ConstraintType::ConstantRatioIntegers, Some(a)));
        }
        if ca.abs() != 1.0 && cb.abs() == 1.0 {
            return Some((ConstraintType::ConstantRatioIntegers, Some(b)));
        }
        None
    }

    fn check_intermediate_two_term(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal || !self.structure.is_integer {
            return None;
        }
        let (a, b, ca, cb) = self.two_integer_terms()?;
        if ca.abs() == 1.0 && cb.abs() != 1.0 {
            return Some((ConstraintType::Intermediate, Some(a)));
        }
        if ca.abs() != 1.0 && cb.abs() == 1.0 {
            return Some((ConstraintType::Intermediate, Some(b)));
        }
        None
    }

    fn check_aggregation(&self) -> Option<Classification> {
        (self.structure.number_of_variables == 2 && self.sense == ConstraintSense::Equal)
            .then_some((ConstraintType::Aggregation, None))
    }

    fn check_precedence(&self) -> Option<Classification> {
        if self.structure.number_of_variables != 2 || self.sense == ConstraintSense::Equal {
            return None;
        }
        let (a, b) = (self.structure.variables[0], self.structure.variables[1]);
        let matches = self.variables[*a].sense() == self.variables[*b].sense()
            && self.structure.coefficients[0] == -self.structure.coefficients[1];
        matches.then_some((ConstraintType::Precedence, None))
    }

    fn check_variable_bound(&self) -> Option<Classification> {
        (self.structure.number_of_variables == 2 && self.sense != ConstraintSense::Equal)
            .then_some((ConstraintType::VariableBound, None))
    }

    fn check_exactly_one_balancing_key(
        &self,
        constraint_type: ConstraintType,
    ) -> Option<Classification> {
        // n-1 unit terms balanced by one variable with coefficient -+(n-1);
        // the balancing variable is the key.
        if self.sense != ConstraintSense::Equal || self.structure.constant_value != 0.0 {
            return None;
        }
        if !self.structure.has_only_binary_or_selection_variable {
            return None;
        }
        let n = self.structure.number_of_variables;
        if self.structure.plus_one_coefficient_variables.len() == n - 1
            && self
                .structure
                .minus_n_minus_one_coefficient_integer_variables
                .len()
                == 1
        {
            return Some((
                constraint_type,
                Some(self.structure.minus_n_minus_one_coefficient_integer_variables[0]),
            ));
        }
        if self.structure.minus_one_coefficient_variables.len() == n - 1
            && self
                .structure
                .plus_n_minus_one_coefficient_integer_variables
                .len()
                == 1
        {
            return Some((
                constraint_type,
                Some(self.structure.plus_n_minus_one_coefficient_integer_variables[0]),
            ));
        }
        None
    }

    fn check_trinomial_exclusive_nor(&self) -> Option<Classification> {
        if self.structure.number_of_variables != 3 {
            return None;
        }
        self.check_exactly_one_balancing_key(ConstraintType::TrinomialExclusiveNor)
    }

    fn check_all_or_nothing(&self) -> Option<Classification> {
        self.check_exactly_one_balancing_key(ConstraintType::AllOrNothing)
    }

    fn check_monic_binary(
        &self,
        constant_matches: bool,
        sense: ConstraintSense,
        constraint_type: ConstraintType,
    ) -> Option<Classification> {
        let matches = self.structure.has_only_binary_coefficient
            && self.structure.has_only_binary_or_selection_variable
            && constant_matches
            && self.sense == sense;
        matches.then_some((constraint_type, None))
    }

    fn check_set_partitioning(&self) -> Option<Classification> {
        self.check_monic_binary(
            self.structure.constant_value == -1.0,
            ConstraintSense::Equal,
            ConstraintType::SetPartitioning,
        )
    }

    fn check_set_packing(&self) -> Option<Classification> {
        self.check_monic_binary(
            self.structure.constant_value == -1.0,
            ConstraintSense::Less,
            ConstraintType::SetPacking,
        )
    }

    fn check_set_covering(&self) -> Option<Classification> {
        self.check_monic_binary(
            self.structure.constant_value == -1.0,
            ConstraintSense::Greater,
            ConstraintType::SetCovering,
        )
    }

    fn check_cardinality(&self) -> Option<Classification> {
        self.check_monic_binary(
            self.structure.constant_value <= -2.0,
            ConstraintSense::Equal,
            ConstraintType::Cardinality,
        )
    }

    fn check_invariant_knapsack(&self) -> Option<Classification> {
        self.check_monic_binary(
            self.structure.constant_value <= -2.0,
            ConstraintSense::Less,
            ConstraintType::InvariantKnapsack,
        )
    }

    fn check_multiple_covering(&self) -> Option<Classification> {
        self.check_monic_binary(
            self.structure.constant_value <= -2.0,
            ConstraintSense::Greater,
            ConstraintType::MultipleCovering,
        )
    }

    fn check_soft_selection(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal || self.structure.constant_value != 0.0 {
            return None;
        }
        if !self.structure.has_only_plus_or_minus_one_coefficient
            || !self.structure.has_only_binary_or_selection_variable
        {
            return None;
        }
        let plus = self.structure.plus_one_coefficient_variables.len();
        let minus = self.structure.minus_one_coefficient_variables.len();
        if plus == 1 && minus > 0 {
            return Some((
                ConstraintType::SoftSelection,
                Some(self.structure.plus_one_coefficient_variables[0]),
            ));
        }
        if plus > 0 && minus == 1 {
            return Some((
                ConstraintType::SoftSelection,
                Some(self.structure.minus_one_coefficient_variables[0]),
            ));
        }
        None
    }

    fn check_binary_flow(&self) -> Option<Classification> {
        let matches = self.sense == ConstraintSense::Equal
            && self.structure.has_only_plus_or_minus_one_coefficient
            && self.structure.has_only_binary_or_selection_variable;
        matches.then_some((ConstraintType::BinaryFlow, None))
    }

    fn check_integer_flow(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal
            || !self.structure.has_only_plus_or_minus_one_coefficient
            || !self.structure.has_only_integer_variables
        {
            return None;
        }
        let plus = self.structure.plus_one_coefficient_variables.len();
        let minus = self.structure.minus_one_coefficient_variables.len();
        (plus > 1 && minus > 1).then_some((ConstraintType::IntegerFlow, None))
    }

    fn check_min_max(&self) -> Option<Classification> {
        if !self.structure.is_integer || self.sense == ConstraintSense::Equal {
            return None;
        }
        let plus = &self.structure.plus_one_coefficient_integer_variables;
        let minus = &self.structure.minus_one_coefficient_integer_variables;
        if self.sense == ConstraintSense::Less && minus.len() == 1 && plus.is_empty() {
            return Some((ConstraintType::MinMax, Some(minus[0])));
        }
        if self.sense == ConstraintSense::Greater && plus.len() == 1 && minus.is_empty() {
            return Some((ConstraintType::MinMax, Some(plus[0])));
        }
        None
    }

    fn check_max_min(&self) -> Option<Classification> {
        if !self.structure.is_integer || self.sense == ConstraintSense::Equal {
            return None;
        }
        let plus = &self.structure.plus_one_coefficient_integer_variables;
        let minus = &self.structure.minus_one_coefficient_integer_variables;
        if self.sense == ConstraintSense::Greater && minus.len() == 1 && plus.is_empty() {
            return Some((ConstraintType::MaxMin, Some(minus[0])));
        }
        if self.sense == ConstraintSense::Less && plus.len() == 1 && minus.is_empty() {
            return Some((ConstraintType::MaxMin, Some(plus[0])));
        }
        None
    }

    fn check_intermediate_multi_term(&self) -> Option<Classification> {
        if !self.structure.is_integer || self.sense != ConstraintSense::Equal {
            return None;
        }
        let plus = &self.structure.plus_one_coefficient_integer_variables;
        let minus = &self.structure.minus_one_coefficient_integer_variables;
        if minus.len() == 1 && plus.len() != 1 {
            return Some((ConstraintType::Intermediate, Some(minus[0])));
        }
        if plus.len() == 1 && minus.len() != 1 {
            return Some((ConstraintType::Intermediate, Some(plus[0])));
        }
        None
    }

    fn check_equation_knapsack(&self) -> Option<Classification> {
        if !self.structure.has_only_binary_or_selection_variable
            || self.sense != ConstraintSense::Equal
        {
            return None;
        }
        let positive = self.structure.positive_coefficient_variables.len();
        let negative = self.structure.negative_coefficient_variables.len();
        (positive == 0 || negative == 0).then_some((ConstraintType::EquationKnapsack, None))
    }

    fn check_one_sided_knapsack(
        &self,
        constraint_type: ConstraintType,
    ) -> Option<Classification> {
        let positive = self.structure.positive_coefficient_variables.len();
        let negative = self.structure.negative_coefficient_variables.len();
        let matches = (negative == 0 && self.sense == ConstraintSense::Less)
            || (positive == 0 && self.sense == ConstraintSense::Greater);
        matches.then_some((constraint_type, None))
    }

    fn check_bin_packing(&self) -> Option<Classification> {
        if !self.structure.has_only_binary_or_selection_variable
            || !self.structure.has_bin_packing_variable
        {
            return None;
        }
        self.check_one_sided_knapsack(ConstraintType::BinPacking)
    }

    fn check_knapsack(&self) -> Option<Classification> {
        if !self.structure.has_only_binary_or_selection_variable {
            return None;
        }
        self.check_one_sided_knapsack(ConstraintType::Knapsack)
    }

    fn check_integer_knapsack(&self) -> Option<Classification> {
        if self.structure.has_only_binary_or_selection_variable {
            return None;
        }
        self.check_one_sided_knapsack(ConstraintType::IntegerKnapsack)
    }

    fn check_gf2(&self) -> Option<Classification> {
        if self.sense != ConstraintSense::Equal {
            return None;
        }
        if self.structure.constant_value != 0.0 && self.structure.constant_value.abs() != 1.0 {
            return None;
        }

        let mut key_variable = None;
        let mut key_coefficient = 0.0;
        let mut keys_found = 0usize;

        for (&variable, &coefficient) in self
            .structure
            .variables
            .iter()
            .zip(self.structure.coefficients.iter())
        {
            let sense = self.variables[*variable].sense();
            if matches!(sense, VariableSense::Integer | VariableSense::Binary)
                && coefficient.abs() == 2.0
            {
                key_variable = Some(variable);
                key_coefficient = coefficient;
                keys_found += 1;
            } else if sense != VariableSense::Binary || coefficient.abs() != 1.0 {
                return None;
            }
        }

        if keys_found != 1 {
            return None;
        }
        let key = key_variable.unwrap();

        // The slack variable's bounds must cover half the range of the
        // binary part, otherwise the equation is not a free parity slack.
        let mut rest = self.constraint.expression().clone_terms();
        rest.erase(key);
        let mut rest_lower = rest.lower_bound(self.variables);
        let mut rest_upper = rest.upper_bound(self.variables);
        if key_coefficient > 0.0 {
            std::mem::swap(&mut rest_lower, &mut rest_upper);
            rest_lower = -rest_lower;
            rest_upper = -rest_upper;
        }

        let key_lower = self.variables[*key].lower_bound();
        let key_upper = self.variables[*key].upper_bound();
        if key_lower != DEFAULT_LOWER_BOUND && key_lower as f64 > (rest_lower * 0.5).ceil() {
            return None;
        }
        if key_upper != DEFAULT_UPPER_BOUND && (key_upper as f64) < (rest_upper * 0.5).floor() {
            return None;
        }

        Some((ConstraintType::Gf2, Some(key)))
    }
}
