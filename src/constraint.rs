use crate::{Expression, Move, Variable, VariableID};
use derive_more::{Deref, From};

/// Index of a constraint in the model arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct ConstraintID(usize);

impl ConstraintID {
    pub fn into_inner(&self) -> usize {
        self.0
    }
}

impl std::fmt::Debug for ConstraintID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConstraintID({})", self.0)
    }
}

impl std::fmt::Display for ConstraintID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Relation of a constraint expression `e` to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintSense {
    /// `e <= 0`
    Less,
    /// `e == 0`
    Equal,
    /// `e >= 0`
    Greater,
}

impl std::fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConstraintSense::Less => "<=",
            ConstraintSense::Equal => "=",
            ConstraintSense::Greater => ">=",
        };
        write!(f, "{label}")
    }
}

/// Structural category assigned by the classifier cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Empty,
    Singleton,
    ExclusiveOr,
    ExclusiveNor,
    InvertedIntegers,
    BalancedIntegers,
    ConstantSumIntegers,
    ConstantDifferenceIntegers,
    ConstantRatioIntegers,
    Aggregation,
    Precedence,
    VariableBound,
    TrinomialExclusiveNor,
    AllOrNothing,
    SetPartitioning,
    SetPacking,
    SetCovering,
    Cardinality,
    InvariantKnapsack,
    MultipleCovering,
    BinaryFlow,
    IntegerFlow,
    SoftSelection,
    MinMax,
    MaxMin,
    Intermediate,
    EquationKnapsack,
    BinPacking,
    Knapsack,
    IntegerKnapsack,
    Gf2,
    GeneralLinear,
    Unknown,
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConstraintType::Empty => "Empty",
            ConstraintType::Singleton => "Singleton",
            ConstraintType::ExclusiveOr => "Exclusive OR",
            ConstraintType::ExclusiveNor => "Exclusive NOR",
            ConstraintType::InvertedIntegers => "Inverted Integers",
            ConstraintType::BalancedIntegers => "Balanced Integers",
            ConstraintType::ConstantSumIntegers => "Constant Sum Integers",
            ConstraintType::ConstantDifferenceIntegers => "Constant Difference Integers",
            ConstraintType::ConstantRatioIntegers => "Constant Ratio Integers",
            ConstraintType::Aggregation => "Aggregation",
            ConstraintType::Precedence => "Precedence",
            ConstraintType::VariableBound => "Variable Bound",
            ConstraintType::TrinomialExclusiveNor => "Trinomial Exclusive NOR",
            ConstraintType::AllOrNothing => "All or Nothing",
            ConstraintType::SetPartitioning => "Set Partitioning",
            ConstraintType::SetPacking => "Set Packing",
            ConstraintType::SetCovering => "Set Covering",
            ConstraintType::Cardinality => "Cardinality",
            ConstraintType::InvariantKnapsack => "Invariant Knapsack",
            ConstraintType::MultipleCovering => "Multiple Covering",
            ConstraintType::BinaryFlow => "Binary Flow",
            ConstraintType::IntegerFlow => "Integer Flow",
            ConstraintType::SoftSelection => "Soft Selection",
            ConstraintType::MinMax => "Min-Max",
            ConstraintType::MaxMin => "Max-Min",
            ConstraintType::Intermediate => "Intermediate",
            ConstraintType::EquationKnapsack => "Equation Knapsack",
            ConstraintType::BinPacking => "Bin Packing",
            ConstraintType::Knapsack => "Knapsack",
            ConstraintType::IntegerKnapsack => "Integer Knapsack",
            ConstraintType::Gf2 => "GF(2)",
            ConstraintType::GeneralLinear => "General Linear",
            ConstraintType::Unknown => "Unknown",
        };
        write!(f, "{label}")
    }
}

/// A linear constraint `expression ⋈ 0`.
///
/// The violation is `max(e, 0)` for Less, `|e|` for Equal and `max(-e, 0)`
/// for Greater, where `e` is the live expression value.
#[derive(Debug)]
pub struct Constraint {
    id: ConstraintID,
    pub(crate) name: String,
    pub(crate) expression: Expression,
    sense: ConstraintSense,

    constraint_value: f64,
    violation_value: f64,
    is_enabled: bool,
    update_count: u64,

    constraint_type: ConstraintType,
    key_variable: Option<VariableID>,
    is_defining_dependent_variable: bool,
}

impl Constraint {
    pub fn new(
        id: ConstraintID,
        name: impl Into<String>,
        expression: Expression,
        sense: ConstraintSense,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            expression,
            sense,
            constraint_value: 0.0,
            violation_value: 0.0,
            is_enabled: true,
            update_count: 0,
            constraint_type: ConstraintType::Unknown,
            key_variable: None,
            is_defining_dependent_variable: false,
        }
    }

    pub fn id(&self) -> ConstraintID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn expression_mut(&mut self) -> &mut Expression {
        &mut self.expression
    }

    pub fn sense(&self) -> ConstraintSense {
        self.sense
    }

    /// Holds for Less and Equal.
    pub fn is_less_or_equal(&self) -> bool {
        matches!(self.sense, ConstraintSense::Less | ConstraintSense::Equal)
    }

    /// Holds for Greater and Equal.
    pub fn is_greater_or_equal(&self) -> bool {
        matches!(self.sense, ConstraintSense::Greater | ConstraintSense::Equal)
    }

    pub fn constraint_value(&self) -> f64 {
        self.constraint_value
    }

    pub fn violation_value(&self) -> f64 {
        self.violation_value
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn enable(&mut self) {
        self.is_enabled = true;
    }

    pub fn disable(&mut self) {
        self.is_enabled = false;
    }

    pub fn constraint_type(&self) -> ConstraintType {
        self.constraint_type
    }

    pub fn key_variable(&self) -> Option<VariableID> {
        self.key_variable
    }

    pub(crate) fn set_constraint_type(
        &mut self,
        constraint_type: ConstraintType,
        key_variable: Option<VariableID>,
    ) {
        self.constraint_type = constraint_type;
        self.key_variable = key_variable;
    }

    pub fn is_defining_dependent_variable(&self) -> bool {
        self.is_defining_dependent_variable
    }

    pub(crate) fn set_is_defining_dependent_variable(&mut self, flag: bool) {
        self.is_defining_dependent_variable = flag;
    }

    /// Candidate categories whose non-key variables are all dependent on the
    /// key variable with the trivial defining expression.
    pub fn has_representative_variable(&self) -> bool {
        matches!(
            self.constraint_type,
            ConstraintType::TrinomialExclusiveNor | ConstraintType::AllOrNothing
        )
    }

    fn violation(&self, constraint_value: f64) -> f64 {
        match self.sense {
            ConstraintSense::Less => constraint_value.max(0.0),
            ConstraintSense::Equal => constraint_value.abs(),
            ConstraintSense::Greater => (-constraint_value).max(0.0),
        }
    }

    pub fn evaluate_constraint(&self, variables: &[Variable]) -> f64 {
        self.expression.evaluate(variables)
    }

    pub fn evaluate_violation(&self, variables: &[Variable]) -> f64 {
        self.violation(self.expression.evaluate(variables))
    }

    #[inline]
    pub fn evaluate_violation_move(&self, mv: &Move, variables: &[Variable]) -> f64 {
        self.violation(self.expression.evaluate_move(mv, variables))
    }

    /// Refresh the cached constraint and violation values from scratch.
    pub fn update(&mut self, variables: &[Variable]) {
        self.expression.update(variables);
        self.constraint_value = self.expression.value();
        self.violation_value = self.violation(self.constraint_value);
    }

    /// Refresh the cached values incrementally under a committed move.
    pub fn update_move(&mut self, mv: &Move, variables: &[Variable]) {
        self.constraint_value = self.expression.evaluate_move(mv, variables);
        self.violation_value = self.violation(self.constraint_value);
        self.expression.update_move(mv, variables);
        self.update_count += 1;
    }
}
