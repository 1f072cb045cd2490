use crate::{ConstraintID, ExpressionID, SelectionID};
use derive_more::{Deref, From};
use getset::CopyGetters;

/// Default bounds leave headroom so that signed move deltas cannot overflow.
pub const DEFAULT_LOWER_BOUND: i64 = -(1 << 30);
pub const DEFAULT_UPPER_BOUND: i64 = 1 << 30;

const INITIAL_LOCAL_LAST_UPDATE_ITERATION: i64 = -1000;

/// Index of a variable in the model arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Deref)]
pub struct VariableID(usize);

impl VariableID {
    pub fn into_inner(&self) -> usize {
        self.0
    }
}

impl std::fmt::Debug for VariableID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VariableID({})", self.0)
    }
}

impl std::fmt::Display for VariableID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Structural role of a variable.
///
/// `Binary` and `Integer` are derived from the bounds; `Selection` marks
/// membership in an extracted selection block; the `Dependent*` senses mark
/// variables eliminated by substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableSense {
    Binary,
    Integer,
    Selection,
    DependentBinary,
    DependentInteger,
}

impl std::fmt::Display for VariableSense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VariableSense::Binary => "Binary",
            VariableSense::Integer => "Integer",
            VariableSense::Selection => "Selection",
            VariableSense::DependentBinary => "DependentBinary",
            VariableSense::DependentInteger => "DependentInteger",
        };
        write!(f, "{label}")
    }
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VariableError {
    #[error("Lower bound {lower} exceeds upper bound {upper} for variable {name}")]
    InvalidBounds {
        name: String,
        lower: i64,
        upper: i64,
    },

    #[error("The fixed variable {name} was attempted to be changed from {current} to {requested}")]
    MutatedFixedVariable {
        name: String,
        current: i64,
        requested: i64,
    },
}

/// An integer decision variable.
///
/// Invariants
/// ----------
/// - `lower_bound <= value <= upper_bound` outside of a pending move.
/// - A fixed variable is never changed by a move.
/// - `has_lower_bound_margin == (value > lower_bound)` and
///   `has_upper_bound_margin == (value < upper_bound)`.
#[derive(Debug, CopyGetters)]
pub struct Variable {
    #[getset(get_copy = "pub")]
    id: VariableID,
    pub(crate) name: String,

    #[getset(get_copy = "pub")]
    value: i64,
    #[getset(get_copy = "pub")]
    lower_bound: i64,
    #[getset(get_copy = "pub")]
    upper_bound: i64,
    #[getset(get_copy = "pub")]
    has_bounds: bool,
    #[getset(get_copy = "pub")]
    is_fixed: bool,
    #[getset(get_copy = "pub")]
    sense: VariableSense,

    #[getset(get_copy = "pub")]
    is_objective_improvable: bool,
    #[getset(get_copy = "pub")]
    is_feasibility_improvable: bool,
    #[getset(get_copy = "pub")]
    has_lower_bound_margin: bool,
    #[getset(get_copy = "pub")]
    has_upper_bound_margin: bool,

    #[getset(get_copy = "pub")]
    local_last_update_iteration: i64,
    #[getset(get_copy = "pub")]
    global_last_update_iteration: i64,
    #[getset(get_copy = "pub")]
    update_count: u64,

    #[getset(get_copy = "pub")]
    objective_sensitivity: f64,
    #[getset(get_copy = "pub")]
    hash: u64,

    #[getset(get_copy = "pub")]
    selection: Option<SelectionID>,
    #[getset(get_copy = "pub")]
    dependent_expression: Option<ExpressionID>,

    pub(crate) related_constraints: Vec<ConstraintID>,
    pub(crate) constraint_sensitivities: Vec<(ConstraintID, f64)>,
}

impl Variable {
    pub fn new(id: VariableID, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            value: 0,
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
            has_bounds: false,
            is_fixed: false,
            sense: VariableSense::Integer,
            is_objective_improvable: false,
            is_feasibility_improvable: false,
            has_lower_bound_margin: true,
            has_upper_bound_margin: true,
            local_last_update_iteration: INITIAL_LOCAL_LAST_UPDATE_ITERATION,
            global_last_update_iteration: 0,
            update_count: 0,
            objective_sensitivity: 0.0,
            hash: 0,
            selection: None,
            dependent_expression: None,
            related_constraints: Vec::new(),
            constraint_sensitivities: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write a value through the checked path. Changing a fixed variable to
    /// a different value is an error.
    pub fn set_value(&mut self, value: i64) -> Result<(), VariableError> {
        if self.value != value && self.is_fixed {
            return Err(VariableError::MutatedFixedVariable {
                name: self.name.clone(),
                current: self.value,
                requested: value,
            });
        }
        self.value = value;
        self.update_margin();
        Ok(())
    }

    /// Write a value unless the variable is fixed; a no-op otherwise.
    pub fn set_value_if_mutable(&mut self, value: i64) {
        if !self.is_fixed {
            self.value = value;
            self.update_margin();
        }
    }

    /// Write a value bypassing the fixedness check. Used by the verifier's
    /// initial-value correction.
    pub fn set_value_force(&mut self, value: i64) {
        self.value = value;
        self.update_margin();
    }

    pub fn set_bound(&mut self, lower: i64, upper: i64) -> Result<(), VariableError> {
        if lower > upper {
            return Err(VariableError::InvalidBounds {
                name: self.name.clone(),
                lower,
                upper,
            });
        }
        self.lower_bound = lower;
        self.upper_bound = upper;
        self.has_bounds = true;
        self.value = self.value.clamp(lower, upper);
        self.setup_sense_binary_or_integer();
        self.update_margin();
        Ok(())
    }

    pub fn range(&self) -> i64 {
        self.upper_bound - self.lower_bound
    }

    pub fn fix(&mut self) {
        self.is_fixed = true;
    }

    pub fn unfix(&mut self) {
        self.is_fixed = false;
    }

    pub fn fix_by(&mut self, value: i64) {
        self.value = value;
        self.is_fixed = true;
        self.update_margin();
    }

    pub(crate) fn update_margin(&mut self) {
        self.has_lower_bound_margin = self.value > self.lower_bound;
        self.has_upper_bound_margin = self.value < self.upper_bound;
    }

    /// Downgrade the sense to Binary when the bounds are {0,1}, {0,0} or
    /// {1,1}; otherwise Integer. Selection and Dependent senses are assigned
    /// by the extractors and take precedence once set.
    pub(crate) fn setup_sense_binary_or_integer(&mut self) {
        if matches!(
            self.sense,
            VariableSense::Selection
                | VariableSense::DependentBinary
                | VariableSense::DependentInteger
        ) {
            return;
        }
        self.sense = if self.lower_bound >= 0 && self.upper_bound <= 1 {
            VariableSense::Binary
        } else {
            VariableSense::Integer
        };
    }

    pub(crate) fn set_selection(&mut self, selection: SelectionID) {
        self.selection = Some(selection);
        self.sense = VariableSense::Selection;
    }

    pub(crate) fn set_dependent_expression(&mut self, expression: ExpressionID) {
        self.dependent_expression = Some(expression);
        self.sense = match self.sense {
            VariableSense::Binary => VariableSense::DependentBinary,
            _ => VariableSense::DependentInteger,
        };
    }

    pub fn is_improvable(&self) -> bool {
        self.is_objective_improvable || self.is_feasibility_improvable
    }

    pub fn set_is_objective_improvable(&mut self, flag: bool) {
        self.is_objective_improvable = flag;
    }

    pub fn set_is_feasibility_improvable(&mut self, flag: bool) {
        self.is_feasibility_improvable = flag;
    }

    pub fn set_local_last_update_iteration(&mut self, iteration: i64) {
        self.local_last_update_iteration = iteration;
    }

    pub fn set_global_last_update_iteration(&mut self, iteration: i64) {
        self.global_last_update_iteration = iteration;
    }

    pub fn reset_local_last_update_iteration(&mut self) {
        self.local_last_update_iteration = INITIAL_LOCAL_LAST_UPDATE_ITERATION;
    }

    pub(crate) fn increment_update_count(&mut self) {
        self.update_count += 1;
    }

    pub(crate) fn set_objective_sensitivity(&mut self, sensitivity: f64) {
        self.objective_sensitivity = sensitivity;
    }

    pub fn related_constraints(&self) -> &[ConstraintID] {
        &self.related_constraints
    }

    pub fn constraint_sensitivities(&self) -> &[(ConstraintID, f64)] {
        &self.constraint_sensitivities
    }

    /// Identity hash over the related-constraint pattern, used to group
    /// structurally identical set variables.
    pub(crate) fn setup_hash(&mut self) {
        let mut hash: u64 = 0;
        for &(constraint, _) in &self.constraint_sensitivities {
            hash = hash.wrapping_add((*constraint as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        }
        self.hash = hash;
    }
}
