use serde::Deserialize;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum OptionError {
    #[error("Invalid selection mode: {value}")]
    InvalidSelectionMode { value: String },

    #[error("Invalid verbose level: {value}")]
    InvalidVerboseLevel { value: String },
}

/// How selection blocks are carved out of the set-partitioning constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SelectionMode {
    #[default]
    None,
    Defined,
    Smaller,
    Larger,
    Independent,
}

impl std::str::FromStr for SelectionMode {
    type Err = OptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "None" => Ok(SelectionMode::None),
            "Defined" => Ok(SelectionMode::Defined),
            "Smaller" => Ok(SelectionMode::Smaller),
            "Larger" => Ok(SelectionMode::Larger),
            "Independent" => Ok(SelectionMode::Independent),
            _ => Err(OptionError::InvalidSelectionMode {
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SelectionMode {
    type Error = OptionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum VerboseLevel {
    Off,
    #[default]
    Warning,
    Outer,
    Inner,
    Full,
}

impl std::str::FromStr for VerboseLevel {
    type Err = OptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Off" => Ok(VerboseLevel::Off),
            "Warning" => Ok(VerboseLevel::Warning),
            "Outer" => Ok(VerboseLevel::Outer),
            "Inner" => Ok(VerboseLevel::Inner),
            "Full" => Ok(VerboseLevel::Full),
            _ => Err(OptionError::InvalidVerboseLevel {
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for VerboseLevel {
    type Error = OptionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralOption {
    pub iteration_max: u64,
    pub time_max: f64,
}

impl Default for GeneralOption {
    fn default() -> Self {
        Self {
            iteration_max: 100,
            time_max: 120.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessOption {
    pub is_enabled_presolve: bool,
    pub is_enabled_remove_duplicated_constraints: bool,
    pub is_enabled_remove_redundant_set_variables: bool,
    pub is_enabled_remove_redundant_set_constraints: bool,
    pub is_enabled_extract_implicit_equality_constraints: bool,
    pub is_enabled_extract_dependent_exclusive_or: bool,
    pub is_enabled_extract_dependent_exclusive_nor: bool,
    pub is_enabled_extract_dependent_inverted_integers: bool,
    pub is_enabled_extract_dependent_balanced_integers: bool,
    pub is_enabled_extract_dependent_constant_sum_integers: bool,
    pub is_enabled_extract_dependent_constant_difference_integers: bool,
    pub is_enabled_extract_dependent_constant_ratio_integers: bool,
    pub is_enabled_extract_dependent_trinomial_exclusive_nor: bool,
    pub is_enabled_extract_dependent_all_or_nothing: bool,
    pub is_enabled_extract_dependent_intermediate: bool,
}

impl Default for PreprocessOption {
    fn default() -> Self {
        Self {
            is_enabled_presolve: true,
            is_enabled_remove_duplicated_constraints: true,
            is_enabled_remove_redundant_set_variables: false,
            is_enabled_remove_redundant_set_constraints: false,
            is_enabled_extract_implicit_equality_constraints: false,
            is_enabled_extract_dependent_exclusive_or: true,
            is_enabled_extract_dependent_exclusive_nor: true,
            is_enabled_extract_dependent_inverted_integers: true,
            is_enabled_extract_dependent_balanced_integers: true,
            is_enabled_extract_dependent_constant_sum_integers: true,
            is_enabled_extract_dependent_constant_difference_integers: true,
            is_enabled_extract_dependent_constant_ratio_integers: true,
            is_enabled_extract_dependent_trinomial_exclusive_nor: false,
            is_enabled_extract_dependent_all_or_nothing: false,
            is_enabled_extract_dependent_intermediate: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NeighborhoodOption {
    pub selection_mode: SelectionMode,
    pub improvability_screening_mode: ImprovabilityScreeningMode,
    pub is_enabled_binary_move: bool,
    pub is_enabled_integer_move: bool,
    pub is_enabled_aggregation_move: bool,
    pub is_enabled_precedence_move: bool,
    pub is_enabled_variable_bound_move: bool,
    pub is_enabled_exclusive_move: bool,
    pub is_enabled_selection_move: bool,
    pub is_enabled_user_defined_move: bool,
    /// Compatibility switch: when set, registering a user-defined move
    /// updater disables the built-in generators, reproducing the legacy
    /// behavior. Off by default; every toggle above is then independent.
    pub is_enabled_user_defined_move_exclusive: bool,
}

impl Default for NeighborhoodOption {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::None,
            improvability_screening_mode: ImprovabilityScreeningMode::On,
            is_enabled_binary_move: true,
            is_enabled_integer_move: true,
            is_enabled_aggregation_move: false,
            is_enabled_precedence_move: false,
            is_enabled_variable_bound_move: false,
            is_enabled_exclusive_move: true,
            is_enabled_selection_move: true,
            is_enabled_user_defined_move: false,
            is_enabled_user_defined_move_exclusive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ImprovabilityScreeningMode {
    Off,
    #[default]
    On,
}

/// Outer-driver penalty options; recognized and carried through to the
/// drivers, not interpreted by the core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PenaltyOption {
    pub initial_penalty_coefficient: f64,
    pub penalty_coefficient_relaxing_rate: f64,
    pub penalty_coefficient_tightening_rate: f64,
}

impl Default for PenaltyOption {
    fn default() -> Self {
        Self {
            initial_penalty_coefficient: 1e7,
            penalty_coefficient_relaxing_rate: 0.9,
            penalty_coefficient_tightening_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TabuSearchOption {
    pub iteration_max: u64,
    pub initial_tabu_tenure: u64,
}

impl Default for TabuSearchOption {
    fn default() -> Self {
        Self {
            iteration_max: 200,
            initial_tabu_tenure: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalSearchOption {
    pub iteration_max: u64,
}

impl Default for LocalSearchOption {
    fn default() -> Self {
        Self { iteration_max: 10_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LagrangeDualOption {
    pub iteration_max: u64,
    pub step_size_extend_rate: f64,
    pub step_size_reduce_rate: f64,
}

impl Default for LagrangeDualOption {
    fn default() -> Self {
        Self {
            iteration_max: 10_000,
            step_size_extend_rate: 1.05,
            step_size_reduce_rate: 0.95,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputOption {
    pub verbose: VerboseLevel,
}

/// The hierarchical options blob. Unknown keys inside the recognized groups
/// are rejected at parse time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub general: GeneralOption,
    pub preprocess: PreprocessOption,
    pub neighborhood: NeighborhoodOption,
    pub penalty: PenaltyOption,
    pub tabu_search: TabuSearchOption,
    pub local_search: LocalSearchOption,
    pub lagrange_dual: LagrangeDualOption,
    pub output: OutputOption,
}

impl Options {
    pub fn parse_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.general.iteration_max, 100);
        assert_eq!(options.neighborhood.selection_mode, SelectionMode::None);
        assert!(options.preprocess.is_enabled_presolve);
        assert_eq!(options.output.verbose, VerboseLevel::Warning);
    }

    #[test]
    fn test_parse_json() {
        let options = Options::parse_json(
            r#"{
                "general": {"iteration_max": 5, "time_max": 1.5},
                "neighborhood": {"selection_mode": "Larger"},
                "output": {"verbose": "Full"}
            }"#,
        )
        .unwrap();
        assert_eq!(options.general.iteration_max, 5);
        assert_eq!(options.neighborhood.selection_mode, SelectionMode::Larger);
        assert_eq!(options.output.verbose, VerboseLevel::Full);
    }

    #[test]
    fn test_invalid_selection_mode() {
        let result = Options::parse_json(r#"{"neighborhood": {"selection_mode": "Sideways"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_verbose_level() {
        assert!(matches!(
            "Chatty".parse::<VerboseLevel>(),
            Err(OptionError::InvalidVerboseLevel { .. })
        ));
    }
}
