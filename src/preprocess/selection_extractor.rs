use crate::{ConstraintType, Model, Selection, SelectionMode, VariableID};
use fnv::FnvHashSet;
use tracing::info;

/// Carves disjoint selection blocks out of the enabled set-partitioning
/// constraints, according to the configured mode.
pub struct SelectionExtractor<'a> {
    model: &'a mut Model,
}

impl<'a> SelectionExtractor<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self { model }
    }

    pub fn extract(&mut self, mode: SelectionMode) -> usize {
        match mode {
            SelectionMode::None => 0,
            SelectionMode::Defined => self.extract_greedy(|_| {}),
            SelectionMode::Smaller => self.extract_greedy(|raw| {
                raw.sort_by_key(|selection| selection.variables.len());
            }),
            SelectionMode::Larger => self.extract_greedy(|raw| {
                raw.sort_by_key(|selection| std::cmp::Reverse(selection.variables.len()));
            }),
            SelectionMode::Independent => self.extract_independent(),
        }
    }

    fn raw_selections(&self) -> Vec<Selection> {
        self.model
            .constraint_type_reference()
            .of(ConstraintType::SetPartitioning)
            .iter()
            .filter(|&&c| self.model.constraint(c).is_enabled())
            .map(|&c| Selection::from_constraint(self.model.constraint(c)))
            .collect()
    }

    /// Accept candidates in order, skipping any whose variables were already
    /// taken by an accepted block.
    fn extract_greedy(&mut self, reorder: impl FnOnce(&mut Vec<Selection>)) -> usize {
        let mut raw_selections = self.raw_selections();
        reorder(&mut raw_selections);

        let mut extracted_variables: FnvHashSet<VariableID> = FnvHashSet::default();
        let mut included: Vec<Selection> = Vec::new();

        for selection in raw_selections {
            if selection
                .variables
                .iter()
                .any(|variable| extracted_variables.contains(variable))
            {
                continue;
            }
            info!(
                "The constraint {} was detected as a selection constraint.",
                self.model.constraint(selection.constraint).name()
            );
            extracted_variables.extend(selection.variables.iter().copied());
            included.push(selection);
        }

        self.install(included)
    }

    /// Accept only candidates sharing no variable with any other candidate.
    fn extract_independent(&mut self) -> usize {
        let raw_selections = self.raw_selections();

        let mut included: Vec<Selection> = Vec::new();
        for (index, selection) in raw_selections.iter().enumerate() {
            let has_overlap = selection.variables.iter().any(|variable| {
                raw_selections
                    .iter()
                    .enumerate()
                    .any(|(other, candidate)| {
                        other != index && candidate.variables.contains(variable)
                    })
            });
            if has_overlap {
                continue;
            }
            info!(
                "The constraint {} was detected as a selection constraint.",
                self.model.constraint(selection.constraint).name()
            );
            included.push(selection.clone());
        }

        self.install(included)
    }

    fn install(&mut self, included: Vec<Selection>) -> usize {
        let number_of_selections = included.len();
        for mut selection in included {
            self.model.constraints[*selection.constraint].disable();
            selection.setup_related_constraints(&self.model.variables, &self.model.constraints);
            self.model.add_selection(selection);
        }
        number_of_selections
    }
}
