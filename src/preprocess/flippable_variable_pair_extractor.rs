use crate::{Model, VariableID, VariableSense};
use fnv::FnvHashSet;
use itertools::Itertools;
use tracing::info;

/// A pair of binary/selection variables sharing many constraints, a good
/// seed for user-defined swap moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlippableVariablePair {
    pub first: VariableID,
    pub second: VariableID,
    pub number_of_common_elements: usize,
    pub overlap_rate: f64,
}

/// Mines pairs of variables whose related-constraint sets intersect in at
/// least a caller-supplied number of elements.
pub struct FlippableVariablePairExtractor<'a> {
    model: &'a Model,
    pairs: Vec<FlippableVariablePair>,
}

impl<'a> FlippableVariablePairExtractor<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self {
            model,
            pairs: Vec::new(),
        }
    }

    pub fn pairs(&self) -> &[FlippableVariablePair] {
        &self.pairs
    }

    pub fn extract_pairs(&mut self, minimum_common_element: usize) {
        info!("Extracting flippable variable pairs...");

        let mut candidates: FnvHashSet<VariableID> = FnvHashSet::default();
        for constraint in self.model.constraints() {
            if !constraint.is_enabled() {
                continue;
            }
            for &variable in constraint.expression().sensitivities().keys() {
                let v = self.model.variable(variable);
                if !v.is_fixed()
                    && matches!(
                        v.sense(),
                        VariableSense::Binary | VariableSense::Selection
                    )
                    && v.related_constraints().len() >= minimum_common_element
                {
                    candidates.insert(variable);
                }
            }
        }

        let candidates: Vec<VariableID> = candidates.into_iter().collect();
        let mut pairs: Vec<FlippableVariablePair> = Vec::new();

        for (&first, &second) in candidates.iter().tuple_combinations() {
            let constraints_first: FnvHashSet<_> = self
                .model
                .variable(first)
                .related_constraints()
                .iter()
                .copied()
                .collect();
            let constraints_second: FnvHashSet<_> = self
                .model
                .variable(second)
                .related_constraints()
                .iter()
                .copied()
                .collect();

            let number_of_common_elements =
                constraints_first.intersection(&constraints_second).count();
            if number_of_common_elements < minimum_common_element {
                continue;
            }
            let union_size = constraints_first.union(&constraints_second).count();
            let overlap_rate = number_of_common_elements as f64 / union_size as f64;

            info!(
                "A flippable variable pair ({}, {}) was found ({number_of_common_elements}/{overlap_rate}).",
                self.model.variable(first).name(),
                self.model.variable(second).name()
            );
            pairs.push(FlippableVariablePair {
                first,
                second,
                number_of_common_elements,
                overlap_rate,
            });
        }

        pairs.sort_by(|a, b| b.overlap_rate.total_cmp(&a.overlap_rate));
        info!("{} flippable variable pairs were found.", pairs.len());
        self.pairs = pairs;
    }

    /// Render the pair table: names, related-constraint counts,
    /// intersection size and overlap rate per line.
    pub fn write_pairs<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for pair in &self.pairs {
            writeln!(
                writer,
                "{} {} {} {} {} {}",
                self.model.variable(pair.first).name(),
                self.model.variable(pair.second).name(),
                self.model.variable(pair.first).related_constraints().len(),
                self.model.variable(pair.second).related_constraints().len(),
                pair.number_of_common_elements,
                pair.overlap_rate,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstraintSense, Expression};

    /// x0 and x1 share three constraints; x2 shares only one with each.
    fn pair_model() -> Model {
        let mut model = Model::new("pairs");
        let x0 = model.create_binary_variable("x0").unwrap();
        let x1 = model.create_binary_variable("x1").unwrap();
        let x2 = model.create_binary_variable("x2").unwrap();

        for i in 0..3 {
            let mut e = Expression::new();
            e.add_term(x0, 1.0);
            e.add_term(x1, 1.0);
            if i == 0 {
                e.add_term(x2, 1.0);
            }
            e.add_constant(-1.0);
            model.create_constraint(format!("c[{i}]"), e, ConstraintSense::Less);
        }
        model.setup();
        model
    }

    #[test]
    fn test_extract_pairs() {
        let model = pair_model();
        let mut extractor = FlippableVariablePairExtractor::new(&model);
        extractor.extract_pairs(2);

        assert_eq!(extractor.pairs().len(), 1);
        let pair = extractor.pairs()[0];
        assert_eq!(pair.number_of_common_elements, 3);
        assert_eq!(pair.overlap_rate, 1.0);
    }

    #[test]
    fn test_threshold_filters_candidates() {
        let model = pair_model();
        let mut extractor = FlippableVariablePairExtractor::new(&model);
        extractor.extract_pairs(4);
        assert!(extractor.pairs().is_empty());
    }

    #[test]
    fn test_pairs_sorted_by_descending_overlap() {
        let mut model = Model::new("sorted");
        let variables: Vec<VariableID> = (0..4)
            .map(|i| model.create_binary_variable(format!("x{i}")).unwrap())
            .collect();

        // x0-x1 overlap fully in two constraints; x2-x3 share two of three.
        for i in 0..2 {
            let mut e = Expression::new();
            e.add_term(variables[0], 1.0);
            e.add_term(variables[1], 1.0);
            e.add_constant(-1.0);
            model.create_constraint(format!("a[{i}]"), e, ConstraintSense::Less);
        }
        for i in 0..2 {
            let mut e = Expression::new();
            e.add_term(variables[2], 1.0);
            e.add_term(variables[3], 1.0);
            e.add_constant(-1.0);
            model.create_constraint(format!("b[{i}]"), e, ConstraintSense::Less);
        }
        let mut e = Expression::new();
        e.add_term(variables[2], 1.0);
        e.add_constant(-1.0);
        model.create_constraint("b[2]", e, ConstraintSense::Less);
        model.setup();

        let mut extractor = FlippableVariablePairExtractor::new(&model);
        extractor.extract_pairs(2);

        assert_eq!(extractor.pairs().len(), 2);
        assert!(extractor.pairs()[0].overlap_rate >= extractor.pairs()[1].overlap_rate);
        assert_eq!(extractor.pairs()[0].overlap_rate, 1.0);
    }
}
