//! # PRINTEMPS
//!
//! A metaheuristics engine core for pure-integer (and 0/1) linear
//! optimization. The model is built declaratively — variables with bounds,
//! sparse linear expressions, constraints with a sense, and a min/max
//! objective — and evaluated incrementally under candidate *moves*
//! proposed by the structured neighborhood.
//!
//! ## Building a model
//!
//! ```rust
//! use printemps::{ConstraintSense, Expression, Model};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut model = Model::new("knapsack");
//! let x = model.create_binary_variable("x")?;
//! let y = model.create_binary_variable("y")?;
//!
//! // 3x + 5y - 7 <= 0
//! let mut capacity = Expression::new();
//! capacity.add_term(x, 3.0);
//! capacity.add_term(y, 5.0);
//! capacity.add_constant(-7.0);
//! model.create_constraint("capacity", capacity, ConstraintSense::Less);
//!
//! // max 4x + 6y
//! let mut profit = Expression::new();
//! profit.add_term(x, 4.0);
//! profit.add_term(y, 6.0);
//! model.maximize(profit);
//!
//! model.setup();
//! # Ok(()) }
//! ```
//!
//! ## Presolve and structure exploitation
//!
//! [`preprocess::execute`] runs the whole pipeline: problem verification,
//! reduction to a fixed point ([`preprocess::ProblemSizeReducer`]),
//! selection-block extraction ([`preprocess::SelectionExtractor`]),
//! dependent-variable elimination
//! ([`preprocess::DependentVariableExtractor`]), GF(2) equation systems
//! ([`preprocess::Gf2Solver`]) and initial-value correction
//! ([`preprocess::Verifier`]).
//!
//! ## Searching
//!
//! The outer driver owns the loop: [`Neighborhood::update_moves`] refreshes
//! and screens the move templates, [`Model::evaluate_move`] scores a
//! candidate incrementally from the current [`SolutionScore`], and
//! [`Model::update_move`] commits the winner. [`interrupt`] exposes the
//! flag a signal handler can set for a clean stop.

pub mod interrupt;
pub mod parallel;
pub mod preprocess;

mod atol;
mod binary_matrix;
mod classifier;
mod constraint;
mod expression;
mod fixed_size_hash_map;
mod model;
mod moves;
mod neighborhood;
mod objective;
mod option;
mod score;
mod selection;
mod solution;
mod status;
mod variable;

pub use atol::*;
pub use binary_matrix::*;
pub use classifier::*;
pub use constraint::*;
pub use expression::*;
pub use fixed_size_hash_map::*;
pub use model::*;
pub use moves::*;
pub use neighborhood::*;
pub use objective::*;
pub use option::*;
pub use score::*;
pub use selection::*;
pub use solution::*;
pub use status::*;
pub use variable::*;
