//! Linear assignment problem (AP) solvers.
//!
//! The assignment problem over the `next` successor variables of a tour is the
//! classic relaxation of the TSPPD: every node leaves exactly once and is
//! entered exactly once, subtours allowed. Its optimal value is a lower bound
//! on any tour, and its reduced costs measure how much a bound grows when an
//! arc is forced into the solution.
//!
//! Arcs are constrained with a lower and an upper bound each:
//! - `lower = true` forces the arc into the assignment,
//! - `upper = false` forbids it.
//!
//! Forbidden arcs are not removed from the dense matrix: their cost is
//! replaced by [`FORBIDDEN_COST`], so a solve whose objective reaches that
//! value has no assignment avoiding them.

pub mod error;
pub mod primal_dual;
pub mod solution;

#[cfg(test)]
pub(crate) mod reference;

pub use error::ApError;
pub use primal_dual::{EngineState, PrimalDualConfig, PrimalDualSolver, ResumePolicy, SolverStats};
pub use solution::ApSolution;

/// Integer arc cost and dual price.
pub type Cost = i64;

/// Largest arc cost accepted by [`AssignmentSolver::set_obj`].
pub const MAX_ARC_COST: Cost = i32::MAX as Cost;

/// Largest supported number of rows (and columns).
pub const MAX_DIMENSION: usize = 1 << 12;

/// Cost of a forbidden arc.
///
/// Strictly greater than any assignment built from allowed arcs
/// (`MAX_DIMENSION * MAX_ARC_COST`), and small enough that `MAX_DIMENSION`
/// forbidden arcs still sum well inside `i64`.
pub const FORBIDDEN_COST: Cost = MAX_ARC_COST * MAX_DIMENSION as Cost + 1;

/// Common interface of assignment engines driven by a search tree.
///
/// A driver sets the costs once, then alternates bound changes and calls to
/// [`solve`](AssignmentSolver::solve). Query methods are only meaningful after
/// a successful solve.
pub trait AssignmentSolver {
    /// Number of rows (and columns).
    fn size(&self) -> usize;

    /// Set the cost of arc `(row, col)`.
    fn set_obj(&mut self, row: usize, col: usize, cost: Cost) -> Result<(), ApError>;

    /// Set the bounds of arc `(row, col)`: `force_in` forces it, `!allow` forbids it.
    fn set_bounds(&mut self, row: usize, col: usize, force_in: bool, allow: bool) -> Result<(), ApError>;

    /// Re-optimize under the current bounds, returning whether an assignment
    /// avoiding every forbidden arc exists.
    fn solve(&mut self) -> bool;

    /// Objective of the last solve.
    fn objective(&self) -> Cost;

    /// Whether `(row, col)` is part of the current assignment.
    fn is_assigned(&self, row: usize, col: usize) -> bool;

    /// Reduced cost `cost - u[row] - v[col]` of an arc.
    fn reduced_cost(&self, row: usize, col: usize) -> Cost;

    /// Dual price of a row.
    fn dual_row(&self, row: usize) -> Cost;

    /// Dual price of a column.
    fn dual_col(&self, col: usize) -> Cost;

    /// Whether the arc is forced.
    fn lower_bound(&self, row: usize, col: usize) -> bool;

    /// Whether the arc is allowed.
    fn upper_bound(&self, row: usize, col: usize) -> bool;
}
