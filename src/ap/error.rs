//! Errors reported by the assignment engine.

use thiserror::Error;

use super::Cost;

/// Failures raised while building or solving an assignment problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApError {
    /// The requested dimension exceeds [`super::MAX_DIMENSION`].
    #[error("dimension {size} exceeds the supported maximum of {max}")]
    DimensionTooLarge {
        /// Requested number of rows (and columns).
        size: usize,
        /// Largest supported dimension.
        max: usize,
    },
    /// An arc index lies outside the `size x size` matrix.
    #[error("arc ({row}, {col}) is outside a {size}x{size} assignment problem")]
    ArcOutOfRange {
        /// Row of the offending arc.
        row: usize,
        /// Column of the offending arc.
        col: usize,
        /// Dimension of the problem.
        size: usize,
    },
    /// An arc cost lies outside `0..=MAX_ARC_COST`.
    #[error("cost {cost} of arc ({row}, {col}) is outside 0..={max}")]
    CostOutOfRange {
        /// Row of the offending arc.
        row: usize,
        /// Column of the offending arc.
        col: usize,
        /// Rejected cost.
        cost: Cost,
        /// Largest accepted cost.
        max: Cost,
    },
    /// A row of a cost matrix does not have one entry per column.
    #[error("row {row} has {len} costs, expected {size}")]
    RowLength {
        /// Offending row.
        row: usize,
        /// Number of costs given for it.
        len: usize,
        /// Dimension of the problem.
        size: usize,
    },
    /// The shortest augmenting path search ran out of columns for `row`.
    #[error("no augmenting path exists for row {row}")]
    NoAugmentingPath {
        /// Unmatched row whose search failed.
        row: usize,
    },
    /// The optimal assignment uses at least one forbidden arc.
    #[error("forced and forbidden arcs admit no assignment (objective {objective})")]
    Infeasible {
        /// Objective reached with the forbidding sentinel included.
        objective: Cost,
    },
}
