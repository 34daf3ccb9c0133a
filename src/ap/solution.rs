//! Serializable snapshot of a solved assignment problem.

use serde::{Deserialize, Serialize};

use super::{Cost, PrimalDualSolver, SolverStats};

/// Result of an assignment solve, detached from the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApSolution {
    /// Objective value (sum of dual prices)
    pub objective: Cost,
    /// Whether the assignment avoids every forbidden arc
    pub feasible: bool,
    /// Column assigned to each row
    pub assignment: Vec<Option<usize>>,
    /// Row dual prices
    pub row_duals: Vec<Cost>,
    /// Column dual prices
    pub col_duals: Vec<Cost>,
    /// Engine counters at the time of the snapshot
    pub stats: SolverStats,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl ApSolution {
    /// Capture the current state of a solver.
    pub fn from_solver(solver: &PrimalDualSolver, feasible: bool) -> Self {
        let n = solver.size();
        ApSolution {
            objective: solver.objective(),
            feasible,
            assignment: (0..n).map(|row| solver.matched_col(row)).collect(),
            row_duals: (0..n).map(|row| solver.dual_row(row)).collect(),
            col_duals: (0..n).map(|col| solver.dual_col(col)).collect(),
            stats: *solver.stats(),
            computation_time: 0.0,
        }
    }

    /// Check if every row is matched to a distinct column
    pub fn is_perfect(&self) -> bool {
        let mut seen = vec![false; self.assignment.len()];
        for col in &self.assignment {
            match col {
                Some(col) if *col < seen.len() && !seen[*col] => seen[*col] = true,
                _ => return false,
            }
        }
        true
    }

    /// Matched `(row, col)` arcs
    pub fn arcs(&self) -> Vec<(usize, usize)> {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|col| (row, col)))
            .collect()
    }

    /// Cycles of the assignment read as a successor function.
    ///
    /// For a tour relaxation a single cycle means the assignment is already a
    /// Hamiltonian circuit. Rows without a match are skipped.
    pub fn subtours(&self) -> Vec<Vec<usize>> {
        let n = self.assignment.len();
        let mut visited = vec![false; n];
        let mut cycles = Vec::new();

        for start in 0..n {
            if visited[start] || self.assignment[start].is_none() {
                continue;
            }
            let mut cycle = Vec::new();
            let mut node = start;
            while !visited[node] {
                visited[node] = true;
                cycle.push(node);
                match self.assignment[node] {
                    Some(next) if next < n => node = next,
                    _ => break,
                }
            }
            cycles.push(cycle);
        }

        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ap::PrimalDualConfig;

    #[test]
    fn test_snapshot_of_solved_engine() {
        let costs = vec![vec![9, 2, 7], vec![6, 4, 3], vec![5, 8, 1]];
        let mut solver = PrimalDualSolver::from_matrix(&costs, PrimalDualConfig::default()).unwrap();
        let feasible = solver.solve();

        let solution = ApSolution::from_solver(&solver, feasible);
        assert!(solution.feasible);
        assert!(solution.is_perfect());
        assert_eq!(solution.objective, 9);
        assert_eq!(solution.arcs(), vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(
            solution.row_duals.iter().sum::<Cost>() + solution.col_duals.iter().sum::<Cost>(),
            9
        );
    }

    #[test]
    fn test_subtours() {
        let solution = ApSolution {
            objective: 0,
            feasible: true,
            assignment: vec![Some(1), Some(0), Some(3), Some(4), Some(2)],
            row_duals: vec![0; 5],
            col_duals: vec![0; 5],
            stats: SolverStats::default(),
            computation_time: 0.0,
        };

        assert_eq!(solution.subtours(), vec![vec![0, 1], vec![2, 3, 4]]);
        assert!(solution.is_perfect());
    }

    #[test]
    fn test_partial_assignment_is_not_perfect() {
        let solution = ApSolution {
            objective: 3,
            feasible: false,
            assignment: vec![Some(0), None],
            row_duals: vec![1, 0],
            col_duals: vec![2, 0],
            stats: SolverStats::default(),
            computation_time: 0.0,
        };

        assert!(!solution.is_perfect());
        assert_eq!(solution.arcs(), vec![(0, 0)]);
        assert_eq!(solution.subtours(), vec![vec![0]]);
    }
}
