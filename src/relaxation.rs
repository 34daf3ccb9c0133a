//! Assignment relaxation of a TSPPD instance.
//!
//! Every node gets exactly one successor (`next[from] = to`), which is an
//! assignment problem over the instance's cost matrix. On top of the raw
//! costs, the precedence structure fixes a few arcs before any search starts:
//! - `( i i )` self-loops are forbidden,
//! - `( -0 +0 )` the end depot always closes the tour to the start depot,
//! - `( -i +i )` a delivery never goes straight back to its own pickup.
//!
//! Every other arc stays free; a search driver narrows them with
//! [`forbid`](AssignmentRelaxation::forbid) and
//! [`force`](AssignmentRelaxation::force) and reads back bounds and reduced
//! costs.

use crate::ap::{ApError, ApSolution, Cost, PrimalDualConfig, PrimalDualSolver};
use crate::instance::TsppdInstance;

/// AP relaxation bound for a TSPPD instance
#[derive(Debug, Clone)]
pub struct AssignmentRelaxation {
    solver: PrimalDualSolver,
    free_arcs: Vec<(usize, usize)>,
}

impl AssignmentRelaxation {
    pub fn new(instance: &TsppdInstance, config: PrimalDualConfig) -> Result<Self, ApError> {
        let n = instance.dimension;
        let mut solver = PrimalDualSolver::with_config(n, config)?;
        let mut free_arcs = Vec::new();

        for from in 0..n {
            for to in 0..n {
                solver.set_obj(from, to, instance.cost(from, to))?;

                if from == to {
                    solver.set_bounds(from, to, false, false)?;
                } else if from == instance.end_depot() && to == instance.start_depot() {
                    solver.set_bounds(from, to, true, true)?;
                } else if instance.nodes[from].is_delivery() && instance.predecessor(from) == Some(to) {
                    solver.set_bounds(from, to, false, false)?;
                } else {
                    free_arcs.push((from, to));
                }
            }
        }

        Ok(AssignmentRelaxation { solver, free_arcs })
    }

    /// Solve the relaxation, returning the lower bound if the current arc
    /// bounds admit an assignment.
    pub fn solve(&mut self) -> Option<Cost> {
        if self.solver.solve() {
            Some(self.solver.objective())
        } else {
            None
        }
    }

    /// Forbid a free arc
    pub fn forbid(&mut self, from: usize, to: usize) -> Result<(), ApError> {
        self.solver.set_bounds(from, to, false, false)
    }

    /// Force a free arc into every assignment
    pub fn force(&mut self, from: usize, to: usize) -> Result<(), ApError> {
        self.solver.set_bounds(from, to, true, true)
    }

    /// Lift any bound previously put on a free arc
    pub fn release(&mut self, from: usize, to: usize) -> Result<(), ApError> {
        self.solver.set_bounds(from, to, false, true)
    }

    /// Arcs left undecided by the precedence structure
    pub fn free_arcs(&self) -> &[(usize, usize)] {
        &self.free_arcs
    }

    /// Free arcs in the current assignment that are neither forced nor
    /// forbidden.
    pub fn assigned_free_arcs(&self) -> Vec<(usize, usize)> {
        self.free_arcs
            .iter()
            .copied()
            .filter(|&(from, to)| {
                self.solver.is_assigned(from, to)
                    && !self.solver.lower_bound(from, to)
                    && self.solver.upper_bound(from, to)
            })
            .collect()
    }

    pub fn solver(&self) -> &PrimalDualSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut PrimalDualSolver {
        &mut self.solver
    }

    /// Snapshot of the last solve
    pub fn solution(&self, feasible: bool) -> ApSolution {
        ApSolution::from_solver(&self.solver, feasible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> TsppdInstance {
        TsppdInstance::new(
            "test",
            (0.0, 0.0),
            &[((3.0, 4.0), (6.0, 8.0)), ((0.0, 5.0), (0.0, 10.0))],
        )
        .unwrap()
    }

    #[test]
    fn test_structural_bounds() {
        let instance = create_test_instance();
        let relaxation = AssignmentRelaxation::new(&instance, PrimalDualConfig::default()).unwrap();
        let solver = relaxation.solver();

        for node in 0..instance.dimension {
            assert!(!solver.upper_bound(node, node));
        }
        assert!(solver.lower_bound(1, 0));
        assert!(!solver.upper_bound(3, 2));
        assert!(!solver.upper_bound(5, 4));
        assert!(solver.upper_bound(2, 3));

        // 36 arcs - 6 loops - 1 forced - 2 delivery -> pickup
        assert_eq!(relaxation.free_arcs().len(), 27);
    }

    #[test]
    fn test_bound_below_feasible_tour() {
        let instance = create_test_instance();
        let mut relaxation = AssignmentRelaxation::new(&instance, PrimalDualConfig::default()).unwrap();

        let bound = relaxation.solve().expect("relaxation is feasible");
        let tour = instance.sequential_tour();
        assert!(instance.is_feasible(&tour));
        assert!(bound <= instance.tour_cost(&tour));
        assert!(relaxation.solver().is_assigned(1, 0));
    }

    #[test]
    fn test_random_instances_bound_tours() {
        for seed in 0..10 {
            let instance = TsppdInstance::random("random", 6, 500.0, seed).unwrap();
            let mut relaxation = AssignmentRelaxation::new(&instance, PrimalDualConfig::default()).unwrap();

            let bound = relaxation.solve().unwrap();
            assert!(bound <= instance.tour_cost(&instance.sequential_tour()));
            assert!(relaxation.solution(true).is_perfect());
        }
    }

    #[test]
    fn test_forbidding_assigned_arcs_never_lowers_bound() {
        let instance = TsppdInstance::random("dive", 5, 200.0, 3).unwrap();
        let mut relaxation = AssignmentRelaxation::new(&instance, PrimalDualConfig::default()).unwrap();
        let mut bound = relaxation.solve().unwrap();

        for _ in 0..5 {
            let Some(&(from, to)) = relaxation.assigned_free_arcs().first() else {
                break;
            };
            relaxation.forbid(from, to).unwrap();
            let next = relaxation.solve().unwrap();
            assert!(next >= bound);
            assert!(!relaxation.solver().is_assigned(from, to));
            bound = next;
        }
    }

    #[test]
    fn test_force_and_release() {
        let instance = create_test_instance();
        let mut relaxation = AssignmentRelaxation::new(&instance, PrimalDualConfig::default()).unwrap();
        let root = relaxation.solve().unwrap();

        relaxation.force(0, 5).unwrap();
        let forced = relaxation.solve().unwrap();
        assert!(relaxation.solver().is_assigned(0, 5));
        assert!(forced >= root);

        relaxation.release(0, 5).unwrap();
        assert_eq!(relaxation.solve(), Some(root));
    }
}
