//! Module for representing TSPPD instances.
//!
//! Nodes follow a fixed layout: node 0 is the start depot (`+0`), node 1 the
//! end depot (`-0`), and request `k` occupies two consecutive indices, its
//! pickup `2k + 2` followed by its delivery `2k + 3`. Arc costs are rounded
//! Euclidean distances, with the closing arc from the end depot back to the
//! start depot free of charge.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ap::{Cost, MAX_ARC_COST, MAX_DIMENSION};

/// Role of a node in the tour
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    StartDepot,
    EndDepot,
    Pickup,
    Delivery,
}

/// Represents a node in the TSPPD instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier (0-indexed)
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64, kind: NodeKind) -> Self {
        Node { id, x, y, kind }
    }

    pub fn is_pickup(&self) -> bool {
        self.kind == NodeKind::Pickup
    }

    pub fn is_delivery(&self) -> bool {
        self.kind == NodeKind::Delivery
    }

    /// Check if this node is one of the two depots
    pub fn is_depot(&self) -> bool {
        matches!(self.kind, NodeKind::StartDepot | NodeKind::EndDepot)
    }
}

/// A complete TSPPD instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsppdInstance {
    /// Name of the instance
    pub name: String,
    /// Number of nodes (both depots included)
    pub dimension: usize,
    /// List of all nodes, in the layout described in the module docs
    pub nodes: Vec<Node>,
    /// Precomputed integer cost matrix
    pub cost_matrix: Vec<Vec<Cost>>,
}

impl TsppdInstance {
    /// Build an instance from a depot location and pickup/delivery locations.
    pub fn new(name: &str, depot: (f64, f64), requests: &[((f64, f64), (f64, f64))]) -> Result<Self, String> {
        let dimension = 2 + 2 * requests.len();
        if dimension > MAX_DIMENSION {
            return Err(format!("Too many requests: {} nodes exceed {}", dimension, MAX_DIMENSION));
        }

        let mut nodes = Vec::with_capacity(dimension);
        nodes.push(Node::new(0, depot.0, depot.1, NodeKind::StartDepot));
        nodes.push(Node::new(1, depot.0, depot.1, NodeKind::EndDepot));
        for (pickup, delivery) in requests {
            let id = nodes.len();
            nodes.push(Node::new(id, pickup.0, pickup.1, NodeKind::Pickup));
            nodes.push(Node::new(id + 1, delivery.0, delivery.1, NodeKind::Delivery));
        }

        if let Some(node) = nodes.iter().find(|n| !n.x.is_finite() || !n.y.is_finite()) {
            return Err(format!("Invalid coordinates for node {}", node.id));
        }

        let cost_matrix = Self::compute_cost_matrix(&nodes)?;

        Ok(TsppdInstance {
            name: name.to_string(),
            dimension,
            nodes,
            cost_matrix,
        })
    }

    /// Generate a random instance with coordinates uniform in `[0, grid)`.
    /// Deterministic via seed.
    pub fn random(name: &str, num_requests: usize, grid: f64, seed: u64) -> Result<Self, String> {
        if !(grid.is_finite() && grid > 0.0) {
            return Err(format!("Invalid grid size: {}", grid));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut point = || (rng.gen_range(0.0..grid), rng.gen_range(0.0..grid));

        let depot = point();
        let requests: Vec<_> = (0..num_requests).map(|_| (point(), point())).collect();

        Self::new(name, depot, &requests)
    }

    /// Compute the rounded Euclidean cost matrix
    fn compute_cost_matrix(nodes: &[Node]) -> Result<Vec<Vec<Cost>>, String> {
        let n = nodes.len();
        let mut matrix = vec![vec![0; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i == j || (nodes[i].kind == NodeKind::EndDepot && nodes[j].kind == NodeKind::StartDepot) {
                    continue;
                }
                let dx = nodes[i].x - nodes[j].x;
                let dy = nodes[i].y - nodes[j].y;
                let distance = (dx * dx + dy * dy).sqrt().round();
                if distance > MAX_ARC_COST as f64 {
                    return Err(format!("Distance between nodes {} and {} is too large", i, j));
                }
                matrix[i][j] = distance as Cost;
            }
        }

        Ok(matrix)
    }

    /// Get the cost of arc `from -> to`
    #[inline]
    pub fn cost(&self, from: usize, to: usize) -> Cost {
        self.cost_matrix[from][to]
    }

    pub fn start_depot(&self) -> usize {
        0
    }

    pub fn end_depot(&self) -> usize {
        1
    }

    /// Number of pickup/delivery requests
    pub fn num_requests(&self) -> usize {
        (self.dimension - 2) / 2
    }

    /// Node that must precede `node`: the pickup of a delivery, the start
    /// depot for the end depot.
    pub fn predecessor(&self, node: usize) -> Option<usize> {
        match self.nodes.get(node)?.kind {
            NodeKind::Delivery => Some(node - 1),
            NodeKind::EndDepot => Some(self.start_depot()),
            _ => None,
        }
    }

    /// Node that must follow `node`: the delivery of a pickup, the end depot
    /// for the start depot.
    pub fn successor(&self, node: usize) -> Option<usize> {
        match self.nodes.get(node)?.kind {
            NodeKind::Pickup => Some(node + 1),
            NodeKind::StartDepot => Some(self.end_depot()),
            _ => None,
        }
    }

    /// Get all pickup nodes
    pub fn pickup_nodes(&self) -> Vec<usize> {
        self.nodes.iter().filter(|n| n.is_pickup()).map(|n| n.id).collect()
    }

    /// Get all delivery nodes
    pub fn delivery_nodes(&self) -> Vec<usize> {
        self.nodes.iter().filter(|n| n.is_delivery()).map(|n| n.id).collect()
    }

    /// Verify that a tour is a valid TSPPD path:
    /// starts at the start depot, ends at the end depot, visits every node
    /// exactly once and every pickup before its delivery.
    pub fn is_feasible(&self, tour: &[usize]) -> bool {
        if tour.len() != self.dimension
            || tour.first() != Some(&self.start_depot())
            || tour.last() != Some(&self.end_depot())
        {
            return false;
        }

        let mut position = vec![usize::MAX; self.dimension];
        for (pos, &node) in tour.iter().enumerate() {
            if node >= self.dimension || position[node] != usize::MAX {
                return false;
            }
            position[node] = pos;
        }

        self.delivery_nodes().iter().all(|&delivery| {
            self.predecessor(delivery)
                .map(|pickup| position[pickup] < position[delivery])
                .unwrap_or(false)
        })
    }

    /// Calculate the cost of a tour, closing arc included
    pub fn tour_cost(&self, tour: &[usize]) -> Cost {
        if tour.len() < 2 {
            return 0;
        }

        let path: Cost = tour.windows(2).map(|w| self.cost(w[0], w[1])).sum();
        path + self.cost(tour[tour.len() - 1], tour[0])
    }

    /// Visit requests in index order: pickup then delivery.
    pub fn sequential_tour(&self) -> Vec<usize> {
        let mut tour = Vec::with_capacity(self.dimension);
        tour.push(self.start_depot());
        tour.extend(2..self.dimension);
        tour.push(self.end_depot());
        tour
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let mut costs: Vec<Cost> = Vec::new();
        for i in 0..self.dimension {
            for j in 0..self.dimension {
                if i != j {
                    costs.push(self.cost(i, j));
                }
            }
        }
        let avg_cost = if costs.is_empty() {
            0.0
        } else {
            costs.iter().sum::<Cost>() as f64 / costs.len() as f64
        };
        let max_cost = costs.iter().copied().max().unwrap_or(0);

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            num_requests: self.num_requests(),
            avg_cost,
            max_cost,
            sequential_tour_cost: self.tour_cost(&self.sequential_tour()),
        }
    }
}

/// Statistics about a TSPPD instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub num_requests: usize,
    pub avg_cost: f64,
    pub max_cost: Cost,
    pub sequential_tour_cost: Cost,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {} (2 depots + {} requests)", self.dimension, self.num_requests)?;
        writeln!(f, "  Avg arc cost: {:.2}", self.avg_cost)?;
        writeln!(f, "  Max arc cost: {}", self.max_cost)?;
        writeln!(f, "  Sequential tour cost: {}", self.sequential_tour_cost)
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
    fn test_node_layout() {
        let instance = create_test_instance();

        assert_eq!(instance.dimension, 6);
        assert_eq!(instance.num_requests(), 2);
        assert_eq!(instance.pickup_nodes(), vec![2, 4]);
        assert_eq!(instance.delivery_nodes(), vec![3, 5]);
        assert!(instance.nodes[0].is_depot());
        assert!(instance.nodes[1].is_depot());
        assert_eq!(instance.predecessor(3), Some(2));
        assert_eq!(instance.successor(4), Some(5));
        assert_eq!(instance.predecessor(1), Some(0));
        assert_eq!(instance.predecessor(2), None);
        assert_eq!(instance.successor(9), None);
    }

    #[test]
    fn test_cost_calculation() {
        let instance = create_test_instance();

        assert_eq!(instance.cost(0, 2), 5);
        assert_eq!(instance.cost(2, 3), 5);
        assert_eq!(instance.cost(3, 2), 5);
        assert_eq!(instance.cost(1, 0), 0);
        assert_eq!(instance.cost(2, 2), 0);
    }

    #[test]
    fn test_feasibility() {
        let instance = create_test_instance();

        assert!(instance.is_feasible(&[0, 2, 3, 4, 5, 1]));
        assert!(instance.is_feasible(&[0, 4, 2, 5, 3, 1]));
        assert!(!instance.is_feasible(&[0, 3, 2, 4, 5, 1]));
        assert!(!instance.is_feasible(&[0, 2, 3, 4, 1, 5]));
        assert!(!instance.is_feasible(&[0, 2, 2, 4, 5, 1]));
        assert!(!instance.is_feasible(&[0, 2, 3, 1]));
    }

    #[test]
    fn test_tour_cost() {
        let instance = create_test_instance();
        let tour = instance.sequential_tour();

        assert_eq!(tour, vec![0, 2, 3, 4, 5, 1]);
        // 5 + 5 + round(sqrt(36 + 9)) + 5 + 10 + 0
        assert_eq!(instance.tour_cost(&tour), 5 + 5 + 7 + 5 + 10);
    }

    #[test]
    fn test_random_is_deterministic() {
        let a = TsppdInstance::random("a", 5, 100.0, 7).unwrap();
        let b = TsppdInstance::random("b", 5, 100.0, 7).unwrap();

        assert_eq!(a.dimension, 12);
        assert_eq!(a.cost_matrix, b.cost_matrix);
        assert!(TsppdInstance::random("bad", 5, 0.0, 7).is_err());
    }

    #[test]
    fn test_random_rejects_unbounded_grid() {
        assert!(TsppdInstance::random("inf", 2, f64::INFINITY, 1).is_err());
        assert!(TsppdInstance::random("nan", 2, f64::NAN, 1).is_err());
        assert!(TsppdInstance::random("neg", 2, -10.0, 1).is_err());
    }
}
