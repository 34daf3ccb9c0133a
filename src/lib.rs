//! TSPPD Assignment Bound Library
//!
//! An incremental primal-dual assignment problem engine, used as a lower
//! bound for the Traveling Salesman Problem with Pickup and Delivery (TSPPD).
//!
//! # Features
//!
//! - Hungarian-style primal-dual solver with arc forcing and forbidding
//! - Warm re-solves that repair only the rows touched by bound or cost changes
//! - Assignment relaxation of TSPPD instances with precedence-derived bounds
//! - Benchmarking of engine configurations over replayed search dives
//!
//! # Example
//!
//! ```no_run
//! use tsppd_ap::ap::{PrimalDualConfig, PrimalDualSolver};
//!
//! let costs = vec![vec![9, 2, 7], vec![6, 4, 3], vec![5, 8, 1]];
//! let mut solver = PrimalDualSolver::from_matrix(&costs, PrimalDualConfig::default()).unwrap();
//!
//! assert!(solver.solve());
//! println!("Bound: {}", solver.objective());
//!
//! // Forbid an arc and re-solve incrementally
//! solver.set_bounds(0, 1, false, false).unwrap();
//! assert!(solver.solve());
//! println!("Bound: {}", solver.objective());
//! ```

pub mod ap;
pub mod benchmark;
pub mod instance;
pub mod relaxation;

pub use ap::{ApError, ApSolution, AssignmentSolver, PrimalDualConfig, PrimalDualSolver};
pub use instance::TsppdInstance;
pub use relaxation::AssignmentRelaxation;
