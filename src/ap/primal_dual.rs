//! Primal-dual assignment engine with warm starts.
//!
//! The engine follows the classic Hungarian scheme in three steps:
//! - Phase 1 seeds column duals with column minima and greedily matches rows.
//! - Phase 2 gives every unmatched row a dual price and tries short
//!   (length 1 or 2) augmentations on zero reduced-cost arcs.
//! - The main loop grows one shortest augmenting path per unmatched row,
//!   adjusting duals whenever no tight column is left to reach.
//!
//! Initialization only runs on the first solve. Afterwards bound changes
//! release the matches they invalidate, and the next solve only augments the
//! released rows.

use serde::{Deserialize, Serialize};

use super::{ApError, AssignmentSolver, Cost, FORBIDDEN_COST, MAX_ARC_COST, MAX_DIMENSION};

/// Where phase 2 resumes the displacement scan of a row after probing it.
///
/// Both policies produce the same optimum; they only change how much work
/// phase 2 does before the main search takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResumePolicy {
    /// Never rescan a probed row (`p[r] = n`).
    #[default]
    ScanToEnd,
    /// Resume right after the last probed column (`p[r] = k + 1`).
    AfterProbe,
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimalDualConfig {
    /// Phase 2 resumption pointer update
    pub resume_policy: ResumePolicy,
    /// Reuse duals and matching between solves. When false every solve
    /// starts from an empty state.
    pub warm_start: bool,
}

impl Default for PrimalDualConfig {
    fn default() -> Self {
        PrimalDualConfig {
            resume_policy: ResumePolicy::ScanToEnd,
            warm_start: true,
        }
    }
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No solve has run yet.
    Uninitialized,
    /// Every row is matched on an allowed arc.
    Consistent,
    /// Some rows have no usable match: they lost it to a bound or cost
    /// change, or the last solve could only match them on a blocked arc.
    Dirty { rows: usize },
}

/// Work counters accumulated over the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Calls to `solve`
    pub solves: usize,
    /// Augmenting paths applied by the main search
    pub augmentations: usize,
    /// Dual adjustments performed inside path searches
    pub dual_updates: usize,
    /// Matches released by cost or bound changes
    pub released_matches: usize,
}

/// Scratch space of one shortest augmenting path search.
#[derive(Debug, Clone, Default)]
struct PathScratch {
    /// Rows reached so far, in reaching order.
    reached_rows: Vec<usize>,
    unreached: Vec<bool>,
    unreached_count: usize,
    /// Best reduced cost seen for each column, and the row achieving it.
    slack: Vec<Cost>,
    slack_from: Vec<usize>,
}

impl PathScratch {
    fn new(size: usize) -> Self {
        PathScratch {
            reached_rows: Vec::with_capacity(size),
            unreached: vec![true; size],
            unreached_count: size,
            slack: vec![Cost::MAX; size],
            slack_from: vec![0; size],
        }
    }

    fn reset(&mut self, root: usize) {
        self.reached_rows.clear();
        self.reached_rows.push(root);
        self.unreached.fill(true);
        self.unreached_count = self.unreached.len();
        self.slack.fill(Cost::MAX);
    }

    fn first_tight(&self) -> Option<usize> {
        (0..self.slack.len()).find(|&col| self.unreached[col] && self.slack[col] == 0)
    }

    fn min_unreached_slack(&self) -> Option<Cost> {
        (0..self.slack.len())
            .filter(|&col| self.unreached[col])
            .map(|col| self.slack[col])
            .min()
    }

    fn reach(&mut self, col: usize, row: usize) {
        self.unreached[col] = false;
        self.unreached_count -= 1;
        self.reached_rows.push(row);
    }
}

/// Dense primal-dual solver for the balanced assignment problem.
///
/// All matrices are stored row-major in flat vectors. The engine is a plain
/// value: cloning it gives an independent copy, which is how parallel search
/// workers are expected to use it.
#[derive(Debug, Clone)]
pub struct PrimalDualSolver {
    size: usize,
    config: PrimalDualConfig,
    /// Costs as set by the caller.
    base_cost: Vec<Cost>,
    /// Costs seen by the algorithm, with blocked arcs at `FORBIDDEN_COST`.
    cost: Vec<Cost>,
    lower: Vec<bool>,
    upper: Vec<bool>,
    forced_in_row: Vec<usize>,
    forced_in_col: Vec<usize>,
    u: Vec<Cost>,
    v: Vec<Cost>,
    row_match: Vec<Option<usize>>,
    col_match: Vec<Option<usize>>,
    /// Phase 2 resumption pointer per row.
    resume: Vec<usize>,
    scratch: PathScratch,
    z: Cost,
    initialized: bool,
    stats: SolverStats,
}

impl PrimalDualSolver {
    /// Create an engine for a `size x size` problem with the default configuration.
    pub fn new(size: usize) -> Result<Self, ApError> {
        Self::with_config(size, PrimalDualConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(size: usize, config: PrimalDualConfig) -> Result<Self, ApError> {
        if size > MAX_DIMENSION {
            return Err(ApError::DimensionTooLarge { size, max: MAX_DIMENSION });
        }

        let arcs = size * size;
        Ok(PrimalDualSolver {
            size,
            config,
            base_cost: vec![0; arcs],
            cost: vec![0; arcs],
            lower: vec![false; arcs],
            upper: vec![true; arcs],
            forced_in_row: vec![0; size],
            forced_in_col: vec![0; size],
            u: vec![0; size],
            v: vec![0; size],
            row_match: vec![None; size],
            col_match: vec![None; size],
            resume: vec![0; size],
            scratch: PathScratch::new(size),
            z: 0,
            initialized: false,
            stats: SolverStats::default(),
        })
    }

    /// Create an engine from a square cost matrix.
    pub fn from_matrix(costs: &[Vec<Cost>], config: PrimalDualConfig) -> Result<Self, ApError> {
        let size = costs.len();
        let mut solver = Self::with_config(size, config)?;
        for (row, line) in costs.iter().enumerate() {
            if line.len() != size {
                return Err(ApError::RowLength { row, len: line.len(), size });
            }
            for (col, &cost) in line.iter().enumerate() {
                solver.set_obj(row, col, cost)?;
            }
        }
        Ok(solver)
    }

    /// Number of rows (and columns)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn config(&self) -> &PrimalDualConfig {
        &self.config
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        if !self.initialized {
            return EngineState::Uninitialized;
        }
        let rows = (0..self.size)
            .filter(|&row| match self.row_match[row] {
                Some(col) => self.cost[self.index(row, col)] >= FORBIDDEN_COST,
                None => true,
            })
            .count();
        match rows {
            0 => EngineState::Consistent,
            rows => EngineState::Dirty { rows },
        }
    }

    /// Set the cost of arc `(row, col)`.
    ///
    /// After the first solve, a lower cost may break dual feasibility; the row
    /// dual is then lowered and a conflicting match of the row released.
    pub fn set_obj(&mut self, row: usize, col: usize, cost: Cost) -> Result<(), ApError> {
        let index = self.checked_index(row, col)?;
        if !(0..=MAX_ARC_COST).contains(&cost) {
            return Err(ApError::CostOutOfRange { row, col, cost, max: MAX_ARC_COST });
        }

        self.base_cost[index] = cost;
        self.refresh_arc(row, col);
        Ok(())
    }

    /// Set the bounds of arc `(row, col)`.
    ///
    /// `allow = false` forbids the arc. `force_in = true` forces it, which
    /// blocks every other arc of the same row and column; two forced arcs
    /// sharing a row or a column block each other and make the problem
    /// infeasible. Matches on arcs that become blocked are released.
    pub fn set_bounds(&mut self, row: usize, col: usize, force_in: bool, allow: bool) -> Result<(), ApError> {
        let index = self.checked_index(row, col)?;
        let was_forced = self.lower[index];
        self.lower[index] = force_in;
        self.upper[index] = allow;

        if was_forced == force_in {
            self.refresh_arc(row, col);
            return Ok(());
        }

        if force_in {
            self.forced_in_row[row] += 1;
            self.forced_in_col[col] += 1;
        } else {
            self.forced_in_row[row] -= 1;
            self.forced_in_col[col] -= 1;
        }

        for other in 0..self.size {
            self.refresh_arc(row, other);
            self.refresh_arc(other, col);
        }
        Ok(())
    }

    /// Solve, reporting why no feasible assignment exists on failure.
    ///
    /// Returns the objective, the sum of all dual prices, which equals the
    /// cost of the optimal assignment.
    pub fn try_solve(&mut self) -> Result<Cost, ApError> {
        if !self.config.warm_start {
            self.reset();
        }
        if !self.initialized {
            self.initialize();
        }
        self.stats.solves += 1;

        let searched = self.augment_unmatched();
        self.recenter_duals();
        searched?;

        self.z = self.u.iter().sum::<Cost>() + self.v.iter().sum::<Cost>();
        if (0..FORBIDDEN_COST).contains(&self.z) {
            Ok(self.z)
        } else {
            Err(ApError::Infeasible { objective: self.z })
        }
    }

    /// Solve under the current bounds.
    ///
    /// Returns false when no assignment avoids every forbidden arc.
    pub fn solve(&mut self) -> bool {
        match self.try_solve() {
            Ok(_) => true,
            Err(err) => {
                log::debug!("Assignment solve failed: {}", err);
                false
            }
        }
    }

    /// Objective of the last solve.
    pub fn objective(&self) -> Cost {
        self.z
    }

    pub fn is_assigned(&self, row: usize, col: usize) -> bool {
        self.row_match[row] == Some(col)
    }

    /// Column currently matched to `row`
    pub fn matched_col(&self, row: usize) -> Option<usize> {
        self.row_match[row]
    }

    /// Row currently matched to `col`
    pub fn matched_row(&self, col: usize) -> Option<usize> {
        self.col_match[col]
    }

    /// Matched `(row, col)` pairs in row order
    pub fn assignment(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_match
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|col| (row, col)))
    }

    pub fn reduced_cost(&self, row: usize, col: usize) -> Cost {
        self.cost[self.index(row, col)] - self.u[row] - self.v[col]
    }

    pub fn dual_row(&self, row: usize) -> Cost {
        self.u[row]
    }

    pub fn dual_col(&self, col: usize) -> Cost {
        self.v[col]
    }

    pub fn lower_bound(&self, row: usize, col: usize) -> bool {
        self.lower[self.index(row, col)]
    }

    pub fn upper_bound(&self, row: usize, col: usize) -> bool {
        self.upper[self.index(row, col)]
    }

    /// Cost set by the caller, ignoring bounds
    pub fn base_cost(&self, row: usize, col: usize) -> Cost {
        self.base_cost[self.index(row, col)]
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    fn checked_index(&self, row: usize, col: usize) -> Result<usize, ApError> {
        if row >= self.size || col >= self.size {
            return Err(ApError::ArcOutOfRange { row, col, size: self.size });
        }
        Ok(self.index(row, col))
    }

    /// Cost of an arc under the current bounds.
    fn effective_cost(&self, row: usize, col: usize) -> Cost {
        let index = self.index(row, col);
        let own = usize::from(self.lower[index]);
        let blocked = !self.upper[index]
            || self.forced_in_row[row] > own
            || self.forced_in_col[col] > own;

        if blocked {
            FORBIDDEN_COST
        } else {
            self.base_cost[index]
        }
    }

    /// Recompute the cost of an arc and repair duals and matching.
    ///
    /// A higher cost only invalidates the arc's own match. A lower cost may
    /// turn the reduced cost negative: the row dual absorbs the difference,
    /// which releases the row's match unless it is this arc.
    fn refresh_arc(&mut self, row: usize, col: usize) {
        let index = self.index(row, col);
        let cost = self.effective_cost(row, col);
        let previous = std::mem::replace(&mut self.cost[index], cost);
        if !self.initialized || cost == previous {
            return;
        }

        if cost > previous {
            if self.row_match[row] == Some(col) {
                self.release(row, col);
            }
            return;
        }

        let reduced = self.reduced_cost(row, col);
        if reduced < 0 {
            self.u[row] += reduced;
            let matched = self.row_match[row];
            if let Some(other) = matched.filter(|&other| other != col) {
                self.release(row, other);
            }
        }
    }

    fn augment_unmatched(&mut self) -> Result<(), ApError> {
        for row in 0..self.size {
            if self.row_match[row].is_none() {
                let col = self.shortest_path(row)?;
                self.augment(row, col);
            }
        }
        Ok(())
    }

    /// Shift prices so the smallest column dual is zero.
    ///
    /// Reduced costs and the objective are unchanged. With a complete
    /// matching every dual then lies within `[-FORBIDDEN_COST, FORBIDDEN_COST]`,
    /// however many solves the engine has gone through.
    fn recenter_duals(&mut self) {
        let Some(shift) = self.v.iter().copied().min() else {
            return;
        };
        if shift == 0 {
            return;
        }
        self.v.iter_mut().for_each(|v| *v -= shift);
        self.u.iter_mut().for_each(|u| *u += shift);
    }

    fn release(&mut self, row: usize, col: usize) {
        self.row_match[row] = None;
        self.col_match[col] = None;
        self.stats.released_matches += 1;
        log::debug!("Released match ({}, {})", row, col);
    }

    fn reset(&mut self) {
        self.u.fill(0);
        self.v.fill(0);
        self.row_match.fill(None);
        self.col_match.fill(None);
        self.resume.fill(0);
        self.initialized = false;
    }

    fn initialize(&mut self) {
        self.seed_columns();
        self.repair_rows();
        self.initialized = true;

        log::debug!(
            "Initialized {}x{} assignment: {} rows matched before path search",
            self.size,
            self.size,
            self.assignment().count()
        );
    }

    /// Phase 1: column minima as column duals, greedy matching.
    ///
    /// Among the cheapest rows of a column, a forced row is preferred, then an
    /// unmatched one.
    fn seed_columns(&mut self) {
        for col in 0..self.size {
            let best = (0..self.size).min_by_key(|&row| {
                let index = self.index(row, col);
                (self.cost[index], !self.lower[index], self.row_match[row].is_some())
            });
            let Some(row) = best else {
                continue;
            };

            self.v[col] = self.cost[self.index(row, col)];
            if self.row_match[row].is_none() {
                self.row_match[row] = Some(col);
                self.col_match[col] = Some(row);
                self.u[row] = 0;
                self.resume[row] = col + 1;
            }
        }
    }

    /// Phase 2: price unmatched rows and try length-2 augmentations.
    fn repair_rows(&mut self) {
        let n = self.size;
        for row in 0..n {
            if self.row_match[row].is_some() {
                continue;
            }

            let cheapest = (0..n).min_by_key(|&col| {
                let index = self.index(row, col);
                (self.cost[index] - self.v[col], !self.lower[index], self.col_match[col].is_some())
            });
            let Some(mut col) = cheapest else {
                continue;
            };
            self.u[row] = self.cost[self.index(row, col)] - self.v[col];

            let mut assigned = self.col_match[col].is_none();
            while !assigned && col < n {
                if self.reduced_cost(row, col) == 0 {
                    let partner = self.col_match[col];
                    match partner {
                        None => assigned = true,
                        Some(partner) => assigned = self.displace(partner),
                    }
                }
                if !assigned {
                    col += 1;
                }
            }

            if assigned {
                self.row_match[row] = Some(col);
                self.col_match[col] = Some(row);
                self.resume[row] = col + 1;
            }
        }
    }

    /// Move `row` to an unmatched zero reduced-cost column, scanning from its
    /// resumption pointer. The column it leaves is still marked as its own;
    /// the caller takes it over on success.
    fn displace(&mut self, row: usize) -> bool {
        let n = self.size;
        let mut col = self.resume[row];
        let mut moved = false;
        while col < n {
            if self.col_match[col].is_none() && self.reduced_cost(row, col) == 0 {
                self.row_match[row] = Some(col);
                self.col_match[col] = Some(row);
                moved = true;
                break;
            }
            col += 1;
        }

        self.resume[row] = match self.config.resume_policy {
            ResumePolicy::ScanToEnd => n,
            ResumePolicy::AfterProbe => col + 1,
        };
        moved
    }

    /// Grow a shortest augmenting path from the unmatched `root` row and
    /// return the unmatched column it ends at.
    fn shortest_path(&mut self, root: usize) -> Result<usize, ApError> {
        let n = self.size;
        let Self { cost, u, v, col_match, scratch, stats, .. } = self;
        scratch.reset(root);

        let mut row = root;
        loop {
            if scratch.unreached_count == 0 {
                return Err(ApError::NoAugmentingPath { row: root });
            }

            let costs = &cost[row * n..(row + 1) * n];
            for col in 0..n {
                if !scratch.unreached[col] {
                    continue;
                }
                let slack = costs[col] - u[row] - v[col];
                if slack < scratch.slack[col] {
                    scratch.slack[col] = slack;
                    scratch.slack_from[col] = row;
                }
            }

            let col = match scratch.first_tight() {
                Some(col) => col,
                None => {
                    let delta = scratch
                        .min_unreached_slack()
                        .ok_or(ApError::NoAugmentingPath { row: root })?;
                    for &reached in &scratch.reached_rows {
                        u[reached] += delta;
                    }
                    for col in 0..n {
                        if scratch.unreached[col] {
                            scratch.slack[col] -= delta;
                        } else {
                            v[col] -= delta;
                        }
                    }
                    stats.dual_updates += 1;
                    scratch
                        .first_tight()
                        .ok_or(ApError::NoAugmentingPath { row: root })?
                }
            };

            match col_match[col] {
                Some(next) => {
                    scratch.reach(col, next);
                    row = next;
                }
                None => return Ok(col),
            }
        }
    }

    /// Flip the path ending at `end` back to `root`.
    fn augment(&mut self, root: usize, end: usize) {
        let mut col = end;
        loop {
            let row = self.scratch.slack_from[col];
            self.col_match[col] = Some(row);
            let previous = self.row_match[row].replace(col);
            if row == root {
                break;
            }
            // Every row on the path except the root was matched.
            match previous {
                Some(next) => col = next,
                None => break,
            }
        }

        self.stats.augmentations += 1;
        log::trace!("Augmented row {} to column {}", root, end);
    }
}

impl AssignmentSolver for PrimalDualSolver {
    fn size(&self) -> usize {
        self.size
    }

    fn set_obj(&mut self, row: usize, col: usize, cost: Cost) -> Result<(), ApError> {
        PrimalDualSolver::set_obj(self, row, col, cost)
    }

    fn set_bounds(&mut self, row: usize, col: usize, force_in: bool, allow: bool) -> Result<(), ApError> {
        PrimalDualSolver::set_bounds(self, row, col, force_in, allow)
    }

    fn solve(&mut self) -> bool {
        PrimalDualSolver::solve(self)
    }

    fn objective(&self) -> Cost {
        self.z
    }

    fn is_assigned(&self, row: usize, col: usize) -> bool {
        PrimalDualSolver::is_assigned(self, row, col)
    }

    fn reduced_cost(&self, row: usize, col: usize) -> Cost {
        PrimalDualSolver::reduced_cost(self, row, col)
    }

    fn dual_row(&self, row: usize) -> Cost {
        self.u[row]
    }

    fn dual_col(&self, col: usize) -> Cost {
        self.v[col]
    }

    fn lower_bound(&self, row: usize, col: usize) -> bool {
        PrimalDualSolver::lower_bound(self, row, col)
    }

    fn upper_bound(&self, row: usize, col: usize) -> bool {
        PrimalDualSolver::upper_bound(self, row, col)
    }
}
