//! Brute-force assignment used to cross-check the engine in tests.

use super::Cost;

/// Cheapest permutation that uses every forced arc and no forbidden arc.
///
/// `lower[i][j]` forces an arc, `!upper[i][j]` forbids it. Returns `None`
/// when no permutation satisfies the bounds.
pub(crate) fn best_assignment(
    costs: &[Vec<Cost>],
    lower: &[Vec<bool>],
    upper: &[Vec<bool>],
) -> Option<Cost> {
    let n = costs.len();
    let mut used = vec![false; n];
    search(0, costs, lower, upper, &mut used)
}

fn search(
    row: usize,
    costs: &[Vec<Cost>],
    lower: &[Vec<bool>],
    upper: &[Vec<bool>],
    used: &mut [bool],
) -> Option<Cost> {
    let n = costs.len();
    if row == n {
        return Some(0);
    }

    let mut best: Option<Cost> = None;
    for col in 0..n {
        if used[col] || !upper[row][col] {
            continue;
        }
        // Any other forced arc in this row or column rules (row, col) out.
        let row_conflict = (0..n).any(|k| k != col && lower[row][k]);
        let col_conflict = (0..n).any(|k| k != row && lower[k][col]);
        if row_conflict || col_conflict {
            continue;
        }

        used[col] = true;
        if let Some(rest) = search(row + 1, costs, lower, upper, used) {
            let total = costs[row][col] + rest;
            best = Some(best.map_or(total, |b| b.min(total)));
        }
        used[col] = false;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_unconstrained() {
        let costs = vec![vec![4, 2, 8], vec![4, 3, 7], vec![3, 1, 6]];
        let lower = vec![vec![false; 3]; 3];
        let upper = vec![vec![true; 3]; 3];
        assert_eq!(best_assignment(&costs, &lower, &upper), Some(12));
    }

    #[test]
    fn test_reference_conflicting_forced_arcs() {
        let costs = vec![vec![1, 1], vec![1, 1]];
        let mut lower = vec![vec![false; 2]; 2];
        lower[0][0] = true;
        lower[1][0] = true;
        let upper = vec![vec![true; 2]; 2];
        assert_eq!(best_assignment(&costs, &lower, &upper), None);
    }
}
