//! Exact linear sum assignment on rectangular cost matrices.

use crate::error::{MatchError, Result};
use crate::matcher::types::MatchIndices;
use ndarray::{Array2, ArrayView2, s};
use serde::{Deserialize, Serialize};

/// Algorithm used to solve each per-image assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Successive shortest augmenting paths with dual potentials, working on the
    /// rectangular matrix directly.
    #[default]
    ShortestAugmentingPath,
    /// Jonker-Volgenant from the `lapjv` crate on a square, padded copy.
    Lapjv,
}

/// Solves the assignment problem for one cost matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentSolver {
    kind: SolverKind,
}

impl AssignmentSolver {
    pub fn new(kind: SolverKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    /// Minimum-cost matching of the smaller side of `cost` into the larger side.
    ///
    /// Returns `min(rows, cols)` pairs with row indices ascending. An empty side
    /// yields an empty result without running the solver.
    pub fn solve(&self, cost: ArrayView2<'_, f32>) -> Result<MatchIndices> {
        let (num_rows, num_cols) = cost.dim();
        if num_rows == 0 || num_cols == 0 {
            return Ok(MatchIndices::default());
        }

        let host = to_host_f64(cost)?;
        let (rows, cols) = match self.kind {
            SolverKind::ShortestAugmentingPath => ShortestPath::new(host.view()).solve()?,
            SolverKind::Lapjv => lapjv_padded(&host)?,
        };
        debug_assert_eq!(rows.len(), num_rows.min(num_cols));
        Ok(MatchIndices::new(rows, cols))
    }
}

/// Solve with the default algorithm.
pub fn linear_sum_assignment(cost: ArrayView2<'_, f32>) -> Result<MatchIndices> {
    AssignmentSolver::default().solve(cost)
}

fn to_host_f64(cost: ArrayView2<'_, f32>) -> Result<Array2<f64>> {
    if let Some(((row, col), _)) = cost.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(MatchError::NonFiniteCost { row, col });
    }
    Ok(cost.mapv(f64::from))
}

/// Shortest augmenting path solver state.
///
/// Rows are assigned one at a time; each step runs Dijkstra on reduced costs
/// `cost[i][j] - u[i] - v[j]` to the nearest free column, then updates the
/// potentials so reduced costs on the matching stay zero. Requires rows <= cols,
/// wider matrices are handled by transposing.
struct ShortestPath<'a> {
    cost: ArrayView2<'a, f64>,
    transposed: bool,
    u: Vec<f64>,
    v: Vec<f64>,
    shortest: Vec<f64>,
    path: Vec<usize>,
    col4row: Vec<Option<usize>>,
    row4col: Vec<Option<usize>>,
    visited_rows: Vec<bool>,
    visited_cols: Vec<bool>,
    remaining: Vec<usize>,
}

impl<'a> ShortestPath<'a> {
    fn new(cost: ArrayView2<'a, f64>) -> Self {
        let transposed = cost.nrows() > cost.ncols();
        let cost = if transposed { cost.reversed_axes() } else { cost };
        let (nr, nc) = cost.dim();
        Self {
            cost,
            transposed,
            u: vec![0.0; nr],
            v: vec![0.0; nc],
            shortest: vec![f64::INFINITY; nc],
            path: vec![0; nc],
            col4row: vec![None; nr],
            row4col: vec![None; nc],
            visited_rows: vec![false; nr],
            visited_cols: vec![false; nc],
            remaining: vec![0; nc],
        }
    }

    fn solve(mut self) -> Result<(Vec<usize>, Vec<usize>)> {
        for cur_row in 0..self.cost.nrows() {
            let (sink, min_val) = self
                .augmenting_path(cur_row)
                .ok_or(MatchError::Infeasible)?;
            self.update_potentials(cur_row, min_val);
            self.augment(cur_row, sink)?;
        }

        let transposed = self.transposed;
        let mut pairs: Vec<(usize, usize)> = self
            .col4row
            .iter()
            .enumerate()
            .filter_map(|(i, col)| col.map(|j| if transposed { (j, i) } else { (i, j) }))
            .collect();
        pairs.sort_unstable();
        Ok(pairs.into_iter().unzip())
    }

    /// Returns the free column reached first and its path length, or `None` if
    /// every remaining column is unreachable.
    fn augmenting_path(&mut self, cur_row: usize) -> Option<(usize, f64)> {
        let nc = self.cost.ncols();
        let mut min_val = 0.0;
        let mut num_remaining = nc;

        // Scanned in reverse so ties resolve towards lower column indices.
        for (it, j) in self.remaining.iter_mut().enumerate() {
            *j = nc - it - 1;
        }
        self.visited_rows.fill(false);
        self.visited_cols.fill(false);
        self.shortest.fill(f64::INFINITY);

        let mut i = cur_row;
        loop {
            self.visited_rows[i] = true;

            let mut index = None;
            let mut lowest = f64::INFINITY;
            for it in 0..num_remaining {
                let j = self.remaining[it];
                let reduced = min_val + self.cost[[i, j]] - self.u[i] - self.v[j];
                if reduced < self.shortest[j] {
                    self.path[j] = i;
                    self.shortest[j] = reduced;
                }
                // Prefer free columns on ties.
                if self.shortest[j] < lowest
                    || (self.shortest[j] == lowest && self.row4col[j].is_none())
                {
                    lowest = self.shortest[j];
                    index = Some(it);
                }
            }

            min_val = lowest;
            if min_val == f64::INFINITY {
                return None;
            }
            let it = index?;
            let j = self.remaining[it];
            self.visited_cols[j] = true;
            num_remaining -= 1;
            self.remaining[it] = self.remaining[num_remaining];

            match self.row4col[j] {
                None => return Some((j, min_val)),
                Some(next) => i = next,
            }
        }
    }

    fn update_potentials(&mut self, cur_row: usize, min_val: f64) {
        self.u[cur_row] += min_val;
        for i in 0..self.u.len() {
            if i == cur_row || !self.visited_rows[i] {
                continue;
            }
            if let Some(j) = self.col4row[i] {
                self.u[i] += min_val - self.shortest[j];
            }
        }
        for j in 0..self.v.len() {
            if self.visited_cols[j] {
                self.v[j] -= min_val - self.shortest[j];
            }
        }
    }

    fn augment(&mut self, cur_row: usize, sink: usize) -> Result<()> {
        let mut j = sink;
        loop {
            let i = self.path[j];
            self.row4col[j] = Some(i);
            let prev = self.col4row[i].replace(j);
            if i == cur_row {
                return Ok(());
            }
            j = prev.ok_or(MatchError::Infeasible)?;
        }
    }
}

/// Run `lapjv` on a square matrix padded with the largest entry.
///
/// Every complete assignment pays for exactly `|rows - cols|` padding cells, so
/// the optimum restricted to real cells is unchanged.
fn lapjv_padded(cost: &Array2<f64>) -> Result<(Vec<usize>, Vec<usize>)> {
    let (num_rows, num_cols) = cost.dim();
    let size = num_rows.max(num_cols);
    let pad = cost.fold(f64::NEG_INFINITY, |m, &x| m.max(x));

    let mut padded = Array2::<f64>::from_elem((size, size), pad);
    padded.slice_mut(s![..num_rows, ..num_cols]).assign(cost);

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|err| MatchError::Solver(format!("{err:?}")))?;

    Ok(row_to_col
        .iter()
        .take(num_rows)
        .enumerate()
        .filter(|&(_, &col)| col < num_cols)
        .map(|(row, &col)| (row, col))
        .unzip())
}
