use std::collections::VecDeque;

use crate::board::{Grid, Pos, TokenKind};

/// A maximal connected cluster of same-kind cells, seeded by straight runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchGroup {
    kind: TokenKind,
    cells: Vec<Pos>,
}

impl MatchGroup {
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Pos> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Deepest row the group reaches. Groups never being empty, these
    /// fold defaults are never hit.
    pub fn max_row(&self) -> usize {
        self.cells.iter().map(|p| p.row).max().unwrap_or(0)
    }

    pub fn min_col(&self) -> usize {
        self.cells.iter().map(|p| p.col).min().unwrap_or(0)
    }
}

/// Finds every match group on the board.
///
/// Two passes: straight-line runs of at least `min_match` equal kinds seed a
/// cell set, then connected components over the seeded cells (orthogonal
/// adjacency, equal kind, both seeded) become groups. A horizontal and a
/// vertical run of the same kind sharing a cell therefore merge into one
/// group. Empty cells break runs. Order of the returned groups is
/// unspecified; cells within a group are sorted by (row, col).
pub fn find_match_groups(grid: &Grid, min_match: usize) -> Vec<MatchGroup> {
    let rows = grid.rows();
    let cols = grid.cols();
    let mut seeded = vec![false; rows * cols];

    // Seed pass: horizontal runs.
    for r in 0..rows {
        mark_runs(grid, min_match, &mut seeded, (0..cols).map(|c| Pos::new(r, c)));
    }
    // Seed pass: vertical runs.
    for c in 0..cols {
        mark_runs(grid, min_match, &mut seeded, (0..rows).map(|r| Pos::new(r, c)));
    }

    // Component pass: flood fill over the seeded set, one group per
    // component. Visited state is scoped to this call.
    let mut visited = vec![false; rows * cols];
    let mut groups = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let start = Pos::new(r, c);
            let i = r * cols + c;
            if !seeded[i] || visited[i] {
                continue;
            }
            let Some(kind) = grid.kind_at(start) else {
                continue;
            };
            let mut cells = Vec::new();
            let mut queue = VecDeque::new();
            visited[i] = true;
            queue.push_back(start);
            while let Some(p) = queue.pop_front() {
                cells.push(p);
                for n in neighbors(p, rows, cols) {
                    let ni = n.row * cols + n.col;
                    if seeded[ni] && !visited[ni] && grid.kind_at(n) == Some(kind) {
                        visited[ni] = true;
                        queue.push_back(n);
                    }
                }
            }
            cells.sort_by_key(|p| (p.row, p.col));
            groups.push(MatchGroup { kind, cells });
        }
    }
    groups
}

fn mark_runs(
    grid: &Grid,
    min_match: usize,
    seeded: &mut [bool],
    line: impl Iterator<Item = Pos>,
) {
    let cols = grid.cols();
    let mut run: Vec<Pos> = Vec::new();
    let mut run_kind: Option<TokenKind> = None;

    let mut flush = |run: &mut Vec<Pos>, seeded: &mut [bool]| {
        if run.len() >= min_match {
            for p in run.iter() {
                seeded[p.row * cols + p.col] = true;
            }
        }
        run.clear();
    };

    for p in line {
        let kind = grid.kind_at(p);
        match (kind, run_kind) {
            (Some(k), Some(rk)) if k == rk => run.push(p),
            (Some(k), _) => {
                flush(&mut run, seeded);
                run_kind = Some(k);
                run.push(p);
            }
            (None, _) => {
                flush(&mut run, seeded);
                run_kind = None;
            }
        }
    }
    flush(&mut run, seeded);
}

fn neighbors(p: Pos, rows: usize, cols: usize) -> impl Iterator<Item = Pos> {
    let mut out = Vec::with_capacity(4);
    if p.row > 0 {
        out.push(Pos::new(p.row - 1, p.col));
    }
    if p.row + 1 < rows {
        out.push(Pos::new(p.row + 1, p.col));
    }
    if p.col > 0 {
        out.push(Pos::new(p.row, p.col - 1));
    }
    if p.col + 1 < cols {
        out.push(Pos::new(p.row, p.col + 1));
    }
    out.into_iter()
}
