use std::fmt::{self, Write as _};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest supported palette: one glyph and one terminal color per kind.
pub const MAX_PALETTE: u8 = 8;

const GLYPHS: [char; MAX_PALETTE as usize] = ['R', 'B', 'G', 'Y', 'P', 'O', 'C', 'M'];

/// A grid coordinate. Row 0 is the top of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True when `other` is an orthogonal neighbor of `self`.
    pub fn is_adjacent(self, other: Pos) -> bool {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        dr + dc == 1
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Index into the palette (0..palette size).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenKind(pub u8);

impl TokenKind {
    /// Single-character display form, used by both the CLI and TUI renderers.
    pub fn glyph(self) -> char {
        GLYPHS.get(self.0 as usize).copied().unwrap_or('?')
    }
}

/// Opaque token identity. Assigned monotonically, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenId(pub u32);

/// A single drop. Kind is fixed at creation; position is maintained by the
/// grid and always mirrors the cell the token currently occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    id: TokenId,
    kind: TokenKind,
    pos: Pos,
}

impl Token {
    pub fn id(&self) -> TokenId {
        self.id
    }
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
    pub fn pos(&self) -> Pos {
        self.pos
    }
}

/// Creates tokens with fresh ids and (optionally) random kinds drawn from a
/// fixed palette. Seed 0 seeds from entropy; any other value is reproducible.
pub struct TokenFactory {
    palette: u8,
    next_id: u32,
    rng: StdRng,
}

impl TokenFactory {
    pub fn new(palette: u8, seed: u64) -> Self {
        let rng = if seed == 0 {
            StdRng::seed_from_u64(rand::random())
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self { palette, next_id: 0, rng }
    }

    pub fn create(&mut self, pos: Pos, forced: Option<TokenKind>) -> Token {
        let kind = forced.unwrap_or_else(|| self.random_kind());
        let id = TokenId(self.next_id);
        self.next_id += 1;
        Token { id, kind, pos }
    }

    pub fn random_kind(&mut self) -> TokenKind {
        TokenKind(self.rng.gen_range(0..self.palette))
    }
}

/// Fixed-size matrix of optional tokens. Pure data plus accessors; no match
/// or cascade logic lives here.
///
/// Invariant: a non-empty cell's token carries the cell's own coordinates.
/// `set`, `take` and `swap` keep the matrix slot and the token position in
/// lockstep.
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Token>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, cells: vec![None; rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.row < self.rows && p.col < self.cols
    }

    fn idx(&self, p: Pos) -> usize {
        assert!(self.contains(p), "position {} out of bounds", p);
        p.row * self.cols + p.col
    }

    /// # Panics
    /// If `p` is out of bounds. Callers validate bounds first; an
    /// out-of-range access is a bug, not a recoverable case.
    pub fn get(&self, p: Pos) -> Option<&Token> {
        self.cells[self.idx(p)].as_ref()
    }

    pub fn kind_at(&self, p: Pos) -> Option<TokenKind> {
        self.get(p).map(|t| t.kind)
    }

    pub fn is_empty_cell(&self, p: Pos) -> bool {
        self.get(p).is_none()
    }

    /// Stores `token` at `p`, rewriting its position to match. `None` clears
    /// the cell.
    pub fn set(&mut self, p: Pos, token: Option<Token>) {
        let i = self.idx(p);
        self.cells[i] = token.map(|mut t| {
            t.pos = p;
            t
        });
    }

    /// Removes and returns the token at `p`, leaving the cell empty.
    pub fn take(&mut self, p: Pos) -> Option<Token> {
        let i = self.idx(p);
        self.cells[i].take()
    }

    /// Exchanges the contents of two cells and fixes up both positions.
    ///
    /// # Panics
    /// If either position is out of bounds or either cell is empty.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        let ia = self.idx(a);
        let ib = self.idx(b);
        assert!(
            self.cells[ia].is_some() && self.cells[ib].is_some(),
            "swap requires two occupied cells"
        );
        self.cells.swap(ia, ib);
        if let Some(t) = self.cells[ia].as_mut() {
            t.pos = a;
        }
        if let Some(t) = self.cells[ib].as_mut() {
            t.pos = b;
        }
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn render(&self, one_based: bool) -> String {
        let mut s = String::new();
        s.push_str("    ");
        for c in 0..self.cols {
            let label = if one_based { c + 1 } else { c };
            let _ = write!(s, "{:>2} ", label);
        }
        s.push('\n');
        s.push_str("   ");
        s.push_str(&"-".repeat(self.cols * 3 + 1));
        s.push('\n');
        for r in 0..self.rows {
            let row_label = if one_based { r + 1 } else { r };
            let _ = write!(s, "{:>2} | ", row_label);
            for c in 0..self.cols {
                let ch = match self.get(Pos::new(r, c)) {
                    Some(t) => t.kind.glyph(),
                    None => '.',
                };
                let _ = write!(s, "{}  ", ch);
            }
            s.push('\n');
        }
        s
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}
