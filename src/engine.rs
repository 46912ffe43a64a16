use std::collections::VecDeque;
use std::mem;

use thiserror::Error;

use crate::board::{Grid, Pos, Token, TokenFactory, TokenId, TokenKind, MAX_PALETTE};
use crate::matcher::{find_match_groups, MatchGroup};

/// Board parameters, fixed at construction. Seed 0 draws a fresh seed from
/// entropy; any other value makes the whole session reproducible.
#[derive(Clone, Copy, Debug)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    pub palette: u8,
    pub min_match: usize,
    pub seed: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { rows: 5, cols: 6, palette: 6, min_match: 3, seed: 0 }
    }
}

impl BoardConfig {
    fn validate(&self) -> Result<(), BoardError> {
        if self.palette < 3 {
            return Err(BoardError::PaletteTooSmall(self.palette));
        }
        if self.palette > MAX_PALETTE {
            return Err(BoardError::PaletteTooLarge(self.palette));
        }
        if self.min_match < 2 {
            return Err(BoardError::MinMatchTooShort(self.min_match));
        }
        if self.rows == 0 || self.cols == 0 || self.rows.max(self.cols) < self.min_match {
            return Err(BoardError::BoardTooSmall {
                rows: self.rows,
                cols: self.cols,
                min_match: self.min_match,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("palette must have at least 3 kinds (got {0})")]
    PaletteTooSmall(u8),
    #[error("palette must have at most 8 kinds (got {0})")]
    PaletteTooLarge(u8),
    #[error("minimum match length must be at least 2 (got {0})")]
    MinMatchTooShort(usize),
    #[error("a {rows}x{cols} board cannot fit a match of length {min_match}")]
    BoardTooSmall { rows: usize, cols: usize, min_match: usize },
    #[error("position {0} is out of bounds")]
    OutOfBounds(Pos),
    #[error("cannot swap a cell with itself")]
    SwapWithSelf,
    #[error("cell {0} is empty")]
    EmptyCell(Pos),
    #[error("cells {0} and {1} are not orthogonally adjacent")]
    NotAdjacent(Pos, Pos),
    #[error("layout does not match the board configuration")]
    LayoutMismatch,
    #[error("a swap is already being resolved")]
    Busy,
}

/// Result of a swap request. A rejected swap is a normal outcome, not an
/// error: the grid has already been restored when it is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    Accepted { groups: usize },
    Rejected,
}

/// Everything the presentation layer needs to render a cascade. Events
/// describe what changed; the grid itself stays authoritative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    TokenSpawned { token: Token },
    TokenMoved { id: TokenId, from: Pos, to: Pos },
    GroupMatched { kind: TokenKind, cells: Vec<Pos>, combo: u32 },
    CascadeSettled { combos: u32 },
}

/// Externally visible engine state. Exactly one swap/cascade is in flight
/// at a time; requests arriving while busy are rejected, never queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    SwapInFlight,
    CascadeResolving,
}

enum State {
    Idle,
    /// Swap committed, detected groups waiting for the first step.
    SwapInFlight { groups: Vec<MatchGroup> },
    /// Mid-cascade. `stable` is set once a refill produced no new groups.
    Resolving { queue: VecDeque<MatchGroup>, combos: u32, stable: bool },
}

/// The board state machine: owns the grid, the token factory and the
/// cascade/phase protocol. The presentation layer is the driver: it calls
/// `request_swap`, then paces `step` however it likes.
pub struct Engine {
    config: BoardConfig,
    grid: Grid,
    factory: TokenFactory,
    state: State,
    last_combos: u32,
}

impl Engine {
    /// Builds a fully populated board with no pre-existing matches.
    ///
    /// The initial deal re-rolls matched tokens in place rather than running
    /// gravity, so the opening board is a plain uniform draw conditioned on
    /// being match-free.
    pub fn new(config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        let mut factory = TokenFactory::new(config.palette, config.seed);
        let mut grid = Grid::new(config.rows, config.cols);
        for r in 0..config.rows {
            for c in 0..config.cols {
                let p = Pos::new(r, c);
                let t = factory.create(p, None);
                grid.set(p, Some(t));
            }
        }
        loop {
            let groups = find_match_groups(&grid, config.min_match);
            if groups.is_empty() {
                break;
            }
            for g in &groups {
                for &p in g.cells() {
                    let t = factory.create(p, None);
                    grid.set(p, Some(t));
                }
            }
        }
        Ok(Self { config, grid, factory, state: State::Idle, last_combos: 0 })
    }

    /// Builds an engine over an explicit kind layout (one row of palette
    /// indices per board row). The layout is taken as-is: pre-existing
    /// matches are kept, which is what replay and test setups want.
    pub fn from_kinds(config: BoardConfig, kinds: &[Vec<u8>]) -> Result<Self, BoardError> {
        config.validate()?;
        if kinds.len() != config.rows || kinds.iter().any(|row| row.len() != config.cols) {
            return Err(BoardError::LayoutMismatch);
        }
        if kinds.iter().flatten().any(|&k| k >= config.palette) {
            return Err(BoardError::LayoutMismatch);
        }
        let mut factory = TokenFactory::new(config.palette, config.seed);
        let mut grid = Grid::new(config.rows, config.cols);
        for (r, row) in kinds.iter().enumerate() {
            for (c, &k) in row.iter().enumerate() {
                let p = Pos::new(r, c);
                let t = factory.create(p, Some(TokenKind(k)));
                grid.set(p, Some(t));
            }
        }
        Ok(Self { config, grid, factory, state: State::Idle, last_combos: 0 })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn phase(&self) -> EnginePhase {
        match self.state {
            State::Idle => EnginePhase::Idle,
            State::SwapInFlight { .. } => EnginePhase::SwapInFlight,
            State::Resolving { .. } => EnginePhase::CascadeResolving,
        }
    }

    /// Combo count of the cascade in progress, or of the last settled one
    /// when idle.
    pub fn combo_count(&self) -> u32 {
        match &self.state {
            State::Resolving { combos, .. } => *combos,
            State::SwapInFlight { .. } => 0,
            State::Idle => self.last_combos,
        }
    }

    /// Attempts to swap two adjacent cells. Check-then-commit: the swap
    /// stands only if it produces at least one match group, otherwise it is
    /// reverted before returning and the call has no observable net effect.
    ///
    /// Precondition violations (out of bounds, self-swap, empty cell,
    /// non-adjacent pair, engine busy) are errors and never mutate the grid.
    pub fn request_swap(&mut self, a: Pos, b: Pos) -> Result<SwapOutcome, BoardError> {
        if !matches!(self.state, State::Idle) {
            return Err(BoardError::Busy);
        }
        if !self.grid.contains(a) {
            return Err(BoardError::OutOfBounds(a));
        }
        if !self.grid.contains(b) {
            return Err(BoardError::OutOfBounds(b));
        }
        if a == b {
            return Err(BoardError::SwapWithSelf);
        }
        if self.grid.is_empty_cell(a) {
            return Err(BoardError::EmptyCell(a));
        }
        if self.grid.is_empty_cell(b) {
            return Err(BoardError::EmptyCell(b));
        }
        if !a.is_adjacent(b) {
            return Err(BoardError::NotAdjacent(a, b));
        }

        self.grid.swap(a, b);
        let groups = find_match_groups(&self.grid, self.config.min_match);
        if groups.is_empty() {
            self.grid.swap(a, b);
            return Ok(SwapOutcome::Rejected);
        }
        let n = groups.len();
        self.state = State::SwapInFlight { groups };
        Ok(SwapOutcome::Accepted { groups: n })
    }

    /// Advances the cascade by one externally visible action and returns its
    /// events: one group removal, one compaction+refill, or the final
    /// settle. Returns no events when the engine is idle.
    ///
    /// Pacing lives entirely in the caller; stepping as fast as possible is
    /// equivalent to `resolve`.
    pub fn step(&mut self) -> Vec<BoardEvent> {
        match mem::replace(&mut self.state, State::Idle) {
            State::Idle => Vec::new(),
            State::SwapInFlight { groups } => {
                self.state = State::Resolving {
                    queue: order_groups(groups),
                    combos: 0,
                    stable: false,
                };
                self.step()
            }
            State::Resolving { mut queue, combos, stable } => {
                if let Some(group) = queue.pop_front() {
                    let combo = combos + 1;
                    for &p in group.cells() {
                        self.grid.take(p);
                    }
                    self.state = State::Resolving { queue, combos: combo, stable };
                    vec![BoardEvent::GroupMatched {
                        kind: group.kind(),
                        cells: group.into_cells(),
                        combo,
                    }]
                } else if !stable {
                    let events = self.settle_columns();
                    let next = find_match_groups(&self.grid, self.config.min_match);
                    let stable = next.is_empty();
                    self.state = State::Resolving {
                        queue: order_groups(next),
                        combos,
                        stable,
                    };
                    events
                } else {
                    self.last_combos = combos;
                    self.state = State::Idle;
                    vec![BoardEvent::CascadeSettled { combos }]
                }
            }
        }
    }

    /// Drains `step` until the cascade settles. Returns the total combo
    /// count and every event in order. No-op on an idle engine.
    pub fn resolve(&mut self) -> (u32, Vec<BoardEvent>) {
        let mut events = Vec::new();
        let mut combos = 0;
        loop {
            let batch = self.step();
            if batch.is_empty() {
                break;
            }
            let done = batch.iter().any(|e| {
                if let BoardEvent::CascadeSettled { combos: n } = e {
                    combos = *n;
                    true
                } else {
                    false
                }
            });
            events.extend(batch);
            if done {
                break;
            }
        }
        (combos, events)
    }

    /// Gravity compaction and refill, per column: survivors slide down
    /// preserving their relative order, then every remaining hole gets a
    /// fresh token, conceptually falling in from above the board.
    fn settle_columns(&mut self) -> Vec<BoardEvent> {
        let rows = self.grid.rows();
        let mut events = Vec::new();
        for col in 0..self.grid.cols() {
            let survivors: Vec<Token> = (0..rows)
                .filter_map(|row| self.grid.take(Pos::new(row, col)))
                .collect();
            let gap = rows - survivors.len();
            for (i, t) in survivors.into_iter().enumerate() {
                let from = t.pos();
                let to = Pos::new(gap + i, col);
                self.grid.set(to, Some(t));
                if from != to {
                    events.push(BoardEvent::TokenMoved { id: t.id(), from, to });
                }
            }
            for row in 0..gap {
                let p = Pos::new(row, col);
                let t = self.factory.create(p, None);
                self.grid.set(p, Some(t));
                events.push(BoardEvent::TokenSpawned { token: t });
            }
        }
        events
    }
}

/// Removal order within one detection pass: deepest group first (largest max
/// row), leftmost first on ties. Affects only the visible sequencing of
/// removals, never the final board.
fn order_groups(mut groups: Vec<MatchGroup>) -> VecDeque<MatchGroup> {
    groups.sort_by(|a, b| {
        b.max_row()
            .cmp(&a.max_row())
            .then(a.min_col().cmp(&b.min_col()))
    });
    groups.into()
}
