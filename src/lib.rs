pub mod board;
pub mod engine;
pub mod matcher;
pub mod tui;

pub use board::{Grid, Pos, Token, TokenFactory, TokenId, TokenKind, MAX_PALETTE};
pub use engine::{BoardConfig, BoardError, BoardEvent, Engine, EnginePhase, SwapOutcome};
pub use matcher::{find_match_groups, MatchGroup};
