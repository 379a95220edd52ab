//! Error types shared by the parser, board, and game tree.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::board::Point;

/// Result alias for file-level operations.
pub type Result<T> = std::result::Result<T, SgfError>;

/// What went wrong while reading SGF text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    /// Input ended inside a game tree, node, or property value.
    UnexpectedEndOfInput,
    /// A `(` or `)` is missing or misplaced.
    UnbalancedDelimiters,
    /// A property identifier without values, or stray text inside a node.
    MalformedProperty,
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatErrorKind::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            FormatErrorKind::UnbalancedDelimiters => write!(f, "unbalanced delimiters"),
            FormatErrorKind::MalformedProperty => write!(f, "malformed property"),
        }
    }
}

/// A parse failure with its location in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line} (byte {offset})")]
pub struct FormatError {
    pub kind: FormatErrorKind,
    /// Byte offset into the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
}

/// Result of attempting to place a stone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    /// Point is not empty
    #[error("point is occupied")]
    Occupied,
    /// Point is off the board
    #[error("point is off the board")]
    OutOfBounds,
}

/// Navigation requests that the current cursor state cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("no move has been played")]
    NoCurrentMove,
    #[error("there is no next move")]
    NoNextMove,
    #[error("there are no branches here")]
    NoBranches,
    #[error("branch {index} does not exist ({count} branches)")]
    BranchOutOfRange { index: usize, count: usize },
    #[error("the current move does not start a branch")]
    NotBranchStart,
    #[error("the branch cannot move further")]
    BranchAtEdge,
    #[error("nothing has been cut")]
    EmptyClipboard,
}

/// Failures of game tree operations. None of them leave the game modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("illegal move at {point:?}: {source}")]
    IllegalMove { point: Point, source: MoveError },

    #[error("illegal navigation: {0}")]
    IllegalNavigation(#[from] NavigationError),

    #[error("replay blocked by a stone at {point:?}")]
    ReplayBlocked { point: Point },

    #[error("all letters A through Z are already in use")]
    LettersExhausted,

    #[error("the current move marker cannot be added or removed directly")]
    UnsupportedAdornment,

    #[error("invalid property {id}[{value}]")]
    InvalidProperty { id: String, value: String },

    #[error("cannot paste a move of the same color as the current move")]
    PasteColorMismatch,

    #[error("the pasted move is already a continuation here")]
    PasteDuplicatesBranch,

    #[error("invalid game options: {0}")]
    InvalidOptions(String),
}

impl GameError {
    pub(crate) fn invalid_property(id: &str, value: &str) -> Self {
        GameError::InvalidProperty {
            id: id.to_string(),
            value: value.to_string(),
        }
    }
}

/// Errors from loading or saving game records.
#[derive(Debug, Error)]
pub enum SgfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("game error: {0}")]
    Game(#[from] GameError),
}
