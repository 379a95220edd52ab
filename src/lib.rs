//! sgfed: an editor engine for Go game records in SGF.
//!
//! This crate parses SGF into a lazily promoted game tree, applies Go
//! capture rules as a cursor moves through it, supports non-destructive
//! edits (marks, comments, cut and paste of variations, branch reordering),
//! lays the tree out on a grid for display and writes canonical SGF back.
//!
//! ## Modules
//!
//! - [`parser`] - SGF text to an arena of raw nodes
//! - [`board`] - Stones, captures, and coordinate names
//! - [`tree`] - Move arena, continuations, and detached subtrees
//! - [`adornments`] - Squares, triangles, letters, and the current-move marker
//! - [`game`] - The game tree with its cursor and edit operations
//! - [`path`] - Branch-index paths to positions
//! - [`layout`] - Grid layout of the variation tree
//! - [`writer`] - Canonical and color-flipped SGF output
//! - [`events`] - Notifications for the host
//! - [`playout`] - Random game generation
//! - [`shell`] - Line command shell
//!
//! ## Example
//!
//! ```
//! use sgfed::game::Game;
//! use sgfed::parser::parse;
//!
//! let parsed = parse("(;SZ[9];B[cc];W[gg])").unwrap();
//! let mut game = Game::from_parsed(parsed).unwrap();
//!
//! // Recorded moves are read on the way through.
//! game.goto_last_move().unwrap();
//! assert_eq!(game.status().move_number, 2);
//!
//! // Try a different reply for white.
//! game.unwind_move().unwrap();
//! game.make_move((4, 4)).unwrap();
//! assert!(game.to_sgf().contains("(;W[gg])\n(;W[ee])"));
//! ```

pub mod adornments;
pub mod board;
pub mod constants;
pub mod error;
pub mod events;
pub mod game;
pub mod layout;
pub mod parser;
pub mod path;
pub mod playout;
pub mod shell;
pub mod tree;
pub mod writer;
