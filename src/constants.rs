//! Constants for board dimensions, game defaults, and SGF output.
//!
//! Board size is chosen per game at runtime, bounded by what the SGF point
//! encoding can express (letters `a`..`y` address 25 lines).

// =============================================================================
// Board Geometry
// =============================================================================

/// Smallest board the engine accepts.
pub const MIN_BOARD_SIZE: usize = 1;

/// Largest board the engine accepts.
pub const MAX_BOARD_SIZE: usize = 25;

/// Board size used when a game record has no `SZ` property.
pub const DEFAULT_BOARD_SIZE: usize = 19;

// =============================================================================
// Game Defaults
// =============================================================================

/// Komi written for new games (kept as text, like the `KM` property).
pub const DEFAULT_KOMI: &str = "6.5";

/// Largest handicap with standard star-point placement.
pub const MAX_HANDICAP: usize = 9;

/// Smallest board with star points for handicap stones.
pub const MIN_HANDICAP_BOARD_SIZE: usize = 7;

// =============================================================================
// Adornments
// =============================================================================

/// Letters available for letter adornments on one move (A through Z).
pub const MAX_LETTER_ADORNMENTS: usize = 26;

// =============================================================================
// SGF Output
// =============================================================================

/// Application tag written into the `AP` property.
pub const APP_NAME: &str = "sgfed";

/// Pass encoding accepted from files written for boards up to 19x19.
pub const LEGACY_PASS: &str = "tt";

/// Root properties the engine regenerates on save instead of passing through.
pub const GENERATED_ROOT_PROPERTIES: &[&str] = &[
    "GM", "FF", "CA", "AP", "SZ", "KM", "HA", "PB", "PW", "AB", "AW", "C", "SQ", "TR", "LB",
];

/// Move properties the engine interprets when materializing a node.
pub const INTERPRETED_MOVE_PROPERTIES: &[&str] = &["B", "W", "C", "SQ", "TR", "LB"];
