//! Random game generation.
//!
//! Plays random moves to build demo games and test fixtures. A generated
//! game has a main line plus a number of variations branching off at random
//! depths. The same seed always gives the same game.

use fastrand::Rng;
use tracing::debug;

use crate::board::{Board, Color, Point};
use crate::error::GameError;
use crate::game::{Game, GameOptions};

/// Shape of a generated game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayoutConfig {
    /// Length of the main line.
    pub moves: usize,
    /// Number of variations added after the main line.
    pub variations: usize,
    /// Longest variation.
    pub variation_length: usize,
}

impl Default for PlayoutConfig {
    fn default() -> Self {
        Self {
            moves: 60,
            variations: 3,
            variation_length: 8,
        }
    }
}

/// Generate a game. The cursor is left at the start position.
pub fn random_game(options: GameOptions, config: &PlayoutConfig, seed: u64) -> Result<Game, GameError> {
    let mut rng = Rng::with_seed(seed);
    let mut game = Game::new(options)?;
    let main = play_line(&mut game, &mut rng, config.moves)?;

    for _ in 0..config.variations {
        if main == 0 {
            break;
        }
        game.goto_start();
        let depth = rng.usize(0..main);
        for _ in 0..depth {
            let (count, _) = game.current_branches();
            if count > 1 {
                game.set_current_branch(rng.usize(0..count))?;
            }
            if !game.can_replay_move() {
                break;
            }
            game.replay_move()?;
        }
        let length = rng.usize(1..=config.variation_length.max(1));
        play_line(&mut game, &mut rng, length)?;
    }

    game.goto_start();
    debug!(seed, moves = game.moves().len(), "generated random game");
    Ok(game)
}

/// Play up to `length` random moves from the cursor, stopping early after
/// two passes in a row. Returns the number of moves played.
pub fn play_line(game: &mut Game, rng: &mut Rng, length: usize) -> Result<usize, GameError> {
    let mut played = 0;
    let mut passes = 0;
    while played < length && passes < 2 {
        match choose_random_move(game.board(), game.next_color(), rng) {
            Some(point) => {
                game.make_move(point)?;
                passes = 0;
            }
            None => {
                game.make_pass()?;
                passes += 1;
            }
        }
        played += 1;
    }
    Ok(played)
}

/// Pick a random empty point where the stone would keep at least one
/// liberty. `None` means pass.
pub fn choose_random_move(board: &Board, color: Color, rng: &mut Rng) -> Option<Point> {
    let mut candidates: Vec<Point> = (0..board.size)
        .flat_map(|row| (0..board.size).map(move |col| (row, col)))
        .filter(|&p| !board.has_stone_at(p))
        .collect();
    rng.shuffle(&mut candidates);

    candidates.into_iter().find(|&point| {
        // Try the move on a copy; a stone left without liberties is skipped.
        let mut test = board.clone();
        test.place_stone(point, color).is_ok() && test.group_liberties(point) > 0
    })
}
