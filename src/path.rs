//! Addressing positions by the branch choices that lead to them.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{GameError, NavigationError};
use crate::game::{Game, ReplayOutcome};
use crate::tree::{MoveId, NodeRef};

/// Child indices from the start position down to a node.
///
/// Index 0 at a branch point is the main line; a position without branches
/// only has index 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MovePath(Vec<usize>);

impl MovePath {
    pub fn new(steps: Vec<usize>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    /// Number of moves from the start position.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MovePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", steps.join(","))
    }
}

impl Game {
    /// Path from the start position to `target`, which may be a live move or
    /// a parsed node not yet visited. `None` if the node is no longer in the
    /// tree.
    pub fn get_path_to_move(&self, target: NodeRef) -> Option<MovePath> {
        let mut steps = Vec::new();
        let mut node = self.resolve(target);
        loop {
            let parent = self.parent_of(node)?;
            let index = self.children_of(parent).iter().position(|c| *c == node)?;
            steps.push(index);
            match parent {
                Some(p) => node = p,
                None => break,
            }
        }
        steps.reverse();
        Some(MovePath(steps))
    }

    /// Rewind to the start and replay along `path`, selecting each branch.
    ///
    /// On failure the cursor and every branch selection are put back the way
    /// they were.
    pub fn advance_to_move_path(&mut self, path: &MovePath) -> Result<Option<MoveId>, GameError> {
        let origin = self
            .current_move()
            .and_then(|id| self.get_path_to_move(NodeRef::Move(id)));
        let mut selections = Vec::new();
        let Err(e) = self.follow(path, &mut selections) else {
            return Ok(self.current_move());
        };

        match origin {
            Some(origin) => {
                if let Err(restore) = self.follow(&origin, &mut selections) {
                    warn!(path = %origin, error = %restore, "cannot return to the previous move");
                }
            }
            None => self.goto_start(),
        }
        // Later entries hold values written by earlier ones, so the oldest
        // value for each branch point is applied last.
        for (at, index) in selections.into_iter().rev() {
            self.select_branch_at(at, index)?;
        }
        debug!(path = %path, error = %e, "path not followed");
        Err(e)
    }

    /// Replay `path` from the start, recording the previous selection of
    /// every branch point it changes.
    fn follow(&mut self, path: &MovePath, selections: &mut Vec<(Option<MoveId>, usize)>) -> Result<(), GameError> {
        self.goto_start();
        for &index in path.steps() {
            let continuations = self.cursor_continuations();
            let count = continuations.len();
            if count == 0 {
                return Err(NavigationError::NoNextMove.into());
            }
            if count > 1 {
                let previous = continuations.selected_index();
                self.set_current_branch(index)?;
                if let Some(previous) = previous.filter(|&p| p != index) {
                    selections.push((self.current_move(), previous));
                }
            } else if index != 0 {
                return Err(NavigationError::BranchOutOfRange { index, count }.into());
            }
            if let ReplayOutcome::Blocked { point } = self.replay_move()? {
                return Err(GameError::ReplayBlocked { point });
            }
        }
        Ok(())
    }
}
