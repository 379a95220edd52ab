//! Notifications queued by [`Game`](crate::game::Game) for the host to drain.

use std::fmt;

use crate::board::{Color, Point};
use crate::tree::{MoveId, NodeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    StoneAdded { point: Point, color: Color },
    StoneRemoved { point: Point },
    CurrentMoveChanged { current: Option<MoveId> },
    /// Branches at the cursor (empty when it is not a branch point) and the
    /// selected index.
    BranchesChanged {
        branches: Vec<NodeRef>,
        active: Option<usize>,
    },
    StatusChanged(Status),
    /// The tree changed shape; layouts are stale.
    TreeChanged,
}

/// Summary line shown by hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub move_number: usize,
    pub is_pass: bool,
    pub black_prisoners: usize,
    pub white_prisoners: usize,
    /// Base name of the backing file.
    pub filename: Option<String>,
    pub dirty: bool,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dirty {
            write!(f, "[*] ")?;
        }
        write!(f, "Move {}", self.move_number)?;
        if self.is_pass {
            write!(f, " (pass)")?;
        }
        write!(
            f,
            "   B captures: {}   W captures: {}",
            self.black_prisoners, self.white_prisoners
        )?;
        if let Some(name) = &self.filename {
            write!(f, "   {name}")?;
        }
        Ok(())
    }
}
