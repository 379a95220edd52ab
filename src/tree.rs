//! Live move graph: an arena of moves linked by continuation lists.
//!
//! A position's continuations are either live moves or raw nodes that have
//! not been visited yet. Cutting a subtree removes its moves from the arena
//! and hands back an owned [`Subtree`]; stale [`MoveId`]s then resolve to
//! nothing.

use crate::adornments::Adornments;
use crate::board::{Color, Point};
use crate::error::NavigationError;
use crate::parser::RawId;

/// Index of a move in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoveId(usize);

impl MoveId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A tree position: a live move or a parsed node not yet promoted to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Move(MoveId),
    Raw(RawId),
}

/// The selected continuation of a position plus its alternatives.
///
/// When `branches` is present it holds at least two entries and `next` is
/// one of them. Index 0 is the main line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Continuations {
    next: Option<NodeRef>,
    branches: Option<Vec<NodeRef>>,
}

impl Continuations {
    pub fn from_children(children: Vec<NodeRef>) -> Self {
        match children.len() {
            0 => Self::default(),
            1 => Self {
                next: Some(children[0]),
                branches: None,
            },
            _ => Self {
                next: Some(children[0]),
                branches: Some(children),
            },
        }
    }

    pub fn next(&self) -> Option<NodeRef> {
        self.next
    }

    pub fn branches(&self) -> Option<&[NodeRef]> {
        self.branches.as_deref()
    }

    /// All continuations in branch order.
    pub fn children(&self) -> Vec<NodeRef> {
        match (&self.branches, self.next) {
            (Some(b), _) => b.clone(),
            (None, Some(n)) => vec![n],
            (None, None) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match (&self.branches, self.next) {
            (Some(b), _) => b.len(),
            (None, Some(_)) => 1,
            (None, None) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_none()
    }

    pub fn index_of(&self, node: NodeRef) -> Option<usize> {
        match &self.branches {
            Some(b) => b.iter().position(|n| *n == node),
            None => (self.next == Some(node)).then_some(0),
        }
    }

    /// Index of `next` among the branches, when this is a branch point.
    pub fn selected_index(&self) -> Option<usize> {
        let next = self.next?;
        self.branches.as_ref()?.iter().position(|n| *n == next)
    }

    /// Add a continuation and make it the selected one.
    pub(crate) fn push(&mut self, node: NodeRef) {
        match (&mut self.branches, self.next) {
            (Some(b), _) => b.push(node),
            (None, Some(existing)) => self.branches = Some(vec![existing, node]),
            (None, None) => {}
        }
        self.next = Some(node);
    }

    pub(crate) fn select(&mut self, index: usize) -> Result<(), NavigationError> {
        let branches = self.branches.as_ref().ok_or(NavigationError::NoBranches)?;
        let node = *branches
            .get(index)
            .ok_or(NavigationError::BranchOutOfRange {
                index,
                count: branches.len(),
            })?;
        self.next = Some(node);
        Ok(())
    }

    /// Remove a continuation, returning the index it had.
    ///
    /// A branch point left with one continuation stops being one; otherwise
    /// the main line becomes selected.
    pub(crate) fn remove(&mut self, node: NodeRef) -> Option<usize> {
        match &mut self.branches {
            Some(b) => {
                let idx = b.iter().position(|n| *n == node)?;
                b.remove(idx);
                self.next = b.first().copied();
                if b.len() == 1 {
                    self.branches = None;
                }
                Some(idx)
            }
            None if self.next == Some(node) => {
                self.next = None;
                Some(0)
            }
            None => None,
        }
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        if let Some(branches) = &mut self.branches {
            branches.swap(a, b);
        }
    }

    pub(crate) fn replace(&mut self, old: NodeRef, new: NodeRef) {
        if self.next == Some(old) {
            self.next = Some(new);
        }
        if let Some(b) = &mut self.branches {
            for n in b.iter_mut().filter(|n| **n == old) {
                *n = new;
            }
        }
    }
}

/// A played or recorded move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub color: Color,
    /// `None` for a pass.
    pub point: Option<Point>,
    /// Depth from the start position; the first move is 1.
    pub number: usize,
    pub comment: String,
    pub adornments: Adornments,
    pub previous: Option<MoveId>,
    pub(crate) continuations: Continuations,
    /// The parsed node this move was built from.
    pub parsed: Option<RawId>,
    /// Stones removed the last time this move was played.
    pub(crate) captures: Vec<Point>,
    /// Properties kept for saving but not interpreted.
    pub extra_properties: Vec<(String, Vec<String>)>,
}

impl Move {
    pub fn new(color: Color, point: Option<Point>, number: usize, previous: Option<MoveId>) -> Self {
        Self {
            color,
            point,
            number,
            comment: String::new(),
            adornments: Adornments::new(),
            previous,
            continuations: Continuations::default(),
            parsed: None,
            captures: Vec::new(),
            extra_properties: Vec::new(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.point.is_none()
    }

    pub fn next(&self) -> Option<NodeRef> {
        self.continuations.next()
    }

    pub fn branches(&self) -> Option<&[NodeRef]> {
        self.continuations.branches()
    }

    pub fn continuations(&self) -> &Continuations {
        &self.continuations
    }

    pub fn captures(&self) -> &[Point] {
        &self.captures
    }
}

/// A detached move and everything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    pub color: Color,
    pub point: Option<Point>,
    pub comment: String,
    pub adornments: Adornments,
    pub parsed: Option<RawId>,
    pub extra_properties: Vec<(String, Vec<String>)>,
    pub children: Vec<SubtreeChild>,
    /// Which child was selected when the subtree was cut.
    pub selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtreeChild {
    Move(Subtree),
    Raw(RawId),
}

impl Subtree {
    /// Number of live moves in the subtree.
    pub fn move_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| match c {
                SubtreeChild::Move(s) => s.move_count(),
                SubtreeChild::Raw(_) => 0,
            })
            .sum::<usize>()
    }

    /// Parsed nodes that had been promoted to moves inside the subtree.
    pub fn parsed_ids(&self) -> Vec<RawId> {
        let mut out = Vec::new();
        self.collect_parsed(&mut out);
        out
    }

    fn collect_parsed(&self, out: &mut Vec<RawId>) {
        out.extend(self.parsed);
        for child in &self.children {
            if let SubtreeChild::Move(s) = child {
                s.collect_parsed(out);
            }
        }
    }
}

/// Owner of every live move.
#[derive(Debug, Default)]
pub struct MoveArena {
    slots: Vec<Option<Move>>,
}

impl MoveArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, mv: Move) -> MoveId {
        self.slots.push(Some(mv));
        MoveId(self.slots.len() - 1)
    }

    pub fn get(&self, id: MoveId) -> Option<&Move> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: MoveId) -> Option<&mut Move> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: MoveId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live moves.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A move the engine holds a link to. Links never point at detached
    /// slots; hosts holding ids across a cut go through [`MoveArena::get`].
    pub(crate) fn live(&self, id: MoveId) -> &Move {
        self.slots[id.0].as_ref().expect("linked move is detached")
    }

    pub(crate) fn live_mut(&mut self, id: MoveId) -> &mut Move {
        self.slots[id.0].as_mut().expect("linked move is detached")
    }

    /// Remove `id` and its descendants from the arena.
    ///
    /// The caller unlinks `id` from its parent's continuations.
    pub fn detach(&mut self, id: MoveId) -> Option<Subtree> {
        let mv = self.slots.get_mut(id.0)?.take()?;
        let selected = mv.continuations.selected_index().unwrap_or(0);
        let children = mv
            .continuations
            .children()
            .into_iter()
            .filter_map(|child| match child {
                NodeRef::Move(m) => self.detach(m).map(SubtreeChild::Move),
                NodeRef::Raw(r) => Some(SubtreeChild::Raw(r)),
            })
            .collect();
        Some(Subtree {
            color: mv.color,
            point: mv.point,
            comment: mv.comment,
            adornments: mv.adornments,
            parsed: mv.parsed,
            extra_properties: mv.extra_properties,
            children,
            selected,
        })
    }

    /// Insert a detached subtree below `previous`, numbering from `number`.
    ///
    /// Returns the new top move and the parsed-node pairs to re-register.
    /// The caller links the top move into the parent's continuations.
    pub fn attach(
        &mut self,
        subtree: Subtree,
        previous: Option<MoveId>,
        number: usize,
        promoted: &mut Vec<(RawId, MoveId)>,
    ) -> MoveId {
        let mut mv = Move::new(subtree.color, subtree.point, number, previous);
        mv.comment = subtree.comment;
        mv.adornments = subtree.adornments;
        mv.parsed = subtree.parsed;
        mv.extra_properties = subtree.extra_properties;
        let id = self.alloc(mv);
        if let Some(raw) = subtree.parsed {
            promoted.push((raw, id));
        }
        let children: Vec<NodeRef> = subtree
            .children
            .into_iter()
            .map(|child| match child {
                SubtreeChild::Move(s) => NodeRef::Move(self.attach(s, Some(id), number + 1, promoted)),
                SubtreeChild::Raw(r) => NodeRef::Raw(r),
            })
            .collect();
        let mut continuations = Continuations::from_children(children);
        if continuations.branches().is_some() {
            // The subtree was cut with a valid selection; keep it.
            let _ = continuations.select(subtree.selected);
        }
        self.live_mut(id).continuations = continuations;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(arena: &mut MoveArena, point: Point, number: usize, previous: Option<MoveId>) -> MoveId {
        let color = if number % 2 == 1 { Color::Black } else { Color::White };
        let id = arena.alloc(Move::new(color, Some(point), number, previous));
        if let Some(p) = previous {
            arena.live_mut(p).continuations.push(NodeRef::Move(id));
        }
        id
    }

    #[test]
    fn test_push_builds_branch_list() {
        let mut c = Continuations::default();
        let a = NodeRef::Move(MoveId(1));
        let b = NodeRef::Move(MoveId(2));
        c.push(a);
        assert_eq!(c.next(), Some(a));
        assert!(c.branches().is_none());
        c.push(b);
        assert_eq!(c.next(), Some(b));
        assert_eq!(c.branches(), Some(&[a, b][..]));
        assert_eq!(c.selected_index(), Some(1));
    }

    #[test]
    fn test_select_bounds() {
        let mut c = Continuations::from_children(vec![NodeRef::Move(MoveId(0))]);
        assert_eq!(c.select(0), Err(NavigationError::NoBranches));
        let mut c = Continuations::from_children(vec![
            NodeRef::Move(MoveId(0)),
            NodeRef::Move(MoveId(1)),
        ]);
        assert_eq!(
            c.select(2),
            Err(NavigationError::BranchOutOfRange { index: 2, count: 2 })
        );
        c.select(1).unwrap();
        assert_eq!(c.next(), Some(NodeRef::Move(MoveId(1))));
    }

    #[test]
    fn test_remove_collapses_two_branches() {
        let a = NodeRef::Move(MoveId(0));
        let b = NodeRef::Move(MoveId(1));
        let mut c = Continuations::from_children(vec![a, b]);
        assert_eq!(c.remove(a), Some(0));
        assert!(c.branches().is_none());
        assert_eq!(c.next(), Some(b));
        assert_eq!(c.remove(b), Some(0));
        assert!(c.is_empty());
        assert_eq!(c.remove(b), None);
    }

    #[test]
    fn test_remove_from_three_selects_main_line() {
        let nodes: Vec<NodeRef> = (0..3).map(|i| NodeRef::Move(MoveId(i))).collect();
        let mut c = Continuations::from_children(nodes.clone());
        c.select(2).unwrap();
        assert_eq!(c.remove(nodes[2]), Some(2));
        assert_eq!(c.branches(), Some(&nodes[..2]));
        assert_eq!(c.next(), Some(nodes[0]));
    }

    #[test]
    fn test_replace_updates_next_and_branches() {
        let raw = NodeRef::Raw(RawId(4));
        let other = NodeRef::Move(MoveId(0));
        let mut c = Continuations::from_children(vec![other, raw]);
        c.select(1).unwrap();
        c.replace(raw, NodeRef::Move(MoveId(9)));
        assert_eq!(c.next(), Some(NodeRef::Move(MoveId(9))));
        assert_eq!(c.index_of(NodeRef::Move(MoveId(9))), Some(1));
    }

    #[test]
    fn test_detach_and_attach_preserve_shape() {
        let mut arena = MoveArena::new();
        let root = mv(&mut arena, (0, 0), 1, None);
        let a = mv(&mut arena, (1, 1), 2, Some(root));
        let b = mv(&mut arena, (2, 2), 2, Some(root));
        let _a2 = mv(&mut arena, (3, 3), 3, Some(a));
        arena.live_mut(root).continuations.select(0).unwrap();

        let subtree = arena.detach(root).unwrap();
        assert_eq!(subtree.move_count(), 4);
        assert!(arena.is_empty());
        assert!(!arena.contains(b));

        let mut promoted = Vec::new();
        let copy = subtree.clone();
        let top = arena.attach(subtree, None, 5, &mut promoted);
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.live(top).number, 5);
        assert_eq!(arena.live(top).continuations.selected_index(), Some(0));
        let Some(NodeRef::Move(first)) = arena.live(top).next() else {
            panic!("expected a live continuation");
        };
        assert_eq!(arena.live(first).number, 6);
        assert_eq!(arena.live(first).previous, Some(top));
        assert!(promoted.is_empty());

        // Cutting again yields the same value.
        assert_eq!(arena.detach(top), Some(copy));
    }
}
