//! Grid layout of the game tree for display.
//!
//! Rows are depths (the start position is row 0) and columns are lanes. The
//! main line of every position keeps its parent's lane; later branches take
//! the leftmost lane that is free on every row their own main line covers.
//! A branch one lane to the right of its parent hangs off a diagonal line;
//! any further right gets a bend cell on the parent's row.

use std::collections::HashMap;
use std::fmt;

use crate::board::Color;
use crate::game::Game;
use crate::tree::NodeRef;

/// A grid position as `(row, column)`.
pub type Cell = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Start,
    Move,
    LineBend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub kind: CellKind,
    /// The tree node drawn here; `None` for the start and bend cells.
    pub node: Option<NodeRef>,
    pub row: usize,
    pub column: usize,
    pub color: Option<Color>,
    pub has_comment: bool,
    /// Indices into [`TreeLayout::nodes`].
    pub children: Vec<usize>,
}

impl LayoutNode {
    pub fn cell(&self) -> Cell {
        (self.row, self.column)
    }
}

/// A straight connector between two cell centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: Cell,
    pub to: Cell,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeLayout {
    pub nodes: Vec<LayoutNode>,
    pub segments: Vec<Segment>,
    pub max_row: usize,
    pub max_column: usize,
    by_node: HashMap<NodeRef, usize>,
    by_cell: HashMap<Cell, usize>,
}

impl TreeLayout {
    /// Lay out the whole tree of `game`.
    pub fn compute(game: &Game) -> TreeLayout {
        let mut builder = Builder {
            game,
            layout: TreeLayout::default(),
            next_free: Vec::new(),
        };
        let start = builder.place(CellKind::Start, None, (0, 0));
        let children = game.children_of(None);
        builder.branches(start, &children);
        builder.layout
    }

    pub fn get(&self, node: NodeRef) -> Option<&LayoutNode> {
        self.by_node.get(&node).map(|&i| &self.nodes[i])
    }

    pub fn at(&self, cell: Cell) -> Option<&LayoutNode> {
        self.by_cell.get(&cell).map(|&i| &self.nodes[i])
    }

    pub fn start(&self) -> Option<&LayoutNode> {
        self.nodes.first()
    }
}

struct Builder<'a> {
    game: &'a Game,
    layout: TreeLayout,
    /// First unused column on each row.
    next_free: Vec<usize>,
}

impl Builder<'_> {
    fn place(&mut self, kind: CellKind, node: Option<NodeRef>, (row, column): Cell) -> usize {
        let (color, has_comment) = match node {
            Some(n) => (
                self.game.node_move(n).map(|(c, _)| c),
                self.game.node_has_comment(n),
            ),
            None => (None, false),
        };
        let index = self.layout.nodes.len();
        self.layout.nodes.push(LayoutNode {
            kind,
            node,
            row,
            column,
            color,
            has_comment,
            children: Vec::new(),
        });
        if let Some(n) = node {
            self.layout.by_node.insert(n, index);
        }
        self.layout.by_cell.insert((row, column), index);
        self.claim(row, column);
        self.layout.max_row = self.layout.max_row.max(row);
        self.layout.max_column = self.layout.max_column.max(column);
        index
    }

    fn claim(&mut self, row: usize, column: usize) {
        if self.next_free.len() <= row {
            self.next_free.resize(row + 1, 0);
        }
        self.next_free[row] = self.next_free[row].max(column + 1);
    }

    fn free_from(&self, row: usize) -> usize {
        self.next_free.get(row).copied().unwrap_or(0)
    }

    fn connect(&mut self, parent: usize, child: usize) {
        self.layout.nodes[parent].children.push(child);
        let from = self.layout.nodes[parent].cell();
        let to = self.layout.nodes[child].cell();
        self.layout.segments.push(Segment { from, to });
    }

    /// Number of nodes on the main line starting at `node`.
    fn main_line_len(&self, node: NodeRef) -> usize {
        let mut len = 1;
        let mut current = node;
        while let Some(&next) = self.game.children_of(Some(current)).first() {
            len += 1;
            current = next;
        }
        len
    }

    /// Lay out the children of the node at `parent`: the first keeps its
    /// lane, the rest get new lanes.
    fn branches(&mut self, parent: usize, children: &[NodeRef]) {
        let Some((&first, rest)) = children.split_first() else {
            return;
        };
        let (row, column) = self.layout.nodes[parent].cell();
        let head = self.place(CellKind::Move, Some(first), (row + 1, column));
        self.connect(parent, head);
        self.chain(head);
        self.side_branches(parent, rest);
    }

    /// Place the main line below `head`, then its branches deepest first.
    fn chain(&mut self, head: usize) {
        let mut line = vec![head];
        let mut current = head;
        loop {
            let Some(node) = self.layout.nodes[current].node else {
                break;
            };
            let children = self.game.children_of(Some(node));
            let Some(&next) = children.first() else {
                break;
            };
            let (row, column) = self.layout.nodes[current].cell();
            let index = self.place(CellKind::Move, Some(next), (row + 1, column));
            self.connect(current, index);
            line.push(index);
            current = index;
        }

        for &index in line.iter().rev() {
            let Some(node) = self.layout.nodes[index].node else {
                continue;
            };
            let children = self.game.children_of(Some(node));
            if children.len() > 1 {
                self.side_branches(index, &children[1..]);
            }
        }
    }

    /// Branches other than the main line, whose lanes are already placed.
    fn side_branches(&mut self, parent: usize, rest: &[NodeRef]) {
        let (row, column) = self.layout.nodes[parent].cell();
        for &child in rest {
            let len = self.main_line_len(child);
            let lane = (row + 1..=row + len)
                .map(|r| self.free_from(r))
                .fold(column + 1, usize::max);
            let (attach, lane) = if lane == column + 1 {
                (parent, lane)
            } else {
                let lane = lane.max(self.free_from(row));
                let bend = self.place(CellKind::LineBend, None, (row, lane));
                self.connect(parent, bend);
                (bend, lane)
            };
            let head = self.place(CellKind::Move, Some(child), (row + 1, lane));
            self.connect(attach, head);
            self.chain(head);
        }
    }
}

impl fmt::Display for TreeLayout {
    /// Draws `#` for the start, `X`/`O` for moves, `?` for unreadable nodes
    /// and `+` for bends, with connectors on the rows in between.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let width = (self.max_column + 1) * 2;
        let height = self.max_row * 2 + 1;
        let mut grid = vec![vec![' '; width]; height];
        for node in &self.nodes {
            grid[node.row * 2][node.column * 2] = match (node.kind, node.color) {
                (CellKind::Start, _) => '#',
                (CellKind::LineBend, _) => '+',
                (CellKind::Move, Some(Color::Black)) => 'X',
                (CellKind::Move, Some(Color::White)) => 'O',
                (CellKind::Move, None) => '?',
            };
        }
        for seg in &self.segments {
            let ((r1, c1), (r2, c2)) = (seg.from, seg.to);
            if r1 == r2 {
                for cell in &mut grid[r1 * 2][c1 * 2 + 1..c2 * 2] {
                    if *cell == ' ' {
                        *cell = '-';
                    }
                }
            } else if c1 == c2 {
                grid[r1 * 2 + 1][c1 * 2] = '|';
            } else {
                grid[r1 * 2 + 1][c1 * 2 + 1] = '\\';
            }
        }
        for line in grid {
            let text: String = line.into_iter().collect();
            writeln!(f, "{}", text.trim_end())?;
        }
        Ok(())
    }
}
