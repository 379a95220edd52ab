//! The game tree, its cursor, and the board position at the cursor.
//!
//! A [`Game`] starts with every recorded move still in parsed form. Moves are
//! promoted into the arena the first time the cursor replays into them, so
//! opening a large record costs only the parse.
//!
//! Every operation either succeeds or returns an error with the game left as
//! it was.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::adornments::{Adornment, AdornmentKind, Adornments, Mark};
use crate::board::{Board, Color, Point};
use crate::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_KOMI, GENERATED_ROOT_PROPERTIES, INTERPRETED_MOVE_PROPERTIES,
    MAX_BOARD_SIZE, MAX_HANDICAP, MIN_BOARD_SIZE, MIN_HANDICAP_BOARD_SIZE,
};
use crate::error::{self, GameError, MoveError, NavigationError};
use crate::events::{GameEvent, Status};
use crate::parser::{self, ParsedGame, RawId, RawNode, decode_move, decode_point, decode_point_list};
use crate::tree::{Continuations, Move, MoveArena, MoveId, NodeRef, Subtree};
use crate::writer::{self, Flip};

/// Settings for a new, empty game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOptions {
    pub size: usize,
    pub handicap: usize,
    pub komi: String,
    pub player_black: String,
    pub player_white: String,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE,
            handicap: 0,
            komi: DEFAULT_KOMI.to_string(),
            player_black: String::new(),
            player_white: String::new(),
        }
    }
}

/// Game-level properties from the root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub size: usize,
    /// Komi as written in the record.
    pub komi: String,
    pub handicap: usize,
    pub player_black: String,
    pub player_white: String,
    pub comment: String,
    /// Root properties saved back verbatim.
    pub extra_properties: Vec<(String, Vec<String>)>,
}

/// Result of replaying the selected continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Moved(MoveId),
    /// A stone already sits where the next move was played.
    Blocked { point: Point },
}

/// Star points for `count` handicap stones, in placement order.
///
/// Returns `None` when the board has no standard placement for that count.
pub fn handicap_points(size: usize, count: usize) -> Option<Vec<Point>> {
    if count == 0 {
        return Some(Vec::new());
    }
    if count == 1 || count > MAX_HANDICAP || size < MIN_HANDICAP_BOARD_SIZE {
        return None;
    }
    // Side and center points need a middle line.
    if count >= 5 && size % 2 == 0 {
        return None;
    }
    let edge = if size >= 13 { 3 } else { 2 };
    let (lo, hi, mid) = (edge, size - 1 - edge, size / 2);

    let mut points = vec![(lo, hi), (hi, lo)];
    if count >= 3 {
        points.push((hi, hi));
    }
    if count >= 4 {
        points.push((lo, lo));
    }
    if count >= 6 {
        points.push((mid, lo));
        points.push((mid, hi));
    }
    if count >= 8 {
        points.push((lo, mid));
        points.push((hi, mid));
    }
    if count >= 5 && count % 2 == 1 {
        points.push((mid, mid));
    }
    Some(points)
}

pub struct Game {
    info: GameInfo,
    board: Board,
    parsed: Option<ParsedGame>,
    moves: MoveArena,
    /// Continuations of the start position.
    start: Continuations,
    materialized: HashMap<RawId, MoveId>,
    current: Option<MoveId>,
    clipboard: Option<Subtree>,
    setup_adornments: Adornments,
    setup_black: Vec<Point>,
    setup_white: Vec<Point>,
    /// Move holding the current-move marker.
    marker: Option<MoveId>,
    black_prisoners: usize,
    white_prisoners: usize,
    dirty: bool,
    filename: Option<PathBuf>,
    events: Vec<GameEvent>,
}

impl Game {
    fn empty(info: GameInfo) -> Game {
        Game {
            board: Board::new(info.size),
            info,
            parsed: None,
            moves: MoveArena::new(),
            start: Continuations::default(),
            materialized: HashMap::new(),
            current: None,
            clipboard: None,
            setup_adornments: Adornments::new(),
            setup_black: Vec::new(),
            setup_white: Vec::new(),
            marker: None,
            black_prisoners: 0,
            white_prisoners: 0,
            dirty: false,
            filename: None,
            events: Vec::new(),
        }
    }

    /// Create an empty game, placing handicap stones on the star points.
    pub fn new(options: GameOptions) -> Result<Game, GameError> {
        let size = options.size;
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(GameError::InvalidOptions(format!(
                "board size {size} is outside {MIN_BOARD_SIZE}..={MAX_BOARD_SIZE}"
            )));
        }
        let stones = handicap_points(size, options.handicap).ok_or_else(|| {
            GameError::InvalidOptions(format!(
                "{} handicap stones cannot be placed on a {size}x{size} board",
                options.handicap
            ))
        })?;

        let mut game = Game::empty(GameInfo {
            size,
            komi: options.komi,
            handicap: options.handicap,
            player_black: options.player_black,
            player_white: options.player_white,
            comment: String::new(),
            extra_properties: Vec::new(),
        });
        for &point in &stones {
            game.board
                .set_stone(point, Color::Black)
                .map_err(|source| GameError::IllegalMove { point, source })?;
        }
        game.setup_black = stones;
        info!(size, handicap = options.handicap, "created new game");
        Ok(game)
    }

    /// Wrap a parsed record. Only the root node is read now.
    pub fn from_parsed(parsed: ParsedGame) -> Result<Game, GameError> {
        let root = parsed.node(parsed.root());
        for id in ["B", "W"] {
            if let Some(value) = root.first(id) {
                return Err(GameError::invalid_property(id, value));
            }
        }

        let size = match root.first("SZ") {
            Some(value) => {
                // Rectangular boards ("19:13") are read as square.
                let side = value.split(':').next().unwrap_or(value).trim();
                side.parse::<usize>()
                    .ok()
                    .filter(|s| (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(s))
                    .ok_or_else(|| GameError::invalid_property("SZ", value))?
            }
            None => DEFAULT_BOARD_SIZE,
        };
        let handicap = match root.first("HA") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| GameError::invalid_property("HA", value))?,
            None => 0,
        };
        let text = |id: &str| root.first(id).unwrap_or_default().to_string();
        let points = |id: &str| -> Result<Vec<Point>, GameError> {
            match root.get(id) {
                Some(values) => decode_point_list(values, size)
                    .ok_or_else(|| GameError::invalid_property(id, &values.join(","))),
                None => Ok(Vec::new()),
            }
        };
        let setup_black = points("AB")?;
        let setup_white = points("AW")?;
        let (setup_adornments, labels) = read_adornments(root, size)?;

        let mut game = Game::empty(GameInfo {
            size,
            komi: text("KM"),
            handicap,
            player_black: text("PB"),
            player_white: text("PW"),
            comment: text("C"),
            extra_properties: pass_through(root, GENERATED_ROOT_PROPERTIES, labels),
        });
        for (stones, color) in [(&setup_black, Color::Black), (&setup_white, Color::White)] {
            for &point in stones {
                game.board
                    .set_stone(point, color)
                    .map_err(|source| GameError::IllegalMove { point, source })?;
            }
        }
        game.start = Continuations::from_children(root.children.iter().map(|&c| NodeRef::Raw(c)).collect());
        game.setup_black = setup_black;
        game.setup_white = setup_white;
        game.setup_adornments = setup_adornments;
        game.parsed = Some(parsed);
        Ok(game)
    }

    /// Load a game record from disk.
    pub fn open(path: impl AsRef<Path>) -> error::Result<Game> {
        let path = path.as_ref();
        let parsed = parser::parse_file(path)?;
        let mut game = Game::from_parsed(parsed)?;
        game.filename = Some(path.to_path_buf());
        info!(path = %path.display(), size = game.info.size, "opened game");
        Ok(game)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn info(&self) -> &GameInfo {
        &self.info
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> usize {
        self.info.size
    }

    pub fn parsed(&self) -> Option<&ParsedGame> {
        self.parsed.as_ref()
    }

    pub fn moves(&self) -> &MoveArena {
        &self.moves
    }

    pub fn get_move(&self, id: MoveId) -> Option<&Move> {
        self.moves.get(id)
    }

    pub fn current_move(&self) -> Option<MoveId> {
        self.current
    }

    pub fn start_continuations(&self) -> &Continuations {
        &self.start
    }

    pub fn setup_black(&self) -> &[Point] {
        &self.setup_black
    }

    pub fn setup_white(&self) -> &[Point] {
        &self.setup_white
    }

    pub fn setup_adornments(&self) -> &Adornments {
        &self.setup_adornments
    }

    pub fn clipboard(&self) -> Option<&Subtree> {
        self.clipboard.as_ref()
    }

    pub fn black_prisoners(&self) -> usize {
        self.black_prisoners
    }

    pub fn white_prisoners(&self) -> usize {
        self.white_prisoners
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Color of the next move from the cursor.
    pub fn next_color(&self) -> Color {
        match self.current {
            Some(id) => self.moves.live(id).color.opponent(),
            None if self.info.handicap >= 2 => Color::White,
            None => Color::Black,
        }
    }

    /// Continuations of the cursor position.
    pub fn cursor_continuations(&self) -> &Continuations {
        self.continuations_at(self.current)
    }

    /// Branch count at the cursor (0 if not a branch point) and the
    /// selected branch.
    pub fn current_branches(&self) -> (usize, Option<usize>) {
        let c = self.cursor_continuations();
        match c.branches() {
            Some(b) => (b.len(), c.selected_index()),
            None => (0, None),
        }
    }

    pub fn status(&self) -> Status {
        let (move_number, is_pass) = match self.current {
            Some(id) => (self.moves.live(id).number, self.moves.live(id).is_pass()),
            None => (0, false),
        };
        Status {
            move_number,
            is_pass,
            black_prisoners: self.black_prisoners,
            white_prisoners: self.white_prisoners,
            filename: self
                .filename
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
            dirty: self.dirty,
        }
    }

    /// Drain queued notifications.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Tree queries over live and parsed nodes
    // =========================================================================

    /// The live move a node now stands for, if it was promoted.
    pub fn resolve(&self, node: NodeRef) -> NodeRef {
        match node {
            NodeRef::Raw(raw) => self
                .materialized
                .get(&raw)
                .map_or(node, |&id| NodeRef::Move(id)),
            NodeRef::Move(_) => node,
        }
    }

    /// Continuations of a node, or of the start position for `None`.
    pub fn children_of(&self, node: Option<NodeRef>) -> Vec<NodeRef> {
        match node {
            None => self.start.children(),
            Some(NodeRef::Move(id)) => self
                .moves
                .get(id)
                .map(|m| m.continuations.children())
                .unwrap_or_default(),
            Some(NodeRef::Raw(raw)) => self
                .raw_node(raw)
                .map(|n| n.children.iter().map(|&c| NodeRef::Raw(c)).collect())
                .unwrap_or_default(),
        }
    }

    /// Parent of a node: `Some(None)` is the start position, `None` means
    /// the node is not in the tree.
    pub fn parent_of(&self, node: NodeRef) -> Option<Option<NodeRef>> {
        match self.resolve(node) {
            NodeRef::Move(id) => Some(self.moves.get(id)?.previous.map(NodeRef::Move)),
            NodeRef::Raw(raw) => {
                let parsed = self.parsed.as_ref()?;
                let parent = parsed.get(raw)?.parent?;
                if parent == parsed.root() {
                    Some(None)
                } else {
                    Some(Some(self.resolve(NodeRef::Raw(parent))))
                }
            }
        }
    }

    /// Color and point of a node, reading parsed nodes without promoting them.
    pub fn node_move(&self, node: NodeRef) -> Option<(Color, Option<Point>)> {
        match node {
            NodeRef::Move(id) => self.moves.get(id).map(|m| (m.color, m.point)),
            NodeRef::Raw(raw) => {
                let n = self.raw_node(raw)?;
                let (color, value) = match (n.first("B"), n.first("W")) {
                    (Some(b), None) => (Color::Black, b),
                    (None, Some(w)) => (Color::White, w),
                    _ => return None,
                };
                decode_move(value, self.info.size).ok().map(|p| (color, p))
            }
        }
    }

    pub fn node_has_comment(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Move(id) => self.moves.get(id).is_some_and(|m| !m.comment.is_empty()),
            NodeRef::Raw(raw) => self
                .raw_node(raw)
                .and_then(|n| n.first("C"))
                .is_some_and(|c| !c.is_empty()),
        }
    }

    fn raw_node(&self, raw: RawId) -> Option<&RawNode> {
        self.parsed.as_ref()?.get(raw)
    }

    fn continuations_at(&self, at: Option<MoveId>) -> &Continuations {
        match at {
            Some(id) => &self.moves.live(id).continuations,
            None => &self.start,
        }
    }

    fn continuations_at_mut(&mut self, at: Option<MoveId>) -> &mut Continuations {
        match at {
            Some(id) => &mut self.moves.live_mut(id).continuations,
            None => &mut self.start,
        }
    }

    fn next_number(&self) -> usize {
        self.current.map_or(1, |id| self.moves.live(id).number + 1)
    }

    // =========================================================================
    // Playing and navigating
    // =========================================================================

    /// Play a stone for the side to move.
    ///
    /// An existing continuation with the same point and color is selected
    /// and replayed instead of adding a duplicate branch.
    pub fn make_move(&mut self, point: Point) -> Result<MoveId, GameError> {
        if !self.board.in_bounds(point) {
            return Err(GameError::IllegalMove {
                point,
                source: MoveError::OutOfBounds,
            });
        }
        if self.board.has_stone_at(point) {
            return Err(GameError::IllegalMove {
                point,
                source: MoveError::Occupied,
            });
        }
        self.play(Some(point))
    }

    pub fn make_pass(&mut self) -> Result<MoveId, GameError> {
        self.play(None)
    }

    fn play(&mut self, point: Option<Point>) -> Result<MoveId, GameError> {
        let color = self.next_color();
        let existing = self
            .cursor_continuations()
            .children()
            .into_iter()
            .position(|c| self.node_move(c) == Some((color, point)));
        if let Some(index) = existing {
            debug!(index, "move matches an existing branch");
            if self.cursor_continuations().branches().is_some() {
                let at = self.current;
                self.continuations_at_mut(at).select(index)?;
            }
            return match self.replay_move()? {
                ReplayOutcome::Moved(id) => Ok(id),
                ReplayOutcome::Blocked { point } => Err(GameError::ReplayBlocked { point }),
            };
        }

        let captures = match point {
            Some(p) => self
                .board
                .place_stone(p, color)
                .map_err(|source| GameError::IllegalMove { point: p, source })?,
            None => Vec::new(),
        };
        let parent = self.current;
        let mut mv = Move::new(color, point, self.next_number(), parent);
        mv.captures = captures.clone();
        let id = self.moves.alloc(mv);
        self.continuations_at_mut(parent).push(NodeRef::Move(id));
        self.stone_played(color, point, &captures);
        self.set_cursor(Some(id));
        self.dirty = true;
        self.events.push(GameEvent::TreeChanged);
        self.emit_status();
        debug!(id = id.index(), ?color, ?point, captured = captures.len(), "made move");
        Ok(id)
    }

    /// Take back the current move.
    pub fn unwind_move(&mut self) -> Result<MoveId, GameError> {
        let id = self.current.ok_or(NavigationError::NoCurrentMove)?;
        let mv = self.moves.live(id);
        let (color, point, previous) = (mv.color, mv.point, mv.previous);
        let captures = mv.captures.clone();

        if let Some(p) = point {
            self.board.remove_stone(p);
            self.events.push(GameEvent::StoneRemoved { point: p });
        }
        let opponent = color.opponent();
        for &p in &captures {
            if self.board.set_stone(p, opponent).is_ok() {
                self.events.push(GameEvent::StoneAdded { point: p, color: opponent });
            }
        }
        match color {
            Color::Black => self.black_prisoners = self.black_prisoners.saturating_sub(captures.len()),
            Color::White => self.white_prisoners = self.white_prisoners.saturating_sub(captures.len()),
        }
        self.set_cursor(previous);
        self.emit_status();
        debug!(id = id.index(), "unwound move");
        Ok(id)
    }

    /// Play the selected continuation, promoting it first if needed.
    pub fn replay_move(&mut self) -> Result<ReplayOutcome, GameError> {
        let next = self.cursor_continuations().next().ok_or(NavigationError::NoNextMove)?;
        let id = match next {
            NodeRef::Move(id) => id,
            NodeRef::Raw(raw) => self.materialize(raw)?,
        };
        let (color, point) = (self.moves.live(id).color, self.moves.live(id).point);
        let captures = match point {
            Some(p) => match self.board.place_stone(p, color) {
                Ok(captures) => captures,
                Err(MoveError::Occupied) => {
                    warn!(id = id.index(), point = ?p, "replay blocked by an existing stone");
                    return Ok(ReplayOutcome::Blocked { point: p });
                }
                Err(source) => return Err(GameError::IllegalMove { point: p, source }),
            },
            None => Vec::new(),
        };
        self.moves.live_mut(id).captures = captures.clone();
        self.stone_played(color, point, &captures);
        self.set_cursor(Some(id));
        self.emit_status();
        debug!(id = id.index(), "replayed move");
        Ok(ReplayOutcome::Moved(id))
    }

    /// Rewind to the start position. Setup and handicap stones remain.
    pub fn goto_start(&mut self) {
        while self.unwind_move().is_ok() {}
    }

    /// Replay along the selected branches to the end of the line.
    ///
    /// Returns the point of the stone that blocked a replay, if one did.
    pub fn goto_last_move(&mut self) -> Result<Option<Point>, GameError> {
        while self.can_replay_move() {
            if let ReplayOutcome::Blocked { point } = self.replay_move()? {
                return Ok(Some(point));
            }
        }
        Ok(None)
    }

    /// Select which branch the next replay follows.
    pub fn set_current_branch(&mut self, index: usize) -> Result<(), GameError> {
        let at = self.current;
        self.continuations_at_mut(at).select(index)?;
        self.emit_branches();
        Ok(())
    }

    /// Select a branch at any position, leaving the cursor where it is.
    pub(crate) fn select_branch_at(&mut self, at: Option<MoveId>, index: usize) -> Result<(), GameError> {
        self.continuations_at_mut(at).select(index)?;
        if at == self.current {
            self.emit_branches();
        }
        Ok(())
    }

    /// Move the current move's branch one place toward the main line.
    pub fn move_branch_up(&mut self) -> Result<(), GameError> {
        self.move_branch(true)
    }

    pub fn move_branch_down(&mut self) -> Result<(), GameError> {
        self.move_branch(false)
    }

    fn move_branch(&mut self, up: bool) -> Result<(), GameError> {
        let id = self.current.ok_or(NavigationError::NoCurrentMove)?;
        let parent = self.moves.live(id).previous;
        let siblings = self.continuations_at_mut(parent);
        let count = siblings.branches().map_or(0, <[NodeRef]>::len);
        if count == 0 {
            return Err(NavigationError::NotBranchStart.into());
        }
        let index = siblings
            .index_of(NodeRef::Move(id))
            .ok_or(NavigationError::NotBranchStart)?;
        let other = if up {
            index.checked_sub(1)
        } else {
            Some(index + 1).filter(|&i| i < count)
        }
        .ok_or(NavigationError::BranchAtEdge)?;
        siblings.swap(index, other);
        self.dirty = true;
        self.events.push(GameEvent::TreeChanged);
        self.emit_status();
        debug!(id = id.index(), from = index, to = other, "moved branch");
        Ok(())
    }

    pub fn can_unwind_move(&self) -> bool {
        self.current.is_some()
    }

    pub fn can_replay_move(&self) -> bool {
        self.cursor_continuations().next().is_some()
    }

    // =========================================================================
    // Cut and paste
    // =========================================================================

    /// Detach the current move and everything after it into the clipboard.
    pub fn cut_move(&mut self) -> Result<(), GameError> {
        let id = self.current.ok_or(NavigationError::NoCurrentMove)?;
        self.unwind_move()?;
        let parent = self.current;
        self.continuations_at_mut(parent).remove(NodeRef::Move(id));
        if let Some(subtree) = self.moves.detach(id) {
            for raw in subtree.parsed_ids() {
                self.materialized.remove(&raw);
            }
            debug!(moves = subtree.move_count(), "cut subtree");
            self.clipboard = Some(subtree);
        }
        self.dirty = true;
        self.events.push(GameEvent::TreeChanged);
        self.emit_branches();
        self.emit_status();
        Ok(())
    }

    pub fn can_paste(&self) -> bool {
        self.check_paste().is_ok()
    }

    fn check_paste(&self) -> Result<(), GameError> {
        let subtree = self.clipboard.as_ref().ok_or(NavigationError::EmptyClipboard)?;
        if subtree.color != self.next_color() {
            return Err(GameError::PasteColorMismatch);
        }
        if let Some(point) = subtree.point {
            if self.board.has_stone_at(point) {
                return Err(GameError::IllegalMove {
                    point,
                    source: MoveError::Occupied,
                });
            }
        }
        let pasted = Some((subtree.color, subtree.point));
        if self
            .cursor_continuations()
            .children()
            .into_iter()
            .any(|c| self.node_move(c) == pasted)
        {
            return Err(GameError::PasteDuplicatesBranch);
        }
        Ok(())
    }

    /// Attach the clipboard as a new continuation and step onto it.
    pub fn paste_move(&mut self) -> Result<MoveId, GameError> {
        self.check_paste()?;
        let subtree = self.clipboard.take().ok_or(NavigationError::EmptyClipboard)?;
        let parent = self.current;
        let mut promoted = Vec::new();
        let id = self.moves.attach(subtree, parent, self.next_number(), &mut promoted);
        self.materialized.extend(promoted);
        self.continuations_at_mut(parent).push(NodeRef::Move(id));
        self.dirty = true;
        self.events.push(GameEvent::TreeChanged);
        debug!(id = id.index(), "pasted subtree");
        match self.replay_move()? {
            ReplayOutcome::Moved(id) => Ok(id),
            // The top point was checked above.
            ReplayOutcome::Blocked { point } => Err(GameError::ReplayBlocked { point }),
        }
    }

    // =========================================================================
    // Adornments and comments
    // =========================================================================

    /// Mark a point on the current move, or on the start position.
    pub fn add_adornment(&mut self, point: Point, kind: AdornmentKind) -> Result<Adornment, GameError> {
        if !self.board.in_bounds(point) {
            return Err(GameError::IllegalMove {
                point,
                source: MoveError::OutOfBounds,
            });
        }
        let marks = self.cursor_adornments_mut();
        if let Some(existing) = marks.get(point, kind) {
            return Ok(existing);
        }
        let adornment = marks.add(point, kind)?;
        self.dirty = true;
        self.emit_status();
        Ok(adornment)
    }

    pub fn remove_adornment(&mut self, point: Point, kind: AdornmentKind) -> Option<Adornment> {
        let removed = self.cursor_adornments_mut().remove(point, kind)?;
        self.dirty = true;
        self.emit_status();
        Some(removed)
    }

    pub fn get_adornment(&self, point: Point, kind: AdornmentKind) -> Option<Adornment> {
        match kind {
            AdornmentKind::CurrentMove => self.current_move_marker().filter(|a| a.point == point),
            _ => self.cursor_adornments().get(point, kind),
        }
    }

    /// Adornments shown at the cursor, including the current-move marker.
    pub fn current_adornments(&self) -> Vec<Adornment> {
        let mut out: Vec<Adornment> = self.cursor_adornments().iter().copied().collect();
        out.extend(self.current_move_marker());
        out
    }

    pub fn current_move_marker(&self) -> Option<Adornment> {
        let point = self.moves.get(self.marker?)?.point?;
        Some(Adornment {
            point,
            mark: Mark::CurrentMove,
        })
    }

    fn cursor_adornments(&self) -> &Adornments {
        match self.current {
            Some(id) => &self.moves.live(id).adornments,
            None => &self.setup_adornments,
        }
    }

    fn cursor_adornments_mut(&mut self) -> &mut Adornments {
        match self.current {
            Some(id) => &mut self.moves.live_mut(id).adornments,
            None => &mut self.setup_adornments,
        }
    }

    /// Store the comment of the current move, or the game comment at the
    /// start position.
    pub fn save_current_comment(&mut self, text: &str) {
        let slot = match self.current {
            Some(id) => &mut self.moves.live_mut(id).comment,
            None => &mut self.info.comment,
        };
        if *slot != text {
            *slot = text.to_string();
            self.dirty = true;
            self.emit_status();
        }
    }

    pub fn current_comment(&self) -> &str {
        match self.current {
            Some(id) => &self.moves.live(id).comment,
            None => &self.info.comment,
        }
    }

    /// Replace the editable game information: players, komi, the game
    /// comment and the other root properties.
    ///
    /// Board size and handicap are fixed once the game exists.
    pub fn set_game_info(&mut self, info: GameInfo) -> Result<(), GameError> {
        if info.size != self.info.size || info.handicap != self.info.handicap {
            return Err(GameError::InvalidOptions(
                "board size and handicap cannot change after the game starts".to_string(),
            ));
        }
        if info == self.info {
            return Ok(());
        }
        self.info = info;
        self.dirty = true;
        self.emit_status();
        debug!(black = %self.info.player_black, white = %self.info.player_white, "edited game info");
        Ok(())
    }

    // =========================================================================
    // Saving
    // =========================================================================

    pub fn to_sgf(&self) -> String {
        writer::game_to_string(self, Flip::None)
    }

    /// Save the game and make `path` its file.
    pub fn write_game(&mut self, path: impl AsRef<Path>) -> error::Result<()> {
        let path = path.as_ref();
        fs::write(path, writer::game_to_string(self, Flip::None))?;
        self.filename = Some(path.to_path_buf());
        self.dirty = false;
        self.emit_status();
        info!(path = %path.display(), "saved game");
        Ok(())
    }

    /// Save a copy with the colors swapped. The game itself is unchanged.
    pub fn write_flipped_game(&self, path: impl AsRef<Path>) -> error::Result<()> {
        let path = path.as_ref();
        fs::write(path, writer::game_to_string(self, Flip::Colors))?;
        info!(path = %path.display(), "saved flipped game");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Promote a parsed continuation of the cursor into the arena.
    fn materialize(&mut self, raw: RawId) -> Result<MoveId, GameError> {
        if let Some(&id) = self.materialized.get(&raw) {
            return Ok(id);
        }
        let parent = self.current;
        let color = self.next_color();
        let number = self.next_number();
        let size = self.info.size;
        let node = self
            .parsed
            .as_ref()
            .and_then(|p| p.get(raw))
            .ok_or(NavigationError::NoNextMove)?;
        let mut mv = move_from_node(node, size, color, number, parent).inspect_err(|e| {
            warn!(raw = raw.index(), error = %e, "cannot read recorded move");
        })?;
        mv.parsed = Some(raw);
        mv.continuations =
            Continuations::from_children(node.children.iter().map(|&c| NodeRef::Raw(c)).collect());
        let id = self.moves.alloc(mv);
        self.materialized.insert(raw, id);
        self.continuations_at_mut(parent)
            .replace(NodeRef::Raw(raw), NodeRef::Move(id));
        debug!(raw = raw.index(), id = id.index(), "materialized move");
        Ok(id)
    }

    fn stone_played(&mut self, color: Color, point: Option<Point>, captures: &[Point]) {
        for &p in captures {
            self.events.push(GameEvent::StoneRemoved { point: p });
        }
        match color {
            Color::Black => self.black_prisoners += captures.len(),
            Color::White => self.white_prisoners += captures.len(),
        }
        if let Some(p) = point {
            self.events.push(GameEvent::StoneAdded { point: p, color });
        }
    }

    /// Move the cursor, handing the current-move marker over.
    fn set_cursor(&mut self, to: Option<MoveId>) {
        self.marker = None;
        self.current = to;
        self.marker = to.filter(|&id| !self.moves.live(id).is_pass());
        self.events.push(GameEvent::CurrentMoveChanged { current: to });
        self.emit_branches();
    }

    fn emit_branches(&mut self) {
        let c = self.cursor_continuations();
        let (branches, active) = match c.branches() {
            Some(b) => (b.to_vec(), c.selected_index()),
            None => (Vec::new(), None),
        };
        self.events.push(GameEvent::BranchesChanged { branches, active });
    }

    fn emit_status(&mut self) {
        let status = self.status();
        self.events.push(GameEvent::StatusChanged(status));
    }
}

/// Build a move from a parsed node.
///
/// A node with neither `B` nor `W` becomes a pass by `color_to_play`.
fn move_from_node(
    node: &RawNode,
    size: usize,
    color_to_play: Color,
    number: usize,
    previous: Option<MoveId>,
) -> Result<Move, GameError> {
    let (color, value) = match (node.first("B"), node.first("W")) {
        (Some(_), Some(w)) => return Err(GameError::invalid_property("W", w)),
        (Some(b), None) => (Color::Black, b),
        (None, Some(w)) => (Color::White, w),
        (None, None) => (color_to_play, ""),
    };
    let point = decode_move(value, size)
        .map_err(|()| GameError::invalid_property(color.move_property(), value))?;
    let (adornments, labels) = read_adornments(node, size)?;
    let mut mv = Move::new(color, point, number, previous);
    mv.comment = node.first("C").unwrap_or_default().to_string();
    mv.adornments = adornments;
    mv.extra_properties = pass_through(node, INTERPRETED_MOVE_PROPERTIES, labels);
    Ok(mv)
}

/// Read `SQ`, `TR` and single-letter `LB` marks.
///
/// Labels that are not a single capital letter are returned unread so they
/// can be saved back.
fn read_adornments(node: &RawNode, size: usize) -> Result<(Adornments, Vec<String>), GameError> {
    let mut marks = Adornments::new();
    for (id, kind) in [("SQ", AdornmentKind::Square), ("TR", AdornmentKind::Triangle)] {
        if let Some(values) = node.get(id) {
            let points = decode_point_list(values, size)
                .ok_or_else(|| GameError::invalid_property(id, &values.join(",")))?;
            for point in points {
                marks.add(point, kind)?;
            }
        }
    }
    let mut unread = Vec::new();
    for value in node.get("LB").unwrap_or_default() {
        match parse_label(value, size) {
            Some((point, letter)) if marks.add_letter(point, letter).is_ok() => {}
            _ => unread.push(value.clone()),
        }
    }
    Ok((marks, unread))
}

fn parse_label(value: &str, size: usize) -> Option<(Point, char)> {
    let (point, text) = value.split_once(':')?;
    let mut chars = text.chars();
    let letter = chars.next().filter(char::is_ascii_uppercase)?;
    if chars.next().is_some() {
        return None;
    }
    Some((decode_point(point, size)?, letter))
}

/// Properties not in `interpreted`, plus unread labels.
fn pass_through(node: &RawNode, interpreted: &[&str], labels: Vec<String>) -> Vec<(String, Vec<String>)> {
    let mut extra: Vec<(String, Vec<String>)> = node
        .properties
        .iter()
        .filter(|(id, _)| !interpreted.contains(&id.as_str()))
        .cloned()
        .collect();
    if !labels.is_empty() {
        extra.push(("LB".to_string(), labels));
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn game(size: usize) -> Game {
        Game::new(GameOptions {
            size,
            ..GameOptions::default()
        })
        .unwrap()
    }

    fn loaded(sgf: &str) -> Game {
        Game::from_parsed(parse(sgf).unwrap()).unwrap()
    }

    #[test]
    fn test_new_game_defaults() {
        let g = Game::new(GameOptions::default()).unwrap();
        assert_eq!(g.size(), 19);
        assert_eq!(g.info().komi, "6.5");
        assert_eq!(g.next_color(), Color::Black);
        assert!(g.board().stones().is_empty());
        assert!(!g.is_dirty());
    }

    #[test]
    fn test_handicap_stones_and_white_first() {
        let g = Game::new(GameOptions {
            handicap: 4,
            ..GameOptions::default()
        })
        .unwrap();
        assert_eq!(g.setup_black(), &[(3, 15), (15, 3), (15, 15), (3, 3)]);
        assert_eq!(g.board().move_at((3, 3)), Some(Color::Black));
        assert_eq!(g.next_color(), Color::White);
    }

    #[test]
    fn test_handicap_points() {
        assert_eq!(handicap_points(9, 9).map(|p| p.len()), Some(9));
        assert_eq!(handicap_points(9, 5).unwrap()[4], (4, 4));
        assert_eq!(handicap_points(13, 2), Some(vec![(3, 9), (9, 3)]));
        assert_eq!(handicap_points(10, 5), None);
        assert_eq!(handicap_points(5, 2), None);
        assert_eq!(handicap_points(19, 1), None);
        assert_eq!(handicap_points(19, 10), None);
    }

    #[test]
    fn test_invalid_options() {
        for options in [
            GameOptions { size: 0, ..GameOptions::default() },
            GameOptions { size: 26, ..GameOptions::default() },
            GameOptions { size: 5, handicap: 3, ..GameOptions::default() },
        ] {
            assert!(matches!(Game::new(options), Err(GameError::InvalidOptions(_))));
        }
    }

    #[test]
    fn test_make_and_unwind_move() {
        let mut g = game(9);
        let id = g.make_move((2, 2)).unwrap();
        assert_eq!(g.current_move(), Some(id));
        assert_eq!(g.board().move_at((2, 2)), Some(Color::Black));
        assert_eq!(g.next_color(), Color::White);
        assert!(g.is_dirty());
        assert_eq!(g.get_move(id).unwrap().number, 1);

        assert_eq!(g.unwind_move(), Ok(id));
        assert_eq!(g.current_move(), None);
        assert!(!g.board().has_stone_at((2, 2)));
        assert_eq!(
            g.unwind_move(),
            Err(GameError::IllegalNavigation(NavigationError::NoCurrentMove))
        );
    }

    #[test]
    fn test_illegal_moves_change_nothing() {
        let mut g = game(9);
        g.make_move((0, 0)).unwrap();
        let before = g.board().clone();
        assert!(matches!(
            g.make_move((0, 0)),
            Err(GameError::IllegalMove { source: MoveError::Occupied, .. })
        ));
        assert!(matches!(
            g.make_move((9, 0)),
            Err(GameError::IllegalMove { source: MoveError::OutOfBounds, .. })
        ));
        assert_eq!(g.board(), &before);
        assert_eq!(g.moves().len(), 1);
    }

    #[test]
    fn test_same_move_reuses_branch() {
        let mut g = game(9);
        let first = g.make_move((2, 2)).unwrap();
        g.unwind_move().unwrap();
        let again = g.make_move((2, 2)).unwrap();
        assert_eq!(first, again);
        assert_eq!(g.moves().len(), 1);
        assert!(g.start_continuations().branches().is_none());
    }

    #[test]
    fn test_new_move_at_existing_position_adds_branch() {
        let mut g = game(9);
        let a = g.make_move((2, 2)).unwrap();
        g.unwind_move().unwrap();
        let b = g.make_move((3, 3)).unwrap();
        assert_eq!(
            g.start_continuations().branches(),
            Some(&[NodeRef::Move(a), NodeRef::Move(b)][..])
        );
        assert_eq!(g.start_continuations().next(), Some(NodeRef::Move(b)));
    }

    #[test]
    fn test_capture_and_restore() {
        let mut g = game(5);
        // Black surrounds the white corner stone.
        g.make_move((0, 1)).unwrap();
        g.make_move((0, 0)).unwrap();
        let capture = g.make_move((1, 0)).unwrap();
        assert!(!g.board().has_stone_at((0, 0)));
        assert_eq!(g.black_prisoners(), 1);
        assert_eq!(g.get_move(capture).unwrap().captures(), &[(0, 0)]);

        g.unwind_move().unwrap();
        assert_eq!(g.board().move_at((0, 0)), Some(Color::White));
        assert_eq!(g.black_prisoners(), 0);

        assert_eq!(g.replay_move(), Ok(ReplayOutcome::Moved(capture)));
        assert_eq!(g.black_prisoners(), 1);
    }

    #[test]
    fn test_pass_moves() {
        let mut g = game(9);
        let pass = g.make_pass().unwrap();
        assert!(g.get_move(pass).unwrap().is_pass());
        assert_eq!(g.next_color(), Color::White);
        assert!(g.status().is_pass);
        assert_eq!(g.current_move_marker(), None);
    }

    #[test]
    fn test_lazy_materialization_is_stable() {
        let mut g = loaded("(;SZ[9];B[cc];W[dd])");
        assert!(g.moves().is_empty());
        let ReplayOutcome::Moved(first) = g.replay_move().unwrap() else {
            panic!("replay blocked");
        };
        assert_eq!(g.moves().len(), 1);
        assert_eq!(g.board().move_at((2, 2)), Some(Color::Black));
        g.unwind_move().unwrap();
        assert_eq!(g.start_continuations().next(), Some(NodeRef::Move(first)));
        assert_eq!(g.replay_move(), Ok(ReplayOutcome::Moved(first)));
        assert_eq!(g.moves().len(), 1);
    }

    #[test]
    fn test_invalid_recorded_move_leaves_game_untouched() {
        let mut g = loaded("(;SZ[9];B[cc];B[zz])");
        g.replay_move().unwrap();
        let cursor = g.current_move();
        assert_eq!(
            g.replay_move(),
            Err(GameError::invalid_property("B", "zz"))
        );
        assert_eq!(g.current_move(), cursor);
        assert_eq!(g.moves().len(), 1);

        let mut g = loaded("(;SZ[9];B[cc]W[dd])");
        assert!(matches!(g.replay_move(), Err(GameError::InvalidProperty { .. })));
        assert!(g.moves().is_empty());
    }

    #[test]
    fn test_node_without_move_is_a_pass() {
        let mut g = loaded("(;SZ[9];C[just a comment])");
        let ReplayOutcome::Moved(id) = g.replay_move().unwrap() else {
            panic!("replay blocked");
        };
        let mv = g.get_move(id).unwrap();
        assert!(mv.is_pass());
        assert_eq!(mv.color, Color::Black);
        assert_eq!(mv.comment, "just a comment");
    }

    #[test]
    fn test_root_with_move_is_rejected() {
        let parsed = parse("(;SZ[9]B[aa])").unwrap();
        assert!(matches!(
            Game::from_parsed(parsed),
            Err(GameError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn test_root_properties() {
        let g = loaded("(;GM[1]FF[4]SZ[13]KM[0.5]HA[2]PB[Kim]PW[Lee]AB[dj][jd]AW[aa:bb]C[hi]RU[Japanese])");
        let info = g.info();
        assert_eq!(info.size, 13);
        assert_eq!(info.komi, "0.5");
        assert_eq!(info.handicap, 2);
        assert_eq!(info.player_black, "Kim");
        assert_eq!(info.player_white, "Lee");
        assert_eq!(info.comment, "hi");
        assert_eq!(info.extra_properties, vec![("RU".to_string(), vec!["Japanese".to_string()])]);
        assert_eq!(g.setup_white().len(), 4);
        assert_eq!(g.board().move_at((9, 3)), Some(Color::Black));
        assert_eq!(g.next_color(), Color::White);
    }

    #[test]
    fn test_replay_blocked_by_stone() {
        let mut g = loaded("(;SZ[9]AB[cc];B[cc])");
        let before = g.board().clone();
        assert_eq!(g.replay_move(), Ok(ReplayOutcome::Blocked { point: (2, 2) }));
        assert_eq!(g.current_move(), None);
        assert_eq!(g.board(), &before);
    }

    #[test]
    fn test_goto_start_and_last_move() {
        let mut g = loaded("(;SZ[9];B[aa];W[bb];B[cc])");
        assert_eq!(g.goto_last_move(), Ok(None));
        assert_eq!(g.status().move_number, 3);
        g.goto_start();
        assert_eq!(g.current_move(), None);
        assert!(g.board().stones().is_empty());
        g.goto_start();
        assert_eq!(g.current_move(), None);
    }

    #[test]
    fn test_set_current_branch() {
        let mut g = loaded("(;SZ[9](;B[aa])(;B[bb]))");
        assert_eq!(g.current_branches(), (2, Some(0)));
        g.set_current_branch(1).unwrap();
        g.replay_move().unwrap();
        assert_eq!(g.board().move_at((1, 1)), Some(Color::Black));
        g.unwind_move().unwrap();
        assert!(matches!(
            g.set_current_branch(2),
            Err(GameError::IllegalNavigation(NavigationError::BranchOutOfRange { index: 2, count: 2 }))
        ));
    }

    #[test]
    fn test_move_branch_requires_branch_start() {
        let mut g = game(9);
        g.make_move((0, 0)).unwrap();
        assert_eq!(
            g.move_branch_up(),
            Err(GameError::IllegalNavigation(NavigationError::NotBranchStart))
        );
        g.unwind_move().unwrap();
        g.make_move((1, 1)).unwrap();
        assert_eq!(
            g.move_branch_down(),
            Err(GameError::IllegalNavigation(NavigationError::BranchAtEdge))
        );
        g.move_branch_up().unwrap();
        assert_eq!(g.start_continuations().index_of(NodeRef::Move(g.current_move().unwrap())), Some(0));
    }

    #[test]
    fn test_cut_collapses_two_branches() {
        let mut g = game(9);
        let a = g.make_move((0, 0)).unwrap();
        g.unwind_move().unwrap();
        let b = g.make_move((1, 1)).unwrap();
        g.make_move((2, 2)).unwrap();
        g.unwind_move().unwrap();

        g.cut_move().unwrap();
        assert_eq!(g.current_move(), None);
        assert!(g.start_continuations().branches().is_none());
        assert_eq!(g.start_continuations().next(), Some(NodeRef::Move(a)));
        assert!(g.get_move(b).is_none());
        assert_eq!(g.clipboard().map(Subtree::move_count), Some(2));
        assert!(g.board().stones().is_empty());
    }

    #[test]
    fn test_paste_checks_color_and_point() {
        let mut g = game(9);
        g.make_move((0, 0)).unwrap();
        g.make_move((1, 1)).unwrap();
        g.cut_move().unwrap();
        // The clipboard holds a white move and white is to play.
        assert!(g.can_paste());
        g.unwind_move().unwrap();
        assert!(!g.can_paste());
        assert_eq!(g.paste_move(), Err(GameError::PasteColorMismatch));

        g.make_move((1, 1)).unwrap();
        assert_eq!(g.next_color(), Color::White);
        assert!(matches!(
            g.paste_move(),
            Err(GameError::IllegalMove { source: MoveError::Occupied, .. })
        ));
        assert!(g.clipboard().is_some());
    }

    #[test]
    fn test_paste_replays_and_empties_clipboard() {
        let mut g = game(9);
        g.make_move((0, 0)).unwrap();
        g.make_move((1, 1)).unwrap();
        g.make_move((2, 2)).unwrap();
        g.unwind_move().unwrap();
        g.cut_move().unwrap();
        let id = g.paste_move().unwrap();
        assert_eq!(g.current_move(), Some(id));
        assert_eq!(g.board().move_at((1, 1)), Some(Color::White));
        assert!(g.clipboard().is_none());
        assert_eq!(g.paste_move(), Err(GameError::IllegalNavigation(NavigationError::EmptyClipboard)));
        assert_eq!(g.goto_last_move(), Ok(None));
        assert_eq!(g.status().move_number, 3);
    }

    #[test]
    fn test_paste_rejects_duplicate_branch() {
        let mut g = game(9);
        g.make_move((0, 0)).unwrap();
        g.cut_move().unwrap();
        let again = g.make_move((0, 0)).unwrap();
        g.unwind_move().unwrap();

        assert!(!g.can_paste());
        assert_eq!(g.paste_move(), Err(GameError::PasteDuplicatesBranch));
        assert_eq!(g.start_continuations().children(), vec![NodeRef::Move(again)]);
        assert_eq!(g.current_move(), None);
        assert!(g.clipboard().is_some());
    }

    #[test]
    fn test_set_game_info() {
        let mut g = game(9);
        g.take_events();
        let mut info = g.info().clone();
        info.player_black = "Honinbo Shusaku".to_string();
        info.komi = "0".to_string();
        info.extra_properties.push(("EV".to_string(), vec!["Castle game".to_string()]));
        g.set_game_info(info.clone()).unwrap();
        assert_eq!(g.info(), &info);
        assert!(g.is_dirty());
        assert!(matches!(g.take_events().last(), Some(GameEvent::StatusChanged(s)) if s.dirty));

        info.size = 13;
        assert!(matches!(g.set_game_info(info), Err(GameError::InvalidOptions(_))));
        assert_eq!(g.info().size, 9);
        assert!(g.to_sgf().contains("KM[0]PB[Honinbo Shusaku]"));
    }

    #[test]
    fn test_adornments_on_cursor() {
        let mut g = game(9);
        g.add_adornment((4, 4), AdornmentKind::Triangle).unwrap();
        let id = g.make_move((2, 2)).unwrap();
        let a = g.add_adornment((3, 3), AdornmentKind::Letter).unwrap();
        assert_eq!(a.letter(), Some('A'));
        assert_eq!(g.get_adornment((4, 4), AdornmentKind::Triangle), None);
        assert_eq!(
            g.get_adornment((2, 2), AdornmentKind::CurrentMove).map(|a| a.mark),
            Some(Mark::CurrentMove)
        );
        assert_eq!(g.current_adornments().len(), 2);
        assert_eq!(g.get_move(id).unwrap().adornments.len(), 1);

        g.unwind_move().unwrap();
        assert!(g.get_adornment((4, 4), AdornmentKind::Triangle).is_some());
        assert!(g.remove_adornment((4, 4), AdornmentKind::Triangle).is_some());
        assert!(g.remove_adornment((4, 4), AdornmentKind::Triangle).is_none());
    }

    #[test]
    fn test_recorded_adornments() {
        let mut g = loaded("(;SZ[9]TR[aa];B[cc]SQ[dd][ee]LB[ff:A][gg:hello]XX[1])");
        assert!(g.get_adornment((0, 0), AdornmentKind::Triangle).is_some());
        let ReplayOutcome::Moved(id) = g.replay_move().unwrap() else {
            panic!("replay blocked");
        };
        let mv = g.get_move(id).unwrap();
        assert_eq!(mv.adornments.len(), 3);
        assert_eq!(
            mv.extra_properties,
            vec![
                ("XX".to_string(), vec!["1".to_string()]),
                ("LB".to_string(), vec!["gg:hello".to_string()]),
            ]
        );
    }

    #[test]
    fn test_save_comment() {
        let mut g = game(9);
        g.save_current_comment("game note");
        assert_eq!(g.info().comment, "game note");
        assert!(g.is_dirty());
        g.make_move((0, 0)).unwrap();
        g.save_current_comment("move note");
        assert_eq!(g.current_comment(), "move note");
        g.unwind_move().unwrap();
        assert_eq!(g.current_comment(), "game note");
    }

    #[test]
    fn test_events_for_capture() {
        let mut g = game(5);
        g.make_move((0, 1)).unwrap();
        g.make_move((0, 0)).unwrap();
        g.take_events();
        g.make_move((1, 0)).unwrap();
        let events = g.take_events();
        assert!(events.contains(&GameEvent::StoneRemoved { point: (0, 0) }));
        assert!(events.contains(&GameEvent::StoneAdded {
            point: (1, 0),
            color: Color::Black
        }));
        assert!(events.contains(&GameEvent::TreeChanged));
        assert!(g.take_events().is_empty());
    }
}
