//! Canonical SGF output.
//!
//! The root node is regenerated from [`GameInfo`](crate::game::GameInfo);
//! live moves are written from the arena and parsed nodes that were never
//! visited are copied through property by property.

use crate::adornments::{Adornments, Mark};
use crate::board::{Color, Point};
use crate::constants::APP_NAME;
use crate::game::Game;
use crate::tree::{Move, NodeRef};

/// Whether to swap the colors of every stone on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    None,
    Colors,
}

impl Flip {
    fn property<'a>(self, id: &'a str) -> &'a str {
        match (self, id) {
            (Flip::None, _) => id,
            (Flip::Colors, "B") => "W",
            (Flip::Colors, "W") => "B",
            (Flip::Colors, "AB") => "AW",
            (Flip::Colors, "AW") => "AB",
            (Flip::Colors, _) => id,
        }
    }

    fn color(self, color: Color) -> Color {
        match self {
            Flip::None => color,
            Flip::Colors => color.opponent(),
        }
    }
}

/// SGF point value, column letter first.
pub fn encode_point((row, col): Point) -> String {
    let letter = |i: usize| char::from(b'a' + i as u8);
    format!("{}{}", letter(col), letter(row))
}

/// Escape a property value.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == ']' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Serialize the whole game tree.
pub fn game_to_string(game: &Game, flip: Flip) -> String {
    let mut w = Writer {
        game,
        flip,
        out: String::new(),
    };
    w.out.push_str("(;");
    w.root();
    w.children(game.children_of(None));
    w.out.push_str(")\n");
    w.out
}

struct Writer<'a> {
    game: &'a Game,
    flip: Flip,
    out: String,
}

impl Writer<'_> {
    fn property<S: AsRef<str>>(&mut self, id: &str, values: &[S]) {
        if values.is_empty() {
            return;
        }
        self.out.push_str(id);
        for value in values {
            self.out.push('[');
            self.out.push_str(&escape(value.as_ref()));
            self.out.push(']');
        }
    }

    fn root(&mut self) {
        let game = self.game;
        let info = game.info();
        let version = format!("{APP_NAME}:{}", env!("CARGO_PKG_VERSION"));
        self.property("GM", &["1"]);
        self.property("FF", &["4"]);
        self.property("CA", &["UTF-8"]);
        self.property("AP", &[version]);
        self.property("SZ", &[info.size.to_string()]);
        if !info.komi.is_empty() {
            self.property("KM", &[info.komi.as_str()]);
        }
        if info.handicap > 0 {
            self.property("HA", &[info.handicap.to_string()]);
        }
        if !info.player_black.is_empty() {
            self.property("PB", &[info.player_black.as_str()]);
        }
        if !info.player_white.is_empty() {
            self.property("PW", &[info.player_white.as_str()]);
        }
        let (black, white) = match self.flip {
            Flip::None => (game.setup_black(), game.setup_white()),
            Flip::Colors => (game.setup_white(), game.setup_black()),
        };
        self.property("AB", &points(black));
        self.property("AW", &points(white));
        if !info.comment.is_empty() {
            self.property("C", &[info.comment.as_str()]);
        }
        self.adornments(game.setup_adornments(), &info.extra_properties);
        self.extra(&info.extra_properties);
    }

    fn adornments(&mut self, marks: &Adornments, extra: &[(String, Vec<String>)]) {
        let with = |mark: Mark| -> Vec<String> {
            marks
                .iter()
                .filter(|a| a.mark == mark)
                .map(|a| encode_point(a.point))
                .collect()
        };
        self.property("SQ", &with(Mark::Square));
        self.property("TR", &with(Mark::Triangle));
        let mut labels: Vec<String> = marks
            .iter()
            .filter_map(|a| a.letter().map(|c| format!("{}:{c}", encode_point(a.point))))
            .collect();
        // Labels the engine does not edit are kept after its own.
        for (id, values) in extra {
            if id == "LB" {
                labels.extend(values.iter().cloned());
            }
        }
        self.property("LB", &labels);
    }

    fn extra(&mut self, extra: &[(String, Vec<String>)]) {
        for (id, values) in extra.iter().filter(|(id, _)| id != "LB") {
            let id = self.flip.property(id);
            self.property(id, values);
        }
    }

    fn live(&mut self, mv: &Move) {
        let color = self.flip.color(mv.color);
        let value = mv.point.map(encode_point).unwrap_or_default();
        self.property(color.move_property(), &[value]);
        if !mv.comment.is_empty() {
            self.property("C", &[mv.comment.as_str()]);
        }
        self.adornments(&mv.adornments, &mv.extra_properties);
        self.extra(&mv.extra_properties);
    }

    fn node(&mut self, node: NodeRef) {
        let game = self.game;
        match node {
            NodeRef::Move(id) => {
                if let Some(mv) = game.get_move(id) {
                    self.live(mv);
                }
            }
            NodeRef::Raw(raw) => {
                if let Some(n) = game.parsed().and_then(|p| p.get(raw)) {
                    for (id, values) in &n.properties {
                        let id = self.flip.property(id);
                        self.property(id, values);
                    }
                }
            }
        }
    }

    /// Write the continuations of a node: inline for a single line,
    /// parenthesized for each branch.
    fn children(&mut self, children: Vec<NodeRef>) {
        match children.as_slice() {
            [] => {}
            [only] => self.line(*only, false),
            _ => {
                for child in children {
                    self.line(child, true);
                    self.out.push(')');
                }
            }
        }
    }

    /// Write `node` and the moves after it, one node per line.
    fn line(&mut self, node: NodeRef, variation: bool) {
        let mut node = node;
        let mut variation = variation;
        loop {
            self.out.push('\n');
            if variation {
                self.out.push('(');
            }
            self.out.push(';');
            self.node(node);
            let children = self.game.children_of(Some(node));
            match children.as_slice() {
                [] => return,
                [only] => {
                    node = *only;
                    variation = false;
                }
                _ => {
                    self.children(children);
                    return;
                }
            }
        }
    }
}

fn points(points: &[Point]) -> Vec<String> {
    points.iter().copied().map(encode_point).collect()
}
