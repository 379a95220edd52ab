//! SGF reader: text to an immutable tree of raw nodes.
//!
//! ```text
//! GameTree := "(" Sequence {GameTree} ")"
//! Sequence := Node {Node}
//! Node     := ";" {Property}
//! Property := Identifier {"[" ValueText "]"}
//! ```
//!
//! Values are kept as unvalidated strings; interpreting them (points, colors,
//! numbers) happens when the game tree materializes a node. Nodes live in an
//! arena and are addressed by [`RawId`], which doubles as their identity.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::board::Point;
use crate::constants::LEGACY_PASS;
use crate::error::{FormatError, FormatErrorKind, Result};

/// Index of a node in a [`ParsedGame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId(pub(crate) usize);

impl RawId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One parsed node: properties in file order plus its children.
///
/// A node with more than one child is a branch point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNode {
    pub properties: Vec<(String, Vec<String>)>,
    pub children: Vec<RawId>,
    pub parent: Option<RawId>,
}

impl RawNode {
    /// All values of property `id`, if present.
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.properties
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.as_slice())
    }

    /// First value of property `id`, if present.
    pub fn first(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

/// The first game tree of an SGF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGame {
    nodes: Vec<RawNode>,
}

impl ParsedGame {
    /// The root node, which holds game-level properties.
    pub fn root(&self) -> RawId {
        RawId(0)
    }

    pub fn node(&self, id: RawId) -> &RawNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: RawId) -> Option<&RawNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Parse SGF text. Only the first game of a collection is read.
pub fn parse(text: &str) -> std::result::Result<ParsedGame, FormatError> {
    let mut parser = Parser {
        src: text.as_bytes(),
        pos: 0,
        line: 1,
        nodes: Vec::new(),
    };
    // Anything before the first '(' is not part of the game.
    while let Some(b) = parser.peek() {
        if b == b'(' {
            break;
        }
        parser.bump();
    }
    if parser.peek().is_none() {
        return Err(parser.error(FormatErrorKind::UnexpectedEndOfInput));
    }
    parser.game_tree(None)?;
    Ok(ParsedGame {
        nodes: parser.nodes,
    })
}

/// Read and parse an SGF file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedGame> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let game = parse(&text)?;
    info!(path = %path.display(), nodes = game.len(), "parsed game record");
    Ok(game)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    nodes: Vec<RawNode>,
}

impl Parser<'_> {
    fn error(&self, kind: FormatErrorKind) -> FormatError {
        FormatError {
            kind,
            offset: self.pos,
            line: self.line,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn unexpected(&self, eof_kind: FormatErrorKind, other: FormatErrorKind) -> FormatError {
        match self.peek() {
            None => self.error(eof_kind),
            Some(_) => self.error(other),
        }
    }

    /// Parse a game tree starting at '(' and hang it under `parent`.
    fn game_tree(&mut self, parent: Option<RawId>) -> std::result::Result<RawId, FormatError> {
        self.bump(); // '('
        self.skip_ws();
        match self.peek() {
            Some(b';') => {}
            Some(b')') => return Err(self.error(FormatErrorKind::UnbalancedDelimiters)),
            _ => {
                return Err(self.unexpected(
                    FormatErrorKind::UnexpectedEndOfInput,
                    FormatErrorKind::MalformedProperty,
                ));
            }
        }
        let first = self.node(parent)?;
        let mut last = first;

        // Sequence
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b';') => last = self.node(Some(last))?,
                Some(b'(') => break,
                Some(b')') => {
                    self.bump();
                    return Ok(first);
                }
                _ => {
                    return Err(self.unexpected(
                        FormatErrorKind::UnexpectedEndOfInput,
                        FormatErrorKind::MalformedProperty,
                    ));
                }
            }
        }

        // Variations hanging off the last node of the sequence
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'(') => {
                    self.game_tree(Some(last))?;
                }
                Some(b')') => {
                    self.bump();
                    return Ok(first);
                }
                _ => {
                    return Err(self.unexpected(
                        FormatErrorKind::UnexpectedEndOfInput,
                        FormatErrorKind::UnbalancedDelimiters,
                    ));
                }
            }
        }
    }

    fn node(&mut self, parent: Option<RawId>) -> std::result::Result<RawId, FormatError> {
        self.bump(); // ';'
        let id = RawId(self.nodes.len());
        self.nodes.push(RawNode {
            parent,
            ..RawNode::default()
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b) if b.is_ascii_alphabetic() => self.property(id)?,
                _ => return Ok(id),
            }
        }
    }

    fn property(&mut self, node: RawId) -> std::result::Result<(), FormatError> {
        let mut ident = String::new();
        while let Some(b) = self.peek() {
            if !b.is_ascii_alphabetic() {
                break;
            }
            // Old long names like "AddBlack" keep only their capitals.
            if b.is_ascii_uppercase() {
                ident.push(b as char);
            }
            self.bump();
        }
        if ident.is_empty() {
            return Err(self.error(FormatErrorKind::MalformedProperty));
        }
        self.skip_ws();
        if self.peek() != Some(b'[') {
            return Err(self.unexpected(
                FormatErrorKind::UnexpectedEndOfInput,
                FormatErrorKind::MalformedProperty,
            ));
        }
        let mut values = Vec::new();
        while self.peek() == Some(b'[') {
            values.push(self.value()?);
            self.skip_ws();
        }
        let props = &mut self.nodes[node.0].properties;
        match props.iter_mut().find(|(k, _)| *k == ident) {
            Some((_, existing)) => existing.extend(values),
            None => props.push((ident, values)),
        }
        Ok(())
    }

    fn value(&mut self) -> std::result::Result<String, FormatError> {
        self.bump(); // '['
        let mut buf = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error(FormatErrorKind::UnexpectedEndOfInput)),
                Some(b']') => break,
                Some(b'\\') => match self.bump() {
                    None => return Err(self.error(FormatErrorKind::UnexpectedEndOfInput)),
                    // Soft line break: backslash-newline disappears.
                    Some(b'\n') => {
                        if self.peek() == Some(b'\r') {
                            self.bump();
                        }
                    }
                    Some(b'\r') => {
                        if self.peek() == Some(b'\n') {
                            self.bump();
                        }
                    }
                    Some(c) => buf.push(c),
                },
                Some(c) => buf.push(c),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

// =============================================================================
// Point values
// =============================================================================

fn coord_index(b: u8) -> Option<usize> {
    b.is_ascii_lowercase().then(|| (b - b'a') as usize)
}

/// Decode a stone point such as "pd" (column first, then row).
pub fn decode_point(value: &str, size: usize) -> Option<Point> {
    let bytes = value.trim().as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let col = coord_index(bytes[0])?;
    let row = coord_index(bytes[1])?;
    (row < size && col < size).then_some((row, col))
}

/// Decode a move value: `Ok(None)` is a pass.
pub(crate) fn decode_move(value: &str, size: usize) -> std::result::Result<Option<Point>, ()> {
    let value = value.trim();
    if value.is_empty() || (value == LEGACY_PASS && size <= 19) {
        return Ok(None);
    }
    decode_point(value, size).map(Some).ok_or(())
}

/// Decode a list of points, expanding compressed "aa:cc" rectangles.
pub fn decode_point_list(values: &[String], size: usize) -> Option<Vec<Point>> {
    let mut out = Vec::new();
    for value in values {
        match value.split_once(':') {
            Some((a, b)) => {
                let (r1, c1) = decode_point(a, size)?;
                let (r2, c2) = decode_point(b, size)?;
                for row in r1.min(r2)..=r1.max(r2) {
                    for col in c1.min(c2)..=c1.max(c2) {
                        out.push((row, col));
                    }
                }
            }
            None => out.push(decode_point(value, size)?),
        }
    }
    Some(out)
}
