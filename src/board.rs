//! Go board: stone placement, group capture, and coordinate naming.
//!
//! Points are zero-based `(row, column)` pairs counted from the top-left
//! corner, the same orientation SGF uses.

use std::fmt;

use crate::error::MoveError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// SGF property identifier for a move of this color.
    pub fn move_property(self) -> &'static str {
        match self {
            Color::Black => "B",
            Color::White => "W",
        }
    }
}

/// A board point as `(row, column)`.
pub type Point = (usize, usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    pub size: usize,
    cells: Vec<Option<Color>>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    fn idx(&self, (row, col): Point) -> usize {
        row * self.size + col
    }

    pub fn in_bounds(&self, (row, col): Point) -> bool {
        row < self.size && col < self.size
    }

    /// Returns the color of the stone at `point`, if any.
    pub fn move_at(&self, point: Point) -> Option<Color> {
        if !self.in_bounds(point) {
            return None;
        }
        self.cells[self.idx(point)]
    }

    pub fn has_stone_at(&self, point: Point) -> bool {
        self.move_at(point).is_some()
    }

    fn neighbors(&self, (row, col): Point) -> impl Iterator<Item = Point> + '_ {
        let s = self.size;
        let mut v = Vec::with_capacity(4);
        if row > 0 {
            v.push((row - 1, col));
        }
        if row + 1 < s {
            v.push((row + 1, col));
        }
        if col > 0 {
            v.push((row, col - 1));
        }
        if col + 1 < s {
            v.push((row, col + 1));
        }
        v.into_iter()
    }

    /// Place a stone and remove every adjacent opponent group left without
    /// liberties.
    ///
    /// Returns the captured points. A stone that ends up with no liberties
    /// itself stays on the board.
    pub fn place_stone(&mut self, point: Point, color: Color) -> Result<Vec<Point>, MoveError> {
        if !self.in_bounds(point) {
            return Err(MoveError::OutOfBounds);
        }
        if self.has_stone_at(point) {
            return Err(MoveError::Occupied);
        }
        let idx = self.idx(point);
        self.cells[idx] = Some(color);

        let opp = color.opponent();
        let mut captured: Vec<Point> = Vec::new();
        let adjacent: Vec<Point> = self.neighbors(point).collect();
        for n in adjacent {
            // A group touching the new stone twice is gone after the first pass.
            if self.move_at(n) == Some(opp) && self.group_liberties(n) == 0 {
                let start = captured.len();
                self.collect_group(n, &mut captured);
                for &p in &captured[start..] {
                    let i = self.idx(p);
                    self.cells[i] = None;
                }
            }
        }
        Ok(captured)
    }

    /// Put a setup stone on the board without capture processing.
    pub fn set_stone(&mut self, point: Point, color: Color) -> Result<(), MoveError> {
        if !self.in_bounds(point) {
            return Err(MoveError::OutOfBounds);
        }
        let idx = self.idx(point);
        self.cells[idx] = Some(color);
        Ok(())
    }

    /// Clear a point. Used when rewinding, so it never captures anything.
    pub fn remove_stone(&mut self, point: Point) -> Option<Color> {
        if !self.in_bounds(point) {
            return None;
        }
        let idx = self.idx(point);
        self.cells[idx].take()
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// All stones on the board in row-major order.
    pub fn stones(&self) -> Vec<(Point, Color)> {
        let mut out = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                if let Some(c) = self.cells[self.idx((row, col))] {
                    out.push(((row, col), c));
                }
            }
        }
        out
    }

    fn collect_group(&self, start: Point, out: &mut Vec<Point>) -> usize {
        let Some(color) = self.move_at(start) else {
            return 0;
        };
        let mut stack = vec![start];
        let mut visited = vec![false; self.size * self.size];
        let mut count = 0;
        while let Some(p) = stack.pop() {
            let i = self.idx(p);
            if visited[i] {
                continue;
            }
            visited[i] = true;
            if self.move_at(p) == Some(color) {
                out.push(p);
                count += 1;
                for n in self.neighbors(p) {
                    if !visited[self.idx(n)] && self.move_at(n) == Some(color) {
                        stack.push(n);
                    }
                }
            }
        }
        count
    }

    /// Count the distinct empty points adjacent to the group at `point`.
    ///
    /// Returns 0 for an empty point.
    pub fn group_liberties(&self, point: Point) -> usize {
        let Some(color) = self.move_at(point) else {
            return 0;
        };
        let mut stack = vec![point];
        let mut visited = vec![false; self.size * self.size];
        let mut liberty_seen = vec![false; self.size * self.size];
        let mut liberties = 0;
        while let Some(p) = stack.pop() {
            let i = self.idx(p);
            if visited[i] {
                continue;
            }
            visited[i] = true;
            for n in self.neighbors(p) {
                let ni = self.idx(n);
                match self.move_at(n) {
                    None => {
                        if !liberty_seen[ni] {
                            liberty_seen[ni] = true;
                            liberties += 1;
                        }
                    }
                    Some(c) if c == color && !visited[ni] => stack.push(n),
                    _ => {}
                }
            }
        }
        liberties
    }
}

/// Column letter for a vertex name, skipping 'I'.
fn column_letter(col: usize) -> char {
    let c = (b'A' + col as u8) as char;
    if c >= 'I' { (c as u8 + 1) as char } else { c }
}

/// Parse a vertex such as "D4" into a point on a board of `size` lines.
///
/// Columns use letters A-Z skipping I, rows count up from the bottom edge.
/// Returns `None` for malformed or off-board vertices.
pub fn parse_vertex(s: &str, size: usize) -> Option<Point> {
    let bytes = s.trim().as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let col_char = bytes[0].to_ascii_uppercase();
    if !col_char.is_ascii_uppercase() || col_char == b'I' {
        return None;
    }
    let mut col = (col_char - b'A') as usize;
    if col_char > b'I' {
        col -= 1;
    }
    let digits = std::str::from_utf8(&bytes[1..]).ok()?;
    let row_number: usize = digits.parse().ok()?;
    if row_number == 0 || row_number > size || col >= size {
        return None;
    }
    Some((size - row_number, col))
}

/// Format a point as a vertex name (e.g. "D4").
pub fn vertex_name((row, col): Point, size: usize) -> String {
    format!("{}{}", column_letter(col), size - row)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..self.size {
            write!(f, "{} ", column_letter(col))?;
        }
        writeln!(f)?;
        for row in 0..self.size {
            write!(f, "{:>2} ", self.size - row)?;
            for col in 0..self.size {
                let ch = match self.move_at((row, col)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_and_query() {
        let mut board = Board::new(9);
        assert_eq!(board.place_stone((2, 3), Color::Black), Ok(vec![]));
        assert_eq!(board.move_at((2, 3)), Some(Color::Black));
        assert_eq!(board.move_at((3, 2)), None);
        assert_eq!(board.move_at((9, 0)), None);
    }

    #[test]
    fn test_occupied_and_out_of_bounds() {
        let mut board = Board::new(5);
        board.place_stone((0, 0), Color::Black).unwrap();
        assert_eq!(
            board.place_stone((0, 0), Color::White),
            Err(MoveError::Occupied)
        );
        assert_eq!(
            board.place_stone((5, 0), Color::White),
            Err(MoveError::OutOfBounds)
        );
        // Failed placements leave the board alone.
        assert_eq!(board.stones(), vec![((0, 0), Color::Black)]);
    }

    #[test]
    fn test_corner_capture() {
        let mut board = Board::new(9);
        board.place_stone((0, 0), Color::White).unwrap();
        board.place_stone((0, 1), Color::Black).unwrap();
        let captured = board.place_stone((1, 0), Color::Black).unwrap();
        assert_eq!(captured, vec![(0, 0)]);
        assert_eq!(board.move_at((0, 0)), None);
    }

    #[test]
    fn test_group_capture_counts_every_stone() {
        let mut board = Board::new(9);
        // White pair at (4,4),(4,5) surrounded by black.
        for p in [(4, 4), (4, 5)] {
            board.set_stone(p, Color::White).unwrap();
        }
        for p in [(3, 4), (3, 5), (5, 4), (5, 5), (4, 3)] {
            board.set_stone(p, Color::Black).unwrap();
        }
        assert_eq!(board.group_liberties((4, 4)), 1);
        let mut captured = board.place_stone((4, 6), Color::Black).unwrap();
        captured.sort();
        assert_eq!(captured, vec![(4, 4), (4, 5)]);
        assert_eq!(board.group_liberties((4, 3)), 4);
    }

    #[test]
    fn test_group_with_liberty_survives() {
        let mut board = Board::new(9);
        board.set_stone((4, 4), Color::White).unwrap();
        board.set_stone((3, 4), Color::Black).unwrap();
        board.set_stone((5, 4), Color::Black).unwrap();
        let captured = board.place_stone((4, 3), Color::Black).unwrap();
        assert!(captured.is_empty());
        assert_eq!(board.move_at((4, 4)), Some(Color::White));
        assert_eq!(board.group_liberties((4, 4)), 1);
    }

    #[test]
    fn test_self_atari_stone_stays() {
        let mut board = Board::new(9);
        board.set_stone((0, 1), Color::Black).unwrap();
        board.set_stone((1, 0), Color::Black).unwrap();
        let captured = board.place_stone((0, 0), Color::White).unwrap();
        assert!(captured.is_empty());
        assert_eq!(board.move_at((0, 0)), Some(Color::White));
        assert_eq!(board.group_liberties((0, 0)), 0);
    }

    #[test]
    fn test_capture_before_self_liberty_check() {
        // Black (0,1) is held by white (0,2) and (1,1); black (1,0) keeps (2,0).
        let mut board = Board::new(5);
        board.set_stone((0, 1), Color::Black).unwrap();
        board.set_stone((0, 2), Color::White).unwrap();
        board.set_stone((1, 1), Color::White).unwrap();
        board.set_stone((1, 0), Color::Black).unwrap();
        let captured = board.place_stone((0, 0), Color::White).unwrap();
        assert_eq!(captured, vec![(0, 1)]);
        assert_eq!(board.move_at((1, 0)), Some(Color::Black));
    }

    #[test]
    fn test_remove_stone_never_captures() {
        let mut board = Board::new(5);
        board.set_stone((0, 0), Color::White).unwrap();
        board.set_stone((0, 1), Color::Black).unwrap();
        assert_eq!(board.remove_stone((0, 1)), Some(Color::Black));
        assert_eq!(board.remove_stone((0, 1)), None);
        assert_eq!(board.move_at((0, 0)), Some(Color::White));
    }

    #[test]
    fn test_vertex_roundtrip() {
        for size in [9, 13, 19, 25] {
            for row in 0..size {
                for col in 0..size {
                    let name = vertex_name((row, col), size);
                    assert_eq!(parse_vertex(&name, size), Some((row, col)), "{name}");
                }
            }
        }
    }

    #[test]
    fn test_vertex_skips_i() {
        assert_eq!(parse_vertex("H5", 19), Some((14, 7)));
        assert_eq!(parse_vertex("J5", 19), Some((14, 8)));
        assert_eq!(parse_vertex("I5", 19), None);
        assert_eq!(parse_vertex("A1", 19), Some((18, 0)));
        assert_eq!(parse_vertex("T19", 19), Some((0, 18)));
        assert_eq!(parse_vertex("T20", 19), None);
        assert_eq!(parse_vertex("pass", 19), None);
    }

    #[test]
    fn test_display() {
        let mut board = Board::new(3);
        board.set_stone((0, 0), Color::Black).unwrap();
        board.set_stone((2, 2), Color::White).unwrap();
        let text = board.to_string();
        assert_eq!(text, "   A B C \n 3 X . . \n 2 . . . \n 1 . . O \n");
    }
}
