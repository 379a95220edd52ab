//! Board markup attached to a move: squares, triangles, letters, and the
//! current-move marker.

use crate::board::Point;
use crate::constants::MAX_LETTER_ADORNMENTS;
use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdornmentKind {
    Square,
    Triangle,
    Letter,
    CurrentMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Square,
    Triangle,
    Letter(char),
    CurrentMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Adornment {
    pub point: Point,
    pub mark: Mark,
}

impl Adornment {
    pub fn kind(&self) -> AdornmentKind {
        match self.mark {
            Mark::Square => AdornmentKind::Square,
            Mark::Triangle => AdornmentKind::Triangle,
            Mark::Letter(_) => AdornmentKind::Letter,
            Mark::CurrentMove => AdornmentKind::CurrentMove,
        }
    }

    pub fn letter(&self) -> Option<char> {
        match self.mark {
            Mark::Letter(c) => Some(c),
            _ => None,
        }
    }
}

/// Adornments of one move (or of the start position), in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adornments {
    items: Vec<Adornment>,
}

impl Adornments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Adornment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, point: Point, kind: AdornmentKind) -> Option<Adornment> {
        self.items
            .iter()
            .find(|a| a.point == point && a.kind() == kind)
            .copied()
    }

    /// Add an adornment, allocating the next free letter for letter marks.
    ///
    /// An existing adornment of the same kind at `point` is returned as is.
    pub fn add(&mut self, point: Point, kind: AdornmentKind) -> Result<Adornment, GameError> {
        if let Some(existing) = self.get(point, kind) {
            return Ok(existing);
        }
        let mark = match kind {
            AdornmentKind::Square => Mark::Square,
            AdornmentKind::Triangle => Mark::Triangle,
            AdornmentKind::Letter => Mark::Letter(self.next_letter()?),
            AdornmentKind::CurrentMove => return Err(GameError::UnsupportedAdornment),
        };
        let adornment = Adornment { point, mark };
        self.items.push(adornment);
        Ok(adornment)
    }

    /// Add a letter read from a game record, keeping its character.
    pub(crate) fn add_letter(&mut self, point: Point, letter: char) -> Result<(), GameError> {
        if self.letters_in_use() >= MAX_LETTER_ADORNMENTS {
            return Err(GameError::LettersExhausted);
        }
        self.items.push(Adornment {
            point,
            mark: Mark::Letter(letter),
        });
        Ok(())
    }

    pub fn remove(&mut self, point: Point, kind: AdornmentKind) -> Option<Adornment> {
        let idx = self
            .items
            .iter()
            .position(|a| a.point == point && a.kind() == kind)?;
        Some(self.items.remove(idx))
    }

    pub fn letters_in_use(&self) -> usize {
        self.items.iter().filter(|a| a.letter().is_some()).count()
    }

    fn next_letter(&self) -> Result<char, GameError> {
        ('A'..='Z')
            .find(|c| !self.items.iter().any(|a| a.letter() == Some(*c)))
            .ok_or(GameError::LettersExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_allocate_in_order() {
        let mut marks = Adornments::new();
        let a = marks.add((0, 0), AdornmentKind::Letter).unwrap();
        let b = marks.add((0, 1), AdornmentKind::Letter).unwrap();
        assert_eq!(a.letter(), Some('A'));
        assert_eq!(b.letter(), Some('B'));
    }

    #[test]
    fn test_freed_letter_is_reused() {
        let mut marks = Adornments::new();
        for col in 0..3 {
            marks.add((0, col), AdornmentKind::Letter).unwrap();
        }
        let removed = marks.remove((0, 1), AdornmentKind::Letter).unwrap();
        assert_eq!(removed.letter(), Some('B'));
        let again = marks.add((5, 5), AdornmentKind::Letter).unwrap();
        assert_eq!(again.letter(), Some('B'));
    }

    #[test]
    fn test_twenty_seventh_letter_fails() {
        let mut marks = Adornments::new();
        for i in 0..26 {
            marks.add((i / 5, i % 5), AdornmentKind::Letter).unwrap();
        }
        assert_eq!(
            marks.add((6, 0), AdornmentKind::Letter),
            Err(GameError::LettersExhausted)
        );
        assert_eq!(marks.len(), 26);
    }

    #[test]
    fn test_add_existing_returns_it() {
        let mut marks = Adornments::new();
        let first = marks.add((2, 2), AdornmentKind::Square).unwrap();
        let second = marks.add((2, 2), AdornmentKind::Square).unwrap();
        assert_eq!(first, second);
        assert_eq!(marks.len(), 1);
        // A different kind can share the point.
        marks.add((2, 2), AdornmentKind::Triangle).unwrap();
        assert_eq!(marks.len(), 2);
    }

    #[test]
    fn test_current_move_marker_is_not_stored() {
        let mut marks = Adornments::new();
        assert_eq!(
            marks.add((1, 1), AdornmentKind::CurrentMove),
            Err(GameError::UnsupportedAdornment)
        );
        assert!(marks.is_empty());
    }
}
