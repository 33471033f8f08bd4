// Square grid model: one stable camera observation of the 64 squares.

use crate::error::{FrameDefect, InferenceError};
use cozy_chess::{Board, Color, File, Rank, Square};
use std::time::Duration;

/// Colour reported by the vision layer for an occupied square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorLabel {
    White,
    Black,
    Unknown,
}

impl ColorLabel {
    pub fn from_color(color: Color) -> Self {
        match color {
            Color::White => ColorLabel::White,
            Color::Black => ColorLabel::Black,
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            ColorLabel::White => Some(Color::White),
            ColorLabel::Black => Some(Color::Black),
            ColorLabel::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool { self != ColorLabel::Unknown }

    /// Two labels disagree only when both are known and differ.
    pub fn agrees_with(self, other: ColorLabel) -> bool {
        match (self.color(), other.color()) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SquareState {
    Empty,
    Occupied(ColorLabel),
}

impl SquareState {
    pub fn occupied_by(color: Color) -> Self { SquareState::Occupied(ColorLabel::from_color(color)) }

    pub fn is_occupied(self) -> bool { matches!(self, SquareState::Occupied(_)) }

    pub fn label(self) -> Option<ColorLabel> {
        match self {
            SquareState::Empty => None,
            SquareState::Occupied(label) => Some(label),
        }
    }

    /// A genuine transition: occupancy flipped, or both colours are known and differ.
    pub fn differs_from(self, other: SquareState) -> bool {
        match (self, other) {
            (SquareState::Empty, SquareState::Empty) => false,
            (SquareState::Occupied(a), SquareState::Occupied(b)) => !a.agrees_with(b),
            _ => true,
        }
    }

    /// Whether an observed state can stand for `expected` (unknown colour matches any colour).
    pub fn consistent_with(self, expected: SquareState) -> bool { !self.differs_from(expected) }

    pub fn without_color(self) -> Self {
        match self {
            SquareState::Empty => SquareState::Empty,
            SquareState::Occupied(_) => SquareState::Occupied(ColorLabel::Unknown),
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '.' => Some(SquareState::Empty),
            'W' => Some(SquareState::Occupied(ColorLabel::White)),
            'B' => Some(SquareState::Occupied(ColorLabel::Black)),
            '?' => Some(SquareState::Occupied(ColorLabel::Unknown)),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            SquareState::Empty => '.',
            SquareState::Occupied(ColorLabel::White) => 'W',
            SquareState::Occupied(ColorLabel::Black) => 'B',
            SquareState::Occupied(ColorLabel::Unknown) => '?',
        }
    }
}

/// Snapshot of all 64 squares plus the metadata the frame producer measured.
///
/// A frame under construction may have unset squares; the change detector
/// refuses incomplete frames with [`InferenceError::MalformedFrame`].
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyFrame {
    cells: [Option<SquareState>; Square::NUM],
    /// Logical capture time; strictly increasing across delivered frames.
    pub timestamp: Duration,
    /// Vision layer's confidence in the colour labels, in [0, 1].
    pub color_confidence: Option<f32>,
    /// How long the observation took to settle before it was delivered.
    pub settle_latency: Option<Duration>,
}

impl OccupancyFrame {
    /// Frame with no squares set yet.
    pub fn new(timestamp: Duration) -> Self {
        Self { cells: [None; Square::NUM], timestamp, color_confidence: None, settle_latency: None }
    }

    /// Frame the camera would see for `board`, colours included.
    pub fn from_board(board: &Board, timestamp: Duration) -> Self {
        let mut frame = Self::new(timestamp);
        for sq in Square::ALL {
            let state = match board.color_on(sq) {
                Some(color) => SquareState::occupied_by(color),
                None => SquareState::Empty,
            };
            frame.set(sq, state);
        }
        frame
    }

    /// Builds a frame from explicit entries; every square exactly once.
    pub fn from_entries<I>(timestamp: Duration, entries: I) -> Result<Self, InferenceError>
    where
        I: IntoIterator<Item = (Square, SquareState)>,
    {
        let mut frame = Self::new(timestamp);
        let mut duplicates = Vec::new();
        for (sq, state) in entries {
            if frame.cells[sq as usize].is_some() {
                if !duplicates.contains(&sq) { duplicates.push(sq); }
                continue;
            }
            frame.set(sq, state);
        }
        if !duplicates.is_empty() {
            return Err(InferenceError::MalformedFrame { defect: FrameDefect::DuplicateSquares, squares: duplicates });
        }
        frame.ensure_complete()?;
        Ok(frame)
    }

    /// Parses eight glyph rows, rank 8 first (see [`SquareState::from_glyph`]).
    pub fn from_rows<S: AsRef<str>>(timestamp: Duration, rows: &[S]) -> Result<Self, InferenceError> {
        if rows.len() != Rank::NUM {
            return Err(InferenceError::MalformedFrame { defect: FrameDefect::BadShape, squares: Vec::new() });
        }
        let mut frame = Self::new(timestamp);
        for (row_idx, row) in rows.iter().enumerate() {
            let rank = Rank::index(Rank::NUM - 1 - row_idx);
            let glyphs: Vec<char> = row.as_ref().chars().filter(|c| !c.is_whitespace()).collect();
            if glyphs.len() != File::NUM {
                let squares = File::ALL.iter().map(|&f| Square::new(f, rank)).collect();
                return Err(InferenceError::MalformedFrame { defect: FrameDefect::BadShape, squares });
            }
            for (file_idx, &c) in glyphs.iter().enumerate() {
                let sq = Square::new(File::index(file_idx), rank);
                let state = SquareState::from_glyph(c)
                    .ok_or_else(|| InferenceError::MalformedFrame { defect: FrameDefect::BadGlyph(c), squares: vec![sq] })?;
                frame.set(sq, state);
            }
        }
        Ok(frame)
    }

    /// Glyph rows, rank 8 first; unset squares render as a space.
    pub fn to_rows(&self) -> Vec<String> {
        Rank::ALL
            .iter()
            .rev()
            .map(|&rank| {
                File::ALL
                    .iter()
                    .map(|&file| self.get(Square::new(file, rank)).map_or(' ', SquareState::glyph))
                    .collect()
            })
            .collect()
    }

    pub fn set(&mut self, sq: Square, state: SquareState) { self.cells[sq as usize] = Some(state); }

    pub fn get(&self, sq: Square) -> Option<SquareState> { self.cells[sq as usize] }

    pub fn with_color_confidence(mut self, confidence: f32) -> Self {
        self.color_confidence = Some(confidence);
        self
    }

    pub fn with_settle_latency(mut self, latency: Duration) -> Self {
        self.settle_latency = Some(latency);
        self
    }

    pub fn missing_squares(&self) -> Vec<Square> {
        Square::ALL.iter().copied().filter(|&sq| self.get(sq).is_none()).collect()
    }

    pub fn ensure_complete(&self) -> Result<(), InferenceError> {
        let missing = self.missing_squares();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InferenceError::MalformedFrame { defect: FrameDefect::MissingSquares, squares: missing })
        }
    }

    /// Every occupied square carries a known colour.
    pub fn fully_labeled(&self) -> bool {
        self.cells.iter().flatten().all(|s| s.label().map_or(true, ColorLabel::is_known))
    }

    pub fn occupied_count(&self) -> usize { self.cells.iter().flatten().filter(|s| s.is_occupied()).count() }

    /// Same square states, ignoring timestamp and measurement metadata.
    pub fn same_squares(&self, other: &OccupancyFrame) -> bool { self.cells == other.cells }

    /// Copy with every colour label replaced by `Unknown`.
    pub fn occupancy_only(&self) -> Self {
        let mut out = self.clone();
        for cell in out.cells.iter_mut().flatten() {
            *cell = cell.without_color();
        }
        out
    }
}
