use cozy_chess::Square;
use std::fmt;
use std::time::Duration;

/// What made a frame unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDefect {
    MissingSquares,
    DuplicateSquares,
    BadShape,
    BadGlyph(char),
}

impl fmt::Display for FrameDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameDefect::MissingSquares => write!(f, "missing squares"),
            FrameDefect::DuplicateSquares => write!(f, "duplicate squares"),
            FrameDefect::BadShape => write!(f, "grid is not 8x8"),
            FrameDefect::BadGlyph(c) => write!(f, "unknown glyph {c:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("malformed frame: {defect} [{}]", SquareList(.squares))]
    MalformedFrame { defect: FrameDefect, squares: Vec<Square> },

    #[error("frame at {at:?} is not newer than the last frame at {last:?}")]
    StaleFrame { at: Duration, last: Duration },

    #[error("no legal move explains the change on [{}]", SquareList(.squares))]
    NoLegalCandidate { squares: Vec<Square> },

    #[error("illegal move {uci}: {reason}")]
    IllegalMove { uci: String, reason: String },

    #[error("inconsistent position: {0}")]
    InconsistentPosition(String),

    #[error("no move to undo")]
    NoHistory,

    #[error("promotion on {square} is waiting for a piece choice")]
    PromotionPending { square: Square },

    #[error("no promotion is waiting for a piece choice")]
    NoPendingPromotion,
}

impl InferenceError {
    /// Squares an operator should look at, if the error names any.
    pub fn squares(&self) -> &[Square] {
        match self {
            InferenceError::MalformedFrame { squares, .. } => squares,
            InferenceError::NoLegalCandidate { squares } => squares,
            _ => &[],
        }
    }
}

pub(crate) struct SquareList<'a>(pub &'a [Square]);

impl fmt::Display for SquareList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sq) in self.0.iter().enumerate() {
            if i > 0 { write!(f, " ")?; }
            write!(f, "{sq}")?;
        }
        Ok(())
    }
}
