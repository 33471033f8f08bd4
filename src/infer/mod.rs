// Move inference: which legal moves explain a diff, and which one to believe.

pub mod candidates;
pub mod resolve;

pub use candidates::{candidates, capture_unseen_on_target, partial_matches, CastleSide, MoveCandidate, MoveKind, Promotion};
pub use resolve::{MoveRecency, PieceValues, Resolution, Resolver, TieBreak};
