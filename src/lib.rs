// Move inference core for a camera-watched chessboard
pub mod board;
pub mod confidence;
pub mod config;
pub mod correction;
pub mod detect;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod frame;
pub mod game;
pub mod infer;
pub mod replay;
pub mod stability;

// Re-exports for the boundary layer
pub use board::GamePosition;
pub use confidence::{ConfidenceParams, ConfidenceTracker, DesyncReason, SyncState};
pub use config::{PromotionPolicy, WatchConfig};
pub use correction::{CorrectionBatch, CorrectionRequest, Occupant};
pub use engine::BoardWatcher;
pub use error::InferenceError;
pub use events::{CoreEvent, DesyncAlert, MoveApplied, PromotionRequest, RecoveryAction};
pub use frame::{ColorLabel, OccupancyFrame, SquareState};
pub use game::Game;
