// JSON-lines frame logs: reading, writing, replaying and synthesizing them.

use crate::config::WatchConfig;
use crate::confidence::SyncState;
use crate::engine::BoardWatcher;
use crate::error::InferenceError;
use crate::events::{CoreEvent, DesyncAlert};
use crate::export::PgnHeaders;
use crate::frame::OccupancyFrame;
use cozy_chess::{Board, Move, Piece};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::Duration;

/// One line of a frame log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub t_ms: u64,
    /// Eight rows, rank 8 first, glyphs `.`, `W`, `B`, `?`.
    pub rows: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
}

impl FrameRecord {
    pub fn from_frame(frame: &OccupancyFrame) -> Self {
        Self {
            t_ms: frame.timestamp.as_millis() as u64,
            rows: frame.to_rows(),
            color_confidence: frame.color_confidence,
            settle_ms: frame.settle_latency.map(|d| d.as_millis() as u64),
        }
    }

    pub fn to_frame(&self) -> Result<OccupancyFrame, InferenceError> {
        let mut frame = OccupancyFrame::from_rows(Duration::from_millis(self.t_ms), &self.rows)?;
        if let Some(c) = self.color_confidence { frame = frame.with_color_confidence(c); }
        if let Some(ms) = self.settle_ms { frame = frame.with_settle_latency(Duration::from_millis(ms)); }
        Ok(frame)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("line {line}: {source}")]
    Json { line: usize, source: serde_json::Error },
    #[error("line {line}: {source}")]
    Frame { line: usize, source: InferenceError },
    #[error("encoding frame: {0}")]
    Encode(serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads a whole log. Blank lines are skipped; anything else must be a valid frame.
pub fn read_log<R: BufRead>(reader: R) -> Result<Vec<OccupancyFrame>, LogError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let record: FrameRecord =
            serde_json::from_str(&line).map_err(|source| LogError::Json { line: i + 1, source })?;
        frames.push(record.to_frame().map_err(|source| LogError::Frame { line: i + 1, source })?);
    }
    Ok(frames)
}

pub fn write_log<W: Write>(mut writer: W, frames: &[OccupancyFrame]) -> Result<(), LogError> {
    for frame in frames {
        let line = serde_json::to_string(&FrameRecord::from_frame(frame)).map_err(LogError::Encode)?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct ReplayReport {
    /// SAN of every move in the final record.
    pub moves: Vec<String>,
    pub events: Vec<CoreEvent>,
    pub alerts: Vec<DesyncAlert>,
    /// Frames the core refused, with their timestamps.
    pub rejected: Vec<(Duration, InferenceError)>,
    pub final_fen: String,
    pub confidence: f32,
    pub sync: SyncState,
    pub pgn: String,
}

/// Feeds `frames` through a fresh core. Promotions are answered with
/// `promotion_answer` when the policy asks; with no answer the core stays
/// waiting and later frames are ignored.
pub fn replay<I>(frames: I, config: &WatchConfig, promotion_answer: Option<Piece>) -> ReplayReport
where
    I: IntoIterator<Item = OccupancyFrame>,
{
    replay_with_headers(frames, config, promotion_answer, &PgnHeaders::default())
}

pub fn replay_with_headers<I>(frames: I, config: &WatchConfig, promotion_answer: Option<Piece>, headers: &PgnHeaders) -> ReplayReport
where
    I: IntoIterator<Item = OccupancyFrame>,
{
    let mut watcher = BoardWatcher::new(config.clone());
    let mut events = Vec::new();
    let mut rejected = Vec::new();
    for frame in frames {
        let at = frame.timestamp;
        match watcher.process_frame(frame) {
            Ok(Some(CoreEvent::PromotionRequired(request))) => {
                events.push(CoreEvent::PromotionRequired(request));
                if let Some(piece) = promotion_answer {
                    match watcher.promote(piece) {
                        Ok(event) => events.push(event),
                        Err(e) => rejected.push((at, e)),
                    }
                }
            }
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => {
                log::warn!("frame at {:?} rejected: {e}", at);
                rejected.push((at, e));
            }
        }
    }
    let alerts = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::Desync(a) => Some(a.clone()),
            _ => None,
        })
        .collect();
    ReplayReport {
        moves: watcher.game().san_moves(),
        events,
        alerts,
        rejected,
        final_fen: watcher.game().position().fen(),
        confidence: watcher.confidence(),
        sync: watcher.sync_state(),
        pgn: watcher.export_pgn(headers),
    }
}

/// A random legal game and the frames a camera would report for it.
#[derive(Clone, Debug)]
pub struct SyntheticGame {
    /// UCI of every move played (castling as king-takes-rook).
    pub moves: Vec<String>,
    pub frames: Vec<OccupancyFrame>,
    pub final_fen: String,
}

/// Start position at t = 0, then one frame per ply a second apart. Without
/// `labels` every occupied square reads `?`. Promotions are always to a queen.
pub fn synthetic_game(seed: u64, plies: usize, labels: bool) -> SyntheticGame {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = Board::default();
    let snapshot = |board: &Board, ply: usize| {
        let frame = OccupancyFrame::from_board(board, Duration::from_millis(ply as u64 * 1000));
        if labels { frame } else { frame.occupancy_only() }
    };
    let mut frames = vec![snapshot(&board, 0)];
    let mut moves = Vec::with_capacity(plies);
    for ply in 1..=plies {
        let mut legal: Vec<Move> = Vec::new();
        board.generate_moves(|ml| { legal.extend(ml); false });
        if legal.is_empty() { break; }
        let mut mv = legal[rng.gen_range(0..legal.len())];
        if mv.promotion.is_some() { mv.promotion = Some(Piece::Queen); }
        moves.push(mv.to_string());
        board.play_unchecked(mv);
        frames.push(snapshot(&board, ply));
    }
    SyntheticGame { moves, frames, final_fen: format!("{}", board) }
}
