use boardwatch::config::{PromotionPolicy, WatchConfig};
use boardwatch::replay::{read_log, replay, synthetic_game, write_log};
use boardwatch::stability::Debouncer;
use boardwatch::{OccupancyFrame, SyncState};
use cozy_chess::{Board, Move, Piece};
use pretty_assertions::assert_eq;
use std::fs::{create_dir_all, File};
use std::io::BufReader;
use std::time::Duration;

fn frames_for(moves: &[&str], step_ms: u64) -> Vec<OccupancyFrame> {
    let mut board = Board::default();
    let mut frames = vec![OccupancyFrame::from_board(&board, Duration::ZERO)];
    for (i, uci) in moves.iter().enumerate() {
        let mv: Move = uci.parse().unwrap();
        board.play(mv);
        frames.push(OccupancyFrame::from_board(&board, Duration::from_millis((i as u64 + 1) * step_ms)));
    }
    frames
}

#[test]
fn occupancy_only_log_still_sees_captures() {
    let frames: Vec<_> = frames_for(&["e2e4", "d7d5", "e4d5", "d8d5"], 1000).iter().map(|f| f.occupancy_only()).collect();
    let report = replay(frames, &WatchConfig::default(), None);
    assert_eq!(report.moves, vec!["e4", "d5", "exd5", "Qxd5"]);
    assert!(report.alerts.is_empty());
    // Each capture could also have been a piece still in the hand.
    assert_eq!(report.sync, SyncState::Suspect);
    assert!((report.confidence - 0.6).abs() < 1e-6);
    assert!(report.pgn.contains("1. e4 d5 2. exd5 Qxd5 *"));
}

#[test]
fn synthetic_log_survives_the_file_system() {
    let game = synthetic_game(2024, 40, true);
    let outdir = std::path::Path::new("target/frame_log_test");
    create_dir_all(outdir).unwrap();
    let path = outdir.join("synthetic.jsonl");
    write_log(File::create(&path).unwrap(), &game.frames).unwrap();
    let frames = read_log(BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(frames, game.frames);

    let config = WatchConfig { promotion: PromotionPolicy::AutoQueen, ..WatchConfig::default() };
    let report = replay(frames, &config, None);
    assert_eq!(report.final_fen, game.final_fen);
    assert!(report.rejected.is_empty());
}

#[test]
fn promotion_answer_is_used_when_asked() {
    let frames = frames_for(&["a2a4", "b7b5", "a4b5", "a7a6", "b5a6", "c8b7", "a6b7", "b8c6", "b7a8q"], 1000);
    let report = replay(frames, &WatchConfig::default(), Some(Piece::Queen));
    assert_eq!(report.moves.last().map(String::as_str), Some("bxa8=Q"));
    assert!(report.alerts.is_empty());
}

#[test]
fn debounced_raw_samples_replay_cleanly() {
    let stable = frames_for(&["e2e4", "e7e5", "g1f3"], 1000);
    // Five samples per stable frame, the first of each a flicker.
    let mut raw = Vec::new();
    for (i, frame) in stable.iter().enumerate() {
        let base = i as u64 * 1000;
        let mut flicker = frame.clone();
        flicker.timestamp = Duration::from_millis(base);
        flicker.set(cozy_chess::Square::H4, boardwatch::SquareState::occupied_by(cozy_chess::Color::White));
        raw.push(flicker);
        for k in 1..5 {
            let mut sample = frame.clone();
            sample.timestamp = Duration::from_millis(base + k * 100);
            raw.push(sample);
        }
    }
    let mut debouncer = Debouncer::new(3);
    let settled: Vec<_> = raw.into_iter().filter_map(|f| debouncer.push(f)).collect();
    assert_eq!(settled.len(), 4);
    assert!(settled.iter().all(|f| f.settle_latency == Some(Duration::from_millis(200))));

    let report = replay(settled, &WatchConfig::default(), None);
    assert_eq!(report.moves, vec!["e4", "e5", "Nf3"]);
}
