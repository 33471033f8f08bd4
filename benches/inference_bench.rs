use boardwatch::config::{PromotionPolicy, WatchConfig};
use boardwatch::detect::diff;
use boardwatch::frame::SquareState;
use boardwatch::infer::candidates;
use boardwatch::replay::{replay, synthetic_game};
use boardwatch::GamePosition;
use cozy_chess::{Color, Square};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn bench_candidates(c: &mut Criterion) {
    let pos = GamePosition::startpos();
    let before = pos.expected_frame(Duration::ZERO);
    let mut after = before.clone();
    after.set(Square::E2, SquareState::Empty);
    after.set(Square::E4, SquareState::occupied_by(Color::White));
    let d = diff(&before, &after).expect("complete frames");
    c.bench_function("candidates_e2e4", |ben| {
        ben.iter(|| {
            let v = candidates(black_box(&d), black_box(&pos));
            black_box(v)
        })
    });
}

fn bench_replay(c: &mut Criterion) {
    let config = WatchConfig { promotion: PromotionPolicy::AutoQueen, ..WatchConfig::default() };
    let labelled = synthetic_game(3, 80, true).frames;
    let occupancy = synthetic_game(3, 80, false).frames;
    c.bench_function("replay_80_plies_labelled", |ben| {
        ben.iter(|| black_box(replay(labelled.clone(), &config, None)))
    });
    c.bench_function("replay_80_plies_occupancy_only", |ben| {
        ben.iter(|| black_box(replay(occupancy.clone(), &config, None)))
    });
}

criterion_group!(benches, bench_candidates, bench_replay);
criterion_main!(benches);
