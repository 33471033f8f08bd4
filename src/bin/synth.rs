use anyhow::Result;
use boardwatch::replay::{synthetic_game, write_log};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "synth", about = "Generate a random legal game as a camera frame log")]
struct Args {
    /// RNG seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Maximum number of plies
    #[arg(long, default_value_t = 80)]
    plies: usize,
    /// Report occupancy only (every piece reads '?')
    #[arg(long, default_value_t = false)]
    no_colors: bool,
    /// Attach random colour confidence and settle latency to each frame
    #[arg(long, default_value_t = false)]
    noisy: bool,
    /// Output file (stdout if omitted)
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut game = synthetic_game(args.seed, args.plies, !args.no_colors);
    if args.noisy {
        let mut rng = SmallRng::seed_from_u64(args.seed.rotate_left(17));
        for frame in game.frames.iter_mut() {
            frame.color_confidence = Some(rng.gen_range(0.4..1.0));
            frame.settle_latency = Some(Duration::from_millis(rng.gen_range(100..3000)));
        }
    }

    let writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    write_log(writer, &game.frames)?;
    log::info!("{} plies, final position {}", game.moves.len(), game.final_fen);
    eprintln!("moves: {}", game.moves.join(" "));
    Ok(())
}
