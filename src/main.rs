use anyhow::{Context, Result};
use boardwatch::config::{PromotionPolicy, WatchConfig};
use boardwatch::export::PgnHeaders;
use boardwatch::replay::{read_log, replay_with_headers, ReplayReport};
use boardwatch::stability::Debouncer;
use boardwatch::OccupancyFrame;
use clap::Parser;
use cozy_chess::Piece;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay camera frame logs through the move inference core", long_about = None)]
struct Args {
    /// JSON-lines frame logs to replay
    #[arg(value_name = "LOG", required = true)]
    logs: Vec<PathBuf>,

    /// JSON config file (defaults for anything missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logs hold raw samples: confirm each change over N identical samples first
    #[arg(long, value_name = "N")]
    debounce: Option<usize>,

    /// Answer promotion prompts with this piece: q, r, b or n
    #[arg(long)]
    promote: Option<String>,

    /// Promote to a queen without asking
    #[arg(long, default_value_t = false)]
    auto_queen: bool,

    /// Directory for one PGN per log
    #[arg(long)]
    pgn_dir: Option<PathBuf>,

    /// Worker threads for replaying several logs
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Print every event, not just the summary
    #[arg(long)]
    verbose: bool,
}

fn parse_piece(s: &str) -> Result<Piece> {
    match s.to_lowercase().as_str() {
        "q" | "queen" => Ok(Piece::Queen),
        "r" | "rook" => Ok(Piece::Rook),
        "b" | "bishop" => Ok(Piece::Bishop),
        "n" | "knight" => Ok(Piece::Knight),
        _ => anyhow::bail!("Invalid promotion piece: use q, r, b or n"),
    }
}

fn load_frames(path: &Path, debounce: Option<usize>) -> Result<Vec<OccupancyFrame>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let frames = read_log(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))?;
    Ok(match debounce {
        Some(n) => {
            let mut debouncer = Debouncer::new(n);
            frames.into_iter().filter_map(|f| debouncer.push(f)).collect()
        }
        None => frames,
    })
}

fn run_one(path: &Path, args: &Args, config: &WatchConfig, answer: Option<Piece>) -> Result<ReplayReport> {
    let frames = load_frames(path, args.debounce)?;
    let headers = PgnHeaders {
        event: path.file_stem().map_or_else(|| "Board watch".to_string(), |s| s.to_string_lossy().into_owned()),
        ..PgnHeaders::default()
    };
    let report = replay_with_headers(frames, config, answer, &headers);
    if let Some(dir) = &args.pgn_dir {
        let out = dir.join(path.with_extension("pgn").file_name().unwrap_or_default());
        fs::write(&out, &report.pgn).with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(report)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WatchConfig::load(path)?,
        None => WatchConfig::default(),
    };
    if args.auto_queen { config.promotion = PromotionPolicy::AutoQueen; }
    let answer = args.promote.as_deref().map(parse_piece).transpose()?;
    if let Some(dir) = &args.pgn_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let pb = ProgressBar::new(args.logs.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} logs {msg}")?);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads.max(1)).build()?;
    let reports: Vec<(PathBuf, Result<ReplayReport>)> = pool.install(|| {
        args.logs
            .par_iter()
            .map(|path| {
                let r = run_one(path, &args, &config, answer);
                pb.inc(1);
                (path.clone(), r)
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut failed = 0usize;
    for (path, report) in reports {
        println!("== {}", path.display());
        let report = match report {
            Ok(r) => r,
            Err(e) => {
                failed += 1;
                println!("error: {e:#}");
                continue;
            }
        };
        if args.verbose {
            for event in &report.events { println!("{event}"); }
        }
        for (at, err) in &report.rejected { println!("rejected frame at {:?}: {err}", at); }
        println!("moves: {}", report.moves.join(" "));
        println!("alerts: {}  state: {:?}  confidence: {:.2}", report.alerts.len(), report.sync, report.confidence);
        println!("fen: {}", report.final_fen);
    }
    if failed > 0 { anyhow::bail!("{failed} log(s) could not be replayed"); }
    Ok(())
}
