//! Santorini Solver
//!
//! Labels a position with memoized search, reusing decided entries from the
//! checkpoint file across runs.
//!
//! Usage: solver [--exhaustive | --best-first] [--config PATH]
//!               [--checkpoint PATH | --no-checkpoint] [POSITION]

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use santorini_core::{DecodeError, Position, REFERENCE_POSITION};
use santorini_solver::{CheckpointError, ConfigError, Label, SearchMode, Solver, SolverConfig};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid position: {0}")]
    Position(#[from] DecodeError),

    #[error("failed to save checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
struct Args {
    mode: Option<SearchMode>,
    config: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
    no_checkpoint: bool,
    position: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, CliError> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--exhaustive" => parsed.mode = Some(SearchMode::Exhaustive),
            "--best-first" => parsed.mode = Some(SearchMode::BestFirst),
            "--no-checkpoint" => parsed.no_checkpoint = true,
            "--config" | "--checkpoint" => {
                let value = args
                    .next()
                    .ok_or_else(|| CliError::Usage(format!("{} requires a path", arg)))?;
                if arg == "--config" {
                    parsed.config = Some(PathBuf::from(value));
                } else {
                    parsed.checkpoint = Some(PathBuf::from(value));
                }
            }
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown flag: {}", flag)));
            }
            _ if parsed.position.is_some() => {
                return Err(CliError::Usage(format!("unexpected argument: {}", arg)));
            }
            _ => parsed.position = Some(arg),
        }
    }

    Ok(parsed)
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn run() -> Result<Label, CliError> {
    let args = parse_args(env::args().skip(1))?;

    let mut config = SolverConfig::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.search.mode = mode;
    }
    if args.no_checkpoint {
        config.checkpoint_path = None;
    } else if let Some(path) = args.checkpoint {
        config.checkpoint_path = Some(path);
    }

    init_tracing(&config.log_level);

    let encoding = args.position.as_deref().unwrap_or(REFERENCE_POSITION);
    let position = Position::decode(encoding)?.canonical();

    println!("Santorini Solver");
    println!("================");
    println!("Position: {}", position);
    println!("To move: Player {}", position.side_to_move().digit());
    println!("Mode: {}", config.search.mode);
    println!(
        "Budgets: {} nodes, {} memo entries",
        config.search.max_nodes, config.search.max_memo_entries
    );
    println!();

    let mut solver = Solver::new(config.search.clone());

    if let Some(path) = config.checkpoint_path.as_deref().filter(|p| p.exists()) {
        match solver.load_checkpoint(path) {
            Ok(count) => info!(count, path = %path.display(), "seeded memo from checkpoint"),
            Err(e) => warn!("Failed to load checkpoint {}: {}. Starting fresh.", path.display(), e),
        }
    }

    let start = Instant::now();
    let report = solver.solve_report(position);

    println!("================");
    println!("Result: {:?}", report.label);
    println!("Exhaustive: {}", report.exhaustive);
    println!("Time: {:.2}s", start.elapsed().as_secs_f64());
    println!();
    println!("{}", report.stats);

    if let Some(path) = config.checkpoint_path.as_deref() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CliError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let count = solver.save_checkpoint(path)?;
        println!("\nSaved {} decided positions to {}", count, path.display());
    }

    match report.label.winner() {
        Some(winner) if report.exhaustive => {
            println!("\nPlayer {} wins with best play.", winner.digit())
        }
        Some(winner) => println!("\nPlayer {} wins along the explored line.", winner.digit()),
        None => println!("\nUndecided within the configured budgets."),
    }

    Ok(report.label)
}

fn main() -> ExitCode {
    match run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
