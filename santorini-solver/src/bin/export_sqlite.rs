//! Export binary checkpoint to SQLite database.
//!
//! Usage: export_sqlite [input.bin] [output.db]
//!
//! Writes one row per decided position, keyed by its 36-character
//! encoding, for lookups from tools that do not link the solver.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use rusqlite::{params, Connection};
use santorini_core::Position;
use santorini_solver::checkpoint::Checkpoint;
use santorini_solver::CheckpointError;
use thiserror::Error;

const BATCH_SIZE: usize = 100_000;

#[derive(Debug, Error)]
enum ExportError {
    #[error("failed to load checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to replace {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("verification failed for {encoding}: expected {expected}, found {found}")]
    Mismatch {
        encoding: String,
        expected: i32,
        found: i32,
    },
}

fn export(input_path: &Path, output_path: &Path) -> Result<usize, ExportError> {
    println!("Loading binary checkpoint...");
    let start = Instant::now();
    let checkpoint = Checkpoint::load(input_path)?;
    println!(
        "Loaded {} positions in {:.2}s",
        checkpoint.entries.len(),
        start.elapsed().as_secs_f64()
    );

    let rows: Vec<(String, i32, i32)> = checkpoint
        .entries
        .iter()
        .map(|&(key, label)| {
            let position = Position::from_key(key).map_err(|source| {
                CheckpointError::InvalidKey { key: key.0, source }
            })?;
            let side = position.side_to_move() as i32;
            Ok((position.encode(), side, label.as_i8() as i32))
        })
        .collect::<Result<_, CheckpointError>>()?;

    if output_path.exists() {
        std::fs::remove_file(output_path).map_err(|source| ExportError::Remove {
            path: output_path.to_path_buf(),
            source,
        })?;
    }

    println!("\nCreating SQLite database...");
    let start = Instant::now();
    let mut conn = Connection::open(output_path)?;

    conn.execute(
        "CREATE TABLE positions (
            encoding TEXT PRIMARY KEY,
            side_to_move INTEGER NOT NULL,
            outcome INTEGER NOT NULL
        )",
        [],
    )?;

    let total = rows.len();
    println!("Inserting {} positions...", total);

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO positions (encoding, side_to_move, outcome) VALUES (?1, ?2, ?3)",
        )?;

        for (i, (encoding, side, outcome)) in rows.iter().enumerate() {
            stmt.execute(params![encoding, side, outcome])?;

            if (i + 1) % BATCH_SIZE == 0 {
                let inserted = i + 1;
                let pct = 100.0 * inserted as f64 / total as f64;
                let rate = inserted as f64 / start.elapsed().as_secs_f64();
                println!("  {:>3.0}% ({}/{}) - {:.0} rows/sec", pct, inserted, total, rate);
            }
        }
    }
    tx.commit()?;

    let insert_time = start.elapsed().as_secs_f64();
    println!(
        "Inserted {} positions in {:.2}s ({:.0} rows/sec)",
        total,
        insert_time,
        total as f64 / insert_time.max(f64::EPSILON)
    );

    println!("\nVerifying database...");
    let step = (total / 5).max(1);
    for (encoding, _, expected) in rows.iter().step_by(step).take(5) {
        let found: i32 = conn.query_row(
            "SELECT outcome FROM positions WHERE encoding = ?1",
            params![encoding],
            |row| row.get(0),
        )?;
        if found != *expected {
            return Err(ExportError::Mismatch {
                encoding: encoding.clone(),
                expected: *expected,
                found,
            });
        }
    }
    println!("Verification passed!");

    Ok(total)
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let input_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/santorini.bin"));
    let output_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/tablebase.db"));

    println!("Binary to SQLite Exporter");
    println!("=========================");
    println!("Input:  {}", input_path.display());
    println!("Output: {}", output_path.display());
    println!();

    if let Err(e) = export(&input_path, &output_path) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let input_size = std::fs::metadata(&input_path).map(|m| m.len()).unwrap_or(0);
    let output_size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);

    println!("\nFile sizes:");
    println!("  Binary: {:.1} MB", input_size as f64 / 1024.0 / 1024.0);
    println!("  SQLite: {:.1} MB", output_size as f64 / 1024.0 / 1024.0);

    println!("\nDone! Database created at {}", output_path.display());
    ExitCode::SUCCESS
}
