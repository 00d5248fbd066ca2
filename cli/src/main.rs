use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nonogrid::GameRoute;
use nonogrid_core::{
    count_solutions, generate_human_solvable_nonogram, generate_random_nonogram, solve_with_logic,
    Cell, GeneratorConfig, Grid, PuzzleDocument, SessionId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nonogrid-cli", version, about = "Admin tools for nonogrid puzzles and sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Puzzles {
        #[command(subcommand)]
        command: PuzzleCommand,
    },
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },
}

#[derive(Subcommand)]
enum PuzzleCommand {
    /// Prints a new random puzzle document as JSON.
    Generate {
        #[arg(long, default_value_t = 10)]
        size: usize,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long, default_value_t = 0.75)]
        fill_probability: f64,
        #[arg(long, default_value_t = 10_000)]
        max_attempts: u32,
        /// Skip the check that the puzzle can be solved without guessing.
        #[arg(long)]
        allow_guessing: bool,
    },
    /// Runs the logic solver on a stored puzzle document.
    Solve { file: PathBuf },
}

#[derive(Subcommand)]
enum SessionCommand {
    New {
        #[arg(long)]
        board: String,
        #[arg(long, env = "NONOGRID_SHARE_BASE_URL", default_value = "http://localhost:8080")]
        base_url: String,
        #[arg(long)]
        session_id: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Puzzles { command } => match command {
            PuzzleCommand::Generate {
                size,
                seed,
                fill_probability,
                max_attempts,
                allow_guessing,
            } => {
                let seed = match seed.as_deref() {
                    Some(raw) => parse_seed_arg(raw)?,
                    None => rand::rng().random(),
                };
                let config = GeneratorConfig {
                    fill_probability,
                    max_attempts,
                };
                let mut rng = StdRng::seed_from_u64(seed);
                info!(size, seed, allow_guessing, "generating puzzle");
                let puzzle = if allow_guessing {
                    generate_random_nonogram(size, &mut rng, &config)?
                } else {
                    generate_human_solvable_nonogram(size, &mut rng, &config)?
                };
                println!("{}", puzzle.to_json()?);
            }
            PuzzleCommand::Solve { file } => {
                let raw = std::fs::read_to_string(&file)?;
                let document = PuzzleDocument::from_json(&raw)?;
                let puzzle = &document.puzzle;
                info!(
                    id = puzzle.id(),
                    rows = puzzle.rows(),
                    cols = puzzle.cols(),
                    "solving puzzle"
                );
                match solve_with_logic(puzzle) {
                    Some(grid) => {
                        println!("solvable by logic: yes");
                        print!("{}", render_grid(&grid));
                    }
                    None => {
                        warn!(id = puzzle.id(), "logic solver got stuck");
                        println!("solvable by logic: no");
                    }
                }
                let solutions = count_solutions(puzzle, 2);
                let verdict = match solutions {
                    0 => "none",
                    1 => "unique",
                    _ => "multiple",
                };
                println!("solutions: {verdict}");
            }
        },
        Commands::Sessions { command } => match command {
            SessionCommand::New {
                board,
                base_url,
                session_id,
            } => {
                let session = match session_id {
                    Some(id) => SessionId::parse(&id)?,
                    None => SessionId::generate(&mut rand::rng()),
                };
                let share_url = GameRoute::offline(board).share_url(&base_url, &session)?;
                println!("session_id: {session}");
                println!("share_url: {share_url}");
            }
        },
    }

    Ok(())
}

fn render_grid(grid: &Grid) -> String {
    let mut out = String::with_capacity(grid.rows() * (grid.cols() + 1));
    for row in 0..grid.rows() {
        for cell in grid.row(row) {
            out.push(match cell {
                Cell::Filled => '#',
                Cell::Crossed => '.',
                Cell::Blank => '?',
            });
        }
        out.push('\n');
    }
    out
}

fn parse_seed_arg(raw: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let trimmed = raw.trim();
    let value = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)?
    } else {
        trimmed.parse::<u64>()?
    };
    Ok(value)
}
