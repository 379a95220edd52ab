//! sgfed: an editor engine for SGF Go game records.
//!
//! ## Usage
//!
//! - `sgfed shell [FILE]` - Edit a game through the command shell on stdin
//! - `sgfed info FILE` - Summarize a game record
//! - `sgfed flip FILE OUT` - Save a copy with the colors swapped
//! - `sgfed tree FILE` - Draw the variation tree
//! - `sgfed demo` - Generate a random game with variations

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sgfed::constants::{DEFAULT_BOARD_SIZE, DEFAULT_KOMI};
use sgfed::game::{Game, GameOptions};
use sgfed::layout::TreeLayout;
use sgfed::playout::{PlayoutConfig, random_game};
use sgfed::shell::Shell;

/// sgfed: an editor engine for SGF Go game records
#[derive(Parser)]
#[command(name = "sgfed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a game through the line command shell
    Shell {
        /// Game record to open; a new game is created otherwise
        file: Option<PathBuf>,
        #[command(flatten)]
        new_game: NewGameArgs,
    },
    /// Print the game information and the main line length
    Info { file: PathBuf },
    /// Write a copy of a game with black and white swapped
    Flip { file: PathBuf, out: PathBuf },
    /// Draw the variation tree of a game
    Tree { file: PathBuf },
    /// Generate a random game with variations
    Demo {
        #[command(flatten)]
        new_game: NewGameArgs,
        /// Random seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Length of the main line
        #[arg(long, default_value_t = 60)]
        moves: usize,
        /// Save the game here instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct NewGameArgs {
    /// Board size
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
    size: usize,
    /// Number of handicap stones
    #[arg(long, default_value_t = 0)]
    handicap: usize,
    /// Komi
    #[arg(long, default_value = DEFAULT_KOMI)]
    komi: String,
}

impl NewGameArgs {
    fn options(&self) -> GameOptions {
        GameOptions {
            size: self.size,
            handicap: self.handicap,
            komi: self.komi.clone(),
            ..GameOptions::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Shell { file, new_game }) => {
            let game = match file {
                Some(path) => {
                    Game::open(&path).with_context(|| format!("cannot open {}", path.display()))?
                }
                None => Game::new(new_game.options())?,
            };
            let mut shell = Shell::new(game);
            shell.run(io::stdin().lock(), io::stdout())?;
        }
        Some(Commands::Info { file }) => run_info(&file)?,
        Some(Commands::Flip { file, out }) => {
            let game = open(&file)?;
            game.write_flipped_game(&out)
                .with_context(|| format!("cannot write {}", out.display()))?;
            info!(out = %out.display(), "wrote flipped game");
        }
        Some(Commands::Tree { file }) => {
            let game = open(&file)?;
            print!("{}", TreeLayout::compute(&game));
        }
        Some(Commands::Demo {
            new_game,
            seed,
            moves,
            out,
        }) => run_demo(&new_game, seed, moves, out)?,
        None => run_demo(
            &NewGameArgs {
                size: 9,
                handicap: 0,
                komi: DEFAULT_KOMI.to_string(),
            },
            1,
            30,
            None,
        )?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open(path: &Path) -> anyhow::Result<Game> {
    Game::open(path).with_context(|| format!("cannot open {}", path.display()))
}

fn run_info(path: &Path) -> anyhow::Result<()> {
    let mut game = open(path)?;
    let info = game.info().clone();
    println!("Size:     {}", info.size);
    println!("Komi:     {}", info.komi);
    println!("Handicap: {}", info.handicap);
    println!("Black:    {}", info.player_black);
    println!("White:    {}", info.player_white);

    if let Some(point) = game.goto_last_move()? {
        println!("Main line blocked at {point:?}");
    }
    let status = game.status();
    println!("Moves:    {}", status.move_number);
    println!(
        "Captures: B {} / W {}",
        status.black_prisoners, status.white_prisoners
    );
    println!("{}", game.board());
    Ok(())
}

fn run_demo(args: &NewGameArgs, seed: u64, moves: usize, out: Option<PathBuf>) -> anyhow::Result<()> {
    let config = PlayoutConfig {
        moves,
        ..PlayoutConfig::default()
    };
    let mut game = random_game(args.options(), &config, seed)?;
    match out {
        Some(path) => {
            game.write_game(&path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("Saved demo game to {}", path.display());
        }
        None => {
            print!("{}", game.to_sgf());
            println!();
            print!("{}", TreeLayout::compute(&game));
        }
    }
    Ok(())
}
