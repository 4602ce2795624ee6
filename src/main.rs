use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use num_traits::ToPrimitive;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yatzy_ev::types::{ConstructionError, GameState, Hand, RerollsLeft, Scoreboard};
use yatzy_ev::{Engine, EngineConfig, EngineError, MoveError, Value, distribution};

#[derive(Parser, Debug)]
#[command(name = "yatzy-ev", version, about = "Exact expected Yatzy scores under optimal play")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expected final score of a state.
    Value(StateArgs),
    /// Expected final score after every legal action, best first.
    Choices(StateArgs),
    /// Expected final score of a board before the round's dice are rolled.
    RoundStart(BoardArgs),
    /// Solves every board reachable from the given one.
    Precompute(BoardArgs),
    /// Prints the outcome table for rerolling `k` dice as a Rust constant.
    Table { k: usize },
    /// Plays the rest of a game optimally with random dice.
    Play {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct StateArgs {
    /// Five dice, e.g. `1,2,3,3,3` or `12333`.
    #[arg(long)]
    dice: Hand,
    #[arg(long, default_value_t = RerollsLeft::MAX)]
    rerolls: u8,
    #[command(flatten)]
    board: BoardArgs,
}

#[derive(Args, Debug)]
struct BoardArgs {
    /// Filled categories, e.g. `ones=0,threes=15`.
    #[arg(long, default_value = "")]
    board: Scoreboard,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Move(#[from] MoveError),
}

impl StateArgs {
    fn state(&self) -> Result<GameState, ConstructionError> {
        let rerolls = RerollsLeft::try_from(self.rerolls)?;
        Ok(GameState::new(self.dice, rerolls, self.board.board))
    }
}

fn describe(value: &Value) -> String {
    format!("{value} (~{:.6})", value.to_f64().unwrap_or(f64::NAN))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut engine = Engine::new(EngineConfig::from_env())?;
    match cli.command {
        Command::Value(args) => {
            let value = engine.value(&args.state()?)?;
            println!("{}", describe(&value));
        }
        Command::Choices(args) => {
            let mut candidates = engine.candidates(&args.state()?)?;
            // Stable, so equal values keep their enumeration order.
            candidates.sort_by(|(_, a), (_, b)| b.cmp(a));
            for (action, value) in candidates {
                println!("{:<24} {}", action.to_string(), describe(&value));
            }
        }
        Command::RoundStart(args) => {
            let value = engine.round_start_value(&args.board)?;
            println!("{}", describe(&value));
        }
        Command::Precompute(args) => {
            let solved = engine.precompute(&args.board)?;
            info!(solved, "precompute finished");
            println!("{solved}");
        }
        Command::Table { k } => {
            print!("{}", distribution(k)?);
        }
        Command::Play { board, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let mut state = GameState::start(board.board, &mut rng)?;
            while let Some((action, value)) = engine.best_action(&state)? {
                println!(
                    "round {:>2} | {} | {} rerolls | {:<20} | {}",
                    state.round() + 1,
                    state.hand(),
                    state.rerolls_left().get(),
                    action.to_string(),
                    describe(&value)
                );
                state = state.apply(&action, &mut rng)?;
            }
            println!("final score {}", state.board().final_score());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("yatzy_ev=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
