use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::Instrument;

use numduel::config::{ConfigError, DEFAULT_ROUNDS, GameConfig, TransportChoice};
use numduel::logging::init_tracing;

/// Two processes take turns thinking of a number and guessing it.
#[derive(Debug, Parser)]
#[command(name = "numduel", version, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    play: PlayArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Internal: the spawned half of a game.
    #[command(hide = true)]
    Peer {
        #[arg(long, value_enum)]
        transport: TransportChoice,
    },
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Secrets and guesses are drawn from 1..=MAX_NUMBER
    max_number: Option<u32>,

    /// Number of rounds; roles swap every round
    #[arg(long, env = "NUMDUEL_ROUNDS", default_value_t = DEFAULT_ROUNDS)]
    rounds: u32,

    /// How events travel between the two processes
    #[arg(long, value_enum, env = "NUMDUEL_TRANSPORT", default_value_t = TransportChoice::default())]
    transport: TransportChoice,

    /// Where the FIFO pair is created [default: system temp dir]
    #[arg(long, env = "NUMDUEL_FIFO_DIR")]
    fifo_dir: Option<PathBuf>,

    /// Seed for reproducible games
    #[arg(long)]
    seed: Option<u64>,
}

impl PlayArgs {
    fn into_config(self) -> Result<GameConfig, ConfigError> {
        let max_number = self.max_number.ok_or(ConfigError::MissingBound)?;
        let mut config = GameConfig::new(max_number)?
            .with_rounds(self.rounds)
            .with_transport(self.transport)
            .with_seed(self.seed);
        if let Some(dir) = self.fifo_dir {
            config = config.with_fifo_dir(dir);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Signals used by the signal transport must be blocked before any runtime
/// thread exists, so they all inherit the mask and the signalfd sees them.
#[cfg(target_os = "linux")]
fn prepare_signals(transport: TransportChoice) -> anyhow::Result<()> {
    if transport == TransportChoice::Signal {
        numduel::transport::signal::block_game_signals()
            .context("failed to block game signals")?;
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn prepare_signals(_transport: TransportChoice) -> anyhow::Result<()> {
    Ok(())
}

fn build_runtime(transport: TransportChoice) -> anyhow::Result<tokio::runtime::Runtime> {
    prepare_signals(transport)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

/// Root span for one side of the game; both sides log to the same terminal.
fn side_span(side: &'static str) -> tracing::Span {
    tracing::info_span!("side", side, pid = std::process::id())
}

fn host(args: PlayArgs) -> i32 {
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            eprintln!("{}", Cli::command().render_usage());
            return 2;
        }
    };

    let result = build_runtime(config.transport).and_then(|rt| {
        let result = rt
            .block_on(numduel::run_host(&config).instrument(side_span("host")))
            .context("game aborted");
        rt.shutdown_timeout(Duration::from_secs(1));
        result
    });

    match result {
        Ok(summary) => {
            print!("{}", summary.render());
            0
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

/// The peer never writes to stdout: it is the control channel.
fn peer(transport: TransportChoice) -> i32 {
    let result = build_runtime(transport).and_then(|rt| {
        let result = rt
            .block_on(numduel::run_peer().instrument(side_span("peer")))
            .context("peer aborted");
        rt.shutdown_timeout(Duration::from_secs(1));
        result
    });

    match result {
        Ok(summary) => {
            tracing::debug!(rounds = summary.rounds_played(), "Peer done");
            0
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let code = match cli.command {
        Some(Command::Peer { transport }) => peer(transport),
        None => host(cli.play),
    };
    process::exit(code);
}
