use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use client::{NetConfig, Session, SessionError, TokioClock, UiEvent};
use fern::FormatCallback;
use game_core::{Config, Params, Score};
use log::{debug, error, info, warn};
use room_store::{MemoryClient, MemoryStore, NetProfile, HOUSEKEEPING_EVERY, LEASE_TTL};
use thiserror::Error;
use time::format_description::well_known::Iso8601;
use tokio::time::{Instant, MissedTickBehavior};

use crate::bot::Bot;

mod bot;

type Player = Session<MemoryClient, TokioClock>;

const FRAME: Duration = Duration::from_millis(16);
const DT: f32 = 1.0 / 60.0;
const HOST_BOT_SPEED: f32 = 380.0;
const GUEST_BOT_SPEED: f32 = 330.0;

#[derive(Parser)]
#[command(about = "Plays pong matches without a screen", long_about = None)]
struct Cli {
    /// Which kind of match to play.
    #[arg(value_enum, long, short, default_value_t)]
    mode: MatchMode,

    /// One-way store latency in milliseconds (online only).
    #[arg(long, default_value = "40")]
    latency_ms: u64,

    /// Extra random latency in milliseconds (online only).
    #[arg(long, default_value = "10")]
    jitter_ms: u64,

    /// Fraction of best-effort writes the store drops (online only).
    #[arg(long, default_value = "0.0")]
    loss: f64,

    /// Points needed to win.
    #[arg(long, short, default_value_t = Params::WIN_SCORE)]
    win_score: u8,

    /// Seed for serves and room codes. Random when omitted.
    #[arg(long, short)]
    seed: Option<u64>,

    /// Give up on a match that runs longer than this.
    #[arg(long, default_value = "300", value_name = "SECONDS")]
    max_seconds: u64,

    /// Most verbose level printed.
    #[arg(long, short, default_value = "info")]
    log_level: log::LevelFilter,

    /// Set where the printed logging is outputted.
    #[arg(value_enum, long, short, default_value_t)]
    console_channel: ConsoleChannel,
}

#[derive(Copy, Clone, ValueEnum, Default)]
enum MatchMode {
    /// Bot against the built-in AI
    #[default]
    Ai,
    /// Two bots over an in-process store
    Online,
}

#[derive(Copy, Clone, ValueEnum, Default)]
enum ConsoleChannel {
    /// Print to stdout
    #[default]
    Out,
    /// Print to stderr
    Err,
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Host never saw the guest arrive")]
    NoOpponent,
    #[error("Match still running after {0}s")]
    TimedOut(u64),
}

struct Outcome {
    result: String,
    score: Score,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = setup_logger(cli.log_level, cli.console_channel) {
        eprintln!("Error while configuring logging : {e}");
        return ExitCode::FAILURE;
    }

    let seed = cli.seed.unwrap_or_else(rand::random);
    let config = Config {
        win_score: cli.win_score,
        ..Config::new()
    };
    info!("Starting with seed {seed}");

    let outcome = match cli.mode {
        MatchMode::Ai => run_ai(config, seed, cli.max_seconds).await,
        MatchMode::Online => {
            let profile = NetProfile::new(
                Duration::from_millis(cli.latency_ms),
                Duration::from_millis(cli.jitter_ms),
                cli.loss,
            );
            run_online(config, profile, seed, cli.max_seconds).await
        }
    };

    match outcome {
        Ok(outcome) => {
            info!(
                "{} ({}-{})",
                outcome.result, outcome.score.left, outcome.score.right
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Failed to start game. Please refresh.");
            ExitCode::FAILURE
        }
    }
}

fn new_player(store: &MemoryStore, config: &Config, seed: u64) -> Player {
    Session::new(
        store.connect(),
        TokioClock::new(),
        config.clone(),
        NetConfig::default(),
        seed,
    )
}

fn frame_ticker() -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(FRAME);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn log_ui(who: &str, events: Vec<UiEvent>) {
    for event in events {
        match event {
            UiEvent::Score { left, right } => info!("{who}: score {left}-{right}"),
            UiEvent::Error(message) => warn!("{who}: {message}"),
            UiEvent::Connection(status) => {
                if let Some(label) = status.label() {
                    info!("{who}: {label}");
                }
            }
            other => debug!("{who}: {other:?}"),
        }
    }
}

async fn run_ai(config: Config, seed: u64, max_seconds: u64) -> Result<Outcome, RunError> {
    let store = MemoryStore::default();
    let mut player = new_player(&store, &config, seed);
    let mut bot = Bot::new(&config, HOST_BOT_SPEED);

    player.boot()?;
    player.start_ai()?;

    let deadline = Instant::now() + Duration::from_secs(max_seconds);
    let mut ticker = frame_ticker();
    while player.is_playing() {
        if Instant::now() >= deadline {
            return Err(RunError::TimedOut(max_seconds));
        }
        ticker.tick().await;
        player.set_input_y(bot.follow(player.ball_state(), DT));
        player.poll();
        player.tick(DT);
        log_ui("player", player.drain_ui_events());
    }

    let outcome = Outcome {
        result: player.result().unwrap_or_default().to_string(),
        score: player.score(),
    };
    player.exit().await;
    Ok(outcome)
}

async fn run_online(
    config: Config,
    profile: NetProfile,
    seed: u64,
    max_seconds: u64,
) -> Result<Outcome, RunError> {
    let store = MemoryStore::new(profile);
    let housekeeper = store.spawn_housekeeper(HOUSEKEEPING_EVERY, LEASE_TTL);
    let mut host = new_player(&store, &config, seed);
    let mut guest = new_player(&store, &config, seed.wrapping_add(1));
    let mut host_bot = Bot::new(&config, HOST_BOT_SPEED);
    let mut guest_bot = Bot::new(&config, GUEST_BOT_SPEED);

    host.boot()?;
    host.open_lobby()?;
    let code = host.host().await?;
    info!("Hosting room {code}");

    guest.boot()?;
    guest.open_lobby()?;
    guest.join(code.as_str()).await?;

    let mut ticker = frame_ticker();
    let join_deadline = Instant::now() + NetConfig::default().join_timeout;
    while !host.is_playing() {
        if Instant::now() >= join_deadline {
            housekeeper.abort();
            return Err(RunError::NoOpponent);
        }
        ticker.tick().await;
        host.poll();
    }

    let deadline = Instant::now() + Duration::from_secs(max_seconds);
    while host.is_playing() || guest.is_playing() {
        if Instant::now() >= deadline {
            housekeeper.abort();
            return Err(RunError::TimedOut(max_seconds));
        }
        ticker.tick().await;

        host.poll();
        guest.poll();
        host.set_input_y(host_bot.follow(host.ball_state(), DT));
        guest.set_input_y(guest_bot.follow(guest.ball_state(), DT));
        host.tick(DT);
        guest.tick(DT);

        log_ui("host", host.drain_ui_events());
        log_ui("guest", guest.drain_ui_events());
    }

    if host.score() != guest.score() {
        warn!(
            "Peers disagree on the score: host {:?}, guest {:?}",
            host.score(),
            guest.score()
        );
    }
    let outcome = Outcome {
        result: host.result().unwrap_or_default().to_string(),
        score: host.score(),
    };

    // Let the host's deferred cleanup run
    let settle =
        Instant::now() + Duration::from_millis(NetConfig::default().cleanup_delay_ms * 2);
    while Instant::now() < settle && store.room_count() > 0 {
        ticker.tick().await;
        host.poll();
        guest.poll();
    }
    host.exit().await;
    guest.exit().await;
    housekeeper.abort();

    debug!("Store traffic: {:?}", store.stats());
    Ok(outcome)
}

/// Set up the global logger on stdout or stderr
fn setup_logger(
    level: log::LevelFilter,
    console_channel: ConsoleChannel,
) -> Result<(), log::SetLoggerError> {
    let dispatch = fern::Dispatch::new().level(level).format(format_log);
    let dispatch = match console_channel {
        ConsoleChannel::Out => dispatch.chain(io::stdout()),
        ConsoleChannel::Err => dispatch.chain(io::stderr()),
    };
    dispatch.apply()
}

fn format_log(out: FormatCallback, message: &std::fmt::Arguments, record: &log::Record) {
    out.finish(format_args!(
        "[{} {} {}] {}",
        utc_now_wrapper(),
        record.level(),
        &record
            .target()
            .chars()
            .take_while(|&c| c != ':')
            .collect::<String>(),
        message
    ))
}

/// Current UTC time, with a placeholder if formatting fails
fn utc_now_wrapper() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Iso8601::DEFAULT)
        .unwrap_or(String::from("invalid date"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["pongo-headless"]);
        assert!(matches!(cli.mode, MatchMode::Ai));
        assert_eq!(cli.win_score, Params::WIN_SCORE);
        assert_eq!(cli.log_level, log::LevelFilter::Info);
        assert_eq!(cli.seed, None);
    }

    #[test]
    fn test_cli_online_flags() {
        let cli = Cli::parse_from([
            "pongo-headless",
            "--mode",
            "online",
            "--latency-ms",
            "80",
            "--loss",
            "0.1",
            "-s",
            "7",
            "-l",
            "debug",
            "-c",
            "err",
        ]);
        assert!(matches!(cli.mode, MatchMode::Online));
        assert_eq!(cli.latency_ms, 80);
        assert_eq!(cli.loss, 0.1);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.log_level, log::LevelFilter::Debug);
        assert!(matches!(cli.console_channel, ConsoleChannel::Err));
    }
}
