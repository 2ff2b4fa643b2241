//! PSVR2 Triggers Daemon
//!
//! Drives adaptive trigger effects from the weapon the player holds. The
//! world state comes from a recorded weapon timeline and the trigger
//! commands go to a log or a JSON-lines file.

use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use psvr2_triggers::{
    config::Config,
    config_watcher::ConfigWatcher,
    replay::ReplayProvider,
    session::{lock_session, new_shared_session, SharedTriggerSession, TickOutcome, TriggerSession},
    transport::{JsonLinesTransport, LogTransport, TriggerTransport},
};

/// PSVR2 Triggers - Adaptive trigger effects per held weapon
#[derive(Parser, Debug)]
#[command(name = "psvr2-triggers")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/psvr2-triggers/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Weapon timeline to replay
    #[arg(short, long, required_unless_present = "print_default_config")]
    replay: Option<PathBuf>,

    /// Write trigger commands as JSON lines to this file instead of logging them
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Restart the timeline when it ends
    #[arg(long)]
    loop_replay: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_default_config {
        println!("{}", Config::default().to_json()?);
        return Ok(());
    }

    info!("PSVR2 Triggers starting...");

    let config = load_config(args.config.as_deref());

    let replay_path = args.replay.ok_or("no weapon timeline given")?;
    let replay = ReplayProvider::load(&replay_path)?;

    let transport = open_transport(args.output.as_deref())?;
    let session = new_shared_session(TriggerSession::initialize(transport, &config));

    // Hot-reload is optional
    let _watcher = match config.path() {
        Some(path) => match ConfigWatcher::spawn(path, session.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Config hot-reload unavailable: {}", e);
                None
            }
        },
        None => None,
    };

    let running = Arc::new(AtomicBool::new(true));
    let mut tick_handle = {
        let session = session.clone();
        let running = running.clone();
        let loop_replay = args.loop_replay;
        tokio::task::spawn_blocking(move || run_tick_loop(&session, replay, &running, loop_replay))
    };

    info!("PSVR2 Triggers ready");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, exiting...");
            running.store(false, Ordering::Relaxed);
            if let Err(e) = (&mut tick_handle).await {
                error!("Tick loop task panicked: {:?}", e);
            }
        }
        result = &mut tick_handle => {
            match result {
                Ok(ticks) => info!(ticks, "Tick loop finished"),
                Err(e) => error!("Tick loop task panicked: {:?}", e),
            }
        }
    }

    lock_session(&session).shutdown();

    Ok(())
}

/// Load configuration, falling back to defaults on error
///
/// The path is kept on the fallback so hot-reload can pick up a fixed file.
fn load_config(path: Option<&Path>) -> Config {
    let result = match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };

    match result {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            Config {
                config_path: path.map(Path::to_path_buf).or_else(Config::default_config_path),
                ..Config::default()
            }
        }
    }
}

/// Pick the trigger transport for this run
fn open_transport(output: Option<&Path>) -> std::io::Result<Box<dyn TriggerTransport + Send>> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            info!(path = %path.display(), "Writing trigger commands as JSON lines");
            Ok(Box::new(JsonLinesTransport::new(BufWriter::new(file))))
        }
        None => Ok(Box::new(LogTransport::new())),
    }
}

/// Run the per-frame tick loop until the timeline ends or `running` clears
///
/// Runs on a blocking thread: ticks are synchronous and may sleep for the
/// settle delay. Returns the number of ticks run.
fn run_tick_loop<T: TriggerTransport>(
    session: &SharedTriggerSession<T>,
    mut replay: ReplayProvider,
    running: &AtomicBool,
    loop_replay: bool,
) -> u64 {
    let mut ticks = 0u64;
    let mut next_tick = Instant::now();

    while running.load(Ordering::Relaxed) {
        if !replay.advance() {
            if !loop_replay {
                info!("Replay finished");
                break;
            }
            debug!("Replay restarting");
            replay.rewind();
            continue;
        }

        let interval = {
            let mut session = lock_session(session);
            if let TickOutcome::Dispatched(commands) = session.tick(&replay) {
                debug!(commands, tick = ticks, "Trigger effects applied");
            }
            session.tick_interval()
        };
        ticks += 1;

        // Fixed-rate pacing, skipping missed frames
        next_tick += interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    ticks
}
