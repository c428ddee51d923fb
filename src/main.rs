//! Labeldown CLI - a terminal front end for the label-timer engine
//!
//! The engine is built for embedding in a mobile shell; this binary
//! drives it from the command line instead:
//! - `run` starts a labeled countdown and waits for the banner run
//! - `presets` lists the visible presets from the on-disk store

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::Mutex;

use labeldown::{
    AlarmEvent, ChannelAlarmTrigger, EngineConfig, PresetStore, SystemClock, TimerService,
    TokioNotificationScheduler,
};

#[derive(Parser)]
#[command(name = "labeldown", version, about = "Label-timer engine demo CLI")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a countdown and wait for it to complete
    Run(RunArgs),
    /// List visible presets
    Presets,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Timer label
    #[arg(short, long, default_value = "Timer")]
    label: String,

    /// Hours component of the duration
    #[arg(long, default_value_t = 0)]
    hours: u32,

    /// Minutes component of the duration
    #[arg(short, long, default_value_t = 0)]
    minutes: u32,

    /// Seconds component of the duration
    #[arg(short, long, default_value_t = 0)]
    seconds: u32,

    /// Disable the completion sound flag
    #[arg(long)]
    silent: bool,
}

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Run(args)) => run_timer(args).await,
        Some(Commands::Presets) => list_presets(),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Runs a single countdown to completion, printing deliveries as they
/// arrive from the scheduler and the alarm seam.
async fn run_timer(args: RunArgs) -> Result<()> {
    let clock = SystemClock;
    let config = EngineConfig::default();
    let (scheduler, mut deliveries) = TokioNotificationScheduler::new();
    let (alarm, mut alarm_events) = ChannelAlarmTrigger::new();
    let presets = open_preset_store(&config, &clock)?;

    let mut service = TimerService::new(config, presets, scheduler, alarm, clock)
        .context("engine configuration rejected")?;

    // Without --silent the engine's configured default policy applies.
    let id = if args.silent {
        service.create(&args.label, args.hours, args.minutes, args.seconds, false, false)
    } else {
        service.create_with_defaults(&args.label, args.hours, args.minutes, args.seconds)
    }
    .context("failed to create timer")?;
    service.start(id).context("failed to start timer")?;

    if let Some(timer) = service.repository().get(id) {
        println!(
            "started \"{}\" for {}s (ends at {})",
            timer.label,
            timer.duration_seconds,
            timer.ends_at.map(|t| t.to_rfc3339()).unwrap_or_default()
        );
    }

    let service = Arc::new(Mutex::new(service));
    let expiry = tokio::spawn(TimerService::run_expiry_loop(Arc::clone(&service)));

    loop {
        tokio::select! {
            Some(delivery) = deliveries.recv() => {
                println!("notification: {} ({})", delivery.title, delivery.body);
                // One banner is enough for a terminal session; silence the rest.
                service.lock().await.acknowledge_notification(&delivery.id);
            }
            Some(event) = alarm_events.recv() => {
                if let AlarmEvent::Started { timer_id, sound, .. } = event {
                    println!("alarm for {timer_id} (sound: {sound})");
                }
            }
            else => break,
        }

        let guard = service.lock().await;
        if guard
            .repository()
            .get(id)
            .is_none_or(|t| !t.status.is_running())
        {
            break;
        }
    }

    expiry.abort();
    println!("done");
    Ok(())
}

/// Prints the visible presets from the default on-disk store.
fn list_presets() -> Result<()> {
    let config = EngineConfig::default();
    let store = open_preset_store(&config, &SystemClock)?;

    for preset in store.visible() {
        println!(
            "{}  {:>2}:{:02}:{:02}  sound={}",
            preset.label, preset.hours, preset.minutes, preset.seconds, preset.is_sound_on
        );
    }
    Ok(())
}

fn open_preset_store(config: &EngineConfig, clock: &SystemClock) -> Result<PresetStore> {
    use labeldown::Clock;

    let path = PresetStore::default_path().context("no data directory available")?;
    PresetStore::open(path, config.max_visible_presets, clock.now())
        .context("failed to open preset store")
}
