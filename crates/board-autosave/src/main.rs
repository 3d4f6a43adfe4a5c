use anyhow::Context;
use board_activity::{HostEvent, LocalEventBus, MouseButton};
use board_autosave::{
    init_tracing, AutosaveConfig, AutosaveSession, BoardSaver, DriverStats, LogFormat, SaveError,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Saver that stands in for the hosted backend during simulation
struct SimulatedSaver {
    calls: AtomicU64,
    fail_every: u64,
}

#[async_trait::async_trait]
impl BoardSaver for SimulatedSaver {
    async fn save(&self) -> Result<(), SaveError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(SaveError::Unavailable(format!("simulated outage on save #{n}")));
        }
        Ok(())
    }
}

fn cli() -> Command {
    Command::new("board-autosave")
        .version(board_autosave::VERSION)
        .about("Activity-gated board autosave")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Default tracing directive when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a session against synthetic input")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML config file"),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .value_parser(value_parser!(u64))
                        .help("Override save interval"),
                )
                .arg(
                    Arg::new("staleness-ms")
                        .long("staleness-ms")
                        .value_parser(value_parser!(u64))
                        .help("Override staleness threshold"),
                )
                .arg(
                    Arg::new("duration-secs")
                        .long("duration-secs")
                        .default_value("60")
                        .value_parser(value_parser!(u64))
                        .help("How long to run"),
                )
                .arg(
                    Arg::new("activity-every-ms")
                        .long("activity-every-ms")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Synthetic input cadence, 0 for none"),
                )
                .arg(
                    Arg::new("idle-after-secs")
                        .long("idle-after-secs")
                        .value_parser(value_parser!(u64))
                        .help("Stop generating input after this many seconds"),
                )
                .arg(
                    Arg::new("start-hidden")
                        .long("start-hidden")
                        .action(ArgAction::SetTrue)
                        .help("Start with the tab in the background"),
                )
                .arg(
                    Arg::new("reveal-after-secs")
                        .long("reveal-after-secs")
                        .value_parser(value_parser!(u64))
                        .help("Bring the tab to the foreground after this many seconds"),
                )
                .arg(
                    Arg::new("fail-every")
                        .long("fail-every")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Fail every Nth save, 0 for never"),
                )
                .arg(
                    Arg::new("flush-on-exit")
                        .long("flush-on-exit")
                        .action(ArgAction::SetTrue)
                        .help("Save once more before stopping"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print statistics as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Validate and print the effective configuration")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML config file (defaults if omitted)"),
                ),
        )
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AutosaveConfig> {
    match path {
        Some(path) => AutosaveConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(AutosaveConfig::default()),
    }
}

fn board_coordinate(n: u64, extent: u32) -> f64 {
    f64::from(u32::try_from(n % u64::from(extent)).unwrap_or_default())
}

fn synthetic_event(n: u64) -> HostEvent {
    match n % 3 {
        0 => HostEvent::PointerMove {
            x: board_coordinate(n, 800),
            y: board_coordinate(n, 600),
        },
        1 => HostEvent::KeyDown { key: "e".into() },
        _ => HostEvent::Click {
            button: MouseButton::Primary,
        },
    }
}

fn print_stats(stats: &DriverStats, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }
    println!("Autosave statistics:");
    println!("  Ticks: {}", stats.ticks);
    println!("  Saved: {}", stats.saves_succeeded);
    println!("  Failed: {}", stats.saves_failed);
    println!("  Skipped: {}", stats.skipped);
    println!("  Timers armed: {}", stats.timers_armed);
    if let Some(at) = stats.last_saved_at {
        println!("  Last saved: {}", at.to_rfc3339());
    }
    Ok(())
}

async fn simulate(args: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(args.get_one::<PathBuf>("config"))?;
    if let Some(ms) = args.get_one::<u64>("interval-ms") {
        config = config.with_save_interval(Duration::from_millis(*ms));
    }
    if let Some(ms) = args.get_one::<u64>("staleness-ms") {
        config = config.with_staleness_threshold(Duration::from_millis(*ms));
    }

    let duration = Duration::from_secs(args.get_one::<u64>("duration-secs").copied().unwrap_or(60));
    let cadence = args.get_one::<u64>("activity-every-ms").copied().unwrap_or(0);
    let idle_after = args.get_one::<u64>("idle-after-secs").map(|s| Duration::from_secs(*s));
    let reveal_after = args.get_one::<u64>("reveal-after-secs").map(|s| Duration::from_secs(*s));

    let bus = Arc::new(LocalEventBus::new(args.get_flag("start-hidden")));
    let saver = Arc::new(SimulatedSaver {
        calls: AtomicU64::new(0),
        fail_every: args.get_one::<u64>("fail-every").copied().unwrap_or(0),
    });
    let session = AutosaveSession::start(config, bus.clone(), saver)?;

    let step = Duration::from_millis(if cadence == 0 { 250 } else { cadence });
    let started = Instant::now();
    let mut n = 0u64;
    while started.elapsed() < duration {
        tokio::time::sleep(step).await;
        let elapsed = started.elapsed();

        if reveal_after.is_some_and(|at| elapsed >= at) {
            bus.set_hidden(false);
        }
        if cadence > 0 && idle_after.map_or(true, |at| elapsed < at) {
            bus.dispatch(&synthetic_event(n));
            n += 1;
        }
    }

    if args.get_flag("flush-on-exit") {
        if let Err(e) = session.save_now().await {
            eprintln!("Final save failed: {e}");
        }
    }
    session.stop();

    print_stats(&session.stats(), args.get_flag("json"))
}

fn show_config(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args.get_one::<PathBuf>("path"))?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let format = if matches.get_flag("log-json") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    let level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    init_tracing(level, format);

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args).await,
        Some(("config", args)) => show_config(args),
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}
