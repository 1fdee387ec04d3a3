#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Visceral Reclaimer simulation headless
//! and prints the narrative log.

mod autopilot;
mod summary;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use visceral_reclaimer_config::GameConfig;
use visceral_reclaimer_core::{Dialog, Event, LogTone};
use visceral_reclaimer_simulation::Simulation;
use visceral_reclaimer_world::query;

use autopilot::Autopilot;
use summary::RunSummary;

/// Command-line arguments accepted by the headless runner.
#[derive(Debug, Parser)]
#[command(name = "visceral-reclaimer", about = "Headless base-defence simulation")]
struct CliArgs {
    /// Alternative JSON game configuration. Defaults to the embedded data.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Seed shared by the world and wave spawning.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Simulated seconds to run before stopping.
    #[arg(long, default_value_t = 300)]
    duration_secs: u64,
    /// Simulated milliseconds per frame.
    #[arg(long, default_value_t = 100)]
    step_ms: u64,
    /// Let a scripted player build, repair and raid.
    #[arg(long)]
    auto: bool,
    /// Print every event rather than only log lines and dialogs.
    #[arg(long)]
    all_events: bool,
    /// Print a JSON summary of the final state.
    #[arg(long)]
    summary: bool,
}

/// Entry point for the Visceral Reclaimer command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => GameConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => GameConfig::builtin().context("embedded configuration is invalid")?,
    };
    let mut simulation =
        Simulation::new(Arc::new(config), args.seed).context("failed to create the world")?;

    run(&mut simulation, &args);

    if args.summary {
        println!("{}", RunSummary::capture(&simulation, args.seed).to_json()?);
    }
    Ok(())
}

fn run(simulation: &mut Simulation, args: &CliArgs) {
    let step = Duration::from_millis(args.step_ms.max(1));
    let end = Duration::from_secs(args.duration_secs);
    let mut autopilot = args.auto.then(Autopilot::new);
    let mut elapsed = Duration::ZERO;
    let mut events = Vec::new();

    info!(seed = args.seed, ?step, ?end, auto = args.auto, "run started");
    while elapsed < end && !query::is_game_over(simulation.world()) {
        if let Some(autopilot) = autopilot.as_mut() {
            autopilot.act(simulation, &mut events);
        }
        simulation.advance(step, &mut events);
        elapsed += step;

        for event in events.drain(..) {
            print_event(&event, args.all_events);
        }
    }
    info!(elapsed = ?elapsed, wave = query::wave(simulation.world()), "run finished");
}

fn print_event(event: &Event, all_events: bool) {
    match event {
        Event::LogLine { message, tone } => println!("[{}] {message}", tone_tag(*tone)),
        Event::DialogRequested {
            dialog: Dialog::Message { title, body },
        } => println!("== {title} ==\n{body}"),
        Event::DialogRequested {
            dialog: Dialog::ZoneChoice { survivor, zones },
        } => {
            let names: Vec<&str> = zones.iter().map(|zone| zone.name.as_str()).collect();
            println!("== Raid zones for survivor {} == {}", survivor.get(), names.join(", "));
        }
        other if all_events => println!("{other:?}"),
        _ => {}
    }
}

fn tone_tag(tone: LogTone) -> &'static str {
    match tone {
        LogTone::Info => "info",
        LogTone::Success => "ok",
        LogTone::Warning => "warn",
        LogTone::Danger => "DANGER",
        LogTone::Raid => "raid",
        LogTone::Resource => "res",
    }
}
