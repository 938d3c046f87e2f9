#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Bulwark scenario headless.

mod report;

use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use bulwark_core::{forward_to_presentation, Command, Event, NodeId, ResourceTag};
use bulwark_world::{apply, query, ScenarioConfig, World};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use report::{LoggingHooks, Summary};

/// Runs a wave and hazard scenario without rendering.
#[derive(Debug, Parser)]
#[command(name = "bulwark", version)]
struct Args {
    /// Scenario file to load.
    #[arg(long, default_value = "assets/scenario.toml")]
    config: PathBuf,
    /// Simulated seconds to run.
    #[arg(long, default_value_t = 60)]
    seconds: u64,
    /// Length of one simulation tick in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Overrides the scenario's random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Delivers the required resources as soon as a hazard triggers.
    #[arg(long)]
    auto_supply: bool,
    /// Keeps a modal UI open between two simulated seconds, e.g. `10:15`.
    #[arg(long, value_name = "START:END")]
    ui_pause: Option<UiWindow>,
}

/// Simulated interval during which the UI is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct UiWindow {
    start: Duration,
    end: Duration,
}

impl UiWindow {
    fn contains(&self, clock: Duration) -> bool {
        clock >= self.start && clock < self.end
    }
}

impl FromStr for UiWindow {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let Some((start, end)) = value.split_once(':') else {
            bail!("expected START:END in seconds, got `{value}`");
        };
        let start: u64 = start.trim().parse().context("invalid UI pause start")?;
        let end: u64 = end.trim().parse().context("invalid UI pause end")?;
        ensure!(start < end, "UI pause must end after it starts");
        Ok(Self {
            start: Duration::from_secs(start),
            end: Duration::from_secs(end),
        })
    }
}

/// Entry point for the Bulwark command-line interface.
fn main() -> Result<()> {
    install_tracing();
    let args = Args::parse();
    ensure!(args.tick_ms > 0, "--tick-ms must be positive");

    let mut config = ScenarioConfig::from_path(&args.config)
        .with_context(|| format!("failed to load scenario {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let mut world = World::from_config(&config).context("failed to build world")?;

    let summary = run(&mut world, &args);
    println!("{summary}");
    Ok(())
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(world: &mut World, args: &Args) -> Summary {
    let mut hooks = LoggingHooks;
    let mut summary = Summary::default();
    let mut events = Vec::new();

    let nodes: Vec<NodeId> = query::nodes(world).map(|slot| slot.id()).collect();
    for node in nodes {
        apply(world, Command::InteractWithNode { node }, &mut events);
    }
    apply(world, Command::StartWaves, &mut events);

    let dt = Duration::from_millis(args.tick_ms);
    let total = Duration::from_secs(args.seconds);
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        if let Some(window) = args.ui_pause {
            let open = window.contains(elapsed);
            if open != query::is_ui_open(world) {
                info!(open, at = ?elapsed, "ui_toggled");
                apply(world, Command::SetUiOpen { open }, &mut events);
            }
        }
        apply(world, Command::Tick { dt }, &mut events);
        elapsed = elapsed.saturating_add(dt);

        let supplies = if args.auto_supply {
            pending_supplies(world, &events)
        } else {
            Vec::new()
        };
        forward_to_presentation(&events, &mut hooks);
        summary.record(&events);
        events.clear();

        for (node, tag, quantity) in supplies {
            debug!(node = node.get(), quantity, "auto_supply");
            apply(
                world,
                Command::DeliverResources {
                    node,
                    tag,
                    quantity,
                },
                &mut events,
            );
        }
    }

    apply(world, Command::Teardown, &mut events);
    summary.record(&events);
    summary.finish(world);
    summary
}

/// Resource deliveries a scripted player makes for hazards that just triggered.
fn pending_supplies(world: &World, events: &[Event]) -> Vec<(NodeId, ResourceTag, u32)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::HazardTriggered { node, quantity } => {
                let slot = query::node(world, *node)?;
                Some((*node, slot.hazard().spec().resource_tag.clone(), *quantity))
            }
            _ => None,
        })
        .collect()
}
